//! 缓存层
//!
//! 以字符串为值的对象缓存，后端（moka / redis）通过插件注册表按名称选择。

pub mod object_cache;
pub mod register;
pub mod traits;

pub use traits::{CacheResult, ObjectCache};

/// 为缓存后端生成注册函数
///
/// 生成的 `register()` 需要在启动时显式调用，见 [`object_cache::register_builtin_plugins`]。
#[macro_export]
macro_rules! declare_object_cache_plugin {
    ($name:expr, $ty:ty) => {
        pub fn register() {
            $crate::cache::register::register_object_cache_plugin(
                $name,
                std::sync::Arc::new(|| -> $crate::cache::register::BoxedObjectCacheFuture {
                    Box::pin(async {
                        let cache = <$ty>::new()
                            .map_err($crate::errors::CloneLabError::cache_connection)?;
                        Ok::<_, $crate::errors::CloneLabError>(
                            Box::new(cache) as Box<dyn $crate::cache::ObjectCache>
                        )
                    })
                }),
            );
        }
    };
}
