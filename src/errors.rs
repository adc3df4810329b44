//! 统一错误处理模块
//!
//! 使用宏自动生成错误类型，支持错误代码和类型名称。

use std::fmt;

/// 定义错误类型的宏
///
/// 自动生成：
/// - enum 定义
/// - code() 方法 - 返回错误代码
/// - error_type() 方法 - 返回错误类型名称
/// - message() 方法 - 返回错误详情
/// - 便捷构造函数
macro_rules! define_clonelab_errors {
    ($(
        $variant:ident($code:literal, $type_name:literal)
    ),* $(,)?) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum CloneLabError {
            $($variant(String),)*
        }

        impl CloneLabError {
            /// 获取错误代码
            pub fn code(&self) -> &'static str {
                match self {
                    $(CloneLabError::$variant(_) => $code,)*
                }
            }

            /// 获取错误类型名称
            pub fn error_type(&self) -> &'static str {
                match self {
                    $(CloneLabError::$variant(_) => $type_name,)*
                }
            }

            /// 获取错误详情
            pub fn message(&self) -> &str {
                match self {
                    $(CloneLabError::$variant(msg) => msg,)*
                }
            }
        }

        // 生成便捷构造函数
        paste::paste! {
            impl CloneLabError {
                $(
                    pub fn [<$variant:snake>]<T: Into<String>>(msg: T) -> Self {
                        CloneLabError::$variant(msg.into())
                    }
                )*
            }
        }
    };
}

define_clonelab_errors! {
    CacheConnection("E001", "Cache Connection Error"),
    CachePluginNotFound("E002", "Cache Plugin Not Found"),
    DatabaseConfig("E003", "Database Configuration Error"),
    DatabaseConnection("E004", "Database Connection Error"),
    DatabaseOperation("E005", "Database Operation Error"),
    Io("E006", "IO Error"),
    Validation("E007", "Validation Error"),
    NotFound("E008", "Resource Not Found"),
    Serialization("E009", "Serialization Error"),
    DateParse("E011", "Date Parse Error"),
    Authentication("E012", "Authentication Error"),
    Authorization("E013", "Authorization Error"),
    IllegalTransition("E014", "Illegal Status Transition"),
    ConcurrencyConflict("E015", "Concurrency Conflict"),
}

impl CloneLabError {
    /// 非法状态迁移，消息中带上起止状态
    pub fn illegal_status_transition(from: &str, to: &str) -> Self {
        CloneLabError::IllegalTransition(format!(
            "Cannot transition from '{from}' to '{to}'"
        ))
    }

    /// 对应的 HTTP 状态码
    pub fn http_status(&self) -> u16 {
        match self {
            CloneLabError::Validation(_) => 400,
            CloneLabError::Authentication(_) => 401,
            CloneLabError::Authorization(_) => 403,
            CloneLabError::NotFound(_) => 404,
            CloneLabError::IllegalTransition(_) | CloneLabError::ConcurrencyConflict(_) => 409,
            _ => 500,
        }
    }

    /// 格式化为彩色输出（用于开发环境）
    #[cfg(debug_assertions)]
    pub fn format_colored(&self) -> String {
        format!(
            "\x1b[1;31m[ERROR]\x1b[0m \x1b[33m{}\x1b[0m \x1b[31m{}\x1b[0m\n  {}",
            self.code(),
            self.error_type(),
            self.message()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for CloneLabError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CloneLabError {}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for CloneLabError {
    fn from(err: sea_orm::DbErr) -> Self {
        CloneLabError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for CloneLabError {
    fn from(err: std::io::Error) -> Self {
        CloneLabError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CloneLabError {
    fn from(err: serde_json::Error) -> Self {
        CloneLabError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for CloneLabError {
    fn from(err: chrono::ParseError) -> Self {
        CloneLabError::DateParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CloneLabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CloneLabError::cache_connection("test").code(), "E001");
        assert_eq!(CloneLabError::validation("test").code(), "E007");
        assert_eq!(CloneLabError::authentication("test").code(), "E012");
        assert_eq!(CloneLabError::illegal_transition("test").code(), "E014");
        assert_eq!(CloneLabError::concurrency_conflict("test").code(), "E015");
    }

    #[test]
    fn test_error_types() {
        assert_eq!(
            CloneLabError::validation("test").error_type(),
            "Validation Error"
        );
        assert_eq!(
            CloneLabError::illegal_transition("x").error_type(),
            "Illegal Status Transition"
        );
    }

    #[test]
    fn test_illegal_transition_names_both_states() {
        let err = CloneLabError::illegal_status_transition("unassigned", "reviewed_correct");
        assert!(err.message().contains("unassigned"));
        assert!(err.message().contains("reviewed_correct"));
        assert_eq!(err.http_status(), 409);
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(CloneLabError::validation("x").http_status(), 400);
        assert_eq!(CloneLabError::not_found("x").http_status(), 404);
        assert_eq!(CloneLabError::authorization("x").http_status(), 403);
        assert_eq!(CloneLabError::authentication("x").http_status(), 401);
        assert_eq!(CloneLabError::concurrency_conflict("x").http_status(), 409);
        assert_eq!(CloneLabError::database_operation("x").http_status(), 500);
    }

    #[test]
    fn test_format_simple() {
        let err = CloneLabError::validation("Invalid URL");
        let formatted = err.format_simple();
        assert!(formatted.contains("Validation Error"));
        assert!(formatted.contains("Invalid URL"));
    }
}
