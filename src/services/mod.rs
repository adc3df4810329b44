//! 业务逻辑层
//!
//! 每个服务以懒加载单例的形式被路由持有，存储从请求的 app data 中获取。
//! 授权与范围检查都在这一层完成，存储层只保证原子性。

pub mod auth;
pub mod clones;
pub mod discussions;
pub mod schools;
pub mod users;

pub use auth::AuthService;
pub use clones::CloneService;
pub use discussions::DiscussionService;
pub use schools::SchoolService;
pub use users::UserService;

use actix_web::{HttpRequest, HttpResponse, http::StatusCode};
use std::sync::Arc;

use crate::errors::CloneLabError;
use crate::middlewares::RequireJWT;
use crate::models::users::entities::User;
use crate::models::{ApiResponse, ErrorCode};
use crate::storage::Storage;

/// 从 app data 中取存储
pub(crate) fn storage_from_request(request: &HttpRequest) -> Arc<dyn Storage> {
    request
        .app_data::<actix_web::web::Data<Arc<dyn Storage>>>()
        .expect("Storage not found in app data")
        .get_ref()
        .clone()
}

/// 当前登录用户；路由未挂 RequireJWT 时返回 401
pub(crate) fn current_user(request: &HttpRequest) -> Result<User, HttpResponse> {
    RequireJWT::extract_user_claims(request).ok_or_else(|| {
        HttpResponse::Unauthorized().json(ApiResponse::error_empty(
            ErrorCode::Unauthorized,
            "Unauthorized access, please login",
        ))
    })
}

/// 业务错误转为统一响应
pub(crate) fn error_response(err: &CloneLabError) -> HttpResponse {
    error_response_with_code(err, ErrorCode::from(err))
}

/// 同上，但使用调用方指定的业务码
pub(crate) fn error_response_with_code(err: &CloneLabError, code: ErrorCode) -> HttpResponse {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::error!("{} [{}]: {}", err.error_type(), err.code(), err.message());
    }
    HttpResponse::build(status).json(ApiResponse::error_empty(code, err.message()))
}
