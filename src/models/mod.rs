//! 数据模型定义
//!
//! 每个子模块按 `entities` / `requests` / `responses` 划分，
//! 克隆状态机与讨论未读计数这两块纯逻辑也放在这里，供存储层与服务层共用。

pub mod auth;
pub mod clones;
pub mod common;
pub mod discussions;
pub mod schools;
pub mod users;

pub use common::{ApiResponse, PaginationInfo, PaginationQuery};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// 业务响应码
///
/// 0 表示成功；1xxx 为通用错误；2xxx 为用户相关；
/// 3xxx 为克隆相关；4xxx 为讨论相关。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/api.ts")]
pub enum ErrorCode {
    Success = 0,

    // 通用
    BadRequest = 1000,
    Unauthorized = 1001,
    Forbidden = 1003,
    NotFound = 1004,
    Conflict = 1009,
    InternalServerError = 1500,

    // 用户与认证
    AuthFailed = 2000,
    UserNotFound = 2001,
    UserAlreadyExists = 2002,
    UserNameInvalid = 2003,
    UserEmailInvalid = 2004,
    UserPasswordInvalid = 2005,
    UserNameAlreadyExists = 2006,
    UserEmailAlreadyExists = 2007,
    UserCreationFailed = 2008,
    UserUpdateFailed = 2009,
    UserNotApproved = 2010,
    RegisterFailed = 2011,
    SchoolNotFound = 2100,
    SchoolAlreadyExists = 2101,

    // 克隆
    CloneNotFound = 3000,
    CloneStillAssigned = 3001,
    CloneNotEditable = 3002,
    IllegalStatusTransition = 3003,
    ConcurrencyConflict = 3004,

    // 讨论
    DiscussionNotFound = 4000,
    DiscussionMessageInvalid = 4001,
}

/// 服务启动时间
#[derive(Debug, Clone)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}
