use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::errors::CloneLabError;
use crate::models::ErrorCode;

// 统一的API响应结构
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/api.ts")]
pub struct ApiResponse<T: TS> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T: TS> ApiResponse<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Success as i32,
            message: message.into(),
            data: Some(data),
            timestamp: chrono::Utc::now(),
        }
    }
}

impl ApiResponse<()> {
    pub fn success_empty(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Success as i32,
            message: message.into(),
            data: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error_empty(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
            data: None,
            timestamp: chrono::Utc::now(),
        }
    }
}

impl From<&CloneLabError> for ErrorCode {
    fn from(err: &CloneLabError) -> Self {
        match err {
            CloneLabError::Validation(_) => ErrorCode::BadRequest,
            CloneLabError::Authentication(_) => ErrorCode::Unauthorized,
            CloneLabError::Authorization(_) => ErrorCode::Forbidden,
            CloneLabError::NotFound(_) => ErrorCode::NotFound,
            CloneLabError::IllegalTransition(_) => ErrorCode::IllegalStatusTransition,
            CloneLabError::ConcurrencyConflict(_) => ErrorCode::ConcurrencyConflict,
            _ => ErrorCode::InternalServerError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(
            ErrorCode::from(&CloneLabError::illegal_transition("x")),
            ErrorCode::IllegalStatusTransition
        );
        assert_eq!(
            ErrorCode::from(&CloneLabError::database_operation("x")),
            ErrorCode::InternalServerError
        );
    }

    #[test]
    fn test_error_empty_omits_data() {
        let resp = ApiResponse::error_empty(ErrorCode::NotFound, "missing");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["code"], ErrorCode::NotFound as i32);
        assert!(json.get("data").is_none());
    }
}
