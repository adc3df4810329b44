pub mod access;
pub mod operations;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::CloneLabError;
use crate::models::discussions::{
    entities::MessageType,
    requests::{DiscussionListParams, GeneralThreadParams, PostMessageRequest},
    responses::{
        DiscussionListResponse, DiscussionResponse, MarkReadResponse, MessageListResponse,
        PostMessageResponse,
    },
};
use crate::models::{ApiResponse, ErrorCode};
use crate::storage::Storage;

use super::{current_user, error_response_with_code};

fn discussion_error(err: &CloneLabError) -> HttpResponse {
    let code = match err {
        CloneLabError::NotFound(_) => ErrorCode::DiscussionNotFound,
        CloneLabError::Validation(_) => ErrorCode::DiscussionMessageInvalid,
        other => ErrorCode::from(other),
    };
    error_response_with_code(err, code)
}

pub struct DiscussionService {
    storage: Option<Arc<dyn Storage>>,
}

impl DiscussionService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Arc<dyn Storage> {
        match &self.storage {
            Some(storage) => storage.clone(),
            None => super::storage_from_request(request),
        }
    }

    // 当前用户可见的讨论列表
    pub async fn list_discussions(
        &self,
        params: DiscussionListParams,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let user = match current_user(request) {
            Ok(user) => user,
            Err(response) => return Ok(response),
        };
        let storage = self.get_storage(request);
        let preview_length = AppConfig::get().discussion.preview_length;

        match operations::list_threads_for_user(
            storage.as_ref(),
            &user,
            params.unread_only,
            preview_length,
        )
        .await
        {
            Ok(items) => Ok(HttpResponse::Ok().json(ApiResponse::success(
                DiscussionListResponse { items },
                "Discussion list retrieved successfully",
            ))),
            Err(e) => Ok(discussion_error(&e)),
        }
    }

    pub async fn general_thread(
        &self,
        params: GeneralThreadParams,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let user = match current_user(request) {
            Ok(user) => user,
            Err(response) => return Ok(response),
        };
        let storage = self.get_storage(request);

        match operations::get_or_create_general_thread(storage.as_ref(), &user, params.student_id)
            .await
        {
            Ok(discussion) => Ok(HttpResponse::Ok().json(ApiResponse::success(
                DiscussionResponse { discussion },
                "Discussion retrieved successfully",
            ))),
            Err(e) => Ok(discussion_error(&e)),
        }
    }

    pub async fn list_messages(
        &self,
        discussion_id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let user = match current_user(request) {
            Ok(user) => user,
            Err(response) => return Ok(response),
        };
        let storage = self.get_storage(request);

        match operations::list_messages(storage.as_ref(), &user, discussion_id).await {
            Ok(items) => Ok(HttpResponse::Ok().json(ApiResponse::success(
                MessageListResponse { items },
                "Messages retrieved successfully",
            ))),
            Err(e) => Ok(discussion_error(&e)),
        }
    }

    pub async fn post_message(
        &self,
        discussion_id: i64,
        post_request: PostMessageRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let user = match current_user(request) {
            Ok(user) => user,
            Err(response) => return Ok(response),
        };
        let storage = self.get_storage(request);
        let max_length = AppConfig::get().discussion.max_message_length;

        match operations::post_message(
            storage.as_ref(),
            &user,
            discussion_id,
            &post_request.content,
            MessageType::Message,
            max_length,
        )
        .await
        {
            Ok(message) => Ok(HttpResponse::Created().json(ApiResponse::success(
                PostMessageResponse { message },
                "Message sent",
            ))),
            Err(e) => Ok(discussion_error(&e)),
        }
    }

    pub async fn mark_read(
        &self,
        discussion_id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let user = match current_user(request) {
            Ok(user) => user,
            Err(response) => return Ok(response),
        };
        let storage = self.get_storage(request);

        match operations::mark_read(storage.as_ref(), &user, discussion_id).await {
            Ok(state) => Ok(HttpResponse::Ok().json(ApiResponse::success(
                MarkReadResponse {
                    discussion_id,
                    unread_count: state.unread_count,
                    last_read_seq: state.last_read_seq,
                },
                "Discussion marked as read",
            ))),
            Err(e) => Ok(discussion_error(&e)),
        }
    }

    pub async fn delete_discussion(
        &self,
        discussion_id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let user = match current_user(request) {
            Ok(user) => user,
            Err(response) => return Ok(response),
        };
        let storage = self.get_storage(request);

        match operations::delete_thread(storage.as_ref(), &user, discussion_id).await {
            Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::success_empty(
                "Discussion deleted successfully",
            ))),
            Err(e) => Ok(discussion_error(&e)),
        }
    }
}
