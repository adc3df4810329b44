pub(crate) mod access;
pub mod create;
pub mod delete;
pub mod list;
pub mod messages;
pub mod workflow;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::CloneLabError;
use crate::models::clones::{
    entities::CloneSubmission,
    requests::{
        AssignCloneRequest, CloneListParams, CreateCloneRequest, ReviewCloneRequest,
        SubmitCloneRequest, UpdateAnalysisRequest, UpdateCloneStatusRequest,
    },
    responses::{CloneListResponse, CloneResponse, CloneView},
};
use crate::models::discussions::{requests::PostMessageRequest, responses::PostMessageResponse};
use crate::models::users::entities::User;
use crate::models::{ApiResponse, ErrorCode};
use crate::storage::Storage;

use super::{current_user, error_response_with_code};

fn clone_error(err: &CloneLabError) -> HttpResponse {
    let code = match err {
        CloneLabError::NotFound(_) => ErrorCode::CloneNotFound,
        other => ErrorCode::from(other),
    };
    error_response_with_code(err, code)
}

fn clone_ok(clone: CloneSubmission, user: &User, message: &str) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(
        CloneResponse {
            clone: CloneView::build(clone, user.role.is_staff()),
        },
        message,
    ))
}

pub struct CloneService {
    storage: Option<Arc<dyn Storage>>,
}

impl CloneService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Arc<dyn Storage> {
        match &self.storage {
            Some(storage) => storage.clone(),
            None => super::storage_from_request(request),
        }
    }

    pub async fn create_clone(
        &self,
        create_request: CreateCloneRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let user = match current_user(request) {
            Ok(user) => user,
            Err(response) => return Ok(response),
        };
        let storage = self.get_storage(request);

        match create::create_clone(storage.as_ref(), &user, create_request).await {
            Ok(clone) => Ok(HttpResponse::Created().json(ApiResponse::success(
                CloneResponse {
                    clone: CloneView::build(clone, true),
                },
                "Clone created successfully",
            ))),
            Err(e) => Ok(clone_error(&e)),
        }
    }

    pub async fn list_clones(
        &self,
        params: CloneListParams,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let user = match current_user(request) {
            Ok(user) => user,
            Err(response) => return Ok(response),
        };
        let storage = self.get_storage(request);

        match list::list_clones(storage.as_ref(), &user, params).await {
            Ok((items, pagination)) => Ok(HttpResponse::Ok().json(ApiResponse::success(
                CloneListResponse { items, pagination },
                "Clone list retrieved successfully",
            ))),
            Err(e) => Ok(clone_error(&e)),
        }
    }

    pub async fn get_clone(
        &self,
        clone_id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let user = match current_user(request) {
            Ok(user) => user,
            Err(response) => return Ok(response),
        };
        let storage = self.get_storage(request);

        match list::get_clone(storage.as_ref(), &user, clone_id).await {
            Ok(clone) => Ok(HttpResponse::Ok().json(ApiResponse::success(
                CloneResponse { clone },
                "Clone retrieved successfully",
            ))),
            Err(e) => Ok(clone_error(&e)),
        }
    }

    pub async fn status_catalog(&self) -> ActixResult<HttpResponse> {
        Ok(HttpResponse::Ok().json(ApiResponse::success(
            list::catalog(),
            "Status catalog retrieved successfully",
        )))
    }

    pub async fn assign_clone(
        &self,
        clone_id: i64,
        assign_request: AssignCloneRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let user = match current_user(request) {
            Ok(user) => user,
            Err(response) => return Ok(response),
        };
        let storage = self.get_storage(request);

        match workflow::assign_clone(storage.as_ref(), &user, clone_id, assign_request.student_id)
            .await
        {
            Ok(clone) => Ok(clone_ok(clone, &user, "Clone assignment updated")),
            Err(e) => Ok(clone_error(&e)),
        }
    }

    pub async fn update_status(
        &self,
        clone_id: i64,
        status_request: UpdateCloneStatusRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let user = match current_user(request) {
            Ok(user) => user,
            Err(response) => return Ok(response),
        };
        let storage = self.get_storage(request);

        match workflow::update_status(storage.as_ref(), &user, clone_id, status_request).await {
            Ok(clone) => Ok(clone_ok(clone, &user, "Clone status updated")),
            Err(e) => Ok(clone_error(&e)),
        }
    }

    pub async fn submit_clone(
        &self,
        clone_id: i64,
        submit_request: SubmitCloneRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let user = match current_user(request) {
            Ok(user) => user,
            Err(response) => return Ok(response),
        };
        let storage = self.get_storage(request);

        match workflow::submit_clone(
            storage.as_ref(),
            &user,
            clone_id,
            submit_request.expected_version,
        )
        .await
        {
            Ok(clone) => Ok(clone_ok(clone, &user, "Clone submitted for review")),
            Err(e) => Ok(clone_error(&e)),
        }
    }

    pub async fn review_clone(
        &self,
        clone_id: i64,
        review_request: ReviewCloneRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let user = match current_user(request) {
            Ok(user) => user,
            Err(response) => return Ok(response),
        };
        let storage = self.get_storage(request);
        let max_length = AppConfig::get().discussion.max_message_length;

        match workflow::review_clone(storage.as_ref(), &user, clone_id, review_request, max_length)
            .await
        {
            Ok(clone) => Ok(clone_ok(clone, &user, "Clone reviewed")),
            Err(e) => Ok(clone_error(&e)),
        }
    }

    pub async fn update_analysis(
        &self,
        clone_id: i64,
        analysis_request: UpdateAnalysisRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let user = match current_user(request) {
            Ok(user) => user,
            Err(response) => return Ok(response),
        };
        let storage = self.get_storage(request);

        match workflow::update_analysis(
            storage.as_ref(),
            &user,
            clone_id,
            analysis_request.analysis,
        )
        .await
        {
            Ok(clone) => Ok(clone_ok(clone, &user, "Analysis saved")),
            Err(e @ CloneLabError::Authorization(_)) => {
                Ok(error_response_with_code(&e, ErrorCode::CloneNotEditable))
            }
            Err(e) => Ok(clone_error(&e)),
        }
    }

    pub async fn delete_clone(
        &self,
        clone_id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let user = match current_user(request) {
            Ok(user) => user,
            Err(response) => return Ok(response),
        };
        let storage = self.get_storage(request);

        match delete::delete_clone(storage.as_ref(), &user, clone_id).await {
            Ok(()) => Ok(HttpResponse::Ok()
                .json(ApiResponse::success_empty("Clone deleted successfully"))),
            Err(e @ CloneLabError::Validation(_)) => {
                Ok(error_response_with_code(&e, ErrorCode::CloneStillAssigned))
            }
            Err(e) => Ok(clone_error(&e)),
        }
    }

    pub async fn post_message(
        &self,
        clone_id: i64,
        post_request: PostMessageRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let user = match current_user(request) {
            Ok(user) => user,
            Err(response) => return Ok(response),
        };
        let storage = self.get_storage(request);
        let max_length = AppConfig::get().discussion.max_message_length;

        match messages::post_clone_message(
            storage.as_ref(),
            &user,
            clone_id,
            &post_request.content,
            max_length,
        )
        .await
        {
            Ok(message) => Ok(HttpResponse::Created().json(ApiResponse::success(
                PostMessageResponse { message },
                "Message sent",
            ))),
            Err(e @ CloneLabError::Validation(_)) => {
                Ok(error_response_with_code(&e, ErrorCode::DiscussionMessageInvalid))
            }
            Err(e) => Ok(clone_error(&e)),
        }
    }
}
