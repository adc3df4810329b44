use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::schools::{CreateSchoolRequest, SchoolListResponse};
use crate::models::{ApiResponse, ErrorCode};
use crate::storage::Storage;

pub struct SchoolService {
    storage: Option<Arc<dyn Storage>>,
}

impl SchoolService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Arc<dyn Storage> {
        match &self.storage {
            Some(storage) => storage.clone(),
            None => super::storage_from_request(request),
        }
    }

    pub async fn list_schools(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        let storage = self.get_storage(request);
        match storage.list_schools().await {
            Ok(items) => Ok(HttpResponse::Ok().json(ApiResponse::success(
                SchoolListResponse { items },
                "School list retrieved successfully",
            ))),
            Err(e) => Ok(super::error_response(&e)),
        }
    }

    pub async fn create_school(
        &self,
        create_request: CreateSchoolRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        let name = create_request.name.trim();
        if name.is_empty() {
            return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
                ErrorCode::BadRequest,
                "School name must not be empty",
            )));
        }

        let storage = self.get_storage(request);
        match storage.create_school(name).await {
            Ok(school) => Ok(HttpResponse::Created()
                .json(ApiResponse::success(school, "School created successfully"))),
            Err(e @ crate::errors::CloneLabError::Validation(_)) => Ok(
                super::error_response_with_code(&e, ErrorCode::SchoolAlreadyExists),
            ),
            Err(e) => Ok(super::error_response(&e)),
        }
    }
}
