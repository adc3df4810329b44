use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::discussions::requests::{
    DiscussionListParams, GeneralThreadParams, PostMessageRequest,
};
use crate::models::users::entities::UserRole;
use crate::services::DiscussionService;
use crate::utils::SafeIDI64;

// 懒加载的全局 DiscussionService 实例
static DISCUSSION_SERVICE: Lazy<DiscussionService> = Lazy::new(DiscussionService::new_lazy);

pub async fn list_discussions(
    req: HttpRequest,
    query: web::Query<DiscussionListParams>,
) -> ActixResult<HttpResponse> {
    DISCUSSION_SERVICE
        .list_discussions(query.into_inner(), &req)
        .await
}

// 综合讨论（不关联克隆），不存在时创建
pub async fn general_thread(
    req: HttpRequest,
    query: web::Query<GeneralThreadParams>,
) -> ActixResult<HttpResponse> {
    DISCUSSION_SERVICE
        .general_thread(query.into_inner(), &req)
        .await
}

pub async fn list_messages(req: HttpRequest, path: SafeIDI64) -> ActixResult<HttpResponse> {
    DISCUSSION_SERVICE.list_messages(path.0, &req).await
}

pub async fn post_message(
    req: HttpRequest,
    path: SafeIDI64,
    body: web::Json<PostMessageRequest>,
) -> ActixResult<HttpResponse> {
    DISCUSSION_SERVICE
        .post_message(path.0, body.into_inner(), &req)
        .await
}

pub async fn mark_read(req: HttpRequest, path: SafeIDI64) -> ActixResult<HttpResponse> {
    DISCUSSION_SERVICE.mark_read(path.0, &req).await
}

pub async fn delete_discussion(req: HttpRequest, path: SafeIDI64) -> ActixResult<HttpResponse> {
    DISCUSSION_SERVICE.delete_discussion(path.0, &req).await
}

// 配置路由
pub fn configure_discussion_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/discussions")
            .wrap(middlewares::RequireJWT)
            .service(web::resource("").route(web::get().to(list_discussions)))
            .service(web::resource("/general").route(web::get().to(general_thread)))
            .service(
                web::resource("/{id}")
                    // 删除讨论 - 仅教师和负责人
                    .route(
                        web::delete()
                            .to(delete_discussion)
                            .wrap(middlewares::RequireRole::new_any(UserRole::staff_roles())),
                    ),
            )
            .service(
                web::resource("/{id}/messages")
                    .route(web::get().to(list_messages))
                    .route(web::post().to(post_message)),
            )
            .service(web::resource("/{id}/mark-read").route(web::patch().to(mark_read))),
    );
}
