use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::clones::requests::{
    AssignCloneRequest, CloneListParams, CreateCloneRequest, ReviewCloneRequest,
    SubmitCloneRequest, UpdateAnalysisRequest, UpdateCloneStatusRequest,
};
use crate::models::discussions::requests::PostMessageRequest;
use crate::models::users::entities::UserRole;
use crate::services::CloneService;
use crate::utils::SafeIDI64;

// 懒加载的全局 CloneService 实例
static CLONE_SERVICE: Lazy<CloneService> = Lazy::new(CloneService::new_lazy);

// 列出克隆（业务层按角色过滤）
pub async fn list_clones(
    req: HttpRequest,
    query: web::Query<CloneListParams>,
) -> ActixResult<HttpResponse> {
    CLONE_SERVICE.list_clones(query.into_inner(), &req).await
}

pub async fn create_clone(
    req: HttpRequest,
    body: web::Json<CreateCloneRequest>,
) -> ActixResult<HttpResponse> {
    CLONE_SERVICE.create_clone(body.into_inner(), &req).await
}

// 状态选项与展示配置
pub async fn status_catalog() -> ActixResult<HttpResponse> {
    CLONE_SERVICE.status_catalog().await
}

pub async fn get_clone(req: HttpRequest, path: SafeIDI64) -> ActixResult<HttpResponse> {
    CLONE_SERVICE.get_clone(path.0, &req).await
}

pub async fn delete_clone(req: HttpRequest, path: SafeIDI64) -> ActixResult<HttpResponse> {
    CLONE_SERVICE.delete_clone(path.0, &req).await
}

// 分配 / 取消分配 / 学生领取练习克隆
pub async fn assign_clone(
    req: HttpRequest,
    path: SafeIDI64,
    body: web::Json<AssignCloneRequest>,
) -> ActixResult<HttpResponse> {
    CLONE_SERVICE
        .assign_clone(path.0, body.into_inner(), &req)
        .await
}

pub async fn update_status(
    req: HttpRequest,
    path: SafeIDI64,
    body: web::Json<UpdateCloneStatusRequest>,
) -> ActixResult<HttpResponse> {
    CLONE_SERVICE
        .update_status(path.0, body.into_inner(), &req)
        .await
}

// 请求体可省略
pub async fn submit_clone(
    req: HttpRequest,
    path: SafeIDI64,
    body: Option<web::Json<SubmitCloneRequest>>,
) -> ActixResult<HttpResponse> {
    let submit = body.map(web::Json::into_inner).unwrap_or_default();
    CLONE_SERVICE.submit_clone(path.0, submit, &req).await
}

pub async fn review_clone(
    req: HttpRequest,
    path: SafeIDI64,
    body: web::Json<ReviewCloneRequest>,
) -> ActixResult<HttpResponse> {
    CLONE_SERVICE
        .review_clone(path.0, body.into_inner(), &req)
        .await
}

pub async fn update_analysis(
    req: HttpRequest,
    path: SafeIDI64,
    body: web::Json<UpdateAnalysisRequest>,
) -> ActixResult<HttpResponse> {
    CLONE_SERVICE
        .update_analysis(path.0, body.into_inner(), &req)
        .await
}

pub async fn post_clone_message(
    req: HttpRequest,
    path: SafeIDI64,
    body: web::Json<PostMessageRequest>,
) -> ActixResult<HttpResponse> {
    CLONE_SERVICE
        .post_message(path.0, body.into_inner(), &req)
        .await
}

// 配置路由
pub fn configure_clone_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/clones")
            .wrap(middlewares::RequireJWT)
            .service(
                web::resource("")
                    .route(web::get().to(list_clones))
                    // 创建克隆 - 仅教师和负责人
                    .route(
                        web::post()
                            .to(create_clone)
                            .wrap(middlewares::RequireRole::new_any(UserRole::staff_roles())),
                    ),
            )
            // 必须在 /{id} 之前注册
            .service(web::resource("/statuses").route(web::get().to(status_catalog)))
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_clone))
                    .route(
                        web::delete()
                            .to(delete_clone)
                            .wrap(middlewares::RequireRole::new_any(UserRole::staff_roles())),
                    ),
            )
            .service(web::resource("/{id}/assign").route(web::put().to(assign_clone)))
            .service(
                web::resource("/{id}/status").route(
                    web::put()
                        .to(update_status)
                        .wrap(middlewares::RequireRole::new_any(UserRole::staff_roles())),
                ),
            )
            .service(
                web::resource("/{id}/submit").route(
                    web::post()
                        .to(submit_clone)
                        .wrap(middlewares::RequireRole::new(UserRole::Student)),
                ),
            )
            .service(
                web::resource("/{id}/review").route(
                    web::post()
                        .to(review_clone)
                        .wrap(middlewares::RequireRole::new_any(UserRole::staff_roles())),
                ),
            )
            .service(
                web::resource("/{id}/analysis").route(
                    web::put()
                        .to(update_analysis)
                        .wrap(middlewares::RequireRole::new(UserRole::Student)),
                ),
            )
            .service(web::resource("/{id}/messages").route(web::post().to(post_clone_message))),
    );
}
