use crate::errors::Result;
use crate::models::PaginationInfo;
use crate::models::clones::{
    display::status_catalog,
    requests::{CloneListParams, CloneListQuery},
    responses::{CloneView, StatusCatalogResponse},
    status::selectable_statuses,
};
use crate::models::users::entities::User;
use crate::storage::Storage;

use super::access::{ensure_can_view, list_scope, load_clone};

pub async fn list_clones(
    storage: &dyn Storage,
    user: &User,
    params: CloneListParams,
) -> Result<(Vec<CloneView>, PaginationInfo)> {
    let (page, size) = params.pagination.normalized();
    let query = CloneListQuery {
        page,
        size,
        scope: list_scope(user)?,
        status: params.status,
        kind: params.kind,
        review_ready: params.review_ready.unwrap_or(false),
        assigned_to: params.assigned_to,
        search: params.search,
    };

    let staff = user.role.is_staff();
    let (clones, pagination) = storage.list_clones_with_pagination(query).await?;
    let items = clones
        .into_iter()
        .map(|clone| CloneView::build(clone, staff))
        .collect();
    Ok((items, pagination))
}

pub async fn get_clone(storage: &dyn Storage, user: &User, id: i64) -> Result<CloneView> {
    let clone = load_clone(storage, id).await?;
    ensure_can_view(user, &clone)?;
    Ok(CloneView::build(clone, user.role.is_staff()))
}

pub fn catalog() -> StatusCatalogResponse {
    StatusCatalogResponse {
        options: selectable_statuses(),
        displays: status_catalog(),
    }
}
