//! 克隆的可见性与管理权限

use crate::errors::{CloneLabError, Result};
use crate::models::clones::{
    entities::{CloneKind, CloneSubmission},
    requests::CloneScope,
    status::CloneStatus,
};
use crate::models::users::entities::{User, UserRole};
use crate::storage::Storage;

pub(crate) async fn load_clone(storage: &dyn Storage, id: i64) -> Result<CloneSubmission> {
    storage
        .get_clone_by_id(id)
        .await?
        .ok_or_else(|| CloneLabError::not_found(format!("Clone {id} not found")))
}

/// 学生可见：分配给自己的，或仍可领取的练习克隆
pub(crate) fn can_view(user: &User, clone: &CloneSubmission) -> bool {
    match user.role {
        UserRole::Student => {
            clone.is_assigned_to(user.id)
                || (clone.kind == CloneKind::Practice
                    && clone.status.known() == Some(CloneStatus::Available))
        }
        _ => user.can_see_school(clone.school_id),
    }
}

pub(crate) fn ensure_can_view(user: &User, clone: &CloneSubmission) -> Result<()> {
    if can_view(user, clone) {
        Ok(())
    } else {
        Err(CloneLabError::authorization(format!(
            "You do not have access to clone {}",
            clone.id
        )))
    }
}

/// 教职人员管理范围：负责人全部，教师仅本校
pub(crate) fn ensure_can_manage(user: &User, clone: &CloneSubmission) -> Result<()> {
    if user.role.is_staff() && user.can_see_school(clone.school_id) {
        Ok(())
    } else {
        Err(CloneLabError::authorization(format!(
            "You cannot manage clone {}",
            clone.id
        )))
    }
}

pub(crate) fn ensure_assignee(user: &User, clone: &CloneSubmission) -> Result<()> {
    if clone.is_assigned_to(user.id) {
        Ok(())
    } else {
        Err(CloneLabError::authorization(format!(
            "Clone {} is not assigned to you",
            clone.id
        )))
    }
}

pub(crate) fn list_scope(user: &User) -> Result<CloneScope> {
    match (user.role, user.school_id) {
        (UserRole::Director, _) => Ok(CloneScope::All),
        (UserRole::Instructor, Some(school_id)) => Ok(CloneScope::School(school_id)),
        (UserRole::Instructor, None) => Err(CloneLabError::authorization(
            "Instructor account is not attached to a school",
        )),
        (UserRole::Student, _) => Ok(CloneScope::Student(user.id)),
    }
}
