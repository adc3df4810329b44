use tracing::info;

use super::access::{ensure_can_manage, load_clone};
use crate::errors::{CloneLabError, Result};
use crate::models::users::entities::User;
use crate::storage::Storage;

/// 删除克隆；仍分配给学生时由存储层拒绝
pub async fn delete_clone(storage: &dyn Storage, user: &User, clone_id: i64) -> Result<()> {
    let clone = load_clone(storage, clone_id).await?;
    ensure_can_manage(user, &clone)?;

    if storage.delete_clone(clone.id).await? {
        info!(clone_id, deleted_by = user.id, "Clone removed");
        Ok(())
    } else {
        Err(CloneLabError::not_found(format!("Clone {clone_id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::clones::entities::CloneKind;
    use crate::models::users::entities::UserRole;
    use crate::services::clones::workflow::assign_clone;
    use crate::storage::sea_orm_storage::test_support::{seed_clone, seed_user, test_storage};

    #[tokio::test]
    async fn test_assigned_clone_cannot_be_deleted() {
        let storage = test_storage().await;
        let director = seed_user(&storage, "director1", UserRole::Director, None).await;
        let student = seed_user(&storage, "student1", UserRole::Student, None).await;
        let clone = seed_clone(&storage, CloneKind::Research, None, director.id).await;
        assign_clone(&storage, &director, clone.id, Some(student.id))
            .await
            .unwrap();

        let err = delete_clone(&storage, &director, clone.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CloneLabError::Validation(_)));
        assert!(storage.get_clone_by_id_impl(clone.id).await.unwrap().is_some());

        assign_clone(&storage, &director, clone.id, None)
            .await
            .unwrap();
        delete_clone(&storage, &director, clone.id).await.unwrap();
        assert!(storage.get_clone_by_id_impl(clone.id).await.unwrap().is_none());

        let err = delete_clone(&storage, &director, clone.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CloneLabError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_student_cannot_delete() {
        let storage = test_storage().await;
        let director = seed_user(&storage, "director1", UserRole::Director, None).await;
        let student = seed_user(&storage, "student1", UserRole::Student, None).await;
        let clone = seed_clone(&storage, CloneKind::Practice, None, director.id).await;

        let err = delete_clone(&storage, &student, clone.id).await.unwrap_err();
        assert!(matches!(err, CloneLabError::Authorization(_)));
    }
}
