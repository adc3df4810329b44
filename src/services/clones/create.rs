use tracing::info;

use crate::errors::{CloneLabError, Result};
use crate::models::clones::{entities::CloneSubmission, requests::CreateCloneRequest};
use crate::models::users::entities::{User, UserRole};
use crate::storage::Storage;

/// 创建克隆：教师只能建在本校，负责人可指定任意已存在的学校
pub async fn create_clone(
    storage: &dyn Storage,
    user: &User,
    mut req: CreateCloneRequest,
) -> Result<CloneSubmission> {
    match user.role {
        UserRole::Student => {
            return Err(CloneLabError::authorization(
                "Only instructors and directors can create clones",
            ));
        }
        UserRole::Instructor => {
            let school_id = user.school_id.ok_or_else(|| {
                CloneLabError::authorization("Instructor account is not attached to a school")
            })?;
            req.school_id = Some(school_id);
        }
        UserRole::Director => {
            if let Some(school_id) = req.school_id
                && storage.get_school_by_id(school_id).await?.is_none()
            {
                return Err(CloneLabError::validation(format!(
                    "School {school_id} does not exist"
                )));
            }
        }
    }

    let clone = storage.create_clone(req, user.id).await?;
    info!(
        clone_id = clone.id,
        kind = clone.kind.as_str(),
        created_by = user.id,
        "Clone created"
    );
    Ok(clone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::clones::entities::CloneKind;
    use crate::models::clones::status::CloneStatus;
    use crate::storage::sea_orm_storage::test_support::{seed_user, test_storage};

    fn request(kind: CloneKind, school_id: Option<i64>) -> CreateCloneRequest {
        CreateCloneRequest {
            name: "Clone A1".to_string(),
            kind,
            school_id,
        }
    }

    #[tokio::test]
    async fn test_initial_status_follows_kind() {
        let storage = test_storage().await;
        let director = seed_user(&storage, "director1", UserRole::Director, None).await;

        let research = create_clone(&storage, &director, request(CloneKind::Research, None))
            .await
            .unwrap();
        assert_eq!(research.status.known(), Some(CloneStatus::Unassigned));

        let practice = create_clone(&storage, &director, request(CloneKind::Practice, None))
            .await
            .unwrap();
        assert_eq!(practice.status.known(), Some(CloneStatus::Available));
    }

    #[tokio::test]
    async fn test_instructor_school_is_forced() {
        let storage = test_storage().await;
        let north = storage.create_school_impl("North").await.unwrap();
        let south = storage.create_school_impl("South").await.unwrap();
        let instructor =
            seed_user(&storage, "instructor1", UserRole::Instructor, Some(north.id)).await;

        let clone = create_clone(
            &storage,
            &instructor,
            request(CloneKind::Research, Some(south.id)),
        )
        .await
        .unwrap();
        assert_eq!(clone.school_id, Some(north.id));
    }

    #[tokio::test]
    async fn test_student_and_unknown_school_rejected() {
        let storage = test_storage().await;
        let student = seed_user(&storage, "student1", UserRole::Student, None).await;
        let director = seed_user(&storage, "director1", UserRole::Director, None).await;

        let err = create_clone(&storage, &student, request(CloneKind::Research, None))
            .await
            .unwrap_err();
        assert!(matches!(err, CloneLabError::Authorization(_)));

        let err = create_clone(&storage, &director, request(CloneKind::Research, Some(404)))
            .await
            .unwrap_err();
        assert!(matches!(err, CloneLabError::Validation(_)));
    }
}
