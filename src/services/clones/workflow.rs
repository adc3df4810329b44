//! 克隆工作流：分配、改状态、提交、审阅、保存分析
//!
//! 所有状态写入都经过 `Storage::transition_clone`，迁移校验与版本检查在那里完成。

use tracing::{info, warn};

use super::access::{ensure_assignee, ensure_can_manage, ensure_can_view, load_clone};
use crate::errors::{CloneLabError, Result};
use crate::models::clones::{
    entities::{CloneKind, CloneSubmission},
    requests::{ReviewCloneRequest, UpdateCloneStatusRequest},
    status::{CloneStatus, review_action, submission_target},
};
use crate::models::discussions::entities::MessageType;
use crate::models::users::entities::{User, UserRole};
use crate::services::discussions::{access::ensure_student_in_scope, operations};
use crate::storage::{CloneTransition, Storage};

/// 分配或取消分配
///
/// 学生只能领取可用的练习克隆给自己。
pub async fn assign_clone(
    storage: &dyn Storage,
    user: &User,
    clone_id: i64,
    student_id: Option<i64>,
) -> Result<CloneSubmission> {
    let clone = load_clone(storage, clone_id).await?;

    if user.role == UserRole::Student {
        ensure_can_view(user, &clone)?;
        if clone.kind != CloneKind::Practice || student_id != Some(user.id) {
            return Err(CloneLabError::authorization(
                "Students can only claim practice clones for themselves",
            ));
        }
        return storage
            .transition_clone(
                clone.id,
                CloneTransition::to(CloneStatus::BeingWorkedOn)
                    .expecting(Some(clone.version))
                    .assign(Some(user.id)),
            )
            .await;
    }

    ensure_can_manage(user, &clone)?;
    match student_id {
        Some(student_id) => {
            let student = ensure_student_in_scope(storage, user, student_id).await?;
            if student.role != UserRole::Student {
                return Err(CloneLabError::validation(format!(
                    "User {student_id} is not a student"
                )));
            }
            let mut change = CloneTransition::to(CloneStatus::BeingWorkedOn)
                .expecting(Some(clone.version))
                .assign(Some(student.id));
            // 换人后上一位学生的分析与审阅记录作废
            if clone.assigned_to.is_some_and(|previous| previous != student.id) {
                change = change.reset_work();
            }
            let updated = storage.transition_clone(clone.id, change).await?;
            info!(clone_id, student_id, assigned_by = user.id, "Clone assigned");
            Ok(updated)
        }
        None => {
            let updated = storage
                .transition_clone(
                    clone.id,
                    CloneTransition::to(clone.kind.initial_status())
                        .expecting(Some(clone.version))
                        .assign(None)
                        .reset_work(),
                )
                .await?;
            info!(clone_id, unassigned_by = user.id, "Clone unassigned");
            Ok(updated)
        }
    }
}

pub async fn update_status(
    storage: &dyn Storage,
    user: &User,
    clone_id: i64,
    req: UpdateCloneStatusRequest,
) -> Result<CloneSubmission> {
    let clone = load_clone(storage, clone_id).await?;
    ensure_can_manage(user, &clone)?;
    // 释放必须同时清空分配，只能走分配接口
    if matches!(req.status, CloneStatus::Unassigned | CloneStatus::Available) {
        return Err(CloneLabError::validation(
            "Release a clone through the assignment endpoint",
        ));
    }
    storage
        .transition_clone(
            clone.id,
            CloneTransition::to(req.status).expecting(req.expected_version),
        )
        .await
}

pub async fn submit_clone(
    storage: &dyn Storage,
    user: &User,
    clone_id: i64,
    expected_version: Option<i32>,
) -> Result<CloneSubmission> {
    let clone = load_clone(storage, clone_id).await?;
    ensure_assignee(user, &clone)?;

    let target = submission_target(clone.status.known(), clone.previously_reviewed())
        .ok_or_else(|| {
            CloneLabError::illegal_status_transition(
                clone.status.raw().unwrap_or("none"),
                "waiting review",
            )
        })?;

    storage
        .transition_clone(
            clone.id,
            CloneTransition::to(target).expecting(Some(expected_version.unwrap_or(clone.version))),
        )
        .await
}

/// 审阅；有反馈时同时写入该克隆的讨论
pub async fn review_clone(
    storage: &dyn Storage,
    user: &User,
    clone_id: i64,
    req: ReviewCloneRequest,
    max_message_length: usize,
) -> Result<CloneSubmission> {
    let clone = load_clone(storage, clone_id).await?;
    ensure_can_manage(user, &clone)?;

    let to = review_action(req.decision);
    if !clone.status.review_ready() {
        return Err(CloneLabError::illegal_status_transition(
            clone.status.raw().unwrap_or("none"),
            to.as_str(),
        ));
    }

    let feedback = match req.feedback.as_deref().map(str::trim) {
        Some("") | None => None,
        Some(text) if text.chars().count() > max_message_length => {
            return Err(CloneLabError::validation(format!(
                "Feedback must not exceed {max_message_length} characters"
            )));
        }
        Some(text) => Some(text.to_string()),
    };

    // 反馈要写进学生的讨论，先确认审阅人能进入该讨论，再落库状态
    if feedback.is_some()
        && let Some(student_id) = clone.assigned_to
    {
        ensure_student_in_scope(storage, user, student_id).await?;
    }

    let reviewed = storage
        .transition_clone(
            clone.id,
            CloneTransition::to(to)
                .expecting(Some(req.expected_version.unwrap_or(clone.version)))
                .reviewed(user.id, feedback.clone()),
        )
        .await?;

    if let (Some(text), Some(student_id)) = (feedback, reviewed.assigned_to) {
        let thread = storage
            .get_or_create_discussion(student_id, Some(reviewed.id))
            .await?;
        // 状态已落库，反馈消息失败只记录
        if let Err(e) = operations::post_message(
            storage,
            user,
            thread.id,
            &text,
            MessageType::Feedback,
            max_message_length,
        )
        .await
        {
            warn!(clone_id, "Failed to post review feedback to discussion: {e}");
        }
    }

    Ok(reviewed)
}

pub async fn update_analysis(
    storage: &dyn Storage,
    user: &User,
    clone_id: i64,
    analysis: serde_json::Value,
) -> Result<CloneSubmission> {
    if user.role != UserRole::Student {
        return Err(CloneLabError::authorization(
            "Only the assigned student can edit the analysis",
        ));
    }
    storage
        .update_clone_analysis(clone_id, user.id, analysis)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::clones::status::ReviewDecision;
    use crate::models::discussions::read_tracking::ParticipantSide;
    use crate::storage::sea_orm_storage::test_support::{seed_clone, seed_user, test_storage};

    fn review(decision: ReviewDecision, feedback: Option<&str>) -> ReviewCloneRequest {
        ReviewCloneRequest {
            decision,
            feedback: feedback.map(str::to_string),
            expected_version: None,
        }
    }

    #[tokio::test]
    async fn test_full_cycle_with_resubmission() {
        let storage = test_storage().await;
        let director = seed_user(&storage, "director1", UserRole::Director, None).await;
        let student = seed_user(&storage, "student1", UserRole::Student, None).await;
        let clone = seed_clone(&storage, CloneKind::Research, None, director.id).await;

        assign_clone(&storage, &director, clone.id, Some(student.id))
            .await
            .unwrap();
        let submitted = submit_clone(&storage, &student, clone.id, None)
            .await
            .unwrap();
        assert_eq!(
            submitted.status.known(),
            Some(CloneStatus::CompletedWaitingReview)
        );

        let rejected = review_clone(
            &storage,
            &director,
            clone.id,
            review(ReviewDecision::Rejected, Some("Trim the vector sequence")),
            1000,
        )
        .await
        .unwrap();
        assert_eq!(rejected.status.known(), Some(CloneStatus::NeedsReanalysis));
        assert_eq!(rejected.feedback.as_deref(), Some("Trim the vector sequence"));

        let resubmitted = submit_clone(&storage, &student, clone.id, None)
            .await
            .unwrap();
        assert_eq!(
            resubmitted.status.known(),
            Some(CloneStatus::CorrectedWaitingReview)
        );

        let approved = review_clone(
            &storage,
            &director,
            clone.id,
            review(ReviewDecision::Approved, None),
            1000,
        )
        .await
        .unwrap();
        assert_eq!(approved.status.known(), Some(CloneStatus::ReviewedCorrect));
    }

    #[tokio::test]
    async fn test_review_feedback_lands_in_clone_thread() {
        let storage = test_storage().await;
        let director = seed_user(&storage, "director1", UserRole::Director, None).await;
        let student = seed_user(&storage, "student1", UserRole::Student, None).await;
        let clone = seed_clone(&storage, CloneKind::Research, None, director.id).await;

        assign_clone(&storage, &director, clone.id, Some(student.id))
            .await
            .unwrap();
        submit_clone(&storage, &student, clone.id, None)
            .await
            .unwrap();
        review_clone(
            &storage,
            &director,
            clone.id,
            review(ReviewDecision::Rejected, Some("Check the BLAST hit")),
            1000,
        )
        .await
        .unwrap();

        let thread = storage
            .get_or_create_discussion_impl(student.id, Some(clone.id))
            .await
            .unwrap();
        let messages = storage.list_messages_impl(thread.id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message_type, MessageType::Feedback);
        assert_eq!(messages[0].content, "Check the BLAST hit");

        let ledger = storage.get_read_state_impl(thread.id).await.unwrap();
        assert_eq!(ledger.unread_for(ParticipantSide::Student), 1);
    }

    #[tokio::test]
    async fn test_review_requires_review_ready() {
        let storage = test_storage().await;
        let director = seed_user(&storage, "director1", UserRole::Director, None).await;
        let student = seed_user(&storage, "student1", UserRole::Student, None).await;
        let clone = seed_clone(&storage, CloneKind::Research, None, director.id).await;
        assign_clone(&storage, &director, clone.id, Some(student.id))
            .await
            .unwrap();

        let err = review_clone(
            &storage,
            &director,
            clone.id,
            review(ReviewDecision::Approved, None),
            1000,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CloneLabError::IllegalTransition(_)));

        let err = submit_clone(&storage, &director, clone.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CloneLabError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_unassign_and_student_claim() {
        let storage = test_storage().await;
        let director = seed_user(&storage, "director1", UserRole::Director, None).await;
        let student = seed_user(&storage, "student1", UserRole::Student, None).await;
        let research = seed_clone(&storage, CloneKind::Research, None, director.id).await;
        let practice = seed_clone(&storage, CloneKind::Practice, None, director.id).await;

        assign_clone(&storage, &director, research.id, Some(student.id))
            .await
            .unwrap();
        let unassigned = assign_clone(&storage, &director, research.id, None)
            .await
            .unwrap();
        assert_eq!(unassigned.status.known(), Some(CloneStatus::Unassigned));
        assert_eq!(unassigned.assigned_to, None);

        let err = assign_clone(&storage, &student, research.id, Some(student.id))
            .await
            .unwrap_err();
        assert!(matches!(err, CloneLabError::Authorization(_)));

        let claimed = assign_clone(&storage, &student, practice.id, Some(student.id))
            .await
            .unwrap();
        assert_eq!(claimed.assigned_to, Some(student.id));
        assert_eq!(claimed.status.known(), Some(CloneStatus::BeingWorkedOn));
    }

    #[tokio::test]
    async fn test_analysis_locked_while_waiting_review() {
        let storage = test_storage().await;
        let director = seed_user(&storage, "director1", UserRole::Director, None).await;
        let student = seed_user(&storage, "student1", UserRole::Student, None).await;
        let other = seed_user(&storage, "student2", UserRole::Student, None).await;
        let clone = seed_clone(&storage, CloneKind::Research, None, director.id).await;
        assign_clone(&storage, &director, clone.id, Some(student.id))
            .await
            .unwrap();

        let saved = update_analysis(
            &storage,
            &student,
            clone.id,
            serde_json::json!({"vector": "pUC19"}),
        )
        .await
        .unwrap();
        assert_eq!(saved.analysis, Some(serde_json::json!({"vector": "pUC19"})));

        let err = update_analysis(&storage, &other, clone.id, serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, CloneLabError::Authorization(_)));

        submit_clone(&storage, &student, clone.id, None)
            .await
            .unwrap();
        let err = update_analysis(&storage, &student, clone.id, serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, CloneLabError::Authorization(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_racing_reviews_one_wins() {
        let storage = test_storage().await;
        let director = seed_user(&storage, "director1", UserRole::Director, None).await;
        let student = seed_user(&storage, "student1", UserRole::Student, None).await;
        let clone = seed_clone(&storage, CloneKind::Research, None, director.id).await;
        assign_clone(&storage, &director, clone.id, Some(student.id))
            .await
            .unwrap();
        let submitted = submit_clone(&storage, &student, clone.id, None)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for decision in [ReviewDecision::Approved, ReviewDecision::Rejected] {
            let storage = storage.clone();
            let director = director.clone();
            let clone_id = clone.id;
            let version = submitted.version;
            handles.push(tokio::spawn(async move {
                review_clone(
                    &storage,
                    &director,
                    clone_id,
                    ReviewCloneRequest {
                        decision,
                        feedback: None,
                        expected_version: Some(version),
                    },
                    1000,
                )
                .await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(CloneLabError::ConcurrencyConflict(_))
                | Err(CloneLabError::IllegalTransition(_)) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn test_released_practice_clone_can_be_claimed_again() {
        let storage = test_storage().await;
        let director = seed_user(&storage, "director1", UserRole::Director, None).await;
        let first = seed_user(&storage, "student1", UserRole::Student, None).await;
        let second = seed_user(&storage, "student2", UserRole::Student, None).await;
        let practice = seed_clone(&storage, CloneKind::Practice, None, director.id).await;

        assign_clone(&storage, &first, practice.id, Some(first.id))
            .await
            .unwrap();
        update_analysis(
            &storage,
            &first,
            practice.id,
            serde_json::json!({"orf": "half done"}),
        )
        .await
        .unwrap();

        let released = assign_clone(&storage, &director, practice.id, None)
            .await
            .unwrap();
        assert_eq!(released.status.known(), Some(CloneStatus::Available));
        assert_eq!(released.assigned_to, None);
        assert!(released.analysis.is_none());

        let claimed = assign_clone(&storage, &second, practice.id, Some(second.id))
            .await
            .unwrap();
        assert_eq!(claimed.assigned_to, Some(second.id));
        assert_eq!(claimed.status.known(), Some(CloneStatus::BeingWorkedOn));
    }

    #[tokio::test]
    async fn test_reassignment_starts_the_new_student_fresh() {
        let storage = test_storage().await;
        let director = seed_user(&storage, "director1", UserRole::Director, None).await;
        let first = seed_user(&storage, "student1", UserRole::Student, None).await;
        let second = seed_user(&storage, "student2", UserRole::Student, None).await;
        let clone = seed_clone(&storage, CloneKind::Research, None, director.id).await;

        assign_clone(&storage, &director, clone.id, Some(first.id))
            .await
            .unwrap();
        update_analysis(
            &storage,
            &first,
            clone.id,
            serde_json::json!({"vector": "pUC19"}),
        )
        .await
        .unwrap();
        submit_clone(&storage, &first, clone.id, None)
            .await
            .unwrap();
        let approved = review_clone(
            &storage,
            &director,
            clone.id,
            review(ReviewDecision::Approved, Some("Clean reads")),
            1000,
        )
        .await
        .unwrap();
        assert_eq!(approved.status.known(), Some(CloneStatus::ReviewedCorrect));

        let reassigned = assign_clone(&storage, &director, clone.id, Some(second.id))
            .await
            .unwrap();
        assert_eq!(reassigned.assigned_to, Some(second.id));
        assert!(reassigned.analysis.is_none());
        assert!(reassigned.feedback.is_none());
        assert!(reassigned.reviewed_by.is_none());
        assert!(reassigned.reviewed_at.is_none());

        let submitted = submit_clone(&storage, &second, clone.id, None)
            .await
            .unwrap();
        assert_eq!(
            submitted.status.known(),
            Some(CloneStatus::CompletedWaitingReview)
        );
    }

    #[tokio::test]
    async fn test_status_update_cannot_release() {
        let storage = test_storage().await;
        let director = seed_user(&storage, "director1", UserRole::Director, None).await;
        let student = seed_user(&storage, "student1", UserRole::Student, None).await;
        let clone = seed_clone(&storage, CloneKind::Practice, None, director.id).await;
        assign_clone(&storage, &director, clone.id, Some(student.id))
            .await
            .unwrap();

        for status in [CloneStatus::Available, CloneStatus::Unassigned] {
            let err = update_status(
                &storage,
                &director,
                clone.id,
                UpdateCloneStatusRequest {
                    status,
                    expected_version: None,
                },
            )
            .await
            .unwrap_err();
            assert!(matches!(err, CloneLabError::Validation(_)));
        }
        let after = load_clone(&storage, clone.id).await.unwrap();
        assert_eq!(after.assigned_to, Some(student.id));
        assert_eq!(after.status.known(), Some(CloneStatus::BeingWorkedOn));
    }

    #[tokio::test]
    async fn test_feedback_outside_student_scope_is_refused_before_review() {
        let storage = test_storage().await;
        let north = storage.create_school_impl("North").await.unwrap();
        let south = storage.create_school_impl("South").await.unwrap();
        let director = seed_user(&storage, "director1", UserRole::Director, None).await;
        let instructor =
            seed_user(&storage, "inst0001", UserRole::Instructor, Some(north.id)).await;
        let student = seed_user(&storage, "student1", UserRole::Student, Some(south.id)).await;
        let clone = seed_clone(&storage, CloneKind::Research, Some(north.id), director.id).await;

        assign_clone(&storage, &director, clone.id, Some(student.id))
            .await
            .unwrap();
        let submitted = submit_clone(&storage, &student, clone.id, None)
            .await
            .unwrap();

        let err = review_clone(
            &storage,
            &instructor,
            clone.id,
            review(ReviewDecision::Rejected, Some("Re-run the alignment")),
            1000,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CloneLabError::Authorization(_)));

        let after = load_clone(&storage, clone.id).await.unwrap();
        assert_eq!(after.version, submitted.version);
        assert_eq!(
            after.status.known(),
            Some(CloneStatus::CompletedWaitingReview)
        );
        assert!(after.feedback.is_none());

        // 负责人可以进入任何讨论，反馈正常送达
        review_clone(
            &storage,
            &director,
            clone.id,
            review(ReviewDecision::Rejected, Some("Re-run the alignment")),
            1000,
        )
        .await
        .unwrap();
        let thread = storage
            .get_or_create_discussion_impl(student.id, Some(clone.id))
            .await
            .unwrap();
        let messages = storage.list_messages_impl(thread.id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "Re-run the alignment");
    }
}
