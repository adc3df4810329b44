//! 讨论相关的业务操作
//!
//! 这里的函数只依赖 `Storage`，由 HTTP 处理程序和克隆服务共同调用。

use tracing::info;

use super::access::{ensure_participant, ensure_student_in_scope, list_scope, load_discussion};
use crate::errors::{CloneLabError, Result};
use crate::models::discussions::{
    entities::{Discussion, DiscussionMessage, MessageType},
    read_tracking::{ParticipantSide, SideState, side_for_role},
    responses::DiscussionSummary,
};
use crate::models::users::entities::{User, UserRole};
use crate::storage::Storage;
use crate::utils::validate::validate_message_content;

/// 新消息通知；目前只记录事件，不做投递
fn notify_new_message(
    discussion: &Discussion,
    message: &DiscussionMessage,
    sender: ParticipantSide,
) {
    info!(
        target: "clonelab::notifications",
        discussion_id = discussion.id,
        student_id = discussion.student_id,
        clone_id = ?discussion.clone_id,
        seq = message.seq,
        recipient_side = sender.counterpart().as_str(),
        message_type = message.message_type.as_str(),
        "New discussion message"
    );
}

pub async fn post_message(
    storage: &dyn Storage,
    user: &User,
    discussion_id: i64,
    content: &str,
    message_type: MessageType,
    max_length: usize,
) -> Result<DiscussionMessage> {
    let content =
        validate_message_content(content, max_length).map_err(CloneLabError::validation)?;
    let discussion = load_discussion(storage, discussion_id).await?;
    ensure_participant(storage, user, &discussion).await?;

    let side = side_for_role(user.role);
    let message = storage
        .post_message(discussion.id, user.id, side, content, message_type)
        .await?;

    notify_new_message(&discussion, &message, side);
    Ok(message)
}

pub async fn mark_read(
    storage: &dyn Storage,
    user: &User,
    discussion_id: i64,
) -> Result<SideState> {
    let discussion = load_discussion(storage, discussion_id).await?;
    ensure_participant(storage, user, &discussion).await?;
    storage
        .mark_read(discussion.id, side_for_role(user.role))
        .await
}

pub async fn list_messages(
    storage: &dyn Storage,
    user: &User,
    discussion_id: i64,
) -> Result<Vec<DiscussionMessage>> {
    let discussion = load_discussion(storage, discussion_id).await?;
    ensure_participant(storage, user, &discussion).await?;
    storage.list_messages(discussion.id).await
}

pub async fn list_threads_for_user(
    storage: &dyn Storage,
    user: &User,
    unread_only: bool,
    preview_length: usize,
) -> Result<Vec<DiscussionSummary>> {
    let scope = list_scope(user)?;
    storage
        .list_discussions(scope, side_for_role(user.role), unread_only, preview_length)
        .await
}

/// 学生取自己的综合讨论；教职人员需指定学生
pub async fn get_or_create_general_thread(
    storage: &dyn Storage,
    user: &User,
    student_id: Option<i64>,
) -> Result<Discussion> {
    let student_id = match (user.role, student_id) {
        (UserRole::Student, None) => user.id,
        (UserRole::Student, Some(id)) if id == user.id => id,
        (UserRole::Student, Some(_)) => {
            return Err(CloneLabError::authorization(
                "Students can only open their own general discussion",
            ));
        }
        (_, Some(id)) => id,
        (_, None) => return Err(CloneLabError::validation("student_id is required")),
    };

    let student = ensure_student_in_scope(storage, user, student_id).await?;
    if student.role != UserRole::Student {
        return Err(CloneLabError::validation(format!(
            "User {student_id} is not a student"
        )));
    }

    storage.get_or_create_discussion(student.id, None).await
}

pub async fn delete_thread(storage: &dyn Storage, user: &User, discussion_id: i64) -> Result<()> {
    if !user.role.is_staff() {
        return Err(CloneLabError::authorization(
            "Only instructors and directors can delete discussions",
        ));
    }
    let discussion = load_discussion(storage, discussion_id).await?;
    ensure_participant(storage, user, &discussion).await?;

    if storage.delete_discussion(discussion.id).await? {
        info!(discussion_id, deleted_by = user.id, "Discussion deleted");
        Ok(())
    } else {
        Err(CloneLabError::not_found(format!(
            "Discussion {discussion_id} not found"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sea_orm_storage::test_support::{seed_user, test_storage};

    #[tokio::test]
    async fn test_post_validates_before_lookup() {
        let storage = test_storage().await;
        let student = seed_user(&storage, "student1", UserRole::Student, None).await;

        let err = post_message(&storage, &student, 999, "   ", MessageType::Message, 100)
            .await
            .unwrap_err();
        assert!(matches!(err, CloneLabError::Validation(_)));

        let err = post_message(&storage, &student, 999, "hello", MessageType::Message, 100)
            .await
            .unwrap_err();
        assert!(matches!(err, CloneLabError::NotFound(_)));

        let err = post_message(&storage, &student, 999, "toolong", MessageType::Message, 3)
            .await
            .unwrap_err();
        assert!(matches!(err, CloneLabError::Validation(_)));
    }

    #[tokio::test]
    async fn test_participants_and_scope() {
        let storage = test_storage().await;
        let north = storage.create_school_impl("North").await.unwrap();
        let south = storage.create_school_impl("South").await.unwrap();
        let student = seed_user(&storage, "student1", UserRole::Student, Some(north.id)).await;
        let other = seed_user(&storage, "student2", UserRole::Student, Some(north.id)).await;
        let local = seed_user(&storage, "instructor1", UserRole::Instructor, Some(north.id)).await;
        let remote = seed_user(&storage, "instructor2", UserRole::Instructor, Some(south.id)).await;

        let thread = get_or_create_general_thread(&storage, &student, None)
            .await
            .unwrap();

        let message = post_message(
            &storage,
            &student,
            thread.id,
            "  Primer question  ",
            MessageType::Message,
            100,
        )
        .await
        .unwrap();
        assert_eq!(message.content, "Primer question");
        assert_eq!(message.seq, 1);

        for outsider in [&other, &remote] {
            let err = post_message(&storage, outsider, thread.id, "hi", MessageType::Message, 100)
                .await
                .unwrap_err();
            assert!(matches!(err, CloneLabError::Authorization(_)));
        }

        let summaries = list_threads_for_user(&storage, &local, false, 120)
            .await
            .unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].unread_count, 1);
        assert!(
            list_threads_for_user(&storage, &remote, false, 120)
                .await
                .unwrap()
                .is_empty()
        );

        let state = mark_read(&storage, &local, thread.id).await.unwrap();
        assert_eq!(state.unread_count, 0);
        assert_eq!(state.last_read_seq, 1);

        // 教师打开同一学生的综合讨论得到同一个主题
        let same = get_or_create_general_thread(&storage, &local, Some(student.id))
            .await
            .unwrap();
        assert_eq!(same.id, thread.id);
        assert!(matches!(
            get_or_create_general_thread(&storage, &remote, Some(student.id)).await,
            Err(CloneLabError::Authorization(_))
        ));
        assert!(matches!(
            get_or_create_general_thread(&storage, &local, None).await,
            Err(CloneLabError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_requires_staff_in_scope() {
        let storage = test_storage().await;
        let north = storage.create_school_impl("North").await.unwrap();
        let south = storage.create_school_impl("South").await.unwrap();
        let student = seed_user(&storage, "student1", UserRole::Student, Some(north.id)).await;
        let local = seed_user(&storage, "instructor1", UserRole::Instructor, Some(north.id)).await;
        let remote = seed_user(&storage, "instructor2", UserRole::Instructor, Some(south.id)).await;
        let thread = get_or_create_general_thread(&storage, &student, None)
            .await
            .unwrap();

        assert!(matches!(
            delete_thread(&storage, &student, thread.id).await,
            Err(CloneLabError::Authorization(_))
        ));
        assert!(matches!(
            delete_thread(&storage, &remote, thread.id).await,
            Err(CloneLabError::Authorization(_))
        ));
        delete_thread(&storage, &local, thread.id).await.unwrap();
        assert!(matches!(
            list_messages(&storage, &local, thread.id).await,
            Err(CloneLabError::NotFound(_))
        ));
    }
}
