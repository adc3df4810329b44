use super::access::{ensure_assignee, ensure_can_manage, ensure_can_view, load_clone};
use crate::errors::{CloneLabError, Result};
use crate::models::discussions::entities::{DiscussionMessage, MessageType};
use crate::models::users::entities::{User, UserRole};
use crate::services::discussions::operations;
use crate::storage::Storage;

/// 在克隆的讨论中发消息，讨论不存在时创建
pub async fn post_clone_message(
    storage: &dyn Storage,
    user: &User,
    clone_id: i64,
    content: &str,
    max_length: usize,
) -> Result<DiscussionMessage> {
    let clone = load_clone(storage, clone_id).await?;
    ensure_can_view(user, &clone)?;

    let student_id = clone.assigned_to.ok_or_else(|| {
        CloneLabError::validation(format!(
            "Clone {clone_id} has no assigned student to discuss with"
        ))
    })?;
    match user.role {
        UserRole::Student => ensure_assignee(user, &clone)?,
        _ => ensure_can_manage(user, &clone)?,
    }

    let thread = storage
        .get_or_create_discussion(student_id, Some(clone.id))
        .await?;
    operations::post_message(
        storage,
        user,
        thread.id,
        content,
        MessageType::Message,
        max_length,
    )
    .await
}
