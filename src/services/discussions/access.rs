//! 讨论的参与者判定
//!
//! 学生只能进入自己的讨论；教师可进入本校学生的讨论；负责人不受限。

use crate::errors::{CloneLabError, Result};
use crate::models::discussions::entities::Discussion;
use crate::models::users::entities::{User, UserRole};
use crate::storage::{DiscussionScope, Storage};

pub(crate) async fn load_discussion(storage: &dyn Storage, id: i64) -> Result<Discussion> {
    storage
        .get_discussion_by_id(id)
        .await?
        .ok_or_else(|| CloneLabError::not_found(format!("Discussion {id} not found")))
}

/// 教师是否负责该学生
pub(crate) async fn ensure_student_in_scope(
    storage: &dyn Storage,
    user: &User,
    student_id: i64,
) -> Result<User> {
    let student = storage
        .get_user_by_id(student_id)
        .await?
        .ok_or_else(|| CloneLabError::not_found(format!("Student {student_id} not found")))?;

    let permitted = match user.role {
        UserRole::Director => true,
        UserRole::Instructor => user.can_see_school(student.school_id),
        UserRole::Student => user.id == student.id,
    };
    if permitted {
        Ok(student)
    } else {
        Err(CloneLabError::authorization(format!(
            "Student {student_id} is outside your scope"
        )))
    }
}

pub(crate) async fn ensure_participant(
    storage: &dyn Storage,
    user: &User,
    discussion: &Discussion,
) -> Result<()> {
    let not_participant = || {
        CloneLabError::authorization(format!(
            "You are not a participant of discussion {}",
            discussion.id
        ))
    };

    match user.role {
        UserRole::Director => Ok(()),
        UserRole::Student if discussion.student_id == user.id => Ok(()),
        UserRole::Student => Err(not_participant()),
        UserRole::Instructor => {
            match ensure_student_in_scope(storage, user, discussion.student_id).await {
                Ok(_) => Ok(()),
                Err(CloneLabError::Authorization(_)) => Err(not_participant()),
                Err(e) => Err(e),
            }
        }
    }
}

pub(crate) fn list_scope(user: &User) -> Result<DiscussionScope> {
    match (user.role, user.school_id) {
        (UserRole::Director, _) => Ok(DiscussionScope::All),
        (UserRole::Instructor, Some(school_id)) => Ok(DiscussionScope::School(school_id)),
        (UserRole::Instructor, None) => Err(CloneLabError::authorization(
            "Instructor account is not attached to a school",
        )),
        (UserRole::Student, _) => Ok(DiscussionScope::Student(user.id)),
    }
}
