use serde::Serialize;
use ts_rs::TS;

use super::display::StatusDisplay;
use super::entities::{CloneKind, CloneSubmission};
use super::status::{StatusOption, review_queue_label};
use crate::models::common::PaginationInfo;

/// 克隆视图：所有派生值由服务端计算，前端直接使用
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/clone.ts")]
pub struct CloneView {
    pub id: i64,
    pub kind: CloneKind,
    pub name: String,
    pub school_id: Option<i64>,
    pub status: Option<String>,
    pub display: StatusDisplay,
    pub progress: f64,
    pub editable: bool,
    pub read_only: bool,
    pub review_ready: bool,
    pub show_feedback: bool,
    pub review_label: Option<String>,
    pub assigned_to: Option<i64>,
    pub analysis: Option<serde_json::Value>,
    pub feedback: Option<String>,
    pub reviewed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl CloneView {
    /// 反馈仅在状态允许时对学生可见；教师与负责人总能看到
    pub fn build(clone: CloneSubmission, viewer_is_staff: bool) -> Self {
        let display = StatusDisplay::from_stored(clone.id, &clone.status);
        let show_feedback = clone.status.show_feedback();
        let feedback = if viewer_is_staff || show_feedback {
            clone.feedback
        } else {
            None
        };

        Self {
            id: clone.id,
            kind: clone.kind,
            name: clone.name,
            school_id: clone.school_id,
            status: clone.status.raw().map(str::to_string),
            display,
            progress: clone.status.progress(),
            editable: clone.status.editable(),
            read_only: clone.status.read_only(),
            review_ready: clone.status.review_ready(),
            show_feedback,
            review_label: review_queue_label(clone.status.known()).map(str::to_string),
            assigned_to: clone.assigned_to,
            analysis: clone.analysis,
            feedback,
            reviewed_at: clone.reviewed_at,
            version: clone.version,
            created_at: clone.created_at,
            updated_at: clone.updated_at,
        }
    }
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/clone.ts")]
pub struct CloneResponse {
    pub clone: CloneView,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/clone.ts")]
pub struct CloneListResponse {
    pub items: Vec<CloneView>,
    pub pagination: PaginationInfo,
}

/// 状态目录：下拉框选项与所有状态的展示配置
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/clone.ts")]
pub struct StatusCatalogResponse {
    pub options: Vec<StatusOption>,
    pub displays: Vec<StatusDisplay>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::clones::status::{CloneStatus, StoredStatus};

    fn clone_with(status: StoredStatus) -> CloneSubmission {
        CloneSubmission {
            id: 7,
            kind: CloneKind::Research,
            name: "clone-7".to_string(),
            school_id: Some(1),
            status,
            assigned_to: Some(3),
            analysis: None,
            feedback: Some("check the primers".to_string()),
            reviewed_by: None,
            reviewed_at: None,
            version: 2,
            created_by: 1,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_feedback_hidden_from_student_while_waiting() {
        let view = CloneView::build(
            clone_with(StoredStatus::Known(CloneStatus::CompletedWaitingReview)),
            false,
        );
        assert!(view.feedback.is_none());
        assert!(view.read_only);
        assert_eq!(view.review_label.as_deref(), Some("pending"));

        let view = CloneView::build(
            clone_with(StoredStatus::Known(CloneStatus::CompletedWaitingReview)),
            true,
        );
        assert!(view.feedback.is_some());
    }

    #[test]
    fn test_feedback_shown_after_rejection() {
        let view = CloneView::build(
            clone_with(StoredStatus::Known(CloneStatus::NeedsReanalysis)),
            false,
        );
        assert_eq!(view.feedback.as_deref(), Some("check the primers"));
        assert!(view.editable);
        assert_eq!(view.progress, 0.5);
        assert_eq!(view.status.as_deref(), Some("needs_reanalysis"));
    }

    #[test]
    fn test_unknown_status_view_keeps_raw_value() {
        let view = CloneView::build(clone_with(StoredStatus::Unknown("Legacy".into())), false);
        assert_eq!(view.status.as_deref(), Some("Legacy"));
        assert_eq!(view.display.title, "Unknown Status");
        assert!(!view.editable);
        assert_eq!(view.progress, 0.0);
    }
}
