//! 状态展示配置
//!
//! 前端直接使用这里给出的标题与提示文本，不自行根据状态拼装。

use serde::Serialize;
use ts_rs::TS;

use super::status::{CloneStatus, StoredStatus};

// 展示色调
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/clone.ts")]
pub enum StatusTone {
    Neutral,
    Info,
    Pending,
    Warning,
    Resubmitted,
    Success,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/clone.ts")]
pub struct StatusDisplay {
    pub status: Option<CloneStatus>,
    pub label: String,
    pub title: String,
    pub message: String,
    pub tone: StatusTone,
    pub show_refresh: bool,
    pub show_feedback_button: bool,
    /// 仅当存储值无法识别时出现
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_status: Option<String>,
}

impl StatusDisplay {
    pub fn for_status(status: CloneStatus) -> Self {
        let (title, message, tone, show_refresh, show_feedback_button) = match status {
            CloneStatus::CompletedWaitingReview => (
                "Submitted for Review",
                "Your analysis has been submitted and is waiting for instructor review.",
                StatusTone::Pending,
                true,
                false,
            ),
            CloneStatus::NeedsReanalysis => (
                "Revisions Requested",
                "Your instructor has reviewed your work and requested changes. \
                 Check the feedback below and update your analysis.",
                StatusTone::Warning,
                false,
                true,
            ),
            CloneStatus::ReviewedCorrect => (
                "Analysis Approved",
                "Congratulations! Your analysis has been reviewed and approved by your instructor.",
                StatusTone::Success,
                false,
                true,
            ),
            CloneStatus::CorrectedWaitingReview => (
                "Resubmitted for Review",
                "Your corrections have been submitted and are waiting for instructor review.",
                StatusTone::Resubmitted,
                true,
                false,
            ),
            CloneStatus::BeingWorkedOn => (
                "In Progress",
                "Student is currently working on this analysis.",
                StatusTone::Info,
                false,
                false,
            ),
            CloneStatus::Unassigned => (
                "Unassigned",
                "This clone has not been assigned to a student yet.",
                StatusTone::Neutral,
                false,
                false,
            ),
            CloneStatus::Available => (
                "Available",
                "This practice clone is available for student analysis.",
                StatusTone::Neutral,
                false,
                false,
            ),
        };

        Self {
            status: Some(status),
            label: status.label().to_string(),
            title: title.to_string(),
            message: message.to_string(),
            tone,
            show_refresh,
            show_feedback_button,
            raw_status: None,
        }
    }

    /// 无法识别的状态降级为 "Unknown Status"
    pub fn unknown(raw: &str) -> Self {
        Self {
            status: None,
            label: raw.to_string(),
            title: "Unknown Status".to_string(),
            message: format!("Status: {raw}"),
            tone: StatusTone::Neutral,
            show_refresh: false,
            show_feedback_button: false,
            raw_status: Some(raw.to_string()),
        }
    }

    fn unset() -> Self {
        Self {
            status: None,
            label: String::new(),
            title: "Not Started".to_string(),
            message: "No status has been recorded for this clone yet.".to_string(),
            tone: StatusTone::Neutral,
            show_refresh: false,
            show_feedback_button: false,
            raw_status: None,
        }
    }

    /// 读路径入口；每遇到一次无法识别的值记录一条警告
    pub fn from_stored(clone_id: i64, stored: &StoredStatus) -> Self {
        match stored {
            StoredStatus::Known(status) => Self::for_status(*status),
            StoredStatus::Unset => Self::unset(),
            StoredStatus::Unknown(raw) => {
                tracing::warn!(
                    clone_id,
                    raw_status = %raw,
                    "Unknown clone status encountered, falling back to default display"
                );
                Self::unknown(raw)
            }
        }
    }
}

/// 全部状态的展示配置，供前端一次性拉取
pub fn status_catalog() -> Vec<StatusDisplay> {
    CloneStatus::ALL
        .into_iter()
        .map(StatusDisplay::for_status)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_status_degrades() {
        let stored = StoredStatus::from_raw(Some("Archived by admin"));
        let display = StatusDisplay::from_stored(1, &stored);
        assert_eq!(display.title, "Unknown Status");
        assert_eq!(display.message, "Status: Archived by admin");
        assert_eq!(display.raw_status.as_deref(), Some("Archived by admin"));
        assert!(display.status.is_none());
    }

    #[test]
    fn test_legacy_corrections_value_shows_revisions() {
        let stored = StoredStatus::from_raw(Some("needs_corrections"));
        let display = StatusDisplay::from_stored(1, &stored);
        assert_eq!(display.title, "Revisions Requested");
        assert!(display.message.starts_with("Your instructor has reviewed your work"));
        assert!(display.message.contains("changes. Check the feedback"));
        assert_eq!(display.status, Some(CloneStatus::NeedsReanalysis));
    }

    #[test]
    fn test_feedback_button_matches_predicate() {
        for s in CloneStatus::ALL {
            assert_eq!(
                StatusDisplay::for_status(s).show_feedback_button,
                super::super::status::derive_show_feedback(Some(s))
            );
        }
    }

    #[test]
    fn test_catalog_covers_every_status() {
        let catalog = status_catalog();
        assert_eq!(catalog.len(), CloneStatus::ALL.len());
        assert!(catalog.iter().all(|d| d.raw_status.is_none()));
    }
}
