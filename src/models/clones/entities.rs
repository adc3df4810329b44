use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::status::{CloneStatus, StoredStatus};

// 克隆类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/clone.ts")]
pub enum CloneKind {
    Research, // 研究克隆，需分配给学生
    Practice, // 练习克隆
}

impl CloneKind {
    /// 新建克隆的初始状态
    pub fn initial_status(&self) -> CloneStatus {
        match self {
            CloneKind::Research => CloneStatus::Unassigned,
            CloneKind::Practice => CloneStatus::Available,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CloneKind::Research => "research",
            CloneKind::Practice => "practice",
        }
    }
}

impl std::fmt::Display for CloneKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CloneKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "research" => Ok(CloneKind::Research),
            "practice" => Ok(CloneKind::Practice),
            _ => Err(format!("Invalid clone kind: {s}")),
        }
    }
}

/// 克隆（学生的一份序列分析作业）
#[derive(Debug, Clone)]
pub struct CloneSubmission {
    pub id: i64,
    pub kind: CloneKind,
    pub name: String,
    pub school_id: Option<i64>,
    pub status: StoredStatus,
    pub assigned_to: Option<i64>,
    pub analysis: Option<serde_json::Value>,
    pub feedback: Option<String>,
    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
    pub created_by: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl CloneSubmission {
    pub fn is_assigned(&self) -> bool {
        self.assigned_to.is_some()
    }

    pub fn is_assigned_to(&self, user_id: i64) -> bool {
        self.assigned_to == Some(user_id)
    }

    /// 是否已经被审阅过（决定再次提交的目标状态）
    pub fn previously_reviewed(&self) -> bool {
        self.reviewed_at.is_some()
    }
}
