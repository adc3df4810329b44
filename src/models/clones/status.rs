//! 克隆状态机
//!
//! 所有状态相关的判断（能否迁移、能否编辑、是否只读、是否待审、是否展示反馈、进度）
//! 都集中在这里，存储层与服务层只调用本模块，不自行比较状态字符串。
//!
//! 线上格式为 snake_case（`being_worked_on`），解析时同时兼容旧系统的
//! 可读标签（`Being worked on by student`），导入的历史数据因此可以直接使用。
//! 旧数据里的 `needs_corrections` 与 `needs_reanalysis` 行为完全相同，解析时合并为后者。

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::errors::{CloneLabError, Result};

// 克隆状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/clone.ts")]
pub enum CloneStatus {
    Unassigned,             // 未分配（研究克隆）
    Available,              // 可领取（练习克隆）
    BeingWorkedOn,          // 学生分析中
    CompletedWaitingReview, // 首次提交，等待审阅
    CorrectedWaitingReview, // 修改后提交，等待审阅
    NeedsReanalysis,        // 审阅未通过，需要重新分析
    ReviewedCorrect,        // 审阅通过
}

impl CloneStatus {
    pub const UNASSIGNED: &'static str = "unassigned";
    pub const AVAILABLE: &'static str = "available";
    pub const BEING_WORKED_ON: &'static str = "being_worked_on";
    pub const COMPLETED_WAITING_REVIEW: &'static str = "completed_waiting_review";
    pub const CORRECTED_WAITING_REVIEW: &'static str = "corrected_waiting_review";
    pub const NEEDS_REANALYSIS: &'static str = "needs_reanalysis";
    /// 旧值，解析为 NeedsReanalysis
    pub const LEGACY_NEEDS_CORRECTIONS: &'static str = "needs_corrections";
    pub const LEGACY_NEEDS_CORRECTIONS_LABEL: &'static str = "Needs corrections from student";
    pub const REVIEWED_CORRECT: &'static str = "reviewed_correct";

    pub const ALL: [CloneStatus; 7] = [
        CloneStatus::Unassigned,
        CloneStatus::Available,
        CloneStatus::BeingWorkedOn,
        CloneStatus::CompletedWaitingReview,
        CloneStatus::CorrectedWaitingReview,
        CloneStatus::NeedsReanalysis,
        CloneStatus::ReviewedCorrect,
    ];

    /// 线上格式
    pub fn as_str(&self) -> &'static str {
        match self {
            CloneStatus::Unassigned => Self::UNASSIGNED,
            CloneStatus::Available => Self::AVAILABLE,
            CloneStatus::BeingWorkedOn => Self::BEING_WORKED_ON,
            CloneStatus::CompletedWaitingReview => Self::COMPLETED_WAITING_REVIEW,
            CloneStatus::CorrectedWaitingReview => Self::CORRECTED_WAITING_REVIEW,
            CloneStatus::NeedsReanalysis => Self::NEEDS_REANALYSIS,
            CloneStatus::ReviewedCorrect => Self::REVIEWED_CORRECT,
        }
    }

    /// 旧系统中的可读标签，也用作下拉框文本
    pub fn label(&self) -> &'static str {
        match self {
            CloneStatus::Unassigned => "Unassigned",
            CloneStatus::Available => "Available",
            CloneStatus::BeingWorkedOn => "Being worked on by student",
            CloneStatus::CompletedWaitingReview => "Completed, waiting review by staff",
            CloneStatus::CorrectedWaitingReview => "Corrected by student, waiting review",
            CloneStatus::NeedsReanalysis => "Reviewed, needs to be reanalyzed",
            CloneStatus::ReviewedCorrect => "Reviewed and Correct",
        }
    }

    /// 解析线上格式或旧标签
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s == Self::LEGACY_NEEDS_CORRECTIONS || s == Self::LEGACY_NEEDS_CORRECTIONS_LABEL {
            return Some(CloneStatus::NeedsReanalysis);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s || status.label() == s)
    }

    /// 数据库里可能出现的全部写法，按状态筛选时使用
    pub fn stored_spellings(&self) -> Vec<&'static str> {
        let mut spellings = vec![self.as_str(), self.label()];
        if *self == CloneStatus::NeedsReanalysis {
            spellings.extend([
                Self::LEGACY_NEEDS_CORRECTIONS,
                Self::LEGACY_NEEDS_CORRECTIONS_LABEL,
            ]);
        }
        spellings
    }

    /// 两个等待审阅状态
    pub fn is_waiting_review(&self) -> bool {
        matches!(
            self,
            CloneStatus::CompletedWaitingReview | CloneStatus::CorrectedWaitingReview
        )
    }

    /// 审阅未通过
    pub fn is_rejected(&self) -> bool {
        *self == CloneStatus::NeedsReanalysis
    }

    /// 迁移表：当前状态允许迁往的目标
    ///
    /// 练习克隆释放时回到 Available，与研究克隆回到 Unassigned 对应。
    pub fn allowed_targets(&self) -> &'static [CloneStatus] {
        use CloneStatus::*;
        match self {
            Unassigned | Available => &[BeingWorkedOn],
            BeingWorkedOn => &[
                CompletedWaitingReview,
                CorrectedWaitingReview,
                Unassigned,
                Available,
            ],
            CompletedWaitingReview | CorrectedWaitingReview => &[NeedsReanalysis, ReviewedCorrect],
            NeedsReanalysis => &[CorrectedWaitingReview, BeingWorkedOn],
            ReviewedCorrect => &[BeingWorkedOn],
        }
    }
}

impl<'de> Deserialize<'de> for CloneStatus {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        CloneStatus::parse(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "无效的克隆状态: '{s}'. 支持的状态: {}",
                CloneStatus::ALL
                    .iter()
                    .map(|status| status.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
    }
}

impl std::fmt::Display for CloneStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CloneStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        CloneStatus::parse(s).ok_or_else(|| format!("Invalid clone status: {s}"))
    }
}

/// 数据库中读出的原始状态
///
/// 读路径上遇到无法识别的值不报错，保留原文供诊断。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredStatus {
    Unset,
    Known(CloneStatus),
    Unknown(String),
}

impl StoredStatus {
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => StoredStatus::Unset,
            Some(s) => match CloneStatus::parse(s) {
                Some(status) => StoredStatus::Known(status),
                None => StoredStatus::Unknown(s.to_string()),
            },
        }
    }

    pub fn known(&self) -> Option<CloneStatus> {
        match self {
            StoredStatus::Known(status) => Some(*status),
            _ => None,
        }
    }

    /// 写回数据库时使用的值
    pub fn raw(&self) -> Option<&str> {
        match self {
            StoredStatus::Unset => None,
            StoredStatus::Known(status) => Some(status.as_str()),
            StoredStatus::Unknown(raw) => Some(raw),
        }
    }

    pub fn editable(&self) -> bool {
        match self {
            StoredStatus::Unset => true,
            StoredStatus::Known(status) => derive_editable(Some(*status)),
            StoredStatus::Unknown(_) => false,
        }
    }

    pub fn read_only(&self) -> bool {
        self.known().is_some_and(|s| derive_read_only(Some(s)))
    }

    pub fn review_ready(&self) -> bool {
        self.known().is_some_and(|s| derive_review_ready(Some(s)))
    }

    pub fn show_feedback(&self) -> bool {
        self.known().is_some_and(|s| derive_show_feedback(Some(s)))
    }

    pub fn progress(&self) -> f64 {
        progress_weight(self.known())
    }

    /// 从当前存储值迁往 `to`；无法识别的当前值没有任何合法出边
    pub fn check_transition_to(&self, to: CloneStatus) -> Result<()> {
        match self {
            StoredStatus::Unset => Ok(()),
            StoredStatus::Known(from) => check_transition(Some(*from), to),
            StoredStatus::Unknown(raw) => {
                Err(CloneLabError::illegal_status_transition(raw, to.as_str()))
            }
        }
    }
}

/// 状态值是否合法：枚举内的值或空值
pub fn is_valid_status(s: Option<&str>) -> bool {
    match s.map(str::trim) {
        None | Some("") => true,
        Some(s) => CloneStatus::parse(s).is_some(),
    }
}

/// 查迁移表；从空状态出发总是合法
pub fn can_transition(from: Option<CloneStatus>, to: CloneStatus) -> bool {
    match from {
        None => true,
        Some(from) => from.allowed_targets().contains(&to),
    }
}

/// 所有状态写入都经过这里
pub fn check_transition(from: Option<CloneStatus>, to: CloneStatus) -> Result<()> {
    if can_transition(from, to) {
        Ok(())
    } else {
        let from = from.map(|s| s.as_str()).unwrap_or("none");
        Err(CloneLabError::illegal_status_transition(from, to.as_str()))
    }
}

/// 学生可编辑；审阅通过后仍允许继续修改
pub fn derive_editable(status: Option<CloneStatus>) -> bool {
    match status {
        None => true,
        Some(s) => !s.is_waiting_review(),
    }
}

pub fn derive_read_only(status: Option<CloneStatus>) -> bool {
    status.is_some_and(|s| s.is_waiting_review())
}

pub fn derive_review_ready(status: Option<CloneStatus>) -> bool {
    status.is_some_and(|s| s.is_waiting_review())
}

pub fn derive_show_feedback(status: Option<CloneStatus>) -> bool {
    status.is_some_and(|s| s.is_rejected() || s == CloneStatus::ReviewedCorrect)
}

/// 进度权重，仅用于展示
pub fn progress_weight(status: Option<CloneStatus>) -> f64 {
    match status {
        None | Some(CloneStatus::Unassigned) | Some(CloneStatus::Available) => 0.0,
        Some(CloneStatus::BeingWorkedOn) => 0.25,
        Some(CloneStatus::NeedsReanalysis) => 0.5,
        Some(CloneStatus::CompletedWaitingReview) | Some(CloneStatus::CorrectedWaitingReview) => {
            0.75
        }
        Some(CloneStatus::ReviewedCorrect) => 1.0,
    }
}

// 审阅结论
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/clone.ts")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

pub fn review_action(decision: ReviewDecision) -> CloneStatus {
    match decision {
        ReviewDecision::Approved => CloneStatus::ReviewedCorrect,
        ReviewDecision::Rejected => CloneStatus::NeedsReanalysis,
    }
}

/// 审阅队列中的分组标签
pub fn review_queue_label(status: Option<CloneStatus>) -> Option<&'static str> {
    match status {
        Some(CloneStatus::CompletedWaitingReview) => Some("pending"),
        Some(CloneStatus::CorrectedWaitingReview) => Some("resubmitted"),
        _ => None,
    }
}

/// 学生点击“提交”后的目标状态
///
/// 已经被审阅过的克隆再次提交时视为修改后提交。
pub fn submission_target(
    status: Option<CloneStatus>,
    previously_reviewed: bool,
) -> Option<CloneStatus> {
    match status? {
        CloneStatus::NeedsReanalysis => Some(CloneStatus::CorrectedWaitingReview),
        CloneStatus::BeingWorkedOn if previously_reviewed => {
            Some(CloneStatus::CorrectedWaitingReview)
        }
        CloneStatus::BeingWorkedOn => Some(CloneStatus::CompletedWaitingReview),
        _ => None,
    }
}

// 下拉框选项
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/clone.ts")]
pub struct StatusOption {
    pub value: CloneStatus,
    pub label: String,
}

/// 管理端可手动选择的状态，顺序固定
pub fn selectable_statuses() -> Vec<StatusOption> {
    [
        CloneStatus::BeingWorkedOn,
        CloneStatus::CompletedWaitingReview,
        CloneStatus::NeedsReanalysis,
        CloneStatus::CorrectedWaitingReview,
        CloneStatus::ReviewedCorrect,
    ]
    .into_iter()
    .map(|value| StatusOption {
        value,
        label: value.label().to_string(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use CloneStatus::*;

    const TABLE: &[(CloneStatus, CloneStatus)] = &[
        (Unassigned, BeingWorkedOn),
        (Available, BeingWorkedOn),
        (BeingWorkedOn, CompletedWaitingReview),
        (BeingWorkedOn, CorrectedWaitingReview),
        (BeingWorkedOn, Unassigned),
        (BeingWorkedOn, Available),
        (CompletedWaitingReview, NeedsReanalysis),
        (CompletedWaitingReview, ReviewedCorrect),
        (NeedsReanalysis, CorrectedWaitingReview),
        (NeedsReanalysis, BeingWorkedOn),
        (CorrectedWaitingReview, NeedsReanalysis),
        (CorrectedWaitingReview, ReviewedCorrect),
        (ReviewedCorrect, BeingWorkedOn),
    ];

    #[test]
    fn test_self_transition_is_illegal() {
        for s in CloneStatus::ALL {
            assert!(!can_transition(Some(s), s), "{s} -> {s}");
        }
    }

    #[test]
    fn test_transition_table_is_exact() {
        for from in CloneStatus::ALL {
            for to in CloneStatus::ALL {
                let expected = TABLE.contains(&(from, to));
                assert_eq!(can_transition(Some(from), to), expected, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_transition_from_unset_always_legal() {
        for to in CloneStatus::ALL {
            assert!(can_transition(None, to));
            assert!(StoredStatus::Unset.check_transition_to(to).is_ok());
        }
    }

    #[test]
    fn test_check_transition_error_names_states() {
        let err = check_transition(Some(Unassigned), ReviewedCorrect).unwrap_err();
        assert!(matches!(err, CloneLabError::IllegalTransition(_)));
        assert!(err.message().contains("unassigned"));
        assert!(err.message().contains("reviewed_correct"));
    }

    #[test]
    fn test_unknown_stored_status_has_no_outgoing_edges() {
        let stored = StoredStatus::from_raw(Some("Archived"));
        assert_eq!(stored, StoredStatus::Unknown("Archived".to_string()));
        assert!(stored.check_transition_to(BeingWorkedOn).is_err());
        assert!(!stored.editable());
        assert!(!stored.read_only());
        assert_eq!(stored.progress(), 0.0);
    }

    #[test]
    fn test_read_only_iff_waiting_review() {
        for s in CloneStatus::ALL {
            let waiting = matches!(s, CompletedWaitingReview | CorrectedWaitingReview);
            assert_eq!(derive_read_only(Some(s)), waiting);
            assert_eq!(derive_review_ready(Some(s)), waiting);
            assert_eq!(derive_editable(Some(s)), !waiting);
        }
        assert!(!derive_read_only(None));
        assert!(derive_editable(None));
    }

    #[test]
    fn test_show_feedback() {
        let shown: Vec<_> = CloneStatus::ALL
            .into_iter()
            .filter(|s| derive_show_feedback(Some(*s)))
            .collect();
        assert_eq!(shown, vec![NeedsReanalysis, ReviewedCorrect]);
        assert!(!derive_show_feedback(None));
    }

    #[test]
    fn test_progress_weight_bounds() {
        for s in CloneStatus::ALL {
            let w = progress_weight(Some(s));
            assert!((0.0..=1.0).contains(&w));
        }
        assert_eq!(progress_weight(Some(BeingWorkedOn)), 0.25);
        assert_eq!(progress_weight(Some(NeedsReanalysis)), 0.5);
        assert_eq!(progress_weight(Some(CorrectedWaitingReview)), 0.75);
        assert_eq!(progress_weight(Some(ReviewedCorrect)), 1.0);
        assert_eq!(progress_weight(None), 0.0);
    }

    #[test]
    fn test_parse_wire_and_legacy_labels() {
        assert_eq!(CloneStatus::parse("being_worked_on"), Some(BeingWorkedOn));
        assert_eq!(
            CloneStatus::parse("Being worked on by student"),
            Some(BeingWorkedOn)
        );
        assert_eq!(
            CloneStatus::parse("Reviewed, needs to be reanalyzed"),
            Some(NeedsReanalysis)
        );
        assert_eq!(CloneStatus::parse("bogus"), None);

        let s: CloneStatus = serde_json::from_str(r#""Reviewed and Correct""#).unwrap();
        assert_eq!(s, ReviewedCorrect);
        assert_eq!(serde_json::to_string(&s).unwrap(), r#""reviewed_correct""#);
        assert!(serde_json::from_str::<CloneStatus>(r#""archived""#).is_err());
    }

    #[test]
    fn test_legacy_needs_corrections_collapses() {
        assert_eq!(CloneStatus::parse("needs_corrections"), Some(NeedsReanalysis));
        assert_eq!(
            CloneStatus::parse("Needs corrections from student"),
            Some(NeedsReanalysis)
        );
        assert!(is_valid_status(Some("needs_corrections")));

        // 旧值只拥有 NeedsReanalysis 的出边
        let stored = StoredStatus::from_raw(Some("needs_corrections"));
        assert_eq!(stored.known(), Some(NeedsReanalysis));
        assert!(stored.check_transition_to(CorrectedWaitingReview).is_ok());
        assert!(stored.check_transition_to(ReviewedCorrect).is_err());
        assert_eq!(stored.raw(), Some("needs_reanalysis"));

        let s: CloneStatus = serde_json::from_str(r#""needs_corrections""#).unwrap();
        assert_eq!(serde_json::to_string(&s).unwrap(), r#""needs_reanalysis""#);
    }

    #[test]
    fn test_is_valid_status() {
        assert!(is_valid_status(None));
        assert!(is_valid_status(Some("")));
        assert!(is_valid_status(Some("available")));
        assert!(!is_valid_status(Some("archived")));
    }

    #[test]
    fn test_review_and_submission_targets() {
        assert_eq!(review_action(ReviewDecision::Approved), ReviewedCorrect);
        assert_eq!(review_action(ReviewDecision::Rejected), NeedsReanalysis);

        assert_eq!(
            submission_target(Some(BeingWorkedOn), false),
            Some(CompletedWaitingReview)
        );
        assert_eq!(
            submission_target(Some(BeingWorkedOn), true),
            Some(CorrectedWaitingReview)
        );
        assert_eq!(
            submission_target(Some(NeedsReanalysis), false),
            Some(CorrectedWaitingReview)
        );
        assert_eq!(submission_target(Some(ReviewedCorrect), true), None);
        assert_eq!(submission_target(None, false), None);

        // 提交目标必然是合法迁移
        for s in CloneStatus::ALL {
            for reviewed in [false, true] {
                if let Some(to) = submission_target(Some(s), reviewed) {
                    assert!(can_transition(Some(s), to));
                }
            }
        }
    }

    #[test]
    fn test_review_queue_label() {
        assert_eq!(review_queue_label(Some(CompletedWaitingReview)), Some("pending"));
        assert_eq!(
            review_queue_label(Some(CorrectedWaitingReview)),
            Some("resubmitted")
        );
        assert_eq!(review_queue_label(Some(ReviewedCorrect)), None);
    }

    #[test]
    fn test_selectable_statuses_order() {
        let values: Vec<_> = selectable_statuses().into_iter().map(|o| o.value).collect();
        assert_eq!(
            values,
            vec![
                BeingWorkedOn,
                CompletedWaitingReview,
                NeedsReanalysis,
                CorrectedWaitingReview,
                ReviewedCorrect
            ]
        );
    }

    #[test]
    fn test_rejected_review_flow() {
        // 审阅拒绝后展示反馈，且学生可继续编辑
        let from = CompletedWaitingReview;
        let to = review_action(ReviewDecision::Rejected);
        assert!(check_transition(Some(from), to).is_ok());
        assert!(derive_show_feedback(Some(to)));
        assert!(!derive_read_only(Some(to)));
        assert!(derive_editable(Some(to)));
    }
}
