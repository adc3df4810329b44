use serde::Deserialize;
use ts_rs::TS;

use super::entities::CloneKind;
use super::status::{CloneStatus, ReviewDecision};
use crate::models::common::PaginationQuery;

// 创建克隆
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/clone.ts")]
pub struct CreateCloneRequest {
    pub name: String,
    pub kind: CloneKind,
    /// 负责人可指定学校；教师创建时固定为本校
    pub school_id: Option<i64>,
}

// 克隆列表查询参数（来自HTTP请求）
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/clone.ts")]
pub struct CloneListParams {
    #[serde(flatten)]
    #[ts(flatten)]
    pub pagination: PaginationQuery,
    pub status: Option<CloneStatus>,
    pub kind: Option<CloneKind>,
    /// 仅返回等待审阅的克隆
    pub review_ready: Option<bool>,
    pub assigned_to: Option<i64>,
    pub search: Option<String>,
}

/// 列表可见范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneScope {
    All,
    School(i64),
    /// 学生：分配给自己的克隆，加上可领取的练习克隆
    Student(i64),
}

// 克隆列表查询参数（用于存储层）
#[derive(Debug, Clone)]
pub struct CloneListQuery {
    pub page: u64,
    pub size: u64,
    pub scope: CloneScope,
    pub status: Option<CloneStatus>,
    pub kind: Option<CloneKind>,
    pub review_ready: bool,
    pub assigned_to: Option<i64>,
    pub search: Option<String>,
}

// 分配/取消分配；student_id 为空表示取消分配
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/clone.ts")]
pub struct AssignCloneRequest {
    pub student_id: Option<i64>,
}

// 管理端直接修改状态
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/clone.ts")]
pub struct UpdateCloneStatusRequest {
    pub status: CloneStatus,
    /// 客户端读到的版本号；不传则以服务端当前版本为准
    pub expected_version: Option<i32>,
}

// 审阅
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/clone.ts")]
pub struct ReviewCloneRequest {
    pub decision: ReviewDecision,
    pub feedback: Option<String>,
    pub expected_version: Option<i32>,
}

// 学生提交
#[derive(Debug, Default, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/clone.ts")]
pub struct SubmitCloneRequest {
    pub expected_version: Option<i32>,
}

// 学生保存分析结果
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/clone.ts")]
pub struct UpdateAnalysisRequest {
    pub analysis: serde_json::Value,
}
