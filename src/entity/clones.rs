//! 克隆实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "clones")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub kind: String,
    pub name: String,
    pub school_id: Option<i64>,
    pub status: Option<String>,
    pub assigned_to: Option<i64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub analysis: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub feedback: Option<String>,
    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<i64>,
    pub version: i32,
    pub created_by: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::AssignedTo",
        to = "super::users::Column::Id"
    )]
    Assignee,
    #[sea_orm(
        belongs_to = "super::schools::Entity",
        from = "Column::SchoolId",
        to = "super::schools::Column::Id"
    )]
    School,
    #[sea_orm(has_many = "super::discussions::Entity")]
    Discussions,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignee.def()
    }
}

impl Related<super::schools::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::School.def()
    }
}

impl Related<super::discussions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Discussions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// 状态列保持原文，无法识别的值在展示层降级处理
    pub fn into_clone(self) -> crate::models::clones::entities::CloneSubmission {
        use super::ts_to_datetime;
        use crate::models::clones::entities::{CloneKind, CloneSubmission};
        use crate::models::clones::status::StoredStatus;

        let id = self.id;
        let analysis = self.analysis.and_then(|raw| {
            serde_json::from_str(&raw)
                .map_err(|e| {
                    tracing::warn!(clone_id = id, "Stored analysis is not valid JSON: {e}")
                })
                .ok()
        });

        CloneSubmission {
            id,
            kind: self.kind.parse::<CloneKind>().unwrap_or(CloneKind::Research),
            name: self.name,
            school_id: self.school_id,
            status: StoredStatus::from_raw(self.status.as_deref()),
            assigned_to: self.assigned_to,
            analysis,
            feedback: self.feedback,
            reviewed_by: self.reviewed_by,
            reviewed_at: self.reviewed_at.map(ts_to_datetime),
            version: self.version,
            created_by: self.created_by,
            created_at: ts_to_datetime(self.created_at),
            updated_at: ts_to_datetime(self.updated_at),
        }
    }
}
