//! 讨论主题实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "discussions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: i64,
    pub clone_id: Option<i64>,
    pub last_seq: i64,
    pub message_count: i64,
    pub last_activity_at: i64,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::StudentId",
        to = "super::users::Column::Id"
    )]
    Student,
    #[sea_orm(
        belongs_to = "super::clones::Entity",
        from = "Column::CloneId",
        to = "super::clones::Column::Id"
    )]
    CloneSubmission,
    #[sea_orm(has_many = "super::discussion_messages::Entity")]
    Messages,
    #[sea_orm(has_many = "super::discussion_reads::Entity")]
    Reads,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::clones::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CloneSubmission.def()
    }
}

impl Related<super::discussion_messages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl Related<super::discussion_reads::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reads.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_discussion(self) -> crate::models::discussions::entities::Discussion {
        use super::ts_to_datetime;

        crate::models::discussions::entities::Discussion {
            id: self.id,
            student_id: self.student_id,
            clone_id: self.clone_id,
            last_seq: self.last_seq,
            message_count: self.message_count,
            last_activity_at: ts_to_datetime(self.last_activity_at),
            created_at: ts_to_datetime(self.created_at),
        }
    }
}
