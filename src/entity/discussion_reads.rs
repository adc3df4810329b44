//! 讨论未读计数实体，每个讨论每侧一行

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "discussion_reads")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub discussion_id: i64,
    pub side: String,
    pub unread_count: i64,
    pub last_read_seq: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::discussions::Entity",
        from = "Column::DiscussionId",
        to = "super::discussions::Column::Id"
    )]
    Discussion,
}

impl Related<super::discussions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Discussion.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_side_state(&self) -> crate::models::discussions::read_tracking::SideState {
        crate::models::discussions::read_tracking::SideState {
            unread_count: self.unread_count,
            last_read_seq: self.last_read_seq,
        }
    }
}
