//! 讨论消息实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "discussion_messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub discussion_id: i64,
    pub seq: i64,
    pub sender_id: i64,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub message_type: String,
    pub created_at: i64,
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
    pub fn into_message(self) -> crate::models::discussions::entities::DiscussionMessage {
        use crate::models::discussions::entities::{DiscussionMessage, MessageType};

        DiscussionMessage {
            id: self.id,
            discussion_id: self.discussion_id,
            seq: self.seq,
            sender_id: self.sender_id,
            content: self.content,
            message_type: self
                .message_type
                .parse::<MessageType>()
                .unwrap_or(MessageType::Message),
            created_at: super::ts_to_datetime(self.created_at),
        }
    }
}
