//! 讨论存储操作
//!
//! 发消息、标记已读、删除讨论都在同一把按讨论加的锁内，并包在一个事务里执行。
//! 未读计数只在这里被修改。

use std::collections::HashMap;

use super::SeaOrmStorage;
use super::locks::{discussion_key, thread_creation_key};
use crate::entity::discussion_messages::{
    ActiveModel as MessageActiveModel, Column as MessageColumn, Entity as DiscussionMessages,
};
use crate::entity::discussion_reads::{
    ActiveModel as ReadActiveModel, Column as ReadColumn, Entity as DiscussionReads,
};
use crate::entity::discussions::{ActiveModel, Column, Entity as Discussions};
use crate::entity::users::{Column as UserColumn, Entity as Users};
use crate::errors::{CloneLabError, Result};
use crate::models::discussions::{
    entities::{Discussion, DiscussionMessage, MessageType},
    read_tracking::{ParticipantSide, SideState, UnreadLedger},
    responses::{DiscussionSummary, MessagePreview, truncate_preview},
};
use crate::storage::DiscussionScope;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;

fn db_err(action: &str) -> impl Fn(sea_orm::DbErr) -> CloneLabError + '_ {
    move |e| CloneLabError::database_operation(format!("{action}: {e}"))
}

impl SeaOrmStorage {
    /// 通过 ID 获取讨论
    pub async fn get_discussion_by_id_impl(&self, id: i64) -> Result<Option<Discussion>> {
        let result = Discussions::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err("查询讨论失败"))?;

        Ok(result.map(|m| m.into_discussion()))
    }

    /// 获取或创建讨论，同时建好两侧的未读计数行
    pub async fn get_or_create_discussion_impl(
        &self,
        student_id: i64,
        clone_id: Option<i64>,
    ) -> Result<Discussion> {
        let _guard = self
            .locks
            .lock(thread_creation_key(student_id, clone_id))
            .await;

        let mut select = Discussions::find().filter(Column::StudentId.eq(student_id));
        select = match clone_id {
            Some(clone_id) => select.filter(Column::CloneId.eq(clone_id)),
            None => select.filter(Column::CloneId.is_null()),
        };

        if let Some(existing) = select.one(&self.db).await.map_err(db_err("查询讨论失败"))? {
            return Ok(existing.into_discussion());
        }

        let now = chrono::Utc::now().timestamp();
        let txn = self.db.begin().await.map_err(db_err("开启事务失败"))?;

        let discussion = ActiveModel {
            student_id: Set(student_id),
            clone_id: Set(clone_id),
            last_seq: Set(0),
            message_count: Set(0),
            last_activity_at: Set(now),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(db_err("创建讨论失败"))?;

        for side in ParticipantSide::BOTH {
            ReadActiveModel {
                discussion_id: Set(discussion.id),
                side: Set(side.as_str().to_string()),
                unread_count: Set(0),
                last_read_seq: Set(0),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(db_err("创建未读计数失败"))?;
        }

        txn.commit().await.map_err(db_err("提交事务失败"))?;

        debug!(
            discussion_id = discussion.id,
            student_id, clone_id, "Discussion created"
        );

        Ok(discussion.into_discussion())
    }

    /// 读取某一侧的计数行，缺失时补建
    async fn read_row<C: ConnectionTrait>(
        conn: &C,
        discussion_id: i64,
        side: ParticipantSide,
    ) -> Result<crate::entity::discussion_reads::Model> {
        let existing = DiscussionReads::find()
            .filter(ReadColumn::DiscussionId.eq(discussion_id))
            .filter(ReadColumn::Side.eq(side.as_str()))
            .one(conn)
            .await
            .map_err(db_err("查询未读计数失败"))?;

        match existing {
            Some(row) => Ok(row),
            None => ReadActiveModel {
                discussion_id: Set(discussion_id),
                side: Set(side.as_str().to_string()),
                unread_count: Set(0),
                last_read_seq: Set(0),
                updated_at: Set(chrono::Utc::now().timestamp()),
                ..Default::default()
            }
            .insert(conn)
            .await
            .map_err(db_err("创建未读计数失败")),
        }
    }

    /// 发送消息
    pub async fn post_message_impl(
        &self,
        discussion_id: i64,
        sender_id: i64,
        sender_side: ParticipantSide,
        content: &str,
        message_type: MessageType,
    ) -> Result<DiscussionMessage> {
        let _guard = self.locks.lock(discussion_key(discussion_id)).await;
        let txn = self.db.begin().await.map_err(db_err("开启事务失败"))?;

        let discussion = Discussions::find_by_id(discussion_id)
            .one(&txn)
            .await
            .map_err(db_err("查询讨论失败"))?
            .ok_or_else(|| CloneLabError::not_found(format!("讨论不存在: {discussion_id}")))?;

        let now = chrono::Utc::now().timestamp();
        let seq = discussion.last_seq + 1;
        let message_count = discussion.message_count + 1;

        let mut thread: ActiveModel = discussion.into();
        thread.last_seq = Set(seq);
        thread.message_count = Set(message_count);
        thread.last_activity_at = Set(now);
        thread
            .update(&txn)
            .await
            .map_err(db_err("更新讨论失败"))?;

        let message = MessageActiveModel {
            discussion_id: Set(discussion_id),
            seq: Set(seq),
            sender_id: Set(sender_id),
            content: Set(content.to_string()),
            message_type: Set(message_type.as_str().to_string()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(db_err("保存消息失败"))?;

        // 只增加对侧未读，发送方一侧保持不变
        let receiver_side = sender_side.counterpart();
        let receiver = Self::read_row(&txn, discussion_id, receiver_side).await?;
        let mut ledger = UnreadLedger::default();
        ledger.set_side(receiver_side, receiver.into_side_state());
        ledger.on_post(sender_side);

        let mut receiver: ReadActiveModel = receiver.into();
        receiver.unread_count = Set(ledger.unread_for(receiver_side));
        receiver.updated_at = Set(now);
        receiver
            .update(&txn)
            .await
            .map_err(db_err("更新未读计数失败"))?;

        txn.commit().await.map_err(db_err("提交事务失败"))?;

        Ok(message.into_message())
    }

    /// 标记已读：本侧清零，已读位置推进到当前最新序号
    pub async fn mark_read_impl(
        &self,
        discussion_id: i64,
        side: ParticipantSide,
    ) -> Result<SideState> {
        let _guard = self.locks.lock(discussion_key(discussion_id)).await;
        let txn = self.db.begin().await.map_err(db_err("开启事务失败"))?;

        let discussion = Discussions::find_by_id(discussion_id)
            .one(&txn)
            .await
            .map_err(db_err("查询讨论失败"))?
            .ok_or_else(|| CloneLabError::not_found(format!("讨论不存在: {discussion_id}")))?;

        let row = Self::read_row(&txn, discussion_id, side).await?;
        let mut ledger = UnreadLedger::default();
        ledger.set_side(side, row.into_side_state());
        ledger.on_read(side, discussion.last_seq);
        let state = *ledger.side(side);

        let mut row: ReadActiveModel = row.into();
        row.unread_count = Set(state.unread_count);
        row.last_read_seq = Set(state.last_read_seq);
        row.updated_at = Set(chrono::Utc::now().timestamp());
        row.update(&txn).await.map_err(db_err("更新未读计数失败"))?;

        txn.commit().await.map_err(db_err("提交事务失败"))?;

        Ok(state)
    }

    /// 两侧的当前计数
    pub async fn get_read_state_impl(&self, discussion_id: i64) -> Result<UnreadLedger> {
        let rows = DiscussionReads::find()
            .filter(ReadColumn::DiscussionId.eq(discussion_id))
            .all(&self.db)
            .await
            .map_err(db_err("查询未读计数失败"))?;

        let mut ledger = UnreadLedger::default();
        for row in rows {
            match row.side.parse::<ParticipantSide>() {
                Ok(side) => ledger.set_side(side, row.into_side_state()),
                Err(e) => tracing::warn!(discussion_id, "Ignoring read row: {e}"),
            }
        }
        Ok(ledger)
    }

    /// 列出讨论，按最近活动时间倒序
    pub async fn list_discussions_impl(
        &self,
        scope: DiscussionScope,
        side: ParticipantSide,
        unread_only: bool,
        preview_length: usize,
    ) -> Result<Vec<DiscussionSummary>> {
        let mut select = Discussions::find();

        select = match scope {
            DiscussionScope::All => select,
            DiscussionScope::Student(student_id) => {
                select.filter(Column::StudentId.eq(student_id))
            }
            DiscussionScope::School(school_id) => {
                let student_ids: Vec<i64> = Users::find()
                    .select_only()
                    .column(UserColumn::Id)
                    .filter(UserColumn::SchoolId.eq(school_id))
                    .into_tuple()
                    .all(&self.db)
                    .await
                    .map_err(db_err("查询学校成员失败"))?;
                if student_ids.is_empty() {
                    return Ok(Vec::new());
                }
                select.filter(Column::StudentId.is_in(student_ids))
            }
        };

        let discussions = select
            .order_by_desc(Column::LastActivityAt)
            .order_by_desc(Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err("查询讨论列表失败"))?;

        if discussions.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = discussions.iter().map(|d| d.id).collect();

        let unread: HashMap<i64, i64> = DiscussionReads::find()
            .filter(ReadColumn::DiscussionId.is_in(ids.clone()))
            .filter(ReadColumn::Side.eq(side.as_str()))
            .all(&self.db)
            .await
            .map_err(db_err("查询未读计数失败"))?
            .into_iter()
            .map(|row| (row.discussion_id, row.unread_count))
            .collect();

        // 每个讨论的最后一条消息即 seq == last_seq
        let mut last_condition = Condition::any();
        let mut has_messages = false;
        for d in discussions.iter().filter(|d| d.last_seq > 0) {
            has_messages = true;
            last_condition = last_condition.add(
                Condition::all()
                    .add(MessageColumn::DiscussionId.eq(d.id))
                    .add(MessageColumn::Seq.eq(d.last_seq)),
            );
        }
        let last_messages: HashMap<i64, MessagePreview> = if has_messages {
            DiscussionMessages::find()
                .filter(last_condition)
                .all(&self.db)
                .await
                .map_err(db_err("查询最后一条消息失败"))?
                .into_iter()
                .map(|m| {
                    let message = m.into_message();
                    (
                        message.discussion_id,
                        MessagePreview {
                            sender_id: message.sender_id,
                            content: truncate_preview(&message.content, preview_length),
                            created_at: message.created_at,
                        },
                    )
                })
                .collect()
        } else {
            HashMap::new()
        };

        let mut last_messages = last_messages;
        Ok(discussions
            .into_iter()
            .map(|d| {
                let unread_count = unread.get(&d.id).copied().unwrap_or(0);
                let last_message = last_messages.remove(&d.id);
                let discussion = d.into_discussion();
                DiscussionSummary {
                    id: discussion.id,
                    student_id: discussion.student_id,
                    clone_id: discussion.clone_id,
                    unread_count,
                    message_count: discussion.message_count,
                    last_message,
                    last_activity_at: discussion.last_activity_at,
                }
            })
            .filter(|summary| !unread_only || summary.unread_count > 0)
            .collect())
    }

    /// 按序号列出消息
    pub async fn list_messages_impl(&self, discussion_id: i64) -> Result<Vec<DiscussionMessage>> {
        let messages = DiscussionMessages::find()
            .filter(MessageColumn::DiscussionId.eq(discussion_id))
            .order_by_asc(MessageColumn::Seq)
            .all(&self.db)
            .await
            .map_err(db_err("查询消息列表失败"))?;

        Ok(messages.into_iter().map(|m| m.into_message()).collect())
    }

    /// 删除讨论及其消息、计数
    pub async fn delete_discussion_impl(&self, id: i64) -> Result<bool> {
        let _guard = self.locks.lock(discussion_key(id)).await;
        let txn = self.db.begin().await.map_err(db_err("开启事务失败"))?;

        DiscussionReads::delete_many()
            .filter(ReadColumn::DiscussionId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err("删除未读计数失败"))?;
        DiscussionMessages::delete_many()
            .filter(MessageColumn::DiscussionId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err("删除消息失败"))?;
        let result = Discussions::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(db_err("删除讨论失败"))?;

        txn.commit().await.map_err(db_err("提交事务失败"))?;

        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{seed_clone, seed_user, test_storage};
    use crate::errors::CloneLabError;
    use crate::models::clones::entities::CloneKind;
    use crate::models::discussions::entities::MessageType;
    use crate::models::discussions::read_tracking::ParticipantSide;
    use crate::models::users::entities::UserRole;
    use crate::storage::DiscussionScope;

    #[tokio::test]
    async fn test_unread_counts_follow_posts_and_reads() {
        let storage = test_storage().await;
        let student = seed_user(&storage, "student1", UserRole::Student, None).await;
        let staff = seed_user(&storage, "inst0001", UserRole::Instructor, None).await;
        let thread = storage
            .get_or_create_discussion_impl(student.id, None)
            .await
            .unwrap();

        for text in ["Please check the chromatogram", "Also the BLAST hit"] {
            storage
                .post_message_impl(
                    thread.id,
                    staff.id,
                    ParticipantSide::Staff,
                    text,
                    MessageType::Message,
                )
                .await
                .unwrap();
        }
        let ledger = storage.get_read_state_impl(thread.id).await.unwrap();
        assert_eq!(ledger.unread_for(ParticipantSide::Student), 2);
        assert_eq!(ledger.unread_for(ParticipantSide::Staff), 0);

        let state = storage
            .mark_read_impl(thread.id, ParticipantSide::Student)
            .await
            .unwrap();
        assert_eq!(state.unread_count, 0);
        assert_eq!(state.last_read_seq, 2);

        // 重复标记不改变结果
        let again = storage
            .mark_read_impl(thread.id, ParticipantSide::Student)
            .await
            .unwrap();
        assert_eq!(again, state);

        storage
            .post_message_impl(
                thread.id,
                staff.id,
                ParticipantSide::Staff,
                "One more",
                MessageType::Message,
            )
            .await
            .unwrap();
        let ledger = storage.get_read_state_impl(thread.id).await.unwrap();
        assert_eq!(ledger.unread_for(ParticipantSide::Student), 1);
        assert_eq!(ledger.unread_for(ParticipantSide::Staff), 0);
    }

    #[tokio::test]
    async fn test_post_then_list_shows_preview_and_count() {
        let storage = test_storage().await;
        let student = seed_user(&storage, "student1", UserRole::Student, None).await;
        let thread = storage
            .get_or_create_discussion_impl(student.id, None)
            .await
            .unwrap();

        let before = storage
            .list_discussions_impl(DiscussionScope::All, ParticipantSide::Staff, false, 120)
            .await
            .unwrap();
        assert_eq!(before[0].unread_count, 0);
        assert!(before[0].last_message.is_none());

        storage
            .post_message_impl(
                thread.id,
                student.id,
                ParticipantSide::Student,
                "Is my ORF correct?",
                MessageType::Message,
            )
            .await
            .unwrap();

        let after = storage
            .list_discussions_impl(DiscussionScope::All, ParticipantSide::Staff, false, 120)
            .await
            .unwrap();
        assert_eq!(after[0].unread_count, before[0].unread_count + 1);
        assert_eq!(after[0].message_count, 1);
        assert_eq!(
            after[0].last_message.as_ref().map(|m| m.content.as_str()),
            Some("Is my ORF correct?")
        );

        let student_view = storage
            .list_discussions_impl(
                DiscussionScope::Student(student.id),
                ParticipantSide::Student,
                true,
                120,
            )
            .await
            .unwrap();
        assert!(student_view.is_empty());
    }

    #[tokio::test]
    async fn test_school_scope_only_sees_own_students() {
        let storage = test_storage().await;
        let north = storage.create_school_impl("North").await.unwrap();
        let south = storage.create_school_impl("South").await.unwrap();
        let a = seed_user(&storage, "student1", UserRole::Student, Some(north.id)).await;
        let b = seed_user(&storage, "student2", UserRole::Student, Some(south.id)).await;
        let thread_a = storage.get_or_create_discussion_impl(a.id, None).await.unwrap();
        storage.get_or_create_discussion_impl(b.id, None).await.unwrap();

        let visible = storage
            .list_discussions_impl(
                DiscussionScope::School(north.id),
                ParticipantSide::Staff,
                false,
                120,
            )
            .await
            .unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, thread_a.id);
    }

    #[tokio::test]
    async fn test_get_or_create_is_stable() {
        let storage = test_storage().await;
        let director = seed_user(&storage, "director1", UserRole::Director, None).await;
        let student = seed_user(&storage, "student1", UserRole::Student, None).await;
        let clone = seed_clone(&storage, CloneKind::Research, None, director.id).await;

        let general = storage.get_or_create_discussion_impl(student.id, None).await.unwrap();
        let again = storage.get_or_create_discussion_impl(student.id, None).await.unwrap();
        assert_eq!(general.id, again.id);

        let clone_thread = storage
            .get_or_create_discussion_impl(student.id, Some(clone.id))
            .await
            .unwrap();
        assert_ne!(clone_thread.id, general.id);
        assert_eq!(clone_thread.clone_id, Some(clone.id));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_posts_get_contiguous_seq() {
        let storage = test_storage().await;
        let student = seed_user(&storage, "student1", UserRole::Student, None).await;
        let thread = storage
            .get_or_create_discussion_impl(student.id, None)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..10 {
            let storage = storage.clone();
            let sender = student.id;
            let discussion_id = thread.id;
            handles.push(tokio::spawn(async move {
                storage
                    .post_message_impl(
                        discussion_id,
                        sender,
                        ParticipantSide::Student,
                        &format!("message {i}"),
                        MessageType::Message,
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let seqs: Vec<i64> = storage
            .list_messages_impl(thread.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.seq)
            .collect();
        assert_eq!(seqs, (1..=10).collect::<Vec<_>>());

        let ledger = storage.get_read_state_impl(thread.id).await.unwrap();
        assert_eq!(ledger.unread_for(ParticipantSide::Staff), 10);
        assert_eq!(ledger.unread_for(ParticipantSide::Student), 0);
    }

    #[tokio::test]
    async fn test_delete_cascades_and_missing_thread_errors() {
        let storage = test_storage().await;
        let student = seed_user(&storage, "student1", UserRole::Student, None).await;
        let thread = storage.get_or_create_discussion_impl(student.id, None).await.unwrap();
        storage
            .post_message_impl(
                thread.id,
                student.id,
                ParticipantSide::Student,
                "hi",
                MessageType::Message,
            )
            .await
            .unwrap();

        assert!(storage.delete_discussion_impl(thread.id).await.unwrap());
        assert!(storage.get_discussion_by_id_impl(thread.id).await.unwrap().is_none());
        assert!(storage.list_messages_impl(thread.id).await.unwrap().is_empty());
        assert_eq!(
            storage.get_read_state_impl(thread.id).await.unwrap(),
            Default::default()
        );

        let err = storage
            .post_message_impl(
                thread.id,
                student.id,
                ParticipantSide::Student,
                "hi",
                MessageType::Message,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CloneLabError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_mark_read_racing_posts_never_loses_a_message() {
        let storage = test_storage().await;
        let student = seed_user(&storage, "student1", UserRole::Student, None).await;
        let staff = seed_user(&storage, "inst0001", UserRole::Instructor, None).await;
        let thread = storage
            .get_or_create_discussion_impl(student.id, None)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..20 {
            let poster = storage.clone();
            let reader = storage.clone();
            let discussion_id = thread.id;
            let sender = staff.id;
            handles.push(tokio::spawn(async move {
                poster
                    .post_message_impl(
                        discussion_id,
                        sender,
                        ParticipantSide::Staff,
                        &format!("note {i}"),
                        MessageType::Message,
                    )
                    .await
                    .map(|_| ())
            }));
            handles.push(tokio::spawn(async move {
                reader
                    .mark_read_impl(discussion_id, ParticipantSide::Student)
                    .await
                    .map(|_| ())
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let discussion = storage
            .get_discussion_by_id_impl(thread.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(discussion.last_seq, 20);

        let ledger = storage.get_read_state_impl(thread.id).await.unwrap();
        let student_state = *ledger.side(ParticipantSide::Student);
        assert_eq!(
            student_state.unread_count,
            discussion.last_seq - student_state.last_read_seq
        );

        // 已读位置之后的每条消息都还在，且都计入未读
        let unread_messages = storage
            .list_messages_impl(thread.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.seq > student_state.last_read_seq)
            .count() as i64;
        assert_eq!(unread_messages, student_state.unread_count);

        let state = storage
            .mark_read_impl(thread.id, ParticipantSide::Student)
            .await
            .unwrap();
        assert_eq!(state.unread_count, 0);
        assert_eq!(state.last_read_seq, 20);
    }

    #[tokio::test]
    async fn test_lock_table_empties_after_use() {
        let storage = test_storage().await;
        let staff = seed_user(&storage, "inst0001", UserRole::Instructor, None).await;

        for n in 0..20 {
            let name = format!("student{n}");
            let student = seed_user(&storage, &name, UserRole::Student, None).await;
            let thread = storage
                .get_or_create_discussion_impl(student.id, None)
                .await
                .unwrap();
            storage
                .post_message_impl(
                    thread.id,
                    staff.id,
                    ParticipantSide::Staff,
                    "Sequence received",
                    MessageType::Message,
                )
                .await
                .unwrap();
            storage
                .mark_read_impl(thread.id, ParticipantSide::Student)
                .await
                .unwrap();
        }

        assert!(storage.locks.is_empty());
    }
}
