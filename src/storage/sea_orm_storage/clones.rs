//! 克隆存储操作
//!
//! 状态写入统一走 `transition_clone_impl`：先做迁移校验，
//! 再以 `WHERE id = ? AND version = ?` 条件更新，影响行数为 0 即视为并发冲突。

use super::SeaOrmStorage;
use crate::entity::clones::{ActiveModel, Column, Entity as Clones, Model};
use crate::errors::{CloneLabError, Result};
use crate::models::{
    PaginationInfo,
    clones::{
        entities::{CloneKind, CloneSubmission},
        requests::{CloneListQuery, CloneScope, CreateCloneRequest},
        status::{CloneStatus, StoredStatus},
    },
};
use crate::storage::CloneTransition;
use crate::utils::like_contains;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set,
};
use tracing::info;

/// 状态列可能存着旧标签，筛选时两种写法都要匹配
fn status_values(statuses: &[CloneStatus]) -> Vec<String> {
    statuses
        .iter()
        .flat_map(|s| s.stored_spellings())
        .map(str::to_string)
        .collect()
}

impl SeaOrmStorage {
    async fn find_clone_model(&self, id: i64) -> Result<Model> {
        Clones::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CloneLabError::database_operation(format!("查询克隆失败: {e}")))?
            .ok_or_else(|| CloneLabError::not_found(format!("克隆不存在: {id}")))
    }

    /// 创建克隆
    pub async fn create_clone_impl(
        &self,
        req: CreateCloneRequest,
        created_by: i64,
    ) -> Result<CloneSubmission> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(CloneLabError::validation("克隆名称不能为空"));
        }

        let now = chrono::Utc::now().timestamp();
        let model = ActiveModel {
            kind: Set(req.kind.to_string()),
            name: Set(name.to_string()),
            school_id: Set(req.school_id),
            status: Set(Some(req.kind.initial_status().to_string())),
            assigned_to: Set(None),
            analysis: Set(None),
            feedback: Set(None),
            reviewed_by: Set(None),
            reviewed_at: Set(None),
            version: Set(0),
            created_by: Set(created_by),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| CloneLabError::database_operation(format!("创建克隆失败: {e}")))?;

        Ok(result.into_clone())
    }

    /// 通过 ID 获取克隆
    pub async fn get_clone_by_id_impl(&self, id: i64) -> Result<Option<CloneSubmission>> {
        let result = Clones::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CloneLabError::database_operation(format!("查询克隆失败: {e}")))?;

        Ok(result.map(|m| m.into_clone()))
    }

    /// 分页列出克隆
    pub async fn list_clones_with_pagination_impl(
        &self,
        query: CloneListQuery,
    ) -> Result<(Vec<CloneSubmission>, PaginationInfo)> {
        let page = query.page.max(1);
        let size = query.size.max(1);

        let mut select = Clones::find();

        select = match query.scope {
            CloneScope::All => select,
            CloneScope::School(school_id) => select.filter(Column::SchoolId.eq(school_id)),
            CloneScope::Student(student_id) => select.filter(
                Condition::any().add(Column::AssignedTo.eq(student_id)).add(
                    Condition::all()
                        .add(Column::Kind.eq(CloneKind::Practice.to_string()))
                        .add(Column::Status.is_in(status_values(&[CloneStatus::Available]))),
                ),
            ),
        };

        if let Some(status) = query.status {
            select = select.filter(Column::Status.is_in(status_values(&[status])));
        }

        if query.review_ready {
            select = select.filter(Column::Status.is_in(status_values(&[
                CloneStatus::CompletedWaitingReview,
                CloneStatus::CorrectedWaitingReview,
            ])));
        }

        if let Some(kind) = query.kind {
            select = select.filter(Column::Kind.eq(kind.to_string()));
        }

        if let Some(assigned_to) = query.assigned_to {
            select = select.filter(Column::AssignedTo.eq(assigned_to));
        }

        if let Some(ref search) = query.search
            && !search.trim().is_empty()
        {
            select = select.filter(Column::Name.like(like_contains(search.trim())));
        }

        select = select
            .order_by_desc(Column::UpdatedAt)
            .order_by_desc(Column::Id);

        let paginator = select.paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| CloneLabError::database_operation(format!("查询克隆总数失败: {e}")))?;

        let clones = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| CloneLabError::database_operation(format!("查询克隆列表失败: {e}")))?;

        Ok((
            clones.into_iter().map(|m| m.into_clone()).collect(),
            PaginationInfo::new(page, size, total),
        ))
    }

    /// 状态迁移（含分配、审阅等附带变更）
    pub async fn transition_clone_impl(
        &self,
        id: i64,
        change: CloneTransition,
    ) -> Result<CloneSubmission> {
        let current = self.find_clone_model(id).await?;

        if let Some(expected) = change.expected_version
            && expected != current.version
        {
            return Err(CloneLabError::concurrency_conflict(format!(
                "克隆 {id} 已被修改 (期望版本 {expected}, 当前版本 {})",
                current.version
            )));
        }

        let from = StoredStatus::from_raw(current.status.as_deref());
        from.check_transition_to(change.to)?;

        let now = chrono::Utc::now().timestamp();
        let mut update = Clones::update_many()
            .col_expr(Column::Status, Expr::value(Some(change.to.to_string())))
            .col_expr(Column::Version, Expr::value(current.version + 1))
            .col_expr(Column::UpdatedAt, Expr::value(now));

        if let Some(assigned_to) = change.assigned_to {
            update = update.col_expr(Column::AssignedTo, Expr::value(assigned_to));
        }

        if change.reset_work {
            update = update
                .col_expr(Column::Analysis, Expr::value(Option::<String>::None))
                .col_expr(Column::Feedback, Expr::value(Option::<String>::None))
                .col_expr(Column::ReviewedBy, Expr::value(Option::<i64>::None))
                .col_expr(Column::ReviewedAt, Expr::value(Option::<i64>::None));
        }

        if let Some(review) = change.review {
            update = update
                .col_expr(Column::ReviewedBy, Expr::value(Some(review.reviewer_id)))
                .col_expr(Column::ReviewedAt, Expr::value(Some(now)));
            if let Some(feedback) = review.feedback {
                update = update.col_expr(Column::Feedback, Expr::value(Some(feedback)));
            }
        }

        let result = update
            .filter(Column::Id.eq(id))
            .filter(Column::Version.eq(current.version))
            .exec(&self.db)
            .await
            .map_err(|e| CloneLabError::database_operation(format!("更新克隆状态失败: {e}")))?;

        if result.rows_affected == 0 {
            return Err(CloneLabError::concurrency_conflict(format!(
                "克隆 {id} 已被其他请求修改，请刷新后重试"
            )));
        }

        info!(
            clone_id = id,
            from = from.raw().unwrap_or("none"),
            to = change.to.as_str(),
            version = current.version + 1,
            "Clone status changed"
        );

        Ok(self.find_clone_model(id).await?.into_clone())
    }

    /// 保存分析结果
    pub async fn update_clone_analysis_impl(
        &self,
        id: i64,
        editor_id: i64,
        analysis: serde_json::Value,
    ) -> Result<CloneSubmission> {
        let current = self.find_clone_model(id).await?;

        if current.assigned_to != Some(editor_id) {
            return Err(CloneLabError::authorization(
                "只有被分配的学生可以编辑该克隆的分析",
            ));
        }

        let status = StoredStatus::from_raw(current.status.as_deref());
        if !status.editable() {
            return Err(CloneLabError::authorization(format!(
                "当前状态不可编辑: {}",
                status.raw().unwrap_or("none")
            )));
        }

        let serialized = serde_json::to_string(&analysis)?;
        let result = Clones::update_many()
            .col_expr(Column::Analysis, Expr::value(Some(serialized)))
            .col_expr(
                Column::UpdatedAt,
                Expr::value(chrono::Utc::now().timestamp()),
            )
            .filter(Column::Id.eq(id))
            .filter(Column::Version.eq(current.version))
            .filter(Column::AssignedTo.eq(editor_id))
            .exec(&self.db)
            .await
            .map_err(|e| CloneLabError::database_operation(format!("保存分析结果失败: {e}")))?;

        if result.rows_affected == 0 {
            return Err(CloneLabError::concurrency_conflict(format!(
                "克隆 {id} 的状态已变化，请刷新后重试"
            )));
        }

        Ok(self.find_clone_model(id).await?.into_clone())
    }

    /// 删除克隆；仍分配给学生时拒绝
    pub async fn delete_clone_impl(&self, id: i64) -> Result<bool> {
        let result = Clones::delete_many()
            .filter(Column::Id.eq(id))
            .filter(Column::AssignedTo.is_null())
            .exec(&self.db)
            .await
            .map_err(|e| CloneLabError::database_operation(format!("删除克隆失败: {e}")))?;

        if result.rows_affected > 0 {
            info!(clone_id = id, "Clone deleted");
            return Ok(true);
        }

        match self.get_clone_by_id_impl(id).await? {
            None => Ok(false),
            Some(clone) if clone.is_assigned() => Err(CloneLabError::validation(
                "克隆已分配给学生，请先取消分配再删除",
            )),
            Some(_) => Ok(false),
        }
    }
}
