//! SeaORM 存储实现
//!
//! 统一的数据库存储层，支持 SQLite、PostgreSQL 和 MySQL。

mod clones;
mod discussions;
pub mod locks;
mod schools;
mod users;

use crate::config::AppConfig;
use crate::errors::{CloneLabError, Result};
use locks::KeyedLocks;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// SeaORM 存储实现
#[derive(Clone)]
pub struct SeaOrmStorage {
    pub(crate) db: DatabaseConnection,
    pub(crate) locks: Arc<KeyedLocks>,
}

impl SeaOrmStorage {
    /// 创建新的 SeaORM 存储实例
    pub async fn new_async() -> Result<Self> {
        let config = AppConfig::get();
        Self::connect(
            &config.database.url,
            config.database.pool_size,
            config.database.timeout,
        )
        .await
    }

    /// 按给定参数建立连接并运行迁移
    pub async fn connect(url: &str, pool_size: u32, timeout: u64) -> Result<Self> {
        let db_url = Self::build_database_url(url)?;

        // 根据数据库类型选择连接方式
        let db = if db_url.starts_with("sqlite://") {
            Self::connect_sqlite(&db_url, pool_size, timeout).await?
        } else {
            Self::connect_generic(&db_url, pool_size, timeout).await?
        };

        // 运行迁移
        Migrator::up(&db, None)
            .await
            .map_err(|e| CloneLabError::database_operation(format!("数据库迁移失败: {e}")))?;

        info!("SeaORM 存储初始化完成，数据库: {}", db_url);

        Ok(Self {
            db,
            locks: Arc::new(KeyedLocks::new()),
        })
    }

    /// SQLite 专用连接（WAL + pragma 优化）
    async fn connect_sqlite(url: &str, pool_size: u32, timeout: u64) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
        };
        use std::str::FromStr;

        let opt = SqliteConnectOptions::from_str(url)
            .map_err(|e| CloneLabError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .pragma("cache_size", "-64000")
            .pragma("temp_store", "memory");

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .min_connections(1)
            .test_before_acquire(true)
            .acquire_timeout(Duration::from_secs(timeout))
            .idle_timeout(Duration::from_secs(300))
            .connect_with(opt)
            .await
            .map_err(|e| CloneLabError::database_connection(format!("SQLite 连接失败: {e}")))?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    /// 通用连接（PostgreSQL、MySQL 等）
    async fn connect_generic(
        url: &str,
        pool_size: u32,
        timeout: u64,
    ) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(pool_size)
            .min_connections(2)
            .connect_timeout(Duration::from_secs(timeout))
            .acquire_timeout(Duration::from_secs(timeout))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .sqlx_logging(false)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        Database::connect(opt)
            .await
            .map_err(|e| CloneLabError::database_connection(format!("无法连接到数据库: {e}")))
    }

    /// 从 URL 自动推断数据库类型并构建连接 URL
    fn build_database_url(url: &str) -> Result<String> {
        if url.starts_with("sqlite://") {
            Ok(url.to_string())
        } else if url.ends_with(".db") || url.ends_with(".sqlite") {
            Ok(format!("sqlite://{url}?mode=rwc"))
        } else if url.starts_with("postgres://")
            || url.starts_with("postgresql://")
            || url.starts_with("mysql://")
            || url.starts_with("mariadb://")
        {
            Ok(url.to_string())
        } else {
            Err(CloneLabError::database_config(format!(
                "无法从 URL 推断数据库类型: {url}. 支持: sqlite://, postgres://, mysql://, 或 .db/.sqlite 文件路径"
            )))
        }
    }
}

// Storage trait 实现
use super::{CloneTransition, DiscussionScope, Storage};
use crate::models::{
    PaginationInfo,
    clones::{
        entities::CloneSubmission,
        requests::{CloneListQuery, CreateCloneRequest},
    },
    discussions::{
        entities::{Discussion, DiscussionMessage, MessageType},
        read_tracking::{ParticipantSide, SideState, UnreadLedger},
        responses::DiscussionSummary,
    },
    schools::School,
    users::{
        entities::{User, UserStatus},
        requests::{CreateUserRequest, UpdateUserRequest, UserListQuery},
        responses::UserListResponse,
    },
};
use async_trait::async_trait;

#[async_trait]
impl Storage for SeaOrmStorage {
    // 用户模块
    async fn create_user(&self, user: CreateUserRequest, status: UserStatus) -> Result<User> {
        self.create_user_impl(user, status).await
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.get_user_by_id_impl(id).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.get_user_by_username_impl(username).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.get_user_by_email_impl(email).await
    }

    async fn get_user_by_username_or_email(&self, identifier: &str) -> Result<Option<User>> {
        self.get_user_by_username_or_email_impl(identifier).await
    }

    async fn list_users_with_pagination(&self, query: UserListQuery) -> Result<UserListResponse> {
        self.list_users_with_pagination_impl(query).await
    }

    async fn update_user(&self, id: i64, update: UpdateUserRequest) -> Result<Option<User>> {
        self.update_user_impl(id, update).await
    }

    async fn update_last_login(&self, id: i64) -> Result<bool> {
        self.update_last_login_impl(id).await
    }

    async fn count_users(&self) -> Result<u64> {
        self.count_users_impl().await
    }

    // 学校模块
    async fn create_school(&self, name: &str) -> Result<School> {
        self.create_school_impl(name).await
    }

    async fn get_school_by_id(&self, id: i64) -> Result<Option<School>> {
        self.get_school_by_id_impl(id).await
    }

    async fn list_schools(&self) -> Result<Vec<School>> {
        self.list_schools_impl().await
    }

    // 克隆模块
    async fn create_clone(
        &self,
        req: CreateCloneRequest,
        created_by: i64,
    ) -> Result<CloneSubmission> {
        self.create_clone_impl(req, created_by).await
    }

    async fn get_clone_by_id(&self, id: i64) -> Result<Option<CloneSubmission>> {
        self.get_clone_by_id_impl(id).await
    }

    async fn list_clones_with_pagination(
        &self,
        query: CloneListQuery,
    ) -> Result<(Vec<CloneSubmission>, PaginationInfo)> {
        self.list_clones_with_pagination_impl(query).await
    }

    async fn transition_clone(&self, id: i64, change: CloneTransition) -> Result<CloneSubmission> {
        self.transition_clone_impl(id, change).await
    }

    async fn update_clone_analysis(
        &self,
        id: i64,
        editor_id: i64,
        analysis: serde_json::Value,
    ) -> Result<CloneSubmission> {
        self.update_clone_analysis_impl(id, editor_id, analysis)
            .await
    }

    async fn delete_clone(&self, id: i64) -> Result<bool> {
        self.delete_clone_impl(id).await
    }

    // 讨论模块
    async fn get_discussion_by_id(&self, id: i64) -> Result<Option<Discussion>> {
        self.get_discussion_by_id_impl(id).await
    }

    async fn get_or_create_discussion(
        &self,
        student_id: i64,
        clone_id: Option<i64>,
    ) -> Result<Discussion> {
        self.get_or_create_discussion_impl(student_id, clone_id)
            .await
    }

    async fn post_message(
        &self,
        discussion_id: i64,
        sender_id: i64,
        sender_side: ParticipantSide,
        content: &str,
        message_type: MessageType,
    ) -> Result<DiscussionMessage> {
        self.post_message_impl(discussion_id, sender_id, sender_side, content, message_type)
            .await
    }

    async fn mark_read(&self, discussion_id: i64, side: ParticipantSide) -> Result<SideState> {
        self.mark_read_impl(discussion_id, side).await
    }

    async fn get_read_state(&self, discussion_id: i64) -> Result<UnreadLedger> {
        self.get_read_state_impl(discussion_id).await
    }

    async fn list_discussions(
        &self,
        scope: DiscussionScope,
        side: ParticipantSide,
        unread_only: bool,
        preview_length: usize,
    ) -> Result<Vec<DiscussionSummary>> {
        self.list_discussions_impl(scope, side, unread_only, preview_length)
            .await
    }

    async fn list_messages(&self, discussion_id: i64) -> Result<Vec<DiscussionMessage>> {
        self.list_messages_impl(discussion_id).await
    }

    async fn delete_discussion(&self, id: i64) -> Result<bool> {
        self.delete_discussion_impl(id).await
    }
}
