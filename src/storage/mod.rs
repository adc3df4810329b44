use std::sync::Arc;

use crate::models::{
    PaginationInfo,
    clones::{
        entities::CloneSubmission,
        requests::{CloneListQuery, CreateCloneRequest},
        status::CloneStatus,
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

use crate::errors::Result;

pub mod sea_orm_storage;

/// 一次状态写入附带的其他列变更
#[derive(Debug, Clone)]
pub struct CloneTransition {
    pub to: CloneStatus,
    /// 调用方读到的版本号；为空时使用当前版本
    pub expected_version: Option<i32>,
    /// Some(None) 表示清空分配
    pub assigned_to: Option<Option<i64>>,
    pub review: Option<ReviewRecord>,
    /// 清空分析与审阅记录，换人时使用
    pub reset_work: bool,
}

impl CloneTransition {
    pub fn to(status: CloneStatus) -> Self {
        Self {
            to: status,
            expected_version: None,
            assigned_to: None,
            review: None,
            reset_work: false,
        }
    }

    pub fn expecting(mut self, version: Option<i32>) -> Self {
        self.expected_version = version;
        self
    }

    pub fn assign(mut self, student_id: Option<i64>) -> Self {
        self.assigned_to = Some(student_id);
        self
    }

    pub fn reset_work(mut self) -> Self {
        self.reset_work = true;
        self
    }

    pub fn reviewed(mut self, reviewer_id: i64, feedback: Option<String>) -> Self {
        self.review = Some(ReviewRecord {
            reviewer_id,
            feedback,
        });
        self
    }
}

#[derive(Debug, Clone)]
pub struct ReviewRecord {
    pub reviewer_id: i64,
    pub feedback: Option<String>,
}

/// 讨论列表可见范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscussionScope {
    All,
    School(i64),
    Student(i64),
}

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// 用户管理方法
    // 创建用户（password 字段已是哈希值）
    async fn create_user(&self, user: CreateUserRequest, status: UserStatus) -> Result<User>;
    // 通过ID获取用户信息
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;
    // 通过用户名获取用户信息
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    // 通过邮箱获取用户信息
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    // 通过用户名或邮箱获取用户信息
    async fn get_user_by_username_or_email(&self, identifier: &str) -> Result<Option<User>>;
    // 列出用户
    async fn list_users_with_pagination(&self, query: UserListQuery) -> Result<UserListResponse>;
    // 更新用户信息
    async fn update_user(&self, id: i64, update: UpdateUserRequest) -> Result<Option<User>>;
    // 更新用户最后登录时间
    async fn update_last_login(&self, id: i64) -> Result<bool>;
    // 统计用户数量
    async fn count_users(&self) -> Result<u64>;

    /// 学校管理方法
    async fn create_school(&self, name: &str) -> Result<School>;
    async fn get_school_by_id(&self, id: i64) -> Result<Option<School>>;
    async fn list_schools(&self) -> Result<Vec<School>>;

    /// 克隆管理方法
    // 创建克隆，初始状态由类型决定
    async fn create_clone(&self, req: CreateCloneRequest, created_by: i64)
    -> Result<CloneSubmission>;
    async fn get_clone_by_id(&self, id: i64) -> Result<Option<CloneSubmission>>;
    async fn list_clones_with_pagination(
        &self,
        query: CloneListQuery,
    ) -> Result<(Vec<CloneSubmission>, PaginationInfo)>;
    // 状态写入：迁移校验 + 乐观锁
    async fn transition_clone(&self, id: i64, change: CloneTransition) -> Result<CloneSubmission>;
    // 保存分析结果：仅限被分配学生，且状态可编辑
    async fn update_clone_analysis(
        &self,
        id: i64,
        editor_id: i64,
        analysis: serde_json::Value,
    ) -> Result<CloneSubmission>;
    // 删除克隆：已分配时拒绝
    async fn delete_clone(&self, id: i64) -> Result<bool>;

    /// 讨论管理方法
    async fn get_discussion_by_id(&self, id: i64) -> Result<Option<Discussion>>;
    // 获取或创建学生的讨论；clone_id 为空即综合讨论
    async fn get_or_create_discussion(
        &self,
        student_id: i64,
        clone_id: Option<i64>,
    ) -> Result<Discussion>;
    // 发送消息：序号递增，对侧未读加一
    async fn post_message(
        &self,
        discussion_id: i64,
        sender_id: i64,
        sender_side: ParticipantSide,
        content: &str,
        message_type: MessageType,
    ) -> Result<DiscussionMessage>;
    // 标记已读：清零本侧
    async fn mark_read(&self, discussion_id: i64, side: ParticipantSide) -> Result<SideState>;
    async fn get_read_state(&self, discussion_id: i64) -> Result<UnreadLedger>;
    async fn list_discussions(
        &self,
        scope: DiscussionScope,
        side: ParticipantSide,
        unread_only: bool,
        preview_length: usize,
    ) -> Result<Vec<DiscussionSummary>>;
    async fn list_messages(&self, discussion_id: i64) -> Result<Vec<DiscussionMessage>>;
    async fn delete_discussion(&self, id: i64) -> Result<bool>;
}

pub async fn create_storage() -> Result<Arc<dyn Storage>> {
    let storage = sea_orm_storage::SeaOrmStorage::new_async().await?;
    Ok(Arc::new(storage))
}
