use serde::Deserialize;
use ts_rs::TS;

// 发送消息
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/discussion.ts")]
pub struct PostMessageRequest {
    pub content: String,
}

// 讨论列表查询参数
#[derive(Debug, Default, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/discussion.ts")]
pub struct DiscussionListParams {
    /// 仅返回有未读消息的讨论
    #[serde(default)]
    pub unread_only: bool,
}

// 获取综合讨论；教职人员需指定学生
#[derive(Debug, Default, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/discussion.ts")]
pub struct GeneralThreadParams {
    pub student_id: Option<i64>,
}
