use serde::Serialize;
use ts_rs::TS;

use super::entities::{Discussion, DiscussionMessage};

// 列表中的最后一条消息预览
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/discussion.ts")]
pub struct MessagePreview {
    pub sender_id: i64,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// 讨论列表项，unread_count 为查看者一侧的计数
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/discussion.ts")]
pub struct DiscussionSummary {
    pub id: i64,
    pub student_id: i64,
    pub clone_id: Option<i64>,
    pub unread_count: i64,
    pub message_count: i64,
    pub last_message: Option<MessagePreview>,
    pub last_activity_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/discussion.ts")]
pub struct DiscussionListResponse {
    pub items: Vec<DiscussionSummary>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/discussion.ts")]
pub struct DiscussionResponse {
    pub discussion: Discussion,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/discussion.ts")]
pub struct MessageListResponse {
    pub items: Vec<DiscussionMessage>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/discussion.ts")]
pub struct PostMessageResponse {
    pub message: DiscussionMessage,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/discussion.ts")]
pub struct MarkReadResponse {
    pub discussion_id: i64,
    pub unread_count: i64,
    pub last_read_seq: i64,
}

/// 按字符截断预览文本
pub fn truncate_preview(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_preview() {
        assert_eq!(truncate_preview("hello", 10), "hello");
        assert_eq!(truncate_preview("hello world", 5), "hello...");
        assert_eq!(truncate_preview("序列分析结果", 2), "序列...");
    }
}
