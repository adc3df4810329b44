use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 消息类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/discussion.ts")]
pub enum MessageType {
    Message,  // 普通消息
    Feedback, // 审阅时附带的反馈
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Message => "message",
            MessageType::Feedback => "feedback",
        }
    }
}

impl std::str::FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(MessageType::Message),
            "feedback" => Ok(MessageType::Feedback),
            _ => Err(format!("Invalid message type: {s}")),
        }
    }
}

// 讨论主题；clone_id 为空表示学生的综合讨论
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/discussion.ts")]
pub struct Discussion {
    pub id: i64,
    pub student_id: i64,
    pub clone_id: Option<i64>,
    pub last_seq: i64,
    pub message_count: i64,
    pub last_activity_at: chrono::DateTime<chrono::Utc>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// 讨论消息
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/discussion.ts")]
pub struct DiscussionMessage {
    pub id: i64,
    pub discussion_id: i64,
    pub seq: i64,
    pub sender_id: i64,
    pub content: String,
    pub message_type: MessageType,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
