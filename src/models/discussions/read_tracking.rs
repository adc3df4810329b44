//! 讨论未读计数
//!
//! 每个讨论固定两侧：学生侧与教职侧。发消息只增加对侧的未读数，
//! 打开讨论只清零自己一侧。这里只做纯计算，持久化与加锁在存储层。

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::models::users::entities::UserRole;

// 参与方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/discussion.ts")]
pub enum ParticipantSide {
    Student,
    Staff,
}

impl ParticipantSide {
    pub const BOTH: [ParticipantSide; 2] = [ParticipantSide::Student, ParticipantSide::Staff];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantSide::Student => "student",
            ParticipantSide::Staff => "staff",
        }
    }

    pub fn counterpart(&self) -> Self {
        match self {
            ParticipantSide::Student => ParticipantSide::Staff,
            ParticipantSide::Staff => ParticipantSide::Student,
        }
    }
}

impl std::str::FromStr for ParticipantSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(ParticipantSide::Student),
            "staff" => Ok(ParticipantSide::Staff),
            _ => Err(format!("Invalid participant side: {s}")),
        }
    }
}

/// 教师与负责人共用教职侧
pub fn side_for_role(role: UserRole) -> ParticipantSide {
    if role.is_staff() {
        ParticipantSide::Staff
    } else {
        ParticipantSide::Student
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SideState {
    pub unread_count: i64,
    pub last_read_seq: i64,
}

/// 一个讨论两侧的计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnreadLedger {
    pub student: SideState,
    pub staff: SideState,
}

impl UnreadLedger {
    pub fn side(&self, side: ParticipantSide) -> &SideState {
        match side {
            ParticipantSide::Student => &self.student,
            ParticipantSide::Staff => &self.staff,
        }
    }

    fn side_mut(&mut self, side: ParticipantSide) -> &mut SideState {
        match side {
            ParticipantSide::Student => &mut self.student,
            ParticipantSide::Staff => &mut self.staff,
        }
    }

    /// 用持久化的计数覆盖某一侧
    pub fn set_side(&mut self, side: ParticipantSide, state: SideState) {
        *self.side_mut(side) = state;
    }

    pub fn unread_for(&self, side: ParticipantSide) -> i64 {
        self.side(side).unread_count
    }

    /// 发送方一侧不变，对侧加一
    pub fn on_post(&mut self, sender: ParticipantSide) {
        self.side_mut(sender.counterpart()).unread_count += 1;
    }

    /// 清零本侧，已读位置推进到已提交的最新序号
    pub fn on_read(&mut self, side: ParticipantSide, committed_seq: i64) {
        let state = self.side_mut(side);
        state.unread_count = 0;
        state.last_read_seq = state.last_read_seq.max(committed_seq);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_for_role() {
        assert_eq!(side_for_role(UserRole::Student), ParticipantSide::Student);
        assert_eq!(side_for_role(UserRole::Instructor), ParticipantSide::Staff);
        assert_eq!(side_for_role(UserRole::Director), ParticipantSide::Staff);
    }

    #[test]
    fn test_posts_then_read_then_post() {
        let mut ledger = UnreadLedger::default();
        ledger.on_post(ParticipantSide::Staff);
        ledger.on_post(ParticipantSide::Staff);
        assert_eq!(ledger.unread_for(ParticipantSide::Student), 2);
        assert_eq!(ledger.unread_for(ParticipantSide::Staff), 0);

        ledger.on_read(ParticipantSide::Student, 2);
        assert_eq!(ledger.unread_for(ParticipantSide::Student), 0);
        assert_eq!(ledger.student.last_read_seq, 2);

        ledger.on_post(ParticipantSide::Staff);
        assert_eq!(ledger.unread_for(ParticipantSide::Student), 1);
        assert_eq!(ledger.unread_for(ParticipantSide::Staff), 0);
    }

    #[test]
    fn test_read_is_idempotent() {
        let mut ledger = UnreadLedger::default();
        ledger.on_post(ParticipantSide::Student);
        ledger.on_read(ParticipantSide::Staff, 1);
        let once = ledger;
        ledger.on_read(ParticipantSide::Staff, 1);
        assert_eq!(ledger, once);
    }

    #[test]
    fn test_last_read_seq_never_moves_back() {
        let mut ledger = UnreadLedger::default();
        ledger.on_read(ParticipantSide::Staff, 5);
        ledger.on_read(ParticipantSide::Staff, 3);
        assert_eq!(ledger.staff.last_read_seq, 5);
    }

    #[test]
    fn test_side_parse() {
        for side in ParticipantSide::BOTH {
            assert_eq!(side.as_str().parse::<ParticipantSide>().unwrap(), side);
        }
        assert!("admin".parse::<ParticipantSide>().is_err());
    }
}
