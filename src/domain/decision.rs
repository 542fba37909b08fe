// ==========================================
// 需求协调驾驶舱 - 决策实体
// ==========================================
// 每个 (需求, 迭代) 至多一条决策，重复保存原地更新
// ==========================================

use crate::domain::types::DecisionStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 决策备注默认最大长度（字符）
pub const DEFAULT_MAX_NOTE_LENGTH: usize = 2000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub decision_id: i64,
    pub requirement_id: i64,
    pub iteration_key: i64,
    pub status: DecisionStatus,
    pub note: String,
    pub author: String,
    pub decided_at: NaiveDateTime,
}

/// 决策历史条目（跨迭代）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionHistoryEntry {
    pub iteration_id: String,
    pub decision: Decision,
}
