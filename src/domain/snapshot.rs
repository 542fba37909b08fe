// ==========================================
// 需求协调驾驶舱 - 迭代快照
// ==========================================
// 视图构建的输入: 同一读事务内取出的一致数据
// 当前迭代作为显式参数传入，不存在进程级“当前迭代”状态
// ==========================================

use crate::domain::decision::Decision;
use crate::domain::project::{Iteration, Supplier};
use crate::domain::requirement::{MasterRequirement, SupplierFeedback};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationSnapshot {
    pub iteration: Iteration,
    /// 按创建顺序
    pub suppliers: Vec<Supplier>,
    /// 按插入顺序
    pub requirements: Vec<MasterRequirement>,
    pub feedback: Vec<SupplierFeedback>,
    pub decisions: Vec<Decision>,
}

/// 迭代时间线条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationTimelineEntry {
    pub iteration_key: i64,
    pub iteration_id: String,
    pub created_at: NaiveDateTime,
    pub closed_at: Option<NaiveDateTime>,
    pub feedback_count: usize,
    pub supplier_count: usize,
    pub decision_count: usize,
}
