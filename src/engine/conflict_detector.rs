// ==========================================
// 需求协调驾驶舱 - 冲突判定引擎
// ==========================================
// 输入: 单个需求在单个迭代内的规范状态（每供应商一条）
// 规则:
// - 至少两个供应商给出“不同的”非接受状态 → 冲突
// - Unknown 计为非接受信号
// - 同为 Rejected / 同为 Unknown 视为一致，不构成冲突
// 红线: 冲突是派生事实，不落库，随时可由当前反馈重新计算
// ==========================================

use crate::domain::types::CanonicalStatus;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResult {
    pub is_conflict: bool,
    /// 冲突时为全部给出非接受状态的供应商；无冲突时为空
    pub disagreeing_suppliers: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictDetector;

impl ConflictDetector {
    pub fn new() -> Self {
        Self
    }

    /// 判定冲突
    ///
    /// # 参数
    /// - responses: (供应商名称, 规范状态)；同一供应商出现多次时以最后一条为准
    pub fn detect<'a, I>(&self, responses: I) -> ConflictResult
    where
        I: IntoIterator<Item = (&'a str, CanonicalStatus)>,
    {
        let by_supplier: BTreeMap<&str, CanonicalStatus> = responses.into_iter().collect();

        let negative: Vec<(&str, CanonicalStatus)> = by_supplier
            .into_iter()
            .filter(|(_, status)| status.is_negative())
            .collect();

        let distinct: BTreeSet<CanonicalStatus> = negative.iter().map(|(_, s)| *s).collect();
        if distinct.len() < 2 {
            return ConflictResult::default();
        }

        ConflictResult {
            is_conflict: true,
            disagreeing_suppliers: negative.into_iter().map(|(s, _)| s.to_string()).collect(),
        }
    }
}
