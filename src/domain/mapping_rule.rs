// ==========================================
// 需求协调驾驶舱 - 状态映射规则
// ==========================================
// 唯一键: (supplier_id?, raw_status)，supplier_id 为空即全局规则
// ==========================================

use crate::domain::types::CanonicalStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMappingRule {
    pub rule_id: i64,
    /// None = 全局默认规则
    pub supplier_id: Option<i64>,
    /// 已规范化（trim + 小写 + 空白折叠）的原始状态
    pub raw_status: String,
    pub canonical_status: CanonicalStatus,
    pub updated_at: NaiveDateTime,
}

/// 原始状态规范化键：去首尾空白、折叠内部空白、小写
///
/// 规则存储与查找使用同一函数，保证精确匹配的一致性。
pub fn normalize_status_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_status_key() {
        assert_eq!(normalize_status_key("  To   Be\tClarified "), "to be clarified");
        assert_eq!(normalize_status_key("OK"), "ok");
        assert_eq!(normalize_status_key("   "), "");
    }
}
