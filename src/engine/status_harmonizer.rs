// ==========================================
// 需求协调驾驶舱 - 状态映射引擎
// ==========================================
// 职责: 供应商原始状态 → 规范状态 + 置信度指示
// 红线: 纯函数，无副作用；同一输入与规则集永远得到同一结果
// ==========================================
// 解析顺序（命中即返回，顺序本身是契约）:
// 1. 供应商专属规则（精确，trim + 小写 + 空白折叠）
// 2. 全局规则（库内全局规则覆盖内置默认表）
// 3. 同义词包含匹配（Rejected → ClarificationNeeded → Accepted）
// 4. Unknown，matched = false
// ==========================================

use crate::domain::mapping_rule::{normalize_status_key, StatusMappingRule};
use crate::domain::types::{CanonicalStatus, HarmonizeStage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 内置默认映射表（精确匹配，键已规范化）
const DEFAULT_TABLE: &[(&str, CanonicalStatus)] = &[
    ("ok", CanonicalStatus::Accepted),
    ("accepted", CanonicalStatus::Accepted),
    ("agreed", CanonicalStatus::Accepted),
    ("compliant", CanonicalStatus::Accepted),
    ("confirmed", CanonicalStatus::Accepted),
    ("yes", CanonicalStatus::Accepted),
    ("needs clarification", CanonicalStatus::ClarificationNeeded),
    ("tobeclarified", CanonicalStatus::ClarificationNeeded),
    ("to be clarified", CanonicalStatus::ClarificationNeeded),
    ("unclear", CanonicalStatus::ClarificationNeeded),
    ("question", CanonicalStatus::ClarificationNeeded),
    ("pending", CanonicalStatus::ClarificationNeeded),
    ("not accepted", CanonicalStatus::Rejected),
    ("rejected", CanonicalStatus::Rejected),
    ("notagreed", CanonicalStatus::Rejected),
    ("not agreed", CanonicalStatus::Rejected),
    ("declined", CanonicalStatus::Rejected),
    ("no", CanonicalStatus::Rejected),
    ("nok", CanonicalStatus::Rejected),
];

/// 同义词组（自上而下评估；否定组优先，"nok"/"not ok" 不会被 "ok" 抢先命中）
const SYNONYM_GROUPS: &[(CanonicalStatus, &[&str])] = &[
    (
        CanonicalStatus::Rejected,
        &["reject", "not agreed", "not accept", "nok", "not ok", "declin", "disagree", "refus"],
    ),
    (
        CanonicalStatus::ClarificationNeeded,
        &["clarif", "tbc", "tbd", "question", "unclear", "pending"],
    ),
    (
        CanonicalStatus::Accepted,
        &["accept", "ok", "compliant", "comply", "agree", "confirm", "approved"],
    ),
];

// ==========================================
// Harmonized - 映射结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Harmonized {
    pub status: CanonicalStatus,
    /// false 表示未命中任何规则（status 为 Unknown）
    pub matched: bool,
    /// 命中阶段（置信度）
    pub stage: HarmonizeStage,
}

impl Harmonized {
    fn hit(status: CanonicalStatus, stage: HarmonizeStage) -> Self {
        Self {
            status,
            matched: true,
            stage,
        }
    }

    fn unmatched() -> Self {
        Self {
            status: CanonicalStatus::Unknown,
            matched: false,
            stage: HarmonizeStage::Unmatched,
        }
    }
}

// ==========================================
// RuleSet - 规则集快照
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    supplier: HashMap<(i64, String), CanonicalStatus>,
    global: HashMap<String, CanonicalStatus>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从库内规则构建
    pub fn from_rules(rules: &[StatusMappingRule]) -> Self {
        let mut set = Self::new();
        for rule in rules {
            set.insert(rule.supplier_id, &rule.raw_status, rule.canonical_status);
        }
        set
    }

    /// 添加规则（键内部规范化，后写覆盖）
    pub fn insert(&mut self, supplier_id: Option<i64>, raw_status: &str, status: CanonicalStatus) {
        let key = normalize_status_key(raw_status);
        match supplier_id {
            Some(id) => {
                self.supplier.insert((id, key), status);
            }
            None => {
                self.global.insert(key, status);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.supplier.len() + self.global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ==========================================
// StatusHarmonizer - 状态映射引擎
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct StatusHarmonizer {
    rules: RuleSet,
}

impl StatusHarmonizer {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// 映射原始状态
    ///
    /// # 参数
    /// - raw_status: 供应商原始状态（空白视为无状态 → Unknown）
    /// - supplier_id: 供应商（None 时跳过专属规则）
    ///
    /// # 返回
    /// Harmonized { status, matched, stage }
    pub fn normalize(&self, raw_status: &str, supplier_id: Option<i64>) -> Harmonized {
        let key = normalize_status_key(raw_status);
        if key.is_empty() {
            return Harmonized::unmatched();
        }

        // === 步骤 1: 供应商专属规则 ===
        if let Some(id) = supplier_id {
            if let Some(&status) = self.rules.supplier.get(&(id, key.clone())) {
                return Harmonized::hit(status, HarmonizeStage::SupplierRule);
            }
        }

        // === 步骤 2: 全局规则（库内优先，其次内置默认表） ===
        if let Some(&status) = self.rules.global.get(&key) {
            return Harmonized::hit(status, HarmonizeStage::GlobalRule);
        }
        if let Some(&(_, status)) = DEFAULT_TABLE.iter().find(|(raw, _)| *raw == key) {
            return Harmonized::hit(status, HarmonizeStage::DefaultTable);
        }

        // === 步骤 3: 同义词包含匹配 ===
        for (status, synonyms) in SYNONYM_GROUPS {
            if synonyms.iter().any(|s| key.contains(s)) {
                return Harmonized::hit(*status, HarmonizeStage::FuzzySynonym);
            }
        }

        // === 步骤 4: 未命中 ===
        Harmonized::unmatched()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn harmonizer() -> StatusHarmonizer {
        let mut rules = RuleSet::new();
        rules.insert(Some(7), "Geht", CanonicalStatus::Accepted);
        rules.insert(Some(7), "OK", CanonicalStatus::ClarificationNeeded);
        rules.insert(None, "in work", CanonicalStatus::ClarificationNeeded);
        rules.insert(None, "yes", CanonicalStatus::Rejected);
        StatusHarmonizer::new(rules)
    }

    #[test]
    fn test_supplier_rule_wins() {
        let h = harmonizer();
        let r = h.normalize("  ok ", Some(7));
        assert_eq!(r.status, CanonicalStatus::ClarificationNeeded);
        assert_eq!(r.stage, HarmonizeStage::SupplierRule);

        // 其他供应商不受影响
        let r = h.normalize("OK", Some(8));
        assert_eq!(r.status, CanonicalStatus::Accepted);
        assert_eq!(r.stage, HarmonizeStage::DefaultTable);
    }

    #[test]
    fn test_stored_global_rule_overrides_default_table() {
        let h = harmonizer();
        let r = h.normalize("YES", None);
        assert_eq!(r.status, CanonicalStatus::Rejected);
        assert_eq!(r.stage, HarmonizeStage::GlobalRule);

        assert_eq!(
            h.normalize("In   Work", Some(9)).status,
            CanonicalStatus::ClarificationNeeded
        );
    }

    #[test]
    fn test_default_table() {
        let h = StatusHarmonizer::default();
        assert_eq!(h.normalize("ToBeClarified", None).status, CanonicalStatus::ClarificationNeeded);
        assert_eq!(h.normalize("Not Accepted", None).status, CanonicalStatus::Rejected);
        assert_eq!(h.normalize("NOK", None).stage, HarmonizeStage::DefaultTable);
    }

    #[test]
    fn test_fuzzy_groups_are_ordered() {
        let h = StatusHarmonizer::default();
        let r = h.normalize("Not OK - see comment", None);
        assert_eq!(r.status, CanonicalStatus::Rejected);
        assert_eq!(r.stage, HarmonizeStage::FuzzySynonym);

        assert_eq!(h.normalize("Accepted with remarks", None).status, CanonicalStatus::Accepted);
        assert_eq!(h.normalize("TBD by OEM", None).status, CanonicalStatus::ClarificationNeeded);
        assert_eq!(h.normalize("partially compliant", None).status, CanonicalStatus::Accepted);
        assert_eq!(h.normalize("disagree", None).status, CanonicalStatus::Rejected);
    }

    #[test]
    fn test_unmapped_and_blank() {
        let h = StatusHarmonizer::default();
        let r = h.normalize("Vielleicht", Some(1));
        assert_eq!(r, Harmonized::unmatched());
        assert!(!r.matched);

        assert_eq!(h.normalize("   ", None).status, CanonicalStatus::Unknown);
    }

    #[test]
    fn test_deterministic() {
        let h = harmonizer();
        for raw in ["OK", "geht", "tbc?", "???", "Rejected"] {
            assert_eq!(h.normalize(raw, Some(7)), h.normalize(raw, Some(7)));
        }
    }
}
