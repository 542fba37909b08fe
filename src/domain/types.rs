// ==========================================
// 需求协调驾驶舱 - 领域类型定义
// ==========================================
// 职责: 规范状态、决策状态、标识策略等封闭枚举
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 规范状态 (Canonical Status)
// ==========================================
// 红线: 集合封闭，供应商原始状态一律映射到这四个值之一
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CanonicalStatus {
    Accepted,            // 接受
    ClarificationNeeded, // 需澄清
    Rejected,            // 拒绝
    Unknown,             // 无法映射
}

impl CanonicalStatus {
    pub const ALL: [CanonicalStatus; 4] = [
        CanonicalStatus::Accepted,
        CanonicalStatus::ClarificationNeeded,
        CanonicalStatus::Rejected,
        CanonicalStatus::Unknown,
    ];

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            CanonicalStatus::Accepted => "ACCEPTED",
            CanonicalStatus::ClarificationNeeded => "CLARIFICATION_NEEDED",
            CanonicalStatus::Rejected => "REJECTED",
            CanonicalStatus::Unknown => "UNKNOWN",
        }
    }

    /// 从字符串解析（大小写不敏感，接受空格/连字符写法）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().replace([' ', '-'], "_").as_str() {
            "ACCEPTED" => Some(CanonicalStatus::Accepted),
            "CLARIFICATION_NEEDED" | "CLARIFICATIONNEEDED" | "CLARIFICATION" => {
                Some(CanonicalStatus::ClarificationNeeded)
            }
            "REJECTED" => Some(CanonicalStatus::Rejected),
            "UNKNOWN" => Some(CanonicalStatus::Unknown),
            _ => None,
        }
    }

    /// 是否为“非接受”信号（冲突判定使用，Unknown 计入）
    pub fn is_negative(&self) -> bool {
        !matches!(self, CanonicalStatus::Accepted)
    }
}

impl fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 决策状态 (Decision Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    Accepted, // 接受供应商反馈
    Rejected, // 驳回
    Modified, // 修改需求
    Deferred, // 推迟到后续迭代
}

impl DecisionStatus {
    pub const ALL: [DecisionStatus; 4] = [
        DecisionStatus::Accepted,
        DecisionStatus::Rejected,
        DecisionStatus::Modified,
        DecisionStatus::Deferred,
    ];

    pub fn to_db_str(&self) -> &'static str {
        match self {
            DecisionStatus::Accepted => "ACCEPTED",
            DecisionStatus::Rejected => "REJECTED",
            DecisionStatus::Modified => "MODIFIED",
            DecisionStatus::Deferred => "DEFERRED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ACCEPTED" => Some(DecisionStatus::Accepted),
            "REJECTED" => Some(DecisionStatus::Rejected),
            "MODIFIED" => Some(DecisionStatus::Modified),
            "DEFERRED" => Some(DecisionStatus::Deferred),
            _ => None,
        }
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 标识策略 (Identifier Strategy)
// ==========================================
// 记录每条记录的标识来源，下游匹配按可信度加权
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdStrategy {
    Primary,      // SPEC-OBJECT@IDENTIFIER
    NameFallback, // 人类可读名称兜底
}

impl IdStrategy {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            IdStrategy::Primary => "PRIMARY",
            IdStrategy::NameFallback => "NAME_FALLBACK",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PRIMARY" => Some(IdStrategy::Primary),
            "NAME_FALLBACK" => Some(IdStrategy::NameFallback),
            _ => None,
        }
    }
}

impl fmt::Display for IdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 匹配策略 (Match Strategy)
// ==========================================
// 供应商记录命中主需求的方式，按可信度从高到低排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStrategy {
    ResolvedId, // 解析后的标识 = 主需求 reqif_id
    InternalId, // 供应商 IDENTIFIER = 主需求内部标识
    NameFallback, // 兜底名称 = 主需求 reqif_id
}

impl MatchStrategy {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            MatchStrategy::ResolvedId => "RESOLVED_ID",
            MatchStrategy::InternalId => "INTERNAL_ID",
            MatchStrategy::NameFallback => "NAME_FALLBACK",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "RESOLVED_ID" => Some(MatchStrategy::ResolvedId),
            "INTERNAL_ID" => Some(MatchStrategy::InternalId),
            "NAME_FALLBACK" => Some(MatchStrategy::NameFallback),
            _ => None,
        }
    }
}

// ==========================================
// 映射阶段 (Harmonize Stage)
// ==========================================
// 状态映射命中的阶段，即置信度指示
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmonizeStage {
    SupplierRule,  // 供应商专属规则（精确）
    GlobalRule,    // 全局规则（精确）
    DefaultTable,  // 内置默认映射表（精确）
    FuzzySynonym,  // 同义词包含匹配
    Unmatched,     // 未命中 → Unknown
}

impl HarmonizeStage {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            HarmonizeStage::SupplierRule => "SUPPLIER_RULE",
            HarmonizeStage::GlobalRule => "GLOBAL_RULE",
            HarmonizeStage::DefaultTable => "DEFAULT_TABLE",
            HarmonizeStage::FuzzySynonym => "FUZZY_SYNONYM",
            HarmonizeStage::Unmatched => "UNMATCHED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "SUPPLIER_RULE" => Some(HarmonizeStage::SupplierRule),
            "GLOBAL_RULE" => Some(HarmonizeStage::GlobalRule),
            "DEFAULT_TABLE" => Some(HarmonizeStage::DefaultTable),
            "FUZZY_SYNONYM" => Some(HarmonizeStage::FuzzySynonym),
            "UNMATCHED" => Some(HarmonizeStage::Unmatched),
            _ => None,
        }
    }
}

// ==========================================
// 导入类型 (Import Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportKind {
    Master,
    Supplier,
}

impl ImportKind {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ImportKind::Master => "MASTER",
            ImportKind::Supplier => "SUPPLIER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "MASTER" => Some(ImportKind::Master),
            "SUPPLIER" => Some(ImportKind::Supplier),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_status_db_roundtrip() {
        for status in CanonicalStatus::ALL {
            assert_eq!(CanonicalStatus::from_str(status.to_db_str()), Some(status));
        }
    }

    #[test]
    fn test_canonical_status_loose_parsing() {
        assert_eq!(
            CanonicalStatus::from_str("clarification needed"),
            Some(CanonicalStatus::ClarificationNeeded)
        );
        assert_eq!(CanonicalStatus::from_str(" accepted "), Some(CanonicalStatus::Accepted));
        assert_eq!(CanonicalStatus::from_str("maybe"), None);
    }

    #[test]
    fn test_unknown_is_negative() {
        assert!(CanonicalStatus::Unknown.is_negative());
        assert!(CanonicalStatus::Rejected.is_negative());
        assert!(!CanonicalStatus::Accepted.is_negative());
    }

    #[test]
    fn test_serde_format() {
        let json = serde_json::to_string(&CanonicalStatus::ClarificationNeeded).unwrap();
        assert_eq!(json, "\"CLARIFICATION_NEEDED\"");
    }
}
