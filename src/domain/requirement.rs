// ==========================================
// 需求协调驾驶舱 - 主需求与供应商反馈实体
// ==========================================
// 开放属性包: 有序 名称 → 类型化值，与显式建模字段并存
// ==========================================

use crate::domain::types::{CanonicalStatus, HarmonizeStage, IdStrategy, MatchStrategy};
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// AttributeValue - 类型化属性值
// ==========================================
// 与 ReqIF ATTRIBUTE-VALUE-* 七种类型一一对应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeValue {
    String(String),
    /// XHTML 已展平为纯文本
    Xhtml(String),
    /// 枚举值名称（多选时按文档顺序）
    Enumeration(Vec<String>),
    Integer(i64),
    Real(f64),
    /// 原样保留文档中的 xsd:dateTime 文本
    Date(String),
    Boolean(bool),
}

impl AttributeValue {
    /// 渲染为纯文本（状态/评论提取与导出使用）
    pub fn as_text(&self) -> String {
        match self {
            AttributeValue::String(s) | AttributeValue::Xhtml(s) | AttributeValue::Date(s) => {
                s.clone()
            }
            AttributeValue::Enumeration(values) => values.join(", "),
            AttributeValue::Integer(v) => v.to_string(),
            AttributeValue::Real(v) => v.to_string(),
            AttributeValue::Boolean(v) => if *v { "Yes" } else { "No" }.to_string(),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

/// 有序开放属性包
pub type AttributeBag = IndexMap<String, AttributeValue>;

/// 合并属性包（逐属性后写覆盖，保留首次出现的位置）
pub fn merge_attribute_bag(base: &mut AttributeBag, incoming: AttributeBag) {
    for (name, value) in incoming {
        base.insert(name, value);
    }
}

// ==========================================
// MasterRequirement - 主需求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterRequirement {
    pub requirement_id: i64,
    pub project_id: i64,
    /// 解析后的稳定标识（项目内唯一）
    pub reqif_id: String,
    /// 文档内 SPEC-OBJECT@IDENTIFIER（可能不稳定）
    pub internal_id: Option<String>,
    pub id_strategy: IdStrategy,
    pub type_tag: Option<String>,
    pub text: String,
    pub attributes: AttributeBag,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// SupplierFeedback - 供应商反馈
// ==========================================
// 唯一键: (requirement_id, iteration_key, supplier_id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierFeedback {
    pub feedback_id: i64,
    pub requirement_id: i64,
    pub iteration_key: i64,
    pub supplier_id: i64,
    /// 原始状态，原样保留
    pub raw_status: Option<String>,
    pub canonical_status: CanonicalStatus,
    pub harmonize_stage: HarmonizeStage,
    pub match_strategy: MatchStrategy,
    pub comment: Option<String>,
    pub attributes: AttributeBag,
    pub imported_at: NaiveDateTime,
}
