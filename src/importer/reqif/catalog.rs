// ==========================================
// ReqIF 定义目录
// ==========================================
// 职责: 收集 ATTRIBUTE-DEFINITION-* / ENUM-VALUE / SPEC-OBJECT-TYPE
// 用途: 将值中的定义引用解析为人类可读名称
// ==========================================

use super::{attr_non_empty, child_element};
use roxmltree::Document;
use std::collections::HashMap;

/// 属性数据类型（与 ATTRIBUTE-DEFINITION-* / ATTRIBUTE-VALUE-* 后缀对应）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    String,
    Xhtml,
    Enumeration,
    Integer,
    Real,
    Date,
    Boolean,
}

impl AttributeKind {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "STRING" => Some(AttributeKind::String),
            "XHTML" => Some(AttributeKind::Xhtml),
            "ENUMERATION" => Some(AttributeKind::Enumeration),
            "INTEGER" => Some(AttributeKind::Integer),
            "REAL" => Some(AttributeKind::Real),
            "DATE" => Some(AttributeKind::Date),
            "BOOLEAN" => Some(AttributeKind::Boolean),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDefinition {
    pub long_name: String,
    pub kind: AttributeKind,
}

#[derive(Debug, Default)]
pub struct Catalog {
    attributes: HashMap<String, AttributeDefinition>,
    enum_values: HashMap<String, String>,
    spec_object_types: HashMap<String, String>,
}

impl Catalog {
    /// 单次遍历文档收集全部定义
    pub fn build(doc: &Document) -> Self {
        let mut catalog = Catalog::default();

        for node in doc.descendants().filter(|n| n.is_element()) {
            let tag = node.tag_name().name();
            let Some(id) = attr_non_empty(node, "IDENTIFIER") else {
                continue;
            };

            if tag == "ENUM-VALUE" {
                let name = attr_non_empty(node, "LONG-NAME")
                    .or_else(|| {
                        child_element(node, "PROPERTIES")
                            .and_then(|p| child_element(p, "EMBEDDED-VALUE"))
                            .and_then(|e| attr_non_empty(e, "OTHER-CONTENT"))
                    })
                    .unwrap_or(id);
                catalog.enum_values.insert(id.to_string(), name.to_string());
            } else if tag == "SPEC-OBJECT-TYPE" {
                let name = attr_non_empty(node, "LONG-NAME").unwrap_or(id);
                catalog.spec_object_types.insert(id.to_string(), name.to_string());
            } else if let Some(suffix) = tag.strip_prefix("ATTRIBUTE-DEFINITION-") {
                if let Some(kind) = AttributeKind::from_suffix(suffix) {
                    let long_name = attr_non_empty(node, "LONG-NAME").unwrap_or(id).to_string();
                    catalog
                        .attributes
                        .insert(id.to_string(), AttributeDefinition { long_name, kind });
                }
            }
        }

        catalog
    }

    pub fn attribute(&self, id: &str) -> Option<&AttributeDefinition> {
        self.attributes.get(id)
    }

    pub fn enum_value(&self, id: &str) -> Option<&str> {
        self.enum_values.get(id).map(String::as_str)
    }

    pub fn spec_object_type(&self, id: &str) -> Option<&str> {
        self.spec_object_types.get(id).map(String::as_str)
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn enum_value_count(&self) -> usize {
        self.enum_values.len()
    }

    pub fn spec_object_type_count(&self) -> usize {
        self.spec_object_types.len()
    }
}
