// ==========================================
// ReqIF 记录流
// ==========================================
// 惰性逐条转换 SPEC-OBJECT → ExchangeRecord
// 失败软化: 单条记录/属性的问题只产生警告，不终止解析
// ==========================================

use super::catalog::{AttributeKind, Catalog};
use super::identity::resolve_identifier;
use super::{attr_non_empty, child_element, element_children, text_content, xhtml, ParseOptions};
use crate::domain::import::{ImportIssue, IssueKind, ParseStats};
use crate::domain::requirement::{AttributeBag, AttributeValue};
use crate::domain::types::IdStrategy;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use roxmltree::{Node, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

const SPEC_OBJECT_CHILDREN: &[&str] = &["ALTERNATIVE-ID", "TYPE", "VALUES"];

// ==========================================
// ExchangeRecord - 通用结构化记录
// ==========================================
// 不含业务语义；状态/评论/正文由导入器按配置的属性名提取
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRecord {
    /// 解析后的标识
    pub identifier: String,
    pub id_strategy: IdStrategy,
    /// SPEC-OBJECT@IDENTIFIER 原值
    pub primary_id: Option<String>,
    /// 兜底名称（配置的名称属性或 LONG-NAME）
    pub fallback_name: Option<String>,
    /// SPEC-OBJECT-TYPE 名称
    pub type_tag: Option<String>,
    pub long_name: Option<String>,
    pub last_change: Option<String>,
    pub attributes: AttributeBag,
    /// 来源载荷名称
    pub source: String,
    /// 载荷内序号（从 0 开始）
    pub position: usize,
}

pub(super) struct ParsedPayload<'a> {
    pub name: &'a str,
    pub doc: roxmltree::Document<'a>,
    pub catalog: Catalog,
    pub spec_objects: Vec<NodeId>,
}

// ==========================================
// RecordStream - 惰性记录流
// ==========================================
pub struct RecordStream<'a> {
    payloads: Vec<ParsedPayload<'a>>,
    options: ParseOptions,
    payload_index: usize,
    object_index: usize,
    seen: HashSet<String>,
    warnings: Vec<ImportIssue>,
    stats: ParseStats,
}

impl<'a> RecordStream<'a> {
    pub(super) fn new(
        payloads: Vec<ParsedPayload<'a>>,
        options: ParseOptions,
        warnings: Vec<ImportIssue>,
        stats: ParseStats,
    ) -> Self {
        Self {
            payloads,
            options,
            payload_index: 0,
            object_index: 0,
            seen: HashSet::new(),
            warnings,
            stats,
        }
    }

    /// 目前为止累积的警告
    pub fn warnings(&self) -> &[ImportIssue] {
        &self.warnings
    }

    /// 结束流，取出警告与统计（未消费的记录会先被消费完）
    pub fn finish(mut self) -> (Vec<ImportIssue>, ParseStats) {
        for _ in self.by_ref() {}
        (self.warnings, self.stats)
    }
}

impl<'a> Iterator for RecordStream<'a> {
    type Item = ExchangeRecord;

    fn next(&mut self) -> Option<ExchangeRecord> {
        loop {
            let payload = self.payloads.get(self.payload_index)?;
            let Some(&node_id) = payload.spec_objects.get(self.object_index) else {
                self.payload_index += 1;
                self.object_index = 0;
                continue;
            };
            let position = self.object_index;
            self.object_index += 1;

            let Some(node) = payload.doc.get_node(node_id) else {
                continue;
            };

            let converted = convert_spec_object(
                node,
                &payload.catalog,
                payload.name,
                position,
                &self.options,
                &mut self.warnings,
            );

            let Some(record) = converted else {
                self.stats.records_skipped += 1;
                continue;
            };

            if !self.seen.insert(record.identifier.clone()) {
                self.warnings.push(
                    ImportIssue::new(
                        IssueKind::DuplicateIdentifier,
                        format!("{} @ {}#{}", record.identifier, payload.name, position),
                    )
                    .with_source(payload.name)
                    .with_position(position)
                    .with_record(Some(&record.identifier)),
                );
                self.stats.records_skipped += 1;
                continue;
            }

            self.stats.records_emitted += 1;
            return Some(record);
        }
    }
}

/// 转换单个 SPEC-OBJECT；无可用标识时返回 None
fn convert_spec_object(
    node: Node,
    catalog: &Catalog,
    source: &str,
    position: usize,
    options: &ParseOptions,
    warnings: &mut Vec<ImportIssue>,
) -> Option<ExchangeRecord> {
    let primary_id = attr_non_empty(node, "IDENTIFIER").map(str::to_string);
    let long_name = attr_non_empty(node, "LONG-NAME").map(str::to_string);
    let last_change = attr_non_empty(node, "LAST-CHANGE").map(str::to_string);
    let ctx = IssueContext {
        source,
        position,
        record_id: primary_id.as_deref(),
    };

    for child in element_children(node) {
        let tag = child.tag_name().name();
        if !SPEC_OBJECT_CHILDREN.contains(&tag) {
            warnings.push(ctx.issue(IssueKind::UnknownElement, tag));
        }
    }

    let type_tag = child_element(node, "TYPE")
        .and_then(first_ref_text)
        .map(|type_ref| match catalog.spec_object_type(&type_ref) {
            Some(name) => name.to_string(),
            None => {
                warnings.push(ctx.issue(IssueKind::UnresolvedReference, &type_ref));
                type_ref
            }
        });

    let mut attributes = AttributeBag::new();
    if let Some(values) = child_element(node, "VALUES") {
        for value_node in element_children(values) {
            if let Some((name, value)) = convert_attribute_value(value_node, catalog, &ctx, warnings) {
                attributes.insert(name, value);
            }
        }
    }

    let fallback_name = attributes
        .get(&options.fallback_name_attribute)
        .map(AttributeValue::as_text)
        .filter(|s| !s.trim().is_empty())
        .or_else(|| long_name.clone());

    let Some((identifier, id_strategy)) =
        resolve_identifier(primary_id.as_deref(), fallback_name.as_deref())
    else {
        warnings.push(ctx.issue(
            IssueKind::MissingIdentifier,
            format!("{}#{}", source, position),
        ));
        return None;
    };

    debug!(identifier = %identifier, strategy = %id_strategy, "解析记录");

    Some(ExchangeRecord {
        identifier,
        id_strategy,
        primary_id,
        fallback_name,
        type_tag,
        long_name,
        last_change,
        attributes,
        source: source.to_string(),
        position,
    })
}

/// 转换单个 ATTRIBUTE-VALUE-*；属性无法使用时返回 None 并记录警告
fn convert_attribute_value(
    node: Node,
    catalog: &Catalog,
    ctx: &IssueContext,
    warnings: &mut Vec<ImportIssue>,
) -> Option<(String, AttributeValue)> {
    let tag = node.tag_name().name();
    let Some(kind) = tag
        .strip_prefix("ATTRIBUTE-VALUE-")
        .and_then(AttributeKind::from_suffix)
    else {
        warnings.push(ctx.issue(IssueKind::UnknownElement, tag));
        return None;
    };

    let Some(definition_ref) = child_element(node, "DEFINITION").and_then(first_ref_text) else {
        warnings.push(ctx.issue(IssueKind::MalformedAttribute, format!("{} 缺少 DEFINITION 引用", tag)));
        return None;
    };

    let name = match catalog.attribute(&definition_ref) {
        Some(def) => def.long_name.clone(),
        None => {
            warnings.push(
                ctx.issue(IssueKind::UnresolvedReference, &definition_ref)
                    .with_attribute(&definition_ref),
            );
            definition_ref
        }
    };

    match parse_value(node, kind, catalog, ctx, &name, warnings) {
        Ok(value) => Some((name, value)),
        Err(reason) => {
            warnings.push(
                ctx.issue(IssueKind::MalformedAttribute, format!("{}: {}", name, reason))
                    .with_attribute(&name),
            );
            None
        }
    }
}

fn parse_value(
    node: Node,
    kind: AttributeKind,
    catalog: &Catalog,
    ctx: &IssueContext,
    name: &str,
    warnings: &mut Vec<ImportIssue>,
) -> Result<AttributeValue, String> {
    match kind {
        AttributeKind::Xhtml => child_element(node, "THE-VALUE")
            .map(|v| AttributeValue::Xhtml(xhtml::flatten(v)))
            .ok_or_else(|| "缺少 THE-VALUE".to_string()),
        AttributeKind::Enumeration => {
            let mut labels = Vec::new();
            if let Some(values) = child_element(node, "VALUES") {
                for value_ref in element_children(values).filter_map(|n| text_content(n)) {
                    match catalog.enum_value(&value_ref) {
                        Some(label) => labels.push(label.to_string()),
                        None => {
                            warnings.push(
                                ctx.issue(IssueKind::UnresolvedReference, &value_ref)
                                    .with_attribute(name),
                            );
                            labels.push(value_ref);
                        }
                    }
                }
            }
            Ok(AttributeValue::Enumeration(labels))
        }
        scalar => {
            let raw = scalar_value(node).ok_or_else(|| "缺少 THE-VALUE".to_string())?;
            parse_scalar(scalar, &raw)
        }
    }
}

/// THE-VALUE 既可能是属性也可能是子元素
fn scalar_value(node: Node) -> Option<String> {
    node.attribute("THE-VALUE")
        .map(str::to_string)
        .or_else(|| child_element(node, "THE-VALUE").map(|v| v.text().unwrap_or("").to_string()))
}

fn parse_scalar(kind: AttributeKind, raw: &str) -> Result<AttributeValue, String> {
    let trimmed = raw.trim();
    match kind {
        AttributeKind::Integer => trimmed
            .parse::<i64>()
            .map(AttributeValue::Integer)
            .map_err(|_| format!("无效整数 '{}'", raw)),
        AttributeKind::Real => match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(AttributeValue::Real(v)),
            _ => Err(format!("无效实数 '{}'", raw)),
        },
        AttributeKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(AttributeValue::Boolean(true)),
            "false" | "0" => Ok(AttributeValue::Boolean(false)),
            _ => Err(format!("无效布尔值 '{}'", raw)),
        },
        AttributeKind::Date => {
            let valid = DateTime::parse_from_rfc3339(trimmed).is_ok()
                || NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
                || NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").is_ok();
            if valid {
                Ok(AttributeValue::Date(trimmed.to_string()))
            } else {
                Err(format!("无效日期 '{}'", raw))
            }
        }
        _ => Ok(AttributeValue::String(raw.to_string())),
    }
}

/// TYPE / DEFINITION 下首个 *-REF 子元素文本
fn first_ref_text(node: Node) -> Option<String> {
    element_children(node)
        .find(|n| n.tag_name().name().ends_with("-REF"))
        .and_then(text_content)
}

struct IssueContext<'r> {
    source: &'r str,
    position: usize,
    record_id: Option<&'r str>,
}

impl IssueContext<'_> {
    fn issue(&self, kind: IssueKind, detail: impl Into<String>) -> ImportIssue {
        ImportIssue::new(kind, detail)
            .with_source(self.source)
            .with_position(self.position)
            .with_record(self.record_id)
    }
}
