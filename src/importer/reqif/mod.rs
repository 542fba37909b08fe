// ==========================================
// 需求协调驾驶舱 - ReqIF 交换文档解析器
// ==========================================
// 职责: 字节流 → 惰性记录流 + 结构化警告
// 约束: 不含业务语义；元素按本地名匹配，忽略命名空间前缀
// 失败分级:
// - 文档级（容器不可读/XML 格式错误/根元素非 REQ-IF）→ 单个 ParseError，无记录
// - 记录级 → 警告，跳过该记录/属性，继续解析
// ==========================================

pub mod catalog;
pub mod container;
pub mod identity;
pub mod record;
pub mod xhtml;

pub use container::Payload;
pub use record::{ExchangeRecord, RecordStream};

use crate::domain::import::{ImportIssue, IssueKind, ParseStats};
use crate::importer::error::ParseError;
use catalog::Catalog;
use record::ParsedPayload;
use roxmltree::{Document, Node, ParsingOptions};
use std::path::Path;
use tracing::{debug, info, instrument};

/// 支持的 ReqIF 版本前缀（1.0 / 1.0.1 / 1.1 / 1.2）
const SUPPORTED_VERSIONS: &[&str] = &["1.0", "1.1", "1.2"];

/// 默认兜底名称属性
pub const DEFAULT_FALLBACK_NAME_ATTRIBUTE: &str = "ReqIF.ForeignID";

/// 解析选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// 标识不可用时使用的人类可读名称属性
    pub fallback_name_attribute: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            fallback_name_attribute: DEFAULT_FALLBACK_NAME_ATTRIBUTE.to_string(),
        }
    }
}

// ==========================================
// ExchangeDocument - 已解包的交换文档
// ==========================================
#[derive(Debug, Clone)]
pub struct ExchangeDocument {
    name: String,
    payloads: Vec<Payload>,
}

impl ExchangeDocument {
    /// 从字节创建（自动识别 zip 容器）
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self, ParseError> {
        let name = name.into();
        let payloads = container::unpack(&name, bytes)?;
        debug!(document = %name, payloads = payloads.len(), "文档解包完成");
        Ok(Self { name, payloads })
    }

    /// 从文件读取
    pub fn from_path(path: &Path) -> Result<Self, ParseError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_bytes(name, &bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payloads(&self) -> &[Payload] {
        &self.payloads
    }

    /// 解析全部载荷并返回惰性记录流
    ///
    /// 所有载荷先完成 XML 解析与根元素校验，任一失败即返回文档级错误；
    /// 记录转换在迭代时逐条进行。
    #[instrument(skip(self, options), fields(document = %self.name))]
    pub fn records(&self, options: &ParseOptions) -> Result<RecordStream<'_>, ParseError> {
        let xml_options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };

        let mut parsed = Vec::with_capacity(self.payloads.len());
        let mut warnings = Vec::new();
        let mut stats = ParseStats {
            source: self.name.clone(),
            payload_count: self.payloads.len(),
            ..ParseStats::default()
        };

        for payload in &self.payloads {
            let doc = Document::parse_with_options(&payload.xml, xml_options).map_err(|e| {
                ParseError::MalformedXml {
                    source_name: payload.name.clone(),
                    message: e.to_string(),
                }
            })?;

            let root = doc.root_element();
            if root.tag_name().name() != "REQ-IF" {
                return Err(ParseError::NotReqIf {
                    source_name: payload.name.clone(),
                    found: root.tag_name().name().to_string(),
                });
            }

            if let Some(version) = declared_version(&doc) {
                if !is_supported_version(&version) {
                    warnings.push(
                        ImportIssue::new(IssueKind::UnsupportedVersion, version.clone())
                            .with_source(&payload.name),
                    );
                }
                stats.reqif_version.get_or_insert(version);
            }

            let catalog = Catalog::build(&doc);
            stats.attribute_definitions += catalog.attribute_count();
            stats.enum_values += catalog.enum_value_count();
            stats.spec_object_types += catalog.spec_object_type_count();

            let spec_objects = doc
                .descendants()
                .filter(|n| n.is_element() && n.tag_name().name() == "SPEC-OBJECT")
                .map(|n| n.id())
                .collect::<Vec<_>>();

            parsed.push(ParsedPayload {
                name: &payload.name,
                doc,
                catalog,
                spec_objects,
            });
        }

        let total: usize = parsed.iter().map(|p| p.spec_objects.len()).sum();
        info!(
            payloads = parsed.len(),
            spec_objects = total,
            version = stats.reqif_version.as_deref().unwrap_or("-"),
            "文档结构解析完成"
        );

        Ok(RecordStream::new(parsed, options.clone(), warnings, stats))
    }
}

fn declared_version(doc: &Document) -> Option<String> {
    doc.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "REQ-IF-VERSION")
        .and_then(text_content)
}

fn is_supported_version(version: &str) -> bool {
    SUPPORTED_VERSIONS
        .iter()
        .any(|v| version == *v || version.starts_with(&format!("{}.", v)))
}

// ==========================================
// 元素访问辅助（本地名匹配）
// ==========================================

pub(crate) fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

pub(crate) fn child_element<'a, 'input>(
    node: Node<'a, 'input>,
    local_name: &str,
) -> Option<Node<'a, 'input>> {
    element_children(node).find(|n| n.tag_name().name() == local_name)
}

/// 非空属性值
pub(crate) fn attr_non_empty<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute(name).filter(|v| !v.trim().is_empty())
}

/// 元素的去空白文本
pub(crate) fn text_content(node: Node) -> Option<String> {
    node.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
