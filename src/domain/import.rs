// ==========================================
// 需求协调驾驶舱 - 导入结果与问题
// ==========================================
// 红线: 所有错误/警告均为结构化数据（kind + 上下文），不依赖字符串解析
// ==========================================

use crate::domain::requirement::AttributeBag;
use crate::domain::types::{IdStrategy, ImportKind};
use crate::i18n::t_with_args;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// IssueKind - 问题类别
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueKind {
    /// 属性值无法解析，属性被丢弃，记录保留
    MalformedAttribute,
    /// 记录无可用标识，记录被跳过
    MissingIdentifier,
    /// 未识别的元素，被忽略
    UnknownElement,
    /// 定义引用无法解析，值存于原始引用 ID 下
    UnresolvedReference,
    /// 同一文档内标识重复，后出现的记录被跳过
    DuplicateIdentifier,
    /// 声明的 ReqIF 版本不在 1.0–1.2
    UnsupportedVersion,
    /// 文档级致命错误（不可读/格式错误）
    DocumentError,
}

impl IssueKind {
    fn i18n_key(&self) -> &'static str {
        match self {
            IssueKind::MalformedAttribute => "issue.malformed_attribute",
            IssueKind::MissingIdentifier => "issue.missing_identifier",
            IssueKind::UnknownElement => "issue.unknown_element",
            IssueKind::UnresolvedReference => "issue.unresolved_reference",
            IssueKind::DuplicateIdentifier => "issue.duplicate_identifier",
            IssueKind::UnsupportedVersion => "issue.unsupported_version",
            IssueKind::DocumentError => "issue.document_error",
        }
    }

    /// 该问题是否导致记录被跳过
    pub fn skips_record(&self) -> bool {
        matches!(
            self,
            IssueKind::MissingIdentifier | IssueKind::DuplicateIdentifier
        )
    }
}

// ==========================================
// ImportIssue - 结构化问题
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportIssue {
    pub kind: IssueKind,
    /// 来源载荷（文件名 / 容器内条目名）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// 载荷内 SPEC-OBJECT 序号（从 0 开始）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    pub detail: String,
    /// 按当前语言渲染的消息
    pub message: String,
}

impl ImportIssue {
    pub fn new(kind: IssueKind, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let message = t_with_args(kind.i18n_key(), &[("detail", &detail)]);
        Self {
            kind,
            source: None,
            position: None,
            record_id: None,
            attribute: None,
            detail,
            message,
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_record(mut self, record_id: Option<&str>) -> Self {
        self.record_id = record_id.map(str::to_string);
        self
    }

    pub fn with_attribute(mut self, attribute: &str) -> Self {
        self.attribute = Some(attribute.to_string());
        self
    }
}

// ==========================================
// OrphanRecord - 无法匹配主需求的供应商记录
// ==========================================
// 不写入反馈表，仅随导入摘要返回
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrphanRecord {
    pub identifier: String,
    pub id_strategy: IdStrategy,
    pub primary_id: Option<String>,
    pub fallback_name: Option<String>,
    pub source: String,
    pub attributes: AttributeBag,
}

// ==========================================
// ParseStats - 单个文档的解析统计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseStats {
    pub source: String,
    pub reqif_version: Option<String>,
    pub payload_count: usize,
    pub attribute_definitions: usize,
    pub enum_values: usize,
    pub spec_object_types: usize,
    pub records_emitted: usize,
    pub records_skipped: usize,
}

// ==========================================
// ImportSummary - 导入摘要（返回调用层）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// 提交成功时的导入日志 ID
    pub import_id: Option<String>,
    pub kind: ImportKind,
    pub source_name: String,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub matched: usize,
    pub unmatched: usize,
    /// 映射为 Unknown 的反馈条数（置信度指示）
    pub unmapped_statuses: usize,
    pub warnings: Vec<ImportIssue>,
    pub errors: Vec<ImportIssue>,
    pub orphans: Vec<OrphanRecord>,
    pub stats: Vec<ParseStats>,
}

impl ImportSummary {
    pub fn new(kind: ImportKind, source_name: impl Into<String>) -> Self {
        Self {
            import_id: None,
            kind,
            source_name: source_name.into(),
            created: 0,
            updated: 0,
            skipped: 0,
            matched: 0,
            unmatched: 0,
            unmapped_statuses: 0,
            warnings: Vec::new(),
            errors: Vec::new(),
            orphans: Vec::new(),
            stats: Vec::new(),
        }
    }

    /// 是否存在文档级错误（此时不会写入任何数据）
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

// ==========================================
// ImportLogEntry - 导入审计日志（仅追加）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportLogEntry {
    pub import_id: String,
    pub project_id: i64,
    pub kind: ImportKind,
    pub source_name: String,
    pub iteration_key: Option<i64>,
    pub supplier_id: Option<i64>,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub warning_count: usize,
    pub summary_json: serde_json::Value,
    pub imported_at: NaiveDateTime,
}
