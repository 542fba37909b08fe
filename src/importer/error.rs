// ==========================================
// 需求协调驾驶舱 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分层: ParseError（文档级，写库前终止） / ImportError（导入流程）
// ==========================================

use crate::domain::import::{ImportIssue, IssueKind};
use crate::repository::error::RepositoryError;
use thiserror::Error;

// ==========================================
// ParseError - 文档级解析错误
// ==========================================
// 任一载荷出现以下错误即整个文档失败，不产出任何记录
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("文件读取失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("容器无法读取: {0}")]
    Container(#[from] zip::result::ZipError),

    #[error("容器内没有 .reqif 文件: {0}")]
    EmptyContainer(String),

    #[error("容器条目过大 ({source_name}): 超过 {limit} 字节")]
    EntryTooLarge { source_name: String, limit: u64 },

    #[error("文档编码错误 ({source_name}): {message}")]
    Encoding { source_name: String, message: String },

    #[error("XML 格式错误 ({source_name}): {message}")]
    MalformedXml { source_name: String, message: String },

    #[error("根元素不是 REQ-IF ({source_name}): 实际为 {found}")]
    NotReqIf { source_name: String, found: String },
}

impl ParseError {
    /// 转换为结构化问题（导入摘要 errors 使用）
    pub fn to_issue(&self, document: &str) -> ImportIssue {
        let issue = ImportIssue::new(IssueKind::DocumentError, self.to_string());
        match self {
            ParseError::Encoding { source_name, .. }
            | ParseError::EntryTooLarge { source_name, .. }
            | ParseError::MalformedXml { source_name, .. }
            | ParseError::NotReqIf { source_name, .. } => issue.with_source(source_name),
            _ => issue.with_source(document),
        }
    }
}

// ==========================================
// ImportError - 导入流程错误
// ==========================================
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文档解析失败: {0}")]
    Parse(#[from] ParseError),

    // ===== 前置条件错误 =====
    #[error("迭代不存在: {0}")]
    IterationNotFound(String),

    #[error("迭代已关闭导入: {0}")]
    IterationClosed(String),

    #[error("供应商不存在: {0}")]
    SupplierNotFound(String),

    // ===== 存储错误 =====
    #[error("存储失败: {0}")]
    Repository(#[from] RepositoryError),

    // ===== 配置错误 =====
    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::Repository(RepositoryError::from(err))
    }
}

// 实现 From<tokio::task::JoinError>
impl From<tokio::task::JoinError> for ImportError {
    fn from(err: tokio::task::JoinError) -> Self {
        ImportError::InternalError(format!("后台任务失败: {}", err))
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
