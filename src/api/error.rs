// ==========================================
// 需求协调驾驶舱 - API 层错误类型
// ==========================================
// 职责: 将仓储/导入层的技术错误转换为调用层可渲染的结构化错误
// 约束: 每个错误都有稳定的机器码（code），消息包含显式原因
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API 层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("记录已存在: {0}")]
    AlreadyExists(String),

    #[error("迭代已关闭导入: {0}")]
    IterationClosed(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 导入与导出错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("导出失败: {0}")]
    ExportError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 稳定错误码（调用层据此分支，不解析消息文本）
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BusinessRuleViolation(_) => "BUSINESS_RULE_VIOLATION",
            ApiError::AlreadyExists(_) => "ALREADY_EXISTS",
            ApiError::IterationClosed(_) => "ITERATION_CLOSED",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::DatabaseConnectionError(_) => "DATABASE_CONNECTION_ERROR",
            ApiError::ImportError(_) => "IMPORT_ERROR",
            ApiError::ExportError(_) => "EXPORT_ERROR",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "OTHER_ERROR",
        }
    }

    /// 转换为结构化响应
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

/// 结构化错误响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => ApiError::AlreadyExists(msg),
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::ImmutableViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("不可变记录: {}", msg))
            }
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::FileNotFound(path) => ApiError::NotFound(format!("文件 {}", path)),
            ImportError::Parse(e) => ApiError::ImportError(e.to_string()),
            ImportError::IterationNotFound(id) => ApiError::NotFound(format!("迭代 {}", id)),
            ImportError::IterationClosed(id) => ApiError::IterationClosed(id),
            ImportError::SupplierNotFound(id) => ApiError::NotFound(format!("供应商 {}", id)),
            ImportError::Repository(e) => ApiError::from(e),
            ImportError::ConfigReadError { key, message } => {
                ApiError::InternalError(format!("配置读取失败 ({}): {}", key, message))
            }
            ImportError::InternalError(msg) => ApiError::InternalError(msg),
            ImportError::Other(err) => ApiError::Other(err),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::InternalError(format!("后台任务失败: {}", err))
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_errors_map_to_codes() {
        let err = ApiError::from(RepositoryError::UniqueConstraintViolation("iteration".into()));
        assert_eq!(err.code(), "ALREADY_EXISTS");

        let err = ApiError::from(RepositoryError::ImmutableViolation("IMMUTABLE: closed".into()));
        assert_eq!(err.code(), "BUSINESS_RULE_VIOLATION");

        let err = ApiError::from(RepositoryError::NotFound {
            entity: "Supplier".into(),
            id: "7".into(),
        });
        assert_eq!(err.code(), "NOT_FOUND");
        assert!(err.to_string().contains("Supplier(id=7)"));
    }

    #[test]
    fn test_import_errors_map_to_codes() {
        assert_eq!(
            ApiError::from(ImportError::IterationClosed("I-001".into())).code(),
            "ITERATION_CLOSED"
        );
        let response = ApiError::from(ImportError::SupplierNotFound("3".into())).to_response();
        assert_eq!(response.code, "NOT_FOUND");
        assert!(response.message.contains('3'));
    }
}
