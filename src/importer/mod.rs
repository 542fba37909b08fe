// ==========================================
// 需求协调驾驶舱 - 导入层
// ==========================================
// 职责: 交换文档解析、标识解析与落库
// 支持: .reqif（XML）、.reqifz（zip 容器）
// ==========================================

// 模块声明
pub mod document_source;
pub mod error;
pub mod reqif;
pub mod reqif_importer;
pub mod reqif_importer_trait;

// 重导出核心类型
pub use document_source::{parse_batch, parse_source, DocumentFailure, ImportSource, ParsedDocument};
pub use error::{ImportError, ImportResult, ParseError};
pub use reqif::{ExchangeDocument, ExchangeRecord, ParseOptions, RecordStream};
pub use reqif_importer::ReqifImporter;

// 重导出 Trait 接口
pub use reqif_importer_trait::RequirementImporter;
