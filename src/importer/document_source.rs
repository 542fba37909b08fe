// ==========================================
// 需求协调驾驶舱 - 导入文档来源与批量解析
// ==========================================
// 职责: 文件/字节 → ParsedDocument（记录 + 警告 + 统计）
// 并发: 每个文档一个 spawn_blocking 任务，结果按输入顺序返回
// ==========================================

use crate::domain::import::{ImportIssue, ParseStats};
use crate::importer::error::{ImportError, ImportResult, ParseError};
use crate::importer::reqif::{ExchangeDocument, ExchangeRecord, ParseOptions};
use futures::future::try_join_all;
use std::path::PathBuf;
use tracing::{debug, info, warn};

// ==========================================
// ImportSource - 待导入文档
// ==========================================
#[derive(Debug, Clone)]
pub enum ImportSource {
    /// 磁盘文件（.reqif / .reqifz）
    Path(PathBuf),
    /// 内存中的文档（调用层已读取）
    Bytes { name: String, bytes: Vec<u8> },
}

impl ImportSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        ImportSource::Path(path.into())
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        ImportSource::Bytes {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// 展示名（文件名或调用层给定名称）
    pub fn name(&self) -> String {
        match self {
            ImportSource::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string()),
            ImportSource::Bytes { name, .. } => name.clone(),
        }
    }

    fn open(&self) -> Result<ExchangeDocument, ParseError> {
        match self {
            ImportSource::Path(path) => ExchangeDocument::from_path(path),
            ImportSource::Bytes { name, bytes } => ExchangeDocument::from_bytes(name.clone(), bytes),
        }
    }
}

/// 已解析文档
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub name: String,
    pub records: Vec<ExchangeRecord>,
    pub warnings: Vec<ImportIssue>,
    pub stats: ParseStats,
}

/// 文档级解析失败
#[derive(Debug)]
pub struct DocumentFailure {
    pub document: String,
    pub error: ParseError,
}

impl DocumentFailure {
    pub fn to_issue(&self) -> ImportIssue {
        self.error.to_issue(&self.document)
    }
}

/// 同步解析单个文档（在阻塞线程中调用）
pub fn parse_source(source: &ImportSource, options: &ParseOptions) -> Result<ParsedDocument, ParseError> {
    let document = source.open()?;
    let mut stream = document.records(options)?;
    let records: Vec<ExchangeRecord> = stream.by_ref().collect();
    let (warnings, stats) = stream.finish();

    debug!(
        document = %document.name(),
        records = records.len(),
        warnings = warnings.len(),
        "文档解析完成"
    );

    Ok(ParsedDocument {
        name: document.name().to_string(),
        records,
        warnings,
        stats,
    })
}

/// 并行解析一批文档
///
/// # 返回
/// - Ok(Ok(docs)): 全部解析成功，顺序与输入一致
/// - Ok(Err(failures)): 至少一个文档级失败（调用方不得写库）
/// - Err: 文件不存在或后台任务异常
pub async fn parse_batch(
    sources: Vec<ImportSource>,
    options: ParseOptions,
) -> ImportResult<Result<Vec<ParsedDocument>, Vec<DocumentFailure>>> {
    for source in &sources {
        if let ImportSource::Path(path) = source {
            if !path.exists() {
                return Err(ImportError::FileNotFound(path.display().to_string()));
            }
        }
    }

    let total = sources.len();
    let tasks = sources.into_iter().map(|source| {
        let options = options.clone();
        tokio::task::spawn_blocking(move || {
            let name = source.name();
            parse_source(&source, &options).map_err(|error| DocumentFailure {
                document: name,
                error,
            })
        })
    });

    let outcomes = try_join_all(tasks).await?;

    let mut documents = Vec::with_capacity(total);
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(doc) => documents.push(doc),
            Err(failure) => {
                warn!(document = %failure.document, error = %failure.error, "文档解析失败");
                failures.push(failure);
            }
        }
    }

    info!(
        total = total,
        parsed = documents.len(),
        failed = failures.len(),
        "批量解析完成"
    );

    if failures.is_empty() {
        Ok(Ok(documents))
    } else {
        Ok(Err(failures))
    }
}
