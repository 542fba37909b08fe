// ==========================================
// 需求协调驾驶舱 - 导入 API
// ==========================================
// 职责: 封装主需求/供应商反馈导入与导入日志查询
// 约束: 文档级错误以 ImportSummary.errors 返回（未写库），其余错误走 ApiError
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::import::{ImportLogEntry, ImportSummary};
use crate::importer::{ImportSource, RequirementImporter};
use crate::repository::ImportLogRepository;
use std::path::PathBuf;
use std::sync::Arc;

/// 导入日志默认返回条数
pub const DEFAULT_IMPORT_LOG_LIMIT: usize = 50;

/// 导入API
pub struct ImportApi {
    importer: Arc<dyn RequirementImporter>,
    import_log_repo: Arc<ImportLogRepository>,
}

impl ImportApi {
    pub fn new(
        importer: Arc<dyn RequirementImporter>,
        import_log_repo: Arc<ImportLogRepository>,
    ) -> Self {
        Self {
            importer,
            import_log_repo,
        }
    }

    /// 导入主需求文件
    ///
    /// # 参数
    /// - project_id: 项目
    /// - path: .reqif / .reqifz 文件
    ///
    /// # 返回
    /// - Ok(ImportSummary): 导入摘要（errors 非空表示文档不可读且未写库）
    /// - Err(ApiError): 文件不存在、存储失败等
    pub async fn import_master_file(
        &self,
        project_id: i64,
        path: impl Into<PathBuf>,
    ) -> ApiResult<ImportSummary> {
        Ok(self
            .importer
            .import_master(project_id, ImportSource::from_path(path))
            .await?)
    }

    /// 导入内存中的主需求文档
    pub async fn import_master_bytes(
        &self,
        project_id: i64,
        name: &str,
        bytes: Vec<u8>,
    ) -> ApiResult<ImportSummary> {
        Ok(self
            .importer
            .import_master(project_id, ImportSource::from_bytes(name, bytes))
            .await?)
    }

    /// 导入供应商反馈文件（一批文件同一事务）
    ///
    /// # 返回
    /// - Err(InvalidInput): 文件列表为空
    /// - Err(IterationClosed): 迭代已关闭
    /// - Err(NotFound): 迭代或供应商不存在
    pub async fn import_supplier_files(
        &self,
        project_id: i64,
        iteration_id: &str,
        supplier_id: i64,
        paths: Vec<PathBuf>,
    ) -> ApiResult<ImportSummary> {
        if paths.is_empty() {
            return Err(ApiError::InvalidInput("未指定供应商文件".to_string()));
        }
        let sources = paths.into_iter().map(ImportSource::Path).collect();
        Ok(self
            .importer
            .import_supplier_feedback(project_id, iteration_id, supplier_id, sources)
            .await?)
    }

    /// 导入内存中的供应商文档
    pub async fn import_supplier_bytes(
        &self,
        project_id: i64,
        iteration_id: &str,
        supplier_id: i64,
        name: &str,
        bytes: Vec<u8>,
    ) -> ApiResult<ImportSummary> {
        Ok(self
            .importer
            .import_supplier_feedback(
                project_id,
                iteration_id,
                supplier_id,
                vec![ImportSource::from_bytes(name, bytes)],
            )
            .await?)
    }

    /// 导入日志（最新在前）
    pub fn list_import_log(
        &self,
        project_id: i64,
        limit: Option<usize>,
    ) -> ApiResult<Vec<ImportLogEntry>> {
        Ok(self
            .import_log_repo
            .list_by_project(project_id, limit.unwrap_or(DEFAULT_IMPORT_LOG_LIMIT))?)
    }
}
