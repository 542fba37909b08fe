// ==========================================
// 需求协调驾驶舱 - 需求导入 Trait
// ==========================================
// 职责: 定义主需求/供应商反馈导入接口（不包含实现）
// ==========================================

use crate::domain::import::ImportSummary;
use crate::importer::document_source::ImportSource;
use crate::importer::error::ImportResult;
use async_trait::async_trait;

// ==========================================
// RequirementImporter Trait
// ==========================================
// 实现者: ReqifImporter
#[async_trait]
pub trait RequirementImporter: Send + Sync {
    /// 导入主需求文档
    ///
    /// # 参数
    /// - project_id: 所属项目
    /// - source: 主需求文档（.reqif / .reqifz）
    ///
    /// # 返回
    /// - Ok(ImportSummary): created/updated/skipped/warnings；文档级失败时 errors 非空且未写库
    /// - Err: 文件不存在、存储失败（整批回滚）
    ///
    /// # 说明
    /// - 按解析后的标识 upsert，重复导入同一文档不产生新行
    /// - 属性包逐属性后写覆盖合并
    async fn import_master(&self, project_id: i64, source: ImportSource)
        -> ImportResult<ImportSummary>;

    /// 导入供应商反馈（可一次提交多个文件，并行解析、顺序写入）
    ///
    /// # 参数
    /// - project_id: 所属项目
    /// - iteration_id: 迭代业务标识（必须存在且未关闭）
    /// - supplier_id: 供应商（必须属于项目）
    /// - sources: 供应商文档
    ///
    /// # 返回
    /// - Ok(ImportSummary): matched/unmatched/warnings + orphans
    /// - Err: 迭代不存在/已关闭、供应商不存在、存储失败（整批回滚）
    async fn import_supplier_feedback(
        &self,
        project_id: i64,
        iteration_id: &str,
        supplier_id: i64,
        sources: Vec<ImportSource>,
    ) -> ImportResult<ImportSummary>;
}
