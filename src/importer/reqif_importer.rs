// ==========================================
// 需求协调驾驶舱 - ReqIF 导入器实现
// ==========================================
// 流程: 读取配置 → 并行解析 → 单事务写入（upsert + 映射 + 日志）→ 提交
// 原子性: 每次调用一个事务，任一存储错误整批回滚
// 单写者: 写入阶段持有项目库连接锁
// ==========================================

use crate::config::{ImportConfigReader, ImportSettings};
use crate::domain::import::{ImportLogEntry, ImportSummary, IssueKind, ImportIssue, OrphanRecord};
use crate::domain::project::{Iteration, Supplier};
use crate::domain::requirement::{AttributeBag, AttributeValue, MasterRequirement};
use crate::domain::types::{ImportKind, MatchStrategy};
use crate::engine::status_harmonizer::{RuleSet, StatusHarmonizer};
use crate::importer::document_source::{parse_batch, ImportSource, ParsedDocument};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::reqif::{ExchangeRecord, ParseOptions};
use crate::importer::reqif_importer_trait::RequirementImporter;
use crate::repository::row_codec::now;
use crate::repository::{
    FeedbackRepository, FeedbackUpsert, ImportLogRepository, IterationRepository,
    MappingRuleRepository, RepositoryError, RequirementRepository, RequirementUpsert,
    SupplierRepository, UpsertOutcome,
};
use async_trait::async_trait;
use rusqlite::{Connection, Transaction};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, instrument, warn, Span};
use uuid::Uuid;

// ==========================================
// ReqifImporter - ReqIF 导入器
// ==========================================
pub struct ReqifImporter<C>
where
    C: ImportConfigReader,
{
    // 项目库连接
    conn: Arc<Mutex<Connection>>,

    // 配置读取器
    config: C,
}

impl<C> ReqifImporter<C>
where
    C: ImportConfigReader,
{
    /// 创建导入器
    ///
    /// # 参数
    /// - conn: 项目库共享连接
    /// - config: 配置读取器（属性名）
    pub fn new(conn: Arc<Mutex<Connection>>, config: C) -> Self {
        Self { conn, config }
    }

    async fn load_settings(&self) -> ImportResult<ImportSettings> {
        self.config
            .get_import_settings()
            .await
            .map_err(|e| ImportError::ConfigReadError {
                key: "import_settings".to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl<C> RequirementImporter for ReqifImporter<C>
where
    C: ImportConfigReader + Send + Sync,
{
    #[instrument(skip(self, source), fields(project_id = project_id, import_id))]
    async fn import_master(
        &self,
        project_id: i64,
        source: ImportSource,
    ) -> ImportResult<ImportSummary> {
        let start_time = Instant::now();
        let import_id = Uuid::new_v4().to_string();
        Span::current().record("import_id", import_id.as_str());

        let source_name = source.name();
        info!(source = %source_name, "开始导入主需求");

        // === 步骤 1: 读取配置 ===
        let settings = self.load_settings().await?;
        let options = ParseOptions {
            fallback_name_attribute: settings.fallback_id_attribute.clone(),
        };

        // === 步骤 2: 解析文档 ===
        let mut summary = ImportSummary::new(ImportKind::Master, source_name);
        let documents = match parse_batch(vec![source], options).await? {
            Ok(docs) => docs,
            Err(failures) => {
                summary.errors = failures.iter().map(|f| f.to_issue()).collect();
                warn!(errors = summary.errors.len(), "主需求文档不可读，未写入任何数据");
                return Ok(summary);
            }
        };

        // === 步骤 3: 单事务写入 ===
        let conn = self.conn.clone();
        let summary = tokio::task::spawn_blocking(move || {
            write_master(&conn, project_id, &settings, documents, summary, import_id)
        })
        .await??;

        info!(
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            warnings = summary.warnings.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "主需求导入完成"
        );
        Ok(summary)
    }

    #[instrument(skip(self, sources), fields(project_id = project_id, iteration_id = %iteration_id, supplier_id = supplier_id, import_id))]
    async fn import_supplier_feedback(
        &self,
        project_id: i64,
        iteration_id: &str,
        supplier_id: i64,
        sources: Vec<ImportSource>,
    ) -> ImportResult<ImportSummary> {
        let start_time = Instant::now();
        let import_id = Uuid::new_v4().to_string();
        Span::current().record("import_id", import_id.as_str());

        let source_name = sources
            .iter()
            .map(ImportSource::name)
            .collect::<Vec<_>>()
            .join(", ");
        info!(source = %source_name, files = sources.len(), "开始导入供应商反馈");

        // === 步骤 1: 前置校验（迭代存在且开放、供应商属于项目） ===
        {
            let conn = self.conn.clone();
            let iteration_id = iteration_id.to_string();
            tokio::task::spawn_blocking(move || -> ImportResult<()> {
                let guard = lock_store(&conn)?;
                let tx = guard.unchecked_transaction()?;
                resolve_target(&tx, project_id, &iteration_id, supplier_id)?;
                Ok(())
            })
            .await??;
        }

        // === 步骤 2: 读取配置 ===
        let settings = self.load_settings().await?;
        let options = ParseOptions {
            fallback_name_attribute: settings.fallback_id_attribute.clone(),
        };

        // === 步骤 3: 并行解析 ===
        let mut summary = ImportSummary::new(ImportKind::Supplier, source_name);
        let documents = match parse_batch(sources, options).await? {
            Ok(docs) => docs,
            Err(failures) => {
                summary.errors = failures.iter().map(|f| f.to_issue()).collect();
                warn!(errors = summary.errors.len(), "供应商文档不可读，未写入任何数据");
                return Ok(summary);
            }
        };

        // === 步骤 4: 单事务写入（顺序合并各文档） ===
        let conn = self.conn.clone();
        let iteration_id = iteration_id.to_string();
        let summary = tokio::task::spawn_blocking(move || {
            write_feedback(
                &conn,
                FeedbackBatch {
                    project_id,
                    iteration_id: &iteration_id,
                    supplier_id,
                    settings: &settings,
                    import_id,
                },
                documents,
                summary,
            )
        })
        .await??;

        info!(
            matched = summary.matched,
            unmatched = summary.unmatched,
            unmapped_statuses = summary.unmapped_statuses,
            warnings = summary.warnings.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "供应商反馈导入完成"
        );
        Ok(summary)
    }
}

// ==========================================
// 写入阶段（阻塞线程内执行）
// ==========================================

fn lock_store(conn: &Arc<Mutex<Connection>>) -> ImportResult<std::sync::MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| ImportError::Repository(RepositoryError::LockError(e.to_string())))
}

/// 事务内确认导入目标
fn resolve_target(
    tx: &Transaction,
    project_id: i64,
    iteration_id: &str,
    supplier_id: i64,
) -> ImportResult<(Iteration, Supplier)> {
    let iteration = IterationRepository::find_by_id_tx(tx, project_id, iteration_id)?
        .ok_or_else(|| ImportError::IterationNotFound(iteration_id.to_string()))?;
    if iteration.is_closed() {
        return Err(ImportError::IterationClosed(iteration_id.to_string()));
    }

    let supplier = SupplierRepository::require_tx(tx, project_id, supplier_id).map_err(|e| match e {
        RepositoryError::NotFound { .. } => ImportError::SupplierNotFound(supplier_id.to_string()),
        other => ImportError::Repository(other),
    })?;

    Ok((iteration, supplier))
}

fn absorb_parse_results(summary: &mut ImportSummary, doc: &mut ParsedDocument) {
    summary.skipped += doc.stats.records_skipped;
    summary.warnings.append(&mut doc.warnings);
    summary.stats.push(doc.stats.clone());
}

fn append_import_log(
    tx: &Transaction,
    project_id: i64,
    iteration_key: Option<i64>,
    supplier_id: Option<i64>,
    summary: &ImportSummary,
) -> ImportResult<()> {
    let import_id = summary
        .import_id
        .clone()
        .ok_or_else(|| ImportError::InternalError("导入日志缺少 import_id".to_string()))?;
    let entry = ImportLogEntry {
        import_id,
        project_id,
        kind: summary.kind,
        source_name: summary.source_name.clone(),
        iteration_key,
        supplier_id,
        created: summary.created,
        updated: summary.updated,
        skipped: summary.skipped,
        matched: summary.matched,
        unmatched: summary.unmatched,
        warning_count: summary.warnings.len(),
        summary_json: serde_json::to_value(summary).map_err(RepositoryError::from)?,
        imported_at: now(),
    };
    ImportLogRepository::insert_tx(tx, &entry)?;
    Ok(())
}

fn write_master(
    conn: &Arc<Mutex<Connection>>,
    project_id: i64,
    settings: &ImportSettings,
    documents: Vec<ParsedDocument>,
    mut summary: ImportSummary,
    import_id: String,
) -> ImportResult<ImportSummary> {
    let guard = lock_store(conn)?;
    let tx = guard.unchecked_transaction()?;

    for mut doc in documents {
        absorb_parse_results(&mut summary, &mut doc);

        for record in doc.records {
            let mut attributes = record.attributes;
            let text = take_requirement_text(&mut attributes, &settings.text_attribute);

            let outcome = RequirementRepository::upsert_tx(
                &tx,
                &RequirementUpsert {
                    project_id,
                    reqif_id: record.identifier,
                    internal_id: record.primary_id,
                    id_strategy: record.id_strategy,
                    type_tag: record.type_tag,
                    text,
                    attributes,
                },
            )?;

            match outcome {
                UpsertOutcome::Created(_) => summary.created += 1,
                UpsertOutcome::Updated(_) => summary.updated += 1,
            }
        }
    }

    summary.import_id = Some(import_id);
    append_import_log(&tx, project_id, None, None, &summary)?;
    tx.commit()?;

    debug!(created = summary.created, updated = summary.updated, "主需求事务已提交");
    Ok(summary)
}

struct FeedbackBatch<'a> {
    project_id: i64,
    iteration_id: &'a str,
    supplier_id: i64,
    settings: &'a ImportSettings,
    import_id: String,
}

fn write_feedback(
    conn: &Arc<Mutex<Connection>>,
    batch: FeedbackBatch<'_>,
    documents: Vec<ParsedDocument>,
    mut summary: ImportSummary,
) -> ImportResult<ImportSummary> {
    let guard = lock_store(conn)?;
    let tx = guard.unchecked_transaction()?;

    // 解析期间迭代可能已被关闭，事务内再确认一次
    let (iteration, supplier) =
        resolve_target(&tx, batch.project_id, batch.iteration_id, batch.supplier_id)?;
    let harmonizer = StatusHarmonizer::new(RuleSet::from_rules(&MappingRuleRepository::list_tx(&tx)?));

    let mut seen: HashSet<i64> = HashSet::new();
    for mut doc in documents {
        absorb_parse_results(&mut summary, &mut doc);

        for record in doc.records {
            let Some((requirement, strategy)) = match_requirement(&tx, batch.project_id, &record)? else {
                summary.unmatched += 1;
                summary.orphans.push(OrphanRecord {
                    identifier: record.identifier,
                    id_strategy: record.id_strategy,
                    primary_id: record.primary_id,
                    fallback_name: record.fallback_name,
                    source: record.source,
                    attributes: record.attributes,
                });
                continue;
            };

            // 同一批次多个文件命中同一需求: 保留先出现者
            if !seen.insert(requirement.requirement_id) {
                summary.skipped += 1;
                summary.warnings.push(
                    ImportIssue::new(IssueKind::DuplicateIdentifier, requirement.reqif_id.clone())
                        .with_source(&record.source)
                        .with_position(record.position)
                        .with_record(Some(&record.identifier)),
                );
                continue;
            }

            let mut attributes = record.attributes;
            let raw_status = take_optional_text(&mut attributes, &batch.settings.status_attribute);
            let comment = take_optional_text(&mut attributes, &batch.settings.comment_attribute);
            let harmonized = harmonizer.normalize(
                raw_status.as_deref().unwrap_or_default(),
                Some(supplier.supplier_id),
            );
            if !harmonized.matched {
                summary.unmapped_statuses += 1;
            }

            FeedbackRepository::upsert_tx(
                &tx,
                &FeedbackUpsert {
                    requirement_id: requirement.requirement_id,
                    iteration_key: iteration.iteration_key,
                    supplier_id: supplier.supplier_id,
                    raw_status,
                    canonical_status: harmonized.status,
                    harmonize_stage: harmonized.stage,
                    match_strategy: strategy,
                    comment,
                    attributes,
                },
            )?;
            summary.matched += 1;
        }
    }

    summary.import_id = Some(batch.import_id);
    append_import_log(
        &tx,
        batch.project_id,
        Some(iteration.iteration_key),
        Some(supplier.supplier_id),
        &summary,
    )?;
    tx.commit()?;

    debug!(matched = summary.matched, unmatched = summary.unmatched, "供应商反馈事务已提交");
    Ok(summary)
}

// ==========================================
// 标识匹配与属性提取
// ==========================================

/// 按可信度依次尝试匹配主需求
///
/// 1. 解析后的标识 = reqif_id
/// 2. 记录 IDENTIFIER = 主需求内部标识
/// 3. 兜底名称 = reqif_id
fn match_requirement(
    conn: &Connection,
    project_id: i64,
    record: &ExchangeRecord,
) -> ImportResult<Option<(MasterRequirement, MatchStrategy)>> {
    if let Some(req) = RequirementRepository::find_by_reqif_id_tx(conn, project_id, &record.identifier)? {
        return Ok(Some((req, MatchStrategy::ResolvedId)));
    }

    if let Some(primary) = record.primary_id.as_deref() {
        if let Some(req) = RequirementRepository::find_by_internal_id_tx(conn, project_id, primary)? {
            return Ok(Some((req, MatchStrategy::InternalId)));
        }
    }

    if let Some(name) = record
        .fallback_name
        .as_deref()
        .filter(|name| *name != record.identifier)
    {
        if let Some(req) = RequirementRepository::find_by_reqif_id_tx(conn, project_id, name)? {
            return Ok(Some((req, MatchStrategy::NameFallback)));
        }
    }

    Ok(None)
}

/// 取出正文: 配置的正文属性，缺失时取首个 XHTML 属性
fn take_requirement_text(attributes: &mut AttributeBag, text_attribute: &str) -> String {
    if let Some(value) = attributes.shift_remove(text_attribute) {
        return value.as_text();
    }

    let first_xhtml = attributes
        .iter()
        .find(|(_, value)| matches!(value, AttributeValue::Xhtml(_)))
        .map(|(name, _)| name.clone());

    first_xhtml
        .and_then(|name| attributes.shift_remove(&name))
        .map(|value| value.as_text())
        .unwrap_or_default()
}

/// 取出状态/评论文本（原样保留；空白视为缺失）
fn take_optional_text(attributes: &mut AttributeBag, name: &str) -> Option<String> {
    attributes
        .shift_remove(name)
        .map(|value| value.as_text())
        .filter(|text| !text.trim().is_empty())
}
