// ==========================================
// 需求协调驾驶舱 - 供应商反馈仓储
// ==========================================
// 唯一键: (requirement_id, iteration_key, supplier_id)
// 同一迭代同一供应商重复导入 → 原地替换；不同迭代 → 新行
// ==========================================

use crate::domain::requirement::{AttributeBag, SupplierFeedback};
use crate::domain::types::{CanonicalStatus, HarmonizeStage, MatchStrategy};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{bag_col, enum_col, format_ts, now, ts_col};
use rusqlite::{params, Connection, Row, Transaction};
use std::sync::{Arc, Mutex};

const FEEDBACK_COLUMNS: &str = r#"
    feedback_id, requirement_id, iteration_key, supplier_id, raw_status,
    canonical_status, harmonize_stage, match_strategy, comment, attributes_json, imported_at
"#;

/// 反馈写入载荷
#[derive(Debug, Clone)]
pub struct FeedbackUpsert {
    pub requirement_id: i64,
    pub iteration_key: i64,
    pub supplier_id: i64,
    pub raw_status: Option<String>,
    pub canonical_status: CanonicalStatus,
    pub harmonize_stage: HarmonizeStage,
    pub match_strategy: MatchStrategy,
    pub comment: Option<String>,
    pub attributes: AttributeBag,
}

/// 重新映射候选行
#[derive(Debug, Clone, PartialEq)]
pub struct HarmonizeCandidate {
    pub feedback_id: i64,
    pub supplier_id: i64,
    pub raw_status: Option<String>,
    pub canonical_status: CanonicalStatus,
    pub harmonize_stage: HarmonizeStage,
}

pub struct FeedbackRepository {
    conn: Arc<Mutex<Connection>>,
}

impl FeedbackRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在事务中 upsert 一条反馈，返回 feedback_id
    pub fn upsert_tx(tx: &Transaction, input: &FeedbackUpsert) -> RepositoryResult<i64> {
        let id: i64 = tx.query_row(
            r#"
            INSERT INTO supplier_feedback (
                requirement_id, iteration_key, supplier_id, raw_status,
                canonical_status, harmonize_stage, match_strategy,
                comment, attributes_json, imported_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(requirement_id, iteration_key, supplier_id) DO UPDATE SET
                raw_status = excluded.raw_status,
                canonical_status = excluded.canonical_status,
                harmonize_stage = excluded.harmonize_stage,
                match_strategy = excluded.match_strategy,
                comment = excluded.comment,
                attributes_json = excluded.attributes_json,
                imported_at = excluded.imported_at
            RETURNING feedback_id
            "#,
            params![
                input.requirement_id,
                input.iteration_key,
                input.supplier_id,
                input.raw_status,
                input.canonical_status.to_db_str(),
                input.harmonize_stage.to_db_str(),
                input.match_strategy.to_db_str(),
                input.comment,
                serde_json::to_string(&input.attributes)?,
                format_ts(&now()),
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// 迭代内全部反馈（按需求、供应商排序）
    pub fn list_by_iteration(&self, iteration_key: i64) -> RepositoryResult<Vec<SupplierFeedback>> {
        let conn = self.get_conn()?;
        Self::list_by_iteration_tx(&conn, iteration_key)
    }

    pub fn list_by_iteration_tx(
        conn: &Connection,
        iteration_key: i64,
    ) -> RepositoryResult<Vec<SupplierFeedback>> {
        let sql = format!(
            r#"
            SELECT {} FROM supplier_feedback
            WHERE iteration_key = ?1
            ORDER BY requirement_id, supplier_id
            "#,
            FEEDBACK_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![iteration_key], map_feedback)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ==========================================
    // 重新映射（规则修改后的显式回写）
    // ==========================================

    /// 项目内待重新映射的反馈，可按迭代/供应商收窄范围
    ///
    /// 已关闭迭代的反馈不可变，不在候选之列
    pub fn list_for_harmonize_tx(
        conn: &Connection,
        project_id: i64,
        iteration_key: Option<i64>,
        supplier_id: Option<i64>,
    ) -> RepositoryResult<Vec<HarmonizeCandidate>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT f.feedback_id, f.supplier_id, f.raw_status, f.canonical_status, f.harmonize_stage
            FROM supplier_feedback f
            JOIN master_requirement r ON r.requirement_id = f.requirement_id
            JOIN iteration i ON i.iteration_key = f.iteration_key
            WHERE r.project_id = ?1
              AND i.closed_at IS NULL
              AND (?2 IS NULL OR f.iteration_key = ?2)
              AND (?3 IS NULL OR f.supplier_id = ?3)
            ORDER BY f.feedback_id
            "#,
        )?;
        let rows = stmt
            .query_map(params![project_id, iteration_key, supplier_id], |row| {
                Ok(HarmonizeCandidate {
                    feedback_id: row.get(0)?,
                    supplier_id: row.get(1)?,
                    raw_status: row.get(2)?,
                    canonical_status: enum_col(row, 3, CanonicalStatus::from_str)?,
                    harmonize_stage: enum_col(row, 4, HarmonizeStage::from_str)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn update_status_tx(
        tx: &Transaction,
        feedback_id: i64,
        canonical_status: CanonicalStatus,
        harmonize_stage: HarmonizeStage,
    ) -> RepositoryResult<()> {
        tx.execute(
            r#"
            UPDATE supplier_feedback
            SET canonical_status = ?1, harmonize_stage = ?2
            WHERE feedback_id = ?3
            "#,
            params![
                canonical_status.to_db_str(),
                harmonize_stage.to_db_str(),
                feedback_id
            ],
        )?;
        Ok(())
    }
}

fn map_feedback(row: &Row) -> rusqlite::Result<SupplierFeedback> {
    Ok(SupplierFeedback {
        feedback_id: row.get(0)?,
        requirement_id: row.get(1)?,
        iteration_key: row.get(2)?,
        supplier_id: row.get(3)?,
        raw_status: row.get(4)?,
        canonical_status: enum_col(row, 5, CanonicalStatus::from_str)?,
        harmonize_stage: enum_col(row, 6, HarmonizeStage::from_str)?,
        match_strategy: enum_col(row, 7, MatchStrategy::from_str)?,
        comment: row.get(8)?,
        attributes: bag_col(row, 9)?,
        imported_at: ts_col(row, 10)?,
    })
}
