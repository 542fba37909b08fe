use crate::domain::decision::Decision;
use crate::domain::types::DecisionStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{enum_col, format_ts, now, ts_col};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

pub(super) const DECISION_COLUMNS: &str =
    "d.decision_id, d.requirement_id, d.iteration_key, d.status, d.note, d.author, d.decided_at";

// ==========================================
// DecisionRepository - 决策仓储
// ==========================================
pub struct DecisionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DecisionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 保存决策（同一需求同一迭代已存在则覆盖）
    ///
    /// # 参数
    /// - `requirement_id`: 主需求
    /// - `iteration_key`: 迭代主键
    /// - `status`: 决策状态
    /// - `note`: 备注（长度由调用层校验）
    /// - `author`: 决策人
    ///
    /// # 返回
    /// - `Ok(Decision)`: 保存后的当前决策
    /// - `Err(ForeignKeyViolation)`: 需求或迭代不存在
    pub fn upsert(
        &self,
        requirement_id: i64,
        iteration_key: i64,
        status: DecisionStatus,
        note: &str,
        author: &str,
    ) -> RepositoryResult<Decision> {
        let conn = self.get_conn()?;
        let decided_at = now();

        let decision_id: i64 = conn.query_row(
            r#"
            INSERT INTO decision (requirement_id, iteration_key, status, note, author, decided_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(requirement_id, iteration_key) DO UPDATE SET
                status = excluded.status,
                note = excluded.note,
                author = excluded.author,
                decided_at = excluded.decided_at
            RETURNING decision_id
            "#,
            params![
                requirement_id,
                iteration_key,
                status.to_db_str(),
                note,
                author,
                format_ts(&decided_at),
            ],
            |row| row.get(0),
        )?;

        Ok(Decision {
            decision_id,
            requirement_id,
            iteration_key,
            status,
            note: note.to_string(),
            author: author.to_string(),
            decided_at,
        })
    }

    pub(super) fn map_row(row: &Row) -> rusqlite::Result<Decision> {
        Ok(Decision {
            decision_id: row.get(0)?,
            requirement_id: row.get(1)?,
            iteration_key: row.get(2)?,
            status: enum_col(row, 3, DecisionStatus::from_str)?,
            note: row.get(4)?,
            author: row.get(5)?,
            decided_at: ts_col(row, 6)?,
        })
    }
}
