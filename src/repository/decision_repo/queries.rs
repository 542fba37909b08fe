use super::core::{DecisionRepository, DECISION_COLUMNS};
use crate::domain::decision::{Decision, DecisionHistoryEntry};
use crate::repository::error::RepositoryResult;
use rusqlite::{params, Connection, OptionalExtension};

impl DecisionRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 当前决策（某需求在某迭代下）
    pub fn find_current(
        &self,
        requirement_id: i64,
        iteration_key: i64,
    ) -> RepositoryResult<Option<Decision>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM decision d WHERE d.requirement_id = ?1 AND d.iteration_key = ?2",
            DECISION_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![requirement_id, iteration_key], Self::map_row)
            .optional()?)
    }

    /// 迭代内全部决策
    pub fn list_by_iteration(&self, iteration_key: i64) -> RepositoryResult<Vec<Decision>> {
        let conn = self.get_conn()?;
        Self::list_by_iteration_tx(&conn, iteration_key)
    }

    pub fn list_by_iteration_tx(
        conn: &Connection,
        iteration_key: i64,
    ) -> RepositoryResult<Vec<Decision>> {
        let sql = format!(
            "SELECT {} FROM decision d WHERE d.iteration_key = ?1 ORDER BY d.requirement_id",
            DECISION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let decisions = stmt
            .query_map(params![iteration_key], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(decisions)
    }

    /// 决策历史（跨迭代，按迭代创建顺序）
    pub fn history(&self, requirement_id: i64) -> RepositoryResult<Vec<DecisionHistoryEntry>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {}, i.iteration_id
            FROM decision d
            JOIN iteration i ON i.iteration_key = d.iteration_key
            WHERE d.requirement_id = ?1
            ORDER BY i.iteration_key
            "#,
            DECISION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![requirement_id], |row| {
                Ok(DecisionHistoryEntry {
                    decision: Self::map_row(row)?,
                    iteration_id: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}
