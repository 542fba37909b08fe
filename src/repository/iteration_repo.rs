// ==========================================
// 需求协调驾驶舱 - 迭代仓储
// ==========================================
// 红线: 迭代标识不可变、不可删除，关闭只能发生一次（触发器保证）
// ==========================================

use crate::domain::project::Iteration;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{format_ts, now, opt_ts_col, ts_col};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const ITERATION_COLUMNS: &str =
    "iteration_key, project_id, iteration_id, description, created_at, closed_at";

pub struct IterationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl IterationRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建迭代
    ///
    /// # 返回
    /// - Err(UniqueConstraintViolation): 项目内已存在同名迭代（不修改任何行）
    pub fn insert(
        &self,
        project_id: i64,
        iteration_id: &str,
        description: Option<&str>,
    ) -> RepositoryResult<Iteration> {
        let conn = self.get_conn()?;
        let created_at = now();
        conn.execute(
            r#"
            INSERT INTO iteration (project_id, iteration_id, description, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![project_id, iteration_id, description, format_ts(&created_at)],
        )?;

        Ok(Iteration {
            iteration_key: conn.last_insert_rowid(),
            project_id,
            iteration_id: iteration_id.to_string(),
            description: description.map(str::to_string),
            created_at,
            closed_at: None,
        })
    }

    pub fn find_by_key(&self, iteration_key: i64) -> RepositoryResult<Option<Iteration>> {
        let conn = self.get_conn()?;
        Self::find_by_key_tx(&conn, iteration_key)
    }

    pub fn find_by_key_tx(
        conn: &Connection,
        iteration_key: i64,
    ) -> RepositoryResult<Option<Iteration>> {
        let sql = format!(
            "SELECT {} FROM iteration WHERE iteration_key = ?1",
            ITERATION_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![iteration_key], map_iteration)
            .optional()?)
    }

    /// 按业务标识查询
    pub fn find_by_id(
        &self,
        project_id: i64,
        iteration_id: &str,
    ) -> RepositoryResult<Option<Iteration>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, project_id, iteration_id)
    }

    pub fn find_by_id_tx(
        conn: &Connection,
        project_id: i64,
        iteration_id: &str,
    ) -> RepositoryResult<Option<Iteration>> {
        let sql = format!(
            "SELECT {} FROM iteration WHERE project_id = ?1 AND iteration_id = ?2",
            ITERATION_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![project_id, iteration_id], map_iteration)
            .optional()?)
    }

    /// 项目内全部迭代（按创建顺序）
    pub fn list_by_project(&self, project_id: i64) -> RepositoryResult<Vec<Iteration>> {
        let conn = self.get_conn()?;
        Self::list_by_project_tx(&conn, project_id)
    }

    pub fn list_by_project_tx(
        conn: &Connection,
        project_id: i64,
    ) -> RepositoryResult<Vec<Iteration>> {
        let sql = format!(
            "SELECT {} FROM iteration WHERE project_id = ?1 ORDER BY iteration_key",
            ITERATION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let iterations = stmt
            .query_map(params![project_id], map_iteration)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(iterations)
    }

    /// 关闭迭代（此后拒绝供应商导入）
    ///
    /// # 返回
    /// - Err(NotFound): 迭代不存在
    /// - Err(ImmutableViolation): 已关闭
    pub fn close(&self, iteration_key: i64) -> RepositoryResult<Iteration> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let rows = tx.execute(
            "UPDATE iteration SET closed_at = ?1 WHERE iteration_key = ?2",
            params![format_ts(&now()), iteration_key],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Iteration".to_string(),
                id: iteration_key.to_string(),
            });
        }
        let iteration = Self::find_by_key_tx(&tx, iteration_key)?.ok_or_else(|| {
            RepositoryError::InternalError(format!("迭代 {} 关闭后无法读取", iteration_key))
        })?;
        tx.commit()?;
        Ok(iteration)
    }
}

fn map_iteration(row: &Row) -> rusqlite::Result<Iteration> {
    Ok(Iteration {
        iteration_key: row.get(0)?,
        project_id: row.get(1)?,
        iteration_id: row.get(2)?,
        description: row.get(3)?,
        created_at: ts_col(row, 4)?,
        closed_at: opt_ts_col(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory_store;
    use crate::repository::ProjectRepository;

    fn setup() -> (IterationRepository, i64, Arc<Mutex<Connection>>) {
        let store = open_in_memory_store().unwrap();
        let project = ProjectRepository::new(store.clone())
            .insert("P", None)
            .unwrap();
        (IterationRepository::new(store.clone()), project.project_id, store)
    }

    #[test]
    fn test_duplicate_identifier_fails_without_mutation() {
        let (repo, project_id, _) = setup();
        let first = repo.insert(project_id, "I-001", Some("kickoff")).unwrap();

        let err = repo.insert(project_id, "I-001", Some("other")).unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));

        let all = repo.list_by_project(project_id).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], first);
    }

    #[test]
    fn test_close_once() {
        let (repo, project_id, _) = setup();
        let it = repo.insert(project_id, "I-001", None).unwrap();

        let closed = repo.close(it.iteration_key).unwrap();
        assert!(closed.is_closed());

        let err = repo.close(it.iteration_key).unwrap_err();
        assert!(matches!(err, RepositoryError::ImmutableViolation(_)));
    }

    #[test]
    fn test_identifier_and_row_are_immutable() {
        let (repo, project_id, store) = setup();
        let it = repo.insert(project_id, "I-001", None).unwrap();

        let conn = store.lock().unwrap();
        let rename: RepositoryError = conn
            .execute(
                "UPDATE iteration SET iteration_id = 'I-XXX' WHERE iteration_key = ?1",
                params![it.iteration_key],
            )
            .unwrap_err()
            .into();
        assert!(matches!(rename, RepositoryError::ImmutableViolation(_)));

        let delete: RepositoryError = conn
            .execute(
                "DELETE FROM iteration WHERE iteration_key = ?1",
                params![it.iteration_key],
            )
            .unwrap_err()
            .into();
        assert!(matches!(delete, RepositoryError::ImmutableViolation(_)));
    }

    #[test]
    fn test_list_in_creation_order() {
        let (repo, project_id, _) = setup();
        repo.insert(project_id, "I-002", None).unwrap();
        repo.insert(project_id, "I-001", None).unwrap();

        let ids: Vec<String> = repo
            .list_by_project(project_id)
            .unwrap()
            .into_iter()
            .map(|i| i.iteration_id)
            .collect();
        assert_eq!(ids, vec!["I-002", "I-001"]);
        assert!(repo.find_by_id(project_id, "I-003").unwrap().is_none());
    }
}
