// ==========================================
// 需求协调驾驶舱 - 导入审计日志仓储
// ==========================================
// 红线: 仅追加；更新/删除由触发器拒绝
// ==========================================

use crate::domain::import::ImportLogEntry;
use crate::domain::types::ImportKind;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{enum_col, format_ts, json_col, ts_col};
use rusqlite::{params, Connection, Row, Transaction};
use std::sync::{Arc, Mutex};

pub struct ImportLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ImportLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在导入事务中追加日志（与数据写入同提交同回滚）
    pub fn insert_tx(tx: &Transaction, entry: &ImportLogEntry) -> RepositoryResult<()> {
        tx.execute(
            r#"
            INSERT INTO import_log (
                import_id, project_id, kind, source_name, iteration_key, supplier_id,
                created_count, updated_count, skipped_count, matched_count, unmatched_count,
                warning_count, summary_json, imported_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                entry.import_id,
                entry.project_id,
                entry.kind.to_db_str(),
                entry.source_name,
                entry.iteration_key,
                entry.supplier_id,
                entry.created as i64,
                entry.updated as i64,
                entry.skipped as i64,
                entry.matched as i64,
                entry.unmatched as i64,
                entry.warning_count as i64,
                entry.summary_json.to_string(),
                format_ts(&entry.imported_at),
            ],
        )?;
        Ok(())
    }

    /// 项目导入日志（最新在前）
    pub fn list_by_project(&self, project_id: i64, limit: usize) -> RepositoryResult<Vec<ImportLogEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT import_id, project_id, kind, source_name, iteration_key, supplier_id,
                   created_count, updated_count, skipped_count, matched_count, unmatched_count,
                   warning_count, summary_json, imported_at
            FROM import_log
            WHERE project_id = ?1
            ORDER BY imported_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )?;
        let entries = stmt
            .query_map(params![project_id, limit as i64], map_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

fn map_entry(row: &Row) -> rusqlite::Result<ImportLogEntry> {
    Ok(ImportLogEntry {
        import_id: row.get(0)?,
        project_id: row.get(1)?,
        kind: enum_col(row, 2, ImportKind::from_str)?,
        source_name: row.get(3)?,
        iteration_key: row.get(4)?,
        supplier_id: row.get(5)?,
        created: row.get::<_, i64>(6)? as usize,
        updated: row.get::<_, i64>(7)? as usize,
        skipped: row.get::<_, i64>(8)? as usize,
        matched: row.get::<_, i64>(9)? as usize,
        unmatched: row.get::<_, i64>(10)? as usize,
        warning_count: row.get::<_, i64>(11)? as usize,
        summary_json: json_col(row, 12)?,
        imported_at: ts_col(row, 13)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory_store;
    use crate::repository::row_codec::now;
    use crate::repository::ProjectRepository;

    fn entry(project_id: i64, import_id: &str) -> ImportLogEntry {
        ImportLogEntry {
            import_id: import_id.to_string(),
            project_id,
            kind: ImportKind::Master,
            source_name: "master.reqif".to_string(),
            iteration_key: None,
            supplier_id: None,
            created: 3,
            updated: 0,
            skipped: 1,
            matched: 0,
            unmatched: 0,
            warning_count: 1,
            summary_json: serde_json::json!({"created": 3}),
            imported_at: now(),
        }
    }

    #[test]
    fn test_append_and_list() {
        let store = open_in_memory_store().unwrap();
        let project = ProjectRepository::new(store.clone()).insert("P", None).unwrap();
        let repo = ImportLogRepository::new(store.clone());

        {
            let conn = store.lock().unwrap();
            let tx = conn.unchecked_transaction().unwrap();
            ImportLogRepository::insert_tx(&tx, &entry(project.project_id, "a")).unwrap();
            ImportLogRepository::insert_tx(&tx, &entry(project.project_id, "b")).unwrap();
            tx.commit().unwrap();
        }

        let entries = repo.list_by_project(project.project_id, 10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].created, 3);
        assert_eq!(entries[0].summary_json["created"], 3);
        assert_eq!(repo.list_by_project(project.project_id, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_log_is_append_only() {
        let store = open_in_memory_store().unwrap();
        let project = ProjectRepository::new(store.clone()).insert("P", None).unwrap();

        let conn = store.lock().unwrap();
        let tx = conn.unchecked_transaction().unwrap();
        ImportLogRepository::insert_tx(&tx, &entry(project.project_id, "a")).unwrap();
        tx.commit().unwrap();

        let err: RepositoryError = conn
            .execute("UPDATE import_log SET created_count = 0", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, RepositoryError::ImmutableViolation(_)));
    }
}
