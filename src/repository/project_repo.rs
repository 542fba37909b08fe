// ==========================================
// 需求协调驾驶舱 - 项目仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: 每个项目库文件通常只承载一个项目
// ==========================================

use crate::domain::project::Project;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{format_ts, now, ts_col};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const PROJECT_COLUMNS: &str = "project_id, name, description, created_at";

pub struct ProjectRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProjectRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建项目
    ///
    /// # 返回
    /// - Err(UniqueConstraintViolation): 同名项目已存在
    pub fn insert(&self, name: &str, description: Option<&str>) -> RepositoryResult<Project> {
        let conn = self.get_conn()?;
        let created_at = now();
        conn.execute(
            "INSERT INTO project (name, description, created_at) VALUES (?1, ?2, ?3)",
            params![name, description, format_ts(&created_at)],
        )?;

        Ok(Project {
            project_id: conn.last_insert_rowid(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at,
        })
    }

    pub fn find_by_id(&self, project_id: i64) -> RepositoryResult<Option<Project>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM project WHERE project_id = ?1", PROJECT_COLUMNS);
        Ok(conn
            .query_row(&sql, params![project_id], map_project)
            .optional()?)
    }

    pub fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Project>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM project WHERE name = ?1", PROJECT_COLUMNS);
        Ok(conn.query_row(&sql, params![name], map_project).optional()?)
    }

    /// 项目库中最早创建的项目
    pub fn first(&self) -> RepositoryResult<Option<Project>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM project ORDER BY project_id LIMIT 1",
            PROJECT_COLUMNS
        );
        Ok(conn.query_row(&sql, [], map_project).optional()?)
    }

    pub fn list(&self) -> RepositoryResult<Vec<Project>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM project ORDER BY project_id", PROJECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let projects = stmt
            .query_map([], map_project)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(projects)
    }
}

fn map_project(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        project_id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: ts_col(row, 3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory_store;

    #[test]
    fn test_insert_and_find() {
        let repo = ProjectRepository::new(open_in_memory_store().unwrap());
        let project = repo.insert("Brake", Some("brake system")).unwrap();

        let found = repo.find_by_name("Brake").unwrap().unwrap();
        assert_eq!(found.project_id, project.project_id);
        assert_eq!(found.description.as_deref(), Some("brake system"));
        assert_eq!(repo.first().unwrap().unwrap().name, "Brake");
        assert!(repo.find_by_id(999).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let repo = ProjectRepository::new(open_in_memory_store().unwrap());
        repo.insert("Brake", None).unwrap();

        let err = repo.insert("Brake", None).unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
        assert_eq!(repo.list().unwrap().len(), 1);
    }
}
