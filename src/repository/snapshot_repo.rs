// ==========================================
// 需求协调驾驶舱 - 迭代快照读取
// ==========================================
// 职责: 在单个读事务内取出视图构建所需的全部数据
// 约束: 快照不会混入导入前后的半状态
// ==========================================

use crate::domain::project::Iteration;
use crate::domain::snapshot::{IterationSnapshot, IterationTimelineEntry};
use crate::repository::decision_repo::DecisionRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::feedback_repo::FeedbackRepository;
use crate::repository::iteration_repo::IterationRepository;
use crate::repository::requirement_repo::RequirementRepository;
use crate::repository::row_codec::{opt_ts_col, ts_col};
use crate::repository::supplier_repo::SupplierRepository;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};
use tracing::debug;

pub struct SnapshotRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SnapshotRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取迭代快照
    ///
    /// # 参数
    /// - project_id: 项目
    /// - iteration_key: 迭代主键（必须属于该项目）
    ///
    /// # 返回
    /// - Err(NotFound): 迭代不存在或不属于该项目
    pub fn load(&self, project_id: i64, iteration_key: i64) -> RepositoryResult<IterationSnapshot> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let iteration = IterationRepository::find_by_key_tx(&tx, iteration_key)?
            .filter(|it: &Iteration| it.project_id == project_id)
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "Iteration".to_string(),
                id: iteration_key.to_string(),
            })?;

        let snapshot = IterationSnapshot {
            suppliers: SupplierRepository::list_by_project_tx(&tx, project_id)?,
            requirements: RequirementRepository::list_by_project_tx(&tx, project_id)?,
            feedback: FeedbackRepository::list_by_iteration_tx(&tx, iteration_key)?,
            decisions: DecisionRepository::list_by_iteration_tx(&tx, iteration_key)?,
            iteration,
        };
        tx.commit()?;

        debug!(
            project_id = project_id,
            iteration_id = %snapshot.iteration.iteration_id,
            requirements = snapshot.requirements.len(),
            feedback = snapshot.feedback.len(),
            "迭代快照已加载"
        );
        Ok(snapshot)
    }

    /// 项目迭代时间线（按创建顺序）
    pub fn timeline(&self, project_id: i64) -> RepositoryResult<Vec<IterationTimelineEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                i.iteration_key,
                i.iteration_id,
                i.created_at,
                i.closed_at,
                (SELECT COUNT(*) FROM supplier_feedback f WHERE f.iteration_key = i.iteration_key),
                (SELECT COUNT(DISTINCT f.supplier_id) FROM supplier_feedback f
                    WHERE f.iteration_key = i.iteration_key),
                (SELECT COUNT(*) FROM decision d WHERE d.iteration_key = i.iteration_key)
            FROM iteration i
            WHERE i.project_id = ?1
            ORDER BY i.iteration_key
            "#,
        )?;
        let entries = stmt
            .query_map(params![project_id], |row| {
                Ok(IterationTimelineEntry {
                    iteration_key: row.get(0)?,
                    iteration_id: row.get(1)?,
                    created_at: ts_col(row, 2)?,
                    closed_at: opt_ts_col(row, 3)?,
                    feedback_count: row.get::<_, i64>(4)? as usize,
                    supplier_count: row.get::<_, i64>(5)? as usize,
                    decision_count: row.get::<_, i64>(6)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory_store;
    use crate::repository::{IterationRepository, ProjectRepository};

    #[test]
    fn test_load_rejects_foreign_iteration() {
        let store = open_in_memory_store().unwrap();
        let projects = ProjectRepository::new(store.clone());
        let p1 = projects.insert("P1", None).unwrap();
        let p2 = projects.insert("P2", None).unwrap();
        let it = IterationRepository::new(store.clone())
            .insert(p1.project_id, "I-001", None)
            .unwrap();

        let repo = SnapshotRepository::new(store);
        assert!(repo.load(p1.project_id, it.iteration_key).is_ok());
        assert!(matches!(
            repo.load(p2.project_id, it.iteration_key),
            Err(RepositoryError::NotFound { .. })
        ));
    }

    #[test]
    fn test_empty_timeline_counts() {
        let store = open_in_memory_store().unwrap();
        let project = ProjectRepository::new(store.clone()).insert("P", None).unwrap();
        let iterations = IterationRepository::new(store.clone());
        iterations.insert(project.project_id, "I-001", None).unwrap();
        iterations.insert(project.project_id, "I-002", None).unwrap();

        let timeline = SnapshotRepository::new(store).timeline(project.project_id).unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[1].iteration_id, "I-002");
        assert_eq!(timeline[0].feedback_count, 0);
        assert!(timeline[0].closed_at.is_none());
    }
}
