// ==========================================
// 需求协调驾驶舱 - 主需求仓储
// ==========================================
// 唯一键: (project_id, reqif_id)
// 红线: 主导入重复执行只更新，不产生重复行
// ==========================================

use crate::domain::requirement::{merge_attribute_bag, AttributeBag, MasterRequirement};
use crate::domain::types::IdStrategy;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{bag_col, enum_col, format_ts, now, ts_col};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex};

const REQUIREMENT_COLUMNS: &str = r#"
    requirement_id, project_id, reqif_id, internal_id, id_strategy,
    type_tag, text_content, attributes_json, created_at, updated_at
"#;

/// 主需求写入载荷
#[derive(Debug, Clone)]
pub struct RequirementUpsert {
    pub project_id: i64,
    pub reqif_id: String,
    pub internal_id: Option<String>,
    pub id_strategy: IdStrategy,
    pub type_tag: Option<String>,
    pub text: String,
    pub attributes: AttributeBag,
}

/// upsert 结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created(i64),
    Updated(i64),
}

impl UpsertOutcome {
    pub fn id(&self) -> i64 {
        match self {
            UpsertOutcome::Created(id) | UpsertOutcome::Updated(id) => *id,
        }
    }
}

pub struct RequirementRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RequirementRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 事务内写入
    // ==========================================

    /// 在事务中按 reqif_id upsert 主需求
    ///
    /// 已存在时: 正文/类型/内部标识以本次为准，属性包逐属性后写覆盖合并
    pub fn upsert_tx(tx: &Transaction, input: &RequirementUpsert) -> RepositoryResult<UpsertOutcome> {
        let ts = format_ts(&now());

        match Self::find_by_reqif_id_tx(tx, input.project_id, &input.reqif_id)? {
            Some(existing) => {
                let mut attributes = existing.attributes;
                merge_attribute_bag(&mut attributes, input.attributes.clone());

                tx.execute(
                    r#"
                    UPDATE master_requirement SET
                        internal_id = ?1,
                        id_strategy = ?2,
                        type_tag = COALESCE(?3, type_tag),
                        text_content = ?4,
                        attributes_json = ?5,
                        updated_at = ?6
                    WHERE requirement_id = ?7
                    "#,
                    params![
                        input.internal_id,
                        input.id_strategy.to_db_str(),
                        input.type_tag,
                        input.text,
                        serde_json::to_string(&attributes)?,
                        ts,
                        existing.requirement_id,
                    ],
                )?;
                Ok(UpsertOutcome::Updated(existing.requirement_id))
            }
            None => {
                tx.execute(
                    r#"
                    INSERT INTO master_requirement (
                        project_id, reqif_id, internal_id, id_strategy, type_tag,
                        text_content, attributes_json, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
                    "#,
                    params![
                        input.project_id,
                        input.reqif_id,
                        input.internal_id,
                        input.id_strategy.to_db_str(),
                        input.type_tag,
                        input.text,
                        serde_json::to_string(&input.attributes)?,
                        ts,
                    ],
                )?;
                Ok(UpsertOutcome::Created(tx.last_insert_rowid()))
            }
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn find_by_reqif_id_tx(
        conn: &Connection,
        project_id: i64,
        reqif_id: &str,
    ) -> RepositoryResult<Option<MasterRequirement>> {
        let sql = format!(
            "SELECT {} FROM master_requirement WHERE project_id = ?1 AND reqif_id = ?2",
            REQUIREMENT_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![project_id, reqif_id], map_requirement)
            .optional()?)
    }

    /// 按文档内部标识查询（多行命中时取最早导入的一行）
    pub fn find_by_internal_id_tx(
        conn: &Connection,
        project_id: i64,
        internal_id: &str,
    ) -> RepositoryResult<Option<MasterRequirement>> {
        let sql = format!(
            r#"
            SELECT {} FROM master_requirement
            WHERE project_id = ?1 AND internal_id = ?2
            ORDER BY requirement_id
            LIMIT 1
            "#,
            REQUIREMENT_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![project_id, internal_id], map_requirement)
            .optional()?)
    }

    pub fn find_by_reqif_id(
        &self,
        project_id: i64,
        reqif_id: &str,
    ) -> RepositoryResult<Option<MasterRequirement>> {
        let conn = self.get_conn()?;
        Self::find_by_reqif_id_tx(&conn, project_id, reqif_id)
    }

    pub fn find_by_id(&self, requirement_id: i64) -> RepositoryResult<Option<MasterRequirement>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM master_requirement WHERE requirement_id = ?1",
            REQUIREMENT_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![requirement_id], map_requirement)
            .optional()?)
    }

    /// 项目内全部主需求（按插入顺序）
    pub fn list_by_project(&self, project_id: i64) -> RepositoryResult<Vec<MasterRequirement>> {
        let conn = self.get_conn()?;
        Self::list_by_project_tx(&conn, project_id)
    }

    pub fn list_by_project_tx(
        conn: &Connection,
        project_id: i64,
    ) -> RepositoryResult<Vec<MasterRequirement>> {
        let sql = format!(
            "SELECT {} FROM master_requirement WHERE project_id = ?1 ORDER BY requirement_id",
            REQUIREMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![project_id], map_requirement)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_by_project(&self, project_id: i64) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM master_requirement WHERE project_id = ?1",
            params![project_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn map_requirement(row: &Row) -> rusqlite::Result<MasterRequirement> {
    Ok(MasterRequirement {
        requirement_id: row.get(0)?,
        project_id: row.get(1)?,
        reqif_id: row.get(2)?,
        internal_id: row.get(3)?,
        id_strategy: enum_col(row, 4, IdStrategy::from_str)?,
        type_tag: row.get(5)?,
        text: row.get(6)?,
        attributes: bag_col(row, 7)?,
        created_at: ts_col(row, 8)?,
        updated_at: ts_col(row, 9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory_store;
    use crate::domain::requirement::AttributeValue;
    use crate::repository::ProjectRepository;

    fn upsert_input(project_id: i64, reqif_id: &str, text: &str, attrs: &[(&str, &str)]) -> RequirementUpsert {
        RequirementUpsert {
            project_id,
            reqif_id: reqif_id.to_string(),
            internal_id: Some(format!("int-{}", reqif_id)),
            id_strategy: IdStrategy::Primary,
            type_tag: Some("Requirement".to_string()),
            text: text.to_string(),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), AttributeValue::String(v.to_string())))
                .collect(),
        }
    }

    #[test]
    fn test_upsert_creates_then_updates_with_merge() {
        let store = open_in_memory_store().unwrap();
        let project = ProjectRepository::new(store.clone()).insert("P", None).unwrap();
        let repo = RequirementRepository::new(store.clone());

        {
            let conn = store.lock().unwrap();
            let tx = conn.unchecked_transaction().unwrap();
            let first = RequirementRepository::upsert_tx(
                &tx,
                &upsert_input(project.project_id, "R1", "old", &[("Prio", "High"), ("Owner", "A")]),
            )
            .unwrap();
            assert!(matches!(first, UpsertOutcome::Created(_)));

            let second = RequirementRepository::upsert_tx(
                &tx,
                &upsert_input(project.project_id, "R1", "new", &[("Owner", "B"), ("ASIL", "C")]),
            )
            .unwrap();
            assert_eq!(second, UpsertOutcome::Updated(first.id()));
            tx.commit().unwrap();
        }

        let all = repo.list_by_project(project.project_id).unwrap();
        assert_eq!(all.len(), 1);
        let r1 = &all[0];
        assert_eq!(r1.text, "new");
        let keys: Vec<&str> = r1.attributes.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Prio", "Owner", "ASIL"]);
        assert_eq!(r1.attributes["Owner"], AttributeValue::String("B".into()));
    }

    #[test]
    fn test_find_by_internal_id_and_order() {
        let store = open_in_memory_store().unwrap();
        let project = ProjectRepository::new(store.clone()).insert("P", None).unwrap();
        let repo = RequirementRepository::new(store.clone());

        {
            let conn = store.lock().unwrap();
            let tx = conn.unchecked_transaction().unwrap();
            for id in ["R3", "R1", "R2"] {
                RequirementRepository::upsert_tx(&tx, &upsert_input(project.project_id, id, id, &[]))
                    .unwrap();
            }
            tx.commit().unwrap();
        }

        let ids: Vec<String> = repo
            .list_by_project(project.project_id)
            .unwrap()
            .into_iter()
            .map(|r| r.reqif_id)
            .collect();
        assert_eq!(ids, vec!["R3", "R1", "R2"]);

        let conn = store.lock().unwrap();
        let hit = RequirementRepository::find_by_internal_id_tx(&conn, project.project_id, "int-R1")
            .unwrap()
            .unwrap();
        assert_eq!(hit.reqif_id, "R1");
    }

    #[test]
    fn test_rollback_leaves_no_rows() {
        let store = open_in_memory_store().unwrap();
        let project = ProjectRepository::new(store.clone()).insert("P", None).unwrap();
        let repo = RequirementRepository::new(store.clone());

        {
            let conn = store.lock().unwrap();
            let tx = conn.unchecked_transaction().unwrap();
            RequirementRepository::upsert_tx(&tx, &upsert_input(project.project_id, "R1", "x", &[]))
                .unwrap();
            // 不提交
        }

        assert_eq!(repo.count_by_project(project.project_id).unwrap(), 0);
    }
}
