// ==========================================
// 需求协调驾驶舱 - 状态映射规则仓储
// ==========================================
// 唯一键: (IFNULL(supplier_id, 0), raw_status)
// 约束: raw_status 入库前已规范化（normalize_status_key）
// ==========================================

use crate::domain::mapping_rule::{normalize_status_key, StatusMappingRule};
use crate::domain::types::CanonicalStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{enum_col, format_ts, now, ts_col};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

pub struct MappingRuleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MappingRuleRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 全部规则（全局规则在前，其后按供应商、原始状态排序）
    pub fn list(&self) -> RepositoryResult<Vec<StatusMappingRule>> {
        let conn = self.get_conn()?;
        Self::list_tx(&conn)
    }

    pub fn list_tx(conn: &Connection) -> RepositoryResult<Vec<StatusMappingRule>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT rule_id, supplier_id, raw_status, canonical_status, updated_at
            FROM status_mapping_rule
            ORDER BY IFNULL(supplier_id, 0), raw_status
            "#,
        )?;
        let rules = stmt
            .query_map([], map_rule)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rules)
    }

    /// 新增或覆盖规则
    ///
    /// # 参数
    /// - supplier_id: None 表示全局规则
    /// - raw_status: 原始状态（内部规范化）
    /// - canonical_status: 目标规范状态
    pub fn upsert(
        &self,
        supplier_id: Option<i64>,
        raw_status: &str,
        canonical_status: CanonicalStatus,
    ) -> RepositoryResult<StatusMappingRule> {
        let key = normalize_status_key(raw_status);
        if key.is_empty() {
            return Err(RepositoryError::ValidationError(
                "原始状态不能为空".to_string(),
            ));
        }

        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let updated_at = now();

        let existing: Option<i64> = tx
            .query_row(
                r#"
                SELECT rule_id FROM status_mapping_rule
                WHERE IFNULL(supplier_id, 0) = IFNULL(?1, 0) AND raw_status = ?2
                "#,
                params![supplier_id, key],
                |row| row.get(0),
            )
            .optional()?;

        let rule_id = match existing {
            Some(rule_id) => {
                tx.execute(
                    r#"
                    UPDATE status_mapping_rule
                    SET canonical_status = ?1, updated_at = ?2
                    WHERE rule_id = ?3
                    "#,
                    params![canonical_status.to_db_str(), format_ts(&updated_at), rule_id],
                )?;
                rule_id
            }
            None => {
                tx.execute(
                    r#"
                    INSERT INTO status_mapping_rule (supplier_id, raw_status, canonical_status, updated_at)
                    VALUES (?1, ?2, ?3, ?4)
                    "#,
                    params![
                        supplier_id,
                        key,
                        canonical_status.to_db_str(),
                        format_ts(&updated_at)
                    ],
                )?;
                tx.last_insert_rowid()
            }
        };
        tx.commit()?;

        Ok(StatusMappingRule {
            rule_id,
            supplier_id,
            raw_status: key,
            canonical_status,
            updated_at,
        })
    }

    /// 删除规则
    ///
    /// # 返回
    /// - Ok(true): 已删除
    /// - Ok(false): 规则不存在
    pub fn delete(&self, supplier_id: Option<i64>, raw_status: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            DELETE FROM status_mapping_rule
            WHERE IFNULL(supplier_id, 0) = IFNULL(?1, 0) AND raw_status = ?2
            "#,
            params![supplier_id, normalize_status_key(raw_status)],
        )?;
        Ok(rows > 0)
    }
}

fn map_rule(row: &Row) -> rusqlite::Result<StatusMappingRule> {
    Ok(StatusMappingRule {
        rule_id: row.get(0)?,
        supplier_id: row.get(1)?,
        raw_status: row.get(2)?,
        canonical_status: enum_col(row, 3, CanonicalStatus::from_str)?,
        updated_at: ts_col(row, 4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory_store;
    use crate::repository::{ProjectRepository, SupplierRepository};

    fn setup() -> (MappingRuleRepository, i64) {
        let store = open_in_memory_store().unwrap();
        let project = ProjectRepository::new(store.clone()).insert("P", None).unwrap();
        let supplier = SupplierRepository::new(store.clone())
            .insert(project.project_id, "Acme", None)
            .unwrap();
        (MappingRuleRepository::new(store), supplier.supplier_id)
    }

    #[test]
    fn test_upsert_is_keyed_by_supplier_and_normalized_status() {
        let (repo, acme) = setup();

        repo.upsert(None, "Open", CanonicalStatus::ClarificationNeeded).unwrap();
        repo.upsert(Some(acme), "open", CanonicalStatus::Rejected).unwrap();
        let updated = repo.upsert(None, "  OPEN ", CanonicalStatus::Accepted).unwrap();
        assert_eq!(updated.raw_status, "open");

        let rules = repo.list().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].supplier_id, None);
        assert_eq!(rules[0].canonical_status, CanonicalStatus::Accepted);
        assert_eq!(rules[1].supplier_id, Some(acme));
    }

    #[test]
    fn test_delete_and_blank_rejected() {
        let (repo, acme) = setup();
        repo.upsert(Some(acme), "Geht", CanonicalStatus::Accepted).unwrap();

        assert!(repo.delete(Some(acme), "geht").unwrap());
        assert!(!repo.delete(Some(acme), "geht").unwrap());
        assert!(matches!(
            repo.upsert(None, "   ", CanonicalStatus::Accepted),
            Err(RepositoryError::ValidationError(_))
        ));
    }
}
