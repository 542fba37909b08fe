// ==========================================
// 需求协调驾驶舱 - 供应商仓储
// ==========================================
// 红线: 供应商身份（name）创建后不可变，仅 short_name 可编辑
// ==========================================

use crate::domain::project::Supplier;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_codec::{format_ts, now, ts_col};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex};

const SUPPLIER_COLUMNS: &str = "supplier_id, project_id, name, short_name, created_at";

pub struct SupplierRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SupplierRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建供应商
    ///
    /// # 参数
    /// - project_id: 所属项目
    /// - name: 供应商全称（项目内唯一）
    /// - short_name: 展示用简称
    pub fn insert(
        &self,
        project_id: i64,
        name: &str,
        short_name: Option<&str>,
    ) -> RepositoryResult<Supplier> {
        let conn = self.get_conn()?;
        let created_at = now();
        conn.execute(
            r#"
            INSERT INTO supplier (project_id, name, short_name, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![project_id, name, short_name, format_ts(&created_at)],
        )?;

        Ok(Supplier {
            supplier_id: conn.last_insert_rowid(),
            project_id,
            name: name.to_string(),
            short_name: short_name.map(str::to_string),
            created_at,
        })
    }

    pub fn find_by_id(&self, supplier_id: i64) -> RepositoryResult<Option<Supplier>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, supplier_id)
    }

    /// 按 ID 查询（事务内/共享连接内可用）
    pub fn find_by_id_tx(conn: &Connection, supplier_id: i64) -> RepositoryResult<Option<Supplier>> {
        let sql = format!("SELECT {} FROM supplier WHERE supplier_id = ?1", SUPPLIER_COLUMNS);
        Ok(conn
            .query_row(&sql, params![supplier_id], map_supplier)
            .optional()?)
    }

    pub fn find_by_name(&self, project_id: i64, name: &str) -> RepositoryResult<Option<Supplier>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM supplier WHERE project_id = ?1 AND name = ?2",
            SUPPLIER_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![project_id, name], map_supplier)
            .optional()?)
    }

    /// 项目内全部供应商（按创建顺序）
    pub fn list_by_project(&self, project_id: i64) -> RepositoryResult<Vec<Supplier>> {
        let conn = self.get_conn()?;
        Self::list_by_project_tx(&conn, project_id)
    }

    pub fn list_by_project_tx(conn: &Connection, project_id: i64) -> RepositoryResult<Vec<Supplier>> {
        let sql = format!(
            "SELECT {} FROM supplier WHERE project_id = ?1 ORDER BY supplier_id",
            SUPPLIER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let suppliers = stmt
            .query_map(params![project_id], map_supplier)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(suppliers)
    }

    /// 修改简称
    pub fn update_short_name(
        &self,
        supplier_id: i64,
        short_name: Option<&str>,
    ) -> RepositoryResult<Supplier> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let rows = tx.execute(
            "UPDATE supplier SET short_name = ?1 WHERE supplier_id = ?2",
            params![short_name, supplier_id],
        )?;
        if rows == 0 {
            return Err(not_found(supplier_id));
        }
        let supplier = Self::find_by_id_tx(&tx, supplier_id)?.ok_or_else(|| not_found(supplier_id))?;
        tx.commit()?;
        Ok(supplier)
    }

    /// 事务内确认供应商存在且属于项目
    pub fn require_tx(
        tx: &Transaction,
        project_id: i64,
        supplier_id: i64,
    ) -> RepositoryResult<Supplier> {
        Self::find_by_id_tx(tx, supplier_id)?
            .filter(|s| s.project_id == project_id)
            .ok_or_else(|| not_found(supplier_id))
    }
}

fn not_found(supplier_id: i64) -> RepositoryError {
    RepositoryError::NotFound {
        entity: "Supplier".to_string(),
        id: supplier_id.to_string(),
    }
}

fn map_supplier(row: &Row) -> rusqlite::Result<Supplier> {
    Ok(Supplier {
        supplier_id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        short_name: row.get(3)?,
        created_at: ts_col(row, 4)?,
    })
}
