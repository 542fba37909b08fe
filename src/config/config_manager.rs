// ==========================================
// 需求协调驾驶舱 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: 项目库 config_kv 表 (scope_id='global')
// ==========================================

use crate::config::import_config_trait::{
    ConfigResult, ImportConfigReader, DEFAULT_COMMENT_ATTRIBUTE, DEFAULT_FALLBACK_ID_ATTRIBUTE,
    DEFAULT_STATUS_ATTRIBUTE, DEFAULT_TEXT_ATTRIBUTE,
};
use crate::domain::decision::DEFAULT_MAX_NOTE_LENGTH;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// 供应商名称默认最大长度
pub const DEFAULT_MAX_SUPPLIER_NAME_LENGTH: usize = 100;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从项目库共享连接创建
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock_conn(&self) -> ConfigResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| format!("锁获取失败: {}", e).into())
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.lock_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 读取配置值，缺失或为空白时返回默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取数值配置，解析失败时告警并使用默认值
    fn get_usize_or_default(&self, key: &str, default: usize) -> ConfigResult<usize> {
        let raw = self.get_config_or_default(key, &default.to_string())?;
        Ok(raw.trim().parse::<usize>().unwrap_or_else(|_| {
            warn!(config_key = key, value = %raw, default = default, "配置值无法解析，使用默认值");
            default
        }))
    }

    /// 写入 global scope 配置（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 全部 global 配置（按键排序）
    pub fn list_global_config(&self) -> ConfigResult<BTreeMap<String, String>> {
        let conn = self.lock_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut config = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config.insert(key, value);
        }
        Ok(config)
    }

    // ===== 校验边界 =====

    /// 决策备注最大长度（字符）
    pub fn get_max_note_length(&self) -> ConfigResult<usize> {
        self.get_usize_or_default(config_keys::MAX_NOTE_LENGTH, DEFAULT_MAX_NOTE_LENGTH)
    }

    /// 供应商名称最大长度（字符）
    pub fn get_max_supplier_name_length(&self) -> ConfigResult<usize> {
        self.get_usize_or_default(
            config_keys::MAX_SUPPLIER_NAME_LENGTH,
            DEFAULT_MAX_SUPPLIER_NAME_LENGTH,
        )
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_text_attribute(&self) -> ConfigResult<String> {
        self.get_config_or_default(config_keys::TEXT_ATTRIBUTE, DEFAULT_TEXT_ATTRIBUTE)
    }

    async fn get_status_attribute(&self) -> ConfigResult<String> {
        self.get_config_or_default(config_keys::STATUS_ATTRIBUTE, DEFAULT_STATUS_ATTRIBUTE)
    }

    async fn get_comment_attribute(&self) -> ConfigResult<String> {
        self.get_config_or_default(config_keys::COMMENT_ATTRIBUTE, DEFAULT_COMMENT_ATTRIBUTE)
    }

    async fn get_fallback_id_attribute(&self) -> ConfigResult<String> {
        self.get_config_or_default(
            config_keys::FALLBACK_ID_ATTRIBUTE,
            DEFAULT_FALLBACK_ID_ATTRIBUTE,
        )
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 导入属性名
    pub const TEXT_ATTRIBUTE: &str = "text_attribute";
    pub const STATUS_ATTRIBUTE: &str = "status_attribute";
    pub const COMMENT_ATTRIBUTE: &str = "comment_attribute";
    pub const FALLBACK_ID_ATTRIBUTE: &str = "fallback_id_attribute";

    // 校验边界
    pub const MAX_NOTE_LENGTH: &str = "max_note_length";
    pub const MAX_SUPPLIER_NAME_LENGTH: &str = "max_supplier_name_length";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory_store;

    #[tokio::test]
    async fn test_defaults_when_unset() {
        let config = ConfigManager::from_connection(open_in_memory_store().unwrap());
        let settings = config.get_import_settings().await.unwrap();
        assert_eq!(settings.status_attribute, "ReqIF-WF.SupplierStatus");
        assert_eq!(settings.text_attribute, "ReqIF.Text");
        assert_eq!(config.get_max_note_length().unwrap(), 2000);
    }

    #[tokio::test]
    async fn test_overrides_and_invalid_numbers() {
        let config = ConfigManager::from_connection(open_in_memory_store().unwrap());
        config
            .set_global_config_value(config_keys::STATUS_ATTRIBUTE, "Supplier Status")
            .unwrap();
        config.set_global_config_value(config_keys::MAX_NOTE_LENGTH, "abc").unwrap();
        config
            .set_global_config_value(config_keys::MAX_SUPPLIER_NAME_LENGTH, "40")
            .unwrap();

        assert_eq!(config.get_status_attribute().await.unwrap(), "Supplier Status");
        assert_eq!(config.get_max_note_length().unwrap(), DEFAULT_MAX_NOTE_LENGTH);
        assert_eq!(config.get_max_supplier_name_length().unwrap(), 40);
        assert_eq!(config.list_global_config().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_blank_value_falls_back() {
        let config = ConfigManager::from_connection(open_in_memory_store().unwrap());
        config.set_global_config_value(config_keys::COMMENT_ATTRIBUTE, "  ").unwrap();
        assert_eq!(
            config.get_comment_attribute().await.unwrap(),
            DEFAULT_COMMENT_ATTRIBUTE
        );
    }
}
