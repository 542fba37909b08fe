// ==========================================
// 需求协调驾驶舱 - 配置层
// ==========================================
// 职责: 项目级配置管理
// 存储: 项目库 config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager, DEFAULT_MAX_SUPPLIER_NAME_LENGTH};
pub use import_config_trait::{ConfigResult, ImportConfigReader, ImportSettings, StaticImportConfig};
