// ==========================================
// 需求协调驾驶舱 - 核心库
// ==========================================
// 职责: 主需求导入、多供应商反馈协调、冲突识别与决策记录
// 技术栈: Rust + SQLite（每个项目一个库文件）
// 系统定位: 决策支持（最终决策由人工给出）
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 映射/冲突/视图/指标
pub mod engine;

// 导入层 - 交换文档
pub mod importer;

// 配置层 - 项目配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 项目库管理与组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CanonicalStatus, DecisionStatus, HarmonizeStage, ImportKind};

// 领域实体
pub use domain::{
    Decision, ImportSummary, Iteration, MasterRequirement, Project, Supplier, SupplierFeedback,
};

// 引擎
pub use engine::{ConflictDetector, StatusHarmonizer, ViewBuilder, ViewFilter, ViewSort};

// API
pub use api::{ApiError, ApiResult, CockpitApi, ImportApi, ProjectApi};

// 应用
pub use app::{ProjectManager, ProjectState};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "需求协调驾驶舱";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
