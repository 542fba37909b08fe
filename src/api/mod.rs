// ==========================================
// 需求协调驾驶舱 - API 层
// ==========================================
// 职责: 提供业务 API 接口，供命令行与宿主应用调用
// ==========================================

pub mod cockpit_api;
pub mod dashboard_api;
pub mod error;
pub mod export_api;
pub mod import_api;
pub mod project_api;
pub mod rule_api;

// 重导出核心类型
pub use cockpit_api::CockpitApi;
pub use dashboard_api::DashboardApi;
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use export_api::{write_view_csv, ExportApi};
pub use import_api::{ImportApi, DEFAULT_IMPORT_LOG_LIMIT};
pub use project_api::ProjectApi;
pub use rule_api::{ReharmonizeReport, RuleApi};

/// 在阻塞线程池执行同步 API 调用（供异步宿主使用）
pub async fn run_blocking<F, T>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}
