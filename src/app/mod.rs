// ==========================================
// 需求协调驾驶舱 - 应用层
// ==========================================
// 职责: 项目库管理与 API 组装，供命令行与宿主应用使用
// ==========================================

pub mod project_manager;
pub mod state;

// 重导出
pub use project_manager::{ProjectManager, HOME_ENV_VAR};
pub use state::ProjectState;
