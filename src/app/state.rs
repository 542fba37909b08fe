// ==========================================
// 需求协调驾驶舱 - 项目状态
// ==========================================
// 职责: 打开一个项目库，组装仓储与 API 实例
// 一个项目库文件对应一个项目；所有仓储共享同一连接
// ==========================================

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{
    ApiError, ApiResult, CockpitApi, DashboardApi, ExportApi, ImportApi, ProjectApi, RuleApi,
};
use crate::config::ConfigManager;
use crate::db::{open_in_memory_store, open_project_store};
use crate::domain::project::Project;
use crate::importer::{ReqifImporter, RequirementImporter};
use crate::repository::{
    DecisionRepository, ImportLogRepository, IterationRepository,
    MappingRuleRepository, ProjectRepository, RequirementRepository, SnapshotRepository,
    SupplierRepository,
};

/// 项目状态
///
/// 持有项目库连接与全部 API 实例
pub struct ProjectState {
    /// 共享连接
    pub store: Arc<Mutex<Connection>>,

    /// 当前项目
    pub project: Project,

    pub config: Arc<ConfigManager>,

    /// 项目/供应商/迭代管理
    pub project_api: Arc<ProjectApi>,

    /// 主需求与供应商导入
    pub import_api: Arc<ImportApi>,

    /// 聚合视图与决策
    pub cockpit_api: Arc<CockpitApi>,

    /// 状态映射规则
    pub rule_api: Arc<RuleApi>,

    pub dashboard_api: Arc<DashboardApi>,

    pub export_api: Arc<ExportApi>,
}

impl ProjectState {
    /// 打开（或初始化）项目库文件
    ///
    /// # 参数
    /// - db_path: 项目库路径
    /// - project_name: 库内尚无项目时使用的项目名称
    pub fn open(db_path: &Path, project_name: &str) -> ApiResult<Self> {
        tracing::info!(db_path = %db_path.display(), "打开项目库");
        let store = open_project_store(&db_path.to_string_lossy()).map_err(|e| {
            ApiError::DatabaseConnectionError(format!("无法打开项目库 {}: {}", db_path.display(), e))
        })?;
        Self::assemble(store, project_name, None)
    }

    /// 初始化新项目库文件（带项目描述）
    pub fn init(db_path: &Path, project_name: &str, description: Option<&str>) -> ApiResult<Self> {
        let store = open_project_store(&db_path.to_string_lossy()).map_err(|e| {
            ApiError::DatabaseConnectionError(format!("无法打开项目库 {}: {}", db_path.display(), e))
        })?;
        Self::assemble(store, project_name, description)
    }

    /// 内存项目库（测试用）
    pub fn in_memory(project_name: &str) -> ApiResult<Self> {
        let store = open_in_memory_store()
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        Self::from_store(store, project_name)
    }

    /// 基于已打开的连接组装
    pub fn from_store(store: Arc<Mutex<Connection>>, project_name: &str) -> ApiResult<Self> {
        Self::assemble(store, project_name, None)
    }

    fn assemble(
        store: Arc<Mutex<Connection>>,
        project_name: &str,
        description: Option<&str>,
    ) -> ApiResult<Self> {
        // ==========================================
        // Repository 层
        // ==========================================
        let project_repo = Arc::new(ProjectRepository::new(store.clone()));
        let supplier_repo = Arc::new(SupplierRepository::new(store.clone()));
        let iteration_repo = Arc::new(IterationRepository::new(store.clone()));
        let requirement_repo = Arc::new(RequirementRepository::new(store.clone()));
        let decision_repo = Arc::new(DecisionRepository::new(store.clone()));
        let rule_repo = Arc::new(MappingRuleRepository::new(store.clone()));
        let import_log_repo = Arc::new(ImportLogRepository::new(store.clone()));
        let snapshot_repo = Arc::new(SnapshotRepository::new(store.clone()));

        let project = match project_repo.first()? {
            Some(project) => project,
            None => {
                Project::validate_name(project_name).map_err(ApiError::InvalidInput)?;
                let description = description.map(str::trim).filter(|d| !d.is_empty());
                project_repo.insert(project_name.trim(), description)?
            }
        };

        let config = Arc::new(ConfigManager::from_connection(store.clone()));

        // ==========================================
        // API 层
        // ==========================================
        let importer: Arc<dyn RequirementImporter> =
            Arc::new(ReqifImporter::new(store.clone(), config.clone()));

        let project_api = Arc::new(ProjectApi::new(
            project_repo,
            supplier_repo.clone(),
            iteration_repo.clone(),
            config.clone(),
        ));
        let import_api = Arc::new(ImportApi::new(importer, import_log_repo));
        let cockpit_api = Arc::new(CockpitApi::new(
            snapshot_repo.clone(),
            iteration_repo.clone(),
            requirement_repo,
            decision_repo,
            config.clone(),
        ));
        let rule_api = Arc::new(RuleApi::new(
            store.clone(),
            rule_repo,
            supplier_repo,
            iteration_repo.clone(),
        ));
        let dashboard_api = Arc::new(DashboardApi::new(snapshot_repo, iteration_repo));
        let export_api = Arc::new(ExportApi::new(cockpit_api.clone()));

        tracing::info!(project = %project.name, project_id = project.project_id, "项目状态已就绪");

        Ok(Self {
            store,
            project,
            config,
            project_api,
            import_api,
            cockpit_api,
            rule_api,
            dashboard_api,
            export_api,
        })
    }

    pub fn project_id(&self) -> i64 {
        self.project.project_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_state_creates_project_once() {
        let state = ProjectState::in_memory("Brake System").unwrap();
        assert_eq!(state.project.name, "Brake System");

        // 同一连接再次组装沿用已有项目
        let again = ProjectState::from_store(state.store.clone(), "Other").unwrap();
        assert_eq!(again.project_id(), state.project_id());
        assert_eq!(again.project.name, "Brake System");
    }

    #[test]
    fn test_invalid_project_name_rejected() {
        let err = ProjectState::in_memory("  ").err().unwrap();
        assert_eq!(err.code(), "INVALID_INPUT");
    }
}
