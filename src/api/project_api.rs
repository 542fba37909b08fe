// ==========================================
// 需求协调驾驶舱 - 项目结构 API
// ==========================================
// 职责: 供应商与迭代的创建、查询、关闭
// 约束: 迭代标识一经创建永久不变；供应商名称不可修改，仅简称可改
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::project::{Iteration, Project, Supplier};
use crate::repository::{
    IterationRepository, ProjectRepository, RepositoryError, SupplierRepository,
};
use std::sync::Arc;
use tracing::info;

pub struct ProjectApi {
    project_repo: Arc<ProjectRepository>,
    supplier_repo: Arc<SupplierRepository>,
    iteration_repo: Arc<IterationRepository>,
    config: Arc<ConfigManager>,
}

impl ProjectApi {
    pub fn new(
        project_repo: Arc<ProjectRepository>,
        supplier_repo: Arc<SupplierRepository>,
        iteration_repo: Arc<IterationRepository>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            project_repo,
            supplier_repo,
            iteration_repo,
            config,
        }
    }

    pub fn get_project(&self, project_id: i64) -> ApiResult<Project> {
        self.project_repo
            .find_by_id(project_id)?
            .ok_or_else(|| ApiError::NotFound(format!("项目(id={})不存在", project_id)))
    }

    // ==========================================
    // 供应商
    // ==========================================

    /// 创建供应商
    ///
    /// # 参数
    /// - name: 全称（项目内唯一，创建后不可修改）
    /// - short_name: 展示简称（可选）
    ///
    /// # 返回
    /// - Err(InvalidInput): 名称为空或超长
    /// - Err(AlreadyExists): 同名供应商已存在
    pub fn create_supplier(
        &self,
        project_id: i64,
        name: &str,
        short_name: Option<&str>,
    ) -> ApiResult<Supplier> {
        let max_len = self
            .config
            .get_max_supplier_name_length()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        Supplier::validate_name(name, max_len).map_err(ApiError::InvalidInput)?;

        let name = name.trim();
        let short_name = short_name.map(str::trim).filter(|s| !s.is_empty());
        let supplier = self
            .supplier_repo
            .insert(project_id, name, short_name)
            .map_err(|e| match e {
                RepositoryError::UniqueConstraintViolation(_) => {
                    ApiError::AlreadyExists(format!("供应商 {}", name))
                }
                other => other.into(),
            })?;

        info!(supplier_id = supplier.supplier_id, name = %supplier.name, "供应商已创建");
        Ok(supplier)
    }

    /// 修改供应商简称（None 或空白即清除）
    pub fn update_supplier_short_name(
        &self,
        supplier_id: i64,
        short_name: Option<&str>,
    ) -> ApiResult<Supplier> {
        let short_name = short_name.map(str::trim).filter(|s| !s.is_empty());
        Ok(self.supplier_repo.update_short_name(supplier_id, short_name)?)
    }

    pub fn list_suppliers(&self, project_id: i64) -> ApiResult<Vec<Supplier>> {
        Ok(self.supplier_repo.list_by_project(project_id)?)
    }

    /// 按名称查找供应商
    pub fn get_supplier_by_name(&self, project_id: i64, name: &str) -> ApiResult<Supplier> {
        self.supplier_repo
            .find_by_name(project_id, name.trim())?
            .ok_or_else(|| ApiError::NotFound(format!("供应商 {}", name)))
    }

    // ==========================================
    // 迭代
    // ==========================================

    /// 创建迭代
    ///
    /// # 返回
    /// - Err(InvalidInput): 标识不合法
    /// - Err(AlreadyExists): 标识已存在（不修改任何行）
    pub fn create_iteration(
        &self,
        project_id: i64,
        iteration_id: &str,
        description: Option<&str>,
    ) -> ApiResult<Iteration> {
        Iteration::validate_id(iteration_id).map_err(ApiError::InvalidInput)?;

        let iteration = self
            .iteration_repo
            .insert(project_id, iteration_id, description)
            .map_err(|e| match e {
                RepositoryError::UniqueConstraintViolation(_) => {
                    ApiError::AlreadyExists(format!("迭代 {}", iteration_id))
                }
                other => other.into(),
            })?;

        info!(iteration_id = %iteration.iteration_id, "迭代已创建");
        Ok(iteration)
    }

    /// 项目内全部迭代（创建顺序）
    pub fn list_iterations(&self, project_id: i64) -> ApiResult<Vec<Iteration>> {
        Ok(self.iteration_repo.list_by_project(project_id)?)
    }

    pub fn get_iteration(&self, project_id: i64, iteration_id: &str) -> ApiResult<Iteration> {
        self.iteration_repo
            .find_by_id(project_id, iteration_id)?
            .ok_or_else(|| ApiError::NotFound(format!("迭代 {}", iteration_id)))
    }

    /// 关闭迭代导入（决策仍可保存）
    pub fn close_iteration(&self, project_id: i64, iteration_id: &str) -> ApiResult<Iteration> {
        let iteration = self.get_iteration(project_id, iteration_id)?;
        if iteration.is_closed() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "迭代 {} 已关闭",
                iteration_id
            )));
        }

        let closed = self.iteration_repo.close(iteration.iteration_key)?;
        info!(iteration_id = %closed.iteration_id, "迭代已关闭导入");
        Ok(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config_keys;
    use crate::db::open_in_memory_store;

    fn setup() -> (ProjectApi, i64) {
        let store = open_in_memory_store().unwrap();
        let project_repo = Arc::new(ProjectRepository::new(store.clone()));
        let project = project_repo.insert("Brake", None).unwrap();
        let api = ProjectApi::new(
            project_repo,
            Arc::new(SupplierRepository::new(store.clone())),
            Arc::new(IterationRepository::new(store.clone())),
            Arc::new(ConfigManager::from_connection(store)),
        );
        (api, project.project_id)
    }

    #[test]
    fn test_supplier_validation_and_uniqueness() {
        let (api, pid) = setup();
        let acme = api.create_supplier(pid, "  Acme GmbH ", Some(" ")).unwrap();
        assert_eq!(acme.name, "Acme GmbH");
        assert_eq!(acme.short_name, None);

        assert_eq!(api.create_supplier(pid, "", None).unwrap_err().code(), "INVALID_INPUT");
        assert_eq!(
            api.create_supplier(pid, "Acme GmbH", None).unwrap_err().code(),
            "ALREADY_EXISTS"
        );

        let renamed = api.update_supplier_short_name(acme.supplier_id, Some("ACM")).unwrap();
        assert_eq!(renamed.display_name(), "ACM");
    }

    #[test]
    fn test_supplier_name_length_from_config() {
        let (api, pid) = setup();
        api.config
            .set_global_config_value(config_keys::MAX_SUPPLIER_NAME_LENGTH, "5")
            .unwrap();
        assert!(api.create_supplier(pid, "Acme", None).is_ok());
        assert_eq!(
            api.create_supplier(pid, "Acme Corp", None).unwrap_err().code(),
            "INVALID_INPUT"
        );
    }

    #[test]
    fn test_duplicate_iteration_rejected_without_mutation() {
        let (api, pid) = setup();
        let first = api.create_iteration(pid, "I-001", Some("kick-off")).unwrap();

        let err = api.create_iteration(pid, "I-001", Some("other")).unwrap_err();
        assert_eq!(err.code(), "ALREADY_EXISTS");

        let all = api.list_iterations(pid).unwrap();
        assert_eq!(all, vec![first]);
    }

    #[test]
    fn test_invalid_iteration_id() {
        let (api, pid) = setup();
        assert_eq!(api.create_iteration(pid, "I 001", None).unwrap_err().code(), "INVALID_INPUT");
        assert_eq!(api.create_iteration(pid, "", None).unwrap_err().code(), "INVALID_INPUT");
    }

    #[test]
    fn test_close_iteration_once() {
        let (api, pid) = setup();
        api.create_iteration(pid, "I-001", None).unwrap();

        let closed = api.close_iteration(pid, "I-001").unwrap();
        assert!(closed.is_closed());
        assert_eq!(
            api.close_iteration(pid, "I-001").unwrap_err().code(),
            "BUSINESS_RULE_VIOLATION"
        );
        assert_eq!(api.close_iteration(pid, "I-404").unwrap_err().code(), "NOT_FOUND");
    }
}
