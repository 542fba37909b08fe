// ==========================================
// 需求协调驾驶舱 - 项目库管理
// ==========================================
// 职责: 在根目录下创建/打开/删除/列出项目库文件
// 约定: 项目库文件名 `<项目名>.sqlite`；创建时不覆盖已有文件
// ==========================================

use std::fs;
use std::path::{Path, PathBuf};

use crate::api::{ApiError, ApiResult};
use crate::app::state::ProjectState;
use crate::domain::project::Project;

/// 项目库根目录环境变量
pub const HOME_ENV_VAR: &str = "REQ_COCKPIT_HOME";

/// 项目库文件扩展名
pub const STORE_EXTENSION: &str = "sqlite";

/// 项目库管理器
pub struct ProjectManager {
    root: PathBuf,
}

impl ProjectManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 默认根目录
    ///
    /// 优先 `REQ_COCKPIT_HOME`，否则用户数据目录下的 `req-cockpit`，再否则当前目录
    pub fn from_env() -> Self {
        if let Ok(path) = std::env::var(HOME_ENV_VAR) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Self::new(trimmed);
            }
        }
        let root = dirs::data_dir()
            .map(|dir| dir.join("req-cockpit"))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 项目库文件路径（名称先经校验，路径始终位于根目录内）
    ///
    /// # 返回
    /// - Err(InvalidInput): 项目名称非法
    pub fn store_path(&self, name: &str) -> ApiResult<PathBuf> {
        Project::validate_name(name).map_err(ApiError::InvalidInput)?;
        Ok(self
            .root
            .join(format!("{}.{}", name.trim(), STORE_EXTENSION)))
    }

    /// 创建项目库
    ///
    /// # 返回
    /// - Err(InvalidInput): 项目名称非法
    /// - Err(AlreadyExists): 同名项目库已存在
    pub fn create(&self, name: &str, description: Option<&str>) -> ApiResult<ProjectState> {
        let path = self.store_path(name)?;
        if path.exists() {
            return Err(ApiError::AlreadyExists(format!(
                "项目库 {} 已存在",
                path.display()
            )));
        }
        fs::create_dir_all(&self.root).map_err(|e| {
            ApiError::InternalError(format!("无法创建目录 {}: {}", self.root.display(), e))
        })?;

        let state = ProjectState::init(&path, name, description)?;
        tracing::info!(project = %name.trim(), path = %path.display(), "项目库已创建");
        Ok(state)
    }

    /// 打开已有项目库
    ///
    /// # 返回
    /// - Err(InvalidInput): 项目名称非法
    /// - Err(NotFound): 项目库不存在
    pub fn open(&self, name: &str) -> ApiResult<ProjectState> {
        let path = self.store_path(name)?;
        if !path.is_file() {
            return Err(ApiError::NotFound(format!("项目库 {}", path.display())));
        }
        ProjectState::open(&path, name)
    }

    /// 删除项目库文件（不可恢复）
    ///
    /// # 返回
    /// - Err(InvalidInput): 项目名称非法（含路径分隔符、以 '.' 开头等）
    /// - Err(NotFound): 项目库不存在
    pub fn delete(&self, name: &str) -> ApiResult<()> {
        let path = self.store_path(name)?;
        if !path.is_file() {
            return Err(ApiError::NotFound(format!("项目库 {}", path.display())));
        }
        fs::remove_file(&path).map_err(|e| {
            ApiError::InternalError(format!("无法删除 {}: {}", path.display(), e))
        })?;
        tracing::warn!(project = %name.trim(), "项目库已删除");
        Ok(())
    }

    /// 列出根目录下的项目名称（字典序）
    pub fn list(&self) -> ApiResult<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.root).map_err(|e| {
            ApiError::InternalError(format!("无法读取目录 {}: {}", self.root.display(), e))
        })?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path.extension().and_then(|e| e.to_str()) == Some(STORE_EXTENSION)
            })
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
            })
            .collect();
        names.sort();
        Ok(names)
    }
}
