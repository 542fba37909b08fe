// ==========================================
// 需求协调驾驶舱 - 指标 API
// ==========================================
// 职责: 迭代指标汇总、项目迭代时间线
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::snapshot::IterationTimelineEntry;
use crate::engine::dashboard::{DashboardEngine, IterationDashboard};
use crate::repository::{IterationRepository, SnapshotRepository};
use std::sync::Arc;

pub struct DashboardApi {
    snapshot_repo: Arc<SnapshotRepository>,
    iteration_repo: Arc<IterationRepository>,
    engine: DashboardEngine,
}

impl DashboardApi {
    pub fn new(snapshot_repo: Arc<SnapshotRepository>, iteration_repo: Arc<IterationRepository>) -> Self {
        Self {
            snapshot_repo,
            iteration_repo,
            engine: DashboardEngine::new(),
        }
    }

    /// 迭代指标
    ///
    /// # 返回
    /// 状态分布、冲突数/率、供应商响应与接受率、决策汇总
    pub fn iteration_summary(
        &self,
        project_id: i64,
        iteration_id: &str,
    ) -> ApiResult<IterationDashboard> {
        let iteration = self
            .iteration_repo
            .find_by_id(project_id, iteration_id)?
            .ok_or_else(|| ApiError::NotFound(format!("迭代 {}", iteration_id)))?;
        let snapshot = self.snapshot_repo.load(project_id, iteration.iteration_key)?;
        Ok(self.engine.summarize(&snapshot))
    }

    /// 项目迭代时间线（创建顺序）
    pub fn timeline(&self, project_id: i64) -> ApiResult<Vec<IterationTimelineEntry>> {
        Ok(self.snapshot_repo.timeline(project_id)?)
    }
}
