// ==========================================
// 需求协调驾驶舱 - 协调驾驶舱 API
// ==========================================
// 职责: 迭代聚合视图、决策保存与查询、决策历史
// 约束: 当前迭代作为显式参数传入，API 不持有"当前迭代"状态
// 一致性: 视图基于单事务读取的快照构建
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::decision::{Decision, DecisionHistoryEntry};
use crate::domain::project::Iteration;
use crate::domain::requirement::MasterRequirement;
use crate::domain::snapshot::IterationSnapshot;
use crate::domain::types::DecisionStatus;
use crate::engine::view_builder::{AggregationView, ViewBuilder, ViewFilter, ViewSort};
use crate::repository::{
    DecisionRepository, IterationRepository, RequirementRepository, SnapshotRepository,
};
use std::sync::Arc;
use tracing::{info, instrument};

pub struct CockpitApi {
    snapshot_repo: Arc<SnapshotRepository>,
    iteration_repo: Arc<IterationRepository>,
    requirement_repo: Arc<RequirementRepository>,
    decision_repo: Arc<DecisionRepository>,
    config: Arc<ConfigManager>,
    builder: ViewBuilder,
}

impl CockpitApi {
    pub fn new(
        snapshot_repo: Arc<SnapshotRepository>,
        iteration_repo: Arc<IterationRepository>,
        requirement_repo: Arc<RequirementRepository>,
        decision_repo: Arc<DecisionRepository>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            snapshot_repo,
            iteration_repo,
            requirement_repo,
            decision_repo,
            config,
            builder: ViewBuilder::new(),
        }
    }

    // ==========================================
    // 聚合视图
    // ==========================================

    /// 读取迭代快照（单事务）
    pub fn load_snapshot(&self, project_id: i64, iteration_id: &str) -> ApiResult<IterationSnapshot> {
        let iteration = self.require_iteration(project_id, iteration_id)?;
        Ok(self.snapshot_repo.load(project_id, iteration.iteration_key)?)
    }

    /// 构建聚合视图
    ///
    /// # 参数
    /// - project_id / iteration_id: 显式的项目与迭代
    /// - filter: 过滤条件（AND 组合）
    /// - sort: 排序方式（默认主需求导入顺序）
    ///
    /// # 返回
    /// 每条主需求一行；每个可见供应商一个单元格（无反馈时为空单元格）
    #[instrument(skip(self, filter), fields(project_id = project_id, iteration_id = %iteration_id))]
    pub fn build_view(
        &self,
        project_id: i64,
        iteration_id: &str,
        filter: &ViewFilter,
        sort: ViewSort,
    ) -> ApiResult<AggregationView> {
        let snapshot = self.load_snapshot(project_id, iteration_id)?;
        let view = self.builder.build(&snapshot, filter, sort);
        info!(rows = view.requirements.len(), total = view.total_rows, "聚合视图已构建");
        Ok(view)
    }

    // ==========================================
    // 决策
    // ==========================================

    /// 保存决策（同一需求+迭代重复保存即原地更新）
    ///
    /// # 返回
    /// - Err(InvalidInput): 决策人为空或备注超长
    /// - Err(NotFound): 需求或迭代不存在
    pub fn save_decision(
        &self,
        project_id: i64,
        iteration_id: &str,
        reqif_id: &str,
        status: DecisionStatus,
        note: &str,
        author: &str,
    ) -> ApiResult<Decision> {
        let author = author.trim();
        if author.is_empty() {
            return Err(ApiError::InvalidInput("决策人不能为空".to_string()));
        }
        let max_note = self
            .config
            .get_max_note_length()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        if note.chars().count() > max_note {
            return Err(ApiError::InvalidInput(format!(
                "决策备注超过 {} 个字符",
                max_note
            )));
        }

        let iteration = self.require_iteration(project_id, iteration_id)?;
        let requirement = self.require_requirement(project_id, reqif_id)?;

        let decision = self.decision_repo.upsert(
            requirement.requirement_id,
            iteration.iteration_key,
            status,
            note,
            author,
        )?;
        info!(
            reqif_id = %reqif_id,
            iteration_id = %iteration_id,
            status = %decision.status,
            "决策已保存"
        );
        Ok(decision)
    }

    /// 当前决策
    pub fn get_decision(
        &self,
        project_id: i64,
        iteration_id: &str,
        reqif_id: &str,
    ) -> ApiResult<Option<Decision>> {
        let iteration = self.require_iteration(project_id, iteration_id)?;
        let requirement = self.require_requirement(project_id, reqif_id)?;
        Ok(self
            .decision_repo
            .find_current(requirement.requirement_id, iteration.iteration_key)?)
    }

    /// 决策历史（跨迭代，迭代创建顺序）
    pub fn decision_history(
        &self,
        project_id: i64,
        reqif_id: &str,
    ) -> ApiResult<Vec<DecisionHistoryEntry>> {
        let requirement = self.require_requirement(project_id, reqif_id)?;
        Ok(self.decision_repo.history(requirement.requirement_id)?)
    }

    fn require_iteration(&self, project_id: i64, iteration_id: &str) -> ApiResult<Iteration> {
        self.iteration_repo
            .find_by_id(project_id, iteration_id)?
            .ok_or_else(|| ApiError::NotFound(format!("迭代 {}", iteration_id)))
    }

    fn require_requirement(&self, project_id: i64, reqif_id: &str) -> ApiResult<MasterRequirement> {
        self.requirement_repo
            .find_by_reqif_id(project_id, reqif_id)?
            .ok_or_else(|| ApiError::NotFound(format!("主需求 {}", reqif_id)))
    }
}
