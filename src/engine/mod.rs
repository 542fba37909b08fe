// ==========================================
// 需求协调驾驶舱 - 引擎层
// ==========================================
// 职责: 状态映射、冲突判定、视图聚合、指标计算
// 红线: Engine 不拼 SQL，输入均为已加载的领域数据
// ==========================================

pub mod conflict_detector;
pub mod dashboard;
pub mod status_harmonizer;
pub mod view_builder;

// 重导出核心引擎
pub use conflict_detector::{ConflictDetector, ConflictResult};
pub use dashboard::{DashboardEngine, DecisionSummary, IterationDashboard, SupplierMetrics};
pub use status_harmonizer::{Harmonized, RuleSet, StatusHarmonizer};
pub use view_builder::{
    AggregationView, DecisionCell, FilterTerm, RequirementRow, SupplierCell, ViewBuilder,
    ViewFilter, ViewSort,
};
