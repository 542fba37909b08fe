// ==========================================
// 需求协调驾驶舱 - 领域层
// ==========================================
// 职责: 实体与封闭类型定义，不含存储与业务规则
// ==========================================

pub mod decision;
pub mod import;
pub mod mapping_rule;
pub mod project;
pub mod requirement;
pub mod snapshot;
pub mod types;

// 重导出核心类型
pub use decision::{Decision, DecisionHistoryEntry, DEFAULT_MAX_NOTE_LENGTH};
pub use import::{
    ImportIssue, ImportLogEntry, ImportSummary, IssueKind, OrphanRecord, ParseStats,
};
pub use mapping_rule::{normalize_status_key, StatusMappingRule};
pub use project::{Iteration, Project, Supplier};
pub use requirement::{
    merge_attribute_bag, AttributeBag, AttributeValue, MasterRequirement, SupplierFeedback,
};
pub use snapshot::{IterationSnapshot, IterationTimelineEntry};
pub use types::{
    CanonicalStatus, DecisionStatus, HarmonizeStage, IdStrategy, ImportKind, MatchStrategy,
};
