// ==========================================
// 需求协调驾驶舱 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口，屏蔽数据库细节
// 约束: 所有查询使用参数化；批量写入由调用方持有事务（*_tx 系列）
// ==========================================

pub mod decision_repo;
pub mod error;
pub mod feedback_repo;
pub mod import_log_repo;
pub mod iteration_repo;
pub mod mapping_rule_repo;
pub mod project_repo;
pub mod requirement_repo;
pub mod row_codec;
pub mod snapshot_repo;
pub mod supplier_repo;

// 重导出核心仓储
pub use decision_repo::DecisionRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use feedback_repo::{FeedbackRepository, FeedbackUpsert, HarmonizeCandidate};
pub use import_log_repo::ImportLogRepository;
pub use iteration_repo::IterationRepository;
pub use mapping_rule_repo::MappingRuleRepository;
pub use project_repo::ProjectRepository;
pub use requirement_repo::{RequirementRepository, RequirementUpsert, UpsertOutcome};
pub use snapshot_repo::SnapshotRepository;
pub use supplier_repo::SupplierRepository;
