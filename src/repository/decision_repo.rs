// ==========================================
// 需求协调驾驶舱 - 决策数据仓储
// ==========================================
// 唯一键: (requirement_id, iteration_key)
// 红线: 同一 (需求, 迭代) 重复保存原地更新；跨迭代历史按迭代顺序保留
// ==========================================

mod core;
mod queries;


pub use core::DecisionRepository;
