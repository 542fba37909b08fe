// ==========================================
// 需求协调驾驶舱 - 驾驶舱指标引擎
// ==========================================
// 输入: IterationSnapshot
// 输出: 状态分布、冲突率、供应商响应/接受率、决策汇总
// 红线: 冲突数由冲突判定引擎现算，不读取任何落库标志
// ==========================================

use crate::domain::snapshot::IterationSnapshot;
use crate::domain::types::{CanonicalStatus, DecisionStatus};
use crate::engine::view_builder::{ViewBuilder, ViewFilter, ViewSort};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::instrument;

/// 供应商指标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierMetrics {
    pub supplier_id: i64,
    pub supplier_name: String,
    /// 有反馈的需求数
    pub responded: usize,
    /// 响应率（%）= responded / 需求总数
    pub response_rate: f64,
    pub accepted: usize,
    /// 接受率（%）= accepted / responded
    pub acceptance_rate: f64,
    /// 映射为 Unknown 的反馈数
    pub unmapped: usize,
}

/// 决策汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionSummary {
    pub total: usize,
    pub by_status: BTreeMap<DecisionStatus, usize>,
    /// 决策覆盖率（%）= total / 需求总数
    pub decision_rate: f64,
    /// 冲突但尚无决策的需求数
    pub open_conflicts: usize,
}

/// 迭代驾驶舱指标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationDashboard {
    pub iteration_id: String,
    pub total_requirements: usize,
    pub total_feedback: usize,
    pub status_distribution: BTreeMap<CanonicalStatus, usize>,
    pub conflict_count: usize,
    /// 冲突率（%）
    pub conflict_rate: f64,
    /// 按接受率降序
    pub suppliers: Vec<SupplierMetrics>,
    pub decisions: DecisionSummary,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardEngine {
    builder: ViewBuilder,
}

impl DashboardEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 计算迭代指标
    #[instrument(skip_all, fields(iteration_id = %snapshot.iteration.iteration_id))]
    pub fn summarize(&self, snapshot: &IterationSnapshot) -> IterationDashboard {
        let total_requirements = snapshot.requirements.len();

        // === 步骤 1: 状态分布（四个规范状态全部列出） ===
        let mut status_distribution: BTreeMap<CanonicalStatus, usize> =
            CanonicalStatus::ALL.iter().map(|s| (*s, 0)).collect();
        for fb in &snapshot.feedback {
            *status_distribution.entry(fb.canonical_status).or_insert(0) += 1;
        }

        // === 步骤 2: 冲突 ===
        let view = self
            .builder
            .build(snapshot, &ViewFilter::all(), ViewSort::InsertionOrder);
        let conflicted: HashSet<i64> = view
            .requirements
            .iter()
            .filter(|r| r.is_conflict)
            .map(|r| r.id)
            .collect();

        // === 步骤 3: 供应商指标 ===
        let mut suppliers: Vec<SupplierMetrics> = snapshot
            .suppliers
            .iter()
            .map(|supplier| {
                let rows: Vec<_> = snapshot
                    .feedback
                    .iter()
                    .filter(|fb| fb.supplier_id == supplier.supplier_id)
                    .collect();
                let responded = rows.len();
                let accepted = rows
                    .iter()
                    .filter(|fb| fb.canonical_status == CanonicalStatus::Accepted)
                    .count();
                SupplierMetrics {
                    supplier_id: supplier.supplier_id,
                    supplier_name: supplier.name.clone(),
                    responded,
                    response_rate: percentage(responded, total_requirements),
                    accepted,
                    acceptance_rate: percentage(accepted, responded),
                    unmapped: rows
                        .iter()
                        .filter(|fb| fb.canonical_status == CanonicalStatus::Unknown)
                        .count(),
                }
            })
            .collect();
        suppliers.sort_by(|a, b| b.acceptance_rate.total_cmp(&a.acceptance_rate));

        // === 步骤 4: 决策汇总 ===
        let mut by_status = BTreeMap::new();
        for d in &snapshot.decisions {
            *by_status.entry(d.status).or_insert(0) += 1;
        }
        let decided: HashSet<i64> = snapshot.decisions.iter().map(|d| d.requirement_id).collect();
        let decisions = DecisionSummary {
            total: snapshot.decisions.len(),
            by_status,
            decision_rate: percentage(snapshot.decisions.len(), total_requirements),
            open_conflicts: conflicted.difference(&decided).count(),
        };

        IterationDashboard {
            iteration_id: snapshot.iteration.iteration_id.clone(),
            total_requirements,
            total_feedback: snapshot.feedback.len(),
            status_distribution,
            conflict_count: conflicted.len(),
            conflict_rate: percentage(conflicted.len(), total_requirements),
            suppliers,
            decisions,
        }
    }
}

/// 百分比，保留两位小数；分母为 0 时为 0
fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    ((part as f64 / whole as f64) * 10_000.0).round() / 100.0
}
