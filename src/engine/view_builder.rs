// ==========================================
// 需求协调驾驶舱 - 聚合视图构建引擎
// ==========================================
// 输入: IterationSnapshot（一致读）+ 过滤条件 + 排序
// 输出: 每需求一行，每供应商一个单元格（无反馈时为空单元格，不缺席）
// 红线:
// - 纯函数，不访问存储
// - 冲突基于全部供应商反馈计算，不受列可见性影响
// - 过滤为 join 之后的纯谓词，多条件 AND
// ==========================================

use crate::domain::decision::Decision;
use crate::domain::requirement::SupplierFeedback;
use crate::domain::snapshot::IterationSnapshot;
use crate::domain::types::{CanonicalStatus, DecisionStatus, HarmonizeStage};
use crate::engine::conflict_detector::ConflictDetector;
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, instrument};

// ==========================================
// 输出结构（camelCase，供展示层直接消费）
// ==========================================

/// 供应商单元格
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierCell {
    /// 规范状态；无反馈时为 None
    pub status: Option<CanonicalStatus>,
    pub raw_status: Option<String>,
    pub comment: Option<String>,
    pub harmonize_stage: Option<HarmonizeStage>,
    pub has_feedback: bool,
}

impl SupplierCell {
    fn from_feedback(feedback: &SupplierFeedback) -> Self {
        Self {
            status: Some(feedback.canonical_status),
            raw_status: feedback.raw_status.clone(),
            comment: feedback.comment.clone(),
            harmonize_stage: Some(feedback.harmonize_stage),
            has_feedback: true,
        }
    }
}

/// 当前决策
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionCell {
    pub status: DecisionStatus,
    pub note: String,
    pub author: String,
    pub decided_at: NaiveDateTime,
}

impl From<&Decision> for DecisionCell {
    fn from(d: &Decision) -> Self {
        Self {
            status: d.status,
            note: d.note.clone(),
            author: d.author.clone(),
            decided_at: d.decided_at,
        }
    }
}

/// 需求行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementRow {
    pub id: i64,
    pub reqif_id: String,
    pub text: String,
    pub type_tag: Option<String>,
    /// 供应商名称 → 单元格（列顺序 = 供应商创建顺序）
    pub suppliers: IndexMap<String, SupplierCell>,
    pub is_conflict: bool,
    pub disagreeing_suppliers: BTreeSet<String>,
    pub decision: Option<DecisionCell>,
}

/// 聚合视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationView {
    pub iteration_id: String,
    /// 可见供应商列
    pub suppliers: Vec<String>,
    pub requirements: Vec<RequirementRow>,
    /// 过滤前的行数
    pub total_rows: usize,
}

// ==========================================
// 过滤条件
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterTerm {
    /// 标识或正文包含（大小写不敏感）
    Text(String),
    /// 任一可见供应商的规范状态等于该值
    Status(CanonicalStatus),
    /// 仅冲突行
    ConflictsOnly,
}

impl FilterTerm {
    fn matches(&self, row: &RequirementRow) -> bool {
        match self {
            FilterTerm::Text(needle) => {
                let needle = needle.trim().to_lowercase();
                needle.is_empty()
                    || row.reqif_id.to_lowercase().contains(&needle)
                    || row.text.to_lowercase().contains(&needle)
            }
            FilterTerm::Status(status) => row
                .suppliers
                .values()
                .any(|cell| cell.status == Some(*status)),
            FilterTerm::ConflictsOnly => row.is_conflict,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewFilter {
    pub terms: Vec<FilterTerm>,
    /// 可见供应商子集（None = 全部可见）
    pub visible_suppliers: Option<Vec<String>>,
}

impl ViewFilter {
    /// 无条件过滤
    pub fn all() -> Self {
        Self::default()
    }

    /// 追加一个 AND 条件
    pub fn and(mut self, term: FilterTerm) -> Self {
        self.terms.push(term);
        self
    }

    /// 组合两个过滤条件（条件取并集，可见供应商取交集）
    pub fn and_filter(mut self, other: ViewFilter) -> Self {
        self.terms.extend(other.terms);
        self.visible_suppliers = match (self.visible_suppliers, other.visible_suppliers) {
            (Some(a), Some(b)) => Some(a.into_iter().filter(|s| b.contains(s)).collect()),
            (a, None) => a,
            (None, b) => b,
        };
        self
    }

    pub fn with_visible_suppliers(mut self, suppliers: Vec<String>) -> Self {
        self.visible_suppliers = Some(suppliers);
        self
    }

    fn is_visible(&self, supplier: &str) -> bool {
        self.visible_suppliers
            .as_ref()
            .map_or(true, |visible| visible.iter().any(|v| v == supplier))
    }

    pub fn matches(&self, row: &RequirementRow) -> bool {
        self.terms.iter().all(|term| term.matches(row))
    }
}

// ==========================================
// 排序
// ==========================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewSort {
    /// 主需求插入顺序
    #[default]
    InsertionOrder,
    ReqifIdAsc,
    ReqifIdDesc,
    /// 冲突行在前，其余保持插入顺序
    ConflictsFirst,
}

impl ViewSort {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "insertion" | "insertion_order" => Some(ViewSort::InsertionOrder),
            "id" | "reqif_id_asc" | "id_asc" => Some(ViewSort::ReqifIdAsc),
            "reqif_id_desc" | "id_desc" => Some(ViewSort::ReqifIdDesc),
            "conflicts" | "conflicts_first" => Some(ViewSort::ConflictsFirst),
            _ => None,
        }
    }

    fn apply(&self, rows: &mut [RequirementRow]) {
        match self {
            ViewSort::InsertionOrder => {}
            ViewSort::ReqifIdAsc => rows.sort_by(|a, b| a.reqif_id.cmp(&b.reqif_id)),
            ViewSort::ReqifIdDesc => rows.sort_by(|a, b| b.reqif_id.cmp(&a.reqif_id)),
            ViewSort::ConflictsFirst => rows.sort_by_key(|r| !r.is_conflict),
        }
    }
}

// ==========================================
// ViewBuilder - 聚合视图构建引擎
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ViewBuilder {
    detector: ConflictDetector,
}

impl ViewBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 构建聚合视图
    ///
    /// # 参数
    /// - snapshot: 迭代快照
    /// - filter: 过滤条件（AND）
    /// - sort: 排序方式（稳定排序）
    #[instrument(skip_all, fields(iteration_id = %snapshot.iteration.iteration_id))]
    pub fn build(
        &self,
        snapshot: &IterationSnapshot,
        filter: &ViewFilter,
        sort: ViewSort,
    ) -> AggregationView {
        let rows = self.build_rows(snapshot, filter);
        let total_rows = rows.len();

        let mut requirements: Vec<RequirementRow> =
            rows.into_iter().filter(|row| filter.matches(row)).collect();
        sort.apply(&mut requirements);

        debug!(total = total_rows, shown = requirements.len(), "聚合视图已构建");

        AggregationView {
            iteration_id: snapshot.iteration.iteration_id.clone(),
            suppliers: snapshot
                .suppliers
                .iter()
                .filter(|s| filter.is_visible(&s.name))
                .map(|s| s.name.clone())
                .collect(),
            requirements,
            total_rows,
        }
    }

    /// join 阶段：全部需求行（未过滤，插入顺序）
    fn build_rows(&self, snapshot: &IterationSnapshot, filter: &ViewFilter) -> Vec<RequirementRow> {
        let supplier_names: HashMap<i64, &str> = snapshot
            .suppliers
            .iter()
            .map(|s| (s.supplier_id, s.name.as_str()))
            .collect();

        let mut feedback_by_req: HashMap<i64, Vec<&SupplierFeedback>> = HashMap::new();
        for fb in &snapshot.feedback {
            feedback_by_req.entry(fb.requirement_id).or_default().push(fb);
        }

        let decision_by_req: HashMap<i64, &Decision> = snapshot
            .decisions
            .iter()
            .map(|d| (d.requirement_id, d))
            .collect();

        snapshot
            .requirements
            .iter()
            .map(|req| {
                let feedback = feedback_by_req
                    .get(&req.requirement_id)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);

                let conflict = self.detector.detect(feedback.iter().filter_map(|fb| {
                    supplier_names
                        .get(&fb.supplier_id)
                        .map(|name| (*name, fb.canonical_status))
                }));

                let suppliers = snapshot
                    .suppliers
                    .iter()
                    .filter(|s| filter.is_visible(&s.name))
                    .map(|s| {
                        let cell = feedback
                            .iter()
                            .find(|fb| fb.supplier_id == s.supplier_id)
                            .map(|fb| SupplierCell::from_feedback(fb))
                            .unwrap_or_default();
                        (s.name.clone(), cell)
                    })
                    .collect();

                RequirementRow {
                    id: req.requirement_id,
                    reqif_id: req.reqif_id.clone(),
                    text: req.text.clone(),
                    type_tag: req.type_tag.clone(),
                    suppliers,
                    is_conflict: conflict.is_conflict,
                    disagreeing_suppliers: conflict.disagreeing_suppliers,
                    decision: decision_by_req.get(&req.requirement_id).map(|d| DecisionCell::from(*d)),
                }
            })
            .collect()
    }
}
