// ==========================================
// 需求协调驾驶舱 - 视图导出 API
// ==========================================
// 职责: 聚合视图 → CSV（表格工具查看用，不生成交换文档）
// 列: 标识、正文、每个可见供应商的状态/原始状态/评论、冲突、决策
// ==========================================

use crate::api::cockpit_api::CockpitApi;
use crate::api::error::{ApiError, ApiResult};
use crate::engine::view_builder::{AggregationView, ViewFilter, ViewSort};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

const DECIDED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl From<csv::Error> for ApiError {
    fn from(err: csv::Error) -> Self {
        ApiError::ExportError(err.to_string())
    }
}

pub struct ExportApi {
    cockpit: Arc<CockpitApi>,
}

impl ExportApi {
    pub fn new(cockpit: Arc<CockpitApi>) -> Self {
        Self { cockpit }
    }

    /// 导出聚合视图到任意写入器
    ///
    /// # 返回
    /// 写出的数据行数（不含表头）
    pub fn export_view_csv<W: Write>(
        &self,
        project_id: i64,
        iteration_id: &str,
        filter: &ViewFilter,
        sort: ViewSort,
        writer: W,
    ) -> ApiResult<usize> {
        let view = self.cockpit.build_view(project_id, iteration_id, filter, sort)?;
        write_view_csv(&view, writer)
    }

    /// 导出聚合视图到文件
    pub fn export_view_csv_file(
        &self,
        project_id: i64,
        iteration_id: &str,
        filter: &ViewFilter,
        sort: ViewSort,
        path: &Path,
    ) -> ApiResult<usize> {
        let file = File::create(path)
            .map_err(|e| ApiError::ExportError(format!("{}: {}", path.display(), e)))?;
        let rows = self.export_view_csv(project_id, iteration_id, filter, sort, file)?;
        info!(path = %path.display(), rows = rows, "视图已导出");
        Ok(rows)
    }
}

/// 按视图列顺序写出 CSV
pub fn write_view_csv<W: Write>(view: &AggregationView, writer: W) -> ApiResult<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec!["reqif_id".to_string(), "text".to_string()];
    for supplier in &view.suppliers {
        header.push(format!("{} status", supplier));
        header.push(format!("{} raw status", supplier));
        header.push(format!("{} comment", supplier));
    }
    header.extend(
        [
            "conflict",
            "disagreeing_suppliers",
            "decision",
            "decision_note",
            "decision_author",
            "decided_at",
        ]
        .map(str::to_string),
    );
    csv_writer.write_record(&header)?;

    for row in &view.requirements {
        let mut record = vec![row.reqif_id.clone(), row.text.clone()];
        for supplier in &view.suppliers {
            let cell = row.suppliers.get(supplier);
            record.push(
                cell.and_then(|c| c.status)
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
            );
            record.push(cell.and_then(|c| c.raw_status.clone()).unwrap_or_default());
            record.push(cell.and_then(|c| c.comment.clone()).unwrap_or_default());
        }
        record.push(if row.is_conflict { "yes" } else { "no" }.to_string());
        record.push(
            row.disagreeing_suppliers
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join("; "),
        );
        match &row.decision {
            Some(decision) => {
                record.push(decision.status.to_string());
                record.push(decision.note.clone());
                record.push(decision.author.clone());
                record.push(decision.decided_at.format(DECIDED_AT_FORMAT).to_string());
            }
            None => record.extend(std::iter::repeat(String::new()).take(4)),
        }
        csv_writer.write_record(&record)?;
    }

    csv_writer
        .flush()
        .map_err(|e| ApiError::ExportError(e.to_string()))?;
    Ok(view.requirements.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{CanonicalStatus, DecisionStatus};
    use crate::engine::view_builder::{DecisionCell, RequirementRow, SupplierCell};
    use chrono::NaiveDate;
    use indexmap::IndexMap;
    use std::collections::BTreeSet;

    #[test]
    fn test_csv_layout() {
        let mut suppliers = IndexMap::new();
        suppliers.insert(
            "Acme".to_string(),
            SupplierCell {
                status: Some(CanonicalStatus::Rejected),
                raw_status: Some("NOK".to_string()),
                comment: Some("too heavy, see 3.2".to_string()),
                harmonize_stage: None,
                has_feedback: true,
            },
        );
        suppliers.insert("Bolt".to_string(), SupplierCell::default());

        let decided_at = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let view = AggregationView {
            iteration_id: "I-001".to_string(),
            suppliers: vec!["Acme".to_string(), "Bolt".to_string()],
            requirements: vec![RequirementRow {
                id: 1,
                reqif_id: "R1".to_string(),
                text: "Line 1\nLine 2".to_string(),
                type_tag: None,
                suppliers,
                is_conflict: false,
                disagreeing_suppliers: BTreeSet::new(),
                decision: Some(DecisionCell {
                    status: DecisionStatus::Modified,
                    note: "relaxed".to_string(),
                    author: "custre".to_string(),
                    decided_at,
                }),
            }],
            total_rows: 1,
        };

        let mut out = Vec::new();
        assert_eq!(write_view_csv(&view, &mut out).unwrap(), 1);

        let mut reader = csv::Reader::from_reader(out.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 2 + 2 * 3 + 6);
        assert_eq!(&headers[2], "Acme status");

        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[1], "Line 1\nLine 2");
        assert_eq!(&record[2], "REJECTED");
        assert_eq!(&record[4], "too heavy, see 3.2");
        assert_eq!(&record[5], "");
        assert_eq!(&record[8], "no");
        assert_eq!(&record[10], "MODIFIED");
        assert_eq!(&record[13], "2024-03-01 09:30:00");
    }
}
