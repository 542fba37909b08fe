// ==========================================
// 需求协调驾驶舱 - 状态映射规则 API
// ==========================================
// 职责: 规则读写、映射预览、显式重新映射
// 约束: 规则修改不回写已映射反馈，除非调用 reharmonize
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::mapping_rule::StatusMappingRule;
use crate::domain::types::CanonicalStatus;
use crate::engine::status_harmonizer::{Harmonized, RuleSet, StatusHarmonizer};
use crate::repository::{
    FeedbackRepository, IterationRepository, MappingRuleRepository, RepositoryError,
    SupplierRepository,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{info, instrument};

/// 重新映射结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReharmonizeReport {
    /// 检查的反馈条数
    pub examined: usize,
    /// 状态或命中阶段发生变化的条数
    pub changed: usize,
}

pub struct RuleApi {
    conn: Arc<Mutex<Connection>>,
    rule_repo: Arc<MappingRuleRepository>,
    supplier_repo: Arc<SupplierRepository>,
    iteration_repo: Arc<IterationRepository>,
}

impl RuleApi {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        rule_repo: Arc<MappingRuleRepository>,
        supplier_repo: Arc<SupplierRepository>,
        iteration_repo: Arc<IterationRepository>,
    ) -> Self {
        Self {
            conn,
            rule_repo,
            supplier_repo,
            iteration_repo,
        }
    }

    pub fn list_rules(&self) -> ApiResult<Vec<StatusMappingRule>> {
        Ok(self.rule_repo.list()?)
    }

    /// 新增或覆盖规则
    ///
    /// # 参数
    /// - supplier_id: None 为全局规则；否则必须属于项目
    pub fn upsert_rule(
        &self,
        project_id: i64,
        supplier_id: Option<i64>,
        raw_status: &str,
        canonical_status: CanonicalStatus,
    ) -> ApiResult<StatusMappingRule> {
        if let Some(id) = supplier_id {
            self.require_supplier(project_id, id)?;
        }
        let rule = self.rule_repo.upsert(supplier_id, raw_status, canonical_status)?;
        info!(
            supplier_id = ?rule.supplier_id,
            raw_status = %rule.raw_status,
            status = %rule.canonical_status,
            "映射规则已保存"
        );
        Ok(rule)
    }

    /// 删除规则
    ///
    /// # 返回
    /// - Err(NotFound): 规则不存在
    pub fn delete_rule(&self, supplier_id: Option<i64>, raw_status: &str) -> ApiResult<()> {
        if self.rule_repo.delete(supplier_id, raw_status)? {
            Ok(())
        } else {
            Err(ApiError::NotFound(format!("映射规则 {}", raw_status)))
        }
    }

    /// 以当前规则预览一个原始状态的映射结果
    pub fn preview(&self, raw_status: &str, supplier_id: Option<i64>) -> ApiResult<Harmonized> {
        let harmonizer = StatusHarmonizer::new(RuleSet::from_rules(&self.rule_repo.list()?));
        Ok(harmonizer.normalize(raw_status, supplier_id))
    }

    /// 用当前规则重新映射已存储的反馈（单事务）
    ///
    /// # 参数
    /// - iteration_id: 限定迭代（必须未关闭）；None 为项目内全部开放迭代
    /// - supplier_id: 限定供应商
    #[instrument(skip(self), fields(project_id = project_id))]
    pub fn reharmonize(
        &self,
        project_id: i64,
        iteration_id: Option<&str>,
        supplier_id: Option<i64>,
    ) -> ApiResult<ReharmonizeReport> {
        let iteration_key = match iteration_id {
            Some(id) => {
                let iteration = self
                    .iteration_repo
                    .find_by_id(project_id, id)?
                    .ok_or_else(|| ApiError::NotFound(format!("迭代 {}", id)))?;
                if iteration.is_closed() {
                    return Err(ApiError::IterationClosed(id.to_string()));
                }
                Some(iteration.iteration_key)
            }
            None => None,
        };

        let conn = self
            .conn
            .lock()
            .map_err(|e| ApiError::from(RepositoryError::LockError(e.to_string())))?;
        let tx = conn
            .unchecked_transaction()
            .map_err(RepositoryError::from)?;

        let harmonizer = StatusHarmonizer::new(RuleSet::from_rules(&MappingRuleRepository::list_tx(&tx)?));
        let candidates =
            FeedbackRepository::list_for_harmonize_tx(&tx, project_id, iteration_key, supplier_id)?;

        let mut report = ReharmonizeReport {
            examined: candidates.len(),
            changed: 0,
        };
        for candidate in candidates {
            let result = harmonizer.normalize(
                candidate.raw_status.as_deref().unwrap_or_default(),
                Some(candidate.supplier_id),
            );
            if result.status != candidate.canonical_status || result.stage != candidate.harmonize_stage {
                FeedbackRepository::update_status_tx(&tx, candidate.feedback_id, result.status, result.stage)?;
                report.changed += 1;
            }
        }

        tx.commit().map_err(RepositoryError::from)?;
        info!(examined = report.examined, changed = report.changed, "重新映射完成");
        Ok(report)
    }

    fn require_supplier(&self, project_id: i64, supplier_id: i64) -> ApiResult<()> {
        match self.supplier_repo.find_by_id(supplier_id)? {
            Some(s) if s.project_id == project_id => Ok(()),
            _ => Err(ApiError::NotFound(format!("供应商(id={})", supplier_id))),
        }
    }
}
