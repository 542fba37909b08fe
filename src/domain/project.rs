// ==========================================
// 需求协调驾驶舱 - 项目/供应商/迭代实体
// ==========================================
// 红线: 迭代标识符一经创建永久不可变，迭代不可删除
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 迭代标识最大长度
pub const MAX_ITERATION_ID_LENGTH: usize = 64;

/// 项目名称最大长度
pub const MAX_PROJECT_NAME_LENGTH: usize = 100;

// ==========================================
// Project - 项目（根归属单元）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Project {
    /// 校验项目名称（同时作为项目库文件名）
    pub fn validate_name(name: &str) -> Result<(), String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err("项目名称不能为空".to_string());
        }
        if trimmed.chars().count() > MAX_PROJECT_NAME_LENGTH {
            return Err(format!("项目名称超过 {} 个字符", MAX_PROJECT_NAME_LENGTH));
        }
        if trimmed.starts_with('.') {
            return Err("项目名称不能以 '.' 开头".to_string());
        }
        if let Some(c) = trimmed
            .chars()
            .find(|c| !(c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.')))
        {
            return Err(format!("项目名称包含非法字符: '{}'", c));
        }
        Ok(())
    }
}

// ==========================================
// Supplier - 供应商
// ==========================================
// 身份（name）创建后不可变，short_name 可编辑
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    pub supplier_id: i64,
    pub project_id: i64,
    pub name: String,
    pub short_name: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Supplier {
    /// 展示名称：优先 short_name
    pub fn display_name(&self) -> &str {
        self.short_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.name)
    }

    /// 校验供应商名称
    pub fn validate_name(name: &str, max_len: usize) -> Result<(), String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err("供应商名称不能为空".to_string());
        }
        if trimmed.chars().count() > max_len {
            return Err(format!("供应商名称超过 {} 个字符", max_len));
        }
        Ok(())
    }
}

// ==========================================
// Iteration - 迭代（审计粒度检查点）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Iteration {
    /// 库内主键（外键引用使用）
    pub iteration_key: i64,
    pub project_id: i64,
    /// 业务标识，如 "I-001"
    pub iteration_id: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    /// 关闭导入的时间；关闭后不再接受供应商导入
    pub closed_at: Option<NaiveDateTime>,
}

impl Iteration {
    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }

    /// 校验迭代标识
    ///
    /// 规则: 非空、≤64 字符、仅允许字母数字及 `_` `-` `.`
    pub fn validate_id(iteration_id: &str) -> Result<(), String> {
        if iteration_id.is_empty() {
            return Err("迭代标识不能为空".to_string());
        }
        if iteration_id.chars().count() > MAX_ITERATION_ID_LENGTH {
            return Err(format!("迭代标识超过 {} 个字符", MAX_ITERATION_ID_LENGTH));
        }
        if let Some(c) = iteration_id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        {
            return Err(format!("迭代标识包含非法字符: '{}'", c));
        }
        Ok(())
    }
}
