// ==========================================
// 需求协调驾驶舱 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入器所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

/// 配置读取结果
pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ===== 默认值 =====
pub const DEFAULT_TEXT_ATTRIBUTE: &str = "ReqIF.Text";
pub const DEFAULT_STATUS_ATTRIBUTE: &str = "ReqIF-WF.SupplierStatus";
pub const DEFAULT_COMMENT_ATTRIBUTE: &str = "ReqIF-WF.SupplierComment";
pub const DEFAULT_FALLBACK_ID_ATTRIBUTE: &str = "ReqIF.ForeignID";

/// 一次导入使用的属性名配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSettings {
    pub text_attribute: String,
    pub status_attribute: String,
    pub comment_attribute: String,
    pub fallback_id_attribute: String,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            text_attribute: DEFAULT_TEXT_ATTRIBUTE.to_string(),
            status_attribute: DEFAULT_STATUS_ATTRIBUTE.to_string(),
            comment_attribute: DEFAULT_COMMENT_ATTRIBUTE.to_string(),
            fallback_id_attribute: DEFAULT_FALLBACK_ID_ATTRIBUTE.to_string(),
        }
    }
}

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（config_kv 表）、StaticImportConfig（内存）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 主需求正文属性名
    ///
    /// # 默认值
    /// - ReqIF.Text（缺失时取首个 XHTML 属性）
    async fn get_text_attribute(&self) -> ConfigResult<String>;

    /// 供应商状态属性名
    ///
    /// # 默认值
    /// - ReqIF-WF.SupplierStatus
    async fn get_status_attribute(&self) -> ConfigResult<String>;

    /// 供应商评论属性名
    ///
    /// # 默认值
    /// - ReqIF-WF.SupplierComment
    async fn get_comment_attribute(&self) -> ConfigResult<String>;

    /// 兜底标识（人类可读名称）属性名
    ///
    /// # 默认值
    /// - ReqIF.ForeignID
    async fn get_fallback_id_attribute(&self) -> ConfigResult<String>;

    /// 一次性读取全部导入配置
    async fn get_import_settings(&self) -> ConfigResult<ImportSettings> {
        Ok(ImportSettings {
            text_attribute: self.get_text_attribute().await?,
            status_attribute: self.get_status_attribute().await?,
            comment_attribute: self.get_comment_attribute().await?,
            fallback_id_attribute: self.get_fallback_id_attribute().await?,
        })
    }
}

// 共享配置读取器（Arc 包装）
#[async_trait]
impl<T> ImportConfigReader for Arc<T>
where
    T: ImportConfigReader + ?Sized,
{
    async fn get_text_attribute(&self) -> ConfigResult<String> {
        (**self).get_text_attribute().await
    }

    async fn get_status_attribute(&self) -> ConfigResult<String> {
        (**self).get_status_attribute().await
    }

    async fn get_comment_attribute(&self) -> ConfigResult<String> {
        (**self).get_comment_attribute().await
    }

    async fn get_fallback_id_attribute(&self) -> ConfigResult<String> {
        (**self).get_fallback_id_attribute().await
    }
}

// ==========================================
// StaticImportConfig - 内存配置（测试与命令行工具）
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct StaticImportConfig {
    settings: ImportSettings,
}

impl StaticImportConfig {
    pub fn new(settings: ImportSettings) -> Self {
        Self { settings }
    }

    pub fn with_status_attribute(mut self, name: impl Into<String>) -> Self {
        self.settings.status_attribute = name.into();
        self
    }

    pub fn with_comment_attribute(mut self, name: impl Into<String>) -> Self {
        self.settings.comment_attribute = name.into();
        self
    }

    pub fn with_text_attribute(mut self, name: impl Into<String>) -> Self {
        self.settings.text_attribute = name.into();
        self
    }
}

#[async_trait]
impl ImportConfigReader for StaticImportConfig {
    async fn get_text_attribute(&self) -> ConfigResult<String> {
        Ok(self.settings.text_attribute.clone())
    }

    async fn get_status_attribute(&self) -> ConfigResult<String> {
        Ok(self.settings.status_attribute.clone())
    }

    async fn get_comment_attribute(&self) -> ConfigResult<String> {
        Ok(self.settings.comment_attribute.clone())
    }

    async fn get_fallback_id_attribute(&self) -> ConfigResult<String> {
        Ok(self.settings.fallback_id_attribute.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_config_defaults_and_overrides() {
        let config = StaticImportConfig::default().with_status_attribute("Status");
        let settings = config.get_import_settings().await.unwrap();
        assert_eq!(settings.status_attribute, "Status");
        assert_eq!(settings.comment_attribute, DEFAULT_COMMENT_ATTRIBUTE);
        assert_eq!(settings.fallback_id_attribute, DEFAULT_FALLBACK_ID_ATTRIBUTE);
    }
}
