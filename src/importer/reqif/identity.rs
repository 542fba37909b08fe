// ==========================================
// 记录标识解析策略
// ==========================================
// 规则（顺序执行，命中即返回）:
// 1. IDENTIFIER 存在且稳定 → Primary
// 2. IDENTIFIER 缺失或疑似工具生成（UUID 形态），且存在兜底名称 → NameFallback
// 3. IDENTIFIER 疑似不稳定但无兜底 → 仍使用 Primary
// 4. 两者皆无 → None（记录跳过）
// ==========================================

use crate::domain::types::IdStrategy;
use uuid::Uuid;

const UUID_TEXT_LEN: usize = 36;

/// 标识是否疑似由工具生成（每次导出都可能变化）
///
/// 识别形态: 纯 UUID、`_` 前缀 UUID、任意前缀 + 36 位带连字符 UUID 结尾
pub fn is_suspect_unstable(identifier: &str) -> bool {
    let trimmed = identifier.trim().trim_start_matches('_');
    if Uuid::parse_str(trimmed).is_ok() {
        return true;
    }

    if trimmed.len() > UUID_TEXT_LEN {
        let split = trimmed.len() - UUID_TEXT_LEN;
        if trimmed.is_char_boundary(split) {
            return Uuid::parse_str(&trimmed[split..]).is_ok();
        }
    }

    false
}

/// 解析记录的稳定标识
///
/// # 参数
/// - primary: SPEC-OBJECT@IDENTIFIER
/// - fallback: 兜底名称（配置的名称属性，或 LONG-NAME）
///
/// # 返回
/// - Some((标识, 策略))
/// - None: 无可用标识
pub fn resolve_identifier(
    primary: Option<&str>,
    fallback: Option<&str>,
) -> Option<(String, IdStrategy)> {
    let primary = primary.map(str::trim).filter(|s| !s.is_empty());
    let fallback = fallback.map(str::trim).filter(|s| !s.is_empty());

    match (primary, fallback) {
        (Some(id), Some(name)) if is_suspect_unstable(id) => {
            Some((name.to_string(), IdStrategy::NameFallback))
        }
        (Some(id), _) => Some((id.to_string(), IdStrategy::Primary)),
        (None, Some(name)) => Some((name.to_string(), IdStrategy::NameFallback)),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suspect_unstable_detection() {
        assert!(is_suspect_unstable("3f2504e0-4f89-11d3-9a0c-0305e82c3301"));
        assert!(is_suspect_unstable("_3f2504e0-4f89-11d3-9a0c-0305e82c3301"));
        assert!(is_suspect_unstable("rmf-3f2504e0-4f89-11d3-9a0c-0305e82c3301"));
        assert!(!is_suspect_unstable("REQ-001"));
        assert!(!is_suspect_unstable("R1"));
    }

    #[test]
    fn test_stable_primary_wins() {
        assert_eq!(
            resolve_identifier(Some("REQ-001"), Some("Brake force")),
            Some(("REQ-001".to_string(), IdStrategy::Primary))
        );
    }

    #[test]
    fn test_unstable_primary_falls_back() {
        assert_eq!(
            resolve_identifier(Some("_3f2504e0-4f89-11d3-9a0c-0305e82c3301"), Some("SYS-42")),
            Some(("SYS-42".to_string(), IdStrategy::NameFallback))
        );
    }

    #[test]
    fn test_unstable_primary_without_fallback_is_kept() {
        let id = "_3f2504e0-4f89-11d3-9a0c-0305e82c3301";
        assert_eq!(
            resolve_identifier(Some(id), None),
            Some((id.to_string(), IdStrategy::Primary))
        );
    }

    #[test]
    fn test_missing_primary() {
        assert_eq!(
            resolve_identifier(Some("  "), Some("Name")),
            Some(("Name".to_string(), IdStrategy::NameFallback))
        );
        assert_eq!(resolve_identifier(None, Some("")), None);
    }
}
