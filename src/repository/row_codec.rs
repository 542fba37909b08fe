// ==========================================
// 需求协调驾驶舱 - 行编解码辅助
// ==========================================
// 职责: 时间戳/枚举/属性包 与 SQLite 列之间的转换
// 约束: 时间统一以 UTC 文本存储
// ==========================================

use crate::domain::requirement::AttributeBag;
use chrono::{NaiveDateTime, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::Row;

/// 时间戳存储格式（毫秒精度，字典序即时间序）
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// 兼容 datetime('now') 生成的秒精度文本
const DATETIME_FORMAT_SECONDS: &str = "%Y-%m-%d %H:%M:%S";

/// 当前 UTC 时间（截断到存储精度，写入后读回相等）
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(3)
}

pub fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(DATETIME_FORMAT).to_string()
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT_SECONDS))
        .map_err(|e| conversion_error(idx, format!("无效时间戳 '{}': {}", raw, e)))
}

/// 读取时间戳列
pub fn ts_col(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    parse_ts(idx, &raw)
}

/// 读取可空时间戳列
pub fn opt_ts_col(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| parse_ts(idx, &raw))
        .transpose()
}

/// 读取枚举列（解析失败视为数据损坏）
pub fn enum_col<T>(
    row: &Row,
    idx: usize,
    parse: impl Fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| conversion_error(idx, format!("未知枚举值 '{}'", raw)))
}

/// 读取属性包 JSON 列
pub fn bag_col(row: &Row, idx: usize) -> rusqlite::Result<AttributeBag> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e.to_string()))
}

/// 读取任意 JSON 列
pub fn json_col(row: &Row, idx: usize) -> rusqlite::Result<serde_json::Value> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_ts_roundtrip_and_legacy_format() {
        let conn = Connection::open_in_memory().unwrap();
        let ts = NaiveDateTime::parse_from_str("2026-03-01 08:30:00.250", DATETIME_FORMAT).unwrap();

        let back = conn
            .query_row("SELECT ?1", [format_ts(&ts)], |row| ts_col(row, 0))
            .unwrap();
        assert_eq!(back, ts);

        let legacy = conn
            .query_row("SELECT '2026-03-01 08:30:00'", [], |row| ts_col(row, 0))
            .unwrap();
        assert_eq!(legacy.format("%H:%M").to_string(), "08:30");
    }

    #[test]
    fn test_enum_col_rejects_unknown_value() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.query_row("SELECT 'BOGUS'", [], |row| {
            enum_col(row, 0, crate::domain::types::CanonicalStatus::from_str)
        });
        assert!(result.is_err());
    }
}
