// ==========================================
// ReqIF 载荷解包
// ==========================================
// .reqif: 单个 XML 载荷
// .reqifz: zip 容器，按归档顺序取出全部 .reqif 条目
// ==========================================

use crate::importer::error::ParseError;
use std::io::{Cursor, Read};
use tracing::debug;
use zip::ZipArchive;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
/// 单个容器条目解压后的上限
const MAX_ENTRY_BYTES: u64 = 256 * 1024 * 1024;
/// 按条目声明大小预分配的上限（声明值不可信）
const PREALLOC_LIMIT: u64 = 1024 * 1024;
const UTF8_BOM: &str = "\u{feff}";

/// 单个 XML 载荷
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// 载荷名称：单文件为文档名，容器内为条目路径
    pub name: String,
    pub xml: String,
}

/// 是否为 zip 容器（按魔数判断，不依赖扩展名）
pub fn is_container(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_MAGIC)
}

/// 解包文档字节为 XML 载荷列表
pub fn unpack(document_name: &str, bytes: &[u8]) -> Result<Vec<Payload>, ParseError> {
    if !is_container(bytes) {
        let xml = decode_utf8(document_name, bytes.to_vec())?;
        return Ok(vec![Payload {
            name: document_name.to_string(),
            xml,
        }]);
    }

    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut payloads = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() || !entry.name().to_lowercase().ends_with(".reqif") {
            continue;
        }

        let name = entry.name().to_string();
        let declared = entry.size();
        let buf = read_entry(&name, &mut entry, declared, MAX_ENTRY_BYTES)?;
        debug!(container = document_name, entry = %name, bytes = buf.len(), "读取容器条目");

        let xml = decode_utf8(&name, buf)?;
        payloads.push(Payload { name, xml });
    }

    if payloads.is_empty() {
        return Err(ParseError::EmptyContainer(document_name.to_string()));
    }

    Ok(payloads)
}

/// 读取条目内容，超过 limit 即失败
fn read_entry(
    name: &str,
    reader: &mut impl Read,
    declared: u64,
    limit: u64,
) -> Result<Vec<u8>, ParseError> {
    let mut buf = Vec::with_capacity(declared.min(limit).min(PREALLOC_LIMIT) as usize);
    reader.take(limit + 1).read_to_end(&mut buf)?;
    if buf.len() as u64 > limit {
        return Err(ParseError::EntryTooLarge {
            source_name: name.to_string(),
            limit,
        });
    }
    Ok(buf)
}

fn decode_utf8(source_name: &str, bytes: Vec<u8>) -> Result<String, ParseError> {
    let text = String::from_utf8(bytes).map_err(|e| ParseError::Encoding {
        source_name: source_name.to_string(),
        message: e.to_string(),
    })?;

    Ok(match text.strip_prefix(UTF8_BOM) {
        Some(rest) => rest.to_string(),
        None => text,
    })
}
