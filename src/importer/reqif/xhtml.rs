// ==========================================
// XHTML 富文本展平
// ==========================================
// 规则:
// - 块级元素与 <br> 转为换行，其余空白折叠为单个空格
// - 残留的 HTML 命名/数字实体解码
// - <object> 嵌入内容不展开
// ==========================================

use roxmltree::Node;

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "blockquote", "caption", "dd", "div", "dl", "dt", "h1", "h2", "h3", "h4", "h5",
    "h6", "hr", "li", "ol", "p", "pre", "table", "tbody", "thead", "tfoot", "tr", "ul",
];

const HTML_ENTITIES: &[(&str, &str)] = &[
    ("nbsp", "\u{a0}"),
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("quot", "\""),
    ("apos", "'"),
    ("ndash", "\u{2013}"),
    ("mdash", "\u{2014}"),
    ("hellip", "\u{2026}"),
    ("deg", "\u{b0}"),
    ("micro", "\u{b5}"),
    ("plusmn", "\u{b1}"),
    ("times", "\u{d7}"),
    ("le", "\u{2264}"),
    ("ge", "\u{2265}"),
    ("auml", "\u{e4}"),
    ("ouml", "\u{f6}"),
    ("uuml", "\u{fc}"),
    ("Auml", "\u{c4}"),
    ("Ouml", "\u{d6}"),
    ("Uuml", "\u{dc}"),
    ("szlig", "\u{df}"),
    ("euro", "\u{20ac}"),
    ("copy", "\u{a9}"),
    ("reg", "\u{ae}"),
];

/// 将 THE-VALUE 节点下的 XHTML 内容展平为纯文本
pub fn flatten(node: Node) -> String {
    let mut out = String::new();
    walk(node, &mut out);
    normalize(&decode_entities(&out))
}

fn walk(node: Node, out: &mut String) {
    for child in node.children() {
        if child.is_text() {
            if let Some(text) = child.text() {
                out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
            }
            continue;
        }
        if !child.is_element() {
            continue;
        }

        let name = child.tag_name().name().to_ascii_lowercase();
        match name.as_str() {
            "br" => {
                trim_trailing_spaces(out);
                out.push('\n');
            }
            "object" => {}
            "td" | "th" => {
                walk(child, out);
                out.push(' ');
            }
            tag if BLOCK_ELEMENTS.contains(&tag) => {
                ensure_line_break(out);
                walk(child, out);
                ensure_line_break(out);
            }
            _ => walk(child, out),
        }
    }
}

fn trim_trailing_spaces(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
}

fn ensure_line_break(out: &mut String) {
    trim_trailing_spaces(out);
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

/// 行内空白折叠，去除首尾空行
fn normalize(text: &str) -> String {
    let lines: Vec<String> = text
        .split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();

    let start = lines.iter().position(|l| !l.is_empty());
    let end = lines.iter().rposition(|l| !l.is_empty());
    match (start, end) {
        (Some(s), Some(e)) => lines[s..=e].join("\n"),
        _ => String::new(),
    }
}

/// 解码残留实体（单遍扫描，避免二次解码）
pub fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match tail.find(';').filter(|&semi| semi > 1 && semi <= 10) {
            Some(semi) => {
                let entity = &tail[1..semi];
                match decode_entity(entity) {
                    Some(decoded) => out.push_str(&decoded),
                    None => out.push_str(&tail[..=semi]),
                }
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<String> {
    if let Some(num) = entity.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }

    HTML_ENTITIES
        .iter()
        .find(|(name, _)| *name == entity)
        .map(|(_, value)| value.to_string())
}
