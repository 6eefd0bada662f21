use anyhow::{Context, Result};
use std::fs;
use std::path::{Component, Path};

pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

pub fn normalize_rel_path(root: &Path, path: &Path) -> Result<String> {
    let rel = path.strip_prefix(root).with_context(|| {
        format!("strip prefix {} from {}", root.display(), path.display())
    })?;
    Ok(normalize_path(rel))
}

pub fn normalize_path(path: &Path) -> String {
    let mut parts = Vec::new();
    for comp in path.components() {
        match comp {
            Component::Normal(os) => parts.push(os.to_string_lossy().to_string()),
            Component::ParentDir => parts.push("..".to_string()),
            Component::CurDir => {}
            _ => {}
        }
    }
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Normalize a caller-supplied document path: backslashes become `/`, `.`
/// segments and a leading `./` disappear.
pub fn normalize_path_str(raw: &str) -> String {
    let replaced = raw.trim().replace('\\', "/");
    let absolute = replaced.starts_with('/');
    let parts: Vec<&str> = replaced
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();
    let joined = parts.join("/");
    if absolute { format!("/{joined}") } else { joined }
}

pub fn truncate_str_bytes(value: &str, max_bytes: usize) -> String {
    if value.len() <= max_bytes {
        return value.to_string();
    }
    let mut end = max_bytes.min(value.len());
    while end > 0 && !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

/// Whitespace-collapsed, length-capped excerpt of `source[start..end]`.
pub fn evidence_snippet(source: &str, start: usize, end: usize) -> Option<String> {
    let raw = source.get(start..end.min(source.len()))?;
    let mut out = String::new();
    let mut last_space = false;
    for ch in raw.chars() {
        if ch.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    let trimmed = out.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(truncate_str_bytes(trimmed, 200))
    }
}

/// 1-based (line, column) of a byte offset. Columns count characters.
pub fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let mut line = 1;
    let mut line_start = 0;
    for (idx, byte) in text.as_bytes()[..offset].iter().enumerate() {
        if *byte == b'\n' {
            line += 1;
            line_start = idx + 1;
        }
    }
    let column = text
        .get(line_start..offset)
        .map(|prefix| prefix.chars().count())
        .unwrap_or(0)
        + 1;
    (line, column)
}

/// Byte offset of a 1-based (line, column). The column may point one past the
/// last character of the line; anything further is out of range.
pub fn offset_of(text: &str, line: usize, column: usize) -> Option<usize> {
    if line == 0 || column == 0 {
        return None;
    }
    let mut start = 0;
    for _ in 1..line {
        let next = text[start..].find('\n')?;
        start += next + 1;
    }
    let line_end = text[start..]
        .find('\n')
        .map(|idx| start + idx)
        .unwrap_or(text.len());
    let line_text = text[start..line_end].trim_end_matches('\r');
    let mut offset = start;
    let mut chars = line_text.chars();
    for _ in 1..column {
        let ch = chars.next()?;
        offset += ch.len_utf8();
    }
    Some(offset)
}

/// Widen `[start, end)` to whole lines when nothing but whitespace shares
/// those lines, so deleting the range does not leave a blank line behind.
pub fn line_removal_span(text: &str, start: usize, end: usize) -> (usize, usize) {
    let bytes = text.as_bytes();
    let mut line_start = start;
    while line_start > 0 && matches!(bytes[line_start - 1], b' ' | b'\t') {
        line_start -= 1;
    }
    let starts_line = line_start == 0 || bytes[line_start - 1] == b'\n';

    let mut line_end = end;
    while line_end < bytes.len() && matches!(bytes[line_end], b' ' | b'\t' | b'\r') {
        line_end += 1;
    }
    let ends_line = line_end == bytes.len() || bytes[line_end] == b'\n';

    if starts_line && ends_line {
        let end = if line_end < bytes.len() { line_end + 1 } else { line_end };
        (line_start, end)
    } else {
        (start, end)
    }
}

/// Leading whitespace of the line that contains `offset`.
pub fn line_indent(text: &str, offset: usize) -> &str {
    let offset = offset.min(text.len());
    let line_start = text[..offset].rfind('\n').map(|idx| idx + 1).unwrap_or(0);
    let rest = &text[line_start..];
    let indent_len = rest
        .find(|ch: char| ch != ' ' && ch != '\t')
        .unwrap_or(rest.len());
    &rest[..indent_len]
}

pub fn is_valid_identifier(name: &str) -> bool {
    let name = name.strip_prefix('@').unwrap_or(name);
    let mut chars = name.chars();
    match chars.next() {
        Some(ch) if ch.is_alphabetic() || ch == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_alphanumeric() || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_round_trips_with_offset_of() {
        let text = "class A\n{\n    int x;\n}\n";
        let offset = text.find("int").unwrap();
        assert_eq!(line_col(text, offset), (3, 5));
        assert_eq!(offset_of(text, 3, 5), Some(offset));
        assert_eq!(offset_of(text, 1, 8), Some(7));
        assert_eq!(offset_of(text, 1, 9), None);
        assert_eq!(offset_of(text, 9, 1), None);
    }

    #[test]
    fn removal_span_takes_whole_line() {
        let text = "a\n    int x;\nb\n";
        let start = text.find("int").unwrap();
        let end = start + "int x;".len();
        let (s, e) = line_removal_span(text, start, end);
        assert_eq!(&text[..s], "a\n");
        assert_eq!(&text[e..], "b\n");
    }

    #[test]
    fn removal_span_keeps_shared_line() {
        let text = "int a; int b;\n";
        let start = text.find("int b").unwrap();
        let (s, e) = line_removal_span(text, start, start + 6);
        assert_eq!((s, e), (start, start + 6));
    }

    #[test]
    fn normalizes_path_strings() {
        assert_eq!(normalize_path_str("./src\\App.cs"), "src/App.cs");
        assert_eq!(normalize_path_str("/tmp//x/./y.cs"), "/tmp/x/y.cs");
    }

    #[test]
    fn identifiers() {
        assert!(is_valid_identifier("_count1"));
        assert!(is_valid_identifier("@class"));
        assert!(!is_valid_identifier("1abc"));
        assert!(!is_valid_identifier("a-b"));
        assert!(!is_valid_identifier(""));
    }
}
