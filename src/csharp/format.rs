use crate::workspace::TextSpan;

const TAB_WIDTH: usize = 4;

/// Whitespace normalization:
/// - trailing whitespace is trimmed
/// - leading tabs become four spaces
/// - runs of blank lines collapse to one, and blank lines at the end go away
/// - the document ends with exactly one newline
///
/// Lines that start or end inside one of `protected` (multi-line string
/// literals) are left exactly as they are. Applying the function to its own
/// output changes nothing.
pub fn format_text(source: &str, protected: &[TextSpan]) -> String {
    if source.trim().is_empty() {
        return String::new();
    }
    let newline = if source.contains("\r\n") { "\r\n" } else { "\n" };
    let inside = |offset: usize| {
        protected
            .iter()
            .any(|span| span.start < offset && offset < span.end())
    };

    let mut lines: Vec<(String, bool)> = Vec::new();
    let mut offset = 0;
    for raw in source.split('\n') {
        let start = offset;
        offset += raw.len() + 1;
        let content = raw.strip_suffix('\r').unwrap_or(raw);
        let keep_leading = inside(start);
        let keep_trailing = inside(start + content.len());

        let mut line = if keep_leading {
            content.to_string()
        } else {
            expand_leading_tabs(content)
        };
        if !keep_trailing {
            let trimmed = line.trim_end().len();
            line.truncate(trimmed);
        }
        lines.push((line, keep_leading || keep_trailing));
    }

    let mut out: Vec<(&str, bool)> = Vec::new();
    let mut previous_blank = false;
    for (line, verbatim) in &lines {
        let blank = line.is_empty() && !verbatim;
        if blank && (previous_blank || out.is_empty()) {
            continue;
        }
        previous_blank = blank;
        out.push((line.as_str(), *verbatim));
    }
    while out
        .last()
        .map(|(line, verbatim)| line.is_empty() && !verbatim)
        .unwrap_or(false)
    {
        out.pop();
    }

    let out: Vec<&str> = out.into_iter().map(|(line, _)| line).collect();
    let mut formatted = out.join(newline);
    formatted.push_str(newline);
    formatted
}

fn expand_leading_tabs(line: &str) -> String {
    let indent_len = line
        .find(|ch: char| ch != ' ' && ch != '\t')
        .unwrap_or(line.len());
    let (indent, rest) = line.split_at(indent_len);
    if !indent.contains('\t') {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + TAB_WIDTH);
    for ch in indent.chars() {
        if ch == '\t' {
            out.push_str(&" ".repeat(TAB_WIDTH));
        } else {
            out.push(ch);
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_whitespace() {
        let source = "\n\nclass A  \n{\n\tint x;\t\n\n\n\n\tint y;\n}\n\n\n";
        let formatted = format_text(source, &[]);
        assert_eq!(formatted, "class A\n{\n    int x;\n\n    int y;\n}\n");
        assert_eq!(format_text(&formatted, &[]), formatted);
    }

    #[test]
    fn adds_missing_final_newline() {
        assert_eq!(format_text("class A {}", &[]), "class A {}\n");
        assert_eq!(format_text("", &[]), "");
    }

    #[test]
    fn leaves_multiline_literals_alone() {
        let source = "var s = @\"line one   \n\tline two\n\n\n   end\";  \n";
        let start = source.find('@').unwrap();
        let end = source.rfind('"').unwrap() + 1;
        let protected = [TextSpan::from_bounds(start, end)];
        let formatted = format_text(source, &protected);
        assert_eq!(formatted, "var s = @\"line one   \n\tline two\n\n\n   end\";\n");
        assert_eq!(format_text(&formatted, &protected), formatted);
    }
}
