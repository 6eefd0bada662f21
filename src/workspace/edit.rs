use crate::error::{Result, ToolError};
use serde::{Deserialize, Serialize};

/// Byte range inside one document.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct TextSpan {
    pub start: usize,
    pub length: usize,
}

impl TextSpan {
    pub fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    pub fn from_bounds(start: usize, end: usize) -> Self {
        Self {
            start,
            length: end.saturating_sub(start),
        }
    }

    pub fn end(&self) -> usize {
        self.start + self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Overlap test that treats an empty span as a point which still touches
    /// a range it sits on the boundary of.
    pub fn intersects(&self, other: &TextSpan) -> bool {
        if self.is_empty() || other.is_empty() {
            return self.start <= other.end() && other.start <= self.end();
        }
        self.start < other.end() && other.start < self.end()
    }

    pub fn contains(&self, other: &TextSpan) -> bool {
        self.start <= other.start && other.end() <= self.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub span: TextSpan,
    pub new_text: String,
}

impl TextEdit {
    pub fn replace(span: TextSpan, new_text: impl Into<String>) -> Self {
        Self {
            span,
            new_text: new_text.into(),
        }
    }

    pub fn delete(span: TextSpan) -> Self {
        Self::replace(span, "")
    }

    pub fn insert(at: usize, new_text: impl Into<String>) -> Self {
        Self::replace(TextSpan::new(at, 0), new_text)
    }
}

/// Apply non-overlapping edits computed against `text`.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> Result<String> {
    let mut ordered: Vec<&TextEdit> = edits.iter().collect();
    ordered.sort_by_key(|edit| (edit.span.start, edit.span.end()));
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for edit in ordered {
        let (start, end) = (edit.span.start, edit.span.end());
        if start < cursor {
            return Err(ToolError::invalid_input(format!(
                "overlapping edits at byte {start}"
            )));
        }
        if end > text.len() || !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            return Err(ToolError::invalid_input(format!(
                "edit range {start}..{end} outside document of {} bytes",
                text.len()
            )));
        }
        out.push_str(&text[cursor..start]);
        out.push_str(&edit.new_text);
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    Ok(out)
}

/// True when no two edits in the set overlap.
pub fn edits_disjoint(a: &[TextEdit], b: &[TextEdit]) -> bool {
    a.iter().all(|left| {
        b.iter().all(|right| {
            let (ls, le) = (left.span.start, left.span.end());
            let (rs, re) = (right.span.start, right.span.end());
            le <= rs || re <= ls
        })
    })
}
