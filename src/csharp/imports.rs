use crate::csharp::syntax::{self, node_text, span_of};
use crate::workspace::{TextEdit, TextSpan};
use tree_sitter::Node;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsingDirective {
    pub span: TextSpan,
    pub text: String,
    pub is_global: bool,
    pub is_static: bool,
    pub alias: Option<String>,
    /// Imported namespace or type, whitespace removed.
    pub name: String,
}

impl UsingDirective {
    pub fn parse(node: Node<'_>, source: &str) -> Self {
        let text = node_text(node, source).trim().to_string();
        let mut rest = text.trim_end_matches(';').trim();
        let is_global = strip_keyword(&mut rest, "global");
        strip_keyword(&mut rest, "using");
        let is_static = strip_keyword(&mut rest, "static");
        let (alias, name) = match rest.split_once('=') {
            Some((alias, target)) => (Some(compact(alias)), compact(target)),
            None => (None, compact(rest)),
        };
        Self {
            span: span_of(node),
            text,
            is_global,
            is_static,
            alias,
            name,
        }
    }

    /// Ordering used by organize-imports: plain names, then static imports,
    /// then aliases, each alphabetical.
    pub fn sort_key(&self) -> (bool, bool, bool, String, String) {
        let label = self.alias.as_deref().unwrap_or(&self.name);
        (
            !self.is_global,
            self.alias.is_some(),
            self.is_static,
            label.to_lowercase(),
            label.to_string(),
        )
    }

    /// Identity used to spot duplicates.
    pub fn dedup_key(&self) -> (bool, bool, Option<&str>, &str) {
        (
            self.is_global,
            self.is_static,
            self.alias.as_deref(),
            self.name.as_str(),
        )
    }
}

fn strip_keyword(rest: &mut &str, keyword: &str) -> bool {
    let Some(after) = rest.strip_prefix(keyword) else {
        return false;
    };
    if !after.starts_with(char::is_whitespace) {
        return false;
    }
    *rest = after.trim_start();
    true
}

fn compact(value: &str) -> String {
    value.chars().filter(|ch| !ch.is_whitespace()).collect()
}

const IMPORT_CONTAINERS: &[&str] = &[
    "compilation_unit",
    "declaration_list",
    "file_scoped_namespace_declaration",
];

/// Runs of adjacent using directives, one list per run, in source order.
/// Each namespace body has its own runs.
pub fn using_groups(root: Node<'_>) -> Vec<Vec<Node<'_>>> {
    let mut groups = Vec::new();
    syntax::walk(root, &mut |node| {
        if IMPORT_CONTAINERS.contains(&node.kind()) {
            let mut run = Vec::new();
            for child in syntax::named_children(node) {
                if child.kind() == "using_directive" {
                    run.push(child);
                } else if !run.is_empty() {
                    groups.push(std::mem::take(&mut run));
                }
            }
            if !run.is_empty() {
                groups.push(run);
            }
        }
        !matches!(
            node.kind(),
            "block" | "method_declaration" | "constructor_declaration" | "property_declaration"
        )
    });
    groups
}

/// Edits that put every using run into canonical order. Directives keep
/// their slots, so comments and blank lines around a run stay put.
pub fn organize_edits(root: Node<'_>, source: &str) -> Vec<TextEdit> {
    let mut edits = Vec::new();
    for group in using_groups(root) {
        let current: Vec<UsingDirective> = group
            .iter()
            .map(|node| UsingDirective::parse(*node, source))
            .collect();
        let mut sorted = current.clone();
        sorted.sort_by_key(UsingDirective::sort_key);
        for (slot, wanted) in current.iter().zip(sorted.iter()) {
            if slot.text != wanted.text {
                edits.push(TextEdit::replace(slot.span, wanted.text.clone()));
            }
        }
    }
    edits
}
