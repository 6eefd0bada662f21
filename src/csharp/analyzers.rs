//! Syntax-driven analyzers for the diagnostics the fix providers and cleanup
//! rules act on.

use crate::codemodel::{Diagnostic, Severity};
use crate::csharp::imports::UsingDirective;
use crate::csharp::syntax::{self, node_text, span_of};
use crate::csharp::{Compilation, ParsedDocument};
use crate::workspace::{TextEdit, TextSpan};
use std::collections::{BTreeSet, HashSet};
use tree_sitter::Node;

pub const UNUSED_LOCAL_DECLARED: &str = "CS0168";
pub const UNUSED_LOCAL_ASSIGNED: &str = "CS0219";
pub const UNNECESSARY_USING: &str = "CS8019";
pub const MODIFIER_ORDER: &str = "IDE0036";
pub const MAKE_FIELD_READONLY: &str = "IDE0044";

/// Canonical modifier order. `partial` always goes last.
const MODIFIER_RANKS: &[&[&str]] = &[
    &["public"],
    &["private"],
    &["protected"],
    &["internal"],
    &["file"],
    &["static", "const"],
    &["extern"],
    &["new"],
    &["virtual"],
    &["abstract"],
    &["sealed"],
    &["override"],
    &["readonly"],
    &["unsafe"],
    &["required"],
    &["volatile"],
    &["async"],
    &["ref"],
];

pub fn modifier_rank(modifier: &str) -> usize {
    if modifier == "partial" {
        return usize::MAX;
    }
    MODIFIER_RANKS
        .iter()
        .position(|group| group.contains(&modifier))
        .unwrap_or(MODIFIER_RANKS.len())
}

/// All diagnostics for one document, ordered by span then ID.
pub fn analyze(compilation: &Compilation, doc: &ParsedDocument) -> Vec<Diagnostic> {
    let root = doc.root();
    let source = doc.source();
    let mut out = Vec::new();
    for local in unused_locals(root, source) {
        let message = if local.diagnostic_id == UNUSED_LOCAL_DECLARED {
            format!("The variable '{}' is declared but never used", local.name)
        } else {
            format!(
                "The variable '{}' is assigned but its value is never used",
                local.name
            )
        };
        out.push(Diagnostic::new(
            local.diagnostic_id,
            Severity::Warning,
            message,
            &doc.path,
            source,
            local.name_span,
        ));
    }
    for span in unnecessary_usings(compilation, root, source) {
        out.push(Diagnostic::new(
            UNNECESSARY_USING,
            Severity::Hidden,
            "Unnecessary using directive",
            &doc.path,
            source,
            span,
        ));
    }
    for span in misordered_modifiers(root, source) {
        out.push(Diagnostic::new(
            MODIFIER_ORDER,
            Severity::Info,
            "Modifiers are not ordered",
            &doc.path,
            source,
            span,
        ));
    }
    for (span, name) in readonly_candidates(root, source) {
        out.push(Diagnostic::new(
            MAKE_FIELD_READONLY,
            Severity::Info,
            format!("Make field '{name}' readonly"),
            &doc.path,
            source,
            span,
        ));
    }
    out.sort_by(|a, b| {
        (a.span.start, a.span.length, &a.id).cmp(&(b.span.start, b.span.length, &b.id))
    });
    out
}

pub struct UnusedLocal<'t> {
    pub statement: Node<'t>,
    pub declaration: Node<'t>,
    pub declarator: Node<'t>,
    pub name: String,
    pub name_span: TextSpan,
    pub diagnostic_id: &'static str,
}

/// Locals that are never read. A local initialized with anything other than
/// a literal is skipped since evaluating the initializer may matter.
pub fn unused_locals<'t>(root: Node<'t>, source: &str) -> Vec<UnusedLocal<'t>> {
    let mut out = Vec::new();
    for statement in syntax::descendants_of_kind(root, &["local_declaration_statement"]) {
        if syntax::has_modifier(statement, source, "const")
            || syntax::has_anonymous_child(statement, "const")
            || syntax::has_anonymous_child(statement, "using")
        {
            continue;
        }
        let Some(declaration) = syntax::variable_declaration(statement) else {
            continue;
        };
        let scope = local_scope(statement, root);
        for declarator in syntax::declarators(declaration) {
            let Some(name_node) = declarator_name(declarator) else {
                continue;
            };
            let name = node_text(name_node, source).trim().to_string();
            if name.is_empty() || name == "_" {
                continue;
            }
            let diagnostic_id = match syntax::declarator_initializer(declarator) {
                None => UNUSED_LOCAL_DECLARED,
                Some(init) if syntax::is_constant_literal(init.kind()) => UNUSED_LOCAL_ASSIGNED,
                Some(_) => continue,
            };
            if is_referenced(scope, source, &name, name_node) {
                continue;
            }
            out.push(UnusedLocal {
                statement,
                declaration,
                declarator,
                name,
                name_span: span_of(name_node),
                diagnostic_id,
            });
        }
    }
    out
}

pub fn declarator_name(declarator: Node<'_>) -> Option<Node<'_>> {
    syntax::name_node(declarator).or_else(|| {
        syntax::named_children(declarator)
            .into_iter()
            .find(|child| child.kind() == "identifier")
    })
}

fn local_scope<'t>(statement: Node<'t>, root: Node<'t>) -> Node<'t> {
    match statement.parent() {
        Some(parent) if parent.kind() == "global_statement" => root,
        Some(parent) => parent,
        None => root,
    }
}

fn is_referenced(scope: Node<'_>, source: &str, name: &str, declared: Node<'_>) -> bool {
    let mut found = false;
    syntax::walk(scope, &mut |node| {
        if found {
            return false;
        }
        if node.kind() == "identifier"
            && node.start_byte() != declared.start_byte()
            && node_text(node, source) == name
        {
            found = true;
        }
        true
    });
    found
}

/// Edits removing one unused local: the whole statement when it declares a
/// single variable, otherwise just the declarator and its separating comma.
pub fn remove_local_edits(source: &str, local: &UnusedLocal<'_>) -> Vec<TextEdit> {
    let declarators = syntax::declarators(local.declaration);
    if declarators.len() <= 1 {
        let (start, end) = crate::util::line_removal_span(
            source,
            local.statement.start_byte(),
            local.statement.end_byte(),
        );
        return vec![TextEdit::delete(TextSpan::from_bounds(start, end))];
    }
    let index = declarators
        .iter()
        .position(|node| node.start_byte() == local.declarator.start_byte())
        .unwrap_or(0);
    let span = if index + 1 < declarators.len() {
        TextSpan::from_bounds(
            declarators[index].start_byte(),
            declarators[index + 1].start_byte(),
        )
    } else {
        TextSpan::from_bounds(
            declarators[index - 1].end_byte(),
            declarators[index].end_byte(),
        )
    };
    vec![TextEdit::delete(span)]
}

/// Well-known framework namespaces and the names whose presence means the
/// import is in use. Namespaces outside this table and the workspace are
/// always kept.
const FRAMEWORK_NAMESPACES: &[(&str, &[&str])] = &[
    (
        "System.Collections.Generic",
        &[
            "List", "Dictionary", "HashSet", "IEnumerable", "IEnumerator", "IList", "ICollection",
            "IDictionary", "IReadOnlyList", "IReadOnlyCollection", "IReadOnlyDictionary",
            "KeyValuePair", "Queue", "Stack", "SortedDictionary", "SortedList", "SortedSet",
            "LinkedList", "IEqualityComparer", "IComparer", "Comparer", "EqualityComparer",
            "ISet", "PriorityQueue", "KeyNotFoundException",
        ],
    ),
    (
        "System.Linq",
        &[
            "Select", "Where", "First", "FirstOrDefault", "Any", "All", "OrderBy",
            "OrderByDescending", "ThenBy", "ThenByDescending", "ToList", "ToArray",
            "ToDictionary", "ToHashSet", "ToLookup", "Count", "LongCount", "Sum", "Min", "Max",
            "MinBy", "MaxBy", "Average", "GroupBy", "SelectMany", "Distinct", "DistinctBy",
            "Skip", "SkipWhile", "Take", "TakeWhile", "Last", "LastOrDefault", "Single",
            "SingleOrDefault", "Aggregate", "Concat", "Zip", "Contains", "Enumerable", "Cast",
            "OfType", "Reverse", "Except", "Intersect", "Union", "AsEnumerable", "IQueryable",
            "Queryable", "SequenceEqual", "Chunk", "Append", "Prepend", "DefaultIfEmpty",
            "ElementAt", "ElementAtOrDefault", "Join", "GroupJoin", "ILookup", "IGrouping",
        ],
    ),
    (
        "System.Text",
        &[
            "StringBuilder", "Encoding", "Rune", "UTF8Encoding", "ASCIIEncoding",
            "UnicodeEncoding", "Decoder", "Encoder", "NormalizationForm",
        ],
    ),
    (
        "System.Threading.Tasks",
        &[
            "Task", "ValueTask", "TaskCompletionSource", "Parallel", "TaskFactory",
            "TaskScheduler", "TaskStatus", "TaskCreationOptions", "TaskCanceledException",
        ],
    ),
    (
        "System.Threading",
        &[
            "Thread", "CancellationToken", "CancellationTokenSource", "Interlocked", "Monitor",
            "Mutex", "Semaphore", "SemaphoreSlim", "Volatile", "Timer", "ManualResetEvent",
            "ManualResetEventSlim", "AutoResetEvent", "ThreadPool", "Lock",
            "ReaderWriterLockSlim", "SpinLock", "SpinWait", "Barrier", "CountdownEvent",
            "ThreadLocal", "AsyncLocal",
        ],
    ),
    (
        "System.IO",
        &[
            "File", "Directory", "Path", "Stream", "StreamReader", "StreamWriter", "FileInfo",
            "DirectoryInfo", "FileStream", "MemoryStream", "TextReader", "TextWriter",
            "StringReader", "StringWriter", "BinaryReader", "BinaryWriter", "IOException",
            "FileNotFoundException", "DirectoryNotFoundException", "FileMode", "FileAccess",
            "FileShare", "SearchOption", "FileSystemInfo", "SeekOrigin",
        ],
    ),
];

struct Occurrence {
    name: String,
    namespace: String,
}

/// Identifiers outside using directives and namespace names, each with the
/// namespace it appears in.
fn identifier_occurrences(root: Node<'_>, source: &str) -> Vec<Occurrence> {
    let mut out = Vec::new();
    let file_namespace = syntax::named_children(root)
        .into_iter()
        .find(|child| child.kind() == "file_scoped_namespace_declaration")
        .and_then(syntax::name_node)
        .map(|name| compact(node_text(name, source)))
        .unwrap_or_default();
    collect_occurrences(root, source, &file_namespace, &mut out);
    out
}

fn collect_occurrences(node: Node<'_>, source: &str, namespace: &str, out: &mut Vec<Occurrence>) {
    match node.kind() {
        "using_directive" => return,
        "identifier" => {
            out.push(Occurrence {
                name: node_text(node, source).to_string(),
                namespace: namespace.to_string(),
            });
            return;
        }
        "query_expression" => out.push(Occurrence {
            name: "Select".to_string(),
            namespace: namespace.to_string(),
        }),
        _ => {}
    }
    let name_node = if matches!(
        node.kind(),
        "namespace_declaration" | "file_scoped_namespace_declaration"
    ) {
        syntax::name_node(node)
    } else {
        None
    };
    let nested = match (node.kind(), name_node) {
        ("namespace_declaration", Some(name)) => {
            let name = compact(node_text(name, source));
            if namespace.is_empty() {
                name
            } else {
                format!("{namespace}.{name}")
            }
        }
        _ => namespace.to_string(),
    };
    for child in syntax::named_children(node) {
        if Some(child) == name_node {
            continue;
        }
        collect_occurrences(child, source, &nested, out);
    }
}

fn compact(value: &str) -> String {
    value.chars().filter(|ch| !ch.is_whitespace()).collect()
}

fn is_within_namespace(current: &str, namespace: &str) -> bool {
    current == namespace
        || current
            .strip_prefix(namespace)
            .map(|rest| rest.starts_with('.'))
            .unwrap_or(false)
}

fn unnecessary_usings(compilation: &Compilation, root: Node<'_>, source: &str) -> Vec<TextSpan> {
    let directives = syntax::descendants_of_kind(root, &["using_directive"]);
    if directives.is_empty() {
        return Vec::new();
    }
    let occurrences = identifier_occurrences(root, source);
    let names: HashSet<&str> = occurrences.iter().map(|occ| occ.name.as_str()).collect();
    let index = compilation.symbols();

    let mut seen: HashSet<(usize, (bool, bool, Option<String>, String))> = HashSet::new();
    let mut out = Vec::new();
    for node in directives {
        let directive = UsingDirective::parse(node, source);
        if directive.is_global {
            continue;
        }
        let (global, is_static, alias, name) = directive.dedup_key();
        let key = (
            node.parent().map(|parent| parent.id()).unwrap_or(0),
            (global, is_static, alias.map(str::to_string), name.to_string()),
        );
        if !seen.insert(key) {
            out.push(directive.span);
            continue;
        }

        if let Some(alias) = &directive.alias {
            if !names.contains(alias.as_str()) {
                out.push(directive.span);
            }
            continue;
        }

        if directive.is_static {
            let types = index.by_qualname(&directive.name);
            let Some(ty) = types.iter().find(|symbol| symbol.kind.is_type()) else {
                continue;
            };
            let used = index
                .members_of(&ty.qualname)
                .iter()
                .any(|member| names.contains(member.name.as_str()));
            if !used {
                out.push(directive.span);
            }
            continue;
        }

        if compilation.declares_namespace(&directive.name) {
            let type_names: BTreeSet<&str> = index
                .members_of(&directive.name)
                .into_iter()
                .filter(|symbol| symbol.kind.is_type())
                .map(|symbol| symbol.name.as_str())
                .collect();
            let needed = occurrences.iter().any(|occ| {
                type_names.contains(occ.name.as_str())
                    && !is_within_namespace(&occ.namespace, &directive.name)
            });
            if !needed {
                out.push(directive.span);
            }
            continue;
        }

        if let Some((_, known)) = FRAMEWORK_NAMESPACES
            .iter()
            .find(|(namespace, _)| *namespace == directive.name)
        {
            if !known.iter().any(|name| names.contains(name)) {
                out.push(directive.span);
            }
        }
    }
    out
}

fn misordered_modifiers(root: Node<'_>, source: &str) -> Vec<TextSpan> {
    let mut out = Vec::new();
    syntax::walk(root, &mut |node| {
        let kind = node.kind();
        if syntax::is_type_declaration(kind)
            || syntax::is_member_declaration(kind)
            || kind == "local_function_statement"
        {
            let modifiers = syntax::modifier_nodes(node);
            if let Some(span) = modifier_run_out_of_order(&modifiers, source) {
                out.push(span);
            }
        }
        true
    });
    out
}

/// Span covering a run of modifiers that is out of canonical order, if the
/// run is separated only by whitespace.
pub fn modifier_run_out_of_order(modifiers: &[Node<'_>], source: &str) -> Option<TextSpan> {
    if modifiers.len() < 2 {
        return None;
    }
    let ranks: Vec<usize> = modifiers
        .iter()
        .map(|node| modifier_rank(node_text(*node, source).trim()))
        .collect();
    if ranks.windows(2).all(|pair| pair[0] <= pair[1]) {
        return None;
    }
    let only_whitespace_between = modifiers.windows(2).all(|pair| {
        source
            .get(pair[0].end_byte()..pair[1].start_byte())
            .map(|gap| gap.chars().all(char::is_whitespace))
            .unwrap_or(false)
    });
    if !only_whitespace_between {
        return None;
    }
    let first = modifiers.first()?;
    let last = modifiers.last()?;
    Some(TextSpan::from_bounds(first.start_byte(), last.end_byte()))
}

/// Private fields that are only assigned in their initializer or in
/// constructors. Reported once per field declaration, at the first name.
fn readonly_candidates(root: Node<'_>, source: &str) -> Vec<(TextSpan, String)> {
    let mut out = Vec::new();
    for ty in syntax::descendants_of_kind(
        root,
        &["class_declaration", "struct_declaration", "record_declaration"],
    ) {
        if syntax::has_modifier(ty, source, "partial") {
            continue;
        }
        let Some(body) = ty.child_by_field_name("body").or_else(|| {
            syntax::named_children(ty)
                .into_iter()
                .find(|child| child.kind() == "declaration_list")
        }) else {
            continue;
        };
        for field in syntax::named_children(body) {
            if field.kind() != "field_declaration" || !is_readonly_eligible(field, source) {
                continue;
            }
            let Some(declaration) = syntax::variable_declaration(field) else {
                continue;
            };
            let names: Vec<Node<'_>> = syntax::declarators(declaration)
                .into_iter()
                .filter_map(declarator_name)
                .collect();
            let Some(first) = names.first() else {
                continue;
            };
            let written = names
                .iter()
                .any(|name| is_written_outside_constructor(ty, node_text(*name, source), source));
            if !written {
                out.push((span_of(*first), node_text(*first, source).to_string()));
            }
        }
    }
    out
}

fn is_readonly_eligible(field: Node<'_>, source: &str) -> bool {
    if syntax::named_children(field)
        .iter()
        .any(|child| child.kind() == "attribute_list")
    {
        return false;
    }
    let modifiers = syntax::modifier_texts(field, source);
    !modifiers.iter().any(|modifier| {
        matches!(
            modifier.as_str(),
            "public" | "protected" | "internal" | "readonly" | "const" | "volatile" | "fixed"
        )
    })
}

fn is_written_outside_constructor(ty: Node<'_>, name: &str, source: &str) -> bool {
    let mut written = false;
    syntax::walk(ty, &mut |node| {
        if written {
            return false;
        }
        let target = match node.kind() {
            "assignment_expression" => node.child_by_field_name("left").or_else(|| node.named_child(0)),
            "prefix_unary_expression" | "postfix_unary_expression" => {
                let text = node_text(node, source);
                if text.starts_with("++")
                    || text.starts_with("--")
                    || text.ends_with("++")
                    || text.ends_with("--")
                {
                    node.named_child(0)
                } else {
                    None
                }
            }
            "argument" => {
                if syntax::has_anonymous_child(node, "ref")
                    || syntax::has_anonymous_child(node, "out")
                {
                    syntax::named_children(node).into_iter().last()
                } else {
                    None
                }
            }
            _ => None,
        };
        if let Some(target) = target {
            if root_identifier(target, source) == Some(name) {
                let in_ctor = node.kind() != "argument" && inside_own_constructor(node, ty);
                if !in_ctor {
                    written = true;
                }
            }
        }
        true
    });
    written
}

/// `x`, `this.x`, `x.y.z` and `this.x[0]` all root at `x`.
fn root_identifier<'s>(node: Node<'_>, source: &'s str) -> Option<&'s str> {
    match node.kind() {
        "identifier" => Some(node_text(node, source)),
        "member_access_expression" => {
            let expr = node.child_by_field_name("expression")?;
            if matches!(expr.kind(), "this_expression" | "this") || node_text(expr, source) == "this"
            {
                node.child_by_field_name("name")
                    .map(|name| node_text(name, source))
            } else {
                root_identifier(expr, source)
            }
        }
        "element_access_expression" => node
            .child_by_field_name("expression")
            .and_then(|expr| root_identifier(expr, source)),
        "parenthesized_expression" => node
            .named_child(0)
            .and_then(|inner| root_identifier(inner, source)),
        _ => None,
    }
}

fn inside_own_constructor(node: Node<'_>, ty: Node<'_>) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        if parent.id() == ty.id() {
            return false;
        }
        if syntax::is_nested_function_node(parent.kind()) {
            return false;
        }
        if parent.kind() == "constructor_declaration" {
            return syntax::ancestor(parent, &["class_declaration", "struct_declaration", "record_declaration"])
                .map(|owner| owner.id() == ty.id())
                .unwrap_or(false);
        }
        current = parent.parent();
    }
    false
}

/// Where `readonly` goes in a field's modifier list.
pub fn readonly_insertion_point(field: Node<'_>, source: &str) -> Option<usize> {
    let readonly_rank = modifier_rank("readonly");
    let modifiers = syntax::modifier_nodes(field);
    if let Some(after) = modifiers
        .iter()
        .find(|node| modifier_rank(node_text(**node, source).trim()) > readonly_rank)
    {
        return Some(after.start_byte());
    }
    syntax::variable_declaration(field).map(|decl| decl.start_byte())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::Snapshot;

    fn diagnostics(files: &[(&str, &str)], path: &str) -> Vec<Diagnostic> {
        let mut builder = Snapshot::builder();
        for (name, text) in files {
            builder = builder.document("App", name, *text, None);
        }
        let snapshot = builder.build();
        let compilation = Compilation::build(&snapshot).unwrap();
        let doc = compilation.document(path).unwrap();
        analyze(&compilation, doc)
    }

    fn ids(diags: &[Diagnostic]) -> Vec<&str> {
        diags.iter().map(|diag| diag.id.as_str()).collect()
    }

    #[test]
    fn reports_unused_locals() {
        let source = "class A\n{\n    void M()\n    {\n        int a;\n        int b = 5;\n        int c = Compute();\n        int d = 1;\n        Use(d);\n    }\n}\n";
        let diags = diagnostics(&[("a.cs", source)], "a.cs");
        assert_eq!(ids(&diags), vec!["CS0168", "CS0219"]);
        assert_eq!(diags[0].line, 5);
        assert!(diags[1].message.contains("'b'"));
    }

    #[test]
    fn const_and_using_locals_are_ignored() {
        let source = "class A { void M() { const int a = 1; using var s = Open(); } }";
        assert!(diagnostics(&[("a.cs", source)], "a.cs").is_empty());
    }

    #[test]
    fn reports_unnecessary_usings() {
        let lib = "namespace App.Lib { public class Helper { } }\nnamespace App.Other { public class Tool { } }\n";
        let source = "using System;\nusing System.Text;\nusing App.Lib;\nusing App.Other;\nusing App.Other;\nusing X = App.Lib.Helper;\n\nclass A { Tool t; }\n";
        let diags = diagnostics(&[("lib.cs", lib), ("a.cs", source)], "a.cs");
        let lines: Vec<usize> = diags
            .iter()
            .filter(|diag| diag.id == UNNECESSARY_USING)
            .map(|diag| diag.line)
            .collect();
        assert_eq!(lines, vec![2, 3, 5, 6]);
    }

    #[test]
    fn using_of_enclosing_namespace_is_unnecessary() {
        let source = "using App.Core;\nnamespace App.Core\n{\n    class A { }\n    class B { public A Item; }\n}\n";
        let diags = diagnostics(&[("a.cs", source)], "a.cs");
        assert_eq!(ids(&diags), vec!["CS8019"]);
    }

    #[test]
    fn reports_modifier_order_and_readonly_candidates() {
        let source = "class A\n{\n    static public int X;\n    private int _seed;\n    private int _count;\n    public A(int seed) { _seed = seed; }\n    public void Bump() { _count++; }\n}\n";
        let diags = diagnostics(&[("a.cs", source)], "a.cs");
        assert_eq!(ids(&diags), vec!["IDE0036", "IDE0044"]);
        assert_eq!(diags[0].line, 3);
        assert!(diags[1].message.contains("_seed"));
    }

    #[test]
    fn partial_types_skip_readonly_analysis() {
        let source = "partial class A { private int _x; }";
        assert!(diagnostics(&[("a.cs", source)], "a.cs").is_empty());
    }

    #[test]
    fn modifier_ranks_put_partial_last() {
        assert!(modifier_rank("public") < modifier_rank("static"));
        assert!(modifier_rank("static") < modifier_rank("readonly"));
        assert!(modifier_rank("async") < modifier_rank("partial"));
    }
}
