use crate::codemodel::{BuiltinCandidate, BuiltinKind, CodeAction, RefactoringProvider};
use crate::csharp::ParsedDocument;
use crate::csharp::analyzers;
use crate::csharp::syntax::{self, node_text, span_of};
use crate::error::{Result, ToolError};
use crate::util;
use crate::workspace::{Snapshot, TextEdit, TextSpan};
use tree_sitter::Node;

fn document_text<'s>(snapshot: &'s Snapshot, path: &str) -> Result<&'s str> {
    snapshot
        .text(path)
        .ok_or_else(|| ToolError::invalid_input(format!("document not found: {path}")))
}

fn touches(node: Node<'_>, span: TextSpan) -> bool {
    span_of(node).intersects(&span)
}

/// `var` locals whose type is apparent from the initializer.
pub struct UseExplicitTypeRefactoringProvider;

impl RefactoringProvider for UseExplicitTypeRefactoringProvider {
    fn type_name(&self) -> &'static str {
        "UseExplicitTypeRefactoringProvider"
    }

    fn provide_refactorings(
        &self,
        snapshot: &Snapshot,
        path: &str,
        span: TextSpan,
    ) -> Result<Vec<CodeAction>> {
        let source = document_text(snapshot, path)?;
        let tree = syntax::parse(source)?;
        for statement in syntax::descendants_of_kind(tree.root_node(), &["local_declaration_statement"]) {
            if !touches(statement, span) {
                continue;
            }
            let Some(declaration) = syntax::variable_declaration(statement) else {
                continue;
            };
            let Some(ty) = declaration.child_by_field_name("type") else {
                continue;
            };
            if node_text(ty, source).trim() != "var" {
                continue;
            }
            let declarators = syntax::declarators(declaration);
            let [declarator] = declarators.as_slice() else {
                continue;
            };
            let Some(explicit) = syntax::declarator_initializer(*declarator)
                .and_then(|init| apparent_type(init, source))
            else {
                continue;
            };
            return Ok(vec![CodeAction::single(
                "Use explicit type instead of 'var'",
                "UseExplicitType",
                path,
                vec![TextEdit::replace(span_of(ty), explicit)],
            )]);
        }
        Ok(Vec::new())
    }
}

fn apparent_type(init: Node<'_>, source: &str) -> Option<String> {
    if init.kind() == "object_creation_expression" {
        return init
            .child_by_field_name("type")
            .map(|ty| node_text(ty, source).trim().to_string());
    }
    syntax::literal_type(init, source).map(str::to_string)
}

/// Wraps the body of a braceless `if` in a block.
pub struct AddBracesRefactoringProvider;

impl RefactoringProvider for AddBracesRefactoringProvider {
    fn type_name(&self) -> &'static str {
        "AddBracesRefactoringProvider"
    }

    fn provide_refactorings(
        &self,
        snapshot: &Snapshot,
        path: &str,
        span: TextSpan,
    ) -> Result<Vec<CodeAction>> {
        let source = document_text(snapshot, path)?;
        let tree = syntax::parse(source)?;
        let point = TextSpan::new(span.start, 0);
        let Some(statement) = syntax::covering_node(tree.root_node(), point, &["if_statement"]) else {
            return Ok(Vec::new());
        };
        let Some(body) = statement.child_by_field_name("consequence") else {
            return Ok(Vec::new());
        };
        if body.kind() == "block" {
            return Ok(Vec::new());
        }
        let Some(close_paren) = syntax::children(statement)
            .into_iter()
            .filter(|child| child.kind() == ")" && child.end_byte() <= body.start_byte())
            .last()
        else {
            return Ok(Vec::new());
        };
        let newline = if source.contains("\r\n") { "\r\n" } else { "\n" };
        let indent = util::line_indent(source, statement.start_byte());
        let block = format!(
            "{newline}{indent}{{{newline}{indent}    {}{newline}{indent}}}",
            node_text(body, source).trim()
        );
        Ok(vec![CodeAction::single(
            "Add braces to 'if' statement",
            "AddBraces",
            path,
            vec![TextEdit::replace(
                TextSpan::from_bounds(close_paren.end_byte(), body.end_byte()),
                block,
            )],
        )])
    }
}

/// Syntax-only actions touching `span`: removal of unused locals, and
/// explicit types that can become `var`.
pub fn builtin_candidates(doc: &ParsedDocument, span: TextSpan) -> Vec<BuiltinCandidate> {
    let root = doc.root();
    let source = doc.source();
    let mut out = Vec::new();

    for local in analyzers::unused_locals(root, source) {
        if !touches(local.statement, span) {
            continue;
        }
        out.push(BuiltinCandidate {
            kind: BuiltinKind::RemoveUnusedLocal,
            diagnostic_id: Some(local.diagnostic_id.to_string()),
            span: local.name_span,
            subject: local.name.clone(),
            action: CodeAction::single(
                format!("Remove unused variable '{}'", local.name),
                BuiltinKind::RemoveUnusedLocal.as_str(),
                &doc.path,
                analyzers::remove_local_edits(source, &local),
            ),
        });
    }

    for statement in syntax::descendants_of_kind(root, &["local_declaration_statement"]) {
        if !touches(statement, span)
            || syntax::has_modifier(statement, source, "const")
            || syntax::has_anonymous_child(statement, "const")
        {
            continue;
        }
        let Some(declaration) = syntax::variable_declaration(statement) else {
            continue;
        };
        let Some(ty) = declaration.child_by_field_name("type") else {
            continue;
        };
        let declared = compact(node_text(ty, source));
        if declared == "var" {
            continue;
        }
        let declarators = syntax::declarators(declaration);
        let [declarator] = declarators.as_slice() else {
            continue;
        };
        let created = syntax::declarator_initializer(*declarator)
            .filter(|init| init.kind() == "object_creation_expression")
            .and_then(|init| init.child_by_field_name("type"))
            .map(|created| compact(node_text(created, source)));
        if created.as_deref() != Some(declared.as_str()) {
            continue;
        }
        out.push(BuiltinCandidate {
            kind: BuiltinKind::UseInferredType,
            diagnostic_id: None,
            span: span_of(ty),
            subject: declared,
            action: CodeAction::single(
                "Use 'var' instead of explicit type",
                BuiltinKind::UseInferredType.as_str(),
                &doc.path,
                vec![TextEdit::replace(span_of(ty), "var")],
            ),
        });
    }
    out
}

fn compact(text: &str) -> String {
    text.chars().filter(|ch| !ch.is_whitespace()).collect()
}
