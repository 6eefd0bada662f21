use crate::codemodel::{CodeAction, Diagnostic, FixProvider};
use crate::csharp::analyzers::{self, MAKE_FIELD_READONLY, MODIFIER_ORDER, UNNECESSARY_USING};
use crate::csharp::syntax::{self, node_text};
use crate::error::{Result, ToolError};
use crate::util;
use crate::workspace::{Snapshot, TextEdit, TextSpan};

fn document_text<'s>(snapshot: &'s Snapshot, diagnostic: &Diagnostic) -> Result<&'s str> {
    snapshot
        .text(&diagnostic.path)
        .ok_or_else(|| ToolError::invalid_input(format!("document not found: {}", diagnostic.path)))
}

pub struct RemoveUnusedVariableCodeFixProvider;

impl FixProvider for RemoveUnusedVariableCodeFixProvider {
    fn type_name(&self) -> &'static str {
        "RemoveUnusedVariableCodeFixProvider"
    }

    fn fixable_diagnostic_ids(&self) -> &'static [&'static str] {
        &[analyzers::UNUSED_LOCAL_DECLARED, analyzers::UNUSED_LOCAL_ASSIGNED]
    }

    fn provide_fixes(&self, snapshot: &Snapshot, diagnostic: &Diagnostic) -> Result<Vec<CodeAction>> {
        let source = document_text(snapshot, diagnostic)?;
        let tree = syntax::parse(source)?;
        let locals = analyzers::unused_locals(tree.root_node(), source);
        let Some(local) = locals
            .iter()
            .find(|local| local.name_span == diagnostic.span && local.diagnostic_id == diagnostic.id)
        else {
            return Ok(Vec::new());
        };
        Ok(vec![CodeAction::single(
            "Remove unused variable",
            "RemoveUnusedVariable",
            &diagnostic.path,
            analyzers::remove_local_edits(source, local),
        )])
    }
}

pub struct RemoveUnnecessaryImportsCodeFixProvider;

impl FixProvider for RemoveUnnecessaryImportsCodeFixProvider {
    fn type_name(&self) -> &'static str {
        "RemoveUnnecessaryImportsCodeFixProvider"
    }

    fn fixable_diagnostic_ids(&self) -> &'static [&'static str] {
        &[UNNECESSARY_USING, "IDE0005"]
    }

    fn provide_fixes(&self, snapshot: &Snapshot, diagnostic: &Diagnostic) -> Result<Vec<CodeAction>> {
        let source = document_text(snapshot, diagnostic)?;
        let tree = syntax::parse(source)?;
        let Some(directive) = syntax::covering_node(tree.root_node(), diagnostic.span, &["using_directive"])
        else {
            return Ok(Vec::new());
        };
        let (start, end) = util::line_removal_span(source, directive.start_byte(), directive.end_byte());
        Ok(vec![CodeAction::single(
            "Remove unnecessary usings",
            "RemoveUnnecessaryImports",
            &diagnostic.path,
            vec![TextEdit::delete(TextSpan::from_bounds(start, end))],
        )])
    }
}

pub struct OrderModifiersCodeFixProvider;

impl FixProvider for OrderModifiersCodeFixProvider {
    fn type_name(&self) -> &'static str {
        "OrderModifiersCodeFixProvider"
    }

    fn fixable_diagnostic_ids(&self) -> &'static [&'static str] {
        &[MODIFIER_ORDER]
    }

    fn provide_fixes(&self, snapshot: &Snapshot, diagnostic: &Diagnostic) -> Result<Vec<CodeAction>> {
        let source = document_text(snapshot, diagnostic)?;
        let tree = syntax::parse(source)?;
        let mut owner = None;
        syntax::walk(tree.root_node(), &mut |node| {
            let modifiers = syntax::modifier_nodes(node);
            if let (Some(first), Some(last)) = (modifiers.first(), modifiers.last()) {
                if TextSpan::from_bounds(first.start_byte(), last.end_byte()) == diagnostic.span {
                    owner = Some(node);
                    return false;
                }
            }
            true
        });
        let Some(owner) = owner else {
            return Ok(Vec::new());
        };
        let modifiers = syntax::modifier_nodes(owner);
        if analyzers::modifier_run_out_of_order(&modifiers, source).is_none() {
            return Ok(Vec::new());
        }
        let mut ordered: Vec<&str> = modifiers
            .iter()
            .map(|node| node_text(*node, source).trim())
            .collect();
        ordered.sort_by_key(|modifier| analyzers::modifier_rank(modifier));
        Ok(vec![CodeAction::single(
            "Order modifiers",
            "OrderModifiers",
            &diagnostic.path,
            vec![TextEdit::replace(diagnostic.span, ordered.join(" "))],
        )])
    }
}

pub struct MakeFieldReadonlyCodeFixProvider;

impl FixProvider for MakeFieldReadonlyCodeFixProvider {
    fn type_name(&self) -> &'static str {
        "MakeFieldReadonlyCodeFixProvider"
    }

    fn fixable_diagnostic_ids(&self) -> &'static [&'static str] {
        &[MAKE_FIELD_READONLY]
    }

    fn provide_fixes(&self, snapshot: &Snapshot, diagnostic: &Diagnostic) -> Result<Vec<CodeAction>> {
        let source = document_text(snapshot, diagnostic)?;
        let tree = syntax::parse(source)?;
        let Some(field) =
            syntax::covering_node(tree.root_node(), diagnostic.span, &["field_declaration"])
        else {
            return Ok(Vec::new());
        };
        if syntax::has_modifier(field, source, "readonly") {
            return Ok(Vec::new());
        }
        let Some(at) = analyzers::readonly_insertion_point(field, source) else {
            return Ok(Vec::new());
        };
        Ok(vec![CodeAction::single(
            "Add readonly modifier",
            "MakeFieldReadonly",
            &diagnostic.path,
            vec![TextEdit::insert(at, "readonly ")],
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codemodel::Severity;

    fn snapshot(source: &str) -> Snapshot {
        Snapshot::builder()
            .document("App", "a.cs", source, None)
            .build()
    }

    fn diagnostic(id: &str, source: &str, needle: &str) -> Diagnostic {
        let start = source.find(needle).unwrap();
        Diagnostic::new(
            id,
            Severity::Warning,
            "test",
            "a.cs",
            source,
            TextSpan::new(start, needle.len()),
        )
    }

    fn apply(source: &str, provider: &dyn FixProvider, diag: &Diagnostic) -> String {
        let snap = snapshot(source);
        let fixes = provider.provide_fixes(&snap, diag).unwrap();
        assert_eq!(fixes.len(), 1);
        fixes[0].apply(&snap).unwrap().text("a.cs").unwrap().to_string()
    }

    #[test]
    fn removes_unused_variable_statement() {
        let source = "class A\n{\n    void M()\n    {\n        int unused = 3;\n        Run();\n    }\n}\n";
        let diag = diagnostic("CS0219", source, "unused");
        let fixed = apply(source, &RemoveUnusedVariableCodeFixProvider, &diag);
        assert_eq!(fixed, "class A\n{\n    void M()\n    {\n        Run();\n    }\n}\n");
    }

    #[test]
    fn removes_one_declarator_of_many() {
        let source = "class A { void M() { int a, b; Use(a); } }";
        let start = source.find("b;").unwrap();
        let diag = Diagnostic::new("CS0168", Severity::Warning, "t", "a.cs", source, TextSpan::new(start, 1));
        let fixed = apply(source, &RemoveUnusedVariableCodeFixProvider, &diag);
        assert_eq!(fixed, "class A { void M() { int a; Use(a); } }");
    }

    #[test]
    fn removes_using_line() {
        let source = "using System.Text;\nusing System;\nclass A {}\n";
        let diag = diagnostic("CS8019", source, "using System.Text;");
        let fixed = apply(source, &RemoveUnnecessaryImportsCodeFixProvider, &diag);
        assert_eq!(fixed, "using System;\nclass A {}\n");
    }

    #[test]
    fn orders_modifiers() {
        let source = "class A { static public int X; }";
        let diag = diagnostic("IDE0036", source, "static public");
        let fixed = apply(source, &OrderModifiersCodeFixProvider, &diag);
        assert_eq!(fixed, "class A { public static int X; }");
    }

    #[test]
    fn inserts_readonly_in_canonical_position() {
        let source = "class A { private static int _x = 1; }";
        let diag = diagnostic("IDE0044", source, "_x");
        let fixed = apply(source, &MakeFieldReadonlyCodeFixProvider, &diag);
        assert_eq!(fixed, "class A { private static readonly int _x = 1; }");

        let source = "class A { int _y; }";
        let diag = diagnostic("IDE0044", source, "_y");
        let fixed = apply(source, &MakeFieldReadonlyCodeFixProvider, &diag);
        assert_eq!(fixed, "class A { readonly int _y; }");
    }
}
