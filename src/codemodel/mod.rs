//! Boundary to the compiler-side collaborator: diagnostics, fix and
//! refactoring providers, navigation, rename, formatting.
//!
//! The action pipeline, cleanup orchestrator and call graph engine only talk
//! to a [`CodeModel`]; [`crate::csharp::CSharpCodeModel`] is the shipped
//! implementation.

use crate::error::{Result, ToolError};
use crate::model::{SourceLocation, Symbol};
use crate::symbols::SymbolIndex;
use crate::workspace::{Snapshot, TextEdit, TextSpan};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Hidden,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub id: String,
    pub message: String,
    pub severity: Severity,
    pub path: String,
    pub span: TextSpan,
    pub line: usize,
    pub column: usize,
}

impl Diagnostic {
    pub fn new(
        id: &str,
        severity: Severity,
        message: impl Into<String>,
        path: &str,
        text: &str,
        span: TextSpan,
    ) -> Self {
        let (line, column) = crate::util::line_col(text, span.start);
        Self {
            id: id.to_string(),
            message: message.into(),
            severity,
            path: path.to_string(),
            span,
            line,
            column,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEdit {
    pub path: String,
    pub edits: Vec<TextEdit>,
}

/// A provider-produced transformation, expressed as text edits against the
/// snapshot it was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAction {
    pub title: String,
    pub equivalence_key: String,
    pub edits: Vec<DocumentEdit>,
}

impl CodeAction {
    pub fn single(
        title: impl Into<String>,
        equivalence_key: impl Into<String>,
        path: &str,
        edits: Vec<TextEdit>,
    ) -> Self {
        Self {
            title: title.into(),
            equivalence_key: equivalence_key.into(),
            edits: vec![DocumentEdit {
                path: path.to_string(),
                edits,
            }],
        }
    }

    pub fn apply(&self, snapshot: &Snapshot) -> Result<Snapshot> {
        let mut next = snapshot.clone();
        for doc in &self.edits {
            next = next.with_edits(&doc.path, &doc.edits)?;
        }
        Ok(next)
    }

    pub fn paths(&self) -> BTreeSet<&str> {
        self.edits.iter().map(|doc| doc.path.as_str()).collect()
    }
}

pub trait FixProvider: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn fixable_diagnostic_ids(&self) -> &'static [&'static str];

    fn provide_fixes(&self, snapshot: &Snapshot, diagnostic: &Diagnostic)
    -> Result<Vec<CodeAction>>;

    fn can_fix(&self, diagnostic_id: &str) -> bool {
        self.fixable_diagnostic_ids().contains(&diagnostic_id)
    }
}

pub trait RefactoringProvider: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn provide_refactorings(
        &self,
        snapshot: &Snapshot,
        path: &str,
        span: TextSpan,
    ) -> Result<Vec<CodeAction>>;
}

/// Immutable catalog of fix and refactoring providers.
pub struct ProviderRegistry {
    fixes: Vec<Box<dyn FixProvider>>,
    refactorings: Vec<Box<dyn RefactoringProvider>>,
}

impl ProviderRegistry {
    /// Build a registry. Provider type names must be unique because provider
    /// keys embedded in action tokens look providers up by name.
    pub fn new(
        fixes: Vec<Box<dyn FixProvider>>,
        refactorings: Vec<Box<dyn RefactoringProvider>>,
    ) -> std::result::Result<Self, String> {
        let mut seen = BTreeSet::new();
        for name in fixes
            .iter()
            .map(|provider| provider.type_name())
            .chain(refactorings.iter().map(|provider| provider.type_name()))
        {
            if !seen.insert(name) {
                return Err(format!("duplicate provider type name: {name}"));
            }
        }
        Ok(Self {
            fixes,
            refactorings,
        })
    }

    pub fn fix_providers(&self) -> impl Iterator<Item = &dyn FixProvider> {
        self.fixes.iter().map(|provider| provider.as_ref())
    }

    pub fn fix_providers_for<'a>(
        &'a self,
        diagnostic_id: &'a str,
    ) -> impl Iterator<Item = &'a dyn FixProvider> + 'a {
        self.fix_providers()
            .filter(move |provider| provider.can_fix(diagnostic_id))
    }

    pub fn refactoring_providers(&self) -> impl Iterator<Item = &dyn RefactoringProvider> {
        self.refactorings.iter().map(|provider| provider.as_ref())
    }

    pub fn fix_provider(&self, type_name: &str) -> Option<&dyn FixProvider> {
        self.fix_providers()
            .find(|provider| provider.type_name() == type_name)
    }

    pub fn refactoring_provider(&self, type_name: &str) -> Option<&dyn RefactoringProvider> {
        self.refactoring_providers()
            .find(|provider| provider.type_name() == type_name)
    }
}

/// Resolve a lazily-built registry slot, turning an init failure into data.
pub fn registry_or_error(
    slot: &'static std::result::Result<ProviderRegistry, String>,
) -> Result<&'static ProviderRegistry> {
    slot.as_ref()
        .map_err(|err| ToolError::internal(format!("provider registry failed to load: {err}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuiltinKind {
    RemoveUnusedLocal,
    UseInferredType,
}

impl BuiltinKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BuiltinKind::RemoveUnusedLocal => "remove-unused-local",
            BuiltinKind::UseInferredType => "use-inferred-type",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "remove-unused-local" => Some(BuiltinKind::RemoveUnusedLocal),
            "use-inferred-type" => Some(BuiltinKind::UseInferredType),
            _ => None,
        }
    }
}

/// A syntax-level action computed without going through the provider
/// registry.
#[derive(Debug, Clone)]
pub struct BuiltinCandidate {
    pub kind: BuiltinKind,
    pub diagnostic_id: Option<String>,
    pub span: TextSpan,
    /// Name of the local or type the action is about.
    pub subject: String,
    pub action: CodeAction,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct CallerRef {
    pub caller: String,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct CallSite {
    pub callee: String,
    pub location: SourceLocation,
}

pub trait CodeModel: Send + Sync {
    /// Diagnostics for one document, ordered by span then ID.
    fn diagnostics(&self, snapshot: &Snapshot, path: &str) -> Result<Vec<Diagnostic>>;

    fn providers(&self) -> Result<&ProviderRegistry>;

    fn symbols(&self, snapshot: &Snapshot) -> Result<Arc<SymbolIndex>>;

    fn builtin_actions(
        &self,
        snapshot: &Snapshot,
        path: &str,
        span: TextSpan,
    ) -> Result<Vec<BuiltinCandidate>>;

    fn find_references(&self, snapshot: &Snapshot, symbol: &Symbol) -> Result<Vec<SourceLocation>>;

    fn find_implementations(&self, snapshot: &Snapshot, symbol: &Symbol) -> Result<Vec<Symbol>>;

    /// Call sites of `symbol`, each attributed to the member containing it.
    fn find_callers(&self, snapshot: &Snapshot, symbol: &Symbol) -> Result<Vec<CallerRef>>;

    /// Invocations and object creations inside `symbol`'s own declarations,
    /// resolved to callee symbols.
    fn call_sites(&self, snapshot: &Snapshot, symbol: &Symbol) -> Result<Vec<CallSite>>;

    fn rename_symbol(&self, snapshot: &Snapshot, symbol: &Symbol, new_name: &str)
    -> Result<Snapshot>;

    fn format_document(&self, snapshot: &Snapshot, path: &str) -> Result<Snapshot>;

    fn organize_imports(&self, snapshot: &Snapshot, path: &str) -> Result<Snapshot>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl RefactoringProvider for Named {
        fn type_name(&self) -> &'static str {
            self.0
        }

        fn provide_refactorings(
            &self,
            _snapshot: &Snapshot,
            _path: &str,
            _span: TextSpan,
        ) -> Result<Vec<CodeAction>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn registry_rejects_duplicate_type_names() {
        let err = ProviderRegistry::new(Vec::new(), vec![Box::new(Named("A")), Box::new(Named("A"))])
            .err()
            .unwrap();
        assert!(err.contains("duplicate"));
        let ok = ProviderRegistry::new(Vec::new(), vec![Box::new(Named("A")), Box::new(Named("B"))])
            .unwrap();
        assert!(ok.refactoring_provider("B").is_some());
        assert!(ok.fix_provider("B").is_none());
    }

    #[test]
    fn code_action_applies_across_documents() {
        let snapshot = Snapshot::builder()
            .document("P", "a.cs", "int a;", None)
            .document("P", "b.cs", "int b;", None)
            .build();
        let action = CodeAction {
            title: "t".to_string(),
            equivalence_key: "k".to_string(),
            edits: vec![
                DocumentEdit {
                    path: "a.cs".to_string(),
                    edits: vec![TextEdit::replace(TextSpan::new(0, 3), "long")],
                },
                DocumentEdit {
                    path: "b.cs".to_string(),
                    edits: vec![TextEdit::replace(TextSpan::new(0, 3), "long")],
                },
            ],
        };
        let next = action.apply(&snapshot).unwrap();
        assert_eq!(next.text("a.cs"), Some("long a;"));
        assert_eq!(next.text("b.cs"), Some("long b;"));
        assert_eq!(snapshot.text("a.cs"), Some("int a;"));
    }
}
