//! Syntax-level C# code model built on tree-sitter.
//!
//! A [`Compilation`] parses every document of one snapshot once and keeps the
//! trees, the merged symbol index and (lazily) the resolved call list.
//! [`CSharpCodeModel`] caches the compilation of the most recent snapshot it
//! was asked about.

pub mod analyzers;
pub mod declarations;
pub mod fixes;
pub mod format;
pub mod imports;
pub mod navigation;
pub mod refactorings;
pub mod syntax;

use crate::codemodel::{
    BuiltinCandidate, CallSite, CallerRef, CodeModel, Diagnostic, FixProvider, ProviderRegistry,
    RefactoringProvider, registry_or_error,
};
use crate::error::{Result, ToolError};
use crate::model::{SourceLocation, Symbol, SymbolKind};
use crate::symbols::SymbolIndex;
use crate::workspace::{Document, Snapshot, TextSpan};
use navigation::ResolvedCall;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;
use tree_sitter::{Node, Tree};

pub struct ParsedDocument {
    pub path: String,
    pub project: String,
    pub text: Arc<str>,
    tree: Tree,
}

impl ParsedDocument {
    fn parse(doc: &Document) -> Result<Self> {
        let tree = syntax::parse(&doc.text)?;
        Ok(Self {
            path: doc.path.clone(),
            project: doc.project.clone(),
            text: doc.text.clone(),
            tree,
        })
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn source(&self) -> &str {
        &self.text
    }
}

pub struct Compilation {
    documents: BTreeMap<String, ParsedDocument>,
    symbols: Arc<SymbolIndex>,
    namespaces: BTreeSet<String>,
    calls: OnceLock<Vec<ResolvedCall>>,
}

impl Compilation {
    pub fn build(snapshot: &Snapshot) -> Result<Self> {
        let start = Instant::now();
        let mut documents = BTreeMap::new();
        let mut declarations = Vec::new();
        for doc in snapshot.documents() {
            let parsed = ParsedDocument::parse(doc)?;
            declarations.extend(declarations::collect(
                parsed.root(),
                &parsed.path,
                parsed.source(),
            ));
            documents.insert(parsed.path.clone(), parsed);
        }
        let symbols = SymbolIndex::build(declarations);

        let mut namespaces = BTreeSet::new();
        for symbol in symbols.iter().filter(|s| s.kind == SymbolKind::Namespace) {
            let mut prefix = String::new();
            for part in symbol.qualname.split('.') {
                if !prefix.is_empty() {
                    prefix.push('.');
                }
                prefix.push_str(part);
                namespaces.insert(prefix.clone());
            }
        }

        log::debug!(
            "compiled {} documents, {} symbols in {:?}",
            documents.len(),
            symbols.len(),
            start.elapsed()
        );
        Ok(Self {
            documents,
            symbols: Arc::new(symbols),
            namespaces,
            calls: OnceLock::new(),
        })
    }

    /// Whether this compilation was built from exactly the documents of
    /// `snapshot`.
    pub fn matches(&self, snapshot: &Snapshot) -> bool {
        self.documents.len() == snapshot.document_count()
            && snapshot.documents().all(|doc| {
                self.documents
                    .get(&doc.path)
                    .map(|parsed| Arc::ptr_eq(&parsed.text, &doc.text))
                    .unwrap_or(false)
            })
    }

    pub fn document(&self, path: &str) -> Result<&ParsedDocument> {
        self.documents
            .get(path)
            .ok_or_else(|| ToolError::invalid_input(format!("document not found: {path}")))
    }

    pub fn documents(&self) -> impl Iterator<Item = &ParsedDocument> {
        self.documents.values()
    }

    pub fn symbols(&self) -> &SymbolIndex {
        &self.symbols
    }

    /// True for declared namespaces and every dotted prefix of one.
    pub fn declares_namespace(&self, name: &str) -> bool {
        self.namespaces.contains(name)
    }

    /// Every invocation and object creation that resolves to a workspace
    /// symbol, in document then source order.
    pub fn calls(&self) -> &[ResolvedCall] {
        self.calls.get_or_init(|| navigation::resolve_all_calls(self))
    }
}

static REGISTRY: OnceLock<std::result::Result<ProviderRegistry, String>> = OnceLock::new();

fn builtin_registry() -> std::result::Result<ProviderRegistry, String> {
    let fixes: Vec<Box<dyn FixProvider>> = vec![
        Box::new(fixes::RemoveUnusedVariableCodeFixProvider),
        Box::new(fixes::RemoveUnnecessaryImportsCodeFixProvider),
        Box::new(fixes::OrderModifiersCodeFixProvider),
        Box::new(fixes::MakeFieldReadonlyCodeFixProvider),
    ];
    let refactorings: Vec<Box<dyn RefactoringProvider>> = vec![
        Box::new(refactorings::UseExplicitTypeRefactoringProvider),
        Box::new(refactorings::AddBracesRefactoringProvider),
    ];
    ProviderRegistry::new(fixes, refactorings)
}

#[derive(Default)]
pub struct CSharpCodeModel {
    cache: Mutex<Option<Arc<Compilation>>>,
}

impl CSharpCodeModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compilation for `snapshot`, reusing the cached one when the snapshot's
    /// documents are the same.
    pub fn compile(&self, snapshot: &Snapshot) -> Result<Arc<Compilation>> {
        let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(compilation) = cache.as_ref() {
            if compilation.matches(snapshot) {
                return Ok(compilation.clone());
            }
        }
        let compilation = Arc::new(Compilation::build(snapshot)?);
        *cache = Some(compilation.clone());
        Ok(compilation)
    }
}

impl CodeModel for CSharpCodeModel {
    fn diagnostics(&self, snapshot: &Snapshot, path: &str) -> Result<Vec<Diagnostic>> {
        let compilation = self.compile(snapshot)?;
        let doc = compilation.document(path)?;
        Ok(analyzers::analyze(&compilation, doc))
    }

    fn providers(&self) -> Result<&ProviderRegistry> {
        registry_or_error(REGISTRY.get_or_init(builtin_registry))
    }

    fn symbols(&self, snapshot: &Snapshot) -> Result<Arc<SymbolIndex>> {
        Ok(self.compile(snapshot)?.symbols.clone())
    }

    fn builtin_actions(
        &self,
        snapshot: &Snapshot,
        path: &str,
        span: TextSpan,
    ) -> Result<Vec<BuiltinCandidate>> {
        let compilation = self.compile(snapshot)?;
        let doc = compilation.document(path)?;
        Ok(refactorings::builtin_candidates(doc, span))
    }

    fn find_references(&self, snapshot: &Snapshot, symbol: &Symbol) -> Result<Vec<SourceLocation>> {
        let compilation = self.compile(snapshot)?;
        Ok(navigation::find_references(&compilation, symbol))
    }

    fn find_implementations(&self, snapshot: &Snapshot, symbol: &Symbol) -> Result<Vec<Symbol>> {
        let compilation = self.compile(snapshot)?;
        Ok(navigation::find_implementations(compilation.symbols(), symbol))
    }

    fn find_callers(&self, snapshot: &Snapshot, symbol: &Symbol) -> Result<Vec<CallerRef>> {
        let compilation = self.compile(snapshot)?;
        Ok(navigation::find_callers(&compilation, symbol))
    }

    fn call_sites(&self, snapshot: &Snapshot, symbol: &Symbol) -> Result<Vec<CallSite>> {
        let compilation = self.compile(snapshot)?;
        Ok(navigation::call_sites(&compilation, symbol))
    }

    fn rename_symbol(
        &self,
        snapshot: &Snapshot,
        symbol: &Symbol,
        new_name: &str,
    ) -> Result<Snapshot> {
        let compilation = self.compile(snapshot)?;
        let edits = navigation::rename_edits(&compilation, symbol, new_name)?;
        let mut next = snapshot.clone();
        for (path, edits) in edits {
            next = next.with_edits(&path, &edits)?;
        }
        Ok(next)
    }

    fn format_document(&self, snapshot: &Snapshot, path: &str) -> Result<Snapshot> {
        let compilation = self.compile(snapshot)?;
        let doc = compilation.document(path)?;
        let protected = syntax::multiline_literal_ranges(doc.root(), doc.source());
        let formatted = format::format_text(doc.source(), &protected);
        if formatted == doc.source() {
            return Ok(snapshot.clone());
        }
        snapshot.with_document_text(path, formatted)
    }

    fn organize_imports(&self, snapshot: &Snapshot, path: &str) -> Result<Snapshot> {
        let compilation = self.compile(snapshot)?;
        let doc = compilation.document(path)?;
        let edits = imports::organize_edits(doc.root(), doc.source());
        if edits.is_empty() {
            return Ok(snapshot.clone());
        }
        snapshot.with_edits(path, &edits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_compilation_for_unchanged_snapshot() {
        let snapshot = Snapshot::builder()
            .document("App", "a.cs", "namespace App.Core { class A {} }", None)
            .build();
        let model = CSharpCodeModel::new();
        let first = model.compile(&snapshot).unwrap();
        let second = model.compile(&snapshot.clone()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.declares_namespace("App"));
        assert!(first.declares_namespace("App.Core"));
        assert!(!first.declares_namespace("System"));

        let edited = snapshot
            .with_document_text("a.cs", "namespace App.Core { class B {} }")
            .unwrap();
        let third = model.compile(&edited).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.symbols().by_name("B").len(), 1);
    }

    #[test]
    fn registry_lists_builtin_providers() {
        let model = CSharpCodeModel::new();
        let registry = model.providers().unwrap();
        assert_eq!(registry.fix_providers_for("CS0219").count(), 1);
        assert!(
            registry
                .refactoring_provider("UseExplicitTypeRefactoringProvider")
                .is_some()
        );
        assert!(
            registry
                .fix_provider("MakeFieldReadonlyCodeFixProvider")
                .is_some()
        );
    }

    #[test]
    fn format_and_organize_leave_clean_documents_alone() {
        let source = "using A;\nusing B;\n\nclass C\n{\n}\n";
        let snapshot = Snapshot::builder()
            .document("App", "c.cs", source, None)
            .build();
        let model = CSharpCodeModel::new();
        let formatted = model.format_document(&snapshot, "c.cs").unwrap();
        assert_eq!(formatted.text("c.cs"), Some(source));
        let organized = model.organize_imports(&snapshot, "c.cs").unwrap();
        assert_eq!(organized.text("c.cs"), Some(source));
    }
}
