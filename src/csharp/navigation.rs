//! Name resolution good enough for navigation: calls, references,
//! implementations and rename.
//!
//! Resolution is syntactic. A receiver's type is taken from the declared type
//! of a local, parameter, field or property, or from a `new T()` expression;
//! anything else is either outside the workspace (no edge) or untyped, in
//! which case a call only resolves when exactly one workspace method fits.

use crate::codemodel::{CallSite, CallerRef};
use crate::csharp::analyzers;
use crate::csharp::imports::UsingDirective;
use crate::csharp::syntax::{self, node_text, span_of};
use crate::csharp::{Compilation, ParsedDocument};
use crate::error::{Result, ToolError};
use crate::model::{SourceLocation, Symbol, SymbolKind};
use crate::symbols::identity::{simple_type_name, type_argument_count};
use crate::symbols::{SymbolIndex, strip_arity};
use crate::util;
use crate::workspace::{TextEdit, TextSpan};
use std::collections::{BTreeMap, HashSet, VecDeque};
use tree_sitter::Node;

/// An invocation or object creation resolved to a workspace symbol.
#[derive(Debug, Clone)]
pub struct ResolvedCall {
    pub callee: String,
    pub path: String,
    /// Whole invocation or creation expression.
    pub span: TextSpan,
    /// Location of the identifier naming the callee.
    pub location: SourceLocation,
}

const TYPE_KINDS: &[SymbolKind] = &[
    SymbolKind::Class,
    SymbolKind::Struct,
    SymbolKind::Interface,
    SymbolKind::Record,
    SymbolKind::Enum,
];

const CALLER_KINDS: &[SymbolKind] = &[
    SymbolKind::Method,
    SymbolKind::Constructor,
    SymbolKind::Property,
    SymbolKind::Field,
];

const CALL_KINDS: &[&str] = &["invocation_expression", "object_creation_expression"];

const SCOPE_KINDS: &[&str] = &[
    "method_declaration",
    "constructor_declaration",
    "property_declaration",
    "local_function_statement",
    "global_statement",
];

enum Receiver<'c> {
    /// No receiver, `this` or `base`.
    Implicit,
    Types(Vec<&'c Symbol>),
    External,
    Untyped,
}

struct Resolver<'c> {
    compilation: &'c Compilation,
    index: &'c SymbolIndex,
    doc: &'c ParsedDocument,
}

impl<'c> Resolver<'c> {
    fn new(compilation: &'c Compilation, doc: &'c ParsedDocument) -> Self {
        Self {
            compilation,
            index: compilation.symbols(),
            doc,
        }
    }

    fn text(&self, node: Node<'_>) -> &'c str {
        node_text(node, self.doc.source()).trim()
    }

    fn resolve_call(&self, node: Node<'_>) -> Option<(&'c Symbol, TextSpan)> {
        match node.kind() {
            "invocation_expression" => self.resolve_invocation(node),
            "object_creation_expression" => self.resolve_creation(node),
            _ => None,
        }
    }

    fn resolve_invocation(&self, node: Node<'_>) -> Option<(&'c Symbol, TextSpan)> {
        let function = node.child_by_field_name("function")?;
        let (name_node, receiver) = match function.kind() {
            "identifier" | "generic_name" => (syntax::simple_name_identifier(function)?, None),
            "member_access_expression" => (
                syntax::simple_name_identifier(function.child_by_field_name("name")?)?,
                function.child_by_field_name("expression"),
            ),
            _ => return None,
        };
        let name = self.text(name_node);
        let candidates: Vec<&Symbol> = self
            .index
            .by_name(name)
            .into_iter()
            .filter(|symbol| symbol.kind == SymbolKind::Method)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let receiver = match receiver {
            Some(expr) => self.receiver(expr),
            None => Receiver::Implicit,
        };
        let args = syntax::argument_count(node);
        let callee = match receiver {
            Receiver::Implicit => pick(candidates, &self.implicit_chain(node.start_byte()), args),
            Receiver::Types(types) => pick(candidates, &self.type_chain(types, false), args),
            Receiver::External => None,
            Receiver::Untyped => {
                let fitting = filter_arity(candidates, args);
                if fitting.len() == 1 { fitting.first().copied() } else { None }
            }
        }?;
        Some((callee, span_of(name_node)))
    }

    fn resolve_creation(&self, node: Node<'_>) -> Option<(&'c Symbol, TextSpan)> {
        let ty = node.child_by_field_name("type")?;
        let name_node = syntax::simple_name_identifier(ty)?;
        let ty = self.types_for(self.text(ty)).into_iter().next()?;
        let args = syntax::argument_count(node);
        let ctor = self
            .index
            .members_of(&ty.qualname)
            .into_iter()
            .find(|member| member.kind == SymbolKind::Constructor && member.parameter_count == Some(args));
        Some((ctor.unwrap_or(ty), span_of(name_node)))
    }

    /// Workspace types a type reference can name, same-arity definitions
    /// first.
    fn types_for(&self, raw: &str) -> Vec<&'c Symbol> {
        let simple = simple_type_name(raw);
        if simple.is_empty() || simple == "var" {
            return Vec::new();
        }
        let arity = type_argument_count(raw);
        let mut types = self.index.types_named(simple);
        types.sort_by_key(|ty| arity_of(ty) != arity);
        types
    }

    fn receiver(&self, expr: Node<'_>) -> Receiver<'c> {
        let text = self.text(expr);
        if text == "this" || text == "base" {
            return Receiver::Implicit;
        }
        match expr.kind() {
            "identifier" => self.identifier_receiver(expr, text),
            "object_creation_expression" => expr
                .child_by_field_name("type")
                .map(|ty| self.receiver_of_type(self.text(ty)))
                .unwrap_or(Receiver::Untyped),
            "parenthesized_expression" => syntax::named_children(expr)
                .into_iter()
                .next()
                .map(|inner| self.receiver(inner))
                .unwrap_or(Receiver::Untyped),
            "member_access_expression" => {
                let qualifier = expr
                    .child_by_field_name("expression")
                    .map(|inner| self.text(inner))
                    .unwrap_or_default();
                let Some(name) = expr.child_by_field_name("name") else {
                    return Receiver::Untyped;
                };
                if qualifier != "this" && qualifier != "base" {
                    return Receiver::Untyped;
                }
                let chain = self.implicit_chain(expr.start_byte());
                self.member_in_chain(self.text(name), &chain)
                    .and_then(|member| self.declared_type_of(member))
                    .map(|ty| self.receiver_of_type(&ty))
                    .unwrap_or(Receiver::Untyped)
            }
            "predefined_type" => Receiver::External,
            _ => Receiver::Untyped,
        }
    }

    fn receiver_of_type(&self, raw: &str) -> Receiver<'c> {
        let types = self.types_for(raw);
        if types.is_empty() {
            Receiver::External
        } else {
            Receiver::Types(types)
        }
    }

    fn identifier_receiver(&self, node: Node<'_>, name: &str) -> Receiver<'c> {
        if let Some(declared) = self.local_type(node, name) {
            return match declared {
                Some(ty) => self.receiver_of_type(&ty),
                None => Receiver::Untyped,
            };
        }
        let chain = self.implicit_chain(node.start_byte());
        if let Some(member) = self.member_in_chain(name, &chain) {
            return self
                .declared_type_of(member)
                .map(|ty| self.receiver_of_type(&ty))
                .unwrap_or(Receiver::Untyped);
        }
        let types = self.index.types_named(name);
        if types.is_empty() {
            Receiver::External
        } else {
            Receiver::Types(types)
        }
    }

    /// Type of a local or parameter named `name` visible from `node`.
    /// `Some(None)` means the name is a local but its type is not apparent.
    fn local_type(&self, node: Node<'_>, name: &str) -> Option<Option<String>> {
        let scope = syntax::ancestor(node, SCOPE_KINDS)?;
        let mut found: Option<Option<String>> = None;
        syntax::walk(scope, &mut |current| {
            if current.start_byte() > node.start_byte() {
                return false;
            }
            match current.kind() {
                "parameter" => {
                    if syntax::name_node(current).map(|n| self.text(n)) == Some(name) {
                        found = Some(
                            current
                                .child_by_field_name("type")
                                .map(|ty| self.text(ty).to_string()),
                        );
                    }
                }
                "variable_declaration" => {
                    let declared = current
                        .child_by_field_name("type")
                        .map(|ty| self.text(ty))
                        .unwrap_or("var");
                    for declarator in syntax::declarators(current) {
                        let Some(id) = analyzers::declarator_name(declarator) else {
                            continue;
                        };
                        if self.text(id) != name {
                            continue;
                        }
                        found = Some(if declared == "var" {
                            syntax::declarator_initializer(declarator)
                                .filter(|init| init.kind() == "object_creation_expression")
                                .and_then(|init| init.child_by_field_name("type"))
                                .map(|ty| self.text(ty).to_string())
                        } else {
                            Some(declared.to_string())
                        });
                    }
                }
                "foreach_statement" => {
                    let left = current.child_by_field_name("left").map(|n| self.text(n));
                    if left == Some(name) {
                        found = Some(
                            current
                                .child_by_field_name("type")
                                .map(|ty| self.text(ty))
                                .filter(|ty| *ty != "var")
                                .map(str::to_string),
                        );
                    }
                }
                _ => {}
            }
            true
        });
        found
    }

    /// Enclosing type, its bases and its outer types, nearest first.
    fn implicit_chain(&self, offset: usize) -> Vec<&'c Symbol> {
        match self.index.enclosing(&self.doc.path, offset, TYPE_KINDS) {
            Some(ty) => self.type_chain(vec![ty], true),
            None => Vec::new(),
        }
    }

    fn type_chain(&self, start: Vec<&'c Symbol>, include_outer: bool) -> Vec<&'c Symbol> {
        type_chain(self.index, start, include_outer)
    }

    fn member_in_chain(&self, name: &str, chain: &[&'c Symbol]) -> Option<&'c Symbol> {
        let candidates: Vec<&Symbol> = self
            .index
            .by_name(name)
            .into_iter()
            .filter(|symbol| matches!(symbol.kind, SymbolKind::Field | SymbolKind::Property))
            .collect();
        ranked_by_chain(candidates, chain)
            .into_iter()
            .next()
            .map(|(_, symbol)| symbol)
    }

    /// Declared type of a field or property, read back from its declaration.
    fn declared_type_of(&self, member: &Symbol) -> Option<String> {
        let decl = member.declarations.first()?;
        let doc = self.compilation.document(&decl.location.path).ok()?;
        let node = syntax::covering_node(
            doc.root(),
            decl.extent,
            &["field_declaration", "property_declaration"],
        )?;
        let ty = match node.kind() {
            "field_declaration" => syntax::variable_declaration(node)?.child_by_field_name("type")?,
            _ => node.child_by_field_name("type")?,
        };
        Some(node_text(ty, doc.source()).trim().to_string())
    }

    /// Field or property an identifier refers to, if any.
    fn resolve_member_reference(&self, node: Node<'_>, name: &str) -> Option<&'c Symbol> {
        let parent = node.parent()?;
        if parent.kind() == "member_access_expression"
            && parent.child_by_field_name("name").map(|n| n.id()) == Some(node.id())
        {
            let expr = parent.child_by_field_name("expression")?;
            return match self.receiver(expr) {
                Receiver::Implicit => self.member_in_chain(name, &self.implicit_chain(node.start_byte())),
                Receiver::Types(types) => self.member_in_chain(name, &self.type_chain(types, false)),
                Receiver::External | Receiver::Untyped => None,
            };
        }
        if let Some(created) = initializer_target(node, parent) {
            let types = self.types_for(self.text(created));
            return self.member_in_chain(name, &self.type_chain(types, false));
        }
        if self.local_type(node, name).is_some() {
            return None;
        }
        self.member_in_chain(name, &self.implicit_chain(node.start_byte()))
    }
}

/// Type named by the `new T { Name = ... }` whose initializer assigns
/// `node`.
fn initializer_target<'t>(node: Node<'t>, parent: Node<'t>) -> Option<Node<'t>> {
    if parent.kind() != "assignment_expression"
        || parent.child_by_field_name("left").map(|n| n.id()) != Some(node.id())
    {
        return None;
    }
    let initializer = parent.parent().filter(|n| n.kind() == "initializer_expression")?;
    let creation = initializer
        .parent()
        .filter(|n| n.kind() == "object_creation_expression")?;
    creation.child_by_field_name("type")
}

/// Breadth-first walk over base types (and outer types when asked), each
/// type once, nearest first.
pub fn type_chain<'c>(
    index: &'c SymbolIndex,
    start: Vec<&'c Symbol>,
    include_outer: bool,
) -> Vec<&'c Symbol> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut queue: VecDeque<&Symbol> = start.into_iter().collect();
    while let Some(ty) = queue.pop_front() {
        if !seen.insert(ty.id.as_str()) {
            continue;
        }
        out.push(ty);
        for base in &ty.bases {
            queue.extend(index.types_named(simple_type_name(base)));
        }
        if include_outer {
            if let Some(container) = ty.container.as_deref() {
                queue.extend(
                    index
                        .by_qualname(container)
                        .into_iter()
                        .filter(|outer| outer.kind.is_type()),
                );
            }
        }
    }
    out
}

fn arity_of(symbol: &Symbol) -> usize {
    symbol
        .qualname
        .rsplit_once('`')
        .and_then(|(_, arity)| arity.parse().ok())
        .unwrap_or(0)
}

fn ranked_by_chain<'c>(candidates: Vec<&'c Symbol>, chain: &[&Symbol]) -> Vec<(usize, &'c Symbol)> {
    let mut ranked: Vec<(usize, &Symbol)> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let container = candidate.container.as_deref()?;
            chain
                .iter()
                .position(|ty| ty.qualname == container)
                .map(|rank| (rank, candidate))
        })
        .collect();
    ranked.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| a.1.qualname.cmp(&b.1.qualname))
            .then_with(|| a.1.id.cmp(&b.1.id))
    });
    ranked
}

fn filter_arity(candidates: Vec<&Symbol>, args: usize) -> Vec<&Symbol> {
    let fitting: Vec<&Symbol> = candidates
        .iter()
        .copied()
        .filter(|candidate| candidate.parameter_count == Some(args))
        .collect();
    if fitting.is_empty() { candidates } else { fitting }
}

fn pick<'c>(candidates: Vec<&'c Symbol>, chain: &[&Symbol], args: usize) -> Option<&'c Symbol> {
    let in_chain: Vec<&Symbol> = ranked_by_chain(candidates, chain)
        .into_iter()
        .map(|(_, symbol)| symbol)
        .collect();
    // ranked order survives the arity filter
    filter_arity(in_chain, args).into_iter().next()
}

pub fn resolve_all_calls(compilation: &Compilation) -> Vec<ResolvedCall> {
    let mut out = Vec::new();
    for doc in compilation.documents() {
        let resolver = Resolver::new(compilation, doc);
        for node in syntax::descendants_of_kind(doc.root(), CALL_KINDS) {
            let Some((callee, name_span)) = resolver.resolve_call(node) else {
                continue;
            };
            out.push(ResolvedCall {
                callee: callee.id.clone(),
                path: doc.path.clone(),
                span: span_of(node),
                location: SourceLocation::new(&doc.path, doc.source(), name_span),
            });
        }
    }
    out
}

fn is_declaration_name(node: Node<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    let declares = syntax::is_type_declaration(parent.kind())
        || syntax::is_member_declaration(parent.kind())
        || matches!(
            parent.kind(),
            "variable_declarator" | "parameter" | "namespace_declaration" | "type_parameter"
        );
    declares && syntax::name_node(parent).map(|n| n.id()) == Some(node.id())
}

pub fn find_references(compilation: &Compilation, symbol: &Symbol) -> Vec<SourceLocation> {
    let mut out: Vec<SourceLocation> = match symbol.kind {
        SymbolKind::Method | SymbolKind::Constructor => compilation
            .calls()
            .iter()
            .filter(|call| call.callee == symbol.id)
            .map(|call| call.location.clone())
            .collect(),
        SymbolKind::Namespace => namespace_references(compilation, symbol),
        SymbolKind::Field | SymbolKind::Property => identifier_references(compilation, symbol, |resolver, node, name| {
            resolver
                .resolve_member_reference(node, name)
                .map(|member| member.id == symbol.id)
                .unwrap_or(false)
        }),
        _ => {
            let index = compilation.symbols();
            identifier_references(compilation, symbol, |_, _, name| {
                index.types_named(name).iter().any(|ty| ty.id == symbol.id)
            })
        }
    };
    out.sort();
    out.dedup();
    out
}

fn identifier_references(
    compilation: &Compilation,
    symbol: &Symbol,
    refers: impl Fn(&Resolver<'_>, Node<'_>, &str) -> bool,
) -> Vec<SourceLocation> {
    let name = strip_arity(&symbol.name);
    let mut out = Vec::new();
    for doc in compilation.documents() {
        if !doc.source().contains(name) {
            continue;
        }
        let resolver = Resolver::new(compilation, doc);
        for node in syntax::descendants_of_kind(doc.root(), &["identifier"]) {
            if resolver.text(node) != name || is_declaration_name(node) {
                continue;
            }
            if refers(&resolver, node, name) {
                out.push(SourceLocation::new(&doc.path, doc.source(), span_of(node)));
            }
        }
    }
    out
}

fn namespace_references(compilation: &Compilation, symbol: &Symbol) -> Vec<SourceLocation> {
    let mut out = Vec::new();
    for doc in compilation.documents() {
        for node in syntax::descendants_of_kind(doc.root(), &["using_directive"]) {
            let directive = UsingDirective::parse(node, doc.source());
            if directive.alias.is_none() && !directive.is_static && directive.name == symbol.qualname {
                out.push(SourceLocation::new(&doc.path, doc.source(), directive.span));
            }
        }
    }
    out
}

fn derives_from(index: &SymbolIndex, ty: &Symbol, base: &Symbol) -> bool {
    ty.id != base.id
        && type_chain(index, vec![ty], false)
            .iter()
            .any(|ancestor| ancestor.id == base.id)
}

/// Types deriving from `symbol` (transitively), or members overriding or
/// implementing it.
pub fn find_implementations(index: &SymbolIndex, symbol: &Symbol) -> Vec<Symbol> {
    let mut out: Vec<Symbol> = if symbol.kind.is_type() {
        index
            .iter()
            .filter(|ty| ty.kind.is_type() && derives_from(index, ty, symbol))
            .cloned()
            .collect()
    } else if matches!(symbol.kind, SymbolKind::Method | SymbolKind::Property) {
        let Some(container) = symbol
            .container
            .as_deref()
            .and_then(|qualname| index.by_qualname(qualname).into_iter().find(|s| s.kind.is_type()))
        else {
            return Vec::new();
        };
        let overridable = container.kind == SymbolKind::Interface
            || symbol.has_modifier("abstract")
            || symbol.has_modifier("virtual");
        if !overridable {
            return Vec::new();
        }
        index
            .iter()
            .filter(|ty| ty.kind.is_type() && derives_from(index, ty, container))
            .flat_map(|ty| index.members_of(&ty.qualname))
            .filter(|member| {
                member.kind == symbol.kind
                    && member.name == symbol.name
                    && member.signature == symbol.signature
            })
            .cloned()
            .collect()
    } else {
        Vec::new()
    };
    out.sort_by(|a, b| a.qualname.cmp(&b.qualname).then_with(|| a.id.cmp(&b.id)));
    out.dedup_by(|a, b| a.id == b.id);
    out
}

pub fn find_callers(compilation: &Compilation, symbol: &Symbol) -> Vec<CallerRef> {
    let index = compilation.symbols();
    let mut out: Vec<CallerRef> = compilation
        .calls()
        .iter()
        .filter(|call| call.callee == symbol.id)
        .filter_map(|call| {
            let caller = index.enclosing(&call.path, call.span.start, CALLER_KINDS)?;
            Some(CallerRef {
                caller: caller.id.clone(),
                location: call.location.clone(),
            })
        })
        .collect();
    out.sort();
    out.dedup();
    out
}

pub fn call_sites(compilation: &Compilation, symbol: &Symbol) -> Vec<CallSite> {
    let mut out: Vec<CallSite> = compilation
        .calls()
        .iter()
        .filter(|call| {
            symbol
                .declarations
                .iter()
                .any(|decl| decl.location.path == call.path && decl.extent.contains(&call.span))
        })
        .map(|call| CallSite {
            callee: call.callee.clone(),
            location: call.location.clone(),
        })
        .collect();
    out.sort();
    out.dedup();
    out
}

/// Per-document edits renaming `symbol`: its declarations, every reference,
/// and for a type the names of its constructors.
pub fn rename_edits(
    compilation: &Compilation,
    symbol: &Symbol,
    new_name: &str,
) -> Result<BTreeMap<String, Vec<TextEdit>>> {
    if !util::is_valid_identifier(new_name) {
        return Err(ToolError::invalid_input(format!(
            "not a valid identifier: {new_name}"
        )));
    }
    match symbol.kind {
        SymbolKind::Namespace => {
            return Err(ToolError::invalid_input("namespaces cannot be renamed"));
        }
        SymbolKind::Constructor => {
            return Err(ToolError::invalid_input(
                "rename the containing type to rename a constructor",
            ));
        }
        _ => {}
    }

    let mut locations: Vec<SourceLocation> = symbol
        .declarations
        .iter()
        .map(|decl| decl.location.clone())
        .collect();
    locations.extend(find_references(compilation, symbol));
    if symbol.kind.is_type() {
        for ctor in compilation
            .symbols()
            .members_of(&symbol.qualname)
            .into_iter()
            .filter(|member| member.kind == SymbolKind::Constructor)
        {
            locations.extend(ctor.declarations.iter().map(|decl| decl.location.clone()));
        }
    }

    let mut by_path: BTreeMap<String, Vec<TextSpan>> = BTreeMap::new();
    for location in locations {
        by_path.entry(location.path).or_default().push(location.span);
    }
    Ok(by_path
        .into_iter()
        .map(|(path, mut spans)| {
            spans.sort();
            spans.dedup();
            let edits = spans
                .into_iter()
                .map(|span| TextEdit::replace(span, new_name))
                .collect();
            (path, edits)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::Snapshot;

    const SERVICE: &str = r#"namespace App
{
    public interface IStore
    {
        void Save(int id);
    }

    public class Store : IStore
    {
        public void Save(int id) { Log(id); }
        private void Log(int id) { }
    }

    public class Service
    {
        private readonly IStore _store;
        public int Count { get; set; }

        public Service(IStore store) { _store = store; }

        public void Run()
        {
            var helper = new Helper();
            helper.Assist();
            _store.Save(1);
            Count = Count + 1;
            System.Console.WriteLine("done");
        }
    }

    public class Helper
    {
        public void Assist() { }
    }
}
"#;

    fn compile(source: &str) -> Compilation {
        let snapshot = Snapshot::builder()
            .document("App", "Service.cs", source, None)
            .build();
        Compilation::build(&snapshot).unwrap()
    }

    fn symbol<'c>(compilation: &'c Compilation, qualname: &str) -> &'c Symbol {
        compilation.symbols().by_qualname(qualname)[0]
    }

    #[test]
    fn resolves_calls_through_declared_types() {
        let compilation = compile(SERVICE);
        let run = symbol(&compilation, "App.Service.Run");
        let mut callees: Vec<String> = call_sites(&compilation, run)
            .into_iter()
            .map(|site| compilation.symbols().resolve(&site.callee).unwrap().qualname.clone())
            .collect();
        callees.sort();
        assert_eq!(
            callees,
            vec!["App.Helper", "App.Helper.Assist", "App.IStore.Save"]
        );
    }

    #[test]
    fn callers_are_enclosing_members() {
        let compilation = compile(SERVICE);
        let log = symbol(&compilation, "App.Store.Log");
        let callers = find_callers(&compilation, log);
        assert_eq!(callers.len(), 1);
        assert_eq!(callers[0].caller, symbol(&compilation, "App.Store.Save").id);
        assert_eq!(callers[0].location.line, 10);
    }

    #[test]
    fn implementations_follow_bases() {
        let compilation = compile(SERVICE);
        let index = compilation.symbols();
        let store = symbol(&compilation, "App.IStore");
        let impls = find_implementations(index, store);
        assert_eq!(impls.len(), 1);
        assert_eq!(impls[0].qualname, "App.Store");

        let save = symbol(&compilation, "App.IStore.Save");
        let impls = find_implementations(index, save);
        assert_eq!(impls.len(), 1);
        assert_eq!(impls[0].qualname, "App.Store.Save");
    }

    #[test]
    fn property_references_skip_declarations() {
        let compilation = compile(SERVICE);
        let count = symbol(&compilation, "App.Service.Count");
        let refs = find_references(&compilation, count);
        assert_eq!(refs.len(), 2);
        assert!(refs.iter().all(|loc| loc.line == 26));
    }

    #[test]
    fn rename_type_updates_constructor_and_creations() {
        let source = "class Box\n{\n    public Box() { }\n    static Box Make() { return new Box(); }\n}\n";
        let compilation = compile(source);
        let ty = symbol(&compilation, "Box");
        let edits = rename_edits(&compilation, ty, "Crate").unwrap();
        let renamed = crate::workspace::apply_edits(source, &edits["Service.cs"]).unwrap();
        assert_eq!(
            renamed,
            "class Crate\n{\n    public Crate() { }\n    static Crate Make() { return new Crate(); }\n}\n"
        );
        assert!(rename_edits(&compilation, ty, "1bad").is_err());
    }
}
