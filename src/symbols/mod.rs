//! Symbol identity: IDs that depend only on a symbol's definition, and an
//! index that resolves them against one snapshot.

pub mod identity;

pub use identity::{is_well_formed, symbol_id};

use crate::model::{Declaration, SourceLocation, Symbol, SymbolKind};
use crate::workspace::TextSpan;
use std::collections::{BTreeMap, HashMap};

/// One declaration as seen by a language walker, before partial
/// declarations are merged.
#[derive(Debug, Clone)]
pub struct SymbolDeclaration {
    pub kind: SymbolKind,
    pub name: String,
    pub qualname: String,
    pub signature: Option<String>,
    pub container: Option<String>,
    pub parameter_count: Option<usize>,
    pub bases: Vec<String>,
    pub modifiers: Vec<String>,
    pub location: SourceLocation,
    pub extent: TextSpan,
}

impl SymbolDeclaration {
    pub fn id(&self) -> String {
        symbol_id(&self.qualname, self.signature.as_deref(), self.kind)
    }
}

#[derive(Debug, Default)]
pub struct SymbolIndex {
    symbols: BTreeMap<String, Symbol>,
    by_name: HashMap<String, Vec<String>>,
    by_qualname: HashMap<String, Vec<String>>,
}

impl SymbolIndex {
    pub fn build(declarations: impl IntoIterator<Item = SymbolDeclaration>) -> Self {
        let mut symbols: BTreeMap<String, Symbol> = BTreeMap::new();
        for decl in declarations {
            let id = decl.id();
            let entry = symbols.entry(id.clone()).or_insert_with(|| Symbol {
                id,
                kind: decl.kind,
                name: decl.name.clone(),
                qualname: decl.qualname.clone(),
                signature: decl.signature.clone(),
                container: decl.container.clone(),
                parameter_count: decl.parameter_count,
                bases: Vec::new(),
                modifiers: Vec::new(),
                declarations: Vec::new(),
            });
            for base in decl.bases {
                if !entry.bases.contains(&base) {
                    entry.bases.push(base);
                }
            }
            for modifier in decl.modifiers {
                if !entry.modifiers.contains(&modifier) {
                    entry.modifiers.push(modifier);
                }
            }
            entry.declarations.push(Declaration {
                location: decl.location,
                extent: decl.extent,
            });
        }

        let mut by_name: HashMap<String, Vec<String>> = HashMap::new();
        let mut by_qualname: HashMap<String, Vec<String>> = HashMap::new();
        for symbol in symbols.values_mut() {
            symbol
                .declarations
                .sort_by(|a, b| a.location.cmp(&b.location));
            symbol
                .declarations
                .dedup_by(|a, b| a.location == b.location);
            by_name
                .entry(symbol.name.clone())
                .or_default()
                .push(symbol.id.clone());
            by_qualname
                .entry(symbol.qualname.clone())
                .or_default()
                .push(symbol.id.clone());
        }
        Self {
            symbols,
            by_name,
            by_qualname,
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn resolve(&self, id: &str) -> Option<&Symbol> {
        self.symbols.get(id)
    }

    /// All symbols in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    /// Symbols whose simple name is `name`, ordered by qualname then ID.
    pub fn by_name(&self, name: &str) -> Vec<&Symbol> {
        self.collect(self.by_name.get(name))
    }

    pub fn by_qualname(&self, qualname: &str) -> Vec<&Symbol> {
        self.collect(self.by_qualname.get(qualname))
    }

    /// Members declared directly inside `container`.
    pub fn members_of(&self, container: &str) -> Vec<&Symbol> {
        let mut out: Vec<&Symbol> = self
            .symbols
            .values()
            .filter(|symbol| symbol.container.as_deref() == Some(container))
            .collect();
        out.sort_by(|a, b| a.qualname.cmp(&b.qualname).then_with(|| a.id.cmp(&b.id)));
        out
    }

    /// Types whose simple name (generic arity ignored) is `name`.
    pub fn types_named(&self, name: &str) -> Vec<&Symbol> {
        let mut out: Vec<&Symbol> = self
            .symbols
            .values()
            .filter(|symbol| symbol.kind.is_type() && strip_arity(&symbol.name) == name)
            .collect();
        out.sort_by(|a, b| a.qualname.cmp(&b.qualname).then_with(|| a.id.cmp(&b.id)));
        out
    }

    /// Case-insensitive search over names and qualified names. Exact name
    /// matches rank first.
    pub fn search(&self, query: &str, kind: Option<SymbolKind>, limit: usize) -> Vec<&Symbol> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let mut hits: Vec<(u8, &Symbol)> = self
            .symbols
            .values()
            .filter(|symbol| kind.map(|kind| symbol.kind == kind).unwrap_or(true))
            .filter_map(|symbol| {
                let name = strip_arity(&symbol.name).to_lowercase();
                let qualname = symbol.qualname.to_lowercase();
                if name == needle || qualname == needle {
                    Some((0, symbol))
                } else if name.starts_with(&needle) {
                    Some((1, symbol))
                } else if qualname.contains(&needle) {
                    Some((2, symbol))
                } else {
                    None
                }
            })
            .collect();
        hits.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| a.1.qualname.cmp(&b.1.qualname))
                .then_with(|| a.1.id.cmp(&b.1.id))
        });
        hits.into_iter().take(limit).map(|(_, symbol)| symbol).collect()
    }

    /// Innermost symbol of one of `kinds` whose declaration in `path`
    /// contains `offset`.
    pub fn enclosing(&self, path: &str, offset: usize, kinds: &[SymbolKind]) -> Option<&Symbol> {
        self.symbols
            .values()
            .filter(|symbol| kinds.contains(&symbol.kind))
            .filter_map(|symbol| {
                symbol
                    .declarations
                    .iter()
                    .filter(|decl| decl.location.path == path)
                    .filter(|decl| decl.extent.start <= offset && offset < decl.extent.end())
                    .map(|decl| decl.extent.length)
                    .min()
                    .map(|length| (length, symbol))
            })
            .min_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)))
            .map(|(_, symbol)| symbol)
    }

    fn collect(&self, ids: Option<&Vec<String>>) -> Vec<&Symbol> {
        let mut out: Vec<&Symbol> = ids
            .map(|ids| ids.iter().filter_map(|id| self.symbols.get(id)).collect())
            .unwrap_or_default();
        out.sort_by(|a, b| a.qualname.cmp(&b.qualname).then_with(|| a.id.cmp(&b.id)));
        out
    }
}

/// ``Repository`1`` -> `Repository`.
pub fn strip_arity(name: &str) -> &str {
    name.split('`').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(kind: SymbolKind, qualname: &str, path: &str, start: usize) -> SymbolDeclaration {
        let name = qualname.rsplit('.').next().unwrap_or(qualname).to_string();
        SymbolDeclaration {
            kind,
            name,
            qualname: qualname.to_string(),
            signature: None,
            container: qualname.rsplit_once('.').map(|(left, _)| left.to_string()),
            parameter_count: None,
            bases: Vec::new(),
            modifiers: vec!["partial".to_string()],
            location: SourceLocation {
                path: path.to_string(),
                line: 1,
                column: start + 1,
                span: TextSpan::new(start, 3),
            },
            extent: TextSpan::new(0, 40),
        }
    }

    #[test]
    fn partial_declarations_share_one_symbol() {
        let index = SymbolIndex::build(vec![
            decl(SymbolKind::Class, "App.Widget", "b.cs", 10),
            decl(SymbolKind::Class, "App.Widget", "a.cs", 4),
            decl(SymbolKind::Method, "App.Widget.Draw", "a.cs", 20),
        ]);
        assert_eq!(index.len(), 2);
        let widget = index.by_name("Widget");
        assert_eq!(widget.len(), 1);
        let widget = widget[0];
        assert_eq!(widget.declarations.len(), 2);
        assert_eq!(widget.declarations[0].location.path, "a.cs");
        assert_eq!(widget.modifiers, vec!["partial".to_string()]);
        assert_eq!(index.resolve(&widget.id).unwrap().qualname, "App.Widget");
        assert!(index.resolve("sym_0000000000000000").is_none());
        assert_eq!(index.members_of("App.Widget").len(), 1);
    }

    #[test]
    fn search_ranks_exact_matches_first() {
        let index = SymbolIndex::build(vec![
            decl(SymbolKind::Class, "App.Widget", "a.cs", 0),
            decl(SymbolKind::Class, "App.WidgetFactory", "a.cs", 0),
            decl(SymbolKind::Method, "App.Tools.MakeWidget", "a.cs", 0),
        ]);
        let names: Vec<&str> = index
            .search("widget", None, 10)
            .iter()
            .map(|symbol| symbol.qualname.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["App.Widget", "App.WidgetFactory", "App.Tools.MakeWidget"]
        );
        assert_eq!(index.search("widget", Some(SymbolKind::Method), 10).len(), 1);
    }
}
