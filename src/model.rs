use crate::workspace::{TextSpan, WorkspaceVersion};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Namespace,
    Class,
    Struct,
    Interface,
    Record,
    Enum,
    Method,
    Constructor,
    Property,
    Field,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Namespace => "namespace",
            SymbolKind::Class => "class",
            SymbolKind::Struct => "struct",
            SymbolKind::Interface => "interface",
            SymbolKind::Record => "record",
            SymbolKind::Enum => "enum",
            SymbolKind::Method => "method",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Property => "property",
            SymbolKind::Field => "field",
        }
    }

    pub fn is_type(self) -> bool {
        matches!(
            self,
            SymbolKind::Class
                | SymbolKind::Struct
                | SymbolKind::Interface
                | SymbolKind::Record
                | SymbolKind::Enum
        )
    }

    pub fn is_callable(self) -> bool {
        matches!(self, SymbolKind::Method | SymbolKind::Constructor)
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A position in one document: 1-based line/column plus the byte span.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SourceLocation {
    pub path: String,
    pub line: usize,
    pub column: usize,
    #[serde(flatten)]
    pub span: TextSpan,
}

impl SourceLocation {
    pub fn new(path: &str, text: &str, span: TextSpan) -> Self {
        let (line, column) = crate::util::line_col(text, span.start);
        Self {
            path: path.to_string(),
            line,
            column,
            span,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.path, self.line, self.column)
    }
}

/// One declaration site of a symbol. Partial types and methods have several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    #[serde(flatten)]
    pub location: SourceLocation,
    /// Span of the whole declaration, not just its name.
    pub extent: TextSpan,
}

#[derive(Debug, Clone, Serialize)]
pub struct Symbol {
    pub id: String,
    pub kind: SymbolKind,
    pub name: String,
    pub qualname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_count: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<String>,
    pub declarations: Vec<Declaration>,
}

impl Symbol {
    pub fn primary_location(&self) -> Option<&SourceLocation> {
        self.declarations.first().map(|decl| &decl.location)
    }

    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|value| value == modifier)
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct SymbolCompact {
    pub id: String,
    pub kind: SymbolKind,
    pub name: String,
    pub qualname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl From<&Symbol> for SymbolCompact {
    fn from(s: &Symbol) -> Self {
        let location = s.primary_location();
        SymbolCompact {
            id: s.id.clone(),
            kind: s.kind,
            name: s.name.clone(),
            qualname: s.qualname.clone(),
            path: location.map(|loc| loc.path.clone()),
            line: location.map(|loc| loc.line),
            signature: s.signature.clone(),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct WorkspaceStatus {
    pub workspace_version: WorkspaceVersion,
    pub root: Option<String>,
    pub project_count: usize,
    pub document_count: usize,
    pub supports_reload: bool,
    pub projects: Vec<ProjectSummary>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ProjectSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_file: Option<String>,
    pub document_count: usize,
}
