//! Discover → preview → apply over opaque action tokens.
//!
//! Discovery merges provider fixes, provider refactorings and syntax-level
//! builtins into one deterministic catalog. Every entry carries a token that
//! names the action against the workspace version it was discovered at;
//! preview and apply re-locate the same candidate from the token alone.

pub mod discovery;
pub mod pipeline;
pub mod policy;
pub mod token;

pub use discovery::{ActionCatalog, ActionEntry, discover_actions};
pub use pipeline::{
    ActionApplyResult, ActionPreview, FixApplyResult, FixEntry, FixList, FixPreview, apply_action,
    apply_fix, evaluate_action_policy, list_fixes, preview_action, preview_fix,
};
pub use policy::{PolicyDecision, PolicyOutcome, evaluate};
pub use token::{ActionToken, FixToken, ProviderKey};

use crate::workspace::TextSpan;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CATEGORY_COMPILER: &str = "compiler";
pub const CATEGORY_STYLE: &str = "style";
pub const CATEGORY_REFACTOR: &str = "refactor";

pub const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionOrigin {
    /// Fix offered by a fix provider for a diagnostic.
    CompilerFix,
    /// Refactoring offered by a refactoring provider for a selection.
    Refactoring,
    /// Syntax heuristic computed without the provider registry.
    Builtin,
}

impl ActionOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionOrigin::CompilerFix => "compiler-fix",
            ActionOrigin::Refactoring => "refactoring",
            ActionOrigin::Builtin => "builtin",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "compiler-fix" => Some(ActionOrigin::CompilerFix),
            "refactoring" => Some(ActionOrigin::Refactoring),
            "builtin" => Some(ActionOrigin::Builtin),
            _ => None,
        }
    }
}

impl fmt::Display for ActionOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a diagnostic-triggered action, from the diagnostic's family.
pub fn diagnostic_category(diagnostic_id: &str) -> &'static str {
    if diagnostic_id.starts_with("CS") {
        CATEGORY_COMPILER
    } else {
        CATEGORY_STYLE
    }
}

/// One candidate transformation as reported by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredAction {
    pub title: String,
    pub category: String,
    pub origin: ActionOrigin,
    pub provider_key: String,
    pub file_path: String,
    #[serde(flatten)]
    pub span: TextSpan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refactoring_id: Option<String>,
    pub line: usize,
    pub column: usize,
}

impl DiscoveredAction {
    /// Ordering and dedup key: file, span, title, category, provider key.
    pub fn sort_key(&self) -> (&str, usize, usize, &str, &str, &str) {
        (
            self.file_path.as_str(),
            self.span.start,
            self.span.length,
            self.title.as_str(),
            self.category.as_str(),
            self.provider_key.as_str(),
        )
    }
}
