use crate::actions::policy::{self, PolicyOutcome};
use crate::actions::token::{ActionToken, ProviderKey};
use crate::actions::{
    ActionOrigin, CATEGORY_REFACTOR, CATEGORY_STYLE, DEFAULT_PROFILE, DiscoveredAction,
    diagnostic_category,
};
use crate::codemodel::{BuiltinCandidate, BuiltinKind, CodeAction, CodeModel, Diagnostic};
use crate::error::{Result, ToolError};
use crate::util;
use crate::workspace::{SessionHost, Snapshot, TextSpan, WorkspaceVersion};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Cursor position (1-based) plus an optional selection end.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ActionQuery {
    pub path: String,
    pub line: usize,
    pub column: usize,
    #[serde(default)]
    pub end_line: Option<usize>,
    #[serde(default)]
    pub end_column: Option<usize>,
    #[serde(default)]
    pub profile: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionEntry {
    pub token: String,
    #[serde(flatten)]
    pub action: DiscoveredAction,
    pub policy: PolicyOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionCatalog {
    pub workspace_version: WorkspaceVersion,
    pub profile: String,
    pub path: String,
    pub actions: Vec<ActionEntry>,
}

/// Resolve the query to a document path and a selection span, rejecting
/// positions outside the document.
pub fn resolve_selection(snapshot: &Snapshot, query: &ActionQuery) -> Result<(String, TextSpan)> {
    let doc = snapshot
        .find_document(&query.path)
        .ok_or_else(|| ToolError::invalid_input(format!("document not found: {}", query.path)))?;
    let text = &doc.text;
    let start = util::offset_of(text, query.line, query.column).ok_or_else(|| {
        ToolError::invalid_input(format!(
            "position {}:{} is outside {}",
            query.line, query.column, doc.path
        ))
    })?;
    let end = match (query.end_line, query.end_column) {
        (None, None) => start,
        (Some(line), Some(column)) => util::offset_of(text, line, column).ok_or_else(|| {
            ToolError::invalid_input(format!(
                "selection end {line}:{column} is outside {}",
                doc.path
            ))
        })?,
        _ => {
            return Err(ToolError::invalid_input(
                "end_line and end_column must be given together",
            ));
        }
    };
    if end < start {
        return Err(ToolError::invalid_input("selection ends before it starts"));
    }
    Ok((doc.path.clone(), TextSpan::from_bounds(start, end)))
}

pub(crate) fn located(snapshot: &Snapshot, path: &str, span: TextSpan) -> (usize, usize) {
    snapshot
        .text(path)
        .map(|text| util::line_col(text, span.start))
        .unwrap_or((1, 1))
}

pub(crate) fn fix_action(
    provider: &str,
    diagnostic: &Diagnostic,
    fix: &CodeAction,
) -> DiscoveredAction {
    let key = ProviderKey::CodeFix {
        provider: provider.to_string(),
        diagnostic_id: diagnostic.id.clone(),
        equivalence_key: fix.equivalence_key.clone(),
        title: fix.title.clone(),
    };
    DiscoveredAction {
        title: fix.title.clone(),
        category: diagnostic_category(&diagnostic.id).to_string(),
        origin: ActionOrigin::CompilerFix,
        provider_key: key.encode(),
        file_path: diagnostic.path.clone(),
        span: diagnostic.span,
        diagnostic_id: Some(diagnostic.id.clone()),
        refactoring_id: None,
        line: diagnostic.line,
        column: diagnostic.column,
    }
}

/// `span` is the selection the provider was asked about.
pub(crate) fn refactoring_action(
    provider: &str,
    path: &str,
    span: TextSpan,
    (line, column): (usize, usize),
    action: &CodeAction,
) -> DiscoveredAction {
    let key = ProviderKey::Refactoring {
        provider: provider.to_string(),
        equivalence_key: action.equivalence_key.clone(),
        title: action.title.clone(),
    };
    DiscoveredAction {
        title: action.title.clone(),
        category: CATEGORY_REFACTOR.to_string(),
        origin: ActionOrigin::Refactoring,
        provider_key: key.encode(),
        file_path: path.to_string(),
        span,
        diagnostic_id: None,
        refactoring_id: Some(action.equivalence_key.clone()),
        line,
        column,
    }
}

pub(crate) fn builtin_action(
    snapshot: &Snapshot,
    path: &str,
    candidate: &BuiltinCandidate,
) -> DiscoveredAction {
    let category = match (candidate.kind, candidate.diagnostic_id.as_deref()) {
        (BuiltinKind::RemoveUnusedLocal, Some(id)) => diagnostic_category(id),
        _ => CATEGORY_STYLE,
    };
    let (line, column) = located(snapshot, path, candidate.span);
    DiscoveredAction {
        title: candidate.action.title.clone(),
        category: category.to_string(),
        origin: ActionOrigin::Builtin,
        provider_key: ProviderKey::Builtin(candidate.kind).encode(),
        file_path: path.to_string(),
        span: candidate.span,
        diagnostic_id: candidate.diagnostic_id.clone(),
        refactoring_id: None,
        line,
        column,
    }
}

/// Candidates from fix providers for every diagnostic touching `span`.
fn fix_candidates(
    model: &dyn CodeModel,
    snapshot: &Snapshot,
    path: &str,
    span: TextSpan,
) -> Result<Vec<DiscoveredAction>> {
    let registry = model.providers()?;
    let mut out = Vec::new();
    for diagnostic in model.diagnostics(snapshot, path)? {
        if !diagnostic.span.intersects(&span) {
            continue;
        }
        for provider in registry.fix_providers_for(&diagnostic.id) {
            let fixes = match provider.provide_fixes(snapshot, &diagnostic) {
                Ok(fixes) => fixes,
                Err(err) => {
                    log::warn!(
                        "fix provider {} failed on {} at {}: {err}",
                        provider.type_name(),
                        diagnostic.id,
                        diagnostic.path
                    );
                    continue;
                }
            };
            out.extend(
                fixes
                    .iter()
                    .map(|fix| fix_action(provider.type_name(), &diagnostic, fix)),
            );
        }
    }
    Ok(out)
}

fn refactoring_candidates(
    model: &dyn CodeModel,
    snapshot: &Snapshot,
    path: &str,
    span: TextSpan,
) -> Result<Vec<DiscoveredAction>> {
    let registry = model.providers()?;
    let (line, column) = located(snapshot, path, span);
    let mut out = Vec::new();
    for provider in registry.refactoring_providers() {
        let actions = match provider.provide_refactorings(snapshot, path, span) {
            Ok(actions) => actions,
            Err(err) => {
                log::warn!("refactoring provider {} failed on {path}: {err}", provider.type_name());
                continue;
            }
        };
        out.extend(actions.iter().map(|action| {
            refactoring_action(provider.type_name(), path, span, (line, column), action)
        }));
    }
    Ok(out)
}

fn builtin_candidates(
    model: &dyn CodeModel,
    snapshot: &Snapshot,
    path: &str,
    span: TextSpan,
) -> Result<Vec<DiscoveredAction>> {
    let mut out = Vec::new();
    for candidate in model.builtin_actions(snapshot, path, span)? {
        out.push(builtin_action(snapshot, path, &candidate));
    }
    Ok(out)
}

/// A builtin is redundant when a provider already offers an action at the
/// same place for the same diagnostic or with the same title.
fn is_covered(builtin: &DiscoveredAction, providers: &[DiscoveredAction]) -> bool {
    providers.iter().any(|candidate| {
        candidate.file_path == builtin.file_path
            && candidate.span == builtin.span
            && ((builtin.diagnostic_id.is_some() && candidate.diagnostic_id == builtin.diagnostic_id)
                || candidate.title == builtin.title)
    })
}

fn sort_and_dedupe(actions: &mut Vec<DiscoveredAction>) {
    actions.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    actions.dedup_by(|a, b| a.sort_key() == b.sort_key());
}

/// Deterministic catalog of actions at a position, each tokenized against
/// the current workspace version.
pub fn discover_actions(
    host: &dyn SessionHost,
    model: &dyn CodeModel,
    query: &ActionQuery,
) -> Result<ActionCatalog> {
    let (snapshot, version) = host.current();
    let profile = query
        .profile
        .clone()
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string());
    let (path, span) = resolve_selection(&snapshot, query)?;

    let mut fixes = fix_candidates(model, &snapshot, &path, span)?;
    sort_and_dedupe(&mut fixes);
    let mut refactorings = refactoring_candidates(model, &snapshot, &path, span)?;
    sort_and_dedupe(&mut refactorings);
    let mut builtins = builtin_candidates(model, &snapshot, &path, span)?;
    sort_and_dedupe(&mut builtins);

    let mut actions = fixes;
    actions.extend(refactorings);
    let from_providers = actions.clone();
    actions.extend(
        builtins
            .into_iter()
            .filter(|builtin| !is_covered(builtin, &from_providers)),
    );
    sort_and_dedupe(&mut actions);
    log::debug!("discovered {} actions at {path}:{}", actions.len(), span.start);

    let actions = actions
        .into_iter()
        .map(|action| ActionEntry {
            token: ActionToken::encode(&action, version, &profile),
            policy: policy::evaluate(&action, &profile).decision,
            action,
        })
        .collect();
    Ok(ActionCatalog {
        workspace_version: version,
        profile,
        path,
        actions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(title: &str, diagnostic: Option<&str>, start: usize) -> DiscoveredAction {
        DiscoveredAction {
            title: title.to_string(),
            category: "compiler".to_string(),
            origin: ActionOrigin::CompilerFix,
            provider_key: "k".to_string(),
            file_path: "a.cs".to_string(),
            span: TextSpan::new(start, 3),
            diagnostic_id: diagnostic.map(str::to_string),
            refactoring_id: None,
            line: 1,
            column: 1,
        }
    }

    #[test]
    fn builtin_is_covered_by_same_diagnostic_at_same_span() {
        let providers = vec![action("Remove unused variable", Some("CS0219"), 10)];
        assert!(is_covered(&action("Remove unused variable 'x'", Some("CS0219"), 10), &providers));
        assert!(!is_covered(&action("Remove unused variable 'x'", Some("CS0219"), 20), &providers));
        assert!(!is_covered(&action("Use 'var' instead of explicit type", None, 10), &providers));
    }

    #[test]
    fn dedupe_keeps_one_per_key() {
        let mut actions = vec![
            action("b", None, 5),
            action("a", None, 5),
            action("a", None, 5),
            action("z", None, 1),
        ];
        sort_and_dedupe(&mut actions);
        let titles: Vec<&str> = actions.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["z", "a", "b"]);
    }
}
