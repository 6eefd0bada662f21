use crate::actions::{DiscoveredAction, discovery};
use crate::actions::policy::{self, PolicyDecision};
use crate::actions::token::{ActionToken, FixToken, ProviderKey};
use crate::changes::{ChangeSet, change_set};
use crate::codemodel::{BuiltinKind, CodeAction, CodeModel};
use crate::error::{Result, ToolError};
use crate::util;
use crate::workspace::{SessionHost, Snapshot, TextSpan, WorkspaceVersion};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ActionPreview {
    pub token: String,
    pub workspace_version: WorkspaceVersion,
    pub action: DiscoveredAction,
    pub policy: PolicyDecision,
    pub changes: ChangeSet,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionApplyResult {
    pub applied: bool,
    pub previous_version: WorkspaceVersion,
    pub workspace_version: WorkspaceVersion,
    pub changed_files: Vec<String>,
    pub changes: ChangeSet,
}

fn ensure_version(token: WorkspaceVersion, current: WorkspaceVersion) -> Result<()> {
    if token == current {
        Ok(())
    } else {
        Err(ToolError::workspace_changed(token, current))
    }
}

fn not_found(token: &str) -> ToolError {
    ToolError::ActionNotFound(token.to_string())
}

/// Everything but the title, which tokens do not carry.
fn same_action(token: &DiscoveredAction, regenerated: &DiscoveredAction) -> bool {
    token.origin == regenerated.origin
        && token.category == regenerated.category
        && token.provider_key == regenerated.provider_key
        && token.file_path == regenerated.file_path
        && token.span == regenerated.span
        && token.diagnostic_id == regenerated.diagnostic_id
        && token.refactoring_id == regenerated.refactoring_id
}

/// Ask the rule named by the token's provider key for its candidates again
/// and pick the one matching the token. The candidate is described afresh
/// the way discovery would describe it; a token whose fields disagree with
/// that description does not name it.
fn relocate(
    model: &dyn CodeModel,
    snapshot: &Snapshot,
    raw: &str,
    token: &ActionToken,
) -> Result<(CodeAction, DiscoveredAction)> {
    let action = &token.action;
    let path = action.file_path.as_str();
    if snapshot.document(path).is_none() {
        return Err(not_found(raw));
    }
    let key = token.provider_key().ok_or_else(|| not_found(raw))?;
    let (candidate, regenerated) = match key {
        ProviderKey::CodeFix {
            provider,
            diagnostic_id,
            equivalence_key,
            title,
        } => {
            let provider = model
                .providers()?
                .fix_provider(&provider)
                .ok_or_else(|| not_found(raw))?;
            let diagnostic = model
                .diagnostics(snapshot, path)?
                .into_iter()
                .find(|diag| diag.id == diagnostic_id && diag.span == action.span)
                .ok_or_else(|| not_found(raw))?;
            let fix = provider
                .provide_fixes(snapshot, &diagnostic)?
                .into_iter()
                .find(|fix| fix.equivalence_key == equivalence_key && fix.title == title)
                .ok_or_else(|| not_found(raw))?;
            let described = discovery::fix_action(provider.type_name(), &diagnostic, &fix);
            (fix, described)
        }
        ProviderKey::Refactoring {
            provider,
            equivalence_key,
            title,
        } => {
            let provider = model
                .providers()?
                .refactoring_provider(&provider)
                .ok_or_else(|| not_found(raw))?;
            let refactoring = provider
                .provide_refactorings(snapshot, path, action.span)?
                .into_iter()
                .find(|candidate| {
                    candidate.equivalence_key == equivalence_key && candidate.title == title
                })
                .ok_or_else(|| not_found(raw))?;
            let at = discovery::located(snapshot, path, action.span);
            let described = discovery::refactoring_action(
                provider.type_name(),
                path,
                action.span,
                at,
                &refactoring,
            );
            (refactoring, described)
        }
        ProviderKey::Builtin(kind) => {
            let builtin = model
                .builtin_actions(snapshot, path, action.span)?
                .into_iter()
                .find(|candidate| {
                    candidate.kind == kind
                        && candidate.span == action.span
                        && candidate.diagnostic_id == action.diagnostic_id
                })
                .ok_or_else(|| not_found(raw))?;
            let described = discovery::builtin_action(snapshot, path, &builtin);
            (builtin.action, described)
        }
    };
    if !same_action(action, &regenerated) {
        log::debug!(
            "token for '{}' disagrees with its re-located candidate",
            regenerated.title
        );
        return Err(not_found(raw));
    }
    Ok((candidate, regenerated))
}

struct Prepared {
    token: ActionToken,
    base: WorkspaceVersion,
    next: Snapshot,
    changes: ChangeSet,
}

/// Decode, check the version and re-locate. The token's action is replaced
/// by the re-located description, so policy never reads caller-supplied
/// fields.
fn prepare(host: &dyn SessionHost, model: &dyn CodeModel, raw: &str) -> Result<Prepared> {
    let mut token = ActionToken::decode(raw)?;
    let (snapshot, version) = host.current();
    ensure_version(token.version, version)?;
    let (candidate, described) = relocate(model, &snapshot, raw, &token)?;
    token.action = described;
    let next = candidate.apply(&snapshot)?;
    let changes = change_set(&snapshot, &next);
    Ok(Prepared {
        token,
        base: version,
        next,
        changes,
    })
}

/// Change set an action would produce. Never commits.
pub fn preview_action(
    host: &dyn SessionHost,
    model: &dyn CodeModel,
    raw: &str,
) -> Result<ActionPreview> {
    let prepared = prepare(host, model, raw)?;
    let decision = policy::evaluate(&prepared.token.action, &prepared.token.profile);
    Ok(ActionPreview {
        token: raw.trim().to_string(),
        workspace_version: prepared.base,
        action: prepared.token.action,
        policy: decision,
        changes: prepared.changes,
    })
}

/// Apply an action once. Policy is decided on the re-located action; the
/// commit itself is refused if another writer got there first.
pub fn apply_action(
    host: &dyn SessionHost,
    model: &dyn CodeModel,
    raw: &str,
) -> Result<ActionApplyResult> {
    let prepared = prepare(host, model, raw)?;
    let decision = policy::evaluate(&prepared.token.action, &prepared.token.profile);
    if !decision.is_allowed() {
        return Err(ToolError::PolicyBlocked(decision));
    }
    if prepared.changes.is_empty() {
        return Err(ToolError::FixConflict(format!(
            "action '{}' produces no changes",
            prepared.token.action.title
        )));
    }
    let version = host.commit(prepared.base, prepared.next)?;
    log::info!(
        "applied action '{}' to {} file(s), version {} -> {}",
        prepared.token.action.title,
        prepared.changes.files.len(),
        prepared.base,
        version
    );
    Ok(ActionApplyResult {
        applied: true,
        previous_version: prepared.base,
        workspace_version: version,
        changed_files: prepared.changes.paths(),
        changes: prepared.changes,
    })
}

/// Fresh policy decision for a still-valid token, decided on the action
/// the token re-locates to.
pub fn evaluate_action_policy(
    host: &dyn SessionHost,
    model: &dyn CodeModel,
    raw: &str,
) -> Result<PolicyDecision> {
    let prepared = prepare(host, model, raw)?;
    Ok(policy::evaluate(&prepared.token.action, &prepared.token.profile))
}

#[derive(Debug, Clone, Serialize)]
pub struct FixEntry {
    pub token: String,
    pub title: String,
    pub operation: String,
    pub diagnostic_id: String,
    pub file_path: String,
    #[serde(flatten)]
    pub span: TextSpan,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FixList {
    pub workspace_version: WorkspaceVersion,
    pub path: String,
    pub fixes: Vec<FixEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FixPreview {
    pub token: String,
    pub workspace_version: WorkspaceVersion,
    pub title: String,
    pub changes: ChangeSet,
}

#[derive(Debug, Clone, Serialize)]
pub struct FixApplyResult {
    pub applied: bool,
    pub previous_version: WorkspaceVersion,
    pub workspace_version: WorkspaceVersion,
    pub changed_files: Vec<String>,
    pub changes: ChangeSet,
}

/// Builtin unused-local removals in one document, optionally narrowed to one
/// diagnostic ID.
pub fn list_fixes(
    host: &dyn SessionHost,
    model: &dyn CodeModel,
    path: &str,
    diagnostic_id: Option<&str>,
) -> Result<FixList> {
    let (snapshot, version) = host.current();
    let doc = snapshot
        .find_document(path)
        .ok_or_else(|| ToolError::invalid_input(format!("document not found: {path}")))?;
    let whole = TextSpan::new(0, doc.text.len());
    let mut fixes = Vec::new();
    for candidate in model.builtin_actions(&snapshot, &doc.path, whole)? {
        if candidate.kind != BuiltinKind::RemoveUnusedLocal {
            continue;
        }
        let Some(id) = candidate.diagnostic_id else {
            continue;
        };
        if diagnostic_id.is_some_and(|wanted| wanted != id) {
            continue;
        }
        let token = FixToken {
            version,
            operation: candidate.kind.as_str().to_string(),
            diagnostic_id: id.clone(),
            span: candidate.span,
            file_path: doc.path.clone(),
        };
        let (line, column) = util::line_col(&doc.text, candidate.span.start);
        fixes.push(FixEntry {
            token: token.encode(),
            title: candidate.action.title,
            operation: token.operation,
            diagnostic_id: id,
            file_path: doc.path.clone(),
            span: candidate.span,
            line,
            column,
        });
    }
    fixes.sort_by(|a, b| (a.span.start, &a.diagnostic_id).cmp(&(b.span.start, &b.diagnostic_id)));
    Ok(FixList {
        workspace_version: version,
        path: doc.path.clone(),
        fixes,
    })
}

fn relocate_fix(
    model: &dyn CodeModel,
    snapshot: &Snapshot,
    raw: &str,
    token: &FixToken,
) -> Result<CodeAction> {
    let not_found = || ToolError::FixNotFound(raw.to_string());
    if BuiltinKind::parse(&token.operation) != Some(BuiltinKind::RemoveUnusedLocal) {
        return Err(not_found());
    }
    if snapshot.document(&token.file_path).is_none() {
        return Err(not_found());
    }
    model
        .builtin_actions(snapshot, &token.file_path, token.span)?
        .into_iter()
        .find(|candidate| {
            candidate.kind == BuiltinKind::RemoveUnusedLocal
                && candidate.span == token.span
                && candidate.diagnostic_id.as_deref() == Some(token.diagnostic_id.as_str())
        })
        .map(|candidate| candidate.action)
        .ok_or_else(not_found)
}

pub fn preview_fix(host: &dyn SessionHost, model: &dyn CodeModel, raw: &str) -> Result<FixPreview> {
    let token = FixToken::decode(raw)?;
    let (snapshot, version) = host.current();
    ensure_version(token.version, version)?;
    let action = relocate_fix(model, &snapshot, raw, &token)?;
    let next = action.apply(&snapshot)?;
    Ok(FixPreview {
        token: raw.trim().to_string(),
        workspace_version: version,
        title: action.title,
        changes: change_set(&snapshot, &next),
    })
}

pub fn apply_fix(host: &dyn SessionHost, model: &dyn CodeModel, raw: &str) -> Result<FixApplyResult> {
    let token = FixToken::decode(raw)?;
    let (snapshot, version) = host.current();
    ensure_version(token.version, version)?;
    let action = relocate_fix(model, &snapshot, raw, &token)?;
    let next = action.apply(&snapshot)?;
    let changes = change_set(&snapshot, &next);
    if changes.is_empty() {
        return Err(ToolError::FixConflict(format!(
            "fix '{}' produces no changes",
            action.title
        )));
    }
    drop(snapshot);
    let committed = host.commit(version, next)?;
    log::info!("applied fix '{}', version {version} -> {committed}", action.title);
    Ok(FixApplyResult {
        applied: true,
        previous_version: version,
        workspace_version: committed,
        changed_files: changes.paths(),
        changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::discovery::{ActionQuery, discover_actions};
    use crate::csharp::CSharpCodeModel;
    use crate::workspace::Workspace;

    const SOURCE: &str = "class A\n{\n    void M()\n    {\n        int unused = 3;\n        Run();\n    }\n}\n";

    fn session() -> Workspace {
        Workspace::in_memory(
            Snapshot::builder()
                .document("App", "A.cs", SOURCE, None)
                .build(),
        )
    }

    fn query(line: usize, column: usize) -> ActionQuery {
        ActionQuery {
            path: "A.cs".to_string(),
            line,
            column,
            end_line: None,
            end_column: None,
            profile: None,
        }
    }

    #[test]
    fn apply_is_single_use() {
        let host = session();
        let model = CSharpCodeModel::new();
        let catalog = discover_actions(&host, &model, &query(5, 13)).unwrap();
        let fix = catalog
            .actions
            .iter()
            .find(|entry| entry.action.diagnostic_id.as_deref() == Some("CS0219"))
            .unwrap();
        let first = preview_action(&host, &model, &fix.token).unwrap();
        let second = preview_action(&host, &model, &fix.token).unwrap();
        assert_eq!(first.changes, second.changes);

        let applied = apply_action(&host, &model, &fix.token).unwrap();
        assert_eq!(applied.changed_files, vec!["A.cs".to_string()]);
        assert_eq!(applied.workspace_version, WorkspaceVersion::new(2));
        let again = apply_action(&host, &model, &fix.token).unwrap_err();
        assert_eq!(again.code(), "workspace_changed");
    }

    #[test]
    fn fix_tokens_round_trip_through_apply() {
        let host = session();
        let model = CSharpCodeModel::new();
        let list = list_fixes(&host, &model, "A.cs", Some("CS0219")).unwrap();
        assert_eq!(list.fixes.len(), 1);
        let token = &list.fixes[0].token;
        let preview = preview_fix(&host, &model, token).unwrap();
        assert_eq!(preview.changes.files.len(), 1);
        apply_fix(&host, &model, token).unwrap();
        assert!(!host.current().0.text("A.cs").unwrap().contains("unused"));
        assert_eq!(
            preview_fix(&host, &model, token).unwrap_err().code(),
            "workspace_changed"
        );
        assert_eq!(
            preview_fix(&host, &model, "v1|2|remove-unused-local|CS0219|0|1|QS5jcw==")
                .unwrap_err()
                .code(),
            "fix_not_found"
        );
    }
}
