//! Ordered, deterministic cleanup over a document, a project or the whole
//! workspace.
//!
//! Flow: validate the request, resolve the scope, check the scoped files
//! still exist (one reload allowed), check the caller's expected version, run
//! every rule on a scratch snapshot, check the version again, commit.
//! Nothing is written unless every step succeeds.

pub mod health;
pub mod rules;

use crate::actions::policy::{CLEANUP_PROFILE, validate_cleanup_profile};
use crate::cancel::CancellationToken;
use crate::changes::{ChangeSet, change_set};
use crate::codemodel::CodeModel;
use crate::config::Config;
use crate::error::{Result, ToolError};
use crate::workspace::{SessionHost, Snapshot, WorkspaceVersion};
use health::HealthOutcome;
use rules::{CleanupRule, RULES};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CleanupScope {
    Document,
    Project,
    Solution,
}

fn default_profile() -> String {
    CLEANUP_PROFILE.to_string()
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CleanupRequest {
    pub scope: CleanupScope,
    /// Document path, or project name/file/directory. Ignored for `solution`.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct CleanupOptions {
    pub max_passes: usize,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            max_passes: Config::get().cleanup_max_passes,
        }
    }
}

/// Why a cleanup refused to run against a snapshot that disagrees with disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleSnapshotReport {
    pub health_check_performed: bool,
    pub auto_reload_attempted: bool,
    pub auto_reload_succeeded: bool,
    pub missing_file_count: usize,
    pub missing_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleSummary {
    pub rule: CleanupRule,
    pub changed_documents: usize,
    pub passes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupResult {
    pub applied: bool,
    pub scope: CleanupScope,
    pub document_count: usize,
    pub previous_version: WorkspaceVersion,
    pub workspace_version: WorkspaceVersion,
    pub reloaded: bool,
    pub rules: Vec<RuleSummary>,
    pub changed_files: Vec<String>,
    pub changes: ChangeSet,
}

/// Normalized document paths covered by a scope.
pub fn resolve_scope(
    snapshot: &Snapshot,
    scope: CleanupScope,
    path: Option<&str>,
) -> Result<Vec<String>> {
    let required = || {
        path.filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ToolError::invalid_input("path is required for document and project scope"))
    };
    match scope {
        CleanupScope::Document => {
            let raw = required()?;
            let doc = snapshot
                .find_document(raw)
                .ok_or_else(|| ToolError::invalid_input(format!("document not found: {raw}")))?;
            Ok(vec![doc.path.clone()])
        }
        CleanupScope::Project => {
            let raw = required()?;
            let project = snapshot
                .find_project(raw)
                .ok_or_else(|| ToolError::invalid_input(format!("project not found: {raw}")))?;
            let mut paths = project.documents.clone();
            paths.sort();
            Ok(paths)
        }
        CleanupScope::Solution => Ok(snapshot.document_paths().map(str::to_string).collect()),
    }
}

/// Health check with at most one reload. Returns the snapshot, version and
/// scope to run against.
fn preflight(
    host: &dyn SessionHost,
    request: &CleanupRequest,
) -> Result<(Arc<Snapshot>, WorkspaceVersion, Vec<String>, HealthOutcome)> {
    let (snapshot, version) = host.current();
    let paths = resolve_scope(&snapshot, request.scope, request.path.as_deref())?;
    let mut outcome = HealthOutcome {
        performed: true,
        missing: health::missing_files(&snapshot, &paths),
        ..HealthOutcome::default()
    };
    if outcome.is_healthy() {
        return Ok((snapshot, version, paths, outcome));
    }
    log::warn!(
        "cleanup scope has {} file(s) missing on disk",
        outcome.missing.len()
    );
    if !host.supports_reload() {
        return Err(ToolError::StaleWorkspaceSnapshot(outcome.report()));
    }

    outcome.reload_attempted = true;
    if let Err(err) = host.reload() {
        log::warn!("automatic reload failed: {err}");
        return Err(ToolError::StaleWorkspaceSnapshot(outcome.report()));
    }
    outcome.reload_succeeded = true;

    let (snapshot, version) = host.current();
    let paths = match resolve_scope(&snapshot, request.scope, request.path.as_deref()) {
        Ok(paths) => paths,
        Err(err) => {
            log::warn!("cleanup scope vanished after reload: {err}");
            return Err(ToolError::StaleWorkspaceSnapshot(outcome.report()));
        }
    };
    outcome.missing = health::missing_files(&snapshot, &paths);
    if !outcome.is_healthy() {
        return Err(ToolError::StaleWorkspaceSnapshot(outcome.report()));
    }
    Ok((snapshot, version, paths, outcome))
}

fn check_expected(host: &dyn SessionHost, expected: Option<WorkspaceVersion>) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let current = host.current_version();
    if current == expected {
        Ok(())
    } else {
        Err(ToolError::workspace_changed(expected, current))
    }
}

pub fn run_cleanup(
    host: &dyn SessionHost,
    model: &dyn CodeModel,
    request: &CleanupRequest,
    options: &CleanupOptions,
    cancel: &CancellationToken,
) -> Result<CleanupResult> {
    validate_cleanup_profile(&request.profile)?;
    let expected = request.expected_version.map(WorkspaceVersion::new);
    let (snapshot, version, paths, health) = preflight(host, request)?;
    if let Some(expected) = expected {
        if expected != version {
            return Err(ToolError::workspace_changed(expected, version));
        }
    }

    let mut working = (*snapshot).clone();
    let mut summaries = Vec::with_capacity(RULES.len());
    for rule in RULES {
        let mut summary = RuleSummary {
            rule,
            changed_documents: 0,
            passes: 0,
        };
        for path in &paths {
            cancel.check()?;
            let (next, run) = rules::run_rule(
                rule,
                model,
                working,
                path,
                options.max_passes.max(1),
                cancel,
            )?;
            working = next;
            summary.passes += run.passes;
            if run.changed {
                summary.changed_documents += 1;
            }
        }
        summaries.push(summary);
    }

    let changes = change_set(&snapshot, &working);
    if changes.is_empty() {
        log::debug!("cleanup over {} document(s) changed nothing", paths.len());
        return Ok(CleanupResult {
            applied: false,
            scope: request.scope,
            document_count: paths.len(),
            previous_version: version,
            workspace_version: version,
            reloaded: health.reload_succeeded,
            rules: summaries,
            changed_files: Vec::new(),
            changes,
        });
    }

    cancel.check()?;
    check_expected(host, expected)?;
    drop(snapshot);
    let committed = host.commit(version, working)?;
    log::info!(
        "cleanup changed {} file(s), version {version} -> {committed}",
        changes.files.len()
    );
    Ok(CleanupResult {
        applied: true,
        scope: request.scope,
        document_count: paths.len(),
        previous_version: version,
        workspace_version: committed,
        reloaded: health.reload_succeeded,
        rules: summaries,
        changed_files: changes.paths(),
        changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csharp::CSharpCodeModel;
    use crate::workspace::Workspace;

    fn request(scope: CleanupScope, path: Option<&str>) -> CleanupRequest {
        CleanupRequest {
            scope,
            path: path.map(str::to_string),
            profile: CLEANUP_PROFILE.to_string(),
            expected_version: None,
        }
    }

    #[test]
    fn scope_requires_path_for_documents() {
        let snapshot = Snapshot::builder()
            .document("App", "a.cs", "class A {}\n", None)
            .build();
        assert_eq!(
            resolve_scope(&snapshot, CleanupScope::Document, None)
                .unwrap_err()
                .code(),
            "invalid_input"
        );
        assert_eq!(
            resolve_scope(&snapshot, CleanupScope::Project, Some("App")).unwrap(),
            vec!["a.cs".to_string()]
        );
    }

    #[test]
    fn clean_workspace_is_not_applied() {
        let host = Workspace::in_memory(
            Snapshot::builder()
                .document("App", "a.cs", "class A\n{\n}\n", None)
                .build(),
        );
        let result = run_cleanup(
            &host,
            &CSharpCodeModel::new(),
            &request(CleanupScope::Solution, None),
            &CleanupOptions { max_passes: 3 },
            &CancellationToken::new(),
        )
        .unwrap();
        assert!(!result.applied);
        assert_eq!(result.workspace_version, WorkspaceVersion::INITIAL);
        assert_eq!(result.rules.len(), 5);
    }

    #[test]
    fn wrong_profile_is_rejected_before_anything_runs() {
        let host = Workspace::in_memory(Snapshot::builder().build());
        let mut req = request(CleanupScope::Solution, None);
        req.profile = "aggressive".to_string();
        let err = run_cleanup(
            &host,
            &CSharpCodeModel::new(),
            &req,
            &CleanupOptions { max_passes: 3 },
            &CancellationToken::new(),
        )
        .unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }
}
