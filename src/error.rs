use crate::actions::policy::PolicyDecision;
use crate::cleanup::StaleSnapshotReport;
use crate::workspace::WorkspaceVersion;
use serde_json::{Value, json};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolError>;

/// Structured failure returned across every public operation.
///
/// `Cancelled` is kept apart from the data errors: callers check
/// [`ToolError::is_cancelled`] and must not treat it as a failed request.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("action not found: {0}")]
    ActionNotFound(String),

    #[error("fix not found: {0}")]
    FixNotFound(String),

    #[error("workspace changed: expected version {expected}, current version {current}")]
    WorkspaceChanged {
        expected: WorkspaceVersion,
        current: WorkspaceVersion,
    },

    #[error("policy blocked ({}): {}", .0.reason_code, .0.message)]
    PolicyBlocked(PolicyDecision),

    #[error("fix conflict: {0}")]
    FixConflict(String),

    #[error(
        "stale workspace snapshot: {} scoped file(s) missing on disk",
        .0.missing_file_count
    )]
    StaleWorkspaceSnapshot(StaleSnapshotReport),

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ToolError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn workspace_changed(expected: WorkspaceVersion, current: WorkspaceVersion) -> Self {
        Self::WorkspaceChanged { expected, current }
    }

    /// Stable machine-readable kind, used by the RPC error payload.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidRequest(_) => "invalid_request",
            Self::ActionNotFound(_) => "action_not_found",
            Self::FixNotFound(_) => "fix_not_found",
            Self::WorkspaceChanged { .. } => "workspace_changed",
            Self::PolicyBlocked(_) => "policy_blocked",
            Self::FixConflict(_) => "fix_conflict",
            Self::StaleWorkspaceSnapshot(_) => "stale_workspace_snapshot",
            Self::Cancelled => "cancelled",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Extra structured detail for the error payload, if the variant has any.
    pub fn data(&self) -> Option<Value> {
        match self {
            Self::WorkspaceChanged { expected, current } => Some(json!({
                "expected_version": expected,
                "current_version": current,
            })),
            Self::PolicyBlocked(decision) => serde_json::to_value(decision).ok(),
            Self::StaleWorkspaceSnapshot(report) => serde_json::to_value(report).ok(),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
