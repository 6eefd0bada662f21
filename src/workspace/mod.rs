//! Versioned, copy-on-write view of a multi-project codebase.
//!
//! A [`Snapshot`] is immutable; every accepted mutation produces a new one and
//! the session swaps it in under a single lock, bumping the
//! [`WorkspaceVersion`]. Readers take an `Arc<Snapshot>` once per operation and
//! never observe a change mid-flight.

pub mod edit;
pub mod loader;
pub mod session;
pub mod snapshot;

pub use edit::{TextEdit, TextSpan, apply_edits};
pub use loader::LoadOptions;
pub use session::{SessionHost, Workspace};
pub use snapshot::{Document, Project, Snapshot};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonic counter tied 1:1 to a committed snapshot. Never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct WorkspaceVersion(u64);

impl WorkspaceVersion {
    pub const INITIAL: WorkspaceVersion = WorkspaceVersion(1);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for WorkspaceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
