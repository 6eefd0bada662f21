use crate::cleanup::StaleSnapshotReport;
use crate::workspace::Snapshot;

/// Scoped documents whose backing file is gone. Documents without an
/// absolute path (in-memory ones) are never missing.
pub fn missing_files(snapshot: &Snapshot, paths: &[String]) -> Vec<String> {
    paths
        .iter()
        .filter(|path| {
            snapshot
                .document(path)
                .and_then(|doc| doc.abs_path.as_ref())
                .map(|abs| !abs.exists())
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Outcome of the pre-flight check, kept for the result or the stale error.
#[derive(Debug, Clone, Default)]
pub struct HealthOutcome {
    pub performed: bool,
    pub reload_attempted: bool,
    pub reload_succeeded: bool,
    pub missing: Vec<String>,
}

impl HealthOutcome {
    pub fn is_healthy(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn report(&self) -> StaleSnapshotReport {
        StaleSnapshotReport {
            health_check_performed: self.performed,
            auto_reload_attempted: self.reload_attempted,
            auto_reload_succeeded: self.reload_succeeded,
            missing_file_count: self.missing.len(),
            missing_files: self.missing.clone(),
        }
    }
}
