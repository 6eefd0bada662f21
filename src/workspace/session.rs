use crate::error::{Result, ToolError};
use crate::workspace::WorkspaceVersion;
use crate::workspace::loader::{self, LoadOptions};
use crate::workspace::snapshot::Snapshot;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Owner of the current snapshot/version pair.
///
/// Operations take one `(snapshot, version)` pair at their start and hand a
/// successor snapshot back through [`SessionHost::commit`]. A commit whose
/// base version is no longer current is rejected, so two writers racing from
/// the same base cannot both succeed.
pub trait SessionHost: Send + Sync {
    fn current(&self) -> (Arc<Snapshot>, WorkspaceVersion);

    fn current_version(&self) -> WorkspaceVersion {
        self.current().1
    }

    fn commit(&self, base: WorkspaceVersion, snapshot: Snapshot) -> Result<WorkspaceVersion>;

    fn supports_reload(&self) -> bool {
        false
    }

    fn reload(&self) -> Result<WorkspaceVersion> {
        Err(ToolError::invalid_request("workspace does not support reload"))
    }
}

struct State {
    snapshot: Arc<Snapshot>,
    version: WorkspaceVersion,
}

struct Source {
    root: PathBuf,
    options: LoadOptions,
}

pub struct Workspace {
    state: RwLock<State>,
    commit_lock: Mutex<()>,
    source: Option<Source>,
}

impl Workspace {
    /// Session over a snapshot that lives only in memory. Commits swap the
    /// snapshot without touching disk; reload is unsupported.
    pub fn in_memory(snapshot: Snapshot) -> Self {
        Self {
            state: RwLock::new(State {
                snapshot: Arc::new(snapshot),
                version: WorkspaceVersion::INITIAL,
            }),
            commit_lock: Mutex::new(()),
            source: None,
        }
    }

    pub fn open(root: &Path, options: LoadOptions) -> anyhow::Result<Self> {
        let snapshot = loader::load_snapshot(root, options)?;
        let root = snapshot
            .root()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.to_path_buf());
        Ok(Self {
            state: RwLock::new(State {
                snapshot: Arc::new(snapshot),
                version: WorkspaceVersion::INITIAL,
            }),
            commit_lock: Mutex::new(()),
            source: Some(Source { root, options }),
        })
    }

    pub fn root(&self) -> Option<&Path> {
        self.source.as_ref().map(|source| source.root.as_path())
    }

    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn serialize(&self) -> MutexGuard<'_, ()> {
        self.commit_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionHost for Workspace {
    fn current(&self) -> (Arc<Snapshot>, WorkspaceVersion) {
        let state = self.read_state();
        (Arc::clone(&state.snapshot), state.version)
    }

    fn commit(&self, base: WorkspaceVersion, snapshot: Snapshot) -> Result<WorkspaceVersion> {
        let _guard = self.serialize();
        let (previous, current) = self.current();
        if current != base {
            return Err(ToolError::workspace_changed(base, current));
        }
        if self.source.is_some() {
            persist(&previous, &snapshot)?;
        }
        let mut state = self.write_state();
        state.snapshot = Arc::new(snapshot);
        state.version = current.next();
        log::info!("committed workspace version {}", state.version);
        Ok(state.version)
    }

    fn supports_reload(&self) -> bool {
        self.source.is_some()
    }

    fn reload(&self) -> Result<WorkspaceVersion> {
        let Some(source) = &self.source else {
            return Err(ToolError::invalid_request(
                "workspace does not support reload",
            ));
        };
        let _guard = self.serialize();
        let snapshot = loader::load_snapshot(&source.root, source.options).map_err(|err| {
            ToolError::internal(format!("reload {}: {err:#}", source.root.display()))
        })?;
        let mut state = self.write_state();
        state.snapshot = Arc::new(snapshot);
        state.version = state.version.next();
        log::info!(
            "reloaded {} at version {}",
            source.root.display(),
            state.version
        );
        Ok(state.version)
    }
}

/// Write every document whose text differs from `previous`. If any write
/// fails, files already written get their old contents back.
fn persist(previous: &Snapshot, next: &Snapshot) -> Result<()> {
    let mut written: Vec<(PathBuf, Arc<str>)> = Vec::new();
    for doc in next.documents() {
        let Some(abs_path) = &doc.abs_path else {
            continue;
        };
        let old = previous.document(&doc.path);
        if let Some(old) = old {
            if Arc::ptr_eq(&old.text, &doc.text) || old.text == doc.text {
                continue;
            }
        }
        if let Err(err) = std::fs::write(abs_path, doc.text.as_bytes()) {
            for (path, text) in written.iter().rev() {
                if let Err(restore) = std::fs::write(path, text.as_bytes()) {
                    log::warn!("restore failed for {}: {restore}", path.display());
                }
            }
            return Err(ToolError::internal(format!(
                "write {}: {err}",
                abs_path.display()
            )));
        }
        let original = old
            .map(|old| Arc::clone(&old.text))
            .unwrap_or_else(|| Arc::from(""));
        written.push((abs_path.clone(), original));
    }
    Ok(())
}
