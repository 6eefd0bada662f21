use crate::error::{Result, ToolError};
use crate::util;
use crate::workspace::edit::{TextEdit, apply_edits};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Document {
    /// Normalized, `/`-separated path relative to the workspace root.
    pub path: String,
    pub project: String,
    pub text: Arc<str>,
    /// Backing file, when the document was loaded from disk.
    pub abs_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    /// Project file (e.g. `src/App/App.csproj`), relative to the root.
    pub project_file: Option<String>,
    /// Directory that owns the project's documents, relative to the root.
    pub dir: String,
    pub documents: Vec<String>,
}

/// Immutable view of every document across every project.
///
/// Cloning is cheap (document texts are shared); edits go through
/// [`Snapshot::with_document_text`] / [`Snapshot::with_edits`], which return a
/// new snapshot and leave `self` usable for diffing.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    root: Option<PathBuf>,
    projects: Arc<BTreeMap<String, Project>>,
    documents: BTreeMap<String, Arc<Document>>,
}

impl Snapshot {
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn documents(&self) -> impl Iterator<Item = &Arc<Document>> {
        self.documents.values()
    }

    pub fn document_paths(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(|key| key.as_str())
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    pub fn document(&self, path: &str) -> Option<&Arc<Document>> {
        self.documents.get(path)
    }

    pub fn text(&self, path: &str) -> Option<&str> {
        self.documents.get(path).map(|doc| doc.text.as_ref())
    }

    /// Resolve a caller-supplied path (relative or absolute) to a document.
    pub fn find_document(&self, raw: &str) -> Option<&Arc<Document>> {
        let normalized = util::normalize_path_str(raw);
        if let Some(doc) = self.documents.get(&normalized) {
            return Some(doc);
        }
        if let Some(root) = &self.root {
            if let Ok(rel) = Path::new(&normalized).strip_prefix(root) {
                let rel = util::normalize_path(rel);
                if let Some(doc) = self.documents.get(&rel) {
                    return Some(doc);
                }
            }
        }
        let target = Path::new(raw);
        self.documents
            .values()
            .find(|doc| doc.abs_path.as_deref() == Some(target))
    }

    /// Resolve a project by name, project-file path, or project directory.
    pub fn find_project(&self, raw: &str) -> Option<&Project> {
        if let Some(project) = self.projects.get(raw) {
            return Some(project);
        }
        let normalized = util::normalize_path_str(raw);
        let relative = match &self.root {
            Some(root) => Path::new(&normalized)
                .strip_prefix(root)
                .map(util::normalize_path)
                .unwrap_or_else(|_| normalized.clone()),
            None => normalized.clone(),
        };
        self.projects.values().find(|project| {
            project.project_file.as_deref() == Some(relative.as_str())
                || project.dir == relative
                || project.name.eq_ignore_ascii_case(raw)
        })
    }

    pub fn project_documents(&self, name: &str) -> Vec<String> {
        self.projects
            .get(name)
            .map(|project| project.documents.clone())
            .unwrap_or_default()
    }

    pub fn with_document_text(&self, path: &str, text: impl Into<Arc<str>>) -> Result<Snapshot> {
        let existing = self
            .documents
            .get(path)
            .ok_or_else(|| ToolError::invalid_input(format!("document not found: {path}")))?;
        let text: Arc<str> = text.into();
        let mut next = self.clone();
        if existing.text.as_ref() == text.as_ref() {
            return Ok(next);
        }
        let mut doc = Document::clone(existing);
        doc.text = text;
        next.documents.insert(path.to_string(), Arc::new(doc));
        Ok(next)
    }

    pub fn with_edits(&self, path: &str, edits: &[TextEdit]) -> Result<Snapshot> {
        if edits.is_empty() {
            return Ok(self.clone());
        }
        let text = self
            .text(path)
            .ok_or_else(|| ToolError::invalid_input(format!("document not found: {path}")))?;
        let updated = apply_edits(text, edits)?;
        self.with_document_text(path, updated)
    }
}

#[derive(Default)]
pub struct SnapshotBuilder {
    root: Option<PathBuf>,
    projects: BTreeMap<String, Project>,
    documents: BTreeMap<String, Arc<Document>>,
}

impl SnapshotBuilder {
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn project(mut self, name: &str, dir: &str, project_file: Option<&str>) -> Self {
        self.projects.insert(
            name.to_string(),
            Project {
                name: name.to_string(),
                project_file: project_file.map(str::to_string),
                dir: dir.to_string(),
                documents: Vec::new(),
            },
        );
        self
    }

    /// Add a document to `project`, creating the project on first use.
    pub fn document(
        mut self,
        project: &str,
        path: &str,
        text: impl Into<Arc<str>>,
        abs_path: Option<PathBuf>,
    ) -> Self {
        let path = util::normalize_path_str(path);
        let entry = self
            .projects
            .entry(project.to_string())
            .or_insert_with(|| Project {
                name: project.to_string(),
                project_file: None,
                dir: String::new(),
                documents: Vec::new(),
            });
        if !entry.documents.contains(&path) {
            entry.documents.push(path.clone());
        }
        self.documents.insert(
            path.clone(),
            Arc::new(Document {
                path,
                project: project.to_string(),
                text: text.into(),
                abs_path,
            }),
        );
        self
    }

    pub fn build(mut self) -> Snapshot {
        for project in self.projects.values_mut() {
            project.documents.sort();
        }
        Snapshot {
            root: self.root,
            projects: Arc::new(self.projects),
            documents: self.documents,
        }
    }
}
