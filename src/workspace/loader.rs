use crate::util;
use crate::workspace::snapshot::Snapshot;
use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

static SOURCE_EXTENSIONS: &[&str] = &["cs", "csx"];
static PROJECT_EXTENSIONS: &[&str] = &["csproj"];

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    pub no_ignore: bool,
}

impl LoadOptions {
    pub fn new(no_ignore: bool) -> Self {
        Self { no_ignore }
    }
}

#[derive(Debug)]
struct ProjectFile {
    name: String,
    dir: String,
    rel_path: String,
}

/// Walk `root` and build a snapshot of every C# document, grouped by the
/// nearest enclosing `.csproj`.
pub fn load_snapshot(root: &Path, options: LoadOptions) -> Result<Snapshot> {
    let root = std::fs::canonicalize(root).with_context(|| format!("open {}", root.display()))?;
    let mut sources: Vec<(String, PathBuf)> = Vec::new();
    let mut project_files: Vec<ProjectFile> = Vec::new();

    for entry in walker(&root, options) {
        let entry = match entry {
            Ok(value) => value,
            Err(err) => {
                log::warn!("walk error: {err}");
                continue;
            }
        };
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }
        let path = entry.path();
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            continue;
        };
        let rel_path = util::normalize_rel_path(&root, path)?;
        if SOURCE_EXTENSIONS.contains(&ext) {
            sources.push((rel_path, path.to_path_buf()));
        } else if PROJECT_EXTENSIONS.contains(&ext) {
            let name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("project")
                .to_string();
            let dir = path
                .parent()
                .map(|parent| util::normalize_rel_path(&root, parent))
                .transpose()?
                .unwrap_or_else(|| ".".to_string());
            project_files.push(ProjectFile {
                name,
                dir,
                rel_path,
            });
        }
    }

    sources.sort();
    // Deepest directories first so nested projects win.
    project_files.sort_by(|a, b| {
        b.dir
            .len()
            .cmp(&a.dir.len())
            .then_with(|| a.rel_path.cmp(&b.rel_path))
    });

    let root_project = root
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("workspace")
        .to_string();

    let mut builder = Snapshot::builder().root(root.clone());
    let mut seen_names: BTreeMap<String, usize> = BTreeMap::new();
    let mut project_names: Vec<String> = Vec::new();
    for project in &project_files {
        // Two projects with the same stem get a numeric suffix.
        let count = seen_names.entry(project.name.clone()).or_insert(0);
        *count += 1;
        let name = if *count == 1 {
            project.name.clone()
        } else {
            format!("{}#{}", project.name, count)
        };
        builder = builder.project(&name, &project.dir, Some(&project.rel_path));
        project_names.push(name);
    }

    let mut has_root_documents = false;
    for (rel_path, abs_path) in sources {
        let text = match util::read_to_string(&abs_path) {
            Ok(text) => text,
            Err(err) => {
                log::warn!("read error {rel_path}: {err}");
                continue;
            }
        };
        let owner = project_files
            .iter()
            .zip(project_names.iter())
            .find(|(project, _)| is_within(&rel_path, &project.dir))
            .map(|(_, name)| name.clone());
        let project = match owner {
            Some(name) => name,
            None => {
                if !has_root_documents {
                    builder = builder.project(&root_project, ".", None);
                    has_root_documents = true;
                }
                root_project.clone()
            }
        };
        builder = builder.document(&project, &rel_path, text, Some(abs_path));
    }

    let snapshot = builder.build();
    log::info!(
        "loaded {} documents in {} projects from {}",
        snapshot.document_count(),
        snapshot.projects().count(),
        root.display()
    );
    Ok(snapshot)
}

fn walker(root: &Path, options: LoadOptions) -> ignore::Walk {
    let mut builder = WalkBuilder::new(root);
    if options.no_ignore {
        builder
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false);
    } else {
        builder
            .ignore(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .parents(true)
            .require_git(false);
    }
    builder
        .hidden(false)
        .filter_entry(|entry| !is_ignored_entry(entry))
        .build()
}

fn is_ignored_entry(entry: &ignore::DirEntry) -> bool {
    match entry.file_name() {
        name if name == OsStr::new(".git") => true,
        name if name == OsStr::new("bin") => true,
        name if name == OsStr::new("obj") => true,
        _ => false,
    }
}

fn is_within(rel_path: &str, dir: &str) -> bool {
    if dir == "." || dir.is_empty() {
        return true;
    }
    rel_path
        .strip_prefix(dir)
        .map(|rest| rest.starts_with('/'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_documents_by_nearest_project() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src/App")).unwrap();
        std::fs::create_dir_all(root.join("src/Lib/Inner")).unwrap();
        std::fs::create_dir_all(root.join("tools")).unwrap();
        std::fs::write(root.join("src/App/App.csproj"), "<Project />").unwrap();
        std::fs::write(root.join("src/App/Program.cs"), "class Program {}").unwrap();
        std::fs::write(root.join("src/Lib/Lib.csproj"), "<Project />").unwrap();
        std::fs::write(root.join("src/Lib/Inner/Util.cs"), "class Util {}").unwrap();
        std::fs::write(root.join("tools/Script.csx"), "var x = 1;").unwrap();
        std::fs::write(root.join("README.md"), "# readme").unwrap();

        let snapshot = load_snapshot(root, LoadOptions::default()).unwrap();
        assert_eq!(snapshot.document_count(), 3);
        assert_eq!(snapshot.document("src/App/Program.cs").unwrap().project, "App");
        assert_eq!(snapshot.document("src/Lib/Inner/Util.cs").unwrap().project, "Lib");
        let root_name = std::fs::canonicalize(root)
            .unwrap()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .to_string();
        assert_eq!(snapshot.document("tools/Script.csx").unwrap().project, root_name);
        assert!(snapshot.find_project("src/Lib/Lib.csproj").is_some());
        assert!(
            snapshot
                .document("src/App/Program.cs")
                .unwrap()
                .abs_path
                .as_ref()
                .unwrap()
                .exists()
        );
    }

    #[test]
    fn within_requires_directory_boundary() {
        assert!(is_within("src/App/a.cs", "src/App"));
        assert!(!is_within("src/AppTests/a.cs", "src/App"));
        assert!(is_within("a.cs", "."));
    }
}
