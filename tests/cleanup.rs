// Cleanup orchestrator tests against on-disk workspaces.

use anyhow::Result;
use codeact::cancel::CancellationToken;
use codeact::cleanup::{CleanupOptions, CleanupRequest, CleanupScope, run_cleanup};
use codeact::codemodel::CodeModel;
use codeact::csharp::CSharpCodeModel;
use codeact::workspace::{LoadOptions, SessionHost, Snapshot, Workspace, WorkspaceVersion};
use std::fs;
use tempfile::TempDir;

const LIB: &str = "namespace App.Lib\n{\n    public class Helper\n    {\n    }\n}\n";

const SERVICE: &str = "using System.Text;\nusing App.Lib;\nusing System;\n\nnamespace App\n{\n    class Service\n    {\n        static public int Total;\n        private int _seed;\n\n        public Service(int seed) { _seed = seed; }   \n\n        public Helper Make() => new Helper();\n    }\n}\n";

fn setup_repo() -> Result<(TempDir, Workspace)> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    fs::write(root.join("App.csproj"), "<Project Sdk=\"Microsoft.NET.Sdk\" />")?;
    fs::write(root.join("Lib.cs"), LIB)?;
    fs::write(root.join("Service.cs"), SERVICE)?;
    let workspace = Workspace::open(root, LoadOptions::default())?;
    Ok((temp_dir, workspace))
}

fn request(scope: CleanupScope, path: Option<&str>, expected: Option<u64>) -> CleanupRequest {
    CleanupRequest {
        scope,
        path: path.map(str::to_string),
        profile: "balanced".to_string(),
        expected_version: expected,
    }
}

fn options() -> CleanupOptions {
    CleanupOptions { max_passes: 3 }
}

#[test]
fn solution_cleanup_rewrites_and_persists() {
    let (temp, workspace) = setup_repo().expect("setup failed");
    let model = CSharpCodeModel::new();
    let result = run_cleanup(
        &workspace,
        &model,
        &request(CleanupScope::Solution, None, Some(1)),
        &options(),
        &CancellationToken::new(),
    )
    .unwrap();

    assert!(result.applied);
    assert_eq!(result.changed_files, vec!["Service.cs".to_string()]);
    assert_eq!(result.previous_version, WorkspaceVersion::new(1));
    assert_eq!(result.workspace_version, WorkspaceVersion::new(2));
    assert_eq!(result.document_count, 2);

    let on_disk = fs::read_to_string(temp.path().join("Service.cs")).unwrap();
    assert!(on_disk.starts_with("using App.Lib;\nusing System;\n\n"));
    assert!(!on_disk.contains("System.Text"));
    assert!(on_disk.contains("public static int Total;"));
    assert!(on_disk.contains("private readonly int _seed;"));
    assert!(on_disk.contains("public Service(int seed) { _seed = seed; }\n"));
    assert_eq!(fs::read_to_string(temp.path().join("Lib.cs")).unwrap(), LIB);
}

#[test]
fn second_cleanup_is_a_no_op() {
    let (_temp, workspace) = setup_repo().expect("setup failed");
    let model = CSharpCodeModel::new();
    let cancel = CancellationToken::new();
    let req = request(CleanupScope::Document, Some("Service.cs"), None);
    run_cleanup(&workspace, &model, &req, &options(), &cancel).unwrap();
    let again = run_cleanup(&workspace, &model, &req, &options(), &cancel).unwrap();
    assert!(!again.applied);
    assert!(again.changes.is_empty());
    assert_eq!(again.workspace_version, WorkspaceVersion::new(2));
}

#[test]
fn stale_expected_version_writes_nothing() {
    let (temp, workspace) = setup_repo().expect("setup failed");
    let err = run_cleanup(
        &workspace,
        &CSharpCodeModel::new(),
        &request(CleanupScope::Project, Some("App"), Some(7)),
        &options(),
        &CancellationToken::new(),
    )
    .unwrap_err();
    assert_eq!(err.code(), "workspace_changed");
    assert_eq!(workspace.current_version(), WorkspaceVersion::new(1));
    assert_eq!(
        fs::read_to_string(temp.path().join("Service.cs")).unwrap(),
        SERVICE
    );
}

#[test]
fn deleted_root_reports_stale_snapshot() {
    let (temp, workspace) = setup_repo().expect("setup failed");
    fs::remove_dir_all(temp.path()).unwrap();

    let err = run_cleanup(
        &workspace,
        &CSharpCodeModel::new(),
        &request(CleanupScope::Solution, None, None),
        &options(),
        &CancellationToken::new(),
    )
    .unwrap_err();
    assert_eq!(err.code(), "stale_workspace_snapshot");
    let data = err.data().unwrap();
    assert_eq!(data["health_check_performed"], serde_json::json!(true));
    assert_eq!(data["auto_reload_attempted"], serde_json::json!(true));
    assert_eq!(data["auto_reload_succeeded"], serde_json::json!(false));
    assert_eq!(data["missing_file_count"], serde_json::json!(2));
    assert_eq!(workspace.current_version(), WorkspaceVersion::new(1));
}

#[test]
fn one_reload_recovers_from_a_deleted_file() {
    let (temp, workspace) = setup_repo().expect("setup failed");
    fs::remove_file(temp.path().join("Lib.cs")).unwrap();

    let result = run_cleanup(
        &workspace,
        &CSharpCodeModel::new(),
        &request(CleanupScope::Solution, None, None),
        &options(),
        &CancellationToken::new(),
    )
    .unwrap();
    assert!(result.reloaded);
    assert_eq!(result.document_count, 1);
    assert_eq!(result.previous_version, WorkspaceVersion::new(2));
}

#[test]
fn deleted_document_in_document_scope_stays_stale_after_reload() {
    let (temp, workspace) = setup_repo().expect("setup failed");
    fs::remove_file(temp.path().join("Lib.cs")).unwrap();

    let err = run_cleanup(
        &workspace,
        &CSharpCodeModel::new(),
        &request(CleanupScope::Document, Some("Lib.cs"), None),
        &options(),
        &CancellationToken::new(),
    )
    .unwrap_err();
    assert_eq!(err.code(), "stale_workspace_snapshot");
    let data = err.data().unwrap();
    assert_eq!(data["auto_reload_attempted"], serde_json::json!(true));
    assert_eq!(data["auto_reload_succeeded"], serde_json::json!(true));
}

#[test]
fn in_memory_host_cannot_reload() {
    struct Missing(Workspace);

    impl SessionHost for Missing {
        fn current(&self) -> (std::sync::Arc<Snapshot>, WorkspaceVersion) {
            self.0.current()
        }

        fn commit(
            &self,
            base: WorkspaceVersion,
            snapshot: Snapshot,
        ) -> codeact::error::Result<WorkspaceVersion> {
            self.0.commit(base, snapshot)
        }
    }

    let host = Missing(Workspace::in_memory(
        Snapshot::builder()
            .document(
                "App",
                "Gone.cs",
                "class Gone { }\n",
                Some(std::path::PathBuf::from("/nonexistent/codeact/Gone.cs")),
            )
            .build(),
    ));
    let err = run_cleanup(
        &host,
        &CSharpCodeModel::new(),
        &request(CleanupScope::Document, Some("Gone.cs"), None),
        &options(),
        &CancellationToken::new(),
    )
    .unwrap_err();
    let data = err.data().unwrap();
    assert_eq!(data["auto_reload_attempted"], serde_json::json!(false));
    assert_eq!(data["missing_files"], serde_json::json!(["Gone.cs"]));
}

#[test]
fn cancelled_cleanup_commits_nothing() {
    let (temp, workspace) = setup_repo().expect("setup failed");
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = run_cleanup(
        &workspace,
        &CSharpCodeModel::new(),
        &request(CleanupScope::Solution, None, None),
        &options(),
        &cancel,
    )
    .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(workspace.current_version(), WorkspaceVersion::new(1));
    assert_eq!(
        fs::read_to_string(temp.path().join("Service.cs")).unwrap(),
        SERVICE
    );
}

#[test]
fn organize_imports_reaches_a_fixpoint() {
    let source = "using static System.Math;\nusing Z = System.Text.StringBuilder;\nusing System.Linq;\nusing System;\n\nnamespace App\n{\n    using System.IO;\n    using System.Collections;\n\n    class A { }\n}\n";
    let snapshot = Snapshot::builder()
        .document("App", "a.cs", source, None)
        .build();
    let model = CSharpCodeModel::new();
    let once = model.organize_imports(&snapshot, "a.cs").unwrap();
    let twice = model.organize_imports(&once, "a.cs").unwrap();
    assert_ne!(once.text("a.cs"), snapshot.text("a.cs"));
    assert_eq!(once.text("a.cs"), twice.text("a.cs"));
    assert!(codeact::changes::change_set(&once, &twice).is_empty());
}
