use crate::workspace::LoadOptions;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "codeact",
    version,
    about = "Code actions, cleanup and call graphs for C# workspaces",
    after_help = r#"Examples:
  codeact request --root . --method workspace_status
  codeact request --root . --method find_symbol --params '{"query":"OrderService"}'
  codeact request --root . --method discover_actions --params '{"path":"src/App/Service.cs","line":12,"column":13}'
  codeact request --root . --method cleanup --params '{"scope":"solution"}'
  codeact serve --root .
  codeact mcp-serve --root .
"#
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

/// Which workspace to load.
#[derive(clap::Args, Debug, Clone)]
pub struct WorkspaceArgs {
    /// Workspace root; `.csproj` files below it define projects.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
    /// Include files ignored by .gitignore.
    #[arg(long)]
    pub no_ignore: bool,
}

impl WorkspaceArgs {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions::new(self.no_ignore)
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Run JSONL RPC server over stdin/stdout.
    Serve {
        #[command(flatten)]
        workspace: WorkspaceArgs,
    },
    /// Run MCP server over stdin/stdout.
    McpServe {
        #[command(flatten)]
        workspace: WorkspaceArgs,
    },
    /// Run one RPC method and print the JSONL response.
    Request {
        #[command(flatten)]
        workspace: WorkspaceArgs,
        #[arg(long)]
        method: String,
        #[arg(long, default_value = "{}")]
        params: String,
        /// Read params JSON from a file instead of --params.
        #[arg(long)]
        params_file: Option<PathBuf>,
        #[arg(long, default_value = "1")]
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_flags_parse() {
        let args = Args::try_parse_from([
            "codeact",
            "request",
            "--root",
            "/tmp/ws",
            "--no-ignore",
            "--method",
            "cleanup",
        ])
        .unwrap();
        let Command::Request {
            workspace,
            method,
            params,
            id,
            ..
        } = args.command
        else {
            panic!("expected request");
        };
        assert_eq!(workspace.root, PathBuf::from("/tmp/ws"));
        assert!(workspace.no_ignore);
        assert_eq!(method, "cleanup");
        assert_eq!(params, "{}");
        assert_eq!(id, "1");
    }
}
