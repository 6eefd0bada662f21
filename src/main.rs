use anyhow::{Context, Result};
use clap::Parser;
use codeact::cli::{Args, Command};
use codeact::{mcp, rpc};

fn main() -> Result<()> {
    // stdout carries the protocol; logs go to stderr.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    match Args::parse().command {
        Command::Serve { workspace } => rpc::serve(&workspace.root, workspace.load_options()),
        Command::McpServe { workspace } => mcp::serve(&workspace.root, workspace.load_options()),
        Command::Request {
            workspace,
            method,
            params,
            params_file,
            id,
        } => {
            let params_raw = match params_file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("read params file {}", path.display()))?,
                None => params,
            };
            let response = rpc::call(
                &workspace.root,
                workspace.load_options(),
                method,
                &params_raw,
                &id,
            )?;
            println!("{response}");
            Ok(())
        }
    }
}
