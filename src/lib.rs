pub mod actions;
pub mod callgraph;
pub mod cancel;
pub mod changes;
pub mod cleanup;
pub mod cli;
pub mod codemodel;
pub mod config;
pub mod csharp;
pub mod error;
pub mod mcp;
pub mod model;
pub mod rpc;
pub mod symbols;
pub mod util;
pub mod workspace;
