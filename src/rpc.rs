use crate::actions::{self, discovery::ActionQuery};
use crate::callgraph::{self, CallGraphOptions, CallGraphRequest};
use crate::cancel::CancellationToken;
use crate::changes::{ChangeSet, change_set};
use crate::cleanup::{self, CleanupOptions, CleanupRequest};
use crate::codemodel::CodeModel;
use crate::config::Config;
use crate::csharp::CSharpCodeModel;
use crate::error::{Result, ToolError};
use crate::model::{ProjectSummary, SourceLocation, Symbol, SymbolCompact, SymbolKind, WorkspaceStatus};
use crate::symbols::{self, SymbolIndex};
use crate::workspace::{LoadOptions, SessionHost, Snapshot, Workspace, WorkspaceVersion};
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Hard cap on `find_symbol` results.
const MAX_SYMBOL_LIMIT: usize = 200;

#[derive(Deserialize)]
struct RpcRequest {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Serialize)]
struct RpcResponse {
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Serialize)]
struct RpcError {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

#[derive(Deserialize, Default, schemars::JsonSchema)]
struct ListMethodsParams {
    /// `details` (default) or `names`.
    format: Option<String>,
}

#[derive(Deserialize, schemars::JsonSchema)]
struct TokenParams {
    token: String,
}

#[derive(Deserialize, schemars::JsonSchema)]
struct ListFixesParams {
    path: String,
    diagnostic_id: Option<String>,
}

#[derive(Deserialize, schemars::JsonSchema)]
struct FindSymbolParams {
    #[serde(alias = "name")]
    query: String,
    kind: Option<SymbolKind>,
    limit: Option<usize>,
}

#[derive(Deserialize, schemars::JsonSchema)]
struct SymbolParams {
    #[serde(alias = "id")]
    symbol_id: String,
}

#[derive(Deserialize, schemars::JsonSchema)]
struct RenameParams {
    #[serde(alias = "id")]
    symbol_id: String,
    new_name: String,
    expected_version: Option<u64>,
}

pub const METHOD_LIST: &[&str] = &[
    // -- Session --
    "help",
    "list_methods",
    "workspace_status",
    "reload_workspace",
    // -- Code actions --
    "discover_actions",
    "preview_action",
    "apply_action",
    "evaluate_policy",
    "list_fixes",
    "preview_fix",
    "apply_fix",
    "cleanup",
    // -- Navigation --
    "find_symbol",
    "symbol_info",
    "find_references",
    "find_implementations",
    "find_callers",
    "call_graph",
    "rename_symbol",
];

struct MethodDoc {
    name: &'static str,
    summary: &'static str,
    key_params: &'static [&'static str],
}

const METHOD_DOCS: &[MethodDoc] = &[
    MethodDoc {
        name: "help",
        summary: "Show RPC help and examples.",
        key_params: &[],
    },
    MethodDoc {
        name: "list_methods",
        summary: "List supported methods with parameter schemas.",
        key_params: &["format (details|names)"],
    },
    MethodDoc {
        name: "workspace_status",
        summary: "Current workspace version, projects and document counts.",
        key_params: &[],
    },
    MethodDoc {
        name: "reload_workspace",
        summary: "Reload every document from disk; bumps the workspace version.",
        key_params: &[],
    },
    MethodDoc {
        name: "discover_actions",
        summary: "Fixes, refactorings and built-in actions at a position, each with a version-bound token.",
        key_params: &["path", "line", "column", "end_line", "end_column", "profile"],
    },
    MethodDoc {
        name: "preview_action",
        summary: "Change-set an action token would produce. Never writes.",
        key_params: &["token"],
    },
    MethodDoc {
        name: "apply_action",
        summary: "Apply an action token if policy allows it. Single use.",
        key_params: &["token"],
    },
    MethodDoc {
        name: "evaluate_policy",
        summary: "Fresh policy decision for an action token.",
        key_params: &["token"],
    },
    MethodDoc {
        name: "list_fixes",
        summary: "Unused-local fixes in a document, as fix tokens.",
        key_params: &["path", "diagnostic_id"],
    },
    MethodDoc {
        name: "preview_fix",
        summary: "Change-set a fix token would produce.",
        key_params: &["token"],
    },
    MethodDoc {
        name: "apply_fix",
        summary: "Apply a fix token. Single use.",
        key_params: &["token"],
    },
    MethodDoc {
        name: "cleanup",
        summary: "Run the ordered cleanup rules over a document, project or the whole workspace.",
        key_params: &["scope (document|project|solution)", "path", "profile", "expected_version"],
    },
    MethodDoc {
        name: "find_symbol",
        summary: "Search declared symbols by name or qualified name.",
        key_params: &["query", "kind", "limit"],
    },
    MethodDoc {
        name: "symbol_info",
        summary: "Full symbol record, with members for types.",
        key_params: &["symbol_id"],
    },
    MethodDoc {
        name: "find_references",
        summary: "Source locations referring to a symbol.",
        key_params: &["symbol_id"],
    },
    MethodDoc {
        name: "find_implementations",
        summary: "Derived types, or overriding/implementing members.",
        key_params: &["symbol_id"],
    },
    MethodDoc {
        name: "find_callers",
        summary: "Call sites of a symbol with their enclosing member.",
        key_params: &["symbol_id"],
    },
    MethodDoc {
        name: "call_graph",
        summary: "Bounded breadth-first call graph around a symbol.",
        key_params: &["symbol_id", "direction (incoming|outgoing|both)", "max_depth"],
    },
    MethodDoc {
        name: "rename_symbol",
        summary: "Rename a symbol and every reference to it.",
        key_params: &["symbol_id", "new_name", "expected_version"],
    },
];

fn schema_value<T: schemars::JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    let raw = serde_json::to_value(schema).unwrap_or_else(|_| json!({"type": "object"}));
    simplify_schema(raw)
}

/// Simplified JSON Schema for the params of `method`.
pub fn method_param_schema(method: &str) -> Value {
    match method {
        "list_methods" => schema_value::<ListMethodsParams>(),
        "discover_actions" => schema_value::<ActionQuery>(),
        "preview_action" | "apply_action" | "evaluate_policy" | "preview_fix" | "apply_fix" => {
            schema_value::<TokenParams>()
        }
        "list_fixes" => schema_value::<ListFixesParams>(),
        "cleanup" => schema_value::<CleanupRequest>(),
        "call_graph" => schema_value::<CallGraphRequest>(),
        "find_symbol" => schema_value::<FindSymbolParams>(),
        "symbol_info" | "find_references" | "find_implementations" | "find_callers" => {
            schema_value::<SymbolParams>()
        }
        "rename_symbol" => schema_value::<RenameParams>(),
        _ => json!({"type": "object"}),
    }
}

fn simplify_schema(mut schema: Value) -> Value {
    let definitions = schema
        .get("definitions")
        .cloned()
        .unwrap_or_else(|| json!({}));
    inline_refs(&mut schema, &definitions);
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
        obj.remove("definitions");
        obj.remove("title");
    }
    schema
}

/// Inline `$ref`s and collapse the `anyOf [T, null]` that `Option<T>` produces.
fn inline_refs(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            let target = map
                .get("$ref")
                .and_then(|reference| reference.as_str())
                .and_then(|reference| reference.strip_prefix("#/definitions/"))
                .and_then(|name| definitions.get(name))
                .cloned();
            if let Some(mut inlined) = target {
                inline_refs(&mut inlined, definitions);
                *value = inlined;
                return;
            }
            let nullable_inner = map
                .get("anyOf")
                .and_then(|any_of| any_of.as_array())
                .filter(|variants| variants.len() == 2)
                .and_then(|variants| {
                    let null_idx = variants
                        .iter()
                        .position(|v| v.get("type").and_then(|t| t.as_str()) == Some("null"))?;
                    Some(variants[1 - null_idx].clone())
                });
            if let Some(mut inner) = nullable_inner {
                inline_refs(&mut inner, definitions);
                *value = inner;
                return;
            }
            for (_, child) in map.iter_mut() {
                inline_refs(child, definitions);
            }
            if map.get("type").and_then(|t| t.as_str()) == Some("integer") {
                map.remove("format");
                map.remove("minimum");
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                inline_refs(item, definitions);
            }
        }
        _ => {}
    }
}

fn method_docs_json() -> Vec<Value> {
    METHOD_DOCS
        .iter()
        .map(|doc| {
            let mut entry = serde_json::Map::new();
            entry.insert("name".to_string(), Value::String(doc.name.to_string()));
            entry.insert("summary".to_string(), Value::String(doc.summary.to_string()));
            if !doc.key_params.is_empty() {
                entry.insert("key_params".to_string(), json!(doc.key_params));
            }
            entry.insert("params_schema".to_string(), method_param_schema(doc.name));
            Value::Object(entry)
        })
        .collect()
}

fn method_help() -> Value {
    json!({
        "summary": "codeact serves code actions, cleanup and navigation for a C# workspace over JSONL RPC on stdin/stdout.",
        "start_here": "Call discover_actions at a cursor position, preview_action the token you want, then apply_action it. Tokens are bound to the workspace version they were discovered at; after any change, discover again.",
        "errors": {
            "invalid_input": "bad parameters; fix and retry",
            "action_not_found": "token undecodable or its action is gone; discover again",
            "fix_not_found": "fix token undecodable or its fix is gone; list fixes again",
            "workspace_changed": "token or expected_version is stale; discover again",
            "policy_blocked": "policy did not allow the action; do not retry the same token",
            "fix_conflict": "the action would change nothing",
            "stale_workspace_snapshot": "scoped files are missing on disk and reload did not help",
            "cancelled": "operation was cancelled; nothing was written",
        },
        "enum_values": {
            "scope (cleanup)": ["document", "project", "solution"],
            "direction (call_graph)": ["incoming", "outgoing", "both"],
            "profile (discover_actions)": [actions::DEFAULT_PROFILE],
            "profile (cleanup)": [actions::policy::CLEANUP_PROFILE],
        },
        "methods": METHOD_LIST,
        "examples": [
            { "method": "discover_actions", "params": { "path": "src/App/Service.cs", "line": 12, "column": 13 } },
            { "method": "preview_action", "params": { "token": "v1|..." } },
            { "method": "cleanup", "params": { "scope": "project", "path": "App", "expected_version": 3 } },
            { "method": "find_symbol", "params": { "query": "OrderService", "kind": "class" } },
            { "method": "call_graph", "params": { "symbol_id": "sym_0123456789abcdef", "direction": "outgoing", "max_depth": 2 } }
        ],
        "cli_examples": [
            r#"codeact request --root . --method workspace_status"#,
            r#"codeact request --root . --method find_symbol --params '{"query":"Service"}'"#,
            "codeact serve --root .",
            "codeact mcp-serve --root ."
        ]
    })
}

fn method_list(params: Value) -> Result<Value> {
    let params: ListMethodsParams = if params.is_null() {
        ListMethodsParams::default()
    } else {
        parse(params)?
    };
    let format = params
        .format
        .as_deref()
        .unwrap_or("details")
        .trim()
        .to_ascii_lowercase();
    if format == "names" {
        return Ok(json!(METHOD_LIST));
    }
    Ok(json!({
        "methods": method_docs_json(),
        "names": METHOD_LIST,
    }))
}

/// One workspace plus the code model serving it.
pub struct Session {
    host: Arc<dyn SessionHost>,
    model: CSharpCodeModel,
}

impl Session {
    pub fn new(host: Arc<dyn SessionHost>) -> Self {
        Self {
            host,
            model: CSharpCodeModel::new(),
        }
    }

    pub fn open(root: &Path, options: LoadOptions) -> anyhow::Result<Self> {
        let workspace = Workspace::open(root, options)?;
        Ok(Self::new(Arc::new(workspace)))
    }

    pub fn in_memory(snapshot: Snapshot) -> Self {
        Self::new(Arc::new(Workspace::in_memory(snapshot)))
    }

    pub fn host(&self) -> &dyn SessionHost {
        self.host.as_ref()
    }

    pub fn model(&self) -> &dyn CodeModel {
        &self.model
    }
}

fn parse<T: DeserializeOwned>(params: Value) -> Result<T> {
    let params = if params.is_null() { json!({}) } else { params };
    serde_json::from_value(params).map_err(|err| ToolError::invalid_input(format!("params: {err}")))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|err| ToolError::internal(format!("serialize: {err}")))
}

fn resolve_symbol<'a>(index: &'a SymbolIndex, raw: &str) -> Result<&'a Symbol> {
    let id = raw.trim();
    if !symbols::is_well_formed(id) {
        return Err(ToolError::invalid_input(format!("malformed symbol id: {id:?}")));
    }
    index
        .resolve(id)
        .ok_or_else(|| ToolError::invalid_input(format!("symbol not found: {id}")))
}

fn workspace_status(session: &Session) -> WorkspaceStatus {
    let host = session.host();
    let (snapshot, version) = host.current();
    let projects: Vec<ProjectSummary> = snapshot
        .projects()
        .map(|project| ProjectSummary {
            name: project.name.clone(),
            project_file: project.project_file.clone(),
            document_count: project.documents.len(),
        })
        .collect();
    WorkspaceStatus {
        workspace_version: version,
        root: snapshot.root().map(|root| root.to_string_lossy().to_string()),
        project_count: projects.len(),
        document_count: snapshot.document_count(),
        supports_reload: host.supports_reload(),
        projects,
    }
}

#[derive(Serialize)]
struct RenameResult {
    applied: bool,
    symbol: SymbolCompact,
    new_name: String,
    previous_version: WorkspaceVersion,
    workspace_version: WorkspaceVersion,
    changed_files: Vec<String>,
    changes: ChangeSet,
}

fn rename_symbol(session: &Session, params: RenameParams) -> Result<RenameResult> {
    let host = session.host();
    let (snapshot, version) = host.current();
    if let Some(expected) = params.expected_version.map(WorkspaceVersion::new) {
        if expected != version {
            return Err(ToolError::workspace_changed(expected, version));
        }
    }
    let index = session.model().symbols(&snapshot)?;
    let symbol = resolve_symbol(&index, &params.symbol_id)?;
    let next = session
        .model()
        .rename_symbol(&snapshot, symbol, &params.new_name)?;
    let changes = change_set(&snapshot, &next);
    if changes.is_empty() {
        return Ok(RenameResult {
            applied: false,
            symbol: SymbolCompact::from(symbol),
            new_name: params.new_name,
            previous_version: version,
            workspace_version: version,
            changed_files: Vec::new(),
            changes,
        });
    }
    let committed = host.commit(version, next)?;
    log::info!(
        "renamed {} to {} across {} file(s)",
        symbol.qualname,
        params.new_name,
        changes.files.len()
    );
    Ok(RenameResult {
        applied: true,
        symbol: SymbolCompact::from(symbol),
        new_name: params.new_name,
        previous_version: version,
        workspace_version: committed,
        changed_files: changes.paths(),
        changes,
    })
}

fn with_snippets(snapshot: &Snapshot, locations: Vec<SourceLocation>) -> Vec<Value> {
    locations
        .into_iter()
        .map(|location| {
            let snippet = snapshot.text(&location.path).and_then(|text| {
                let at = location.span.start.min(text.len());
                let start = text[..at].rfind('\n').map(|idx| idx + 1).unwrap_or(0);
                let end = text[at..].find('\n').map(|idx| at + idx).unwrap_or(text.len());
                crate::util::evidence_snippet(text, start, end)
            });
            json!({ "location": location, "snippet": snippet })
        })
        .collect()
}

pub fn handle_method(session: &Session, method: &str, params: Value) -> Result<Value> {
    handle_method_with_cancel(session, method, params, &CancellationToken::new())
}

pub fn handle_method_with_cancel(
    session: &Session,
    method: &str,
    params: Value,
    cancel: &CancellationToken,
) -> Result<Value> {
    let start = Instant::now();
    let host = session.host();
    let model = session.model();
    let value = match method {
        "help" => method_help(),
        "list_methods" => method_list(params)?,
        "workspace_status" => to_value(&workspace_status(session))?,
        "reload_workspace" => {
            let version = host.reload()?;
            json!({ "workspace_version": version })
        }
        "discover_actions" => {
            let query: ActionQuery = parse(params)?;
            to_value(&actions::discover_actions(host, model, &query)?)?
        }
        "preview_action" => {
            let params: TokenParams = parse(params)?;
            to_value(&actions::preview_action(host, model, &params.token)?)?
        }
        "apply_action" => {
            let params: TokenParams = parse(params)?;
            to_value(&actions::apply_action(host, model, &params.token)?)?
        }
        "evaluate_policy" => {
            let params: TokenParams = parse(params)?;
            to_value(&actions::evaluate_action_policy(host, model, &params.token)?)?
        }
        "list_fixes" => {
            let params: ListFixesParams = parse(params)?;
            to_value(&actions::list_fixes(
                host,
                model,
                &params.path,
                params.diagnostic_id.as_deref(),
            )?)?
        }
        "preview_fix" => {
            let params: TokenParams = parse(params)?;
            to_value(&actions::preview_fix(host, model, &params.token)?)?
        }
        "apply_fix" => {
            let params: TokenParams = parse(params)?;
            to_value(&actions::apply_fix(host, model, &params.token)?)?
        }
        "cleanup" => {
            let request: CleanupRequest = parse(params)?;
            to_value(&cleanup::run_cleanup(
                host,
                model,
                &request,
                &CleanupOptions::default(),
                cancel,
            )?)?
        }
        "call_graph" => {
            let request: CallGraphRequest = parse(params)?;
            to_value(&callgraph::call_graph(
                host,
                model,
                &request,
                &CallGraphOptions::default(),
                cancel,
            )?)?
        }
        "find_symbol" => {
            let params: FindSymbolParams = parse(params)?;
            let limit = params.limit.unwrap_or(20).clamp(1, MAX_SYMBOL_LIMIT);
            let (snapshot, version) = host.current();
            let index = model.symbols(&snapshot)?;
            let hits: Vec<SymbolCompact> = index
                .search(&params.query, params.kind, limit)
                .into_iter()
                .map(SymbolCompact::from)
                .collect();
            json!({ "workspace_version": version, "symbols": hits })
        }
        "symbol_info" => {
            let params: SymbolParams = parse(params)?;
            let (snapshot, version) = host.current();
            let index = model.symbols(&snapshot)?;
            let symbol = resolve_symbol(&index, &params.symbol_id)?;
            let members: Vec<SymbolCompact> = if symbol.kind.is_type() {
                index
                    .members_of(&symbol.qualname)
                    .into_iter()
                    .map(SymbolCompact::from)
                    .collect()
            } else {
                Vec::new()
            };
            json!({ "workspace_version": version, "symbol": symbol, "members": members })
        }
        "find_references" => {
            let params: SymbolParams = parse(params)?;
            let (snapshot, version) = host.current();
            let index = model.symbols(&snapshot)?;
            let symbol = resolve_symbol(&index, &params.symbol_id)?;
            let references = model.find_references(&snapshot, symbol)?;
            let count = references.len();
            json!({
                "workspace_version": version,
                "symbol": SymbolCompact::from(symbol),
                "count": count,
                "references": with_snippets(&snapshot, references),
            })
        }
        "find_implementations" => {
            let params: SymbolParams = parse(params)?;
            let (snapshot, version) = host.current();
            let index = model.symbols(&snapshot)?;
            let symbol = resolve_symbol(&index, &params.symbol_id)?;
            let implementations: Vec<SymbolCompact> = model
                .find_implementations(&snapshot, symbol)?
                .iter()
                .map(SymbolCompact::from)
                .collect();
            json!({
                "workspace_version": version,
                "symbol": SymbolCompact::from(symbol),
                "implementations": implementations,
            })
        }
        "find_callers" => {
            let params: SymbolParams = parse(params)?;
            let (snapshot, version) = host.current();
            let index = model.symbols(&snapshot)?;
            let symbol = resolve_symbol(&index, &params.symbol_id)?;
            let callers: Vec<Value> = model
                .find_callers(&snapshot, symbol)?
                .into_iter()
                .map(|caller| {
                    let qualname = index.resolve(&caller.caller).map(|s| s.qualname.clone());
                    json!({
                        "caller": caller.caller,
                        "caller_qualname": qualname,
                        "location": caller.location,
                    })
                })
                .collect();
            json!({
                "workspace_version": version,
                "symbol": SymbolCompact::from(symbol),
                "callers": callers,
            })
        }
        "rename_symbol" => {
            let params: RenameParams = parse(params)?;
            to_value(&rename_symbol(session, params)?)?
        }
        _ => {
            return Err(ToolError::invalid_request(format!(
                "unknown method: {method}"
            )));
        }
    };
    let elapsed = start.elapsed().as_millis();
    if elapsed >= u128::from(Config::get().slow_op_ms) {
        log::warn!("slow request: {method} took {elapsed}ms");
    } else {
        log::debug!("{method} took {elapsed}ms");
    }
    Ok(value)
}

fn error_response(id: Value, err: &ToolError) -> RpcResponse {
    RpcResponse {
        id,
        result: None,
        error: Some(RpcError {
            code: err.code(),
            message: err.to_string(),
            data: err.data(),
        }),
    }
}

fn handle_request(session: &Session, request: RpcRequest) -> RpcResponse {
    match handle_method(session, &request.method, request.params) {
        Ok(value) => RpcResponse {
            id: request.id,
            result: Some(value),
            error: None,
        },
        Err(err) => {
            if err.is_cancelled() {
                log::info!("{} cancelled", request.method);
            }
            error_response(request.id, &err)
        }
    }
}

/// Handle one JSONL request line and return the serialized response.
pub fn respond(session: &Session, line: &str) -> anyhow::Result<String> {
    let response = match serde_json::from_str::<RpcRequest>(line) {
        Ok(request) => handle_request(session, request),
        Err(err) => error_response(
            Value::Null,
            &ToolError::invalid_request(format!("invalid request: {err}")),
        ),
    };
    Ok(serde_json::to_string(&response)?)
}

pub fn serve(root: &Path, options: LoadOptions) -> anyhow::Result<()> {
    let session = Session::open(root, options)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(value) => value,
            Err(err) => {
                log::error!("stdin error: {err}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        writeln!(stdout, "{}", respond(&session, &line)?)?;
        stdout.flush()?;
    }
    Ok(())
}

pub fn call(
    root: &Path,
    options: LoadOptions,
    method: String,
    params_raw: &str,
    id_raw: &str,
) -> anyhow::Result<String> {
    let params: Value = serde_json::from_str(params_raw).with_context(|| "parse params JSON")?;
    let id = parse_value(id_raw);
    let session = Session::open(root, options)?;
    let response = handle_request(&session, RpcRequest { id, method, params });
    Ok(serde_json::to_string(&response)?)
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::in_memory(
            Snapshot::builder()
                .document(
                    "App",
                    "a.cs",
                    "namespace App\n{\n    class A\n    {\n        void Run() { Helper(); }\n        void Helper() { }\n    }\n}\n",
                    None,
                )
                .build(),
        )
    }

    #[test]
    fn unknown_method_is_invalid_request() {
        let line = respond(&session(), r#"{"id":1,"method":"nope"}"#).unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["id"], json!(1));
        assert_eq!(value["error"]["code"], json!("invalid_request"));
    }

    #[test]
    fn bad_params_are_invalid_input() {
        let err = handle_method(&session(), "preview_action", json!({ "tok": 1 })).unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn list_methods_names_and_schemas() {
        let names = handle_method(&session(), "list_methods", json!({ "format": "names" })).unwrap();
        assert_eq!(names.as_array().unwrap().len(), METHOD_LIST.len());
        let details = handle_method(&session(), "list_methods", Value::Null).unwrap();
        let cleanup = details["methods"]
            .as_array()
            .unwrap()
            .iter()
            .find(|doc| doc["name"] == json!("cleanup"))
            .unwrap();
        assert!(cleanup["params_schema"]["properties"]["scope"].is_object());
    }

    #[test]
    fn every_listed_method_is_documented() {
        for name in METHOD_LIST {
            assert!(METHOD_DOCS.iter().any(|doc| doc.name == *name), "{name}");
        }
    }

    #[test]
    fn find_symbol_then_info() {
        let session = session();
        let found = handle_method(&session, "find_symbol", json!({ "query": "Helper" })).unwrap();
        let id = found["symbols"][0]["id"].as_str().unwrap().to_string();
        let info = handle_method(&session, "symbol_info", json!({ "symbol_id": id })).unwrap();
        assert_eq!(info["symbol"]["qualname"], json!("App.A.Helper"));
        let callers = handle_method(&session, "find_callers", json!({ "id": id })).unwrap();
        assert_eq!(callers["callers"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn reload_unsupported_in_memory() {
        let err = handle_method(&session(), "reload_workspace", Value::Null).unwrap_err();
        assert_eq!(err.code(), "invalid_request");
    }
}
