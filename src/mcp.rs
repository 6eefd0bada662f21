use crate::rpc::{self, METHOD_LIST, Session};
use crate::workspace::LoadOptions;
use anyhow::Result;
use serde::Deserialize;
use serde_json::{Value, json};
use std::io::{self, BufRead, Write};
use std::path::Path;

const TOOL_NAME: &str = "codeact_query";
const DEFAULT_PROTOCOL: &str = "2024-11-05";

// JSON-RPC 2.0 error codes.
const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TextMode {
    None,
    Compact,
    #[default]
    Pretty,
}

/// Arguments of one `codeact_query` call.
#[derive(Debug, Deserialize)]
struct ToolArgs {
    method: String,
    #[serde(default)]
    params: Value,
    #[serde(default)]
    text_mode: TextMode,
    #[serde(default = "default_structured")]
    include_structured: bool,
}

fn default_structured() -> bool {
    true
}

pub fn serve(root: &Path, options: LoadOptions) -> Result<()> {
    let session = Session::open(root, options)?;
    log::info!("mcp server ready for {}", root.display());
    let mut stdout = io::stdout();

    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                log::error!("stdin error: {err}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let reply = match serde_json::from_str::<Value>(&line) {
            Ok(message) => handle_message(&session, &message),
            Err(err) => Some(rpc_error(Value::Null, PARSE_ERROR, &format!("parse error: {err}"))),
        };
        if let Some(reply) = reply {
            writeln!(stdout, "{reply}")?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Reply to one client message; notifications get `None`.
fn handle_message(session: &Session, message: &Value) -> Option<Value> {
    let id = message.get("id").cloned();
    let Some(method) = message.get("method").and_then(Value::as_str) else {
        return id.map(|id| rpc_error(id, INVALID_REQUEST, "invalid request"));
    };
    if method.starts_with("notifications/") {
        return None;
    }
    let id = id?;
    let params = message.get("params").cloned().unwrap_or(Value::Null);
    let reply = match method {
        "initialize" => rpc_result(id, initialize_result(&params)),
        "ping" => rpc_result(id, json!({})),
        "tools/list" => rpc_result(id, json!({ "tools": [tool_spec()] })),
        "tools/call" => tool_call(session, id, &params),
        "resources/list" => rpc_result(id, json!({ "resources": [] })),
        "prompts/list" => rpc_result(id, json!({ "prompts": [] })),
        _ => rpc_error(id, METHOD_NOT_FOUND, "method not found"),
    };
    Some(reply)
}

fn initialize_result(params: &Value) -> Value {
    let protocol = params
        .get("protocolVersion")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_PROTOCOL);
    json!({
        "protocolVersion": protocol,
        "capabilities": { "tools": {} },
        "serverInfo": { "name": "codeact", "version": env!("CARGO_PKG_VERSION") },
        "instructions": format!(
            "Call {TOOL_NAME} with a method and params. \
discover_actions {{path, line, column, end_line, end_column, profile}} returns tokens bound to the current workspace version; \
preview_action {{token}} shows the change-set and apply_action {{token}} commits it when policy allows. \
A token dies as soon as the workspace version moves, so discover again after any change. \
cleanup {{scope, path, profile, expected_version}} runs the ordered cleanup rules. \
call_graph {{symbol_id, direction, max_depth}} walks callers and callees; find_symbol {{query}} gives symbol ids. \
list_methods shows the params schema of every method."
        ),
    })
}

fn tool_spec() -> Value {
    json!({
        "name": TOOL_NAME,
        "description": "Code actions, cleanup, call graphs and symbol navigation over the loaded C# workspace.",
        "inputSchema": {
            "type": "object",
            "properties": {
                "method": { "type": "string", "enum": METHOD_LIST },
                "params": { "type": "object", "description": "Method parameters (see list_methods)." },
                "text_mode": { "type": "string", "enum": ["pretty", "compact", "none"] },
                "include_structured": { "type": "boolean" }
            },
            "required": ["method"]
        }
    })
}

fn tool_call(session: &Session, id: Value, params: &Value) -> Value {
    if params.get("name").and_then(Value::as_str) != Some(TOOL_NAME) {
        return rpc_error(id, METHOD_NOT_FOUND, "unknown tool");
    }
    let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
    let args: ToolArgs = match serde_json::from_value(arguments) {
        Ok(args) => args,
        Err(err) => return rpc_error(id, INVALID_PARAMS, &format!("invalid arguments: {err}")),
    };

    let (body, is_error) = match rpc::handle_method(session, &args.method, args.params) {
        Ok(result) => (result, false),
        Err(err) => {
            log::debug!("{} failed: {err}", args.method);
            let error = json!({ "code": err.code(), "message": err.to_string(), "data": err.data() });
            (json!({ "error": error }), true)
        }
    };
    rpc_result(id, tool_result(body, is_error, args.text_mode, args.include_structured))
}

fn tool_result(body: Value, is_error: bool, text_mode: TextMode, structured: bool) -> Value {
    let text = match text_mode {
        TextMode::None => None,
        TextMode::Compact => serde_json::to_string(&body).ok(),
        TextMode::Pretty => serde_json::to_string_pretty(&body).ok(),
    };
    let content: Vec<Value> = text
        .into_iter()
        .map(|text| json!({ "type": "text", "text": text }))
        .collect();
    let mut result = json!({ "content": content, "isError": is_error });
    if structured {
        // structuredContent must be an object.
        result["structuredContent"] = if body.is_object() {
            body
        } else {
            json!({ "items": body })
        };
    }
    result
}

fn rpc_result(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn rpc_error(id: Value, code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::Snapshot;

    fn session() -> Session {
        Session::in_memory(
            Snapshot::builder()
                .document("App", "a.cs", "class A { void Run() { } }\n", None)
                .build(),
        )
    }

    fn call(arguments: Value) -> Value {
        let message = json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": { "name": TOOL_NAME, "arguments": arguments }
        });
        handle_message(&session(), &message).unwrap()
    }

    #[test]
    fn tool_arguments_default_to_pretty_structured() {
        let args: ToolArgs = serde_json::from_value(json!({ "method": "help" })).unwrap();
        assert_eq!(args.text_mode, TextMode::Pretty);
        assert!(args.include_structured);
        assert!(args.params.is_null());
    }

    #[test]
    fn tool_errors_carry_the_rpc_code() {
        let response = call(json!({
            "method": "apply_action",
            "params": { "token": "garbage" },
            "text_mode": "compact"
        }));
        assert_eq!(response["id"], json!(7));
        assert_eq!(response["result"]["isError"], json!(true));
        assert_eq!(
            response["result"]["structuredContent"]["error"]["code"],
            json!("action_not_found")
        );
    }

    #[test]
    fn array_results_are_wrapped() {
        let response = call(json!({
            "method": "list_methods",
            "params": { "format": "names" },
            "text_mode": "none"
        }));
        let result = &response["result"];
        assert!(result["content"].as_array().unwrap().is_empty());
        assert_eq!(
            result["structuredContent"]["items"].as_array().unwrap().len(),
            METHOD_LIST.len()
        );
    }

    #[test]
    fn missing_method_is_invalid_params() {
        let response = call(json!({ "params": {} }));
        assert_eq!(response["error"]["code"], json!(INVALID_PARAMS));
    }

    #[test]
    fn notifications_get_no_reply() {
        let message = json!({ "jsonrpc": "2.0", "method": "notifications/initialized" });
        assert!(handle_message(&session(), &message).is_none());
    }

    #[test]
    fn initialize_echoes_protocol() {
        let message = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": { "protocolVersion": "2025-03-26" }
        });
        let response = handle_message(&session(), &message).unwrap();
        assert_eq!(response["result"]["protocolVersion"], json!("2025-03-26"));
        assert_eq!(response["result"]["serverInfo"]["name"], json!("codeact"));
    }
}
