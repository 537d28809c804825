//! Stdio tool server for the query engine.
//!
//! Speaks newline-delimited JSON-RPC 2.0 and exposes two tools:
//! `get_rhymes` and `get_available_words`. Logging goes to stderr; stdout
//! carries protocol messages only.

use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::{AppError, Result};
use crate::services::QueryEngine;

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "rhyme_server";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

/// One incoming JSON-RPC message.
#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

/// `tools/call` parameters.
#[derive(Debug, Deserialize)]
struct ToolCall {
    name: String,
    #[serde(default)]
    arguments: serde_json::Map<String, Value>,
}

/// Arguments of `get_rhymes`.
///
/// `top_k` absent → configured default; explicit `null` → every candidate.
#[derive(Debug, Deserialize)]
struct GetRhymesArgs {
    word: String,
    #[serde(default, deserialize_with = "explicit_null")]
    top_k: Option<Option<i64>>,
}

/// Arguments of `get_available_words`.
#[derive(Debug, Deserialize)]
struct GetAvailableWordsArgs {
    #[serde(default)]
    n: Option<i64>,
}

/// Distinguish a present `null` from an absent field.
fn explicit_null<'de, D>(deserializer: D) -> std::result::Result<Option<Option<i64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

/// Handle one raw line. Returns the reply, if the message expects one.
pub fn handle_line(engine: &QueryEngine, line: &str) -> Option<Value> {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => return Some(error_response(Value::Null, PARSE_ERROR, &e.to_string())),
    };
    let id = value.get("id").cloned();
    let request: Request = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => {
            return Some(error_response(
                id.unwrap_or(Value::Null),
                INVALID_REQUEST,
                &e.to_string(),
            ));
        }
    };
    handle_request(engine, request)
}

fn handle_request(engine: &QueryEngine, request: Request) -> Option<Value> {
    // Notifications carry no id and get no reply.
    let id = request.id?;

    let result = match request.method.as_str() {
        "initialize" => Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
        })),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({ "tools": tool_descriptions(engine) })),
        "tools/call" => match serde_json::from_value::<ToolCall>(request.params) {
            Ok(call) => Ok(call_tool(engine, &call)),
            Err(e) => Err((INVALID_PARAMS, e.to_string())),
        },
        other => Err((METHOD_NOT_FOUND, format!("unknown method: {other}"))),
    };

    Some(match result {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err((code, message)) => error_response(id, code, &message),
    })
}

/// Run a tool. Tool-level failures are reported in-band with `isError`.
fn call_tool(engine: &QueryEngine, call: &ToolCall) -> Value {
    let arguments = Value::Object(call.arguments.clone());
    let outcome = match call.name.as_str() {
        "get_rhymes" => serde_json::from_value::<GetRhymesArgs>(arguments)
            .map_err(AppError::from)
            .and_then(|args| {
                let top_k = args
                    .top_k
                    .unwrap_or(Some(engine.config().top_k_arg()));
                Ok(json!(engine.get_rhymes(&args.word, top_k)?))
            }),
        "get_available_words" => serde_json::from_value::<GetAvailableWordsArgs>(arguments)
            .map_err(AppError::from)
            .and_then(|args| {
                let n = args.n.unwrap_or(engine.config().sample_arg());
                Ok(json!(engine.get_available_words(n)?))
            }),
        other => Err(AppError::validation(format!("unknown tool: {other}"))),
    };

    match outcome {
        Ok(value) => json!({
            "content": [{ "type": "text", "text": value.to_string() }],
            "structuredContent": { "result": value },
            "isError": false,
        }),
        Err(e) => {
            log::warn!("Tool {} rejected: {}", call.name, e);
            json!({
                "content": [{ "type": "text", "text": e.to_string() }],
                "isError": true,
            })
        }
    }
}

fn tool_descriptions(engine: &QueryEngine) -> Value {
    let config = engine.config();
    json!([
        {
            "name": "get_rhymes",
            "description": "Rhyme candidates (rhyme_word, reading) for a word, longest first; \
                            candidates of equal length come in random order. \
                            Empty when the word is unknown.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "word": { "type": "string" },
                    "top_k": {
                        "type": ["integer", "null"],
                        "minimum": 0,
                        "default": config.default_top_k,
                        "description": "Maximum results; null returns every candidate"
                    }
                },
                "required": ["word"]
            }
        },
        {
            "name": "get_available_words",
            "description": format!(
                "Random sample of words that have at least {} rhyme candidates.",
                config.min_candidates
            ),
            "inputSchema": {
                "type": "object",
                "properties": {
                    "n": { "type": "integer", "minimum": 0, "default": config.default_sample }
                }
            }
        }
    ])
}

fn error_response(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message },
    })
}

/// Serve requests from `input` until it closes, writing replies to `output`.
pub async fn serve<R, W>(engine: &QueryEngine, input: R, mut output: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(reply) = handle_line(engine, &line) {
            let mut bytes = serde_json::to_vec(&reply)?;
            bytes.push(b'\n');
            output.write_all(&bytes).await?;
            output.flush().await?;
        }
    }
    Ok(())
}

/// Serve on the process's stdin/stdout.
pub async fn serve_stdio(engine: &QueryEngine) -> Result<()> {
    log::info!("{SERVER_NAME} listening on stdio");
    serve(engine, tokio::io::stdin(), tokio::io::stdout()).await
}
