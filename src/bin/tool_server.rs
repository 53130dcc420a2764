//! Tool-protocol entrypoint: JSON-RPC 2.0 over stdio, one request per line.
//! Logs go to stderr; stdout carries only protocol frames.

use serde_json::{Value, json};
use sqlx::sqlite::SqlitePoolOptions;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use taskman::config::Config;
use taskman::service::TaskService;
use taskman::tool::{NOT_FOUND, ToolError, VALIDATION_ERROR, dispatch_tool, tool_definitions};

struct RpcError {
    code: i64,
    message: String,
    data: Option<Value>,
}

impl From<ToolError> for RpcError {
    fn from(err: ToolError) -> Self {
        let code = match err.code {
            VALIDATION_ERROR => -32602,
            NOT_FOUND => -32001,
            _ => -32603,
        };
        Self {
            code,
            message: err.message,
            data: Some(json!({ "code": err.code })),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "taskman=info".to_string()),
        ))
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    let tasks = TaskService::bootstrap(pool, &config.schema_path).await?;

    info!("tool server ready on stdio");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let request: Value = match serde_json::from_str(&line) {
            Ok(value) => value,
            Err(e) => {
                let response = error_frame(
                    Value::Null,
                    RpcError {
                        code: -32700,
                        message: format!("Parse error: {e}"),
                        data: None,
                    },
                );
                write_frame(&mut stdout, &response).await?;
                continue;
            }
        };

        // Requests without an id are notifications; nothing to answer.
        let Some(id) = request.get("id").cloned() else {
            continue;
        };

        let method = request
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let params = request.get("params").cloned().unwrap_or_else(|| json!({}));

        let response = match handle_request(&tasks, method, params).await {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
            Err(err) => error_frame(id, err),
        };
        write_frame(&mut stdout, &response).await?;
    }

    tasks.close().await;

    Ok(())
}

async fn handle_request(
    tasks: &TaskService,
    method: &str,
    params: Value,
) -> Result<Value, RpcError> {
    match method {
        "initialize" => Ok(json!({
            "protocolVersion": "2025-03-26",
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": "taskman",
                "version": env!("CARGO_PKG_VERSION"),
            },
        })),
        "ping" => Ok(json!({})),
        "tools/list" => {
            let tools: Vec<Value> = tool_definitions()
                .iter()
                .map(|tool| {
                    json!({
                        "name": tool.name,
                        "description": tool.description,
                        "inputSchema": tool.input_schema,
                    })
                })
                .collect();
            Ok(json!({ "tools": tools }))
        }
        "tools/call" => {
            let name = params
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let arguments = params
                .get("arguments")
                .cloned()
                .unwrap_or_else(|| json!({}));

            let result = dispatch_tool(tasks, name, arguments).await?;
            Ok(json!({
                "content": [{ "type": "text", "text": result.to_string() }],
            }))
        }
        _ => Err(RpcError {
            code: -32601,
            message: format!("Method not found: {method}"),
            data: None,
        }),
    }
}

fn error_frame(id: Value, err: RpcError) -> Value {
    let mut error = json!({ "code": err.code, "message": err.message });
    if let Some(data) = err.data {
        error["data"] = data;
    }
    json!({ "jsonrpc": "2.0", "id": id, "error": error })
}

async fn write_frame(
    stdout: &mut tokio::io::Stdout,
    frame: &Value,
) -> Result<(), std::io::Error> {
    stdout.write_all(frame.to_string().as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}
