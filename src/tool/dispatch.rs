use serde::Deserialize;
use serde_json::Value;
use tracing::error;

use crate::error::AppError;
use crate::models::{CreateTask, QueryTask, TaskLookup, UpdateTask};
use crate::service::TaskService;

pub const NOT_FOUND: &str = "not_found";
pub const VALIDATION_ERROR: &str = "validation_error";
pub const INTERNAL_ERROR: &str = "internal_error";

/// Tool-level failure: a stable tag plus a human-readable message.
/// Raw store error text never reaches protocol clients.
#[derive(Debug)]
pub struct ToolError {
    pub code: &'static str,
    pub message: String,
}

#[derive(Deserialize)]
struct IdArgs {
    id: i64,
}

#[derive(Deserialize)]
struct UpdateArgs {
    id: i64,
    #[serde(flatten)]
    payload: UpdateTask,
}

pub async fn dispatch_tool(
    tasks: &TaskService,
    name: &str,
    args: Value,
) -> Result<Value, ToolError> {
    match name {
        "create_task" => {
            let payload: CreateTask = parse_args(args)?;
            let task = tasks.create(payload).await.map_err(service_error)?;
            encode(task)
        }
        "list_tasks" => {
            let filter: QueryTask = parse_args(args)?;
            let items = tasks.list(&filter).await.map_err(service_error)?;
            encode(items)
        }
        "get_task_by_id" => {
            let IdArgs { id } = parse_args(args)?;
            let task = tasks
                .read_one(TaskLookup::ById(id))
                .await
                .map_err(service_error)?
                .ok_or_else(|| not_found(id))?;
            encode(task)
        }
        "update_task" => {
            let UpdateArgs { id, payload } = parse_args(args)?;
            let task = tasks
                .update(id, payload)
                .await
                .map_err(service_error)?
                .ok_or_else(|| not_found(id))?;
            encode(task)
        }
        "delete_task" => {
            let IdArgs { id } = parse_args(args)?;
            let deleted = tasks.delete(id).await.map_err(service_error)?;
            if !deleted {
                return Err(not_found(id));
            }
            Ok(Value::Bool(true))
        }
        _ => Err(ToolError {
            code: VALIDATION_ERROR,
            message: format!("Unknown tool: {name}"),
        }),
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError {
        code: VALIDATION_ERROR,
        message: format!("Invalid arguments: {e}"),
    })
}

fn encode<T: serde::Serialize>(value: T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| {
        error!("failed to serialize tool result: {}", e);
        ToolError {
            code: INTERNAL_ERROR,
            message: "Failed to serialize tool result".to_string(),
        }
    })
}

fn not_found(id: i64) -> ToolError {
    ToolError {
        code: NOT_FOUND,
        message: format!("Task with id {id} not found"),
    }
}

fn service_error(err: AppError) -> ToolError {
    match err {
        AppError::Validation(message) => ToolError {
            code: VALIDATION_ERROR,
            message,
        },
        AppError::NotFound => ToolError {
            code: NOT_FOUND,
            message: "Task not found".to_string(),
        },
        AppError::Database(e) => {
            error!("database error in tool call: {}", e);
            ToolError {
                code: INTERNAL_ERROR,
                message: "Unexpected error while accessing the store".to_string(),
            }
        }
        AppError::Internal => ToolError {
            code: INTERNAL_ERROR,
            message: "Internal error".to_string(),
        },
    }
}
