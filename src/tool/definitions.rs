use serde_json::{Value, json};

/// One invocable action of the tool protocol. The description carries the
/// input shape and a literal example payload so programmatic callers can
/// construct requests without reading this source.
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "create_task",
            description: "Creates a new task. \
                Input: title (required, non-empty), optional description, optional status \
                (one of pending, in_progress, done; defaults to pending). \
                Output: the created task including id, status, created_at and updated_at. \
                Example: {\"title\": \"Write docs\", \"description\": \"draft\", \"status\": \"pending\"}",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string", "description": "Non-empty task title" },
                    "description": { "type": ["string", "null"] },
                    "status": { "type": "string", "enum": ["pending", "in_progress", "done"] }
                },
                "required": ["title"]
            }),
        },
        ToolDefinition {
            name: "list_tasks",
            description: "Retrieves tasks filtered by optional query parameters, ordered by id. \
                Input: optional id, title, description, status, created_at, updated_at. \
                Title and description match as case-insensitive substrings, timestamps are \
                lower bounds, and all present filters must hold at once. \
                Output: a list of matching tasks; an empty list if none match. \
                Example: {\"status\": \"done\"} or {} for every task.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": { "type": "integer" },
                    "title": { "type": "string", "description": "Substring match" },
                    "description": { "type": "string", "description": "Substring match" },
                    "status": { "type": "string", "enum": ["pending", "in_progress", "done"] },
                    "created_at": { "type": "string", "format": "date-time", "description": "Lower bound" },
                    "updated_at": { "type": "string", "format": "date-time", "description": "Lower bound" }
                }
            }),
        },
        ToolDefinition {
            name: "get_task_by_id",
            description: "Retrieves a single task by its id. \
                Input: id (integer). Output: the task. \
                Fails with code 'not_found' if the task does not exist. \
                Example: {\"id\": 1}",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": { "type": "integer" }
                },
                "required": ["id"]
            }),
        },
        ToolDefinition {
            name: "update_task",
            description: "Partially updates a task by its id; only the fields present in the \
                payload are applied, and updated_at is refreshed. Passing description as null \
                clears it, omitting it leaves it unchanged. \
                Output: the updated task. \
                Fails with code 'not_found' if the task does not exist, \
                'validation_error' if the payload is malformed. \
                Example: {\"id\": 1, \"status\": \"done\"}",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": { "type": "integer" },
                    "title": { "type": "string" },
                    "description": { "type": ["string", "null"] },
                    "status": { "type": "string", "enum": ["pending", "in_progress", "done"] }
                },
                "required": ["id"]
            }),
        },
        ToolDefinition {
            name: "delete_task",
            description: "Deletes a task by its id. \
                Input: id (integer). Output: true on successful deletion. \
                Fails with code 'not_found' if the task does not exist. \
                Example: {\"id\": 1}",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": { "type": "integer" }
                },
                "required": ["id"]
            }),
        },
    ]
}
