pub mod definitions;
pub mod dispatch;

pub use definitions::{ToolDefinition, tool_definitions};
pub use dispatch::{INTERNAL_ERROR, NOT_FOUND, ToolError, VALIDATION_ERROR, dispatch_tool};
