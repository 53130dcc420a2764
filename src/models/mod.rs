pub mod task;

pub use task::{CreateTask, QueryTask, Task, TaskLookup, TaskStatus, UpdateTask};
