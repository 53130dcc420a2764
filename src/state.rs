use std::sync::Arc;

use crate::agent::AgentClient;
use crate::service::TaskService;

#[derive(Clone)]
pub struct AppState {
    pub tasks: Arc<TaskService>,
    pub agent: Arc<dyn AgentClient>,
}
