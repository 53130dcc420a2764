use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::service::TaskService;
use crate::tool::{dispatch_tool, tool_definitions};

/// Upper bound on tool-call rounds per question.
const MAX_TOOL_ROUNDS: usize = 8;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub reply: String,
}

#[async_trait]
pub trait AgentClient: Send + Sync {
    async fn ask(&self, prompt: &str) -> Result<String, AppError>;
}

/// Chat-completions client for any OpenAI-compatible endpoint. Advertises
/// the task tools and executes requested calls through the dispatcher.
pub struct OpenAiAgent {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    tasks: Arc<TaskService>,
}

impl OpenAiAgent {
    pub fn new(config: &Config, api_key: String, tasks: Arc<TaskService>) -> Result<Self, AppError> {
        let client = Client::builder().build().map_err(|e| {
            error!("failed to build http client: {}", e);
            AppError::Internal
        })?;
        Ok(Self {
            client,
            api_key,
            model: config.openai_model.clone(),
            base_url: config.openai_base_url.clone(),
            tasks,
        })
    }

    fn tool_specs() -> Vec<Value> {
        tool_definitions()
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.input_schema,
                    }
                })
            })
            .collect()
    }

    async fn complete(&self, messages: &[Value]) -> Result<Value, AppError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request_body = json!({
            "model": self.model,
            "messages": messages,
            "tools": Self::tool_specs(),
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!("request to model provider failed: {}", e);
                AppError::Internal
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("model provider error {}: {}", status, body);
            return Err(AppError::Internal);
        }

        response.json::<Value>().await.map_err(|e| {
            error!("failed to parse model response: {}", e);
            AppError::Internal
        })
    }
}

#[async_trait]
impl AgentClient for OpenAiAgent {
    async fn ask(&self, prompt: &str) -> Result<String, AppError> {
        let mut messages = vec![json!({ "role": "user", "content": prompt })];

        for _ in 0..MAX_TOOL_ROUNDS {
            let completion = self.complete(&messages).await?;
            let message = completion["choices"][0]["message"].clone();
            if message.is_null() {
                error!("model response carried no message");
                return Err(AppError::Internal);
            }
            messages.push(message.clone());

            let tool_calls = message
                .get("tool_calls")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            if tool_calls.is_empty() {
                let reply = message
                    .get("content")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                return Ok(reply);
            }

            for call in tool_calls {
                let call_id = call["id"].as_str().unwrap_or_default().to_string();
                let name = call["function"]["name"].as_str().unwrap_or_default().to_string();
                let arguments = call["function"]["arguments"]
                    .as_str()
                    .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
                    .unwrap_or_else(|| json!({}));

                let outcome = match dispatch_tool(&self.tasks, &name, arguments).await {
                    Ok(value) => value.to_string(),
                    Err(err) => {
                        warn!("tool call {} failed: {}: {}", name, err.code, err.message);
                        format!("{}: {}", err.code, err.message)
                    }
                };

                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": call_id,
                    "content": outcome,
                }));
            }
        }

        error!("agent exceeded {} tool rounds", MAX_TOOL_ROUNDS);
        Err(AppError::Internal)
    }
}

/// Stand-in used when no API key is configured.
pub struct DisabledAgent;

#[async_trait]
impl AgentClient for DisabledAgent {
    async fn ask(&self, _prompt: &str) -> Result<String, AppError> {
        Err(AppError::Validation(
            "agent is disabled: OPENAI_API_KEY is not set".to_string(),
        ))
    }
}
