//! OpenAI-compatible adapter.
//!
//! Works with OpenAI, DeepSeek, and any provider using the
//! OpenAI chat completions API format. The session holds the message
//! list (system prompt first) and replays it on every request.
//! Uses browser `fetch()` via gloo-net for WASM compatibility.

use std::cell::RefCell;
use async_trait::async_trait;
use gloo_net::http::Request;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use archive_core::ports::*;
use archive_types::{
    ArchiveError, Result,
    config::ModelConfig,
    tool::{ToolInvocationRequest, ToolResult},
};
use super::{http_error, transport_error};

/// Provider that speaks the OpenAI chat completions protocol.
pub struct OpenAiCompatProvider {
    config: ModelConfig,
    base_url: String,
}

impl OpenAiCompatProvider {
    pub fn new(config: ModelConfig) -> Self {
        let base_url = config.base_url();
        Self { config, base_url }
    }
}

#[async_trait(?Send)]
impl ModelPort for OpenAiCompatProvider {
    async fn create_session(&self, spec: SessionSpec) -> Result<Box<dyn ModelSession>> {
        let system = json!({ "role": "system", "content": spec.system_instruction });
        Ok(Box::new(OpenAiCompatSession {
            url: format!("{}/v1/chat/completions", self.base_url),
            config: self.config.clone(),
            tools: tools_json(&spec),
            temperature: spec.temperature,
            history: RefCell::new(vec![system]),
        }))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

pub struct OpenAiCompatSession {
    url: String,
    config: ModelConfig,
    tools: Option<Value>,
    temperature: f32,
    history: RefCell<Vec<Value>>,
}

impl OpenAiCompatSession {
    fn build_request_body(&self) -> Value {
        let messages = self.history.borrow().clone();
        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
            "max_tokens": self.config.max_tokens,
            "temperature": self.temperature,
        });
        if let Some(tools) = &self.tools {
            body["tools"] = tools.clone();
        }
        body
    }

    async fn exchange(&self, entry: Value) -> Result<ModelReply> {
        let checkpoint = self.history.borrow().len();
        self.history.borrow_mut().push(entry);
        let body = self.build_request_body();

        match self.post(&body).await.and_then(parse_response) {
            Ok((message, reply)) => {
                self.history.borrow_mut().push(message);
                Ok(reply)
            }
            Err(e) => {
                self.history.borrow_mut().truncate(checkpoint);
                Err(e)
            }
        }
    }

    async fn post(&self, body: &Value) -> Result<Value> {
        let response = Request::post(&self.url)
            .header("Content-Type", "application/json")
            .header("Authorization", &format!("Bearer {}", self.config.api_key))
            .json(body)
            .map_err(transport_error)?
            .send()
            .await
            .map_err(transport_error)?;

        if !response.ok() {
            return Err(http_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ArchiveError::Remote(e.to_string()))
    }
}

#[async_trait(?Send)]
impl ModelSession for OpenAiCompatSession {
    async fn send_message(&self, text: &str) -> Result<ModelReply> {
        self.exchange(json!({ "role": "user", "content": text })).await
    }

    async fn send_tool_result(&self, result: &ToolResult) -> Result<ModelReply> {
        self.exchange(tool_message(result)).await
    }
}

// ─── Request shapes ──────────────────────────────────────────

pub fn tools_json(spec: &SessionSpec) -> Option<Value> {
    if spec.tools.is_empty() {
        return None;
    }
    let tools: Vec<Value> = spec
        .tools
        .iter()
        .map(|t| {
            json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                }
            })
        })
        .collect();
    Some(json!(tools))
}

pub fn tool_message(result: &ToolResult) -> Value {
    json!({
        "role": "tool",
        "tool_call_id": result.tool_call_id,
        "content": result.result.to_string(),
    })
}

// ─── API response types ──────────────────────────────────────

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: Value,
}

#[derive(Deserialize)]
struct ApiToolCall {
    id: String,
    function: ApiFunction,
}

#[derive(Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// Split a completion into the assistant message to keep in history and
/// the reply handed to the core. Only the first tool call is kept.
pub fn parse_response(data: Value) -> Result<(Value, ModelReply)> {
    let data: ApiResponse = serde_json::from_value(data)
        .map_err(|e| ArchiveError::Remote(format!("malformed response: {}", e)))?;

    let mut message = data
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| ArchiveError::Remote("No choices in response".to_string()))?;

    let text = message
        .get("content")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(String::from);

    let first_call = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .and_then(|calls| calls.first().cloned());

    let mut tool_calls = Vec::new();
    if let Some(raw) = first_call {
        let call: ApiToolCall = serde_json::from_value(raw.clone())
            .map_err(|e| ArchiveError::Remote(format!("malformed tool call: {}", e)))?;
        tool_calls.push(ToolInvocationRequest {
            id: call.id,
            name: call.function.name,
            args: parse_arguments(&call.function.arguments),
        });
        message["tool_calls"] = json!([raw]);
    }

    let usage = data.usage.map(|u| TokenUsage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok((message, ModelReply { text, tool_calls, usage }))
}

/// Arguments arrive as a JSON string. Anything that is not an object
/// becomes an empty map and fails validation in the dispatcher.
fn parse_arguments(raw: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            log::warn!("Tool call arguments are not a JSON object: {}", raw);
            Map::new()
        }
    }
}
