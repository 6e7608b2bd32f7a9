//! Gemini adapter (`generateContent`).
//!
//! The REST endpoint is stateless, so each session keeps its own
//! `contents` history and replays it with every request. A request that
//! fails leaves the history exactly as it was before the call.
//! Uses browser `fetch()` via gloo-net.

use std::cell::RefCell;
use std::collections::HashSet;
use async_trait::async_trait;
use gloo_net::http::Request;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use archive_core::ports::*;
use archive_types::{
    ArchiveError, Result,
    config::ModelConfig,
    tool::{ToolDefinition, ToolInvocationRequest, ToolResult},
};
use super::{http_error, transport_error};

const API_VERSION: &str = "v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiProvider {
    config: ModelConfig,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(config: ModelConfig) -> Self {
        let base_url = config.base_url();
        Self { config, base_url }
    }

    fn model_url(&self) -> String {
        format!("{}/{}/models/{}", self.base_url, API_VERSION, self.config.model)
    }
}

#[async_trait(?Send)]
impl ModelPort for GeminiProvider {
    async fn create_session(&self, spec: SessionSpec) -> Result<Box<dyn ModelSession>> {
        // Surface a bad key or model name at session creation
        let response = Request::get(&self.model_url())
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await
            .map_err(transport_error)?;
        if !response.ok() {
            return Err(http_error(response).await);
        }

        Ok(Box::new(GeminiSession {
            url: format!("{}:generateContent", self.model_url()),
            api_key: self.config.api_key.clone(),
            max_tokens: self.config.max_tokens,
            spec,
            history: RefCell::new(Vec::new()),
            local_ids: RefCell::new(HashSet::new()),
        }))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

pub struct GeminiSession {
    url: String,
    api_key: String,
    max_tokens: u32,
    spec: SessionSpec,
    history: RefCell<Vec<Value>>,
    /// Invocation ids we minted because the reply carried none; these are
    /// not echoed back in `functionResponse`
    local_ids: RefCell<HashSet<String>>,
}

impl GeminiSession {
    async fn exchange(&self, entry: Value) -> Result<ModelReply> {
        let checkpoint = self.history.borrow().len();
        self.history.borrow_mut().push(entry);
        let body = request_body(&self.spec, self.max_tokens, &self.history.borrow());

        match self.post(&body).await.and_then(parse_response) {
            Ok(turn) => {
                if let Some(content) = turn.content {
                    self.history.borrow_mut().push(content);
                }
                self.local_ids.borrow_mut().extend(turn.local_ids);
                Ok(turn.reply)
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
            .header(API_KEY_HEADER, &self.api_key)
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
impl ModelSession for GeminiSession {
    async fn send_message(&self, text: &str) -> Result<ModelReply> {
        self.exchange(user_entry(text)).await
    }

    async fn send_tool_result(&self, result: &ToolResult) -> Result<ModelReply> {
        let echo_id = !self.local_ids.borrow().contains(&result.tool_call_id);
        self.exchange(function_response_entry(result, echo_id)).await
    }
}

// ─── Request shapes ──────────────────────────────────────────

pub fn request_body(spec: &SessionSpec, max_tokens: u32, history: &[Value]) -> Value {
    let mut body = json!({
        "systemInstruction": { "parts": [{ "text": spec.system_instruction }] },
        "contents": history,
        "generationConfig": {
            "temperature": spec.temperature,
            "maxOutputTokens": max_tokens,
        },
    });

    if !spec.tools.is_empty() {
        let declarations: Vec<Value> = spec.tools.iter().map(function_declaration).collect();
        body["tools"] = json!([{ "functionDeclarations": declarations }]);
    }

    body
}

fn function_declaration(tool: &ToolDefinition) -> Value {
    json!({
        "name": tool.name,
        "description": tool.description,
        "parameters": tool.parameters,
    })
}

pub fn user_entry(text: &str) -> Value {
    json!({ "role": "user", "parts": [{ "text": text }] })
}

pub fn function_response_entry(result: &ToolResult, echo_id: bool) -> Value {
    // `response` must be an object
    let payload = match &result.result {
        Value::Object(_) => result.result.clone(),
        other => json!({ "result": other }),
    };
    let mut response = json!({
        "name": result.function_name,
        "response": payload,
    });
    if echo_id {
        response["id"] = json!(result.tool_call_id);
    }
    json!({ "role": "user", "parts": [{ "functionResponse": response }] })
}

// ─── Response parsing ────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    usage_metadata: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiCandidate {
    content: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

/// One parsed `generateContent` reply.
#[derive(Debug)]
pub struct ParsedTurn {
    /// Model content to append to the history; `None` when it had no parts
    pub content: Option<Value>,
    pub reply: ModelReply,
    /// Ids minted locally for function calls that came without one
    pub local_ids: Vec<String>,
}

pub fn parse_response(data: Value) -> Result<ParsedTurn> {
    let data: ApiResponse = serde_json::from_value(data)
        .map_err(|e| ArchiveError::Remote(format!("malformed response: {}", e)))?;

    let usage = data.usage_metadata.map(|u| TokenUsage {
        prompt_tokens: u.prompt_token_count,
        completion_tokens: u.candidates_token_count,
        total_tokens: u.total_token_count,
    });

    let content = data
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content);

    let Some(mut content) = content else {
        return Ok(ParsedTurn {
            content: None,
            reply: ModelReply { usage, ..ModelReply::default() },
            local_ids: Vec::new(),
        });
    };

    let mut text = String::new();
    let mut tool_calls = Vec::new();
    let mut local_ids = Vec::new();
    let mut kept_parts = Vec::new();

    let parts = content
        .get_mut("parts")
        .and_then(Value::as_array_mut)
        .map(std::mem::take)
        .unwrap_or_default();

    for part in parts {
        if part.get("thought").and_then(Value::as_bool).unwrap_or(false) {
            kept_parts.push(part);
            continue;
        }
        if let Some(t) = part.get("text").and_then(Value::as_str) {
            text.push_str(t);
        }
        if let Some(call) = part.get("functionCall") {
            // Only the first call is answered; drop the rest from history too
            if !tool_calls.is_empty() {
                log::warn!("Dropping extra function call from history");
                continue;
            }
            let (request, minted) = parse_function_call(call);
            if minted {
                local_ids.push(request.id.clone());
            }
            tool_calls.push(request);
        }
        kept_parts.push(part);
    }

    let content = if kept_parts.is_empty() {
        None
    } else {
        content["parts"] = Value::Array(kept_parts);
        Some(content)
    };

    Ok(ParsedTurn {
        content,
        reply: ModelReply {
            text: (!text.is_empty()).then_some(text),
            tool_calls,
            usage,
        },
        local_ids,
    })
}

fn parse_function_call(call: &Value) -> (ToolInvocationRequest, bool) {
    let name = call
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let args = call
        .get("args")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_else(Map::new);

    match call.get("id").and_then(Value::as_str) {
        Some(id) => (ToolInvocationRequest { id: id.to_string(), name, args }, false),
        None => {
            let id = format!("call_{}", uuid::Uuid::new_v4().simple());
            (ToolInvocationRequest { id, name, args }, true)
        }
    }
}
