//! Port traits — the hexagonal architecture boundary.
//!
//! These traits are defined here in `archive-core` (pure Rust).
//! Implementations live in `archive-platform` (browser adapters).
//! The core never imports platform code; it only depends on these traits.

use async_trait::async_trait;
use archive_types::{
    Result,
    tool::{ToolDefinition, ToolInvocationRequest, ToolResult},
};

// ─── Model Port ──────────────────────────────────────────────

/// Everything the remote side needs to open a conversation.
#[derive(Debug, Clone)]
pub struct SessionSpec {
    pub system_instruction: String,
    pub temperature: f32,
    pub tools: Vec<ToolDefinition>,
}

/// One reply from the remote model: text, tool calls, or both.
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolInvocationRequest>,
    pub usage: Option<TokenUsage>,
}

impl ModelReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn tool_call(call: ToolInvocationRequest) -> Self {
        Self {
            tool_calls: vec![call],
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Factory for conversational sessions with a hosted model.
#[async_trait(?Send)]
pub trait ModelPort {
    /// Open a new session. Any remote failure surfaces as an error;
    /// the caller maps it to `RemoteInit`.
    async fn create_session(&self, spec: SessionSpec) -> Result<Box<dyn ModelSession>>;

    /// Model identifier (for logging/debug)
    fn model_name(&self) -> &str;
}

/// A live conversation. History accumulates inside the session.
#[async_trait(?Send)]
pub trait ModelSession {
    async fn send_message(&self, text: &str) -> Result<ModelReply>;

    async fn send_tool_result(&self, result: &ToolResult) -> Result<ModelReply>;
}

// ─── Storage Port ────────────────────────────────────────────

#[async_trait(?Send)]
pub trait StoragePort {
    /// Get a value by key
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Set a value
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete a value
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Name of this backend (for logging/debug)
    fn backend_name(&self) -> &str;
}
