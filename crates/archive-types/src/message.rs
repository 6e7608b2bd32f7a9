use serde::{Deserialize, Serialize};
use crate::error::ErrorKind;

/// Role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single entry in the conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Epoch milliseconds
    pub timestamp: i64,
    /// The reply proposes a markdown document the user may want to save
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_draft: bool,
    /// Path of the document this message is about
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_file: Option<String>,
    /// Set when the turn failed soft; rendered by the UI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<ErrorKind>,
}

impl Message {
    fn with_role(role: Role, content: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content,
            timestamp: chrono::Utc::now().timestamp_millis(),
            is_draft: false,
            related_file: None,
            failure: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::with_role(Role::System, text.into())
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::with_role(Role::User, text.into())
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut msg = Self::with_role(Role::Assistant, text);
        msg.is_draft = looks_like_draft(&msg.content);
        msg
    }

    pub fn failure(kind: ErrorKind) -> Self {
        let mut msg = Self::with_role(Role::Assistant, String::new());
        msg.failure = Some(kind);
        msg
    }

    pub fn with_related_file(mut self, path: impl Into<String>) -> Self {
        self.related_file = Some(path.into());
        self
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// A reply proposes a document when it carries a `---` fenced block
/// with a `path:` line inside.
pub fn looks_like_draft(content: &str) -> bool {
    let mut in_block = false;
    for line in content.lines() {
        let line = line.trim();
        if line == "---" {
            in_block = !in_block;
            continue;
        }
        if in_block && line.to_ascii_lowercase().starts_with("path:") {
            return true;
        }
    }
    false
}
