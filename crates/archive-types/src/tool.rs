use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ArchiveError, ErrorKind};
use crate::Result;

pub const CREATE_FILE: &str = "create_file";

/// Definition of a tool that the model can invoke.
/// Shaped as a JSON-schema function declaration, accepted by both
/// Gemini and OpenAI-compatible providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: ToolParameters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameters {
    #[serde(rename = "type")]
    pub schema_type: String, // always "object"
    pub properties: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub required: Vec<String>,
}

/// A function call issued by the remote model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    /// Correlation token issued by the remote side
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

/// Outcome of a tool invocation, fed back into the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub tool_call_id: String,
    pub function_name: String,
    pub result: Value,
}

/// A tool invocation parsed into its strongly-typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    CreateFile(CreateFileArgs),
}

impl Capability {
    pub fn from_request(req: &ToolInvocationRequest) -> Result<Self> {
        match req.name.as_str() {
            CREATE_FILE => CreateFileArgs::from_args(&req.args).map(Capability::CreateFile),
            other => Err(ArchiveError::UnknownCapability(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Capability::CreateFile(_) => CREATE_FILE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateFileArgs {
    pub path: String,
    pub category: String,
    pub content: String,
}

impl CreateFileArgs {
    /// Re-validates the arguments locally; the remote side's schema
    /// validation is not trusted.
    pub fn from_args(args: &Map<String, Value>) -> Result<Self> {
        let path = required_string(args, "path")?;
        if !path.starts_with('/') {
            return Err(ArchiveError::InvalidArguments(format!(
                "field `path` must start with '/', got {path:?}"
            )));
        }
        Ok(Self {
            path,
            category: required_string(args, "category")?,
            content: required_string(args, "content")?,
        })
    }
}

fn required_string(args: &Map<String, Value>, field: &str) -> Result<String> {
    let value = args
        .get(field)
        .ok_or_else(|| ArchiveError::InvalidArguments(format!("missing field `{field}`")))?;
    let text = value.as_str().ok_or_else(|| {
        ArchiveError::InvalidArguments(format!("field `{field}` must be a string"))
    })?;
    if text.trim().is_empty() {
        return Err(ArchiveError::InvalidArguments(format!(
            "field `{field}` must not be empty"
        )));
    }
    Ok(text.to_string())
}

/// Everything a turn can produce, in one renderable shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum NormalizedResponse {
    Text(String),
    ToolCall(ToolInvocationRequest),
    Failure(ErrorKind),
}

impl NormalizedResponse {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            NormalizedResponse::Text(t) => Some(t),
            _ => None,
        }
    }
}
