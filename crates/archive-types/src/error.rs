use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ArchiveError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Session initialization failed: {0}")]
    RemoteInit(String),

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Model error: {0}")]
    Remote(String),

    #[error("Model returned an empty reply")]
    EmptyReply,

    #[error("A document already exists at {0}")]
    DuplicatePath(String),

    #[error("No document at {0}")]
    NotFound(String),

    #[error("Protocol violation: expected invocation {expected:?}, got {got}")]
    ProtocolViolation { expected: Option<String>, got: String },

    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("No active session")]
    UninitializedSession,

    #[error("Tool loop exceeded {0} rounds")]
    ToolLoopExceeded(usize),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// The enumerated failure taxonomy. User-facing text for each kind is
/// owned by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Configuration,
    RemoteInit,
    Transport,
    EmptyReply,
    DuplicatePath,
    NotFound,
    ProtocolViolation,
    UnknownCapability,
    InvalidArguments,
    UninitializedSession,
    ToolLoopExceeded,
    Storage,
    Serialization,
}

impl ErrorKind {
    /// Stable identifier, used in tool-result payloads sent to the model.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::RemoteInit => "RemoteInitError",
            ErrorKind::Transport => "TransportError",
            ErrorKind::EmptyReply => "EmptyReply",
            ErrorKind::DuplicatePath => "DuplicatePath",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::ProtocolViolation => "ProtocolViolation",
            ErrorKind::UnknownCapability => "UnknownCapability",
            ErrorKind::InvalidArguments => "InvalidArguments",
            ErrorKind::UninitializedSession => "UninitializedSession",
            ErrorKind::ToolLoopExceeded => "ToolLoopExceeded",
            ErrorKind::Storage => "StorageError",
            ErrorKind::Serialization => "SerializationError",
        }
    }
}

impl ArchiveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArchiveError::Configuration(_) => ErrorKind::Configuration,
            ArchiveError::RemoteInit(_) => ErrorKind::RemoteInit,
            ArchiveError::Transport(_) | ArchiveError::Remote(_) => ErrorKind::Transport,
            ArchiveError::EmptyReply => ErrorKind::EmptyReply,
            ArchiveError::DuplicatePath(_) => ErrorKind::DuplicatePath,
            ArchiveError::NotFound(_) => ErrorKind::NotFound,
            ArchiveError::ProtocolViolation { .. } => ErrorKind::ProtocolViolation,
            ArchiveError::UnknownCapability(_) => ErrorKind::UnknownCapability,
            ArchiveError::InvalidArguments(_) => ErrorKind::InvalidArguments,
            ArchiveError::UninitializedSession => ErrorKind::UninitializedSession,
            ArchiveError::ToolLoopExceeded(_) => ErrorKind::ToolLoopExceeded,
            ArchiveError::Storage(_) => ErrorKind::Storage,
            ArchiveError::Serialization(_) => ErrorKind::Serialization,
        }
    }
}

impl From<serde_json::Error> for ArchiveError {
    fn from(e: serde_json::Error) -> Self {
        ArchiveError::Serialization(e.to_string())
    }
}
