use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::ErrorKind;
use crate::message::Message;

/// Phase of the single in-flight turn. Loading is every phase but `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    Idle,
    Sending,
    ToolRequested,
    Executing,
    ReportingResult,
    Replied,
}

/// Events emitted by the archive runtime.
/// UI subscribes to these for reactive updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ArchiveEvent {
    /// A user message was accepted and a turn started
    TurnStart { turn_id: u64 },

    /// The turn moved to a new phase
    PhaseChanged { phase: TurnPhase },

    /// A message was appended to the conversation log
    MessageAppended { message: Message },

    /// The model asked for a tool call
    ToolExecStart { call_id: String, tool_name: String, arguments: String },

    /// Tool execution finished
    ToolExecEnd { call_id: String, result: String, success: bool },

    /// The archive changed; carries the full list in store order
    ArchiveChanged { documents: Vec<Document> },

    /// A fresh session is live
    SessionReady { generation: u64 },

    /// The current turn settled
    TurnEnd { turn_id: u64 },

    /// An error the UI should surface
    Error { kind: ErrorKind, message: String },
}
