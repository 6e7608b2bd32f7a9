//! User-facing wording. The runtime only deals in `ErrorKind`s and phases;
//! everything a person reads is decided here.

use archive_types::{ErrorKind, event::TurnPhase};

/// Canned prompts offered while the conversation is empty: (tag, prompt).
pub const STARTER_PROMPTS: [(&str, &str); 4] = [
    ("BIO QUERY", "What is my current focus?"),
    ("GENERATION", "Draft a post about my new project."),
    ("RETRIEVAL", "List all active projects."),
    ("BRAND", "What is the design philosophy?"),
];

pub const INPUT_HINT: &str = "Query the archive...";
pub const FOOTER_NOTE: &str = "AI can make mistakes. Verify with Knowledge Base.";
pub const DRAFT_BADGE: &str = "FILE_UPDATE_DRAFT";

/// Text shown in place of a reply that failed.
pub fn error_text(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Configuration => {
            "No model is configured. Add an API key in Settings to start querying the archive."
        }
        ErrorKind::RemoteInit => {
            "Could not open a session with the model. Check the API key and model name in Settings."
        }
        ErrorKind::Transport => "CRITICAL ERROR: Connection to Intelligence Layer failed.",
        ErrorKind::EmptyReply => "I processed the request but received no textual output.",
        ErrorKind::DuplicatePath => "A file already exists at that path.",
        ErrorKind::NotFound => "That file is no longer in the archive.",
        ErrorKind::ProtocolViolation => "The model answered out of order. Please retry the request.",
        ErrorKind::UnknownCapability => "The model asked for an action the archive does not support.",
        ErrorKind::InvalidArguments => "The model sent an incomplete file request.",
        ErrorKind::UninitializedSession => {
            "The archive session is not ready yet. Check Settings or retry in a moment."
        }
        ErrorKind::ToolLoopExceeded => {
            "The request needed too many file operations and was stopped."
        }
        ErrorKind::Storage => "Changes could not be saved to browser storage.",
        ErrorKind::Serialization => "Stored data could not be read.",
    }
}

/// Errors that leave the app without a usable session.
pub fn is_session_error(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::Configuration | ErrorKind::RemoteInit | ErrorKind::UninitializedSession
    )
}

pub fn phase_text(phase: TurnPhase) -> &'static str {
    match phase {
        TurnPhase::Idle => "Ready",
        TurnPhase::Sending => "Thinking...",
        TurnPhase::ToolRequested => "File requested...",
        TurnPhase::Executing => "Writing file...",
        TurnPhase::ReportingResult => "Confirming...",
        TurnPhase::Replied => "Replied",
    }
}

pub fn empty_state_text(document_count: usize) -> String {
    format!(
        "Knowledge Base Active. {} files indexed. Ready for retrieval or content generation.",
        document_count
    )
}

/// `HH:MM` in local time for a message timestamp (epoch millis).
pub fn message_time(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp)
        .map(|t| t.with_timezone(&chrono::Local).format("%H:%M").to_string())
        .unwrap_or_default()
}
