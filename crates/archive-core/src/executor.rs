//! Turn executor — one user utterance in, one normalized response out.
//!
//! Remote failures never escape as errors: they come back as
//! `NormalizedResponse::Failure` so the conversation keeps going.

use archive_types::{
    ErrorKind, Result,
    tool::NormalizedResponse,
};
use crate::ports::ModelReply;
use crate::session::{ActiveSession, SessionManager};

#[derive(Debug, Default, Clone, Copy)]
pub struct TurnExecutor;

impl TurnExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Fails only with `UninitializedSession`; everything else is in-band.
    pub async fn send(&self, sessions: &SessionManager, text: &str) -> Result<NormalizedResponse> {
        let session = sessions.current()?;
        let reply = session.send_message(text).await;
        Ok(normalize(&session, reply))
    }
}

/// Collapse a model reply into a `NormalizedResponse`. The first tool call
/// wins and becomes the session's outstanding invocation.
pub(crate) fn normalize(session: &ActiveSession, reply: Result<ModelReply>) -> NormalizedResponse {
    let reply = match reply {
        Ok(reply) => reply,
        Err(e) => {
            log::error!("Model request failed: {}", e);
            return NormalizedResponse::Failure(e.kind());
        }
    };

    let mut calls = reply.tool_calls.into_iter();
    if let Some(call) = calls.next() {
        let dropped: Vec<String> = calls.map(|c| c.name).collect();
        if !dropped.is_empty() {
            log::warn!("Ignoring {} extra tool call(s): {:?}", dropped.len(), dropped);
        }
        session.expect_result_for(&call);
        return NormalizedResponse::ToolCall(call);
    }

    match reply.text {
        Some(text) if !text.trim().is_empty() => NormalizedResponse::Text(text),
        _ => NormalizedResponse::Failure(ErrorKind::EmptyReply),
    }
}
