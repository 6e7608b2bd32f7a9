//! Conversation state — the append-only message log and the phase of the
//! single in-flight turn.

use archive_types::{
    ErrorKind,
    event::TurnPhase,
    message::Message,
};

#[derive(Debug, Clone)]
pub struct ConversationState {
    messages: Vec<Message>,
    phase: TurnPhase,
}

impl ConversationState {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            phase: TurnPhase::Idle,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase != TurnPhase::Idle
    }

    /// Accept a user utterance and enter `Sending`. Returns `None` (the
    /// input is dropped, not queued) while a turn is in flight or when
    /// the text is blank.
    pub fn begin_turn(&mut self, text: &str) -> Option<Message> {
        if self.is_loading() || text.trim().is_empty() {
            return None;
        }
        let msg = Message::user(text);
        self.messages.push(msg.clone());
        self.phase = TurnPhase::Sending;
        Some(msg)
    }

    pub fn set_phase(&mut self, phase: TurnPhase) {
        self.phase = phase;
    }

    pub fn push_assistant(&mut self, content: &str, related_file: Option<&str>) -> Message {
        let mut msg = Message::assistant(content);
        msg.related_file = related_file.map(str::to_string);
        self.messages.push(msg.clone());
        self.phase = TurnPhase::Replied;
        msg
    }

    pub fn push_failure(&mut self, kind: ErrorKind) -> Message {
        let msg = Message::failure(kind);
        self.messages.push(msg.clone());
        self.phase = TurnPhase::Replied;
        msg
    }

    pub fn finish_turn(&mut self) {
        self.phase = TurnPhase::Idle;
    }

    /// Forget the log. Only allowed while idle.
    pub fn clear(&mut self) -> bool {
        if self.is_loading() {
            return false;
        }
        self.messages.clear();
        true
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}
