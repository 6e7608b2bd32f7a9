//! UI-level state that drives rendering.
//! Documents, messages and the turn phase are a read-only projection of
//! the archive runtime, updated each frame by draining the EventBus.
//! View mode, selection and the edit form belong to the UI alone.

use archive_types::{
    ErrorKind,
    document::{Document, DocumentPatch},
    event::{ArchiveEvent, TurnPhase},
    message::Message,
};
use crate::presentation;

pub const NEW_ENTRY_PATH: &str = "/New/Untitled.md";
pub const NEW_ENTRY_CATEGORY: &str = "Drafts";
pub const NEW_ENTRY_CONTENT: &str = "# New Entry\n\nStart typing...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Chat,
    KnowledgeBase,
}

/// Working copy of a document being edited
#[derive(Debug, Clone, PartialEq)]
pub struct EditForm {
    /// Document as it was when editing began
    pub original: Document,
    pub path: String,
    pub category: String,
    pub content: String,
}

impl EditForm {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            original: doc.clone(),
            path: doc.path.clone(),
            category: doc.category.clone(),
            content: doc.content.clone(),
        }
    }

    /// Fields that differ from the original
    pub fn patch(&self) -> DocumentPatch {
        let mut edited = self.original.clone();
        edited.path = self.path.trim().to_string();
        edited.category = self.category.trim().to_string();
        edited.content = self.content.clone();
        DocumentPatch::diff(&self.original, &edited)
    }
}

/// A session-level problem shown as a persistent banner
#[derive(Debug, Clone, PartialEq)]
pub struct SessionBanner {
    pub kind: ErrorKind,
    pub detail: String,
}

/// State visible to UI panels
pub struct UiState {
    pub view_mode: ViewMode,
    /// Conversation log as announced by the runtime
    pub messages: Vec<Message>,
    /// Archive contents in store order
    pub documents: Vec<Document>,
    pub selected_path: Option<String>,
    pub edit: Option<EditForm>,
    /// Path awaiting delete confirmation
    pub pending_delete: Option<String>,
    pub phase: TurnPhase,
    pub session_ready: bool,
    pub session_banner: Option<SessionBanner>,
    /// Last non-session error, cleared on the next successful action
    pub notice: Option<String>,
    /// Input field content
    pub input_text: String,
    /// Whether settings panel is open
    pub show_settings: bool,
    /// Status line text
    pub status_text: String,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            view_mode: ViewMode::Chat,
            messages: Vec::new(),
            documents: Vec::new(),
            selected_path: None,
            edit: None,
            pending_delete: None,
            phase: TurnPhase::Idle,
            session_ready: false,
            session_banner: None,
            notice: None,
            input_text: String::new(),
            show_settings: false,
            status_text: "Connecting...".to_string(),
        }
    }

    /// Process events from the EventBus and update UI state
    pub fn process_events(&mut self, events: Vec<ArchiveEvent>) {
        for event in events {
            match event {
                ArchiveEvent::TurnStart { .. } => {
                    self.notice = None;
                    self.status_text = presentation::phase_text(TurnPhase::Sending).to_string();
                }
                ArchiveEvent::PhaseChanged { phase } => {
                    self.phase = phase;
                    self.status_text = presentation::phase_text(phase).to_string();
                }
                ArchiveEvent::MessageAppended { message } => {
                    self.messages.push(message);
                }
                ArchiveEvent::ToolExecStart { tool_name, .. } => {
                    self.status_text = format!("Running: {}", tool_name);
                }
                ArchiveEvent::ToolExecEnd { success, result, .. } => {
                    if !success {
                        log::debug!("Tool call rejected: {}", result);
                    }
                }
                ArchiveEvent::ArchiveChanged { documents } => {
                    self.set_documents(documents);
                }
                ArchiveEvent::SessionReady { .. } => {
                    self.session_ready = true;
                    self.session_banner = None;
                    if !self.is_busy() {
                        self.status_text = presentation::phase_text(TurnPhase::Idle).to_string();
                    }
                }
                ArchiveEvent::TurnEnd { .. } => {
                    self.phase = TurnPhase::Idle;
                    self.status_text = presentation::phase_text(TurnPhase::Idle).to_string();
                }
                ArchiveEvent::Error { kind, message } => {
                    if presentation::is_session_error(kind) {
                        self.session_ready = false;
                        self.status_text = "Offline".to_string();
                        self.session_banner = Some(SessionBanner { kind, detail: message });
                    } else {
                        self.notice = Some(format!("{} ({})", presentation::error_text(kind), message));
                    }
                }
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        self.phase != TurnPhase::Idle
    }

    /// Sending is possible once a session is live and no turn is running
    pub fn can_send(&self) -> bool {
        self.session_ready && !self.is_busy()
    }

    /// Take the input for sending. Leaves it in place when it cannot be sent.
    pub fn take_input(&mut self) -> Option<String> {
        let text = self.input_text.trim();
        if text.is_empty() || !self.can_send() {
            return None;
        }
        let text = text.to_string();
        self.input_text.clear();
        Some(text)
    }

    /// Replace the document list, keeping the selection valid.
    pub fn set_documents(&mut self, documents: Vec<Document>) {
        self.documents = documents;
        let selection_gone = self
            .selected_path
            .as_deref()
            .is_some_and(|p| !self.documents.iter().any(|d| d.path == p));
        if selection_gone && self.edit.is_none() {
            self.selected_path = None;
        }
    }

    /// The selected document, falling back to the first one.
    pub fn selected_document(&self) -> Option<&Document> {
        self.selected_path
            .as_deref()
            .and_then(|p| self.documents.iter().find(|d| d.path == p))
            .or_else(|| self.documents.first())
    }

    /// Open a document in the knowledge base view, leaving edit mode.
    pub fn select(&mut self, path: &str) {
        self.selected_path = Some(path.to_string());
        self.view_mode = ViewMode::KnowledgeBase;
        self.edit = None;
        self.pending_delete = None;
    }

    pub fn begin_edit(&mut self) {
        if let Some(form) = self.selected_document().map(EditForm::from_document) {
            self.selected_path = Some(form.original.path.clone());
            self.edit = Some(form);
        }
    }

    pub fn cancel_edit(&mut self) {
        self.edit = None;
        self.pending_delete = None;
    }

    /// Build the blank entry for the "new entry" action. `path` is a free
    /// path chosen by the caller. The entry is selected and opened for
    /// editing right away.
    pub fn start_new_entry(&mut self, path: &str) -> Document {
        let doc = Document::new(
            path,
            NEW_ENTRY_CATEGORY,
            NEW_ENTRY_CONTENT,
            archive_types::document::today(),
        );
        self.select(&doc.path);
        self.edit = Some(EditForm::from_document(&doc));
        doc
    }

    /// Close the form after a save was submitted. Returns the original
    /// path and the patch to apply, or `None` when nothing changed.
    pub fn finish_edit(&mut self) -> Option<(String, DocumentPatch)> {
        let form = self.edit.take()?;
        let patch = form.patch();
        let new_path = patch.path.clone().unwrap_or_else(|| form.original.path.clone());
        self.selected_path = Some(new_path);
        if patch.is_empty() {
            return None;
        }
        Some((form.original.path, patch))
    }

    pub fn request_delete(&mut self, path: &str) {
        self.pending_delete = Some(path.to_string());
    }

    /// Confirm the pending delete. The first remaining document becomes
    /// the selection.
    pub fn confirm_delete(&mut self) -> Option<String> {
        let path = self.pending_delete.take()?;
        self.edit = None;
        self.selected_path = self
            .documents
            .iter()
            .find(|d| d.path != path)
            .map(|d| d.path.clone());
        Some(path)
    }

    /// Documents grouped by category, categories in first-seen order.
    pub fn grouped_documents(&self) -> Vec<(&str, Vec<&Document>)> {
        let mut groups: Vec<(&str, Vec<&Document>)> = Vec::new();
        for doc in &self.documents {
            match groups.iter_mut().find(|(c, _)| *c == doc.category) {
                Some((_, docs)) => docs.push(doc),
                None => groups.push((doc.category.as_str(), vec![doc])),
            }
        }
        groups
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}
