//! Session lifecycle — at most one live model session at a time.
//!
//! `initialize` builds a brand-new session from the current archive and
//! swaps it in wholesale. Handles already cloned out (an in-flight turn)
//! keep talking to the session they started with.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use archive_types::{
    ArchiveError, Result,
    config::ModelConfig,
    document::Document,
    tool::{ToolInvocationRequest, ToolResult},
};
use crate::ports::{ModelPort, ModelReply, ModelSession, SessionSpec};
use crate::prompt;
use crate::tools::ToolRegistry;

/// A live session plus the bookkeeping the turn loop needs.
pub struct ActiveSession {
    generation: u64,
    system_instruction: String,
    remote: Box<dyn ModelSession>,
    /// Invocation id awaiting a tool result, if any
    outstanding: RefCell<Option<String>>,
}

impl ActiveSession {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub fn outstanding_invocation(&self) -> Option<String> {
        self.outstanding.borrow().clone()
    }

    pub(crate) async fn send_message(&self, text: &str) -> Result<ModelReply> {
        self.remote.send_message(text).await
    }

    pub(crate) fn expect_result_for(&self, call: &ToolInvocationRequest) {
        *self.outstanding.borrow_mut() = Some(call.id.clone());
    }

    /// Consume the outstanding invocation. Fails if `id` is not the one
    /// this session is waiting on.
    pub(crate) fn settle(&self, id: &str) -> Result<()> {
        let mut outstanding = self.outstanding.borrow_mut();
        if outstanding.as_deref() == Some(id) {
            *outstanding = None;
            return Ok(());
        }
        Err(ArchiveError::ProtocolViolation {
            expected: outstanding.clone(),
            got: id.to_string(),
        })
    }

    pub(crate) async fn send_tool_result(&self, result: &ToolResult) -> Result<ModelReply> {
        self.remote.send_tool_result(result).await
    }
}

pub type SessionHandle = Rc<ActiveSession>;

/// Owns the single swappable session handle.
pub struct SessionManager {
    model: RefCell<Rc<dyn ModelPort>>,
    tools: ToolRegistry,
    active: RefCell<Option<SessionHandle>>,
    /// Generation of the most recent `initialize` call
    requested: Cell<u64>,
}

impl SessionManager {
    pub fn new(model: Rc<dyn ModelPort>) -> Self {
        Self {
            model: RefCell::new(model),
            tools: ToolRegistry::new(),
            active: RefCell::new(None),
            requested: Cell::new(0),
        }
    }

    /// Swap the transport. The live session stays until the next `initialize`.
    pub fn set_model(&self, model: Rc<dyn ModelPort>) {
        *self.model.borrow_mut() = model;
    }

    /// Create a fresh session for `documents`, replacing the current one.
    pub async fn initialize(
        &self,
        config: &ModelConfig,
        instructions: &str,
        documents: &[Document],
    ) -> Result<SessionHandle> {
        let generation = self.begin();
        self.initialize_as(generation, config, instructions, documents).await
    }

    /// Reserve the generation number for a new `initialize_as` attempt.
    /// Any attempt started earlier becomes stale.
    pub fn begin(&self) -> u64 {
        let generation = self.requested.get() + 1;
        self.requested.set(generation);
        generation
    }

    /// Whether `generation` is the most recently requested attempt
    pub fn is_latest(&self, generation: u64) -> bool {
        generation == self.requested.get()
    }

    /// Run the attempt reserved by `begin`. The session is installed only
    /// if no newer attempt was started meanwhile; a stale handle is
    /// returned but never becomes current.
    pub async fn initialize_as(
        &self,
        generation: u64,
        config: &ModelConfig,
        instructions: &str,
        documents: &[Document],
    ) -> Result<SessionHandle> {
        if config.api_key.trim().is_empty() {
            return Err(ArchiveError::Configuration("no API key configured".to_string()));
        }
        if config.model.trim().is_empty() {
            return Err(ArchiveError::Configuration("no model configured".to_string()));
        }
        if config.base_url().is_empty() {
            return Err(ArchiveError::Configuration("no API endpoint configured".to_string()));
        }

        let system_instruction = prompt::assemble(instructions, documents);
        let spec = SessionSpec {
            system_instruction: system_instruction.clone(),
            temperature: config.temperature,
            tools: self.tools.definitions(),
        };

        let model = self.model.borrow().clone();
        let remote = model
            .create_session(spec)
            .await
            .map_err(|e| ArchiveError::RemoteInit(e.to_string()))?;

        let handle = Rc::new(ActiveSession {
            generation,
            system_instruction,
            remote,
            outstanding: RefCell::new(None),
        });

        if !self.is_latest(generation) {
            log::debug!(
                "Discarding session generation {} (generation {} requested since)",
                generation,
                self.requested.get()
            );
            return Ok(handle);
        }

        log::info!(
            "Session generation {} ready ({} documents, model {})",
            generation,
            documents.len(),
            model.model_name()
        );
        *self.active.borrow_mut() = Some(handle.clone());
        Ok(handle)
    }

    pub fn current(&self) -> Result<SessionHandle> {
        self.active
            .borrow()
            .clone()
            .ok_or(ArchiveError::UninitializedSession)
    }

    pub fn has_session(&self) -> bool {
        self.active.borrow().is_some()
    }

    /// Generation of the live session, 0 when none
    pub fn generation(&self) -> u64 {
        self.active
            .borrow()
            .as_ref()
            .map(|s| s.generation)
            .unwrap_or(0)
    }

    pub fn system_instruction(&self) -> Option<String> {
        self.active
            .borrow()
            .as_ref()
            .map(|s| s.system_instruction.clone())
    }

    /// Drop the live session; the next send fails until re-initialized
    pub fn clear(&self) {
        self.active.borrow_mut().take();
    }
}
