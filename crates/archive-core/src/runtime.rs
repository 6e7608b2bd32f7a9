//! Archive runtime — the owning layer around the store, the session and
//! the conversation.
//!
//! One turn:
//! 1. Accept the user message (dropped while another turn is in flight)
//! 2. Send it into the live session
//! 3. If the model asks for a tool, execute it against the store (act)
//! 4. Report the result back and read the follow-up (observe)
//! 5. Append the final reply and go idle
//!
//! Every store mutation is persisted and followed by a session refresh.
//! While a turn is in flight the refresh is deferred until the turn
//! settles, so the turn finishes against the session it started with.
//!
//! All methods take `&self`; state sits behind `RefCell`s whose borrows
//! are never held across an `.await`, so the runtime can be shared with
//! `Rc` and driven from `spawn_local`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use archive_types::{
    ArchiveError, Result,
    config::ArchiveConfig,
    document::{Document, DocumentPatch},
    event::{ArchiveEvent, TurnPhase},
    message::Message,
    tool::{NormalizedResponse, ToolInvocationRequest},
};
use crate::conversation::ConversationState;
use crate::dispatcher::{ExecutionResult, ToolDispatcher};
use crate::event_bus::EventBus;
use crate::executor::TurnExecutor;
use crate::persistence::ArchivePersistence;
use crate::ports::ModelPort;
use crate::session::{SessionHandle, SessionManager};
use crate::store::ArchiveStore;

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Input ignored: blank, or a turn was already in flight
    Dropped,
    /// The final assistant message of the turn
    Replied(Message),
}

pub struct ArchiveRuntime {
    config: RefCell<ArchiveConfig>,
    store: RefCell<ArchiveStore>,
    sessions: SessionManager,
    conversation: RefCell<ConversationState>,
    persistence: Option<ArchivePersistence>,
    executor: TurnExecutor,
    dispatcher: ToolDispatcher,
    event_bus: EventBus,
    refresh_pending: Cell<bool>,
    session_error: RefCell<Option<ArchiveError>>,
    turn_counter: Cell<u64>,
}

impl ArchiveRuntime {
    pub fn new(
        config: ArchiveConfig,
        model: Rc<dyn ModelPort>,
        documents: Vec<Document>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            config: RefCell::new(config.normalized()),
            store: RefCell::new(ArchiveStore::from_documents(documents)),
            sessions: SessionManager::new(model),
            conversation: RefCell::new(ConversationState::new()),
            persistence: None,
            executor: TurnExecutor::new(),
            dispatcher: ToolDispatcher::new(),
            event_bus,
            refresh_pending: Cell::new(false),
            session_error: RefCell::new(None),
            turn_counter: Cell::new(0),
        }
    }

    /// Persist the archive after every mutation.
    pub fn with_persistence(mut self, persistence: ArchivePersistence) -> Self {
        self.persistence = Some(persistence);
        self
    }

    // ─── Read access ─────────────────────────────────────────

    pub fn config(&self) -> ArchiveConfig {
        self.config.borrow().clone()
    }

    pub fn documents(&self) -> Vec<Document> {
        self.store.borrow().list().to_vec()
    }

    pub fn document(&self, path: &str) -> Option<Document> {
        self.store.borrow().get(path).cloned()
    }

    /// Free path for a new document based on `base`
    pub fn unique_path(&self, base: &str) -> String {
        self.store.borrow().unique_path(base)
    }

    pub fn messages(&self) -> Vec<Message> {
        self.conversation.borrow().messages().to_vec()
    }

    pub fn phase(&self) -> TurnPhase {
        self.conversation.borrow().phase()
    }

    pub fn is_loading(&self) -> bool {
        self.conversation.borrow().is_loading()
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn session_error(&self) -> Option<ArchiveError> {
        self.session_error.borrow().clone()
    }

    pub fn refresh_pending(&self) -> bool {
        self.refresh_pending.get()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    // ─── Session lifecycle ───────────────────────────────────

    /// (Re)create the session from the current archive. On failure the
    /// previous session is dropped and the error is kept as the
    /// persistent session error. An attempt overtaken by a newer one
    /// leaves the session and the session error alone.
    pub async fn initialize(&self) -> Result<()> {
        let config = self.config();
        let documents = self.documents();
        let generation = self.sessions.begin();

        let result = self
            .sessions
            .initialize_as(generation, &config.model, &config.instructions, &documents)
            .await;

        if !self.sessions.is_latest(generation) {
            if let Err(e) = result {
                log::debug!("Ignoring superseded initialization {}: {}", generation, e);
            }
            return Ok(());
        }

        match result {
            Ok(handle) => {
                self.session_error.borrow_mut().take();
                self.event_bus.emit(ArchiveEvent::SessionReady {
                    generation: handle.generation(),
                });
                Ok(())
            }
            Err(e) => {
                log::error!("Session initialization failed: {}", e);
                self.sessions.clear();
                *self.session_error.borrow_mut() = Some(e.clone());
                self.event_bus.emit(ArchiveEvent::Error {
                    kind: e.kind(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Apply new settings and, unless a turn is in flight, re-initialize.
    pub async fn reconfigure(&self, config: ArchiveConfig, model: Rc<dyn ModelPort>) -> Result<()> {
        *self.config.borrow_mut() = config.normalized();
        self.sessions.set_model(model);
        self.refresh_session().await
    }

    async fn refresh_session(&self) -> Result<()> {
        if self.is_loading() {
            log::info!("Turn in flight, deferring session refresh");
            self.refresh_pending.set(true);
            return Ok(());
        }
        self.initialize().await
    }

    // ─── Turns ───────────────────────────────────────────────

    /// Run one user turn to completion.
    ///
    /// Fails with `UninitializedSession` (and changes nothing) when no
    /// session exists. Remote failures are not errors: they end the turn
    /// with a failure message.
    pub async fn run_turn(&self, text: &str) -> Result<TurnOutcome> {
        if self.is_loading() || text.trim().is_empty() {
            log::debug!("Dropping input while a turn is in flight");
            return Ok(TurnOutcome::Dropped);
        }
        let session = self.sessions.current()?;

        let user_msg = match self.conversation.borrow_mut().begin_turn(text) {
            Some(msg) => msg,
            None => return Ok(TurnOutcome::Dropped),
        };

        let turn_id = self.turn_counter.get() + 1;
        self.turn_counter.set(turn_id);
        self.event_bus.emit(ArchiveEvent::TurnStart { turn_id });
        self.event_bus.emit(ArchiveEvent::MessageAppended { message: user_msg });
        self.emit_phase(TurnPhase::Sending);

        let result = self.drive_turn(&session, text).await;

        self.conversation.borrow_mut().finish_turn();
        self.emit_phase(TurnPhase::Idle);
        self.event_bus.emit(ArchiveEvent::TurnEnd { turn_id });

        if self.refresh_pending.replace(false) {
            if let Err(e) = self.initialize().await {
                log::warn!("Deferred session refresh failed: {}", e);
            }
        }

        result.map(TurnOutcome::Replied)
    }

    async fn drive_turn(&self, session: &SessionHandle, text: &str) -> Result<Message> {
        let max_rounds = self.config.borrow().max_tool_rounds;
        let mut response = self.executor.send(&self.sessions, text).await?;
        let mut related_file: Option<String> = None;
        let mut rounds = 0;

        loop {
            let call = match response {
                NormalizedResponse::Text(text) => {
                    let msg = self
                        .conversation
                        .borrow_mut()
                        .push_assistant(&text, related_file.as_deref());
                    return Ok(self.announce(msg));
                }
                NormalizedResponse::Failure(kind) => {
                    let msg = self.conversation.borrow_mut().push_failure(kind);
                    return Ok(self.announce(msg));
                }
                NormalizedResponse::ToolCall(call) => call,
            };

            if rounds >= max_rounds {
                log::error!("Tool loop exceeded {} rounds", max_rounds);
                let err = ArchiveError::ToolLoopExceeded(max_rounds);
                self.close_tool_loop(session, &call, err.clone()).await;
                let msg = self.conversation.borrow_mut().push_failure(err.kind());
                return Ok(self.announce(msg));
            }
            rounds += 1;

            self.emit_phase(TurnPhase::ToolRequested);
            self.event_bus.emit(ArchiveEvent::ToolExecStart {
                call_id: call.id.clone(),
                tool_name: call.name.clone(),
                arguments: serde_json::Value::Object(call.args.clone()).to_string(),
            });

            self.emit_phase(TurnPhase::Executing);
            let outcome = self.dispatcher.execute(&mut self.store.borrow_mut(), &call);
            self.event_bus.emit(ArchiveEvent::ToolExecEnd {
                call_id: call.id.clone(),
                result: outcome.to_payload().to_string(),
                success: outcome.is_success(),
            });

            if let Some(path) = outcome.created_path() {
                related_file = Some(path.to_string());
                self.archive_changed().await;
            }

            self.emit_phase(TurnPhase::ReportingResult);
            response = self
                .dispatcher
                .report_result(session, &call.id, outcome.to_tool_result(&call))
                .await?;
        }
    }

    /// Answer the call that hit the round cap with a rejection so the
    /// session holds no unanswered invocation. The follow-up is not
    /// shown. Unless it is plain text the history may still end in an
    /// open call, so the session is rebuilt once the turn settles.
    async fn close_tool_loop(&self, session: &SessionHandle, call: &ToolInvocationRequest, err: ArchiveError) {
        let rejection = ExecutionResult::rejected(err).to_tool_result(call);
        self.emit_phase(TurnPhase::ReportingResult);
        match self.dispatcher.report_result(session, &call.id, rejection).await {
            Ok(NormalizedResponse::Text(_)) => {}
            Ok(NormalizedResponse::ToolCall(next)) => {
                log::warn!("Model kept calling tools after the cap ({}), rebuilding session", next.name);
                self.refresh_pending.set(true);
            }
            Ok(NormalizedResponse::Failure(kind)) => {
                log::warn!("Reporting the tool cap failed ({}), rebuilding session", kind.as_str());
                self.refresh_pending.set(true);
            }
            Err(e) => {
                log::warn!("Reporting the tool cap failed: {}", e);
                self.refresh_pending.set(true);
            }
        }
    }

    // ─── Archive mutations ───────────────────────────────────

    pub async fn create_document(&self, doc: Document) -> Result<Document> {
        let created = self.store.borrow_mut().create(doc)?;
        self.archive_changed().await;
        Ok(created)
    }

    pub async fn update_document(&self, path: &str, patch: DocumentPatch) -> Result<Document> {
        let updated = self.store.borrow_mut().update(path, patch)?;
        self.archive_changed().await;
        Ok(updated)
    }

    pub async fn delete_document(&self, path: &str) -> Result<Document> {
        let removed = self.store.borrow_mut().delete(path)?;
        self.archive_changed().await;
        Ok(removed)
    }

    /// Forget the conversation log. Ignored while a turn is in flight.
    pub fn clear_conversation(&self) -> bool {
        self.conversation.borrow_mut().clear()
    }

    /// Post-mutation step: persist, publish, refresh the session.
    async fn archive_changed(&self) {
        let documents = self.documents();

        if let Some(persistence) = &self.persistence {
            if let Err(e) = persistence.save(&documents).await {
                log::error!("Failed to persist archive: {}", e);
                self.event_bus.emit(ArchiveEvent::Error {
                    kind: e.kind(),
                    message: e.to_string(),
                });
            }
        }

        self.event_bus.emit(ArchiveEvent::ArchiveChanged { documents });
        if let Err(e) = self.refresh_session().await {
            log::warn!("Session refresh after archive change failed: {}", e);
        }
    }

    /// Publish the turn's final message. The conversation is already in
    /// `Replied` at this point.
    fn announce(&self, msg: Message) -> Message {
        self.event_bus.emit(ArchiveEvent::MessageAppended {
            message: msg.clone(),
        });
        self.event_bus.emit(ArchiveEvent::PhaseChanged {
            phase: TurnPhase::Replied,
        });
        msg
    }

    fn emit_phase(&self, phase: TurnPhase) {
        self.conversation.borrow_mut().set_phase(phase);
        self.event_bus.emit(ArchiveEvent::PhaseChanged { phase });
    }
}
