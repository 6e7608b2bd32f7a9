#[cfg(test)]
mod tests {
    use crate::conversation::ConversationState;
    use crate::defaults::default_documents;
    use crate::dispatcher::{ExecutionResult, ToolDispatcher};
    use crate::event_bus::EventBus;
    use crate::executor::TurnExecutor;
    use crate::persistence::{load_config, save_config, ArchivePersistence};
    use crate::ports::*;
    use crate::prompt::{assemble, KNOWLEDGE_BASE_HEADING};
    use crate::runtime::{ArchiveRuntime, TurnOutcome};
    use crate::session::SessionManager;
    use crate::store::ArchiveStore;
    use crate::tools::ToolRegistry;
    use archive_types::config::{ArchiveConfig, DEFAULT_ARCHIVE_KEY};
    use archive_types::document::{Document, DocumentPatch};
    use archive_types::event::{ArchiveEvent, TurnPhase};
    use archive_types::message::Role;
    use archive_types::tool::*;
    use archive_types::{ArchiveError, ErrorKind};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use futures::channel::oneshot;
    use futures::executor::block_on;
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};
    use std::rc::Rc;

    // ─── Fixtures ────────────────────────────────────────────

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn doc(path: &str, category: &str, content: &str) -> Document {
        Document::new(path, category, content, date(2024, 5, 22))
    }

    fn configured() -> ArchiveConfig {
        let mut config = ArchiveConfig::default();
        config.model.api_key = "test-key".to_string();
        config
    }

    fn create_call(id: &str, path: &str, category: &str, content: &str) -> ToolInvocationRequest {
        let args = json!({ "path": path, "category": category, "content": content });
        ToolInvocationRequest {
            id: id.to_string(),
            name: CREATE_FILE.to_string(),
            args: args.as_object().unwrap().clone(),
        }
    }

    fn result_for(call: &ToolInvocationRequest) -> ToolResult {
        ToolResult {
            tool_call_id: call.id.clone(),
            function_name: call.name.clone(),
            result: json!({ "status": "created", "path": "/x" }),
        }
    }

    /// What a scripted session received, tagged with the session index
    #[derive(Debug, Clone, PartialEq)]
    enum Sent {
        Message { session: usize, text: String },
        ToolResult { session: usize, result: ToolResult },
    }

    #[derive(Default)]
    struct Script {
        replies: VecDeque<archive_types::Result<ModelReply>>,
        sent: Vec<Sent>,
        specs: Vec<SessionSpec>,
        fail_init: bool,
        init_gate: Option<oneshot::Receiver<()>>,
        message_gate: Option<oneshot::Receiver<()>>,
        result_gate: Option<oneshot::Receiver<()>>,
    }

    /// Mock model that plays back queued replies. Every session it
    /// creates shares the same queue.
    #[derive(Clone, Default)]
    struct ScriptedModel {
        script: Rc<RefCell<Script>>,
    }

    impl ScriptedModel {
        fn new() -> Self {
            Self::default()
        }

        fn reply(&self, reply: ModelReply) {
            self.script.borrow_mut().replies.push_back(Ok(reply));
        }

        fn fail_next(&self, err: ArchiveError) {
            self.script.borrow_mut().replies.push_back(Err(err));
        }

        fn fail_init(&self, fail: bool) {
            self.script.borrow_mut().fail_init = fail;
        }

        /// Hold the next `create_session` until the returned sender fires.
        /// `fail_init` is read once the gate opens.
        fn gate_init(&self) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.script.borrow_mut().init_gate = Some(rx);
            tx
        }

        /// Hold the next `send_message` until the returned sender fires
        fn gate_message(&self) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.script.borrow_mut().message_gate = Some(rx);
            tx
        }

        /// Hold the next `send_tool_result` until the returned sender fires
        fn gate_result(&self) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.script.borrow_mut().result_gate = Some(rx);
            tx
        }

        fn sent(&self) -> Vec<Sent> {
            self.script.borrow().sent.clone()
        }

        fn specs(&self) -> Vec<SessionSpec> {
            self.script.borrow().specs.clone()
        }
    }

    #[async_trait(?Send)]
    impl ModelPort for ScriptedModel {
        async fn create_session(&self, spec: SessionSpec) -> archive_types::Result<Box<dyn ModelSession>> {
            let gate = self.script.borrow_mut().init_gate.take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            let mut script = self.script.borrow_mut();
            if script.fail_init {
                return Err(ArchiveError::Transport("connection refused".to_string()));
            }
            script.specs.push(spec);
            Ok(Box::new(ScriptedSession {
                index: script.specs.len() - 1,
                script: self.script.clone(),
            }))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    struct ScriptedSession {
        index: usize,
        script: Rc<RefCell<Script>>,
    }

    impl ScriptedSession {
        fn next_reply(&self) -> archive_types::Result<ModelReply> {
            self.script
                .borrow_mut()
                .replies
                .pop_front()
                .unwrap_or_else(|| Err(ArchiveError::Transport("script exhausted".to_string())))
        }
    }

    #[async_trait(?Send)]
    impl ModelSession for ScriptedSession {
        async fn send_message(&self, text: &str) -> archive_types::Result<ModelReply> {
            let gate = {
                let mut script = self.script.borrow_mut();
                script.sent.push(Sent::Message {
                    session: self.index,
                    text: text.to_string(),
                });
                script.message_gate.take()
            };
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            self.next_reply()
        }

        async fn send_tool_result(&self, result: &ToolResult) -> archive_types::Result<ModelReply> {
            let gate = {
                let mut script = self.script.borrow_mut();
                script.sent.push(Sent::ToolResult {
                    session: self.index,
                    result: result.clone(),
                });
                script.result_gate.take()
            };
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            self.next_reply()
        }
    }

    /// In-memory storage
    #[derive(Default)]
    struct MockStorage {
        data: RefCell<HashMap<String, Vec<u8>>>,
    }

    #[async_trait(?Send)]
    impl StoragePort for MockStorage {
        async fn get(&self, key: &str) -> archive_types::Result<Option<Vec<u8>>> {
            Ok(self.data.borrow().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &[u8]) -> archive_types::Result<()> {
            self.data.borrow_mut().insert(key.to_string(), value.to_vec());
            Ok(())
        }

        async fn delete(&self, key: &str) -> archive_types::Result<()> {
            self.data.borrow_mut().remove(key);
            Ok(())
        }

        fn backend_name(&self) -> &str {
            "mock"
        }
    }

    /// Storage that fails every call
    struct BrokenStorage;

    #[async_trait(?Send)]
    impl StoragePort for BrokenStorage {
        async fn get(&self, _key: &str) -> archive_types::Result<Option<Vec<u8>>> {
            Err(ArchiveError::Storage("quota exceeded".to_string()))
        }

        async fn set(&self, _key: &str, _value: &[u8]) -> archive_types::Result<()> {
            Err(ArchiveError::Storage("quota exceeded".to_string()))
        }

        async fn delete(&self, _key: &str) -> archive_types::Result<()> {
            Err(ArchiveError::Storage("quota exceeded".to_string()))
        }

        fn backend_name(&self) -> &str {
            "broken"
        }
    }

    fn runtime_with(model: &ScriptedModel, documents: Vec<Document>) -> ArchiveRuntime {
        ArchiveRuntime::new(configured(), Rc::new(model.clone()), documents, EventBus::new())
    }

    fn initialized_sessions(model: &ScriptedModel, documents: &[Document]) -> SessionManager {
        let sessions = SessionManager::new(Rc::new(model.clone()));
        block_on(sessions.initialize(&configured().model, "instructions", documents)).unwrap();
        sessions
    }

    // ─── EventBus Tests ──────────────────────────────────────

    #[test]
    fn test_event_bus_new_is_empty() {
        let bus = EventBus::new();
        assert!(!bus.has_pending());
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn test_event_bus_clone_shares_queue() {
        let bus1 = EventBus::new();
        let bus2 = bus1.clone();

        bus1.emit(ArchiveEvent::TurnStart { turn_id: 1 });
        bus1.emit(ArchiveEvent::SessionReady { generation: 1 });
        assert!(bus2.has_pending());

        let events = bus2.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ArchiveEvent::TurnStart { turn_id: 1 }));
        assert!(!bus1.has_pending());
    }

    // ─── ToolRegistry Tests ──────────────────────────────────

    #[test]
    fn test_tool_registry_declares_create_file() {
        let registry = ToolRegistry::new();
        let defs = registry.definitions();
        assert_eq!(defs.len(), 1);

        let create = registry.get(CREATE_FILE).unwrap();
        assert_eq!(create.parameters.schema_type, "object");
        assert_eq!(create.parameters.required, vec!["path", "category", "content"]);
        for field in ["path", "category", "content"] {
            assert_eq!(create.parameters.properties[field]["type"], "string");
        }
    }

    #[test]
    fn test_tool_registry_get_missing() {
        assert!(ToolRegistry::new().get("delete_file").is_none());
    }

    // ─── Prompt Tests ────────────────────────────────────────

    #[test]
    fn test_prompt_is_deterministic() {
        let docs = default_documents();
        assert_eq!(assemble("ROLE", &docs), assemble("ROLE", &docs));
    }

    #[test]
    fn test_prompt_preserves_document_order() {
        let docs = vec![
            doc("/B/Second.md", "B", "two"),
            doc("/A/First.md", "A", "one"),
            doc("/C/Third.md", "C", "three"),
        ];
        let prompt = assemble("ROLE", &docs);

        let positions: Vec<usize> = docs
            .iter()
            .map(|d| prompt.find(&format!("FILE PATH: {}", d.path)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_prompt_prepends_instructions_verbatim() {
        let instructions = "### ROLE\nBe helpful.\n  keep spacing  ";
        let prompt = assemble(instructions, &[doc("/A/a.md", "A", "x")]);
        assert!(prompt.starts_with(instructions));
        assert!(prompt.contains(KNOWLEDGE_BASE_HEADING));
    }

    #[test]
    fn test_prompt_renders_document_block() {
        let prompt = assemble("ROLE", &[doc("/Bio/Main.md", "Bio", "# Main\nline two")]);
        assert!(prompt.contains(
            "---\nFILE PATH: /Bio/Main.md\nCATEGORY: Bio\nLAST UPDATED: 2024-05-22\nCONTENT:\n# Main\nline two\n---"
        ));
    }

    #[test]
    fn test_prompt_empty_archive() {
        let prompt = assemble("ROLE", &[]);
        assert!(prompt.contains("(no documents)"));
        assert!(!prompt.contains("FILE PATH:"));
    }

    // ─── ArchiveStore Tests ──────────────────────────────────

    #[test]
    fn test_store_create_then_list_once() {
        let mut store = ArchiveStore::new();
        store.create(doc("/Notes/X.md", "Notes", "# X")).unwrap();

        let matches = store.list().iter().filter(|d| d.path == "/Notes/X.md").count();
        assert_eq!(matches, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_create_duplicate_leaves_store_unchanged() {
        let mut store = ArchiveStore::from_documents(vec![doc("/Bio/Main.md", "Bio", "original")]);
        let before = store.list().to_vec();

        let err = store.create(doc("/Bio/Main.md", "Other", "replacement")).unwrap_err();
        assert!(matches!(err, ArchiveError::DuplicatePath(ref p) if p == "/Bio/Main.md"));
        assert_eq!(store.list(), before.as_slice());
    }

    #[test]
    fn test_store_create_rejects_relative_path() {
        let mut store = ArchiveStore::new();

        let err = store.create(doc("Notes/X.md", "Notes", "# X")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);
        let err = store.create(doc("", "Notes", "# X")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_rename_to_invalid_path_fails() {
        let mut store = ArchiveStore::from_documents(vec![doc("/A.md", "A", "a")]);
        let before = store.list().to_vec();

        for bad in ["", "   ", "A.md"] {
            let patch = DocumentPatch {
                path: Some(bad.to_string()),
                content: Some("changed".to_string()),
                ..DocumentPatch::default()
            };
            let err = store.update("/A.md", patch).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArguments);
        }
        assert_eq!(store.list(), before.as_slice());
    }

    #[test]
    fn test_store_update_missing_is_not_found() {
        let mut store = ArchiveStore::from_documents(vec![doc("/Bio/Main.md", "Bio", "x")]);
        let before = store.list().to_vec();

        let err = store.update("/Nope.md", DocumentPatch::content("y")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(store.list(), before.as_slice());
    }

    #[test]
    fn test_store_update_changes_only_patched_fields() {
        let mut store = ArchiveStore::from_documents(vec![doc("/Bio/Main.md", "Bio", "old")]);

        let updated = store
            .update_at("/Bio/Main.md", DocumentPatch::content("new"), date(2025, 1, 2))
            .unwrap();
        assert_eq!(updated.content, "new");
        assert_eq!(updated.category, "Bio");
        assert_eq!(updated.path, "/Bio/Main.md");
        assert_eq!(updated.last_updated, "2025-01-02");
        assert_eq!(store.get("/Bio/Main.md"), Some(&updated));
    }

    #[test]
    fn test_store_rename_onto_existing_path_fails() {
        let mut store = ArchiveStore::from_documents(vec![
            doc("/A.md", "A", "a"),
            doc("/B.md", "B", "b"),
        ]);
        let patch = DocumentPatch {
            path: Some("/B.md".to_string()),
            ..DocumentPatch::default()
        };
        let err = store.update("/A.md", patch).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicatePath);
        assert!(store.contains("/A.md"));
    }

    #[test]
    fn test_store_rename_keeps_position() {
        let mut store = ArchiveStore::from_documents(vec![
            doc("/A.md", "A", "a"),
            doc("/B.md", "B", "b"),
        ]);
        let patch = DocumentPatch {
            path: Some("/Z.md".to_string()),
            ..DocumentPatch::default()
        };
        store.update("/A.md", patch).unwrap();
        assert_eq!(store.list()[0].path, "/Z.md");
        assert!(!store.contains("/A.md"));
    }

    #[test]
    fn test_store_delete() {
        let mut store = ArchiveStore::from_documents(vec![doc("/A.md", "A", "a")]);
        let removed = store.delete("/A.md").unwrap();
        assert_eq!(removed.path, "/A.md");
        assert!(store.is_empty());

        let err = store.delete("/A.md").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_store_from_documents_drops_duplicates() {
        let store = ArchiveStore::from_documents(vec![
            doc("/A.md", "A", "first"),
            doc("/A.md", "A", "second"),
        ]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("/A.md").unwrap().content, "first");
    }

    #[test]
    fn test_store_categories_first_seen_order() {
        let store = ArchiveStore::from_documents(default_documents());
        assert_eq!(store.categories(), vec!["Bio", "Brand"]);
    }

    #[test]
    fn test_store_unique_path() {
        let mut store = ArchiveStore::new();
        assert_eq!(store.unique_path("/New/Untitled.md"), "/New/Untitled.md");

        store.create(doc("/New/Untitled.md", "Drafts", "")).unwrap();
        assert_eq!(store.unique_path("/New/Untitled.md"), "/New/Untitled-2.md");

        store.create(doc("/New/Untitled-2.md", "Drafts", "")).unwrap();
        assert_eq!(store.unique_path("/New/Untitled.md"), "/New/Untitled-3.md");
    }

    // ─── ConversationState Tests ─────────────────────────────

    #[test]
    fn test_conversation_begin_turn() {
        let mut conv = ConversationState::new();
        assert!(!conv.is_loading());

        let msg = conv.begin_turn("hello").unwrap();
        assert_eq!(msg.role, Role::User);
        assert_eq!(conv.phase(), TurnPhase::Sending);
        assert!(conv.is_loading());
    }

    #[test]
    fn test_conversation_drops_input_while_loading() {
        let mut conv = ConversationState::new();
        conv.begin_turn("first").unwrap();
        assert!(conv.begin_turn("second").is_none());
        assert_eq!(conv.messages().len(), 1);
    }

    #[test]
    fn test_conversation_drops_blank_input() {
        let mut conv = ConversationState::new();
        assert!(conv.begin_turn("   \n").is_none());
        assert!(conv.messages().is_empty());
    }

    #[test]
    fn test_conversation_loading_in_every_phase_but_idle() {
        let mut conv = ConversationState::new();
        for phase in [
            TurnPhase::Sending,
            TurnPhase::ToolRequested,
            TurnPhase::Executing,
            TurnPhase::ReportingResult,
            TurnPhase::Replied,
        ] {
            conv.set_phase(phase);
            assert!(conv.is_loading(), "{:?} should be loading", phase);
        }
        conv.finish_turn();
        assert!(!conv.is_loading());
    }

    #[test]
    fn test_conversation_clear_only_when_idle() {
        let mut conv = ConversationState::new();
        conv.begin_turn("hi").unwrap();
        assert!(!conv.clear());
        conv.push_assistant("hello", None);
        conv.finish_turn();
        assert!(conv.clear());
        assert!(conv.messages().is_empty());
    }

    // ─── SessionManager Tests ────────────────────────────────

    #[test]
    fn test_session_starts_uninitialized() {
        let sessions = SessionManager::new(Rc::new(ScriptedModel::new()));
        assert!(!sessions.has_session());
        assert_eq!(sessions.generation(), 0);
        assert!(matches!(sessions.current(), Err(ArchiveError::UninitializedSession)));
    }

    #[test]
    fn test_session_requires_api_key() {
        let model = ScriptedModel::new();
        let sessions = SessionManager::new(Rc::new(model.clone()));
        let config = ArchiveConfig::default();

        let err = block_on(sessions.initialize(&config.model, "x", &[])).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(model.specs().is_empty());
    }

    #[test]
    fn test_session_remote_failure_is_remote_init() {
        let model = ScriptedModel::new();
        model.fail_init(true);
        let sessions = SessionManager::new(Rc::new(model));

        let err = block_on(sessions.initialize(&configured().model, "x", &[])).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::RemoteInit);
        assert!(!sessions.has_session());
    }

    #[test]
    fn test_session_declares_instruction_and_tools() {
        let model = ScriptedModel::new();
        let docs = vec![doc("/Bio/Main.md", "Bio", "hello")];
        let sessions = initialized_sessions(&model, &docs);

        let specs = model.specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].system_instruction, assemble("instructions", &docs));
        assert_eq!(specs[0].temperature, 0.7);
        assert_eq!(specs[0].tools.len(), 1);
        assert_eq!(specs[0].tools[0].name, CREATE_FILE);
        assert_eq!(sessions.system_instruction().unwrap(), specs[0].system_instruction);
    }

    #[test]
    fn test_session_reinitialize_replaces_handle() {
        let model = ScriptedModel::new();
        let sessions = initialized_sessions(&model, &[]);
        let first = sessions.current().unwrap();

        block_on(sessions.initialize(&configured().model, "x", &[])).unwrap();
        let second = sessions.current().unwrap();

        assert_eq!(first.generation(), 1);
        assert_eq!(second.generation(), 2);
        assert_eq!(sessions.generation(), 2);
    }

    #[test]
    fn test_session_superseded_attempt_is_not_installed() {
        let model = ScriptedModel::new();
        let sessions = SessionManager::new(Rc::new(model.clone()));
        let older = sessions.begin();
        let newer = sessions.begin();
        assert!(!sessions.is_latest(older));
        assert!(sessions.is_latest(newer));

        let handle = block_on(sessions.initialize_as(older, &configured().model, "x", &[])).unwrap();
        assert_eq!(handle.generation(), older);
        assert!(!sessions.has_session());

        block_on(sessions.initialize_as(newer, &configured().model, "x", &[])).unwrap();
        assert_eq!(sessions.generation(), newer);
    }

    // ─── TurnExecutor Tests ──────────────────────────────────

    #[test]
    fn test_executor_plain_text() {
        let model = ScriptedModel::new();
        let sessions = initialized_sessions(&model, &[]);
        model.reply(ModelReply::text("Hello"));

        let response = block_on(TurnExecutor::new().send(&sessions, "Hi")).unwrap();
        assert_eq!(response, NormalizedResponse::Text("Hello".to_string()));
    }

    #[test]
    fn test_executor_tool_call_keeps_args() {
        let model = ScriptedModel::new();
        let sessions = initialized_sessions(&model, &[]);
        let call = create_call("call_1", "/Notes/X.md", "Notes", "# X");
        model.reply(ModelReply::tool_call(call.clone()));

        let response = block_on(TurnExecutor::new().send(&sessions, "save it")).unwrap();
        assert_eq!(response, NormalizedResponse::ToolCall(call));
        assert_eq!(
            sessions.current().unwrap().outstanding_invocation().as_deref(),
            Some("call_1")
        );

        let mut store = ArchiveStore::new();
        let NormalizedResponse::ToolCall(call) = response else { unreachable!() };
        let result = ToolDispatcher::new().execute(&mut store, &call);
        assert!(result.is_success());
        assert_eq!(store.len(), 1);
        assert_eq!(store.list()[0].path, "/Notes/X.md");
    }

    #[test]
    fn test_executor_first_tool_call_wins() {
        let model = ScriptedModel::new();
        let sessions = initialized_sessions(&model, &[]);
        model.reply(ModelReply {
            text: Some("Saving both".to_string()),
            tool_calls: vec![
                create_call("call_1", "/A.md", "A", "a"),
                create_call("call_2", "/B.md", "B", "b"),
            ],
            usage: None,
        });

        let response = block_on(TurnExecutor::new().send(&sessions, "go")).unwrap();
        match response {
            NormalizedResponse::ToolCall(call) => assert_eq!(call.id, "call_1"),
            other => panic!("expected tool call, got {:?}", other),
        }
    }

    #[test]
    fn test_executor_before_initialize_fails() {
        let sessions = SessionManager::new(Rc::new(ScriptedModel::new()));
        let err = block_on(TurnExecutor::new().send(&sessions, "Hi")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UninitializedSession);
    }

    #[test]
    fn test_executor_transport_failure_is_in_band() {
        let model = ScriptedModel::new();
        let sessions = initialized_sessions(&model, &[]);
        model.fail_next(ArchiveError::Transport("offline".to_string()));

        let response = block_on(TurnExecutor::new().send(&sessions, "Hi")).unwrap();
        assert_eq!(response, NormalizedResponse::Failure(ErrorKind::Transport));
    }

    #[test]
    fn test_executor_empty_reply() {
        let model = ScriptedModel::new();
        let sessions = initialized_sessions(&model, &[]);
        model.reply(ModelReply::text("  "));

        let response = block_on(TurnExecutor::new().send(&sessions, "Hi")).unwrap();
        assert_eq!(response, NormalizedResponse::Failure(ErrorKind::EmptyReply));
    }

    // ─── ToolDispatcher Tests ────────────────────────────────

    #[test]
    fn test_dispatcher_stamps_execution_date() {
        let mut store = ArchiveStore::new();
        let call = create_call("c", "/Notes/X.md", "Notes", "# X");
        ToolDispatcher::new().execute_at(&mut store, &call, date(2025, 3, 4));
        assert_eq!(store.get("/Notes/X.md").unwrap().last_updated, "2025-03-04");
    }

    #[test]
    fn test_dispatcher_duplicate_path_is_rejected() {
        let mut store = ArchiveStore::from_documents(vec![doc("/Bio/Main.md", "Bio", "original")]);
        let call = create_call("c", "/Bio/Main.md", "Bio", "overwrite!");

        let result = ToolDispatcher::new().execute(&mut store, &call);
        assert!(!result.is_success());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("/Bio/Main.md").unwrap().content, "original");

        let payload = result.to_payload();
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error"], "DuplicatePath");
    }

    #[test]
    fn test_dispatcher_success_payload() {
        let mut store = ArchiveStore::new();
        let call = create_call("c", "/Notes/X.md", "Notes", "# X");
        let result = ToolDispatcher::new().execute(&mut store, &call);

        assert_eq!(result, ExecutionResult::Created { path: "/Notes/X.md".to_string() });
        let tool_result = result.to_tool_result(&call);
        assert_eq!(tool_result.tool_call_id, "c");
        assert_eq!(tool_result.function_name, CREATE_FILE);
        assert_eq!(tool_result.result, json!({ "status": "created", "path": "/Notes/X.md" }));
    }

    #[test]
    fn test_dispatcher_unknown_capability() {
        let mut store = ArchiveStore::new();
        let call = ToolInvocationRequest {
            id: "c".to_string(),
            name: "delete_file".to_string(),
            args: serde_json::Map::new(),
        };
        let result = ToolDispatcher::new().execute(&mut store, &call);
        assert!(matches!(
            result,
            ExecutionResult::Rejected { kind: ErrorKind::UnknownCapability, .. }
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_dispatcher_revalidates_arguments() {
        let mut store = ArchiveStore::new();
        let dispatcher = ToolDispatcher::new();

        let mut missing = create_call("c", "/A.md", "A", "a");
        missing.args.remove("category");
        let mut wrong_type = create_call("c", "/A.md", "A", "a");
        wrong_type.args.insert("content".to_string(), json!(42));
        let relative = create_call("c", "Notes/A.md", "A", "a");
        let empty = create_call("c", "/A.md", "", "a");

        for call in [missing, wrong_type, relative, empty] {
            let result = dispatcher.execute(&mut store, &call);
            assert!(
                matches!(result, ExecutionResult::Rejected { kind: ErrorKind::InvalidArguments, .. }),
                "expected rejection for {:?}",
                call.args
            );
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_report_result_returns_follow_up() {
        let model = ScriptedModel::new();
        let sessions = initialized_sessions(&model, &[]);
        let call = create_call("call_1", "/Notes/X.md", "Notes", "# X");
        model.reply(ModelReply::tool_call(call.clone()));
        model.reply(ModelReply::text("Saved /Notes/X.md"));

        block_on(TurnExecutor::new().send(&sessions, "save")).unwrap();
        let session = sessions.current().unwrap();
        let response = block_on(ToolDispatcher::new().report_result(&session, "call_1", result_for(&call))).unwrap();

        assert_eq!(response, NormalizedResponse::Text("Saved /Notes/X.md".to_string()));
        assert!(session.outstanding_invocation().is_none());
    }

    #[test]
    fn test_report_result_unknown_id_is_protocol_violation() {
        let model = ScriptedModel::new();
        let sessions = initialized_sessions(&model, &[]);
        let call = create_call("call_1", "/A.md", "A", "a");
        model.reply(ModelReply::tool_call(call.clone()));
        block_on(TurnExecutor::new().send(&sessions, "go")).unwrap();
        let session = sessions.current().unwrap();

        let stranger = create_call("call_9", "/A.md", "A", "a");
        let err = block_on(ToolDispatcher::new().report_result(&session, "call_9", result_for(&stranger)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);

        // Nothing reached the remote side
        assert!(!model.sent().iter().any(|s| matches!(s, Sent::ToolResult { .. })));
    }

    #[test]
    fn test_report_result_mismatched_result_id() {
        let model = ScriptedModel::new();
        let sessions = initialized_sessions(&model, &[]);
        let call = create_call("call_1", "/A.md", "A", "a");
        model.reply(ModelReply::tool_call(call.clone()));
        block_on(TurnExecutor::new().send(&sessions, "go")).unwrap();
        let session = sessions.current().unwrap();

        let mut result = result_for(&call);
        result.tool_call_id = "call_2".to_string();
        let err = block_on(ToolDispatcher::new().report_result(&session, "call_1", result)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
        assert_eq!(session.outstanding_invocation().as_deref(), Some("call_1"));
    }

    #[test]
    fn test_report_result_twice_is_stale() {
        let model = ScriptedModel::new();
        let sessions = initialized_sessions(&model, &[]);
        let call = create_call("call_1", "/A.md", "A", "a");
        model.reply(ModelReply::tool_call(call.clone()));
        model.reply(ModelReply::text("ok"));
        block_on(TurnExecutor::new().send(&sessions, "go")).unwrap();
        let session = sessions.current().unwrap();
        let dispatcher = ToolDispatcher::new();

        block_on(dispatcher.report_result(&session, "call_1", result_for(&call))).unwrap();
        let err = block_on(dispatcher.report_result(&session, "call_1", result_for(&call))).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::ProtocolViolation { expected: None, ref got } if got == "call_1"
        ));
    }

    // ─── Persistence Tests ───────────────────────────────────

    #[test]
    fn test_persistence_missing_key_uses_defaults() {
        let persistence = ArchivePersistence::new(Rc::new(MockStorage::default()), DEFAULT_ARCHIVE_KEY);
        assert_eq!(block_on(persistence.load()), default_documents());
    }

    #[test]
    fn test_persistence_corrupt_data_uses_defaults() {
        let storage = Rc::new(MockStorage::default());
        block_on(storage.set(DEFAULT_ARCHIVE_KEY, b"{not json")).unwrap();
        let persistence = ArchivePersistence::new(storage, DEFAULT_ARCHIVE_KEY);
        assert_eq!(block_on(persistence.load()), default_documents());
    }

    #[test]
    fn test_persistence_read_failure_uses_defaults() {
        let persistence = ArchivePersistence::new(Rc::new(BrokenStorage), DEFAULT_ARCHIVE_KEY);
        assert_eq!(block_on(persistence.load()), default_documents());
    }

    #[test]
    fn test_persistence_save_then_load() {
        let persistence = ArchivePersistence::new(Rc::new(MockStorage::default()), "k");
        let docs = vec![doc("/Notes/Only.md", "Notes", "just one")];
        block_on(persistence.save(&docs)).unwrap();
        assert_eq!(block_on(persistence.load()), docs);
    }

    #[test]
    fn test_persistence_empty_archive_is_kept() {
        let persistence = ArchivePersistence::new(Rc::new(MockStorage::default()), "k");
        block_on(persistence.save(&[])).unwrap();
        assert!(block_on(persistence.load()).is_empty());
    }

    #[test]
    fn test_config_save_and_load() {
        let storage = MockStorage::default();
        assert!(block_on(load_config(&storage)).is_none());

        let config = configured();
        block_on(save_config(&storage, &config)).unwrap();
        assert_eq!(block_on(load_config(&storage)), Some(config));
    }

    #[test]
    fn test_config_load_clamps_tool_rounds() {
        let storage = MockStorage::default();
        let mut config = configured();
        config.max_tool_rounds = 0;
        block_on(save_config(&storage, &config)).unwrap();

        let loaded = block_on(load_config(&storage)).unwrap();
        assert_eq!(loaded.max_tool_rounds, 1);
        assert_eq!(loaded.model.api_key, "test-key");
    }

    // ─── ArchiveRuntime Tests ────────────────────────────────

    #[test]
    fn test_runtime_send_before_initialize() {
        let model = ScriptedModel::new();
        let runtime = runtime_with(&model, vec![doc("/Bio/Main.md", "Bio", "x")]);

        let err = block_on(runtime.run_turn("Hi")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UninitializedSession);
        assert!(runtime.messages().is_empty());
        assert!(!runtime.is_loading());
        assert!(model.sent().is_empty());
    }

    #[test]
    fn test_runtime_initialize_emits_session_ready() {
        let model = ScriptedModel::new();
        let runtime = runtime_with(&model, default_documents());
        block_on(runtime.initialize()).unwrap();

        let events = runtime.event_bus().drain();
        assert!(events.iter().any(|e| matches!(e, ArchiveEvent::SessionReady { generation: 1 })));
        assert!(runtime.session_error().is_none());
    }

    #[test]
    fn test_runtime_missing_key_is_persistent_error() {
        let model = ScriptedModel::new();
        let runtime = ArchiveRuntime::new(
            ArchiveConfig::default(),
            Rc::new(model.clone()),
            vec![],
            EventBus::new(),
        );

        let err = block_on(runtime.initialize()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(runtime.session_error().map(|e| e.kind()), Some(ErrorKind::Configuration));
        assert!(runtime.event_bus().drain().iter().any(|e| matches!(
            e,
            ArchiveEvent::Error { kind: ErrorKind::Configuration, .. }
        )));
        assert!(model.specs().is_empty());
    }

    #[test]
    fn test_runtime_simple_reply() {
        let model = ScriptedModel::new();
        let runtime = runtime_with(&model, vec![]);
        block_on(runtime.initialize()).unwrap();
        model.reply(ModelReply::text("Hello"));

        let outcome = block_on(runtime.run_turn("Hi")).unwrap();
        let TurnOutcome::Replied(reply) = outcome else { panic!("turn was dropped") };
        assert_eq!(reply.content, "Hello");
        assert!(reply.related_file.is_none());

        let messages = runtime.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(runtime.phase(), TurnPhase::Idle);
    }

    #[test]
    fn test_runtime_end_to_end_tool_creation() {
        let model = ScriptedModel::new();
        let runtime = runtime_with(&model, vec![doc("/Bio/Main.md", "Bio", "# Main")]);
        block_on(runtime.initialize()).unwrap();
        runtime.event_bus().drain();

        let call = create_call("call_1", "/Notes/Testing.md", "Notes", "# Testing\n\nNotes about testing.");
        model.reply(ModelReply::tool_call(call));
        model.reply(ModelReply::text("Saved your note to /Notes/Testing.md."));

        block_on(runtime.run_turn("Draft a note about testing and save it")).unwrap();

        let documents = runtime.documents();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[1].path, "/Notes/Testing.md");

        let messages = runtime.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "Draft a note about testing and save it");
        assert_eq!(messages[1].content, "Saved your note to /Notes/Testing.md.");
        assert_eq!(messages[1].related_file.as_deref(), Some("/Notes/Testing.md"));

        let reported = model.sent().into_iter().find_map(|s| match s {
            Sent::ToolResult { result, .. } => Some(result),
            _ => None,
        });
        let reported = reported.unwrap();
        assert_eq!(reported.tool_call_id, "call_1");
        assert_eq!(reported.result["status"], "created");

        let phases: Vec<TurnPhase> = runtime
            .event_bus()
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                ArchiveEvent::PhaseChanged { phase } => Some(phase),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![
                TurnPhase::Sending,
                TurnPhase::ToolRequested,
                TurnPhase::Executing,
                TurnPhase::ReportingResult,
                TurnPhase::Replied,
                TurnPhase::Idle,
            ]
        );
    }

    #[test]
    fn test_runtime_tool_creation_refreshes_session_after_turn() {
        let model = ScriptedModel::new();
        let runtime = runtime_with(&model, vec![doc("/Bio/Main.md", "Bio", "# Main")]);
        block_on(runtime.initialize()).unwrap();

        model.reply(ModelReply::tool_call(create_call("c", "/Notes/Testing.md", "Notes", "# T")));
        model.reply(ModelReply::text("Done"));
        block_on(runtime.run_turn("save a note")).unwrap();

        assert_eq!(runtime.sessions().generation(), 2);
        let specs = model.specs();
        assert!(!specs[0].system_instruction.contains("/Notes/Testing.md"));
        assert!(specs[1].system_instruction.contains("FILE PATH: /Notes/Testing.md"));
        assert!(!runtime.refresh_pending());
    }

    #[test]
    fn test_runtime_duplicate_path_scenario() {
        let model = ScriptedModel::new();
        let runtime = runtime_with(&model, vec![doc("/Bio/Main.md", "Bio", "# Main")]);
        block_on(runtime.initialize()).unwrap();

        model.reply(ModelReply::tool_call(create_call("call_1", "/Bio/Main.md", "Bio", "overwrite")));
        model.reply(ModelReply::text(
            "A document already exists at /Bio/Main.md. Should I save it under a different path?",
        ));

        let outcome = block_on(runtime.run_turn("Save this as my bio")).unwrap();

        assert_eq!(runtime.documents().len(), 1);
        assert_eq!(runtime.document("/Bio/Main.md").unwrap().content, "# Main");

        let reported = model.sent().into_iter().find_map(|s| match s {
            Sent::ToolResult { result, .. } => Some(result),
            _ => None,
        });
        assert_eq!(reported.unwrap().result["error"], "DuplicatePath");

        let TurnOutcome::Replied(reply) = outcome else { panic!("turn was dropped") };
        assert!(reply.content.contains("different path"));
        assert!(reply.related_file.is_none());
        // No archive change, no refresh
        assert_eq!(runtime.sessions().generation(), 1);
    }

    #[test]
    fn test_runtime_transport_failure_fails_soft() {
        let model = ScriptedModel::new();
        let runtime = runtime_with(&model, vec![]);
        block_on(runtime.initialize()).unwrap();
        model.fail_next(ArchiveError::Transport("offline".to_string()));

        block_on(runtime.run_turn("Hi")).unwrap();
        let messages = runtime.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].failure, Some(ErrorKind::Transport));
        assert!(!runtime.is_loading());

        // Conversation stays usable
        model.reply(ModelReply::text("Back online"));
        block_on(runtime.run_turn("Again")).unwrap();
        assert_eq!(runtime.messages()[3].content, "Back online");
    }

    #[test]
    fn test_runtime_tool_loop_is_capped() {
        let model = ScriptedModel::new();
        let mut config = configured();
        config.max_tool_rounds = 1;
        let runtime = ArchiveRuntime::new(config, Rc::new(model.clone()), vec![], EventBus::new());
        block_on(runtime.initialize()).unwrap();

        let session = runtime.sessions().current().unwrap();

        model.reply(ModelReply::tool_call(create_call("c1", "/A.md", "A", "a")));
        model.reply(ModelReply::tool_call(create_call("c2", "/B.md", "B", "b")));

        block_on(runtime.run_turn("make files")).unwrap();
        let messages = runtime.messages();
        assert_eq!(messages.last().unwrap().failure, Some(ErrorKind::ToolLoopExceeded));
        assert_eq!(runtime.documents().len(), 1);
        assert!(!runtime.is_loading());

        // The capped call was answered, then the session was rebuilt
        assert!(session.outstanding_invocation().is_none());
        assert!(model.sent().iter().any(|s| matches!(
            s,
            Sent::ToolResult { result, .. } if result.tool_call_id == "c2"
        )));
        assert_eq!(runtime.sessions().generation(), 2);
        assert!(!runtime.refresh_pending());
    }

    #[test]
    fn test_runtime_tool_cap_answers_pending_call() {
        let model = ScriptedModel::new();
        let mut config = configured();
        config.max_tool_rounds = 1;
        let runtime = ArchiveRuntime::new(
            config,
            Rc::new(model.clone()),
            vec![doc("/A.md", "A", "a")],
            EventBus::new(),
        );
        block_on(runtime.initialize()).unwrap();
        let session = runtime.sessions().current().unwrap();

        // Both calls collide with the existing file, so nothing changes
        model.reply(ModelReply::tool_call(create_call("c1", "/A.md", "A", "again")));
        model.reply(ModelReply::tool_call(create_call("c2", "/A.md", "A", "again")));
        model.reply(ModelReply::text("Stopping."));

        block_on(runtime.run_turn("save twice")).unwrap();
        let messages = runtime.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].failure, Some(ErrorKind::ToolLoopExceeded));

        let rejection = model.sent().into_iter().find_map(|s| match s {
            Sent::ToolResult { result, .. } if result.tool_call_id == "c2" => Some(result),
            _ => None,
        });
        assert_eq!(rejection.unwrap().result["error"], "ToolLoopExceeded");
        assert!(session.outstanding_invocation().is_none());
        assert!(!runtime.refresh_pending());
        assert_eq!(runtime.sessions().generation(), 1);

        model.reply(ModelReply::text("next"));
        block_on(runtime.run_turn("again")).unwrap();
        assert_eq!(runtime.messages()[3].content, "next");
        assert_eq!(
            model.sent().last(),
            Some(&Sent::Message { session: 0, text: "again".to_string() })
        );
    }

    #[test]
    fn test_runtime_tool_cap_rebuilds_session_when_calls_continue() {
        let model = ScriptedModel::new();
        let mut config = configured();
        config.max_tool_rounds = 1;
        let runtime = ArchiveRuntime::new(
            config,
            Rc::new(model.clone()),
            vec![doc("/A.md", "A", "a")],
            EventBus::new(),
        );
        block_on(runtime.initialize()).unwrap();

        model.reply(ModelReply::tool_call(create_call("c1", "/A.md", "A", "x")));
        model.reply(ModelReply::tool_call(create_call("c2", "/A.md", "A", "x")));
        model.reply(ModelReply::tool_call(create_call("c3", "/A.md", "A", "x")));

        block_on(runtime.run_turn("loop")).unwrap();
        assert_eq!(
            runtime.messages().last().unwrap().failure,
            Some(ErrorKind::ToolLoopExceeded)
        );
        assert_eq!(runtime.sessions().generation(), 2);
        assert!(runtime.sessions().current().unwrap().outstanding_invocation().is_none());

        model.reply(ModelReply::text("fresh"));
        block_on(runtime.run_turn("again")).unwrap();
        assert_eq!(
            model.sent().last(),
            Some(&Sent::Message { session: 1, text: "again".to_string() })
        );
    }

    #[test]
    fn test_runtime_drops_input_while_loading() {
        let model = ScriptedModel::new();
        let runtime = runtime_with(&model, vec![]);
        block_on(runtime.initialize()).unwrap();
        model.reply(ModelReply::text("first reply"));
        let gate = model.gate_message();

        let (first, second) = block_on(async {
            futures::join!(runtime.run_turn("first"), async {
                let outcome = runtime.run_turn("second").await;
                let _ = gate.send(());
                outcome
            })
        });

        assert!(matches!(first.unwrap(), TurnOutcome::Replied(_)));
        assert_eq!(second.unwrap(), TurnOutcome::Dropped);
        assert_eq!(runtime.messages().len(), 2);
        assert_eq!(model.sent().len(), 1);
    }

    #[test]
    fn test_runtime_edit_during_turn_defers_refresh() {
        let model = ScriptedModel::new();
        let runtime = runtime_with(&model, vec![doc("/Bio/Main.md", "Bio", "# Main")]);
        block_on(runtime.initialize()).unwrap();

        model.reply(ModelReply::tool_call(create_call("call_1", "/Notes/Testing.md", "Notes", "# T")));
        model.reply(ModelReply::text("Saved"));
        let gate = model.gate_result();

        let (turn, generation_during_turn) = block_on(async {
            futures::join!(runtime.run_turn("save a note"), async {
                runtime
                    .update_document("/Bio/Main.md", DocumentPatch::content("# Edited"))
                    .await
                    .unwrap();
                let generation = runtime.sessions().generation();
                assert!(runtime.refresh_pending());
                let _ = gate.send(());
                generation
            })
        });
        turn.unwrap();

        // The turn finished against the session it started with
        assert_eq!(generation_during_turn, 1);
        assert!(model
            .sent()
            .iter()
            .any(|s| matches!(s, Sent::ToolResult { session: 0, .. })));

        // One refresh after the turn carries both changes
        assert_eq!(runtime.sessions().generation(), 2);
        assert_eq!(model.specs().len(), 2);
        let latest = &model.specs()[1].system_instruction;
        assert!(latest.contains("# Edited"));
        assert!(latest.contains("/Notes/Testing.md"));
        assert!(!runtime.refresh_pending());
    }

    #[test]
    fn test_runtime_edit_while_idle_refreshes_now() {
        let model = ScriptedModel::new();
        let runtime = runtime_with(&model, vec![doc("/Bio/Main.md", "Bio", "# Main")]);
        block_on(runtime.initialize()).unwrap();

        block_on(runtime.update_document("/Bio/Main.md", DocumentPatch::content("# New"))).unwrap();
        assert_eq!(runtime.sessions().generation(), 2);

        block_on(runtime.create_document(doc("/Notes/A.md", "Notes", "a"))).unwrap();
        assert_eq!(runtime.sessions().generation(), 3);

        block_on(runtime.delete_document("/Notes/A.md")).unwrap();
        assert_eq!(runtime.sessions().generation(), 4);
        assert!(!model.specs()[3].system_instruction.contains("/Notes/A.md"));
    }

    #[test]
    fn test_runtime_missing_document_is_not_found() {
        let model = ScriptedModel::new();
        let runtime = runtime_with(&model, vec![]);
        block_on(runtime.initialize()).unwrap();

        let err = block_on(runtime.delete_document("/Nope.md")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = block_on(runtime.update_document("/Nope.md", DocumentPatch::content("x"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(runtime.sessions().generation(), 1);
    }

    #[test]
    fn test_runtime_persists_after_mutation() {
        let model = ScriptedModel::new();
        let storage = Rc::new(MockStorage::default());
        let persistence = ArchivePersistence::new(storage.clone(), DEFAULT_ARCHIVE_KEY);
        let runtime = runtime_with(&model, vec![]).with_persistence(persistence.clone());
        block_on(runtime.initialize()).unwrap();

        model.reply(ModelReply::tool_call(create_call("c", "/Notes/X.md", "Notes", "# X")));
        model.reply(ModelReply::text("ok"));
        block_on(runtime.run_turn("save")).unwrap();

        let saved = block_on(persistence.load());
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].path, "/Notes/X.md");
    }

    #[test]
    fn test_runtime_storage_failure_is_reported() {
        let model = ScriptedModel::new();
        let persistence = ArchivePersistence::new(Rc::new(BrokenStorage), DEFAULT_ARCHIVE_KEY);
        let runtime = runtime_with(&model, vec![]).with_persistence(persistence);
        block_on(runtime.initialize()).unwrap();
        runtime.event_bus().drain();

        block_on(runtime.create_document(doc("/A.md", "A", "a"))).unwrap();
        assert_eq!(runtime.documents().len(), 1);
        assert!(runtime.event_bus().drain().iter().any(|e| matches!(
            e,
            ArchiveEvent::Error { kind: ErrorKind::Storage, .. }
        )));
    }

    #[test]
    fn test_runtime_reinit_failure_clears_session() {
        let model = ScriptedModel::new();
        let runtime = runtime_with(&model, vec![]);
        block_on(runtime.initialize()).unwrap();

        model.fail_init(true);
        block_on(runtime.create_document(doc("/A.md", "A", "a"))).unwrap();
        assert!(!runtime.sessions().has_session());
        assert_eq!(runtime.session_error().map(|e| e.kind()), Some(ErrorKind::RemoteInit));

        let err = block_on(runtime.run_turn("Hi")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UninitializedSession);

        model.fail_init(false);
        block_on(runtime.initialize()).unwrap();
        assert!(runtime.session_error().is_none());
    }

    #[test]
    fn test_runtime_stale_init_failure_keeps_newer_session() {
        let model = ScriptedModel::new();
        let runtime = runtime_with(&model, vec![doc("/Bio/Main.md", "Bio", "# Main")]);
        let gate = model.gate_init();

        let (stale, _) = block_on(async {
            futures::join!(runtime.initialize(), async {
                // Overtakes the gated attempt and succeeds
                runtime
                    .update_document("/Bio/Main.md", DocumentPatch::content("# Edited"))
                    .await
                    .unwrap();
                assert_eq!(runtime.sessions().generation(), 2);
                model.fail_init(true);
                let _ = gate.send(());
            })
        });

        assert!(stale.is_ok());
        assert!(runtime.sessions().has_session());
        assert_eq!(runtime.sessions().generation(), 2);
        assert!(runtime.session_error().is_none());
        assert!(!runtime
            .event_bus()
            .drain()
            .iter()
            .any(|e| matches!(e, ArchiveEvent::Error { .. })));

        model.reply(ModelReply::text("still here"));
        block_on(runtime.run_turn("Hi")).unwrap();
        assert_eq!(runtime.messages()[1].content, "still here");
    }

    #[test]
    fn test_runtime_stale_init_success_keeps_newer_error() {
        let model = ScriptedModel::new();
        let runtime = runtime_with(&model, vec![doc("/Bio/Main.md", "Bio", "# Main")]);
        block_on(runtime.initialize()).unwrap();
        runtime.event_bus().drain();
        let gate = model.gate_init();

        let (stale, _) = block_on(async {
            futures::join!(runtime.initialize(), async {
                // Overtakes the gated attempt and fails
                model.fail_init(true);
                runtime
                    .update_document("/Bio/Main.md", DocumentPatch::content("# Edited"))
                    .await
                    .unwrap();
                assert!(!runtime.sessions().has_session());
                model.fail_init(false);
                let _ = gate.send(());
            })
        });

        assert!(stale.is_ok());
        assert!(!runtime.sessions().has_session());
        assert_eq!(runtime.session_error().map(|e| e.kind()), Some(ErrorKind::RemoteInit));
        assert!(!runtime
            .event_bus()
            .drain()
            .iter()
            .any(|e| matches!(e, ArchiveEvent::SessionReady { .. })));

        let err = block_on(runtime.run_turn("Hi")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UninitializedSession);
    }

    #[test]
    fn test_runtime_reconfigure_swaps_model() {
        let first = ScriptedModel::new();
        let runtime = runtime_with(&first, vec![]);
        block_on(runtime.initialize()).unwrap();

        let second = ScriptedModel::new();
        let mut config = configured();
        config.model.temperature = 0.2;
        block_on(runtime.reconfigure(config, Rc::new(second.clone()))).unwrap();

        assert_eq!(second.specs().len(), 1);
        assert_eq!(second.specs()[0].temperature, 0.2);
        assert_eq!(runtime.config().model.temperature, 0.2);

        second.reply(ModelReply::text("from second"));
        block_on(runtime.run_turn("Hi")).unwrap();
        assert!(first.sent().is_empty());
        assert_eq!(second.sent().len(), 1);
    }

    #[test]
    fn test_runtime_clear_conversation() {
        let model = ScriptedModel::new();
        let runtime = runtime_with(&model, vec![]);
        block_on(runtime.initialize()).unwrap();
        model.reply(ModelReply::text("Hello"));
        block_on(runtime.run_turn("Hi")).unwrap();

        assert!(runtime.clear_conversation());
        assert!(runtime.messages().is_empty());
    }
}
