//! Tool dispatcher — executes model-issued capabilities against the
//! archive store and reports the outcome back into the session.
//!
//! Collision policy for `create_file`: reject with `DuplicatePath` and
//! tell the model, never overwrite.

use chrono::NaiveDate;
use serde_json::{json, Value};
use archive_types::{
    ArchiveError, ErrorKind, Result,
    document::{today, Document},
    tool::{Capability, NormalizedResponse, ToolInvocationRequest, ToolResult},
};
use crate::executor::normalize;
use crate::session::ActiveSession;
use crate::store::ArchiveStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    Created { path: String },
    Rejected { kind: ErrorKind, message: String },
}

impl ExecutionResult {
    pub(crate) fn rejected(err: ArchiveError) -> Self {
        ExecutionResult::Rejected {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Created { .. })
    }

    pub fn created_path(&self) -> Option<&str> {
        match self {
            ExecutionResult::Created { path } => Some(path),
            ExecutionResult::Rejected { .. } => None,
        }
    }

    /// The value the model sees as the function response
    pub fn to_payload(&self) -> Value {
        match self {
            ExecutionResult::Created { path } => json!({
                "status": "created",
                "path": path,
            }),
            ExecutionResult::Rejected { kind, message } => json!({
                "status": "error",
                "error": kind.as_str(),
                "message": message,
            }),
        }
    }

    pub fn to_tool_result(&self, request: &ToolInvocationRequest) -> ToolResult {
        ToolResult {
            tool_call_id: request.id.clone(),
            function_name: request.name.clone(),
            result: self.to_payload(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ToolDispatcher;

impl ToolDispatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, store: &mut ArchiveStore, request: &ToolInvocationRequest) -> ExecutionResult {
        self.execute_at(store, request, today())
    }

    /// Validate and run `request`, stamping created documents with `date`.
    /// Rejections are results, not errors: they go back to the model.
    pub fn execute_at(
        &self,
        store: &mut ArchiveStore,
        request: &ToolInvocationRequest,
        date: NaiveDate,
    ) -> ExecutionResult {
        let capability = match Capability::from_request(request) {
            Ok(capability) => capability,
            Err(e) => {
                log::warn!("Rejected tool call {} ({}): {}", request.id, request.name, e);
                return ExecutionResult::rejected(e);
            }
        };

        match capability {
            Capability::CreateFile(args) => {
                let doc = Document::new(args.path, args.category, args.content, date);
                match store.create(doc) {
                    Ok(doc) => {
                        log::info!("Created {} via tool call {}", doc.path, request.id);
                        ExecutionResult::Created { path: doc.path }
                    }
                    Err(e) => {
                        log::warn!("create_file rejected: {}", e);
                        ExecutionResult::rejected(e)
                    }
                }
            }
        }
    }

    /// Send the tool result back and normalize the model's follow-up.
    /// A stale or mismatched `invocation_id` is a caller bug and fails
    /// with `ProtocolViolation` before anything is sent.
    pub async fn report_result(
        &self,
        session: &ActiveSession,
        invocation_id: &str,
        result: ToolResult,
    ) -> Result<NormalizedResponse> {
        if result.tool_call_id != invocation_id {
            log::error!(
                "Tool result for {} reported under invocation {}",
                result.tool_call_id,
                invocation_id
            );
            return Err(ArchiveError::ProtocolViolation {
                expected: Some(invocation_id.to_string()),
                got: result.tool_call_id,
            });
        }
        session.settle(invocation_id).map_err(|e| {
            log::error!("{}", e);
            e
        })?;

        let reply = session.send_tool_result(&result).await;
        Ok(normalize(session, reply))
    }
}
