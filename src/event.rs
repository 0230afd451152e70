//! Observability hooks emitted by the workflow and step executor, narrowed
//! to the turn/iteration/tool lifecycle this crate drives.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

/// Events emitted during a [`crate::workflow::ConversationWorkflow`] run.
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    /// A prompt was dequeued and a turn began.
    TurnStarted { message_id: Uuid, prompt_preview: String },
    /// A turn reached COMMIT; `tools_used` mirrors the message's field.
    TurnCompleted { message_id: Uuid, is_error: bool, tools_used: Vec<String> },
    /// A ReAct iteration began (before the reasoner call).
    IterationStarted { message_id: Uuid, iteration: usize },
    /// The reasoner returned for this iteration.
    ReasonCompleted { message_id: Uuid, iteration: usize, tool_name: String },
    /// A non-`finish` tool call was parsed from the reasoner's output.
    ToolCallDetected { message_id: Uuid, iteration: usize, tool_name: String, parameters: Value },
    /// A tool dispatch finished, successfully or not.
    ToolExecutionCompleted { message_id: Uuid, iteration: usize, tool_name: String, success: bool, error: Option<String> },
    /// The iteration cap was reached without a `finish`.
    IterationCapReached { message_id: Uuid, max_iterations: usize },
    /// A tool was added to the registry (startup-time only; the registry is
    /// immutable afterward).
    ToolRegistered { name: String },
}

/// Receives [`WorkflowEvent`]s. The default implementation is a no-op, so
/// callers only override what they care about. Shared via `Arc<dyn EventHandler>`.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_workflow_event(&self, _event: &WorkflowEvent) {}
}

/// Default handler: observes nothing.
pub struct NoopEventHandler;

#[async_trait]
impl EventHandler for NoopEventHandler {}

/// Preview helper shared by emitters that log the first slice of a prompt.
pub fn preview(text: &str, max_chars: usize) -> String {
    let cleaned: String = text.chars().map(|c| if c == '\n' { ' ' } else { c }).collect();
    if cleaned.chars().count() <= max_chars {
        cleaned
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
