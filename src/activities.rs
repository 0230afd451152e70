//! The three activity contracts the workflow calls out to: the only
//! externally-sourced data the workflow coroutine ever observes.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::tool::ToolDescriptor;
use crate::tool::ToolSummary;

/// Result of one reasoner call: what to think, and what to do next.
#[derive(Debug, Clone)]
pub struct ReasonerOutput {
    pub thought: String,
    pub tool_name: String,
    pub tool_args: Value,
}

#[derive(Debug, Clone)]
pub struct ReasonerError(pub String);

impl fmt::Display for ReasonerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reasoner error: {}", self.0)
    }
}
impl std::error::Error for ReasonerError {}

#[derive(Debug, Clone)]
pub struct ExtractError(pub String);

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "extract error: {}", self.0)
    }
}
impl std::error::Error for ExtractError {}

/// Step-level failure recorded on a [`crate::trajectory::TrajectoryStep`].
/// Carries a coarse `kind` for logging/metrics; the trajectory itself only
/// ever stores `message` in its `error` field.
#[derive(Debug, Clone)]
pub struct StepError {
    pub kind: StepErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepErrorKind {
    UnknownTool,
    Validation,
    LocalExecution,
    Remote,
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
impl std::error::Error for StepError {}

/// `(prompt, trajectory_summary, tool_catalog, user_name?) → (thought, tool_name, tool_args)`.
/// Implementation (an LLM call) lives entirely outside this crate.
#[async_trait]
pub trait ReasonerActivity: Send + Sync {
    async fn reason(
        &self,
        prompt: &str,
        trajectory_summary: &str,
        tool_catalog: &[ToolSummary],
        user_name: Option<&str>,
    ) -> Result<ReasonerOutput, ReasonerError>;
}

/// `(prompt, trajectory_summary, user_name?) → answer`. Same external class
/// as [`ReasonerActivity`].
#[async_trait]
pub trait ExtractActivity: Send + Sync {
    async fn extract(&self, prompt: &str, trajectory_summary: &str, user_name: Option<&str>) -> Result<String, ExtractError>;
}

/// Dispatches one already-validated tool call, branching internally on
/// [`crate::tool::ToolKind`]. The default implementation ([`crate::step_executor::DefaultToolActivity`])
/// is what the step executor uses; tests substitute a stub.
#[async_trait]
pub trait ToolActivity: Send + Sync {
    async fn call(&self, descriptor: &ToolDescriptor, shaped_args: &Value) -> Result<String, StepError>;
}
