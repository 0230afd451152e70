// src/lib.rs

//! A durable, multi-turn conversational AI orchestrator: a per-conversation
//! workflow state machine driving a bounded ReAct loop over local and
//! remote tools.
//!
//! The durable-execution substrate itself (signal/query delivery, activity
//! retries, deterministic replay) is an external collaborator; this crate
//! implements the workflow's logic against that contract, not the substrate.

pub mod activities;
pub mod config;
pub mod event;
pub mod message;
pub mod registry;
pub mod remote;
pub mod step_executor;
pub mod tool;
pub mod tools;
pub mod trajectory;
pub mod workflow;

// Re-exporting key items for easier external access.
pub use activities::{ExtractActivity, ExtractError, ReasonerActivity, ReasonerError, ReasonerOutput, StepError, ToolActivity};
pub use config::{init_logging, CoreConfig};
pub use event::{EventHandler, NoopEventHandler, WorkflowEvent};
pub use message::{ConversationMessage, ConversationState, ConversationStateSnapshot, ConversationUpdate};
pub use registry::{RegistryError, ToolRegistry};
pub use remote::{RemoteError, RemoteToolPool};
pub use step_executor::{DefaultToolActivity, ReactStepExecutor, StepOutcome};
pub use tool::{ArgsSchema, FieldIssue, LocalInvoker, ToolDescriptor, ToolKind, ToolParameter, ToolParameterType, ToolSummary, ValidationError};
pub use trajectory::{Trajectory, TrajectoryStep};
pub use workflow::{ConversationHandle, ConversationWorkflow, PostTurnHook};
