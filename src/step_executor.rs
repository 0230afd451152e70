//! One iteration of the ReAct loop, structured as a single call the
//! workflow drives once per iteration, so the workflow owns the cap and
//! the await points.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::activities::{ReasonerActivity, StepError, StepErrorKind, ToolActivity};
use crate::config::CoreConfig;
use crate::event::{EventHandler, WorkflowEvent};
use crate::registry::ToolRegistry;
use crate::remote::RemoteToolPool;
use crate::tool::ToolKind;
use crate::trajectory::{Trajectory, TrajectoryStep, COMPLETED, FINISH};

/// Outcome of [`ReactStepExecutor::run_iteration`]: the step that was
/// appended, and whether the loop should stop after it.
pub struct StepOutcome {
    pub step: TrajectoryStep,
    pub terminal: bool,
}

/// Dispatches a validated tool call to either its local invoker or the
/// remote pool, branching on [`ToolKind`]. This is the crate's concrete
/// [`ToolActivity`]; tests may substitute a stub implementation.
pub struct DefaultToolActivity {
    remote_pool: Arc<RemoteToolPool>,
    mcp_url: Option<String>,
    local_timeout: Duration,
}

impl DefaultToolActivity {
    pub fn new(remote_pool: Arc<RemoteToolPool>, mcp_url: Option<String>, local_timeout: Duration) -> Self {
        Self { remote_pool, mcp_url, local_timeout }
    }

    /// Builds the pool and both activity timeouts straight from `config`,
    /// so `remote_timeout_secs`/`local_timeout_secs`/`proxy_mode`/`mcp_url`
    /// all take effect through one call instead of being assembled by hand
    /// at each call site.
    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(
            Arc::new(RemoteToolPool::from_config(config)),
            config.mcp_url.clone(),
            Duration::from_secs(config.local_timeout_secs),
        )
    }
}

#[async_trait]
impl ToolActivity for DefaultToolActivity {
    async fn call(&self, descriptor: &crate::tool::ToolDescriptor, shaped_args: &Value) -> Result<String, StepError> {
        match &descriptor.kind {
            ToolKind::Local { invoker } => {
                let invoker = invoker.clone();
                let args = shaped_args.clone();
                match tokio::time::timeout(self.local_timeout, async move { invoker.call(&args) }).await {
                    Ok(result) => result.map_err(|message| StepError { kind: StepErrorKind::LocalExecution, message }),
                    Err(_) => Err(StepError {
                        kind: StepErrorKind::LocalExecution,
                        message: format!("local tool call exceeded {:?}", self.local_timeout),
                    }),
                }
            }
            ToolKind::Remote { server_namespace, server_tool_name } => {
                let endpoint = self.mcp_url.as_deref().ok_or_else(|| StepError {
                    kind: StepErrorKind::Remote,
                    message: "no mcp_url configured for remote tool call".to_string(),
                })?;
                self.remote_pool
                    .call(endpoint, server_namespace.as_deref(), server_tool_name, shaped_args)
                    .await
                    .map_err(|e| StepError {
                        kind: StepErrorKind::Remote,
                        message: e.to_string(),
                    })
            }
        }
    }
}

/// Runs one iteration of the reason/act/observe loop per call.
pub struct ReactStepExecutor {
    registry: Arc<ToolRegistry>,
    reasoner: Arc<dyn ReasonerActivity>,
    tool_activity: Arc<dyn ToolActivity>,
    event_handler: Arc<dyn EventHandler>,
}

impl ReactStepExecutor {
    pub fn new(
        registry: Arc<ToolRegistry>,
        reasoner: Arc<dyn ReasonerActivity>,
        tool_activity: Arc<dyn ToolActivity>,
        event_handler: Arc<dyn EventHandler>,
    ) -> Self {
        Self { registry, reasoner, tool_activity, event_handler }
    }

    pub async fn run_iteration(
        &self,
        message_id: Uuid,
        iteration: usize,
        prompt: &str,
        trajectory: &Trajectory,
        user_name: Option<&str>,
    ) -> StepOutcome {
        let context = crate::trajectory::summarize(trajectory);
        let catalog = self.registry.list_for_reasoner();

        let reasoned = self.reasoner.reason(prompt, &context, &catalog, user_name).await;
        let (thought, tool_name, tool_args) = match reasoned {
            Ok(output) => (output.thought, output.tool_name, output.tool_args),
            Err(e) => {
                // Reasoner errors are recorded as an error step and the loop
                // continues; the reasoner may recover on the next iteration.
                let mut step = TrajectoryStep::new(iteration, String::new(), String::new(), Value::Null);
                step.error = Some(e.to_string());
                return StepOutcome { step, terminal: false };
            }
        };

        self.event_handler
            .on_workflow_event(&WorkflowEvent::ReasonCompleted { message_id, iteration, tool_name: tool_name.clone() })
            .await;

        let mut step = TrajectoryStep::new(iteration, thought, tool_name.clone(), tool_args.clone());

        if tool_name == FINISH {
            step.observation = Some(COMPLETED.to_string());
            return StepOutcome { step, terminal: true };
        }

        if !self.registry.contains(&tool_name) {
            step.error = Some(format!("Unknown tool: {}", tool_name));
            return StepOutcome { step, terminal: false };
        }

        self.event_handler
            .on_workflow_event(&WorkflowEvent::ToolCallDetected {
                message_id,
                iteration,
                tool_name: tool_name.clone(),
                parameters: tool_args.clone(),
            })
            .await;

        let shaped = match self.registry.validate_and_shape(&tool_name, &tool_args) {
            Ok(shaped) => shaped,
            Err(validation_error) => {
                step.error = Some(validation_error.to_string());
                self.event_handler
                    .on_workflow_event(&WorkflowEvent::ToolExecutionCompleted {
                        message_id,
                        iteration,
                        tool_name,
                        success: false,
                        error: step.error.clone(),
                    })
                    .await;
                return StepOutcome { step, terminal: false };
            }
        };

        let descriptor = self.registry.get(&tool_name).expect("presence already checked");
        match self.tool_activity.call(descriptor, &shaped).await {
            Ok(observation) => {
                step.observation = Some(observation);
                self.event_handler
                    .on_workflow_event(&WorkflowEvent::ToolExecutionCompleted {
                        message_id,
                        iteration,
                        tool_name,
                        success: true,
                        error: None,
                    })
                    .await;
            }
            Err(e) => {
                step.error = Some(e.to_string());
                self.event_handler
                    .on_workflow_event(&WorkflowEvent::ToolExecutionCompleted {
                        message_id,
                        iteration,
                        tool_name,
                        success: false,
                        error: step.error.clone(),
                    })
                    .await;
            }
        }

        StepOutcome { step, terminal: false }
    }
}
