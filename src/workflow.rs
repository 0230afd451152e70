//! The per-conversation durable state machine: a single cooperative loop
//! over `INIT → IDLE → PROCESSING → IDLE → ... → TERMINATED`. Rather than
//! looping inline inside one call, this workflow is a long-lived task:
//! [`ConversationHandle`] is the cheaply-cloned, thread-safe front door
//! signals and queries come through; [`ConversationWorkflow::run`] is the
//! coroutine itself.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use log::{info, warn};
use tokio::sync::{Notify, RwLock};
use uuid::Uuid;

use crate::activities::ExtractActivity;
use crate::config::CoreConfig;
use crate::event::{preview, EventHandler, NoopEventHandler, WorkflowEvent};
use crate::message::{incremental_updates, ConversationMessage, ConversationState, ConversationStateSnapshot, ConversationUpdate};
use crate::step_executor::ReactStepExecutor;
use crate::trajectory::{self, Trajectory};

/// Extension point invoked once after a turn commits, with the trajectory
/// that produced it. No summarization is implemented here; a caller may
/// attach one.
#[async_trait]
pub trait PostTurnHook: Send + Sync {
    async fn on_turn_committed(&self, trajectory: &Trajectory, message_id: Uuid);
}

/// FIFO queue of pending prompts, with a wake primitive for the workflow's
/// wait-for-predicate loop: an explicit queue plus a condition variable
/// (here, [`tokio::sync::Notify`]), rather than running the wait inline
/// inside a signal handler.
struct PromptQueue {
    prompts: StdMutex<VecDeque<String>>,
    notify: Notify,
}

impl PromptQueue {
    fn new() -> Self {
        Self { prompts: StdMutex::new(VecDeque::new()), notify: Notify::new() }
    }

    fn push(&self, text: String) {
        self.prompts.lock().unwrap().push_back(text);
        self.notify.notify_one();
    }

    fn pop(&self) -> Option<String> {
        self.prompts.lock().unwrap().pop_front()
    }
}

/// Cheaply-cloneable handle external callers use to send signals and run
/// queries against a running [`ConversationWorkflow`]. Signals enqueue or
/// flag; they never block on turn processing.
#[derive(Clone)]
pub struct ConversationHandle {
    state: Arc<RwLock<ConversationState>>,
    queue: Arc<PromptQueue>,
}

impl ConversationHandle {
    /// Enqueues a prompt. Two rapid calls enqueue two turns, processed in
    /// the order accepted.
    pub fn prompt(&self, text: String) {
        self.queue.push(text);
    }

    /// Sets `chat_ended`. Graceful: does not interrupt a turn in progress;
    /// takes effect once the queue drains.
    pub async fn end_chat(&self) {
        self.state.write().await.chat_ended = true;
        self.queue.notify.notify_waiters();
    }

    /// Returns a full snapshot of the conversation's current state.
    pub async fn full_state(&self) -> ConversationStateSnapshot {
        self.state.read().await.snapshot()
    }

    /// Returns what changed since `last_seen_message_id`. Read-only; never
    /// waits on processing.
    pub async fn incremental_updates(&self, last_seen_message_id: Option<Uuid>) -> ConversationUpdate {
        incremental_updates(&*self.state.read().await, last_seen_message_id)
    }
}

/// Runs one conversation's durable state machine. Constructed alongside a
/// [`ConversationHandle`] via [`ConversationWorkflow::new`]; `run()` consumes
/// it and returns the final state once `TERMINATED`.
pub struct ConversationWorkflow {
    state: Arc<RwLock<ConversationState>>,
    queue: Arc<PromptQueue>,
    executor: ReactStepExecutor,
    extractor: Arc<dyn ExtractActivity>,
    config: CoreConfig,
    event_handler: Arc<dyn EventHandler>,
    post_turn_hook: Option<Arc<dyn PostTurnHook>>,
    user_name: Option<String>,
}

impl ConversationWorkflow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: CoreConfig,
        executor: ReactStepExecutor,
        extractor: Arc<dyn ExtractActivity>,
        event_handler: Option<Arc<dyn EventHandler>>,
        post_turn_hook: Option<Arc<dyn PostTurnHook>>,
        user_name: Option<String>,
    ) -> (Self, ConversationHandle) {
        let state = Arc::new(RwLock::new(ConversationState::new()));
        let queue = Arc::new(PromptQueue::new());
        let handle = ConversationHandle { state: state.clone(), queue: queue.clone() };
        let workflow = Self {
            state,
            queue,
            executor,
            extractor,
            config,
            event_handler: event_handler.unwrap_or_else(|| Arc::new(NoopEventHandler)),
            post_turn_hook,
            user_name,
        };
        (workflow, handle)
    }

    /// Drives `INIT → IDLE → PROCESSING → ... → TERMINATED` until
    /// `chat_ended` is set and the prompt queue is empty, then returns the
    /// final state.
    pub async fn run(self) -> ConversationState {
        loop {
            match self.wait_for_work().await {
                Some(prompt_text) => self.process_turn(prompt_text).await,
                None => break,
            }
        }
        self.state.read().await.clone()
    }

    /// IDLE: blocks until either a prompt is queued or `chat_ended` is set
    /// with an empty queue. Uses the double-check-then-await pattern around
    /// `Notify` to avoid the missed-wakeup race.
    async fn wait_for_work(&self) -> Option<String> {
        loop {
            if let Some(prompt) = self.queue.pop() {
                return Some(prompt);
            }
            if self.state.read().await.chat_ended {
                return None;
            }
            let notified = self.queue.notify.notified();
            if let Some(prompt) = self.queue.pop() {
                return Some(prompt);
            }
            if self.state.read().await.chat_ended {
                return None;
            }
            notified.await;
        }
    }

    /// PROCESSING: runs one full turn — appends the message, drives the
    /// ReAct loop to completion or the iteration cap, extracts the final
    /// answer, and commits the result back onto the message.
    async fn process_turn(&self, prompt_text: String) {
        let message = ConversationMessage::new(prompt_text.clone());
        let message_id = message.id;

        {
            let mut state = self.state.write().await;
            state.messages.push(message);
            state.current_message_id = Some(message_id);
            state.is_processing = true;
            state.current_trajectory = Some(Trajectory::new());
        }

        self.event_handler
            .on_workflow_event(&WorkflowEvent::TurnStarted { message_id, prompt_preview: preview(&prompt_text, 120) })
            .await;
        info!("turn started message_id={} prompt=\"{}\"", message_id, preview(&prompt_text, 120));

        let mut trajectory = Trajectory::new();
        for iteration in 0..self.config.max_iterations {
            self.event_handler.on_workflow_event(&WorkflowEvent::IterationStarted { message_id, iteration }).await;

            let outcome = self
                .executor
                .run_iteration(message_id, iteration, &prompt_text, &trajectory, self.user_name.as_deref())
                .await;
            let terminal = outcome.terminal;
            trajectory.push(outcome.step);

            {
                let mut state = self.state.write().await;
                state.current_trajectory = Some(trajectory.clone());
            }

            if terminal {
                break;
            }
            if iteration + 1 == self.config.max_iterations {
                warn!("iteration cap reached message_id={} max_iterations={}", message_id, self.config.max_iterations);
                self.event_handler
                    .on_workflow_event(&WorkflowEvent::IterationCapReached { message_id, max_iterations: self.config.max_iterations })
                    .await;
            }
        }

        let summary = trajectory::summarize(&trajectory);
        let extraction = self.extractor.extract(&prompt_text, &summary, self.user_name.as_deref()).await;

        let is_error;
        let tools_used_list;
        {
            let mut state = self.state.write().await;
            let tail = state
                .messages
                .iter_mut()
                .find(|m| m.id == message_id)
                .expect("message appended at start of this turn");
            match extraction {
                Ok(answer) => {
                    let used = trajectory::tools_used(&trajectory);
                    tail.complete_with_answer(answer, used.clone());
                    is_error = false;
                    tools_used_list = used;
                }
                Err(e) => {
                    tail.complete_with_error(e.to_string());
                    is_error = true;
                    tools_used_list = Vec::new();
                }
            }
            state.is_processing = false;
            state.current_message_id = None;
            state.current_trajectory = None;
        }

        if let Some(hook) = &self.post_turn_hook {
            hook.on_turn_committed(&trajectory, message_id).await;
        }

        self.event_handler
            .on_workflow_event(&WorkflowEvent::TurnCompleted { message_id, is_error, tools_used: tools_used_list })
            .await;
        info!("turn completed message_id={} is_error={}", message_id, is_error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activities::{ExtractError, ReasonerActivity, ReasonerError, ReasonerOutput};
    use crate::event::NoopEventHandler;
    use crate::registry::ToolRegistry;
    use crate::step_executor::DefaultToolActivity;
    use crate::tool::{ToolDescriptor, ToolParameter, ToolParameterType};
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedReasoner {
        outputs: Mutex<VecDeque<Result<ReasonerOutput, ReasonerError>>>,
    }

    impl ScriptedReasoner {
        fn new(outputs: Vec<Result<ReasonerOutput, ReasonerError>>) -> Self {
            Self { outputs: Mutex::new(outputs.into_iter().collect()) }
        }
    }

    #[async_trait]
    impl ReasonerActivity for ScriptedReasoner {
        async fn reason(
            &self,
            _prompt: &str,
            _trajectory_summary: &str,
            _tool_catalog: &[crate::tool::ToolSummary],
            _user_name: Option<&str>,
        ) -> Result<ReasonerOutput, ReasonerError> {
            self.outputs.lock().unwrap().pop_front().unwrap_or_else(|| {
                Ok(ReasonerOutput { thought: "give up".into(), tool_name: "finish".into(), tool_args: json!({}) })
            })
        }
    }

    struct FixedExtract(String);
    #[async_trait]
    impl ExtractActivity for FixedExtract {
        async fn extract(&self, _: &str, _: &str, _: Option<&str>) -> Result<String, ExtractError> {
            Ok(self.0.clone())
        }
    }

    struct FailingExtract;
    #[async_trait]
    impl ExtractActivity for FailingExtract {
        async fn extract(&self, _: &str, _: &str, _: Option<&str>) -> Result<String, ExtractError> {
            Err(ExtractError("llm unavailable".to_string()))
        }
    }

    fn weather_registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry
            .register(ToolDescriptor::local(
                "weather_forecast",
                "forecast",
                vec![
                    ToolParameter::new("location", ToolParameterType::String).required(),
                    ToolParameter::new("days", ToolParameterType::Integer).with_default(json!(7)),
                ],
                Arc::new(|args: &Value| Ok(format!("WX({},{})", args["location"], args["days"]))),
            ))
            .unwrap();
        Arc::new(registry)
    }

    fn build_workflow(
        config: CoreConfig,
        outputs: Vec<Result<ReasonerOutput, ReasonerError>>,
        extractor: Arc<dyn ExtractActivity>,
    ) -> (ConversationWorkflow, ConversationHandle) {
        let registry = weather_registry();
        let tool_activity = Arc::new(DefaultToolActivity::from_config(&config));
        let executor = ReactStepExecutor::new(registry, Arc::new(ScriptedReasoner::new(outputs)), tool_activity, Arc::new(NoopEventHandler));
        ConversationWorkflow::new(config, executor, extractor, None, None, None)
    }

    #[tokio::test]
    async fn happy_path_single_tool_call() {
        let (workflow, handle) = build_workflow(
            CoreConfig::default(),
            vec![
                Ok(ReasonerOutput { thought: "check".into(), tool_name: "weather_forecast".into(), tool_args: json!({"location": "Paris"}) }),
                Ok(ReasonerOutput { thought: "done".into(), tool_name: "finish".into(), tool_args: json!({}) }),
            ],
            Arc::new(FixedExtract("Paris will be mild.".to_string())),
        );

        handle.prompt("What is the weather in Paris?".to_string());
        handle.end_chat().await;
        let final_state = workflow.run().await;

        assert_eq!(final_state.messages.len(), 1);
        let msg = &final_state.messages[0];
        assert_eq!(msg.agent_message.as_deref(), Some("Paris will be mild."));
        assert_eq!(msg.tools_used, vec!["weather_forecast".to_string()]);
        assert!(!msg.is_error());
    }

    #[tokio::test]
    async fn unknown_tool_then_recovers() {
        let (workflow, handle) = build_workflow(
            CoreConfig::default(),
            vec![
                Ok(ReasonerOutput { thought: "?".into(), tool_name: "snow_depth".into(), tool_args: json!({}) }),
                Ok(ReasonerOutput { thought: "check".into(), tool_name: "weather_forecast".into(), tool_args: json!({"location": "Oslo"}) }),
                Ok(ReasonerOutput { thought: "done".into(), tool_name: "finish".into(), tool_args: json!({}) }),
            ],
            Arc::new(FixedExtract("Oslo will be cold.".to_string())),
        );

        handle.prompt("weather in Oslo".to_string());
        handle.end_chat().await;
        let final_state = workflow.run().await;

        let msg = &final_state.messages[0];
        assert!(!msg.is_error());
        assert_eq!(msg.tools_used, vec!["weather_forecast".to_string()]);
    }

    #[tokio::test]
    async fn iteration_cap_reached_without_finish() {
        let config = CoreConfig { max_iterations: 3, ..CoreConfig::default() };
        let (workflow, handle) = build_workflow(
            config,
            vec![
                Ok(ReasonerOutput { thought: "a".into(), tool_name: "weather_forecast".into(), tool_args: json!({"location": "X"}) }),
                Ok(ReasonerOutput { thought: "b".into(), tool_name: "weather_forecast".into(), tool_args: json!({"location": "X"}) }),
                Ok(ReasonerOutput { thought: "c".into(), tool_name: "weather_forecast".into(), tool_args: json!({"location": "X"}) }),
            ],
            Arc::new(FixedExtract("X stays the same.".to_string())),
        );

        handle.prompt("weather forever".to_string());
        handle.end_chat().await;
        let final_state = workflow.run().await;

        let msg = &final_state.messages[0];
        assert!(!msg.is_error());
        assert_eq!(msg.tools_used, vec!["weather_forecast".to_string()]);
    }

    #[tokio::test]
    async fn extract_failure_surfaces_as_message_error() {
        let (workflow, handle) = build_workflow(
            CoreConfig::default(),
            vec![Ok(ReasonerOutput { thought: "done".into(), tool_name: "finish".into(), tool_args: json!({}) })],
            Arc::new(FailingExtract),
        );

        handle.prompt("anything".to_string());
        handle.end_chat().await;
        let final_state = workflow.run().await;

        let msg = &final_state.messages[0];
        assert!(msg.is_error());
        assert!(msg.is_complete());
        assert!(msg.tools_used.is_empty());
    }

    #[tokio::test]
    async fn end_chat_during_processing_does_not_interrupt_current_turn() {
        let (workflow, handle) = build_workflow(
            CoreConfig::default(),
            vec![
                Ok(ReasonerOutput { thought: "check".into(), tool_name: "weather_forecast".into(), tool_args: json!({"location": "Paris"}) }),
                Ok(ReasonerOutput { thought: "done".into(), tool_name: "finish".into(), tool_args: json!({}) }),
            ],
            Arc::new(FixedExtract("ok".to_string())),
        );

        handle.prompt("weather".to_string());
        let run_handle = tokio::spawn(workflow.run());
        handle.end_chat().await;
        let final_state = run_handle.await.unwrap();

        assert_eq!(final_state.messages.len(), 1);
        assert!(final_state.messages[0].is_complete());
        assert!(!final_state.is_processing);
    }

    #[tokio::test]
    async fn duplicate_signals_process_both_prompts_in_order() {
        let (workflow, handle) = build_workflow(
            CoreConfig::default(),
            vec![
                Ok(ReasonerOutput { thought: "d".into(), tool_name: "finish".into(), tool_args: json!({}) }),
                Ok(ReasonerOutput { thought: "d".into(), tool_name: "finish".into(), tool_args: json!({}) }),
            ],
            Arc::new(FixedExtract("ok".to_string())),
        );

        handle.prompt("first".to_string());
        handle.prompt("second".to_string());
        handle.end_chat().await;
        let final_state = workflow.run().await;

        assert_eq!(final_state.messages.len(), 2);
        assert_eq!(final_state.messages[0].user_message, "first");
        assert_eq!(final_state.messages[1].user_message, "second");
    }

    #[tokio::test]
    async fn incremental_polling_reflects_turn_completion() {
        let (workflow, handle) = build_workflow(
            CoreConfig::default(),
            vec![
                Ok(ReasonerOutput { thought: "d".into(), tool_name: "finish".into(), tool_args: json!({}) }),
                Ok(ReasonerOutput { thought: "d".into(), tool_name: "finish".into(), tool_args: json!({}) }),
            ],
            Arc::new(FixedExtract("ok".to_string())),
        );

        handle.prompt("p1".to_string());
        handle.prompt("p2".to_string());

        let first_poll = handle.incremental_updates(None).await;
        assert!(first_poll.new_messages.is_empty() || first_poll.new_messages.len() <= 2);
        let last_seen = first_poll.last_seen_message_id;

        handle.end_chat().await;
        let final_state = tokio::time::timeout(Duration::from_secs(5), workflow.run()).await.unwrap();
        assert_eq!(final_state.messages.len(), 2);

        let second_poll = handle.incremental_updates(last_seen).await;
        assert!(second_poll.new_messages.len() <= 2);
    }
}
