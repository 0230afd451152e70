//! ReAct trajectory model: the ordered record of reasoning steps taken during
//! a single conversational turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved tool name that terminates the ReAct loop without a dispatch.
pub const FINISH: &str = "finish";

/// Fixed observation string recorded when a step's tool is [`FINISH`].
pub const COMPLETED: &str = "Completed.";

/// One iteration of the reason/act/observe loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryStep {
    /// Zero-based, strictly increasing within a trajectory; equals the index
    /// in [`Trajectory::steps`].
    pub iteration: usize,
    pub thought: String,
    pub tool_name: String,
    pub tool_args: Value,
    pub observation: Option<String>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl TrajectoryStep {
    pub fn new(iteration: usize, thought: impl Into<String>, tool_name: impl Into<String>, tool_args: Value) -> Self {
        Self {
            iteration,
            thought: thought.into(),
            tool_name: tool_name.into(),
            tool_args,
            observation: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// A step is complete once it carries an observation or an error.
    pub fn is_complete(&self) -> bool {
        self.observation.is_some() || self.error.is_some()
    }

    pub fn is_finish(&self) -> bool {
        self.tool_name == FINISH
    }
}

/// Ordered sequence of [`TrajectoryStep`]s produced while processing one prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trajectory {
    pub steps: Vec<TrajectoryStep>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Appends a step. The step's `iteration` must equal the trajectory's
    /// current length; this is an internal invariant enforced by the step
    /// executor, not re-validated here.
    pub fn push(&mut self, step: TrajectoryStep) {
        debug_assert_eq!(step.iteration, self.steps.len());
        self.steps.push(step);
    }

    /// True once the last recorded step is a `finish`. Iteration-cap
    /// termination is a property of the caller's loop, not of the trajectory
    /// itself, so it is not reflected here.
    pub fn ended_with_finish(&self) -> bool {
        self.steps.last().map(|s| s.is_finish()).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Deterministic, human-readable rendering of a trajectory, fed back to the
/// reasoner as context on subsequent iterations. Stable across equal inputs.
pub fn summarize(trajectory: &Trajectory) -> String {
    let mut blocks = Vec::with_capacity(trajectory.steps.len());
    for step in &trajectory.steps {
        let mut lines = Vec::with_capacity(4);
        lines.push(format!("Thought: {}", step.thought));
        lines.push(format!("Tool: {}", step.tool_name));
        lines.push(format!("Args: {}", format_args(&step.tool_args)));
        if let Some(error) = &step.error {
            lines.push(format!("Error: {}", error));
        } else if let Some(observation) = &step.observation {
            lines.push(format!("Observation: {}", observation));
        }
        blocks.push(lines.join("\n"));
    }
    blocks.join("\n\n")
}

/// Renders `tool_args` as compact `key=value` pairs, keys sorted for
/// stability. Scalars render bare; nested values fall back to compact JSON.
fn format_args(args: &Value) -> String {
    let map = match args.as_object() {
        Some(map) if !map.is_empty() => map,
        _ => return String::new(),
    };
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    keys.into_iter()
        .map(|k| format!("{}={}", k, render_scalar(&map[k])))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Ordered, distinct tool names that produced a successful observation,
/// excluding [`FINISH`]. A tool that only ever errored never appears here.
pub fn tools_used(trajectory: &Trajectory) -> Vec<String> {
    let mut seen = Vec::new();
    for step in &trajectory.steps {
        if step.tool_name == FINISH {
            continue;
        }
        if step.observation.is_none() {
            continue;
        }
        if !seen.contains(&step.tool_name) {
            seen.push(step.tool_name.clone());
        }
    }
    seen
}
