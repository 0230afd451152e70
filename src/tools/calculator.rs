//! A narrow arithmetic calculator tool, trimmed to the arithmetic
//! `evalexpr` supports natively: `+ - * / ^ %` and parentheses, plus the
//! `pi`/`e` constants. Trigonometric, hyperbolic, and statistical functions
//! are out of scope here; register a dedicated tool for those if a
//! deployment needs them.

use std::sync::Arc;

use evalexpr::{ContextWithMutableVariables, DefaultNumericTypes, HashMapContext};
use serde_json::Value;

use crate::tool::{ToolDescriptor, ToolParameter, ToolParameterType};

/// `calculator(expression: string) -> decimal result rendered as a string`.
pub fn calculator_descriptor() -> ToolDescriptor {
    ToolDescriptor::local(
        "calculator",
        "Evaluates a basic arithmetic expression (+ - * / ^ %, parentheses, pi, e).",
        vec![ToolParameter::new("expression", ToolParameterType::String)
            .required()
            .with_description("Arithmetic expression, e.g. \"(2 + 3) * 4\".")],
        Arc::new(invoke),
    )
}

fn invoke(shaped_args: &Value) -> Result<String, String> {
    let expression = shaped_args
        .get("expression")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing shaped 'expression'".to_string())?;
    evaluate(expression)
}

fn evaluate(expression: &str) -> Result<String, String> {
    let mut context: HashMapContext<DefaultNumericTypes> = HashMapContext::new();
    context
        .set_value("pi".to_string(), evalexpr::Value::Float(std::f64::consts::PI))
        .map_err(|e| e.to_string())?;
    context
        .set_value("e".to_string(), evalexpr::Value::Float(std::f64::consts::E))
        .map_err(|e| e.to_string())?;

    let value = evalexpr::eval_with_context(expression, &context).map_err(|e| format!("evaluation error: {}", e))?;
    value.as_number().map(|n: f64| n.to_string()).map_err(|_| "result is not a number".to_string())
}
