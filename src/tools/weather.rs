//! A deterministic, synthetic forecast tool used in examples and tests.
//! Produces no network calls; real deployments register a remote
//! [`crate::tool::ToolDescriptor`] under this same name instead.

use std::sync::Arc;

use serde_json::Value;

use crate::tool::{ToolDescriptor, ToolParameter, ToolParameterType};

/// `weather_forecast(location: string, days: int = 7) -> "WX(location,days)"`.
pub fn weather_descriptor() -> ToolDescriptor {
    ToolDescriptor::local(
        "weather_forecast",
        "Returns a short-range weather forecast for a named location.",
        vec![
            ToolParameter::new("location", ToolParameterType::String)
                .required()
                .with_description("City or place name."),
            ToolParameter::new("days", ToolParameterType::Integer)
                .with_default(serde_json::json!(7))
                .with_description("Number of days to forecast, defaults to 7."),
        ],
        Arc::new(invoke),
    )
}

fn invoke(shaped_args: &Value) -> Result<String, String> {
    let location = shaped_args
        .get("location")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing shaped 'location'".to_string())?;
    let days = shaped_args.get("days").and_then(Value::as_i64).unwrap_or(7);
    Ok(format!("WX({},{})", location, days))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_fixed_format() {
        let descriptor = weather_descriptor();
        if let crate::tool::ToolKind::Local { invoker } = &descriptor.kind {
            let out = invoker.call(&serde_json::json!({"location": "Paris", "days": 3})).unwrap();
            assert_eq!(out, "WX(Paris,3)");
        } else {
            panic!("expected local tool");
        }
    }
}
