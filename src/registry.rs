//! Indexed set of tool descriptors, immutable once a workflow worker starts.

use std::collections::HashMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::tool::{FieldIssue, ToolDescriptor, ToolParameterType, ToolSummary, ValidationError};
use crate::trajectory::FINISH;

#[derive(Debug, Clone)]
pub enum RegistryError {
    DuplicateTool(String),
    ReservedName(String),
    NotFound(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateTool(name) => write!(f, "tool already registered: {}", name),
            RegistryError::ReservedName(name) => write!(f, "tool name is reserved: {}", name),
            RegistryError::NotFound(name) => write!(f, "tool not found: {}", name),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Stable-ordered registry of [`ToolDescriptor`]s.
///
/// Registration happens during process/worker startup; after that the
/// registry is read-only and requires no locking for concurrent readers.
#[derive(Default)]
pub struct ToolRegistry {
    descriptors: HashMap<String, ToolDescriptor>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), RegistryError> {
        if descriptor.name == FINISH {
            return Err(RegistryError::ReservedName(descriptor.name));
        }
        if self.descriptors.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateTool(descriptor.name));
        }
        self.order.push(descriptor.name.clone());
        self.descriptors.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&ToolDescriptor, RegistryError> {
        self.descriptors.get(name).ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    /// Stable insertion-order listing for reasoner context.
    pub fn list_for_reasoner(&self) -> Vec<ToolSummary> {
        self.order
            .iter()
            .map(|name| {
                let descriptor = &self.descriptors[name];
                ToolSummary {
                    name: descriptor.name.clone(),
                    description: descriptor.description.clone(),
                    args_schema_summary: summarize_schema(descriptor),
                }
            })
            .collect()
    }

    /// Applies the named tool's `args_schema` to `raw_args`: coerces numeric
    /// strings where the schema demands a number/integer, fills declared
    /// defaults for missing optional fields, and drops any key absent from
    /// the schema — a reasoner that invents extra or malformed arguments
    /// never reaches the tool invoker.
    pub fn validate_and_shape(&self, name: &str, raw_args: &Value) -> Result<Value, ValidationError> {
        let descriptor = match self.descriptors.get(name) {
            Some(d) => d,
            None => {
                return Err(ValidationError {
                    tool_name: name.to_string(),
                    issues: vec![FieldIssue {
                        field: String::new(),
                        message: "tool not registered".to_string(),
                    }],
                })
            }
        };

        let raw_map = raw_args.as_object().cloned().unwrap_or_default();
        let mut shaped = Map::new();
        let mut issues = Vec::new();

        for param in &descriptor.args_schema {
            match raw_map.get(&param.name) {
                Some(value) => match coerce(value, param.param_type) {
                    Some(coerced) => {
                        shaped.insert(param.name.clone(), coerced);
                    }
                    None => issues.push(FieldIssue {
                        field: param.name.clone(),
                        message: format!("expected {:?}, got {}", param.param_type, value),
                    }),
                },
                None => {
                    if let Some(default) = &param.default {
                        shaped.insert(param.name.clone(), default.clone());
                    } else if param.required {
                        issues.push(FieldIssue {
                            field: param.name.clone(),
                            message: "required field missing".to_string(),
                        });
                    }
                }
            }
        }

        if !issues.is_empty() {
            return Err(ValidationError {
                tool_name: name.to_string(),
                issues,
            });
        }

        Ok(Value::Object(shaped))
    }
}

fn coerce(value: &Value, expected: ToolParameterType) -> Option<Value> {
    match expected {
        ToolParameterType::String => match value {
            Value::String(_) => Some(value.clone()),
            Value::Number(n) => Some(Value::String(n.to_string())),
            _ => None,
        },
        ToolParameterType::Number => match value {
            Value::Number(_) => Some(value.clone()),
            Value::String(s) => s.parse::<f64>().ok().and_then(|f| serde_json::Number::from_f64(f)).map(Value::Number),
            _ => None,
        },
        ToolParameterType::Integer => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(value.clone()),
            Value::String(s) => s.parse::<i64>().ok().map(|i| Value::Number(i.into())),
            _ => None,
        },
        ToolParameterType::Boolean => match value {
            Value::Bool(_) => Some(value.clone()),
            Value::String(s) => match s.as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        },
        ToolParameterType::Array => match value {
            Value::Array(_) => Some(value.clone()),
            _ => None,
        },
        ToolParameterType::Object => match value {
            Value::Object(_) => Some(value.clone()),
            _ => None,
        },
    }
}

fn summarize_schema(descriptor: &ToolDescriptor) -> String {
    descriptor
        .args_schema
        .iter()
        .map(|p| {
            let marker = if p.required { "" } else { "?" };
            format!("{}{}:{:?}", p.name, marker, p.param_type)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{ToolDescriptor, ToolParameter};
    use serde_json::json;
    use std::sync::Arc;

    fn weather_descriptor() -> ToolDescriptor {
        ToolDescriptor::local(
            "weather_forecast",
            "Returns a forecast for a location.",
            vec![
                ToolParameter::new("location", ToolParameterType::String).required(),
                ToolParameter::new("days", ToolParameterType::Integer).with_default(json!(7)),
            ],
            Arc::new(|args: &Value| Ok(format!("WX({},{})", args["location"], args["days"]))),
        )
    }

    #[test]
    fn register_rejects_finish_and_duplicates() {
        let mut registry = ToolRegistry::new();
        assert!(registry.register(weather_descriptor()).is_ok());
        assert!(matches!(registry.register(weather_descriptor()), Err(RegistryError::DuplicateTool(_))));

        let finish_tool = ToolDescriptor::local("finish", "nope", vec![], Arc::new(|_: &Value| Ok(String::new())));
        assert!(matches!(registry.register(finish_tool), Err(RegistryError::ReservedName(_))));
    }

    #[test]
    fn validate_and_shape_drops_unknown_keys_and_fills_defaults() {
        let mut registry = ToolRegistry::new();
        registry.register(weather_descriptor()).unwrap();

        let shaped = registry
            .validate_and_shape("weather_forecast", &json!({"location": "Paris", "data_fields": ["temp"]}))
            .unwrap();
        assert_eq!(shaped, json!({"location": "Paris", "days": 7}));
    }

    #[test]
    fn validate_and_shape_reports_missing_required_field() {
        let mut registry = ToolRegistry::new();
        registry.register(weather_descriptor()).unwrap();

        let err = registry.validate_and_shape("weather_forecast", &json!({"days": 3})).unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].field, "location");
    }

    #[test]
    fn list_for_reasoner_is_stable_insertion_order() {
        let mut registry = ToolRegistry::new();
        registry.register(weather_descriptor()).unwrap();
        registry
            .register(ToolDescriptor::local("calculator", "evaluate", vec![], Arc::new(|_: &Value| Ok(String::new()))))
            .unwrap();

        let first = registry.list_for_reasoner();
        let second = registry.list_for_reasoner();
        let names: Vec<&str> = first.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["weather_forecast", "calculator"]);
        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].name, second[0].name);
    }
}
