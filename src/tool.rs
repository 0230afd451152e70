//! Tool descriptors: the declarative shape of everything the reasoner may
//! invoke, local or remote.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Primitive kinds an [`ToolParameter`] may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolParameterType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

/// One field of a tool's `args_schema`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub param_type: ToolParameterType,
    pub description: String,
    pub required: bool,
    pub default: Option<Value>,
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, param_type: ToolParameterType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: String::new(),
            required: false,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// A tool's declared argument shape, in declaration order.
pub type ArgsSchema = Vec<ToolParameter>;

/// Invoked by the step executor for a [`ToolKind::Local`] tool. Implementors
/// should never panic; any failure is returned as `Err`.
pub trait LocalInvoker: Send + Sync {
    fn call(&self, shaped_args: &Value) -> Result<String, String>;
}

impl<F> LocalInvoker for F
where
    F: Fn(&Value) -> Result<String, String> + Send + Sync,
{
    fn call(&self, shaped_args: &Value) -> Result<String, String> {
        self(shaped_args)
    }
}

/// Whether a tool runs in-process or behind a tool-server endpoint.
#[derive(Clone)]
pub enum ToolKind {
    Local {
        invoker: Arc<dyn LocalInvoker>,
    },
    Remote {
        /// Namespace the proxy groups this server's tools under; `None` when
        /// the deployment addresses the server directly.
        server_namespace: Option<String>,
        /// Name the tool is registered under on the remote server; may
        /// differ from the logical [`ToolDescriptor::name`].
        server_tool_name: String,
    },
}

impl fmt::Debug for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolKind::Local { .. } => f.write_str("ToolKind::Local"),
            ToolKind::Remote { server_namespace, server_tool_name } => f
                .debug_struct("ToolKind::Remote")
                .field("server_namespace", server_namespace)
                .field("server_tool_name", server_tool_name)
                .finish(),
        }
    }
}

/// Immutable, process-lifetime description of one registerable tool.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub args_schema: ArgsSchema,
    pub kind: ToolKind,
}

impl ToolDescriptor {
    pub fn local(name: impl Into<String>, description: impl Into<String>, args_schema: ArgsSchema, invoker: Arc<dyn LocalInvoker>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            args_schema,
            kind: ToolKind::Local { invoker },
        }
    }

    pub fn remote(
        name: impl Into<String>,
        description: impl Into<String>,
        args_schema: ArgsSchema,
        server_namespace: Option<String>,
        server_tool_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            args_schema,
            kind: ToolKind::Remote {
                server_namespace,
                server_tool_name: server_tool_name.into(),
            },
        }
    }
}

/// `(name, description, args_schema_summary)` tuple surfaced to the
/// reasoner; see [`crate::registry::ToolRegistry::list_for_reasoner`].
#[derive(Debug, Clone, Serialize)]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
    pub args_schema_summary: String,
}

/// One field-level problem found while shaping raw arguments against a
/// tool's schema.
#[derive(Debug, Clone)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

/// Raised by [`crate::registry::ToolRegistry::validate_and_shape`] when raw
/// arguments cannot be coerced into the tool's declared schema.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub tool_name: String,
    pub issues: Vec<FieldIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed for tool '{}': ", self.tool_name)?;
        let rendered: Vec<String> = self.issues.iter().map(|i| format!("{}: {}", i.field, i.message)).collect();
        write!(f, "{}", rendered.join("; "))
    }
}

impl std::error::Error for ValidationError {}
