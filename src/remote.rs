//! Pooled sessions to one or more tool-server endpoints, and the proxy
//! naming policy that decides what name is actually sent on the wire.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::CoreConfig;

const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    Transport,
    Protocol,
    Timeout,
}

#[derive(Debug, Clone)]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub retriable: bool,
    pub message: String,
}

impl RemoteError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self { kind: RemoteErrorKind::Transport, retriable: true, message: message.into() }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self { kind: RemoteErrorKind::Timeout, retriable: true, message: message.into() }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self { kind: RemoteErrorKind::Protocol, retriable: false, message: message.into() }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} error (retriable={}): {}", self.kind, self.retriable, self.message)
    }
}

impl std::error::Error for RemoteError {}

#[derive(Debug, Deserialize)]
struct RemoteCallResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// One pooled, kept-alive connection to a single tool-server endpoint.
/// Calls within a session are issued sequentially and matched in order;
/// no pipelining is assumed.
pub struct RemoteSession {
    endpoint: String,
    client: reqwest::Client,
}

impl RemoteSession {
    fn new(endpoint: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { endpoint, client }
    }

    pub async fn call_tool(&self, server_tool_name: &str, arguments: &Value) -> Result<String, RemoteError> {
        let url = format!("{}/execute", self.endpoint.trim_end_matches('/'));
        let body = serde_json::json!({ "tool": server_tool_name, "parameters": arguments });

        let response = self.client.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                RemoteError::timeout(e.to_string())
            } else {
                RemoteError::transport(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(RemoteError::protocol(format!("tool server returned status {}", response.status())));
        }

        let parsed: RemoteCallResponse = response.json().await.map_err(|e| RemoteError::protocol(e.to_string()))?;
        if parsed.success {
            Ok(parsed.output.map(render_output).unwrap_or_default())
        } else {
            Err(RemoteError::protocol(parsed.error.unwrap_or_else(|| "remote tool execution failed".to_string())))
        }
    }
}

fn render_output(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Process-wide pool of [`RemoteSession`]s keyed by endpoint, and the
/// proxy-prefix naming policy.
pub struct RemoteToolPool {
    sessions: RwLock<HashMap<String, Arc<RemoteSession>>>,
    proxy_mode: bool,
    timeout: Duration,
}

impl RemoteToolPool {
    pub fn new(proxy_mode: bool, timeout_secs: Option<u64>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            proxy_mode,
            timeout: Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        }
    }

    /// Builds a pool whose proxy mode and per-call timeout come straight
    /// from `config.proxy_mode`/`config.remote_timeout_secs`.
    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(config.proxy_mode, Some(config.remote_timeout_secs))
    }

    pub async fn session_for(&self, endpoint: &str) -> Arc<RemoteSession> {
        if let Some(existing) = self.sessions.read().await.get(endpoint) {
            return existing.clone();
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(endpoint.to_string())
            .or_insert_with(|| Arc::new(RemoteSession::new(endpoint.to_string(), self.timeout)))
            .clone()
    }

    /// Applies the proxy naming policy: `"{namespace}_{tool_name}"` when a
    /// namespace is present and proxy mode is on, `server_tool_name`
    /// unchanged otherwise.
    pub fn effective_tool_name(&self, server_namespace: Option<&str>, server_tool_name: &str) -> String {
        match (self.proxy_mode, server_namespace) {
            (true, Some(namespace)) => format!("{}_{}", namespace, server_tool_name),
            _ => server_tool_name.to_string(),
        }
    }

    pub async fn call(
        &self,
        endpoint: &str,
        server_namespace: Option<&str>,
        server_tool_name: &str,
        arguments: &Value,
    ) -> Result<String, RemoteError> {
        let name = self.effective_tool_name(server_namespace, server_tool_name);
        let session = self.session_for(endpoint).await;
        session.call_tool(&name, arguments).await
    }

    /// Drains and drops all pooled sessions.
    pub async fn shutdown(&self) {
        self.sessions.write().await.clear();
    }
}
