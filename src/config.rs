//! Process-assembled configuration. Constructed once at startup and passed
//! by reference into the workflow worker and remote pool; never mutated
//! afterward.

/// Global configuration recognized by the core.
///
/// No file-format parser is introduced here: callers construct this however
/// suits their deployment (env vars, a config crate, CLI flags) and hand
/// the result in.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Hard cap on ReAct iterations per turn.
    pub max_iterations: usize,
    /// Which registered tool set to expose to the reasoner.
    pub tool_set: String,
    /// If true, tool names sent to a remote server are prefixed
    /// `"{server_namespace}_{tool_name}"`.
    pub proxy_mode: bool,
    /// Base endpoint for remote tools, if any are registered.
    pub mcp_url: Option<String>,
    /// When true, remote tools may return deterministic synthetic
    /// responses; does not affect control flow.
    pub tools_mock: bool,
    /// Activity timeout for remote tool calls.
    pub remote_timeout_secs: u64,
    /// Activity timeout for local tool calls.
    pub local_timeout_secs: u64,
    /// `env_logger` filter string, e.g. `"info"` or `"durable_agent_core=debug"`.
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tool_set: "default".to_string(),
            proxy_mode: false,
            mcp_url: None,
            tools_mock: false,
            remote_timeout_secs: 300,
            local_timeout_secs: 30,
            log_level: "info".to_string(),
        }
    }
}

/// Initializes the `env_logger` backend from `config.log_level`. Safe to
/// call more than once per process (subsequent calls are ignored).
pub fn init_logging(config: &CoreConfig) {
    let _ = env_logger::Builder::new().parse_filters(&config.log_level).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.max_iterations, 10);
        assert!(!config.proxy_mode);
        assert!(config.mcp_url.is_none());
    }
}
