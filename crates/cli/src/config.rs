//! Configuration loading from switchboard.toml or an `mcpServers` JSON file.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use mcp::{ProcessCommand, ServerDescriptor, Url};
use runtime::{DEFAULT_BASE_URL, DuplicatePolicy, OrchestratorConfig};
use serde::Deserialize;
use serde_json::{Map, Value};

pub const DEFAULT_MODEL: &str = "qwen-plus";
pub const DEFAULT_MAX_TURNS: usize = 20;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub orchestrator: OrchestratorSection,

    /// Servers in connection order.
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

/// Chat-completions endpoint settings.
#[derive(Debug, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub name: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Usually left out of the file and supplied as `OPENAI_API_KEY`.
    pub api_key: Option<String>,

    #[serde(default)]
    pub stream: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            base_url: default_base_url(),
            api_key: None,
            stream: false,
        }
    }
}

/// Loop limits and duplicate handling.
#[derive(Debug, Deserialize)]
pub struct OrchestratorSection {
    /// Model requests per query. `0` removes the limit.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    pub turn_timeout_secs: Option<u64>,

    pub tool_timeout_secs: Option<u64>,

    #[serde(default)]
    pub duplicate_tools: DuplicatePolicy,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            turn_timeout_secs: None,
            tool_timeout_secs: None,
            duplicate_tools: DuplicatePolicy::default(),
        }
    }
}

impl OrchestratorSection {
    pub fn limits(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_turns: (self.max_turns > 0).then_some(self.max_turns),
            turn_timeout: self.turn_timeout_secs.map(Duration::from_secs),
            tool_timeout: self.tool_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// One tool server: either `url` or `command` (+ `args`, `env`).
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub name: String,

    pub url: Option<String>,

    pub command: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Transport hint. Only `websocket` is meaningful, and it is refused.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl ServerConfig {
    pub fn descriptor(&self) -> Result<ServerDescriptor, ConfigError> {
        let invalid = |reason: &str| ConfigError::Server {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.kind.as_deref() == Some("websocket") {
            return Err(invalid("websocket transport is not supported"));
        }

        match (&self.url, &self.command) {
            (Some(url), None) => {
                let url = Url::parse(url).map_err(|e| invalid(&format!("bad url: {e}")))?;
                Ok(ServerDescriptor::remote(&self.name, url))
            }
            (None, Some(command)) => {
                let command = self
                    .args
                    .iter()
                    .fold(ProcessCommand::new(command), |cmd, arg| cmd.arg(arg));
                let command = self
                    .env
                    .iter()
                    .fold(command, |cmd, (key, value)| cmd.env(key, value));
                Ok(ServerDescriptor::process(&self.name, command))
            }
            (Some(_), Some(_)) => Err(invalid("set either url or command, not both")),
            (None, None) => Err(invalid("one of url or command is required")),
        }
    }
}

/// The `{"mcpServers": {...}}` layout.
#[derive(Debug, Deserialize)]
struct McpServersFile {
    #[serde(rename = "mcpServers", default)]
    mcp_servers: Map<String, Value>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_max_turns() -> usize {
    DEFAULT_MAX_TURNS
}

impl Config {
    /// Load a `.json` file in the `mcpServers` layout, anything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::parse_json(&content)
        } else {
            Self::parse(&content)
        }
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if let Some(index) = config.servers.iter().position(|s| s.name.is_empty()) {
            return Err(ConfigError::Server {
                name: format!("#{}", index + 1),
                reason: "missing name".to_string(),
            });
        }
        Ok(config)
    }

    /// Parse an `mcpServers` JSON document. Key order is connection order.
    pub fn parse_json(json: &str) -> Result<Self, ConfigError> {
        let file: McpServersFile =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let servers = file
            .mcp_servers
            .into_iter()
            .map(|(name, entry)| {
                let mut server: ServerConfig =
                    serde_json::from_value(entry).map_err(|e| ConfigError::Server {
                        name: name.clone(),
                        reason: e.to_string(),
                    })?;
                server.name = name;
                Ok(server)
            })
            .collect::<Result<_, ConfigError>>()?;

        Ok(Self {
            servers,
            ..Self::default()
        })
    }

    /// Apply `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `MODEL_NAME` on top of the file.
    pub fn with_env(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        let set = |key: &str| var(key).filter(|value| !value.is_empty());
        if let Some(key) = set("OPENAI_API_KEY") {
            self.model.api_key = Some(key);
        }
        if let Some(url) = set("OPENAI_BASE_URL") {
            self.model.base_url = url;
        }
        if let Some(name) = set("MODEL_NAME") {
            self.model.name = name;
        }
        self
    }

    /// Server descriptors in configuration order.
    pub fn descriptors(&self) -> Result<Vec<ServerDescriptor>, ConfigError> {
        self.servers.iter().map(ServerConfig::descriptor).collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid server '{name}': {reason}")]
    Server { name: String, reason: String },
}
