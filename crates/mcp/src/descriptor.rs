//! Server descriptors: which tool server to reach and how.

use std::collections::HashMap;
use std::fmt;

use reqwest::Url;

/// One configured tool server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDescriptor {
    pub name: String,
    pub endpoint: Endpoint,
}

impl ServerDescriptor {
    /// Describe a server reached over HTTP.
    pub fn remote(name: impl Into<String>, url: Url) -> Self {
        Self {
            name: name.into(),
            endpoint: Endpoint::Remote(url),
        }
    }

    /// Describe a server spawned as a local process.
    pub fn process(name: impl Into<String>, command: ProcessCommand) -> Self {
        Self {
            name: name.into(),
            endpoint: Endpoint::Process(command),
        }
    }
}

/// How a server is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Network endpoint; streamable HTTP first, SSE as fallback.
    Remote(Url),
    /// Child process speaking the protocol over its stdio pipes.
    Process(ProcessCommand),
}

/// Command line and environment for a process-pipe server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessCommand {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

impl ProcessCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// The closed set of transports a session can run over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    ProcessPipe,
    StreamableHttp,
    Sse,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProcessPipe => write!(f, "stdio"),
            Self::StreamableHttp => write!(f, "streamable-http"),
            Self::Sse => write!(f, "sse"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_command_builder() {
        let command = ProcessCommand::new("python")
            .arg("calculator.py")
            .env("LOG_LEVEL", "debug");

        assert_eq!(command.command, "python");
        assert_eq!(command.args, vec!["calculator.py"]);
        assert_eq!(command.env.get("LOG_LEVEL").map(String::as_str), Some("debug"));
    }

    #[test]
    fn transport_display() {
        assert_eq!(TransportKind::ProcessPipe.to_string(), "stdio");
        assert_eq!(TransportKind::StreamableHttp.to_string(), "streamable-http");
        assert_eq!(TransportKind::Sse.to_string(), "sse");
    }
}
