//! Tool catalog and routing table.
//!
//! Built once after every session is connected and read-only afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use mcp::{ToolDescriptor, ToolSession};
use serde::Deserialize;
use tracing::{info, warn};

use crate::llm::ToolSpec;
use crate::{Error, Result};

/// Separator between server and tool name under [`DuplicatePolicy::Namespace`].
pub const NAMESPACE_SEPARATOR: &str = "__";

/// Longest function name chat-completions endpoints accept.
pub const MAX_TOOL_NAME_LEN: usize = 64;

/// What to do when two servers expose a tool with the same name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// The server registered later wins the route.
    #[default]
    Override,
    /// Fail the catalog build.
    Reject,
    /// Expose every tool as `<server>__<tool>`.
    Namespace,
}

/// Flattened, model-facing list of every tool, in session order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCatalog {
    specs: Vec<ToolSpec>,
}

impl ToolCatalog {
    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Where a catalog name is dispatched to.
pub struct Route<S> {
    pub session: Arc<S>,
    /// Name the owning server knows the tool by.
    pub remote_name: String,
}

/// Mapping from catalog name to owning session.
pub struct RoutingTable<S> {
    routes: HashMap<String, Route<S>>,
}

impl<S> RoutingTable<S> {
    pub fn resolve(&self, name: &str) -> Option<&Route<S>> {
        self.routes.get(name)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<S: ToolSession> fmt::Debug for Route<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("server", &self.session.server())
            .field("remote_name", &self.remote_name)
            .finish()
    }
}

impl<S: ToolSession> fmt::Debug for RoutingTable<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(&self.routes).finish()
    }
}

impl<S> Default for RoutingTable<S> {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }
}

/// Query every session for its tools and merge them.
///
/// Any failing session aborts the whole build.
pub async fn build_catalog<S: ToolSession>(
    sessions: &[Arc<S>],
    policy: DuplicatePolicy,
) -> Result<(ToolCatalog, RoutingTable<S>)> {
    let mut listed = Vec::with_capacity(sessions.len());
    for session in sessions {
        let tools = session.list_tools().await?;
        info!(server = session.server(), tools = tools.len(), "listed tools");
        listed.push((session, tools));
    }

    let mut catalog = ToolCatalog::default();
    for (session, tools) in &listed {
        for tool in tools {
            let name = exposed_name(policy, session.server(), tool);
            if policy == DuplicatePolicy::Namespace && name.len() > MAX_TOOL_NAME_LEN {
                return Err(Error::ToolNameTooLong {
                    name,
                    max: MAX_TOOL_NAME_LEN,
                });
            }
            catalog.specs.push(to_spec(name, tool));
        }
    }

    let mut table = RoutingTable::default();
    for (session, tools) in &listed {
        for tool in tools {
            let name = exposed_name(policy, session.server(), tool);
            let route = Route {
                session: Arc::clone(session),
                remote_name: tool.name.clone(),
            };
            if let Some(previous) = table.routes.insert(name.clone(), route) {
                let first = previous.session.server().to_string();
                let second = session.server().to_string();
                if policy == DuplicatePolicy::Reject {
                    return Err(Error::DuplicateTool {
                        name,
                        first,
                        second,
                    });
                }
                warn!(tool = %name, %first, %second, "duplicate tool name, later server wins");
            }
        }
    }

    Ok((catalog, table))
}

fn exposed_name(policy: DuplicatePolicy, server: &str, tool: &ToolDescriptor) -> String {
    match policy {
        DuplicatePolicy::Namespace => {
            format!("{}{NAMESPACE_SEPARATOR}{}", function_safe(server), tool.name)
        }
        DuplicatePolicy::Override | DuplicatePolicy::Reject => tool.name.clone(),
    }
}

/// Function names are limited to `[A-Za-z0-9_-]`; anything else becomes `_`.
fn function_safe(server: &str) -> String {
    server
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn to_spec(name: String, tool: &ToolDescriptor) -> ToolSpec {
    ToolSpec::function(name, tool.description.clone(), tool.input_schema.clone())
}
