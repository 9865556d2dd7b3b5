//! Tool registry - qualified name → registration
//!
//! Registration order is preserved (servers in configuration order, tools in
//! the order each provider listed them).

use super::types::McpTool;
use forge_foundation::strings::qualified_name;
use forge_foundation::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One tool as the rest of the system sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRegistration {
    /// `server__tool`; the only identifier external callers use
    pub qualified_name: String,
    pub server: String,
    pub tool_name: String,
    pub description: String,
    pub raw_schema: Value,
}

impl ToolRegistration {
    pub fn new(server: &str, tool: McpTool) -> Self {
        Self {
            qualified_name: qualified_name(server, &tool.name),
            server: server.to_string(),
            description: tool.description.unwrap_or_default(),
            tool_name: tool.name,
            raw_schema: tool.input_schema,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    entries: Vec<ToolRegistration>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 등록; 같은 qualified name 이 이미 있으면 `DuplicateTool`
    pub fn register(&mut self, registration: ToolRegistration) -> Result<()> {
        if self.index.contains_key(&registration.qualified_name) {
            return Err(Error::DuplicateTool(registration.qualified_name));
        }
        self.index
            .insert(registration.qualified_name.clone(), self.entries.len());
        self.entries.push(registration);
        Ok(())
    }

    pub fn get(&self, qualified_name: &str) -> Option<&ToolRegistration> {
        self.index.get(qualified_name).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.index.contains_key(qualified_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolRegistration> {
        self.entries.iter()
    }

    pub fn for_server<'a>(&'a self, server: &'a str) -> impl Iterator<Item = &'a ToolRegistration> {
        self.entries.iter().filter(move |r| r.server == server)
    }

    pub fn to_vec(&self) -> Vec<ToolRegistration> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}
