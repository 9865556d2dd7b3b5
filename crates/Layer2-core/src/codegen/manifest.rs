//! Discovery manifest
//!
//! Serialised as a bare JSON array:
//! `[{ "server": .., "tools": [{ "name", "qualifiedName", "description", "inputSchema" }] }]`

use crate::mcp::ToolRegistration;
use forge_foundation::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolManifestEntry {
    pub name: String,
    pub qualified_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_schema: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerManifest {
    pub server: String,
    pub tools: Vec<ToolManifestEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    servers: Vec<ServerManifest>,
}

impl Manifest {
    pub fn new(servers: Vec<ServerManifest>) -> Self {
        Self { servers }
    }

    /// Group registrations by server, keeping first-seen server order
    pub fn from_registrations(registrations: &[ToolRegistration]) -> Self {
        let mut servers: Vec<ServerManifest> = Vec::new();
        for reg in registrations {
            let entry = ToolManifestEntry {
                name: reg.tool_name.clone(),
                qualified_name: reg.qualified_name.clone(),
                description: reg.description.clone(),
                input_schema: reg.raw_schema.clone(),
            };
            match servers.iter_mut().find(|s| s.server == reg.server) {
                Some(group) => group.tools.push(entry),
                None => servers.push(ServerManifest {
                    server: reg.server.clone(),
                    tools: vec![entry],
                }),
            }
        }
        Self { servers }
    }

    pub fn servers(&self) -> &[ServerManifest] {
        &self.servers
    }

    pub fn server(&self, name: &str) -> Option<&ServerManifest> {
        self.servers.iter().find(|s| s.server == name)
    }

    /// `(server, entry)` pairs in manifest order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ToolManifestEntry)> {
        self.servers
            .iter()
            .flat_map(|s| s.tools.iter().map(move |t| (s.server.as_str(), t)))
    }

    pub fn find(&self, qualified_name: &str) -> Option<(&str, &ToolManifestEntry)> {
        self.entries().find(|(_, t)| t.qualified_name == qualified_name)
    }

    pub fn qualified_names(&self) -> Vec<&str> {
        self.entries().map(|(_, t)| t.qualified_name.as_str()).collect()
    }

    pub fn tool_count(&self) -> usize {
        self.servers.iter().map(|s| s.tools.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tool_count() == 0
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
