//! Tool catalog - runtime discovery over a manifest
//!
//! Each tool gets a domain namespace and a camelCase method name, so script
//! code can write `tools.kubernetes.listPods({})` instead of the qualified
//! name. Namespaces come from [`DOMAIN_RULES`] matched against the server
//! name's tokens, falling back to the camelCase server name.

use super::manifest::Manifest;
use forge_foundation::strings::{is_reserved_word, sanitize_identifier, to_pascal_case};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

/// Default result count for [`ToolCatalog::search`]
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Names on the `tools` object itself, plus `Object.prototype` members;
/// a namespace may not shadow them
pub const RESERVED_NAMESPACES: &[&str] = &[
    "list",
    "search",
    "help",
    "call",
    "servers",
    "constructor",
    "hasOwnProperty",
    "isPrototypeOf",
    "propertyIsEnumerable",
    "toLocaleString",
    "toString",
    "valueOf",
];

/// `(namespace, server-name tokens that select it)`, first match wins
pub const DOMAIN_RULES: &[(&str, &[&str])] = &[
    ("kubernetes", &["k8s", "kubectl", "kubernetes", "kube", "pod", "pods"]),
    ("helm", &["helm"]),
    ("argo", &["argo", "argocd"]),
    ("prometheus", &["prometheus", "promql", "alertmanager"]),
    ("grafana", &["grafana", "loki"]),
    ("docker", &["docker", "container", "containers"]),
    ("terraform", &["terraform", "tf", "opentofu"]),
    ("aws", &["aws", "s3", "ec2"]),
    ("gcp", &["gcp", "gcloud", "gke"]),
    ("azure", &["azure", "az", "aks"]),
    ("github", &["github", "gh"]),
    ("gitlab", &["gitlab"]),
    ("git", &["git"]),
    ("slack", &["slack"]),
    ("jira", &["jira", "atlassian"]),
    ("database", &["postgres", "postgresql", "mysql", "sqlite", "sql", "db"]),
    ("filesystem", &["fs", "filesystem", "files"]),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// `namespace.method`, the path scripts use
    pub path: String,
    pub namespace: String,
    pub method: String,
    pub server: String,
    pub name: String,
    pub qualified_name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub input_schema: Value,
}

impl CatalogEntry {
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Summary row returned by list/search (schema omitted)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSummary {
    pub path: String,
    pub qualified_name: String,
    pub server: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    entries: Vec<CatalogEntry>,
}

impl ToolCatalog {
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let mut entries: Vec<CatalogEntry> = Vec::with_capacity(manifest.tool_count());
        let mut taken: HashSet<(String, String)> = HashSet::new();

        for server in manifest.servers() {
            let namespace = namespace_for(&server.server);
            for tool in &server.tools {
                let base = sanitize_identifier(&tool.name);
                let mut method = base.clone();
                if taken.contains(&(namespace.clone(), method.clone())) {
                    method = format!("{}{}", base, to_pascal_case(&server.server));
                }
                let mut n = 2;
                while taken.contains(&(namespace.clone(), method.clone())) {
                    method = format!("{}{}", base, n);
                    n += 1;
                }
                taken.insert((namespace.clone(), method.clone()));

                entries.push(CatalogEntry {
                    path: format!("{}.{}", namespace, method),
                    namespace: namespace.clone(),
                    method,
                    server: server.server.clone(),
                    name: tool.name.clone(),
                    qualified_name: tool.qualified_name.clone(),
                    description: tool.description.clone(),
                    input_schema: tool.input_schema.clone(),
                });
            }
        }

        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Namespaces in first-seen order
    pub fn namespaces(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for entry in &self.entries {
            if !seen.contains(&entry.namespace.as_str()) {
                seen.push(entry.namespace.as_str());
            }
        }
        seen
    }

    /// Server names in first-seen order
    pub fn servers(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for entry in &self.entries {
            if !seen.contains(&entry.server.as_str()) {
                seen.push(entry.server.as_str());
            }
        }
        seen
    }

    /// All tools, or only those of one server
    pub fn list(&self, server: Option<&str>) -> Vec<CatalogSummary> {
        self.entries
            .iter()
            .filter(|e| server.map_or(true, |s| e.server == s))
            .map(summary)
            .collect()
    }

    /// Ranked keyword search.
    ///
    /// Exact name match scores 100, a name containing the whole query 50;
    /// each query token adds 10 when found in the name, 5 in the server and
    /// 3 in the description. Ties keep catalog order.
    pub fn search(&self, query: &str, limit: Option<usize>) -> Vec<CatalogSummary> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        let tokens: Vec<&str> = query.split_whitespace().collect();

        let mut scored: Vec<(u32, &CatalogEntry)> = self
            .entries
            .iter()
            .filter_map(|e| {
                let score = score_entry(e, &query, &tokens);
                (score > 0).then_some((score, e))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        scored
            .into_iter()
            .take(limit.unwrap_or(DEFAULT_SEARCH_LIMIT))
            .map(|(_, e)| summary(e))
            .collect()
    }

    /// Look a tool up by qualified name, `namespace.method`, or bare tool name
    pub fn help(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|e| e.qualified_name == name)
            .or_else(|| self.entries.iter().find(|e| e.path() == name))
            .or_else(|| self.entries.iter().find(|e| e.name == name || e.method == name))
    }
}

fn summary(entry: &CatalogEntry) -> CatalogSummary {
    CatalogSummary {
        path: entry.path.clone(),
        qualified_name: entry.qualified_name.clone(),
        server: entry.server.clone(),
        description: entry.description.clone(),
    }
}

fn score_entry(entry: &CatalogEntry, query: &str, tokens: &[&str]) -> u32 {
    let name = entry.name.to_lowercase();
    let method = entry.method.to_lowercase();
    let qualified = entry.qualified_name.to_lowercase();
    let server = entry.server.to_lowercase();
    let description = entry.description.to_lowercase();

    let mut score = 0;
    if name == query || method == query || qualified == query {
        score += 100;
    } else if name.contains(query) || method.contains(query) {
        score += 50;
    }
    for token in tokens {
        if name.contains(token) || method.contains(token) {
            score += 10;
        }
        if server.contains(token) {
            score += 5;
        }
        if description.contains(token) {
            score += 3;
        }
    }
    score
}

/// Domain namespace for a server name
pub fn namespace_for(server: &str) -> String {
    let tokens: Vec<String> = server
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();

    let namespace = DOMAIN_RULES
        .iter()
        .find(|(_, keywords)| tokens.iter().any(|t| keywords.contains(&t.as_str())))
        .map(|(ns, _)| ns.to_string())
        .unwrap_or_else(|| sanitize_identifier(server));

    if RESERVED_NAMESPACES.contains(&namespace.as_str()) || is_reserved_word(&namespace) {
        format!("{}_", namespace)
    } else {
        namespace
    }
}
