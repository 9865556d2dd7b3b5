//! Stub emission - JavaScript wrappers and TypeScript declarations
//!
//! Pure string rendering; the manager decides where the text goes.

use crate::schema::{NormalizedSchema, ScalarKind};
use forge_foundation::strings::{sanitize_file_name, sanitize_identifier, sanitize_type_name};
use std::collections::HashSet;
use std::fmt::Write;

pub const GENERATED_HEADER: &str = "// Generated by forge codegen. Do not edit.";

/// Names one tool's stub is emitted under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubNames {
    /// File stem inside `servers/<server>/`
    pub file: String,
    /// Exported function name
    pub function: String,
    /// Input interface name
    pub input_type: String,
}

/// File stem of the per-server re-export module
pub const SERVER_INDEX_STEM: &str = "index";

/// Allocates collision-free stub names within one server unit
#[derive(Debug)]
pub struct NameAllocator {
    files: HashSet<String>,
    functions: HashSet<String>,
}

impl Default for NameAllocator {
    fn default() -> Self {
        // index.js / index.d.ts 는 서버 유닛이 차지
        Self {
            files: HashSet::from([SERVER_INDEX_STEM.to_string()]),
            functions: HashSet::new(),
        }
    }
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, tool_name: &str) -> StubNames {
        let file = unique(&mut self.files, sanitize_file_name(tool_name), "_");
        let function = unique(&mut self.functions, sanitize_identifier(tool_name), "");
        let input_type = format!("{}Input", upper_first(&function));
        StubNames {
            file,
            function,
            input_type,
        }
    }
}

fn unique(taken: &mut HashSet<String>, base: String, sep: &str) -> String {
    let mut candidate = base.clone();
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = format!("{}{}{}", base, sep, n);
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

fn upper_first(s: &str) -> String {
    let trimmed = s.trim_start_matches('_');
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => c.to_ascii_uppercase().to_string() + chars.as_str(),
        _ => sanitize_type_name(s),
    }
}

/// Property key as it may appear in a TypeScript object type
fn property_key(name: &str) -> String {
    let valid = name
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if valid {
        name.to_string()
    } else {
        json_string(name)
    }
}

fn json_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

/// Comment-safe single line
fn doc_line(s: &str) -> String {
    s.replace("*/", "* /").replace('\n', " ").trim().to_string()
}

/// TypeScript type expression for a schema
pub fn ts_type(schema: &NormalizedSchema) -> String {
    match schema {
        NormalizedSchema::Scalar { scalar } => match scalar {
            ScalarKind::String => "string".to_string(),
            ScalarKind::Number | ScalarKind::Integer => "number".to_string(),
            ScalarKind::Boolean => "boolean".to_string(),
            ScalarKind::Unknown => "unknown".to_string(),
        },
        NormalizedSchema::Enum { values } => values
            .iter()
            .map(|v| json_string(v))
            .collect::<Vec<_>>()
            .join(" | "),
        NormalizedSchema::Array { items } => format!("Array<{}>", ts_type(items)),
        NormalizedSchema::Object {
            properties,
            additional_properties,
        } => {
            let mut members: Vec<String> = properties
                .iter()
                .map(|p| {
                    format!(
                        "{}{}: {}",
                        property_key(&p.name),
                        if p.required { "" } else { "?" },
                        ts_type(&p.schema)
                    )
                })
                .collect();
            if *additional_properties {
                members.push("[key: string]: unknown".to_string());
            }
            if members.is_empty() {
                "{}".to_string()
            } else {
                format!("{{ {} }}", members.join("; "))
            }
        }
    }
}

/// `<tool>.d.ts`
pub fn tool_declaration(names: &StubNames, description: &str, schema: &NormalizedSchema) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", GENERATED_HEADER);
    let _ = writeln!(out);

    match schema {
        NormalizedSchema::Object {
            properties,
            additional_properties,
        } => {
            let _ = writeln!(out, "export interface {} {{", names.input_type);
            for prop in properties {
                if let Some(desc) = prop.description.as_deref().filter(|d| !d.trim().is_empty()) {
                    let _ = writeln!(out, "  /** {} */", doc_line(desc));
                }
                let _ = writeln!(
                    out,
                    "  {}{}: {};",
                    property_key(&prop.name),
                    if prop.required { "" } else { "?" },
                    ts_type(&prop.schema)
                );
            }
            if *additional_properties {
                let _ = writeln!(out, "  [key: string]: unknown;");
            }
            let _ = writeln!(out, "}}");
        }
        other => {
            let _ = writeln!(out, "export type {} = {};", names.input_type, ts_type(other));
        }
    }
    let _ = writeln!(out);

    if !description.trim().is_empty() {
        let _ = writeln!(out, "/** {} */", doc_line(description));
    }
    let optional = !schema.properties().iter().any(|p| p.required);
    let _ = writeln!(
        out,
        "export declare function {}(input{}: {}): Promise<unknown>;",
        names.function,
        if optional { "?" } else { "" },
        names.input_type
    );
    let _ = writeln!(out, "export default {};", names.function);
    out
}

/// `<tool>.js`: forwards `(qualifiedName, input)` to the runtime helper
pub fn tool_module(names: &StubNames, qualified_name: &str, description: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", GENERATED_HEADER);
    let _ = writeln!(out, "import {{ callTool }} from \"../../runtime.js\";");
    let _ = writeln!(out);
    let _ = writeln!(out, "/**");
    if !description.trim().is_empty() {
        let _ = writeln!(out, " * {}", doc_line(description));
    }
    let _ = writeln!(
        out,
        " * @param {{import(\"./{}\").{}}} [input]",
        names.file, names.input_type
    );
    let _ = writeln!(out, " */");
    let _ = writeln!(out, "export async function {}(input = {{}}) {{", names.function);
    let _ = writeln!(out, "  return callTool({}, input);", json_string(qualified_name));
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
    let _ = writeln!(out, "export default {};", names.function);
    out
}

/// `servers/<server>/index.js`
pub fn server_index_js(stubs: &[StubNames]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", GENERATED_HEADER);
    for stub in stubs {
        let _ = writeln!(out, "export {{ {} }} from \"./{}.js\";", stub.function, stub.file);
    }
    out
}

/// `servers/<server>/index.d.ts`
pub fn server_index_dts(stubs: &[StubNames]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", GENERATED_HEADER);
    for stub in stubs {
        let _ = writeln!(
            out,
            "export {{ {}, {} }} from \"./{}\";",
            stub.function, stub.input_type, stub.file
        );
    }
    out
}

/// Root `index.js` / `index.d.ts`; `units` is `(binding, server dir)`
pub fn root_index(units: &[(String, String)], declaration: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", GENERATED_HEADER);
    let ext = if declaration { "" } else { ".js" };
    for (binding, dir) in units {
        let _ = writeln!(
            out,
            "export * as {} from \"./servers/{}/index{}\";",
            binding, dir, ext
        );
    }
    out
}

/// `manifest.js`: the manifest as an ES module default export
pub fn manifest_module(manifest_json: &str) -> String {
    format!("{}\nexport default {};\n", GENERATED_HEADER, manifest_json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::normalize;
    use serde_json::json;

    #[test]
    fn test_allocator_dedupes() {
        let mut alloc = NameAllocator::new();
        let a = alloc.allocate("list_pods");
        let b = alloc.allocate("listPods");
        let c = alloc.allocate("delete");
        assert_eq!(a.function, "listPods");
        assert_eq!(a.input_type, "ListPodsInput");
        assert_eq!(b.function, "listPods2");
        assert_eq!(b.file, "listPods");
        assert_eq!(c.function, "delete_");
        assert_eq!(c.input_type, "Delete_Input");
    }

    #[test]
    fn test_allocator_reserves_index_stem() {
        let mut alloc = NameAllocator::new();
        let names = alloc.allocate("index");
        assert_eq!(names.file, "index_2");
        assert_eq!(names.function, "index");
    }

    #[test]
    fn test_ts_types() {
        let schema = normalize(&json!({
            "type": "object",
            "properties": {
                "namespace": {"type": "string"},
                "phase": {"enum": ["Running", "Pending"]},
                "labels": {"type": "array", "items": {"type": "string"}},
                "dry-run": {"type": "boolean"}
            },
            "required": ["namespace"],
            "additionalProperties": false
        }));
        assert_eq!(
            ts_type(&schema),
            "{ namespace: string; phase?: \"Running\" | \"Pending\"; labels?: Array<string>; \"dry-run\"?: boolean }"
        );
    }

    #[test]
    fn test_declaration() {
        let mut alloc = NameAllocator::new();
        let names = alloc.allocate("list_pods");
        let schema = normalize(&json!({
            "type": "object",
            "properties": {"namespace": {"type": "string", "description": "Namespace */ name"}},
            "required": ["namespace"]
        }));
        let dts = tool_declaration(&names, "List pods", &schema);
        assert!(dts.contains("export interface ListPodsInput {"));
        assert!(dts.contains("  /** Namespace * / name */"));
        assert!(dts.contains("  namespace: string;"));
        assert!(dts.contains("  [key: string]: unknown;"));
        assert!(dts.contains("export declare function listPods(input: ListPodsInput): Promise<unknown>;"));
    }

    #[test]
    fn test_declaration_optional_input() {
        let names = NameAllocator::new().allocate("ping");
        let dts = tool_declaration(&names, "", &normalize(&json!({"type": "string"})));
        assert!(dts.contains("export type PingInput = string;"));
        assert!(dts.contains("function ping(input?: PingInput)"));
    }

    #[test]
    fn test_tool_module_forwards() {
        let names = NameAllocator::new().allocate("list_pods");
        let js = tool_module(&names, "k8s__list_pods", "List pods");
        assert!(js.contains("import { callTool } from \"../../runtime.js\";"));
        assert!(js.contains("export async function listPods(input = {}) {"));
        assert!(js.contains("return callTool(\"k8s__list_pods\", input);"));
    }

    #[test]
    fn test_indexes() {
        let names = vec![NameAllocator::new().allocate("list_pods")];
        assert!(server_index_js(&names).contains("export { listPods } from \"./list_pods.js\";"));
        assert!(server_index_dts(&names).contains("export { listPods, ListPodsInput } from \"./list_pods\";"));

        let units = vec![("k8s".to_string(), "k8s".to_string())];
        assert!(root_index(&units, false).contains("export * as k8s from \"./servers/k8s/index.js\";"));
        assert!(root_index(&units, true).contains("export * as k8s from \"./servers/k8s/index\";"));
    }
}
