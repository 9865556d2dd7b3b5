//! Naming Utilities
//!
//! Shared string helpers for turning tool-provider names into identifiers:
//! - Qualified tool names (`server__tool`)
//! - camelCase / PascalCase conversion for generated JavaScript
//! - Reserved-word escaping and file-name sanitising
//! - JSON Schema type constants
//!
//! # Usage
//!
//! ```ignore
//! use forge_foundation::strings::{qualified_name, to_camel_case};
//!
//! assert_eq!(qualified_name("k8s", "list_pods"), "k8s__list_pods");
//! assert_eq!(to_camel_case("list_pods"), "listPods");
//! ```

// ============================================================================
// Qualified Names
// ============================================================================

/// Separator between server and tool in a qualified name
pub const QUALIFIED_NAME_SEPARATOR: &str = "__";

/// `server ++ "__" ++ tool`
pub fn qualified_name(server: &str, tool: &str) -> String {
    format!("{}{}{}", server, QUALIFIED_NAME_SEPARATOR, tool)
}

/// Split a qualified name at the first separator.
///
/// Server names never contain the separator, so the split is unambiguous
/// even when the tool name does.
pub fn split_qualified_name(name: &str) -> Option<(&str, &str)> {
    name.split_once(QUALIFIED_NAME_SEPARATOR)
        .filter(|(server, tool)| !server.is_empty() && !tool.is_empty())
}

// ============================================================================
// Schema Constants
// ============================================================================

/// JSON Schema type for object
pub const SCHEMA_TYPE_OBJECT: &str = "object";
/// JSON Schema type for string
pub const SCHEMA_TYPE_STRING: &str = "string";
/// JSON Schema type for integer
pub const SCHEMA_TYPE_INTEGER: &str = "integer";
/// JSON Schema type for number
pub const SCHEMA_TYPE_NUMBER: &str = "number";
/// JSON Schema type for boolean
pub const SCHEMA_TYPE_BOOLEAN: &str = "boolean";
/// JSON Schema type for array
pub const SCHEMA_TYPE_ARRAY: &str = "array";
/// JSON Schema type for null
pub const SCHEMA_TYPE_NULL: &str = "null";

// ============================================================================
// Reserved Words
// ============================================================================

/// JavaScript / TypeScript words that cannot be used as bare identifiers
pub const RESERVED_WORDS: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false", "finally",
    "for", "function", "if", "implements", "import", "in", "instanceof", "interface", "let",
    "new", "null", "package", "private", "protected", "public", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "typeof", "undefined", "var", "void", "while",
    "with", "yield",
];

pub fn is_reserved_word(word: &str) -> bool {
    RESERVED_WORDS.contains(&word)
}

// ============================================================================
// Case Conversion
// ============================================================================

/// Split on non-alphanumeric characters and lower→upper case boundaries
fn split_words(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in s.chars() {
        if !c.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_ascii_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// `list_pods` → `listPods`
pub fn to_camel_case(s: &str) -> String {
    let words = split_words(s);
    let mut out = String::new();
    for (i, word) in words.iter().enumerate() {
        if i == 0 {
            out.push_str(&word.to_ascii_lowercase());
        } else {
            out.push_str(&capitalize(word));
        }
    }
    out
}

/// `list_pods` → `ListPods`
pub fn to_pascal_case(s: &str) -> String {
    split_words(s).iter().map(|w| capitalize(w)).collect()
}

/// camelCase identifier that is safe to emit as a JavaScript binding.
///
/// Leading digits get a `_` prefix, reserved words a `_` suffix, and an
/// empty result becomes `_`.
pub fn sanitize_identifier(s: &str) -> String {
    escape_identifier(to_camel_case(s))
}

/// PascalCase counterpart of [`sanitize_identifier`] for type names
pub fn sanitize_type_name(s: &str) -> String {
    escape_identifier(to_pascal_case(s))
}

fn escape_identifier(mut ident: String) -> String {
    if ident.is_empty() {
        return "_".to_string();
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if is_reserved_word(&ident) {
        ident.push('_');
    }
    ident
}

/// Restrict a name to `[A-Za-z0-9_-]` so it can be used as a file or
/// directory name
pub fn sanitize_file_name(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name() {
        assert_eq!(qualified_name("k8s", "list_pods"), "k8s__list_pods");
        assert_eq!(split_qualified_name("k8s__list_pods"), Some(("k8s", "list_pods")));
        assert_eq!(split_qualified_name("gh__a__b"), Some(("gh", "a__b")));
        assert_eq!(split_qualified_name("nosep"), None);
        assert_eq!(split_qualified_name("__tool"), None);
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(to_camel_case("list_pods"), "listPods");
        assert_eq!(to_camel_case("get-pod-logs"), "getPodLogs");
        assert_eq!(to_camel_case("listPods"), "listPods");
        assert_eq!(to_camel_case("LIST_PODS"), "listPods");
        assert_eq!(to_camel_case("k8s"), "k8s");
        assert_eq!(to_camel_case("my server"), "myServer");
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(to_pascal_case("list_pods"), "ListPods");
        assert_eq!(to_pascal_case("createIssue"), "CreateIssue");
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("delete"), "delete_");
        assert_eq!(sanitize_identifier("3d_render"), "_3dRender");
        assert_eq!(sanitize_identifier("---"), "_");
        assert_eq!(sanitize_type_name("list_pods"), "ListPods");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("list_pods"), "list_pods");
        assert_eq!(sanitize_file_name("../etc/passwd"), "___etc_passwd");
        assert_eq!(sanitize_file_name("a.b c"), "a_b_c");
        assert_eq!(sanitize_file_name(""), "_");
    }
}
