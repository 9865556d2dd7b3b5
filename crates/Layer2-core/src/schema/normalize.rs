//! Schema normalizer
//!
//! Total: every input, however malformed, maps to some `NormalizedSchema`.
//! Rules, in the order they are tried:
//!
//! 1. `type` as a list picks the first non-`"null"` entry (all null → first)
//! 2. an `enum` of only strings is an [`NormalizedSchema::Enum`]
//! 3. no `type` but `properties`/`required` → object
//! 4. no `type` but `anyOf`/`oneOf` → first variant that is not pure null
//! 5. `array` → items (unknown when missing)
//! 6. anything else → `Scalar(Unknown)`

use forge_foundation::strings::{
    SCHEMA_TYPE_ARRAY, SCHEMA_TYPE_BOOLEAN, SCHEMA_TYPE_INTEGER, SCHEMA_TYPE_NULL,
    SCHEMA_TYPE_NUMBER, SCHEMA_TYPE_OBJECT, SCHEMA_TYPE_STRING,
};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    String,
    Number,
    Integer,
    Boolean,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NormalizedSchema {
    Scalar { scalar: ScalarKind },
    Enum { values: Vec<String> },
    Array { items: Box<NormalizedSchema> },
    Object {
        properties: Vec<Property>,
        additional_properties: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub name: String,
    pub required: bool,
    pub schema: NormalizedSchema,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NormalizedSchema {
    pub fn scalar(kind: ScalarKind) -> Self {
        Self::Scalar { scalar: kind }
    }

    pub fn unknown() -> Self {
        Self::scalar(ScalarKind::Unknown)
    }

    /// Object with no declared properties
    pub fn empty_object() -> Self {
        Self::Object {
            properties: Vec::new(),
            additional_properties: true,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object { .. })
    }

    /// Properties of an object schema; empty for everything else
    pub fn properties(&self) -> &[Property] {
        match self {
            Self::Object { properties, .. } => properties,
            _ => &[],
        }
    }
}

/// Normalize a raw JSON Schema document
pub fn normalize(schema: &Value) -> NormalizedSchema {
    let Some(obj) = schema.as_object() else {
        return NormalizedSchema::unknown();
    };

    if let Some(values) = string_enum(obj) {
        return NormalizedSchema::Enum { values };
    }

    match declared_type(obj) {
        Some(ty) => normalize_typed(&ty, obj),
        None if obj.contains_key("properties") || obj.contains_key("required") => {
            normalize_object(obj)
        }
        None => match first_variant(obj) {
            Some(variant) => normalize(variant),
            None => NormalizedSchema::unknown(),
        },
    }
}

fn normalize_typed(ty: &str, obj: &Map<String, Value>) -> NormalizedSchema {
    match ty {
        SCHEMA_TYPE_STRING => NormalizedSchema::scalar(ScalarKind::String),
        SCHEMA_TYPE_NUMBER => NormalizedSchema::scalar(ScalarKind::Number),
        SCHEMA_TYPE_INTEGER => NormalizedSchema::scalar(ScalarKind::Integer),
        SCHEMA_TYPE_BOOLEAN => NormalizedSchema::scalar(ScalarKind::Boolean),
        SCHEMA_TYPE_ARRAY => NormalizedSchema::Array {
            items: Box::new(obj.get("items").map(normalize).unwrap_or_else(NormalizedSchema::unknown)),
        },
        SCHEMA_TYPE_OBJECT => normalize_object(obj),
        _ => NormalizedSchema::unknown(),
    }
}

fn normalize_object(obj: &Map<String, Value>) -> NormalizedSchema {
    let required: Vec<&str> = obj
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut properties: Vec<Property> = obj
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .map(|(name, prop)| Property {
                    name: name.clone(),
                    required: required.contains(&name.as_str()),
                    schema: normalize(prop),
                    description: prop
                        .get("description")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                })
                .collect()
        })
        .unwrap_or_default();

    for name in &required {
        if !properties.iter().any(|p| p.name == *name) {
            properties.push(Property {
                name: name.to_string(),
                required: true,
                schema: NormalizedSchema::unknown(),
                description: None,
            });
        }
    }

    let additional_properties = !matches!(obj.get("additionalProperties"), Some(Value::Bool(false)));

    NormalizedSchema::Object {
        properties,
        additional_properties,
    }
}

/// `type` as written; lists pick the first non-null candidate
fn declared_type(obj: &Map<String, Value>) -> Option<String> {
    match obj.get("type")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(candidates) => {
            let names: Vec<&str> = candidates.iter().filter_map(Value::as_str).collect();
            names
                .iter()
                .find(|t| **t != SCHEMA_TYPE_NULL)
                .or_else(|| names.first())
                .map(|t| t.to_string())
        }
        _ => None,
    }
}

fn string_enum(obj: &Map<String, Value>) -> Option<Vec<String>> {
    let values = obj.get("enum")?.as_array()?;
    if values.is_empty() {
        return None;
    }
    values
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

fn first_variant(obj: &Map<String, Value>) -> Option<&Value> {
    let variants = obj
        .get("anyOf")
        .or_else(|| obj.get("oneOf"))?
        .as_array()?;
    variants
        .iter()
        .find(|v| !is_pure_null(v))
        .or_else(|| variants.first())
}

fn is_pure_null(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some(SCHEMA_TYPE_NULL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nullable_type_list() {
        assert_eq!(
            normalize(&json!({"type": ["string", "null"]})),
            NormalizedSchema::scalar(ScalarKind::String)
        );
        assert_eq!(
            normalize(&json!({"type": ["null", "integer"]})),
            NormalizedSchema::scalar(ScalarKind::Integer)
        );
        assert_eq!(normalize(&json!({"type": ["null"]})), NormalizedSchema::unknown());
    }

    #[test]
    fn test_string_enum() {
        assert_eq!(
            normalize(&json!({"enum": ["a", "b"]})),
            NormalizedSchema::Enum {
                values: vec!["a".into(), "b".into()]
            }
        );
        // mixed enums fall through to the declared type
        assert_eq!(
            normalize(&json!({"type": "integer", "enum": [1, 2]})),
            NormalizedSchema::scalar(ScalarKind::Integer)
        );
    }

    #[test]
    fn test_implicit_object() {
        let schema = normalize(&json!({
            "properties": {
                "namespace": {"type": "string", "description": "Target namespace"},
                "limit": {"type": "integer"}
            },
            "required": ["namespace", "labelSelector"]
        }));

        let props = schema.properties();
        let names: Vec<_> = props.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["namespace", "limit", "labelSelector"]);
        assert!(props[0].required);
        assert_eq!(props[0].description.as_deref(), Some("Target namespace"));
        assert!(!props[1].required);
        assert!(props[2].required);
        assert_eq!(props[2].schema, NormalizedSchema::unknown());
    }

    #[test]
    fn test_additional_properties() {
        let open = normalize(&json!({"type": "object", "additionalProperties": {"type": "string"}}));
        assert!(matches!(open, NormalizedSchema::Object { additional_properties: true, .. }));

        let closed = normalize(&json!({"type": "object", "additionalProperties": false}));
        assert!(matches!(closed, NormalizedSchema::Object { additional_properties: false, .. }));
    }

    #[test]
    fn test_arrays() {
        assert_eq!(
            normalize(&json!({"type": "array", "items": {"type": "boolean"}})),
            NormalizedSchema::Array {
                items: Box::new(NormalizedSchema::scalar(ScalarKind::Boolean))
            }
        );
        assert_eq!(
            normalize(&json!({"type": "array"})),
            NormalizedSchema::Array {
                items: Box::new(NormalizedSchema::unknown())
            }
        );
    }

    #[test]
    fn test_any_of() {
        assert_eq!(
            normalize(&json!({"anyOf": [{"type": "null"}, {"type": "number"}]})),
            NormalizedSchema::scalar(ScalarKind::Number)
        );
        assert_eq!(
            normalize(&json!({"oneOf": [{"type": "string"}, {"type": "integer"}]})),
            NormalizedSchema::scalar(ScalarKind::String)
        );
    }

    #[test]
    fn test_total_on_garbage() {
        for raw in [
            json!(null),
            json!(42),
            json!("string"),
            json!({}),
            json!({"type": 7}),
            json!({"type": "tuple"}),
            json!({"enum": []}),
            json!({"anyOf": "nope"}),
        ] {
            assert_eq!(normalize(&raw), NormalizedSchema::unknown(), "input: {}", raw);
        }
    }
}
