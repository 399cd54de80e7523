//! Structured-output schema for the plan.
//!
//! The JSON Schema is derived from the [`Plan`] types with `schemars`, then
//! translated into the OpenAPI subset Gemini accepts as `responseSchema`:
//! upper-case type names, no `$schema`/`$ref`/`title`/`additionalProperties`,
//! only the formats the provider understands, and an explicit
//! `propertyOrdering` so fields come back in declaration order.

use std::sync::OnceLock;

use schemars::generate::SchemaSettings;
use serde_json::{Map, Value};

use crate::model::Plan;

/// Keywords copied through unchanged when present.
const PASSTHROUGH_KEYWORDS: [&str; 7] = [
    "description",
    "enum",
    "minimum",
    "maximum",
    "minItems",
    "maxItems",
    "required",
];

static RESPONSE_SCHEMA: OnceLock<Value> = OnceLock::new();

/// JSON Schema for [`Plan`], with every subschema inlined.
pub fn plan_json_schema() -> Value {
    let generator = SchemaSettings::draft07()
        .with(|s| s.inline_subschemas = true)
        .into_generator();
    generator.into_root_schema_for::<Plan>().to_value()
}

/// Provider-dialect schema for [`Plan`]. Built once per process.
pub fn plan_response_schema() -> &'static Value {
    RESPONSE_SCHEMA.get_or_init(|| to_provider_schema(&plan_json_schema()))
}

/// Translate one JSON Schema node (recursively) into the provider dialect.
///
/// Unknown keywords are dropped rather than rejected: the provider fails the
/// whole request on a keyword it does not know.
pub fn to_provider_schema(node: &Value) -> Value {
    let Some(obj) = node.as_object() else {
        return node.clone();
    };

    let mut out = Map::new();

    let (ty, nullable) = schema_type(obj);
    if let Some(ty) = ty {
        out.insert("type".to_owned(), Value::String(ty.to_ascii_uppercase()));
        if let Some(format) = obj.get("format").and_then(Value::as_str) {
            if is_supported_format(&ty, format) {
                out.insert("format".to_owned(), Value::String(format.to_owned()));
            }
        }
    }
    if nullable {
        out.insert("nullable".to_owned(), Value::Bool(true));
    }

    for key in PASSTHROUGH_KEYWORDS {
        if let Some(v) = obj.get(key) {
            out.insert(key.to_owned(), v.clone());
        }
    }

    if let Some(props) = obj.get("properties").and_then(Value::as_object) {
        let ordering: Vec<Value> = props.keys().cloned().map(Value::String).collect();
        let translated: Map<String, Value> = props
            .iter()
            .map(|(name, sub)| (name.clone(), to_provider_schema(sub)))
            .collect();
        out.insert("properties".to_owned(), Value::Object(translated));
        out.insert("propertyOrdering".to_owned(), Value::Array(ordering));
    }

    if let Some(items) = obj.get("items") {
        out.insert("items".to_owned(), to_provider_schema(items));
    }

    Value::Object(out)
}

/// Resolve `type`, folding `["T", "null"]` into `T` + nullable.
fn schema_type(obj: &Map<String, Value>) -> (Option<String>, bool) {
    match obj.get("type") {
        Some(Value::String(s)) => (Some(s.clone()), false),
        Some(Value::Array(types)) => {
            let nullable = types.iter().any(|t| t == "null");
            let ty = types
                .iter()
                .filter_map(Value::as_str)
                .find(|t| *t != "null")
                .map(str::to_owned);
            (ty, nullable)
        }
        _ => (None, false),
    }
}

fn is_supported_format(ty: &str, format: &str) -> bool {
    matches!(
        (ty, format),
        ("integer", "int32" | "int64")
            | ("number", "float" | "double")
            | ("string", "date-time" | "enum")
    )
}
