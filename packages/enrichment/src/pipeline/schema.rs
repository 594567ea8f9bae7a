//! JSON schemas for structured extraction, built from the requested fields.
//!
//! Pure functions of the field list, kept apart from any LLM client so the
//! mapping can be tested on its own. Schemas follow OpenAI strict mode:
//!
//! 1. `additionalProperties: false` on every object
//! 2. every property listed in `required`, nullable ones included
//! 3. fully inlined (no `$ref`)

use serde_json::{json, Map, Value};

use crate::types::field::{EnrichmentField, FieldType};

/// Schema for a field's value. Always nullable so the model can decline.
pub fn value_schema(field_type: FieldType) -> Value {
    match field_type {
        FieldType::String => json!({ "type": ["string", "null"] }),
        FieldType::Number => json!({ "type": ["number", "null"] }),
        FieldType::Boolean => json!({ "type": ["boolean", "null"] }),
        FieldType::StringArray => json!({
            "type": ["array", "null"],
            "items": { "type": "string" }
        }),
    }
}

/// Flat mode: `{field: {value, confidence, sources: [{url, quote}]}}`.
pub fn flat_response_schema(fields: &[EnrichmentField]) -> Value {
    strict_object(fields.iter().map(|field| {
        let entry = strict_object([
            ("value", with_description(value_schema(field.field_type), field)),
            ("confidence", json!({ "type": "number" })),
            (
                "sources",
                json!({
                    "type": "array",
                    "items": strict_object([
                        ("url", json!({ "type": "string" })),
                        ("quote", json!({ "type": "string" })),
                    ])
                }),
            ),
        ]);
        (field.name.as_str(), entry)
    }))
}

/// Corroborated mode:
/// `{field: {evidence: [{value, source_url, exact_text, confidence}], consensus_value}}`.
pub fn corroborated_response_schema(fields: &[EnrichmentField]) -> Value {
    strict_object(fields.iter().map(|field| {
        let evidence = strict_object([
            ("value", value_schema(field.field_type)),
            ("source_url", json!({ "type": "string" })),
            ("exact_text", json!({ "type": "string" })),
            ("confidence", json!({ "type": "number" })),
        ]);
        let entry = strict_object([
            ("evidence", json!({ "type": "array", "items": evidence })),
            (
                "consensus_value",
                with_description(value_schema(field.field_type), field),
            ),
        ]);
        (field.name.as_str(), entry)
    }))
}

fn with_description(mut schema: Value, field: &EnrichmentField) -> Value {
    if !field.description.is_empty() {
        if let Value::Object(map) = &mut schema {
            map.insert("description".into(), Value::String(field.description.clone()));
        }
    }
    schema
}

fn strict_object<'a>(properties: impl IntoIterator<Item = (&'a str, Value)>) -> Value {
    let mut props = Map::new();
    let mut required = Vec::new();
    for (name, schema) in properties {
        required.push(Value::String(name.to_string()));
        props.insert(name.to_string(), schema);
    }
    json!({
        "type": "object",
        "properties": props,
        "required": required,
        "additionalProperties": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> Vec<EnrichmentField> {
        vec![
            EnrichmentField::new("employeeCount", FieldType::Number)
                .with_description("Number of employees"),
            EnrichmentField::new("techStack", FieldType::StringArray),
        ]
    }

    fn assert_strict(value: &Value) {
        if let Value::Object(map) = value {
            if map.get("type") == Some(&json!("object")) {
                assert_eq!(map.get("additionalProperties"), Some(&json!(false)));
                let props = map["properties"].as_object().unwrap();
                let required = map["required"].as_array().unwrap();
                assert_eq!(props.len(), required.len());
            }
            map.values().for_each(assert_strict);
        } else if let Value::Array(items) = value {
            items.iter().for_each(assert_strict);
        }
    }

    #[test]
    fn test_value_schema_per_type() {
        assert_eq!(value_schema(FieldType::Number)["type"], json!(["number", "null"]));
        assert_eq!(value_schema(FieldType::StringArray)["items"]["type"], "string");
    }

    #[test]
    fn test_flat_schema_is_strict() {
        let schema = flat_response_schema(&fields());
        assert_strict(&schema);
        assert_eq!(schema["required"], json!(["employeeCount", "techStack"]));
        assert_eq!(
            schema["properties"]["employeeCount"]["properties"]["value"]["description"],
            "Number of employees"
        );
    }

    #[test]
    fn test_corroborated_schema_is_strict() {
        let schema = corroborated_response_schema(&fields());
        assert_strict(&schema);
        let evidence = &schema["properties"]["techStack"]["properties"]["evidence"];
        assert_eq!(evidence["items"]["properties"]["value"]["type"], json!(["array", "null"]));
    }
}
