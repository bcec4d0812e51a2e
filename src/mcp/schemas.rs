//! JSON schema builders for MCP tools.

use serde_json::{Map, Value};

/// Build the schema describing the `process-sds` tool input.
pub(crate) fn process_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "path".into(),
        string_schema("Path to a .pdf, .md, .markdown, or .txt safety data sheet on the server host"),
    );
    finalize_object_schema(properties, &["path"])
}

/// Build the schema for tools addressing a single processed record.
pub(crate) fn sds_id_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert("sds_id".into(), sds_id_schema());
    finalize_object_schema(properties, &["sds_id"])
}

/// Build the schema describing the `ask` tool input.
pub(crate) fn ask_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert("sds_id".into(), sds_id_schema());

    let mut question_schema = Map::new();
    question_schema.insert("type".into(), Value::String("string".into()));
    question_schema.insert(
        "description".into(),
        Value::String("Question answered from the sheet's full text only".into()),
    );
    question_schema.insert("minLength".into(), Value::from(1));
    properties.insert("question".into(), Value::Object(question_schema));

    finalize_object_schema(properties, &["sds_id", "question"])
}

/// Schema representing an empty object (used for parameterless tools).
pub(crate) fn empty_object_schema() -> Map<String, Value> {
    finalize_object_schema(Map::new(), &[])
}

fn sds_id_schema() -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("string".into()));
    schema.insert(
        "description".into(),
        Value::String("Identifier returned by `process-sds`".into()),
    );
    schema.insert("format".into(), Value::String("uuid".into()));
    Value::Object(schema)
}

fn string_schema(description: &str) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("string".into()));
    schema.insert("description".into(), Value::String(description.into()));
    Value::Object(schema)
}

fn finalize_object_schema(properties: Map<String, Value>, required: &[&str]) -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("object".into()));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert(
            "required".into(),
            Value::Array(
                required
                    .iter()
                    .map(|&key| Value::String(key.into()))
                    .collect(),
            ),
        );
    }
    schema.insert("additionalProperties".into(), Value::Bool(false));
    schema
}
