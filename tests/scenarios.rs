//! End-to-end validation scenarios.
use jschema::{SchemaResolver, ValidationError};
use serde_json::{json, Value};
use std::sync::Arc;
use url::Url;

fn collect_errors<'a>(
    validator: &'a jschema::Validator,
    instance: &'a Value,
) -> Vec<ValidationError<'a>> {
    validator
        .validate(instance)
        .expect_err("Validation errors are expected")
        .collect()
}

#[test]
fn nested_items_type_violation() {
    let schema = json!({
        "type": "object",
        "properties": {
            "fruits": {"type": "array", "items": {"type": "string"}}
        }
    });
    let instance = json!({"fruits": ["apple", 1]});
    let validator = jschema::compile(&schema).unwrap();
    let errors = collect_errors(&validator, &instance);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].instance_path.to_string(), "/fruits/1");
    assert_eq!(
        errors[0].schema_path.to_string(),
        "/properties/fruits/items/type"
    );
}

struct ExternalDocuments;

impl SchemaResolver for ExternalDocuments {
    fn resolve(&self, url: &Url) -> Option<Arc<Value>> {
        (url.as_str() == "http://x/b").then(|| {
            Arc::new(json!({
                "$id": "http://x/b",
                "defs": {
                    "orNull": {"type": ["string", "null"]}
                }
            }))
        })
    }
}

#[test]
fn cross_document_reference() {
    // The reference target lives under a key that is not a keyword; pointers may
    // reach into such subtrees
    let schema = json!({
        "$id": "http://x/a",
        "properties": {
            "n": {"$ref": "b#/defs/orNull"}
        }
    });
    let validator = jschema::options()
        .with_resolver(ExternalDocuments)
        .compile(&schema)
        .unwrap();

    assert!(validator.is_valid(&json!({"n": null})));
    assert!(validator.is_valid(&json!({"n": "text"})));

    let instance = json!({"n": 3});
    let errors = collect_errors(&validator, &instance);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].instance_path.to_string(), "/n");
}

#[test]
fn missing_external_document_is_a_compile_error() {
    let schema = json!({
        "$id": "http://x/a",
        "properties": {
            "n": {"$ref": "b#/defs/orNull"}
        }
    });
    assert!(matches!(
        jschema::compile(&schema),
        Err(jschema::SchemaError::UnresolvedReference { .. })
    ));
}

#[test]
fn defaults_injection() {
    let schema = json!({"properties": {"bar": {"default": "bad", "minLength": 4}}});
    let validator = jschema::options()
        .with_defaults_injection()
        .compile(&schema)
        .unwrap();

    let instance = json!({});
    let patch = validator.default_patch(&instance);
    assert_eq!(
        serde_json::to_value(&patch).unwrap(),
        json!([{"op": "add", "path": "/bar", "value": "bad"}])
    );

    // The patched instance carries the default, which is itself invalid here
    let patched = json!({"bar": "bad"});
    let errors = collect_errors(&validator, &patched);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].instance_path.to_string(), "/bar");
    assert_eq!(errors[0].schema_path.to_string(), "/properties/bar/minLength");
}

#[test]
fn one_of_ambiguity() {
    let schema = json!({
        "oneOf": [
            {"type": "integer"},
            {"minimum": 2},
            {"maximum": 100}
        ]
    });
    let validator = jschema::compile(&schema).unwrap();
    let instance = json!(3);
    let errors = collect_errors(&validator, &instance);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].to_string(),
        "3 is valid under more than one of the given schemas"
    );
}

#[test]
fn dynamic_reference_list() {
    // A generic list schema; the caller constrains the element type through a
    // dynamic anchor that shadows the fallback declared next to the reference
    let schema = json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://example.com/strict-list",
        "$ref": "list",
        "$defs": {
            "strings": {"$dynamicAnchor": "items", "type": "string"},
            "list": {
                "$id": "list",
                "type": "array",
                "items": {"$dynamicRef": "#items"},
                "$defs": {
                    "default-items": {"$dynamicAnchor": "items"}
                }
            }
        }
    });
    let validator = jschema::compile(&schema).unwrap();
    assert!(validator.is_valid(&json!(["foo", "bar"])));

    let instance = json!(["foo", 42]);
    let errors = collect_errors(&validator, &instance);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].instance_path.to_string(), "/1");
}

#[test]
fn unevaluated_properties_across_all_of() {
    let schema = json!({
        "properties": {"foo": {}},
        "allOf": [{"properties": {"bar": {}}}],
        "unevaluatedProperties": false
    });
    let validator = jschema::compile(&schema).unwrap();
    assert!(validator.is_valid(&json!({"foo": 1, "bar": 2})));

    let instance = json!({"foo": 1, "bar": 2, "baz": 3});
    let errors = collect_errors(&validator, &instance);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].instance_path.to_string(), "/baz");
}
