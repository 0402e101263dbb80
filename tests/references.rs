//! Identifier scoping and reference resolution behaviors.
use jschema::{Draft, SchemaResolver};
use serde_json::{json, Value};
use std::sync::Arc;
use url::Url;

#[test]
fn nested_id_changes_resolution_scope() {
    let schema = json!({
        "$id": "http://localhost:1234/root.json",
        "properties": {
            "list": {"$ref": "#/definitions/baz"}
        },
        "definitions": {
            "baz": {
                "$id": "folder/",
                "type": "array",
                "items": {"$ref": "item.json"}
            }
        }
    });
    struct Folder;
    impl SchemaResolver for Folder {
        fn resolve(&self, url: &Url) -> Option<Arc<Value>> {
            // `item.json` resolves against the nested scope, not the document root
            (url.as_str() == "http://localhost:1234/folder/item.json")
                .then(|| Arc::new(json!({"type": "integer"})))
        }
    }
    let validator = jschema::options()
        .with_resolver(Folder)
        .compile(&schema)
        .unwrap();
    assert!(validator.is_valid(&json!({"list": [1, 2]})));
    assert!(!validator.is_valid(&json!({"list": ["a"]})));
}

#[test]
fn location_independent_anchor() {
    let schema = json!({
        "$schema": "https://json-schema.org/draft/2019-09/schema",
        "$ref": "#addr",
        "$defs": {
            "A": {"$anchor": "addr", "type": "string"}
        }
    });
    let validator = jschema::compile(&schema).unwrap();
    assert!(validator.is_valid(&json!("x")));
    assert!(!validator.is_valid(&json!(1)));
}

#[test]
fn draft4_id_keyword() {
    let schema = json!({
        "$schema": "http://json-schema.org/draft-04/schema#",
        "id": "http://example.com/root",
        "properties": {
            "a": {"$ref": "#/definitions/positive"}
        },
        "definitions": {
            "positive": {"type": "integer", "minimum": 0}
        }
    });
    let validator = jschema::compile(&schema).unwrap();
    assert!(validator.is_valid(&json!({"a": 1})));
    assert!(!validator.is_valid(&json!({"a": -1})));
}

#[test]
fn sibling_keywords_are_ignored_next_to_ref_before_2019() {
    let schema = json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "properties": {
            "a": {
                "$ref": "#/definitions/str",
                "minimum": 1000
            }
        },
        "definitions": {
            "str": {"type": "string"}
        }
    });
    let validator = jschema::compile(&schema).unwrap();
    // `minimum` would reject this number, but it is a mere annotation next to `$ref`
    assert!(!validator.is_valid(&json!({"a": 1})));
    assert!(validator.is_valid(&json!({"a": "s"})));
}

#[test]
fn sibling_keywords_apply_next_to_ref_since_2019() {
    let schema = json!({
        "$schema": "https://json-schema.org/draft/2019-09/schema",
        "properties": {
            "a": {
                "$ref": "#/$defs/num",
                "minimum": 1000
            }
        },
        "$defs": {
            "num": {"type": "number"}
        }
    });
    let validator = jschema::compile(&schema).unwrap();
    assert!(!validator.is_valid(&json!({"a": 1})));
    assert!(validator.is_valid(&json!({"a": 1234})));
}

#[test]
fn mixed_dialect_subschemas() {
    // The subschema switches to Draft 4, where `1.0` is not an integer
    let schema = json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "properties": {
            "strict": {
                "$ref": "#/definitions/strict-int"
            }
        },
        "definitions": {
            "strict-int": {
                "$schema": "http://json-schema.org/draft-04/schema#",
                "type": "integer"
            }
        }
    });
    let validator = jschema::compile(&schema).unwrap();
    assert!(validator.is_valid(&json!({"strict": 1})));
    assert!(!validator.is_valid(&json!({"strict": 1.0})));
}

#[test]
fn meta_schema_references_resolve_offline() {
    let schema = json!({
        "properties": {
            "maximum": {"$ref": "http://json-schema.org/draft-04/schema#/properties/maximum"}
        }
    });
    let validator = jschema::compile(&schema).unwrap();
    assert!(validator.is_valid(&json!({"maximum": 3})));
    assert!(!validator.is_valid(&json!({"maximum": "3"})));
}

#[test_case::test_case(Draft::Draft4)]
#[test_case::test_case(Draft::Draft6)]
#[test_case::test_case(Draft::Draft7)]
#[test_case::test_case(Draft::Draft201909)]
#[test_case::test_case(Draft::Draft202012)]
fn meta_schemas_compile(draft: Draft) {
    // Each bundled meta-schema must compile with its own dialect
    let uri = match draft {
        Draft::Draft4 => "http://json-schema.org/draft-04/schema",
        Draft::Draft6 => "http://json-schema.org/draft-06/schema",
        Draft::Draft7 => "http://json-schema.org/draft-07/schema",
        Draft::Draft201909 => "https://json-schema.org/draft/2019-09/schema",
        _ => "https://json-schema.org/draft/2020-12/schema",
    };
    let schema = json!({"$ref": uri});
    let validator = jschema::compile(&schema).unwrap();
    // Every meta-schema accepts the empty schema and rejects a non-schema
    assert!(validator.is_valid(&json!({})));
    assert!(!validator.is_valid(&json!(42)));
}

#[test]
fn unresolved_local_pointer() {
    let schema = json!({"$ref": "#/definitions/missing"});
    assert!(matches!(
        jschema::compile(&schema),
        Err(jschema::SchemaError::UnresolvedReference { .. })
    ));
}
