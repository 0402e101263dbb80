//! The "basic" output format.
use serde_json::json;

#[test]
fn annotations_on_valid_instances() {
    let schema = json!({
        "title": "string value",
        "type": "string"
    });
    let instance = json!("some string");
    let validator = jschema::compile(&schema).unwrap();
    let output = validator.apply(&instance).basic();
    assert_eq!(
        serde_json::to_value(output).unwrap(),
        json!({
            "valid": true,
            "annotations": [
                {
                    "keywordLocation": "",
                    "instanceLocation": "",
                    "annotations": {
                        "title": "string value"
                    }
                }
            ]
        })
    );
}

#[test]
fn errors_on_invalid_instances() {
    let schema = json!({
        "properties": {
            "count": {"type": "integer"}
        }
    });
    let instance = json!({"count": "three"});
    let validator = jschema::compile(&schema).unwrap();
    let output = serde_json::to_value(validator.apply(&instance).basic()).unwrap();
    assert_eq!(output["valid"], json!(false));
    let errors = output["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["keywordLocation"], json!("/properties/count/type"));
    assert_eq!(errors[0]["instanceLocation"], json!("/count"));
    assert_eq!(errors[0]["error"], json!("\"three\" is not of type \"integer\""));
}

#[test]
fn absolute_keyword_location_with_id() {
    let schema = json!({
        "$id": "http://example.com/schema.json",
        "properties": {
            "a": {"type": "string"}
        }
    });
    let instance = json!({"a": 1});
    let validator = jschema::compile(&schema).unwrap();
    let output = serde_json::to_value(validator.apply(&instance).basic()).unwrap();
    let errors = output["errors"].as_array().unwrap();
    assert_eq!(
        errors[0]["absoluteKeywordLocation"],
        json!("http://example.com/schema.json#/properties/a/type")
    );
}

#[test]
fn nested_annotations_are_collected() {
    let schema = json!({
        "properties": {
            "name": {"title": "Name", "type": "string"}
        }
    });
    let instance = json!({"name": "x"});
    let validator = jschema::compile(&schema).unwrap();
    let output = serde_json::to_value(validator.apply(&instance).basic()).unwrap();
    assert_eq!(output["valid"], json!(true));
    let annotations = output["annotations"].as_array().unwrap();
    assert!(annotations.iter().any(|unit| {
        unit["keywordLocation"] == json!("/properties/name")
            && unit["instanceLocation"] == json!("/name")
            && unit["annotations"] == json!({"title": "Name"})
    }));
}

#[test]
fn flag_output() {
    let schema = json!({"type": "integer"});
    let validator = jschema::compile(&schema).unwrap();
    assert!(validator.apply(&json!(1)).flag());
    assert!(!validator.apply(&json!("1")).flag());
}
