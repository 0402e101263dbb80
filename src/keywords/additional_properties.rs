//! Validator for the `additionalProperties` keyword.
//!
//! The whole purpose of this keyword is to validate properties not covered by its siblings:
//!   - `properties`
//!   - `patternProperties`
//!
//! A name is "additional" iff it is unmatched by both. When either sibling is present, a
//! combined validator takes over the validation of all three keywords so that each property is
//! dispatched exactly once.
use crate::{
    compilation::{compile_validators, context::CompilationContext},
    error::{error, no_error, ErrorIterator, ValidationError},
    keywords::CompilationResult,
    output::BasicOutput,
    paths::{InstancePath, JSONPointer},
    patch::PatchOperation,
    properties::{compile_patterns, compile_properties, get_validator, PatternedValidators, PropertiesMap},
    schema_node::SchemaNode,
    validator::{PartialApplication, Validate},
};
use serde_json::{Map, Value};

/// `additionalProperties` as a schema, without `properties` / `patternProperties` siblings:
/// every property is validated against it.
pub(crate) struct AdditionalPropertiesValidator {
    node: SchemaNode,
}

impl Validate for AdditionalPropertiesValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Object(item) = instance {
            item.values().all(|value| self.node.is_valid(value))
        } else {
            true
        }
    }

    fn validate<'instance>(
        &self,
        instance: &'instance Value,
        instance_path: &InstancePath,
    ) -> ErrorIterator<'instance> {
        if let Value::Object(item) = instance {
            let errors: Vec<_> = item
                .iter()
                .flat_map(|(name, value)| {
                    let property_path = instance_path.push(name.as_str());
                    self.node.validate(value, &property_path).collect::<Vec<_>>()
                })
                .collect();
            Box::new(errors.into_iter())
        } else {
            no_error()
        }
    }

    fn apply<'a>(
        &'a self,
        instance: &Value,
        instance_path: &InstancePath,
    ) -> PartialApplication<'a> {
        if let Value::Object(item) = instance {
            let mut output = BasicOutput::default();
            for (name, value) in item {
                let property_path = instance_path.push(name.as_str());
                output += self.node.apply_rooted(value, &property_path);
            }
            output.into()
        } else {
            PartialApplication::valid_empty()
        }
    }

    fn collect_defaults(
        &self,
        instance: &Value,
        instance_path: &InstancePath,
        patch: &mut Vec<PatchOperation>,
    ) {
        if let Value::Object(item) = instance {
            for (name, value) in item {
                let property_path = instance_path.push(name.as_str());
                self.node.collect_defaults(value, &property_path, patch);
            }
        }
    }
}

impl core::fmt::Display for AdditionalPropertiesValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "additionalProperties: {}", self.node)
    }
}

/// `additionalProperties: false` without siblings: no properties are allowed at all.
pub(crate) struct AdditionalPropertiesFalseValidator {
    schema_path: JSONPointer,
}

impl Validate for AdditionalPropertiesFalseValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Object(item) = instance {
            item.is_empty()
        } else {
            true
        }
    }

    fn validate<'instance>(
        &self,
        instance: &'instance Value,
        instance_path: &InstancePath,
    ) -> ErrorIterator<'instance> {
        if let Value::Object(item) = instance {
            if !item.is_empty() {
                return error(ValidationError::additional_properties(
                    self.schema_path.clone(),
                    instance_path.into(),
                    instance,
                    item.keys().cloned().collect(),
                ));
            }
        }
        no_error()
    }
}

impl core::fmt::Display for AdditionalPropertiesFalseValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("additionalProperties: false")
    }
}

enum AdditionalBehavior {
    Forbidden,
    Schema(SchemaNode),
}

/// The combined form: dispatches every property to `properties`, then `patternProperties`,
/// then the `additionalProperties` behavior.
pub(crate) struct AdditionalPropertiesCombinedValidator {
    properties: PropertiesMap,
    defaults: Vec<(String, Value)>,
    patterns: PatternedValidators,
    additional: AdditionalBehavior,
    schema_path: JSONPointer,
}

impl AdditionalPropertiesCombinedValidator {
    fn dispatch<'a>(&'a self, name: &str) -> (Option<&'a SchemaNode>, Vec<&'a SchemaNode>) {
        let property = get_validator(&self.properties, name);
        let patterns: Vec<&SchemaNode> = self
            .patterns
            .iter()
            .filter(|(re, _)| re.is_match(name).unwrap_or(false))
            .map(|(_, node)| node)
            .collect();
        (property, patterns)
    }
}

impl Validate for AdditionalPropertiesCombinedValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Object(item) = instance {
            for (name, value) in item {
                let (property, patterns) = self.dispatch(name);
                if let Some(node) = property {
                    if !node.is_valid(value) {
                        return false;
                    }
                }
                if !patterns.iter().all(|node| node.is_valid(value)) {
                    return false;
                }
                if property.is_none() && patterns.is_empty() {
                    match &self.additional {
                        AdditionalBehavior::Forbidden => return false,
                        AdditionalBehavior::Schema(node) => {
                            if !node.is_valid(value) {
                                return false;
                            }
                        }
                    }
                }
            }
        }
        true
    }

    fn validate<'instance>(
        &self,
        instance: &'instance Value,
        instance_path: &InstancePath,
    ) -> ErrorIterator<'instance> {
        if let Value::Object(item) = instance {
            let mut errors = vec![];
            let mut unexpected = vec![];
            for (name, value) in item {
                let property_path = instance_path.push(name.as_str());
                let (property, patterns) = self.dispatch(name);
                if let Some(node) = property {
                    errors.extend(node.validate(value, &property_path));
                }
                for node in &patterns {
                    errors.extend(node.validate(value, &property_path));
                }
                if property.is_none() && patterns.is_empty() {
                    match &self.additional {
                        AdditionalBehavior::Forbidden => unexpected.push(name.clone()),
                        AdditionalBehavior::Schema(node) => {
                            errors.extend(node.validate(value, &property_path));
                        }
                    }
                }
            }
            if !unexpected.is_empty() {
                errors.push(ValidationError::additional_properties(
                    self.schema_path.clone(),
                    instance_path.into(),
                    instance,
                    unexpected,
                ));
            }
            Box::new(errors.into_iter())
        } else {
            no_error()
        }
    }

    fn apply<'a>(
        &'a self,
        instance: &Value,
        instance_path: &InstancePath,
    ) -> PartialApplication<'a> {
        if let Value::Object(item) = instance {
            let mut output = BasicOutput::default();
            let mut unexpected = vec![];
            for (name, value) in item {
                let property_path = instance_path.push(name.as_str());
                let (property, patterns) = self.dispatch(name);
                if let Some(node) = property {
                    output += node.apply_rooted(value, &property_path);
                }
                for node in &patterns {
                    output += node.apply_rooted(value, &property_path);
                }
                if property.is_none() && patterns.is_empty() {
                    match &self.additional {
                        AdditionalBehavior::Forbidden => unexpected.push(name.clone()),
                        AdditionalBehavior::Schema(node) => {
                            output += node.apply_rooted(value, &property_path);
                        }
                    }
                }
            }
            let mut result: PartialApplication = output.into();
            if !unexpected.is_empty() {
                result.mark_errored(
                    ValidationError::additional_properties(
                        self.schema_path.clone(),
                        instance_path.into(),
                        instance,
                        unexpected,
                    )
                    .into(),
                );
            }
            result
        } else {
            PartialApplication::valid_empty()
        }
    }

    fn collect_defaults(
        &self,
        instance: &Value,
        instance_path: &InstancePath,
        patch: &mut Vec<PatchOperation>,
    ) {
        if let Value::Object(item) = instance {
            for (name, default) in &self.defaults {
                if !item.contains_key(name) {
                    let property_path = instance_path.push(name.as_str());
                    patch.push(PatchOperation::add(
                        (&property_path).into(),
                        default.clone(),
                    ));
                }
            }
            for (name, node) in &self.properties {
                if let Some(value) = item.get(name) {
                    let property_path = instance_path.push(name.as_str());
                    node.collect_defaults(value, &property_path, patch);
                }
            }
        }
    }
}

impl core::fmt::Display for AdditionalPropertiesCombinedValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.additional {
            AdditionalBehavior::Forbidden => f.write_str("additionalProperties: false"),
            AdditionalBehavior::Schema(node) => write!(f, "additionalProperties: {}", node),
        }
    }
}

#[inline]
pub(crate) fn compile(
    parent: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    match schema {
        Value::Bool(true) => None,
        Value::Bool(false) | Value::Object(_) => {
            let properties = parent.get("properties").and_then(Value::as_object);
            let patterns = parent.get("patternProperties").and_then(Value::as_object);
            if properties.is_none() && patterns.is_none() {
                return Some(compile_simple(schema, context));
            }
            Some(compile_combined(properties, patterns, schema, context))
        }
        _ => Some(Err(context.unexpected_type(
            schema,
            crate::primitive_type::PrimitiveType::Object,
        ))),
    }
}

fn compile_simple(schema: &Value, context: &CompilationContext) -> CompilationResult {
    match schema {
        Value::Bool(false) => Ok(Box::new(AdditionalPropertiesFalseValidator {
            schema_path: context.as_pointer_with("additionalProperties"),
        })),
        _ => {
            let keyword_context = context.with_path("additionalProperties");
            Ok(Box::new(AdditionalPropertiesValidator {
                node: compile_validators(schema, &keyword_context)?,
            }))
        }
    }
}

fn compile_combined(
    properties: Option<&Map<String, Value>>,
    patterns: Option<&Map<String, Value>>,
    schema: &Value,
    context: &CompilationContext,
) -> CompilationResult {
    let compiled_properties = match properties {
        Some(map) => compile_properties(map, context)?,
        None => Vec::new(),
    };
    let defaults = match properties {
        Some(map) => super::properties::collect_declared_defaults(map, context),
        None => Vec::new(),
    };
    let compiled_patterns = match patterns {
        Some(map) => compile_patterns(map, context)?,
        None => Vec::new(),
    };
    let additional = match schema {
        Value::Bool(false) => AdditionalBehavior::Forbidden,
        _ => {
            let keyword_context = context.with_path("additionalProperties");
            AdditionalBehavior::Schema(compile_validators(schema, &keyword_context)?)
        }
    };
    Ok(Box::new(AdditionalPropertiesCombinedValidator {
        properties: compiled_properties,
        defaults,
        patterns: compiled_patterns,
        additional,
        schema_path: context.as_pointer_with("additionalProperties"),
    }))
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"additionalProperties": {"type": "string"}}), &json!({"a": "x"}))]
    #[test_case(&json!({"additionalProperties": false}), &json!({}))]
    #[test_case(&json!({"properties": {"foo": {}}, "additionalProperties": false}), &json!({"foo": 1}))]
    #[test_case(&json!({"patternProperties": {"^f": {}}, "additionalProperties": false}), &json!({"foo": 1}))]
    #[test_case(&json!({"properties": {"foo": {}}, "patternProperties": {"^v": {}}, "additionalProperties": false}), &json!({"foo": 1, "vroom": 2}))]
    fn is_valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    #[test_case(&json!({"additionalProperties": {"type": "string"}}), &json!({"a": 1}))]
    #[test_case(&json!({"additionalProperties": false}), &json!({"a": 1}))]
    #[test_case(&json!({"properties": {"foo": {}}, "additionalProperties": false}), &json!({"foo": 1, "bar": 2}))]
    #[test_case(&json!({"properties": {"foo": {"type": "integer"}}, "additionalProperties": true}), &json!({"foo": "nope"}))]
    fn is_not_valid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid(schema, instance);
    }

    #[test]
    fn schema_path() {
        tests_util::assert_schema_path(
            &json!({"properties": {"foo": {}}, "additionalProperties": false}),
            &json!({"foo": 1, "bar": 2}),
            "/additionalProperties",
        );
    }

    #[test]
    fn pattern_matched_properties_are_not_additional() {
        let schema = json!({
            "patternProperties": {"^x-": {"type": "integer"}},
            "additionalProperties": false
        });
        tests_util::is_valid(&schema, &json!({"x-rate": 10}));
        tests_util::is_not_valid(&schema, &json!({"x-rate": "nope"}));
        tests_util::is_not_valid(&schema, &json!({"rate": 10}));
    }
}
