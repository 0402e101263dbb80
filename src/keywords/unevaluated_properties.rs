//! Validator for the `unevaluatedProperties` keyword.
//!
//! In contrast to `additionalProperties`, which only sees its `properties` /
//! `patternProperties` siblings, `unevaluatedProperties` "sees through" applicators
//! (`allOf`, `anyOf`, `oneOf`), conditionals (`if`/`then`/`else`), `dependentSchemas` and
//! references. A property is evaluated iff some sibling that successfully applied claims it;
//! the keyword's subschema applies to the complement.
use crate::{
    compilation::{compile_validators, context::CompilationContext},
    error::{no_error, ErrorIterator, SchemaError, ValidationError},
    keywords::CompilationResult,
    paths::{InstancePath, JSONPointer},
    properties::{compile_patterns, compile_properties, get_validator, PatternedValidators, PropertiesMap},
    schema_node::SchemaNode,
    validator::Validate,
};
use ahash::AHashSet;
use serde_json::{Map, Value};

enum UnevaluatedBehavior {
    /// `unevaluatedProperties: false`
    Deny,
    /// Unevaluated properties are allowed if they are valid against the given schema
    IfValid(SchemaNode),
}

pub(crate) struct UnevaluatedPropertiesValidator {
    schema_path: JSONPointer,
    unevaluated: UnevaluatedBehavior,
    properties: Option<PropertiesMap>,
    patterns: Option<PatternedValidators>,
    additional: Option<SchemaNode>,
    conditional: Option<Box<ConditionalSubvalidator>>,
    dependent: Vec<(String, SchemaNode, UnevaluatedPropertiesValidator)>,
    reference: Option<Box<UnevaluatedPropertiesValidator>>,
    subschemas: Vec<(SchemaNode, UnevaluatedPropertiesValidator)>,
}

/// `if`/`then`/`else` evaluate properties depending on the outcome of the condition.
struct ConditionalSubvalidator {
    condition: SchemaNode,
    in_if: Option<UnevaluatedPropertiesValidator>,
    success: Option<UnevaluatedPropertiesValidator>,
    failure: Option<UnevaluatedPropertiesValidator>,
}

fn get_unevaluated_props_schema(parent: &Map<String, Value>) -> &Value {
    parent
        .get("unevaluatedProperties")
        .unwrap_or(&Value::Bool(false))
}

impl UnevaluatedPropertiesValidator {
    fn compile(
        parent: &Map<String, Value>,
        schema: &Value,
        context: &CompilationContext,
        seen: &mut AHashSet<String>,
    ) -> Result<Self, SchemaError> {
        let unevaluated = match schema {
            Value::Bool(false) => UnevaluatedBehavior::Deny,
            _ => UnevaluatedBehavior::IfValid(compile_validators(
                schema,
                &context.with_path("unevaluatedProperties"),
            )?),
        };

        let properties = parent
            .get("properties")
            .and_then(Value::as_object)
            .map(|map| compile_properties(map, context))
            .transpose()?;
        let patterns = parent
            .get("patternProperties")
            .and_then(Value::as_object)
            .map(|map| compile_patterns(map, context))
            .transpose()?;
        let additional = match parent.get("additionalProperties") {
            Some(Value::Object(_) | Value::Bool(_)) => Some(compile_validators(
                parent.get("additionalProperties").expect("Is present"),
                &context.with_path("additionalProperties"),
            )?),
            _ => None,
        };

        let conditional = parent
            .get("if")
            .map(|condition| {
                ConditionalSubvalidator::compile(
                    condition,
                    parent.get("then"),
                    parent.get("else"),
                    context,
                    seen,
                )
                .map(Box::new)
            })
            .transpose()?;

        let mut dependent = Vec::new();
        if let Some(Value::Object(schemas)) = parent.get("dependentSchemas") {
            for (property, dependent_schema) in schemas {
                if let Value::Object(dependent_object) = dependent_schema {
                    let node = compile_validators(
                        dependent_schema,
                        &context.with_path("dependentSchemas"),
                    )?;
                    let subvalidator = UnevaluatedPropertiesValidator::compile(
                        dependent_object,
                        get_unevaluated_props_schema(dependent_object),
                        context,
                        seen,
                    )?;
                    dependent.push((property.clone(), node, subvalidator));
                }
            }
        }

        let mut reference = None;
        if let Some(Value::String(ref_string)) = parent.get("$ref") {
            if let Ok(resolved) = context.registry.resolve(
                &context.scope,
                ref_string,
                &context.absolute_location(),
            ) {
                let identity = context.build_url(ref_string)?.to_string();
                // A repeated target would recurse forever; it claims nothing instead
                if seen.insert(identity.clone()) {
                    if let Value::Object(target) = &*resolved.contents {
                        let reference_context = context.in_resolved(&resolved, "$ref");
                        reference = Some(Box::new(UnevaluatedPropertiesValidator::compile(
                            target,
                            get_unevaluated_props_schema(target),
                            &reference_context,
                            seen,
                        )?));
                    }
                    seen.remove(&identity);
                }
            }
        }

        let mut subschemas = Vec::new();
        for keyword in ["allOf", "anyOf", "oneOf"] {
            if let Some(Value::Array(branches)) = parent.get(keyword) {
                for branch in branches {
                    if let Value::Object(branch_object) = branch {
                        let node =
                            compile_validators(branch, &context.with_path(keyword))?;
                        let subvalidator = UnevaluatedPropertiesValidator::compile(
                            branch_object,
                            get_unevaluated_props_schema(branch_object),
                            context,
                            seen,
                        )?;
                        subschemas.push((node, subvalidator));
                    }
                }
            }
        }

        Ok(Self {
            schema_path: context.as_pointer_with("unevaluatedProperties"),
            unevaluated,
            properties,
            patterns,
            additional,
            conditional,
            dependent,
            reference,
            subschemas,
        })
    }

    /// Whether some sibling that successfully applied evaluates the property.
    fn claims(&self, instance: &Value, property_instance: &Value, property_name: &str) -> bool {
        if let Some(properties) = &self.properties {
            if get_validator(properties, property_name).is_some() {
                return true;
            }
        }
        if let Some(patterns) = &self.patterns {
            if patterns
                .iter()
                .any(|(re, _)| re.is_match(property_name).unwrap_or(false))
            {
                return true;
            }
        }
        if self.additional.is_some() {
            return true;
        }
        if let Some(conditional) = &self.conditional {
            if conditional.claims(instance, property_instance, property_name) {
                return true;
            }
        }
        for (trigger, node, subvalidator) in &self.dependent {
            if instance.get(trigger).is_some()
                && node.is_valid(instance)
                && subvalidator.claims(instance, property_instance, property_name)
            {
                return true;
            }
        }
        if let Some(reference) = &self.reference {
            if reference.claims(instance, property_instance, property_name) {
                return true;
            }
        }
        // A failing applicator branch contributes no evaluated properties
        self.subschemas.iter().any(|(node, subvalidator)| {
            node.is_valid(instance)
                && subvalidator.claims(instance, property_instance, property_name)
        })
    }

    /// Whether the property is either claimed by a sibling or allowed by the
    /// `unevaluatedProperties` schema itself.
    fn is_property_allowed(
        &self,
        instance: &Value,
        property_instance: &Value,
        property_name: &str,
    ) -> bool {
        if self.claims(instance, property_instance, property_name) {
            return true;
        }
        match &self.unevaluated {
            UnevaluatedBehavior::Deny => false,
            UnevaluatedBehavior::IfValid(node) => node.is_valid(property_instance),
        }
    }
}

impl ConditionalSubvalidator {
    fn compile(
        condition: &Value,
        success: Option<&Value>,
        failure: Option<&Value>,
        context: &CompilationContext,
        seen: &mut AHashSet<String>,
    ) -> Result<Self, SchemaError> {
        let node = compile_validators(condition, &context.with_path("if"))?;
        let in_if = condition
            .as_object()
            .map(|object| {
                UnevaluatedPropertiesValidator::compile(
                    object,
                    get_unevaluated_props_schema(object),
                    context,
                    seen,
                )
            })
            .transpose()?;
        let success = success
            .and_then(Value::as_object)
            .map(|object| {
                UnevaluatedPropertiesValidator::compile(
                    object,
                    get_unevaluated_props_schema(object),
                    context,
                    seen,
                )
            })
            .transpose()?;
        let failure = failure
            .and_then(Value::as_object)
            .map(|object| {
                UnevaluatedPropertiesValidator::compile(
                    object,
                    get_unevaluated_props_schema(object),
                    context,
                    seen,
                )
            })
            .transpose()?;
        Ok(ConditionalSubvalidator {
            condition: node,
            in_if,
            success,
            failure,
        })
    }

    fn claims(&self, instance: &Value, property_instance: &Value, property_name: &str) -> bool {
        if self.condition.is_valid(instance) {
            self.in_if
                .as_ref()
                .map_or(false, |sub| sub.claims(instance, property_instance, property_name))
                || self
                    .success
                    .as_ref()
                    .map_or(false, |sub| sub.claims(instance, property_instance, property_name))
        } else {
            self.failure
                .as_ref()
                .map_or(false, |sub| sub.claims(instance, property_instance, property_name))
        }
    }
}

impl Validate for UnevaluatedPropertiesValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Object(properties) = instance {
            properties
                .iter()
                .all(|(name, value)| self.is_property_allowed(instance, value, name))
        } else {
            true
        }
    }

    fn validate<'instance>(
        &self,
        instance: &'instance Value,
        instance_path: &InstancePath,
    ) -> ErrorIterator<'instance> {
        if let Value::Object(properties) = instance {
            let mut errors = vec![];
            for (name, value) in properties {
                if self.claims(instance, value, name) {
                    continue;
                }
                let property_path = instance_path.push(name.as_str());
                match &self.unevaluated {
                    UnevaluatedBehavior::Deny => {
                        errors.push(ValidationError::unevaluated_properties(
                            self.schema_path.clone(),
                            (&property_path).into(),
                            value,
                            vec![name.clone()],
                        ));
                    }
                    UnevaluatedBehavior::IfValid(node) => {
                        errors.extend(node.validate(value, &property_path));
                    }
                }
            }
            Box::new(errors.into_iter())
        } else {
            no_error()
        }
    }
}

impl core::fmt::Display for UnevaluatedPropertiesValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.unevaluated {
            UnevaluatedBehavior::Deny => f.write_str("unevaluatedProperties: false"),
            UnevaluatedBehavior::IfValid(node) => {
                write!(f, "unevaluatedProperties: {}", node)
            }
        }
    }
}

pub(crate) fn compile(
    parent: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    // Nothing to validate when `unevaluatedProperties` is `true`, which is the default
    if let Value::Bool(true) = schema {
        return None;
    }
    let mut seen = AHashSet::new();
    match UnevaluatedPropertiesValidator::compile(parent, schema, context, &mut seen) {
        Ok(compiled) => Some(Ok(Box::new(compiled))),
        Err(error) => Some(Err(error)),
    }
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(
        &json!({"properties": {"foo": {}}, "unevaluatedProperties": false}),
        &json!({"foo": 1})
    )]
    #[test_case(
        &json!({
            "properties": {"foo": {}},
            "allOf": [{"properties": {"bar": {}}}],
            "unevaluatedProperties": false
        }),
        &json!({"foo": 1, "bar": 2})
    )]
    #[test_case(
        &json!({
            "anyOf": [
                {"properties": {"foo": {"type": "integer"}}, "required": ["foo"]},
                {"properties": {"bar": {"type": "integer"}}, "required": ["bar"]}
            ],
            "unevaluatedProperties": false
        }),
        &json!({"foo": 1})
    )]
    #[test_case(
        &json!({
            "if": {"properties": {"kind": {"const": "a"}}},
            "then": {"properties": {"a": {}}},
            "else": {"properties": {"b": {}}},
            "properties": {"kind": {}},
            "unevaluatedProperties": false
        }),
        &json!({"kind": "a", "a": 1})
    )]
    #[test_case(
        &json!({
            "$ref": "#/$defs/base",
            "$defs": {"base": {"properties": {"foo": {}}}},
            "unevaluatedProperties": false
        }),
        &json!({"foo": 1})
    )]
    #[test_case(
        &json!({"unevaluatedProperties": {"type": "integer"}}),
        &json!({"anything": 1})
    )]
    fn is_valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    #[test_case(
        &json!({"properties": {"foo": {}}, "unevaluatedProperties": false}),
        &json!({"foo": 1, "bar": 2})
    )]
    #[test_case(
        &json!({
            "properties": {"foo": {}},
            "allOf": [{"properties": {"bar": {}}}],
            "unevaluatedProperties": false
        }),
        &json!({"foo": 1, "bar": 2, "baz": 3})
    )]
    #[test_case(
        &json!({
            "anyOf": [
                {"properties": {"foo": {"type": "integer"}}, "required": ["foo"]}
            ],
            "unevaluatedProperties": false
        }),
        &json!({"foo": "not an integer", "bar": 2}); "a failing branch claims nothing"
    )]
    #[test_case(
        &json!({"unevaluatedProperties": {"type": "integer"}}),
        &json!({"anything": "nope"})
    )]
    fn is_not_valid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid(schema, instance);
    }

    #[test]
    fn error_is_reported_at_the_property() {
        let schema = json!({
            "properties": {"foo": {}},
            "allOf": [{"properties": {"bar": {}}}],
            "unevaluatedProperties": false
        });
        let instance = json!({"foo": 1, "bar": 2, "baz": 3});
        let validator = crate::compile(&schema).unwrap();
        let errors: Vec<_> = validator
            .validate(&instance)
            .expect_err("Should fail")
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].instance_path.to_string(), "/baz");
        assert_eq!(
            errors[0].to_string(),
            "Unevaluated properties are not allowed ('baz' was unexpected)"
        );
    }
}
