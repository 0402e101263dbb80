use crate::{
    compilation::context::CompilationContext,
    error::{no_error, ErrorIterator},
    keywords::CompilationResult,
    output::BasicOutput,
    paths::InstancePath,
    primitive_type::PrimitiveType,
    properties::{compile_patterns, PatternedValidators},
    validator::{PartialApplication, Validate},
};
use serde_json::{Map, Value};

pub(crate) struct PatternPropertiesValidator {
    patterns: PatternedValidators,
}

impl PatternPropertiesValidator {
    #[inline]
    pub(crate) fn compile(
        map: &Map<String, Value>,
        context: &CompilationContext,
    ) -> CompilationResult {
        Ok(Box::new(PatternPropertiesValidator {
            patterns: compile_patterns(map, context)?,
        }))
    }
}

impl Validate for PatternPropertiesValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Object(item) = instance {
            self.patterns.iter().all(|(re, node)| {
                item.iter()
                    .filter(|(key, _)| re.is_match(key).unwrap_or(false))
                    .all(|(_, value)| node.is_valid(value))
            })
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
            let errors: Vec<_> = self
                .patterns
                .iter()
                .flat_map(|(re, node)| {
                    item.iter()
                        .filter(|(key, _)| re.is_match(key).unwrap_or(false))
                        .flat_map(|(key, value)| {
                            let property_path = instance_path.push(key.as_str());
                            node.validate(value, &property_path).collect::<Vec<_>>()
                        })
                        .collect::<Vec<_>>()
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
            for (re, node) in &self.patterns {
                for (key, value) in item
                    .iter()
                    .filter(|(key, _)| re.is_match(key).unwrap_or(false))
                {
                    let property_path = instance_path.push(key.as_str());
                    output += node.apply_rooted(value, &property_path);
                }
            }
            output.into()
        } else {
            PartialApplication::valid_empty()
        }
    }
}

impl core::fmt::Display for PatternPropertiesValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "patternProperties: {{{}}}",
            self.patterns
                .iter()
                .map(|(pattern, node)| format!("{}: {}", pattern, node))
                .collect::<Vec<String>>()
                .join(", ")
        )
    }
}

#[inline]
pub(crate) fn compile(
    parent: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    match parent.get("additionalProperties") {
        // The combined `additionalProperties` validator handles the `patternProperties` logic
        Some(Value::Bool(false)) | Some(Value::Object(_)) => None,
        _ => match schema {
            Value::Object(map) => Some(PatternPropertiesValidator::compile(map, context)),
            _ => Some(Err(context.unexpected_type(schema, PrimitiveType::Object))),
        },
    }
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"patternProperties": {"^f": {"type": "integer"}}}), &json!({"foo": 1, "bar": "x"}))]
    fn is_valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    #[test_case(&json!({"patternProperties": {"^f": {"type": "integer"}}}), &json!({"foo": "nope"}))]
    fn is_not_valid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid(schema, instance);
    }

    #[test]
    fn schema_path() {
        tests_util::assert_schema_path(
            &json!({"patternProperties": {"^f": {"type": "integer"}}}),
            &json!({"foo": "nope"}),
            "/patternProperties/^f/type",
        );
    }
}
