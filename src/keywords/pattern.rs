use crate::{
    compilation::context::CompilationContext,
    error::{error, no_error, ErrorIterator, SchemaError, ValidationError},
    keywords::CompilationResult,
    paths::{InstancePath, JSONPointer},
    primitive_type::PrimitiveType,
    validator::Validate,
};
use fancy_regex::Regex;
use serde_json::{Map, Value};

pub(crate) struct PatternValidator {
    original: String,
    pattern: Regex,
    schema_path: JSONPointer,
}

impl PatternValidator {
    #[inline]
    pub(crate) fn compile(
        pattern: &str,
        context: &CompilationContext,
    ) -> CompilationResult {
        match Regex::new(pattern) {
            Ok(compiled) => Ok(Box::new(PatternValidator {
                original: pattern.to_string(),
                pattern: compiled,
                schema_path: context.as_pointer_with("pattern"),
            })),
            Err(_) => Err(SchemaError::InvalidRegex {
                pattern: pattern.to_string(),
                location: context.absolute_location(),
            }),
        }
    }
}

impl Validate for PatternValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::String(item) = instance {
            // A matching error is treated as a non-match rather than a panic
            self.pattern.is_match(item).unwrap_or(false)
        } else {
            true
        }
    }

    fn validate<'instance>(
        &self,
        instance: &'instance Value,
        instance_path: &InstancePath,
    ) -> ErrorIterator<'instance> {
        if self.is_valid(instance) {
            no_error()
        } else {
            error(ValidationError::pattern(
                self.schema_path.clone(),
                instance_path.into(),
                instance,
                self.original.clone(),
            ))
        }
    }
}

impl core::fmt::Display for PatternValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pattern: {}", self.original)
    }
}

#[inline]
pub(crate) fn compile(
    _: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    match schema {
        Value::String(item) => Some(PatternValidator::compile(item, context)),
        _ => Some(Err(context.unexpected_type(schema, PrimitiveType::String))),
    }
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"pattern": "^a*$"}), &json!("aaa"))]
    // Patterns are not anchored
    #[test_case(&json!({"pattern": "a+"}), &json!("xaay"))]
    // Look-around, which the ECMA 262 dialect allows
    #[test_case(&json!({"pattern": "^(?!foo)"}), &json!("bar"))]
    fn is_valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    #[test_case(&json!({"pattern": "^a*$"}), &json!("abc"))]
    fn is_not_valid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid(schema, instance);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(matches!(
            crate::compile(&json!({"pattern": "("})),
            Err(crate::SchemaError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn schema_path() {
        tests_util::assert_schema_path(&json!({"pattern": "^a*$"}), &json!("b"), "/pattern");
    }
}
