use crate::{
    compilation::context::CompilationContext,
    error::{error, no_error, ErrorIterator, SchemaError, ValidationError},
    keywords::CompilationResult,
    paths::{InstancePath, JSONPointer},
    primitive_type::PrimitiveType,
    validator::Validate,
};
use fraction::{BigFraction, Zero};
use serde_json::{Map, Value};

pub(crate) struct MultipleOfIntegerValidator {
    multiple_of: f64,
    schema_path: JSONPointer,
}

impl Validate for MultipleOfIntegerValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Number(item) = instance {
            let item = item.as_f64().expect("Always valid");
            // As the divisor has its fractional part as zero, then any value with a
            // non-zero fractional part can't be a multiple of it
            if item.fract() == 0. {
                (item % self.multiple_of) == 0.
            } else {
                false
            }
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
            error(ValidationError::multiple_of(
                self.schema_path.clone(),
                instance_path.into(),
                instance,
                self.multiple_of,
            ))
        }
    }
}

impl core::fmt::Display for MultipleOfIntegerValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "multipleOf: {}", self.multiple_of)
    }
}

pub(crate) struct MultipleOfFloatValidator {
    multiple_of: f64,
    schema_path: JSONPointer,
}

impl Validate for MultipleOfFloatValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Number(item) = instance {
            let item = item.as_f64().expect("Always valid");
            // Float division is not exact enough here; exact fractions avoid false
            // negatives like `19.99 % 0.01`
            let remainder = BigFraction::from(item) % BigFraction::from(self.multiple_of);
            remainder.is_zero()
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
            error(ValidationError::multiple_of(
                self.schema_path.clone(),
                instance_path.into(),
                instance,
                self.multiple_of,
            ))
        }
    }
}

impl core::fmt::Display for MultipleOfFloatValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "multipleOf: {}", self.multiple_of)
    }
}

#[inline]
pub(crate) fn compile(
    _: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    if let Value::Number(multiple_of) = schema {
        let multiple_of = multiple_of.as_f64().expect("Always valid");
        if multiple_of <= 0. {
            return Some(Err(SchemaError::NonPositiveMultipleOf {
                location: context.absolute_location(),
            }));
        }
        let schema_path = context.as_pointer_with("multipleOf");
        if multiple_of.fract() == 0. {
            Some(Ok(Box::new(MultipleOfIntegerValidator {
                multiple_of,
                schema_path,
            })))
        } else {
            Some(Ok(Box::new(MultipleOfFloatValidator {
                multiple_of,
                schema_path,
            })))
        }
    } else {
        Some(Err(context.unexpected_type(schema, PrimitiveType::Number)))
    }
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"multipleOf": 2}), &json!(4))]
    #[test_case(&json!({"multipleOf": 2}), &json!(4.0))]
    #[test_case(&json!({"multipleOf": 2.5}), &json!(7.5))]
    #[test_case(&json!({"multipleOf": 0.01}), &json!(19.99))]
    #[test_case(&json!({"multipleOf": 0.0001}), &json!(0.0075))]
    #[test_case(&json!({"multipleOf": 2}), &json!("not a number"))]
    fn is_valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    #[test_case(&json!({"multipleOf": 2}), &json!(7))]
    #[test_case(&json!({"multipleOf": 2}), &json!(3.0))]
    #[test_case(&json!({"multipleOf": 2}), &json!(4.5))]
    #[test_case(&json!({"multipleOf": 0.3}), &json!(1.0))]
    fn is_not_valid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid(schema, instance);
    }

    #[test_case(&json!({"multipleOf": 0}))]
    #[test_case(&json!({"multipleOf": -2}))]
    fn non_positive_divisor_is_rejected(schema: &Value) {
        assert!(matches!(
            crate::compile(schema),
            Err(crate::SchemaError::NonPositiveMultipleOf { .. })
        ));
    }

    #[test_case(&json!({"multipleOf": 3}), &json!(5), "/multipleOf")]
    fn schema_path(schema: &Value, instance: &Value, expected: &str) {
        tests_util::assert_schema_path(schema, instance, expected);
    }
}
