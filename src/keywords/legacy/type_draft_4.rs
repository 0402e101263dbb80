//! Draft 4: a float with a zero fractional part is *not* an integer.
use crate::{
    compilation::context::CompilationContext,
    error::{error, no_error, ErrorIterator, ValidationError},
    keywords::{type_, CompilationResult},
    paths::{InstancePath, JSONPointer},
    primitive_type::{PrimitiveType, PrimitiveTypesBitMap},
    validator::Validate,
};
use serde_json::{Map, Value};
use std::convert::TryFrom;

pub(crate) struct IntegerTypeValidator {
    schema_path: JSONPointer,
}

impl Validate for IntegerTypeValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Number(number) = instance {
            number.is_u64() || number.is_i64()
        } else {
            false
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
            error(ValidationError::single_type_error(
                self.schema_path.clone(),
                instance_path.into(),
                instance,
                PrimitiveType::Integer,
            ))
        }
    }
}

impl core::fmt::Display for IntegerTypeValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("type: integer")
    }
}

pub(crate) struct MultipleTypesValidator {
    types: PrimitiveTypesBitMap,
    schema_path: JSONPointer,
}

impl Validate for MultipleTypesValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        match instance {
            Value::Array(_) => self.types.contains_type(PrimitiveType::Array),
            Value::Bool(_) => self.types.contains_type(PrimitiveType::Boolean),
            Value::Null => self.types.contains_type(PrimitiveType::Null),
            Value::Number(number) => {
                self.types.contains_type(PrimitiveType::Number)
                    || (self.types.contains_type(PrimitiveType::Integer)
                        && (number.is_u64() || number.is_i64()))
            }
            Value::Object(_) => self.types.contains_type(PrimitiveType::Object),
            Value::String(_) => self.types.contains_type(PrimitiveType::String),
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
            error(ValidationError::multiple_type_error(
                self.schema_path.clone(),
                instance_path.into(),
                instance,
                self.types,
            ))
        }
    }
}

impl core::fmt::Display for MultipleTypesValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "type: [{}]",
            self.types
                .into_iter()
                .map(|type_| type_.to_string())
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
    match schema {
        Value::String(item) if item == "integer" => Some(Ok(Box::new(IntegerTypeValidator {
            schema_path: context.as_pointer_with("type"),
        }))),
        Value::Array(items) => {
            let mut types = PrimitiveTypesBitMap::new();
            for item in items {
                if let Value::String(string) = item {
                    if let Ok(primitive_type) = PrimitiveType::try_from(string.as_str()) {
                        types |= primitive_type;
                    } else {
                        return Some(Err(
                            context.unexpected_type(item, PrimitiveType::String)
                        ));
                    }
                } else {
                    return Some(Err(context.unexpected_type(item, PrimitiveType::String)));
                }
            }
            if types.contains_type(PrimitiveType::Integer) {
                Some(Ok(Box::new(MultipleTypesValidator {
                    types,
                    schema_path: context.as_pointer_with("type"),
                })))
            } else {
                // No integer strictness involved, the common validator applies
                type_::compile(parent, schema, context)
            }
        }
        _ => type_::compile(parent, schema, context),
    }
}

#[cfg(test)]
mod tests {
    use crate::{tests_util, Draft};
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"type": "integer"}), &json!(1))]
    #[test_case(&json!({"type": ["integer", "string"]}), &json!("a"))]
    fn is_valid(schema: &Value, instance: &Value) {
        tests_util::is_valid_with_draft(Draft::Draft4, schema, instance);
    }

    #[test_case(&json!({"type": "integer"}), &json!(1.0); "a float is not a Draft 4 integer")]
    #[test_case(&json!({"type": ["integer", "string"]}), &json!(1.0))]
    fn is_not_valid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid_with_draft(Draft::Draft4, schema, instance);
    }
}
