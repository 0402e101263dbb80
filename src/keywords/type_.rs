use crate::{
    compilation::context::CompilationContext,
    error::{error, no_error, ErrorIterator, ValidationError},
    keywords::CompilationResult,
    paths::{InstancePath, JSONPointer},
    primitive_type::{PrimitiveType, PrimitiveTypesBitMap},
    validator::Validate,
};
use serde_json::{Map, Number, Value};
use std::convert::TryFrom;

pub(crate) struct MultipleTypesValidator {
    types: PrimitiveTypesBitMap,
    schema_path: JSONPointer,
}

impl MultipleTypesValidator {
    #[inline]
    pub(crate) fn compile(items: &[Value], context: &CompilationContext) -> CompilationResult {
        let mut types = PrimitiveTypesBitMap::new();
        for item in items {
            match item {
                Value::String(string) => {
                    if let Ok(primitive_type) = PrimitiveType::try_from(string.as_str()) {
                        types |= primitive_type;
                    } else {
                        return Err(context.unexpected_type(item, PrimitiveType::String));
                    }
                }
                _ => return Err(context.unexpected_type(item, PrimitiveType::String)),
            }
        }
        Ok(Box::new(MultipleTypesValidator {
            types,
            schema_path: context.as_pointer_with("type"),
        }))
    }
}

impl Validate for MultipleTypesValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        match instance {
            Value::Array(_) => self.types.contains_type(PrimitiveType::Array),
            Value::Bool(_) => self.types.contains_type(PrimitiveType::Boolean),
            Value::Null => self.types.contains_type(PrimitiveType::Null),
            Value::Number(number) => {
                self.types.contains_type(PrimitiveType::Number)
                    || (self.types.contains_type(PrimitiveType::Integer) && is_integer(number))
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

macro_rules! single_type_validator {
    ($validator:ident, $primitive_type:expr, $pattern:pat) => {
        pub(crate) struct $validator {
            schema_path: JSONPointer,
        }

        impl $validator {
            #[inline]
            pub(crate) fn compile(context: &CompilationContext) -> CompilationResult {
                Ok(Box::new($validator {
                    schema_path: context.as_pointer_with("type"),
                }))
            }
        }

        impl Validate for $validator {
            fn is_valid(&self, instance: &Value) -> bool {
                matches!(instance, $pattern)
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
                        $primitive_type,
                    ))
                }
            }
        }

        impl core::fmt::Display for $validator {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "type: {}", $primitive_type)
            }
        }
    };
}

single_type_validator!(ArrayTypeValidator, PrimitiveType::Array, Value::Array(_));
single_type_validator!(
    BooleanTypeValidator,
    PrimitiveType::Boolean,
    Value::Bool(_)
);
single_type_validator!(NullTypeValidator, PrimitiveType::Null, Value::Null);
single_type_validator!(NumberTypeValidator, PrimitiveType::Number, Value::Number(_));
single_type_validator!(ObjectTypeValidator, PrimitiveType::Object, Value::Object(_));
single_type_validator!(StringTypeValidator, PrimitiveType::String, Value::String(_));

pub(crate) struct IntegerTypeValidator {
    schema_path: JSONPointer,
}

impl IntegerTypeValidator {
    #[inline]
    pub(crate) fn compile(context: &CompilationContext) -> CompilationResult {
        Ok(Box::new(IntegerTypeValidator {
            schema_path: context.as_pointer_with("type"),
        }))
    }
}

impl Validate for IntegerTypeValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Number(number) = instance {
            is_integer(number)
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

// Since Draft 6, a float with a zero fractional part is an integer
fn is_integer(number: &Number) -> bool {
    number.is_u64() || number.is_i64() || number.as_f64().expect("Always valid").fract() == 0.
}

#[inline]
pub(crate) fn compile(
    _: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    match schema {
        Value::String(item) => Some(compile_single_type(item.as_str(), context, schema)),
        Value::Array(items) => {
            if items.len() == 1 {
                if let Some(Value::String(item)) = items.first() {
                    Some(compile_single_type(item.as_str(), context, schema))
                } else {
                    Some(Err(context.unexpected_type(schema, PrimitiveType::String)))
                }
            } else {
                Some(MultipleTypesValidator::compile(items, context))
            }
        }
        _ => Some(Err(context.unexpected_types(
            schema,
            crate::primitive_type::PrimitiveTypesBitMap::new()
                .add_type(PrimitiveType::String)
                .add_type(PrimitiveType::Array),
        ))),
    }
}

fn compile_single_type(
    item: &str,
    context: &CompilationContext,
    schema: &Value,
) -> CompilationResult {
    match PrimitiveType::try_from(item) {
        Ok(PrimitiveType::Array) => ArrayTypeValidator::compile(context),
        Ok(PrimitiveType::Boolean) => BooleanTypeValidator::compile(context),
        Ok(PrimitiveType::Integer) => IntegerTypeValidator::compile(context),
        Ok(PrimitiveType::Null) => NullTypeValidator::compile(context),
        Ok(PrimitiveType::Number) => NumberTypeValidator::compile(context),
        Ok(PrimitiveType::Object) => ObjectTypeValidator::compile(context),
        Ok(PrimitiveType::String) => StringTypeValidator::compile(context),
        Err(()) => Err(context.unexpected_type(schema, PrimitiveType::String)),
    }
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"type": "integer"}), &json!(1))]
    #[test_case(&json!({"type": "integer"}), &json!(1.0); "float with zero fraction is an integer")]
    #[test_case(&json!({"type": ["integer", "null"]}), &json!(null))]
    #[test_case(&json!({"type": "number"}), &json!(1.5))]
    fn is_valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    #[test_case(&json!({"type": "integer"}), &json!(1.5))]
    #[test_case(&json!({"type": "null"}), &json!(0))]
    #[test_case(&json!({"type": ["integer", "string"]}), &json!(null))]
    fn is_not_valid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid(schema, instance);
    }

    #[test_case(&json!({"type": "object"}), &json!([]), "/type")]
    #[test_case(&json!({"type": ["object", "string"]}), &json!([]), "/type")]
    fn schema_path(schema: &Value, instance: &Value, expected: &str) {
        tests_util::assert_schema_path(schema, instance, expected);
    }
}
