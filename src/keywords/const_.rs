use crate::{
    compilation::context::CompilationContext,
    error::{error, no_error, ErrorIterator, ValidationError},
    keywords::{helpers, CompilationResult},
    paths::{InstancePath, JSONPointer},
    validator::Validate,
};
use serde_json::{Map, Number, Value};

struct ConstArrayValidator {
    value: Vec<Value>,
    schema_path: JSONPointer,
}

impl Validate for ConstArrayValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Array(items) = instance {
            helpers::equal_arrays(&self.value, items)
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
            error(ValidationError::constant_array(
                self.schema_path.clone(),
                instance_path.into(),
                instance,
                &self.value,
            ))
        }
    }
}

impl core::fmt::Display for ConstArrayValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "const: [{}]",
            self.value
                .iter()
                .map(|value| value.to_string())
                .collect::<Vec<String>>()
                .join(", ")
        )
    }
}

struct ConstBooleanValidator {
    value: bool,
    schema_path: JSONPointer,
}

impl Validate for ConstBooleanValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        matches!(instance, Value::Bool(value) if *value == self.value)
    }

    fn validate<'instance>(
        &self,
        instance: &'instance Value,
        instance_path: &InstancePath,
    ) -> ErrorIterator<'instance> {
        if self.is_valid(instance) {
            no_error()
        } else {
            error(ValidationError::constant_boolean(
                self.schema_path.clone(),
                instance_path.into(),
                instance,
                self.value,
            ))
        }
    }
}

impl core::fmt::Display for ConstBooleanValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "const: {}", self.value)
    }
}

struct ConstNullValidator {
    schema_path: JSONPointer,
}

impl Validate for ConstNullValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        instance.is_null()
    }

    fn validate<'instance>(
        &self,
        instance: &'instance Value,
        instance_path: &InstancePath,
    ) -> ErrorIterator<'instance> {
        if self.is_valid(instance) {
            no_error()
        } else {
            error(ValidationError::constant_null(
                self.schema_path.clone(),
                instance_path.into(),
                instance,
            ))
        }
    }
}

impl core::fmt::Display for ConstNullValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("const: null")
    }
}

struct ConstNumberValidator {
    original_value: Number,
    schema_path: JSONPointer,
}

impl Validate for ConstNumberValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Number(number) = instance {
            helpers::equal(
                &Value::Number(self.original_value.clone()),
                &Value::Number(number.clone()),
            )
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
            error(ValidationError::constant_number(
                self.schema_path.clone(),
                instance_path.into(),
                instance,
                &self.original_value,
            ))
        }
    }
}

impl core::fmt::Display for ConstNumberValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "const: {}", self.original_value)
    }
}

struct ConstObjectValidator {
    value: Map<String, Value>,
    schema_path: JSONPointer,
}

impl Validate for ConstObjectValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Object(object) = instance {
            helpers::equal_objects(&self.value, object)
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
            error(ValidationError::constant_object(
                self.schema_path.clone(),
                instance_path.into(),
                instance,
                &self.value,
            ))
        }
    }
}

impl core::fmt::Display for ConstObjectValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "const: {}",
            Value::Object(self.value.clone())
        )
    }
}

struct ConstStringValidator {
    value: String,
    schema_path: JSONPointer,
}

impl Validate for ConstStringValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        matches!(instance, Value::String(value) if *value == self.value)
    }

    fn validate<'instance>(
        &self,
        instance: &'instance Value,
        instance_path: &InstancePath,
    ) -> ErrorIterator<'instance> {
        if self.is_valid(instance) {
            no_error()
        } else {
            error(ValidationError::constant_string(
                self.schema_path.clone(),
                instance_path.into(),
                instance,
                &self.value,
            ))
        }
    }
}

impl core::fmt::Display for ConstStringValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "const: {}", self.value)
    }
}

#[inline]
pub(crate) fn compile(
    _: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    let schema_path = context.as_pointer_with("const");
    Some(Ok(match schema {
        Value::Array(items) => Box::new(ConstArrayValidator {
            value: items.clone(),
            schema_path,
        }),
        Value::Bool(item) => Box::new(ConstBooleanValidator {
            value: *item,
            schema_path,
        }),
        Value::Null => Box::new(ConstNullValidator { schema_path }),
        Value::Number(item) => Box::new(ConstNumberValidator {
            original_value: item.clone(),
            schema_path,
        }),
        Value::Object(map) => Box::new(ConstObjectValidator {
            value: map.clone(),
            schema_path,
        }),
        Value::String(string) => Box::new(ConstStringValidator {
            value: string.clone(),
            schema_path,
        }),
    }))
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"const": 1}), &json!(2), "/const")]
    #[test_case(&json!({"const": null}), &json!(3), "/const")]
    fn schema_path(schema: &Value, instance: &Value, expected: &str) {
        tests_util::assert_schema_path(schema, instance, expected);
    }

    #[test_case(&json!({"const": {"a": 1}}), &json!({"a": 1}))]
    #[test_case(&json!({"const": null}), &json!(null))]
    fn is_valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }
}
