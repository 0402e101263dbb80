use crate::{
    compilation::context::CompilationContext,
    error::{error, no_error, ErrorIterator, ValidationError},
    keywords::{helpers, CompilationResult},
    paths::{InstancePath, JSONPointer},
    primitive_type::PrimitiveType,
    validator::Validate,
};
use serde_json::{Map, Value};

pub(crate) struct EnumValidator {
    options: Value,
    items: Vec<Value>,
    schema_path: JSONPointer,
}

impl EnumValidator {
    #[inline]
    pub(crate) fn compile(
        schema: &Value,
        items: &[Value],
        schema_path: JSONPointer,
    ) -> CompilationResult {
        Ok(Box::new(EnumValidator {
            options: schema.clone(),
            items: items.to_vec(),
            schema_path,
        }))
    }
}

impl Validate for EnumValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        self.items.iter().any(|item| helpers::equal(instance, item))
    }

    fn validate<'instance>(
        &self,
        instance: &'instance Value,
        instance_path: &InstancePath,
    ) -> ErrorIterator<'instance> {
        if self.is_valid(instance) {
            no_error()
        } else {
            error(ValidationError::enumeration(
                self.schema_path.clone(),
                instance_path.into(),
                instance,
                &self.options,
            ))
        }
    }
}

impl core::fmt::Display for EnumValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "enum: [{}]",
            self.items
                .iter()
                .map(|item| item.to_string())
                .collect::<Vec<String>>()
                .join(", ")
        )
    }
}

#[inline]
pub(crate) fn compile(
    _: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    if let Value::Array(items) = schema {
        Some(EnumValidator::compile(
            schema,
            items,
            context.as_pointer_with("enum"),
        ))
    } else {
        Some(Err(context.unexpected_type(schema, PrimitiveType::Array)))
    }
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"enum": [1, 2]}), &json!(3), "/enum")]
    fn schema_path(schema: &Value, instance: &Value, expected: &str) {
        tests_util::assert_schema_path(schema, instance, expected);
    }

    #[test]
    fn deep_equality() {
        tests_util::is_valid(&json!({"enum": [[1, {"a": null}]]}), &json!([1, {"a": null}]));
        tests_util::is_not_valid(&json!({"enum": [[1, {"a": null}]]}), &json!([1, {"a": 0}]));
    }
}
