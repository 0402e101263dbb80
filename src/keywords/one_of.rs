use crate::{
    compilation::{compile_validators, context::CompilationContext},
    error::{error, no_error, ErrorIterator, ValidationError},
    keywords::CompilationResult,
    paths::{InstancePath, JSONPointer},
    primitive_type::PrimitiveType,
    schema_node::SchemaNode,
    validator::{PartialApplication, Validate},
};
use serde_json::{Map, Value};

pub(crate) struct OneOfValidator {
    schemas: Vec<SchemaNode>,
    schema_path: JSONPointer,
}

impl OneOfValidator {
    #[inline]
    pub(crate) fn compile(items: &[Value], context: &CompilationContext) -> CompilationResult {
        let keyword_context = context.with_path("oneOf");
        let mut schemas = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            let item_context = keyword_context.with_path(idx);
            schemas.push(compile_validators(item, &item_context)?);
        }
        Ok(Box::new(OneOfValidator {
            schemas,
            schema_path: keyword_context.into_pointer(),
        }))
    }

    fn get_first_valid(&self, instance: &Value) -> Option<usize> {
        self.schemas
            .iter()
            .position(|node| node.is_valid(instance))
    }

    // Exploring a second match is enough to report the ambiguity; the scan stops there
    fn are_others_valid(&self, instance: &Value, idx: usize) -> bool {
        self.schemas
            .iter()
            .skip(idx + 1)
            .any(|node| node.is_valid(instance))
    }
}

impl Validate for OneOfValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Some(idx) = self.get_first_valid(instance) {
            !self.are_others_valid(instance, idx)
        } else {
            false
        }
    }

    fn validate<'instance>(
        &self,
        instance: &'instance Value,
        instance_path: &InstancePath,
    ) -> ErrorIterator<'instance> {
        if let Some(idx) = self.get_first_valid(instance) {
            if self.are_others_valid(instance, idx) {
                return error(ValidationError::one_of_multiple_valid(
                    self.schema_path.clone(),
                    instance_path.into(),
                    instance,
                ));
            }
            no_error()
        } else {
            error(ValidationError::one_of_not_valid(
                self.schema_path.clone(),
                instance_path.into(),
                instance,
            ))
        }
    }

    fn apply<'a>(
        &'a self,
        instance: &Value,
        instance_path: &InstancePath,
    ) -> PartialApplication<'a> {
        match self.get_first_valid(instance) {
            Some(idx) if !self.are_others_valid(instance, idx) => self.schemas[idx]
                .apply_rooted(instance, instance_path)
                .into(),
            Some(_) => PartialApplication::invalid_empty(vec![ValidationError::one_of_multiple_valid(
                self.schema_path.clone(),
                instance_path.into(),
                instance,
            )
            .into()]),
            None => PartialApplication::invalid_empty(vec![ValidationError::one_of_not_valid(
                self.schema_path.clone(),
                instance_path.into(),
                instance,
            )
            .into()]),
        }
    }
}

impl core::fmt::Display for OneOfValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "oneOf: [{}]",
            self.schemas
                .iter()
                .map(|node| node.to_string())
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
        Some(OneOfValidator::compile(items, context))
    } else {
        Some(Err(context.unexpected_type(schema, PrimitiveType::Array)))
    }
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"oneOf": [{"type": "integer"}, {"minimum": 2}]}), &json!(1))]
    #[test_case(&json!({"oneOf": [{"type": "integer"}, {"minimum": 2}]}), &json!(2.5))]
    fn is_valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    // Matching more than one branch is an error of its own kind
    #[test_case(&json!({"oneOf": [{"type": "integer"}, {"minimum": 2}]}), &json!(3))]
    #[test_case(&json!({"oneOf": [{"type": "string"}]}), &json!(0))]
    fn is_not_valid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid(schema, instance);
    }

    #[test_case(&json!({"oneOf": [{"type": "string"}]}), &json!(0), "/oneOf")]
    #[test_case(&json!({"oneOf": [{"type": "string"}, {"maxLength": 3}]}), &json!(""), "/oneOf")]
    fn schema_path(schema: &Value, instance: &Value, expected: &str) {
        tests_util::assert_schema_path(schema, instance, expected);
    }
}
