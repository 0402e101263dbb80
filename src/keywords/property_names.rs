use crate::{
    compilation::{compile_validators, context::CompilationContext},
    error::{no_error, ErrorIterator},
    keywords::CompilationResult,
    paths::InstancePath,
    schema_node::SchemaNode,
    validator::Validate,
};
use serde_json::{Map, Value};

pub(crate) struct PropertyNamesValidator {
    node: SchemaNode,
}

impl PropertyNamesValidator {
    #[inline]
    pub(crate) fn compile(schema: &Value, context: &CompilationContext) -> CompilationResult {
        let keyword_context = context.with_path("propertyNames");
        Ok(Box::new(PropertyNamesValidator {
            node: compile_validators(schema, &keyword_context)?,
        }))
    }
}

impl Validate for PropertyNamesValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Object(item) = instance {
            item.keys()
                .all(|key| self.node.is_valid(&Value::String(key.clone())))
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
                .keys()
                .flat_map(|key| {
                    // The name itself is the validated instance, so errors are owned
                    let name = Value::String(key.clone());
                    self.node
                        .validate(&name, instance_path)
                        .map(|error| error.into_owned())
                        .collect::<Vec<_>>()
                })
                .collect();
            Box::new(errors.into_iter())
        } else {
            no_error()
        }
    }
}

impl core::fmt::Display for PropertyNamesValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "propertyNames: {}", self.node)
    }
}

#[inline]
pub(crate) fn compile(
    _: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    Some(PropertyNamesValidator::compile(schema, context))
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"propertyNames": {"maxLength": 3}}), &json!({"ab": 1}))]
    #[test_case(&json!({"propertyNames": false}), &json!({}))]
    fn is_valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    #[test_case(&json!({"propertyNames": {"maxLength": 3}}), &json!({"abcd": 1}))]
    #[test_case(&json!({"propertyNames": false}), &json!({"a": 1}))]
    fn is_not_valid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid(schema, instance);
    }
}
