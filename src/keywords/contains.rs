use crate::{
    compilation::{compile_validators, context::CompilationContext},
    error::{error, no_error, ErrorIterator, ValidationError},
    keywords::CompilationResult,
    paths::{InstancePath, JSONPointer},
    primitive_type::PrimitiveType,
    schema_node::SchemaNode,
    schemas::Draft,
    validator::Validate,
};
use serde_json::{Map, Value};

pub(crate) struct ContainsValidator {
    node: SchemaNode,
    min_contains: Option<u64>,
    max_contains: Option<u64>,
    schema_path: JSONPointer,
}

impl ContainsValidator {
    #[inline]
    pub(crate) fn compile(
        parent: &Map<String, Value>,
        schema: &Value,
        context: &CompilationContext,
    ) -> CompilationResult {
        let keyword_context = context.with_path("contains");
        // `minContains` / `maxContains` appeared in 2019-09 and modify `contains` in place
        let (min_contains, max_contains) = if context.draft() >= Draft::Draft201909 {
            let min = match parent.get("minContains") {
                Some(value) => Some(
                    value
                        .as_u64()
                        .ok_or_else(|| context.unexpected_type(value, PrimitiveType::Integer))?,
                ),
                None => None,
            };
            let max = match parent.get("maxContains") {
                Some(value) => Some(
                    value
                        .as_u64()
                        .ok_or_else(|| context.unexpected_type(value, PrimitiveType::Integer))?,
                ),
                None => None,
            };
            (min, max)
        } else {
            (None, None)
        };
        Ok(Box::new(ContainsValidator {
            node: compile_validators(schema, &keyword_context)?,
            min_contains,
            max_contains,
            schema_path: keyword_context.into_pointer(),
        }))
    }

    fn matches(&self, items: &[Value]) -> u64 {
        let mut matches = 0;
        for item in items {
            if self.node.is_valid(item) {
                matches += 1;
                // Without `maxContains` there is no reason to count further
                if self.max_contains.is_none()
                    && matches >= self.min_contains.unwrap_or(1)
                {
                    break;
                }
            }
        }
        matches
    }
}

impl Validate for ContainsValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Array(items) = instance {
            let matches = self.matches(items);
            matches >= self.min_contains.unwrap_or(1)
                && self.max_contains.map_or(true, |max| matches <= max)
        } else {
            true
        }
    }

    fn validate<'instance>(
        &self,
        instance: &'instance Value,
        instance_path: &InstancePath,
    ) -> ErrorIterator<'instance> {
        if let Value::Array(items) = instance {
            let matches = self.matches(items);
            let min = self.min_contains.unwrap_or(1);
            if matches < min {
                return if self.min_contains.is_some() {
                    error(ValidationError::min_contains(
                        self.schema_path.clone(),
                        instance_path.into(),
                        instance,
                        min,
                    ))
                } else {
                    error(ValidationError::contains(
                        self.schema_path.clone(),
                        instance_path.into(),
                        instance,
                    ))
                };
            }
            if let Some(max) = self.max_contains {
                if matches > max {
                    return error(ValidationError::max_contains(
                        self.schema_path.clone(),
                        instance_path.into(),
                        instance,
                        max,
                    ));
                }
            }
        }
        no_error()
    }
}

impl core::fmt::Display for ContainsValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "contains: {}", self.node)
    }
}

#[inline]
pub(crate) fn compile(
    parent: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    Some(ContainsValidator::compile(parent, schema, context))
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"contains": {"minimum": 5}}), &json!([3, 5, 7]))]
    #[test_case(&json!({"contains": {"minimum": 5}}), &json!("not an array"))]
    #[test_case(&json!({"contains": {"type": "integer"}, "minContains": 2}), &json!([1, "a", 2]))]
    #[test_case(&json!({"contains": {"type": "integer"}, "minContains": 0}), &json!([]))]
    #[test_case(&json!({"contains": {"type": "integer"}, "maxContains": 2}), &json!([1, 2, "a"]))]
    fn is_valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    #[test_case(&json!({"contains": {"minimum": 5}}), &json!([2, 3, 4]))]
    #[test_case(&json!({"contains": {"type": "integer"}, "minContains": 2}), &json!([1, "a"]))]
    #[test_case(&json!({"contains": {"type": "integer"}, "maxContains": 1}), &json!([1, 2]))]
    fn is_not_valid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid(schema, instance);
    }

    #[test]
    fn min_contains_is_ignored_in_draft_7() {
        // Draft 7 has no `minContains`, so an empty match set is a failure
        tests_util::is_not_valid_with_draft(
            crate::Draft::Draft7,
            &json!({"contains": {"type": "integer"}, "minContains": 0}),
            &json!([]),
        );
    }

    #[test]
    fn schema_path() {
        tests_util::assert_schema_path(
            &json!({"contains": {"minimum": 5}}),
            &json!([1]),
            "/contains",
        );
    }
}
