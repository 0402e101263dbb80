//! Draft 4: `exclusiveMaximum` is a boolean modifier of `maximum`.
use crate::{
    compilation::context::CompilationContext,
    keywords::{exclusive_maximum, maximum, CompilationResult},
    primitive_type::PrimitiveType,
};
use serde_json::{Map, Value};

#[inline]
pub(crate) fn compile(
    parent: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    match parent.get("exclusiveMaximum") {
        Some(Value::Bool(true)) => exclusive_maximum::compile(parent, schema, context),
        Some(Value::Bool(false)) | None => maximum::compile(parent, schema, context),
        Some(value) => Some(Err(context.unexpected_type(value, PrimitiveType::Boolean))),
    }
}

#[cfg(test)]
mod tests {
    use crate::{tests_util, Draft};
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"maximum": 5}), &json!(5))]
    #[test_case(&json!({"maximum": 5, "exclusiveMaximum": false}), &json!(5))]
    fn is_valid(schema: &Value, instance: &Value) {
        tests_util::is_valid_with_draft(Draft::Draft4, schema, instance);
    }

    #[test_case(&json!({"maximum": 5, "exclusiveMaximum": true}), &json!(5))]
    #[test_case(&json!({"maximum": 5, "exclusiveMaximum": true}), &json!(6))]
    fn is_not_valid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid_with_draft(Draft::Draft4, schema, instance);
    }
}
