//! Draft 4: `exclusiveMinimum` is a boolean modifier of `minimum`.
use crate::{
    compilation::context::CompilationContext,
    keywords::{exclusive_minimum, minimum, CompilationResult},
    primitive_type::PrimitiveType,
};
use serde_json::{Map, Value};

#[inline]
pub(crate) fn compile(
    parent: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    match parent.get("exclusiveMinimum") {
        Some(Value::Bool(true)) => exclusive_minimum::compile(parent, schema, context),
        Some(Value::Bool(false)) | None => minimum::compile(parent, schema, context),
        Some(value) => Some(Err(context.unexpected_type(value, PrimitiveType::Boolean))),
    }
}
