use crate::{
    error::{error, ErrorIterator, ValidationError},
    paths::{InstancePath, JSONPointer},
    validator::{BoxedValidator, Validate},
};
use serde_json::Value;

/// Compiled from the `false` schema; rejects everything.
pub(crate) struct FalseValidator {
    schema_path: JSONPointer,
}

impl FalseValidator {
    #[inline]
    pub(crate) fn compile(schema_path: JSONPointer) -> BoxedValidator {
        Box::new(FalseValidator { schema_path })
    }
}

impl Validate for FalseValidator {
    fn is_valid(&self, _: &Value) -> bool {
        false
    }

    fn validate<'instance>(
        &self,
        instance: &'instance Value,
        instance_path: &InstancePath,
    ) -> ErrorIterator<'instance> {
        error(ValidationError::false_schema(
            self.schema_path.clone(),
            instance_path.into(),
            instance,
        ))
    }
}

impl core::fmt::Display for FalseValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("false")
    }
}

/// Accepts everything; used where a keyword argument of `true` means "no restriction".
pub(crate) struct TrueValidator;

impl TrueValidator {
    #[inline]
    pub(crate) fn compile() -> BoxedValidator {
        Box::new(TrueValidator)
    }
}

impl Validate for TrueValidator {
    fn is_valid(&self, _: &Value) -> bool {
        true
    }

    fn validate<'instance>(
        &self,
        _: &'instance Value,
        _: &InstancePath,
    ) -> ErrorIterator<'instance> {
        crate::error::no_error()
    }
}

impl core::fmt::Display for TrueValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("true")
    }
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::json;

    #[test]
    fn false_rejects_everything() {
        tests_util::is_not_valid(&json!(false), &json!(1));
        tests_util::is_not_valid(&json!(false), &json!(null));
    }
}
