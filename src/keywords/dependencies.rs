use crate::{
    compilation::{compile_validators, context::CompilationContext},
    error::{no_error, ErrorIterator},
    keywords::{required::RequiredValidator, CompilationResult},
    paths::InstancePath,
    primitive_type::{PrimitiveType, PrimitiveTypesBitMap},
    validator::{BoxedValidator, Validate},
};
use serde_json::{Map, Value};

pub(crate) struct DependenciesValidator {
    dependencies: Vec<(String, BoxedValidator)>,
}

impl DependenciesValidator {
    #[inline]
    pub(crate) fn compile(
        schema: &Value,
        context: &CompilationContext,
        keyword: &'static str,
        schemas_allowed: bool,
        requirements_allowed: bool,
    ) -> CompilationResult {
        if let Value::Object(map) = schema {
            let keyword_context = context.with_path(keyword);
            let mut dependencies = Vec::with_capacity(map.len());
            for (key, subschema) in map {
                let dependency_context = keyword_context.with_path(key.as_str());
                let validator: BoxedValidator = match subschema {
                    Value::Array(items) if requirements_allowed => {
                        RequiredValidator::compile(items, &dependency_context)?
                    }
                    Value::Object(_) | Value::Bool(_) if schemas_allowed => {
                        Box::new(compile_validators(subschema, &dependency_context)?)
                    }
                    _ => {
                        return Err(dependency_context.unexpected_types(
                            subschema,
                            expected_types(schemas_allowed, requirements_allowed),
                        ))
                    }
                };
                dependencies.push((key.clone(), validator));
            }
            Ok(Box::new(DependenciesValidator { dependencies }))
        } else {
            Err(context.unexpected_type(schema, PrimitiveType::Object))
        }
    }
}

fn expected_types(schemas_allowed: bool, requirements_allowed: bool) -> PrimitiveTypesBitMap {
    let mut types = PrimitiveTypesBitMap::new();
    if schemas_allowed {
        types = types
            .add_type(PrimitiveType::Object)
            .add_type(PrimitiveType::Boolean);
    }
    if requirements_allowed {
        types = types.add_type(PrimitiveType::Array);
    }
    types
}

impl Validate for DependenciesValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Object(item) = instance {
            self.dependencies
                .iter()
                .filter(|(property, _)| item.contains_key(property))
                .all(|(_, validator)| validator.is_valid(instance))
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
            let errors: Vec<_> = self
                .dependencies
                .iter()
                .filter(|(property, _)| item.contains_key(property))
                .flat_map(|(_, validator)| validator.validate(instance, instance_path))
                .collect();
            Box::new(errors.into_iter())
        } else {
            no_error()
        }
    }
}

impl core::fmt::Display for DependenciesValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "dependencies: {{{}}}",
            self.dependencies
                .iter()
                .map(|(key, validator)| format!("{}: {}", key, validator))
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
    // The unified pre-2019-09 form allows both arrays of property names and schemas
    Some(DependenciesValidator::compile(
        schema,
        context,
        "dependencies",
        true,
        true,
    ))
}

#[inline]
pub(crate) fn compile_dependent_required(
    _: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    Some(DependenciesValidator::compile(
        schema,
        context,
        "dependentRequired",
        false,
        true,
    ))
}

#[inline]
pub(crate) fn compile_dependent_schemas(
    _: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    Some(DependenciesValidator::compile(
        schema,
        context,
        "dependentSchemas",
        true,
        false,
    ))
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"dependencies": {"bar": ["foo"]}}), &json!({"bar": 1, "foo": 2}))]
    #[test_case(&json!({"dependencies": {"bar": ["foo"]}}), &json!({"baz": 1}))]
    #[test_case(&json!({"dependencies": {"bar": {"minProperties": 2}}}), &json!({"bar": 1, "x": 2}))]
    #[test_case(&json!({"dependentRequired": {"bar": ["foo"]}}), &json!({"bar": 1, "foo": 2}))]
    #[test_case(&json!({"dependentSchemas": {"bar": {"minProperties": 2}}}), &json!({"bar": 1, "x": 2}))]
    fn is_valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    #[test_case(&json!({"dependencies": {"bar": ["foo"]}}), &json!({"bar": 1}))]
    #[test_case(&json!({"dependencies": {"bar": {"minProperties": 2}}}), &json!({"bar": 1}))]
    #[test_case(&json!({"dependentRequired": {"bar": ["foo"]}}), &json!({"bar": 1}))]
    #[test_case(&json!({"dependentSchemas": {"bar": {"minProperties": 2}}}), &json!({"bar": 1}))]
    fn is_not_valid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid(schema, instance);
    }

    #[test]
    fn schema_path() {
        tests_util::assert_schema_path(
            &json!({"dependencies": {"bar": ["foo"]}}),
            &json!({"bar": 1}),
            "/dependencies/bar/required",
        );
    }
}
