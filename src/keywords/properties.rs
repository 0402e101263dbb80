use crate::{
    compilation::context::CompilationContext,
    error::{no_error, ErrorIterator},
    keywords::CompilationResult,
    output::BasicOutput,
    paths::InstancePath,
    patch::PatchOperation,
    primitive_type::PrimitiveType,
    properties::{compile_properties, PropertiesMap},
    validator::{PartialApplication, Validate},
};
use serde_json::{Map, Value};

pub(crate) struct PropertiesValidator {
    properties: PropertiesMap,
    defaults: Vec<(String, Value)>,
}

impl PropertiesValidator {
    #[inline]
    pub(crate) fn compile(schema: &Value, context: &CompilationContext) -> CompilationResult {
        match schema {
            Value::Object(map) => Ok(Box::new(PropertiesValidator {
                properties: compile_properties(map, context)?,
                defaults: collect_declared_defaults(map, context),
            })),
            _ => Err(context.unexpected_type(schema, PrimitiveType::Object)),
        }
    }
}

pub(crate) fn collect_declared_defaults(
    map: &Map<String, Value>,
    context: &CompilationContext,
) -> Vec<(String, Value)> {
    if !context.config.defaults_injection() {
        return Vec::new();
    }
    map.iter()
        .filter_map(|(name, subschema)| {
            subschema
                .get("default")
                .map(|default| (name.clone(), default.clone()))
        })
        .collect()
}

impl Validate for PropertiesValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Object(item) = instance {
            self.properties.iter().all(|(name, node)| {
                item.get(name).map_or(true, |property| node.is_valid(property))
            })
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
                .properties
                .iter()
                .flat_map(|(name, node)| {
                    let option = item.get(name);
                    option
                        .into_iter()
                        .flat_map(|property| {
                            let property_path = instance_path.push(name.as_str());
                            node.validate(property, &property_path).collect::<Vec<_>>()
                        })
                        .collect::<Vec<_>>()
                })
                .collect();
            Box::new(errors.into_iter())
        } else {
            no_error()
        }
    }

    fn apply<'a>(
        &'a self,
        instance: &Value,
        instance_path: &InstancePath,
    ) -> PartialApplication<'a> {
        if let Value::Object(item) = instance {
            let mut output = BasicOutput::default();
            for (name, node) in &self.properties {
                if let Some(property) = item.get(name) {
                    let property_path = instance_path.push(name.as_str());
                    output += node.apply_rooted(property, &property_path);
                }
            }
            output.into()
        } else {
            PartialApplication::valid_empty()
        }
    }

    fn collect_defaults(
        &self,
        instance: &Value,
        instance_path: &InstancePath,
        patch: &mut Vec<PatchOperation>,
    ) {
        if let Value::Object(item) = instance {
            for (name, default) in &self.defaults {
                if !item.contains_key(name) {
                    let property_path = instance_path.push(name.as_str());
                    patch.push(PatchOperation::add(
                        (&property_path).into(),
                        default.clone(),
                    ));
                }
            }
            for (name, node) in &self.properties {
                if let Some(property) = item.get(name) {
                    let property_path = instance_path.push(name.as_str());
                    node.collect_defaults(property, &property_path, patch);
                }
            }
        }
    }
}

impl core::fmt::Display for PropertiesValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "properties: {{{}}}",
            self.properties
                .iter()
                .map(|(name, node)| format!("{}: {}", name, node))
                .collect::<Vec<String>>()
                .join(", ")
        )
    }
}

#[inline]
pub(crate) fn compile(
    parent: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    match parent.get("additionalProperties") {
        // This type of `additionalProperties` validator handles the `properties` logic
        Some(Value::Bool(false)) | Some(Value::Object(_)) => None,
        _ => Some(PropertiesValidator::compile(schema, context)),
    }
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"properties": {"foo": {"type": "string"}}}), &json!({"foo": "bar"}))]
    #[test_case(&json!({"properties": {"foo": {"type": "string"}}}), &json!({"bar": 1}); "missing properties are not required")]
    fn is_valid(schema: &Value, instance: &Value) {
        tests_util::is_valid(schema, instance);
    }

    #[test]
    fn schema_path() {
        tests_util::assert_schema_path(
            &json!({"properties": {"foo": {"type": "string"}}}),
            &json!({"foo": 1}),
            "/properties/foo/type",
        );
    }
}
