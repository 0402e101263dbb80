use crate::{
    compilation::{compile_validators, context::CompilationContext},
    error::{no_error, ErrorIterator},
    keywords::CompilationResult,
    output::BasicOutput,
    paths::InstancePath,
    patch::PatchOperation,
    primitive_type::{PrimitiveType, PrimitiveTypesBitMap},
    schema_node::SchemaNode,
    schemas::Draft,
    validator::{PartialApplication, Validate},
};
use serde_json::{Map, Value};

pub(crate) struct ItemsArrayValidator {
    items: Vec<SchemaNode>,
}

impl ItemsArrayValidator {
    #[inline]
    pub(crate) fn compile(schemas: &[Value], context: &CompilationContext) -> CompilationResult {
        let keyword_context = context.with_path("items");
        let mut items = Vec::with_capacity(schemas.len());
        for (idx, item) in schemas.iter().enumerate() {
            let item_context = keyword_context.with_path(idx);
            items.push(compile_validators(item, &item_context)?);
        }
        Ok(Box::new(ItemsArrayValidator { items }))
    }
}

impl Validate for ItemsArrayValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Array(items) = instance {
            items
                .iter()
                .zip(self.items.iter())
                .all(|(item, node)| node.is_valid(item))
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
            let errors: Vec<_> = items
                .iter()
                .zip(self.items.iter())
                .enumerate()
                .flat_map(|(idx, (item, node))| {
                    let item_path = instance_path.push(idx);
                    node.validate(item, &item_path).collect::<Vec<_>>()
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
        if let Value::Array(items) = instance {
            let mut output = BasicOutput::default();
            for (idx, (item, node)) in items.iter().zip(self.items.iter()).enumerate() {
                let item_path = instance_path.push(idx);
                output += node.apply_rooted(item, &item_path);
            }
            output.into()
        } else {
            PartialApplication::valid_empty()
        }
    }
}

impl core::fmt::Display for ItemsArrayValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "items: [{}]",
            self.items
                .iter()
                .map(|node| node.to_string())
                .collect::<Vec<String>>()
                .join(", ")
        )
    }
}

pub(crate) struct ItemsObjectValidator {
    node: SchemaNode,
    // In Draft 2020-12 `items` only applies past the `prefixItems` boundary
    skip_prefix: usize,
}

impl ItemsObjectValidator {
    #[inline]
    pub(crate) fn compile(
        schema: &Value,
        skip_prefix: usize,
        context: &CompilationContext,
    ) -> CompilationResult {
        let keyword_context = context.with_path("items");
        let node = compile_validators(schema, &keyword_context)?;
        Ok(Box::new(ItemsObjectValidator { node, skip_prefix }))
    }
}

impl Validate for ItemsObjectValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Array(items) = instance {
            items
                .iter()
                .skip(self.skip_prefix)
                .all(|item| self.node.is_valid(item))
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
            let errors: Vec<_> = items
                .iter()
                .enumerate()
                .skip(self.skip_prefix)
                .flat_map(|(idx, item)| {
                    let item_path = instance_path.push(idx);
                    self.node.validate(item, &item_path).collect::<Vec<_>>()
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
        if let Value::Array(items) = instance {
            let mut output = BasicOutput::default();
            for (idx, item) in items.iter().enumerate().skip(self.skip_prefix) {
                let item_path = instance_path.push(idx);
                output += self.node.apply_rooted(item, &item_path);
            }
            let mut result: PartialApplication = output.into();
            // Annotation of `true` signals that `items` applied to every element
            result.annotate(Value::Bool(true).into());
            result
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
        if let Value::Array(items) = instance {
            for (idx, item) in items.iter().enumerate().skip(self.skip_prefix) {
                let item_path = instance_path.push(idx);
                self.node.collect_defaults(item, &item_path, patch);
            }
        }
    }
}

impl core::fmt::Display for ItemsObjectValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "items: {}", self.node)
    }
}

#[inline]
pub(crate) fn compile(
    parent: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    match schema {
        Value::Array(items) => {
            if context.draft() == Draft::Draft202012 {
                // Array-form `items` was replaced by `prefixItems` in 2020-12
                Some(Err(context.unexpected_types(
                    schema,
                    PrimitiveTypesBitMap::new()
                        .add_type(PrimitiveType::Object)
                        .add_type(PrimitiveType::Boolean),
                )))
            } else {
                Some(ItemsArrayValidator::compile(items, context))
            }
        }
        Value::Object(_) | Value::Bool(false) => {
            let skip_prefix = if context.draft() == Draft::Draft202012 {
                parent
                    .get("prefixItems")
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len)
            } else {
                0
            };
            Some(ItemsObjectValidator::compile(schema, skip_prefix, context))
        }
        Value::Bool(true) => None,
        _ => Some(Err(context.unexpected_types(
            schema,
            PrimitiveTypesBitMap::new()
                .add_type(PrimitiveType::Object)
                .add_type(PrimitiveType::Boolean)
                .add_type(PrimitiveType::Array),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"items": {"type": "integer"}}), &json!([1, 2, 3]))]
    #[test_case(&json!({"items": [{"type": "integer"}, {"type": "string"}]}), &json!([1, "two"]))]
    #[test_case(&json!({"items": [{"type": "integer"}]}), &json!([1, "anything"]); "extra items are unconstrained")]
    fn is_valid(schema: &Value, instance: &Value) {
        tests_util::is_valid_with_draft(crate::Draft::Draft7, schema, instance);
    }

    #[test]
    fn nested_error_location() {
        let schema = json!({
            "type": "object",
            "properties": {
                "fruits": {"type": "array", "items": {"type": "string"}}
            }
        });
        let instance = json!({"fruits": ["apple", 1]});
        tests_util::assert_instance_path(&schema, &instance, "/fruits/1");
        tests_util::assert_schema_path(&schema, &instance, "/properties/fruits/items/type");
    }

    #[test]
    fn prefix_boundary_is_respected() {
        let schema = json!({
            "prefixItems": [{"type": "integer"}],
            "items": {"type": "string"}
        });
        tests_util::is_valid(&schema, &json!([1, "a", "b"]));
        tests_util::is_not_valid(&schema, &json!([1, "a", 2]));
    }

    #[test]
    fn array_form_is_rejected_in_2020_12() {
        let schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "items": [{"type": "integer"}]
        });
        assert!(crate::compile(&schema).is_err());
    }

    #[test]
    fn items_false() {
        tests_util::is_valid(&json!({"items": false}), &json!([]));
        tests_util::is_not_valid(&json!({"items": false}), &json!([1]));
    }
}
