use crate::{
    compilation::{compile_validators, context::CompilationContext},
    error::{no_error, ErrorIterator},
    keywords::CompilationResult,
    output::BasicOutput,
    paths::InstancePath,
    primitive_type::PrimitiveType,
    schema_node::SchemaNode,
    validator::{PartialApplication, Validate},
};
use serde_json::{Map, Value};

pub(crate) struct PrefixItemsValidator {
    schemas: Vec<SchemaNode>,
}

impl PrefixItemsValidator {
    #[inline]
    pub(crate) fn compile(schemas: &[Value], context: &CompilationContext) -> CompilationResult {
        let keyword_context = context.with_path("prefixItems");
        let mut nodes = Vec::with_capacity(schemas.len());
        for (idx, schema) in schemas.iter().enumerate() {
            let item_context = keyword_context.with_path(idx);
            nodes.push(compile_validators(schema, &item_context)?);
        }
        Ok(Box::new(PrefixItemsValidator { schemas: nodes }))
    }
}

impl Validate for PrefixItemsValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Array(items) = instance {
            items
                .iter()
                .zip(self.schemas.iter())
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
                .zip(self.schemas.iter())
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
            for (idx, (item, node)) in items.iter().zip(self.schemas.iter()).enumerate() {
                let item_path = instance_path.push(idx);
                output += node.apply_rooted(item, &item_path);
            }
            let mut result: PartialApplication = output.into();
            // The largest index `prefixItems` applied to
            let applied = items.len().min(self.schemas.len());
            if applied == items.len() && applied > 0 {
                result.annotate(Value::Bool(true).into());
            } else if applied > 0 {
                result.annotate(Value::from(applied - 1).into());
            }
            result
        } else {
            PartialApplication::valid_empty()
        }
    }
}

impl core::fmt::Display for PrefixItemsValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "prefixItems: [{}]",
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
        Some(PrefixItemsValidator::compile(items, context))
    } else {
        Some(Err(context.unexpected_type(schema, PrimitiveType::Array)))
    }
}
