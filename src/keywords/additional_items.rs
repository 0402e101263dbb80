use crate::{
    compilation::{compile_validators, context::CompilationContext},
    error::{error, no_error, ErrorIterator, ValidationError},
    keywords::CompilationResult,
    paths::{InstancePath, JSONPointer},
    schema_node::SchemaNode,
    validator::Validate,
};
use serde_json::{Map, Value};

// `additionalItems` is only meaningful when `items` is an array of schemas; the items past the
// end of that array are the "additional" ones.
pub(crate) struct AdditionalItemsObjectValidator {
    node: SchemaNode,
    items_count: usize,
}

impl Validate for AdditionalItemsObjectValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Array(items) = instance {
            items
                .iter()
                .skip(self.items_count)
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
                .skip(self.items_count)
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
}

impl core::fmt::Display for AdditionalItemsObjectValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "additionalItems: {}", self.node)
    }
}

pub(crate) struct AdditionalItemsBooleanValidator {
    items_count: usize,
    schema_path: JSONPointer,
}

impl Validate for AdditionalItemsBooleanValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Array(items) = instance {
            items.len() <= self.items_count
        } else {
            true
        }
    }

    fn validate<'instance>(
        &self,
        instance: &'instance Value,
        instance_path: &InstancePath,
    ) -> ErrorIterator<'instance> {
        if self.is_valid(instance) {
            no_error()
        } else {
            error(ValidationError::additional_items(
                self.schema_path.clone(),
                instance_path.into(),
                instance,
                self.items_count,
            ))
        }
    }
}

impl core::fmt::Display for AdditionalItemsBooleanValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("additionalItems: false")
    }
}

#[inline]
pub(crate) fn compile(
    parent: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    if let Some(Value::Array(items)) = parent.get("items") {
        let items_count = items.len();
        match schema {
            Value::Object(_) | Value::Bool(true) => {
                let keyword_context = context.with_path("additionalItems");
                Some(
                    compile_validators(schema, &keyword_context).map(|node| {
                        Box::new(AdditionalItemsObjectValidator { node, items_count })
                            as crate::validator::BoxedValidator
                    }),
                )
            }
            Value::Bool(false) => Some(Ok(Box::new(AdditionalItemsBooleanValidator {
                items_count,
                schema_path: context.as_pointer_with("additionalItems"),
            }))),
            _ => None,
        }
    } else {
        None
    }
}
