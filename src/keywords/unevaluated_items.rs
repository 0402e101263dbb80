//! Validator for the `unevaluatedItems` keyword.
//!
//! The index analogue of `unevaluatedProperties`: an index is evaluated iff it is covered by
//! `prefixItems` / array-form `items`, a schema-form `items` / `additionalItems`, a matching
//! `contains`, or by an applicator branch that successfully applied. The keyword's subschema
//! applies to the complement.
use crate::{
    compilation::{compile_validators, context::CompilationContext},
    error::{no_error, ErrorIterator, SchemaError, ValidationError},
    keywords::CompilationResult,
    paths::{InstancePath, JSONPointer},
    schema_node::SchemaNode,
    schemas::Draft,
    validator::Validate,
};
use ahash::AHashSet;
use serde_json::{Map, Value};

enum UnevaluatedBehavior {
    Deny,
    IfValid(SchemaNode),
}

pub(crate) struct UnevaluatedItemsValidator {
    schema_path: JSONPointer,
    unevaluated: UnevaluatedBehavior,
    // Indices below this bound are evaluated by `prefixItems` (2020-12) or array-form `items`
    prefix_length: usize,
    // Schema-form `items` / `additionalItems` evaluate every remaining index
    all_items: bool,
    contains: Option<SchemaNode>,
    conditional: Option<Box<ConditionalSubvalidator>>,
    reference: Option<Box<UnevaluatedItemsValidator>>,
    subschemas: Vec<(SchemaNode, UnevaluatedItemsValidator)>,
}

struct ConditionalSubvalidator {
    condition: SchemaNode,
    in_if: Option<UnevaluatedItemsValidator>,
    success: Option<UnevaluatedItemsValidator>,
    failure: Option<UnevaluatedItemsValidator>,
}

fn get_unevaluated_items_schema(parent: &Map<String, Value>) -> &Value {
    parent.get("unevaluatedItems").unwrap_or(&Value::Bool(false))
}

impl UnevaluatedItemsValidator {
    fn compile(
        parent: &Map<String, Value>,
        schema: &Value,
        context: &CompilationContext,
        seen: &mut AHashSet<String>,
    ) -> Result<Self, SchemaError> {
        let unevaluated = match schema {
            Value::Bool(false) => UnevaluatedBehavior::Deny,
            _ => UnevaluatedBehavior::IfValid(compile_validators(
                schema,
                &context.with_path("unevaluatedItems"),
            )?),
        };

        let mut prefix_length = 0;
        let mut all_items = false;
        match context.draft() {
            Draft::Draft202012 => {
                if let Some(Value::Array(prefix)) = parent.get("prefixItems") {
                    prefix_length = prefix.len();
                }
                if matches!(parent.get("items"), Some(Value::Object(_) | Value::Bool(_))) {
                    all_items = true;
                }
            }
            _ => match parent.get("items") {
                Some(Value::Array(items)) => {
                    prefix_length = items.len();
                    if parent.get("additionalItems").is_some() {
                        all_items = true;
                    }
                }
                Some(Value::Object(_) | Value::Bool(_)) => all_items = true,
                _ => {}
            },
        }

        let contains = match parent.get("contains") {
            Some(contains_schema @ (Value::Object(_) | Value::Bool(_))) => Some(
                compile_validators(contains_schema, &context.with_path("contains"))?,
            ),
            _ => None,
        };

        let conditional = parent
            .get("if")
            .map(|condition| {
                ConditionalSubvalidator::compile(
                    condition,
                    parent.get("then"),
                    parent.get("else"),
                    context,
                    seen,
                )
                .map(Box::new)
            })
            .transpose()?;

        let mut reference = None;
        if let Some(Value::String(ref_string)) = parent.get("$ref") {
            if let Ok(resolved) = context.registry.resolve(
                &context.scope,
                ref_string,
                &context.absolute_location(),
            ) {
                let identity = context.build_url(ref_string)?.to_string();
                if seen.insert(identity.clone()) {
                    if let Value::Object(target) = &*resolved.contents {
                        let reference_context = context.in_resolved(&resolved, "$ref");
                        reference = Some(Box::new(UnevaluatedItemsValidator::compile(
                            target,
                            get_unevaluated_items_schema(target),
                            &reference_context,
                            seen,
                        )?));
                    }
                    seen.remove(&identity);
                }
            }
        }

        let mut subschemas = Vec::new();
        for keyword in ["allOf", "anyOf", "oneOf"] {
            if let Some(Value::Array(branches)) = parent.get(keyword) {
                for branch in branches {
                    if let Value::Object(branch_object) = branch {
                        let node = compile_validators(branch, &context.with_path(keyword))?;
                        let subvalidator = UnevaluatedItemsValidator::compile(
                            branch_object,
                            get_unevaluated_items_schema(branch_object),
                            context,
                            seen,
                        )?;
                        subschemas.push((node, subvalidator));
                    }
                }
            }
        }

        Ok(Self {
            schema_path: context.as_pointer_with("unevaluatedItems"),
            unevaluated,
            prefix_length,
            all_items,
            contains,
            conditional,
            reference,
            subschemas,
        })
    }

    fn claims(&self, instance: &Value, item: &Value, index: usize) -> bool {
        if index < self.prefix_length || self.all_items {
            return true;
        }
        if let Some(contains) = &self.contains {
            if contains.is_valid(item) {
                return true;
            }
        }
        if let Some(conditional) = &self.conditional {
            if conditional.claims(instance, item, index) {
                return true;
            }
        }
        if let Some(reference) = &self.reference {
            if reference.claims(instance, item, index) {
                return true;
            }
        }
        self.subschemas.iter().any(|(node, subvalidator)| {
            node.is_valid(instance) && subvalidator.claims(instance, item, index)
        })
    }
}

impl ConditionalSubvalidator {
    fn compile(
        condition: &Value,
        success: Option<&Value>,
        failure: Option<&Value>,
        context: &CompilationContext,
        seen: &mut AHashSet<String>,
    ) -> Result<Self, SchemaError> {
        let node = compile_validators(condition, &context.with_path("if"))?;
        let in_if = condition
            .as_object()
            .map(|object| {
                UnevaluatedItemsValidator::compile(
                    object,
                    get_unevaluated_items_schema(object),
                    context,
                    seen,
                )
            })
            .transpose()?;
        let success = success
            .and_then(Value::as_object)
            .map(|object| {
                UnevaluatedItemsValidator::compile(
                    object,
                    get_unevaluated_items_schema(object),
                    context,
                    seen,
                )
            })
            .transpose()?;
        let failure = failure
            .and_then(Value::as_object)
            .map(|object| {
                UnevaluatedItemsValidator::compile(
                    object,
                    get_unevaluated_items_schema(object),
                    context,
                    seen,
                )
            })
            .transpose()?;
        Ok(ConditionalSubvalidator {
            condition: node,
            in_if,
            success,
            failure,
        })
    }

    fn claims(&self, instance: &Value, item: &Value, index: usize) -> bool {
        if self.condition.is_valid(instance) {
            self.in_if
                .as_ref()
                .map_or(false, |sub| sub.claims(instance, item, index))
                || self
                    .success
                    .as_ref()
                    .map_or(false, |sub| sub.claims(instance, item, index))
        } else {
            self.failure
                .as_ref()
                .map_or(false, |sub| sub.claims(instance, item, index))
        }
    }
}

impl Validate for UnevaluatedItemsValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Array(items) = instance {
            items.iter().enumerate().all(|(index, item)| {
                self.claims(instance, item, index)
                    || match &self.unevaluated {
                        UnevaluatedBehavior::Deny => false,
                        UnevaluatedBehavior::IfValid(node) => node.is_valid(item),
                    }
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
        if let Value::Array(items) = instance {
            let mut errors = vec![];
            for (index, item) in items.iter().enumerate() {
                if self.claims(instance, item, index) {
                    continue;
                }
                let item_path = instance_path.push(index);
                match &self.unevaluated {
                    UnevaluatedBehavior::Deny => {
                        errors.push(ValidationError::unevaluated_items(
                            self.schema_path.clone(),
                            (&item_path).into(),
                            item,
                            vec![index],
                        ));
                    }
                    UnevaluatedBehavior::IfValid(node) => {
                        errors.extend(node.validate(item, &item_path));
                    }
                }
            }
            Box::new(errors.into_iter())
        } else {
            no_error()
        }
    }
}

impl core::fmt::Display for UnevaluatedItemsValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.unevaluated {
            UnevaluatedBehavior::Deny => f.write_str("unevaluatedItems: false"),
            UnevaluatedBehavior::IfValid(node) => write!(f, "unevaluatedItems: {}", node),
        }
    }
}

pub(crate) fn compile(
    parent: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    if let Value::Bool(true) = schema {
        return None;
    }
    let mut seen = AHashSet::new();
    match UnevaluatedItemsValidator::compile(parent, schema, context, &mut seen) {
        Ok(compiled) => Some(Ok(Box::new(compiled))),
        Err(error) => Some(Err(error)),
    }
}
