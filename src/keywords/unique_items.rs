use crate::{
    compilation::context::CompilationContext,
    error::{error, no_error, ErrorIterator, ValidationError},
    keywords::{helpers::equal, CompilationResult},
    paths::{InstancePath, JSONPointer},
    primitive_type::PrimitiveType,
    validator::Validate,
};
use ahash::{AHashSet, AHasher};
use serde_json::{Map, Value};
use std::hash::{Hash, Hasher};

// Based on the implementation proposed by Sven Marnach:
// https://stackoverflow.com/questions/60882381/what-is-the-fastest-correct-way-to-detect-that-there-are-no-duplicates-in-a-json
#[derive(PartialEq)]
pub(crate) struct HashedValue<'a>(&'a Value);

impl Eq for HashedValue<'_> {}

impl Hash for HashedValue<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.0 {
            Value::Null => state.write_u32(3_221_225_473), // chosen randomly
            Value::Bool(item) => item.hash(state),
            Value::Number(item) => {
                if let Some(number) = item.as_u64() {
                    number.hash(state);
                } else if let Some(number) = item.as_i64() {
                    number.hash(state);
                } else if let Some(number) = item.as_f64() {
                    number.to_bits().hash(state);
                }
            }
            Value::String(item) => item.hash(state),
            Value::Array(items) => {
                for item in items {
                    HashedValue(item).hash(state);
                }
            }
            Value::Object(items) => {
                let mut hash = 0;
                for (key, value) in items {
                    // We have no way of building a new hasher of type `H`, so we
                    // hardcode using the default hasher of a hash map.
                    let mut item_hasher = AHasher::default();
                    key.hash(&mut item_hasher);
                    HashedValue(value).hash(&mut item_hasher);
                    hash ^= item_hasher.finish();
                }
                state.write_u64(hash);
            }
        }
    }
}

// Empirically calculated threshold after which the validator resorts to hashing.
// Calculated for an array of mixed types; large homogenous arrays of primitive values might be
// processed faster with different thresholds, but this one gives a good baseline for the
// common case.
const ITEMS_SIZE_THRESHOLD: usize = 11;

#[inline]
pub(crate) fn is_unique(items: &[Value]) -> bool {
    let size = items.len();
    if size <= 1 {
        true
    } else if size <= ITEMS_SIZE_THRESHOLD {
        for (idx, item) in items.iter().enumerate() {
            for other in items.iter().skip(idx + 1) {
                if equal(item, other) {
                    return false;
                }
            }
        }
        true
    } else {
        let mut seen = AHashSet::with_capacity(size);
        items.iter().map(HashedValue).all(move |item| seen.insert(item))
    }
}

pub(crate) struct UniqueItemsValidator {
    schema_path: JSONPointer,
}

impl Validate for UniqueItemsValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::Array(items) = instance {
            is_unique(items)
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
            error(ValidationError::unique_items(
                self.schema_path.clone(),
                instance_path.into(),
                instance,
            ))
        }
    }
}

impl core::fmt::Display for UniqueItemsValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("uniqueItems: true")
    }
}

#[inline]
pub(crate) fn compile(
    _: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    match schema {
        Value::Bool(value) => {
            if *value {
                Some(Ok(Box::new(UniqueItemsValidator {
                    schema_path: context.as_pointer_with("uniqueItems"),
                })))
            } else {
                None
            }
        }
        _ => Some(Err(context.unexpected_type(schema, PrimitiveType::Boolean))),
    }
}

#[cfg(test)]
mod tests {
    use crate::tests_util;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!([1, 2, 3]))]
    #[test_case(&json!([{"a": 1}, {"a": 2}]))]
    #[test_case(&json!([[1], [2]]))]
    fn unique(instance: &Value) {
        tests_util::is_valid(&json!({"uniqueItems": true}), instance);
    }

    #[test_case(&json!([1, 1]); "not_unique_plain_integers")]
    #[test_case(&json!([1, 1.0]); "numeric equivalence across representations")]
    #[test_case(&json!([{"a": [1]}, {"a": [1.0]}]); "deep numeric equivalence")]
    #[test_case(&json!([[1], [1]]); "not_unique_nested_arrays")]
    #[test_case(&json!([null, null]); "not_unique_nulls")]
    fn not_unique(instance: &Value) {
        tests_util::is_not_valid(&json!({"uniqueItems": true}), instance);
    }

    #[test]
    fn uniqueness_is_not_required_when_false() {
        tests_util::is_valid(&json!({"uniqueItems": false}), &json!([1, 1]));
    }

    #[test]
    fn large_arrays_use_hashing() {
        let mut items: Vec<Value> = (0..20).map(Value::from).collect();
        tests_util::is_valid(&json!({"uniqueItems": true}), &json!(items));
        items.push(json!(0));
        tests_util::is_not_valid(&json!({"uniqueItems": true}), &json!(items));
    }
}
