//! JSON Patch operations produced by default-value collection.
use crate::paths::JSONPointer;
use serde_json::Value;

/// A single JSON Patch (RFC 6902) operation.
///
/// Only `add` is ever produced: an operation per property that is missing from
/// the instance while its schema declares a `default`. Serializes to the
/// standard wire form:
///
/// ```rust
/// use serde_json::json;
///
/// let schema = json!({"properties": {"bar": {"default": "bad", "minLength": 4}}});
/// let validator = jschema::options()
///     .with_defaults_injection()
///     .compile(&schema)
///     .expect("Invalid schema");
/// let patch = validator.default_patch(&json!({}));
/// assert_eq!(
///     serde_json::to_value(&patch).unwrap(),
///     json!([{"op": "add", "path": "/bar", "value": "bad"}])
/// );
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    /// Insert `value` at `path`.
    Add {
        /// Location of the missing property.
        path: JSONPointer,
        /// The declared default.
        value: Value,
    },
}

impl PatchOperation {
    pub(crate) fn add(path: JSONPointer, value: Value) -> Self {
        PatchOperation::Add { path, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_to_rfc_6902() {
        let op = PatchOperation::add((&["bar"][..]).into(), json!("bad"));
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({"op": "add", "path": "/bar", "value": "bad"})
        );
    }
}
