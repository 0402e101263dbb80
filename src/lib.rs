//! A JSON Schema compiler and validator for Rust.
//!
//! - Supports Drafts 4, 6, 7, 2019-09 and 2020-12, with per-dialect keyword sets
//! - Resolves `$id` scopes, anchors, `$dynamicRef` / `$recursiveRef` and external documents
//!   through caller-supplied resolvers
//! - `basic` output style as per the JSON Schema specification
//! - JSON Patch generation for declared `default` values
//!
//! # Validation
//!
//! For a one-off check use the [`is_valid`] shortcut:
//!
//! ```rust
//! use serde_json::json;
//!
//! let schema = json!({"type": "string"});
//! let instance = json!("Hello, world!");
//!
//! assert!(jschema::is_valid(&schema, &instance));
//! ```
//!
//! For better performance, especially when validating multiple instances against the same
//! schema, compile a [`Validator`] once and reuse it:
//!
//! ```rust
//! use serde_json::json;
//!
//! let schema = json!({"type": "string"});
//! let validator = jschema::compile(&schema).expect("Invalid schema");
//!
//! assert!(validator.is_valid(&json!("Hello, world!")));
//! assert!(!validator.is_valid(&json!(42)));
//!
//! // Iterate over all errors
//! if let Err(errors) = validator.validate(&json!(42)) {
//!     for error in errors {
//!         eprintln!("Error: {}", error);
//!         eprintln!("Location: {}", error.instance_path);
//!     }
//! };
//! ```
//!
//! # Configuration
//!
//! Compilation is configured through [`CompilationOptions`]:
//!
//! ```rust
//! use jschema::Draft;
//! use serde_json::json;
//!
//! let schema = json!({"type": "string"});
//! let validator = jschema::options()
//!     .with_draft(Draft::Draft7)
//!     .compile(&schema)
//!     .expect("Invalid schema");
//! ```
//!
//! # External references
//!
//! The compiler performs no I/O. Schemas referring to external documents need a resolver:
//!
//! ```rust
//! use jschema::SchemaResolver;
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//! use url::Url;
//!
//! struct StaticResolver;
//!
//! impl SchemaResolver for StaticResolver {
//!     fn resolve(&self, url: &Url) -> Option<Arc<Value>> {
//!         (url.as_str() == "http://example.com/string.json")
//!             .then(|| Arc::new(json!({"type": "string"})))
//!     }
//! }
//!
//! let schema = json!({"$ref": "http://example.com/string.json"});
//! let validator = jschema::options()
//!     .with_resolver(StaticResolver)
//!     .compile(&schema)
//!     .expect("Invalid schema");
//! assert!(validator.is_valid(&json!("abc")));
//! assert!(!validator.is_valid(&json!(1)));
//! ```
//!
//! The meta-schemas of all supported dialects are bundled and always resolvable by their
//! canonical URIs.
#![warn(
    clippy::doc_markdown,
    clippy::redundant_closure,
    clippy::explicit_iter_loop,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::print_stdout,
    clippy::integer_division,
    missing_docs
)]
mod compilation;
mod content_encoding;
mod content_media_type;
pub mod error;
mod keywords;
pub mod output;
pub mod patch;
pub mod paths;
pub mod primitive_type;
pub(crate) mod properties;
mod resolver;
mod schema_node;
mod schemas;
mod validator;

pub use compilation::{options::CompilationOptions, Validator};
pub use error::{ErrorIterator, SchemaError, ValidationError};
pub use output::BasicOutput;
pub use patch::PatchOperation;
pub use resolver::SchemaResolver;
pub use schemas::Draft;

use serde_json::Value;

/// A shortcut for validating `instance` against `schema`. The draft version is detected
/// automatically.
///
/// ```rust
/// use serde_json::json;
///
/// let schema = json!({"maxLength": 5});
/// let instance = json!("foo");
/// assert!(jschema::is_valid(&schema, &instance));
/// ```
///
/// This function panics if an invalid schema is passed.
#[must_use]
#[inline]
pub fn is_valid(schema: &Value, instance: &Value) -> bool {
    let compiled = compile(schema).expect("Invalid schema");
    compiled.is_valid(instance)
}

/// Compile the input schema for faster validation.
pub fn compile(schema: &Value) -> Result<Validator, SchemaError> {
    Validator::compile(schema)
}

/// Return default [`CompilationOptions`] for configuring schema compilation.
#[must_use]
pub fn options() -> CompilationOptions {
    Validator::options()
}

#[cfg(test)]
pub(crate) mod tests_util {
    use super::Validator;
    use crate::ValidationError;
    use serde_json::Value;

    pub(crate) fn is_not_valid_with(compiled: &Validator, instance: &Value) {
        assert!(
            !compiled.is_valid(instance),
            "{} should not be valid (via is_valid)",
            instance
        );
        assert!(
            compiled.validate(instance).is_err(),
            "{} should not be valid (via validate)",
            instance
        );
        assert!(
            !compiled.apply(instance).basic().is_valid(),
            "{} should not be valid (via apply)",
            instance
        );
    }

    pub(crate) fn is_not_valid(schema: &Value, instance: &Value) {
        let compiled = Validator::compile(schema).unwrap();
        is_not_valid_with(&compiled, instance);
    }

    pub(crate) fn is_not_valid_with_draft(draft: crate::Draft, schema: &Value, instance: &Value) {
        let compiled = Validator::options()
            .with_draft(draft)
            .compile(schema)
            .unwrap();
        is_not_valid_with(&compiled, instance);
    }

    pub(crate) fn is_valid_with(compiled: &Validator, instance: &Value) {
        if let Err(mut errors) = compiled.validate(instance) {
            let first = errors.next().expect("Errors iterator is empty");
            panic!(
                "{} should be valid (via validate). Error: {} at {}",
                instance, first, first.instance_path
            );
        }
        assert!(
            compiled.is_valid(instance),
            "{} should be valid (via is_valid)",
            instance
        );
        assert!(
            compiled.apply(instance).basic().is_valid(),
            "{} should be valid (via apply)",
            instance
        );
    }

    pub(crate) fn is_valid(schema: &Value, instance: &Value) {
        let compiled = Validator::compile(schema).unwrap();
        is_valid_with(&compiled, instance);
    }

    pub(crate) fn is_valid_with_draft(draft: crate::Draft, schema: &Value, instance: &Value) {
        let compiled = Validator::options()
            .with_draft(draft)
            .compile(schema)
            .unwrap();
        is_valid_with(&compiled, instance);
    }

    pub(crate) fn expect_errors(schema: &Value, instance: &Value, errors: &[&str]) {
        assert_eq!(
            Validator::compile(schema)
                .expect("Should be a valid schema")
                .validate(instance)
                .expect_err(format!("{} should not be valid", instance).as_str())
                .map(|error| error.to_string())
                .collect::<Vec<String>>(),
            errors
        );
    }

    pub(crate) fn validate(schema: &Value, instance: &Value) -> ValidationError<'static> {
        let compiled = Validator::compile(schema).unwrap();
        let error = compiled
            .validate(instance)
            .expect_err("Should be an error")
            .next()
            .expect("Should be an error")
            .into_owned();
        error
    }

    pub(crate) fn assert_schema_path(schema: &Value, instance: &Value, expected: &str) {
        let error = validate(schema, instance);
        assert_eq!(error.schema_path.to_string(), expected);
    }

    pub(crate) fn assert_instance_path(schema: &Value, instance: &Value, expected: &str) {
        let error = validate(schema, instance);
        assert_eq!(error.instance_path.to_string(), expected);
    }
}

#[cfg(test)]
mod tests {
    use super::{is_valid, Draft, Validator};
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn test_is_valid() {
        let schema = json!({"minLength": 5});
        assert!(is_valid(&schema, &json!("foobar")));
        assert!(!is_valid(&schema, &json!("foo")));
    }

    #[test_case(Draft::Draft4)]
    #[test_case(Draft::Draft6)]
    #[test_case(Draft::Draft7)]
    fn empty_enum_compiles(draft: Draft) {
        for schema in [json!({"enum": [0, 0.0]}), json!({"enum": []})] {
            assert!(Validator::options()
                .with_draft(draft)
                .compile(&schema)
                .is_ok());
        }
    }

    #[test]
    fn boolean_schemas() {
        assert!(is_valid(&json!(true), &json!([1, "a", null])));
        assert!(!is_valid(&json!(false), &json!([1, "a", null])));
        assert!(is_valid(&json!({}), &json!([1, "a", null])));
    }
}
