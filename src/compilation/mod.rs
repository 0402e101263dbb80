//! Schema compilation.
//! The input JSON Schema is compiled into a tree of validators that contains everything needed
//! to perform validation at runtime.
pub(crate) mod context;
pub(crate) mod options;

use crate::{
    error::{ErrorIterator, SchemaError},
    keywords,
    output::Output,
    patch::PatchOperation,
    paths::InstancePath,
    primitive_type::{PrimitiveType, PrimitiveTypesBitMap},
    resolver::Registry,
    schema_node::SchemaNode,
    schemas::Draft,
    validator::Validate,
};
use ahash::AHashMap;
use context::CompilationContext;
use once_cell::sync::Lazy;
use options::CompilationOptions;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

pub(crate) const DEFAULT_ROOT_URL: &str = "json-schema:///";
pub(crate) const DEFAULT_SCHEME: &str = "json-schema";

pub(crate) static DEFAULT_SCOPE: Lazy<Url> =
    Lazy::new(|| Url::parse(DEFAULT_ROOT_URL).expect("Is a valid URL"));

/// A compiled JSON Schema.
///
/// The schema document is parsed once into a tree of keyword validators; the result is immutable
/// and safe for concurrent use from multiple threads.
pub struct Validator {
    pub(crate) root: SchemaNode,
    pub(crate) config: Arc<CompilationOptions>,
    // Keeps registered documents alive for lazily compiled reference targets
    #[allow(dead_code)]
    pub(crate) registry: Arc<Registry>,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("root", &self.root)
            .field("config", &self.config)
            .finish()
    }
}

impl Validator {
    /// Return default [`CompilationOptions`] that can configure schema compilation.
    ///
    /// ```rust
    /// # use jschema::{Draft, Validator};
    /// # let schema = serde_json::json!({});
    /// let validator = Validator::options()
    ///     .with_draft(Draft::Draft7)
    ///     .compile(&schema);
    /// ```
    #[must_use]
    pub fn options() -> CompilationOptions {
        CompilationOptions::default()
    }

    /// Compile the input schema into a validation tree using the default options.
    pub fn compile(schema: &Value) -> Result<Validator, SchemaError> {
        Self::options().compile(schema)
    }

    /// Run validation against `instance` and return an iterator over [`crate::ValidationError`]
    /// in the error case.
    #[inline]
    pub fn validate<'instance>(
        &'instance self,
        instance: &'instance Value,
    ) -> Result<(), ErrorIterator<'instance>> {
        let instance_path = InstancePath::new();
        let mut errors = self.root.validate(instance, &instance_path).peekable();
        if errors.peek().is_none() {
            Ok(())
        } else {
            Err(Box::new(errors))
        }
    }

    /// Run validation against `instance` but return a boolean result instead of an iterator.
    /// It is useful for cases where it is important to only know whether the data is valid.
    /// This approach is much faster than [`Validator::validate`].
    #[must_use]
    #[inline]
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.root.is_valid(instance)
    }

    /// Apply the schema and return an [`Output`]. No actual work is done at this point; the
    /// evaluation of the schema is deferred until a method is called on the `Output`, because
    /// different output formats have different performance characteristics.
    ///
    /// # Examples
    ///
    /// "basic" output format:
    ///
    /// ```rust
    /// # use jschema::BasicOutput;
    /// let schema_json = serde_json::json!({
    ///     "title": "string value",
    ///     "type": "string"
    /// });
    /// let instance = serde_json::json!("some string");
    /// let validator = jschema::compile(&schema_json).unwrap();
    /// let output: BasicOutput = validator.apply(&instance).basic();
    /// let output_json = serde_json::to_value(output).unwrap();
    /// assert_eq!(output_json, serde_json::json!({
    ///     "valid": true,
    ///     "annotations": [
    ///         {
    ///             "keywordLocation": "",
    ///             "instanceLocation": "",
    ///             "annotations": {
    ///                 "title": "string value"
    ///             }
    ///         }
    ///     ]
    /// }));
    /// ```
    #[must_use]
    pub const fn apply<'a, 'b>(&'a self, instance: &'b Value) -> Output<'a, 'b> {
        Output::new(self, &self.root, instance)
    }

    /// Produce a JSON Patch document that, applied to `instance`, inserts declared `default`
    /// values for missing properties. Requires
    /// [`CompilationOptions::with_defaults_injection`]; otherwise the patch is always empty.
    /// Validation violations are not suppressed by this mode; run [`Validator::validate`]
    /// separately to obtain them.
    #[must_use]
    pub fn default_patch(&self, instance: &Value) -> Vec<PatchOperation> {
        let mut patch = Vec::new();
        self.root
            .collect_defaults(instance, &InstancePath::new(), &mut patch);
        patch
    }

    /// The [`Draft`] which this schema was compiled against.
    #[must_use]
    pub fn draft(&self) -> Draft {
        self.config.draft()
    }

    /// The [`CompilationOptions`] that were used to compile this schema.
    #[must_use]
    pub fn config(&self) -> Arc<CompilationOptions> {
        Arc::clone(&self.config)
    }
}

/// Compile a JSON Schema value into a tree of validators.
#[inline]
pub(crate) fn compile_validators(
    schema: &Value,
    context: &CompilationContext,
) -> Result<SchemaNode, SchemaError> {
    let context = context.push(schema)?;
    match schema {
        Value::Bool(value) => Ok(SchemaNode::from_boolean(
            &context,
            if *value {
                None
            } else {
                Some(keywords::boolean::FalseValidator::compile(
                    context.clone().into_pointer(),
                ))
            },
        )),
        Value::Object(object) => {
            // In Draft 2019-09 and later, `$ref` is evaluated alongside other keywords
            // ("adjacent validation"). Earlier drafts ignore every sibling of `$ref`, so it is
            // isolated here and the siblings are kept as annotations.
            let maybe_reference = object
                .get("$ref")
                .filter(|_| !context.supports_adjacent_validation());
            if let Some(reference) = maybe_reference {
                let unmatched_keywords = object
                    .iter()
                    .filter_map(|(keyword, value)| {
                        if keyword == "$ref" {
                            None
                        } else {
                            Some((keyword.clone(), value.clone()))
                        }
                    })
                    .collect();
                let validator = keywords::ref_::compile_ref(object, reference, &context)
                    .expect("Should always return Some")?;
                let validators = vec![("$ref".to_string(), validator)];
                return Ok(SchemaNode::from_keywords(
                    &context,
                    validators,
                    Some(unmatched_keywords),
                ));
            }

            let mut validators = Vec::with_capacity(object.len());
            let mut unmatched_keywords = AHashMap::new();
            let mut is_if = false;
            let mut is_props = false;
            for (keyword, subschema) in object {
                if keyword == "if" {
                    is_if = true;
                }
                if keyword == "properties"
                    || keyword == "additionalProperties"
                    || keyword == "patternProperties"
                {
                    is_props = true;
                }
                if let Some(compile) = context.draft().get_validator(keyword) {
                    if let Some(validator) = compile(object, subschema, &context) {
                        validators.push((keyword.clone(), validator?));
                        continue;
                    }
                }
                if !context.draft().is_known_keyword(keyword) {
                    // Treat all non-validation keywords as annotations
                    unmatched_keywords.insert(keyword.clone(), subschema.clone());
                }
            }
            if is_if {
                unmatched_keywords.remove("then");
                unmatched_keywords.remove("else");
            }
            if is_props {
                unmatched_keywords.remove("additionalProperties");
                unmatched_keywords.remove("patternProperties");
                unmatched_keywords.remove("properties");
            }
            let unmatched_keywords = if unmatched_keywords.is_empty() {
                None
            } else {
                Some(unmatched_keywords)
            };
            Ok(SchemaNode::from_keywords(
                &context,
                validators,
                unmatched_keywords,
            ))
        }
        _ => Err(context.unexpected_types(
            schema,
            PrimitiveTypesBitMap::new()
                .add_type(PrimitiveType::Boolean)
                .add_type(PrimitiveType::Object),
        )),
    }
}
