//! Configuration for schema compilation.
use super::{compile_validators, context::CompilationContext, Validator, DEFAULT_SCOPE};
use crate::{
    content_encoding::{
        ContentEncodingCheckType, ContentEncodingConverterType,
        DEFAULT_CONTENT_ENCODING_CHECKS_AND_CONVERTERS,
    },
    content_media_type::{ContentMediaTypeCheckType, DEFAULT_CONTENT_MEDIA_TYPE_CHECKS},
    error::SchemaError,
    resolver::{Registry, SchemaResolver, META_SCHEMAS},
    schemas::{self, Draft},
};
use ahash::AHashMap;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::{fmt, sync::Arc};
use url::Url;

pub(crate) type FormatCheckType = fn(&str) -> bool;

const EXPECT_MESSAGE: &str = "Invalid meta-schema";

// Input schemas are validated against their meta-schema before compilation. The multi-document
// 2019-09/2020-12 meta-schemas are only served through the resolver; self-validation covers the
// single-document dialects.
static META_SCHEMA_VALIDATORS: Lazy<AHashMap<Draft, Validator>> = Lazy::new(|| {
    let mut store = AHashMap::with_capacity(3);
    for (draft, uri) in [
        (Draft::Draft4, "http://json-schema.org/draft-04/schema"),
        (Draft::Draft6, "http://json-schema.org/draft-06/schema"),
        (Draft::Draft7, "http://json-schema.org/draft-07/schema"),
    ] {
        let meta = META_SCHEMAS.get(uri).expect(EXPECT_MESSAGE);
        let mut options = CompilationOptions::default();
        options.with_draft(draft).without_schema_validation();
        store.insert(draft, options.compile(meta).expect(EXPECT_MESSAGE));
    }
    store
});

/// Full configuration to guide `Validator` compilation.
///
/// Using a `CompilationOptions` instance you can configure the supported draft, external
/// document resolution, format validation and more (check the exposed methods).
#[derive(Clone)]
pub struct CompilationOptions {
    draft: Option<Draft>,
    base_uri: Option<Url>,
    store: Vec<(String, Arc<Value>)>,
    resolvers: Vec<Arc<dyn SchemaResolver>>,
    formats: AHashMap<String, FormatCheckType>,
    validate_formats: Option<bool>,
    ignore_unknown_formats: bool,
    content_media_type_checks: AHashMap<&'static str, Option<ContentMediaTypeCheckType>>,
    content_encoding_checks_and_converters:
        AHashMap<&'static str, Option<(ContentEncodingCheckType, ContentEncodingConverterType)>>,
    defaults_injection: bool,
    validate_schema: bool,
}

impl Default for CompilationOptions {
    fn default() -> Self {
        CompilationOptions {
            draft: None,
            base_uri: None,
            store: Vec::new(),
            resolvers: Vec::new(),
            formats: AHashMap::new(),
            validate_formats: None,
            ignore_unknown_formats: true,
            content_media_type_checks: AHashMap::new(),
            content_encoding_checks_and_converters: AHashMap::new(),
            defaults_injection: false,
            validate_schema: true,
        }
    }
}

impl CompilationOptions {
    pub(crate) fn draft(&self) -> Draft {
        self.draft.unwrap_or_default()
    }

    /// Compile `schema` into a `Validator` using the currently defined options.
    pub fn compile(&self, schema: &Value) -> Result<Validator, SchemaError> {
        // Draft is detected in the following precedence order:
        //   - Explicitly specified;
        //   - $schema field in the document;
        //   - Draft::default()
        let mut config = self.clone();
        if config.draft.is_none() {
            if let Some(dialect) = schemas::dialect_of(schema) {
                config.draft = Some(schemas::draft_from_url(dialect).ok_or_else(|| {
                    SchemaError::UnknownDialect {
                        uri: dialect.to_string(),
                    }
                })?);
            }
        }
        let draft = config.draft();

        let scope = match schemas::id_of(draft, schema) {
            Some(id) => {
                let base = config.base_uri.clone().unwrap_or_else(|| DEFAULT_SCOPE.clone());
                let mut scope =
                    Url::options()
                        .base_url(Some(&base))
                        .parse(id)
                        .map_err(|_| SchemaError::InvalidUrl {
                            reference: id.to_string(),
                            location: base.to_string(),
                        })?;
                if scope.fragment().is_some() {
                    scope.set_fragment(None);
                }
                scope
            }
            None => config
                .base_uri
                .clone()
                .unwrap_or_else(|| DEFAULT_SCOPE.clone()),
        };

        if config.validate_schema {
            if let Some(meta_validator) = META_SCHEMA_VALIDATORS.get(&draft) {
                if let Err(mut errors) = meta_validator.validate(schema) {
                    let first = errors.next().expect("Should have at least one element");
                    return Err(SchemaError::MetaSchema {
                        message: first.to_string(),
                    });
                }
            }
        }

        let registry = Arc::new(Registry::new(
            draft,
            &scope,
            Arc::new(schema.clone()),
            &config.store,
            config.resolvers.clone(),
        )?);
        let config = Arc::new(config);
        let context = CompilationContext::new(
            scope,
            Arc::clone(&config),
            Arc::clone(&registry),
            draft,
        );
        let root = compile_validators(schema, &context)?;
        Ok(Validator {
            root,
            config,
            registry,
        })
    }

    /// Ensure that the schema is compiled using the defined draft regardless of its `$schema`.
    ///
    /// ```rust
    /// # use jschema::Draft;
    /// # let mut options = jschema::options();
    /// options.with_draft(Draft::Draft4);
    /// ```
    #[inline]
    pub fn with_draft(&mut self, draft: Draft) -> &mut Self {
        self.draft = Some(draft);
        self
    }

    /// The base URI against which a relative root `$id` (or a schema without any `$id`) is
    /// resolved.
    #[inline]
    pub fn with_base_uri(&mut self, base_uri: Url) -> &mut Self {
        self.base_uri = Some(base_uri);
        self
    }

    /// Append a resolver for external schema documents to the resolver chain.
    ///
    /// Resolvers are consulted in registration order with the fragment-less document URI; the
    /// first one returning `Some` wins. The bundled meta-schema resolver is always the last
    /// entry in the chain.
    #[inline]
    pub fn with_resolver(&mut self, resolver: impl SchemaResolver + 'static) -> &mut Self {
        self.resolvers.push(Arc::new(resolver));
        self
    }

    /// Add a document to the registry ahead of compilation. Works as a cache that avoids
    /// consulting resolvers for the given URI.
    #[inline]
    pub fn with_document(&mut self, id: String, document: Value) -> &mut Self {
        self.store.push((id, Arc::new(document)));
        self
    }

    /// Register a custom format validator.
    ///
    /// ```rust
    /// # use serde_json::json;
    /// fn ends_with_42(value: &str) -> bool {
    ///     value.ends_with("42!")
    /// }
    ///
    /// let validator = jschema::options()
    ///     .with_format("ends-with-42", ends_with_42)
    ///     .should_validate_formats(true)
    ///     .compile(&json!({"type": "string", "format": "ends-with-42"}))
    ///     .expect("Invalid schema");
    /// assert!(validator.is_valid(&json!("Hello 42!")));
    /// assert!(!validator.is_valid(&json!("Hello")));
    /// ```
    #[inline]
    pub fn with_format(&mut self, name: impl Into<String>, check: FormatCheckType) -> &mut Self {
        self.formats.insert(name.into(), check);
        self
    }

    /// Force format validation on or off. Without an explicit setting, Draft 4/6/7 validate
    /// formats and 2019-09/2020-12 treat them as annotations.
    #[inline]
    pub fn should_validate_formats(&mut self, validate_formats: bool) -> &mut Self {
        self.validate_formats = Some(validate_formats);
        self
    }

    /// Whether unknown format names are silently accepted (the default) or rejected at
    /// compile time.
    #[inline]
    pub fn should_ignore_unknown_formats(&mut self, ignore: bool) -> &mut Self {
        self.ignore_unknown_formats = ignore;
        self
    }

    /// Collect `default` values declared for missing properties; see
    /// [`Validator::default_patch`].
    #[inline]
    pub fn with_defaults_injection(&mut self) -> &mut Self {
        self.defaults_injection = true;
        self
    }

    /// Ensure that the compiled schema is going to support the provided content media type.
    pub fn with_content_media_type(
        &mut self,
        media_type: &'static str,
        media_type_check: ContentMediaTypeCheckType,
    ) -> &mut Self {
        self.content_media_type_checks
            .insert(media_type, Some(media_type_check));
        self
    }

    /// Ensure that the compiled schema is not supporting the provided content media type.
    pub fn without_content_media_type_support(&mut self, media_type: &'static str) -> &mut Self {
        self.content_media_type_checks.insert(media_type, None);
        self
    }

    /// Ensure that the compiled schema is going to support the provided content encoding.
    pub fn with_content_encoding(
        &mut self,
        content_encoding: &'static str,
        content_encoding_check: ContentEncodingCheckType,
        content_encoding_converter: ContentEncodingConverterType,
    ) -> &mut Self {
        self.content_encoding_checks_and_converters.insert(
            content_encoding,
            Some((content_encoding_check, content_encoding_converter)),
        );
        self
    }

    /// Ensure that the compiled schema is not supporting the provided content encoding.
    pub fn without_content_encoding_support(
        &mut self,
        content_encoding: &'static str,
    ) -> &mut Self {
        self.content_encoding_checks_and_converters
            .insert(content_encoding, None);
        self
    }

    /// Skip validation of the input schema against its meta-schema.
    #[inline]
    pub fn without_schema_validation(&mut self) -> &mut Self {
        self.validate_schema = false;
        self
    }

    pub(crate) fn validate_formats(&self) -> Option<bool> {
        self.validate_formats
    }

    pub(crate) fn is_unknown_format_ignored(&self) -> bool {
        self.ignore_unknown_formats
    }

    pub(crate) fn defaults_injection(&self) -> bool {
        self.defaults_injection
    }

    pub(crate) fn format(&self, name: &str) -> Option<(&str, FormatCheckType)> {
        self.formats
            .get_key_value(name)
            .map(|(key, check)| (key.as_str(), *check))
    }

    pub(crate) fn content_media_type_check(
        &self,
        media_type: &str,
    ) -> Option<ContentMediaTypeCheckType> {
        if let Some(value) = self.content_media_type_checks.get(media_type) {
            *value
        } else {
            DEFAULT_CONTENT_MEDIA_TYPE_CHECKS.get(media_type).copied()
        }
    }

    fn content_encoding_check_and_converter(
        &self,
        content_encoding: &str,
    ) -> Option<(ContentEncodingCheckType, ContentEncodingConverterType)> {
        if let Some(value) = self
            .content_encoding_checks_and_converters
            .get(content_encoding)
        {
            *value
        } else {
            DEFAULT_CONTENT_ENCODING_CHECKS_AND_CONVERTERS
                .get(content_encoding)
                .copied()
        }
    }

    pub(crate) fn content_encoding_check(
        &self,
        content_encoding: &str,
    ) -> Option<ContentEncodingCheckType> {
        self.content_encoding_check_and_converter(content_encoding)
            .map(|(check, _)| check)
    }

    pub(crate) fn content_encoding_convert(
        &self,
        content_encoding: &str,
    ) -> Option<ContentEncodingConverterType> {
        self.content_encoding_check_and_converter(content_encoding)
            .map(|(_, converter)| converter)
    }
}

impl fmt::Debug for CompilationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilationOptions")
            .field("draft", &self.draft)
            .field("base_uri", &self.base_uri)
            .field("formats", &self.formats.keys())
            .field("validate_formats", &self.validate_formats)
            .field("content_media_type", &self.content_media_type_checks.keys())
            .field(
                "content_encoding",
                &self.content_encoding_checks_and_converters.keys(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::schemas::Draft;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(Some(Draft::Draft4), &json!({}) => Draft::Draft4)]
    #[test_case(None, &json!({"$schema": "http://json-schema.org/draft-06/schema#"}) => Draft::Draft6)]
    #[test_case(None, &json!({}) => Draft::default())]
    fn draft_detection_is_honored(explicit: Option<Draft>, schema: &Value) -> Draft {
        let mut options = crate::options();
        if let Some(draft) = explicit {
            options.with_draft(draft);
        }
        options.compile(schema).unwrap().draft()
    }

    #[test]
    fn unknown_dialect_is_rejected() {
        let schema = json!({"$schema": "http://example.com/custom/schema#"});
        assert!(matches!(
            crate::compile(&schema),
            Err(crate::SchemaError::UnknownDialect { .. })
        ));
    }

    #[test]
    fn with_document() {
        let schema = json!({"$ref": "http://example.json/schema.json#/rule"});
        let validator = crate::options()
            .with_document(
                "http://example.json/schema.json".to_string(),
                json!({"rule": {"minLength": 5}}),
            )
            .compile(&schema)
            .unwrap();
        assert!(!validator.is_valid(&json!("foo")));
        assert!(validator.is_valid(&json!("foobar")));
    }

    #[test]
    fn meta_schema_validation() {
        let schema = json!({"properties": {"foo": {"exclusiveMaximum": 3}}});
        let error = crate::options()
            .with_draft(Draft::Draft4)
            .compile(&schema)
            .expect_err("Boolean form is required in Draft 4");
        assert!(matches!(error, crate::SchemaError::MetaSchema { .. }));
    }
}
