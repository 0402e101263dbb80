//! Error types.
//!
//! Two distinct domains are kept apart:
//!
//! - [`SchemaError`] is raised while a schema is being compiled. Every kind is
//!   fatal and carries the absolute URI of the offending schema site;
//!   compilation produces no partial result.
//! - [`ValidationError`] is produced while an instance is being evaluated. It
//!   is never raised as a panic and is always delivered through the returned
//!   iterator or output structures; evaluation always runs to completion.
use crate::{
    paths::JSONPointer,
    primitive_type::{PrimitiveType, PrimitiveTypesBitMap},
};
use serde_json::{Map, Number, Value};
use std::{
    borrow::Cow,
    error, fmt,
    iter::{empty, once},
};

/// An error that can occur during schema compilation.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A keyword received an argument of the wrong JSON type.
    #[error("{location}: expected {expected}, got `{found}`")]
    UnexpectedType {
        /// Absolute URI of the offending schema site.
        location: String,
        /// The JSON type the keyword requires.
        expected: PrimitiveTypesBitMap,
        /// The value found in the schema document.
        found: Value,
    },
    /// The `$schema` value is not a known dialect URI.
    #[error("unknown or unsupported dialect: {uri}")]
    UnknownDialect {
        /// The unrecognized `$schema` value.
        uri: String,
    },
    /// A reference could not be resolved to a schema, and no resolver supplied
    /// the missing document.
    #[error("{location}: unresolved reference `{reference}`")]
    UnresolvedReference {
        /// The reference as written in the schema.
        reference: String,
        /// Absolute URI of the referencing site.
        location: String,
    },
    /// A `$dynamicRef` with a plain-name fragment whose statically resolved
    /// schema does not declare the matching `$dynamicAnchor`.
    #[error("{location}: `$dynamicRef` has no matching `$dynamicAnchor` `{anchor}` in the referenced schema")]
    Bookending {
        /// The anchor name.
        anchor: String,
        /// Absolute URI of the referencing site.
        location: String,
    },
    /// A `pattern` or `patternProperties` value is not a valid regular expression.
    #[error("{location}: invalid regular expression `{pattern}`")]
    InvalidRegex {
        /// The rejected pattern.
        pattern: String,
        /// Absolute URI of the offending schema site.
        location: String,
    },
    /// `multipleOf` must be strictly greater than zero.
    #[error("{location}: `multipleOf` must be strictly greater than zero")]
    NonPositiveMultipleOf {
        /// Absolute URI of the offending schema site.
        location: String,
    },
    /// A reference or identifier is not a valid URI reference.
    #[error("{location}: invalid URI reference `{reference}`")]
    InvalidUrl {
        /// The rejected URI reference.
        reference: String,
        /// Absolute URI of the offending schema site.
        location: String,
    },
    /// An unknown `format` name in a configuration that forbids them.
    #[error("{location}: unknown format `{format}`")]
    UnknownFormat {
        /// The unrecognized format name.
        format: String,
        /// Absolute URI of the offending schema site.
        location: String,
    },
    /// The schema failed validation against its meta-schema.
    #[error("schema is not valid against its meta-schema: {message}")]
    MetaSchema {
        /// Rendered first violation.
        message: String,
    },
}

/// An iterator over instances of [`ValidationError`] produced for an input instance.
///
/// # Examples
///
/// ```rust
/// use serde_json::json;
///
/// let schema = json!({"maxLength": 5});
/// let instance = json!("foobar");
/// if let Ok(compiled) = jschema::compile(&schema) {
///     if let Err(errors) = compiled.validate(&instance) {
///         for error in errors {
///             println!("Validation error: {}", error);
///         }
///     }
/// }
/// ```
pub type ErrorIterator<'a> = Box<dyn Iterator<Item = ValidationError<'a>> + Sync + Send + 'a>;

// Empty iterator means no error happened
pub(crate) fn no_error<'a>() -> ErrorIterator<'a> {
    Box::new(empty())
}
// A wrapper for one error
pub(crate) fn error(instance: ValidationError) -> ErrorIterator<'_> {
    Box::new(once(instance))
}

/// A single violation produced during evaluation.
#[derive(Debug)]
pub struct ValidationError<'a> {
    /// Value of the property that failed validation.
    pub instance: Cow<'a, Value>,
    /// Type of validation error.
    pub kind: ValidationErrorKind,
    /// Path to the value that failed validation.
    pub instance_path: JSONPointer,
    /// Path to the keyword that failed validation.
    pub schema_path: JSONPointer,
}

/// Kinds of errors that may happen during evaluation.
#[derive(Debug)]
#[allow(missing_docs)]
pub enum ValidationErrorKind {
    /// The input array contains more items than expected.
    AdditionalItems { limit: usize },
    /// Unexpected properties.
    AdditionalProperties { unexpected: Vec<String> },
    /// The input value is not valid under any of the schemas listed in `anyOf`.
    AnyOf,
    /// The input value doesn't match the expected constant.
    Constant { expected_value: Value },
    /// The input array doesn't contain items conforming to the specified schema.
    Contains,
    /// The input value does not respect the defined contentEncoding.
    ContentEncoding { content_encoding: String },
    /// The input value does not respect the defined contentMediaType.
    ContentMediaType { content_media_type: String },
    /// The input value doesn't match any of the specified options.
    Enum { options: Value },
    /// Value is too large.
    ExclusiveMaximum { limit: Value },
    /// Value is too small.
    ExclusiveMinimum { limit: Value },
    /// Everything is invalid for the `false` schema.
    FalseSchema,
    /// The input doesn't match the specified format.
    Format { format: String },
    /// Too many items in an array.
    MaxItems { limit: u64 },
    /// Value is too large.
    Maximum { limit: Value },
    /// String is too long.
    MaxLength { limit: u64 },
    /// Too many properties in an object.
    MaxProperties { limit: u64 },
    /// Too many matches for the `contains` schema.
    MaxContains { limit: u64 },
    /// Too few items in an array.
    MinItems { limit: u64 },
    /// Value is too small.
    Minimum { limit: Value },
    /// String is too short.
    MinLength { limit: u64 },
    /// Not enough properties in an object.
    MinProperties { limit: u64 },
    /// Too few matches for the `contains` schema.
    MinContains { limit: u64 },
    /// The number is not a multiple of another number.
    MultipleOf { multiple_of: f64 },
    /// Negated schema failed validation.
    Not { schema: Value },
    /// The given instance is valid under more than one of the schemas listed in `oneOf`.
    OneOfMultipleValid,
    /// The given instance is not valid under any of the schemas listed in `oneOf`.
    OneOfNotValid,
    /// The input doesn't match the pattern.
    Pattern { pattern: String },
    /// A required property is missing.
    Required { property: String },
    /// The input value doesn't match one or multiple required types.
    Type { kind: TypeKind },
    /// An unevaluated property is not allowed.
    UnevaluatedProperties { unexpected: Vec<String> },
    /// An unevaluated array item is not allowed.
    UnevaluatedItems { unexpected: Vec<usize> },
    /// The input array has non-unique elements.
    UniqueItems,
}

#[derive(Debug)]
#[allow(missing_docs)]
pub enum TypeKind {
    Single(PrimitiveType),
    Multiple(PrimitiveTypesBitMap),
}

/// Shortcuts for creation of specific error kinds.
impl<'a> ValidationError<'a> {
    /// Convert the borrowed instance into an owned one, extending the error lifetime.
    #[must_use]
    pub fn into_owned(self) -> ValidationError<'static> {
        ValidationError {
            instance: Cow::Owned(self.instance.into_owned()),
            kind: self.kind,
            instance_path: self.instance_path,
            schema_path: self.schema_path,
        }
    }

    pub(crate) fn additional_items(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        limit: usize,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::AdditionalItems { limit },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn additional_properties(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        unexpected: Vec<String>,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::AdditionalProperties { unexpected },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn any_of(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::AnyOf,
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn constant_array(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        expected_value: &[Value],
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::Constant {
                expected_value: Value::Array(expected_value.to_vec()),
            },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn constant_boolean(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        expected_value: bool,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::Constant {
                expected_value: Value::Bool(expected_value),
            },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn constant_null(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::Constant {
                expected_value: Value::Null,
            },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn constant_number(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        expected_value: &Number,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::Constant {
                expected_value: Value::Number(expected_value.clone()),
            },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn constant_object(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        expected_value: &Map<String, Value>,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::Constant {
                expected_value: Value::Object(expected_value.clone()),
            },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn constant_string(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        expected_value: &str,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::Constant {
                expected_value: Value::String(expected_value.to_string()),
            },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn contains(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::Contains,
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn content_encoding(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        encoding: &str,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::ContentEncoding {
                content_encoding: encoding.to_string(),
            },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn content_media_type(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        media_type: &str,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::ContentMediaType {
                content_media_type: media_type.to_string(),
            },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn enumeration(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        options: &Value,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::Enum {
                options: options.clone(),
            },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn exclusive_maximum(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        limit: Value,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::ExclusiveMaximum { limit },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn exclusive_minimum(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        limit: Value,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::ExclusiveMinimum { limit },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn false_schema(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::FalseSchema,
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn format(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        format: impl Into<String>,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::Format {
                format: format.into(),
            },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn max_items(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        limit: u64,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::MaxItems { limit },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn maximum(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        limit: Value,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::Maximum { limit },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn max_length(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        limit: u64,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::MaxLength { limit },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn max_properties(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        limit: u64,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::MaxProperties { limit },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn max_contains(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        limit: u64,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::MaxContains { limit },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn min_items(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        limit: u64,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::MinItems { limit },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn minimum(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        limit: Value,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::Minimum { limit },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn min_length(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        limit: u64,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::MinLength { limit },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn min_properties(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        limit: u64,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::MinProperties { limit },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn min_contains(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        limit: u64,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::MinContains { limit },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn multiple_of(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        multiple_of: f64,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::MultipleOf { multiple_of },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn not(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        schema: Value,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::Not { schema },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn one_of_multiple_valid(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::OneOfMultipleValid,
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn one_of_not_valid(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::OneOfNotValid,
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn pattern(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        pattern: String,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::Pattern { pattern },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn required(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        property: String,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::Required { property },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn single_type_error(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        type_name: PrimitiveType,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::Type {
                kind: TypeKind::Single(type_name),
            },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn multiple_type_error(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        types: PrimitiveTypesBitMap,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::Type {
                kind: TypeKind::Multiple(types),
            },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn unevaluated_properties(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        unexpected: Vec<String>,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::UnevaluatedProperties { unexpected },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn unevaluated_items(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
        unexpected: Vec<usize>,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::UnevaluatedItems { unexpected },
            instance_path,
            schema_path,
        }
    }
    pub(crate) fn unique_items(
        schema_path: JSONPointer,
        instance_path: JSONPointer,
        instance: &'a Value,
    ) -> ValidationError<'a> {
        ValidationError {
            instance: Cow::Borrowed(instance),
            kind: ValidationErrorKind::UniqueItems,
            instance_path,
            schema_path,
        }
    }
}

impl error::Error for ValidationError<'_> {}

/// Textual representation of various validation errors.
impl fmt::Display for ValidationError<'_> {
    #[allow(clippy::too_many_lines)] // The function is long but it does formatting only
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValidationErrorKind::AdditionalItems { limit } => {
                // It is safe to unwrap here as this kind is reported only for arrays
                // with more items than expected
                let extras: Vec<&Value> = self
                    .instance
                    .as_array()
                    .expect("Always valid")
                    .iter()
                    .skip(*limit)
                    .collect();
                let verb = if extras.len() == 1 { "was" } else { "were" };
                write!(
                    f,
                    "Additional items are not allowed ({} {} unexpected)",
                    extras
                        .iter()
                        .map(|x| x.to_string())
                        .collect::<Vec<String>>()
                        .join(", "),
                    verb
                )
            }
            ValidationErrorKind::AdditionalProperties { unexpected } => {
                let verb = if unexpected.len() == 1 { "was" } else { "were" };
                write!(
                    f,
                    "Additional properties are not allowed ({} {} unexpected)",
                    unexpected
                        .iter()
                        .map(|x| format!("'{}'", x))
                        .collect::<Vec<String>>()
                        .join(", "),
                    verb
                )
            }
            ValidationErrorKind::AnyOf | ValidationErrorKind::OneOfNotValid => write!(
                f,
                "{} is not valid under any of the given schemas",
                self.instance
            ),
            ValidationErrorKind::Constant { expected_value } => {
                write!(f, "{} was expected", expected_value)
            }
            ValidationErrorKind::Contains => write!(
                f,
                "None of {} are valid under the given schema",
                self.instance
            ),
            ValidationErrorKind::ContentEncoding { content_encoding } => {
                write!(
                    f,
                    "{} is not compliant with \"{}\" content encoding",
                    self.instance, content_encoding
                )
            }
            ValidationErrorKind::ContentMediaType { content_media_type } => {
                write!(
                    f,
                    "{} is not compliant with \"{}\" media type",
                    self.instance, content_media_type
                )
            }
            ValidationErrorKind::Enum { options } => {
                write!(f, "{} is not one of {}", self.instance, options)
            }
            ValidationErrorKind::ExclusiveMaximum { limit } => write!(
                f,
                "{} is greater than or equal to the maximum of {}",
                self.instance, limit
            ),
            ValidationErrorKind::ExclusiveMinimum { limit } => write!(
                f,
                "{} is less than or equal to the minimum of {}",
                self.instance, limit
            ),
            ValidationErrorKind::FalseSchema => {
                write!(f, "False schema does not allow {}", self.instance)
            }
            ValidationErrorKind::Format { format } => {
                write!(f, "{} is not a \"{}\"", self.instance, format)
            }
            ValidationErrorKind::Maximum { limit } => write!(
                f,
                "{} is greater than the maximum of {}",
                self.instance, limit
            ),
            ValidationErrorKind::Minimum { limit } => {
                write!(f, "{} is less than the minimum of {}", self.instance, limit)
            }
            ValidationErrorKind::MaxLength { limit } => write!(
                f,
                "{} is longer than {} character{}",
                self.instance,
                limit,
                if *limit == 1 { "" } else { "s" }
            ),
            ValidationErrorKind::MinLength { limit } => write!(
                f,
                "{} is shorter than {} character{}",
                self.instance,
                limit,
                if *limit == 1 { "" } else { "s" }
            ),
            ValidationErrorKind::MaxItems { limit } => write!(
                f,
                "{} has more than {} item{}",
                self.instance,
                limit,
                if *limit == 1 { "" } else { "s" }
            ),
            ValidationErrorKind::MinItems { limit } => write!(
                f,
                "{} has less than {} item{}",
                self.instance,
                limit,
                if *limit == 1 { "" } else { "s" }
            ),
            ValidationErrorKind::MaxProperties { limit } => write!(
                f,
                "{} has more than {} propert{}",
                self.instance,
                limit,
                if *limit == 1 { "y" } else { "ies" }
            ),
            ValidationErrorKind::MinProperties { limit } => write!(
                f,
                "{} has less than {} propert{}",
                self.instance,
                limit,
                if *limit == 1 { "y" } else { "ies" }
            ),
            ValidationErrorKind::MaxContains { limit } => write!(
                f,
                "{} has more than {} matching item{}",
                self.instance,
                limit,
                if *limit == 1 { "" } else { "s" }
            ),
            ValidationErrorKind::MinContains { limit } => write!(
                f,
                "{} has fewer than {} matching item{}",
                self.instance,
                limit,
                if *limit == 1 { "" } else { "s" }
            ),
            ValidationErrorKind::MultipleOf { multiple_of } => {
                write!(f, "{} is not a multiple of {}", self.instance, multiple_of)
            }
            ValidationErrorKind::Not { schema } => {
                write!(f, "{} is not allowed for {}", schema, self.instance)
            }
            ValidationErrorKind::OneOfMultipleValid => write!(
                f,
                "{} is valid under more than one of the given schemas",
                self.instance
            ),
            ValidationErrorKind::Pattern { pattern } => {
                write!(f, "{} does not match \"{}\"", self.instance, pattern)
            }
            ValidationErrorKind::Required { property } => {
                write!(f, "\"{}\" is a required property", property)
            }
            ValidationErrorKind::Type {
                kind: TypeKind::Single(type_),
            } => write!(f, "{} is not of type \"{}\"", self.instance, type_),
            ValidationErrorKind::Type {
                kind: TypeKind::Multiple(types),
            } => write!(
                f,
                "{} is not of types {}",
                self.instance,
                types
                    .into_iter()
                    .map(|t| format!("\"{}\"", t))
                    .collect::<Vec<String>>()
                    .join(", ")
            ),
            ValidationErrorKind::UnevaluatedProperties { unexpected } => {
                let verb = if unexpected.len() == 1 { "was" } else { "were" };
                write!(
                    f,
                    "Unevaluated properties are not allowed ({} {} unexpected)",
                    unexpected
                        .iter()
                        .map(|x| format!("'{}'", x))
                        .collect::<Vec<String>>()
                        .join(", "),
                    verb
                )
            }
            ValidationErrorKind::UnevaluatedItems { unexpected } => {
                let verb = if unexpected.len() == 1 { "was" } else { "were" };
                write!(
                    f,
                    "Unevaluated items are not allowed ({} {} unexpected)",
                    unexpected
                        .iter()
                        .map(|x| x.to_string())
                        .collect::<Vec<String>>()
                        .join(", "),
                    verb
                )
            }
            ValidationErrorKind::UniqueItems => {
                write!(f, "{} has non-unique elements", self.instance)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_type_error() {
        let instance = json!(42);
        let err = ValidationError::single_type_error(
            JSONPointer::default(),
            JSONPointer::default(),
            &instance,
            PrimitiveType::String,
        );
        assert_eq!(err.to_string(), "42 is not of type \"string\"");
    }

    #[test]
    fn multiple_types_error() {
        let instance = json!(42);
        let err = ValidationError::multiple_type_error(
            JSONPointer::default(),
            JSONPointer::default(),
            &instance,
            vec![PrimitiveType::String, PrimitiveType::Number].into(),
        );
        assert_eq!(err.to_string(), "42 is not of types \"number\", \"string\"");
    }

    #[test]
    fn schema_error_display() {
        let error = SchemaError::UnresolvedReference {
            reference: "http://example.com/missing.json".to_string(),
            location: "json-schema:///#/properties/a".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "json-schema:///#/properties/a: unresolved reference `http://example.com/missing.json`"
        );
    }
}
