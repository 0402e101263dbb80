//! Validator for the `format` keyword.
use crate::{
    compilation::context::CompilationContext,
    error::{error, no_error, ErrorIterator, SchemaError, ValidationError},
    keywords::CompilationResult,
    paths::{InstancePath, JSONPointer},
    primitive_type::PrimitiveType,
    validator::Validate,
};
use chrono::{DateTime, NaiveDate};
use email_address::EmailAddress;
use fancy_regex::Regex;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use std::{net::IpAddr, str::FromStr};
use url::Url;

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}\z").expect("Is a valid regex"));
static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([01][0-9]|2[0-3]):([0-5][0-9]):([0-5][0-9]|60)(\.[0-9]+)?(([Zz])|([+-]([01][0-9]|2[0-3]):[0-5][0-9]))\z",
    )
    .expect("Is a valid regex")
});
static JSON_POINTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(/(([^/~])|(~[01]))*)*\z").expect("Is a valid regex"));

macro_rules! format_validator {
    ($validator:ident, $format_name:tt) => {
        struct $validator {
            schema_path: JSONPointer,
        }

        impl $validator {
            pub(crate) fn compile(context: &CompilationContext) -> CompilationResult {
                Ok(Box::new($validator {
                    schema_path: context.as_pointer_with("format"),
                }))
            }
        }

        impl core::fmt::Display for $validator {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                concat!("format: ", $format_name).fmt(f)
            }
        }
    };
}

macro_rules! validate {
    ($format:expr) => {
        fn validate<'instance>(
            &self,
            instance: &'instance Value,
            instance_path: &InstancePath,
        ) -> ErrorIterator<'instance> {
            if let Value::String(_) = instance {
                if !self.is_valid(instance) {
                    return error(ValidationError::format(
                        self.schema_path.clone(),
                        instance_path.into(),
                        instance,
                        $format,
                    ));
                }
            }
            no_error()
        }
    };
}

format_validator!(DateValidator, "date");
impl Validate for DateValidator {
    validate!("date");
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::String(item) = instance {
            if NaiveDate::parse_from_str(item, "%Y-%m-%d").is_ok() {
                // Padding with zeroes is ignored by the underlying parser; the regex
                // makes the zero-padded form mandatory
                DATE_RE.is_match(item).unwrap_or(false)
            } else {
                false
            }
        } else {
            true
        }
    }
}

format_validator!(DateTimeValidator, "date-time");
impl Validate for DateTimeValidator {
    validate!("date-time");
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::String(item) = instance {
            DateTime::parse_from_rfc3339(item).is_ok()
        } else {
            true
        }
    }
}

format_validator!(TimeValidator, "time");
impl Validate for TimeValidator {
    validate!("time");
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::String(item) = instance {
            TIME_RE.is_match(item).unwrap_or(false)
        } else {
            true
        }
    }
}

format_validator!(EmailValidator, "email");
impl Validate for EmailValidator {
    validate!("email");
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::String(item) = instance {
            item.parse::<EmailAddress>().is_ok()
        } else {
            true
        }
    }
}

format_validator!(HostnameValidator, "hostname");
impl Validate for HostnameValidator {
    validate!("hostname");
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::String(item) = instance {
            !(item.ends_with('-')
                || item.starts_with('-')
                || item.is_empty()
                || item.chars().count() > 255
                || item
                    .chars()
                    .any(|c| !(c.is_alphanumeric() || c == '-' || c == '.'))
                || item.split('.').any(|part| part.chars().count() > 63))
        } else {
            true
        }
    }
}

format_validator!(IpV4Validator, "ipv4");
impl Validate for IpV4Validator {
    validate!("ipv4");
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::String(item) = instance {
            matches!(IpAddr::from_str(item), Ok(IpAddr::V4(_)))
        } else {
            true
        }
    }
}

format_validator!(IpV6Validator, "ipv6");
impl Validate for IpV6Validator {
    validate!("ipv6");
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::String(item) = instance {
            matches!(IpAddr::from_str(item), Ok(IpAddr::V6(_)))
        } else {
            true
        }
    }
}

format_validator!(RegexValidator, "regex");
impl Validate for RegexValidator {
    validate!("regex");
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::String(item) = instance {
            Regex::new(item).is_ok()
        } else {
            true
        }
    }
}

format_validator!(UriValidator, "uri");
impl Validate for UriValidator {
    validate!("uri");
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::String(item) = instance {
            Url::parse(item).is_ok()
        } else {
            true
        }
    }
}

format_validator!(JsonPointerValidator, "json-pointer");
impl Validate for JsonPointerValidator {
    validate!("json-pointer");
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::String(item) = instance {
            JSON_POINTER_RE.is_match(item).unwrap_or(false)
        } else {
            true
        }
    }
}

struct CustomFormatValidator {
    name: String,
    check: fn(&str) -> bool,
    schema_path: JSONPointer,
}

impl Validate for CustomFormatValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::String(item) = instance {
            (self.check)(item)
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
            error(ValidationError::format(
                self.schema_path.clone(),
                instance_path.into(),
                instance,
                self.name.clone(),
            ))
        }
    }
}

impl core::fmt::Display for CustomFormatValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "format: {}", self.name)
    }
}

#[inline]
pub(crate) fn compile(
    _: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    if let Value::String(format) = schema {
        if !context.validates_formats_by_default() {
            // Collected as an annotation
            return None;
        }
        if let Some((name, check)) = context.config.format(format) {
            return Some(Ok(Box::new(CustomFormatValidator {
                name: name.to_string(),
                check,
                schema_path: context.as_pointer_with("format"),
            })));
        }
        match format.as_str() {
            "date" => Some(DateValidator::compile(context)),
            "date-time" => Some(DateTimeValidator::compile(context)),
            "time" => Some(TimeValidator::compile(context)),
            "email" | "idn-email" => Some(EmailValidator::compile(context)),
            "hostname" => Some(HostnameValidator::compile(context)),
            "ipv4" => Some(IpV4Validator::compile(context)),
            "ipv6" => Some(IpV6Validator::compile(context)),
            "regex" => Some(RegexValidator::compile(context)),
            "uri" => Some(UriValidator::compile(context)),
            "json-pointer" => Some(JsonPointerValidator::compile(context)),
            _ => {
                if context.config.is_unknown_format_ignored() {
                    // Unknown formats are collected as annotations
                    None
                } else {
                    Some(Err(SchemaError::UnknownFormat {
                        format: format.clone(),
                        location: context.absolute_location(),
                    }))
                }
            }
        }
    } else {
        Some(Err(context.unexpected_type(schema, PrimitiveType::String)))
    }
}

#[cfg(test)]
mod tests {
    use crate::{tests_util, Draft};
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"format": "date"}), &json!("1963-06-19"))]
    #[test_case(&json!({"format": "date-time"}), &json!("1963-06-19T08:30:06.283185Z"))]
    #[test_case(&json!({"format": "time"}), &json!("08:30:06Z"))]
    #[test_case(&json!({"format": "email"}), &json!("joe.bloggs@example.com"))]
    #[test_case(&json!({"format": "hostname"}), &json!("www.example.com"))]
    #[test_case(&json!({"format": "ipv4"}), &json!("192.168.0.1"))]
    #[test_case(&json!({"format": "ipv6"}), &json!("::1"))]
    #[test_case(&json!({"format": "regex"}), &json!("a+"))]
    #[test_case(&json!({"format": "uri"}), &json!("http://example.com/"))]
    #[test_case(&json!({"format": "json-pointer"}), &json!("/foo/0"))]
    fn draft7_valid(schema: &Value, instance: &Value) {
        tests_util::is_valid_with_draft(Draft::Draft7, schema, instance);
    }

    #[test_case(&json!({"format": "date"}), &json!("06/19/1963"))]
    #[test_case(&json!({"format": "date"}), &json!("1963-6-19"); "dates must be zero padded")]
    #[test_case(&json!({"format": "date-time"}), &json!("not a datetime"))]
    #[test_case(&json!({"format": "email"}), &json!("not-an-email"))]
    #[test_case(&json!({"format": "ipv4"}), &json!("2001:db8::1"))]
    #[test_case(&json!({"format": "ipv6"}), &json!("192.168.0.1"))]
    #[test_case(&json!({"format": "regex"}), &json!("("))]
    fn draft7_invalid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid_with_draft(Draft::Draft7, schema, instance);
    }

    #[test]
    fn formats_are_annotations_in_recent_drafts() {
        // 2020-12 does not validate formats unless asked to
        tests_util::is_valid(&json!({"format": "ipv4"}), &json!("not an ip"));
    }

    #[test]
    fn strict_mode_can_be_forced() {
        let validator = crate::options()
            .should_validate_formats(true)
            .compile(&json!({"format": "ipv4"}))
            .unwrap();
        assert!(!validator.is_valid(&json!("not an ip")));
    }

    #[test]
    fn unknown_formats_are_accepted() {
        tests_util::is_valid_with_draft(
            Draft::Draft7,
            &json!({"format": "custom-thing"}),
            &json!("anything"),
        );
    }

    #[test]
    fn unknown_formats_can_be_rejected() {
        let error = crate::options()
            .should_validate_formats(true)
            .should_ignore_unknown_formats(false)
            .compile(&json!({"format": "custom-thing"}))
            .expect_err("Unknown format");
        assert!(matches!(error, crate::SchemaError::UnknownFormat { .. }));
    }

    #[test]
    fn schema_path() {
        let validator = crate::options()
            .with_draft(Draft::Draft7)
            .compile(&json!({"format": "date"}))
            .unwrap();
        let instance = json!("bad");
        let error = validator
            .validate(&instance)
            .expect_err("Should fail")
            .next()
            .expect("Should fail");
        assert_eq!(error.schema_path.to_string(), "/format");
    }
}
