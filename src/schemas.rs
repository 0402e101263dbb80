//! JSON Schema drafts and per-draft keyword dispatch.
use crate::{compilation::context::CompilationContext, keywords};
use serde_json::{Map, Value};

/// JSON Schema draft version.
#[non_exhaustive]
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord)]
pub enum Draft {
    /// JSON Schema Draft 4
    Draft4,
    /// JSON Schema Draft 6
    Draft6,
    /// JSON Schema Draft 7
    Draft7,
    /// JSON Schema Draft 2019-09
    Draft201909,
    /// JSON Schema Draft 2020-12
    Draft202012,
}

impl Default for Draft {
    fn default() -> Self {
        Draft::Draft202012
    }
}

type CompileFunc =
    fn(&Map<String, Value>, &Value, &CompilationContext) -> Option<keywords::CompilationResult>;

impl Draft {
    pub(crate) const fn validates_formats_by_default(self) -> bool {
        matches!(self, Draft::Draft4 | Draft::Draft6 | Draft::Draft7)
    }

    pub(crate) const fn supports_adjacent_validation(self) -> bool {
        matches!(self, Draft::Draft201909 | Draft::Draft202012)
    }

    /// The keyword holding the schema identifier: `id` in Draft 4, `$id` since Draft 6.
    pub(crate) const fn id_keyword(self) -> &'static str {
        match self {
            Draft::Draft4 => "id",
            _ => "$id",
        }
    }

    /// Keywords that carry structure or metadata rather than validation and
    /// therefore never become annotations.
    pub(crate) fn is_known_keyword(self, keyword: &str) -> bool {
        match keyword {
            "$schema" | "definitions" => true,
            "id" if self == Draft::Draft4 => true,
            "$id" if self >= Draft::Draft6 => true,
            "$comment" if self >= Draft::Draft7 => true,
            "$anchor" | "$defs" | "$vocabulary" | "minContains" | "maxContains"
                if self >= Draft::Draft201909 =>
            {
                true
            }
            "$recursiveAnchor" if self == Draft::Draft201909 => true,
            "$dynamicAnchor" if self == Draft::Draft202012 => true,
            _ => false,
        }
    }

    #[allow(clippy::match_same_arms)]
    pub(crate) fn get_validator(self, keyword: &str) -> Option<CompileFunc> {
        match keyword {
            "$ref" => Some(keywords::ref_::compile_ref),
            "$recursiveRef" => match self {
                Draft::Draft201909 => Some(keywords::ref_::compile_recursive_ref),
                _ => None,
            },
            "$dynamicRef" => match self {
                Draft::Draft202012 => Some(keywords::ref_::compile_dynamic_ref),
                _ => None,
            },
            "additionalItems" => match self {
                Draft::Draft202012 => None,
                _ => Some(keywords::additional_items::compile),
            },
            "additionalProperties" => Some(keywords::additional_properties::compile),
            "allOf" => Some(keywords::all_of::compile),
            "anyOf" => Some(keywords::any_of::compile),
            "const" => match self {
                Draft::Draft4 => None,
                _ => Some(keywords::const_::compile),
            },
            "contains" => match self {
                Draft::Draft4 => None,
                _ => Some(keywords::contains::compile),
            },
            "contentEncoding" => match self {
                Draft::Draft6 | Draft::Draft7 => Some(keywords::content::compile_content_encoding),
                // Collected as an annotation in 2019-09 and later
                _ => None,
            },
            "contentMediaType" => match self {
                Draft::Draft6 | Draft::Draft7 => Some(keywords::content::compile_media_type),
                _ => None,
            },
            "dependencies" => Some(keywords::dependencies::compile),
            "dependentRequired" => match self {
                Draft::Draft201909 | Draft::Draft202012 => {
                    Some(keywords::dependencies::compile_dependent_required)
                }
                _ => None,
            },
            "dependentSchemas" => match self {
                Draft::Draft201909 | Draft::Draft202012 => {
                    Some(keywords::dependencies::compile_dependent_schemas)
                }
                _ => None,
            },
            "enum" => Some(keywords::enum_::compile),
            "exclusiveMaximum" => match self {
                // The boolean form is handled by the Draft 4 `maximum` validator
                Draft::Draft4 => None,
                _ => Some(keywords::exclusive_maximum::compile),
            },
            "exclusiveMinimum" => match self {
                Draft::Draft4 => None,
                _ => Some(keywords::exclusive_minimum::compile),
            },
            "format" => Some(keywords::format::compile),
            "if" => match self {
                Draft::Draft4 | Draft::Draft6 => None,
                _ => Some(keywords::if_::compile),
            },
            "items" => Some(keywords::items::compile),
            "maximum" => match self {
                Draft::Draft4 => Some(keywords::legacy::maximum_draft_4::compile),
                _ => Some(keywords::maximum::compile),
            },
            "maxItems" => Some(keywords::max_items::compile),
            "maxLength" => Some(keywords::max_length::compile),
            "maxProperties" => Some(keywords::max_properties::compile),
            "minimum" => match self {
                Draft::Draft4 => Some(keywords::legacy::minimum_draft_4::compile),
                _ => Some(keywords::minimum::compile),
            },
            "minItems" => Some(keywords::min_items::compile),
            "minLength" => Some(keywords::min_length::compile),
            "minProperties" => Some(keywords::min_properties::compile),
            "multipleOf" => Some(keywords::multiple_of::compile),
            "not" => Some(keywords::not::compile),
            "oneOf" => Some(keywords::one_of::compile),
            "pattern" => Some(keywords::pattern::compile),
            "patternProperties" => Some(keywords::pattern_properties::compile),
            "prefixItems" => match self {
                Draft::Draft202012 => Some(keywords::prefix_items::compile),
                _ => None,
            },
            "properties" => Some(keywords::properties::compile),
            "propertyNames" => match self {
                Draft::Draft4 => None,
                _ => Some(keywords::property_names::compile),
            },
            "required" => Some(keywords::required::compile),
            "type" => match self {
                Draft::Draft4 => Some(keywords::legacy::type_draft_4::compile),
                _ => Some(keywords::type_::compile),
            },
            "unevaluatedItems" => match self {
                Draft::Draft201909 | Draft::Draft202012 => {
                    Some(keywords::unevaluated_items::compile)
                }
                _ => None,
            },
            "unevaluatedProperties" => match self {
                Draft::Draft201909 | Draft::Draft202012 => {
                    Some(keywords::unevaluated_properties::compile)
                }
                _ => None,
            },
            "uniqueItems" => Some(keywords::unique_items::compile),
            _ => None,
        }
    }
}

/// Get the `Draft` from a JSON Schema URL.
#[inline]
pub(crate) fn draft_from_url(url: &str) -> Option<Draft> {
    match url.trim_end_matches('#') {
        "https://json-schema.org/draft/2020-12/schema" => Some(Draft::Draft202012),
        "https://json-schema.org/draft/2019-09/schema" => Some(Draft::Draft201909),
        "http://json-schema.org/draft-07/schema" => Some(Draft::Draft7),
        "http://json-schema.org/draft-06/schema" => Some(Draft::Draft6),
        "http://json-schema.org/draft-04/schema" => Some(Draft::Draft4),
        _ => None,
    }
}

/// Get the `Draft` from a JSON Schema document.
#[inline]
pub(crate) fn draft_from_schema(schema: &Value) -> Option<Draft> {
    schema
        .get("$schema")
        .and_then(Value::as_str)
        .and_then(draft_from_url)
}

/// The raw `$schema` value, if any.
#[inline]
pub(crate) fn dialect_of(schema: &Value) -> Option<&str> {
    schema.get("$schema").and_then(Value::as_str)
}

#[inline]
pub(crate) fn id_of(draft: Draft, schema: &Value) -> Option<&str> {
    if let Value::Object(object) = schema {
        object.get(draft.id_keyword()).and_then(Value::as_str)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"$schema": "https://json-schema.org/draft/2020-12/schema"}), Some(Draft::Draft202012))]
    #[test_case(&json!({"$schema": "https://json-schema.org/draft/2019-09/schema#"}), Some(Draft::Draft201909))]
    #[test_case(&json!({"$schema": "http://json-schema.org/draft-07/schema#"}), Some(Draft::Draft7))]
    #[test_case(&json!({"$schema": "http://json-schema.org/draft-06/schema#"}), Some(Draft::Draft6))]
    #[test_case(&json!({"$schema": "http://json-schema.org/draft-04/schema#"}), Some(Draft::Draft4))]
    #[test_case(&json!({"$schema": "http://example.com/custom/schema#"}), None)]
    fn test_draft_from_schema(schema: &Value, draft: Option<Draft>) {
        assert_eq!(draft_from_schema(schema), draft);
    }

    #[test]
    fn test_id_keyword() {
        let schema = json!({"id": "http://example.com/a", "$id": "http://example.com/b"});
        assert_eq!(id_of(Draft::Draft4, &schema), Some("http://example.com/a"));
        assert_eq!(id_of(Draft::Draft7, &schema), Some("http://example.com/b"));
    }
}
