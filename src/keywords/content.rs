//! Validators for `contentMediaType` and `contentEncoding` keywords.
use crate::{
    compilation::context::CompilationContext,
    content_encoding::{ContentEncodingCheckType, ContentEncodingConverterType},
    content_media_type::ContentMediaTypeCheckType,
    error::{error, no_error, ErrorIterator, ValidationError},
    keywords::CompilationResult,
    paths::{InstancePath, JSONPointer},
    primitive_type::PrimitiveType,
    validator::Validate,
};
use serde_json::{Map, Value};

pub(crate) struct ContentMediaTypeValidator {
    media_type: String,
    func: ContentMediaTypeCheckType,
    schema_path: JSONPointer,
}

impl Validate for ContentMediaTypeValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::String(item) = instance {
            (self.func)(item)
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
            error(ValidationError::content_media_type(
                self.schema_path.clone(),
                instance_path.into(),
                instance,
                &self.media_type,
            ))
        }
    }
}

impl core::fmt::Display for ContentMediaTypeValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "contentMediaType: {}", self.media_type)
    }
}

pub(crate) struct ContentEncodingValidator {
    encoding: String,
    func: ContentEncodingCheckType,
    schema_path: JSONPointer,
}

impl Validate for ContentEncodingValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::String(item) = instance {
            (self.func)(item)
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
            error(ValidationError::content_encoding(
                self.schema_path.clone(),
                instance_path.into(),
                instance,
                &self.encoding,
            ))
        }
    }
}

impl core::fmt::Display for ContentEncodingValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "contentEncoding: {}", self.encoding)
    }
}

/// Combined validator: the decoded content must additionally conform to the media type.
pub(crate) struct ContentMediaTypeAndEncodingValidator {
    media_type: String,
    encoding: String,
    func: ContentMediaTypeCheckType,
    converter: ContentEncodingConverterType,
    schema_path: JSONPointer,
}

impl Validate for ContentMediaTypeAndEncodingValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        if let Value::String(item) = instance {
            match (self.converter)(item) {
                Ok(Some(converted)) => (self.func)(&converted),
                Ok(None) | Err(_) => false,
            }
        } else {
            true
        }
    }

    fn validate<'instance>(
        &self,
        instance: &'instance Value,
        instance_path: &InstancePath,
    ) -> ErrorIterator<'instance> {
        if let Value::String(item) = instance {
            match (self.converter)(item) {
                Ok(Some(converted)) => {
                    if (self.func)(&converted) {
                        no_error()
                    } else {
                        error(ValidationError::content_media_type(
                            self.schema_path.clone(),
                            instance_path.into(),
                            instance,
                            &self.media_type,
                        ))
                    }
                }
                Ok(None) | Err(_) => error(ValidationError::content_encoding(
                    self.schema_path.clone(),
                    instance_path.into(),
                    instance,
                    &self.encoding,
                )),
            }
        } else {
            no_error()
        }
    }
}

impl core::fmt::Display for ContentMediaTypeAndEncodingValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{contentMediaType: {}, contentEncoding: {}}}",
            self.media_type, self.encoding
        )
    }
}

#[inline]
pub(crate) fn compile_media_type(
    parent: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    match schema {
        Value::String(media_type) => {
            let func = context.config.content_media_type_check(media_type)?;
            if let Some(Value::String(content_encoding)) = parent.get("contentEncoding") {
                // Both keywords are evaluated by one validator compiled here; the
                // `contentEncoding` entry produces nothing in this case
                let converter = context.config.content_encoding_convert(content_encoding)?;
                Some(Ok(Box::new(ContentMediaTypeAndEncodingValidator {
                    media_type: media_type.clone(),
                    encoding: content_encoding.clone(),
                    func,
                    converter,
                    schema_path: context.as_pointer_with("contentMediaType"),
                })))
            } else {
                Some(Ok(Box::new(ContentMediaTypeValidator {
                    media_type: media_type.clone(),
                    func,
                    schema_path: context.as_pointer_with("contentMediaType"),
                })))
            }
        }
        _ => Some(Err(context.unexpected_type(schema, PrimitiveType::String))),
    }
}

#[inline]
pub(crate) fn compile_content_encoding(
    parent: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    // Handled by the `contentMediaType` combined validator
    if let Some(Value::String(media_type)) = parent.get("contentMediaType") {
        if context.config.content_media_type_check(media_type).is_some() {
            return None;
        }
    }
    match schema {
        Value::String(content_encoding) => {
            let func = context.config.content_encoding_check(content_encoding)?;
            Some(Ok(Box::new(ContentEncodingValidator {
                encoding: content_encoding.clone(),
                func,
                schema_path: context.as_pointer_with("contentEncoding"),
            })))
        }
        _ => Some(Err(context.unexpected_type(schema, PrimitiveType::String))),
    }
}

#[cfg(test)]
mod tests {
    use crate::{tests_util, Draft};
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"contentEncoding": "base64"}), &json!("aGVsbG8="))]
    #[test_case(&json!({"contentMediaType": "application/json"}), &json!("{\"a\": 1}"))]
    #[test_case(&json!({"contentEncoding": "base64", "contentMediaType": "application/json"}), &json!("e30="))]
    fn draft7_valid(schema: &Value, instance: &Value) {
        tests_util::is_valid_with_draft(Draft::Draft7, schema, instance);
    }

    #[test_case(&json!({"contentEncoding": "base64"}), &json!("not base64!"))]
    #[test_case(&json!({"contentMediaType": "application/json"}), &json!("not json"))]
    #[test_case(&json!({"contentEncoding": "base64", "contentMediaType": "application/json"}), &json!("bm90IGpzb24="))]
    fn draft7_invalid(schema: &Value, instance: &Value) {
        tests_util::is_not_valid_with_draft(Draft::Draft7, schema, instance);
    }

    #[test]
    fn annotation_only_in_recent_drafts() {
        tests_util::is_valid(&json!({"contentEncoding": "base64"}), &json!("not base64!"));
    }
}
