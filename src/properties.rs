//! Helpers shared by the keywords that validate object properties.
use fancy_regex::Regex;
use serde_json::{Map, Value};

use crate::{
    compilation::{compile_validators, context::CompilationContext},
    error::SchemaError,
    schema_node::SchemaNode,
};

pub(crate) type PatternedValidators = Vec<(Regex, SchemaNode)>;

/// Property name -> compiled sub-schema, in schema order.
pub(crate) type PropertiesMap = Vec<(String, SchemaNode)>;

pub(crate) fn compile_properties(
    map: &Map<String, Value>,
    context: &CompilationContext,
) -> Result<PropertiesMap, SchemaError> {
    let keyword_context = context.with_path("properties");
    let mut properties = Vec::with_capacity(map.len());
    for (key, subschema) in map {
        let property_context = keyword_context.with_path(key.as_str());
        properties.push((key.clone(), compile_validators(subschema, &property_context)?));
    }
    Ok(properties)
}

pub(crate) fn get_validator<'a>(
    properties: &'a PropertiesMap,
    property: &str,
) -> Option<&'a SchemaNode> {
    properties
        .iter()
        .find(|(name, _)| name == property)
        .map(|(_, node)| node)
}

/// Create a vector of pattern-validator pairs.
#[inline]
pub(crate) fn compile_patterns(
    object: &Map<String, Value>,
    context: &CompilationContext,
) -> Result<PatternedValidators, SchemaError> {
    let keyword_context = context.with_path("patternProperties");
    let mut compiled_patterns = Vec::with_capacity(object.len());
    for (pattern, subschema) in object {
        let pattern_context = keyword_context.with_path(pattern.as_str());
        if let Ok(compiled_pattern) = Regex::new(pattern) {
            let node = compile_validators(subschema, &pattern_context)?;
            compiled_patterns.push((compiled_pattern, node));
        } else {
            return Err(SchemaError::InvalidRegex {
                pattern: pattern.clone(),
                location: keyword_context.absolute_location(),
            });
        }
    }
    Ok(compiled_patterns)
}
