//! A node in the compiled schema tree.
use crate::{
    compilation::context::CompilationContext,
    error::ErrorIterator,
    output::{Annotations, BasicOutput, ErrorDescription, OutputUnit},
    paths::{InstancePath, JSONPointer, PathChunk},
    patch::PatchOperation,
    validator::{BoxedValidator, PartialApplication, Validate},
};
use ahash::AHashMap;
use serde_json::Value;
use std::{collections::VecDeque, fmt};
use url::Url;

/// The compiled form of a single schema object (or boolean schema): an ordered collection of
/// keyword validators plus the location identifying this schema site. Reference targets compile
/// to nodes as well, so this is the unit the whole validation tree is made of.
pub(crate) struct SchemaNode {
    validators: NodeValidators,
    location: JSONPointer,
    absolute_path: Option<Url>,
}

enum NodeValidators {
    /// The result of compiling a boolean valued schema, e.g.
    ///
    /// ```json
    /// {
    ///     "additionalProperties": false
    /// }
    /// ```
    ///
    /// A `true` schema has no validator at all, a `false` schema holds a single validator that
    /// fails on everything.
    Boolean { validator: Option<BoxedValidator> },
    /// The result of compiling a schema which is composed of keywords (almost all schemas).
    Keyword(Box<KeywordValidators>),
    /// The result of compiling a schema which is "array valued", e.g. the `dependencies` keyword
    /// of Draft 7, which can take values which are an array of other property names.
    Array { validators: Vec<BoxedValidator> },
}

struct KeywordValidators {
    /// The keywords on this node which were not recognized by the dialect. These are stored so
    /// they can later be produced as annotations.
    unmatched_keywords: Option<AHashMap<String, Value>>,
    validators: Vec<(String, BoxedValidator)>,
}

impl SchemaNode {
    pub(crate) fn from_boolean(
        context: &CompilationContext<'_>,
        validator: Option<BoxedValidator>,
    ) -> SchemaNode {
        SchemaNode {
            location: context.clone().into_pointer(),
            absolute_path: context.base_uri(),
            validators: NodeValidators::Boolean { validator },
        }
    }

    pub(crate) fn from_keywords(
        context: &CompilationContext<'_>,
        validators: Vec<(String, BoxedValidator)>,
        unmatched_keywords: Option<AHashMap<String, Value>>,
    ) -> SchemaNode {
        SchemaNode {
            location: context.clone().into_pointer(),
            absolute_path: context.base_uri(),
            validators: NodeValidators::Keyword(Box::new(KeywordValidators {
                unmatched_keywords,
                validators,
            })),
        }
    }

    pub(crate) fn from_array(
        context: &CompilationContext<'_>,
        validators: Vec<BoxedValidator>,
    ) -> SchemaNode {
        SchemaNode {
            location: context.clone().into_pointer(),
            absolute_path: context.base_uri(),
            validators: NodeValidators::Array { validators },
        }
    }

    pub(crate) fn validators(&self) -> impl Iterator<Item = &BoxedValidator> {
        match &self.validators {
            NodeValidators::Boolean { validator } => NodeValidatorsIter::Boolean(validator.iter()),
            NodeValidators::Keyword(kvals) => {
                NodeValidatorsIter::Keyword(kvals.validators.iter())
            }
            NodeValidators::Array { validators } => NodeValidatorsIter::Array(validators.iter()),
        }
    }

    pub(crate) fn validators_len(&self) -> usize {
        match &self.validators {
            NodeValidators::Boolean { validator } => usize::from(validator.is_some()),
            NodeValidators::Keyword(kvals) => kvals.validators.len(),
            NodeValidators::Array { validators } => validators.len(),
        }
    }

    /// This is similar to `Validate::apply` except that `SchemaNode` knows where it is in the
    /// validator tree and so rather than returning a `PartialApplication` it is able to return a
    /// complete `BasicOutput`. This is the mechanism which compositional validators use to
    /// combine results from sub-schemas.
    pub(crate) fn apply_rooted(
        &self,
        instance: &Value,
        instance_path: &InstancePath,
    ) -> BasicOutput {
        match self.apply(instance, instance_path) {
            PartialApplication::Valid {
                annotations,
                mut child_results,
            } => {
                if let Some(annotations) = annotations {
                    child_results.insert(0, self.annotation_at(instance_path, annotations));
                }
                BasicOutput::Valid(child_results)
            }
            PartialApplication::Invalid {
                errors,
                mut child_results,
            } => {
                for error in errors {
                    child_results.insert(0, self.error_at(instance_path, error));
                }
                BasicOutput::Invalid(child_results)
            }
        }
    }

    /// Create an error output which is marked as occurring at this schema node.
    pub(crate) fn error_at(
        &self,
        instance_path: &InstancePath,
        error: ErrorDescription,
    ) -> OutputUnit<ErrorDescription> {
        OutputUnit::<ErrorDescription>::error(
            self.location.clone(),
            instance_path.into(),
            self.absolute_location_of(&self.location),
            error,
        )
    }

    /// Create an annotation output which is marked as occurring at this schema node.
    pub(crate) fn annotation_at<'a>(
        &self,
        instance_path: &InstancePath,
        annotations: Annotations<'a>,
    ) -> OutputUnit<Annotations<'a>> {
        OutputUnit::<Annotations<'_>>::annotations(
            self.location.clone(),
            instance_path.into(),
            self.absolute_location_of(&self.location),
            annotations,
        )
    }

    fn absolute_location_of(&self, location: &JSONPointer) -> Option<Url> {
        self.absolute_path.as_ref().map(|base| {
            let mut url = base.clone();
            let fragment = location.to_string();
            if fragment.is_empty() {
                url.set_fragment(None);
            } else {
                url.set_fragment(Some(&fragment));
            }
            url
        })
    }

    /// Helper to apply an iterator of `(Into<PathChunk>, &BoxedValidator)` to a value. A keyword
    /// schema node has validators keyed by their keyword, an array schema node has validators
    /// keyed by their index.
    fn apply_subschemas<'a, I, P>(
        &self,
        instance: &Value,
        instance_path: &InstancePath,
        path_and_validators: I,
        annotations: Option<Annotations<'a>>,
    ) -> PartialApplication<'a>
    where
        I: Iterator<Item = (P, &'a BoxedValidator)>,
        P: Into<PathChunk>,
    {
        let mut success_results: VecDeque<OutputUnit<Annotations>> = VecDeque::new();
        let mut error_results = VecDeque::new();
        for (path, validator) in path_and_validators {
            let location = self.location.extend_with(&[path.into()]);
            match validator.apply(instance, instance_path) {
                PartialApplication::Valid {
                    annotations,
                    child_results,
                } => {
                    if let Some(annotations) = annotations {
                        success_results.push_front(OutputUnit::<Annotations<'a>>::annotations(
                            location.clone(),
                            instance_path.into(),
                            self.absolute_location_of(&location),
                            annotations,
                        ));
                    }
                    success_results.extend(child_results);
                }
                PartialApplication::Invalid {
                    errors: these_errors,
                    child_results,
                } => {
                    error_results.reserve(child_results.len() + these_errors.len());
                    error_results.extend(child_results);
                    error_results.extend(these_errors.into_iter().map(|error| {
                        OutputUnit::<ErrorDescription>::error(
                            location.clone(),
                            instance_path.into(),
                            self.absolute_location_of(&location),
                            error,
                        )
                    }));
                }
            }
        }
        if error_results.is_empty() {
            PartialApplication::Valid {
                annotations,
                child_results: success_results,
            }
        } else {
            PartialApplication::Invalid {
                errors: Vec::new(),
                child_results: error_results,
            }
        }
    }

    pub(crate) fn location(&self) -> &JSONPointer {
        &self.location
    }
}

impl Validate for SchemaNode {
    fn validate<'instance>(
        &self,
        instance: &'instance Value,
        instance_path: &InstancePath,
    ) -> ErrorIterator<'instance> {
        match &self.validators {
            NodeValidators::Keyword(kvals) if kvals.validators.len() == 1 => {
                kvals.validators[0].1.validate(instance, instance_path)
            }
            NodeValidators::Keyword(kvals) => Box::new(
                kvals
                    .validators
                    .iter()
                    .flat_map(|(_, validator)| validator.validate(instance, instance_path))
                    .collect::<Vec<_>>()
                    .into_iter(),
            ),
            NodeValidators::Boolean {
                validator: Some(validator),
            } => validator.validate(instance, instance_path),
            NodeValidators::Boolean { validator: None } => crate::error::no_error(),
            NodeValidators::Array { validators } => Box::new(
                validators
                    .iter()
                    .flat_map(|validator| validator.validate(instance, instance_path))
                    .collect::<Vec<_>>()
                    .into_iter(),
            ),
        }
    }

    fn is_valid(&self, instance: &Value) -> bool {
        match &self.validators {
            // If there is only one validator, calling it directly saves the iterator overhead.
            // Leaves of the tree are all single-validator nodes, so this accumulates.
            NodeValidators::Keyword(kvals) if kvals.validators.len() == 1 => {
                kvals.validators[0].1.is_valid(instance)
            }
            NodeValidators::Keyword(kvals) => kvals
                .validators
                .iter()
                .all(|(_, validator)| validator.is_valid(instance)),
            NodeValidators::Boolean { validator } => validator.is_none(),
            NodeValidators::Array { validators } => validators
                .iter()
                .all(|validator| validator.is_valid(instance)),
        }
    }

    fn apply<'a>(
        &'a self,
        instance: &Value,
        instance_path: &InstancePath,
    ) -> PartialApplication<'a> {
        match &self.validators {
            NodeValidators::Array { validators } => self.apply_subschemas(
                instance,
                instance_path,
                validators.iter().enumerate(),
                None,
            ),
            NodeValidators::Boolean { validator } => {
                if let Some(validator) = validator {
                    validator.apply(instance, instance_path)
                } else {
                    PartialApplication::valid_empty()
                }
            }
            NodeValidators::Keyword(kvals) => {
                let KeywordValidators {
                    unmatched_keywords,
                    validators,
                } = &**kvals;
                let annotations: Option<Annotations<'a>> =
                    unmatched_keywords.as_ref().map(Annotations::from);
                self.apply_subschemas(
                    instance,
                    instance_path,
                    validators.iter().map(|(keyword, validator)| {
                        (keyword.as_str(), validator)
                    }),
                    annotations,
                )
            }
        }
    }

    fn collect_defaults(
        &self,
        instance: &Value,
        instance_path: &InstancePath,
        patch: &mut Vec<PatchOperation>,
    ) {
        for validator in self.validators() {
            validator.collect_defaults(instance, instance_path, patch);
        }
    }
}

enum NodeValidatorsIter<'a> {
    Boolean(std::option::Iter<'a, BoxedValidator>),
    Keyword(std::slice::Iter<'a, (String, BoxedValidator)>),
    Array(std::slice::Iter<'a, BoxedValidator>),
}

impl<'a> Iterator for NodeValidatorsIter<'a> {
    type Item = &'a BoxedValidator;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Boolean(iter) => iter.next(),
            Self::Keyword(iter) => iter.next().map(|(_, validator)| validator),
            Self::Array(iter) => iter.next(),
        }
    }
}

impl fmt::Display for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.validators {
            NodeValidators::Boolean { validator: Some(_) } => f.write_str("false"),
            NodeValidators::Boolean { validator: None } => f.write_str("{}"),
            NodeValidators::Keyword(kvals) => write!(
                f,
                "{{{}}}",
                crate::validator::format_validators(&kvals.validators)
            ),
            NodeValidators::Array { validators } => write!(
                f,
                "[{}]",
                validators
                    .iter()
                    .map(|validator| validator.to_string())
                    .collect::<Vec<String>>()
                    .join(", ")
            ),
        }
    }
}

impl fmt::Debug for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}
