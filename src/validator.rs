//! The evaluation contract every compiled keyword fulfills.
use crate::{
    error::ErrorIterator,
    output::{Annotations, ErrorDescription, OutputUnit},
    paths::InstancePath,
    patch::PatchOperation,
};
use serde_json::Value;
use std::{collections::VecDeque, fmt};

/// The `Validate` trait represents a predicate over some JSON value. Some validators are very
/// simple predicates such as "a value which is a string", whereas others may be much more complex,
/// consisting of several other validators composed together in various ways.
///
/// Much of the time all an application cares about is whether the predicate returns true or false,
/// in that case `is_valid` is sufficient. Sometimes applications want detail about why an instance
/// failed, in which case `validate` can be used to iterate over the produced errors. Applications
/// interested in annotations of valid results use `apply`, which feeds the standard "basic"
/// output format.
///
/// When implementing `Validate` it is usually sufficient to implement `validate` and `is_valid`.
/// `apply` and `collect_defaults` only need an implementation in validators which compose other
/// validators; for leaves the default implementations suffice.
pub(crate) trait Validate: Send + Sync + fmt::Display {
    fn validate<'instance>(
        &self,
        instance: &'instance Value,
        instance_path: &InstancePath,
    ) -> ErrorIterator<'instance>;

    // The same as above, but does not construct `ErrorIterator`.
    // It is faster for cases when the result is not needed (like `anyOf`), since errors are
    // not constructed
    fn is_valid(&self, instance: &Value) -> bool;

    /// Apply this validator and collect the resulting annotations or errors as a
    /// [`PartialApplication`].
    ///
    /// The result is "partial" because most validators do not know where they sit in the schema
    /// tree; they return raw errors or annotations and leave it to the enclosing
    /// [`crate::schema_node::SchemaNode`] (which does know its location) to attach path
    /// information. Validators composed of sub-schemas keep `SchemaNode`s internally and use
    /// `SchemaNode::apply_rooted` to obtain complete `BasicOutput` values, combining them with
    /// `+=` before converting back into a `PartialApplication`.
    fn apply<'a>(
        &'a self,
        instance: &Value,
        instance_path: &InstancePath,
    ) -> PartialApplication<'a> {
        let errors: Vec<ErrorDescription> = self
            .validate(instance, instance_path)
            .map(ErrorDescription::from)
            .collect();
        if errors.is_empty() {
            PartialApplication::valid_empty()
        } else {
            PartialApplication::invalid_empty(errors)
        }
    }

    /// Record JSON Patch operations inserting declared `default` values that are missing from
    /// `instance`. Only validators that own sub-schemas with reachable `default` declarations
    /// implement this.
    fn collect_defaults(
        &self,
        _instance: &Value,
        _instance_path: &InstancePath,
        _patch: &mut Vec<PatchOperation>,
    ) {
    }
}

impl fmt::Debug for dyn Validate + Send + Sync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string())
    }
}

/// The result of applying a validator to an instance, before path information is attached.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PartialApplication<'a> {
    Valid {
        /// Annotations produced by this validator.
        annotations: Option<Annotations<'a>>,
        /// Outputs produced by validators which are children of this validator.
        child_results: VecDeque<OutputUnit<Annotations<'a>>>,
    },
    Invalid {
        /// Errors which caused this schema to be invalid.
        errors: Vec<ErrorDescription>,
        /// Error outputs produced by child validators of this validator.
        child_results: VecDeque<OutputUnit<ErrorDescription>>,
    },
}

impl<'a> PartialApplication<'a> {
    pub(crate) fn valid_empty() -> PartialApplication<'static> {
        PartialApplication::Valid {
            annotations: None,
            child_results: VecDeque::new(),
        }
    }

    pub(crate) fn invalid_empty(errors: Vec<ErrorDescription>) -> PartialApplication<'static> {
        PartialApplication::Invalid {
            errors,
            child_results: VecDeque::new(),
        }
    }

    /// Whether the partial represents passed validation.
    #[must_use]
    pub(crate) const fn is_valid(&self) -> bool {
        match self {
            Self::Valid { .. } => true,
            Self::Invalid { .. } => false,
        }
    }

    /// Set the annotation that will be returned for the current validator. Does nothing if the
    /// application is invalid.
    pub(crate) fn annotate(&mut self, new_annotations: Annotations<'a>) {
        match self {
            Self::Valid { annotations, .. } => *annotations = Some(new_annotations),
            Self::Invalid { .. } => {}
        }
    }

    /// Add an error to the current application, converting a valid application into an invalid
    /// one if necessary.
    pub(crate) fn mark_errored(&mut self, error: ErrorDescription) {
        match self {
            Self::Invalid { errors, .. } => errors.push(error),
            Self::Valid { .. } => {
                *self = Self::Invalid {
                    errors: vec![error],
                    child_results: VecDeque::new(),
                }
            }
        }
    }
}

pub(crate) type BoxedValidator = Box<dyn Validate + Send + Sync>;

pub(crate) fn format_validators(validators: &[(String, BoxedValidator)]) -> String {
    validators
        .iter()
        .map(|(_, validator)| validator.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}
