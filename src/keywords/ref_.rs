//! Validators for `$ref`, `$recursiveRef` (2019-09) and `$dynamicRef` (2020-12).
//!
//! Reference targets are resolved and compiled inline at schema-compilation time. A target that
//! is already being compiled further up the stack is a cycle; it compiles to a lazily-built node
//! instead, which materializes its subtree on first use during evaluation. Evaluation of cyclic
//! schemas terminates because recursion bottoms out on the instance structure.
use crate::{
    compilation::{compile_validators, context::CompilationContext, options::CompilationOptions},
    error::{ErrorIterator, SchemaError},
    keywords::CompilationResult,
    paths::{InstancePath, JSONPointer},
    patch::PatchOperation,
    primitive_type::PrimitiveType,
    resolver::{Registry, ResolvedSchema},
    schema_node::SchemaNode,
    schemas::Draft,
    validator::{PartialApplication, Validate},
};
use once_cell::sync::OnceCell;
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};
use std::sync::Arc;
use url::Url;

pub(crate) struct RefValidator {
    reference: Url,
    inner: SchemaNode,
}

impl Validate for RefValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        self.inner.is_valid(instance)
    }

    fn validate<'instance>(
        &self,
        instance: &'instance Value,
        instance_path: &InstancePath,
    ) -> ErrorIterator<'instance> {
        self.inner.validate(instance, instance_path)
    }

    fn apply<'a>(
        &'a self,
        instance: &Value,
        instance_path: &InstancePath,
    ) -> PartialApplication<'a> {
        self.inner.apply(instance, instance_path)
    }

    fn collect_defaults(
        &self,
        instance: &Value,
        instance_path: &InstancePath,
        patch: &mut Vec<PatchOperation>,
    ) {
        self.inner.collect_defaults(instance, instance_path, patch);
    }
}

impl core::fmt::Display for RefValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "$ref: {}", self.reference)
    }
}

/// Lazily evaluated validator used for reference cycles.
///
/// The validator tree cannot contain arbitrary cycles in the current representation, therefore a
/// repeated reference target is validated by building and caching its subtree on first use.
pub(crate) struct LazyRefValidator {
    reference: Url,
    contents: Arc<Value>,
    scope: Url,
    draft: Draft,
    config: Arc<CompilationOptions>,
    registry: Arc<Registry>,
    dynamic_scope: Vec<Url>,
    // The node is compiled relative to the reference site; its error and output locations get
    // this prefix attached
    prefix: JSONPointer,
    inner: OnceCell<SchemaNode>,
}

impl LazyRefValidator {
    fn lazy_compile(&self) -> &SchemaNode {
        self.inner.get_or_init(|| {
            let context = CompilationContext::resumed(
                self.scope.clone(),
                Arc::clone(&self.config),
                Arc::clone(&self.registry),
                self.draft,
                self.dynamic_scope.clone(),
            );
            // INVARIANT: this schema was already compiled once before the cycle leading to
            // this validator was detected
            compile_validators(&self.contents, &context).expect("Invalid schema")
        })
    }
}

impl Validate for LazyRefValidator {
    fn is_valid(&self, instance: &Value) -> bool {
        self.lazy_compile().is_valid(instance)
    }

    fn validate<'instance>(
        &self,
        instance: &'instance Value,
        instance_path: &InstancePath,
    ) -> ErrorIterator<'instance> {
        let errors: Vec<_> = self
            .lazy_compile()
            .validate(instance, instance_path)
            .map(|mut error| {
                error.schema_path = self.prefix.extend_with(error.schema_path.as_slice());
                error
            })
            .collect();
        Box::new(errors.into_iter())
    }

    fn apply<'a>(
        &'a self,
        instance: &Value,
        instance_path: &InstancePath,
    ) -> PartialApplication<'a> {
        let mut output = self.lazy_compile().apply_rooted(instance, instance_path);
        output.prefix_locations(&self.prefix);
        output.into()
    }

    fn collect_defaults(
        &self,
        instance: &Value,
        instance_path: &InstancePath,
        patch: &mut Vec<PatchOperation>,
    ) {
        self.lazy_compile()
            .collect_defaults(instance, instance_path, patch);
    }
}

impl core::fmt::Display for LazyRefValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "$ref: {}", self.reference)
    }
}

fn compile_resolved(
    context: &CompilationContext,
    resolved: ResolvedSchema,
    identity: Url,
    keyword: &'static str,
) -> CompilationResult {
    if context.is_seen(&identity) {
        Ok(Box::new(LazyRefValidator {
            reference: identity,
            contents: resolved.contents,
            scope: resolved.scope.clone(),
            draft: resolved.draft,
            config: Arc::clone(&context.config),
            registry: Arc::clone(&context.registry),
            dynamic_scope: {
                let mut scopes = context.scopes().to_vec();
                scopes.push(resolved.scope);
                scopes
            },
            prefix: context.as_pointer_with(keyword),
            inner: OnceCell::new(),
        }))
    } else {
        context.mark_seen(&identity);
        let reference_context = context.in_resolved(&resolved, keyword);
        let inner = compile_validators(&resolved.contents, &reference_context)?;
        Ok(Box::new(RefValidator {
            reference: identity,
            inner,
        }))
    }
}

fn compile_reference(
    context: &CompilationContext,
    reference: &str,
    keyword: &'static str,
) -> CompilationResult {
    let resolved = context.registry.resolve(
        &context.scope,
        reference,
        &context.absolute_location(),
    )?;
    let identity = context.build_url(reference)?;
    compile_resolved(context, resolved, identity, keyword)
}

fn compile_dynamic_reference(
    context: &CompilationContext,
    reference: &str,
) -> CompilationResult {
    let url = context.build_url(reference)?;
    let anchor = match url.fragment() {
        Some(fragment) if !fragment.is_empty() && !fragment.starts_with('/') => {
            Some(percent_decode_str(fragment).decode_utf8_lossy().into_owned())
        }
        _ => None,
    };
    let Some(anchor) = anchor else {
        // Without a plain-name fragment `$dynamicRef` behaves as `$ref`
        return compile_reference(context, reference, "$dynamicRef");
    };

    // Bookending: the statically referenced schema must declare the matching anchor
    let static_resolved = context
        .registry
        .resolve(&context.scope, reference, &context.absolute_location())
        .map_err(|error| match error {
            SchemaError::UnresolvedReference { .. } => SchemaError::Bookending {
                anchor: anchor.clone(),
                location: context.absolute_location(),
            },
            other => other,
        })?;
    let resolved = if context
        .registry
        .has_dynamic_anchor(&static_resolved.scope, &anchor)
    {
        // The outermost resource in the dynamic scope that declares the anchor wins
        context
            .registry
            .dynamic_anchor(&anchor, context.scopes())
            .unwrap_or(static_resolved)
    } else {
        // A static `$anchor` target makes this an ordinary reference
        static_resolved
    };
    let mut identity = resolved.scope.clone();
    identity.set_fragment(Some(&anchor));
    compile_resolved(context, resolved, identity, "$dynamicRef")
}

fn compile_recursive_reference(context: &CompilationContext) -> CompilationResult {
    // With no `$recursiveAnchor: true` in the dynamic scope, "#" means the current resource root
    let resolved = match context.registry.recursive_target(context.scopes()) {
        Some(resolved) => resolved,
        None => {
            context
                .registry
                .resolve(&context.scope, "#", &context.absolute_location())?
        }
    };
    let identity = resolved.scope.clone();
    compile_resolved(context, resolved, identity, "$recursiveRef")
}

fn invalid_reference(context: &CompilationContext, schema: &Value) -> SchemaError {
    context.unexpected_type(schema, PrimitiveType::String)
}

#[inline]
pub(crate) fn compile_ref(
    _: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    Some(
        schema
            .as_str()
            .ok_or_else(|| invalid_reference(context, schema))
            .and_then(|reference| compile_reference(context, reference, "$ref")),
    )
}

#[inline]
pub(crate) fn compile_dynamic_ref(
    _: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    Some(
        schema
            .as_str()
            .ok_or_else(|| invalid_reference(context, schema))
            .and_then(|reference| compile_dynamic_reference(context, reference)),
    )
}

#[inline]
pub(crate) fn compile_recursive_ref(
    _: &Map<String, Value>,
    schema: &Value,
    context: &CompilationContext,
) -> Option<CompilationResult> {
    Some(
        schema
            .as_str()
            .ok_or_else(|| invalid_reference(context, schema))
            .and_then(|_| compile_recursive_reference(context)),
    )
}
