//! Compilation context: the stack of base-URI scopes and the schema path of the current site.
use super::{options::CompilationOptions, DEFAULT_SCHEME};
use crate::{
    error::SchemaError,
    paths::{InstancePath, JSONPointer, PathChunk},
    primitive_type::{PrimitiveType, PrimitiveTypesBitMap},
    resolver::{Registry, ResolvedSchema},
    schemas::{self, Draft},
};
use ahash::AHashSet;
use serde_json::Value;
use std::{borrow::Cow, cell::RefCell, rc::Rc, sync::Arc};
use url::Url;

/// Holds the state threaded through the schema walk: the current base URI scope, the dialect in
/// effect, the path to the current keyword and the dynamic scope of entered resources.
#[derive(Debug, Clone)]
pub(crate) struct CompilationContext<'a> {
    pub(crate) scope: Cow<'a, Url>,
    pub(crate) config: Arc<CompilationOptions>,
    pub(crate) registry: Arc<Registry>,
    pub(crate) draft: Draft,
    pub(crate) schema_path: InstancePath<'a>,
    // References whose targets are already being compiled; a repeated target is a cycle
    seen: Rc<RefCell<AHashSet<String>>>,
    // Resources entered so far, outermost first; searched by dynamic references
    dynamic_scope: Rc<Vec<Url>>,
}

impl<'a> CompilationContext<'a> {
    pub(crate) fn new(
        scope: Url,
        config: Arc<CompilationOptions>,
        registry: Arc<Registry>,
        draft: Draft,
    ) -> Self {
        let dynamic_scope = Rc::new(vec![scope.clone()]);
        CompilationContext {
            scope: Cow::Owned(scope),
            config,
            registry,
            draft,
            schema_path: InstancePath::new(),
            seen: Rc::new(RefCell::new(AHashSet::new())),
            dynamic_scope,
        }
    }

    /// Rebuild a context from the state captured by a lazily compiled reference target.
    pub(crate) fn resumed(
        scope: Url,
        config: Arc<CompilationOptions>,
        registry: Arc<Registry>,
        draft: Draft,
        dynamic_scope: Vec<Url>,
    ) -> Self {
        CompilationContext {
            scope: Cow::Owned(scope),
            config,
            registry,
            draft,
            schema_path: InstancePath::new(),
            seen: Rc::new(RefCell::new(AHashSet::new())),
            dynamic_scope: Rc::new(dynamic_scope),
        }
    }

    pub(crate) const fn draft(&self) -> Draft {
        self.draft
    }

    /// Enter a subschema. All URLs built from the new context will resolve against the scope of
    /// the innermost `$id`:
    ///
    /// Before push:
    ///    scope = http://example.com/
    ///    build_url("#/definitions/foo") -> "http://example.com/#/definitions/foo"
    /// After pushing the schema {"$id": "folder/", ...}:
    ///    scope = http://example.com/folder/
    ///    build_url("#/definitions/foo") -> "http://example.com/folder/#/definitions/foo"
    ///
    /// A `$schema` on the subschema switches the dialect for its subtree.
    #[inline]
    pub(crate) fn push(&'a self, schema: &Value) -> Result<Self, SchemaError> {
        let draft = match schemas::dialect_of(schema) {
            Some(dialect) => {
                schemas::draft_from_url(dialect).ok_or_else(|| SchemaError::UnknownDialect {
                    uri: dialect.to_string(),
                })?
            }
            None => self.draft,
        };
        if let Some(id) = schemas::id_of(draft, schema) {
            let mut scope =
                Url::options()
                    .base_url(Some(&self.scope))
                    .parse(id)
                    .map_err(|_| SchemaError::InvalidUrl {
                        reference: id.to_string(),
                        location: self.absolute_location(),
                    })?;
            if scope.fragment() == Some("") {
                scope.set_fragment(None);
            }
            // Anchor-form identifiers do not open a new resource scope
            if scope.fragment().is_some() {
                return Ok(self.with_draft(draft));
            }
            let mut dynamic_scope = (*self.dynamic_scope).clone();
            dynamic_scope.push(scope.clone());
            Ok(CompilationContext {
                scope: Cow::Owned(scope),
                config: Arc::clone(&self.config),
                registry: Arc::clone(&self.registry),
                draft,
                schema_path: self.schema_path.clone(),
                seen: Rc::clone(&self.seen),
                dynamic_scope: Rc::new(dynamic_scope),
            })
        } else {
            Ok(self.with_draft(draft))
        }
    }

    fn with_draft(&'a self, draft: Draft) -> Self {
        CompilationContext {
            scope: Cow::Borrowed(self.scope.as_ref()),
            config: Arc::clone(&self.config),
            registry: Arc::clone(&self.registry),
            draft,
            schema_path: self.schema_path.clone(),
            seen: Rc::clone(&self.seen),
            dynamic_scope: Rc::clone(&self.dynamic_scope),
        }
    }

    #[inline]
    pub(crate) fn with_path(&'a self, chunk: impl Into<PathChunk>) -> Self {
        CompilationContext {
            scope: Cow::Borrowed(self.scope.as_ref()),
            config: Arc::clone(&self.config),
            registry: Arc::clone(&self.registry),
            draft: self.draft,
            schema_path: self.schema_path.push(chunk),
            seen: Rc::clone(&self.seen),
            dynamic_scope: Rc::clone(&self.dynamic_scope),
        }
    }

    /// Enter a resolved reference target: new scope, possibly new dialect, and the target's
    /// resource pushed onto the dynamic scope.
    pub(crate) fn in_resolved(
        &'a self,
        resolved: &ResolvedSchema,
        keyword: &'static str,
    ) -> CompilationContext<'a> {
        let mut dynamic_scope = (*self.dynamic_scope).clone();
        dynamic_scope.push(resolved.scope.clone());
        CompilationContext {
            scope: Cow::Owned(resolved.scope.clone()),
            config: Arc::clone(&self.config),
            registry: Arc::clone(&self.registry),
            draft: resolved.draft,
            schema_path: self.schema_path.push(keyword),
            seen: Rc::clone(&self.seen),
            dynamic_scope: Rc::new(dynamic_scope),
        }
    }

    /// Create a JSON Pointer from the current `schema_path`.
    #[inline]
    pub(crate) fn into_pointer(self) -> JSONPointer {
        (&self.schema_path).into()
    }

    /// Create a JSON Pointer from the current `schema_path` & a new chunk.
    #[inline]
    pub(crate) fn as_pointer_with(&self, chunk: impl Into<PathChunk>) -> JSONPointer {
        (&self.schema_path.push(chunk)).into()
    }

    /// Build a new URL. Used for `$ref` compilation to keep their full paths.
    pub(crate) fn build_url(&self, reference: &str) -> Result<Url, SchemaError> {
        Url::options()
            .base_url(Some(&self.scope))
            .parse(reference)
            .map_err(|_| SchemaError::InvalidUrl {
                reference: reference.to_string(),
                location: self.absolute_location(),
            })
    }

    /// The absolute URI of the current schema site, for diagnostics.
    pub(crate) fn absolute_location(&self) -> String {
        let mut url = self.scope.as_ref().clone();
        let fragment = JSONPointer::from(&self.schema_path).to_string();
        if !fragment.is_empty() {
            url.set_fragment(Some(&fragment));
        }
        url.to_string()
    }

    /// The base URI of the current scope, unless it is the synthetic default.
    pub(crate) fn base_uri(&self) -> Option<Url> {
        if self.scope.scheme() == DEFAULT_SCHEME {
            None
        } else {
            Some(self.scope.as_ref().clone())
        }
    }

    pub(crate) fn scopes(&self) -> &[Url] {
        &self.dynamic_scope
    }

    pub(crate) fn is_seen(&self, url: &Url) -> bool {
        self.seen.borrow().contains(url.as_str())
    }

    pub(crate) fn mark_seen(&self, url: &Url) {
        self.seen.borrow_mut().insert(url.to_string());
    }

    pub(crate) fn supports_adjacent_validation(&self) -> bool {
        self.draft.supports_adjacent_validation()
    }

    pub(crate) fn validates_formats_by_default(&self) -> bool {
        self.config
            .validate_formats()
            .unwrap_or_else(|| self.draft.validates_formats_by_default())
    }

    /// Shortcut for "a keyword received an argument of the wrong JSON type".
    pub(crate) fn unexpected_type(&self, schema: &Value, expected: PrimitiveType) -> SchemaError {
        SchemaError::UnexpectedType {
            location: self.absolute_location(),
            expected: PrimitiveTypesBitMap::new().add_type(expected),
            found: schema.clone(),
        }
    }

    pub(crate) fn unexpected_types(
        &self,
        schema: &Value,
        expected: PrimitiveTypesBitMap,
    ) -> SchemaError {
        SchemaError::UnexpectedType {
            location: self.absolute_location(),
            expected,
            found: schema.clone(),
        }
    }
}
