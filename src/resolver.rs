//! Schema identifier registry and reference resolution.
//!
//! Every loaded document is walked once (`register_tree`) to record, under their canonical
//! absolute URIs: embedded resources (`$id`/`id`), plain-name anchors (`$anchor`, `#name`
//! identifiers, `$dynamicAnchor`) and dynamic/recursive anchors. JSON Pointer fragments are
//! resolved against the raw documents, so references may point into subtrees that sit under
//! unrecognized keywords. Documents that are not present are requested from the caller-supplied
//! resolver chain; the bundled meta-schemas are always available as the last resolver in the
//! chain.
use crate::{
    error::SchemaError,
    schemas::{self, Draft},
};
use ahash::{AHashMap, AHashSet};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use percent_encoding::percent_decode_str;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// A resolver for external schema documents.
///
/// Given the absolute, fragment-less URI of a document, return its contents or `None` when the
/// document is not available. Resolvers are consulted in registration order; the first `Some`
/// wins. Implementations must not panic across this boundary.
///
/// Internal references such as `#/definitions` and JSON Pointers are handled by the compiler
/// itself and never reach a resolver.
pub trait SchemaResolver: Send + Sync {
    /// Resolve a document by its URI, or signal "not available" with `None`.
    fn resolve(&self, url: &Url) -> Option<Arc<Value>>;
}

/// A schema found in the registry: its contents together with the base URI scope and the
/// dialect in effect at its location.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedSchema {
    pub(crate) scope: Url,
    pub(crate) contents: Arc<Value>,
    pub(crate) draft: Draft,
}

#[derive(Default)]
pub(crate) struct Registry {
    // Fields are behind locks because external documents may be registered while
    // compilation is in progress.
    // canonical URI (including `base#anchor` forms) -> registered schema
    schemas: RwLock<AHashMap<String, ResolvedSchema>>,
    // (resource base URI, anchor name) -> target, for `$dynamicRef` scope searches
    dynamic_anchors: RwLock<AHashMap<(String, String), ResolvedSchema>>,
    // resource base URIs carrying `$recursiveAnchor: true`
    recursive_anchors: RwLock<AHashSet<String>>,
    // fragment-less document URI -> (document, dialect)
    documents: RwLock<AHashMap<String, (Arc<Value>, Draft)>>,
    resolvers: Vec<Arc<dyn SchemaResolver>>,
}

impl Registry {
    pub(crate) fn new(
        draft: Draft,
        scope: &Url,
        document: Arc<Value>,
        store: &[(String, Arc<Value>)],
        mut resolvers: Vec<Arc<dyn SchemaResolver>>,
    ) -> Result<Registry, SchemaError> {
        resolvers.push(Arc::new(MetaSchemaResolver));
        let registry = Registry {
            resolvers,
            ..Registry::default()
        };
        registry.register_document(scope, document, draft)?;
        for (uri, contents) in store {
            let url = Url::parse(uri).map_err(|_| SchemaError::InvalidUrl {
                reference: uri.clone(),
                location: scope.to_string(),
            })?;
            registry.register_document(&url, Arc::clone(contents), draft)?;
        }
        Ok(registry)
    }

    /// Register a document and every identifiable subschema inside it.
    pub(crate) fn register_document(
        &self,
        url: &Url,
        document: Arc<Value>,
        default_draft: Draft,
    ) -> Result<(), SchemaError> {
        let draft = match schemas::dialect_of(&document) {
            Some(dialect) => schemas::draft_from_url(dialect).ok_or_else(|| {
                SchemaError::UnknownDialect {
                    uri: dialect.to_string(),
                }
            })?,
            None => default_draft,
        };
        let base = fragmentless(url);
        self.documents
            .write()
            .insert(base.to_string(), (Arc::clone(&document), draft));
        self.schemas.write().insert(
            base.to_string(),
            ResolvedSchema {
                scope: base.clone(),
                contents: Arc::clone(&document),
                draft,
            },
        );
        self.register_tree(draft, &document, &base)
    }

    fn register_tree(&self, draft: Draft, schema: &Value, base: &Url) -> Result<(), SchemaError> {
        match schema {
            Value::Object(object) => {
                let mut draft = draft;
                if let Some(dialect) = schemas::dialect_of(schema) {
                    draft = schemas::draft_from_url(dialect).ok_or_else(|| {
                        SchemaError::UnknownDialect {
                            uri: dialect.to_string(),
                        }
                    })?;
                }
                let mut current_base = base.clone();
                if let Some(id) = schemas::id_of(draft, schema) {
                    let mut resolved =
                        base.join(id).map_err(|_| SchemaError::InvalidUrl {
                            reference: id.to_string(),
                            location: base.to_string(),
                        })?;
                    // Empty fragments are not distinguishable from absent ones
                    if resolved.fragment() == Some("") {
                        resolved.set_fragment(None);
                    }
                    let entry = ResolvedSchema {
                        scope: fragmentless(&resolved),
                        contents: Arc::new(schema.clone()),
                        draft,
                    };
                    self.schemas.write().insert(resolved.to_string(), entry);
                    // Identifiers of the `#name` form are plain-name anchors and do not
                    // open a new resource scope
                    if resolved.fragment().is_none() {
                        current_base = resolved;
                    }
                }
                if draft >= Draft::Draft201909 {
                    if let Some(anchor) = object.get("$anchor").and_then(Value::as_str) {
                        self.register_anchor(&current_base, anchor, schema, draft);
                    }
                }
                if draft == Draft::Draft201909
                    && object.get("$recursiveAnchor") == Some(&Value::Bool(true))
                {
                    self.recursive_anchors
                        .write()
                        .insert(fragmentless(&current_base).to_string());
                }
                if draft == Draft::Draft202012 {
                    if let Some(anchor) = object.get("$dynamicAnchor").and_then(Value::as_str) {
                        let entry = self.register_anchor(&current_base, anchor, schema, draft);
                        self.dynamic_anchors.write().insert(
                            (fragmentless(&current_base).to_string(), anchor.to_string()),
                            entry,
                        );
                    }
                }
                for (key, subschema) in object {
                    if key == "enum" || key == "const" {
                        continue;
                    }
                    self.register_tree(draft, subschema, &current_base)?;
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.register_tree(draft, item, base)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn register_anchor(
        &self,
        base: &Url,
        anchor: &str,
        schema: &Value,
        draft: Draft,
    ) -> ResolvedSchema {
        let mut url = fragmentless(base);
        url.set_fragment(Some(anchor));
        let entry = ResolvedSchema {
            scope: fragmentless(base),
            contents: Arc::new(schema.clone()),
            draft,
        };
        self.schemas.write().insert(url.to_string(), entry.clone());
        entry
    }

    /// Resolve `reference` against `scope` to a schema. Missing documents are requested from
    /// the resolver chain; failure to obtain them is fatal.
    pub(crate) fn resolve(
        &self,
        scope: &Url,
        reference: &str,
        location: &str,
    ) -> Result<ResolvedSchema, SchemaError> {
        let mut url = Url::options()
            .base_url(Some(scope))
            .parse(reference)
            .map_err(|_| SchemaError::InvalidUrl {
                reference: reference.to_string(),
                location: location.to_string(),
            })?;
        if url.fragment() == Some("") {
            url.set_fragment(None);
        }
        let unresolved = || SchemaError::UnresolvedReference {
            reference: reference.to_string(),
            location: location.to_string(),
        };

        if let Some(entry) = self.schemas.read().get(url.as_str()) {
            return Ok(entry.clone());
        }

        let document_url = fragmentless(&url);
        if !self.is_registered(&document_url) {
            self.load_external(&document_url, location)?;
            // A freshly loaded document may have registered the exact identifier
            if let Some(entry) = self.schemas.read().get(url.as_str()) {
                return Ok(entry.clone());
            }
        }

        match url.fragment() {
            None => self
                .schemas
                .read()
                .get(document_url.as_str())
                .cloned()
                .ok_or_else(unresolved),
            Some(fragment) if fragment.starts_with('/') => {
                let fragment = percent_decode_str(fragment)
                    .decode_utf8()
                    .map_err(|_| unresolved())?;
                let (contents, draft, base) =
                    self.container_of(&document_url).ok_or_else(unresolved)?;
                let (folders, resolved) =
                    pointer(draft, &contents, fragment.as_ref()).ok_or_else(unresolved)?;
                let scope = join_folders(base, &folders).map_err(|_| unresolved())?;
                Ok(ResolvedSchema {
                    scope,
                    contents: Arc::new(resolved.clone()),
                    draft,
                })
            }
            // A plain-name anchor that is not in the registry cannot be resolved
            Some(_) => Err(unresolved()),
        }
    }

    /// Search the dynamic scope, outermost first, for a `$dynamicAnchor` with the given name.
    pub(crate) fn dynamic_anchor(&self, name: &str, scopes: &[Url]) -> Option<ResolvedSchema> {
        let anchors = self.dynamic_anchors.read();
        for scope in scopes {
            if let Some(entry) = anchors.get(&(fragmentless(scope).to_string(), name.to_string()))
            {
                return Some(entry.clone());
            }
        }
        None
    }

    /// Search the dynamic scope, outermost first, for a resource with `$recursiveAnchor: true`.
    pub(crate) fn recursive_target(&self, scopes: &[Url]) -> Option<ResolvedSchema> {
        let recursive = self.recursive_anchors.read();
        for scope in scopes {
            let key = fragmentless(scope).to_string();
            if recursive.contains(&key) {
                return self.schemas.read().get(&key).cloned();
            }
        }
        None
    }

    /// Whether a `$dynamicAnchor` with this name exists in the resource identified by `scope`.
    pub(crate) fn has_dynamic_anchor(&self, scope: &Url, name: &str) -> bool {
        self.dynamic_anchors
            .read()
            .contains_key(&(fragmentless(scope).to_string(), name.to_string()))
    }

    fn is_registered(&self, document_url: &Url) -> bool {
        self.documents.read().contains_key(document_url.as_str())
            || self.schemas.read().contains_key(document_url.as_str())
    }

    /// The document (or embedded resource) that can serve JSON Pointer lookups for `url`.
    fn container_of(&self, url: &Url) -> Option<(Arc<Value>, Draft, Url)> {
        if let Some((document, draft)) = self.documents.read().get(url.as_str()) {
            return Some((Arc::clone(document), *draft, url.clone()));
        }
        self.schemas
            .read()
            .get(url.as_str())
            .map(|entry| (Arc::clone(&entry.contents), entry.draft, entry.scope.clone()))
    }

    fn load_external(&self, document_url: &Url, location: &str) -> Result<(), SchemaError> {
        for resolver in &self.resolvers {
            if let Some(document) = resolver.resolve(document_url) {
                return self.register_document(document_url, document, Draft::default());
            }
        }
        Err(SchemaError::UnresolvedReference {
            reference: document_url.to_string(),
            location: location.to_string(),
        })
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("schemas", &self.schemas.read().len())
            .field("documents", &self.documents.read().len())
            .finish()
    }
}

fn fragmentless(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

fn join_folders(mut resource: Url, folders: &[&str]) -> Result<Url, url::ParseError> {
    // The first folder is the resource's own identifier
    if folders.len() > 1 {
        for folder in folders.iter().skip(1) {
            resource = resource.join(folder)?;
        }
    }
    Ok(resource)
}

/// Based on `serde_json` pointer lookup, but tracks `$id` folders in the traversed documents so
/// that the resolved schema's base URI accounts for intermediate scope changes.
pub(crate) fn pointer<'a>(
    draft: Draft,
    document: &'a Value,
    pointer: &str,
) -> Option<(Vec<&'a str>, &'a Value)> {
    if pointer.is_empty() {
        return Some((vec![], document));
    }
    if !pointer.starts_with('/') {
        return None;
    }
    let tokens = pointer
        .split('/')
        .skip(1)
        .map(|token| token.replace("~1", "/").replace("~0", "~"));
    let mut target = document;
    let mut folders = vec![];

    for token in tokens {
        let target_opt = match *target {
            Value::Object(ref map) => {
                if let Some(id) = schemas::id_of(draft, target) {
                    folders.push(id);
                }
                map.get(&token)
            }
            Value::Array(ref list) => parse_index(&token).and_then(|idx| list.get(idx)),
            _ => return None,
        };
        if let Some(next) = target_opt {
            target = next;
        } else {
            return None;
        }
    }
    Some((folders, target))
}

fn parse_index(token: &str) -> Option<usize> {
    if token.starts_with('+') || (token.starts_with('0') && token.len() != 1) {
        None
    } else {
        token.parse().ok()
    }
}

macro_rules! bundled {
    ($path:expr) => {
        Arc::new(
            serde_json::from_slice(include_bytes!($path)).expect("Invalid bundled meta-schema"),
        )
    };
}

pub(crate) static META_SCHEMAS: Lazy<AHashMap<&'static str, Arc<Value>>> = Lazy::new(|| {
    let mut store = AHashMap::with_capacity(16);
    store.insert(
        "http://json-schema.org/draft-04/schema",
        bundled!("metaschemas/draft4.json"),
    );
    store.insert(
        "http://json-schema.org/draft-06/schema",
        bundled!("metaschemas/draft6.json"),
    );
    store.insert(
        "http://json-schema.org/draft-07/schema",
        bundled!("metaschemas/draft7.json"),
    );
    store.insert(
        "https://json-schema.org/draft/2019-09/schema",
        bundled!("metaschemas/draft2019-09/schema.json"),
    );
    store.insert(
        "https://json-schema.org/draft/2019-09/meta/core",
        bundled!("metaschemas/draft2019-09/meta/core.json"),
    );
    store.insert(
        "https://json-schema.org/draft/2019-09/meta/applicator",
        bundled!("metaschemas/draft2019-09/meta/applicator.json"),
    );
    store.insert(
        "https://json-schema.org/draft/2019-09/meta/validation",
        bundled!("metaschemas/draft2019-09/meta/validation.json"),
    );
    store.insert(
        "https://json-schema.org/draft/2019-09/meta/meta-data",
        bundled!("metaschemas/draft2019-09/meta/meta-data.json"),
    );
    store.insert(
        "https://json-schema.org/draft/2019-09/meta/format",
        bundled!("metaschemas/draft2019-09/meta/format.json"),
    );
    store.insert(
        "https://json-schema.org/draft/2019-09/meta/content",
        bundled!("metaschemas/draft2019-09/meta/content.json"),
    );
    store.insert(
        "https://json-schema.org/draft/2020-12/schema",
        bundled!("metaschemas/draft2020-12/schema.json"),
    );
    store.insert(
        "https://json-schema.org/draft/2020-12/meta/core",
        bundled!("metaschemas/draft2020-12/meta/core.json"),
    );
    store.insert(
        "https://json-schema.org/draft/2020-12/meta/applicator",
        bundled!("metaschemas/draft2020-12/meta/applicator.json"),
    );
    store.insert(
        "https://json-schema.org/draft/2020-12/meta/unevaluated",
        bundled!("metaschemas/draft2020-12/meta/unevaluated.json"),
    );
    store.insert(
        "https://json-schema.org/draft/2020-12/meta/validation",
        bundled!("metaschemas/draft2020-12/meta/validation.json"),
    );
    store.insert(
        "https://json-schema.org/draft/2020-12/meta/meta-data",
        bundled!("metaschemas/draft2020-12/meta/meta-data.json"),
    );
    store.insert(
        "https://json-schema.org/draft/2020-12/meta/format-annotation",
        bundled!("metaschemas/draft2020-12/meta/format-annotation.json"),
    );
    store.insert(
        "https://json-schema.org/draft/2020-12/meta/content",
        bundled!("metaschemas/draft2020-12/meta/content.json"),
    );
    store
});

/// Serves the official meta-schema documents for every supported dialect by their canonical
/// URIs. Always the last resolver in the chain.
pub(crate) struct MetaSchemaResolver;

impl SchemaResolver for MetaSchemaResolver {
    fn resolve(&self, url: &Url) -> Option<Arc<Value>> {
        META_SCHEMAS.get(url.as_str()).map(Arc::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_registry(schema: &Value) -> Registry {
        Registry::new(
            Draft::Draft7,
            &Url::parse("json-schema:///").unwrap(),
            Arc::new(schema.clone()),
            &[],
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn only_keyword() {
        // When only one keyword is specified, only the root document is registered
        let schema = json!({"type": "string"});
        let registry = make_registry(&schema);
        assert_eq!(registry.schemas.read().len(), 1);
    }

    #[test]
    fn sub_schema_in_object() {
        let schema = json!({
            "allOf": [{"$ref": "#foo"}],
            "definitions": {
                "A": {"$id": "#foo", "type": "integer"}
            }
        });
        let registry = make_registry(&schema);
        let schemas = registry.schemas.read();
        assert_eq!(
            schemas.get("json-schema:///#foo").map(|e| &*e.contents),
            schema.pointer("/definitions/A")
        );
    }

    #[test]
    fn root_schema_id() {
        let schema = json!({
            "$id": "http://localhost:1234/tree",
            "definitions": {
                "node": {
                    "$id": "http://localhost:1234/node",
                    "properties": {
                        "subtree": {"$ref": "tree"},
                        "value": {"type": "number"}
                    },
                    "type": "object"
                }
            },
            "properties": {
                "meta": {"type": "string"},
                "nodes": {
                    "items": {"$ref": "node"},
                    "type": "array"
                }
            },
            "type": "object"
        });
        let registry = Registry::new(
            Draft::Draft7,
            &Url::parse("http://localhost:1234/tree").unwrap(),
            Arc::new(schema.clone()),
            &[],
            vec![],
        )
        .unwrap();
        let schemas = registry.schemas.read();
        assert_eq!(
            schemas
                .get("http://localhost:1234/node")
                .map(|e| &*e.contents),
            schema.pointer("/definitions/node")
        );
    }

    #[test]
    fn base_uri_change() {
        let schema = json!({
            "$id": "http://localhost:1234/",
            "items": {
                "$id": "folder/",
                "items": {"type": "integer"}
            }
        });
        let registry = Registry::new(
            Draft::Draft7,
            &Url::parse("http://localhost:1234/").unwrap(),
            Arc::new(schema.clone()),
            &[],
            vec![],
        )
        .unwrap();
        let schemas = registry.schemas.read();
        assert_eq!(
            schemas
                .get("http://localhost:1234/folder/")
                .map(|e| &*e.contents),
            schema.pointer("/items")
        );
    }

    #[test]
    fn pointer_tracks_folders() {
        let schema = json!({
            "definitions": {
                "baz": {
                    "$id": "folder/",
                    "items": {"type": "integer"}
                }
            }
        });
        let (folders, resolved) =
            pointer(Draft::Draft7, &schema, "/definitions/baz/items").unwrap();
        assert_eq!(folders, vec!["folder/"]);
        assert_eq!(resolved, schema.pointer("/definitions/baz/items").unwrap());
    }

    #[test]
    fn resolve_by_pointer() {
        let schema = json!({
            "definitions": {
                "a": {"type": "integer"}
            }
        });
        let registry = make_registry(&schema);
        let resolved = registry
            .resolve(
                &Url::parse("json-schema:///").unwrap(),
                "#/definitions/a",
                "json-schema:///",
            )
            .unwrap();
        assert_eq!(&*resolved.contents, schema.pointer("/definitions/a").unwrap());
    }

    #[test]
    fn unresolvable_reference() {
        let registry = make_registry(&json!({}));
        let error = registry.resolve(
            &Url::parse("json-schema:///").unwrap(),
            "http://example.com/missing.json",
            "json-schema:///",
        );
        assert!(matches!(
            error,
            Err(SchemaError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn meta_schemas_are_served() {
        let registry = make_registry(&json!({}));
        let resolved = registry
            .resolve(
                &Url::parse("json-schema:///").unwrap(),
                "http://json-schema.org/draft-07/schema",
                "json-schema:///",
            )
            .unwrap();
        assert!(resolved.contents.get("definitions").is_some());
    }
}
