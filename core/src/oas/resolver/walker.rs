#![deny(missing_docs)]

//! # Graph Walker
//!
//! Visits every reference-capable slot of a document, replacing `$ref`s with
//! the shared arena node they point at, or with an [`UnresolvedRef`] marker.
//!
//! Nodes are visited at most once per pass (tracked by arena id), which is what
//! keeps self-referential schemas from recursing forever. Pure `$ref` chains
//! that loop back on themselves are handled by the resolution cache instead.

use crate::error::{AppError, AppResult, ResolutionWarning, ResolveError};
use crate::oas::model::{
    AdditionalProperties, Components, Composition, Header, LocationIndex, MediaType, NodeId,
    NodeKind, Operation, Parameter, PathItem, RefOr, RequestBody, Response, Schema, Store,
    UnresolvedRef,
};
use crate::oas::parse::{import, Build};
use crate::oas::ref_utils::{child_pointer, format_pointer, Pointer};
use crate::oas::resolver::cache::{Lookup, ResolutionCache};
use crate::oas::resolver::remote::RemoteDocumentCache;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashSet;
use std::mem;
use tracing::{debug, warn};

/// One resolution cache per node kind.
#[derive(Default)]
pub(crate) struct Caches {
    schemas: ResolutionCache<Schema>,
    parameters: ResolutionCache<Parameter>,
    headers: ResolutionCache<Header>,
    responses: ResolutionCache<Response>,
    request_bodies: ResolutionCache<RequestBody>,
    path_items: ResolutionCache<PathItem>,
}

/// A node kind the walker can resolve into and descend through.
pub(crate) trait Walk: Build {
    /// This kind's resolution cache.
    fn cache(caches: &mut Caches) -> &mut ResolutionCache<Self>;

    /// Resolves every reference slot directly owned by the node.
    fn walk_children(&mut self, walker: &mut Walker<'_>, at: &str) -> AppResult<()>;
}

/// Mutable state of one resolution pass.
pub(crate) struct Walker<'a> {
    store: &'a mut Store,
    index: &'a mut LocationIndex,
    remote: RemoteDocumentCache<'a>,
    caches: Caches,
    base: Option<String>,
    strict: bool,
    visited: HashSet<(NodeKind, usize)>,
    pub(crate) warnings: Vec<ResolutionWarning>,
    pub(crate) resolved_sites: usize,
}

impl<'a> Walker<'a> {
    /// Fresh pass state over a document's store and index.
    pub(crate) fn new(
        store: &'a mut Store,
        index: &'a mut LocationIndex,
        remote: RemoteDocumentCache<'a>,
        base: Option<String>,
        strict: bool,
    ) -> Self {
        Self {
            store,
            index,
            remote,
            caches: Caches::default(),
            base,
            strict,
            visited: HashSet::new(),
            warnings: Vec::new(),
            resolved_sites: 0,
        }
    }

    /// Number of distinct external documents requested during the pass.
    pub(crate) fn fetched_documents(&self) -> usize {
        self.remote.len()
    }

    /// Walks components, then paths, then webhooks.
    pub(crate) fn walk_document(
        &mut self,
        components: &mut Components,
        paths: &mut IndexMap<String, RefOr<PathItem>>,
        webhooks: &mut IndexMap<String, RefOr<PathItem>>,
    ) -> AppResult<()> {
        self.walk_section(&mut components.schemas, &["components", "schemas"])?;
        self.walk_section(&mut components.parameters, &["components", "parameters"])?;
        self.walk_section(&mut components.headers, &["components", "headers"])?;
        self.walk_section(&mut components.responses, &["components", "responses"])?;
        self.walk_section(&mut components.request_bodies, &["components", "requestBodies"])?;
        self.walk_section(&mut components.path_items, &["components", "pathItems"])?;
        self.walk_section(paths, &["paths"])?;
        self.walk_section(webhooks, &["webhooks"])
    }

    fn walk_section<T: Walk>(
        &mut self,
        section: &mut IndexMap<String, RefOr<T>>,
        prefix: &[&str],
    ) -> AppResult<()> {
        let at = format_pointer("", prefix);
        for (name, slot) in section.iter_mut() {
            self.resolve_slot(slot, &child_pointer(&at, name))?;
        }
        Ok(())
    }

    /// Resolves one site in place and descends into whatever it now holds.
    pub(crate) fn resolve_slot<T: Walk>(&mut self, slot: &mut RefOr<T>, site: &str) -> AppResult<()> {
        match slot {
            RefOr::Ref(reference) => {
                let reference = reference.clone();
                match self.resolve_reference::<T>(&reference) {
                    Ok((id, key)) => {
                        *slot = RefOr::T(id);
                        self.resolved_sites += 1;
                        self.visit(id, &key)
                    }
                    Err(err) => {
                        if self.strict && err.is_remote() {
                            return Err(AppError::Resolve(err));
                        }
                        warn!("Leaving '{}' unresolved at {}: {}", reference, site, err);
                        self.warnings
                            .push(ResolutionWarning::new(&reference, site, &err));
                        *slot = RefOr::Unresolved(UnresolvedRef {
                            reference,
                            reason: err.to_string(),
                        });
                        Ok(())
                    }
                }
            }
            RefOr::T(id) => {
                let id = *id;
                self.visit(id, site)
            }
            RefOr::Unresolved(_) => Ok(()),
        }
    }

    fn visit<T: Walk>(&mut self, id: NodeId<T>, at: &str) -> AppResult<()> {
        if !self.visited.insert((T::KIND, id.index())) {
            return Ok(());
        }
        let mut node = match T::arena_mut(self.store).get_mut(id) {
            Some(node) => mem::take(node),
            None => return Ok(()),
        };
        let result = node.walk_children(self, at);
        if let Some(slot) = T::arena_mut(self.store).get_mut(id) {
            *slot = node;
        }
        result
    }

    /// Resolves a reference string to a node id, returning it with its cache key.
    fn resolve_reference<T: Walk>(
        &mut self,
        reference: &str,
    ) -> Result<(NodeId<T>, String), ResolveError> {
        let mut pointer = Pointer::parse(reference)?.qualify(self.base.as_deref());
        if self.base.as_deref() == Some(pointer.locator.as_str()) {
            pointer.locator.clear();
        }
        let key = pointer.to_string();

        match T::cache(&mut self.caches).lookup(&key) {
            Lookup::Resolved(id) => return Ok((id, key)),
            Lookup::Failed(err) => return Err(err),
            Lookup::InProgress => {
                let store = &mut *self.store;
                let id = T::cache(&mut self.caches)
                    .placeholder(&key, || T::arena_mut(store).alloc(T::default()));
                return Ok((id, key));
            }
            Lookup::Vacant => {}
        }

        T::cache(&mut self.caches).begin(&key);
        let result = match self.locate::<T>(&pointer, &key) {
            Ok(RefOr::T(id)) => Ok(id),
            Ok(RefOr::Ref(next)) => self.resolve_reference::<T>(&next).map(|(id, _)| id),
            Ok(RefOr::Unresolved(unresolved)) => Err(unresolvable(&key, unresolved.reason)),
            Err(err) => Err(err),
        };
        let id = T::cache(&mut self.caches).finish(&key, result)?;
        debug!("Resolved {} to {} {:?}", key, T::KIND, id);
        Ok((id, key))
    }

    /// Finds the slot a qualified pointer addresses, importing remote fragments on demand.
    fn locate<T: Walk>(&mut self, pointer: &Pointer, key: &str) -> Result<RefOr<T>, ResolveError> {
        if let Some(located) = self.index.get(key) {
            return T::unwrap(located).ok_or_else(|| {
                unresolvable(
                    key,
                    format!("expected a {} but found a {}", T::KIND, located.kind()),
                )
            });
        }
        if pointer.is_local() {
            return Err(unresolvable(key, "no referenceable node at this location"));
        }

        let document = self.remote.fetch(&pointer.locator)?;
        let value = walk_value(document, &pointer.segments)
            .ok_or_else(|| unresolvable(key, "no value at this location in the remote document"))?
            .clone();
        import::<T>(
            self.store,
            self.index,
            &pointer.locator,
            &pointer.segments,
            &value,
        )
        .map_err(|e| unresolvable(key, format!("not a valid {}: {}", T::KIND, e)))
    }

    fn walk_content(&mut self, content: &mut IndexMap<String, MediaType>, at: &str) -> AppResult<()> {
        let content_at = child_pointer(at, "content");
        for (media_type, media) in content.iter_mut() {
            if let Some(schema) = media.schema.as_mut() {
                let media_at = child_pointer(&content_at, media_type);
                self.resolve_slot(schema, &child_pointer(&media_at, "schema"))?;
            }
        }
        Ok(())
    }

    fn walk_list<T: Walk>(&mut self, list: &mut [RefOr<T>], at: &str) -> AppResult<()> {
        for (i, slot) in list.iter_mut().enumerate() {
            self.resolve_slot(slot, &child_pointer(at, &i.to_string()))?;
        }
        Ok(())
    }

    fn walk_map<T: Walk>(&mut self, map: &mut IndexMap<String, RefOr<T>>, at: &str) -> AppResult<()> {
        for (name, slot) in map.iter_mut() {
            self.resolve_slot(slot, &child_pointer(at, name))?;
        }
        Ok(())
    }

    fn walk_operation(&mut self, operation: &mut Operation, at: &str) -> AppResult<()> {
        self.walk_list(&mut operation.parameters, &child_pointer(at, "parameters"))?;
        if let Some(body) = operation.request_body.as_mut() {
            self.resolve_slot(body, &child_pointer(at, "requestBody"))?;
        }
        self.walk_map(&mut operation.responses, &child_pointer(at, "responses"))
    }
}

fn walk_value<'v>(value: &'v Value, segments: &[String]) -> Option<&'v Value> {
    segments.iter().try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn unresolvable(key: &str, reason: impl Into<String>) -> ResolveError {
    ResolveError::UnresolvableReference {
        reference: key.to_string(),
        reason: reason.into(),
    }
}

impl Walk for Schema {
    fn cache(caches: &mut Caches) -> &mut ResolutionCache<Self> {
        &mut caches.schemas
    }

    fn walk_children(&mut self, walker: &mut Walker<'_>, at: &str) -> AppResult<()> {
        walker.walk_map(&mut self.properties, &child_pointer(at, "properties"))?;
        if let Some(items) = self.items.as_mut() {
            walker.resolve_slot(items, &child_pointer(at, "items"))?;
        }
        for composition in Composition::ALL {
            if let Some(members) = self.composition_mut(composition).as_mut() {
                walker.walk_list(members, &child_pointer(at, composition.keyword()))?;
            }
        }
        if let Some(not) = self.not.as_mut() {
            walker.resolve_slot(not, &child_pointer(at, "not"))?;
        }
        if let Some(AdditionalProperties::Schema(extra)) = self.additional_properties.as_mut() {
            walker.resolve_slot(extra, &child_pointer(at, "additionalProperties"))?;
        }
        Ok(())
    }
}

impl Walk for Parameter {
    fn cache(caches: &mut Caches) -> &mut ResolutionCache<Self> {
        &mut caches.parameters
    }

    fn walk_children(&mut self, walker: &mut Walker<'_>, at: &str) -> AppResult<()> {
        if let Some(schema) = self.schema.as_mut() {
            walker.resolve_slot(schema, &child_pointer(at, "schema"))?;
        }
        walker.walk_content(&mut self.content, at)
    }
}

impl Walk for Header {
    fn cache(caches: &mut Caches) -> &mut ResolutionCache<Self> {
        &mut caches.headers
    }

    fn walk_children(&mut self, walker: &mut Walker<'_>, at: &str) -> AppResult<()> {
        if let Some(schema) = self.schema.as_mut() {
            walker.resolve_slot(schema, &child_pointer(at, "schema"))?;
        }
        walker.walk_content(&mut self.content, at)
    }
}

impl Walk for Response {
    fn cache(caches: &mut Caches) -> &mut ResolutionCache<Self> {
        &mut caches.responses
    }

    fn walk_children(&mut self, walker: &mut Walker<'_>, at: &str) -> AppResult<()> {
        walker.walk_map(&mut self.headers, &child_pointer(at, "headers"))?;
        walker.walk_content(&mut self.content, at)
    }
}

impl Walk for RequestBody {
    fn cache(caches: &mut Caches) -> &mut ResolutionCache<Self> {
        &mut caches.request_bodies
    }

    fn walk_children(&mut self, walker: &mut Walker<'_>, at: &str) -> AppResult<()> {
        walker.walk_content(&mut self.content, at)
    }
}

impl Walk for PathItem {
    fn cache(caches: &mut Caches) -> &mut ResolutionCache<Self> {
        &mut caches.path_items
    }

    fn walk_children(&mut self, walker: &mut Walker<'_>, at: &str) -> AppResult<()> {
        walker.walk_list(&mut self.parameters, &child_pointer(at, "parameters"))?;
        for (method, operation) in self.operations.iter_mut() {
            walker.walk_operation(operation, &child_pointer(at, method))?;
        }
        Ok(())
    }
}
