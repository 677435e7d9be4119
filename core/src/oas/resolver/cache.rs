#![deny(missing_docs)]

//! # Resolution Cache
//!
//! Memoizes "qualified reference key -> resolved node" for one node kind, with
//! an explicit in-progress state so that a reference chain looping back onto
//! itself terminates instead of recursing forever.

use crate::error::ResolveError;
use crate::oas::model::NodeId;
use std::collections::HashMap;
use tracing::debug;

/// Current state of a key, as seen by a resolver about to work on it.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// Never seen. The caller should [`ResolutionCache::begin`] and resolve it.
    Vacant,
    /// Resolution of this key is on the current stack: a reference cycle.
    InProgress,
    /// Already resolved to this node.
    Resolved(NodeId<T>),
    /// Already failed with this error.
    Failed(ResolveError),
}

#[derive(Debug)]
enum CacheState<T> {
    /// Holds the placeholder allocated if a cycle was hit while in progress.
    InProgress(Option<NodeId<T>>),
    Resolved(NodeId<T>),
    Failed(ResolveError),
}

/// Per-pass memo of resolved references for one node kind.
#[derive(Debug)]
pub struct ResolutionCache<T> {
    entries: HashMap<String, CacheState<T>>,
}

impl<T> Default for ResolutionCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> ResolutionCache<T> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks a key up without changing state.
    pub fn lookup(&self, key: &str) -> Lookup<T> {
        match self.entries.get(key) {
            None => Lookup::Vacant,
            Some(CacheState::InProgress(_)) => Lookup::InProgress,
            Some(CacheState::Resolved(id)) => {
                debug!("Resolution cache hit: {}", key);
                Lookup::Resolved(*id)
            }
            Some(CacheState::Failed(err)) => Lookup::Failed(err.clone()),
        }
    }

    /// Marks a key as in progress.
    pub fn begin(&mut self, key: &str) {
        self.entries
            .insert(key.to_string(), CacheState::InProgress(None));
    }

    /// Returns the node standing in for an in-progress key.
    ///
    /// The first call allocates it through `alloc`; later calls for the same key
    /// return the same id. Once the key finishes, the resolution result is the
    /// placeholder itself, so every site caught in the cycle shares one node.
    pub fn placeholder(&mut self, key: &str, alloc: impl FnOnce() -> NodeId<T>) -> NodeId<T> {
        match self.entries.get_mut(key) {
            Some(CacheState::InProgress(Some(id))) => *id,
            Some(CacheState::InProgress(slot)) => {
                let id = alloc();
                debug!("Reference cycle at {}; using placeholder {:?}", key, id);
                *slot = Some(id);
                id
            }
            Some(CacheState::Resolved(id)) => *id,
            Some(CacheState::Failed(_)) | None => {
                let id = alloc();
                self.entries
                    .insert(key.to_string(), CacheState::InProgress(Some(id)));
                id
            }
        }
    }

    /// Records the outcome for a key and returns the value callers should use.
    ///
    /// If a placeholder was handed out while the key was in progress, a
    /// successful result is replaced by the placeholder.
    pub fn finish(
        &mut self,
        key: &str,
        result: Result<NodeId<T>, ResolveError>,
    ) -> Result<NodeId<T>, ResolveError> {
        let placeholder = match self.entries.get(key) {
            Some(CacheState::InProgress(placeholder)) => *placeholder,
            _ => None,
        };
        let outcome = match (result, placeholder) {
            (Ok(_), Some(id)) => Ok(id),
            (other, _) => other,
        };
        let state = match &outcome {
            Ok(id) => CacheState::Resolved(*id),
            Err(err) => CacheState::Failed(err.clone()),
        };
        self.entries.insert(key.to_string(), state);
        outcome
    }

    /// Number of keys with a recorded outcome or in progress.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oas::model::{Arena, Schema};

    #[test]
    fn test_vacant_then_resolved() {
        let mut arena: Arena<Schema> = Arena::default();
        let id = arena.alloc(Schema::default());
        let mut cache = ResolutionCache::new();

        assert_eq!(cache.lookup("#/components/schemas/Pet"), Lookup::Vacant);
        cache.begin("#/components/schemas/Pet");
        assert_eq!(cache.lookup("#/components/schemas/Pet"), Lookup::InProgress);

        let out = cache.finish("#/components/schemas/Pet", Ok(id));
        assert_eq!(out, Ok(id));
        assert_eq!(cache.lookup("#/components/schemas/Pet"), Lookup::Resolved(id));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failure_is_remembered() {
        let mut cache: ResolutionCache<Schema> = ResolutionCache::new();
        let err = ResolveError::UnresolvableReference {
            reference: "#/components/schemas/Missing".into(),
            reason: "no node at this location".into(),
        };
        cache.begin("#/components/schemas/Missing");
        let out = cache.finish("#/components/schemas/Missing", Err(err.clone()));
        assert_eq!(out, Err(err.clone()));
        assert_eq!(
            cache.lookup("#/components/schemas/Missing"),
            Lookup::Failed(err)
        );
    }

    #[test]
    fn test_placeholder_is_shared_and_wins() {
        let mut arena: Arena<Schema> = Arena::default();
        let real = arena.alloc(Schema::default());
        let mut cache = ResolutionCache::new();

        cache.begin("#/a");
        let first = cache.placeholder("#/a", || arena.alloc(Schema::default()));
        let second = cache.placeholder("#/a", || panic!("placeholder allocated twice"));
        assert_eq!(first, second);
        assert_ne!(first, real);

        assert_eq!(cache.finish("#/a", Ok(real)), Ok(first));
        assert_eq!(cache.lookup("#/a"), Lookup::Resolved(first));
        assert_eq!(arena.len(), 2);
    }
}
