//! Typed-key heterogeneous metadata map.
//!
//! A [`Key<V>`] is a process-unique, strongly-typed identifier. Two keys
//! created independently are always distinct, even if both were created for
//! the same `V`. A [`MetaMap`] binds keys to values; the value type bound to
//! a lookup is fixed by the key used to look it up, so it is impossible to
//! observe a value under a key of the wrong type.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_KEY_ID: AtomicU64 = AtomicU64::new(0);

/// A process-unique key for a value of type `V` stored in a [`MetaMap`].
///
/// `Key`s are cheap to copy and compare; identity is carried entirely by
/// `id`, allocated from a single global counter so that two keys are equal
/// only if one was cloned from the other.
pub struct Key<V> {
    id: u64,
    _marker: PhantomData<fn() -> V>,
}

impl<V> Key<V> {
    /// The process-unique integer id backing this key.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl<V> Clone for Key<V> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<V> Copy for Key<V> {}

impl<V> PartialEq for Key<V> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<V> Eq for Key<V> {}

impl<V> fmt::Debug for Key<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key").field("id", &self.id).finish()
    }
}

/// Allocates a new, process-unique key for values of type `V`.
///
/// Every call returns a key distinct from every other key ever created,
/// including previous keys created for the same `V`.
pub fn create_key<V>() -> Key<V> {
    let id = NEXT_KEY_ID.fetch_add(1, Ordering::Relaxed);
    Key {
        id,
        _marker: PhantomData,
    }
}

/// The error returned by [`MetaMap::find_required`] when the key has no
/// binding in the map.
#[derive(Debug, thiserror::Error)]
#[error("missing key {0}")]
pub struct MissingKey(pub u64);

/// A heterogeneous, immutable-by-interface map from typed keys to values.
///
/// Every mutating operation (`add`, `remove`) consumes `self` and returns a
/// new `MetaMap`; the previous value remains valid and unaffected, so a
/// `MetaMap` can be freely shared across threads or carried across an
/// `async` suspension point (e.g. inside an [`ExplicitSpan`](crate::span::ExplicitSpan)).
#[derive(Clone, Default)]
pub struct MetaMap {
    entries: Arc<BTreeMap<u64, Arc<dyn Any + Send + Sync>>>,
}

impl MetaMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new map containing `value` bound to `key`, replacing any
    /// existing binding for `key`.
    pub fn add<V: Send + Sync + 'static>(&self, key: Key<V>, value: V) -> Self {
        let mut entries = (*self.entries).clone();
        entries.insert(key.id, Arc::new(value));
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Looks up the value bound to `key`, cloning it out of the map.
    pub fn find<V: Clone + Send + Sync + 'static>(&self, key: Key<V>) -> Option<V> {
        self.entries
            .get(&key.id)
            .and_then(|boxed| boxed.downcast_ref::<V>())
            .cloned()
    }

    /// Like [`find`](Self::find), but fails loudly when `key` is unbound.
    pub fn find_required<V: Clone + Send + Sync + 'static>(
        &self,
        key: Key<V>,
    ) -> Result<V, MissingKey> {
        self.find(key).ok_or(MissingKey(key.id))
    }

    /// Returns a new map with any binding for `key` removed.
    pub fn remove<V: Send + Sync + 'static>(&self, key: Key<V>) -> Self {
        if !self.entries.contains_key(&key.id) {
            return self.clone();
        }
        let mut entries = (*self.entries).clone();
        entries.remove(&key.id);
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Whether `key` has a binding in this map.
    pub fn contains<V>(&self, key: Key<V>) -> bool {
        self.entries.contains_key(&key.id)
    }

    /// The number of bindings in this map.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this map has no bindings.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Visits every binding in key-id order, erased to its type witness.
    ///
    /// `f` sees the raw `(key id, boxed value)` pair rather than a typed
    /// value: the map's whole point is that a binding's `V` is known only to
    /// whoever holds the matching `Key<V>`, so a generic visitor can offer no
    /// more than the erased holder. Callers that need a typed value back out
    /// should downcast through `Any::downcast_ref` themselves, or simply call
    /// [`find`](Self::find) with the key they already have.
    pub fn iter(&self, mut f: impl FnMut(u64, &(dyn Any + Send + Sync))) {
        for (id, value) in self.entries.iter() {
            f(*id, value.as_ref());
        }
    }

    /// Returns every binding as a `(key id, boxed value)` pair, in key-id
    /// order, sharing the same underlying `Arc`s this map holds.
    pub fn to_list(&self) -> Vec<(u64, Arc<dyn Any + Send + Sync>)> {
        self.entries
            .iter()
            .map(|(id, value)| (*id, value.clone()))
            .collect()
    }

    /// Builds a map from a list of `(key id, boxed value)` pairs, as
    /// produced by [`to_list`](Self::to_list). A later pair for the same id
    /// replaces an earlier one, matching [`add`](Self::add)'s replace
    /// semantics.
    pub fn from_list(pairs: Vec<(u64, Arc<dyn Any + Send + Sync>)>) -> Self {
        let mut entries = BTreeMap::new();
        for (id, value) in pairs {
            entries.insert(id, value);
        }
        Self {
            entries: Arc::new(entries),
        }
    }
}

impl fmt::Debug for MetaMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaMap")
            .field("len", &self.entries.len())
            .finish()
    }
}
