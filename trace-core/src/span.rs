//! Span identifiers and the explicit (manual) span handle.

use once_cell::sync::Lazy;

use crate::key::{create_key, Key};
use crate::MetaMap;

/// An opaque, dense span identifier allocated by a monotonic counter.
///
/// [`SpanId::NONE`] is a reserved sentinel meaning "no span".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpanId(i64);

impl SpanId {
    /// The sentinel value denoting "no span".
    pub const NONE: SpanId = SpanId(i64::MIN);

    /// Wraps a raw id. Used by collector implementations that allocate ids
    /// from their own counter.
    pub fn from_raw(id: i64) -> Self {
        SpanId(id)
    }

    /// The raw integer id.
    pub fn raw(self) -> i64 {
        self.0
    }

    /// Whether this is the [`SpanId::NONE`] sentinel.
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl Default for SpanId {
    fn default() -> Self {
        SpanId::NONE
    }
}

/// Whether a manual span begins and ends on the same thread (`Sync`), or may
/// cross threads / suspension points (`Async`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flavor {
    Sync,
    Async,
}

/// Keys installed into an [`ExplicitSpan`]'s metadata by
/// `enter_manual_span`, and read back by `exit_manual_span`.
///
/// These are shared, well-known keys (rather than ones each collector
/// allocates for itself) so that the manual-span state machine described in
/// the design notes — "the explicit_span is the only state" — holds across
/// any collector implementation, not just the reference backend.
pub static ASYNC_ID_KEY: Lazy<Key<SpanId>> = Lazy::new(create_key);
pub static ASYNC_DATA_KEY: Lazy<Key<(String, Option<Flavor>)>> = Lazy::new(create_key);

/// The owned handle for a manual span.
///
/// Carries its correlation id and whatever metadata the collector that
/// created it installed. Exactly one `exit_manual_span` call consumes an
/// `ExplicitSpan` produced by `enter_manual_span`; dropping it without
/// exiting leaves no trace in the reference backend, since the backend
/// stores no side-table keyed by span id for manual spans.
#[derive(Clone, Debug)]
pub struct ExplicitSpan {
    id: SpanId,
    meta: MetaMap,
}

impl ExplicitSpan {
    /// Builds an explicit span handle from its id and metadata.
    pub fn new(id: SpanId, meta: MetaMap) -> Self {
        Self { id, meta }
    }

    /// The span's correlation id.
    pub fn id(&self) -> SpanId {
        self.id
    }

    /// The span's metadata map.
    pub fn meta(&self) -> &MetaMap {
        &self.meta
    }

    /// Consumes the handle, returning its id and metadata.
    pub fn into_parts(self) -> (SpanId, MetaMap) {
        (self.id, self.meta)
    }
}
