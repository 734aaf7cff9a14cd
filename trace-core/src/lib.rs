//! Core primitives for the trace facade.
//!
//! This crate has no opinion on how events are persisted — that is the job
//! of a [`Collector`] implementation such as `trace-chrome`. What it owns:
//!
//! - the typed-key heterogeneous [`MetaMap`], used to carry per-span context
//!   across the synchronous/asynchronous boundary without a collector-side
//!   index (see [`span::ExplicitSpan`]);
//! - the [`Collector`] capability set every backend implements;
//! - the process-wide [`dispatch`] installation protocol;
//! - a mockable [`clock::Clock`] for deterministic tests.

pub mod clock;
pub mod collector;
pub mod datum;
pub mod dispatch;
pub mod key;
pub mod mock;
pub mod span;

pub use collector::{Collector, Location, NopCollector};
pub use datum::{Attrs, Datum};
pub use key::{create_key, Key, MetaMap, MissingKey};
pub use span::{ExplicitSpan, Flavor, SpanId};
