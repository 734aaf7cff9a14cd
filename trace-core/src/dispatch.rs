//! Process-wide collector installation.
//!
//! At most one collector is active at a time. [`install`] replaces any prior
//! collector; [`current`] reads whatever is active right now; [`shutdown`]
//! delegates to the active collector's own shutdown and then clears the
//! slot. The slot is a [`Mutex`]-guarded `Option`, not a once-only cell like
//! the teacher's `tracing_core::dispatch::set_global_default` — this facade
//! is explicitly a "replace the active backend" protocol, so a plain mutex
//! is the right tool rather than a CAS that only succeeds once.
//!
//! An emission that reads the slot just before [`shutdown`] clears it still
//! executes against the (still-alive, `Arc`-held) collector it observed; the
//! collector's own `shutdown` is responsible for not losing events enqueued
//! concurrently with its teardown (see `trace-chrome`'s backend engine).

use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::collector::{Collector, Location, NopCollector};
use crate::datum::Attrs;
use crate::span::SpanId;

static EXISTS: AtomicBool = AtomicBool::new(false);
static ACTIVE: Lazy<Mutex<Option<Arc<dyn Collector>>>> = Lazy::new(|| Mutex::new(None));
static NOP: Lazy<Arc<dyn Collector>> = Lazy::new(|| Arc::new(NopCollector));

/// Installs `collector` as the process-wide active collector, replacing any
/// previously installed collector.
///
/// The previous collector, if any, is simply dropped from the slot; it is
/// *not* shut down automatically. Call [`shutdown`] first if the outgoing
/// collector's buffered events must be flushed before installing a new one.
pub fn install(collector: Arc<dyn Collector>) {
    let mut slot = ACTIVE.lock().unwrap();
    *slot = Some(collector);
    EXISTS.store(true, Ordering::Release);
}

/// Returns the currently active collector, if one is installed.
pub fn current() -> Option<Arc<dyn Collector>> {
    if !EXISTS.load(Ordering::Acquire) {
        return None;
    }
    ACTIVE.lock().unwrap().clone()
}

/// Returns the currently active collector, or a no-op collector if none is
/// installed. Intended for facade forwarders that must not branch on
/// `Option` at every call site.
pub fn get() -> Arc<dyn Collector> {
    current().unwrap_or_else(|| NOP.clone())
}

/// Opens a scope-span on the installed collector (or the no-op fallback),
/// invokes `body`, and closes the span on every exit path, returning `body`'s
/// value.
///
/// This recovers [`Collector::with_span`]'s generic, value-returning shape on
/// top of the object-safe [`Collector::with_span_scoped`], since the only
/// collector handle this module hands out is `Arc<dyn Collector>`. `body` is
/// invoked exactly once.
pub fn with_span<R>(loc: Location<'_>, attrs: Attrs, name: &str, body: impl FnOnce(SpanId) -> R) -> R {
    let collector = get();
    let mut out = None;
    let mut body = Some(body);
    let mut call = |id: SpanId| {
        let body = body.take().expect("with_span_scoped invokes body exactly once");
        out = Some(body(id));
    };
    collector.with_span_scoped(loc, attrs, name, &mut call);
    out.expect("with_span_scoped invokes body exactly once")
}

/// Shuts down and clears the active collector, if any. Idempotent: calling
/// this with no active collector, or calling it more than once in a row, is
/// a no-op after the first successful shutdown.
pub fn shutdown() {
    let collector = {
        let mut slot = ACTIVE.lock().unwrap();
        slot.take()
    };
    EXISTS.store(false, Ordering::Release);
    if let Some(collector) = collector {
        collector.shutdown();
    }
}
