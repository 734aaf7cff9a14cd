//! The capability set exposed by an active collector.

use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};

use crate::datum::Attrs;
use crate::span::{ExplicitSpan, Flavor, SpanId};

/// Call-site location, as reported by instrumented code (out of this crate's
/// scope to capture automatically — the facade forwarder passes it through).
#[derive(Clone, Copy, Debug, Default)]
pub struct Location<'a> {
    pub function: Option<&'a str>,
    pub file: &'a str,
    pub line: u32,
}

/// Trait representing the operations a trace collector must implement.
///
/// A collector is installed process-wide through [`crate::dispatch`] and
/// receives every emission from every thread. Every method here is
/// thread-safe; none may block longer than a bounded enqueue, so that
/// instrumented code never stalls on the collector's own I/O.
pub trait Collector: Send + Sync {
    /// Opens a scope-span, invokes `body`, and closes the span on every exit
    /// path — including unwinding panics — before returning or re-raising.
    ///
    /// The default implementation is provided in terms of
    /// [`open_span`](Self::open_span) / [`close_span`](Self::close_span) so
    /// that implementors only need to provide those two, narrower,
    /// operations; collectors that need the scope's id directly inside
    /// `body` should use `open_span`/`close_span` themselves instead of
    /// overriding `with_span`.
    ///
    /// Generic, so excluded from the `dyn Collector` vtable — call it on a
    /// concrete collector type. Through a `dyn Collector` (the handle
    /// `dispatch::get()` hands out), use [`with_span_scoped`](Self::with_span_scoped)
    /// instead, or [`crate::dispatch::with_span`], which recovers this
    /// method's generic, value-returning shape on top of it.
    fn with_span<R>(&self, loc: Location<'_>, attrs: Attrs, name: &str, body: impl FnOnce(SpanId) -> R) -> R
    where
        Self: Sized,
    {
        let id = self.open_span(loc, attrs, name);
        let result = catch_unwind(AssertUnwindSafe(|| body(id)));
        self.close_span(id);
        match result {
            Ok(r) => r,
            Err(payload) => resume_unwind(payload),
        }
    }

    /// Object-safe counterpart to [`with_span`](Self::with_span): opens a
    /// scope-span, invokes `body` once, and closes the span on every exit
    /// path — including unwinding panics — before returning or re-raising.
    ///
    /// `body` takes `&mut dyn FnMut` rather than `impl FnOnce -> R` so this
    /// method carries no generic parameter and stays in the `dyn Collector`
    /// vtable; it is the only panic-safe scoped-span entry point reachable
    /// through the handle [`crate::dispatch::get`] returns. The default
    /// implementation is provided in terms of
    /// [`open_span`](Self::open_span) / [`close_span`](Self::close_span), so
    /// collectors need not override it.
    fn with_span_scoped(&self, loc: Location<'_>, attrs: Attrs, name: &str, body: &mut dyn FnMut(SpanId)) {
        let id = self.open_span(loc, attrs, name);
        let result = catch_unwind(AssertUnwindSafe(|| body(id)));
        self.close_span(id);
        if let Err(payload) = result {
            resume_unwind(payload);
        }
    }

    /// Opens a scope-span and returns its id. Called by the default
    /// `with_span`/`with_span_scoped`; collectors may also call it directly.
    fn open_span(&self, loc: Location<'_>, attrs: Attrs, name: &str) -> SpanId;

    /// Closes a scope-span previously opened by [`open_span`](Self::open_span).
    fn close_span(&self, id: SpanId);

    /// Opens an explicit (manual) span not tied to a lexical scope.
    fn enter_manual_span(
        &self,
        parent: Option<&ExplicitSpan>,
        flavor: Option<Flavor>,
        loc: Location<'_>,
        attrs: Attrs,
        name: &str,
    ) -> ExplicitSpan;

    /// Closes an explicit span previously produced by
    /// [`enter_manual_span`](Self::enter_manual_span).
    fn exit_manual_span(&self, span: ExplicitSpan);

    /// Emits an instant event. `span`, if given, is informational only.
    fn message(&self, span: Option<SpanId>, attrs: Attrs, msg: &str);

    /// Emits an integer counter sample.
    fn counter_int(&self, name: &str, value: i64);

    /// Emits a floating-point counter sample.
    fn counter_float(&self, name: &str, value: f64);

    /// Attaches a display name to the calling thread.
    fn name_thread(&self, name: &str);

    /// Attaches a display name to the process.
    fn name_process(&self, name: &str);

    /// Initiates orderly termination: blocks until every previously enqueued
    /// event has been written and the output is closed. Idempotent.
    fn shutdown(&self);
}

/// A [`Collector`] that discards everything. Used as the facade's fallback
/// when no collector has been installed, so instrumented call sites never
/// need to check for `None`.
#[derive(Debug, Default)]
pub struct NopCollector;

impl Collector for NopCollector {
    fn open_span(&self, _loc: Location<'_>, _attrs: Attrs, _name: &str) -> SpanId {
        SpanId::NONE
    }

    fn close_span(&self, _id: SpanId) {}

    fn enter_manual_span(
        &self,
        _parent: Option<&ExplicitSpan>,
        _flavor: Option<Flavor>,
        _loc: Location<'_>,
        _attrs: Attrs,
        _name: &str,
    ) -> ExplicitSpan {
        ExplicitSpan::new(SpanId::NONE, crate::MetaMap::new())
    }

    fn exit_manual_span(&self, _span: ExplicitSpan) {}

    fn message(&self, _span: Option<SpanId>, _attrs: Attrs, _msg: &str) {}

    fn counter_int(&self, _name: &str, _value: i64) {}

    fn counter_float(&self, _name: &str, _value: f64) {}

    fn name_thread(&self, _name: &str) {}

    fn name_process(&self, _name: &str) {}

    fn shutdown(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_span_propagates_panics_after_closing() {
        let collector = NopCollector;
        let result = catch_unwind(AssertUnwindSafe(|| {
            collector.with_span(
                Location {
                    function: None,
                    file: file!(),
                    line: line!(),
                },
                vec![],
                "boom",
                |_id| panic!("body failed"),
            )
        }));
        assert!(result.is_err());
    }

    #[test]
    fn with_span_returns_bodys_value() {
        let collector = NopCollector;
        let v = collector.with_span(
            Location {
                function: None,
                file: file!(),
                line: line!(),
            },
            vec![],
            "ok",
            |_id| 42,
        );
        assert_eq!(v, 42);
    }

    #[test]
    fn with_span_scoped_is_reachable_through_a_trait_object() {
        let collector: std::sync::Arc<dyn Collector> = std::sync::Arc::new(NopCollector);
        let mut ran = false;
        collector.with_span_scoped(
            Location {
                function: None,
                file: file!(),
                line: line!(),
            },
            vec![],
            "ok",
            &mut |_id| ran = true,
        );
        assert!(ran);
    }

    #[test]
    fn with_span_scoped_propagates_panics_after_closing() {
        let collector = NopCollector;
        let result = catch_unwind(AssertUnwindSafe(|| {
            collector.with_span_scoped(
                Location {
                    function: None,
                    file: file!(),
                    line: line!(),
                },
                vec![],
                "boom",
                &mut |_id| panic!("body failed"),
            )
        }));
        assert!(result.is_err());
    }
}
