//! The tagged-variant event record pushed onto the blocking queue, and the
//! span registry entry the writer thread keeps for open scope-spans.

use trace_core::{Attrs, Datum, Flavor, SpanId};

/// One value sampled for a counter event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CounterValue {
    Int(i64),
    Float(f64),
}

impl From<CounterValue> for Datum {
    fn from(v: CounterValue) -> Self {
        match v {
            CounterValue::Int(i) => Datum::Int(i),
            CounterValue::Float(f) => Datum::Float(f),
        }
    }
}

/// Every event the reference backend may push onto the queue.
///
/// Events own their payloads outright: they are constructed on the emitting
/// thread, moved onto the queue, and consumed exactly once by the writer
/// thread.
#[derive(Debug)]
pub enum Event {
    /// Periodic flush marker, pushed by the ticker thread.
    Tick,
    Message {
        #[allow(dead_code)]
        span: Option<SpanId>,
        attrs: Attrs,
        ts: u64,
        tid: u64,
        msg: String,
    },
    DefineSpan {
        id: SpanId,
        tid: u64,
        name: String,
        start_us: u64,
        attrs: Attrs,
        #[allow(dead_code)]
        fun_name: Option<String>,
    },
    ExitSpan {
        id: SpanId,
        end_us: u64,
    },
    EnterManualSpan {
        id: SpanId,
        tid: u64,
        name: String,
        flavor: Option<Flavor>,
        attrs: Attrs,
        ts: u64,
        #[allow(dead_code)]
        fun_name: Option<String>,
    },
    ExitManualSpan {
        id: SpanId,
        tid: u64,
        name: String,
        flavor: Option<Flavor>,
        end_us: u64,
    },
    Counter {
        name: String,
        value: CounterValue,
        ts: u64,
        tid: u64,
    },
    NameThread {
        name: String,
        tid: u64,
    },
    NameProcess {
        name: String,
    },
}

/// What the writer thread remembers about an open scope-span between
/// `E_define_span` and `E_exit_span`.
///
/// Owned exclusively by the writer thread; no synchronization is needed
/// because only that thread ever reads or writes the registry.
#[derive(Debug)]
pub struct SpanRegistryEntry {
    pub tid: u64,
    pub name: String,
    pub start_us: u64,
    pub attrs: Attrs,
}
