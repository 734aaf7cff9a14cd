//! The reference backend: span id allocation, the writer thread, the
//! ticker thread, and the span registry.

use std::collections::{HashMap, VecDeque};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use trace_core::{
    clock::{default_clock, Clock},
    collector::Location,
    mock,
    span::{Flavor, ASYNC_DATA_KEY, ASYNC_ID_KEY},
    Attrs, Collector, Datum, ExplicitSpan, MetaMap, SpanId,
};
use trace_queue::Queue;

use crate::env::Sink;
use crate::error::BackendError;
use crate::event::{CounterValue, Event, SpanRegistryEntry};
use crate::json::JsonWriter;

const TICK_INTERVAL: Duration = Duration::from_millis(500);

/// A [`trace_core::Collector`] that serializes every emission onto a single
/// writer thread and produces a Catapult/Chrome-Trace JSON document.
pub struct ChromeCollector {
    next_span_id: AtomicI64,
    queue: Arc<Queue<Event>>,
    clock: Arc<dyn Clock>,
    active: AtomicBool,
    writer_thread: Mutex<Option<JoinHandle<()>>>,
}

impl ChromeCollector {
    /// Opens `sink` and starts the writer and ticker threads.
    pub fn open(sink: Sink) -> Result<Arc<Self>, BackendError> {
        let writer = sink.open()?;
        Self::with_writer(writer)
    }

    /// Starts the writer and ticker threads over an already-open writer.
    ///
    /// Used directly by tests (an in-memory buffer) and by [`open`](Self::open)
    /// for the real sinks. Uses [`default_clock`], which observes the
    /// process-wide mock-mode flag.
    pub fn with_writer(writer: Box<dyn Write + Send>) -> Result<Arc<Self>, BackendError> {
        Self::with_writer_and_clock(writer, default_clock())
    }

    /// Like [`with_writer`](Self::with_writer), but with an explicit clock.
    ///
    /// This is what lets tests give each `ChromeCollector` instance its own
    /// freshly-zeroed [`trace_core::clock::MockClock`] instead of sharing
    /// the one process-wide mock clock `default_clock()` hands out — useful
    /// when a single test process exercises more than one end-to-end
    /// scenario and needs each one's timestamps to start back at zero.
    ///
    /// Fails if the initial `[` write to `writer` fails (e.g. a full disk or
    /// a closed pipe); the caller gets that error back rather than a panic,
    /// since opening a real sink is fallible I/O, not a programmer error.
    pub fn with_writer_and_clock(
        writer: Box<dyn Write + Send>,
        clock: Arc<dyn Clock>,
    ) -> Result<Arc<Self>, BackendError> {
        let queue = Arc::new(Queue::new());
        let json = JsonWriter::open(writer)?;

        let writer_queue = queue.clone();
        let writer_thread = std::thread::Builder::new()
            .name("trace-chrome-writer".into())
            .spawn(move || writer_loop(writer_queue, json))
            .expect("failed to spawn trace-chrome writer thread");

        let ticker_queue = queue.clone();
        std::thread::Builder::new()
            .name("trace-chrome-ticker".into())
            .spawn(move || ticker_loop(ticker_queue))
            .expect("failed to spawn trace-chrome ticker thread");

        Ok(Arc::new(Self {
            next_span_id: AtomicI64::new(0),
            queue,
            clock,
            active: AtomicBool::new(true),
            writer_thread: Mutex::new(Some(writer_thread)),
        }))
    }

    fn alloc_span_id(&self) -> SpanId {
        SpanId::from_raw(self.next_span_id.fetch_add(1, Ordering::Relaxed))
    }

    fn now(&self) -> u64 {
        self.clock.now_micros()
    }
}

fn ticker_loop(queue: Arc<Queue<Event>>) {
    loop {
        std::thread::sleep(TICK_INTERVAL);
        if queue.push(Event::Tick).is_err() {
            break;
        }
    }
}

fn writer_loop(queue: Arc<Queue<Event>>, mut json: JsonWriter<Box<dyn Write + Send>>) {
    let mut local: VecDeque<Event> = VecDeque::new();
    let mut registry: HashMap<i64, SpanRegistryEntry> = HashMap::new();

    loop {
        if local.is_empty() {
            match queue.transfer(&mut local) {
                Ok(()) => {}
                Err(_closed) => break,
            }
        }
        while let Some(event) = local.pop_front() {
            handle_event(event, &mut json, &mut registry);
        }
    }

    if !registry.is_empty() {
        tracing::warn!(unclosed_spans = registry.len(), "spans unclosed at shutdown");
    }
    if let Err(e) = json.close() {
        tracing::error!(error = %e, "failed to close trace output");
    }
}

fn handle_event(
    event: Event,
    json: &mut JsonWriter<Box<dyn Write + Send>>,
    registry: &mut HashMap<i64, SpanRegistryEntry>,
) {
    let result = match event {
        Event::Tick => json.flush(),
        Event::Message { attrs, ts, tid, msg, .. } => {
            json.instant_event(&msg, ts, mock::pid(), tid, &attrs)
        }
        Event::DefineSpan {
            id,
            tid,
            name,
            start_us,
            attrs,
            ..
        } => {
            registry.insert(
                id.raw(),
                SpanRegistryEntry {
                    tid,
                    name,
                    start_us,
                    attrs,
                },
            );
            Ok(())
        }
        Event::ExitSpan { id, end_us } => match registry.remove(&id.raw()) {
            Some(entry) => {
                let dur = end_us.saturating_sub(entry.start_us);
                json.duration_event(&entry.name, entry.start_us, dur, mock::pid(), entry.tid, &entry.attrs)
            }
            None => {
                tracing::warn!(span = id.raw(), "exit_span with no matching define_span; dropping event");
                Ok(())
            }
        },
        Event::EnterManualSpan {
            id,
            tid,
            name,
            flavor,
            attrs,
            ts,
            ..
        } => {
            let sync = matches!(flavor, Some(Flavor::Sync));
            json.manual_begin_event(&name, ts, mock::pid(), tid, id.raw(), sync, &attrs)
        }
        Event::ExitManualSpan {
            id,
            tid,
            name,
            flavor,
            end_us,
        } => {
            let sync = matches!(flavor, Some(Flavor::Sync));
            json.manual_end_event(&name, end_us, mock::pid(), tid, id.raw(), sync)
        }
        Event::Counter { name, value, ts, tid } => {
            let datum: Datum = value.into();
            json.counter_event(&name, &datum, ts, mock::pid(), tid)
        }
        Event::NameThread { name, tid } => json.thread_name_event(&name, mock::pid(), tid),
        Event::NameProcess { name } => json.process_name_event(&name, mock::pid()),
    };
    if let Err(e) = result {
        tracing::error!(error = %e, "failed to write trace event");
    }
}

impl Collector for ChromeCollector {
    fn open_span(&self, loc: Location<'_>, attrs: Attrs, name: &str) -> SpanId {
        let id = self.alloc_span_id();
        let tid = mock::tid();
        let start_us = self.now();
        let _ = self.queue.push(Event::DefineSpan {
            id,
            tid,
            name: name.to_string(),
            start_us,
            attrs,
            fun_name: loc.function.map(str::to_string),
        });
        id
    }

    fn close_span(&self, id: SpanId) {
        let end_us = self.now();
        let _ = self.queue.push(Event::ExitSpan { id, end_us });
    }

    fn enter_manual_span(
        &self,
        parent: Option<&ExplicitSpan>,
        flavor: Option<Flavor>,
        loc: Location<'_>,
        attrs: Attrs,
        name: &str,
    ) -> ExplicitSpan {
        let id = parent
            .and_then(|p| p.meta().find(*ASYNC_ID_KEY))
            .unwrap_or_else(|| self.alloc_span_id());
        let tid = mock::tid();
        let ts = self.now();
        let _ = self.queue.push(Event::EnterManualSpan {
            id,
            tid,
            name: name.to_string(),
            flavor,
            attrs,
            ts,
            fun_name: loc.function.map(str::to_string),
        });
        let meta = MetaMap::new()
            .add(*ASYNC_ID_KEY, id)
            .add(*ASYNC_DATA_KEY, (name.to_string(), flavor));
        ExplicitSpan::new(id, meta)
    }

    fn exit_manual_span(&self, span: ExplicitSpan) {
        let (id, meta) = span.into_parts();
        let (name, flavor) = meta
            .find_required(*ASYNC_DATA_KEY)
            .expect("exit_manual_span: span was not produced by this collector");
        let tid = mock::tid();
        let end_us = self.now();
        let _ = self.queue.push(Event::ExitManualSpan {
            id,
            tid,
            name,
            flavor,
            end_us,
        });
    }

    fn message(&self, span: Option<SpanId>, attrs: Attrs, msg: &str) {
        let ts = self.now();
        let tid = mock::tid();
        let _ = self.queue.push(Event::Message {
            span,
            attrs,
            ts,
            tid,
            msg: msg.to_string(),
        });
    }

    fn counter_int(&self, name: &str, value: i64) {
        let ts = self.now();
        let tid = mock::tid();
        let _ = self.queue.push(Event::Counter {
            name: name.to_string(),
            value: CounterValue::Int(value),
            ts,
            tid,
        });
    }

    fn counter_float(&self, name: &str, value: f64) {
        let ts = self.now();
        let tid = mock::tid();
        let _ = self.queue.push(Event::Counter {
            name: name.to_string(),
            value: CounterValue::Float(value),
            ts,
            tid,
        });
    }

    fn name_thread(&self, name: &str) {
        let tid = mock::tid();
        let _ = self.queue.push(Event::NameThread {
            name: name.to_string(),
            tid,
        });
    }

    fn name_process(&self, name: &str) {
        let _ = self.queue.push(Event::NameProcess {
            name: name.to_string(),
        });
    }

    fn shutdown(&self) {
        if self
            .active
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // Already shut down (or shutting down on another thread); block
            // until whichever call is doing the work has joined the writer,
            // same as the first caller would, so `shutdown` still behaves
            // as "blocks until the output is closed" for every caller.
            if let Some(handle) = self.writer_thread.lock().unwrap().take() {
                let _ = handle.join();
            }
            return;
        }
        self.queue.close();
        if let Some(handle) = self.writer_thread.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}
