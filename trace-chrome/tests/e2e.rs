//! End-to-end scenarios against an in-memory sink, mock mode enabled.
//!
//! Each scenario constructs its own `ChromeCollector` over its own fresh
//! `MockClock`, so scenarios never observe each other's timestamps even when
//! `cargo test` runs them on separate threads within this same test binary.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use trace_chrome::ChromeCollector;
use trace_core::clock::{Clock, MockClock};
use trace_core::collector::Location;
use trace_core::{mock, Collector, Flavor};

#[derive(Clone)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn new_session() -> (Arc<ChromeCollector>, Arc<Mutex<Vec<u8>>>) {
    mock::enable();
    let buf = Arc::new(Mutex::new(Vec::new()));
    let clock: Arc<dyn Clock> = Arc::new(MockClock::new());
    let collector = ChromeCollector::with_writer_and_clock(Box::new(SharedBuf(buf.clone())), clock)
        .expect("in-memory sink cannot fail to open");
    (collector, buf)
}

fn document(buf: &Arc<Mutex<Vec<u8>>>) -> Vec<Value> {
    let text = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
    serde_json::from_str(&text).expect("writer output must be valid JSON")
}

fn loc() -> Location<'static> {
    Location {
        function: None,
        file: file!(),
        line: line!(),
    }
}

/// S1. Empty session: install collector -> shutdown. Output: `[]`.
#[test]
fn s1_empty_session() {
    let (collector, buf) = new_session();
    collector.shutdown();
    assert_eq!(document(&buf), Vec::<Value>::new());
}

/// S2. Single scoped span.
#[test]
fn s2_single_scoped_span() {
    let (collector, buf) = new_session();
    collector.with_span(loc(), Vec::new(), "a", |_id| {});
    collector.shutdown();

    let doc = document(&buf);
    assert_eq!(doc.len(), 1);
    assert_eq!(
        doc[0],
        serde_json::json!({
            "pid": 2, "cat": "", "tid": 3, "dur": 1.0, "ts": 0.0, "name": "a", "ph": "X"
        })
    );
}

/// S3. Nested spans on the same thread: inner closes (and is emitted)
/// before outer.
#[test]
fn s3_nested_spans_same_thread() {
    let (collector, buf) = new_session();
    collector.with_span(loc(), Vec::new(), "outer", |_outer| {
        collector.with_span(loc(), Vec::new(), "inner", |_inner| {});
    });
    collector.shutdown();

    let doc = document(&buf);
    assert_eq!(doc.len(), 2);
    assert_eq!(doc[0]["name"], "inner");
    assert_eq!(doc[0]["ts"], 1.0);
    assert_eq!(doc[0]["dur"], 1.0);
    assert_eq!(doc[1]["name"], "outer");
    assert_eq!(doc[1]["ts"], 0.0);
    assert_eq!(doc[1]["dur"], 3.0);
}

/// S4. Manual async span with a parent: the child inherits the parent's
/// correlation id.
#[test]
fn s4_manual_async_span_with_parent() {
    let (collector, buf) = new_session();
    let req = collector.enter_manual_span(None, Some(Flavor::Async), loc(), Vec::new(), "req");
    let sub = collector.enter_manual_span(Some(&req), Some(Flavor::Async), loc(), Vec::new(), "sub");
    collector.exit_manual_span(sub);
    collector.exit_manual_span(req);
    collector.shutdown();

    let doc = document(&buf);
    assert_eq!(doc.len(), 4);
    let phases: Vec<&str> = doc.iter().map(|e| e["ph"].as_str().unwrap()).collect();
    assert_eq!(phases, vec!["b", "b", "e", "e"]);
    for event in &doc {
        assert_eq!(event["cat"], "trace");
        assert_eq!(event["id"], 0);
    }
    assert_eq!(doc[0]["name"], "req");
    assert_eq!(doc[1]["name"], "sub");
}

/// S5. Counter then message, each carrying their documented `args` shape.
#[test]
fn s5_counter_and_message() {
    let (collector, buf) = new_session();
    collector.counter_int("n", 7);
    collector.message(None, vec![("k".to_string(), "v".into())], "hello");
    collector.shutdown();

    let doc = document(&buf);
    assert_eq!(doc.len(), 2);
    assert_eq!(doc[0]["ph"], "C");
    assert_eq!(doc[0]["args"]["n"], 7);
    assert_eq!(doc[1]["ph"], "I");
    assert_eq!(doc[1]["name"], "hello");
    assert_eq!(doc[1]["args"]["k"], "v");
}

/// S6. String escaping: the emitted `name` field round-trips through a JSON
/// decoder back to the original string.
#[test]
fn s6_string_escaping_round_trips() {
    let (collector, buf) = new_session();
    collector.message(None, Vec::new(), "a\"b\nc");
    collector.shutdown();

    let doc = document(&buf);
    assert_eq!(doc[0]["name"], "a\"b\nc");
}

/// Property: for every matched (define, exit) pair the emitted duration
/// equals `end - start`, even across several interleaved sibling spans.
#[test]
fn durations_match_end_minus_start_for_sibling_spans() {
    let (collector, buf) = new_session();
    collector.with_span(loc(), Vec::new(), "first", |_| {});
    collector.with_span(loc(), Vec::new(), "second", |_| {});
    collector.shutdown();

    let doc = document(&buf);
    assert_eq!(doc.len(), 2);
    for event in &doc {
        let ts = event["ts"].as_f64().unwrap();
        let dur = event["dur"].as_f64().unwrap();
        assert_eq!(dur, 1.0, "each span here spans exactly one clock tick");
        assert!(ts >= 0.0);
    }
}

/// Property: a scope-span whose body panics still emits its exit event, and
/// the panic propagates to the caller unchanged.
#[test]
fn with_span_exit_is_emitted_even_when_body_panics() {
    let (collector, buf) = new_session();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        collector.with_span(loc(), Vec::new(), "doomed", |_id| {
            panic!("intentional test panic");
        });
    }));
    assert!(result.is_err());
    collector.shutdown();

    let doc = document(&buf);
    assert_eq!(doc.len(), 1);
    assert_eq!(doc[0]["name"], "doomed");
    assert_eq!(doc[0]["ph"], "X");
}

/// Property: an `exit_span` with no matching `define_span` is dropped
/// without corrupting the rest of the document (no event is emitted for
/// it, but surrounding events are unaffected).
#[test]
fn unmatched_exit_span_is_dropped_not_fatal() {
    let (collector, buf) = new_session();
    collector.close_span(trace_core::SpanId::from_raw(999));
    collector.with_span(loc(), Vec::new(), "still-works", |_| {});
    collector.shutdown();

    let doc = document(&buf);
    assert_eq!(doc.len(), 1);
    assert_eq!(doc[0]["name"], "still-works");
}
