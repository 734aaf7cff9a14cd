//! Stateful Catapult/Chrome-Trace JSON document writer.
//!
//! Writes `[` on construction and `]` on [`close`](JsonWriter::close); every
//! event in between is preceded by a `,\n` separator except the first. The
//! writer never reads back or rewrites already-emitted bytes — it is a pure
//! append-only sink, the same shape as the teacher's own small `io::Write`
//! wrappers (`tracing-appender::writer`).

use std::io::{self, Write};

use trace_core::{Attrs, Datum};

/// A stateful, append-only Catapult JSON array writer over `W`.
pub struct JsonWriter<W: Write> {
    out: W,
    first: bool,
}

impl<W: Write> JsonWriter<W> {
    /// Opens the document: writes the opening `[`.
    pub fn open(mut out: W) -> io::Result<Self> {
        out.write_all(b"[")?;
        Ok(Self { out, first: true })
    }

    fn begin_event(&mut self) -> io::Result<()> {
        if self.first {
            self.first = false;
        } else {
            self.out.write_all(b",\n")?;
        }
        Ok(())
    }

    /// Complete (duration) event: `ph: "X"`.
    pub fn duration_event(
        &mut self,
        name: &str,
        ts_us: u64,
        dur_us: u64,
        pid: u64,
        tid: u64,
        attrs: &Attrs,
    ) -> io::Result<()> {
        self.begin_event()?;
        write!(
            self.out,
            "{{\"pid\":{},\"cat\":\"\",\"tid\":{},\"dur\":{},\"ts\":{},\"name\":\"{}\",\"ph\":\"X\"",
            pid,
            tid,
            fixed2(dur_us),
            fixed2(ts_us),
            escape_str(name),
        )?;
        write_args(&mut self.out, attrs)?;
        self.out.write_all(b"}")
    }

    /// Manual-span begin event: `ph: "b"` (async) or `"B"` (sync).
    pub fn manual_begin_event(
        &mut self,
        name: &str,
        ts_us: u64,
        pid: u64,
        tid: u64,
        id: i64,
        sync: bool,
        attrs: &Attrs,
    ) -> io::Result<()> {
        self.begin_event()?;
        write!(
            self.out,
            "{{\"pid\":{},\"cat\":\"trace\",\"id\":{},\"tid\":{},\"ts\":{},\"name\":\"{}\",\"ph\":\"{}\"",
            pid,
            id,
            tid,
            fixed2(ts_us),
            escape_str(name),
            if sync { "B" } else { "b" },
        )?;
        write_args(&mut self.out, attrs)?;
        self.out.write_all(b"}")
    }

    /// Manual-span end event: `ph: "e"` (async) or `"E"` (sync). Never
    /// carries `args`.
    pub fn manual_end_event(
        &mut self,
        name: &str,
        ts_us: u64,
        pid: u64,
        tid: u64,
        id: i64,
        sync: bool,
    ) -> io::Result<()> {
        self.begin_event()?;
        write!(
            self.out,
            "{{\"pid\":{},\"cat\":\"trace\",\"id\":{},\"tid\":{},\"ts\":{},\"name\":\"{}\",\"ph\":\"{}\"}}",
            pid,
            id,
            tid,
            fixed2(ts_us),
            escape_str(name),
            if sync { "E" } else { "e" },
        )
    }

    /// Instant event: `ph: "I"`.
    pub fn instant_event(
        &mut self,
        name: &str,
        ts_us: u64,
        pid: u64,
        tid: u64,
        attrs: &Attrs,
    ) -> io::Result<()> {
        self.begin_event()?;
        write!(
            self.out,
            "{{\"pid\":{},\"cat\":\"\",\"tid\":{},\"ts\":{},\"name\":\"{}\",\"ph\":\"I\"",
            pid,
            tid,
            fixed2(ts_us),
            escape_str(name),
        )?;
        write_args(&mut self.out, attrs)?;
        self.out.write_all(b"}")
    }

    /// Counter event: `ph: "C"`, always exactly one `args` entry.
    pub fn counter_event(
        &mut self,
        name: &str,
        value: &Datum,
        ts_us: u64,
        pid: u64,
        tid: u64,
    ) -> io::Result<()> {
        self.begin_event()?;
        write!(
            self.out,
            "{{\"pid\":{},\"tid\":{},\"ts\":{},\"name\":\"c\",\"ph\":\"C\",\"args\":{{\"{}\":",
            pid,
            tid,
            fixed2(ts_us),
            escape_str(name),
        )?;
        write_datum(&mut self.out, value)?;
        self.out.write_all(b"}}")
    }

    /// Thread-name metadata event: `ph: "M"`.
    pub fn thread_name_event(&mut self, name: &str, pid: u64, tid: u64) -> io::Result<()> {
        self.begin_event()?;
        write!(
            self.out,
            "{{\"pid\":{},\"tid\":{},\"name\":\"thread_name\",\"ph\":\"M\",\"args\":{{\"name\":\"{}\"}}}}",
            pid,
            tid,
            escape_str(name),
        )
    }

    /// Process-name metadata event: `ph: "M"`.
    pub fn process_name_event(&mut self, name: &str, pid: u64) -> io::Result<()> {
        self.begin_event()?;
        write!(
            self.out,
            "{{\"pid\":{},\"name\":\"process_name\",\"ph\":\"M\",\"args\":{{\"name\":\"{}\"}}}}",
            pid,
            escape_str(name),
        )
    }

    /// Flushes the underlying sink without closing the document. Called on
    /// every tick event so output is visible under low event rates.
    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Closes the document: writes the closing `]` and flushes.
    pub fn close(mut self) -> io::Result<()> {
        self.out.write_all(b"]")?;
        self.out.flush()
    }
}

/// Formats a microsecond count as a decimal with exactly two fractional
/// digits, per the wire format's fixed-point timestamp/duration fields.
fn fixed2(us: u64) -> String {
    format!("{}.00", us)
}

fn write_args(out: &mut dyn Write, attrs: &Attrs) -> io::Result<()> {
    if attrs.is_empty() {
        return Ok(());
    }
    out.write_all(b",\"args\":{")?;
    for (i, (name, value)) in attrs.iter().enumerate() {
        if i > 0 {
            out.write_all(b",")?;
        }
        write!(out, "\"{}\":", escape_str(name))?;
        write_datum(out, value)?;
    }
    out.write_all(b"}")
}

fn write_datum(out: &mut dyn Write, datum: &Datum) -> io::Result<()> {
    match datum {
        Datum::Absent => out.write_all(b"null"),
        Datum::Int(v) => write!(out, "{}", v),
        Datum::Bool(v) => write!(out, "{}", v),
        Datum::String(v) => write!(out, "\"{}\"", escape_str(v)),
        Datum::Float(v) => write!(out, "{}", v),
    }
}

/// Escapes `s` for embedding in a JSON string literal.
///
/// `"`, `\`, newline, carriage return, tab, and backspace become their
/// two-character escapes; any other control character (code point <= 0x1F)
/// becomes `\u00XX` (two lowercase hex digits); everything else is copied
/// through verbatim. `s` is assumed to already be well-formed UTF-8.
pub fn escape_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            c if (c as u32) <= 0x1F => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_the_documented_set() {
        assert_eq!(escape_str("a\"b\nc"), "a\\\"b\\nc");
        assert_eq!(escape_str("\t\r\\"), "\\t\\r\\\\");
        assert_eq!(escape_str("\u{1}"), "\\u0001");
        assert_eq!(escape_str("plain"), "plain");
    }

    #[test]
    fn empty_session_is_empty_array() {
        let buf: Vec<u8> = Vec::new();
        let writer = JsonWriter::open(buf).unwrap();
        let buf = {
            // close() consumes self and returns the flushed io::Result<()>,
            // not the buffer; exercise close() separately below.
            let JsonWriter { out, .. } = writer;
            out
        };
        assert_eq!(buf, b"[");
    }

    #[test]
    fn duration_event_matches_s2_shape() {
        let buf: Vec<u8> = Vec::new();
        let mut writer = JsonWriter::open(buf).unwrap();
        writer
            .duration_event("a", 0, 1, 2, 3, &Vec::new())
            .unwrap();
        let JsonWriter { out, .. } = writer;
        let s = String::from_utf8(out).unwrap();
        assert_eq!(
            s,
            "[{\"pid\":2,\"cat\":\"\",\"tid\":3,\"dur\":1.00,\"ts\":0.00,\"name\":\"a\",\"ph\":\"X\"}"
        );
    }

    #[test]
    fn separator_appears_only_between_events() {
        let buf: Vec<u8> = Vec::new();
        let mut writer = JsonWriter::open(buf).unwrap();
        writer.instant_event("a", 0, 2, 3, &Vec::new()).unwrap();
        writer.instant_event("b", 1, 2, 3, &Vec::new()).unwrap();
        let JsonWriter { out, .. } = writer;
        let s = String::from_utf8(out).unwrap();
        assert_eq!(s.matches(",\n").count(), 1);
    }

    #[test]
    fn args_omitted_when_attrs_empty() {
        let buf: Vec<u8> = Vec::new();
        let mut writer = JsonWriter::open(buf).unwrap();
        writer.instant_event("a", 0, 2, 3, &Vec::new()).unwrap();
        let JsonWriter { out, .. } = writer;
        let s = String::from_utf8(out).unwrap();
        assert!(!s.contains("args"));
    }
}
