/// Internal, non-hot-path errors surfaced by the writer thread.
///
/// Nothing in `trace-core::Collector` returns this type — a `BackendError`
/// either gets logged via `tracing` (see `backend::writer_loop`) or, for
/// `queue::Closed`, is swallowed at the call site, matching the base spec's
/// "producers may swallow it silently" policy.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("i/o error writing trace output: {0}")]
    Io(#[from] std::io::Error),
    #[error("event queue closed")]
    QueueClosed,
}

impl From<trace_queue::Closed> for BackendError {
    fn from(_: trace_queue::Closed) -> Self {
        BackendError::QueueClosed
    }
}
