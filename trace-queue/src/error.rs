/// Returned by [`crate::Queue`] operations performed after the queue has
/// been closed and drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("queue is closed")]
pub struct Closed;
