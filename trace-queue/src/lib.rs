//! A multi-producer/single-consumer blocking FIFO queue.
//!
//! Producers [`push`](Queue::push) from any thread; a single consumer
//! [`pop`](Queue::pop)s one element at a time or [`transfer`](Queue::transfer)s
//! the whole backlog in one critical section. [`close`](Queue::close) is
//! idempotent and wakes every waiter.
//!
//! The design mirrors the teacher's worker-thread channel
//! (`tracing-appender`'s `crossbeam_channel`-backed `Msg` queue and its
//! `Worker::work` drain loop), generalized with an explicit, idempotent
//! `close` and a bulk `transfer` — neither of which `crossbeam-channel`'s
//! `Receiver` exposes directly, which is why this crate hand-rolls the queue
//! over a `Mutex`/`Condvar` pair instead of building on that channel (see
//! `DESIGN.md`).

mod error;

pub use error::Closed;

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// A blocking MPSC FIFO queue of `T`.
pub struct Queue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Queue<T> {
    /// Creates a new, open, empty queue.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
        }
    }

    /// Enqueues `item`. Fails with [`Closed`] if the queue is closed.
    ///
    /// Wakes a waiting consumer when the queue transitions from empty to
    /// non-empty.
    pub fn push(&self, item: T) -> Result<(), Closed> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return Err(Closed);
        }
        let was_empty = inner.items.is_empty();
        inner.items.push_back(item);
        drop(inner);
        if was_empty {
            self.not_empty.notify_one();
        }
        Ok(())
    }

    /// Blocks until an element is available, then returns it.
    ///
    /// Fails with [`Closed`] once the queue is both empty and closed. Never
    /// returns spuriously: the wait loop only wakes on a real state change.
    pub fn pop(&self) -> Result<T, Closed> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(item) = inner.items.pop_front() {
                return Ok(item);
            }
            if inner.closed {
                return Err(Closed);
            }
            inner = self.not_empty.wait(inner).unwrap();
        }
    }

    /// Blocks until at least one element is available, then moves the
    /// entire current backlog into `local`, preserving FIFO order, and
    /// returns.
    ///
    /// Fails with [`Closed`] if the queue is empty and closed. This is the
    /// amortizing operation the writer thread uses: one lock acquisition
    /// drains however many events accumulated since the last drain, instead
    /// of one acquisition per event.
    pub fn transfer(&self, local: &mut VecDeque<T>) -> Result<(), Closed> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if !inner.items.is_empty() {
                local.append(&mut inner.items);
                return Ok(());
            }
            if inner.closed {
                return Err(Closed);
            }
            inner = self.not_empty.wait(inner).unwrap();
        }
    }

    /// Marks the queue closed and wakes every waiter. Idempotent.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return;
        }
        inner.closed = true;
        drop(inner);
        self.not_empty.notify_all();
    }

    /// Whether the queue has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }
}
