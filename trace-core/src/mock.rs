//! Process-wide mock mode: a one-way test hook that makes timestamps and
//! process/thread ids deterministic.
//!
//! Mock mode only ever transitions `false -> true`. There is no `disable`:
//! once enabled, the reference backend and [`clock::default_clock`](crate::clock::default_clock)
//! stay in mock mode for the remainder of the process, matching the source
//! spec's "one-way" contract.

use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

static MOCK_ENABLED: AtomicBool = AtomicBool::new(false);

/// The `pid` reported for every event while mock mode is enabled.
pub const MOCK_PID: u64 = 2;
/// The `tid` reported for every event while mock mode is enabled.
pub const MOCK_TID: u64 = 3;

/// Enables mock mode for the remainder of the process.
pub fn enable() {
    MOCK_ENABLED.store(true, Ordering::SeqCst);
}

/// Whether mock mode is currently enabled.
pub fn is_enabled() -> bool {
    MOCK_ENABLED.load(Ordering::SeqCst)
}

/// Returns the process id to report on emitted events.
pub fn pid() -> u64 {
    if is_enabled() {
        MOCK_PID
    } else {
        std::process::id() as u64
    }
}

static NEXT_TID: AtomicU64 = AtomicU64::new(0);
static TID_TABLE: Lazy<Mutex<std::collections::HashMap<std::thread::ThreadId, u64>>> =
    Lazy::new(|| Mutex::new(std::collections::HashMap::new()));

/// Returns a dense, process-unique integer id for the calling thread.
///
/// `std::thread::ThreadId` has no stable integer representation, so real
/// mode assigns each observed thread a small id from a global counter the
/// first time it calls into the backend. Mock mode short-circuits this with
/// the fixed [`MOCK_TID`].
pub fn tid() -> u64 {
    if is_enabled() {
        return MOCK_TID;
    }
    let key = std::thread::current().id();
    let mut table = TID_TABLE.lock().unwrap();
    *table
        .entry(key)
        .or_insert_with(|| NEXT_TID.fetch_add(1, Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tid_is_stable_per_thread() {
        let a = tid();
        let b = tid();
        assert_eq!(a, b);
    }
}
