//! Single-flight guard for sync runs.

use std::sync::atomic::{AtomicBool, Ordering};

/// Holds the running flag for the duration of one run.
///
/// The flag is cleared on drop, which also covers early returns and unwinding.
pub struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    /// Take the flag, or `None` when another run already holds it.
    pub fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
