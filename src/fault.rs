//! Fail-fast signal shared by the splitter, workers and muxer.
//!
//! The specification deliberately leaves cancellation unspecified (§5:
//! "No cooperative cancellation is specified; implementations may add it
//! but must preserve output correctness") while requiring that a fatal
//! error in any one actor not leave another blocked forever on an empty
//! queue (§7/§8 termination property). This is the crate's addition to
//! satisfy that: one thread's error is latched here and every monitor's
//! wait loop also polls it, so a poisoned run unblocks everyone instead of
//! deadlocking.

use crate::error::PbzipError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct FaultSignal {
    error: Mutex<Option<PbzipError>>,
    aborted: AtomicBool,
}

impl FaultSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latches the first error raised; later ones are dropped (the first
    /// fault is almost always the most meaningful one).
    pub fn raise(&self, err: PbzipError) {
        let mut g = self.error.lock().unwrap();
        if g.is_none() {
            *g = Some(err);
        }
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    pub fn take(&self) -> Option<PbzipError> {
        self.error.lock().unwrap().take()
    }
}
