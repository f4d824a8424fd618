//! M→S monitor: the free-slot count the splitter waits on (spec §5: "mutated
//! only under M→S monitor").

use std::sync::{Condvar, Mutex};

/// A retriever whose block straddles an s-chunk boundary holds its current
/// chunk while blocking in `get_second` for the next one (spec §4.3): with
/// only one slot in flight the splitter could never allocate that successor,
/// since the only slot's credit isn't returned until the cursor advances
/// past the predecessor. Two slots is the minimum that keeps that handoff
/// free of deadlock for any input.
pub const MIN_SLOTS: usize = 2;

pub struct SlotMonitor {
    free: Mutex<usize>,
    cv: Condvar,
}

impl SlotMonitor {
    pub fn new(num_slots: usize) -> Self {
        Self {
            free: Mutex::new(num_slots.max(MIN_SLOTS)),
            cv: Condvar::new(),
        }
    }

    /// Blocks until a slot is free, then takes it. Returns `false` without
    /// taking a slot if `fault` reports an abort while waiting.
    pub fn acquire(&self, fault: &crate::fault::FaultSignal) -> bool {
        let mut free = self.free.lock().unwrap();
        while *free == 0 {
            if fault.is_aborted() {
                return false;
            }
            free = self.cv.wait(free).unwrap();
        }
        if fault.is_aborted() {
            return false;
        }
        *free -= 1;
        true
    }

    /// Credits `n` slots back (the muxer's batched return, spec §4.6 step 2).
    pub fn release(&self, n: usize) {
        if n == 0 {
            return;
        }
        let mut free = self.free.lock().unwrap();
        *free += n;
        self.cv.notify_all();
    }

    /// Wakes any thread blocked in `acquire` so it can observe an abort.
    pub fn wake_all(&self) {
        let _g = self.free.lock().unwrap();
        self.cv.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn acquire_blocks_until_release() {
        let m = Arc::new(SlotMonitor::new(MIN_SLOTS));
        let fault = Arc::new(crate::fault::FaultSignal::new());
        for _ in 0..MIN_SLOTS {
            assert!(m.acquire(&fault));
        }
        let m2 = Arc::clone(&m);
        let fault2 = Arc::clone(&fault);
        let handle = thread::spawn(move || {
            assert!(m2.acquire(&fault2));
        });
        thread::sleep(std::time::Duration::from_millis(20));
        m.release(1);
        handle.join().unwrap();
    }

    #[test]
    fn requesting_one_slot_is_floored_to_min_slots() {
        let m = SlotMonitor::new(1);
        let fault = crate::fault::FaultSignal::new();
        assert!(m.acquire(&fault));
        // A second slot must still be available for get_second's successor
        // chunk while the first is held (spec §4.3's two-chunk handoff).
        assert!(m.acquire(&fault));
    }

    #[test]
    fn batched_release_wakes_all() {
        let m = SlotMonitor::new(0);
        let fault = crate::fault::FaultSignal::new();
        m.release(3);
        assert!(m.acquire(&fault));
        assert!(m.acquire(&fault));
        assert!(m.acquire(&fault));
    }

    #[test]
    fn acquire_returns_false_on_fault() {
        let m = Arc::new(SlotMonitor::new(MIN_SLOTS));
        let fault = Arc::new(crate::fault::FaultSignal::new());
        for _ in 0..MIN_SLOTS {
            assert!(m.acquire(&fault));
        }
        let m2 = Arc::clone(&m);
        let fault2 = Arc::clone(&fault);
        let handle = thread::spawn(move || m2.acquire(&fault2));
        thread::sleep(std::time::Duration::from_millis(20));
        fault.raise(crate::error::PbzipError::NotABzip2File { path: "x".into() });
        m.wake_all();
        assert!(!handle.join().unwrap());
    }
}
