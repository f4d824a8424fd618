//! W→M monitor: the unordered delivery list of decoded sub-blocks plus the
//! released-slot counter the muxer forwards to M→S in a single batched call
//! per drain cycle (spec §4.6 step 2).

use crate::subblock::SubBlock;
use std::sync::{Condvar, Mutex};

struct State {
    delivery: Vec<SubBlock>,
    released: usize,
    workers_alive: usize,
}

pub struct DeliveryMonitor {
    inner: Mutex<State>,
    cv: Condvar,
}

/// One drain of the W→M monitor: every sub-block delivered since the last
/// drain, the number of s-chunk slots released in the interim, and whether
/// every worker has now exited.
pub struct Drain {
    pub sub_blocks: Vec<SubBlock>,
    pub released_slots: usize,
    pub all_workers_exited: bool,
}

impl DeliveryMonitor {
    pub fn new(num_workers: usize) -> Self {
        Self {
            inner: Mutex::new(State {
                delivery: Vec::new(),
                released: 0,
                workers_alive: num_workers,
            }),
            cv: Condvar::new(),
        }
    }

    /// A worker appends a freshly decoded sub-block.
    pub fn deliver(&self, sub_block: SubBlock) {
        let mut g = self.inner.lock().unwrap();
        g.delivery.push(sub_block);
        self.cv.notify_all();
    }

    /// Called by an s-chunk's release hook (see [`crate::chunk::SChunk`])
    /// when its last reference is dropped; batches the slot credit for the
    /// muxer's next drain rather than signaling M→S directly per chunk.
    pub fn mark_chunk_freed(&self) {
        let mut g = self.inner.lock().unwrap();
        g.released += 1;
        self.cv.notify_all();
    }

    /// A worker thread is exiting (`get_first` returned `Exit`).
    pub fn worker_exited(&self) {
        let mut g = self.inner.lock().unwrap();
        g.workers_alive = g.workers_alive.saturating_sub(1);
        self.cv.notify_all();
    }

    /// spec §4.6 drain loop: wait until there is delivery work, a slot to
    /// release, or every worker has exited, then take everything at once.
    /// Also wakes on `fault`, returning whatever is on hand so the muxer can
    /// notice the abort instead of blocking forever.
    pub fn wait_for_work(&self, fault: &crate::fault::FaultSignal) -> Drain {
        let mut g = self.inner.lock().unwrap();
        while g.delivery.is_empty() && g.released == 0 && g.workers_alive > 0 && !fault.is_aborted()
        {
            g = self.cv.wait(g).unwrap();
        }
        let sub_blocks = std::mem::take(&mut g.delivery);
        let released_slots = std::mem::take(&mut g.released);
        Drain {
            sub_blocks,
            released_slots,
            all_workers_exited: g.workers_alive == 0,
        }
    }

    /// Wakes the muxer so it can observe an abort raised elsewhere.
    pub fn wake_all(&self) {
        let _g = self.inner.lock().unwrap();
        self.cv.notify_all();
    }
}
