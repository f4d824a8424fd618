//! SW→W monitor: the scan chain, the decode priority queue, and the
//! `eof`/`scanning` bookkeeping that the single condvar's two predicates
//! (spec §5) are evaluated over.
//!
//! s-chunk refcounting itself is not tracked here (see
//! [`crate::chunk::SChunk`]'s doc comment) — this monitor only owns the
//! chunks that are *pending hand-off* (published but not yet given to a
//! retriever); once a chunk is handed out via [`ScanWorkMonitor::get_first`]
//! or [`ScanWorkMonitor::get_second`] it is removed from this monitor's map
//! entirely and becomes the caller's sole responsibility.

use crate::chunk::SChunk;
use crate::error::Result;
use crate::job::DecodeJob;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Condvar, Mutex};

/// Decode jobs never reach the caller as a `WorkItem`: `get_first`/
/// `get_second` execute them inline via the `run_decode` callback before
/// looping back to look for scan work, per the decode-preempts-scan
/// priority rule (spec §5).
pub enum WorkItem {
    Scan(Arc<SChunk>),
    Exit,
}

struct State {
    chunks: HashMap<u64, Arc<SChunk>>,
    link_next: HashMap<u64, u64>,
    next_scan: Option<u64>,
    decode_q: BTreeMap<(u64, u64), DecodeJob>,
    eof: bool,
    scanning: usize,
}

impl State {
    /// `(P_first, P_second)`, spec §5.
    fn predicates(&self) -> (bool, bool) {
        let decode_nonempty = !self.decode_q.is_empty();
        let p_first = decode_nonempty || self.next_scan.is_some() || (self.eof && self.scanning == 0);
        let p_second = decode_nonempty || self.next_scan.is_some() || self.eof;
        (p_first, p_second)
    }

    fn pop_decode(&mut self) -> Option<DecodeJob> {
        let key = *self.decode_q.keys().next()?;
        self.decode_q.remove(&key)
    }
}

pub struct ScanWorkMonitor {
    inner: Mutex<State>,
    cv: Condvar,
}

impl ScanWorkMonitor {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(State {
                chunks: HashMap::new(),
                link_next: HashMap::new(),
                next_scan: None,
                decode_q: BTreeMap::new(),
                eof: false,
                scanning: 0,
            }),
            cv: Condvar::new(),
        }
    }

    fn notify_on_transition(&self, before: (bool, bool), after: (bool, bool)) {
        if (!before.0 && after.0) || (!before.1 && after.1) {
            self.cv.notify_all();
        }
    }

    /// Publishes a freshly read s-chunk. `predecessor` is the id of the
    /// chunk published immediately before this one, if any (spec §4.1:
    /// "update predecessor's `next` to point to the new chunk; if
    /// predecessor is absent, update `next_scan`").
    pub fn publish(&self, chunk: Arc<SChunk>, predecessor: Option<u64>) {
        let mut g = self.inner.lock().unwrap();
        let before = g.predicates();
        let id = chunk.id;
        g.chunks.insert(id, chunk);
        match predecessor {
            Some(pred) => {
                g.link_next.insert(pred, id);
            }
            None => g.next_scan = Some(id),
        }
        let after = g.predicates();
        self.notify_on_transition(before, after);
    }

    /// Marks end of input (spec §4.1: splitter "terminates on short read").
    pub fn set_eof(&self) {
        let mut g = self.inner.lock().unwrap();
        let before = g.predicates();
        g.eof = true;
        let after = g.predicates();
        self.notify_on_transition(before, after);
        if after.0 || after.1 {
            self.cv.notify_all();
        }
    }

    /// Enqueues a freshly retrieved block or sentinel for decoding.
    pub fn push_decode_job(&self, job: DecodeJob) {
        let mut g = self.inner.lock().unwrap();
        let before = g.predicates();
        g.decode_q.insert(job.priority_key(), job);
        let after = g.predicates();
        self.notify_on_transition(before, after);
    }

    /// spec §4.5 `get_first`. `finished_scanning` must be true exactly when
    /// the caller was the scan-chain's active retriever and is now giving
    /// that role up. `run_decode` executes a popped decode job with the
    /// monitor's lock released.
    pub fn get_first(
        &self,
        finished_scanning: bool,
        fault: &crate::fault::FaultSignal,
        run_decode: &mut dyn FnMut(DecodeJob) -> Result<()>,
    ) -> Result<WorkItem> {
        let mut g = self.inner.lock().unwrap();
        if finished_scanning {
            g.scanning = g.scanning.saturating_sub(1);
        }
        loop {
            if fault.is_aborted() {
                return Ok(WorkItem::Exit);
            }
            if let Some(job) = g.pop_decode() {
                drop(g);
                run_decode(job)?;
                g = self.inner.lock().unwrap();
                continue;
            }
            if let Some(id) = g.next_scan.take() {
                g.scanning += 1;
                let chunk = g.chunks.remove(&id).expect("published chunk must be present");
                return Ok(WorkItem::Scan(chunk));
            }
            if g.eof && g.scanning == 0 {
                self.cv.notify_all();
                return Ok(WorkItem::Exit);
            }
            g = self.cv.wait(g).unwrap();
        }
    }

    /// spec §4.5 `get_second`: used by an active retriever crossing from
    /// `current_id` into its successor. Returns `None` at true end of
    /// input. The `Arc` handed back is this chunk's sole remaining
    /// reference in the pipeline; dropping the caller's old `current`
    /// handle (which happens naturally once it reassigns its local
    /// variable) is what ultimately fires the chunk's release hook.
    pub fn get_second(
        &self,
        current_id: u64,
        fault: &crate::fault::FaultSignal,
        run_decode: &mut dyn FnMut(DecodeJob) -> Result<()>,
    ) -> Result<Option<Arc<SChunk>>> {
        let mut g = self.inner.lock().unwrap();
        loop {
            if fault.is_aborted() {
                return Ok(None);
            }
            if let Some(job) = g.pop_decode() {
                drop(g);
                run_decode(job)?;
                g = self.inner.lock().unwrap();
                continue;
            }
            if let Some(&next_id) = g.link_next.get(&current_id) {
                let next_chunk = g.chunks.remove(&next_id);
                return Ok(next_chunk);
            }
            if g.eof {
                return Ok(None);
            }
            g = self.cv.wait(g).unwrap();
        }
    }

    /// Wakes any thread blocked in `get_first`/`get_second` so it can
    /// observe an abort raised elsewhere.
    pub fn wake_all(&self) {
        let _g = self.inner.lock().unwrap();
        self.cv.notify_all();
    }
}

impl Default for ScanWorkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::SChunk;

    fn chunk(id: u64) -> Arc<SChunk> {
        SChunk::new(id, vec![0u8; 4], 1, false, || {})
    }

    fn fault() -> crate::fault::FaultSignal {
        crate::fault::FaultSignal::new()
    }

    #[test]
    fn first_published_chunk_becomes_next_scan() {
        let m = ScanWorkMonitor::new();
        m.publish(chunk(1), None);
        let mut noop = |_: DecodeJob| Ok(());
        match m.get_first(false, &fault(), &mut noop).unwrap() {
            WorkItem::Scan(c) => assert_eq!(c.id, 1),
            _ => panic!("expected scan"),
        }
    }

    #[test]
    fn decode_jobs_preempt_scan() {
        let m = ScanWorkMonitor::new();
        m.publish(chunk(1), None);
        m.push_decode_job(crate::job::DecodeJob::eos(9, 0, 0, 1, 0));
        let mut seen_decode = false;
        let mut run = |_job: DecodeJob| {
            seen_decode = true;
            Ok(())
        };
        let item = m.get_first(false, &fault(), &mut run).unwrap();
        assert!(seen_decode);
        match item {
            WorkItem::Scan(c) => assert_eq!(c.id, 1),
            _ => panic!("expected scan after decode drained"),
        }
    }

    #[test]
    fn exit_only_once_eof_and_idle() {
        let m = ScanWorkMonitor::new();
        m.set_eof();
        let mut noop = |_: DecodeJob| Ok(());
        match m.get_first(false, &fault(), &mut noop).unwrap() {
            WorkItem::Exit => {}
            _ => panic!("expected exit"),
        }
    }

    #[test]
    fn get_second_links_published_successor() {
        let m = ScanWorkMonitor::new();
        m.publish(chunk(1), None);
        m.publish(chunk(2), Some(1));
        let mut noop = |_: DecodeJob| Ok(());
        let next = m.get_second(1, &fault(), &mut noop).unwrap();
        assert_eq!(next.unwrap().id, 2);
    }

    #[test]
    fn get_second_returns_none_at_eof_with_no_successor() {
        let m = ScanWorkMonitor::new();
        m.publish(chunk(1), None);
        m.set_eof();
        let mut noop = |_: DecodeJob| Ok(());
        let next = m.get_second(1, &fault(), &mut noop).unwrap();
        assert!(next.is_none());
    }
}
