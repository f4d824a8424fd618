//! The splitter (spec §4.1): carves the input byte slice into s-chunks and
//! publishes them to the SW→W scan chain, blocking on free slots to enforce
//! the resident-memory bound.
//!
//! Unlike the teacher's `scan_blocks`, which streams straight from a byte
//! slice with no explicit chunking, this pipeline's backpressure model
//! requires materializing each s-chunk as its own owned buffer (spec §3)
//! so its lifetime — and the free-slot credit it represents — can be
//! tracked independently of the underlying mmap/`Vec`.

use crate::chunk::SChunk;
use crate::fault::FaultSignal;
use crate::queues::{DeliveryMonitor, ScanWorkMonitor, SlotMonitor};
use std::sync::Arc;

/// Reads `data` into a sequence of s-chunks of `chunk_words` words each,
/// publishing them to `sww` as they're produced. Blocks on `slots` between
/// chunks. Runs until `data` is exhausted or `fault` reports an abort
/// raised elsewhere in the pipeline.
pub fn run(
    data: &[u8],
    chunk_words: usize,
    sww: &ScanWorkMonitor,
    slots: &SlotMonitor,
    delivery: Arc<DeliveryMonitor>,
    fault: &FaultSignal,
) {
    let chunk_bytes = chunk_words * 4;
    let mut id: u64 = 0;
    let mut predecessor: Option<u64> = None;
    let mut offset = 0usize;

    loop {
        if !slots.acquire(fault) {
            return;
        }
        if fault.is_aborted() {
            slots.release(1);
            return;
        }
        if offset >= data.len() {
            slots.release(1);
            sww.set_eof();
            return;
        }

        id += 1;
        let end = (offset + chunk_bytes).min(data.len());
        let raw = &data[offset..end];
        let loaded_words = raw.len().div_ceil(4);
        let mut buf = vec![0u8; loaded_words * 4];
        buf[..raw.len()].copy_from_slice(raw);
        let short = raw.len() < chunk_bytes;
        offset = end;

        let delivery_for_chunk = Arc::clone(&delivery);
        let chunk = SChunk::new(id, buf, loaded_words, short, move || {
            delivery_for_chunk.mark_chunk_freed();
        });
        sww.publish(chunk, predecessor);
        predecessor = Some(id);

        if short {
            sww.set_eof();
            return;
        }
    }
}
