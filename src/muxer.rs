//! The muxer (spec §4.6): drains decoded sub-blocks from W→M, reorders them
//! by the lexicographic `(s_id, bz_id, sub_id)` key, folds per-block CRCs
//! into a per-stream accumulator, writes bytes in original order, and
//! batches freed s-chunk slots back to the splitter.

use crate::crc::fold;
use crate::error::{PbzipError, Result};
use crate::fault::FaultSignal;
use crate::queues::{DeliveryMonitor, SlotMonitor};
use crate::subblock::{OrderKey, StreamEdge, SubBlock};
use std::collections::BTreeMap;
use std::io::Write;

/// Runs the muxer's drain loop to completion, writing decompressed bytes to
/// `out` in original stream order. Returns once every worker has exited and
/// every sub-block up to the final cursor position has been emitted.
pub fn run(
    delivery: &DeliveryMonitor,
    slots: &SlotMonitor,
    fault: &FaultSignal,
    out: &mut dyn Write,
    path: &str,
) -> Result<()> {
    let mut needed: OrderKey = (1, 0, 0);
    let mut reorder: BTreeMap<OrderKey, SubBlock> = BTreeMap::new();
    let mut acc: u32 = 0;
    let mut any_stream_seen = false;

    loop {
        let drain = delivery.wait_for_work(fault);
        if fault.is_aborted() {
            return Err(fault
                .take()
                .unwrap_or_else(|| PbzipError::NotABzip2File { path: path.to_string() }));
        }

        for sub in drain.sub_blocks {
            reorder.insert(sub.key(), sub);
        }
        slots.release(drain.released_slots);

        while let Some(sub) = reorder.remove(&needed) {
            if let Some(block_crc) = sub.block_crc {
                acc = fold(acc, block_crc);
            }
            match sub.edge {
                StreamEdge::NewStream(_) => {
                    any_stream_seen = true;
                }
                StreamEdge::Eos => {
                    let stored = sub.stream_crc.ok_or_else(|| PbzipError::StreamCrcMismatch {
                        path: path.to_string(),
                    })?;
                    if acc != stored {
                        return Err(PbzipError::StreamCrcMismatch { path: path.to_string() });
                    }
                    acc = 0;
                }
                StreamEdge::None => {}
            }
            needed = sub.next_key();
            out.write_all(&sub.bytes).map_err(PbzipError::from)?;
        }

        if drain.all_workers_exited {
            if !reorder.is_empty() {
                return Err(PbzipError::UnterminatedBlock { path: path.to_string() });
            }
            return if any_stream_seen {
                Ok(())
            } else {
                Err(PbzipError::NotABzip2File { path: path.to_string() })
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn header(s_id: u64, bz_id: u64, bs: u8) -> SubBlock {
        SubBlock {
            s_id,
            bz_id,
            last_bz: false,
            sub_id: 0,
            last_sub: true,
            bytes: Vec::new(),
            block_crc: None,
            edge: StreamEdge::NewStream(bs),
            stream_crc: None,
            end_offs: 0,
        }
    }

    fn block(s_id: u64, bz_id: u64, last_bz: bool, bytes: &[u8]) -> SubBlock {
        SubBlock {
            s_id,
            bz_id,
            last_bz,
            sub_id: 0,
            last_sub: true,
            bytes: bytes.to_vec(),
            block_crc: Some(crate::crc::crc32_bzip2(bytes)),
            edge: StreamEdge::None,
            stream_crc: None,
            end_offs: 0,
        }
    }

    fn eos(s_id: u64, bz_id: u64, stream_crc: u32) -> SubBlock {
        SubBlock {
            s_id,
            bz_id,
            last_bz: true,
            sub_id: 0,
            last_sub: true,
            bytes: Vec::new(),
            block_crc: None,
            edge: StreamEdge::Eos,
            stream_crc: Some(stream_crc),
            end_offs: 0,
        }
    }

    #[test]
    fn writes_bytes_in_order_and_validates_crc() {
        let delivery = DeliveryMonitor::new(1);
        let slots = SlotMonitor::new(2);
        let fault = FaultSignal::new();

        let block_bytes = b"hello world".to_vec();
        let stream_crc = fold(0, crate::crc::crc32_bzip2(&block_bytes));

        delivery.deliver(header(1, 0, 9));
        delivery.deliver(block(1, 1, true, &block_bytes));
        delivery.deliver(eos(2, 0, stream_crc));
        delivery.worker_exited();

        let mut out = Vec::new();
        run(&delivery, &slots, &fault, &mut out, "test").unwrap();
        assert_eq!(out, block_bytes);
    }

    #[test]
    fn crc_mismatch_is_fatal() {
        let delivery = DeliveryMonitor::new(1);
        let slots = SlotMonitor::new(2);
        let fault = FaultSignal::new();

        delivery.deliver(header(1, 0, 9));
        delivery.deliver(block(1, 1, true, b"data"));
        delivery.deliver(eos(2, 0, 0xDEAD_BEEF));
        delivery.worker_exited();

        let mut out = Vec::new();
        let err = run(&delivery, &slots, &fault, &mut out, "test").unwrap_err();
        assert!(matches!(err, PbzipError::StreamCrcMismatch { .. }));
    }

    #[test]
    fn no_real_stream_is_fatal() {
        let delivery = DeliveryMonitor::new(1);
        let slots = SlotMonitor::new(1);
        let fault = FaultSignal::new();
        delivery.worker_exited();

        let mut out = Vec::new();
        let err = run(&delivery, &slots, &fault, &mut out, "test").unwrap_err();
        assert!(matches!(err, PbzipError::NotABzip2File { .. }));
    }

    #[test]
    fn slot_releases_are_forwarded_in_batches() {
        let delivery = Arc::new(DeliveryMonitor::new(1));
        let slots = Arc::new(SlotMonitor::new(0));
        let fault = FaultSignal::new();
        delivery.mark_chunk_freed();
        delivery.mark_chunk_freed();
        delivery.worker_exited();

        let mut out = Vec::new();
        // No real stream, but we only care that slots were released.
        let _ = run(&delivery, &slots, &fault, &mut out, "test");
        assert!(slots.acquire(&fault));
        assert!(slots.acquire(&fault));
    }
}
