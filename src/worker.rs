//! Worker thread body (spec §4.2–4.5): a worker either runs the scan pass
//! that walks the whole input locating block/stream boundaries, or executes
//! decode jobs popped from the SW→W priority queue. `next_scan` is only
//! ever set once — by the splitter, for s-chunk 1 (spec §4.1) — so exactly
//! one worker ever becomes the active scanner; every other worker (and the
//! scanner itself, once it finishes) spends its time decoding. The scanner
//! still decodes pending jobs inline while it blocks waiting for its next
//! s-chunk (`get_second`'s `run_decode` callback), which is how the
//! "decode preempts scan" priority rule (spec §5) is realized without a
//! second thread.

use crate::chunk::{s_id_for_bit, SChunk};
use crate::config::PipelineConfig;
use crate::decode::execute_decode_job;
use crate::error::{PbzipError, Result};
use crate::fault::FaultSignal;
use crate::job::{BlockSizeTag, DecodeJob};
use crate::queues::{DeliveryMonitor, ScanWorkMonitor, WorkItem};
use crate::scanner::{Cursor, Marker};
use std::sync::Arc;

pub struct WorkerContext<'a> {
    pub cfg: &'a PipelineConfig,
    pub sww: &'a ScanWorkMonitor,
    pub delivery: &'a DeliveryMonitor,
    pub fault: &'a FaultSignal,
    pub path: &'a str,
}

/// Decodes one job and forwards every produced sub-block to the muxer.
fn decode_and_deliver(job: DecodeJob, ctx: &WorkerContext) -> Result<()> {
    let subs = execute_decode_job(job, ctx.cfg.sub_block_bytes, ctx.path)?;
    for sub in subs {
        ctx.delivery.deliver(sub);
    }
    Ok(())
}

/// The main worker loop: alternates between popping decode jobs and, for
/// at most one worker, running the scan pass to completion.
pub fn run(ctx: &WorkerContext) {
    let mut finished_scanning = false;
    loop {
        let mut run_decode = |job: DecodeJob| decode_and_deliver(job, ctx);
        match ctx.sww.get_first(finished_scanning, ctx.fault, &mut run_decode) {
            Ok(WorkItem::Scan(chunk)) => {
                if let Err(e) = run_scan_pass(chunk, ctx) {
                    ctx.fault.raise(e);
                    ctx.sww.wake_all();
                    ctx.delivery.wake_all();
                }
                finished_scanning = true;
            }
            Ok(WorkItem::Exit) => {
                ctx.delivery.worker_exited();
                return;
            }
            Err(e) => {
                ctx.fault.raise(e);
                ctx.sww.wake_all();
                ctx.delivery.wake_all();
                ctx.delivery.worker_exited();
                return;
            }
        }
    }
}

/// The one continuous scan pass that begins at s-chunk 1 and walks forward
/// — via `get_second` — through every s-chunk in the input, locating every
/// stream header, block, and EOS marker and enqueuing a decode job for
/// each (spec §4.2/§4.3).
fn run_scan_pass(first: Arc<SChunk>, ctx: &WorkerContext) -> Result<()> {
    let chunk_words = ctx.cfg.chunk_words;
    let first_short = first.short;
    let mut cursor = Cursor::new(first, chunk_words, ctx.sww, ctx.fault, ctx.path.to_string());
    let mut run_decode = |job: DecodeJob| decode_and_deliver(job, ctx);

    let header = cursor.peek_stream_header(0, &mut run_decode)?;
    let (mut header_bit, mut bs100k) = match header {
        Some(h) => h,
        None => {
            return if first_short {
                Ok(())
            } else {
                Err(PbzipError::MissingBlockHeader {
                    path: ctx.path.to_string(),
                })
            };
        }
    };

    let mut cur_scan_s_id = s_id_for_bit(header_bit, chunk_words);
    let mut bz_id: u64 = 0;
    let mut pending: Option<DecodeJob> = None;

    loop {
        // Emit the stream header sentinel that opens this stream.
        let job_s_id = s_id_for_bit(header_bit, chunk_words);
        if job_s_id != cur_scan_s_id {
            cur_scan_s_id = job_s_id;
            bz_id = 0;
        }
        let header_job = DecodeJob::stream_header(job_s_id, bz_id, bs100k, (header_bit + 32) / 8);
        bz_id += 1;
        flush_pending(&mut pending, job_s_id, ctx.sww);
        pending = Some(header_job);

        let current_bs100k1 = bs100k;
        let mut pos_bit = header_bit + 32;
        let mut block_start: Option<u64> = None;

        loop {
            let (mbit, mkind) = cursor
                .next_marker(pos_bit, true, &mut run_decode)?
                .expect("fatal_on_exhaustion guarantees a marker or an error");

            if let Some(start) = block_start {
                let payload = cursor.extract(start, mbit);
                let job_s_id = s_id_for_bit(start, chunk_words);
                if job_s_id != cur_scan_s_id {
                    cur_scan_s_id = job_s_id;
                    bz_id = 0;
                }
                let block_job = DecodeJob::real_block(
                    job_s_id,
                    bz_id,
                    false,
                    payload,
                    BlockSizeTag::Unchanged,
                    current_bs100k1,
                    mbit / 8,
                );
                bz_id += 1;
                flush_pending(&mut pending, job_s_id, ctx.sww);
                pending = Some(block_job);
            }
            cursor.advance_past(mbit);

            match mkind {
                Marker::Block => {
                    block_start = Some(mbit);
                    pos_bit = mbit + 48;
                }
                Marker::Eos => {
                    let crc_bytes = cursor.extract_extending(mbit + 48, mbit + 80, &mut run_decode)?;
                    let stream_crc = crate::scanner::read_u32_bits(&crc_bytes, 0);
                    let eos_s_id = s_id_for_bit(mbit, chunk_words);
                    let eos_bz_id = if eos_s_id != cur_scan_s_id {
                        cur_scan_s_id = eos_s_id;
                        0
                    } else {
                        bz_id
                    };
                    bz_id = eos_bz_id + 1;
                    let eos_job = DecodeJob::eos(
                        eos_s_id,
                        eos_bz_id,
                        stream_crc,
                        current_bs100k1,
                        (mbit + 80) / 8,
                    );
                    flush_pending(&mut pending, eos_s_id, ctx.sww);
                    pending = Some(eos_job);
                    pos_bit = (mbit + 80 + 7) & !7;
                    break;
                }
            }
        }

        match cursor.peek_stream_header(pos_bit, &mut run_decode)? {
            Some((next_header_bit, next_bs100k)) => {
                header_bit = next_header_bit;
                bs100k = next_bs100k;
            }
            None => {
                if let Some(mut job) = pending.take() {
                    job.set_last_bz(true);
                    ctx.sww.push_decode_job(job);
                }
                return Ok(());
            }
        }
    }
}

/// Finalizes the pending job's `last_bz` flag — true iff the job about to
/// be queued belongs to a different s-chunk — then pushes it.
fn flush_pending(pending: &mut Option<DecodeJob>, next_s_id: u64, sww: &ScanWorkMonitor) {
    if let Some(mut job) = pending.take() {
        let last_bz = job.s_id != next_s_id;
        job.set_last_bz(last_bz);
        sww.push_decode_job(job);
    }
}
