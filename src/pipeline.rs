//! Top-level orchestration: wires the M→S, SW→W and W→M monitors together,
//! spawns the splitter and worker threads, and runs the muxer on the calling
//! thread (spec §2: "the splitter, N workers and the muxer run concurrently;
//! only the muxer touches the output").

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::fault::FaultSignal;
use crate::queues::{DeliveryMonitor, ScanWorkMonitor, SlotMonitor};
use crate::{muxer, splitter, worker};
use std::io::Write;
use std::sync::Arc;
use std::thread;

/// Decompresses `data` (a complete in-memory or mmap'd bzip2 byte stream,
/// possibly several concatenated streams) into `out`, per `cfg`.
///
/// `path` is used only to label errors; the pipeline itself never touches
/// the filesystem.
pub fn run_decompress(data: &[u8], out: &mut dyn Write, cfg: &PipelineConfig, path: &str) -> Result<()> {
    let sww = Arc::new(ScanWorkMonitor::new());
    let slots = Arc::new(SlotMonitor::new(cfg.num_slots));
    let delivery = Arc::new(DeliveryMonitor::new(cfg.num_workers));
    let fault = Arc::new(FaultSignal::new());

    thread::scope(|scope| {
        let sww_splitter = Arc::clone(&sww);
        let slots_splitter = Arc::clone(&slots);
        let delivery_splitter = Arc::clone(&delivery);
        let fault_splitter = Arc::clone(&fault);
        scope.spawn(move || {
            splitter::run(
                data,
                cfg.chunk_words,
                &sww_splitter,
                &slots_splitter,
                delivery_splitter,
                &fault_splitter,
            );
        });

        for _ in 0..cfg.num_workers {
            let sww_worker = Arc::clone(&sww);
            let delivery_worker = Arc::clone(&delivery);
            let fault_worker = Arc::clone(&fault);
            scope.spawn(move || {
                let ctx = worker::WorkerContext {
                    cfg,
                    sww: &sww_worker,
                    delivery: &delivery_worker,
                    fault: &fault_worker,
                    path,
                };
                worker::run(&ctx);
            });
        }

        let result = muxer::run(&delivery, &slots, &fault, out, path);
        if let Err(ref e) = result {
            fault.raise(e.clone());
        }
        if fault.is_aborted() {
            sww.wake_all();
            slots.wake_all();
            delivery.wake_all();
        }
        result
    })
}
