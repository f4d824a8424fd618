#![no_main]

use libfuzzer_sys::fuzz_target;
use pbzip2::pipeline::run_decompress;
use pbzip2::PipelineConfig;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() || data.len() > 2_000_000 {
        return;
    }

    // Small chunk/slot counts push the scanner and muxer across s-chunk
    // boundaries constantly, which is where the cross-chunk retrieval and
    // reordering logic is most likely to mishandle malformed input.
    let mut cfg = PipelineConfig::default().with_workers(2).with_slots(4);
    cfg.chunk_words = 32;

    let mut out = Vec::new();
    // Any outcome other than a panic is acceptable: malformed input must
    // surface as a `PbzipError`, never corrupt output or hang.
    let _ = run_decompress(data, &mut out, &cfg, "fuzz");
});
