//! End-to-end tests driving the full splitter/worker/muxer pipeline against
//! synthetic bzip2 streams built in-process with the `bzip2` crate's own
//! encoder, so these tests need no external `bzip2`/`pbzip2` binaries.

use bzip2::write::BzEncoder;
use bzip2::Compression;
use pbzip2::error::PbzipError;
use pbzip2::{pipeline::run_decompress, PipelineConfig};
use std::io::Write;

fn compress(data: &[u8]) -> Vec<u8> {
    let mut enc = BzEncoder::new(Vec::new(), Compression::best());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

fn decompress(compressed: &[u8], cfg: &PipelineConfig) -> pbzip2::Result<Vec<u8>> {
    let mut out = Vec::new();
    run_decompress(compressed, &mut out, cfg, "test")?;
    Ok(out)
}

/// Near-incompressible filler (xorshift64) whose bzip2 output size tracks
/// its input size closely, unlike a short-period pattern whose compressed
/// size is unpredictable.
fn incompressible_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state & 0xFF) as u8
        })
        .collect()
}

#[test]
fn single_stream_round_trips() {
    let payload: Vec<u8> = (0..500_000u32).map(|i| (i % 251) as u8).collect();
    let compressed = compress(&payload);
    let cfg = PipelineConfig::default().with_workers(4).with_slots(8);
    let out = decompress(&compressed, &cfg).unwrap();
    assert_eq!(out, payload);
}

#[test]
fn concatenated_streams_round_trip_in_order() {
    let a = b"first stream contents, nothing unusual here".repeat(1000);
    let b = b"second stream, appended right after the first's EOS marker".repeat(1000);
    let c = b"a third stream for good measure".repeat(1000);

    let mut compressed = compress(&a);
    compressed.extend_from_slice(&compress(&b));
    compressed.extend_from_slice(&compress(&c));

    let cfg = PipelineConfig::default().with_workers(4).with_slots(8);
    let out = decompress(&compressed, &cfg).unwrap();

    let mut expected = a;
    expected.extend_from_slice(&b);
    expected.extend_from_slice(&c);
    assert_eq!(out, expected);
}

#[test]
fn cross_chunk_blocks_round_trip_with_tiny_chunk_size() {
    // A single near-incompressible 50 KB block compresses to roughly its
    // own size; an 8750-word (35 KB) s-chunk is smaller than that but big
    // enough that two of them (70 KB) comfortably hold the whole block, so
    // it straddles exactly one s-chunk boundary instead of the several a
    // too-small chunk size would force (which would exceed the two-chunk
    // retrieval window the spec bounds retrieval to).
    let payload = incompressible_bytes(50_000, 0xC0FF_EE01);
    let compressed = compress(&payload);
    let mut cfg = PipelineConfig::default().with_workers(3).with_slots(8);
    cfg.chunk_words = 8_750;
    let out = decompress(&compressed, &cfg).unwrap();
    assert_eq!(out, payload);
}

#[test]
fn single_worker_matches_multi_worker_output() {
    let payload = b"idempotence across worker counts".repeat(2000);
    let compressed = compress(&payload);

    let cfg1 = PipelineConfig::default().with_workers(1).with_slots(4);
    let out1 = decompress(&compressed, &cfg1).unwrap();

    let cfg4 = PipelineConfig::default().with_workers(4).with_slots(8);
    let out4 = decompress(&compressed, &cfg4).unwrap();

    assert_eq!(out1, payload);
    assert_eq!(out1, out4);
}

#[test]
fn corrupted_stream_crc_is_rejected() {
    let payload = b"this stream's trailer will be tampered with".repeat(500);
    let mut compressed = compress(&payload);
    let len = compressed.len();
    // Flip a bit inside the last 4 bytes (the stored stream CRC).
    compressed[len - 1] ^= 0xFF;

    let cfg = PipelineConfig::default().with_workers(2).with_slots(4);
    let err = decompress(&compressed, &cfg).unwrap_err();
    assert!(matches!(err, PbzipError::StreamCrcMismatch { .. }));
}

#[test]
fn input_with_no_block_header_is_fatal() {
    let garbage = vec![0x11u8; 4096];
    let cfg = PipelineConfig::default().with_workers(2).with_slots(4);
    let err = decompress(&garbage, &cfg).unwrap_err();
    assert!(matches!(err, PbzipError::MissingBlockHeader { .. }));
}

#[test]
fn empty_payload_stream_round_trips() {
    let payload: Vec<u8> = Vec::new();
    let compressed = compress(&payload);
    let cfg = PipelineConfig::default().with_workers(2).with_slots(4);
    let out = decompress(&compressed, &cfg).unwrap();
    assert_eq!(out, payload);
}
