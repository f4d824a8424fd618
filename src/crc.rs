//! The CRC-32 variant bzip2 stores per block and per stream: big-endian
//! bit order (unlike the reflected CRC-32 used by gzip/zip), polynomial
//! 0x04C11DB7, seeded with all-ones, complemented on output — exactly the
//! `crc` crate's `CRC_32_BZIP2` catalog entry
//! (`examples/ikrivosheev-lzma-rust2/Cargo.toml` already depends on `crc`
//! for this reason).
//!
//! The external decoder contract (spec §6.1) treats Huffman/BWT/MTF/RLE as
//! a black box, but this crate leans on the `bzip2` crate for that and
//! therefore needs to compute the per-block checksum itself from the
//! decompressed bytes it gets back, rather than reading it out of an
//! opaque decoder handle.

use crc::{Crc, CRC_32_BZIP2};
use std::sync::OnceLock;

fn crc32() -> &'static Crc<u32> {
    static CRC: OnceLock<Crc<u32>> = OnceLock::new();
    CRC.get_or_init(|| Crc::<u32>::new(&CRC_32_BZIP2))
}

/// Computes the bzip2 (big-endian) CRC-32 over `data`.
pub fn crc32_bzip2(data: &[u8]) -> u32 {
    crc32().checksum(data)
}

/// Folds one block's CRC into a stream accumulator: rotate left by one bit,
/// then XOR in the new block's CRC (spec §4.6).
pub fn fold(acc: u32, block_crc: u32) -> u32 {
    acc.rotate_left(1) ^ block_crc
}
