//! The s-chunk: a fixed-capacity input buffer handed from the splitter to
//! the scan/decode workers (spec §3, glossary `s2w_blk`).
//!
//! Once constructed an `SChunk`'s bytes never change, so it is safe to read
//! from multiple threads without locking. The specification tracks each
//! chunk's liveness with an explicit, manually maintained refcount ("freed
//! when refcount reaches zero, credit one slot back to the splitter"); here
//! that refcount is simply `Arc<SChunk>`'s own strong count, and the credit
//! is a `Drop` hook, so "freed exactly once, iff the last holder goes away"
//! is a property Rust already guarantees rather than one this crate has to
//! re-derive.

use std::sync::Arc;

/// Capacity of one s-chunk, in 32-bit words (C = 1 MiB).
pub const CAPACITY_WORDS: usize = crate::config::DEFAULT_CHUNK_WORDS;

/// A fixed-capacity input buffer. Always handled as `Arc<SChunk>`; the last
/// `Arc` to be dropped fires `on_release`, crediting one slot back to the
/// splitter (spec §3: "destruction returns one slot credit").
pub struct SChunk {
    /// Monotonically increasing id, starting at 1.
    pub id: u64,
    /// Raw bytes read from the input, word-padded. Never mutated after
    /// construction.
    pub buf: Vec<u8>,
    /// Word count actually loaded (1..=chunk_words).
    pub loaded_words: usize,
    /// True if this chunk was read short (loaded_words < capacity), which
    /// per spec always means it is the last chunk of the stream.
    pub short: bool,
    on_release: Box<dyn Fn() + Send + Sync>,
}

impl SChunk {
    pub fn new(
        id: u64,
        buf: Vec<u8>,
        loaded_words: usize,
        short: bool,
        on_release: impl Fn() + Send + Sync + 'static,
    ) -> Arc<Self> {
        debug_assert_eq!(buf.len(), loaded_words * 4);
        Arc::new(Self {
            id,
            buf,
            loaded_words,
            short,
            on_release: Box::new(on_release),
        })
    }

    /// Absolute bit offset of this chunk's first byte, assuming every
    /// earlier chunk was full-sized (true for every chunk but the last).
    pub fn base_bit(&self, chunk_words: usize) -> u64 {
        (self.id - 1) * chunk_words as u64 * 32
    }

    /// Absolute bit offset one past this chunk's last loaded byte.
    pub fn end_bit(&self, chunk_words: usize) -> u64 {
        self.base_bit(chunk_words) + self.loaded_words as u64 * 32
    }
}

/// Converts an absolute bit offset into the s-chunk id that contains it,
/// assuming every earlier chunk is full-sized.
pub fn s_id_for_bit(bit: u64, chunk_words: usize) -> u64 {
    bit / (chunk_words as u64 * 32) + 1
}

impl Drop for SChunk {
    fn drop(&mut self) {
        (self.on_release)();
    }
}
