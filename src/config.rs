//! Pipeline configuration: chunk/sub-block sizes, worker count, slot count.

use crate::queues::MIN_SLOTS;

/// s-chunk capacity C, in 32-bit words (1 MiB).
pub const DEFAULT_CHUNK_WORDS: usize = 262_144;

/// Sub-block size D, in bytes (1 MiB).
pub const DEFAULT_SUB_BLOCK_BYTES: usize = 1_048_576;

/// Tunable knobs for a single pipeline run. All fields are process-wide
/// constants for the duration of one decompression (spec §6.3).
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// s-chunk capacity C, in 32-bit words.
    pub chunk_words: usize,
    /// Sub-block size D, in bytes.
    pub sub_block_bytes: usize,
    /// Number of worker threads, N >= 1.
    pub num_workers: usize,
    /// Number of s-chunk slots. Floored at [`MIN_SLOTS`]: a retriever
    /// straddling a block across a chunk boundary holds its current chunk
    /// while waiting on its successor (spec §4.3), which a single slot can
    /// never satisfy.
    pub num_slots: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let num_workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .max(1);
        Self {
            chunk_words: DEFAULT_CHUNK_WORDS,
            sub_block_bytes: DEFAULT_SUB_BLOCK_BYTES,
            num_workers,
            num_slots: (num_workers * 2).max(MIN_SLOTS),
        }
    }
}

impl PipelineConfig {
    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers.max(1);
        self
    }

    pub fn with_slots(mut self, num_slots: usize) -> Self {
        self.num_slots = num_slots.max(MIN_SLOTS);
        self
    }
}
