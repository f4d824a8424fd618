//! Decoded sub-block (glossary `w2m_blk`): up to `sub_block_bytes` of one
//! block's decompressed output, addressed by the muxer's lexicographic
//! ordering key.

/// Lexicographic ordering key: (s_id, bz_id, sub_id). The muxer's `needed`
/// cursor advances through these in strict order (spec §3, §4.6).
pub type OrderKey = (u64, u64, u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEdge {
    /// An ordinary sub-block in the middle of a block's output.
    None,
    /// This sub-block carries a new stream's declared block size (a
    /// stream-header sentinel, bs100k 1..9).
    NewStream(u8),
    /// This sub-block is the stream's EOS sentinel.
    Eos,
}

#[derive(Debug, Clone)]
pub struct SubBlock {
    pub s_id: u64,
    pub bz_id: u64,
    pub last_bz: bool,
    pub sub_id: u64,
    pub last_sub: bool,
    /// Decompressed bytes for this slice; empty for metadata-only
    /// sentinels.
    pub bytes: Vec<u8>,
    /// CRC of the whole logical block this slice belongs to; valid only
    /// when `last_sub` is true.
    pub block_crc: Option<u32>,
    pub edge: StreamEdge,
    /// Stored stream CRC, present on the EOS sentinel that closes a
    /// stream.
    pub stream_crc: Option<u32>,
    pub end_offs: u64,
}

impl SubBlock {
    pub fn key(&self) -> OrderKey {
        (self.s_id, self.bz_id, self.sub_id)
    }

    /// The ordering key that should immediately follow this sub-block,
    /// per spec §4.6's cursor-advance rule.
    pub fn next_key(&self) -> OrderKey {
        if self.last_sub {
            if self.last_bz {
                (self.s_id + 1, 0, 0)
            } else {
                (self.s_id, self.bz_id + 1, 0)
            }
        } else {
            (self.s_id, self.bz_id, self.sub_id + 1)
        }
    }
}
