//! Decode job (glossary `w2w_blk`): one bzip2 block captured and ready for
//! decoding, or a stream-transition sentinel carrying only metadata.

/// bs100k transition carried by a job: block-size unchanged from the prior
/// block, a new stream starting with the given declared block size, or an
/// end-of-stream marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSizeTag {
    Unchanged,
    NewStream(u8),
    Eos,
}

/// A single bzip2 block's compressed payload, located and extracted by a
/// scanning worker, queued for a (possibly different) worker to decode.
#[derive(Debug, Clone)]
pub struct DecodeJob {
    /// Id of the s-chunk whose scan discovered this block's start.
    pub s_id: u64,
    /// Sequence number of this block within its s-chunk's scan, starting
    /// at 0.
    pub bz_id: u64,
    /// True if this is the last block scanned out of `s_id` (the scanner
    /// moved on to the next s-chunk, or hit EOF, after this one).
    pub last_bz: bool,
    /// Raw Huffman-compressed payload bytes for this block (absent on
    /// sentinel jobs, which carry metadata only).
    pub payload: Option<Vec<u8>>,
    pub bs100k: BlockSizeTag,
    /// The enclosing stream's declared block size (1..9, i.e. the digit
    /// after "BZh"), used to bound-check the decoded byte count of a real
    /// block (spec §4.4: the `bzip2` crate doesn't expose a per-block
    /// declared size, so the achieved decompressed length is checked
    /// against `bs100k1 * 100_000` instead).
    pub bs100k1: u8,
    /// Stream CRC as stored in the stream's EOS marker; meaningful once
    /// known (copied onto every job of that stream for the muxer's use,
    /// and definitively present on the job that carries the EOS itself).
    pub stream_crc: Option<u32>,
    /// Byte offset, in the original input, of the position just past this
    /// block (or marker) — used only for diagnostics.
    pub end_offs: u64,
}

impl DecodeJob {
    /// Priority ordering used by the SW→W decode queue: lowest (s_id,
    /// bz_id) first.
    pub fn priority_key(&self) -> (u64, u64) {
        (self.s_id, self.bz_id)
    }

    pub fn is_sentinel(&self) -> bool {
        self.payload.is_none()
    }

    /// Overwritten once the scan pass learns whether this job was in fact
    /// the last one out of its s-chunk (the "stage one pending job, finalize
    /// once the next job's s_id is known" rule the scan pass applies
    /// uniformly to headers, blocks and EOS sentinels).
    pub fn set_last_bz(&mut self, last_bz: bool) {
        self.last_bz = last_bz;
    }

    /// The pseudo-block emitted for s_id==1 carrying only the initial
    /// stream header (spec §4.2's "special case s_id==1").
    pub fn stream_header(s_id: u64, bz_id: u64, bs100k: u8, end_offs: u64) -> Self {
        Self {
            s_id,
            bz_id,
            last_bz: false,
            payload: None,
            bs100k: BlockSizeTag::NewStream(bs100k),
            bs100k1: bs100k,
            stream_crc: None,
            end_offs,
        }
    }

    /// A real captured block, ready for the decoder driver.
    pub fn real_block(
        s_id: u64,
        bz_id: u64,
        last_bz: bool,
        payload: Vec<u8>,
        bs100k: BlockSizeTag,
        bs100k1: u8,
        end_offs: u64,
    ) -> Self {
        Self {
            s_id,
            bz_id,
            last_bz,
            payload: Some(payload),
            bs100k,
            bs100k1,
            stream_crc: None,
            end_offs,
        }
    }

    /// The end-of-stream sentinel carrying the stored stream CRC.
    pub fn eos(s_id: u64, bz_id: u64, stream_crc: u32, bs100k1: u8, end_offs: u64) -> Self {
        Self {
            s_id,
            bz_id,
            last_bz: false,
            payload: None,
            bs100k: BlockSizeTag::Eos,
            bs100k1,
            stream_crc: Some(stream_crc),
            end_offs,
        }
    }
}
