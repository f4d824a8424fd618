//! Decode driver (spec §4.4): turns one [`DecodeJob`] into one or more
//! [`SubBlock`]s.
//!
//! The external decoder contract (spec §6.1) treats Huffman/BWT/MTF/RLE as
//! an opaque `{init, retrieve, work, emit, destroy}` state machine. This
//! crate does not reimplement that machine; it wraps the `bzip2` crate the
//! same way the teacher's `decompress_block_into` does (`parallel_bzip2/src/
//! lib.rs`): prepend a one-block-stream header to the captured payload and
//! let `BzDecoder` do the Huffman/BWT/MTF/RLE work, tolerating the
//! `UnexpectedEof` that naturally follows feeding it a stream with no EOS
//! trailer. Because that path does not hand back a block CRC of its own,
//! this driver computes it itself from the expanded bytes (`crate::crc`).

use crate::crc::crc32_bzip2;
use crate::error::{PbzipError, Result};
use crate::job::{BlockSizeTag, DecodeJob};
use crate::subblock::{StreamEdge, SubBlock};
use bzip2::read::BzDecoder;
use std::io::Read;

/// Executes one decode job, returning its sub-blocks in emission order.
pub fn execute_decode_job(job: DecodeJob, sub_block_bytes: usize, path: &str) -> Result<Vec<SubBlock>> {
    if job.is_sentinel() {
        return Ok(vec![sentinel_sub_block(&job)]);
    }

    let payload = job.payload.as_deref().expect("non-sentinel job carries a payload");
    let mut scratch = Vec::with_capacity(payload.len() + 4);
    scratch.extend_from_slice(b"BZh");
    scratch.push(b'0' + job.bs100k1);
    scratch.extend_from_slice(payload);

    let mut decompressed = Vec::new();
    let mut decoder = BzDecoder::new(&scratch[..]);
    match decoder.read_to_end(&mut decompressed) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {}
        Err(e) => {
            return Err(PbzipError::DecoderError {
                detail: e.to_string(),
                path: path.to_string(),
            })
        }
    }

    let declared_bound = job.bs100k1 as usize * 100_000;
    if decompressed.len() > declared_bound {
        return Err(PbzipError::BlockSizeExceeded { path: path.to_string() });
    }

    let block_crc = crc32_bzip2(&decompressed);
    Ok(split_sub_blocks(&job, &decompressed, block_crc, sub_block_bytes))
}

fn sentinel_sub_block(job: &DecodeJob) -> SubBlock {
    let edge = match job.bs100k {
        BlockSizeTag::NewStream(n) => StreamEdge::NewStream(n),
        BlockSizeTag::Eos => StreamEdge::Eos,
        BlockSizeTag::Unchanged => StreamEdge::None,
    };
    SubBlock {
        s_id: job.s_id,
        bz_id: job.bz_id,
        last_bz: job.last_bz,
        sub_id: 0,
        last_sub: true,
        bytes: Vec::new(),
        block_crc: None,
        edge,
        stream_crc: job.stream_crc,
        end_offs: job.end_offs,
    }
}

fn split_sub_blocks(job: &DecodeJob, data: &[u8], block_crc: u32, sub_block_bytes: usize) -> Vec<SubBlock> {
    if data.is_empty() {
        return vec![SubBlock {
            s_id: job.s_id,
            bz_id: job.bz_id,
            last_bz: job.last_bz,
            sub_id: 0,
            last_sub: true,
            bytes: Vec::new(),
            block_crc: Some(block_crc),
            edge: StreamEdge::None,
            stream_crc: None,
            end_offs: job.end_offs,
        }];
    }

    let chunks: Vec<&[u8]> = data.chunks(sub_block_bytes.max(1)).collect();
    let last_idx = chunks.len() - 1;
    chunks
        .into_iter()
        .enumerate()
        .map(|(sub_id, bytes)| {
            let last_sub = sub_id == last_idx;
            SubBlock {
                s_id: job.s_id,
                bz_id: job.bz_id,
                last_bz: job.last_bz,
                sub_id: sub_id as u64,
                last_sub,
                bytes: bytes.to_vec(),
                block_crc: if last_sub { Some(block_crc) } else { None },
                edge: StreamEdge::None,
                stream_crc: None,
                end_offs: job.end_offs,
            }
        })
        .collect()
}
