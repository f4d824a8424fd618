//! Fatal error taxonomy for the decompression pipeline.
//!
//! Every error here is terminal: the pipeline never attempts partial
//! recovery from a data error (spec §7). Variants map directly onto the
//! taxonomy in the specification's error handling section.

use std::path::PathBuf;

/// Errors produced by the pipeline. All are fatal; there is no retry path.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PbzipError {
    /// A full-sized input chunk contained no block header at all.
    #[error("missing bzip2 block header in full input chunk (file: {path})")]
    MissingBlockHeader { path: String },

    /// A bzip2 block did not terminate within the two-chunk retrieval window.
    #[error("unterminated bzip2 block spanning more than two input chunks (file: {path})")]
    UnterminatedBlock { path: String },

    /// The external block decoder reported a data error.
    #[error("bzip2 decoder data error: {detail} (file: {path})")]
    DecoderError { detail: String, path: String },

    /// The stored stream CRC did not match the accumulated per-block CRCs.
    #[error("bzip2 stream CRC mismatch (file: {path})")]
    StreamCrcMismatch { path: String },

    /// A stream's actual block size exceeded its declared bs100k.
    #[error("bzip2 block size exceeds stream's declared block-size (file: {path})")]
    BlockSizeExceeded { path: String },

    /// The input contained no real bzip2 stream (only EOS markers, or no
    /// magic at all).
    #[error("not a valid bzip2 file: {path}")]
    NotABzip2File { path: String },

    /// I/O failure at an edge adapter (file open/read/write).
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for PbzipError {
    fn from(err: std::io::Error) -> Self {
        PbzipError::Io(err.to_string())
    }
}

impl PbzipError {
    pub fn with_path(mut self, new_path: impl Into<String>) -> Self {
        let p = new_path.into();
        match &mut self {
            PbzipError::MissingBlockHeader { path }
            | PbzipError::UnterminatedBlock { path }
            | PbzipError::DecoderError { path, .. }
            | PbzipError::StreamCrcMismatch { path }
            | PbzipError::BlockSizeExceeded { path }
            | PbzipError::NotABzip2File { path } => *path = p,
            PbzipError::Io(_) => {}
        }
        self
    }
}

/// Helper for adapters that only know the path after the pipeline error
/// surfaces (the pipeline itself runs over an anonymous byte source).
pub fn tag_path(err: PbzipError, path: &std::path::Path) -> PbzipError {
    err.with_path(path_display(path))
}

fn path_display(path: &std::path::Path) -> String {
    path.to_string_lossy().into_owned()
}

pub type Result<T> = std::result::Result<T, PbzipError>;

/// Small helper used by callers that only have an owned `PathBuf` at hand.
pub fn path_string(path: &PathBuf) -> String {
    path.to_string_lossy().into_owned()
}
