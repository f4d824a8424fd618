//! Streaming `Read` adapter over the pipeline (spec §11: a
//! `std::io::Read` front end equivalent to the teacher's `Bz2Decoder`).
//!
//! Unlike the teacher's decoder, this pipeline's muxer already writes bytes
//! in final stream order (spec §4.6), so there is no per-block reordering
//! left to do here: the background thread just runs the pipeline against a
//! channel-backed `Write` sink, and `read` drains that channel.

use crate::config::PipelineConfig;
use crate::error::{tag_path, PbzipError, Result};
use crate::pipeline::run_decompress;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::thread::JoinHandle;

enum Msg {
    Chunk(Vec<u8>),
    Done(Result<()>),
}

/// A `Write` sink that forwards every write as an owned chunk over a bounded
/// channel, giving the background pipeline thread natural backpressure
/// against a slow reader. Grounded on the teacher's own `Bz2Decoder`
/// (`parallel_bzip2/src/decoder.rs`), which serves this exact concern with
/// `crossbeam_channel::bounded`.
struct ChannelWriter {
    tx: Sender<Msg>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx
            .send(Msg::Chunk(buf.to_vec()))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "reader dropped"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Parallel bzip2 decoder implementing `Read`.
///
/// Spawns the decompression pipeline on a background thread and streams its
/// output back to the caller through a bounded channel. Dropping the
/// decoder before reading to completion simply drops the sending half; the
/// background thread's next blocked channel send then errors and it winds
/// down (the pipeline's own worker/muxer threads are joined from inside
/// that thread before it exits).
pub struct Bz2Decoder {
    #[allow(dead_code)]
    data: Arc<dyn AsRef<[u8]> + Send + Sync>,
    rx: Receiver<Msg>,
    handle: Option<JoinHandle<()>>,
    buffer: Vec<u8>,
    buffer_pos: usize,
    finished: bool,
}

impl Bz2Decoder {
    /// Opens a bzip2 file via memory-mapped I/O and starts decompressing it.
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let mmap = unsafe { memmap2::MmapOptions::new().map(&file)? };
        Ok(Self::new_with_path(
            Arc::new(mmap),
            PipelineConfig::default(),
            path.to_string_lossy().into_owned(),
        ))
    }

    /// Creates a decoder over any `Send + Sync` byte source, using default
    /// pipeline settings.
    pub fn new<T>(data: Arc<T>) -> Self
    where
        T: AsRef<[u8]> + Send + Sync + 'static,
    {
        Self::new_with_path(data, PipelineConfig::default(), String::from("<memory>"))
    }

    /// Creates a decoder with an explicit [`PipelineConfig`] and a path used
    /// only to label errors.
    pub fn new_with_path<T>(data: Arc<T>, cfg: PipelineConfig, path: String) -> Self
    where
        T: AsRef<[u8]> + Send + Sync + 'static,
    {
        let data_ref: Arc<dyn AsRef<[u8]> + Send + Sync> = data;
        let data_clone = Arc::clone(&data_ref);
        // Bounded at a handful of sub-block-sized writes so a slow reader
        // applies backpressure all the way to the splitter's slot credits.
        let (tx, rx) = bounded::<Msg>(4);
        let tx_done = tx.clone();

        let handle = std::thread::spawn(move || {
            let slice = data_clone.as_ref().as_ref();
            let mut sink = ChannelWriter { tx };
            let result = run_decompress(slice, &mut sink, &cfg, &path);
            let _ = tx_done.send(Msg::Done(result));
        });

        Self {
            data: data_ref,
            rx,
            handle: Some(handle),
            buffer: Vec::new(),
            buffer_pos: 0,
            finished: false,
        }
    }
}

impl Read for Bz2Decoder {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.buffer_pos < self.buffer.len() {
            let len = buf.len().min(self.buffer.len() - self.buffer_pos);
            buf[..len].copy_from_slice(&self.buffer[self.buffer_pos..self.buffer_pos + len]);
            self.buffer_pos += len;
            return Ok(len);
        }
        if self.finished {
            return Ok(0);
        }

        loop {
            match self.rx.recv() {
                Ok(Msg::Chunk(chunk)) => {
                    if chunk.is_empty() {
                        continue;
                    }
                    self.buffer = chunk;
                    self.buffer_pos = 0;
                    return self.read(buf);
                }
                Ok(Msg::Done(result)) => {
                    self.finished = true;
                    if let Some(h) = self.handle.take() {
                        let _ = h.join();
                    }
                    if let Err(e) = result {
                        return Err(io::Error::new(io::ErrorKind::InvalidData, e.to_string()));
                    }
                    return Ok(0);
                }
                Err(_) => {
                    self.finished = true;
                    if let Some(h) = self.handle.take() {
                        let _ = h.join();
                    }
                    return Ok(0);
                }
            }
        }
    }
}

/// Convenience wrapper: decompresses an in-memory buffer into a freshly
/// allocated `Vec<u8>`, grounded on the teacher's `parallel_bzip2_cat`.
pub fn decompress_to_vec(data: &[u8]) -> Result<Vec<u8>> {
    let cfg = PipelineConfig::default();
    let mut out = Vec::new();
    run_decompress(data, &mut out, &cfg, "<memory>")?;
    Ok(out)
}

/// Decompresses a file on disk straight to a `Vec<u8>` via memory-mapped
/// I/O, tagging any pipeline error with the file's path.
pub fn decompress_file_to_vec(path: &std::path::Path) -> Result<Vec<u8>> {
    let file = std::fs::File::open(path).map_err(PbzipError::from)?;
    let mmap = unsafe { memmap2::MmapOptions::new().map(&file) }.map_err(PbzipError::from)?;
    let cfg = PipelineConfig::default();
    let mut out = Vec::new();
    run_decompress(&mmap, &mut out, &cfg, &path.to_string_lossy())
        .map_err(|e| tag_path(e, path))?;
    Ok(out)
}
