use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use memmap2::MmapOptions;
use pbzip2::PipelineConfig;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Parallel bzip2 decompressor", long_about = None)]
struct Args {
    /// Input bzip2 file
    input: PathBuf,

    /// Output file (defaults to stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of worker threads (defaults to available parallelism)
    #[arg(short = 'p', long)]
    workers: Option<usize>,

    /// Number of s-chunk slots held in flight (defaults to 2x worker count)
    #[arg(long)]
    slots: Option<usize>,
}

/// Wraps a `Write` sink, advancing an indicatif progress bar by the number
/// of bytes actually written.
struct ProgressWriter<W> {
    inner: W,
    bar: ProgressBar,
}

impl<W: Write> Write for ProgressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.bar.inc(n as u64);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let file = File::open(&args.input).context("failed to open input file")?;
    let mmap = unsafe {
        MmapOptions::new()
            .map(&file)
            .context("failed to mmap input file")?
    };

    let mut cfg = PipelineConfig::default();
    if let Some(workers) = args.workers {
        cfg = cfg.with_workers(workers);
    }
    if let Some(slots) = args.slots {
        cfg = cfg.with_slots(slots);
    }

    let bar = ProgressBar::new(mmap.len() as u64);
    bar.set_draw_target(ProgressDrawTarget::stderr());
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})",
        )
        .unwrap()
        .progress_chars("#>-"),
    );

    let path_label = args.input.to_string_lossy().into_owned();
    let result = match &args.output {
        Some(out_path) => {
            let out_file = File::create(out_path).context("failed to create output file")?;
            let mut writer = ProgressWriter {
                inner: out_file,
                bar: bar.clone(),
            };
            pbzip2::pipeline::run_decompress(&mmap, &mut writer, &cfg, &path_label)
        }
        None => {
            let stdout = io::stdout();
            let mut writer = ProgressWriter {
                inner: stdout.lock(),
                bar: bar.clone(),
            };
            pbzip2::pipeline::run_decompress(&mmap, &mut writer, &cfg, &path_label)
        }
    };

    bar.finish_and_clear();
    result.with_context(|| format!("failed to decompress {}", args.input.display()))?;
    Ok(())
}
