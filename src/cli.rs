//! CLI interface for Lanewise
//!
//! Provides command-line inspection of:
//! - Chunked ranges (`range`)
//! - Stream compaction of an index sequence (`compress`)
//! - The chunk layout of a dynamic container (`chunks`)

use crate::dynamic::{DynamicArray, DynamicPacket};
use crate::logging::init_logging;
use crate::mask::Mask;
use crate::packet::Packet;
use crate::range::range;
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

/// Lane widths the binary is compiled for.
pub const SUPPORTED_WIDTHS: [usize; 7] = [1, 2, 4, 8, 16, 32, 64];

#[derive(Parser)]
#[command(name = "lanewise")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect packet-parallel ranges, compaction and chunk layouts")]
#[command(
    long_about = "Lanewise - packet-parallel memory access primitives\n\n\
    Lanewise processes data N lanes at a time: index packets drive gather, scatter,\n\
    transform and prefetch, masks select active lanes, and runtime-length containers\n\
    are split into fixed-width chunks whose last chunk is masked.\n\n\
    This tool prints what those building blocks produce for a given lane width.\n\n\
    Examples:\n\
      lanewise range --start 5 --end 15 --width 4\n\
      lanewise compress --count 10 --threshold 3 --width 8 --json\n\
      lanewise chunks --len 10 --width 4 -v"
)]
#[command(author = "Lanewise Contributors")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output (debug logging with the `logging` feature)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the (index, mask) chunks covering [start, end)
    #[command(
        long_about = "Print the (index, mask) chunks covering [start, end)\n\n\
        Every integer of the interval appears in exactly one active lane. The last\n\
        chunk is padded with inactive lanes when the span is not a multiple of the width.\n\n\
        Example:\n\
          lanewise range --start 5 --end 15 --width 4"
    )]
    Range {
        /// First index of the interval
        #[arg(short, long, value_name = "INDEX")]
        start: u32,

        /// One past the last index of the interval
        #[arg(short, long, value_name = "INDEX")]
        end: u32,

        /// Lanes per chunk (1, 2, 4, 8, 16, 32 or 64)
        #[arg(short, long, default_value_t = 4, value_name = "LANES")]
        width: usize,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Compact the lanes of 0..count that are >= threshold
    #[command(
        long_about = "Compact the lanes of 0..count that are >= threshold\n\n\
        Builds a dynamic index sequence of length COUNT, masks the lanes whose value is\n\
        at least THRESHOLD and compresses them chunk by chunk into one contiguous buffer.\n\n\
        Example:\n\
          lanewise compress --count 10 --threshold 3 --width 8"
    )]
    Compress {
        /// Number of elements in the index sequence
        #[arg(short, long, value_name = "N")]
        count: u32,

        /// Smallest value that is kept
        #[arg(short, long, value_name = "VALUE")]
        threshold: u32,

        /// Lanes per chunk (1, 2, 4, 8, 16, 32 or 64)
        #[arg(short, long, default_value_t = 4, value_name = "LANES")]
        width: usize,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the chunk layout of a dynamic container of length len
    #[command(
        long_about = "Print the chunk layout of a dynamic container of length len\n\n\
        A container of LEN elements holds ceil(LEN / WIDTH) chunks; lanes past LEN in the\n\
        final chunk are inactive and never observable.\n\n\
        Example:\n\
          lanewise chunks --len 10 --width 4"
    )]
    Chunks {
        /// Logical length of the container
        #[arg(short, long, value_name = "N")]
        len: u32,

        /// Lanes per chunk (1, 2, 4, 8, 16, 32 or 64)
        #[arg(short, long, default_value_t = 4, value_name = "LANES")]
        width: usize,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

/// One `(index, mask)` chunk as printed by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkReport {
    pub index: Vec<u64>,
    pub mask: Vec<bool>,
}

impl ChunkReport {
    fn new<const N: usize>(index: &Packet<u32, N>, mask: Mask<N>) -> Self {
        Self {
            index: index.iter().map(u64::from).collect(),
            mask: mask.to_array().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeReport {
    pub start: u32,
    pub end: u32,
    pub width: usize,
    pub chunks: Vec<ChunkReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressReport {
    pub count: u32,
    pub threshold: u32,
    pub width: usize,
    pub kept: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunksReport {
    pub len: u32,
    pub width: usize,
    pub chunk_count: usize,
    pub chunks: Vec<ChunkReport>,
}

macro_rules! dispatch_width {
    ($width:expr, $run:ident ( $($arg:expr),* )) => {
        match $width {
            1 => Ok($run::<1>($($arg),*)),
            2 => Ok($run::<2>($($arg),*)),
            4 => Ok($run::<4>($($arg),*)),
            8 => Ok($run::<8>($($arg),*)),
            16 => Ok($run::<16>($($arg),*)),
            32 => Ok($run::<32>($($arg),*)),
            64 => Ok($run::<64>($($arg),*)),
            other => bail!("unsupported lane width {other} (expected one of {SUPPORTED_WIDTHS:?})"),
        }
    };
}

/// Chunks of `[start, end)` at a runtime-selected width.
pub fn range_report(start: u32, end: u32, width: usize) -> Result<RangeReport> {
    dispatch_width!(width, range_report_n(start, end))
}

fn range_report_n<const N: usize>(start: u32, end: u32) -> RangeReport {
    let chunks = range::<u32, N>(start, end)
        .map(|(index, mask)| ChunkReport::new(&index, mask))
        .collect();
    RangeReport {
        start,
        end,
        width: N,
        chunks,
    }
}

/// Lanes of `0..count` that are `>= threshold`, compacted in order.
pub fn compress_report(count: u32, threshold: u32, width: usize) -> Result<CompressReport> {
    dispatch_width!(width, compress_report_n(count, threshold))
}

fn compress_report_n<const N: usize>(count: u32, threshold: u32) -> CompressReport {
    let values = DynamicPacket::<u32, N>::index_sequence(count as usize);
    let keep = values.simd_ge(threshold);
    let mut out = vec![0u32; keep.count()];
    let rest = values.compress(&mut out, &keep).len();
    out.truncate(out.len() - rest);
    CompressReport {
        count,
        threshold,
        width: N,
        kept: out,
    }
}

/// Chunk layout of a dynamic container of `len` elements.
pub fn chunks_report(len: u32, width: usize) -> Result<ChunksReport> {
    dispatch_width!(width, chunks_report_n(len))
}

fn chunks_report_n<const N: usize>(len: u32) -> ChunksReport {
    let array: DynamicArray<Packet<u32, N>, N> = DynamicPacket::index_sequence(len as usize);
    let chunks = array
        .iter_chunks()
        .map(|(chunk, mask)| ChunkReport::new(chunk, mask))
        .collect();
    ChunksReport {
        len,
        width: N,
        chunk_count: array.chunk_count(),
        chunks,
    }
}

fn format_lanes<T: std::fmt::Display>(lanes: impl IntoIterator<Item = T>) -> String {
    let parts: Vec<String> = lanes.into_iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(" "))
}

fn print_chunks(chunks: &[ChunkReport]) {
    for (k, chunk) in chunks.iter().enumerate() {
        println!(
            "chunk {k}: index {} mask {}",
            format_lanes(chunk.index.iter()),
            format_lanes(chunk.mask.iter().map(|&m| u8::from(m)))
        );
    }
}

fn print_json<T: Serialize>(report: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn banner(title: &str) {
    let line = format!("Lanewise v{} - {}", env!("CARGO_PKG_VERSION"), title);
    println!("{line}");
    println!("{}", "=".repeat(line.len()));
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(if cli.verbose { "debug" } else { "warn" });

    match cli.command {
        Commands::Range {
            start,
            end,
            width,
            json,
        } => {
            let report = range_report(start, end, width)?;
            if json {
                return print_json(&report);
            }
            if cli.verbose {
                banner("Chunked Range");
                println!("  Interval: [{start}, {end})");
                println!("  Width: {width}");
                println!("  Chunks: {}\n", report.chunks.len());
            }
            print_chunks(&report.chunks);
            Ok(())
        }

        Commands::Compress {
            count,
            threshold,
            width,
            json,
        } => {
            let report = compress_report(count, threshold, width)?;
            if json {
                return print_json(&report);
            }
            if cli.verbose {
                banner("Compress");
                println!("  Sequence: 0..{count}");
                println!("  Threshold: {threshold}");
                println!("  Width: {width}\n");
            }
            println!("kept {}: {}", report.kept.len(), format_lanes(report.kept.iter()));
            Ok(())
        }

        Commands::Chunks { len, width, json } => {
            let report = chunks_report(len, width)?;
            if json {
                return print_json(&report);
            }
            if cli.verbose {
                banner("Dynamic Chunk Layout");
                println!("  Length: {len}");
                println!("  Width: {width}\n");
            }
            println!("{} chunks for {} elements", report.chunk_count, report.len);
            print_chunks(&report.chunks);
            Ok(())
        }
    }
}
