//! spoolbuf CLI: spool a file or stdin, then read byte ranges from it.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use spoolbuf_core::{Context, SpoolConfig, SpoolProvider};
use spoolbuf_io::BufferedFileReader;
use spoolbuf_mem::BufferPool;

#[derive(Parser)]
#[command(name = "spoolbuf")]
#[command(
    about = "Spool a stream to memory or disk and read it back at random offsets",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct SpoolArgs {
    /// Input file (defaults to stdin)
    input: Option<PathBuf>,

    /// In-memory threshold in bytes before spilling (overrides config)
    #[arg(long)]
    threshold: Option<usize>,

    /// Memory cap in bytes for pooled buffers (overrides config)
    #[arg(long)]
    memory_cap: Option<usize>,

    /// Spill directory (overrides config)
    #[arg(long)]
    spill_dir: Option<String>,

    /// Give up if spooling the input takes longer than this (ms)
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a byte range of the input to stdout
    Read {
        #[command(flatten)]
        spool: SpoolArgs,

        /// Absolute offset to start reading at
        #[arg(long, default_value_t = 0)]
        offset: u64,

        /// Number of bytes to read (defaults to the rest of the input)
        #[arg(long)]
        len: Option<u64>,
    },

    /// Print the spooled length and whether the input spilled to disk
    Stat {
        #[command(flatten)]
        spool: SpoolArgs,
    },
}

fn main() {
    let cli = Cli::parse();

    let res = match cli.command {
        Commands::Read { spool, offset, len } => read_range(&spool, offset, len),
        Commands::Stat { spool } => stat(&spool),
    };

    if let Err(e) = res {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn read_range(
    args: &SpoolArgs,
    offset: u64,
    len: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = open(args)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    copy_range(&mut reader, offset, len, &mut out)?;
    out.flush()?;
    reader.close()?;
    Ok(())
}

fn stat(args: &SpoolArgs) -> Result<(), Box<dyn std::error::Error>> {
    let reader = open(args)?;
    println!("length:  {} bytes", reader.len());
    println!("spilled: {}", if reader.is_spilled() { "yes" } else { "no" });
    reader.close()?;
    Ok(())
}

fn open(args: &SpoolArgs) -> Result<BufferedFileReader, Box<dyn std::error::Error>> {
    let cfg = build_config(SpoolConfig::from_env(), args);
    let pool = BufferPool::from_config(&cfg);

    let mut ctx = Context::background();
    if let Some(ms) = args.timeout_ms {
        ctx = ctx.with_timeout(Duration::from_millis(ms));
    }

    let source: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(File::open(path)?),
        None => Box::new(io::stdin().lock()),
    };
    Ok(BufferedFileReader::with_config(&ctx, source, pool, cfg)?)
}

fn build_config(mut cfg: SpoolConfig, args: &SpoolArgs) -> SpoolConfig {
    if let Some(threshold) = args.threshold {
        cfg.threshold_bytes = threshold;
    }
    if let Some(cap) = args.memory_cap {
        cfg.mem_cap_bytes = cap;
    }
    if let Some(dir) = &args.spill_dir {
        cfg.spill_dir = Some(dir.clone());
    }
    cfg
}

/// Copy `len` bytes (or everything) from `offset` into `out`, looping over the
/// reader's single-shot positional reads.
fn copy_range<P: SpoolProvider>(
    reader: &mut BufferedFileReader<P>,
    offset: u64,
    len: Option<u64>,
    out: &mut impl Write,
) -> io::Result<u64> {
    let mut buf = vec![0u8; 64 * 1024];
    let mut pos = offset;
    let mut written = 0u64;
    loop {
        let want = match len {
            Some(total) => (total - written).min(buf.len() as u64) as usize,
            None => buf.len(),
        };
        if want == 0 {
            break;
        }
        let n = reader.read_at(&mut buf[..want], pos)?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])?;
        pos += n as u64;
        written += n as u64;
    }
    Ok(written)
}
