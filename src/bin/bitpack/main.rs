//! Command-line front end: compress text integer files, decompress them, and read
//! single elements straight from the packed binary.

mod logging;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bitpack::{format, text, Mode, Packed};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "bitpack")]
#[command(about = "Bit-pack integer arrays with random access", version)]
struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "BITPACK_LOG", default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compress a text file of integers into a binary file
    Compress {
        /// Input text file (whitespace, comma or semicolon separated)
        #[arg(short, long)]
        input: PathBuf,

        /// Output binary file
        #[arg(short, long)]
        output: PathBuf,

        /// Packing strategy
        #[arg(short, long, value_enum, default_value_t = ModeArg::Crossing)]
        mode: ModeArg,
    },

    /// Decompress a binary file into one line of integers
    Decompress {
        /// Input binary file
        #[arg(short, long)]
        input: PathBuf,

        /// Output text file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the integer at an index without decompressing the whole array
    Get {
        /// Input binary file
        #[arg(short, long)]
        input: PathBuf,

        /// Zero-based index
        #[arg(short = 'n', long)]
        index: usize,
    },

    /// Compare size, gain, timings and latency threshold of every strategy
    Stats {
        /// Input text file
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Crossing,
    NonCrossing,
    Overflow,
}

impl From<ModeArg> for Mode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Crossing => Mode::Crossing,
            ModeArg::NonCrossing => Mode::NonCrossing,
            ModeArg::Overflow => Mode::Overflow,
        }
    }
}

fn read_ints(path: &Path) -> Result<Vec<u64>> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let input = String::from_utf8_lossy(&raw);
    text::parse_ints(&input).with_context(|| format!("failed to parse {}", path.display()))
}

fn load(path: &Path) -> Result<Packed> {
    format::load_packed(path).with_context(|| format!("failed to load {}", path.display()))
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Compress {
            input,
            output,
            mode,
        } => {
            let values = read_ints(&input)?;
            let packed = Packed::from_values(mode.into(), &values)?;
            let blob = packed.to_bytes()?;
            fs::write(&output, &blob)
                .with_context(|| format!("failed to write {}", output.display()))?;
            tracing::info!(
                mode = %packed.mode(),
                n = packed.len(),
                bits = packed.size_in_bits(),
                bytes = blob.len(),
                "compressed"
            );
            println!(
                "OK: {} integers -> {} binary ({} bytes)",
                packed.len(),
                packed.mode(),
                blob.len()
            );
        }
        Command::Decompress { input, output } => {
            let packed = load(&input)?;
            let values = packed.to_list();
            fs::write(&output, text::format_ints(&values))
                .with_context(|| format!("failed to write {}", output.display()))?;
            tracing::info!(mode = %packed.mode(), n = values.len(), "decompressed");
            println!(
                "OK: decompressed {} integers ({})",
                values.len(),
                packed.mode()
            );
        }
        Command::Get { input, index } => {
            let packed = load(&input)?;
            tracing::debug!(mode = %packed.mode(), n = packed.len(), index, "random access");
            println!("{}", packed.get(index)?);
        }
        Command::Stats { input } => {
            let values = read_ints(&input)?;
            let raw_bits = values.len() * RAW_BITS_PER_INT;
            println!("n = {}  raw = {raw_bits} bits", values.len());
            for mode in Mode::ALL {
                let started = Instant::now();
                let packed = Packed::from_values(mode, &values)?;
                let t_comp = started.elapsed();

                let started = Instant::now();
                let decoded = packed.to_list();
                let t_decomp = started.elapsed();
                debug_assert_eq!(decoded.len(), values.len());

                let comp_bits = packed.size_in_bits();
                let bytes = packed.to_bytes()?.len();
                tracing::debug!(%mode, comp_bits, ?t_comp, ?t_decomp, "measured");
                println!(
                    "{:<13} {:<28} bits={:<10} file={:<10} gain={:.2}% comp={:.4}ms decomp={:.4}ms threshold={}",
                    mode.as_str(),
                    describe(&packed),
                    comp_bits,
                    bytes,
                    gain_percent(raw_bits, comp_bits),
                    as_ms(t_comp),
                    as_ms(t_decomp),
                    latency_threshold(t_comp + t_decomp, raw_bits, comp_bits)
                        .map_or_else(|| "none".to_string(), |t| format!("{t:.8}ms/bit")),
                );
            }
        }
    }
    Ok(())
}

/// Width of the uncompressed reference representation.
const RAW_BITS_PER_INT: usize = 32;

fn as_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn gain_percent(raw_bits: usize, comp_bits: usize) -> f64 {
    if raw_bits == 0 {
        return 0.0;
    }
    100.0 * (1.0 - comp_bits as f64 / raw_bits as f64)
}

/// Per-bit transmission latency above which compressing before sending pays off:
/// `(t_comp + t_decomp) / (raw_bits - comp_bits)`, in milliseconds per bit.
///
/// `None` when compression saves nothing.
fn latency_threshold(cost: Duration, raw_bits: usize, comp_bits: usize) -> Option<f64> {
    let saved = raw_bits.checked_sub(comp_bits).filter(|&b| b > 0)?;
    Some(as_ms(cost) / saved as f64)
}

fn describe(packed: &Packed) -> String {
    match packed {
        Packed::Crossing(p) => format!("k={}", p.width()),
        Packed::NonCrossing(p) => format!("k={}", p.width()),
        Packed::Overflow(p) => format!(
            "k'={} slot={} overflow={}x{}",
            p.kprime(),
            p.slot_width(),
            p.overflow_len(),
            p.overflow_width()
        ),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::setup_logging(&cli.log_level);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
