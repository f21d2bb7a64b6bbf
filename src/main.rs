use binobject::{CodecOptions, Endianness, ObjectReader, PrimitiveType, TextEncoding};
use clap::{Args, Parser, Subcommand};
use std::io::Cursor;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "binobj", about = "Inspect binary files with the binobject codec")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Source {
    input: PathBuf,
    /// Start offset, decimal or 0x-prefixed hex
    #[arg(short, long, default_value = "0", value_parser = parse_addr)]
    at: u64,
    /// Decode big-endian (overrides --config)
    #[arg(short = 'B', long)]
    big_endian: bool,
    /// Text encoding: utf8 (default), latin1, ascii
    #[arg(short, long)]
    encoding: Option<String>,
    /// JSON codec options file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode consecutive primitives
    Peek {
        #[command(flatten)]
        source: Source,
        /// Primitive type: u8 i8 bool i16 u16 i32 u32 i64 u64 f32 f64
        #[arg(short = 't', long = "type")]
        ty: String,
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },
    /// Decode a null-terminated or fixed-length string
    #[command(name = "string")]
    Str {
        #[command(flatten)]
        source: Source,
        /// Read exactly this many bytes instead of up to a terminator
        #[arg(long)]
        fixed: Option<usize>,
    },
    /// Decode a compressed 32-bit integer
    Cuint {
        #[command(flatten)]
        source: Source,
        #[arg(long)]
        signed: bool,
    },
    /// Hex dump raw bytes in stream order
    Dump {
        #[command(flatten)]
        source: Source,
        #[arg(short, long, default_value = "256")]
        len: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {

        // ── Peek ─────────────────────────────────────────────────────────────
        Commands::Peek { source, ty, count } => {
            let ty = PrimitiveType::parse(&ty)?;
            let (reader, _) = open(&source)?;
            let mut lock = reader.lock();
            let mut dec = lock.decoder();
            dec.seek(source.at)?;
            for i in 0..count {
                let offset = source.at + (i * ty.size()) as u64;
                let value = dec.read_value(ty)?;
                println!("{offset:#010x}  {:<4}  {value}", ty.name());
            }
        }

        // ── String ───────────────────────────────────────────────────────────
        Commands::Str { source, fixed } => {
            let (reader, _) = open(&source)?;
            let text = match fixed {
                Some(len) => reader.read_fixed_length_string_at(source.at, len)?,
                None      => reader.read_null_terminated_string_at(source.at)?,
            };
            println!("{text:?}");
        }

        // ── Compressed integer ───────────────────────────────────────────────
        Commands::Cuint { source, signed } => {
            let (reader, _) = open(&source)?;
            if signed {
                let (value, used) = reader.read_compressed_i32_at(source.at)?;
                println!("{value}  ({used} byte(s))");
            } else {
                let (value, used) = reader.read_compressed_u32_at(source.at)?;
                println!("{value}  ({used} byte(s))");
            }
        }

        // ── Dump ─────────────────────────────────────────────────────────────
        Commands::Dump { source, len } => {
            let (reader, total) = open(&source)?;
            let len = len.min(total.saturating_sub(source.at) as usize);
            let bytes = {
                let mut lock = reader.lock();
                let mut dec = lock.decoder();
                dec.seek(source.at)?;
                dec.read_raw(len)?
            };
            for (i, chunk) in bytes.chunks(16).enumerate() {
                let ascii: String = chunk
                    .iter()
                    .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
                    .collect();
                println!("{:08x}  {:<32}  {}", source.at + (i * 16) as u64, hex::encode(chunk), ascii);
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

/// Load the whole input and build a reader configured from flags and the
/// optional JSON options file.  Returns the reader and the input length.
fn open(source: &Source) -> Result<(ObjectReader<Cursor<Vec<u8>>>, u64), Box<dyn std::error::Error>> {
    let mut options = match &source.config {
        Some(path) => CodecOptions::from_bytes(&std::fs::read(path)?)?,
        None       => CodecOptions::default(),
    };
    if source.big_endian {
        options.endianness = Endianness::Big;
    }
    if let Some(name) = &source.encoding {
        options.encoding = TextEncoding::from_name(name)
            .ok_or_else(|| format!("Unknown encoding '{name}'"))?;
    }
    let data = std::fs::read(&source.input)?;
    let total = data.len() as u64;
    Ok((ObjectReader::with_options(Cursor::new(data), options), total))
}

fn parse_addr(s: &str) -> Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None      => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address '{s}': {e}"))
}
