use std::path::PathBuf;
use std::time::Instant;

use clap::{ArgGroup, Parser};
use pixtar_core::error::Result;
use pixtar_core::{EncodeOptions, decode, encode, list};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Store any file as an ordinary raster image", long_about = None)]
#[command(group(ArgGroup::new("mode").required(true).args(["encode", "decode", "list"])))]
struct Cli {
    /// Encode the input file into a raster image
    #[arg(short, long)]
    encode: bool,

    /// Decode a raster image back into the original file
    #[arg(short, long)]
    decode: bool,

    /// List the entries of an encoded image without extracting
    #[arg(short, long)]
    list: bool,

    /// File to convert (the image file in decode and list modes)
    #[arg(short, long)]
    input: PathBuf,

    /// Target image on encode (default out.png), destination directory on
    /// decode (default .)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Worker count; 0 = host parallelism
    #[arg(short, long, default_value_t = 0)]
    workers: usize,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let started = Instant::now();
    if cli.encode {
        let target = cli.output.unwrap_or_else(|| PathBuf::from("out.png"));
        let opts = EncodeOptions {
            workers: cli.workers,
            ..Default::default()
        };
        let stats = encode(&cli.input, &target, Some(&opts))?;
        let image_len = std::fs::metadata(&target)?.len();
        println!("original size: {} bytes", stats.source_len);
        println!(
            "image: {} ({}x{}, {} bytes)",
            target.display(),
            stats.dim,
            stats.dim,
            image_len
        );
        println!("encoded in {:.2?}", started.elapsed());
    } else if cli.decode {
        let dest = cli.output.unwrap_or_else(|| PathBuf::from("."));
        let restored = decode(&cli.input, &dest)?;
        for p in &restored {
            println!("{}", p.display());
        }
        println!("decoded in {:.2?}", started.elapsed());
    } else {
        for h in list(&cli.input)? {
            println!("{} mode={:o} size={} mtime={}", h.name, h.mode, h.size, h.mtime);
        }
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
