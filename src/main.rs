use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use pread_xz::{ExtractOptions, Extractor};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "pread",
    version,
    about = "Extract members of an indexed tar.xz (pixz) archive in parallel"
)]
struct Args {
    /// Archive to read (.tpxz or .xz); must be seekable.
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,
    /// Write here instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
    /// Write whole decoded blocks without checking the tar structure.
    #[arg(short = 'v', long = "no-verify")]
    no_verify: bool,
    /// Decoder threads (default: available cores).
    #[arg(short = 'p', long, value_name = "N")]
    threads: Option<usize>,
    /// Members or directories to extract; all when omitted.
    #[arg(value_name = "PATHS")]
    paths: Vec<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pread: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let mut options = ExtractOptions {
        specs: args.paths,
        verify: !args.no_verify,
        ..ExtractOptions::default()
    };
    if let Some(threads) = args.threads {
        options.threads = threads.max(1);
    }

    let extractor = Extractor::open(&args.input)
        .with_context(|| format!("failed to open {}", args.input.display()))?;

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    extractor.run(&options, &mut out, |name| eprintln!("{name}"))?;
    Ok(())
}
