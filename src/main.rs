use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};

use metascrub::scrub_file;

#[derive(Parser)]
#[command(name = "metascrub")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Remove metadata from JPEG and PNG files", long_about = None)]
struct Cli {
    /// File to remove metadata from
    input: PathBuf,

    /// Location to write the scrubbed contents
    output: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print a JSON report of kept and removed segments
    #[arg(long)]
    stats: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    info!("Removing metadata from {}", cli.input.display());

    let report = scrub_file(&cli.input, &cli.output).with_context(|| {
        format!(
            "Failed to scrub {} into {}",
            cli.input.display(),
            cli.output.display()
        )
    })?;

    info!("Wrote {} bytes to {}", report.bytes_written, cli.output.display());

    if cli.stats {
        let json = serde_json::to_string_pretty(&report).context("Failed to encode report")?;
        println!("{json}");
    }

    Ok(())
}
