//! Main entry point for the flyzip CLI application.
//!
//! This binary streams a ZIP archive of local files, directories and HTTP
//! URLs to stdout or to a file, reading every input exactly once.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::AsyncWrite;
use tracing_subscriber::EnvFilter;

use flyzip::zip::{ArchiveStream, ErrorPolicy, SkipFailed};
use flyzip::{Cli, InputQueue};

/// Application entry point.
///
/// Parses command-line arguments, sets up logging and streams the archive.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let archive = ArchiveStream::new(InputQueue::from_cli(&cli)?);

    let size = if cli.skip_failed {
        let mut archive = archive.with_policy(SkipFailed::new());
        let size = write_archive(&mut archive, &cli).await?;

        let skipped = archive.policy().skipped();
        if !skipped.is_empty() && !cli.is_very_quiet() {
            eprintln!("Skipped {} file(s):", skipped.len());
            for name in skipped {
                eprintln!("  {}", name);
            }
        }
        size
    } else {
        let mut archive = archive;
        write_archive(&mut archive, &cli).await?
    };

    if !cli.is_quiet() {
        eprintln!("\nTotal archive size: {}", format_size(size));
    }

    Ok(())
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins over the level derived from `-v` / `-q`.
fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Stream the whole archive to the output selected on the command line.
///
/// # Returns
///
/// The archive size in bytes.
async fn write_archive<P: ErrorPolicy>(
    archive: &mut ArchiveStream<InputQueue, P>,
    cli: &Cli,
) -> Result<u64> {
    match cli.output {
        Some(ref path) => {
            let mut file = tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create {}", path))?;
            drain(archive, &mut file).await
        }
        None => drain(archive, &mut tokio::io::stdout()).await,
    }
}

async fn drain<P, W>(archive: &mut ArchiveStream<InputQueue, P>, writer: &mut W) -> Result<u64>
where
    P: ErrorPolicy,
    W: AsyncWrite + Unpin + Send,
{
    let size = archive.write_to(writer).await?;
    tracing::debug!(size, entries = archive.entries().len(), "Archive complete");
    Ok(size)
}

/// Format a byte size into a human-readable string.
///
/// Automatically selects the appropriate unit (bytes, KB, MB, GB)
/// based on the size magnitude.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
