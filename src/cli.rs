use clap::{ArgAction, Parser};
use time::OffsetDateTime;

use crate::io::DEFAULT_CHUNK_SIZE;

#[derive(Parser, Debug)]
#[command(name = "flyzip")]
#[command(version)]
#[command(about = "Stream a ZIP archive of local files and HTTP URLs", long_about = None)]
#[command(after_help = "Examples:\n  \
  flyzip -o logs.zip logs/ -x '*.tmp'     archive a directory, skipping temp files\n  \
  flyzip notes.txt https://example.com/data.csv | ssh host 'cat > bundle.zip'\n  \
  flyzip --mtime 1700000000 -j build/out.bin > out.zip    reproducible archive, flat names")]
pub struct Cli {
    /// Files, directories or HTTP URLs to archive
    #[arg(value_name = "INPUTS", required = true)]
    pub inputs: Vec<String>,

    /// Write the archive to FILE instead of stdout
    #[arg(short = 'o', value_name = "FILE")]
    pub output: Option<String>,

    /// Exclude files matching PATTERN (repeatable)
    #[arg(short = 'x', value_name = "PATTERN", num_args = 1, action = ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Junk paths (store file names only)
    #[arg(short = 'j')]
    pub junk_paths: bool,

    /// Modification time of every entry, in seconds since the Unix epoch
    /// (1980 to 2107, the range of DOS timestamps)
    #[arg(long, value_name = "SECONDS", value_parser = parse_mtime)]
    pub mtime: Option<i64>,

    /// Read size for local files
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Leave out inputs that cannot be read instead of aborting
    #[arg(long)]
    pub skip_failed: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = ArgAction::Count)]
    pub quiet: u8,

    /// Verbose logging (-vv => trace)
    #[arg(short = 'v', action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn is_http_url(input: &str) -> bool {
        input.starts_with("http://") || input.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// Default log filter when `RUST_LOG` is unset
    pub fn log_filter(&self) -> &'static str {
        if self.is_very_quiet() {
            return "off";
        }
        match self.verbose {
            0 if self.is_quiet() => "error",
            0 => "warn",
            1 => "flyzip=debug",
            _ => "flyzip=trace",
        }
    }
}

/// Accept only instants a DOS timestamp can hold
fn parse_mtime(value: &str) -> Result<i64, String> {
    let seconds: i64 = value.parse().map_err(|e| format!("{e}"))?;
    let date = OffsetDateTime::from_unix_timestamp(seconds).map_err(|e| format!("{e}"))?;
    if !(1980..=2107).contains(&date.year()) {
        return Err(format!(
            "{} is in {}, outside the 1980-2107 range of ZIP timestamps",
            seconds,
            date.year()
        ));
    }
    Ok(seconds)
}
