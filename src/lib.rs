//! # flyzip
//!
//! Stream ZIP archives on the fly from async byte sources.
//!
//! Each file's content is pulled chunk by chunk, passed through unchanged and
//! measured on the way, so no file is ever held in memory and the output is
//! never seeked. The archive itself comes out as a sequence of chunks that
//! can be written to a pipe, a socket or an HTTP response body.
//!
//! ## Features
//!
//! - Archive any async source of byte chunks: memory, local files, HTTP
//!   downloads or any `futures::Stream`
//! - Output as a pull-based chunk source, a `futures::Stream` or written
//!   straight into a tokio `AsyncWrite`
//! - Pluggable error policy and clock for reproducible archives
//! - Output readable by standard ZIP tools (STORED method, data descriptors)
//!
//! ## Example
//!
//! ```no_run
//! use flyzip::{ArchiveElement, ArchiveStream, FileSource, HttpSource};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let remote = HttpSource::new("https://example.com/data.csv".to_string())?;
//!     let elements = vec![
//!         ArchiveElement::new("data.csv", remote),
//!         ArchiveElement::new("docs/README.md", FileSource::new("README.md")),
//!     ];
//!
//!     let mut output = tokio::fs::File::create("bundle.zip").await?;
//!     let size = ArchiveStream::new(elements.into_iter())
//!         .write_to(&mut output)
//!         .await?;
//!     println!("wrote {} bytes", size);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod inputs;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use inputs::InputQueue;
pub use io::{ChunkSource, FileSource, HttpSource, MemorySource, StreamSource};
pub use zip::{ArchiveElement, ArchiveStream, ElementSource, ErrorPolicy, SkipFailed};
