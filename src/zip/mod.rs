//! Streaming ZIP archive creation.
//!
//! This module writes ZIP archives front to back in a single pass, with
//! file contents arriving incrementally from async sources.
//!
//! ## Architecture
//!
//! - [`codec`]: fixed-width little-endian integers, names, DOS timestamps
//! - [`counters`]: pass-through length and CRC-32 measurements
//! - [`records`]: the binary layouts of the records written
//! - [`archive`]: the orchestrator producing the archive chunk by chunk
//!
//! ## Why data descriptors
//!
//! A local file header normally carries the CRC and sizes of the data that
//! follows it. Those are unknown until the content has been produced, and the
//! output is never rewritten, so headers are written with zeroed fields and
//! general purpose flag bit 3 set. The real values follow the content in a
//! data descriptor and are repeated in the central directory, which is
//! written after all files together with the End of Central Directory
//! record.
//!
//! ## Limitations
//!
//! - STORED (no compression) method only
//! - No ZIP64: sizes and offsets are masked to 32 bits, counts to 16 bits
//! - File names are cut to 255 bytes
//! - No archive or file comments, no encryption

pub mod archive;
pub mod clock;
pub mod codec;
pub mod counters;
pub mod element;
pub mod policy;
pub mod records;

pub use archive::ArchiveStream;
pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::DosDateTime;
pub use counters::{CounterChain, Counted, Crc32Counter, LengthCounter, StreamCounter};
pub use element::{ArchiveElement, ElementSource, ElementStream};
pub use policy::{AbortOnError, ErrorPolicy, SkipFailed};
pub use records::{
    CentralDirectoryEntry, DataDescriptor, EndOfCentralDirectory, FileMetadata, LocalFileHeader,
    Record,
};
