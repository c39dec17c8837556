//! Binary layouts of the four ZIP records a stored, streamed archive needs.
//!
//! Every record is a plain value that encodes itself into bytes; none of them
//! perform I/O. Field layouts follow PKWARE APPNOTE sections 4.3.7 (local
//! file header), 4.3.9 (data descriptor), 4.3.12 (central directory header)
//! and 4.3.16 (end of central directory).

use bytes::Bytes;

use super::codec::{encode_text, put_u16, put_u32, DosDateTime};

/// Version 2.0: the minimum for data descriptors and stored entries
pub const PROTOCOL_VERSION: u64 = 20;

/// General purpose bit flags (APPNOTE 4.4.4)
pub mod flags {
    /// CRC and sizes follow the data in a data descriptor
    pub const SIZE_IN_DESCRIPTOR: u16 = 1 << 3;
    /// File name is UTF-8
    pub const UNICODE_NAME: u16 = 1 << 11;

    pub const DEFAULT: u16 = SIZE_IN_DESCRIPTOR | UNICODE_NAME;
}

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
}

impl CompressionMethod {
    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
        }
    }
}

/// Per-file values shared by the local header and the central directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    name: Bytes,
    modified: DosDateTime,
    flags: u16,
    method: CompressionMethod,
}

impl FileMetadata {
    /// Metadata for a stored entry named `file_name` (cut to 255 bytes)
    pub fn new(file_name: &str, modified: DosDateTime) -> Self {
        Self {
            name: Bytes::copy_from_slice(encode_text(file_name)),
            modified,
            flags: flags::DEFAULT,
            method: CompressionMethod::Stored,
        }
    }

    /// Encoded name as stored in the archive
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn modified(&self) -> DosDateTime {
        self.modified
    }

    pub fn flags(&self) -> u16 {
        self.flags
    }

    pub fn method(&self) -> CompressionMethod {
        self.method
    }
}

/// A fixed binary layout that can encode itself
pub trait Record {
    /// Exact number of bytes [`Record::write_to`] appends
    fn encoded_len(&self) -> usize;

    fn write_to(&self, out: &mut Vec<u8>);

    fn to_bytes(&self) -> Bytes {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut out);
        Bytes::from(out)
    }
}

/// Local File Header (LFH) - 30 bytes plus name
///
/// CRC and sizes are written as zero; the real values follow the data in a
/// [`DataDescriptor`].
#[derive(Debug, Clone, Copy)]
pub struct LocalFileHeader<'a> {
    metadata: &'a FileMetadata,
}

impl<'a> LocalFileHeader<'a> {
    pub const SIGNATURE: u64 = 0x0403_4B50;
    pub const SIZE: usize = 30;

    pub fn new(metadata: &'a FileMetadata) -> Self {
        Self { metadata }
    }
}

impl Record for LocalFileHeader<'_> {
    fn encoded_len(&self) -> usize {
        Self::SIZE + self.metadata.name.len()
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        let meta = self.metadata;
        put_u32(out, Self::SIGNATURE);
        put_u16(out, PROTOCOL_VERSION);
        put_u16(out, meta.flags as u64);
        put_u16(out, meta.method.as_u16() as u64);
        meta.modified.put(out);
        put_u32(out, 0); // crc
        put_u32(out, 0); // compressed size
        put_u32(out, 0); // uncompressed size
        put_u16(out, meta.name.len() as u64);
        put_u16(out, 0); // extra field length
        out.extend_from_slice(&meta.name);
    }
}

/// Data Descriptor - 16 bytes, signature included
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDescriptor {
    pub crc: u32,
    pub size: u64,
}

impl DataDescriptor {
    pub const SIGNATURE: u64 = 0x0807_4B50;
    pub const SIZE: usize = 16;

    pub fn new(crc: u32, size: u64) -> Self {
        Self { crc, size }
    }
}

impl Record for DataDescriptor {
    fn encoded_len(&self) -> usize {
        Self::SIZE
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        put_u32(out, Self::SIGNATURE);
        put_u32(out, self.crc as u64);
        put_u32(out, self.size); // compressed, same as stored
        put_u32(out, self.size);
    }
}

/// Central Directory File Header (CDFH) - 46 bytes plus name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryEntry {
    pub metadata: FileMetadata,
    pub crc: u32,
    pub size: u64,
    /// Archive offset of the entry's local file header
    pub offset: u64,
}

impl CentralDirectoryEntry {
    pub const SIGNATURE: u64 = 0x0201_4B50;
    pub const SIZE: usize = 46;

    pub fn new(metadata: FileMetadata, crc: u32, size: u64, offset: u64) -> Self {
        Self {
            metadata,
            crc,
            size,
            offset,
        }
    }
}

impl Record for CentralDirectoryEntry {
    fn encoded_len(&self) -> usize {
        Self::SIZE + self.metadata.name.len()
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        let meta = &self.metadata;
        put_u32(out, Self::SIGNATURE);
        put_u16(out, PROTOCOL_VERSION); // made by
        put_u16(out, PROTOCOL_VERSION); // needed to extract
        put_u16(out, meta.flags as u64);
        put_u16(out, meta.method.as_u16() as u64);
        meta.modified.put(out);
        put_u32(out, self.crc as u64);
        put_u32(out, self.size);
        put_u32(out, self.size);
        put_u16(out, meta.name.len() as u64);
        put_u16(out, 0); // extra field length
        put_u16(out, 0); // file comment length
        put_u16(out, 0); // disk number start
        put_u16(out, 0); // internal file attributes
        put_u32(out, 0); // external file attributes
        put_u32(out, self.offset);
        out.extend_from_slice(&meta.name);
    }
}

/// End of Central Directory (EOCD) - 22 bytes, no comment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    /// Number of central directory entries
    pub count: u64,
    /// Byte length of the central directory
    pub size: u64,
    /// Archive offset of the first central directory entry
    pub offset: u64,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: u64 = 0x0605_4B50;
    pub const SIZE: usize = 22;

    pub fn new(count: u64, size: u64, offset: u64) -> Self {
        Self {
            count,
            size,
            offset,
        }
    }
}

impl Record for EndOfCentralDirectory {
    fn encoded_len(&self) -> usize {
        Self::SIZE
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        put_u32(out, Self::SIGNATURE);
        put_u16(out, 0); // number of this disk
        put_u16(out, 0); // disk where central directory starts
        put_u16(out, self.count); // entries on this disk
        put_u16(out, self.count); // total entries
        put_u32(out, self.size);
        put_u32(out, self.offset);
        put_u16(out, 0); // comment length
    }
}
