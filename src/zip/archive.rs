use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::io::ChunkSource;
use anyhow::Result;

use super::clock::{Clock, SystemClock};
use super::codec::DosDateTime;
use super::counters::{CounterChain, Crc32Counter, LengthCounter, StreamCounter};
use super::element::{ArchiveElement, ElementSource};
use super::policy::{AbortOnError, ErrorPolicy};
use super::records::{
    CentralDirectoryEntry, DataDescriptor, EndOfCentralDirectory, FileMetadata, LocalFileHeader,
    Record,
};

/// Streaming ZIP archive builder
///
/// Pulls elements one at a time and produces the archive as a sequence of
/// chunks: for every element a local file header, the content unchanged and
/// a data descriptor, then the central directory and its end record. Nothing
/// but the central directory entries is kept in memory, and the output is
/// never revisited, so it can go straight to a socket or pipe.
///
/// A builder produces exactly one archive. After the end record, or after an
/// error was propagated, it only yields `None`.
///
/// ## Example
///
/// ```no_run
/// use flyzip::{ArchiveElement, ArchiveStream, MemorySource};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let elements = vec![
///         ArchiveElement::new("foo.txt", MemorySource::single("some text")),
///         ArchiveElement::new("bar/baz.txt", MemorySource::single("more text")),
///     ];
///
///     let mut archive = ArchiveStream::new(elements.into_iter());
///     let written = archive.write_to(&mut tokio::io::stdout()).await?;
///     eprintln!("{written} bytes");
///     Ok(())
/// }
/// ```
pub struct ArchiveStream<E, P = AbortOnError> {
    elements: E,
    policy: P,
    clock: Arc<dyn Clock>,
    /// Bytes emitted so far, across the whole archive
    offset: LengthCounter,
    entries: Vec<CentralDirectoryEntry>,
    current: Option<OpenFile>,
    /// Chunk already measured by the file counters, returned on the next pull
    pending: Option<Bytes>,
    state: State,
}

enum State {
    Files,
    CentralDirectory {
        next: usize,
        start: u64,
        length: LengthCounter,
    },
    Done,
}

struct OpenFile {
    element: ArchiveElement,
    metadata: FileMetadata,
    start: u64,
    size: LengthCounter,
    crc: Crc32Counter,
    header_emitted: bool,
}

impl<E: ElementSource> ArchiveStream<E> {
    pub fn new(elements: E) -> Self {
        Self {
            elements,
            policy: AbortOnError,
            clock: Arc::new(SystemClock),
            offset: LengthCounter::new(),
            entries: Vec::new(),
            current: None,
            pending: None,
            state: State::Files,
        }
    }
}

impl<E: ElementSource, P: ErrorPolicy> ArchiveStream<E, P> {
    /// Replace the policy applied to failing element content
    pub fn with_policy<Q: ErrorPolicy>(self, policy: Q) -> ArchiveStream<E, Q> {
        ArchiveStream {
            elements: self.elements,
            policy,
            clock: self.clock,
            offset: self.offset,
            entries: self.entries,
            current: self.current,
            pending: self.pending,
            state: self.state,
        }
    }

    /// Timestamp source for elements without their own modification time
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Central directory entries collected so far
    pub fn entries(&self) -> &[CentralDirectoryEntry] {
        &self.entries
    }

    /// Total bytes produced so far
    pub fn bytes_emitted(&self) -> u64 {
        self.offset.value()
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, State::Done)
    }

    /// Drain the whole archive into `writer`.
    ///
    /// # Returns
    ///
    /// The archive size in bytes.
    pub async fn write_to<W>(&mut self, writer: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        while let Some(chunk) = self.next_chunk().await? {
            writer.write_all(&chunk).await?;
        }
        writer.flush().await?;
        Ok(self.bytes_emitted())
    }

    /// Turn the builder into a `futures` stream of chunks
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes>> + Send {
        futures::stream::try_unfold(self, |mut archive| async move {
            let chunk = archive.next_chunk().await?;
            Ok(chunk.map(|chunk| (chunk, archive)))
        })
    }

    fn open(&self, element: ArchiveElement) -> OpenFile {
        let modified = element.modified.unwrap_or_else(|| self.clock.now());
        let metadata = FileMetadata::new(&element.file_name, DosDateTime::from(modified));
        OpenFile {
            element,
            metadata,
            start: self.offset.value(),
            size: LengthCounter::new(),
            crc: Crc32Counter::new(),
            header_emitted: false,
        }
    }

    /// Emit the held-back local header of `file`.
    ///
    /// `next` was already measured by the file counters and goes out on the
    /// following pull.
    fn emit_header(&mut self, file: &mut OpenFile, next: Bytes) -> Bytes {
        tracing::debug!(file = %file.element.file_name, offset = file.start, "Adding file");
        file.header_emitted = true;
        self.pending = Some(next);

        let header = LocalFileHeader::new(&file.metadata).to_bytes();
        self.offset.update(&header);
        header
    }

    async fn next_file_chunk(&mut self, mut file: OpenFile) -> Result<Option<Bytes>> {
        match file.element.content.next_chunk().await {
            Ok(Some(chunk)) => {
                let out = if file.header_emitted {
                    CounterChain::new([&mut file.size, &mut file.crc, &mut self.offset])
                        .observe(&chunk);
                    chunk
                } else {
                    CounterChain::new([&mut file.size, &mut file.crc]).observe(&chunk);
                    self.emit_header(&mut file, chunk)
                };
                self.current = Some(file);
                Ok(Some(out))
            }
            Ok(None) => {
                let crc = file.crc.crc();
                let size = file.size.value();
                let descriptor = DataDescriptor::new(crc, size).to_bytes();

                let out = if file.header_emitted {
                    self.offset.update(&descriptor);
                    descriptor
                } else {
                    self.emit_header(&mut file, descriptor)
                };

                tracing::debug!(file = %file.element.file_name, size, crc, "File complete");
                self.entries
                    .push(CentralDirectoryEntry::new(file.metadata, crc, size, file.start));
                Ok(Some(out))
            }
            Err(e) => {
                let name = file.element.file_name.clone();
                self.policy.on_error(file.element, e).await?;
                if file.header_emitted {
                    tracing::warn!(
                        file = %name,
                        offset = file.start,
                        "Partial file left in archive without descriptor"
                    );
                }
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl<E: ElementSource, P: ErrorPolicy> ChunkSource for ArchiveStream<E, P> {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if let Some(chunk) = self.pending.take() {
            self.offset.update(&chunk);
            return Ok(Some(chunk));
        }

        loop {
            match self.state {
                State::Files => {
                    let step = match self.current.take() {
                        Some(file) => self.next_file_chunk(file).await,
                        None => match self.elements.next_element().await {
                            Ok(Some(element)) => {
                                self.current = Some(self.open(element));
                                continue;
                            }
                            Ok(None) => {
                                self.state = State::CentralDirectory {
                                    next: 0,
                                    start: self.offset.value(),
                                    length: LengthCounter::new(),
                                };
                                continue;
                            }
                            Err(e) => Err(e),
                        },
                    };

                    match step {
                        Ok(Some(chunk)) => return Ok(Some(chunk)),
                        // skipped by the policy
                        Ok(None) => continue,
                        Err(e) => {
                            self.state = State::Done;
                            return Err(e);
                        }
                    }
                }
                State::CentralDirectory {
                    ref mut next,
                    start,
                    ref mut length,
                } => {
                    if let Some(entry) = self.entries.get(*next) {
                        let bytes = entry.to_bytes();
                        CounterChain::new([length, &mut self.offset]).observe(&bytes);
                        *next += 1;
                        return Ok(Some(bytes));
                    }

                    let end =
                        EndOfCentralDirectory::new(self.entries.len() as u64, length.value(), start)
                            .to_bytes();
                    tracing::debug!(
                        entries = self.entries.len(),
                        size = length.value(),
                        offset = start,
                        "Central directory complete"
                    );
                    self.offset.update(&end);
                    self.state = State::Done;
                    return Ok(Some(end));
                }
                State::Done => return Ok(None),
            }
        }
    }
}
