use anyhow::Result;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::fmt;
use time::OffsetDateTime;

use crate::io::ChunkSource;

/// A file to be placed in the archive
pub struct ArchiveElement {
    /// In-archive path, `/` separated
    pub file_name: String,
    /// Single-pass producer of the file content
    pub content: Box<dyn ChunkSource>,
    /// Fixed modification time, overriding the archive clock
    pub modified: Option<OffsetDateTime>,
}

impl ArchiveElement {
    pub fn new(file_name: impl Into<String>, content: impl ChunkSource + 'static) -> Self {
        Self {
            file_name: file_name.into(),
            content: Box::new(content),
            modified: None,
        }
    }

    pub fn with_modified(mut self, modified: OffsetDateTime) -> Self {
        self.modified = Some(modified);
        self
    }
}

impl fmt::Debug for ArchiveElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveElement")
            .field("file_name", &self.file_name)
            .field("modified", &self.modified)
            .finish_non_exhaustive()
    }
}

/// Producer of archive elements, pulled one at a time
#[async_trait]
pub trait ElementSource: Send {
    async fn next_element(&mut self) -> Result<Option<ArchiveElement>>;
}

#[async_trait]
impl<I> ElementSource for I
where
    I: Iterator<Item = ArchiveElement> + Send,
{
    async fn next_element(&mut self) -> Result<Option<ArchiveElement>> {
        Ok(self.next())
    }
}

/// Adapter for a `futures` stream of elements
pub struct ElementStream<S> {
    inner: S,
}

impl<S> ElementStream<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S> ElementSource for ElementStream<S>
where
    S: Stream<Item = Result<ArchiveElement>> + Send + Unpin,
{
    async fn next_element(&mut self) -> Result<Option<ArchiveElement>> {
        self.inner.next().await.transpose()
    }
}
