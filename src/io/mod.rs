mod http;
mod local;
mod memory;
mod stream;

pub use http::HttpSource;
pub use local::{FileSource, DEFAULT_CHUNK_SIZE};
pub use memory::MemorySource;
pub use stream::StreamSource;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Trait for single-pass producers of byte chunks
#[async_trait]
pub trait ChunkSource: Send {
    /// Produce the next chunk, or `None` once the source is exhausted
    async fn next_chunk(&mut self) -> Result<Option<Bytes>>;
}

#[async_trait]
impl<S: ChunkSource + ?Sized> ChunkSource for Box<S> {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        (**self).next_chunk().await
    }
}

/// Drain a source into a single buffer.
///
/// Only meant for small sources; the archive itself never does this.
pub async fn collect<S: ChunkSource + ?Sized>(source: &mut S) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    while let Some(chunk) = source.next_chunk().await? {
        out.extend_from_slice(&chunk);
    }
    Ok(out)
}
