use super::ChunkSource;
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};

/// Adapter turning a `futures` stream of chunks into a [`ChunkSource`]
pub struct StreamSource<S> {
    inner: S,
}

impl<S> StreamSource<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S> ChunkSource for StreamSource<S>
where
    S: Stream<Item = Result<Bytes>> + Send + Unpin,
{
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        self.inner.next().await.transpose()
    }
}
