use super::ChunkSource;
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;

/// In-memory chunk source yielding a fixed list of chunks in order
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    chunks: VecDeque<Bytes>,
}

impl MemorySource {
    pub fn new<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }

    /// Source producing the whole buffer as one chunk
    pub fn single(data: impl Into<Bytes>) -> Self {
        Self::new([data.into()])
    }

    /// Number of chunks not yet produced
    pub fn remaining(&self) -> usize {
        self.chunks.len()
    }
}

#[async_trait]
impl ChunkSource for MemorySource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        Ok(self.chunks.pop_front())
    }
}
