//! Pass-through measurements over byte chunks.
//!
//! A counter only observes; chunks flow downstream unchanged. Values are
//! final only once the observed source is exhausted.

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

use crate::io::ChunkSource;

/// A running measure over observed bytes
pub trait StreamCounter: Send {
    fn update(&mut self, chunk: &[u8]);

    fn value(&self) -> u64;
}

/// Counts observed bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LengthCounter {
    value: u64,
}

impl LengthCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamCounter for LengthCounter {
    fn update(&mut self, chunk: &[u8]) {
        self.value += chunk.len() as u64;
    }

    fn value(&self) -> u64 {
        self.value
    }
}

/// Rolling CRC-32 (ISO-HDLC), the checksum ZIP readers verify
#[derive(Clone, Default)]
pub struct Crc32Counter {
    hasher: crc32fast::Hasher,
}

impl Crc32Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn crc(&self) -> u32 {
        self.hasher.clone().finalize()
    }
}

impl StreamCounter for Crc32Counter {
    fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
    }

    fn value(&self) -> u64 {
        self.crc() as u64
    }
}

/// Fixed-order group of counters that all observe the same chunks
pub struct CounterChain<'a, const N: usize> {
    counters: [&'a mut dyn StreamCounter; N],
}

impl<'a, const N: usize> CounterChain<'a, N> {
    pub fn new(counters: [&'a mut dyn StreamCounter; N]) -> Self {
        Self { counters }
    }

    /// Feed one chunk to every counter, in order
    pub fn observe(&mut self, chunk: &[u8]) {
        for counter in self.counters.iter_mut() {
            counter.update(chunk);
        }
    }

    /// Wrap `source` so every pulled chunk is observed before it is returned
    pub fn wrap<S: ChunkSource>(self, source: S) -> Counted<'a, S, N> {
        Counted {
            source,
            chain: self,
        }
    }
}

/// Chunk source observed by a [`CounterChain`]
pub struct Counted<'a, S, const N: usize> {
    source: S,
    chain: CounterChain<'a, N>,
}

#[async_trait]
impl<'a, S: ChunkSource, const N: usize> ChunkSource for Counted<'a, S, N> {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        let chunk = self.source.next_chunk().await?;
        if let Some(chunk) = &chunk {
            self.chain.observe(chunk);
        }
        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{collect, MemorySource};

    #[test]
    fn crc_matches_reference_value() {
        let mut crc = Crc32Counter::new();
        assert_eq!(crc.value(), 0);
        crc.update(b"123456789");
        assert_eq!(crc.crc(), 0xCBF4_3926);
    }

    #[test]
    fn crc_is_independent_of_chunking() {
        let mut whole = Crc32Counter::new();
        whole.update(b"some text");

        let mut split = Crc32Counter::new();
        for part in ["so", "", "me te", "xt"] {
            split.update(part.as_bytes());
        }
        assert_eq!(whole.crc(), split.crc());
        assert_eq!(whole.crc(), crc32fast::hash(b"some text"));
    }

    #[test]
    fn chain_feeds_every_counter() {
        let mut size = LengthCounter::new();
        let mut crc = Crc32Counter::new();
        let mut total = LengthCounter::new();
        total.update(b"header");

        let mut chain = CounterChain::new([&mut size, &mut crc, &mut total]);
        chain.observe(b"more ");
        chain.observe(b"text");

        assert_eq!(size.value(), 9);
        assert_eq!(total.value(), 15);
        assert_eq!(crc.crc(), crc32fast::hash(b"more text"));
    }

    #[tokio::test]
    async fn wrapped_source_passes_chunks_through() {
        let mut size = LengthCounter::new();
        let mut crc = Crc32Counter::new();

        let mut counted = CounterChain::new([&mut size, &mut crc])
            .wrap(MemorySource::new(["foo", "", "bar"]));
        let data = collect(&mut counted).await.unwrap();
        drop(counted);

        assert_eq!(data, b"foobar");
        assert_eq!(size.value(), 6);
        assert_eq!(crc.crc(), crc32fast::hash(b"foobar"));
    }
}
