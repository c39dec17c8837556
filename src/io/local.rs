use super::ChunkSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Default read size for local files
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Local file source reading sequentially in fixed-size chunks
pub struct FileSource {
    path: PathBuf,
    file: Option<File>,
    chunk_size: usize,
}

impl FileSource {
    /// Create a source for `path`.
    ///
    /// The file is opened on the first pull, so a missing file is reported
    /// as a content error of the element that owns it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

#[async_trait]
impl ChunkSource for FileSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        let file = match self.file.take() {
            Some(file) => file,
            None => File::open(&self.path)
                .await
                .with_context(|| format!("Failed to open {}", self.path.display()))?,
        };
        let file = self.file.insert(file);

        let mut buf = BytesMut::zeroed(self.chunk_size);
        let n = file
            .read(&mut buf)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if n == 0 {
            return Ok(None);
        }

        buf.truncate(n);
        Ok(Some(buf.freeze()))
    }
}
