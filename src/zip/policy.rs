//! What happens when an element's content fails mid-archive.
//!
//! The archive hands the failing element back to the policy together with
//! its error.
//! Returning `Err` aborts the whole archive; the bytes produced so far are
//! a truncated, unusable archive. Returning `Ok` skips the element.
//!
//! Skipping is only clean when the failure happens on the element's first
//! pull, because the local header is held back until content is known to
//! start. A failure after content was emitted leaves the header and partial
//! data in the archive with no descriptor and no central directory entry.
//! Readers that go through the central directory ignore those bytes, but
//! the archive is no longer strictly conformant.

use anyhow::Result;
use async_trait::async_trait;

use super::element::ArchiveElement;

#[async_trait]
pub trait ErrorPolicy: Send {
    async fn on_error(&mut self, element: ArchiveElement, error: anyhow::Error) -> Result<()>;
}

/// Propagate every error, aborting the archive
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortOnError;

#[async_trait]
impl ErrorPolicy for AbortOnError {
    async fn on_error(&mut self, _element: ArchiveElement, error: anyhow::Error) -> Result<()> {
        Err(error)
    }
}

/// Log and skip failing elements
#[derive(Debug, Clone, Default)]
pub struct SkipFailed {
    skipped: Vec<String>,
}

impl SkipFailed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the elements skipped so far
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }
}

#[async_trait]
impl ErrorPolicy for SkipFailed {
    async fn on_error(&mut self, element: ArchiveElement, error: anyhow::Error) -> Result<()> {
        tracing::warn!(file = %element.file_name, "Skipping file: {:#}", error);
        self.skipped.push(element.file_name);
        Ok(())
    }
}
