//! Hosted content (inline binary attachments)

use std::fmt;

/// Identifier of a hosted content blob, scoped by its message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostedContentId(String);

impl HostedContentId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostedContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of fetching a hosted content blob.
///
/// Failures are stored in place of the bytes so a single inaccessible blob
/// never aborts a sync; the store records which blobs hold a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostedContent {
    Bytes(Vec<u8>),
    Failed(String),
}

impl HostedContent {
    /// Bytes written to disk for this outcome.
    #[must_use]
    pub fn as_stored_bytes(&self) -> &[u8] {
        match self {
            Self::Bytes(bytes) => bytes,
            Self::Failed(description) => description.as_bytes(),
        }
    }
}
