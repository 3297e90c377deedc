//! Path-addressed archive store.
//!
//! Layout under the archive root:
//!
//! ```text
//! data/<conversationId>.json
//! data/<conversationId>/msg_<messageId>.json
//! data/<conversationId>/hosted_content_<messageId>_<hostedContentId>   (max 255 chars)
//! html/<conversationId>.html
//! html/index.html
//! ```
//!
//! Writes land in a temporary file in the target directory and are renamed
//! into place, so `exists` never observes a partially written record.

mod failures;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::HostedContentId;
use crate::util::truncate_chars;
use crate::Result;

pub const DATA_DIR: &str = "data";
pub const HTML_DIR: &str = "html";
pub const INDEX_FILE_NAME: &str = "index.html";

/// Longest file name the store will produce.
pub const FILE_NAME_LIMIT: usize = 255;

const MESSAGE_PREFIX: &str = "msg_";
const JSON_SUFFIX: &str = ".json";

static WRITE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Address of one stored record or blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKey<'a> {
    /// Conversation snapshot
    Conversation { conversation_id: &'a str },
    /// One message record, scoped by its conversation
    Message {
        conversation_id: &'a str,
        message_id: &'a str,
    },
    /// Hosted content blob, scoped by conversation and message
    HostedContent {
        conversation_id: &'a str,
        message_id: &'a str,
        content_id: &'a HostedContentId,
    },
}

impl StoreKey<'_> {
    /// Path relative to the data directory.
    #[must_use]
    pub fn relative_path(&self) -> PathBuf {
        match self {
            Self::Conversation { .. } => PathBuf::from(self.file_name()),
            Self::Message {
                conversation_id, ..
            }
            | Self::HostedContent {
                conversation_id, ..
            } => Path::new(conversation_id).join(self.file_name()),
        }
    }

    #[must_use]
    pub fn conversation_id(&self) -> &str {
        match self {
            Self::Conversation { conversation_id }
            | Self::Message {
                conversation_id, ..
            }
            | Self::HostedContent {
                conversation_id, ..
            } => *conversation_id,
        }
    }

    /// File name of the record inside its directory.
    #[must_use]
    pub fn file_name(&self) -> String {
        match self {
            Self::Conversation { conversation_id } => format!("{conversation_id}{JSON_SUFFIX}"),
            Self::Message { message_id, .. } => message_file_name(message_id),
            Self::HostedContent {
                message_id,
                content_id,
                ..
            } => hosted_content_file_name(message_id, content_id),
        }
    }
}

/// `msg_<messageId>.json`
#[must_use]
pub fn message_file_name(message_id: &str) -> String {
    format!("{MESSAGE_PREFIX}{message_id}{JSON_SUFFIX}")
}

/// `hosted_content_<messageId>_<contentId>`, truncated to [`FILE_NAME_LIMIT`] characters.
///
/// Path separators are replaced so the name is always a single path segment.
/// Distinct long ids sharing a 255-character prefix collide; that is accepted.
#[must_use]
pub fn hosted_content_file_name(message_id: &str, content_id: &HostedContentId) -> String {
    let name = format!("hosted_content_{message_id}_{content_id}")
        .replace(['/', '\\', '\0'], "_");
    truncate_chars(&name, FILE_NAME_LIMIT)
}

/// Filesystem-backed archive store rooted at an output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveStore {
    root: PathBuf,
}

impl ArchiveStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    #[must_use]
    pub fn html_dir(&self) -> PathBuf {
        self.root.join(HTML_DIR)
    }

    #[must_use]
    pub fn conversation_dir(&self, conversation_id: &str) -> PathBuf {
        self.data_dir().join(conversation_id)
    }

    #[must_use]
    pub fn path(&self, key: &StoreKey<'_>) -> PathBuf {
        self.data_dir().join(key.relative_path())
    }

    /// Create `data/<conversationId>/` if missing.
    pub async fn ensure_conversation_dir(&self, conversation_id: &str) -> Result<PathBuf> {
        let dir = self.conversation_dir(conversation_id);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    pub async fn exists(&self, key: &StoreKey<'_>) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.path(key)).await?)
    }

    pub async fn read_bytes(&self, key: &StoreKey<'_>) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.path(key)).await?)
    }

    pub async fn read_json<T: DeserializeOwned>(&self, key: &StoreKey<'_>) -> Result<T> {
        let bytes = self.read_bytes(key).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Create or overwrite the record at `key`.
    pub async fn write_bytes(&self, key: &StoreKey<'_>, bytes: &[u8]) -> Result<()> {
        write_atomic(&self.path(key), bytes).await
    }

    pub async fn write_json<T: Serialize + ?Sized>(
        &self,
        key: &StoreKey<'_>,
        value: &T,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Write a rendered document under `html/`, returning its path.
    pub async fn write_document(&self, file_name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.html_dir().join(file_name);
        write_atomic(&path, contents.as_bytes()).await?;
        Ok(path)
    }

    /// Ids of all stored conversation snapshots, sorted by file name.
    pub async fn list_conversations(&self) -> Result<Vec<String>> {
        let names = list_file_names(&self.data_dir()).await?;
        Ok(names
            .iter()
            .filter_map(|name| name.strip_suffix(JSON_SUFFIX))
            .filter(|id| !id.is_empty())
            .map(ToString::to_string)
            .collect())
    }

    /// Ids of all stored messages of a conversation, sorted by file name.
    ///
    /// Message ids are fixed-width millisecond timestamps, so file-name order
    /// is chronological.
    pub async fn list_messages(&self, conversation_id: &str) -> Result<Vec<String>> {
        let names = list_file_names(&self.conversation_dir(conversation_id)).await?;
        Ok(names
            .iter()
            .filter_map(|name| name.strip_prefix(MESSAGE_PREFIX))
            .filter_map(|name| name.strip_suffix(JSON_SUFFIX))
            .map(ToString::to_string)
            .collect())
    }

    /// Hosted-content blobs of a conversation whose stored bytes are a failure description.
    pub async fn hosted_content_failures(
        &self,
        conversation_id: &str,
    ) -> Result<BTreeMap<String, String>> {
        failures::load(&self.conversation_dir(conversation_id)).await
    }

    /// Mark (or unmark, with `None`) a hosted-content blob as a stored failure.
    pub async fn set_hosted_content_failure(
        &self,
        key: &StoreKey<'_>,
        description: Option<&str>,
    ) -> Result<()> {
        let file_name = key.file_name();
        let dir = self.conversation_dir(key.conversation_id());
        let mut ledger = failures::load(&dir).await?;
        let changed = match description {
            Some(description) => {
                ledger.insert(file_name, description.to_string()).as_deref() != Some(description)
            }
            None => ledger.remove(&file_name).is_some(),
        };
        if changed {
            failures::save(&dir, &ledger).await?;
        }
        Ok(())
    }
}

/// Regular file names in `dir`, sorted; a missing directory lists as empty.
async fn list_file_names(dir: &Path) -> Result<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => return Err(error.into()),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(dir).await?;

    let temp_path = dir.join(format!(
        ".partial-{}-{}",
        std::process::id(),
        WRITE_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    tokio::fs::write(&temp_path, bytes).await?;
    if let Err(error) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(error.into());
    }
    Ok(())
}
