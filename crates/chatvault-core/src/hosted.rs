//! Hosted-content resolution: find the inline blobs a message references and
//! fetch each one into the store exactly once.

use serde::Deserialize;

use crate::markup::{hosted_content_id_from_url, src_urls};
use crate::models::{Attachment, AttachmentKind, HostedContent, HostedContentId, Message};
use crate::remote::ChatSource;
use crate::store::{ArchiveStore, StoreKey};
use crate::util::second_to_last_segment;
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CodeSnippetCard {
    #[serde(default)]
    code_snippet_url: Option<String>,
}

/// Hosted-content id of a code-snippet attachment.
///
/// The attachment's `content` is a JSON card whose `codeSnippetUrl` points at
/// `.../hostedContents/{id}/$value`.
pub fn extract_id(attachment: &Attachment) -> Result<HostedContentId> {
    let card: CodeSnippetCard = attachment.content_json()?;
    let url = card.code_snippet_url.ok_or_else(|| {
        Error::InvalidRecord(format!(
            "code snippet attachment {} has no codeSnippetUrl",
            attachment.id
        ))
    })?;
    second_to_last_segment(&url)
        .map(HostedContentId::new)
        .ok_or_else(|| {
            Error::InvalidRecord(format!(
                "code snippet attachment {} has malformed codeSnippetUrl: {url}",
                attachment.id
            ))
        })
}

/// Hosted-content ids of images referenced from body markup, in document order.
pub fn extract_ids_from_body(body: &str, endpoint_prefix: &str) -> Vec<HostedContentId> {
    src_urls(body)
        .filter_map(|url| hosted_content_id_from_url(url, endpoint_prefix))
        .collect()
}

/// What happened to one hosted-content reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// Fetched and stored
    Fetched,
    /// A local copy already existed
    Skipped,
    /// The remote fetch failed; the failure description was stored instead
    Failed,
}

/// Per-message resolution counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveSummary {
    pub fetched: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl std::ops::AddAssign for ResolveSummary {
    fn add_assign(&mut self, other: Self) {
        self.fetched += other.fetched;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

impl ResolveSummary {
    fn record(&mut self, outcome: ResolveOutcome) {
        match outcome {
            ResolveOutcome::Fetched => self.fetched += 1,
            ResolveOutcome::Skipped => self.skipped += 1,
            ResolveOutcome::Failed => self.failed += 1,
        }
    }
}

/// Fetches hosted content into the archive store.
///
/// Remote failures never propagate: the error text is stored as the blob and
/// recorded in the store's failure ledger. Only local IO errors are returned.
pub struct HostedContentResolver<'a, S> {
    source: &'a S,
    store: &'a ArchiveStore,
    endpoint_prefix: String,
    retry_failed: bool,
}

impl<'a, S: ChatSource> HostedContentResolver<'a, S> {
    pub fn new(source: &'a S, store: &'a ArchiveStore, endpoint_prefix: impl Into<String>) -> Self {
        Self {
            source,
            store,
            endpoint_prefix: endpoint_prefix.into(),
            retry_failed: false,
        }
    }

    /// Re-fetch blobs whose stored copy is a recorded failure.
    #[must_use]
    pub fn retry_failed(mut self, retry_failed: bool) -> Self {
        self.retry_failed = retry_failed;
        self
    }

    /// Ensure one blob is stored, fetching it only when no local copy exists.
    pub async fn resolve(
        &self,
        conversation_id: &str,
        message_id: &str,
        content_id: &HostedContentId,
    ) -> Result<ResolveOutcome> {
        let key = StoreKey::HostedContent {
            conversation_id,
            message_id,
            content_id,
        };

        if self.store.exists(&key).await? && !self.should_retry(&key).await? {
            tracing::debug!("Hosted content {} already stored; skipping", key.file_name());
            return Ok(ResolveOutcome::Skipped);
        }

        let content = match self
            .source
            .fetch_hosted_content(conversation_id, message_id, content_id)
            .await
        {
            Ok(bytes) => HostedContent::Bytes(bytes),
            Err(error) => {
                tracing::warn!(
                    "Failed to fetch hosted content {} for message {}: {}",
                    content_id,
                    message_id,
                    error
                );
                HostedContent::Failed(error.to_string())
            }
        };

        // The ledger entry for a failure lands before its bytes, and a good blob
        // lands before its entry is cleared. An interrupted write never leaves
        // failure text that looks like real content.
        match &content {
            HostedContent::Failed(description) => {
                self.store
                    .set_hosted_content_failure(&key, Some(description.as_str()))
                    .await?;
                self.store
                    .write_bytes(&key, content.as_stored_bytes())
                    .await?;
                Ok(ResolveOutcome::Failed)
            }
            HostedContent::Bytes(bytes) => {
                self.store.write_bytes(&key, bytes).await?;
                self.store.set_hosted_content_failure(&key, None).await?;
                Ok(ResolveOutcome::Fetched)
            }
        }
    }

    /// Resolve a blob and return what is stored for it.
    ///
    /// Calling this twice for the same ids performs at most one remote fetch.
    pub async fn fetch(
        &self,
        conversation_id: &str,
        message_id: &str,
        content_id: &HostedContentId,
    ) -> Result<HostedContent> {
        self.resolve(conversation_id, message_id, content_id).await?;
        load_hosted_content(self.store, conversation_id, message_id, content_id).await
    }

    /// Resolve every code-snippet attachment and body image of a message.
    pub async fn resolve_message(
        &self,
        conversation_id: &str,
        message: &Message,
    ) -> Result<ResolveSummary> {
        let mut summary = ResolveSummary::default();

        for attachment in &message.attachments {
            if attachment.kind() != AttachmentKind::CodeSnippet {
                continue;
            }
            match extract_id(attachment) {
                Ok(content_id) => {
                    let outcome = self
                        .resolve(conversation_id, &message.id, &content_id)
                        .await?;
                    summary.record(outcome);
                }
                Err(error) => {
                    tracing::warn!(
                        "Skipping code snippet in message {}: {}",
                        message.id,
                        error
                    );
                    summary.record(ResolveOutcome::Failed);
                }
            }
        }

        if let Some(body) = message.html_body() {
            for content_id in extract_ids_from_body(body, &self.endpoint_prefix) {
                let outcome = self
                    .resolve(conversation_id, &message.id, &content_id)
                    .await?;
                summary.record(outcome);
            }
        }

        Ok(summary)
    }

    async fn should_retry(&self, key: &StoreKey<'_>) -> Result<bool> {
        if !self.retry_failed {
            return Ok(false);
        }
        let failures = self
            .store
            .hosted_content_failures(key.conversation_id())
            .await?;
        Ok(failures.contains_key(&key.file_name()))
    }
}

/// Read a stored blob, distinguishing stored failures from real bytes.
///
/// A blob that was never stored is an IO `NotFound` error.
pub async fn load_hosted_content(
    store: &ArchiveStore,
    conversation_id: &str,
    message_id: &str,
    content_id: &HostedContentId,
) -> Result<HostedContent> {
    let key = StoreKey::HostedContent {
        conversation_id,
        message_id,
        content_id,
    };
    let bytes = store.read_bytes(&key).await?;
    let failures = store.hosted_content_failures(conversation_id).await?;
    Ok(match failures.get(&key.file_name()) {
        Some(description) => HostedContent::Failed(description.clone()),
        None => HostedContent::Bytes(bytes),
    })
}
