//! Incremental message synchronization.
//!
//! The message feed is newest-first. A scan persists unseen messages,
//! overwrites revised ones, and stops at the first unchanged message unless
//! forced. A tombstoned incoming record never replaces a local copy.

use std::fmt;

use crate::hosted::{HostedContentResolver, ResolveSummary};
use crate::models::{Conversation, Message};
use crate::remote::{ChatSource, PageCursor};
use crate::store::{ArchiveStore, StoreKey};
use crate::{Error, Result};

/// Knobs for one synchronization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Scan every feed page and retry hosted content recorded as failed.
    pub force: bool,
    /// Skip a conversation whose last-message preview is already stored.
    ///
    /// The preview id only shows the newest message is present; edits to
    /// older messages go unnoticed, so this is off unless asked for.
    pub trust_last_message_preview: bool,
}

/// Counters for one conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub saved: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// The feed was never read because the newest message was already stored.
    pub skipped_fast_path: bool,
    pub forced: bool,
    pub hosted: ResolveSummary,
}

impl SyncSummary {
    fn skipped() -> Self {
        Self {
            skipped_fast_path: true,
            ..Self::default()
        }
    }

    /// Messages written to disk in this run.
    #[must_use]
    pub const fn written(&self) -> usize {
        self.saved + self.updated
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.skipped_fast_path {
            return f.write_str("No new messages in the chat since last run");
        }
        write!(
            f,
            "Message counts: {} saved, {} updated",
            self.saved, self.updated
        )?;
        if self.forced {
            write!(f, ", {} unchanged", self.unchanged)?;
        }
        Ok(())
    }
}

/// Result of syncing one conversation during a full download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSync {
    pub conversation_id: String,
    pub display_name: String,
    pub summary: SyncSummary,
}

/// Result of a full download.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub conversations: Vec<ConversationSync>,
}

impl DownloadReport {
    /// Sum of all per-conversation counters.
    #[must_use]
    pub fn totals(&self) -> SyncSummary {
        self.conversations
            .iter()
            .fold(SyncSummary::default(), |mut total, entry| {
                total.saved += entry.summary.saved;
                total.updated += entry.summary.updated;
                total.unchanged += entry.summary.unchanged;
                total.forced |= entry.summary.forced;
                total.hosted += entry.summary.hosted;
                total
            })
    }
}

/// Progress reported by [`MessageSynchronizer::download_all`] as it goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadProgress<'a> {
    /// A conversation is about to be synced.
    Started {
        conversation_id: &'a str,
        display_name: &'a str,
    },
    /// A conversation finished syncing.
    Finished(&'a ConversationSync),
}

/// What the scan decided for one incoming record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Save,
    Update,
    KeepTombstoned,
    Unchanged,
}

/// Mirrors remote conversations and their messages into an [`ArchiveStore`].
pub struct MessageSynchronizer<'a, S> {
    source: &'a S,
    store: &'a ArchiveStore,
    endpoint_prefix: String,
}

impl<'a, S: ChatSource> MessageSynchronizer<'a, S> {
    pub fn new(source: &'a S, store: &'a ArchiveStore, endpoint_prefix: impl Into<String>) -> Self {
        Self {
            source,
            store,
            endpoint_prefix: endpoint_prefix.into(),
        }
    }

    /// Walk the conversation listing, snapshot each conversation and sync its messages.
    ///
    /// `on_progress` is called before and after each conversation, so callers
    /// can report while the download is still running.
    pub async fn download_all<F>(
        &self,
        options: SyncOptions,
        mut on_progress: F,
    ) -> Result<DownloadReport>
    where
        F: FnMut(DownloadProgress<'_>),
    {
        tokio::fs::create_dir_all(self.store.data_dir()).await?;

        let mut report = DownloadReport::default();
        let mut chats = PageCursor::new(self.source, self.source.chats_url());
        while let Some(record) = chats.next().await? {
            let conversation: Conversation = serde_json::from_value(record.clone())?;
            let display_name = conversation.display_name();
            tracing::debug!("Syncing conversation {}", conversation.id);
            on_progress(DownloadProgress::Started {
                conversation_id: &conversation.id,
                display_name: &display_name,
            });

            self.store.ensure_conversation_dir(&conversation.id).await?;
            self.store
                .write_json(
                    &StoreKey::Conversation {
                        conversation_id: &conversation.id,
                    },
                    &record,
                )
                .await?;

            let summary = self.sync_conversation(&conversation, options).await?;
            let entry = ConversationSync {
                conversation_id: conversation.id,
                display_name,
                summary,
            };
            on_progress(DownloadProgress::Finished(&entry));
            report.conversations.push(entry);
        }

        tracing::debug!(
            "Listed {} conversations over {} pages",
            report.conversations.len(),
            chats.pages_fetched()
        );
        Ok(report)
    }

    /// Bring the stored messages of one conversation up to date.
    pub async fn sync_conversation(
        &self,
        conversation: &Conversation,
        options: SyncOptions,
    ) -> Result<SyncSummary> {
        if !options.force
            && options.trust_last_message_preview
            && self.newest_message_stored(conversation).await?
        {
            return Ok(SyncSummary::skipped());
        }

        let resolver = HostedContentResolver::new(self.source, self.store, &*self.endpoint_prefix)
            .retry_failed(options.force);
        let mut summary = SyncSummary {
            forced: options.force,
            ..SyncSummary::default()
        };

        let mut feed = PageCursor::new(self.source, self.source.messages_url(&conversation.id));
        while let Some(record) = feed.next().await? {
            let incoming: Message = serde_json::from_value(record.clone())?;
            let key = StoreKey::Message {
                conversation_id: &conversation.id,
                message_id: &incoming.id,
            };

            match self.decide(&key, &incoming).await? {
                decision @ (Decision::Save | Decision::Update) => {
                    self.store.write_json(&key, &record).await?;
                    summary.hosted += resolver
                        .resolve_message(&conversation.id, &incoming)
                        .await?;
                    if decision == Decision::Save {
                        summary.saved += 1;
                    } else {
                        summary.updated += 1;
                    }
                }
                Decision::KeepTombstoned => {
                    tracing::debug!("Message {} deleted upstream; keeping local copy", incoming.id);
                    summary.unchanged += 1;
                }
                Decision::Unchanged => {
                    summary.unchanged += 1;
                    if !options.force {
                        tracing::debug!(
                            "Message {} unchanged; stopping scan of {}",
                            incoming.id,
                            conversation.id
                        );
                        break;
                    }
                }
            }
        }

        Ok(summary)
    }

    async fn newest_message_stored(&self, conversation: &Conversation) -> Result<bool> {
        let Some(message_id) = conversation.last_message_id() else {
            return Ok(false);
        };
        self.store
            .exists(&StoreKey::Message {
                conversation_id: &conversation.id,
                message_id,
            })
            .await
    }

    async fn decide(&self, key: &StoreKey<'_>, incoming: &Message) -> Result<Decision> {
        if !self.store.exists(key).await? {
            return Ok(Decision::Save);
        }
        if incoming.is_tombstoned() {
            return Ok(Decision::KeepTombstoned);
        }

        match self.store.read_json::<Message>(key).await {
            Ok(stored) if stored.revision() == incoming.revision() => Ok(Decision::Unchanged),
            Ok(_) => Ok(Decision::Update),
            Err(Error::Serialization(error)) => {
                tracing::warn!(
                    "Stored message {} is unreadable ({}); replacing it",
                    incoming.id,
                    error
                );
                Ok(Decision::Update)
            }
            Err(error) => Err(error),
        }
    }
}
