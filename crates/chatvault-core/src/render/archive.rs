//! Whole-archive rendering and the cross-conversation index.

use std::path::PathBuf;

use super::templates::{RenderedMessage, Templates};
use super::transform::BodyTransformer;
use crate::models::{Conversation, Message};
use crate::store::{ArchiveStore, StoreKey, INDEX_FILE_NAME};
use crate::{Error, Result};

/// One line of the index: a rendered document and the name shown for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub file_name: String,
    pub display_name: String,
}

/// A conversation left out of the render because a stored record was unreadable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedConversation {
    pub conversation_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// Index entries in display order
    pub entries: Vec<IndexEntry>,
    pub skipped: Vec<SkippedConversation>,
    pub index_path: PathBuf,
}

/// Renders every stored conversation to `html/<conversationId>.html` and
/// writes `html/index.html`.
pub struct ArchiveRenderer<'a> {
    store: &'a ArchiveStore,
    templates: &'a Templates,
    transformer: BodyTransformer<'a>,
}

impl<'a> ArchiveRenderer<'a> {
    pub fn new(
        store: &'a ArchiveStore,
        templates: &'a Templates,
        transformer: BodyTransformer<'a>,
    ) -> Self {
        Self {
            store,
            templates,
            transformer,
        }
    }

    pub async fn render_all(&self) -> Result<RenderReport> {
        tokio::fs::create_dir_all(self.store.html_dir()).await?;

        let mut report = RenderReport::default();
        for conversation_id in self.store.list_conversations().await? {
            match self.render_conversation(&conversation_id).await {
                Ok(entry) => report.entries.push(entry),
                Err(error @ (Error::Serialization(_) | Error::InvalidRecord(_))) => {
                    tracing::error!("Skipping chat {}: {}", conversation_id, error);
                    report.skipped.push(SkippedConversation {
                        conversation_id,
                        reason: error.to_string(),
                    });
                }
                Err(error) => return Err(error),
            }
        }

        // Stable, so equal names keep conversation id order.
        report
            .entries
            .sort_by(|left, right| left.display_name.cmp(&right.display_name));

        let index = self.templates.render_index(&report.entries);
        report.index_path = self.store.write_document(INDEX_FILE_NAME, &index).await?;
        tracing::info!("Writing {}", report.index_path.display());
        Ok(report)
    }

    /// Render one conversation and return its index entry.
    pub async fn render_conversation(&self, conversation_id: &str) -> Result<IndexEntry> {
        let conversation: Conversation = self
            .store
            .read_json(&StoreKey::Conversation { conversation_id })
            .await?;

        let mut messages = Vec::new();
        for message_id in self.store.list_messages(conversation_id).await? {
            let message: Message = self
                .store
                .read_json(&StoreKey::Message {
                    conversation_id,
                    message_id: &message_id,
                })
                .await?;
            let content = self.transformer.transform(conversation_id, &message).await?;
            messages.push((message, content));
        }

        let rendered = messages
            .iter()
            .map(|(message, content)| RenderedMessage {
                message,
                content: content.as_deref(),
            })
            .collect::<Vec<_>>();
        let document = self.templates.render_conversation(&conversation, &rendered);

        let file_name = format!("{}.html", conversation.id);
        let path = self.store.write_document(&file_name, &document).await?;
        tracing::info!("Writing {}", path.display());

        Ok(IndexEntry {
            file_name,
            display_name: conversation.display_name(),
        })
    }
}
