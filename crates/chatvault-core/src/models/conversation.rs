//! Conversation model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::null_as_default;

/// Placeholder used for members without a display name.
pub const NO_NAME: &str = "No Name";

/// A chat thread as returned by `/me/chats?$expand=members,lastMessagePreview`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Globally unique chat identifier
    pub id: String,
    /// Optional human-readable topic
    #[serde(default)]
    pub topic: Option<String>,
    /// Expanded member list
    #[serde(default, deserialize_with = "null_as_default")]
    pub members: Vec<Member>,
    /// Summary of the most recent message
    #[serde(default)]
    pub last_message_preview: Option<MessagePreview>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A conversation member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `lastMessagePreview` summary attached to a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePreview {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Conversation {
    /// Sorted, comma-separated member names with a placeholder for blanks.
    #[must_use]
    pub fn member_list(&self) -> String {
        let mut names = self
            .members
            .iter()
            .map(|member| match member.display_name.as_deref() {
                Some(name) if !name.is_empty() => name,
                _ => NO_NAME,
            })
            .collect::<Vec<_>>();
        names.sort_unstable();
        names.join(", ")
    }

    /// Topic when present, otherwise the member list.
    ///
    /// Path separators in topics are replaced so the name is safe to show
    /// anywhere a file name might be expected.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.topic.as_deref() {
            Some(topic) if !topic.is_empty() => topic.replace(['/', '\\'], "_"),
            _ => self.member_list(),
        }
    }

    /// Id of the most recent message, if the preview carries one.
    #[must_use]
    pub fn last_message_id(&self) -> Option<&str> {
        self.last_message_preview
            .as_ref()
            .and_then(|preview| preview.id.as_deref())
            .filter(|id| !id.is_empty())
    }
}
