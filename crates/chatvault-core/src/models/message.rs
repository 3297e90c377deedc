//! Message model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{identity_display_name, null_as_default, Attachment};

/// A chat message as returned by `/chats/{id}/messages`.
///
/// Message ids are millisecond timestamps and are only unique within their
/// conversation; storage always scopes them by conversation id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub created_date_time: Option<String>,
    #[serde(default)]
    pub last_modified_date_time: Option<String>,
    #[serde(default)]
    pub last_edited_date_time: Option<String>,
    /// Set when the message was deleted upstream (tombstone)
    #[serde(default)]
    pub deleted_date_time: Option<String>,
    /// Graph identity set of the sender
    #[serde(default)]
    pub from: Option<Value>,
    #[serde(default)]
    pub body: Option<MessageBody>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attachments: Vec<Attachment>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Message body markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
    /// `html` or `text`
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl MessageBody {
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|kind| kind.eq_ignore_ascii_case("html"))
    }
}

/// The pair of timestamps that identifies a message revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionMarkers<'a> {
    pub last_modified: Option<&'a str>,
    pub last_edited: Option<&'a str>,
}

impl Message {
    #[must_use]
    pub fn revision(&self) -> RevisionMarkers<'_> {
        RevisionMarkers {
            last_modified: self.last_modified_date_time.as_deref(),
            last_edited: self.last_edited_date_time.as_deref(),
        }
    }

    /// Whether the message has been deleted upstream.
    #[must_use]
    pub fn is_tombstoned(&self) -> bool {
        self.deleted_date_time
            .as_deref()
            .is_some_and(|value| !value.is_empty())
    }

    /// Whether the message was edited after it was sent.
    #[must_use]
    pub fn is_edited(&self) -> bool {
        self.last_edited_date_time
            .as_deref()
            .is_some_and(|value| !value.is_empty())
    }

    /// Non-empty body markup, if any.
    #[must_use]
    pub fn body_content(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|body| body.content.as_deref())
            .filter(|content| !content.is_empty())
    }

    /// Body markup when the body is HTML.
    #[must_use]
    pub fn html_body(&self) -> Option<&str> {
        self.body
            .as_ref()
            .filter(|body| body.is_html())
            .and_then(|body| body.content.as_deref())
    }

    /// Display name of the sender, when Graph reports one.
    #[must_use]
    pub fn sender_name(&self) -> Option<&str> {
        self.from.as_ref().and_then(identity_display_name)
    }

    #[must_use]
    pub fn attachment(&self, id: &str) -> Option<&Attachment> {
        self.attachments.iter().find(|attachment| attachment.id == id)
    }
}
