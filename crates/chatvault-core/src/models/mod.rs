//! Data models for archived chats
//!
//! Records mirror the Graph JSON shape. Fields the archive does not interpret
//! are kept in a flattened `extra` map so snapshots round-trip unchanged.

mod attachment;
mod conversation;
mod hosted_content;
mod message;

pub use attachment::{Attachment, AttachmentKind, MessageReference, CODE_SNIPPET_CONTENT_TYPE};
pub use conversation::{Conversation, Member, MessagePreview, NO_NAME};
pub use hosted_content::{HostedContent, HostedContentId};
pub use message::{Message, MessageBody, RevisionMarkers};

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize `null` the same way as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Display name of a Graph identity set (`{"user": {"displayName": ...}}`).
fn identity_display_name(identity: &Value) -> Option<&str> {
    ["user", "application", "device"]
        .iter()
        .filter_map(|kind| identity.get(kind))
        .filter_map(|entry| entry.get("displayName"))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|name| !name.is_empty())
}
