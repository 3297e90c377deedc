//! Attachment model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::identity_display_name;
use crate::{Error, Result};

/// `contentType` of code-snippet cards whose payload lives in hosted content.
pub const CODE_SNIPPET_CONTENT_TYPE: &str = "application/vnd.microsoft.card.codesnippet";

/// An attachment on a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Identifier, unique within the owning message
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub content_url: Option<String>,
    /// Kind-specific payload, usually a JSON document encoded as a string
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The attachment variants the renderer knows how to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    /// Link to an external file (`reference`)
    Reference,
    /// Quote of another message (`messageReference`)
    MessageReference,
    /// Code snippet stored as hosted content
    CodeSnippet,
    Other,
}

/// Decoded payload of a `messageReference` attachment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReference {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub message_preview: Option<String>,
    #[serde(default)]
    pub message_sender: Option<Value>,
}

impl MessageReference {
    #[must_use]
    pub fn sender_name(&self) -> Option<&str> {
        self.message_sender.as_ref().and_then(identity_display_name)
    }
}

impl Attachment {
    #[must_use]
    pub fn kind(&self) -> AttachmentKind {
        match self.content_type.as_deref() {
            Some("reference") => AttachmentKind::Reference,
            Some("messageReference") => AttachmentKind::MessageReference,
            Some(CODE_SNIPPET_CONTENT_TYPE) => AttachmentKind::CodeSnippet,
            _ => AttachmentKind::Other,
        }
    }

    /// Parse the JSON-encoded `content` payload.
    pub fn content_json<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        let content = self.content.as_deref().ok_or_else(|| {
            Error::InvalidRecord(format!("attachment {} has no content payload", self.id))
        })?;
        Ok(serde_json::from_str(content)?)
    }

    pub fn message_reference(&self) -> Result<MessageReference> {
        self.content_json()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn attachment(value: Value) -> Attachment {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn kind_follows_content_type() {
        let cases = [
            ("reference", AttachmentKind::Reference),
            ("messageReference", AttachmentKind::MessageReference),
            (CODE_SNIPPET_CONTENT_TYPE, AttachmentKind::CodeSnippet),
            ("application/vnd.microsoft.card.adaptive", AttachmentKind::Other),
        ];
        for (content_type, expected) in cases {
            let item = attachment(json!({"id": "a", "contentType": content_type}));
            assert_eq!(item.kind(), expected, "{content_type}");
        }
        assert_eq!(attachment(json!({"id": "a"})).kind(), AttachmentKind::Other);
    }

    #[test]
    fn message_reference_decodes_payload() {
        let content = json!({
            "messageId": "1700",
            "messagePreview": "see above",
            "messageSender": {"user": {"displayName": "Ann"}},
        })
        .to_string();
        let item = attachment(json!({
            "id": "1700",
            "contentType": "messageReference",
            "content": content,
        }));

        let reference = item.message_reference().unwrap();
        assert_eq!(reference.message_preview.as_deref(), Some("see above"));
        assert_eq!(reference.sender_name(), Some("Ann"));
    }

    #[test]
    fn content_json_requires_payload() {
        let item = attachment(json!({"id": "a", "contentType": "messageReference"}));
        assert!(matches!(
            item.message_reference(),
            Err(Error::InvalidRecord(_))
        ));
    }
}
