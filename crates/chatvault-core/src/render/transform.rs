//! Message body transformation.
//!
//! Stages run in a fixed order, each on the output of the previous one:
//! paragraph wrapping, emoji replacement, attachment placeholder expansion,
//! and inlining of hosted-content images as data URIs.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::hosted::{extract_id, extract_ids_from_body, load_hosted_content};
use crate::markup::{hosted_content_id_from_url, replace_attachments, replace_emoji, replace_src};
use crate::models::{Attachment, AttachmentKind, HostedContent, HostedContentId, Message, NO_NAME};
use crate::store::ArchiveStore;
use crate::util::escape_html;
use crate::{Error, Result};

/// Stored blobs a message refers to; `None` when nothing was ever stored.
type Blobs = HashMap<HostedContentId, Option<HostedContent>>;

/// Rewrites stored message bodies into self-contained HTML fragments.
pub struct BodyTransformer<'a> {
    store: &'a ArchiveStore,
    endpoint_prefix: String,
}

impl<'a> BodyTransformer<'a> {
    pub fn new(store: &'a ArchiveStore, endpoint_prefix: impl Into<String>) -> Self {
        Self {
            store,
            endpoint_prefix: endpoint_prefix.into(),
        }
    }

    /// Transform a message body, or `None` when the body is empty.
    pub async fn transform(&self, conversation_id: &str, message: &Message) -> Result<Option<String>> {
        let Some(content) = message.body_content() else {
            return Ok(None);
        };
        let blobs = self.load_blobs(conversation_id, message, content).await?;

        let fragment = if message.html_body().is_some() {
            content.to_string()
        } else {
            escape_html(content)
        };
        let fragment = wrap_paragraph(fragment);
        let fragment = replace_emoji(&fragment);
        let fragment = replace_attachments(&fragment, |attachment_id| {
            render_attachment(message, attachment_id, &blobs)
        });
        let fragment = replace_src(&fragment, |attribute, url| {
            render_src(attribute, url, &self.endpoint_prefix, &blobs)
        });
        Ok(Some(fragment))
    }

    async fn load_blobs(&self, conversation_id: &str, message: &Message, body: &str) -> Result<Blobs> {
        let mut content_ids = message
            .attachments
            .iter()
            .filter(|attachment| attachment.kind() == AttachmentKind::CodeSnippet)
            .filter_map(|attachment| extract_id(attachment).ok())
            .collect::<Vec<_>>();
        content_ids.extend(extract_ids_from_body(body, &self.endpoint_prefix));

        let mut blobs = Blobs::new();
        for content_id in content_ids {
            if blobs.contains_key(&content_id) {
                continue;
            }
            let blob =
                match load_hosted_content(self.store, conversation_id, &message.id, &content_id).await {
                    Ok(blob) => Some(blob),
                    Err(Error::Io(error)) if error.kind() == std::io::ErrorKind::NotFound => {
                        tracing::debug!(
                            "Hosted content {} of message {} was never downloaded",
                            content_id,
                            message.id
                        );
                        None
                    }
                    Err(error) => return Err(error),
                };
            blobs.insert(content_id, blob);
        }
        Ok(blobs)
    }
}

fn wrap_paragraph(fragment: String) -> String {
    let wrapped = fragment
        .get(..3)
        .is_some_and(|start| start.eq_ignore_ascii_case("<p>"));
    if wrapped {
        fragment
    } else {
        format!("<p>{fragment}</p>")
    }
}

fn render_attachment(message: &Message, attachment_id: &str, blobs: &Blobs) -> String {
    let Some(attachment) = message.attachment(attachment_id) else {
        tracing::warn!(
            "Message {} references unknown attachment {}",
            message.id,
            attachment_id
        );
        return format!(
            "<span class='missing-attachment' data-attachment-id='{}'>[missing attachment]</span>",
            escape_html(attachment_id)
        );
    };
    let id = escape_html(&attachment.id);

    match attachment.kind() {
        AttachmentKind::Reference => format!(
            "Attachment: <a href='{}' data-attachment-id='{id}'>{}</a><br/>",
            escape_html(attachment.content_url.as_deref().unwrap_or_default()),
            escape_html(attachment.name.as_deref().unwrap_or_default()),
        ),
        AttachmentKind::MessageReference => match attachment.message_reference() {
            Ok(reference) => format!(
                "<blockquote class='message-reference' data-attachment-id='{id}'>{}: {}</blockquote>",
                escape_html(reference.sender_name().unwrap_or(NO_NAME)),
                escape_html(reference.message_preview.as_deref().unwrap_or_default()),
            ),
            Err(error) => {
                tracing::warn!("Unreadable message reference {}: {}", attachment.id, error);
                render_raw(attachment)
            }
        },
        AttachmentKind::CodeSnippet => match extract_id(attachment) {
            Ok(content_id) => render_code_snippet(&id, &content_id, blobs),
            Err(error) => {
                tracing::warn!("Unreadable code snippet {}: {}", attachment.id, error);
                render_raw(attachment)
            }
        },
        AttachmentKind::Other => render_raw(attachment),
    }
}

fn render_code_snippet(escaped_id: &str, content_id: &HostedContentId, blobs: &Blobs) -> String {
    let inner = match blobs.get(content_id).and_then(Option::as_ref) {
        Some(HostedContent::Bytes(bytes)) => format!(
            "<pre><code>{}</code></pre>",
            escape_html(&String::from_utf8_lossy(bytes))
        ),
        Some(HostedContent::Failed(description)) => format!(
            "<span class='hosted-content-error'>[hosted content unavailable: {}]</span>",
            escape_html(description)
        ),
        None => "<span class='hosted-content-error'>[hosted content not downloaded]</span>"
            .to_string(),
    };
    format!(
        "<div class='hosted-content' data-attachment-id='{escaped_id}' data-hosted-content-id='{}'>{inner}</div>",
        escape_html(content_id.as_str())
    )
}

fn render_raw(attachment: &Attachment) -> String {
    let dump = serde_json::to_string_pretty(attachment).unwrap_or_else(|error| error.to_string());
    format!(
        "Attachment (raw data): <pre>{}</pre><br/>",
        escape_html(&dump)
    )
}

fn render_src(attribute: &str, url: &str, endpoint_prefix: &str, blobs: &Blobs) -> String {
    let Some(content_id) = hosted_content_id_from_url(url, endpoint_prefix) else {
        return attribute.to_string();
    };
    let escaped_id = escape_html(content_id.as_str());

    match blobs.get(&content_id).and_then(Option::as_ref) {
        Some(HostedContent::Bytes(bytes)) => format!(
            "src=\"data:{};base64,{}\" data-hosted-content-id='{escaped_id}'",
            sniff_image_mime(bytes),
            STANDARD.encode(bytes)
        ),
        Some(HostedContent::Failed(description)) => format!(
            "{attribute} data-hosted-content-id='{escaped_id}' data-hosted-content-error='{}'",
            escape_html(description)
        ),
        None => attribute.to_string(),
    }
}

/// MIME type of an image from its leading bytes; unknown data is labelled PNG.
#[must_use]
pub fn sniff_image_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if bytes.starts_with(b"\xff\xd8\xff") {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        "image/gif"
    } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else if bytes.starts_with(b"BM") {
        "image/bmp"
    } else {
        "image/png"
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use tempfile::tempdir;

    use super::*;
    use crate::models::CODE_SNIPPET_CONTENT_TYPE;
    use crate::store::StoreKey;

    const PREFIX: &str = "https://graph.microsoft.com/v1.0/chats/";
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nrest-of-image";

    fn message(body: &str, attachments: Value) -> Message {
        serde_json::from_value(json!({
            "id": "100",
            "body": {"contentType": "html", "content": body},
            "attachments": attachments,
        }))
        .unwrap()
    }

    fn image_url(content_id: &str) -> String {
        format!("{PREFIX}c1/messages/100/hostedContents/{content_id}/$value")
    }

    async fn store_blob(store: &ArchiveStore, content_id: &str, bytes: &[u8]) {
        let content_id = HostedContentId::new(content_id);
        store
            .write_bytes(
                &StoreKey::HostedContent {
                    conversation_id: "c1",
                    message_id: "100",
                    content_id: &content_id,
                },
                bytes,
            )
            .await
            .unwrap();
    }

    async fn transform(store: &ArchiveStore, message: &Message) -> Option<String> {
        BodyTransformer::new(store, PREFIX)
            .transform("c1", message)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn empty_body_renders_nothing() {
        let dir = tempdir().unwrap();
        let store = ArchiveStore::new(dir.path());
        assert_eq!(transform(&store, &message("", json!([]))).await, None);

        let no_body: Message = serde_json::from_value(json!({"id": "1"})).unwrap();
        assert_eq!(transform(&store, &no_body).await, None);
    }

    #[tokio::test]
    async fn wraps_paragraph_once_and_replaces_emoji() {
        let dir = tempdir().unwrap();
        let store = ArchiveStore::new(dir.path());

        let body = r#"nice <emoji id="1f44d" alt="👍" title="Like"></emoji>"#;
        assert_eq!(
            transform(&store, &message(body, json!([]))).await.as_deref(),
            Some("<p>nice 👍</p>")
        );
        assert_eq!(
            transform(&store, &message("<P>already</P>", json!([]))).await.as_deref(),
            Some("<P>already</P>")
        );
    }

    #[tokio::test]
    async fn text_bodies_are_escaped() {
        let dir = tempdir().unwrap();
        let store = ArchiveStore::new(dir.path());
        let message: Message = serde_json::from_value(json!({
            "id": "100",
            "body": {"contentType": "text", "content": "a < b"},
        }))
        .unwrap();
        assert_eq!(transform(&store, &message).await.as_deref(), Some("<p>a &lt; b</p>"));
    }

    #[tokio::test]
    async fn attachment_variants_render_in_place() {
        let dir = tempdir().unwrap();
        let store = ArchiveStore::new(dir.path());
        store_blob(&store, "Y29kZQ==", b"if a < b {}").await;

        let body = concat!(
            r#"<p><attachment id="ref"></attachment>"#,
            r#"<attachment id="quote"></attachment>"#,
            r#"<attachment id="code"></attachment></p>"#,
        );
        let attachments = json!([
            {"id": "ref", "contentType": "reference", "contentUrl": "https://files/x.docx", "name": "x.docx"},
            {
                "id": "quote",
                "contentType": "messageReference",
                "content": json!({
                    "messageId": "90",
                    "messagePreview": "earlier words",
                    "messageSender": {"user": {"displayName": "Ada"}},
                }).to_string(),
            },
            {
                "id": "code",
                "contentType": CODE_SNIPPET_CONTENT_TYPE,
                "content": json!({"codeSnippetUrl": image_url("Y29kZQ==")}).to_string(),
            },
        ]);

        let html = transform(&store, &message(body, attachments)).await.unwrap();
        assert_eq!(
            html,
            concat!(
                "<p>Attachment: <a href='https://files/x.docx' data-attachment-id='ref'>x.docx</a><br/>",
                "<blockquote class='message-reference' data-attachment-id='quote'>Ada: earlier words</blockquote>",
                "<div class='hosted-content' data-attachment-id='code' data-hosted-content-id='Y29kZQ=='>",
                "<pre><code>if a &lt; b {}</code></pre></div></p>",
            )
        );
    }

    #[tokio::test]
    async fn unknown_attachment_kind_is_dumped() {
        let dir = tempdir().unwrap();
        let store = ArchiveStore::new(dir.path());
        let attachments = json!([{"id": "card", "contentType": "application/vnd.microsoft.card.adaptive"}]);

        let html = transform(&store, &message(r#"<attachment id="card"></attachment>"#, attachments))
            .await
            .unwrap();
        assert!(html.starts_with("<p>Attachment (raw data): <pre>{"));
        assert!(html.contains("&quot;application/vnd.microsoft.card.adaptive&quot;"));
        assert!(html.ends_with("</pre><br/></p>"));
    }

    #[tokio::test]
    async fn missing_attachment_renders_stable_marker() {
        let dir = tempdir().unwrap();
        let store = ArchiveStore::new(dir.path());
        let message = message(r#"<attachment id="gone"></attachment>"#, json!([]));

        let first = transform(&store, &message).await;
        let second = transform(&store, &message).await;
        assert_eq!(
            first.as_deref(),
            Some("<p><span class='missing-attachment' data-attachment-id='gone'>[missing attachment]</span></p>")
        );
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn hosted_images_are_inlined_and_decode_to_stored_bytes() {
        let dir = tempdir().unwrap();
        let store = ArchiveStore::new(dir.path());
        store_blob(&store, "aW1n", PNG).await;

        let body = format!(r#"<p><img src="{}" alt="pic"></p>"#, image_url("aW1n"));
        let html = transform(&store, &message(&body, json!([]))).await.unwrap();

        let prefix = "<p><img src=\"data:image/png;base64,";
        assert!(html.starts_with(prefix));
        let rest = &html[prefix.len()..];
        let encoded = &rest[..rest.find('"').unwrap()];
        assert_eq!(STANDARD.decode(encoded).unwrap(), PNG.to_vec());
        assert!(html.ends_with(r#"" data-hosted-content-id='aW1n' alt="pic"></p>"#));
    }

    #[tokio::test]
    async fn foreign_and_undownloaded_images_are_left_alone() {
        let dir = tempdir().unwrap();
        let store = ArchiveStore::new(dir.path());
        let body = format!(
            r#"<p><img src="https://cdn.example.com/a/b.png"><img src="{}"></p>"#,
            image_url("bm90aGVyZQ==")
        );

        let html = transform(&store, &message(&body, json!([]))).await.unwrap();
        assert_eq!(html, body);
    }

    #[tokio::test]
    async fn failed_images_carry_the_failure() {
        let dir = tempdir().unwrap();
        let store = ArchiveStore::new(dir.path());
        let content_id = HostedContentId::new("YmFk");
        let key = StoreKey::HostedContent {
            conversation_id: "c1",
            message_id: "100",
            content_id: &content_id,
        };
        store.write_bytes(&key, b"Forbidden").await.unwrap();
        store
            .set_hosted_content_failure(&key, Some("Forbidden"))
            .await
            .unwrap();

        let url = image_url("YmFk");
        let body = format!(r#"<p><img src="{url}"></p>"#);
        let html = transform(&store, &message(&body, json!([]))).await.unwrap();
        assert_eq!(
            html,
            format!(
                r#"<p><img src="{url}" data-hosted-content-id='YmFk' data-hosted-content-error='Forbidden'></p>"#
            )
        );
    }

    #[test]
    fn sniffs_common_image_types() {
        assert_eq!(sniff_image_mime(PNG), "image/png");
        assert_eq!(sniff_image_mime(b"\xff\xd8\xff\xe0rest"), "image/jpeg");
        assert_eq!(sniff_image_mime(b"GIF89a..."), "image/gif");
        assert_eq!(sniff_image_mime(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(sniff_image_mime(b"unknown"), "image/png");
    }
}
