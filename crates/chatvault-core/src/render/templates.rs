//! Document layout for conversation pages and the index.

use std::fmt::Write as _;

use chrono::DateTime;
use chrono_tz::Tz;

use super::archive::IndexEntry;
use crate::config::DEFAULT_TIMEZONE;
use crate::models::{Conversation, Message, NO_NAME};
use crate::util::escape_html;

/// `strftime` pattern used for message timestamps.
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %I:%M %p %Z";

pub const DEFAULT_STYLESHEET: &str = "\
body { font-family: sans-serif; margin: 2em auto; max-width: 60em; color: #222; }
h1 { font-size: 1.4em; }
.members { color: #666; }
.message { border-top: 1px solid #ddd; padding: 0.5em 0; }
.message-meta { font-size: 0.85em; color: #555; }
.sender { font-weight: bold; }
.edited, .deleted { font-style: italic; color: #888; }
.message-reference { border-left: 3px solid #ccc; margin: 0.5em 0; padding-left: 0.5em; color: #555; }
.hosted-content pre { background: #f6f6f6; padding: 0.5em; overflow-x: auto; }
.missing-attachment, .hosted-content-error { color: #a00; }
img { max-width: 100%; }
";

/// One message ready for layout: the stored record plus its transformed body.
#[derive(Debug, Clone, Copy)]
pub struct RenderedMessage<'a> {
    pub message: &'a Message,
    pub content: Option<&'a str>,
}

/// Page templates, built once and shared by every rendered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    stylesheet: String,
    timezone: Tz,
}

impl Default for Templates {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEZONE)
    }
}

impl Templates {
    #[must_use]
    pub fn new(timezone: Tz) -> Self {
        Self {
            stylesheet: DEFAULT_STYLESHEET.to_string(),
            timezone,
        }
    }

    #[must_use]
    pub fn with_stylesheet(mut self, stylesheet: impl Into<String>) -> Self {
        self.stylesheet = stylesheet.into();
        self
    }

    /// Format an RFC 3339 timestamp in the display time zone.
    ///
    /// Unparseable values are returned unchanged.
    #[must_use]
    pub fn localdt(&self, value: &str) -> String {
        match DateTime::parse_from_rfc3339(value) {
            Ok(parsed) => parsed
                .with_timezone(&self.timezone)
                .format(TIMESTAMP_FORMAT)
                .to_string(),
            Err(_) => value.to_string(),
        }
    }

    /// Full HTML document for one conversation.
    #[must_use]
    pub fn render_conversation(
        &self,
        conversation: &Conversation,
        messages: &[RenderedMessage<'_>],
    ) -> String {
        let title = escape_html(&conversation.display_name());
        let mut output = String::new();
        self.write_head(&mut output, &title);
        let _ = writeln!(output, "<h1>{title}</h1>");
        let _ = writeln!(
            output,
            "<p class='members'>{}</p>",
            escape_html(&conversation.member_list())
        );
        let _ = writeln!(output, "<p><a href='index.html'>All chats</a></p>");

        for rendered in messages {
            self.write_message(&mut output, rendered);
        }

        output.push_str("</body>\n</html>\n");
        output
    }

    /// Index document listing every conversation in the given order.
    #[must_use]
    pub fn render_index(&self, entries: &[IndexEntry]) -> String {
        let mut output = String::new();
        self.write_head(&mut output, "Chats");
        let _ = writeln!(output, "<h1>Chats</h1>");
        let _ = writeln!(output, "<ul>");
        for entry in entries {
            let _ = writeln!(
                output,
                "<li><a href='{}'>{}</a></li>",
                escape_html(&entry.file_name),
                escape_html(&entry.display_name)
            );
        }
        let _ = writeln!(output, "</ul>");
        output.push_str("</body>\n</html>\n");
        output
    }

    fn write_head(&self, output: &mut String, escaped_title: &str) {
        let _ = writeln!(output, "<!DOCTYPE html>");
        let _ = writeln!(output, "<html>");
        let _ = writeln!(output, "<head>");
        let _ = writeln!(output, "<meta charset='utf-8'>");
        let _ = writeln!(output, "<title>{escaped_title}</title>");
        let _ = writeln!(output, "<style>\n{}</style>", self.stylesheet);
        let _ = writeln!(output, "</head>");
        let _ = writeln!(output, "<body>");
    }

    fn write_message(&self, output: &mut String, rendered: &RenderedMessage<'_>) {
        let message = rendered.message;
        let timestamp = message
            .created_date_time
            .as_deref()
            .map(|value| self.localdt(value))
            .unwrap_or_default();

        let _ = writeln!(
            output,
            "<div class='message' id='msg-{}'>",
            escape_html(&message.id)
        );
        let _ = write!(
            output,
            "<div class='message-meta'><span class='sender'>{}</span> <span class='timestamp'>{}</span>",
            escape_html(message.sender_name().unwrap_or(NO_NAME)),
            escape_html(&timestamp)
        );
        if message.is_edited() {
            output.push_str(" <span class='edited'>(edited)</span>");
        }
        if message.is_tombstoned() {
            output.push_str(" <span class='deleted'>(deleted)</span>");
        }
        output.push_str("</div>\n");
        if let Some(content) = rendered.content {
            let _ = writeln!(output, "<div class='message-body'>{content}</div>");
        }
        output.push_str("</div>\n");
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn localdt_uses_display_time_zone() {
        let templates = Templates::default();
        assert_eq!(
            templates.localdt("2024-01-15T18:30:00.123Z"),
            "01/15/2024 10:30 AM PST"
        );
        assert_eq!(
            Templates::new(chrono_tz::UTC).localdt("2024-07-04T00:05:00Z"),
            "07/04/2024 12:05 AM UTC"
        );
        assert_eq!(templates.localdt("not a time"), "not a time");
    }

    #[test]
    fn conversation_page_marks_edits_and_deletions() {
        let conversation: Conversation = serde_json::from_value(json!({
            "id": "c1",
            "topic": "Ops <team>",
            "members": [{"displayName": "Bo"}, {"displayName": "Ada"}],
        }))
        .unwrap();
        let edited: Message = serde_json::from_value(json!({
            "id": "100",
            "createdDateTime": "2024-01-15T18:30:00Z",
            "lastEditedDateTime": "2024-01-15T18:31:00Z",
            "from": {"user": {"displayName": "Ada"}},
        }))
        .unwrap();
        let deleted: Message = serde_json::from_value(json!({
            "id": "200",
            "deletedDateTime": "2024-01-16T00:00:00Z",
        }))
        .unwrap();

        let page = Templates::default().with_stylesheet("p {}").render_conversation(
            &conversation,
            &[
                RenderedMessage {
                    message: &edited,
                    content: Some("<p>hello</p>"),
                },
                RenderedMessage {
                    message: &deleted,
                    content: None,
                },
            ],
        );

        assert!(page.contains("<title>Ops &lt;team&gt;</title>"));
        assert!(page.contains("<style>\np {}</style>"));
        assert!(page.contains("<p class='members'>Ada, Bo</p>"));
        assert!(page.contains(
            "<span class='sender'>Ada</span> <span class='timestamp'>01/15/2024 10:30 AM PST</span> <span class='edited'>(edited)</span></div>"
        ));
        assert!(page.contains("<div class='message-body'><p>hello</p></div>"));
        assert!(page.contains(
            "<span class='sender'>No Name</span> <span class='timestamp'></span> <span class='deleted'>(deleted)</span></div>"
        ));
        assert!(page.ends_with("</body>\n</html>\n"));
    }

    #[test]
    fn index_lists_entries_in_given_order() {
        let entries = vec![
            IndexEntry {
                file_name: "b.html".to_string(),
                display_name: "Beta".to_string(),
            },
            IndexEntry {
                file_name: "a.html".to_string(),
                display_name: "Alpha & co".to_string(),
            },
        ];
        let index = Templates::default().render_index(&entries);
        let beta = index.find("<li><a href='b.html'>Beta</a></li>").unwrap();
        let alpha = index.find("<li><a href='a.html'>Alpha &amp; co</a></li>").unwrap();
        assert!(beta < alpha);
    }
}
