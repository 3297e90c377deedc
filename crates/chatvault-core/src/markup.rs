//! Scanner for the few tag shapes that appear in Graph message bodies.
//!
//! Not an HTML parser. It recognises emoji elements carrying an `alt`
//! attribute, empty `<attachment id="...">` placeholders and `src="..."`
//! attributes.
//! Any literal `src="` in the body is treated as an attribute, including one
//! inside text content; that misreading is a known limitation.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::models::HostedContentId;
use crate::util::second_to_last_segment;

static EMOJI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<emoji.+?alt="(.+?)".+?></emoji>"#).expect("Invalid emoji regex")
});

static ATTACHMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<attachment id="(.+?)"></attachment>"#).expect("Invalid attachment regex")
});

static SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"src="(.+?)""#).expect("Invalid src regex"));

/// Replace emoji elements with their `alt` text.
pub fn replace_emoji(fragment: &str) -> String {
    EMOJI
        .replace_all(fragment, |caps: &Captures<'_>| caps[1].to_string())
        .into_owned()
}

/// Replace each attachment placeholder with `render(attachment_id)`.
pub fn replace_attachments(fragment: &str, mut render: impl FnMut(&str) -> String) -> String {
    ATTACHMENT
        .replace_all(fragment, |caps: &Captures<'_>| render(&caps[1]))
        .into_owned()
}

/// Replace each `src="..."` attribute with `render(whole_attribute, url)`.
pub fn replace_src(fragment: &str, mut render: impl FnMut(&str, &str) -> String) -> String {
    SRC.replace_all(fragment, |caps: &Captures<'_>| render(&caps[0], &caps[1]))
        .into_owned()
}

/// URLs of every `src="..."` attribute, in document order.
pub fn src_urls(fragment: &str) -> impl Iterator<Item = &str> {
    SRC.captures_iter(fragment)
        .filter_map(|caps| caps.get(1))
        .map(|url| url.as_str())
}

/// Hosted-content id of a URL pointing at the chat-content endpoint.
pub fn hosted_content_id_from_url(url: &str, endpoint_prefix: &str) -> Option<HostedContentId> {
    if !url.contains(endpoint_prefix) {
        return None;
    }
    second_to_last_segment(url).map(HostedContentId::new)
}
