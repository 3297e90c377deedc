//! In-memory chat source for tests.

use std::cell::RefCell;
use std::collections::HashMap;

use serde_json::Value;

use super::{ChatSource, Page, PageSource};
use crate::models::HostedContentId;
use crate::{Error, Result};

/// Serves canned pages and blobs and records every request it sees.
///
/// Unknown page URLs answer with no page; unknown blobs fail with a 403.
#[derive(Default)]
pub struct FakeChatSource {
    pages: HashMap<String, Page>,
    blobs: HashMap<String, Vec<u8>>,
    pub page_requests: RefCell<Vec<String>>,
    pub content_fetches: RefCell<Vec<String>>,
}

impl FakeChatSource {
    pub fn with_page(mut self, url: &str, records: Vec<Value>, next: Option<&str>) -> Self {
        self.pages.insert(
            url.to_string(),
            Page {
                value: records,
                next_link: next.map(ToString::to_string),
            },
        );
        self
    }

    pub fn with_messages(self, conversation_id: &str, records: Vec<Value>) -> Self {
        let url = self.messages_url(conversation_id);
        self.with_page(&url, records, None)
    }

    pub fn with_blob(mut self, content_id: &str, bytes: &[u8]) -> Self {
        self.blobs.insert(content_id.to_string(), bytes.to_vec());
        self
    }
}

impl PageSource for FakeChatSource {
    async fn fetch_page(&self, url: &str) -> Result<Option<Page>> {
        self.page_requests.borrow_mut().push(url.to_string());
        Ok(self.pages.get(url).cloned())
    }
}

impl ChatSource for FakeChatSource {
    fn chats_url(&self) -> String {
        "me/chats".to_string()
    }

    fn messages_url(&self, conversation_id: &str) -> String {
        format!("me/chats/{conversation_id}/messages")
    }

    async fn fetch_hosted_content(
        &self,
        _conversation_id: &str,
        _message_id: &str,
        content_id: &HostedContentId,
    ) -> Result<Vec<u8>> {
        self.content_fetches
            .borrow_mut()
            .push(content_id.to_string());
        self.blobs
            .get(content_id.as_str())
            .cloned()
            .ok_or_else(|| Error::Remote("Forbidden (403)".to_string()))
    }
}
