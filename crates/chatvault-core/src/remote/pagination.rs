//! Lazy cursor over cursor-paginated JSON listings.

use std::collections::VecDeque;
use std::future::Future;

use serde::Deserialize;
use serde_json::Value;

use crate::Result;

/// One page envelope: `{"value": [...], "@odata.nextLink": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub value: Vec<Value>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

/// Anything that can answer a page request.
pub trait PageSource {
    /// Fetch the page at `url`.
    ///
    /// `Ok(None)` means the remote answered without a page; the cursor treats
    /// that as the end of the listing.
    fn fetch_page(&self, url: &str) -> impl Future<Output = Result<Option<Page>>>;
}

/// Restartable, lazy sequence of records across pages.
///
/// Records are yielded in the order the remote delivers them. No
/// de-duplication happens here: if the listing mutates mid-scan a record may
/// be seen twice.
pub struct PageCursor<'a, S> {
    source: &'a S,
    pending_url: Option<String>,
    buffer: VecDeque<Value>,
    pages_fetched: usize,
}

impl<'a, S: PageSource> PageCursor<'a, S> {
    pub fn new(source: &'a S, initial_url: impl Into<String>) -> Self {
        Self {
            source,
            pending_url: Some(initial_url.into()),
            buffer: VecDeque::new(),
            pages_fetched: 0,
        }
    }

    /// Next raw record, fetching the following page when the current one is drained.
    pub async fn next(&mut self) -> Result<Option<Value>> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Ok(Some(record));
            }

            let Some(url) = self.pending_url.take() else {
                return Ok(None);
            };

            let Some(page) = self.source.fetch_page(&url).await? else {
                tracing::debug!("No response for page {}; ending listing", url);
                return Ok(None);
            };

            self.pages_fetched += 1;
            tracing::debug!(
                "Fetched page {} with {} records",
                self.pages_fetched,
                page.value.len()
            );
            self.pending_url = page.next_link.filter(|link| !link.trim().is_empty());
            self.buffer.extend(page.value);
        }
    }

    /// Number of pages fetched so far.
    pub const fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }
}
