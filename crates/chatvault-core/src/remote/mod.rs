//! Remote conversation source.
//!
//! The archive only needs three things from the remote side: paginated JSON
//! listings, the URLs of the two listings it walks, and raw hosted-content
//! bytes. [`ChatSource`] is that seam; [`GraphClient`] implements it over
//! Microsoft Graph.

#[cfg(test)]
pub(crate) mod fake;
mod graph;
mod pagination;

use std::future::Future;

pub use graph::GraphClient;
pub use pagination::{Page, PageCursor, PageSource};

use crate::models::HostedContentId;
use crate::Result;

/// Operations the synchronizer needs from the remote chat service.
pub trait ChatSource: PageSource {
    /// First page of the conversation listing, with members and last-message preview.
    fn chats_url(&self) -> String;

    /// First page of a conversation's message feed (newest first).
    fn messages_url(&self, conversation_id: &str) -> String;

    /// Raw bytes of one hosted content blob.
    fn fetch_hosted_content(
        &self,
        conversation_id: &str,
        message_id: &str,
        content_id: &HostedContentId,
    ) -> impl Future<Output = Result<Vec<u8>>>;
}
