//! Microsoft Graph chat client.

use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{ChatSource, Page, PageSource};
use crate::config::ArchiveConfig;
use crate::models::HostedContentId;
use crate::util::{compact_text, is_http_url};
use crate::{Error, Result};

/// HTTP client for the Graph chat endpoints used by the archive.
#[derive(Clone)]
pub struct GraphClient {
    base_url: String,
    access_token: String,
    page_size: u32,
    client: Client,
}

impl std::fmt::Debug for GraphClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("GraphClient")
            .field("base_url", &self.base_url)
            .field("access_token", &"[REDACTED]")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl GraphClient {
    /// Build a client from archive configuration; requires an access token.
    pub fn new(config: &ArchiveConfig) -> Result<Self> {
        let access_token = config.require_access_token()?.to_string();
        let base_url = config.graph_base_url.trim_end_matches('/').to_string();
        if !is_http_url(&base_url) {
            return Err(Error::Configuration(
                "Graph base URL must include http:// or https://".to_string(),
            ));
        }

        let client = Client::builder().timeout(config.http_timeout).build()?;

        Ok(Self {
            base_url,
            access_token,
            page_size: config.page_size,
            client,
        })
    }

    async fn get(&self, url: &str, accept: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .header(ACCEPT, accept)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Remote(parse_api_error(status, &body)));
        }

        Ok(response)
    }
}

impl PageSource for GraphClient {
    async fn fetch_page(&self, url: &str) -> Result<Option<Page>> {
        let response = self.get(url, "application/json").await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body = response.text().await?;
        parse_page(&body)
    }
}

impl ChatSource for GraphClient {
    fn chats_url(&self) -> String {
        format!(
            "{}/me/chats?$expand=members,lastMessagePreview&$top={}",
            self.base_url, self.page_size
        )
    }

    fn messages_url(&self, conversation_id: &str) -> String {
        format!(
            "{}/me/chats/{}/messages?$top={}",
            self.base_url,
            urlencoding::encode(conversation_id),
            self.page_size
        )
    }

    async fn fetch_hosted_content(
        &self,
        conversation_id: &str,
        message_id: &str,
        content_id: &HostedContentId,
    ) -> Result<Vec<u8>> {
        let url = hosted_content_url(&self.base_url, conversation_id, message_id, content_id);
        let response = self.get(&url, "*/*").await?;
        Ok(response.bytes().await?.to_vec())
    }
}

fn hosted_content_url(
    base_url: &str,
    conversation_id: &str,
    message_id: &str,
    content_id: &HostedContentId,
) -> String {
    format!(
        "{base_url}/chats/{}/messages/{}/hostedContents/{}/$value",
        urlencoding::encode(conversation_id),
        urlencoding::encode(message_id),
        urlencoding::encode(content_id.as_str()),
    )
}

fn parse_page(body: &str) -> Result<Option<Page>> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(body)?))
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    error: Option<GraphErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(GraphErrorBody {
        error: Some(detail),
    }) = serde_json::from_str::<GraphErrorBody>(body)
    {
        match (detail.code, detail.message) {
            (Some(code), Some(message)) => {
                return format!("{code}: {} ({})", message.trim(), status.as_u16());
            }
            (None, Some(message)) | (Some(message), None) => {
                return format!("{} ({})", message.trim(), status.as_u16());
            }
            (None, None) => {}
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}
