use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::domain::message::{Header, MessageDetail, MessageId};
use crate::error::{ApiFailure, ConfigError};

/// One page of a message listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePage {
    pub ids: Vec<MessageId>,
    pub next_page_token: Option<String>,
}

/// The two remote operations the tool consumes.
#[cfg_attr(test, mockall::automock)]
pub trait MailApi {
    fn list_page(&self, query: &str, page_token: Option<String>)
    -> Result<MessagePage, ApiFailure>;

    fn get_message(&self, id: &str) -> Result<MessageDetail, ApiFailure>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListMessagesResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Deserialize)]
struct GmailMessage {
    id: String,
    #[serde(default)]
    snippet: String,
    payload: Option<Payload>,
}

#[derive(Deserialize)]
struct Payload {
    #[serde(default)]
    headers: Vec<WireHeader>,
}

#[derive(Deserialize)]
struct WireHeader {
    name: String,
    value: String,
}

impl From<GmailMessage> for MessageDetail {
    fn from(m: GmailMessage) -> Self {
        let headers = m
            .payload
            .map(|p| {
                p.headers
                    .into_iter()
                    .map(|h| Header::new(h.name, h.value))
                    .collect()
            })
            .unwrap_or_default();
        MessageDetail {
            id: m.id,
            headers,
            snippet: m.snippet,
        }
    }
}

/// Blocking Gmail client authenticated with a bearer token.
pub struct GmailApi {
    http: Client,
    messages_url: Url,
    access_token: String,
}

impl GmailApi {
    pub fn new(
        base_url: &str,
        user_id: &str,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> crate::error::Result<Self> {
        let invalid = |source: url::ParseError| ConfigError::InvalidUrl {
            url: base_url.to_string(),
            source,
        };
        let mut messages_url = Url::parse(base_url).map_err(invalid)?;
        match messages_url.path_segments_mut() {
            Ok(mut segs) => {
                segs.pop_if_empty().extend(["users", user_id, "messages"]);
            }
            Err(()) => return Err(invalid(url::ParseError::RelativeUrlWithCannotBeABaseBase).into()),
        }

        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            messages_url,
            access_token: access_token.into(),
        })
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        params: &[(&str, &str)],
    ) -> Result<T, ApiFailure> {
        log::debug!("GET {url}");
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .query(params)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(ApiFailure::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = resp.text()?;
        serde_json::from_str(&text).map_err(|e| ApiFailure::Decode(e.to_string()))
    }
}

impl MailApi for GmailApi {
    fn list_page(
        &self,
        query: &str,
        page_token: Option<String>,
    ) -> Result<MessagePage, ApiFailure> {
        let mut params = Vec::new();
        if !query.is_empty() {
            params.push(("q", query));
        }
        if let Some(token) = page_token.as_deref() {
            params.push(("pageToken", token));
        }

        let resp: ListMessagesResponse = self.get_json(self.messages_url.clone(), &params)?;
        Ok(MessagePage {
            ids: resp.messages.into_iter().map(|m| m.id).collect(),
            next_page_token: resp.next_page_token,
        })
    }

    fn get_message(&self, id: &str) -> Result<MessageDetail, ApiFailure> {
        let mut url = self.messages_url.clone();
        if let Ok(mut segs) = url.path_segments_mut() {
            segs.push(id);
        }
        let msg: GmailMessage = self.get_json(url, &[("format", "full")])?;
        Ok(msg.into())
    }
}
