use crate::auth::token_store::TokenRecord;
use crate::config::Settings;
use crate::domain::message::{MessageDetail, MessageId};
use crate::error::{RemoteError, Result};
use crate::mail::gmail_api::{GmailApi, MailApi};

/// Result of fetching details for a batch of ids.
#[derive(Debug, Default)]
pub struct BatchDetails {
    pub details: Vec<MessageDetail>,
    pub failures: Vec<RemoteError>,
}

/// Authenticated handle over the mail API.
pub struct Session<A: MailApi = GmailApi> {
    api: A,
}

impl Session<GmailApi> {
    pub fn connect(settings: &Settings, token: &TokenRecord) -> Result<Self> {
        let api = GmailApi::new(
            &settings.api_base_url,
            &settings.user_id,
            token.access_token.clone(),
            settings.request_timeout(),
        )?;
        Ok(Self::new(api))
    }
}

impl<A: MailApi> Session<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Every id matching `query`, following continuation tokens to the end.
    /// An empty query matches all messages.
    pub fn list_message_ids(&self, query: &str) -> std::result::Result<Vec<MessageId>, RemoteError> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .api
                .list_page(query, page_token.take())
                .map_err(|source| RemoteError::List {
                    query: query.to_string(),
                    source,
                })?;
            pages += 1;
            ids.extend(page.ids);

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        log::debug!("query {query:?}: {} ids over {pages} page(s)", ids.len());
        Ok(ids)
    }

    pub fn get_message_detail(&self, id: &str) -> std::result::Result<MessageDetail, RemoteError> {
        self.api.get_message(id).map_err(|source| RemoteError::Get {
            id: id.to_string(),
            source,
        })
    }

    /// Fetch each id in turn. A failure is logged and recorded; the rest still run.
    pub fn fetch_details(&self, ids: &[MessageId]) -> BatchDetails {
        let mut out = BatchDetails::default();
        for id in ids {
            match self.get_message_detail(id) {
                Ok(detail) => out.details.push(detail),
                Err(e) => {
                    log::warn!("{e}");
                    out.failures.push(e);
                }
            }
        }
        out
    }
}
