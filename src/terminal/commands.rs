use std::io::{BufRead, Write};

use crate::error::{Error, Result};
use crate::mail::gmail_api::MailApi;
use crate::mail::query::SearchFilter;
use crate::mail::session::Session;
use crate::terminal::{self, ui};

pub const INBOX_QUERY: &str = "in:inbox";

/// Print every id matching `query`. A listing failure is returned.
pub fn list_ids<A: MailApi, W: Write>(session: &Session<A>, query: &str, out: &mut W) -> Result<()> {
    let ids = session.list_message_ids(query)?;
    ui::print_ids(out, &ids)?;
    Ok(())
}

/// Show one message. Without an id the inbox is listed and the user asked for one.
///
/// A failed fetch is logged and does not fail the command.
pub fn read_one<A, R, W>(
    session: &Session<A>,
    id: Option<String>,
    input: &mut R,
    out: &mut W,
) -> Result<()>
where
    A: MailApi,
    R: BufRead,
    W: Write,
{
    let id = match id {
        Some(id) => id,
        None => {
            list_ids(session, INBOX_QUERY, out)?;
            terminal::prompt(input, out, "Enter the Email ID to read: ")?
        }
    };
    if id.trim().is_empty() {
        return Err(Error::MissingMessageId);
    }

    match session.get_message_detail(id.trim()) {
        Ok(m) => ui::print_detail(out, &m)?,
        Err(e) => log::error!("{e}"),
    }
    Ok(())
}

/// The filter as given, or prompted field by field when nothing was given.
pub fn resolve_filter<R: BufRead, W: Write>(
    filter: SearchFilter,
    input: &mut R,
    out: &mut W,
) -> Result<SearchFilter> {
    if filter == SearchFilter::default() {
        return Ok(terminal::prompt_filter(input, out)?);
    }
    Ok(filter)
}

/// Details of every message matching `filter`; single failures are skipped.
pub fn list_filtered<A: MailApi, W: Write>(
    session: &Session<A>,
    filter: &SearchFilter,
    out: &mut W,
) -> Result<()> {
    let query = filter.to_query();
    log::info!("searching with {query:?}");

    let ids = session.list_message_ids(&query)?;
    let batch = session.fetch_details(&ids);
    ui::print_batch(out, &batch)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::message::{Header, MessageDetail};
    use crate::error::{ApiFailure, RemoteError};
    use crate::mail::gmail_api::{MessagePage, MockMailApi};
    use std::io::Cursor;

    fn detail(id: &str, subject: &str) -> MessageDetail {
        MessageDetail {
            id: id.to_string(),
            headers: vec![Header::new("Subject", subject)],
            snippet: format!("snippet of {id}"),
        }
    }

    fn not_found() -> ApiFailure {
        ApiFailure::Status {
            status: 404,
            body: "not found".to_string(),
        }
    }

    fn output(out: Vec<u8>) -> String {
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn read_failure_is_reported_not_fatal() {
        let mut api = MockMailApi::new();
        api.expect_get_message().times(1).returning(|_| Err(not_found()));

        let mut out = Vec::new();
        read_one(&Session::new(api), Some("m9".to_string()), &mut Cursor::new(""), &mut out)
            .unwrap();
        assert!(!output(out).contains("Snippet"));
    }

    #[test]
    fn read_without_id_lists_inbox_then_prompts() {
        let mut api = MockMailApi::new();
        api.expect_list_page().times(1).returning(|query, _| {
            assert_eq!(query, INBOX_QUERY);
            Ok(MessagePage {
                ids: vec!["a1".to_string(), "a2".to_string()],
                next_page_token: None,
            })
        });
        api.expect_get_message().times(1).returning(|id| {
            assert_eq!(id, "a2");
            Ok(detail(id, "Lunch"))
        });

        let mut out = Vec::new();
        read_one(&Session::new(api), None, &mut Cursor::new("a2\n"), &mut out).unwrap();

        let text = output(out);
        assert!(text.contains("Email IDs:\na1\na2\n"));
        assert!(text.contains("ID: a2\nSubject: Lunch\nSnippet: snippet of a2\n"));
    }

    #[test]
    fn blank_id_answer_is_an_error() {
        let mut api = MockMailApi::new();
        api.expect_list_page().returning(|_, _| Ok(MessagePage::default()));
        api.expect_get_message().never();

        let err = read_one(&Session::new(api), None, &mut Cursor::new("\n"), &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, Error::MissingMessageId));
    }

    #[test]
    fn listing_failure_is_fatal() {
        let mut api = MockMailApi::new();
        api.expect_list_page().returning(|_, _| Err(not_found()));

        let err = list_ids(&Session::new(api), INBOX_QUERY, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Remote(RemoteError::List { ref query, .. }) if query == INBOX_QUERY));
    }

    #[test]
    fn empty_filter_falls_back_to_prompts() {
        let mut input = Cursor::new("alice@x.com\n\nreport\n\n\n");
        let mut out = Vec::new();

        let filter = resolve_filter(SearchFilter::default(), &mut input, &mut out).unwrap();
        assert_eq!(filter.to_query(), "from:alice@x.com subject:report");
        assert!(output(out).contains("Leave blank to skip"));
    }

    #[test]
    fn given_filter_is_not_prompted() {
        let given = SearchFilter {
            subject: Some("hi".to_string()),
            ..Default::default()
        };
        let mut out = Vec::new();

        let filter = resolve_filter(given.clone(), &mut Cursor::new(""), &mut out).unwrap();
        assert_eq!(filter, given);
        assert!(out.is_empty());
    }

    #[test]
    fn filtered_listing_skips_failed_messages() {
        let mut api = MockMailApi::new();
        api.expect_list_page().times(1).returning(|query, _| {
            assert_eq!(query, "subject:report");
            Ok(MessagePage {
                ids: vec!["m1".to_string(), "m2".to_string(), "m3".to_string()],
                next_page_token: None,
            })
        });
        api.expect_get_message().times(3).returning(|id| {
            if id == "m2" { Err(not_found()) } else { Ok(detail(id, "report")) }
        });

        let filter = SearchFilter {
            subject: Some("report".to_string()),
            ..Default::default()
        };
        let mut out = Vec::new();
        list_filtered(&Session::new(api), &filter, &mut out).unwrap();

        let text = output(out);
        assert!(text.contains("ID: m1"));
        assert!(!text.contains("ID: m2"));
        assert!(text.contains("ID: m3"));
        assert!(text.contains("(1 message(s) could not be fetched)"));
    }
}
