//! Microsoft Graph collaborator.
//!
//! Reads the signed-in user's Junk Email folder and `/me` profile with a
//! caller-supplied bearer token. Token acquisition is out of scope.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::{IdentityService, MailSource, SourceKind, UserProfile};
use crate::config::FetchConfig;
use crate::errors::{Result, SpamOriginError};
use crate::headers;
use crate::records::MailRecord;
use crate::retry::{RetryConfig, RetryExecutor, TransportRetryPolicy};

const SERVICE: &str = "Microsoft Graph";
const SELECT_FIELDS: &str = "sender,subject,receivedDateTime,internetMessageHeaders";
const NO_SUBJECT: &str = "(No Subject)";
const UNKNOWN: &str = "Unknown";

/// One page of `/messages`.
#[derive(Debug, Deserialize)]
pub(crate) struct MessagePage {
    #[serde(default)]
    value: Vec<GraphMessage>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphMessage {
    subject: Option<String>,
    sender: Option<Recipient>,
    received_date_time: Option<DateTime<Utc>>,
    internet_message_headers: Option<Vec<MessageHeader>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Recipient {
    email_address: Option<EmailAddress>,
}

#[derive(Debug, Deserialize)]
struct EmailAddress {
    name: Option<String>,
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageHeader {
    name: String,
    value: String,
}

impl GraphMessage {
    fn into_record(self) -> MailRecord {
        let subject = self
            .subject
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| NO_SUBJECT.to_string());

        let email = self.sender.and_then(|s| s.email_address);
        let (name, address) = match email {
            Some(e) => (e.name, e.address),
            None => (None, None),
        };

        let (spf_domain, dkim_domain) = match &self.internet_message_headers {
            Some(list) => headers::authentication_domains(
                list.iter()
                    .filter(|h| h.name.eq_ignore_ascii_case("authentication-results"))
                    .map(|h| h.value.as_str()),
            ),
            None => (None, None),
        };

        MailRecord {
            subject,
            sender_name: name.unwrap_or_else(|| UNKNOWN.to_string()),
            sender_address: address.unwrap_or_else(|| UNKNOWN.to_string()),
            spf_domain,
            dkim_domain,
            received_date: self.received_date_time,
        }
    }
}

/// Decode one `/messages` page body.
pub(crate) fn parse_page(body: &str) -> Result<MessagePage> {
    serde_json::from_str(body)
        .map_err(|e| SpamOriginError::parse("Graph message page", e.to_string()))
}

/// Graph REST client implementing both collaborators.
pub struct GraphClient {
    http: reqwest::Client,
    base_url: String,
    page_size: usize,
    retry: RetryExecutor,
}

impl GraphClient {
    pub fn new(
        base_url: impl Into<String>,
        page_size: usize,
        timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("spamorigin/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SpamOriginError::internal(format!("HTTP client setup failed: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page_size: page_size.max(1),
            retry: RetryExecutor::new(retry),
        })
    }

    pub fn from_config(fetch: &FetchConfig) -> Result<Self> {
        Self::new(
            fetch.graph_base_url.clone(),
            fetch.page_size,
            fetch.timeout(),
            fetch.retry_config(),
        )
    }

    fn messages_url(&self, limit: usize) -> String {
        format!(
            "{}/me/mailFolders/junkEmail/messages?$select={}&$top={}",
            self.base_url,
            SELECT_FIELDS,
            limit.min(self.page_size)
        )
    }

    /// Only URLs under the configured base ever receive the token.
    fn is_own_url(&self, url: &str) -> bool {
        url.strip_prefix(self.base_url.as_str())
            .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('?'))
    }

    /// Single GET returning the body text, with status mapped to errors.
    async fn get_text(&self, url: &str, token: &str, operation: &str) -> Result<String> {
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| SpamOriginError::transport_with(operation, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SpamOriginError::transport_with(operation, e))?;
        check_status(status, &body, operation)?;
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        token: &str,
        operation: &str,
    ) -> Result<T> {
        let body = self
            .retry
            .execute(
                move || self.get_text(url, token, operation),
                TransportRetryPolicy,
            )
            .await?;
        serde_json::from_str(&body).map_err(|e| SpamOriginError::parse(operation, e.to_string()))
    }
}

fn check_status(status: StatusCode, body: &str, operation: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    let detail = graph_error_message(body).unwrap_or_else(|| status.to_string());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(SpamOriginError::auth(SERVICE, format!("{status}: {detail}")))
        }
        _ => Err(SpamOriginError::transport(
            operation,
            format!("HTTP {status}: {detail}"),
        )),
    }
}

/// Pull `error.message` out of a Graph error envelope.
fn graph_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct Envelope {
        error: Inner,
    }
    #[derive(Deserialize)]
    struct Inner {
        message: Option<String>,
    }
    serde_json::from_str::<Envelope>(body)
        .ok()
        .and_then(|e| e.error.message)
        .filter(|m| !m.is_empty())
}

#[async_trait]
impl MailSource for GraphClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Graph
    }

    fn location(&self) -> String {
        self.base_url.clone()
    }

    async fn fetch_spam_records(&self, token: &str, limit: usize) -> Result<Vec<MailRecord>> {
        let mut records = Vec::with_capacity(limit.min(self.page_size));
        let mut next = Some(self.messages_url(limit));
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            if records.len() >= limit {
                break;
            }
            let body = self
                .retry
                .execute(
                    || self.get_text(&url, token, "fetch junk messages"),
                    TransportRetryPolicy,
                )
                .await?;
            let page = parse_page(&body)?;
            pages += 1;
            debug!(page = pages, messages = page.value.len(), "received Graph page");
            records.extend(page.value.into_iter().map(GraphMessage::into_record));
            next = page.next_link;
            if let Some(link) = &next
                && !self.is_own_url(link)
            {
                return Err(SpamOriginError::parse(
                    "Graph message page",
                    format!("@odata.nextLink {link} leaves {}", self.base_url),
                ));
            }
        }

        records.truncate(limit);
        info!(count = records.len(), pages, "fetched junk messages");
        Ok(records)
    }
}

#[async_trait]
impl IdentityService for GraphClient {
    async fn fetch_profile(&self, token: &str) -> Result<UserProfile> {
        let url = format!("{}/me", self.base_url);
        let profile: UserProfile = self.get_json(&url, token, "fetch profile").await?;
        debug!(name = %profile.display_name, "fetched profile");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const PAGE: &str = r#"{
        "value": [
            {
                "subject": "You won",
                "sender": {"emailAddress": {"name": "Promo", "address": "promo@mail.spam.example"}},
                "receivedDateTime": "2024-09-17T12:34:56Z",
                "internetMessageHeaders": [
                    {"name": "Received", "value": "from relay"},
                    {"name": "Authentication-Results", "value": "spf=pass (sender IP is 203.0.113.5) smtp.mailfrom=bounce.spam.example; dkim=pass (signature was verified) header.d=spam.example;dmarc=pass"}
                ]
            },
            {
                "subject": "",
                "sender": null,
                "internetMessageHeaders": null
            }
        ]
    }"#;

    #[test]
    fn page_maps_messages_to_records() {
        let page = parse_page(PAGE).unwrap();
        assert!(page.next_link.is_none());
        let records: Vec<MailRecord> = page
            .value
            .into_iter()
            .map(GraphMessage::into_record)
            .collect();

        assert_eq!(records[0].subject, "You won");
        assert_eq!(records[0].sender_name, "Promo");
        assert_eq!(records[0].sender_address, "promo@mail.spam.example");
        assert_eq!(records[0].spf_domain.as_deref(), Some("bounce.spam.example"));
        assert_eq!(records[0].dkim_domain.as_deref(), Some("spam.example"));
        assert!(records[0].received_date.is_some());

        assert_eq!(records[1].subject, "(No Subject)");
        assert_eq!(records[1].sender_name, "Unknown");
        assert_eq!(records[1].sender_address, "Unknown");
        assert!(records[1].spf_domain.is_none());
        assert!(records[1].dkim_domain.is_none());
    }

    #[test]
    fn undecodable_page_is_parse_error() {
        let err = parse_page("<html>oops</html>").unwrap_err();
        assert!(matches!(err, SpamOriginError::Parse { .. }));
    }

    #[test]
    fn status_mapping() {
        assert!(check_status(StatusCode::OK, "", "op").is_ok());

        let body = r#"{"error":{"code":"InvalidAuthenticationToken","message":"Access token has expired."}}"#;
        let err = check_status(StatusCode::UNAUTHORIZED, body, "op").unwrap_err();
        assert!(matches!(err, SpamOriginError::Auth { .. }));
        assert!(err.to_string().contains("Access token has expired."));

        let err = check_status(StatusCode::FORBIDDEN, "", "op").unwrap_err();
        assert!(!err.is_retryable());

        let err = check_status(StatusCode::SERVICE_UNAVAILABLE, "busy", "op").unwrap_err();
        assert!(matches!(err, SpamOriginError::Transport { .. }));
        assert!(err.is_retryable());
    }

    /// Serve one canned response per connection, in order. `build` receives
    /// the server's base URL so responses can link back to it.
    async fn serve_with<F>(build: F) -> String
    where
        F: FnOnce(&str) -> Vec<(u16, String)>,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let responses = build(&base);
        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 8192];
                let mut read = 0;
                loop {
                    let n = socket.read(&mut buf[read..]).await.unwrap();
                    read += n;
                    if n == 0 || buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                let reply = format!(
                    "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
        });
        base
    }

    async fn serve(responses: Vec<(u16, String)>) -> String {
        serve_with(|_| responses).await
    }

    fn client(base: &str, page_size: usize, attempts: u32) -> GraphClient {
        let retry = crate::retry::RetryConfigBuilder::new()
            .max_attempts(attempts)
            .initial_delay(Duration::from_millis(1))
            .jitter(false)
            .build();
        GraphClient::new(base, page_size, Duration::from_secs(5), retry).unwrap()
    }

    fn page_json(senders: &[&str], next: Option<&str>) -> String {
        let value: Vec<serde_json::Value> = senders
            .iter()
            .map(|s| {
                serde_json::json!({
                    "subject": "s",
                    "sender": {"emailAddress": {"name": "n", "address": s}},
                    "internetMessageHeaders": []
                })
            })
            .collect();
        let mut page = serde_json::json!({ "value": value });
        if let Some(link) = next {
            page["@odata.nextLink"] = serde_json::Value::String(link.to_string());
        }
        page.to_string()
    }

    #[tokio::test]
    async fn fetch_follows_next_link_and_truncates() {
        let base = serve_with(|base| {
            let next = format!("{base}/me/mailFolders/junkEmail/messages?$skip=2");
            vec![
                (200, page_json(&["a@one.example", "b@two.example"], Some(&next))),
                (200, page_json(&["c@three.example", "d@four.example"], None)),
            ]
        })
        .await;
        let records = client(&base, 2, 0)
            .fetch_spam_records("token", 3)
            .await
            .unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].sender_address, "a@one.example");
        assert_eq!(records[2].sender_address, "c@three.example");
    }

    #[tokio::test]
    async fn fetch_stops_once_limit_is_reached() {
        let base = serve_with(|base| {
            let next = format!("{base}/me/mailFolders/junkEmail/messages?$skip=2");
            vec![(200, page_json(&["a@one.example", "b@two.example"], Some(&next)))]
        })
        .await;
        let records = client(&base, 2, 0)
            .fetch_spam_records("token", 2)
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn next_link_to_foreign_host_is_refused() {
        let base = serve(vec![(
            200,
            page_json(
                &["a@one.example"],
                Some("https://collector.evil.example/me/mailFolders/junkEmail/messages?$skip=1"),
            ),
        )])
        .await;
        let err = client(&base, 1, 0)
            .fetch_spam_records("token", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, SpamOriginError::Parse { .. }));
        assert!(err.to_string().contains("collector.evil.example"));
    }

    #[test]
    fn own_url_requires_base_prefix_on_a_boundary() {
        let graph = client("https://graph.microsoft.com/v1.0", 50, 0);
        assert!(graph.is_own_url("https://graph.microsoft.com/v1.0/me/messages?$skip=10"));
        assert!(!graph.is_own_url("https://graph.microsoft.com/v1.0.evil.example/me"));
        assert!(!graph.is_own_url("http://127.0.0.1:9/me"));
    }

    #[tokio::test]
    async fn unauthorized_is_auth_error_without_retry() {
        let base = serve(vec![(
            401,
            r#"{"error":{"code":"InvalidAuthenticationToken","message":"Lifetime validation failed"}}"#
                .to_string(),
        )])
        .await;
        let err = client(&base, 50, 3)
            .fetch_spam_records("expired", 10)
            .await
            .unwrap_err();
        assert!(matches!(err, SpamOriginError::Auth { .. }));
    }

    #[tokio::test]
    async fn server_error_is_retried() {
        let base = serve(vec![
            (503, "{}".to_string()),
            (200, page_json(&["x@retry.example"], None)),
        ])
        .await;
        let records = client(&base, 50, 2)
            .fetch_spam_records("token", 10)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sender_address, "x@retry.example");
    }

    #[tokio::test]
    async fn profile_is_fetched_from_me() {
        let base = serve(vec![(
            200,
            r#"{"displayName":"Grace Hopper","mail":"grace@navy.example","userPrincipalName":"grace@navy.example"}"#
                .to_string(),
        )])
        .await;
        let profile = client(&base, 50, 0).fetch_profile("token").await.unwrap();
        assert_eq!(profile.display_name, "Grace Hopper");
        assert_eq!(profile.primary_address(), Some("grace@navy.example"));
    }
}
