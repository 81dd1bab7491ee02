//! Remote calls: the [`RemoteClient`] seam, its HTTP and in-memory
//! implementations, and the fetch helpers the assemblers share.
//!
//! # Retry Strategy
//!
//! [`HttpClient`] retries only when `max_retries > 0`:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → returned to the caller as-is
//! - Transport errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! With the default of zero retries every non-2xx answer surfaces
//! immediately as [`IngestError::RemoteFetch`].

use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, LINK, USER_AGENT};
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::config::Credentials;
use crate::error::{IngestError, Result};

/// Upper bound on `rel="next"` pages followed for one collection.
const MAX_PAGES: usize = 100;

/// Backoff doubles from 1s up to 2^5 = 32s.
const MAX_BACKOFF_EXP: u32 = 5;

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct RemoteResponse {
    pub url: String,
    pub status: u16,
    pub body: Vec<u8>,
    /// Target of the `Link: <...>; rel="next"` header, when present.
    pub next_page: Option<String>,
}

impl RemoteResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx status into [`IngestError::RemoteFetch`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(IngestError::RemoteFetch {
                url: self.url,
                status: self.status,
            })
        }
    }

    /// Body as text; invalid UTF-8 sequences are replaced, never fatal.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Blocking access to remote resources.
///
/// Implementations return a response for any status; deciding whether a
/// status is fatal is left to the caller.
pub trait RemoteClient: Send + Sync {
    fn get(&self, url: &str) -> Result<RemoteResponse>;

    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<RemoteResponse>;
}

// ============ reqwest implementation ============

/// [`RemoteClient`] backed by `reqwest::blocking`.
pub struct HttpClient {
    inner: Client,
    max_retries: u32,
}

impl HttpClient {
    /// Client for the GitHub API and raw content hosts. The token, when
    /// present, is sent as `Authorization: token <value>` on every request.
    pub fn github(
        user_agent: &str,
        credentials: &Credentials,
        timeout: Option<Duration>,
        max_retries: u32,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = credentials.github_token() {
            let mut value = HeaderValue::from_str(&format!("token {}", token))
                .map_err(|e| IngestError::Config(format!("invalid GitHub token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Self::build(user_agent, headers, timeout, max_retries)
    }

    /// Unauthenticated client for paper hosts and transcript endpoints.
    pub fn web(user_agent: &str, timeout: Option<Duration>, max_retries: u32) -> Result<Self> {
        Self::build(user_agent, HeaderMap::new(), timeout, max_retries)
    }

    fn build(
        user_agent: &str,
        mut headers: HeaderMap,
        timeout: Option<Duration>,
        max_retries: u32,
    ) -> Result<Self> {
        let agent = HeaderValue::from_str(user_agent)
            .map_err(|e| IngestError::Config(format!("invalid user agent: {}", e)))?;
        headers.insert(USER_AGENT, agent);
        let inner = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| IngestError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { inner, max_retries })
    }

    fn execute(&self, url: &str, request: impl Fn() -> RequestBuilder) -> Result<RemoteResponse> {
        let mut attempt: u32 = 0;
        loop {
            let outcome = send_once(url, request());
            let Some(delay) = retry_delay(&outcome, attempt, self.max_retries) else {
                return outcome;
            };
            match &outcome {
                Ok(resp) => warn!(url, status = resp.status, attempt, ?delay, "Retrying request"),
                Err(e) => warn!(url, error = %e, attempt, ?delay, "Retrying request"),
            }
            std::thread::sleep(delay);
            attempt += 1;
        }
    }
}

/// Backoff before the next attempt, or `None` when `outcome` is final:
/// it succeeded, failed with a non-transient status or error, or
/// `attempt` has used up `max_retries`.
pub fn retry_delay(
    outcome: &Result<RemoteResponse>,
    attempt: u32,
    max_retries: u32,
) -> Option<Duration> {
    let retryable = match outcome {
        Ok(resp) => resp.status == 429 || resp.status >= 500,
        Err(e) => e.is_transient(),
    };
    if !retryable || attempt >= max_retries {
        return None;
    }
    Some(Duration::from_secs(1u64 << attempt.min(MAX_BACKOFF_EXP)))
}

fn send_once(url: &str, request: RequestBuilder) -> Result<RemoteResponse> {
    let transport = |e: reqwest::Error| IngestError::Transport {
        url: url.to_string(),
        message: e.to_string(),
    };
    let response = request.send().map_err(transport)?;
    let status = response.status().as_u16();
    let next_page = response
        .headers()
        .get(LINK)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_next_link);
    let body = response.bytes().map_err(transport)?.to_vec();
    debug!(url, status, bytes = body.len(), "Fetched");
    Ok(RemoteResponse {
        url: url.to_string(),
        status,
        body,
        next_page,
    })
}

impl RemoteClient for HttpClient {
    fn get(&self, url: &str) -> Result<RemoteResponse> {
        self.execute(url, || self.inner.get(url))
    }

    fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<RemoteResponse> {
        self.execute(url, || self.inner.post(url).form(form))
    }
}

/// Extract the `rel="next"` target from an RFC 8288 `Link` header.
pub fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|p| {
            let p = p.trim();
            p == r#"rel="next""# || p == "rel=next"
        });
        if is_next {
            target
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .map(str::to_string)
        } else {
            None
        }
    })
}

// ============ In-memory implementation ============

/// [`RemoteClient`] serving canned responses keyed by exact URL.
///
/// Unknown URLs answer 404. Every request is recorded so callers can
/// assert on traversal order.
#[derive(Default)]
pub struct MemoryClient {
    routes: HashMap<String, RemoteResponse>,
    requests: Mutex<Vec<String>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, url: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.routes.insert(
            url.to_string(),
            RemoteResponse {
                url: url.to_string(),
                status,
                body: body.into(),
                next_page: None,
            },
        );
        self
    }

    pub fn with_text(self, url: &str, body: &str) -> Self {
        self.with_status(url, 200, body.as_bytes().to_vec())
    }

    pub fn with_bytes(self, url: &str, body: Vec<u8>) -> Self {
        self.with_status(url, 200, body)
    }

    pub fn with_json(self, url: &str, value: &serde_json::Value) -> Self {
        self.with_status(url, 200, value.to_string().into_bytes())
    }

    /// A JSON page whose `Link` header points at `next`.
    pub fn with_json_page(mut self, url: &str, value: &serde_json::Value, next: &str) -> Self {
        self = self.with_json(url, value);
        if let Some(resp) = self.routes.get_mut(url) {
            resp.next_page = Some(next.to_string());
        }
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    fn respond(&self, url: &str) -> Result<RemoteResponse> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(url.to_string());
        }
        Ok(self.routes.get(url).cloned().unwrap_or(RemoteResponse {
            url: url.to_string(),
            status: 404,
            body: b"Not Found".to_vec(),
            next_page: None,
        }))
    }
}

impl RemoteClient for MemoryClient {
    fn get(&self, url: &str) -> Result<RemoteResponse> {
        self.respond(url)
    }

    fn post_form(&self, url: &str, _form: &[(&str, &str)]) -> Result<RemoteResponse> {
        self.respond(url)
    }
}

// ============ Helpers ============

/// GET a JSON document, failing on non-2xx.
pub fn fetch_json<T: DeserializeOwned>(client: &dyn RemoteClient, url: &str) -> Result<T> {
    let response = client.get(url)?.error_for_status()?;
    serde_json::from_slice(&response.body).map_err(|source| IngestError::Decode {
        url: url.to_string(),
        source,
    })
}

/// GET a text document, failing on non-2xx.
pub fn fetch_text(client: &dyn RemoteClient, url: &str) -> Result<String> {
    Ok(client.get(url)?.error_for_status()?.text())
}

/// GET every page of a JSON array collection, following `rel="next"`.
pub fn fetch_all_pages<T: DeserializeOwned>(
    client: &dyn RemoteClient,
    url: &str,
) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut next = Some(url.to_string());
    let mut pages = 0;
    while let Some(page_url) = next.take() {
        if pages == MAX_PAGES {
            warn!(url, pages, "Pagination cap reached, remaining pages ignored");
            break;
        }
        let response = client.get(&page_url)?.error_for_status()?;
        let page: Vec<T> =
            serde_json::from_slice(&response.body).map_err(|source| IngestError::Decode {
                url: page_url.clone(),
                source,
            })?;
        items.extend(page);
        next = response.next_page;
        pages += 1;
    }
    Ok(items)
}

/// Download `url` into a transient file. The file is removed when the
/// returned handle drops, on success and error paths alike.
pub fn download_to_temp(client: &dyn RemoteClient, url: &str) -> Result<NamedTempFile> {
    let response = client.get(url)?.error_for_status()?;
    let mut file = NamedTempFile::new()?;
    file.write_all(&response.body)?;
    file.flush()?;
    Ok(file)
}

/// Download a remote file through a transient local copy and read it back
/// as text. Undecodable bytes are replaced rather than failing the file.
pub fn read_remote_file(client: &dyn RemoteClient, url: &str) -> Result<String> {
    let file = download_to_temp(client, url)?;
    let bytes = std::fs::read(file.path())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
