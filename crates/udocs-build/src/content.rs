//! Externally hosted pages.
//!
//! A summary can link to pages that live outside the docs directory. During a
//! build every page is offered to each [`ContentSource`]; a source that
//! handles the page fetches its HTML, which is stored at the page's path.

use std::time::Duration;

use serde::Deserialize;
use ureq::Agent;

/// Quip thread API endpoint.
const QUIP_THREADS_URL: &str = "https://platform.quip.com/1/threads";

/// Extension marking a summary link as a Quip thread.
const QUIP_EXT: &str = ".quip";

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 30;

/// Error returned when an external page cannot be fetched.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// HTTP request failed (network error, timeout, invalid JSON).
    #[error("HTTP request failed: {0}")]
    Http(#[from] ureq::Error),
    /// Server answered with an error status.
    #[error("Document {id} not found (HTTP {status})")]
    Status { id: String, status: u16 },
    /// Page path does not name a document.
    #[error("Cannot derive document id from {0:?}")]
    InvalidPath(String),
}

/// A provider of pages hosted outside the docs directory.
pub trait ContentSource: Send + Sync {
    /// Whether this source serves the page published at `path`.
    fn handles(&self, path: &str) -> bool;

    /// Fetch the HTML of the page published at `path`.
    fn fetch(&self, path: &str) -> Result<Vec<u8>, ContentError>;
}

/// Quip thread response, reduced to the fields a build uses.
#[derive(Debug, Deserialize)]
struct Thread {
    html: String,
}

/// Client for Quip documents linked as `<thread-id>.quip`.
pub struct QuipClient {
    agent: Agent,
    access_token: String,
}

impl QuipClient {
    /// Create a client authenticating with a personal access token.
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            access_token: access_token.into(),
        }
    }

    /// Fetch the HTML body of a thread.
    pub fn thread_html(&self, id: &str) -> Result<String, ContentError> {
        let url = format!("{QUIP_THREADS_URL}/{id}");
        tracing::info!(thread = id, "Fetching Quip thread");

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &format!("Bearer {}", self.access_token))
            .header("Accept", "application/json")
            .call()?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(ContentError::Status {
                id: id.to_owned(),
                status,
            });
        }

        let thread: Thread = response.into_body().read_json()?;
        Ok(thread.html)
    }
}

/// Quip thread id of a page path like `/guide/AbC123.quip`.
fn thread_id(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next()?;
    name.strip_suffix(QUIP_EXT).filter(|id| !id.is_empty())
}

impl ContentSource for QuipClient {
    fn handles(&self, path: &str) -> bool {
        udocs_renderer::paths::extension(path) == QUIP_EXT
    }

    fn fetch(&self, path: &str) -> Result<Vec<u8>, ContentError> {
        let id = thread_id(path).ok_or_else(|| ContentError::InvalidPath(path.to_owned()))?;
        Ok(self.thread_html(id)?.into_bytes())
    }
}
