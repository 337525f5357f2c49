#![forbid(unsafe_code)]

//! Caption payload retrieval. Failures here never abort a video; callers turn
//! them into a fallback transcript.

use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = concat!("ytmeta-tools/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("reading response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

/// Anything that can turn a caption locator into the raw caption text.
pub trait CaptionSource {
    fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

impl<F> CaptionSource for F
where
    F: Fn(&str) -> Result<String, FetchError>,
{
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self(url)
    }
}

/// Blocking HTTP fetcher backed by a shared `ureq` agent.
#[derive(Clone)]
pub struct HttpCaptionSource {
    agent: ureq::Agent,
}

impl HttpCaptionSource {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().user_agent(USER_AGENT).build(),
        }
    }
}

impl Default for HttpCaptionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptionSource for HttpCaptionSource {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "fetching caption payload");
        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(FetchError::Status {
                    status,
                    url: url.to_owned(),
                });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(FetchError::Transport {
                    url: url.to_owned(),
                    reason: transport.to_string(),
                });
            }
        };
        response.into_string().map_err(|source| FetchError::Body {
            url: url.to_owned(),
            source,
        })
    }
}
