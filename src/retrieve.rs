//! Fetching raw image bytes for a candidate URL.

use std::future::Future;

use base64::Engine;
use base64::engine::general_purpose;
use tracing::debug;

use crate::constants::{DOWNLOAD_TIMEOUT, GENERATOR_TIMEOUT, USER_AGENT};
use crate::error::FetchError;

/// Something that can turn a URL into image bytes.
pub trait Retriever: Send + Sync {
    /// Downloads the resource. Any non-success status is an error.
    fn retrieve(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Retrieves over HTTP(S), and decodes inline `data:` URLs.
#[derive(Clone, Debug)]
pub struct HttpRetriever {
    client: reqwest::Client,
}

impl HttpRetriever {
    /// Builds a retriever with the download timeout.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DOWNLOAD_TIMEOUT)
    }

    /// Generators render on request, so they get longer.
    pub fn for_generator() -> Result<Self, FetchError> {
        Self::with_timeout(GENERATOR_TIMEOUT)
    }

    fn with_timeout(timeout: std::time::Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Reuses an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Retriever for HttpRetriever {
    async fn retrieve(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if url.starts_with("data:") {
            return decode_data_url(url);
        }
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Http(format!("{url} returned {status}")));
        }
        let bytes = resp.bytes().await?;
        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

/// Decodes `data:<mime>;base64,<payload>`.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, FetchError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| FetchError::InvalidInput("not a data url".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| FetchError::Decode("data url has no payload".to_string()))?;
    if !meta.ends_with(";base64") {
        return Err(FetchError::Decode(
            "only base64 data urls are supported".to_string(),
        ));
    }
    general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|err| FetchError::Decode(format!("failed to base64-decode image: {err}")))
}
