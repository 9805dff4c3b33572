// Preview fetching
// Kept behind a trait so the player can be driven by canned bytes in tests.
// No timeout and no retries: a hung request leaves `loading` set.

use super::decoder::{self, DecodedAudio};
use crate::config::NetworkConfig;
use crate::error::{PipelineError, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::debug;

pub trait PreviewFetcher: Send + Sync {
    /// Raw encoded bytes behind `url`. Empty bodies and non-2xx are errors.
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>>>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &NetworkConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

impl PreviewFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
        async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| PipelineError::fetch(url, e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(PipelineError::fetch(url, format!("HTTP status {}", status)));
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| PipelineError::fetch(url, e))?;
            if body.is_empty() {
                return Err(PipelineError::fetch(url, "empty audio body"));
            }

            debug!("Fetched {} bytes from {}", body.len(), url);
            Ok(body.to_vec())
        }
        .boxed()
    }
}

/// Fetch then decode. Decoding is CPU bound so it goes to the blocking pool.
pub async fn fetch_and_decode(fetcher: &dyn PreviewFetcher, url: &str) -> Result<DecodedAudio> {
    let bytes = fetcher.fetch(url).await?;
    let hint = decoder::extension_hint(url);

    tokio::task::spawn_blocking(move || decoder::decode(bytes, hint.as_deref()))
        .await
        .map_err(|e| PipelineError::Decode(format!("decode task failed: {}", e)))?
}
