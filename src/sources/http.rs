use super::{LayerDocument, LayerFetcher};
use crate::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;

/// Shared HTTP client with a custom User-Agent so that public map servers
/// don't reject the request. Building the client once avoids the cost of TLS
/// and connection pool setup for every layer.
pub(crate) static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent("webmap/0.1 (+https://github.com/example/webmap)")
        .build()
        .expect("failed to build reqwest client")
});

/// Fetches layer documents over HTTP(S). Documents are expected to be JSON
/// manifests; a non-success status or a body that fails to parse both
/// surface as errors on the owning layer.
#[derive(Debug, Default, Clone)]
pub struct HttpFetcher;

impl HttpFetcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LayerFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<LayerDocument> {
        log::debug!("fetch layer document {}", url);
        let response = HTTP_CLIENT.get(url).send().await?.error_for_status()?;
        let doc = response.json::<LayerDocument>().await?;
        log::info!(
            "loaded layer document {} ({} content blocks)",
            url,
            doc.content.len()
        );
        Ok(doc)
    }
}
