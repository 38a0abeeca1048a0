use async_trait::async_trait;
use reqwest::Client;
use std::fmt::Debug;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::{error::FetchError, urls::redact};

/// One outbound GET returning the body text.
#[async_trait]
pub trait Fetch: Send + Sync + Debug {
    async fn get_text(&self, url: &Url) -> Result<String, FetchError>;
}

/// `Fetch` over a shared `reqwest::Client` with its default timeouts.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self { http: Client::new() }
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    #[instrument(skip_all, fields(url = %redact(url)))]
    async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        // reqwest errors carry the full URL, key included
        let network =
            |source: reqwest::Error| FetchError::Network { url: redact(url), source: source.without_url() };

        let res = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(network)?;

        let status = res.status();
        if !status.is_success() {
            // the status decides the error; the body is only logged
            let body = res.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %truncate_body(&body), "request was rejected");
            return Err(FetchError::Http { url: redact(url), status: status.as_u16() });
        }

        let body = res
            .text()
            .await
            .map_err(network)?;

        if body.trim().is_empty() {
            warn!(status = status.as_u16(), "response body was empty");
            return Err(FetchError::Http { url: redact(url), status: status.as_u16() });
        }

        debug!(status = status.as_u16(), bytes = body.len(), "response received");
        Ok(body)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
