// src/utils/http.rs

//! HTTP fetch port.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;

/// Fetches the full body of a page.
///
/// Implementations do not retry. Any non-2xx/3xx status, connection failure,
/// or body read failure is reported as [`AppError::Fetch`].
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// [`Fetcher`] backed by a reqwest client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self::new(create_async_client(config)?))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::fetch(url, e))?;

        let status = response.status();
        if !(200..400).contains(&status.as_u16()) {
            return Err(AppError::fetch(
                url,
                format!("non-2xx/3xx status {status}"),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::fetch(url, format!("reading body: {e}")))?;
        Ok(bytes.to_vec())
    }
}
