//! Byte fetching over HTTP.
//!
//! Everything upstream of the feed is reached through [`Fetcher`], so the
//! archive index and month loaders can be driven from memory in tests.

use std::io::Read;

use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use tracing::debug;

use crate::config::FetchConfig;
use crate::error::{FeedError, Result};

/// Maximum number of redirects followed per request.
const REDIRECT_LIMIT: usize = 10;

/// Blocking `url -> bytes` capability.
pub trait Fetcher {
    /// Fetch the full body of `url`.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        (**self).fetch(url)
    }
}

/// [`Fetcher`] backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    user_agent: String,
    max_bytes: u64,
}

impl HttpFetcher {
    /// Build a client from the fetch section of the configuration.
    pub fn new(settings: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .redirect(reqwest::redirect::Policy::limited(REDIRECT_LIMIT))
            .build()
            .map_err(|e| FeedError::fetch("<client>", e))?;
        Ok(Self {
            client,
            user_agent: settings.user_agent.clone(),
            max_bytes: settings.max_bytes,
        })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let parsed = reqwest::Url::parse(url).map_err(|e| FeedError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        debug!(url, "Fetching");
        let response = self
            .client
            .get(parsed)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .map_err(|e| FeedError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if response.content_length().is_some_and(|len| len > self.max_bytes) {
            return Err(FeedError::TooLarge {
                url: url.to_string(),
                max_bytes: self.max_bytes,
            });
        }

        let mut bytes = Vec::new();
        response
            .take(self.max_bytes + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| FeedError::fetch(url, e))?;
        if bytes.len() as u64 > self.max_bytes {
            return Err(FeedError::TooLarge {
                url: url.to_string(),
                max_bytes: self.max_bytes,
            });
        }

        debug!(url, bytes = bytes.len(), "Fetched");
        Ok(bytes)
    }
}
