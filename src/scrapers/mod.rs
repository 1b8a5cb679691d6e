//! Page fetching and the publisher-specific scraper.
//!
//! Scraping is split in two phases, like every source module here:
//!
//! 1. **Locating**: find the first article URL on the dated front page
//! 2. **Extracting**: download the article and pull out title and body
//!
//! Both phases fetch through the [`PageFetcher`] trait so the HTML parsing can
//! be exercised without a network.

pub mod naver;

use crate::error::PipelineError;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// Something that can GET a page and hand back its body.
pub trait PageFetcher {
    /// Fetch `url` and return the body text.
    ///
    /// Anything but HTTP 200 is a [`PipelineError::Fetch`].
    async fn fetch(&self, url: &str) -> Result<String, PipelineError>;
}

/// [`PageFetcher`] backed by `reqwest`, sending one browser-like
/// `User-Agent` for every request of the run.
///
/// No request timeout is set; the transport default applies.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    /// Client with the run's `User-Agent` as a default header.
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher that sends `user_agent` with every request.
    ///
    /// # Arguments
    ///
    /// * `user_agent` - The `User-Agent` header value, usually picked once per
    ///   run by [`crate::utils::random_user_agent`]
    ///
    /// # Returns
    ///
    /// A [`PipelineError::Config`] when the value is not a valid header or
    /// the HTTP client cannot be built.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let fetcher = HttpFetcher::new(utils::random_user_agent())?;
    /// let html = fetcher.fetch(&naver::listing_url("009", date)).await?;
    /// ```
    pub fn new(user_agent: &str) -> Result<Self, PipelineError> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(user_agent)
            .map_err(|e| PipelineError::Config(format!("invalid user agent: {e}")))?;
        headers.insert(USER_AGENT, value);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| PipelineError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<String, PipelineError> {
        let t0 = Instant::now();
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status != StatusCode::OK {
            warn!(%status, "Unexpected status");
            return Err(PipelineError::Fetch {
                url: url.to_string(),
                reason: format!("status {}", status.as_u16()),
            });
        }

        let body = resp.text().await.map_err(|e| PipelineError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u128,
            "Fetched page"
        );
        Ok(body)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;

    /// In-memory fetcher: known URLs return their page, others fail like a 404.
    #[derive(Debug, Default)]
    pub struct StaticFetcher {
        pages: HashMap<String, String>,
    }

    impl StaticFetcher {
        pub fn with_page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }
    }

    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<String, PipelineError> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| PipelineError::Fetch {
                    url: url.to_string(),
                    reason: "status 404".to_string(),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_fetcher_rejects_invalid_user_agent() {
        let result = HttpFetcher::new("bad\nagent");
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_http_fetcher_accepts_browser_agent() {
        assert!(HttpFetcher::new(crate::utils::random_user_agent()).is_ok());
    }
}
