//! HTTP fetcher turning target URLs into inspectable items.

use crate::types::{ContentHashSet, DepsniffError, HttpConfig, HttpItem, Result};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

/// Fetcher with retries and rate limiting.
///
/// Every successful fetch yields an item, even when another URL already
/// served the same body: findings are keyed by source URL.
pub struct HttpFetcher {
    client: Client,
    config: HttpConfig,
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    seen_hashes: Arc<RwLock<ContentHashSet>>,
}

impl HttpFetcher {
    /// Create a new fetcher.
    pub fn new(config: HttpConfig, rate_limit: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .http1_only()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        let quota = Quota::per_second(NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN));
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            client,
            config,
            rate_limiter,
            seen_hashes: Arc::new(RwLock::new(ContentHashSet::new())),
        })
    }

    /// Fetch a URL with retries.
    ///
    /// Returns `None` when every attempt fails.
    pub async fn fetch_one(&self, url: &str) -> Option<HttpItem> {
        if let Err(e) = url::Url::parse(url) {
            warn!("Skipping invalid URL {}: {}", url, e);
            return None;
        }

        self.rate_limiter.until_ready().await;

        let mut retries = 0;
        let mut last_error = None;

        while retries <= self.config.max_retries {
            match self.do_fetch(url).await {
                Ok((mime_type, body)) => {
                    let hash = Self::hash_content(&body);
                    if !self.seen_hashes.write().await.insert(hash) {
                        trace!("{} serves content already fetched from another URL", url);
                    }

                    debug!("Fetched {} ({} bytes, mime '{}')", url, body.len(), mime_type);
                    return Some(HttpItem::from_bytes(url, mime_type, &body));
                }
                Err(e) => {
                    // 4xx responses will not succeed on retry.
                    let should_retry = match e {
                        DepsniffError::HttpError(ref http_err) => http_err
                            .status()
                            .map(|status| !status.is_client_error())
                            .unwrap_or(true),
                        _ => true,
                    };

                    last_error = Some(e);

                    if !should_retry {
                        debug!("Not retrying {} - client error", url);
                        break;
                    }

                    retries += 1;
                    if retries <= self.config.max_retries {
                        trace!("Retry {} for {}", retries, url);
                        tokio::time::sleep(Duration::from_millis(500 * retries as u64)).await;
                    }
                }
            }
        }

        if let Some(e) = last_error {
            if retries > 1 {
                warn!("Failed to fetch {} after {} retries: {}", url, retries - 1, e);
            } else {
                debug!("Failed to fetch {}: {}", url, e);
            }
        }

        None
    }

    /// Perform the HTTP fetch, returning the inferred MIME marker and raw body.
    async fn do_fetch(&self, url: &str) -> Result<(String, Vec<u8>)> {
        let response = self.client.get(url).send().await?.error_for_status()?;

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(infer_mime_type)
            .unwrap_or_default();

        let body = response.bytes().await?;
        Ok((mime_type.to_string(), body.to_vec()))
    }

    /// Number of distinct bodies fetched so far.
    pub async fn distinct_bodies(&self) -> usize {
        self.seen_hashes.read().await.len()
    }

    /// Calculate SHA256 hash of content.
    pub fn hash_content(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hex::encode(hasher.finalize())
    }
}

/// Map a `Content-Type` header to the coarse MIME marker the classifier understands.
pub fn infer_mime_type(content_type: &str) -> &'static str {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "application/javascript"
        | "text/javascript"
        | "application/x-javascript"
        | "application/ecmascript"
        | "text/ecmascript" => "script",
        "application/json" | "text/json" => "json",
        "text/html" | "application/xhtml+xml" => "html",
        "text/plain" | "text/markdown" | "text/x-markdown" => "text",
        other if other.ends_with("+json") => "json",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> HttpFetcher {
        let config = HttpConfig {
            timeout_secs: 2,
            max_retries: 1,
            ..HttpConfig::default()
        };
        HttpFetcher::new(config, 50).unwrap()
    }

    #[test]
    fn test_hash_content() {
        let hash = HttpFetcher::hash_content(b"console.log('hello');");
        assert_eq!(hash.len(), 64); // SHA256 hex is 64 chars
    }

    #[test]
    fn test_infer_mime_type() {
        assert_eq!(infer_mime_type("application/javascript; charset=utf-8"), "script");
        assert_eq!(infer_mime_type("Text/JavaScript"), "script");
        assert_eq!(infer_mime_type("application/json"), "json");
        assert_eq!(infer_mime_type("application/vnd.npm.install-v1+json"), "json");
        assert_eq!(infer_mime_type("text/html"), "html");
        assert_eq!(infer_mime_type("text/markdown"), "text");
        assert_eq!(infer_mime_type("image/png"), "");
    }

    #[tokio::test]
    async fn test_identical_bodies_yield_an_item_per_url() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{"dependencies":{"acme-internal":"1.0.0"}}"#;
        for path in ["/a/package.json", "/b/package.json"] {
            server
                .mock("GET", path)
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(body)
                .create_async()
                .await;
        }

        let fetcher = fetcher();
        let first_url = format!("{}/a/package.json", server.url());
        let second_url = format!("{}/b/package.json", server.url());

        let first = fetcher.fetch_one(&first_url).await.unwrap();
        let second = fetcher.fetch_one(&second_url).await.unwrap();

        assert_eq!(first.url, first_url);
        assert_eq!(second.url, second_url);
        assert_eq!(first.mime_type, "json");
        assert_eq!(first.body, body);
        assert_eq!(second.body, body);
        assert_eq!(fetcher.distinct_bodies().await, 1);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing.js")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let result = fetcher()
            .fetch_one(&format!("{}/missing.js", server.url()))
            .await;
        assert!(result.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_url() {
        assert!(fetcher().fetch_one("not a url").await.is_none());
    }
}
