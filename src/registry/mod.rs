//! Registry confusion checking.
//!
//! Queries each enabled public registry once per dependency name and turns
//! the answers into a [`RegistryVerdict`]. Transport failures never escape:
//! they read as "absent", so uncertainty is reported as risk.

pub mod npm;

pub use npm::NpmRegistry;

use crate::config::Configuration;
use crate::types::{Registry, RegistryVerdict, Result};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Checks dependency names against the public registries enabled in a [`Configuration`].
///
/// Cheap to share behind an `Arc`; checks for different names may run
/// concurrently. Dropping a pending [`check`](Self::check) future abandons
/// its in-flight request.
pub struct RegistryChecker {
    client: Client,
    npm: NpmRegistry,
    rate_limiter: Option<Arc<DirectRateLimiter>>,
}

impl RegistryChecker {
    /// Create a checker whose every query is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent("depsniff/0.1")
            .http1_only() // Force HTTP/1.1 to avoid HTTP/2 stream limit issues
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            npm: NpmRegistry::new(crate::config::DEFAULT_NPM_REGISTRY),
            rate_limiter: None,
        })
    }

    /// Create a checker using the timeout and endpoints from a configuration.
    pub fn from_config(config: &Configuration) -> Result<Self> {
        Ok(Self::new(config.registry_timeout())?.with_npm_url(config.npm_registry_url()))
    }

    /// Point npm queries at a different registry endpoint.
    pub fn with_npm_url(mut self, registry_url: &str) -> Self {
        self.npm = NpmRegistry::new(registry_url);
        self
    }

    /// Pace queries to at most `per_second` requests.
    pub fn with_rate_limit(mut self, per_second: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN));
        self.rate_limiter = Some(Arc::new(RateLimiter::direct(quota)));
        self
    }

    /// Check a dependency name against every registry enabled in `config`.
    ///
    /// Exactly one query per enabled registry, no retries. With no registry
    /// enabled the verdict is confusable.
    pub async fn check(&self, dependency: &str, config: &Configuration) -> RegistryVerdict {
        let mut existence = BTreeMap::new();

        for registry in config.enabled_registries() {
            let exists = self.query(registry, dependency).await;
            existence.insert(registry, exists);
        }

        let verdict = RegistryVerdict::from_existence(existence);
        trace!("Verdict for {}: confusable={}", dependency, verdict.confusable);
        verdict
    }

    async fn query(&self, registry: Registry, dependency: &str) -> bool {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.until_ready().await;
        }

        match registry {
            Registry::Npm => self.npm.exists(&self.client, dependency).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn npm_only() -> Configuration {
        Configuration::default()
    }

    fn no_registries() -> Configuration {
        Configuration {
            enable_npm: false,
            ..Configuration::default()
        }
    }

    fn checker_for(url: &str) -> RegistryChecker {
        RegistryChecker::new(Duration::from_millis(500))
            .unwrap()
            .with_npm_url(url)
    }

    #[tokio::test]
    async fn test_existing_package_is_not_confusable() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/lodash")
            .with_status(200)
            .with_body(r#"{"name":"lodash","dist-tags":{"latest":"4.17.21"}}"#)
            .expect(1)
            .create_async()
            .await;

        let verdict = checker_for(&server.url()).check("lodash", &npm_only()).await;

        assert!(!verdict.confusable);
        assert_eq!(verdict.exists_in(Registry::Npm), Some(true));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_package_is_confusable() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/acme-internal-auth")
            .with_status(404)
            .with_body(r#"{"error":"Not found"}"#)
            .expect(1)
            .create_async()
            .await;

        let verdict = checker_for(&server.url())
            .check("acme-internal-auth", &npm_only())
            .await;

        assert!(verdict.confusable);
        assert_eq!(verdict.exists_in(Registry::Npm), Some(false));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_reads_as_absent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flaky")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let verdict = checker_for(&server.url()).check("flaky", &npm_only()).await;

        assert!(verdict.confusable);
        // Exactly one query, no retry.
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_enabled_registries_is_confusable_without_queries() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(200)
            .expect(0)
            .create_async()
            .await;

        let checker = checker_for(&server.url());
        for name in ["lodash", "react", "anything-at-all"] {
            let verdict = checker.check(name, &no_registries()).await;
            assert!(verdict.confusable);
            assert!(verdict.registries.is_empty());
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_timeout_reads_as_absent() {
        // Accepts connections but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hold = tokio::spawn(async move {
            let mut held = Vec::new();
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                held.push(socket);
            }
        });

        let checker = RegistryChecker::new(Duration::from_millis(200))
            .unwrap()
            .with_npm_url(&format!("http://{}", addr));

        let started = std::time::Instant::now();
        let verdict = checker.check("slow-package", &npm_only()).await;

        assert!(verdict.confusable);
        assert_eq!(verdict.exists_in(Registry::Npm), Some(false));
        assert!(started.elapsed() < Duration::from_secs(5));
        hold.abort();
    }

    #[tokio::test]
    async fn test_connection_refused_reads_as_absent() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let verdict = checker_for(&format!("http://{}", addr))
            .check("unreachable", &npm_only())
            .await;

        assert!(verdict.confusable);
    }

    #[tokio::test]
    async fn test_check_is_repeatable() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/react")
            .with_status(200)
            .expect(2)
            .create_async()
            .await;

        let checker = checker_for(&server.url()).with_rate_limit(50);
        let first = checker.check("react", &npm_only()).await;
        let second = checker.check("react", &npm_only()).await;

        assert_eq!(first, second);
        // Verdicts are not cached: both calls hit the registry.
        mock.assert_async().await;
    }

    #[test]
    fn test_from_config() {
        let config = Configuration {
            registry_timeout_secs: Some(1),
            npm_registry_url: Some("http://127.0.0.1:4873/".to_string()),
            ..Configuration::default()
        };
        let checker = RegistryChecker::from_config(&config).unwrap();
        assert_eq!(checker.npm.package_url("x"), "http://127.0.0.1:4873/x");
    }
}
