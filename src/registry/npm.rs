//! npm registry existence queries.

use reqwest::Client;
use tracing::{debug, trace};

/// Per-package metadata endpoint of an npm-compatible registry.
#[derive(Debug, Clone)]
pub struct NpmRegistry {
    registry_url: String,
}

impl NpmRegistry {
    pub fn new(registry_url: impl Into<String>) -> Self {
        let registry_url: String = registry_url.into();
        Self {
            registry_url: registry_url.trim_end_matches('/').to_string(),
        }
    }

    /// Metadata URL for a package. Scoped names keep their `@` and encode the `/`.
    pub fn package_url(&self, package_name: &str) -> String {
        format!("{}/{}", self.registry_url, urlencoding::encode(package_name))
    }

    /// Whether the registry answers the metadata query with a success status.
    ///
    /// Non-success statuses, timeouts and connection errors all count as
    /// "does not exist".
    pub async fn exists(&self, client: &Client, package_name: &str) -> bool {
        let url = self.package_url(package_name);
        trace!("Checking npm: {}", url);

        match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Package exists on npm: {}", package_name);
                true
            }
            Ok(response) => {
                debug!(
                    "Package NOT FOUND on npm: {} (HTTP {})",
                    package_name,
                    response.status()
                );
                false
            }
            Err(e) => {
                debug!(
                    "npm query failed for {}, treating as absent: {}",
                    package_name, e
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_url() {
        let npm = NpmRegistry::new("https://registry.npmjs.org/");
        assert_eq!(npm.package_url("lodash"), "https://registry.npmjs.org/lodash");
        assert_eq!(
            npm.package_url("@acme/auth"),
            "https://registry.npmjs.org/%40acme%2Fauth"
        );
        assert_eq!(
            npm.package_url("https://npmjs.com/package/foo"),
            "https://registry.npmjs.org/https%3A%2F%2Fnpmjs.com%2Fpackage%2Ffoo"
        );
    }
}
