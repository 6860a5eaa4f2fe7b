//! HTTP client implementation for fetching catalogs and artifacts.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{CACHE_CONTROL, EXPIRES, PRAGMA};

use crate::package::{parse_catalog, Catalog, CatalogSet, CatalogSource};

use super::traits::{ArtifactFetcher, ArtifactStream, CatalogClient};
use super::{ManagerError, ManagerResult};

/// Default HTTP request timeout (30 seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!("prebin/", env!("CARGO_PKG_VERSION"));

/// HTTP-based implementation of [`CatalogClient`] and [`ArtifactFetcher`].
///
/// Every request bypasses intermediate caches. Catalog requests are bounded
/// by the timeout; artifact downloads only bound the connect phase, since a
/// large binary on a slow link may legitimately take longer.
///
/// # Example
///
/// ```ignore
/// use prebin::manager::{CatalogClient, HttpCatalogClient};
/// use prebin::package::CatalogSource;
///
/// let client = HttpCatalogClient::new();
/// let source = CatalogSource::new("Toolpacks", "https://example.com/METADATA.json")
///     .with_fallback("https://mirror.example.com/METADATA.json");
/// let catalog = client.fetch_catalog(&source)?;
/// ```
#[derive(Clone)]
pub struct HttpCatalogClient {
    client: Client,
    download_client: Client,
    timeout: Duration,
}

impl std::fmt::Debug for HttpCatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCatalogClient")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for HttpCatalogClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpCatalogClient {
    /// Create a new HTTP client with default settings.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a new HTTP client with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to create HTTP client");

        let download_client = Client::builder()
            .timeout(None::<Duration>)
            .connect_timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to create HTTP client");

        Self {
            client,
            download_client,
            timeout,
        }
    }

    /// The configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn map_send_error(&self, url: &str, e: reqwest::Error) -> ManagerError {
        if e.is_timeout() {
            ManagerError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            ManagerError::HttpError {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }

    fn send(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> ManagerResult<reqwest::blocking::Response> {
        let response = no_cache(request)
            .send()
            .map_err(|e| self.map_send_error(url, e))?;

        if !response.status().is_success() {
            return Err(ManagerError::HttpError {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        Ok(response)
    }

    /// Fetch text content from a URL.
    fn fetch_text(&self, url: &str) -> ManagerResult<String> {
        self.send(self.client.get(url), url)?
            .text()
            .map_err(|e| self.map_send_error(url, e))
    }

    fn fetch_from(&self, label: &str, url: &str) -> ManagerResult<Catalog> {
        let content = self
            .fetch_text(url)
            .map_err(|e| ManagerError::CatalogFetchFailed {
                label: label.to_string(),
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        parse_catalog(label, &content).map_err(|e| ManagerError::CatalogParseFailed {
            label: label.to_string(),
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Add headers that disable caching along the way.
fn no_cache(request: RequestBuilder) -> RequestBuilder {
    request
        .header(CACHE_CONTROL, "no-cache, no-store, must-revalidate")
        .header(PRAGMA, "no-cache")
        .header(EXPIRES, "0")
}

impl CatalogClient for HttpCatalogClient {
    fn fetch_catalog(&self, source: &CatalogSource) -> ManagerResult<Catalog> {
        let primary = match self.fetch_from(&source.label, &source.url) {
            Ok(catalog) => {
                tracing::debug!(label = %source.label, url = %source.url, records = catalog.len(), "Fetched catalog");
                return Ok(catalog);
            }
            Err(e) => e,
        };

        let Some(fallback) = source.fallback_url.as_deref() else {
            return Err(primary);
        };

        tracing::warn!(
            label = %source.label,
            url = %source.url,
            error = %primary,
            "Catalog fetch failed, trying fallback URL"
        );

        let catalog = self.fetch_from(&source.label, fallback)?;
        tracing::debug!(label = %source.label, url = %fallback, records = catalog.len(), "Fetched catalog from fallback");
        Ok(catalog)
    }
}

impl ArtifactFetcher for HttpCatalogClient {
    fn open(&self, url: &str) -> ManagerResult<ArtifactStream> {
        let response = self.send(self.download_client.get(url), url)?;
        let content_length = response.content_length();
        Ok(ArtifactStream::new(response, content_length))
    }
}

/// Fetch every source in order into a [`CatalogSet`].
///
/// Fails on the first source that cannot be fetched from either URL.
pub fn fetch_catalogs<C: CatalogClient + ?Sized>(
    client: &C,
    sources: &[CatalogSource],
) -> ManagerResult<CatalogSet> {
    let mut set = CatalogSet::new();
    for source in sources {
        set.push(client.fetch_catalog(source)?);
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::io::Read;

    #[test]
    fn test_client_creation() {
        let client = HttpCatalogClient::new();
        assert_eq!(client.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_client_with_timeout() {
        let client = HttpCatalogClient::with_timeout(Duration::from_secs(60));
        assert_eq!(client.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_fetch_catalog_sends_no_cache_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/METADATA.json")
                .header("cache-control", "no-cache, no-store, must-revalidate")
                .header("pragma", "no-cache")
                .header("expires", "0");
            then.status(200).body(r#"[{"pkg": "jq", "rank": 1}]"#);
        });

        let client = HttpCatalogClient::new();
        let source = CatalogSource::new("Toolpacks", server.url("/METADATA.json"));
        let catalog = client.fetch_catalog(&source).unwrap();

        mock.assert();
        assert_eq!(catalog.label, "Toolpacks");
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_fallback_used_when_primary_fails() {
        let server = MockServer::start();
        let primary = server.mock(|when, then| {
            when.method(GET).path("/primary.json");
            then.status(503);
        });
        let fallback = server.mock(|when, then| {
            when.method(GET).path("/fallback.json");
            then.status(200).body(r#"[{"pkg": "yq"}]"#);
        });

        let client = HttpCatalogClient::new();
        let source = CatalogSource::new("Baseutils", server.url("/primary.json"))
            .with_fallback(server.url("/fallback.json"));
        let catalog = client.fetch_catalog(&source).unwrap();

        primary.assert();
        fallback.assert();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_fallback_used_when_primary_unparseable() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/primary.json");
            then.status(200).body("<html>maintenance</html>");
        });
        server.mock(|when, then| {
            when.method(GET).path("/fallback.json");
            then.status(200).body("[]");
        });

        let client = HttpCatalogClient::new();
        let source = CatalogSource::new("Toolpacks", server.url("/primary.json"))
            .with_fallback(server.url("/fallback.json"));
        assert!(client.fetch_catalog(&source).unwrap().is_empty());
    }

    #[test]
    fn test_fallback_error_surfaces() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/primary.json");
            then.status(500);
        });
        server.mock(|when, then| {
            when.method(GET).path("/fallback.json");
            then.status(404);
        });

        let client = HttpCatalogClient::new();
        let fallback_url = server.url("/fallback.json");
        let source = CatalogSource::new("Toolpacks", server.url("/primary.json"))
            .with_fallback(fallback_url.clone());

        match client.fetch_catalog(&source) {
            Err(ManagerError::CatalogFetchFailed { url, .. }) => assert_eq!(url, fallback_url),
            other => panic!("expected CatalogFetchFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_primary_error_without_fallback() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/primary.json");
            then.status(200).body(r#"{"not": "an array"}"#);
        });

        let client = HttpCatalogClient::new();
        let source = CatalogSource::new("Toolpacks", server.url("/primary.json"));
        assert!(matches!(
            client.fetch_catalog(&source),
            Err(ManagerError::CatalogParseFailed { .. })
        ));
    }

    #[test]
    fn test_fetch_catalogs_keeps_order() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/a.json");
            then.status(200).body(r#"[{"pkg": "a"}]"#);
        });
        server.mock(|when, then| {
            when.method(GET).path("/b.json");
            then.status(200).body(r#"[{"pkg": "b"}, {"pkg": "c"}]"#);
        });

        let client = HttpCatalogClient::new();
        let sources = vec![
            CatalogSource::new("A", server.url("/a.json")),
            CatalogSource::new("B", server.url("/b.json")),
        ];
        let set = fetch_catalogs(&client, &sources).unwrap();

        let labels: Vec<&str> = set.catalogs().iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["A", "B"]);
        assert_eq!(set.record_count(), 3);
    }

    #[test]
    fn test_open_artifact() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/bin/jq").header("pragma", "no-cache");
            then.status(200).body("binary-bytes");
        });

        let client = HttpCatalogClient::new();
        let mut stream = client.open(&server.url("/bin/jq")).unwrap();
        let mut body = String::new();
        stream.reader.read_to_string(&mut body).unwrap();

        assert_eq!(body, "binary-bytes");
        assert_eq!(stream.content_length, Some(12));
    }

    #[test]
    fn test_open_artifact_http_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/bin/missing");
            then.status(404);
        });

        let client = HttpCatalogClient::new();
        let result = client.open(&server.url("/bin/missing"));
        assert!(matches!(result, Err(ManagerError::HttpError { .. })));
    }
}
