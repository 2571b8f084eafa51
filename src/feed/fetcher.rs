use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::time::Duration;
use thiserror::Error;

use crate::digest::Entry;
use crate::feed::parser::{parse_feed, ParsedFeed};

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_CONCURRENT_FETCHES: usize = 10;

/// Errors that can occur while fetching a single feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the 30-second timeout
    #[error("Request timed out")]
    Timeout,
    /// Feed document could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
    /// Server returned 429 Too Many Requests after max retries
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

impl FetchError {
    /// Transient failures worth another attempt.
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::Timeout => true,
            FetchError::IncompleteResponse { .. } => true,
            FetchError::HttpStatus(status) => *status == 429 || *status >= 500,
            FetchError::Parse(_) | FetchError::RateLimited(_) | FetchError::ResponseTooLarge => {
                false
            }
        }
    }
}

/// Exponential backoff settings for feed requests.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each following one.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << retry.min(16))
            .min(self.max_delay)
    }
}

/// Fetches every feed and returns their entries in configuration order.
///
/// Feeds are downloaded concurrently (up to 10 at a time) but results are
/// collected in the order of `urls`, so the first-seen order of entries is
/// deterministic. A feed that still fails after retries is logged and
/// skipped; it never aborts the whole digest.
pub async fn collect_entries(
    client: &reqwest::Client,
    urls: &[String],
    max_per_feed: usize,
    policy: &RetryPolicy,
) -> Vec<Entry> {
    let results: Vec<(&String, Result<Vec<Entry>, FetchError>)> = stream::iter(urls)
        .map(|url| async move { (url, fetch_feed(client, url, max_per_feed, policy).await) })
        .buffered(MAX_CONCURRENT_FETCHES)
        .collect()
        .await;

    let mut entries = Vec::new();
    let mut failed = 0usize;
    for (url, result) in results {
        match result {
            Ok(feed_entries) => {
                tracing::debug!(feed = %url, entries = feed_entries.len(), "Fetched feed");
                entries.extend(feed_entries);
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(feed = %url, error = %e, "Skipping feed after fetch failure");
            }
        }
    }

    tracing::info!(
        feeds = urls.len(),
        failed = failed,
        entries = entries.len(),
        "Collected feed entries"
    );
    entries
}

/// Fetches and parses one feed, keeping at most `max_entries` entries.
///
/// # Errors
///
/// - [`FetchError::Network`] / [`FetchError::Timeout`] after retries are exhausted
/// - [`FetchError::HttpStatus`] for 4xx immediately, or 5xx after retries
/// - [`FetchError::RateLimited`] for 429 after retries
/// - [`FetchError::ResponseTooLarge`] for bodies over 10MB
/// - [`FetchError::Parse`] for documents that are not RSS/Atom
pub async fn fetch_feed(
    client: &reqwest::Client,
    url: &str,
    max_entries: usize,
    policy: &RetryPolicy,
) -> Result<Vec<Entry>, FetchError> {
    let mut retry_count = 0;

    let bytes = loop {
        match fetch_bytes(client, url).await {
            Ok(bytes) => break bytes,
            Err(e) if e.is_retryable() && retry_count < policy.max_retries => {
                let delay = policy.delay_for(retry_count);
                tracing::warn!(
                    feed = %url,
                    error = %e,
                    retry = retry_count + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Transient feed error, retrying after delay"
                );
                tokio::time::sleep(delay).await;
                retry_count += 1;
            }
            Err(FetchError::HttpStatus(429)) => {
                return Err(FetchError::RateLimited(policy.max_retries));
            }
            Err(e) => return Err(e),
        }
    };

    let fetched_at = Utc::now().timestamp();
    let ParsedFeed { entries, .. } = parse_feed(&bytes, url, max_entries, fetched_at)
        .map_err(|e| FetchError::Parse(e.to_string()))?;
    Ok(entries)
}

async fn fetch_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, FetchError> {
    let response = tokio::time::timeout(REQUEST_TIMEOUT, client.get(url).send())
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(FetchError::Network)?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    read_limited_bytes(response, MAX_FEED_SIZE).await
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{any, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Test Feed</title>
    <item><guid>1</guid><title>One</title><link>https://example.com/1</link></item>
    <item><guid>2</guid><title>Two</title><link>https://example.com/2</link></item>
    <item><guid>3</guid><title>Three</title><link>https://example.com/3</link></item>
</channel></rss>"#;

    fn fast_retries() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
        }
    }

    fn rss_response() -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_string(VALID_RSS)
            .insert_header("Content-Type", "application/rss+xml")
    }

    #[test]
    fn test_default_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(4), Duration::from_secs(10));
        assert_eq!(policy.delay_for(40), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_fetch_success_respects_cap() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(rss_response())
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/feed", mock_server.uri());
        let entries = fetch_feed(&client, &url, 2, &fast_retries()).await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "One");
        assert_eq!(entries[0].source, "Test Feed");
        assert!(entries[0].timestamp > 0);
    }

    #[tokio::test]
    async fn test_fetch_404_fails_without_retry() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/feed", mock_server.uri());
        match fetch_feed(&client, &url, 10, &fast_retries()).await {
            Err(FetchError::HttpStatus(404)) => {}
            other => panic!("Expected HttpStatus(404), got {:?}", other.map(|e| e.len())),
        }
    }

    #[tokio::test]
    async fn test_fetch_500_retries_then_fails() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(4) // Initial request + 3 retries
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/feed", mock_server.uri());
        match fetch_feed(&client, &url, 10, &fast_retries()).await {
            Err(FetchError::HttpStatus(500)) => {}
            other => panic!("Expected HttpStatus(500), got {:?}", other.map(|e| e.len())),
        }
    }

    #[tokio::test]
    async fn test_fetch_503_then_success() {
        let mock_server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&mock_server)
            .await;
        Mock::given(any())
            .respond_with(rss_response())
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/feed", mock_server.uri());
        let entries = fetch_feed(&client, &url, 10, &fast_retries()).await.unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_429_exhausts_into_rate_limited() {
        let mock_server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(429))
            .expect(4)
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/feed", mock_server.uri());
        match fetch_feed(&client, &url, 10, &fast_retries()).await {
            Err(FetchError::RateLimited(3)) => {}
            other => panic!("Expected RateLimited(3), got {:?}", other.map(|e| e.len())),
        }
    }

    #[tokio::test]
    async fn test_malformed_feed_parse_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<not valid xml"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/feed", mock_server.uri());
        match fetch_feed(&client, &url, 10, &fast_retries()).await {
            Err(FetchError::Parse(_)) => {}
            other => panic!("Expected Parse error, got {:?}", other.map(|e| e.len())),
        }
    }

    #[tokio::test]
    async fn test_collect_preserves_order_and_skips_failures() {
        let mock_server = MockServer::start().await;
        let second = VALID_RSS
            .replace("Test Feed", "Second Feed")
            .replace("example.com", "second.example.com");
        Mock::given(path("/a"))
            .respond_with(rss_response().set_delay(Duration::from_millis(100)))
            .mount(&mock_server)
            .await;
        Mock::given(path("/broken"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;
        Mock::given(path("/b"))
            .respond_with(ResponseTemplate::new(200).set_body_string(second))
            .mount(&mock_server)
            .await;

        let urls = vec![
            format!("{}/a", mock_server.uri()),
            format!("{}/broken", mock_server.uri()),
            format!("{}/b", mock_server.uri()),
        ];
        let client = reqwest::Client::new();
        let entries = collect_entries(&client, &urls, 2, &fast_retries()).await;

        let sources: Vec<&str> = entries.iter().map(|e| e.source.as_str()).collect();
        // The slow first feed still comes first.
        assert_eq!(sources, vec!["Test Feed", "Test Feed", "Second Feed", "Second Feed"]);
        assert_eq!(entries[2].link, "https://second.example.com/1");
    }

    #[tokio::test]
    async fn test_collect_empty_urls() {
        let client = reqwest::Client::new();
        let entries = collect_entries(&client, &[], 10, &fast_retries()).await;
        assert!(entries.is_empty());
    }
}
