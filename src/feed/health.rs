//! Reachability checks for configured feed URLs.

use futures::stream::{self, StreamExt};
use std::fmt::Write as _;
use std::time::{Duration, Instant};

/// Default per-request timeout for health checks.
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_CONCURRENT_CHECKS: usize = 10;
const MAX_ERROR_CHARS: usize = 80;

/// Outcome of probing one feed URL.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedHealth {
    pub url: String,
    /// True when the server answered with a status below 400.
    pub alive: bool,
    pub status_code: Option<u16>,
    /// Round-trip time in milliseconds, rounded to two decimals.
    pub response_time_ms: Option<f64>,
    pub error: Option<String>,
}

/// Checks every URL, reporting in input order.
pub async fn check_feed_health(
    client: &reqwest::Client,
    urls: &[String],
    timeout: Duration,
) -> Vec<FeedHealth> {
    stream::iter(urls)
        .map(|url| check_single_url(client, url, timeout))
        .buffered(MAX_CONCURRENT_CHECKS)
        .collect()
        .await
}

/// Sends a HEAD request (following redirects) and records the result.
///
/// Never fails: transport errors are folded into [`FeedHealth::error`].
pub async fn check_single_url(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> FeedHealth {
    let start = Instant::now();

    match client.head(url).timeout(timeout).send().await {
        Ok(response) => {
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
            let status = response.status();
            FeedHealth {
                url: url.to_string(),
                alive: status.as_u16() < 400,
                status_code: Some(status.as_u16()),
                response_time_ms: Some((elapsed_ms * 100.0).round() / 100.0),
                error: None,
            }
        }
        Err(e) => {
            let error = if e.is_timeout() {
                format!("Timeout after {}s", timeout.as_secs_f64())
            } else if e.is_connect() {
                format!("Connection error: {}", truncate_chars(&e.to_string(), MAX_ERROR_CHARS))
            } else {
                format!("Error: {}", truncate_chars(&e.to_string(), MAX_ERROR_CHARS))
            };
            tracing::debug!(feed = %url, error = %error, "Feed health check failed");
            FeedHealth {
                url: url.to_string(),
                alive: false,
                status_code: None,
                response_time_ms: None,
                error: Some(error),
            }
        }
    }
}

/// URLs of feeds that did not pass the check.
pub fn dead_feeds(results: &[FeedHealth]) -> Vec<String> {
    results
        .iter()
        .filter(|r| !r.alive)
        .map(|r| r.url.clone())
        .collect()
}

/// Human-readable report for the `check` command.
pub fn format_health_report(results: &[FeedHealth]) -> String {
    let alive = results.iter().filter(|r| r.alive).count();
    let rule = "═".repeat(80);

    let mut out = String::new();
    let _ = writeln!(out, "\nRSS Feed Health Report");
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Status: {}/{} feeds are healthy\n", alive, results.len());

    for result in results {
        let icon = if result.alive { "✅" } else { "❌" };
        let _ = writeln!(out, "{} {}", icon, result.url);
        match &result.error {
            Some(error) => {
                let _ = writeln!(out, "   Error: {}", error);
            }
            None => {
                let status = result
                    .status_code
                    .map_or_else(|| "—".to_string(), |s| s.to_string());
                let time = result
                    .response_time_ms
                    .map_or_else(|| "—".to_string(), |ms| format!("{}ms", ms));
                let _ = writeln!(out, "   Status: {} | Response time: {}", status, time);
            }
        }
    }

    let _ = writeln!(out, "\n{}", rule);
    out
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
