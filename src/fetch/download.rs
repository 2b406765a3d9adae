//! Bounded-retry downloads.
//!
//! The URL is validated exactly once; only the transfer itself is retried,
//! with a fixed delay between attempts.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use reqwest::Url;

use crate::error::{BuildError, Result};
use crate::host::Host;

/// Retry configuration for downloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub attempts: u32,
    /// Delay between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_secs(2),
        }
    }
}

/// Failure after the last allowed attempt.
#[derive(Debug)]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last: anyhow::Error,
}

/// Run `op` until it succeeds or `policy.attempts` attempts have failed.
///
/// `op` receives the 1-based attempt number.
pub fn retry<T, F>(policy: &RetryPolicy, mut op: F) -> std::result::Result<T, RetryExhausted>
where
    F: FnMut(u32) -> anyhow::Result<T>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => {
                return Err(RetryExhausted {
                    attempts: attempt,
                    last: e,
                })
            }
            Err(e) => {
                tracing::warn!(
                    "attempt {}/{} failed: {:#}; retrying in {:?}",
                    attempt,
                    attempts,
                    e,
                    policy.delay
                );
                if !policy.delay.is_zero() {
                    thread::sleep(policy.delay);
                }
                attempt += 1;
            }
        }
    }
}

/// Check that `url` is an absolute http(s) URL with a host.
pub fn validate_url(url: &str) -> Result<Url> {
    let invalid = |reason: String| BuildError::InvalidUrl {
        url: url.to_string(),
        reason,
    };
    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    if parsed.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(parsed)
}

/// Download `url` into `dest_dir`, retrying transfer failures.
pub fn download(
    host: &dyn Host,
    url: &str,
    dest_dir: &Path,
    policy: &RetryPolicy,
) -> Result<PathBuf> {
    validate_url(url)?;
    tracing::info!(url, dest = %dest_dir.display(), "downloading");

    retry(policy, |_| host.download_to_file(url, dest_dir)).map_err(|e| BuildError::Download {
        url: url.to_string(),
        attempts: e.attempts,
        reason: format!("{:#}", e.last),
    })
}
