//! Retry policy for GitHub API and asset requests.

use reqwest::StatusCode;
use reqwest::header::HeaderMap;

/// Maximum number of attempts for one network operation.
pub const MAX_RETRIES: usize = 3;

/// Delay between retry attempts in milliseconds.
pub const RETRY_DELAY_MS: u64 = 1000;

/// Errors that should not be retried.
#[derive(Debug)]
pub enum NonRetryableError {
    /// HTTP 429, or 403 with an exhausted rate-limit budget
    RateLimitExceeded(String),
    /// HTTP 401
    AuthenticationFailed(String),
    /// HTTP 404
    NotFound(String),
    /// HTTP 403 not caused by rate limiting
    Forbidden(String),
    /// Any other 4xx
    ClientError(String),
    /// A 2xx body that does not decode as expected
    InvalidResponse(String),
    /// Disk or permission failure on this machine
    Local(String),
}

impl std::fmt::Display for NonRetryableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NonRetryableError::RateLimitExceeded(url) => {
                write!(
                    f,
                    "Rate limit exceeded for {}. Try again later or set GITHUB_TOKEN.",
                    url
                )
            }
            NonRetryableError::AuthenticationFailed(url) => {
                write!(f, "Authentication failed for {}. Check your GITHUB_TOKEN.", url)
            }
            NonRetryableError::NotFound(url) => write!(f, "Not found: {}", url),
            NonRetryableError::Forbidden(url) => write!(f, "Access forbidden: {}", url),
            NonRetryableError::ClientError(msg) => write!(f, "Request error: {}", msg),
            NonRetryableError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            NonRetryableError::Local(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for NonRetryableError {}

/// Classifies a failed response status.
///
/// Returns `None` when the request may succeed if repeated (5xx and the like).
pub fn classify_status(
    status: StatusCode,
    headers: &HeaderMap,
    url: &str,
) -> Option<NonRetryableError> {
    let url = url.to_string();
    match status {
        StatusCode::UNAUTHORIZED => Some(NonRetryableError::AuthenticationFailed(url)),
        StatusCode::FORBIDDEN if rate_limit_exhausted(headers) => {
            Some(NonRetryableError::RateLimitExceeded(url))
        }
        StatusCode::FORBIDDEN => Some(NonRetryableError::Forbidden(url)),
        StatusCode::TOO_MANY_REQUESTS => Some(NonRetryableError::RateLimitExceeded(url)),
        StatusCode::NOT_FOUND => Some(NonRetryableError::NotFound(url)),
        s if s.is_client_error() => Some(NonRetryableError::ClientError(format!(
            "HTTP {} from {}",
            s.as_u16(),
            url
        ))),
        _ => None,
    }
}

/// GitHub reports an exhausted budget with `x-ratelimit-remaining: 0`.
fn rate_limit_exhausted(headers: &HeaderMap) -> bool {
    headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0")
}

/// Checks whether an error produced during an attempt is worth another one.
pub fn is_retryable(e: &anyhow::Error) -> bool {
    e.downcast_ref::<NonRetryableError>().is_none()
}
