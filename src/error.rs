//! Error taxonomy for the recommendation pipeline.
//!
//! Every internal stage degrades rather than throws: transient fetch
//! failures are retried, parse failures trigger the next heuristic tier,
//! exhausted sources fall back to synthetic data. The only variant a
//! caller ever sees is `Validation`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StylistError {
    /// Network failure, 5xx or 429 — retried with exponential backoff.
    #[error("transient fetch error for {url}: {reason}")]
    Transient { url: String, reason: String },

    /// Per-request timeout elapsed. Reported immediately, never retried.
    #[error("request to {0} timed out")]
    Timeout(String),

    /// Selector or heuristic extraction produced nothing usable.
    #[error("failed to parse {context}")]
    Parse { context: String },

    /// Both the platform API and scraping failed for a retailer.
    #[error("all sources exhausted for retailer {0}")]
    SourceExhausted(String),

    /// Malformed profile or request. The one caller-visible failure mode.
    #[error("invalid request: {0}")]
    Validation(String),
}

impl StylistError {
    pub fn transient(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transient {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(context: impl Into<String>) -> Self {
        Self::Parse {
            context: context.into(),
        }
    }

    /// Whether the fetch layer should retry after backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_errors_retry() {
        assert!(StylistError::transient("https://x", "connection reset").is_retryable());
        assert!(!StylistError::Timeout("https://x".to_string()).is_retryable());
        assert!(!StylistError::parse("product grid").is_retryable());
        assert!(!StylistError::Validation("limit must be > 0".to_string()).is_retryable());
    }
}
