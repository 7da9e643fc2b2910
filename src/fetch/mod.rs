//! HTTP fetch engine: shared client with a fixed per-request timeout,
//! retry with exponential backoff, and a bounded-concurrency task runner.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::HeaderMap;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::error::StylistError;

const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Shared HTTP client. Cheap to clone; all clones reuse one connection pool.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    max_retries: u32,
}

impl Fetcher {
    pub fn new(timeout: Duration, max_retries: u32) -> Result<Self, StylistError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| StylistError::transient("http client", e))?;

        Ok(Self {
            client,
            max_retries,
        })
    }

    pub fn with_defaults() -> Result<Self, StylistError> {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_MAX_RETRIES)
    }

    /// GET a page body as text, retrying transient failures.
    pub async fn get_text(&self, url: &str) -> Result<String, StylistError> {
        let response = self.execute(url, &[]).await?;
        response
            .text()
            .await
            .map_err(|e| StylistError::transient(url, e))
    }

    /// GET a JSON document plus the response headers (platform APIs signal
    /// pagination through headers).
    pub async fn get_json(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<(serde_json::Value, HeaderMap), StylistError> {
        let response = self.execute(url, headers).await?;
        let response_headers = response.headers().clone();
        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| StylistError::parse(format!("json body from {url}: {e}")))?;
        Ok((body, response_headers))
    }

    /// Issue a GET with up to `max_retries` retries. A transient failure
    /// (network error, 5xx, 429) backs off `2^attempt` seconds between
    /// attempts; a request timeout is reported immediately and never
    /// retried, as are client errors other than 429.
    async fn execute(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<reqwest::Response, StylistError> {
        let mut attempt: u32 = 0;
        loop {
            let mut request = self.client.get(url);
            for (name, value) in headers {
                request = request.header(name.as_str(), value.as_str());
            }

            let err = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    let err = StylistError::transient(url, format!("status {status}"));
                    if status.as_u16() != 429 && !status.is_server_error() {
                        return Err(err);
                    }
                    err
                }
                Err(e) if e.is_timeout() => return Err(StylistError::Timeout(url.to_string())),
                Err(e) => StylistError::transient(url, e),
            };

            if attempt >= self.max_retries {
                warn!(url, attempts = attempt + 1, error = %err, "giving up after retries");
                return Err(err);
            }

            let delay = Duration::from_secs(2u64.saturating_pow(attempt));
            warn!(url, attempt = attempt + 1, wait_s = delay.as_secs(), error = %err, "retrying after backoff");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Run a batch of tasks with at most `max_concurrent` in flight. A new task
/// starts as soon as any slot frees. Results are index-for-index with the
/// submitted tasks; an individual failure is captured in its slot and never
/// aborts the batch.
pub async fn run_bounded<T, F>(tasks: Vec<F>, max_concurrent: usize) -> Vec<Result<T, StylistError>>
where
    F: Future<Output = Result<T, StylistError>> + Send + 'static,
    T: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));

    let handles: Vec<_> = tasks
        .into_iter()
        .map(|task| {
            let semaphore = Arc::clone(&semaphore);
            tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return Err(StylistError::transient("worker slot", e)),
                };
                task.await
            })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(match handle.await {
            Ok(result) => result,
            Err(e) => Err(StylistError::transient("worker task", e)),
        });
    }
    results
}
