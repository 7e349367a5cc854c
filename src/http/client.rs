//! HTTP client with built-in retry logic and error handling.

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::io::Write;
use std::time::Duration;

use super::retry::{
    MAX_RETRIES, NonRetryableError, RETRY_DELAY_MS, classify_status, is_retryable,
};

/// HTTP client with built-in retry logic for network operations.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    retry_delay: Duration,
}

impl HttpClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }

    /// Overrides the pause between attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Performs a GET request with query parameters and deserializes the JSON response.
    #[tracing::instrument(skip(self, query))]
    pub async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        debug!("GET JSON from {} with query {:?}...", url, query);

        self.with_retry("GET JSON", || async {
            let response = self
                .client
                .get(url)
                .query(query)
                .send()
                .await
                .with_context(|| format!("Failed to send request to {}", url))?;

            let response = check_status(response, url)?;

            let body = response
                .bytes()
                .await
                .with_context(|| format!("Failed to read response body from {}", url))?;
            serde_json::from_slice::<T>(&body).map_err(|e| {
                anyhow::Error::from(NonRetryableError::InvalidResponse(format!(
                    "Failed to parse JSON response from {}: {}",
                    url, e
                )))
            })
        })
        .await
    }

    /// Downloads the full body of `url` into the writer produced by `create_writer`.
    ///
    /// The writer is recreated on each attempt so a retried download starts from scratch.
    #[tracing::instrument(skip(self, create_writer))]
    pub async fn download_file<W, F>(&self, url: &str, create_writer: F) -> Result<u64>
    where
        W: Write,
        F: Fn() -> Result<W>,
    {
        debug!("Downloading file from {}...", url);
        self.with_retry("Download", || self.download_file_once(url, &create_writer))
            .await
    }

    async fn download_file_once<W, F>(&self, url: &str, create_writer: &F) -> Result<u64>
    where
        W: Write,
        F: Fn() -> Result<W>,
    {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to start download from {}", url))?;

        let mut response = check_status(response, url)?;

        let mut writer =
            create_writer().map_err(|e| NonRetryableError::Local(format!("{:#}", e)))?;
        let mut downloaded_bytes: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .context("Failed to read chunk from download stream")?
        {
            writer.write_all(&chunk).map_err(|e| {
                NonRetryableError::Local(format!("Failed to write chunk to file: {}", e))
            })?;
            downloaded_bytes += chunk.len() as u64;
        }
        writer.flush().map_err(|e| {
            NonRetryableError::Local(format!("Failed to flush downloaded file: {}", e))
        })?;

        debug!(
            "Downloaded {:.2} MB",
            downloaded_bytes as f64 / (1024.0 * 1024.0)
        );

        Ok(downloaded_bytes)
    }

    async fn with_retry<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if !is_retryable(&e) => {
                    debug!("{}: non-retryable error: {}", operation_name, e);
                    return Err(e);
                }
                Err(e) if attempt >= MAX_RETRIES => {
                    return Err(e.context(format!(
                        "{} failed after {} attempts",
                        operation_name, MAX_RETRIES
                    )));
                }
                Err(e) => {
                    warn!(
                        "{}: attempt {}/{} failed ({}), retrying in {}ms...",
                        operation_name,
                        attempt,
                        MAX_RETRIES,
                        e,
                        self.retry_delay.as_millis()
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Turns an error status into either a [`NonRetryableError`] or a plain retryable error.
fn check_status(response: Response, url: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if let Some(non_retryable) = classify_status(status, response.headers(), url) {
        return Err(non_retryable.into());
    }
    Err(anyhow::anyhow!("HTTP {} from {}", status.as_u16(), url))
}
