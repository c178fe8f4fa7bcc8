//! HTTP client for the Hyperdash analytics and Hyperliquid info APIs
//!
//! Implements [`MarketDataSource`] over plain REST. Every fetch returns
//! `Option`: rate limits and transient server errors are retried with
//! exponential backoff, authorization rejections give up immediately,
//! and exhausted retries surface as absence rather than an error.

use crate::adapters::traits::MarketDataSource;
use crate::config::SourcesConfig;
use crate::domain::{
    FundingEntry, LiquidationLevels, PositionSummary, Result, SourceError, TrendRow,
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, ClientBuilder, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Market-data source backed by the Hyperdash and Hyperliquid REST APIs
pub struct HyperdashSource {
    client: Client,
    config: SourcesConfig,
}

impl HyperdashSource {
    /// Create a new source from configuration
    ///
    /// # Errors
    ///
    /// Returns a source error if the HTTP client cannot be built.
    pub fn new(config: SourcesConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::ConnectionFailed(format!("cannot build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Execute a request with retries and exponential backoff
    ///
    /// Each failed attempt is classified into a [`SourceError`];
    /// retryable errors (rate limits, transient server errors, connection
    /// failures, malformed bodies) back off and try again, terminal ones
    /// (401/403) give up immediately. Exhausted retries surface as
    /// absence per the source contract.
    async fn execute_with_retry<T, F>(&self, label: &str, build: F) -> Option<T>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let retry = &self.config.retry;

        for attempt in 0..retry.max_retries {
            if attempt > 0 {
                let delay = retry
                    .backoff_base_seconds
                    .saturating_mul(1 << attempt)
                    .min(retry.max_delay_seconds);
                tracing::warn!(
                    endpoint = label,
                    attempt = attempt,
                    delay_secs = delay,
                    "Retrying request"
                );
                tokio::time::sleep(Duration::from_secs(delay)).await;
            }

            let err = match execute_once(build()).await {
                Ok(value) => return Some(value),
                Err(err) => err,
            };

            if !err.is_retryable() {
                tracing::error!(endpoint = label, error = %err, "Request rejected, not retrying");
                return None;
            }
            tracing::warn!(endpoint = label, error = %err, "Request failed");
        }

        tracing::error!(
            endpoint = label,
            max_retries = retry.max_retries,
            "Giving up after exhausting retries"
        );
        None
    }
}

/// Send one request and classify any failure
async fn execute_once<T: DeserializeOwned>(
    request: RequestBuilder,
) -> std::result::Result<T, SourceError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            SourceError::Timeout(e.to_string())
        } else {
            SourceError::ConnectionFailed(e.to_string())
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(classify_status(status));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| SourceError::InvalidResponse(e.to_string()))
}

fn classify_status(status: StatusCode) -> SourceError {
    let message = status.canonical_reason().unwrap_or("unknown").to_string();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            SourceError::Unauthorized(format!("status {}, check the API key", status.as_u16()))
        }
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
            SourceError::RateLimited(format!("status {}", status.as_u16()))
        }
        s if s.is_server_error() => SourceError::ServerError {
            status: s.as_u16(),
            message,
        },
        s => SourceError::ClientError {
            status: s.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl MarketDataSource for HyperdashSource {
    async fn fetch_position_summary(&self) -> Option<PositionSummary> {
        let url = format!("{}/summary", self.config.hyperdash_url);
        self.execute_with_retry("summary", || self.client.get(&url))
            .await
    }

    async fn fetch_ls_trend(&self) -> Option<Vec<TrendRow>> {
        let url = format!("{}/ls_trend", self.config.hyperdash_url);
        self.execute_with_retry("ls_trend", || self.client.get(&url))
            .await
    }

    async fn fetch_liquidation(&self, asset: &str) -> Option<LiquidationLevels> {
        let url = format!(
            "{}/liquidation-data-v2?ticker={}&days={}",
            self.config.hyperdash_url, asset, self.config.liquidation_days
        );
        self.execute_with_retry("liquidation", || {
            let mut request = self.client.get(&url);
            if let Some(key) = &self.config.api_key {
                request = request.header("X-Api-Key", key);
            }
            request
        })
        .await
    }

    async fn fetch_funding_history(&self, asset: &str) -> Option<Vec<FundingEntry>> {
        let url = format!("{}/info", self.config.hyperliquid_url);
        let end_time = Utc::now().timestamp_millis();
        let start_time = end_time - (self.config.funding_window_hours as i64) * 3_600_000;
        let body = serde_json::json!({
            "type": "fundingHistory",
            "coin": asset,
            "startTime": start_time,
            "endTime": end_time,
        });

        self.execute_with_retry("fundingHistory", || self.client.post(&url).json(&body))
            .await
    }
}
