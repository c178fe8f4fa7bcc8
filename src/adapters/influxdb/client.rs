//! InfluxDB v2 REST client
//!
//! Implements [`TimeSeriesStore`] over the v2 HTTP API: token auth,
//! line-protocol writes, bucket management with tiered retention, and a
//! Flux task that downsamples aged raw points into the compressed
//! bucket.

use crate::adapters::influxdb::line::{encode_global, encode_position};
use crate::adapters::traits::TimeSeriesStore;
use crate::config::InfluxDbConfig;
use crate::domain::{GlobalMetrics, ProcessedAsset, Result, StoreError, TidemarkError};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const DOWNSAMPLE_TASK_NAME: &str = "tidemark-downsample";

/// Time-series store backed by an InfluxDB v2 instance
pub struct InfluxDbStore {
    client: Client,
    config: InfluxDbConfig,
}

#[derive(Debug, Deserialize)]
struct OrgsResponse {
    orgs: Vec<OrgEntry>,
}

#[derive(Debug, Deserialize)]
struct OrgEntry {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct BucketsResponse {
    buckets: Vec<BucketEntry>,
}

#[derive(Debug, Deserialize)]
struct BucketEntry {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TasksResponse {
    tasks: Vec<TaskEntry>,
}

#[derive(Debug, Deserialize)]
struct TaskEntry {
    #[allow(dead_code)]
    id: String,
    name: String,
}

impl InfluxDbStore {
    /// Create a new store from configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: InfluxDbConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                TidemarkError::Configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client, config })
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("Authorization", format!("Token {}", self.config.token))
    }

    async fn send(&self, request: RequestBuilder) -> std::result::Result<Response, StoreError> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(StoreError::AuthenticationFailed(format!(
                    "status {}",
                    response.status().as_u16()
                )))
            }
            _ => Ok(response),
        }
    }

    async fn org_id(&self) -> std::result::Result<String, StoreError> {
        let url = format!("{}/api/v2/orgs", self.config.url);
        let response = self
            .send(self.authed(self.client.get(&url).query(&[("org", &self.config.org)])))
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::InvalidResponse(format!(
                "org lookup returned status {}",
                response.status().as_u16()
            )));
        }

        let orgs: OrgsResponse = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

        orgs.orgs
            .into_iter()
            .find(|o| o.name == self.config.org)
            .map(|o| o.id)
            .ok_or_else(|| {
                StoreError::BucketSetupFailed(format!("organization '{}' not found", self.config.org))
            })
    }

    async fn find_bucket(&self, name: &str) -> std::result::Result<Option<BucketEntry>, StoreError> {
        let url = format!("{}/api/v2/buckets", self.config.url);
        let response = self
            .send(self.authed(self.client.get(&url).query(&[("name", name)])))
            .await?;

        // A 404 here just means no bucket with that name
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(StoreError::InvalidResponse(format!(
                "bucket lookup returned status {}",
                response.status().as_u16()
            )));
        }

        let buckets: BucketsResponse = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

        Ok(buckets.buckets.into_iter().find(|b| b.name == name))
    }

    async fn ensure_bucket(
        &self,
        org_id: &str,
        name: &str,
        retention_days: u64,
    ) -> std::result::Result<(), StoreError> {
        let retention_seconds = retention_days * 24 * 60 * 60;
        let shard_seconds = shard_duration_seconds(retention_seconds);
        let retention_rule = serde_json::json!({
            "type": "expire",
            "everySeconds": retention_seconds,
            "shardGroupDurationSeconds": shard_seconds,
        });

        match self.find_bucket(name).await? {
            Some(bucket) => {
                let url = format!("{}/api/v2/buckets/{}", self.config.url, bucket.id);
                let body = serde_json::json!({ "retentionRules": [retention_rule] });
                let response = self.send(self.authed(self.client.patch(&url).json(&body))).await?;
                if !response.status().is_success() {
                    return Err(StoreError::BucketSetupFailed(format!(
                        "failed to update retention on '{name}': status {}",
                        response.status().as_u16()
                    )));
                }
                tracing::info!(
                    bucket = name,
                    retention_days = retention_days,
                    shard_hours = shard_seconds / 3600,
                    "Updated bucket retention"
                );
            }
            None => {
                let url = format!("{}/api/v2/buckets", self.config.url);
                let body = serde_json::json!({
                    "orgID": org_id,
                    "name": name,
                    "retentionRules": [retention_rule],
                });
                let response = self.send(self.authed(self.client.post(&url).json(&body))).await?;
                if !response.status().is_success() {
                    return Err(StoreError::BucketSetupFailed(format!(
                        "failed to create bucket '{name}': status {}",
                        response.status().as_u16()
                    )));
                }
                tracing::info!(
                    bucket = name,
                    retention_days = retention_days,
                    shard_hours = shard_seconds / 3600,
                    "Created bucket"
                );
            }
        }

        Ok(())
    }

    async fn ensure_downsample_task(&self, org_id: &str) -> std::result::Result<(), StoreError> {
        let url = format!("{}/api/v2/tasks", self.config.url);
        let response = self
            .send(self.authed(self.client.get(&url).query(&[("name", DOWNSAMPLE_TASK_NAME)])))
            .await?;

        if response.status().is_success() {
            let tasks: TasksResponse = response
                .json()
                .await
                .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
            if tasks.tasks.iter().any(|t| t.name == DOWNSAMPLE_TASK_NAME) {
                tracing::debug!(task = DOWNSAMPLE_TASK_NAME, "Downsampling task already exists");
                return Ok(());
            }
        }

        let flux = self.downsample_flux();
        let body = serde_json::json!({
            "orgID": org_id,
            "status": "active",
            "flux": flux,
        });
        let response = self.send(self.authed(self.client.post(&url).json(&body))).await?;
        if !response.status().is_success() {
            return Err(StoreError::TaskSetupFailed(format!(
                "failed to create task '{DOWNSAMPLE_TASK_NAME}': status {}",
                response.status().as_u16()
            )));
        }

        tracing::info!(
            task = DOWNSAMPLE_TASK_NAME,
            min_age_hours = self.config.compression_after_hours,
            window_hours = self.config.compression_window_hours,
            "Created downsampling task"
        );
        Ok(())
    }

    /// Flux script that promotes aged raw points into the compressed
    /// bucket, one aggregation window per run
    fn downsample_flux(&self) -> String {
        let window = self.config.compression_window_hours;
        let min_age = self.config.compression_after_hours;
        format!(
            "option task = {{name: \"{task}\", every: {window}h}}\n\n\
             from(bucket: \"{raw}\")\n\
             \t|> range(start: -{start}h, stop: -{min_age}h)\n\
             \t|> aggregateWindow(every: {window}h, fn: mean, createEmpty: false)\n\
             \t|> to(bucket: \"{compressed}\", org: \"{org}\")\n",
            task = DOWNSAMPLE_TASK_NAME,
            raw = self.config.bucket,
            compressed = self.config.compressed_bucket,
            org = self.config.org,
            start = min_age + window,
            min_age = min_age,
            window = window,
        )
    }

    async fn write_lines(&self, lines: &str) -> std::result::Result<(), StoreError> {
        let url = format!("{}/api/v2/write", self.config.url);
        let response = self
            .send(
                self.authed(
                    self.client
                        .post(&url)
                        .query(&[
                            ("org", self.config.org.as_str()),
                            ("bucket", self.config.bucket.as_str()),
                            ("precision", "ns"),
                        ])
                        .header("Content-Type", "text/plain; charset=utf-8")
                        .body(lines.to_string()),
                ),
            )
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::WriteFailed(format!("status {status}: {body}")));
        }

        Ok(())
    }
}

#[async_trait]
impl TimeSeriesStore for InfluxDbStore {
    async fn ensure_buckets(&self) -> Result<()> {
        let org_id = self.org_id().await?;
        self.ensure_bucket(&org_id, &self.config.bucket, self.config.raw_retention_days)
            .await?;
        self.ensure_bucket(
            &org_id,
            &self.config.compressed_bucket,
            self.config.compressed_retention_days,
        )
        .await?;
        self.ensure_downsample_task(&org_id).await?;
        Ok(())
    }

    async fn write_positions(&self, records: &[ProcessedAsset]) -> Result<()> {
        let lines: Vec<String> = records.iter().filter_map(encode_position).collect();
        if lines.is_empty() {
            tracing::debug!("No encodable position records, skipping write");
            return Ok(());
        }

        self.write_lines(&lines.join("\n")).await?;
        tracing::info!(count = lines.len(), bucket = %self.config.bucket, "Wrote position records");
        Ok(())
    }

    async fn write_global(&self, record: &GlobalMetrics) -> Result<()> {
        let line = encode_global(record).ok_or_else(|| {
            TidemarkError::Store(StoreError::WriteFailed(
                "global record produced no fields".to_string(),
            ))
        })?;

        self.write_lines(&line).await?;
        tracing::info!(bucket = %self.config.bucket, "Wrote global aggregate");
        Ok(())
    }
}

/// Shard group duration tiers by retention length
fn shard_duration_seconds(retention_seconds: u64) -> u64 {
    let hours = retention_seconds / 3600;
    if hours <= 48 {
        3_600 // 1h
    } else if hours <= 168 {
        21_600 // 6h
    } else if hours <= 720 {
        86_400 // 1d
    } else if hours <= 4320 {
        604_800 // 7d
    } else {
        1_209_600 // 14d
    }
}
