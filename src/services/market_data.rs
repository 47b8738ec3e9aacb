//! Snapshot sources feeding the scan loop.

use crate::error::{GridError, Result};
use crate::models::observation::{Observation, Snapshot};
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch one fresh snapshot for the current cycle.
    async fn fetch_snapshot(&self) -> Result<Snapshot>;
}

/// Serves a fixed set of observations. Replace them between cycles with `replace`.
#[derive(Default)]
pub struct StaticSnapshotSource {
    observations: Mutex<Vec<Observation>>,
}

impl StaticSnapshotSource {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self {
            observations: Mutex::new(observations),
        }
    }

    pub fn replace(&self, observations: Vec<Observation>) {
        *self.observations.lock().unwrap_or_else(|e| e.into_inner()) = observations;
    }
}

#[async_trait]
impl SnapshotSource for StaticSnapshotSource {
    async fn fetch_snapshot(&self) -> Result<Snapshot> {
        let observations = self
            .observations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        Ok(Snapshot::new(observations))
    }
}

/// Fetches a JSON array of observations with a GET request.
///
/// Connection errors and 5xx answers are retried with exponential backoff;
/// anything else fails the fetch immediately.
pub struct HttpSnapshotSource {
    client: reqwest::Client,
    url: String,
    max_retries: usize,
}

impl HttpSnapshotSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            url: url.into(),
            max_retries: 2,
        }
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    async fn fetch_once(&self) -> std::result::Result<Vec<Observation>, reqwest::Error> {
        self.client
            .get(&self.url)
            .timeout(Duration::from_secs(30))
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Observation>>()
            .await
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect()
        || err.is_timeout()
        || err.status().map(|s| s.is_server_error()).unwrap_or(false)
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch_snapshot(&self) -> Result<Snapshot> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(200))
            .with_max_times(self.max_retries);

        let observations = (|| self.fetch_once())
            .retry(backoff)
            .when(is_transient)
            .notify(|err: &reqwest::Error, after: Duration| {
                warn!(url = %self.url, error = %err, retry_in_ms = after.as_millis() as u64, "Snapshot fetch failed, retrying");
            })
            .await
            .map_err(|e| GridError::DataSource(format!("{}: {}", self.url, e)))?;

        debug!(url = %self.url, observations = observations.len(), "Fetched snapshot");
        Ok(Snapshot::new(observations))
    }
}
