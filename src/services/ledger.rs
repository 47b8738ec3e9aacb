//! Reward ledgers receiving XP postings.

use crate::error::{GridError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpPosting {
    pub subject: String,
    pub xp: u64,
    pub source: String,
}

#[async_trait]
pub trait RewardLedger: Send + Sync {
    /// Credit `xp` to `subject`, tagged with the engine that earned it.
    async fn post(&self, subject: &str, xp: u64, source: &str) -> Result<()>;

    /// Cumulative XP credited to `subject`.
    async fn total_xp(&self, subject: &str) -> Result<u64>;
}

#[derive(Default)]
pub struct InMemoryLedger {
    postings: Mutex<Vec<XpPosting>>,
    totals: Mutex<HashMap<String, u64>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn postings(&self) -> Vec<XpPosting> {
        self.postings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl RewardLedger for InMemoryLedger {
    async fn post(&self, subject: &str, xp: u64, source: &str) -> Result<()> {
        self.postings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(XpPosting {
                subject: subject.to_string(),
                xp,
                source: source.to_string(),
            });
        *self
            .totals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(subject.to_string())
            .or_insert(0) += xp;
        Ok(())
    }

    async fn total_xp(&self, subject: &str) -> Result<u64> {
        Ok(self
            .totals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(subject)
            .copied()
            .unwrap_or(0))
    }
}

#[derive(Debug, Deserialize)]
struct TotalResponse {
    xp: u64,
}

/// Posts to `{base}/xp` and reads totals from `{base}/xp/{subject}`, with the
/// subject percent-encoded as one path segment.
pub struct HttpRewardLedger {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRewardLedger {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl HttpRewardLedger {
    /// `{base}/seg/...` with every segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| GridError::Ledger(format!("invalid ledger url {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| GridError::Ledger(format!("ledger url {} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl RewardLedger for HttpRewardLedger {
    async fn post(&self, subject: &str, xp: u64, source: &str) -> Result<()> {
        let posting = XpPosting {
            subject: subject.to_string(),
            xp,
            source: source.to_string(),
        };
        self.client
            .post(self.endpoint(&["xp"])?)
            .timeout(Duration::from_secs(10))
            .json(&posting)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| GridError::Ledger(e.to_string()))?;
        Ok(())
    }

    async fn total_xp(&self, subject: &str) -> Result<u64> {
        let total: TotalResponse = self
            .client
            .get(self.endpoint(&["xp", subject])?)
            .timeout(Duration::from_secs(10))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| GridError::Ledger(e.to_string()))?
            .json()
            .await?;
        Ok(total.xp)
    }
}
