//! Action executors used by active engines.

use crate::error::{GridError, Result};
use crate::models::order::OrderRequest;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::info;

#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Submit one order. An `Err` means nothing was executed.
    async fn submit(&self, order: &OrderRequest) -> Result<()>;
}

/// Records orders instead of sending them anywhere.
///
/// Tickers added with `reject_ticker` fail, which lets tests drive the
/// failed-action path.
#[derive(Default)]
pub struct PaperExecutor {
    submitted: Mutex<Vec<OrderRequest>>,
    rejected: Mutex<HashSet<String>>,
}

impl PaperExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_ticker(&self, ticker: impl Into<String>) {
        self.rejected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(ticker.into());
    }

    pub fn submitted(&self) -> Vec<OrderRequest> {
        self.submitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl ActionExecutor for PaperExecutor {
    async fn submit(&self, order: &OrderRequest) -> Result<()> {
        let rejected = self
            .rejected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&order.ticker);
        if rejected {
            return Err(GridError::execution(&order.ticker, "rejected by paper executor"));
        }

        info!(
            ticker = %order.ticker,
            quantity = order.quantity,
            side = ?order.side,
            order_type = ?order.order_type,
            tif = ?order.time_in_force,
            "Paper order filled for {}",
            order.ticker
        );
        self.submitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(order.clone());
        Ok(())
    }
}
