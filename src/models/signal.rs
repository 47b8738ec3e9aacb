use serde::{Deserialize, Serialize};

/// One engine's detection for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub ticker: String,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub reason: String,
}

impl Signal {
    /// Confidence is clamped into `[0, 1]`; NaN becomes 0.
    pub fn new(ticker: impl Into<String>, confidence: f64, reason: impl Into<String>) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            ticker: ticker.into(),
            confidence,
            reason: reason.into(),
        }
    }
}
