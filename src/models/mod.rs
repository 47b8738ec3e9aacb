//! Shared data models spanning the grid layers.

pub mod observation;
pub mod order;
pub mod signal;
pub mod summary;

pub use observation::{FieldValue, Observation, Snapshot};
pub use order::{OrderRequest, OrderSide, OrderType, TimeInForce};
pub use signal::Signal;
pub use summary::{EngineOutput, GridReport, GridSummaryRow};
