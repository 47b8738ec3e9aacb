//! Adapters for the collaborators the grid talks to.

pub mod executor;
pub mod ledger;
pub mod market_data;
pub mod notifier;

pub use executor::{ActionExecutor, PaperExecutor};
pub use ledger::{HttpRewardLedger, InMemoryLedger, RewardLedger, XpPosting};
pub use market_data::{HttpSnapshotSource, SnapshotSource, StaticSnapshotSource};
pub use notifier::{LogNotifier, MilestoneNotifier, RecordingNotifier};
