//! Core application primitives (runner, orchestrator, scheduler, HTTP)

pub mod bootstrap;
pub mod http;
pub mod orchestrator;
pub mod runner;
pub mod scheduler;
pub mod state;

pub use bootstrap::GridApp;
pub use http::*;
pub use orchestrator::*;
pub use runner::*;
pub use scheduler::*;
pub use state::*;
