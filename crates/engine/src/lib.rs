//! Readyprobe engine: load, penetration and compliance phases of an
//! enterprise-readiness assessment, plus aggregation and report storage.

pub mod aggregate;
pub mod client;
pub mod compliance;
pub mod config;
pub mod load;
pub mod orchestrator;
pub mod store;
pub mod stress;
pub mod vuln;

pub use config::SuiteConfig;
pub use orchestrator::{Orchestrator, RunOutcome, RunState, RunStatus};
pub use store::{ReportStore, Verification};
