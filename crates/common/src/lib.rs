//! Common utilities and types shared across readyprobe crates.

pub mod error;
pub mod hash;
pub mod score;
pub mod timestamp;

pub use error::{Error, Result};
pub use timestamp::{RunId, Timestamp};
