//! Cluster operator binary support: configuration, CLI and event replay.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod cli;
pub mod config;
pub mod replay;

pub use cli::Cli;
pub use config::{ConfigError, OperatorConfig};
pub use replay::{load_events, parse_events, replay, ReplayError, ReplaySummary};
