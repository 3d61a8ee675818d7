//! CLI definitions using clap.

use std::path::PathBuf;

use clap::Parser;

/// Cluster operator
#[derive(Parser, Debug, Default)]
#[command(name = "cluster-operator")]
#[command(version)]
#[command(about = "Keeps one manager running per declared database cluster")]
#[command(
    long_about = "Watches cluster resources and starts, updates or stops a cluster manager for each one, applying the cluster's failure policy when it has failed."
)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Namespace to manage
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Manage resources annotated as cluster-wide in every namespace
    #[arg(long, default_value_t = false)]
    pub cluster_wide: bool,

    /// Register the cluster resource schema at startup
    #[arg(long)]
    pub create_crd: Option<bool>,

    /// Recover clusters that lost quorum instead of marking them failed
    #[arg(long, default_value_t = false)]
    pub recover_quorum_loss: bool,

    /// Service account for cluster member pods
    #[arg(long)]
    pub service_account: Option<String>,

    /// YAML file of watch events to replay through the controller
    #[arg(short, long)]
    pub events: Option<PathBuf>,

    /// Exit after replaying events instead of waiting for Ctrl+C
    #[arg(long, default_value_t = false)]
    pub once: bool,
}
