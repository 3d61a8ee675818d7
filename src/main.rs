//! # Cluster operator entry point
//!
//! ## Initialization Sequence
//!
//! 1. **Configuration** - TOML file (optional) overlaid with CLI flags, validated
//! 2. **Resource store** - the store cluster resources are read from and written to
//! 3. **Schema bootstrap** - register the cluster resource schema, retrying on failure
//! 4. **Controller** - spawn the reconciler inside its single-owner event loop
//! 5. **Replay** - feed recorded watch events, if any, through the controller
//!
//! The operator then runs until Ctrl+C, or exits right away with `--once`.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cluster_operator::{load_events, replay, Cli, OperatorConfig};
use operator_cluster::ActorClusterFactory;
use operator_core::{InMemoryResourceStore, ResourceStore, TracingResourceStore};
use operator_reconciler::{
    initialize_schema, spawn_controller, InMemorySchemaRegistry, ReconcilerBuilder,
    SchemaDefinition,
};

#[tokio::main]
async fn main() -> Result<()> {
    let start_time = Instant::now();
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    info!(
        namespace = config.namespace.as_deref().unwrap_or(""),
        cluster_wide = config.cluster_wide,
        recover_quorum_loss = config.recover_quorum_loss,
        "Cluster operator starting"
    );

    let store: Arc<dyn ResourceStore> =
        Arc::new(TracingResourceStore::new(InMemoryResourceStore::new()));

    let registry = InMemorySchemaRegistry::new();
    initialize_schema(
        &registry,
        &SchemaDefinition::cluster_schema(),
        config.bootstrap_config(),
    )
    .await
    .context("Schema initialization failed")?;

    let factory = Arc::new(ActorClusterFactory::new(
        config.cluster_config(Arc::clone(&store)),
    ));
    let reconciler = ReconcilerBuilder::new()
        .with_config(config.reconciler_config())
        .with_store(store)
        .with_factory(factory)
        .build()
        .context("Failed to build reconciler")?;

    let (handle, task) = spawn_controller(reconciler, config.queue_capacity);
    info!("Controller started in {:?}", start_time.elapsed());

    if let Some(path) = &cli.events {
        let events = load_events(path)
            .with_context(|| format!("Failed to load events from {}", path.display()))?;
        replay(&handle, events).await.context("Replay failed")?;
    }

    if !cli.once {
        info!("Cluster operator is running. Press Ctrl+C to stop.");
        wait_for_shutdown().await;
    }

    handle.shutdown().await;
    let reconciler = task.await.context("Controller task failed")?;
    let metrics = reconciler.metrics().snapshot();
    info!(
        active = metrics.active,
        created = metrics.created,
        deleted = metrics.deleted,
        failed = metrics.failed,
        "Cluster operator stopped"
    );
    Ok(())
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(cli: &Cli) -> Result<OperatorConfig> {
    let base = match &cli.config {
        Some(path) => OperatorConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => OperatorConfig::default(),
    };
    let config = base.with_cli(cli);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Wait for shutdown signal (Ctrl+C).
async fn wait_for_shutdown() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(err) => error!("Failed to listen for shutdown signal: {}", err),
    }
}
