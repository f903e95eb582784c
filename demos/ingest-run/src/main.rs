//! Thin wiring binary for one ingest job: loads a `JobConfig` from YAML,
//! resolves a source, and wires source -> transform chain -> batcher ->
//! HTTP dispatcher over bounded channels, the same pipeline shape the
//! library crates implement, with graceful Ctrl-C cancellation.
//!
//! This is not a general-purpose CLI (no subcommands, no multi-pipeline
//! YAML) — it runs exactly one job per invocation, source and all.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ingest_core::traits::{BatchMessage, Message};
use ingest_core::{Batcher, JobState, Sink, Source, Stage};
use ingest_io::batcher::SizeCountBatcher;
use ingest_io::dispatch::Dispatcher;
use ingest_io::source;
use ingest_io::throttle::{self, ThrottleGate};
use ingest_tx::ChainStage;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for one ingest run.
#[derive(Parser, Debug)]
#[command(name = "ingest-run")]
#[command(about = "Run one analytics-ingest job from a YAML job config")]
struct Args {
    /// Path to the job configuration YAML file.
    #[arg(short, long)]
    config: std::path::PathBuf,

    /// Source location: a local glob pattern, or a `gs://`/`s3://` prefix.
    #[arg(short, long)]
    source: String,

    /// Channel capacity between pipeline stages (defaults to the
    /// configured high-water mark when unset).
    #[arg(long)]
    channel_capacity: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let yaml = std::fs::read_to_string(&args.config)
        .with_context(|| format!("reading job config {}", args.config.display()))?;
    let config: ingest_core::JobConfig =
        serde_yaml::from_str(&yaml).context("parsing job config")?;

    let state = JobState::new(config)?;
    let capacity = args
        .channel_capacity
        .unwrap_or_else(|| state.config.effective_high_water());

    let cancel = CancellationToken::new();
    let throttle = ThrottleGate::new();
    if state.config.throttle.enabled() {
        let throttle_state = state.clone();
        let throttle_gate = throttle.clone();
        let throttle_cancel = cancel.child_token();
        tokio::spawn(async move {
            throttle::run(throttle_state, throttle_gate, throttle_cancel).await;
        });
    }

    let mut src = source::resolve(state.clone(), &args.source, throttle)?;
    let mut chain = ChainStage::new(state.clone());
    let mut batcher = SizeCountBatcher::new(state.clone());
    let mut dispatcher = Dispatcher::new(state.clone())?;

    let (record_tx, record_rx) = tokio::sync::mpsc::channel::<Message>(capacity);
    let (chain_tx, chain_rx) = tokio::sync::mpsc::channel::<Message>(capacity);
    let (batch_tx, batch_rx) = tokio::sync::mpsc::channel::<BatchMessage>(capacity);

    let mut handles = Vec::new();
    let c = cancel.child_token();
    handles.push(tokio::spawn(async move { src.run(record_tx, c).await }));
    let c = cancel.child_token();
    handles.push(tokio::spawn(
        async move { chain.run(record_rx, chain_tx, c).await },
    ));
    let c = cancel.child_token();
    handles.push(tokio::spawn(
        async move { batcher.run(chain_rx, batch_tx, c).await },
    ));
    let c = cancel.child_token();
    handles.push(tokio::spawn(
        async move { dispatcher.run(batch_rx, c).await },
    ));

    let ctrl_c_cancel = cancel.clone();
    let ctrl_c_state = state.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::warn!("received ctrl-c, cancelling run");
            ctrl_c_state.mark_cancelled();
            ctrl_c_cancel.cancel();
        }
    });

    for handle in handles {
        let _ = handle.await;
    }

    let summary = state.finish();
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
