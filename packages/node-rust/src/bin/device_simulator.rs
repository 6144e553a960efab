//! Standalone device simulator host.
//!
//! Loads simulator settings from a JSON file, prints every emitted message as
//! one JSON line on stdout and treats every stdin line as an inbound message.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use devsim_core::{NodeStatus, SimulatorSettings};
use devsim_node::{init_tracing, LogFormat, NodeConfig, SimulatorNode, Sinks};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "device-simulator", version, about = "Emits randomized device payloads")]
struct Cli {
    /// JSON settings file.
    #[arg(long, env = "DEVSIM_SETTINGS")]
    settings: PathBuf,

    /// Node id; a random UUID when omitted.
    #[arg(long, env = "DEVSIM_NODE_ID")]
    node_id: Option<String>,

    /// Seed for a reproducible sample sequence.
    #[arg(long, env = "DEVSIM_SEED")]
    seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

fn load_settings(path: &Path) -> anyhow::Result<SimulatorSettings> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading settings from {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing settings in {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    let settings = load_settings(&cli.settings)?;
    let mut node_config = cli.node_id.map(NodeConfig::with_id).unwrap_or_default();
    node_config.seed = cli.seed;

    let (emit_tx, mut emitted) = mpsc::unbounded_channel();
    let (status_tx, mut statuses) = mpsc::unbounded_channel::<NodeStatus>();
    let (debug_tx, mut mirrored) = mpsc::unbounded_channel();
    let sinks = Sinks::new(Arc::new(emit_tx), Arc::new(status_tx)).with_debug(Arc::new(debug_tx));

    let mut node = SimulatorNode::start(node_config, &settings, sinks)?;
    let handle = node.handle();
    info!(node_id = %node.id(), topic = %settings.topic, "device simulator running");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result.context("listening for ctrl-c")?;
                info!("interrupt received, shutting down");
                break;
            }
            Some(message) = emitted.recv() => {
                println!("{}", serde_json::to_string(&message)?);
            }
            Some(status) = statuses.recv() => {
                info!(node_id = %handle.id(), %status, "status");
            }
            Some(mirror) = mirrored.recv() => {
                debug!(
                    node_id = %mirror.id,
                    name = %mirror.name,
                    topic = %mirror.topic,
                    payload = %serde_json::to_string(&mirror.msg.payload)?,
                    "debug"
                );
            }
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => {
                    let inbound = serde_json::from_str(&line).unwrap_or(Value::String(line));
                    if let Err(err) = handle.input(&inbound).await {
                        warn!(node_id = %handle.id(), error = %err, "input trigger failed");
                    }
                }
                None => stdin_open = false,
            },
        }
    }

    node.stop().await;
    Ok(())
}
