//! Process entry point. Grounded on `aura-cli/src/main.rs`'s
//! `clap::Parser` + `tracing_subscriber::fmt::init` shape, and on
//! `original_source/service/ptt.go`'s `NewPtt`/`Start` for the order
//! components get wired together in.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use k256::ecdsa::SigningKey;
use meshid_config::Config;
use meshid_consensus::{LoopbackRegistry, RaftGroup, StartupMode};
use meshid_crypto::{derive_raft_id, generate_key, uncompressed_xy_of};
use meshid_node::{Coordinator, MeEntity};
use meshid_rpc::{dispatch, MeRpcService, RpcRequest};
use meshid_store::{KvStore, MemStore};
use meshid_types::{MeshId, NodeId, NodeType};

#[derive(Parser)]
#[command(name = "meshid-node", about = "Multi-device identity and membership node", long_about = None)]
struct Cli {
    /// Path to the node's TOML configuration file.
    #[arg(short, long, default_value = "meshid.toml")]
    config: PathBuf,

    /// This device's weight class in the membership quorum (§3).
    #[arg(long, value_enum, default_value_t = DeviceClass::Desktop)]
    node_type: DeviceClass,

    /// Enable debug-level tracing.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum DeviceClass {
    Mobile,
    Desktop,
    Server,
}

impl From<DeviceClass> for NodeType {
    fn from(class: DeviceClass) -> Self {
        match class {
            DeviceClass::Mobile => NodeType::Mobile,
            DeviceClass::Desktop => NodeType::Desktop,
            DeviceClass::Server => NodeType::Server,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let config = Config::resolve(&cli.config).context("loading node configuration")?;
    tracing::info!(data_dir = %config.data_dir.display(), max_peers = config.max_peers, "loaded configuration");

    let node_type: NodeType = cli.node_type.into();

    // No existing identity to rejoin: found a brand-new one, owned by its
    // first device, matching the single-device bootstrap scenario (§2).
    let node_signing_key = SigningKey::random(&mut rand::rngs::OsRng);
    let self_node_id = NodeId(uncompressed_xy_of(&node_signing_key));
    let founding_key = generate_key();
    let owner_id = MeshId::ZERO.with_suffix(&founding_key.address.0);

    tracing::info!(%self_node_id, %owner_id, weight = node_type.weight(), "founding a new identity");

    // The key-value store is an external interface this crate only
    // consumes through `KvStore` (§1 Non-goal); `MemStore` stands in for a
    // real persistent engine so the wiring below can run end to end.
    let kv: Arc<dyn KvStore> = Arc::new(MemStore::new());

    let raft_config = Arc::new(
        openraft::Config {
            heartbeat_interval: 250,
            election_timeout_min: 750,
            election_timeout_max: 1500,
            ..Default::default()
        }
        .validate()
        .context("building raft config")?,
    );
    let raft_id = derive_raft_id(&self_node_id).0;
    let raft_group = RaftGroup::start(
        raft_id,
        StartupMode::BootstrapSelf { weight: node_type.weight() },
        LoopbackRegistry::new(),
        raft_config,
    )
    .await;

    let coordinator: Arc<Coordinator<()>> = Arc::new(Coordinator::new(self_node_id, owner_id, kv, raft_group));
    coordinator
        .me
        .propose_add_node(self_node_id, node_type.weight())
        .await
        .context("seating the founding device in my_nodes")?;

    let entity = Arc::new(MeEntity::new(owner_id, coordinator.me.clone()));
    coordinator.registry.register_entity(entity).context("registering founding identity")?;

    tracing::info!("node ready; me_* RPC surface mounted (HTTP binding out of scope)");

    let rpc = MeRpcService::new(coordinator.clone());
    let self_check = dispatch(
        &rpc,
        RpcRequest { jsonrpc: "2.0".into(), id: serde_json::Value::from(1), method: "get".into(), params: serde_json::Value::Null },
    )
    .await;
    tracing::debug!(response = ?self_check, "self-check RPC round trip");

    let mut stop_rx = coordinator.watch_stop();
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received ctrl-c, shutting down");
            coordinator.shutdown();
        }
        _ = stop_rx.changed() => {
            tracing::info!("stop signal received");
        }
    }

    Ok(())
}
