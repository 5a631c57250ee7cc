//! # inspector_server — demo host
//!
//! Runs an in-memory game world with the live entity inspector attached.
//!
//! ## Startup sequence
//!
//! 1. Load config from `<data-dir>/config.json` (CLI flags override the
//!    transport settings).
//! 2. Populate the demo world and start its world thread.
//! 3. Register the lifecycle and tick observers and the 50 ms
//!    position-flush job.
//! 4. Serve the WebSocket gateway until ctrl-c.

mod demo;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use inspector_core::observers::{LifecycleObserver, TickObserver};
use inspector_core::{Inspector, InspectorConfig, PacketAdapter};
use inspector_host::clock::SystemClock;
use inspector_host::executor::WorldThread;
use inspector_host::introspect::{DynObject, ReflectedValue};
use inspector_host::world::HostWorld;
use inspector_net::InspectorGateway;

/// How often the position batch is flushed onto the bus.
const FLUSH_PERIOD: Duration = Duration::from_millis(50);

#[derive(Debug, Parser)]
#[command(name = "inspector_server", about = "Demo game server with the live entity inspector")]
struct Args {
    /// Gateway port.
    #[arg(long)]
    port: Option<u16>,

    /// Gateway bind address.
    #[arg(long)]
    bind: Option<String>,

    /// Data directory for config, drafts, and assets.
    #[arg(long, default_value = "inspector-data")]
    data_dir: PathBuf,

    /// Asset root to load into the catalog (defaults to
    /// `<data-dir>/assets` when present).
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Maximum concurrent diagnostic clients.
    #[arg(long)]
    max_clients: Option<usize>,

    /// World ticks per second.
    #[arg(long, default_value_t = 30.0)]
    tick_rate: f64,

    /// Log filter (EnvFilter syntax).
    #[arg(long, default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log)?)
        .init();

    info!("inspector server starting");

    // Config: file first, CLI overrides on top.
    let mut config = InspectorConfig::load(&args.data_dir);
    if let Some(port) = args.port {
        config.websocket_port = port;
    }
    if let Some(bind) = &args.bind {
        config.websocket_bind = bind.clone();
    }
    if let Some(max_clients) = args.max_clients {
        config.websocket_max_clients = max_clients;
    }
    let bind = config.websocket_bind.clone();
    let port = config.websocket_port;
    let websocket_enabled = config.websocket_enabled;

    let inspector = Inspector::with_config(args.data_dir.clone(), config);

    // Demo world + observers.
    let world = HostWorld::new("overworld", "Overworld", Arc::new(SystemClock));
    demo::populate(&world);
    world.register_observer(Arc::new(demo::Wanderer));
    world.register_observer(Arc::new(LifecycleObserver::new(inspector.clone())));
    world.register_observer(Arc::new(TickObserver::new(inspector.clone())));
    info!(entities = world.entity_count(), "demo world populated");

    let mut world_thread = WorldThread::spawn(world.clone(), args.tick_rate);
    inspector.attach_world(world_thread.handle());

    if PacketAdapter::install(&inspector) {
        info!("packet adapter bound");
    }
    // A couple of observed packets so the packet log has content when
    // enabled.
    PacketAdapter::log_inbound(
        "Connect",
        1,
        "ConnectHandler",
        DynObject::new("Connect")
            .field("identityToken", ReflectedValue::str("demo-token"))
            .field("username", ReflectedValue::str("demo"))
            .into_ref(),
    );

    // Asset catalog.
    let asset_root = args
        .assets
        .clone()
        .unwrap_or_else(|| args.data_dir.join("assets"));
    if asset_root.is_dir() {
        let count = inspector.load_assets(&asset_root);
        info!(count, root = %asset_root.display(), "asset catalog loaded");
    }

    // 50 ms flush job, posting through the world's cooperative queue.
    let flush_inspector = inspector.clone();
    let flush_handle = world_thread.handle();
    let flush_job = tokio::spawn(async move {
        let mut interval = tokio::time::interval(FLUSH_PERIOD);
        loop {
            interval.tick().await;
            let inspector = flush_inspector.clone();
            if !flush_handle.execute(move |_| inspector.flush_position_batch()) {
                break;
            }
        }
    });

    // Gateway.
    let gateway = Arc::new(InspectorGateway::new(
        inspector.clone(),
        inspector.registry().clone(),
    ));
    let gateway_task = if websocket_enabled {
        let gateway = gateway.clone();
        let bind = bind.clone();
        Some(tokio::spawn(async move { gateway.run(&bind, port).await }))
    } else {
        info!("websocket gateway disabled by config");
        None
    };

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    gateway.stop();
    if let Some(task) = gateway_task {
        let _ = task.await;
    }
    flush_job.abort();
    inspector.teardown();
    world_thread.stop();

    info!("inspector server stopped");
    Ok(())
}
