use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use spc_bridge::mqtt::adapter::{self, BridgeHooks};
use spc_bridge::mqtt::publisher::Publisher;
use spc_bridge::mqtt::router::{self, CommandQueue, QUEUE_CAPACITY};
use spc_bridge::{watchdog, BridgeState, Config, PanelClient};

fn parse_config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().peekable();
    while let Some(a) = args.next() {
        if a == "-c" || a == "--config" {
            if let Some(v) = args.next() {
                return Some(PathBuf::from(v));
            }
        } else if let Some(rest) = a.strip_prefix("--config=") {
            return Some(PathBuf::from(rest));
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let Some(config_path) = parse_config_path_from_args() else {
        eprintln!("Usage: spc-bridge -c <config.yaml>");
        std::process::exit(2);
    };

    // Anything wrong in here is fatal before the loops start.
    let config = Config::load(&config_path)
        .map_err(|e| anyhow::anyhow!("config {}: {}", config_path.display(), e))?;
    std::fs::create_dir_all(&config.spc.session_cache_dir).map_err(|e| {
        anyhow::anyhow!(
            "session_cache_dir {}: {}",
            config.spc.session_cache_dir.display(),
            e
        )
    })?;

    info!(
        "spc-bridge starting: panel {} → mqtt {}:{} (base '{}')",
        config.spc.host, config.mqtt.host, config.mqtt.port, config.mqtt.base_topic
    );

    let panel = Arc::new(PanelClient::new(&config.spc)?);
    let (mqtt_client, event_loop) = adapter::connect(&config.mqtt);
    let publisher = Arc::new(Publisher::new(mqtt_client.clone(), &config.mqtt));
    let queue = Arc::new(CommandQueue::new(QUEUE_CAPACITY));

    let hooks = Arc::new(BridgeHooks {
        client: mqtt_client.clone(),
        base_topic: config.mqtt.base_topic.clone(),
        controle: config.watchdog.controle.clone(),
        qos: config.mqtt.qos,
        queue: Arc::clone(&queue),
        publisher: Arc::clone(&publisher),
    });

    let state = Arc::new(BridgeState::new(config, panel));
    let cancel = CancellationToken::new();

    let mut tasks = Vec::new();
    tasks.push(tokio::spawn(adapter::run_event_loop(
        event_loop,
        hooks,
        cancel.clone(),
    )));
    tasks.push(tokio::spawn(router::run(
        Arc::clone(&state),
        Arc::clone(&publisher),
        Arc::clone(&queue),
        cancel.clone(),
    )));
    tasks.push(tokio::spawn(watchdog::run_fast_scan(
        Arc::clone(&state),
        Arc::clone(&publisher),
        cancel.clone(),
    )));
    tasks.push(tokio::spawn(watchdog::run_controller_scan(
        Arc::clone(&state),
        Arc::clone(&publisher),
        cancel.clone(),
    )));

    shutdown_signal().await;
    info!("shutdown signal received — stopping loops");
    cancel.cancel();

    for task in tasks {
        if let Err(e) = task.await {
            warn!("task join error on shutdown: {}", e);
        }
    }
    if let Err(e) = mqtt_client.disconnect().await {
        warn!("mqtt disconnect failed: {}", e);
    }

    info!("clean shutdown");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).ok();
        let mut sigint = signal(SignalKind::interrupt()).ok();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = async {
                if let Some(ref mut s) = sigterm {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
            _ = async {
                if let Some(ref mut s) = sigint {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
