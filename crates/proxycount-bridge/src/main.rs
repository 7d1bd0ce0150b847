//! Headless bridge binary.
//!
//! Wires the bridge to an in-process loopback proxy and runs until Ctrl-C.
//! The binary stands in for a host plugin lifecycle: `start()` on boot,
//! `stop()` on shutdown, with a status task playing the role of the
//! placeholder consumer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use proxycount_bridge::application::bridge::ProxyCountBridge;
use proxycount_bridge::infrastructure::storage::config::{default_config_path, load_config};
use proxycount_bridge::infrastructure::transport::loopback::LoopbackProxy;
use proxycount_bridge::infrastructure::transport::ChannelTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config(&default_config_path())?;

    // Initialise structured logging. Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    info!(
        "proxy player-count bridge starting (poll interval {}s)",
        config.check_interval
    );

    // Simulated remote proxy with a few populated servers.
    let proxy = Arc::new(LoopbackProxy::with_servers(&[
        ("lobby", 12),
        ("survival", 7),
        ("creative", 0),
    ]));

    let transport: Arc<dyn ChannelTransport> = proxy.clone();
    let bridge = Arc::new(ProxyCountBridge::new(transport, &config));
    bridge.start();

    // Seed discovery the way it happens in production: some plugin's
    // server-list query gets answered on the shared channel and every
    // listener sees the response.
    proxy.announce_servers();

    // Shutdown flag flipped by Ctrl-C.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            running_clone.store(false, Ordering::Relaxed);
        }
    });

    // Periodically surface what the placeholder consumer would see.
    let bridge_status = Arc::clone(&bridge);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(5));
        loop {
            ticker.tick().await;
            info!(
                "total={} lobby={} survival={}",
                bridge_status.resolve("all"),
                bridge_status.resolve("lobby"),
                bridge_status.resolve("survival"),
            );
        }
    });

    while running.load(Ordering::Relaxed) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    bridge.stop();
    info!("proxy player-count bridge stopped");
    Ok(())
}
