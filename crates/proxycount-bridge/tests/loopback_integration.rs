//! End-to-end tests against the loopback proxy simulator.
//!
//! # Purpose
//!
//! The lifecycle tests drive the bridge against a recording mock; these
//! run the complete cycle instead (poll tick, request frame, simulated
//! proxy, response frame, cache update, placeholder lookup) with the
//! loopback proxy answering exactly the way the remote proxy does
//! (synchronously, over the same channel, echoing the requested casing).
//!
//! All tests use the paused tokio clock, so "waiting" for a poll tick is
//! instantaneous and deterministic.

use std::sync::Arc;
use std::time::Duration;

use proxycount_bridge::application::bridge::ProxyCountBridge;
use proxycount_bridge::infrastructure::storage::config::BridgeConfig;
use proxycount_bridge::infrastructure::transport::loopback::LoopbackProxy;
use proxycount_bridge::infrastructure::transport::ChannelTransport;

fn make_bridge(
    proxy_servers: &[(&str, i32)],
    check_interval: u64,
) -> (Arc<ProxyCountBridge>, Arc<LoopbackProxy>) {
    let proxy = Arc::new(LoopbackProxy::with_servers(proxy_servers));
    let config = BridgeConfig {
        check_interval,
        log_level: "info".to_string(),
    };
    let transport: Arc<dyn ChannelTransport> = proxy.clone();
    let bridge = Arc::new(ProxyCountBridge::new(transport, &config));
    (bridge, proxy)
}

#[tokio::test(start_paused = true)]
async fn test_discovered_servers_get_counts_on_the_first_tick() {
    // Arrange
    let (bridge, proxy) = make_bridge(&[("lobby", 12), ("survival", 7)], 30);
    bridge.start();
    proxy.announce_servers();

    // Before the first tick, discovery has happened but no counts yet.
    assert_eq!(bridge.store().len(), 2);
    assert_eq!(bridge.resolve("lobby"), "0");

    // Act – let the first poll tick run.
    tokio::time::sleep(Duration::from_millis(2100)).await;

    // Assert – aggregate and per-server counts all arrived.
    assert_eq!(bridge.resolve("total"), "19");
    assert_eq!(bridge.resolve("lobby"), "12");
    assert_eq!(bridge.resolve("survival"), "7");
    assert_eq!(bridge.resolve("lobby,survival"), "19");
}

#[tokio::test(start_paused = true)]
async fn test_counts_refresh_on_the_next_tick() {
    let (bridge, proxy) = make_bridge(&[("lobby", 12)], 5);
    bridge.start();
    proxy.announce_servers();

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(bridge.resolve("lobby"), "12");

    // The population changes; the cache catches up one period later.
    proxy.set_count("lobby", 20);
    assert_eq!(bridge.resolve("lobby"), "12", "stale until the next tick");
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(bridge.resolve("lobby"), "20");
}

#[tokio::test(start_paused = true)]
async fn test_looking_up_a_name_seeds_its_polling() {
    // No server-list announcement here: the only discovery path is the
    // lookup itself registering the name at zero.
    let (bridge, _proxy) = make_bridge(&[("lobby", 12)], 30);
    bridge.start();

    assert_eq!(bridge.resolve("lobby"), "0");

    // The registered name is polled on the next tick and fills in.
    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(bridge.resolve("lobby"), "12");
}

#[tokio::test(start_paused = true)]
async fn test_offline_proxy_leaves_counts_stale_until_it_returns() {
    let (bridge, proxy) = make_bridge(&[("lobby", 12)], 5);
    bridge.start();
    proxy.announce_servers();
    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(bridge.resolve("lobby"), "12");

    // Nobody connected: ticks keep firing but nothing is carried.
    proxy.set_online(false);
    proxy.set_count("lobby", 99);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(bridge.resolve("lobby"), "12", "stale while offline");

    // Back online: the next tick refreshes.
    proxy.set_online(true);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(bridge.resolve("lobby"), "99");
}

#[tokio::test(start_paused = true)]
async fn test_stop_discards_everything_learned() {
    let (bridge, proxy) = make_bridge(&[("lobby", 12), ("survival", 7)], 30);
    bridge.start();
    proxy.announce_servers();
    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(bridge.resolve("total"), "19");

    bridge.stop();

    assert_eq!(bridge.resolve("total"), "0");
    assert!(bridge.store().is_empty());
}
