//! The proxy player-count bridge use case.
//!
//! Owns the shared [`CountStore`], the recurring poll task, the inbound
//! decode path, and the synchronous lookup the placeholder consumer calls.
//!
//! # Lifecycle
//!
//! ```text
//! {Stopped} ── start() ──► {Running} ── stop() ──► {Stopped}
//! ```
//!
//! `start()` installs the poll task and, on the first installation,
//! registers the channel endpoints; a second `start()` replaces the task
//! atomically without registering twice. `stop()` cancels the task, then
//! clears the store, then unregisters: in that order, so a stale tick can
//! never repopulate a cleared store.
//!
//! # How the counts flow (for beginners)
//!
//! The bridge never computes a count itself. Every poll tick it asks the
//! proxy "how many players are on `ALL`?" and, for each server name it has
//! ever seen, "how many players are on that server?". The proxy's answers
//! arrive later as frames on the same channel and overwrite the cache.
//! `resolve()` only ever reads the cache, which is why it can stay
//! synchronous and total: between a server's first appearance and the
//! proxy's first answer the cached count is simply 0.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use proxycount_core::protocol::codec::encode_player_count_request;
use proxycount_core::{decode_message, CountStore, ProxyMessage, ALL_SERVERS, MESSAGE_CHANNEL};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::infrastructure::storage::config::BridgeConfig;
use crate::infrastructure::transport::{ChannelListener, ChannelTransport, TransportError};

/// Delay before the first poll tick after `start()`.
const POLL_INITIAL_DELAY: Duration = Duration::from_secs(2);

/// Bridge between the proxy messaging channel and placeholder lookups.
///
/// All state is owned here; there are no ambient statics.
pub struct ProxyCountBridge {
    store: Arc<CountStore>,
    transport: Arc<dyn ChannelTransport>,
    poll_interval: Duration,
    /// The single active poll task. The mutex gives replace/take the
    /// exclusive-swap semantics that keep exactly one timer alive under
    /// concurrent `start()` calls.
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl ProxyCountBridge {
    /// Creates a stopped bridge over `transport` with an empty store.
    pub fn new(transport: Arc<dyn ChannelTransport>, config: &BridgeConfig) -> Self {
        Self {
            store: Arc::new(CountStore::new()),
            transport,
            poll_interval: Duration::from_secs(config.check_interval.max(1)),
            poll_task: Mutex::new(None),
        }
    }

    /// Read access to the shared count cache.
    pub fn store(&self) -> &CountStore {
        &self.store
    }

    /// Starts (or restarts) the recurring poll task.
    ///
    /// The first tick fires after a fixed 2-second delay, then every
    /// `check_interval` seconds. Per tick the task requests the aggregate
    /// count and one count per server name currently in the store.
    ///
    /// If a poll task is already running the new one replaces it and the
    /// old one is cancelled; the channel endpoints stay registered. Only
    /// the transition out of the stopped state registers the outgoing and
    /// incoming endpoints.
    pub fn start(&self) {
        let store = Arc::clone(&self.store);
        let transport = Arc::clone(&self.transport);
        let period = self.poll_interval;

        let task = tokio::spawn(async move {
            tokio::time::sleep(POLL_INITIAL_DELAY).await;
            let mut ticker = tokio::time::interval(period);
            loop {
                // The first interval tick completes immediately, so the
                // first poll lands right after the initial delay.
                ticker.tick().await;
                poll_once(&store, transport.as_ref());
            }
        });

        let previous = self.poll_task.lock().expect("lock poisoned").replace(task);
        match previous {
            Some(old) => {
                old.abort();
                debug!("poll task replaced; channel endpoints remain registered");
            }
            None => {
                self.transport.register_outgoing(MESSAGE_CHANNEL);
                let listener: Arc<dyn ChannelListener> = Arc::new(InboundCounts {
                    store: Arc::clone(&self.store),
                });
                self.transport.register_incoming(MESSAGE_CHANNEL, listener);
                debug!(
                    "poll task started on {MESSAGE_CHANNEL}, period {}s",
                    period.as_secs()
                );
            }
        }
    }

    /// Stops polling, clears the store, and unregisters the channel
    /// endpoints.
    ///
    /// A no-op when nothing is running, so repeated calls are safe. The
    /// task is cancelled before the store is cleared; no tick fires after
    /// this returns.
    pub fn stop(&self) {
        let Some(task) = self.poll_task.lock().expect("lock poisoned").take() else {
            return;
        };
        task.abort();
        self.store.clear();
        self.transport.unregister_outgoing(MESSAGE_CHANNEL);
        self.transport.unregister_incoming(MESSAGE_CHANNEL);
        debug!("poll task stopped, count cache cleared");
    }

    /// Resolves a placeholder identifier to its count's decimal string.
    ///
    /// Total and never blocking: unknown identifiers yield `"0"` (and the
    /// lookup registers the name so the poller starts asking about it).
    pub fn resolve(&self, identifier: &str) -> String {
        self.store.get(&identifier.to_lowercase()).to_string()
    }
}

/// Hosts that deliver frames to the bridge directly (instead of through a
/// transport registration) get the same handling path.
impl ChannelListener for ProxyCountBridge {
    fn on_channel_message(&self, channel: &str, payload: &[u8]) {
        apply_channel_message(&self.store, channel, payload);
    }
}

/// The listener handed to the transport: updates the shared store from
/// inbound frames.
struct InboundCounts {
    store: Arc<CountStore>,
}

impl ChannelListener for InboundCounts {
    fn on_channel_message(&self, channel: &str, payload: &[u8]) {
        apply_channel_message(&self.store, channel, payload);
    }
}

/// Decodes one inbound frame and applies it to the store.
fn apply_channel_message(store: &CountStore, channel: &str, payload: &[u8]) {
    if channel != MESSAGE_CHANNEL {
        return;
    }
    match decode_message(payload) {
        Ok(ProxyMessage::PlayerCount { server, count }) => {
            if server.eq_ignore_ascii_case(ALL_SERVERS) {
                store.set_total(count);
            } else {
                // Direct updates normalize to lowercase; discovery below
                // does not. The asymmetry is long-standing upstream
                // behavior and is kept as-is.
                store.set_count(&server.to_lowercase(), count);
            }
        }
        Ok(ProxyMessage::ServerList { servers }) => {
            for name in servers.split(',') {
                let name = name.trim();
                if !name.is_empty() {
                    store.ensure_known(name);
                }
            }
        }
        Ok(ProxyMessage::Ignored { kind }) => {
            trace!("ignoring frame of kind {kind} on {channel}");
        }
        Err(e) => {
            // One bad frame costs one message, never the poller.
            warn!("dropping malformed frame on {channel}: {e}");
        }
    }
}

/// One poll tick: the aggregate query, then one query per known server.
fn poll_once(store: &CountStore, transport: &dyn ChannelTransport) {
    send_count_request(transport, ALL_SERVERS);
    for server in store.server_names() {
        send_count_request(transport, &server);
    }
}

fn send_count_request(transport: &dyn ChannelTransport, server: &str) {
    let frame = encode_player_count_request(server);
    match transport.send(MESSAGE_CHANNEL, &frame) {
        Ok(()) => {}
        // An empty server has nobody to carry the frame; polling is
        // best-effort, so this is an expected idle state.
        Err(TransportError::NoEndpoint) => {
            trace!("no endpoint to carry count request for {server}");
        }
        Err(e) => warn!("failed to send count request for {server}: {e}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::transport::mock::MockTransport;
    use proxycount_core::protocol::codec::{
        encode_player_count_response, encode_server_list_response,
    };

    fn make_bridge() -> ProxyCountBridge {
        ProxyCountBridge::new(Arc::new(MockTransport::new()), &BridgeConfig::default())
    }

    // ── Inbound handling ──────────────────────────────────────────────────────

    #[test]
    fn test_frames_on_other_channels_are_ignored() {
        let bridge = make_bridge();
        bridge.on_channel_message("mc:brand", &encode_player_count_response("lobby", 42));
        assert!(bridge.store().is_empty());
    }

    #[test]
    fn test_count_response_updates_server_under_lowercased_key() {
        let bridge = make_bridge();
        bridge.on_channel_message(MESSAGE_CHANNEL, &encode_player_count_response("Lobby", 42));
        assert_eq!(bridge.store().server_names(), vec!["lobby".to_string()]);
        assert_eq!(bridge.resolve("lobby"), "42");
    }

    #[test]
    fn test_all_count_response_sets_total_case_insensitively() {
        let bridge = make_bridge();
        for (spelling, count) in [("ALL", 10), ("all", 20), ("All", 30)] {
            bridge.on_channel_message(
                MESSAGE_CHANNEL,
                &encode_player_count_response(spelling, count),
            );
            assert_eq!(bridge.store().total(), i64::from(count));
        }
        // None of the sentinel spellings became a per-server entry.
        assert!(bridge.store().is_empty());
    }

    #[test]
    fn test_server_list_response_registers_trimmed_names_at_zero() {
        let bridge = make_bridge();
        bridge.on_channel_message(
            MESSAGE_CHANNEL,
            &encode_server_list_response(&["lobby", "survival"]),
        );
        let mut names = bridge.store().server_names();
        names.sort_unstable();
        assert_eq!(names, vec!["lobby", "survival"]);
        assert_eq!(bridge.store().get("lobby"), 0);
    }

    #[test]
    fn test_server_list_discovery_does_not_clobber_existing_counts() {
        let bridge = make_bridge();
        bridge.on_channel_message(MESSAGE_CHANNEL, &encode_player_count_response("lobby", 42));
        bridge.on_channel_message(MESSAGE_CHANNEL, &encode_server_list_response(&["lobby"]));
        assert_eq!(bridge.resolve("lobby"), "42");
    }

    #[test]
    fn test_server_list_skips_empty_entries() {
        let bridge = make_bridge();
        bridge.on_channel_message(
            MESSAGE_CHANNEL,
            &encode_server_list_response(&["lobby", "", "  ", "survival"]),
        );
        assert_eq!(bridge.store().len(), 2);
    }

    #[test]
    fn test_discovered_case_and_updated_case_are_separate_keys() {
        // Discovery preserves the case the proxy sent while count updates
        // lowercase their key, so "Lobby" (discovered) and "lobby"
        // (updated) coexist as distinct entries. Long-standing upstream
        // behavior; this test documents it rather than fixing it.
        let bridge = make_bridge();
        bridge.on_channel_message(MESSAGE_CHANNEL, &encode_server_list_response(&["Lobby"]));
        bridge.on_channel_message(MESSAGE_CHANNEL, &encode_player_count_response("Lobby", 9));

        let mut names = bridge.store().server_names();
        names.sort_unstable();
        assert_eq!(names, vec!["Lobby", "lobby"]);

        // The lookup facade lowercases, so consumers read the updated key.
        assert_eq!(bridge.resolve("Lobby"), "9");
    }

    #[test]
    fn test_unknown_kind_has_no_effect() {
        let bridge = make_bridge();
        let mut frame = (2u16).to_be_bytes().to_vec();
        frame.extend_from_slice(b"IP");
        bridge.on_channel_message(MESSAGE_CHANNEL, &frame);
        assert!(bridge.store().is_empty());
        assert_eq!(bridge.store().total(), 0);
    }

    #[test]
    fn test_malformed_frame_is_dropped_without_panicking() {
        let bridge = make_bridge();
        bridge.on_channel_message(MESSAGE_CHANNEL, &[0x00]);
        // A request-shaped count frame (missing count bytes) is also
        // malformed as a response.
        bridge.on_channel_message(
            MESSAGE_CHANNEL,
            &proxycount_core::encode_player_count_request("lobby"),
        );
        assert!(bridge.store().is_empty());
    }

    // ── Placeholder resolution ────────────────────────────────────────────────

    #[test]
    fn test_resolve_unknown_name_returns_zero_and_registers_it() {
        let bridge = make_bridge();
        assert_eq!(bridge.resolve("skyblock"), "0");
        assert_eq!(bridge.store().server_names(), vec!["skyblock".to_string()]);
    }

    #[test]
    fn test_resolve_total_keywords_any_case() {
        let bridge = make_bridge();
        bridge.on_channel_message(MESSAGE_CHANNEL, &encode_player_count_response("ALL", 100));
        assert_eq!(bridge.resolve("all"), "100");
        assert_eq!(bridge.resolve("TOTAL"), "100");
        assert_eq!(bridge.resolve("Total"), "100");
    }

    #[test]
    fn test_resolve_lowercases_the_identifier() {
        let bridge = make_bridge();
        bridge.on_channel_message(MESSAGE_CHANNEL, &encode_player_count_response("lobby", 7));
        assert_eq!(bridge.resolve("LOBBY"), "7");
    }

    #[test]
    fn test_discovery_then_counts_scenario() {
        // The full inbound sequence: discover two servers, then receive a
        // per-server count and the aggregate.
        let bridge = make_bridge();

        bridge.on_channel_message(
            MESSAGE_CHANNEL,
            &encode_server_list_response(&["lobby", "survival"]),
        );
        assert_eq!(bridge.store().len(), 2);
        assert_eq!(bridge.store().get("lobby"), 0);
        assert_eq!(bridge.store().get("survival"), 0);

        bridge.on_channel_message(MESSAGE_CHANNEL, &encode_player_count_response("lobby", 42));
        assert_eq!(bridge.resolve("lobby"), "42");

        bridge.on_channel_message(MESSAGE_CHANNEL, &encode_player_count_response("ALL", 100));
        assert_eq!(bridge.resolve("total"), "100");

        // survival is still at its discovered zero.
        assert_eq!(bridge.resolve("lobby,survival"), "42");
    }
}
