//! In-process proxy simulator.
//!
//! Stands in for the remote proxy so the headless binary and the
//! end-to-end tests can exercise the full request/response cycle without a
//! real network. Frames sent through it are parsed the way the proxy
//! parses them and answered synchronously through the registered listener,
//! mirroring how the proxy answers over a player connection.
//!
//! Responses echo the server name exactly as it was requested, which is
//! what the real proxy does.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use proxycount_core::protocol::codec::{
    decode_request, encode_player_count_response, encode_server_list_response,
};
use proxycount_core::{ProxyRequest, ALL_SERVERS, MESSAGE_CHANNEL};
use tracing::{debug, warn};

use super::{ChannelListener, ChannelTransport, TransportError};

/// A [`ChannelTransport`] that answers count and server-list queries from
/// an in-memory roster of servers.
pub struct LoopbackProxy {
    /// Server name → synthetic player count. BTreeMap keeps the announced
    /// server list stable across runs.
    servers: Mutex<BTreeMap<String, i32>>,
    listener: Mutex<Option<Arc<dyn ChannelListener>>>,
    /// Simulates whether any player connection exists to carry frames.
    online: AtomicBool,
}

impl LoopbackProxy {
    /// Creates a proxy with no servers and an endpoint available.
    pub fn new() -> Self {
        Self {
            servers: Mutex::new(BTreeMap::new()),
            listener: Mutex::new(None),
            online: AtomicBool::new(true),
        }
    }

    /// Creates a proxy pre-populated with `(name, count)` entries.
    pub fn with_servers(entries: &[(&str, i32)]) -> Self {
        let proxy = Self::new();
        {
            let mut servers = proxy.servers.lock().expect("lock poisoned");
            for (name, count) in entries {
                servers.insert((*name).to_string(), *count);
            }
        }
        proxy
    }

    /// Sets (or adds) a server's synthetic player count.
    pub fn set_count(&self, server: &str, count: i32) {
        self.servers
            .lock()
            .expect("lock poisoned")
            .insert(server.to_string(), count);
    }

    /// Toggles whether frames can be carried at all.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }

    /// Pushes an unsolicited server-list response to the registered
    /// listener.
    ///
    /// On the real channel this happens whenever any plugin issues a
    /// server-list query: the response is visible to every registered
    /// listener, not just the requester.
    pub fn announce_servers(&self) {
        let frame = {
            let servers = self.servers.lock().expect("lock poisoned");
            let names: Vec<&str> = servers.keys().map(String::as_str).collect();
            encode_server_list_response(&names)
        };
        self.respond(frame);
    }

    fn respond(&self, frame: Vec<u8>) {
        // Clone the handle out of the lock so the listener callback runs
        // without any loopback lock held.
        let listener = self.listener.lock().expect("lock poisoned").clone();
        if let Some(listener) = listener {
            listener.on_channel_message(MESSAGE_CHANNEL, &frame);
        }
    }

    fn answer(&self, request: ProxyRequest) {
        match request {
            ProxyRequest::PlayerCount { server } => {
                let response = {
                    let servers = self.servers.lock().expect("lock poisoned");
                    if server.eq_ignore_ascii_case(ALL_SERVERS) {
                        let total: i32 = servers.values().sum();
                        Some(encode_player_count_response(&server, total))
                    } else {
                        servers
                            .iter()
                            .find(|(name, _)| name.eq_ignore_ascii_case(&server))
                            .map(|(_, count)| encode_player_count_response(&server, *count))
                    }
                };
                match response {
                    Some(frame) => self.respond(frame),
                    // The real proxy stays silent about servers it does not
                    // know.
                    None => debug!("loopback proxy has no server named {server}"),
                }
            }
            ProxyRequest::ServerList => self.announce_servers(),
            ProxyRequest::Unknown { kind } => {
                debug!("loopback proxy ignoring request kind {kind}");
            }
        }
    }
}

impl Default for LoopbackProxy {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelTransport for LoopbackProxy {
    fn send(&self, channel: &str, payload: &[u8]) -> Result<(), TransportError> {
        if !self.online.load(Ordering::Relaxed) {
            return Err(TransportError::NoEndpoint);
        }
        if channel != MESSAGE_CHANNEL {
            // The proxy only watches its own channel.
            return Ok(());
        }
        match decode_request(payload) {
            Ok(request) => {
                self.answer(request);
                Ok(())
            }
            Err(e) => {
                warn!("loopback proxy could not parse request: {e}");
                Ok(())
            }
        }
    }

    fn register_outgoing(&self, _channel: &str) {}

    fn register_incoming(&self, _channel: &str, listener: Arc<dyn ChannelListener>) {
        *self.listener.lock().expect("lock poisoned") = Some(listener);
    }

    fn unregister_outgoing(&self, _channel: &str) {}

    fn unregister_incoming(&self, _channel: &str) {
        *self.listener.lock().expect("lock poisoned") = None;
    }
}
