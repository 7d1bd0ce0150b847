//! Mock channel transport for unit and integration testing.
//!
//! Records every outgoing frame, counts channel (un)registrations, and lets
//! tests deliver inbound frames to the registered listener by hand. A
//! `connected` switch simulates the empty-server state in which no endpoint
//! exists to carry a frame.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use super::{ChannelListener, ChannelTransport, TransportError};

/// One frame captured by [`MockTransport::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub channel: String,
    pub payload: Vec<u8>,
}

/// A [`ChannelTransport`] that records sends and plays back deliveries.
pub struct MockTransport {
    connected: AtomicBool,
    sent: Mutex<Vec<SentFrame>>,
    listener: Mutex<Option<Arc<dyn ChannelListener>>>,
    outgoing_registered: AtomicU32,
    outgoing_unregistered: AtomicU32,
    incoming_registered: AtomicU32,
    incoming_unregistered: AtomicU32,
}

impl MockTransport {
    /// Creates a mock transport with a connected endpoint available.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            sent: Mutex::new(Vec::new()),
            listener: Mutex::new(None),
            outgoing_registered: AtomicU32::new(0),
            outgoing_unregistered: AtomicU32::new(0),
            incoming_registered: AtomicU32::new(0),
            incoming_unregistered: AtomicU32::new(0),
        }
    }

    /// Toggles whether an endpoint is available to carry frames.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    /// Returns a snapshot of every frame sent so far.
    pub fn sent_frames(&self) -> Vec<SentFrame> {
        self.sent.lock().expect("lock poisoned").clone()
    }

    /// Discards all recorded frames.
    pub fn clear_sent(&self) {
        self.sent.lock().expect("lock poisoned").clear();
    }

    /// Delivers an inbound frame to the registered listener, as the host
    /// would when a frame arrives from the proxy.
    ///
    /// Panics if no listener is registered; call the component's lifecycle
    /// `start()` first.
    pub fn deliver(&self, channel: &str, payload: &[u8]) {
        let listener = {
            let guard = self.listener.lock().expect("lock poisoned");
            guard
                .clone()
                .expect("MockTransport::deliver called with no registered listener")
        };
        listener.on_channel_message(channel, payload);
    }

    /// Whether an incoming listener is currently registered.
    pub fn has_incoming_listener(&self) -> bool {
        self.listener.lock().expect("lock poisoned").is_some()
    }

    /// Number of `register_outgoing` calls observed.
    pub fn outgoing_registrations(&self) -> u32 {
        self.outgoing_registered.load(Ordering::Relaxed)
    }

    /// Number of `unregister_outgoing` calls observed.
    pub fn outgoing_unregistrations(&self) -> u32 {
        self.outgoing_unregistered.load(Ordering::Relaxed)
    }

    /// Number of `register_incoming` calls observed.
    pub fn incoming_registrations(&self) -> u32 {
        self.incoming_registered.load(Ordering::Relaxed)
    }

    /// Number of `unregister_incoming` calls observed.
    pub fn incoming_unregistrations(&self) -> u32 {
        self.incoming_unregistered.load(Ordering::Relaxed)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelTransport for MockTransport {
    fn send(&self, channel: &str, payload: &[u8]) -> Result<(), TransportError> {
        if !self.connected.load(Ordering::Relaxed) {
            return Err(TransportError::NoEndpoint);
        }
        self.sent.lock().expect("lock poisoned").push(SentFrame {
            channel: channel.to_string(),
            payload: payload.to_vec(),
        });
        Ok(())
    }

    fn register_outgoing(&self, _channel: &str) {
        self.outgoing_registered.fetch_add(1, Ordering::Relaxed);
    }

    fn register_incoming(&self, _channel: &str, listener: Arc<dyn ChannelListener>) {
        self.incoming_registered.fetch_add(1, Ordering::Relaxed);
        *self.listener.lock().expect("lock poisoned") = Some(listener);
    }

    fn unregister_outgoing(&self, _channel: &str) {
        self.outgoing_unregistered.fetch_add(1, Ordering::Relaxed);
    }

    fn unregister_incoming(&self, _channel: &str) {
        self.incoming_unregistered.fetch_add(1, Ordering::Relaxed);
        *self.listener.lock().expect("lock poisoned") = None;
    }
}
