//! Message kinds exchanged with the proxy on the shared messaging channel.
//!
//! The channel carries traffic for every plugin on the server, multiplexed
//! by a leading kind tag. This bridge speaks exactly two kinds: player-count
//! queries and server-list queries. Everything else on the channel belongs
//! to someone else and decodes as [`ProxyMessage::Ignored`].

// ── Protocol constants ────────────────────────────────────────────────────────

/// Name of the plugin messaging channel the proxy listens on.
pub const MESSAGE_CHANNEL: &str = "BungeeCord";

/// Kind tag for player-count queries and their responses.
pub const KIND_PLAYER_COUNT: &str = "PlayerCount";

/// Kind tag for server-list queries and their responses.
pub const KIND_SERVER_LIST: &str = "GetServers";

/// Reserved server-name sentinel meaning "aggregate across all servers".
///
/// The proxy compares it case-insensitively, but outgoing requests always
/// send this exact casing.
pub const ALL_SERVERS: &str = "ALL";

// ── Inbound messages (proxy → bridge) ─────────────────────────────────────────

/// A decoded message received from the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyMessage {
    /// Player count for one server, or for the whole network when the
    /// server name equals the [`ALL_SERVERS`] sentinel (case-insensitive).
    PlayerCount { server: String, count: i32 },

    /// All server names known to the proxy, as one comma-separated string.
    ///
    /// The payload is handed through raw; splitting and per-entry trimming
    /// is the consumer's job.
    ServerList { servers: String },

    /// A kind this bridge does not handle. Other plugins share the channel,
    /// so unknown kinds must decode successfully and be discardable rather
    /// than raise an error.
    Ignored { kind: String },
}

// ── Outbound requests (bridge → proxy) ────────────────────────────────────────

/// A decoded request frame in the bridge → proxy direction.
///
/// The remote proxy is what normally parses these; this crate decodes them
/// too so the loopback proxy simulator and the tests can act as the remote
/// end of the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyRequest {
    /// Ask for the player count of `server` (or of the whole network when
    /// `server` is the [`ALL_SERVERS`] sentinel).
    PlayerCount { server: String },

    /// Ask for the comma-separated list of all server names.
    ServerList,

    /// A request kind this bridge never emits.
    Unknown { kind: String },
}
