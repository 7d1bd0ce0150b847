//! # proxycount-core
//!
//! Shared library for the proxy player-count bridge containing the binary
//! codec for the proxy messaging channel and the concurrent count cache.
//!
//! This crate is used by the bridge application and its integration tests.
//! It has zero dependencies on OS APIs, schedulers, or network sockets.
//!
//! The crate defines:
//!
//! - **`protocol`** – How bytes travel on the proxy channel. Requests and
//!   responses are encoded into the proxy's length-prefixed binary format
//!   and decoded back into typed Rust values on arrival.
//!
//! - **`domain`** – Pure state with no I/O. The one important piece is the
//!   [`CountStore`]: the concurrently read and written cache of per-server
//!   player counts that feeds synchronous placeholder lookups.

pub mod domain;
pub mod protocol;

// Re-export the most-used items at the crate root so callers can write
// `proxycount_core::CountStore` instead of the full module path.
pub use domain::counts::CountStore;
pub use protocol::codec::{
    decode_message, decode_request, encode_player_count_request, encode_player_count_response,
    encode_server_list_request, encode_server_list_response, ProtocolError,
};
pub use protocol::messages::{ProxyMessage, ProxyRequest, ALL_SERVERS, MESSAGE_CHANNEL};
