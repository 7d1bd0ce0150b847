//! Binary codec for frames on the proxy messaging channel.
//!
//! Wire format:
//! ```text
//! [kind_len:2][kind:UTF-8][payload:N]
//! ```
//! Every string on the wire is a 2-byte big-endian unsigned length prefix
//! followed by that many UTF-8 bytes (Java `DataOutput::writeUTF` framing).
//! The only other scalar is the 32-bit big-endian signed player count.
//!
//! Payloads by kind:
//!
//! | kind          | request payload | response payload                    |
//! |---------------|-----------------|-------------------------------------|
//! | `PlayerCount` | server name     | server name + i32 count             |
//! | `GetServers`  | (empty)         | comma-separated server-name string  |
//!
//! This shape is owned by the remote proxy, not by this crate. Frames must
//! match it byte for byte or the proxy will silently drop them, so the
//! tests below pin exact byte sequences, not just round-trips.

use thiserror::Error;

use crate::protocol::messages::{ProxyMessage, ProxyRequest, KIND_PLAYER_COUNT, KIND_SERVER_LIST};

/// Errors that can occur while decoding a frame.
///
/// Encoding is infallible: both request payloads are a single optional
/// string and cannot be constructed in an invalid shape.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The frame ends before the format says it should.
    #[error("truncated frame: need at least {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    /// The frame is long enough but its content is invalid.
    #[error("malformed frame: {0}")]
    Malformed(String),
}

// ── Request encoding (bridge → proxy) ─────────────────────────────────────────

/// Encodes a player-count request for `server`.
///
/// The server name is sent with the case the caller gives; the literal
/// [`ALL_SERVERS`](crate::protocol::messages::ALL_SERVERS) asks for the
/// aggregate count across the whole network.
pub fn encode_player_count_request(server: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + KIND_PLAYER_COUNT.len() + 2 + server.len());
    write_utf(&mut buf, KIND_PLAYER_COUNT);
    write_utf(&mut buf, server);
    buf
}

/// Encodes a server-list request. The kind tag is the entire frame.
pub fn encode_server_list_request() -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + KIND_SERVER_LIST.len());
    write_utf(&mut buf, KIND_SERVER_LIST);
    buf
}

// ── Response encoding (proxy → bridge direction) ──────────────────────────────
//
// These mirror the frames the remote proxy emits. The bridge itself never
// sends them; the loopback proxy simulator and the tests do.

/// Encodes a player-count response: server name followed by a big-endian
/// 32-bit signed count.
pub fn encode_player_count_response(server: &str, count: i32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(2 + KIND_PLAYER_COUNT.len() + 2 + server.len() + 4);
    write_utf(&mut buf, KIND_PLAYER_COUNT);
    write_utf(&mut buf, server);
    buf.extend_from_slice(&count.to_be_bytes());
    buf
}

/// Encodes a server-list response.
///
/// Names are joined with `", "`, matching the separator the proxy uses.
pub fn encode_server_list_response(servers: &[&str]) -> Vec<u8> {
    let joined = servers.join(", ");
    let mut buf = Vec::with_capacity(2 + KIND_SERVER_LIST.len() + 2 + joined.len());
    write_utf(&mut buf, KIND_SERVER_LIST);
    write_utf(&mut buf, &joined);
    buf
}

// ── Response decoding ─────────────────────────────────────────────────────────

/// Decodes one inbound (proxy → bridge) frame.
///
/// Unknown kind tags are not an error: they decode as
/// [`ProxyMessage::Ignored`] so that traffic belonging to other plugins on
/// the shared channel never disturbs the caller.
///
/// # Errors
///
/// Returns [`ProtocolError`] if a known kind's payload is truncated or not
/// valid UTF-8. Note that a request-shaped `PlayerCount` frame (no count
/// bytes) is not a valid response and fails with
/// [`ProtocolError::Truncated`].
pub fn decode_message(bytes: &[u8]) -> Result<ProxyMessage, ProtocolError> {
    let (kind, offset) = read_utf(bytes, 0)?;
    match kind.as_str() {
        KIND_PLAYER_COUNT => {
            let (server, offset) = read_utf(bytes, offset)?;
            let count = read_i32(bytes, offset)?;
            Ok(ProxyMessage::PlayerCount { server, count })
        }
        KIND_SERVER_LIST => {
            let (servers, _) = read_utf(bytes, offset)?;
            Ok(ProxyMessage::ServerList { servers })
        }
        _ => Ok(ProxyMessage::Ignored { kind }),
    }
}

/// Decodes one outbound-direction (bridge → proxy) request frame.
///
/// This is the parse the remote proxy performs; it exists here for the
/// loopback proxy simulator and the tests.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the kind tag or a `PlayerCount` server name
/// is truncated or not valid UTF-8.
pub fn decode_request(bytes: &[u8]) -> Result<ProxyRequest, ProtocolError> {
    let (kind, offset) = read_utf(bytes, 0)?;
    match kind.as_str() {
        KIND_PLAYER_COUNT => {
            let (server, _) = read_utf(bytes, offset)?;
            Ok(ProxyRequest::PlayerCount { server })
        }
        KIND_SERVER_LIST => Ok(ProxyRequest::ServerList),
        _ => Ok(ProxyRequest::Unknown { kind }),
    }
}

// ── Utility helpers ───────────────────────────────────────────────────────────

/// Writes a 2-byte big-endian length prefix followed by the UTF-8 bytes.
fn write_utf(buf: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    let len = bytes.len().min(u16::MAX as usize) as u16;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&bytes[..len as usize]);
}

/// Reads a 2-byte length prefix and then that many UTF-8 bytes.
/// Returns the string and the offset of the byte after it.
fn read_utf(buf: &[u8], offset: usize) -> Result<(String, usize), ProtocolError> {
    if buf.len() < offset + 2 {
        return Err(ProtocolError::Truncated {
            needed: offset + 2,
            available: buf.len(),
        });
    }
    let len = u16::from_be_bytes([buf[offset], buf[offset + 1]]) as usize;
    let start = offset + 2;
    if buf.len() < start + len {
        return Err(ProtocolError::Truncated {
            needed: start + len,
            available: buf.len(),
        });
    }
    let s = std::str::from_utf8(&buf[start..start + len])
        .map_err(|e| ProtocolError::Malformed(format!("invalid UTF-8 at offset {start}: {e}")))?
        .to_string();
    Ok((s, start + len))
}

/// Reads a big-endian 32-bit signed integer.
fn read_i32(buf: &[u8], offset: usize) -> Result<i32, ProtocolError> {
    if buf.len() < offset + 4 {
        return Err(ProtocolError::Truncated {
            needed: offset + 4,
            available: buf.len(),
        });
    }
    Ok(i32::from_be_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ]))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
