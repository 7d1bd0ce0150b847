//! Protocol module containing message kinds and the binary codec.

pub mod codec;
pub mod messages;

pub use codec::{decode_message, decode_request, ProtocolError};
pub use messages::*;
