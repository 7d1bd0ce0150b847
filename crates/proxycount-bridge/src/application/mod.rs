//! Application layer for the bridge.
//!
//! One use case lives here:
//!
//! - **`bridge`** – The proxy player-count bridge itself: the polling
//!   lifecycle, the inbound decode path, and the synchronous lookup the
//!   placeholder consumer calls. It depends only on the transport trait
//!   and the shared domain state, so every piece is unit-testable with the
//!   mock transport.

pub mod bridge;
