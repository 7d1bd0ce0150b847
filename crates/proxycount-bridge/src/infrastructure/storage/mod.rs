//! Configuration persistence for the bridge.

pub mod config;

pub use config::{load_config, BridgeConfig, ConfigError};
