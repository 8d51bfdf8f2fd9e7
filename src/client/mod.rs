//! Client-side companion for consuming the broadcast stream.

/// Reconnecting event consumer with exponential backoff.
pub mod reconnect;

pub use reconnect::{BackoffPolicy, ConnectError, EventConnector, ReconnectAgent};
