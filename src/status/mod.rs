//! Connection status reporting
//!
//! Provides the status values the media driver reports upward:
//! - Connection state transitions (connecting, healthy, failure, disconnected)
//! - Inbound/outbound activity timestamps for the API

use serde::Serialize;
use std::sync::Arc;

pub mod activity;

pub use activity::ActivityTracker;

/// Connection status for a driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// A connection attempt is in flight
    Connecting,
    /// Event stream is open and healthy
    Connected,
    /// Event stream is closed (a reconnect may be pending)
    Disconnected,
    /// Transport-level error on the event stream
    ConnectionFailure(String),
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::ConnectionFailure(msg) => write!(f, "connection failure: {}", msg),
        }
    }
}

/// Direction of message activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityDirection {
    /// Frame received from the media app
    Inbound,
    /// Command sent to the media app
    Outbound,
}

/// Type alias for connection status callbacks
pub type StatusCallback = Arc<dyn Fn(ConnectionStatus) + Send + Sync>;
