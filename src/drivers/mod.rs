//! Application drivers
//!
//! The only driver today is the remote media app; the trait keeps the API
//! layer and the entry point independent of its connection details.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::projection::DisplayValues;
use crate::status::{ActivityTracker, ConnectionStatus, StatusCallback};

/// Callback type for display value updates
///
/// Called with the full recomputed set after every state mutation.
pub type VariablesCallback = Arc<dyn Fn(&DisplayValues) + Send + Sync>;

/// Callback type for condition re-evaluation requests
///
/// Called after the variables callbacks, once per state mutation.
pub type ConditionsCallback = Arc<dyn Fn() + Send + Sync>;

/// Execution context passed to drivers
#[derive(Clone)]
pub struct ExecutionContext {
    /// Application configuration
    pub config: Arc<RwLock<crate::config::AppConfig>>,
    /// Activity tracker (optional)
    pub activity_tracker: Option<Arc<ActivityTracker>>,
}

impl ExecutionContext {
    pub fn new(config: crate::config::AppConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            activity_tracker: None,
        }
    }

    pub fn with_activity_tracker(mut self, tracker: Arc<ActivityTracker>) -> Self {
        self.activity_tracker = Some(tracker);
        self
    }
}

/// Driver trait - all application integrations implement this
///
/// Note: All methods take &self (not &mut self) to support Arc<dyn Driver>.
/// Drivers should use interior mutability (RwLock, Mutex, etc.) for mutable state.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Get the driver name
    fn name(&self) -> &str;

    /// Initialize the driver (open connections, etc.)
    async fn init(&self, ctx: ExecutionContext) -> Result<()>;

    /// Execute an action by id, returning the application's answer
    async fn execute(&self, action: &str, ctx: ExecutionContext) -> Result<Value>;

    /// Sync driver state (called after config reload)
    async fn sync(&self) -> Result<()>;

    /// Shutdown the driver gracefully
    async fn shutdown(&self) -> Result<()>;

    /// Subscribe to display value updates
    ///
    /// Default implementation: no-op (driver exposes no variables)
    fn subscribe_variables(&self, _callback: VariablesCallback) {}

    /// Subscribe to condition re-evaluation requests
    ///
    /// Default implementation: no-op (driver exposes no conditions)
    fn subscribe_condition_checks(&self, _callback: ConditionsCallback) {}

    /// Get current connection status
    ///
    /// Default implementation: always connected (for drivers without network connections)
    fn connection_status(&self) -> ConnectionStatus {
        ConnectionStatus::Connected
    }

    /// Subscribe to connection status changes
    ///
    /// Default implementation: no-op (driver doesn't track connection status)
    fn subscribe_connection_status(&self, _callback: StatusCallback) {}
}

pub mod media;

pub use media::MediaDriver;
