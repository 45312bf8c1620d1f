//! Media driver core struct and Driver trait implementation
//!
//! Defines the MediaDriver struct with all its state and provides constructors.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::actions::{CommandDispatcher, TransportCommand};
use super::connection::ConnectionHandle;
use super::{ConditionsCallback, Driver, ExecutionContext, VariablesCallback};
use crate::config::{AppConfig, MediaConfig};
use crate::projection::DisplayValues;
use crate::state::MediaStore;
use crate::status::{ActivityDirection, ActivityTracker, ConnectionStatus, StatusCallback};

/// Fixed delay before a reconnection attempt
pub const RECONNECT_DELAY: Duration = Duration::from_millis(5000);

/// Event-stream connection state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionPhase {
    Disconnected,
    Connecting,
    Connected,
}

/// Remote media app driver
pub struct MediaDriver {
    pub(super) name: String,
    pub(super) endpoint: Arc<RwLock<MediaConfig>>,

    // Cached media state and outbound command channel
    pub(super) store: MediaStore,
    pub(super) dispatcher: CommandDispatcher,

    // Shared application config, set by init()
    pub(super) config: Arc<RwLock<Option<Arc<tokio::sync::RwLock<AppConfig>>>>>,

    // Connection state
    pub(super) phase: Arc<RwLock<ConnectionPhase>>,
    pub(super) connection: Arc<Mutex<Option<ConnectionHandle>>>,
    /// Bumped on every start(); events from older connections are ignored
    pub(super) generation: Arc<AtomicU64>,

    // Reconnection state
    pub(super) reconnect_timer: Arc<Mutex<Option<JoinHandle<()>>>>,
    pub(super) reconnect_count: Arc<Mutex<usize>>,
    pub(super) reconnect_delay: Duration,
    pub(super) stopped: Arc<Mutex<bool>>,

    // Subscribers
    pub(super) variable_callbacks: Arc<RwLock<Vec<VariablesCallback>>>,
    pub(super) condition_callbacks: Arc<RwLock<Vec<ConditionsCallback>>>,
    pub(super) status_callbacks: Arc<RwLock<Vec<StatusCallback>>>,
    pub(super) current_status: Arc<RwLock<ConnectionStatus>>,

    // Activity tracking
    pub(super) activity_tracker: Arc<RwLock<Option<Arc<ActivityTracker>>>>,
}

impl MediaDriver {
    /// Create a new media driver for the given endpoint
    pub fn new(endpoint: MediaConfig) -> Self {
        Self::with_client(endpoint, reqwest::Client::new())
    }

    /// Create a driver sharing an existing HTTP client
    pub fn with_client(endpoint: MediaConfig, client: reqwest::Client) -> Self {
        Self {
            name: "media".to_string(),
            endpoint: Arc::new(RwLock::new(endpoint)),
            store: MediaStore::new(),
            dispatcher: CommandDispatcher::new(client),
            config: Arc::new(RwLock::new(None)),
            phase: Arc::new(RwLock::new(ConnectionPhase::Disconnected)),
            connection: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
            reconnect_timer: Arc::new(Mutex::new(None)),
            reconnect_count: Arc::new(Mutex::new(0)),
            reconnect_delay: RECONNECT_DELAY,
            stopped: Arc::new(Mutex::new(false)),
            variable_callbacks: Arc::new(RwLock::new(Vec::new())),
            condition_callbacks: Arc::new(RwLock::new(Vec::new())),
            status_callbacks: Arc::new(RwLock::new(Vec::new())),
            current_status: Arc::new(RwLock::new(ConnectionStatus::Disconnected)),
            activity_tracker: Arc::new(RwLock::new(None)),
        }
    }

    /// Create from config
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.media.clone())
    }

    /// Override the reconnect delay
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Handle to the cached media state
    pub fn store(&self) -> MediaStore {
        self.store.clone()
    }

    /// Endpoint currently in use
    pub fn endpoint(&self) -> MediaConfig {
        self.endpoint.read().clone()
    }

    /// Current state of the event-stream connection
    pub fn phase(&self) -> ConnectionPhase {
        *self.phase.read()
    }

    /// Whether a reconnection attempt is scheduled
    pub fn is_reconnect_pending(&self) -> bool {
        self.reconnect_timer
            .lock()
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }

    /// Reconnection attempts scheduled since the last successful open
    pub fn reconnect_attempts(&self) -> usize {
        *self.reconnect_count.lock()
    }

    /// Emit connection status to all subscribers
    pub(super) fn emit_status(&self, status: ConnectionStatus) {
        *self.current_status.write() = status.clone();
        for callback in self.status_callbacks.read().iter() {
            callback(status.clone());
        }
    }

    /// Push recomputed display values, then ask for condition re-evaluation
    pub(super) fn publish_projection(&self) {
        let values = self.store.read(DisplayValues::from_state);
        for callback in self.variable_callbacks.read().iter() {
            callback(&values);
        }
        for callback in self.condition_callbacks.read().iter() {
            callback();
        }
    }

    pub(super) fn record_activity(&self, direction: ActivityDirection) {
        if let Some(ref tracker) = *self.activity_tracker.read() {
            tracker.record(&self.name, direction);
        }
    }

    /// Clone all Arc fields for spawning background tasks (timer, reconnect, etc.)
    ///
    /// All fields are Arc-wrapped, so this creates a cheap clone that shares
    /// the same underlying data with the original instance.
    pub(super) fn clone_for_task(&self) -> Self {
        Self {
            name: self.name.clone(),
            endpoint: Arc::clone(&self.endpoint),
            store: self.store.clone(),
            dispatcher: self.dispatcher.clone(),
            config: Arc::clone(&self.config),
            phase: Arc::clone(&self.phase),
            connection: Arc::clone(&self.connection),
            generation: Arc::clone(&self.generation),
            reconnect_timer: Arc::clone(&self.reconnect_timer),
            reconnect_count: Arc::clone(&self.reconnect_count),
            reconnect_delay: self.reconnect_delay,
            stopped: Arc::clone(&self.stopped),
            variable_callbacks: Arc::clone(&self.variable_callbacks),
            condition_callbacks: Arc::clone(&self.condition_callbacks),
            status_callbacks: Arc::clone(&self.status_callbacks),
            current_status: Arc::clone(&self.current_status),
            activity_tracker: Arc::clone(&self.activity_tracker),
        }
    }
}

#[async_trait]
impl Driver for MediaDriver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self, ctx: ExecutionContext) -> Result<()> {
        let media = ctx.config.read().await.media.clone();
        *self.endpoint.write() = media;
        *self.config.write() = Some(Arc::clone(&ctx.config));
        *self.activity_tracker.write() = ctx.activity_tracker.clone();

        self.start();
        info!("✅ Media driver initialized ({})", self.endpoint().ws_url());
        Ok(())
    }

    async fn execute(&self, action: &str, _ctx: ExecutionContext) -> Result<Value> {
        let command: TransportCommand = action.parse()?;

        match self.send_command(command).await {
            Ok(response) => Ok(response.body),
            Err(e) => {
                error!("{} action failed: {}", command.label(), e);
                Err(e.into())
            }
        }
    }

    async fn sync(&self) -> Result<()> {
        let config = self.config.read().clone();
        let media = match config {
            Some(config) => config.read().await.media.clone(),
            None => self.endpoint(),
        };

        self.reconfigure(media);
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        self.stop().await;
        info!("Media driver shutdown");
        Ok(())
    }

    fn subscribe_variables(&self, callback: VariablesCallback) {
        self.variable_callbacks.write().push(callback);
    }

    fn subscribe_condition_checks(&self, callback: ConditionsCallback) {
        self.condition_callbacks.write().push(callback);
    }

    fn connection_status(&self) -> ConnectionStatus {
        self.current_status.read().clone()
    }

    fn subscribe_connection_status(&self, callback: StatusCallback) {
        self.status_callbacks.write().push(callback);
    }
}
