//! Event-stream connection management
//!
//! Handles the WebSocket connection, reconnection, and inbound event handling.
//!
//! At most one connection task is live. Each `start()` bumps a generation
//! counter; open/error/close notifications from an older generation are
//! dropped, so a superseded connection can never schedule a reconnect.

use futures_util::StreamExt;
use std::sync::atomic::Ordering;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::driver::{ConnectionPhase, MediaDriver};
use super::events::{interpret, MediaEvent};
use super::MediaError;
use crate::config::MediaConfig;
use crate::status::{ActivityDirection, ConnectionStatus};

/// Live connection task
pub(super) struct ConnectionHandle {
    generation: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl MediaDriver {
    /// Open the event stream to the configured endpoint
    ///
    /// Cancels a pending reconnect and supersedes any connection still open.
    pub fn start(&self) {
        self.cancel_reconnect();
        *self.stopped.lock() = false;

        let url = self.endpoint.read().ws_url();
        info!("Connecting to {}", url);

        *self.phase.write() = ConnectionPhase::Connecting;
        self.emit_status(ConnectionStatus::Connecting);

        // Hold the slot while spawning so the task cannot observe a stale handle
        let mut slot = self.connection.lock();
        if let Some(previous) = slot.take() {
            previous.cancel.cancel();
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        let driver = self.clone_for_task();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            driver.run_connection(generation, url, token).await;
        });

        *slot = Some(ConnectionHandle {
            generation,
            cancel,
            task,
        });
    }

    /// Close the event stream and stop reconnecting (idempotent)
    pub async fn stop(&self) {
        *self.stopped.lock() = true;
        self.cancel_reconnect();

        let handle = self.connection.lock().take();
        if let Some(handle) = handle {
            handle.cancel.cancel();
            if tokio::time::timeout(std::time::Duration::from_secs(2), handle.task)
                .await
                .is_err()
            {
                warn!("Event stream task did not finish in time");
            }
        }

        *self.phase.write() = ConnectionPhase::Disconnected;
    }

    /// Switch to a new endpoint, replacing the current connection
    pub fn reconfigure(&self, endpoint: MediaConfig) {
        info!("Media endpoint updated: {}", endpoint.ws_url());
        *self.endpoint.write() = endpoint;

        if let Some(previous) = self.connection.lock().take() {
            previous.cancel.cancel();
        }

        self.start();
    }

    fn cancel_reconnect(&self) {
        if let Some(timer) = self.reconnect_timer.lock().take() {
            timer.abort();
            debug!("Pending reconnect cancelled");
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    async fn run_connection(&self, generation: u64, url: String, cancel: CancellationToken) {
        let connect = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Connection attempt to {} cancelled", url);
                self.on_close(generation);
                return;
            }
            result = connect_async(url.as_str()) => result,
        };

        let mut ws = match connect {
            Ok((ws, _response)) => ws,
            Err(e) => {
                self.on_error(generation, &MediaError::from(e));
                self.on_close(generation);
                return;
            }
        };

        self.on_open(generation);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Closing event stream to {}", url);
                    if let Err(e) = ws.close(None).await {
                        debug!("Error while closing event stream: {}", e);
                    }
                    break;
                }
                msg = ws.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => self.handle_frame(&text),
                        Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                            Ok(text) => self.handle_frame(text),
                            Err(e) => error!("Error parsing WebSocket message: {}", e),
                        }
                        Some(Ok(Message::Close(frame))) => {
                            debug!("Event stream closed by media app: {:?}", frame);
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            self.on_error(generation, &MediaError::from(e));
                            break;
                        }
                        None => break,
                    }
                }
            }
        }

        self.on_close(generation);
    }

    pub(super) fn on_open(&self, generation: u64) {
        if !self.is_current(generation) {
            return;
        }

        *self.phase.write() = ConnectionPhase::Connected;
        self.cancel_reconnect();
        *self.reconnect_count.lock() = 0;
        self.emit_status(ConnectionStatus::Connected);

        info!("WebSocket connected");
    }

    pub(super) fn on_error(&self, generation: u64, err: &MediaError) {
        if !self.is_current(generation) {
            debug!("Ignoring error from superseded connection: {}", err);
            return;
        }

        error!("WebSocket error: {}", err);
        self.emit_status(ConnectionStatus::ConnectionFailure(err.to_string()));
    }

    pub(super) fn on_close(&self, generation: u64) {
        if !self.is_current(generation) {
            debug!("Superseded connection closed");
            return;
        }

        {
            let mut slot = self.connection.lock();
            if slot.as_ref().is_some_and(|h| h.generation == generation) {
                slot.take();
            }
        }

        *self.phase.write() = ConnectionPhase::Disconnected;
        warn!("🔌 WebSocket disconnected");
        self.emit_status(ConnectionStatus::Disconnected);

        if *self.stopped.lock() {
            return;
        }
        self.schedule_reconnect();
    }

    /// Schedule a single reconnection attempt after the fixed delay
    ///
    /// No-op when an attempt is already pending.
    pub(super) fn schedule_reconnect(&self) {
        let mut timer = self.reconnect_timer.lock();
        if timer.as_ref().is_some_and(|t| !t.is_finished()) {
            debug!("Reconnect already scheduled");
            return;
        }

        let attempt = {
            let mut count = self.reconnect_count.lock();
            *count += 1;
            *count
        };

        let delay = self.reconnect_delay;
        debug!("⏳ Reconnect #{} in {}ms", attempt, delay.as_millis());

        let driver = self.clone_for_task();
        *timer = Some(tokio::spawn(async move {
            sleep(delay).await;

            // Release the slot first; start() would otherwise abort this task
            driver.reconnect_timer.lock().take();
            if *driver.stopped.lock() {
                return;
            }
            driver.start();
        }));
    }

    /// Decode and interpret one inbound frame
    pub(super) fn handle_frame(&self, text: &str) {
        self.record_activity(ActivityDirection::Inbound);

        let event = match MediaEvent::decode(text) {
            Ok(Some(event)) => event,
            Ok(None) => return,
            Err(e) => {
                error!("Error parsing WebSocket message: {}", e);
                return;
            }
        };

        debug!("Media event: {}", event.name());
        if interpret(&self.store, &event) {
            self.publish_projection();
        }
    }
}
