//! Command dispatcher: one-shot transport commands to the media app
//!
//! Each command is a bodiless POST to `http://{host}:{port}{path}`. The app
//! answers `{ "success": bool, "error"?: string }`. A rejected command is only
//! logged; a request that cannot complete is logged and returned as an error.

use serde::Serialize;
use serde_json::Value;
use std::str::FromStr;
use tracing::{debug, error, warn};

use super::driver::MediaDriver;
use super::MediaError;
use crate::config::MediaConfig;
use crate::status::ActivityDirection;

/// Transport commands accepted by the media app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportCommand {
    Play,
    Pause,
    Toggle,
    Next,
    Previous,
}

impl TransportCommand {
    pub const ALL: [TransportCommand; 5] = [
        TransportCommand::Play,
        TransportCommand::Pause,
        TransportCommand::Toggle,
        TransportCommand::Next,
        TransportCommand::Previous,
    ];

    /// Request path on the media app
    pub fn path(self) -> &'static str {
        match self {
            TransportCommand::Play => "/play",
            TransportCommand::Pause => "/pause",
            TransportCommand::Toggle => "/toggle",
            TransportCommand::Next => "/next",
            TransportCommand::Previous => "/previous",
        }
    }

    /// Action id (the path without its leading slash)
    pub fn id(self) -> &'static str {
        &self.path()[1..]
    }

    /// Name used in log messages
    pub fn label(self) -> &'static str {
        match self {
            TransportCommand::Play => "Play",
            TransportCommand::Pause => "Pause",
            TransportCommand::Toggle => "Toggle",
            TransportCommand::Next => "Next",
            TransportCommand::Previous => "Previous",
        }
    }
}

impl FromStr for TransportCommand {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().trim_start_matches('/');
        Self::ALL
            .into_iter()
            .find(|c| c.id().eq_ignore_ascii_case(id))
            .ok_or_else(|| MediaError::UnknownAction(s.to_string()))
    }
}

impl std::fmt::Display for TransportCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Decoded answer to a transport command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResponse {
    pub success: bool,
    pub error: Option<String>,
    /// Full decoded body
    pub body: Value,
}

impl CommandResponse {
    pub fn from_body(body: Value) -> Self {
        let success = body.get("success").and_then(Value::as_bool).unwrap_or(false);
        let error = body
            .get("error")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self {
            success,
            error,
            body,
        }
    }

    /// Message to log when the app rejected the command
    pub fn failure_message(&self) -> Option<String> {
        if self.success {
            None
        } else {
            Some(
                self.error
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            )
        }
    }
}

/// Sends transport commands over HTTP
#[derive(Clone, Default)]
pub struct CommandDispatcher {
    client: reqwest::Client,
}

impl CommandDispatcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Send a command and decode the response
    ///
    /// A rejected command (`success` absent or false) is logged as a warning
    /// and still returned as `Ok`.
    pub async fn send(
        &self,
        endpoint: &MediaConfig,
        command: TransportCommand,
    ) -> Result<CommandResponse, MediaError> {
        let url = endpoint.http_url(command.path());
        debug!("Sending {} command to {}", command, url);

        match self.request(&url).await {
            Ok(response) => {
                if let Some(message) = response.failure_message() {
                    warn!("Command failed: {}", message);
                }
                Ok(response)
            }
            Err(e) => {
                error!("Error sending command: {}", e);
                Err(e)
            }
        }
    }

    async fn request(&self, url: &str) -> Result<CommandResponse, MediaError> {
        let response = self.client.post(url).send().await?;
        let bytes = response.bytes().await?;
        let body: Value = serde_json::from_slice(&bytes)?;
        Ok(CommandResponse::from_body(body))
    }
}

impl MediaDriver {
    /// Send a transport command to the configured endpoint
    pub async fn send_command(
        &self,
        command: TransportCommand,
    ) -> Result<CommandResponse, MediaError> {
        self.record_activity(ActivityDirection::Outbound);
        let endpoint = self.endpoint();
        self.dispatcher.send(&endpoint, command).await
    }
}
