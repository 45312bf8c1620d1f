//! Event interpreter: inbound event-stream messages to state mutations
//!
//! Frames are JSON objects shaped `{ "event": string, "data": object }`.
//! Messages missing either field are ignored without touching the state.

use serde_json::Value;
use tracing::{debug, trace};

use super::MediaError;
use crate::state::{MediaState, MediaStore, ReportedFlag, Track};

/// Event received from the remote media app
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    /// `track_changed`: the whole track is replaced
    TrackChanged(Track),
    /// `playback_state_changed`
    PlaybackStateChanged {
        is_playing: ReportedFlag,
        /// `None` when the payload has no `position` field; `Some(None)` when
        /// it is null or not a number, which resets the position
        position_ms: Option<Option<u64>>,
    },
    /// `connection_status`
    ConnectionStatusChanged {
        connected: ReportedFlag,
        app_name: Option<String>,
    },
    /// Any other event name
    Unrecognized(String),
}

impl MediaEvent {
    /// Decode a text frame
    ///
    /// Returns an error for undecodable JSON and `Ok(None)` for messages
    /// without an `event` or `data` field.
    pub fn decode(text: &str) -> Result<Option<Self>, MediaError> {
        let message: Value = serde_json::from_str(text)?;
        Ok(Self::from_message(&message))
    }

    /// Interpret an already decoded message
    pub fn from_message(message: &Value) -> Option<Self> {
        let event = message.get("event").filter(|v| is_truthy(v))?;
        let data = message.get("data").filter(|v| is_truthy(v))?;

        let name = match event.as_str() {
            Some(name) => name,
            None => return Some(MediaEvent::Unrecognized(event.to_string())),
        };

        let event = match name {
            "track_changed" => MediaEvent::TrackChanged(Track {
                title: text_field(data, "title"),
                artist: text_field(data, "artist"),
                album: text_field(data, "album"),
                duration_ms: data.get("duration").and_then(millis).unwrap_or(0),
                position_ms: None,
                artwork_ref: data
                    .get("artwork")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
                source_app_name: text_field(data, "appName"),
            }),
            "playback_state_changed" => MediaEvent::PlaybackStateChanged {
                is_playing: flag(data.get("isPlaying")),
                position_ms: data.get("position").map(millis),
            },
            "connection_status" => MediaEvent::ConnectionStatusChanged {
                connected: flag(data.get("connected")),
                app_name: data
                    .get("appName")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            },
            other => MediaEvent::Unrecognized(other.to_string()),
        };

        Some(event)
    }

    /// Event name as it appears on the wire
    pub fn name(&self) -> &str {
        match self {
            MediaEvent::TrackChanged(_) => "track_changed",
            MediaEvent::PlaybackStateChanged { .. } => "playback_state_changed",
            MediaEvent::ConnectionStatusChanged { .. } => "connection_status",
            MediaEvent::Unrecognized(name) => name,
        }
    }

    /// Apply the event to the state
    ///
    /// Returns true when the state was mutated and the projection needs a refresh.
    pub fn apply(&self, state: &mut MediaState) -> bool {
        match self {
            MediaEvent::TrackChanged(track) => {
                state.track = Some(track.clone());
                true
            }
            MediaEvent::PlaybackStateChanged {
                is_playing,
                position_ms,
            } => {
                state.is_playing = *is_playing;
                if let Some(position) = position_ms {
                    match state.track.as_mut() {
                        Some(track) => track.position_ms = *position,
                        None => trace!("Position update dropped: no track loaded"),
                    }
                }
                true
            }
            MediaEvent::ConnectionStatusChanged {
                connected,
                app_name,
            } => {
                state.connected = *connected;
                state.app_name = app_name.clone();
                if !connected.is_truthy() {
                    state.track = None;
                }
                true
            }
            MediaEvent::Unrecognized(name) => {
                debug!("Unknown WebSocket event: {}", name);
                false
            }
        }
    }
}

/// Apply an event to the shared store
pub fn interpret(store: &MediaStore, event: &MediaEvent) -> bool {
    store.update(|state| event.apply(state))
}

fn text_field(data: &Value, key: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Flag value as reported; anything but a boolean keeps only its truthiness
fn flag(value: Option<&Value>) -> ReportedFlag {
    match value {
        Some(Value::Bool(b)) => ReportedFlag::Bool(*b),
        Some(other) => ReportedFlag::Other {
            truthy: is_truthy(other),
        },
        None => ReportedFlag::Other { truthy: false },
    }
}

/// Non-negative millisecond count; fractional values are truncated
fn millis(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f as u64)
    })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
