//! Media state type definitions
//!
//! Defines the snapshot of the remote media app as last reported over the event stream.

use serde::Serialize;

/// Current media state of the remote app
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaState {
    /// Whether the remote app reports a connected media session
    pub connected: ReportedFlag,
    /// Name of the media app currently reporting (None when unknown)
    pub app_name: Option<String>,
    /// Playback flag exactly as reported
    pub is_playing: ReportedFlag,
    /// Track currently loaded in the app
    pub track: Option<Track>,
}

impl Default for MediaState {
    fn default() -> Self {
        Self {
            connected: ReportedFlag::Bool(false),
            app_name: None,
            is_playing: ReportedFlag::Bool(false),
            track: None,
        }
    }
}

/// A flag as the media app sent it
///
/// The app does not validate its payloads, so a flag may be missing or carry
/// some other JSON value. Conditions compare strictly against `Bool`, while
/// display text and track clearing follow the value's truthiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReportedFlag {
    Bool(bool),
    /// Missing or non-boolean value
    Other { truthy: bool },
}

impl ReportedFlag {
    /// Strict comparison: only a reported boolean can match
    pub fn is(self, expected: bool) -> bool {
        self == ReportedFlag::Bool(expected)
    }

    pub fn is_truthy(self) -> bool {
        match self {
            ReportedFlag::Bool(b) => b,
            ReportedFlag::Other { truthy } => truthy,
        }
    }
}

impl From<bool> for ReportedFlag {
    fn from(b: bool) -> Self {
        ReportedFlag::Bool(b)
    }
}

/// Track metadata, replaced wholesale on every `track_changed` event
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Track length in milliseconds
    pub duration_ms: u64,
    /// Playback position in milliseconds, unset until the first position update.
    /// Not clamped to `duration_ms`.
    pub position_ms: Option<u64>,
    /// Artwork URI
    pub artwork_ref: Option<String>,
    /// App that reported this track
    pub source_app_name: String,
}
