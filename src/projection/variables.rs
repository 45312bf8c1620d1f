//! Display values for the host platform

use serde::Serialize;
use std::collections::BTreeMap;

use crate::state::MediaState;

const NOT_AVAILABLE: &str = "N/A";

/// Human-readable values derived from the media state
///
/// Serialized field names are the variable ids registered with the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayValues {
    pub connected: String,
    pub app_name: String,
    pub is_playing: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub artwork: String,
    pub duration: String,
    pub position: String,
}

impl DisplayValues {
    /// Recompute every display value from the given state
    pub fn from_state(state: &MediaState) -> Self {
        let connected = if state.connected.is_truthy() { "Yes" } else { "No" }.to_string();
        let app_name = or_not_available(state.app_name.as_deref().unwrap_or_default());
        let is_playing = if state.is_playing.is_truthy() {
            "Playing"
        } else {
            "Paused"
        }
        .to_string();

        match &state.track {
            Some(track) => Self {
                connected,
                app_name,
                is_playing,
                title: or_not_available(&track.title),
                artist: or_not_available(&track.artist),
                album: or_not_available(&track.album),
                artwork: track.artwork_ref.clone().unwrap_or_default(),
                duration: format_duration(track.duration_ms),
                position: format_duration(track.position_ms.unwrap_or(0)),
            },
            None => Self {
                connected,
                app_name,
                is_playing,
                title: NOT_AVAILABLE.to_string(),
                artist: NOT_AVAILABLE.to_string(),
                album: NOT_AVAILABLE.to_string(),
                artwork: String::new(),
                duration: format_duration(0),
                position: format_duration(0),
            },
        }
    }

    /// Values keyed by variable id
    pub fn to_map(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("connected", self.connected.clone()),
            ("appName", self.app_name.clone()),
            ("isPlaying", self.is_playing.clone()),
            ("title", self.title.clone()),
            ("artist", self.artist.clone()),
            ("album", self.album.clone()),
            ("artwork", self.artwork.clone()),
            ("duration", self.duration.clone()),
            ("position", self.position.clone()),
        ])
    }
}

impl Default for DisplayValues {
    fn default() -> Self {
        Self::from_state(&MediaState::default())
    }
}

fn or_not_available(value: &str) -> String {
    if value.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        value.to_string()
    }
}

/// Format milliseconds as `M:SS` (seconds floored, minutes unbounded)
pub fn format_duration(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}
