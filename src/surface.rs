//! Definitions registered with the host control surface
//!
//! Static tables of actions, conditions and variables. The API serves them
//! as-is and `--list-definitions` prints them.

use serde::Serialize;

use crate::drivers::media::TransportCommand;
use crate::projection::Condition;

/// Pack an RGB triple into the host's 24-bit color value
pub const fn combine_rgb(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// A button action
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ActionDefinition {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(skip)]
    pub command: TransportCommand,
}

pub const ACTIONS: [ActionDefinition; 5] = [
    ActionDefinition {
        id: "play",
        name: "Play",
        command: TransportCommand::Play,
    },
    ActionDefinition {
        id: "pause",
        name: "Pause",
        command: TransportCommand::Pause,
    },
    ActionDefinition {
        id: "toggle",
        name: "Play/Pause Toggle",
        command: TransportCommand::Toggle,
    },
    ActionDefinition {
        id: "next",
        name: "Next Track",
        command: TransportCommand::Next,
    },
    ActionDefinition {
        id: "previous",
        name: "Previous Track",
        command: TransportCommand::Previous,
    },
];

pub fn find_action(id: &str) -> Option<&'static ActionDefinition> {
    ACTIONS.iter().find(|a| a.id == id)
}

/// Style applied to a button while a boolean condition holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ButtonStyle {
    pub bgcolor: u32,
    pub color: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConditionKind {
    Boolean {
        #[serde(skip)]
        condition: Condition,
        #[serde(rename = "defaultStyle")]
        default_style: ButtonStyle,
    },
    /// Produces an image instead of a style
    Advanced,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ConditionDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub label: &'static str,
    #[serde(flatten)]
    pub kind: ConditionKind,
}

/// Id of the artwork condition
pub const ALBUM_ARTWORK: &str = "albumArtwork";

const WHITE: u32 = combine_rgb(255, 255, 255);

pub const CONDITIONS: [ConditionDefinition; 5] = [
    ConditionDefinition {
        id: "isPlaying",
        name: "Is Playing",
        label: "Change button style when media is playing",
        kind: ConditionKind::Boolean {
            condition: Condition::IsPlaying,
            default_style: ButtonStyle {
                bgcolor: combine_rgb(0, 255, 0),
                color: combine_rgb(0, 0, 0),
            },
        },
    },
    ConditionDefinition {
        id: "isPaused",
        name: "Is Paused",
        label: "Change button style when media is paused",
        kind: ConditionKind::Boolean {
            condition: Condition::IsPaused,
            default_style: ButtonStyle {
                bgcolor: combine_rgb(255, 0, 0),
                color: WHITE,
            },
        },
    },
    ConditionDefinition {
        id: "isConnected",
        name: "Media App Connected",
        label: "Change button style when a media app is connected",
        kind: ConditionKind::Boolean {
            condition: Condition::IsConnected,
            default_style: ButtonStyle {
                bgcolor: combine_rgb(0, 0, 255),
                color: WHITE,
            },
        },
    },
    ConditionDefinition {
        id: "isDisconnected",
        name: "Media App Disconnected",
        label: "Change button style when no media app is connected",
        kind: ConditionKind::Boolean {
            condition: Condition::IsDisconnected,
            default_style: ButtonStyle {
                bgcolor: combine_rgb(64, 64, 64),
                color: WHITE,
            },
        },
    },
    ConditionDefinition {
        id: ALBUM_ARTWORK,
        name: "Album Artwork",
        label: "Display album artwork on button",
        kind: ConditionKind::Advanced,
    },
];

pub fn find_condition(id: &str) -> Option<&'static ConditionDefinition> {
    CONDITIONS.iter().find(|c| c.id == id)
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct VariableDefinition {
    pub id: &'static str,
    pub name: &'static str,
}

pub const VARIABLES: [VariableDefinition; 9] = [
    VariableDefinition { id: "connected", name: "Connection Status" },
    VariableDefinition { id: "appName", name: "Media App Name" },
    VariableDefinition { id: "isPlaying", name: "Playback State" },
    VariableDefinition { id: "title", name: "Track Title" },
    VariableDefinition { id: "artist", name: "Artist Name" },
    VariableDefinition { id: "album", name: "Album Name" },
    VariableDefinition { id: "artwork", name: "Album Artwork URL" },
    VariableDefinition { id: "duration", name: "Track Duration" },
    VariableDefinition { id: "position", name: "Playback Position" },
];
