//! Boolean conditions evaluated against the live media state

use serde::Serialize;

use crate::state::{MediaState, MediaStore};

/// A boolean condition the host can evaluate to style buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Condition {
    IsPlaying,
    IsPaused,
    IsConnected,
    IsDisconnected,
}

impl Condition {
    pub const ALL: [Condition; 4] = [
        Condition::IsPlaying,
        Condition::IsPaused,
        Condition::IsConnected,
        Condition::IsDisconnected,
    ];

    /// Identifier used by the host surface
    pub fn id(self) -> &'static str {
        match self {
            Condition::IsPlaying => "isPlaying",
            Condition::IsPaused => "isPaused",
            Condition::IsConnected => "isConnected",
            Condition::IsDisconnected => "isDisconnected",
        }
    }

    /// Evaluate against a state snapshot
    ///
    /// Comparisons are strict: a missing or non-boolean flag satisfies
    /// neither side of a pair.
    pub fn evaluate(self, state: &MediaState) -> bool {
        match self {
            Condition::IsPlaying => state.is_playing.is(true),
            Condition::IsPaused => state.is_playing.is(false),
            Condition::IsConnected => state.connected.is(true),
            Condition::IsDisconnected => state.connected.is(false),
        }
    }

    /// Evaluate against the live store
    pub fn check(self, store: &MediaStore) -> bool {
        store.read(|state| self.evaluate(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ReportedFlag;

    const FLAGS: [ReportedFlag; 4] = [
        ReportedFlag::Bool(true),
        ReportedFlag::Bool(false),
        ReportedFlag::Other { truthy: true },
        ReportedFlag::Other { truthy: false },
    ];

    #[test]
    fn test_playing_and_paused_are_exclusive() {
        for is_playing in FLAGS {
            let state = MediaState {
                is_playing,
                ..MediaState::default()
            };
            let playing = Condition::IsPlaying.evaluate(&state);
            let paused = Condition::IsPaused.evaluate(&state);
            assert!(!(playing && paused));

            if matches!(is_playing, ReportedFlag::Other { .. }) {
                assert!(!playing);
                assert!(!paused);
            }
        }
    }

    #[test]
    fn test_connection_conditions_are_strict() {
        for connected in FLAGS {
            let state = MediaState {
                connected,
                ..MediaState::default()
            };
            let up = Condition::IsConnected.evaluate(&state);
            let down = Condition::IsDisconnected.evaluate(&state);

            match connected {
                ReportedFlag::Bool(b) => {
                    assert_eq!(up, b);
                    assert_eq!(down, !b);
                }
                ReportedFlag::Other { .. } => {
                    assert!(!up);
                    assert!(!down);
                }
            }
        }
    }

    #[test]
    fn test_initial_state_conditions() {
        let store = MediaStore::new();
        assert!(!Condition::IsPlaying.check(&store));
        assert!(Condition::IsPaused.check(&store));
        assert!(!Condition::IsConnected.check(&store));
        assert!(Condition::IsDisconnected.check(&store));
    }
}
