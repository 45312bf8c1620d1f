//! Last-seen timestamps for inbound events and outbound commands
//!
//! Feeds the `lastInbound`/`lastOutbound` fields of the status endpoint.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::trace;

use super::ActivityDirection;

/// Records when each driver last received or sent a message
#[derive(Default)]
pub struct ActivityTracker {
    /// Key: (driver, direction), Value: timestamp of last activity
    last_seen: DashMap<(String, ActivityDirection), Instant>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record activity for a driver
    pub fn record(&self, driver: &str, direction: ActivityDirection) {
        self.last_seen
            .insert((driver.to_string(), direction), Instant::now());

        trace!("Activity: {} {:?}", driver, direction);
    }

    /// Time elapsed since the last recorded activity, if any
    pub fn since_last(&self, driver: &str, direction: ActivityDirection) -> Option<Duration> {
        self.last_seen
            .get(&(driver.to_string(), direction))
            .map(|entry| entry.value().elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_directions_are_tracked_separately() {
        let tracker = ActivityTracker::new();
        tracker.record("media", ActivityDirection::Inbound);

        assert!(tracker.since_last("media", ActivityDirection::Inbound).is_some());
        assert!(tracker.since_last("media", ActivityDirection::Outbound).is_none());
        assert!(tracker.since_last("other", ActivityDirection::Inbound).is_none());
    }

    #[test]
    fn test_record_resets_elapsed() {
        let tracker = ActivityTracker::new();
        tracker.record("media", ActivityDirection::Outbound);
        sleep(Duration::from_millis(50));

        let before = tracker.since_last("media", ActivityDirection::Outbound).unwrap();
        assert!(before >= Duration::from_millis(50));

        tracker.record("media", ActivityDirection::Outbound);
        let after = tracker.since_last("media", ActivityDirection::Outbound).unwrap();
        assert!(after < before);
    }
}
