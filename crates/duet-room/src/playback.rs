//! Shared playback state kept per room.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A playback proposal from one participant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackControl {
    pub track_index: u32,
    pub playing: bool,
    /// Seconds into the track.
    pub position: f64,
}

impl PlaybackControl {
    /// Position must be a finite, non-negative number of seconds.
    pub fn is_valid(&self) -> bool {
        self.position.is_finite() && self.position >= 0.0
    }
}

/// The room's current playback record.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub track_index: u32,
    pub playing: bool,
    pub position: f64,
    pub last_updated: DateTime<Utc>,
}

impl PlaybackState {
    /// Track 0, paused, at the start.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            track_index: 0,
            playing: false,
            position: 0.0,
            last_updated: now,
        }
    }

    /// Overwrite with `control` (last writer wins).
    ///
    /// `last_updated` never moves backwards even if the wall clock does.
    pub fn apply(&mut self, control: PlaybackControl, now: DateTime<Utc>) {
        self.track_index = control.track_index;
        self.playing = control.playing;
        self.position = control.position;
        self.last_updated = self.last_updated.max(now);
    }

    /// Seconds elapsed since the last update, clamped at zero.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> f64 {
        let millis = (now - self.last_updated).num_milliseconds().max(0);
        millis as f64 / 1000.0
    }

    /// Wire snapshot. `elapsed` is filled only when `now` is given.
    pub fn snapshot(&self, now: Option<DateTime<Utc>>) -> PlaybackSnapshot {
        PlaybackSnapshot {
            track_index: self.track_index,
            playing: self.playing,
            position: self.position,
            last_updated: self.last_updated.timestamp_millis(),
            elapsed: now.map(|now| self.elapsed_secs(now)),
        }
    }
}

/// Playback state as sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub track_index: u32,
    pub playing: bool,
    pub position: f64,
    /// Milliseconds since the Unix epoch.
    pub last_updated: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<f64>,
}
