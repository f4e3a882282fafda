//! Live track recording session.
//!
//! The app's location feed pushes fixes into a [`TrackRecorder`]; the
//! recorder keeps them only while recording is active and produces the
//! [`RecordedTrack`] payload that is sent to the tracks backend when the
//! user finishes.
//!
//! ```text
//! Idle --start--> Recording --pause--> Paused --resume--> Recording
//!                     |                  |
//!                     +-----finish-------+--> Finished
//! ```

use std::fmt;

use log::{debug, info, warn};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geo_utils::path_distance;
use crate::{GeoError, Positioned, Region, Result, TimestampedFix};

/// Span used when centering the map on the latest fix.
pub const FOLLOW_SPAN_DEGREES: f64 = 0.01;

/// Recorder settings
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Reject NaN / out-of-range fixes instead of storing them.
    /// Default: true
    pub validate_fixes: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            validate_fixes: true,
        }
    }
}

/// Where a recording session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum RecordingState {
    Idle,
    Recording,
    Paused,
    Finished,
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordingState::Idle => "idle",
            RecordingState::Recording => "recording",
            RecordingState::Paused => "paused",
            RecordingState::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// A finished track, shaped like the backend's track document.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RecordedTrack {
    pub user_id: String,
    /// Session start (Unix epoch milliseconds)
    pub start_time: i64,
    /// Session end (Unix epoch milliseconds)
    pub end_time: i64,
    /// Total path length in meters
    pub distance: f64,
    pub path: Vec<TimestampedFix>,
}

/// Accumulates fixes for one recording session.
#[derive(Debug)]
pub struct TrackRecorder {
    user_id: String,
    config: RecorderConfig,
    state: RecordingState,
    start_time: Option<i64>,
    path: Vec<TimestampedFix>,
}

impl TrackRecorder {
    pub fn new(user_id: impl Into<String>, config: RecorderConfig) -> Self {
        Self {
            user_id: user_id.into(),
            config,
            state: RecordingState::Idle,
            start_time: None,
            path: Vec::new(),
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn path(&self) -> &[TimestampedFix] {
        &self.path
    }

    pub fn start_time(&self) -> Option<i64> {
        self.start_time
    }

    /// Begin recording. The start time is only taken on the first start.
    pub fn start(&mut self, now_ms: i64) -> Result<()> {
        self.transition("start", &[RecordingState::Idle], RecordingState::Recording)?;
        self.start_time.get_or_insert(now_ms);
        info!("Recording started for user {}", self.user_id);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        self.transition("pause", &[RecordingState::Recording], RecordingState::Paused)?;
        debug!("Recording paused after {} fixes", self.path.len());
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        self.transition("resume", &[RecordingState::Paused], RecordingState::Recording)?;
        debug!("Recording resumed");
        Ok(())
    }

    /// Append a fix from the location feed.
    ///
    /// Returns `Ok(false)` when the fix is ignored because the session is
    /// not actively recording.
    pub fn record(&mut self, fix: TimestampedFix) -> Result<bool> {
        if self.state != RecordingState::Recording {
            return Ok(false);
        }

        if self.config.validate_fixes && !fix.position().is_valid() {
            warn!(
                "Rejected fix ({}, {}) at {}",
                fix.latitude, fix.longitude, fix.captured_at
            );
            return Err(GeoError::InvalidCoordinate {
                index: self.path.len() as u32,
                latitude: fix.latitude,
                longitude: fix.longitude,
            });
        }

        self.path.push(fix);
        Ok(true)
    }

    /// Length of the path recorded so far, in meters.
    pub fn distance(&self) -> Result<f64> {
        path_distance(&self.path)
    }

    /// Viewport centered on the latest fix, if any.
    pub fn current_region(&self) -> Option<Region> {
        self.path
            .last()
            .map(|fix| Region::around(fix.position(), FOLLOW_SPAN_DEGREES))
    }

    /// Stop recording and build the track payload.
    ///
    /// The path is moved into the returned track; the recorder stays in
    /// [`RecordingState::Finished`] and ignores further fixes. If the path
    /// distance cannot be computed the recorder keeps its state and path.
    pub fn finish(&mut self, now_ms: i64) -> Result<RecordedTrack> {
        const FINISH_FROM: &[RecordingState] =
            &[RecordingState::Recording, RecordingState::Paused];
        self.check_state("finish", FINISH_FROM)?;

        let distance = path_distance(&self.path)?;
        self.transition("finish", FINISH_FROM, RecordingState::Finished)?;
        let track = RecordedTrack {
            user_id: self.user_id.clone(),
            start_time: self.start_time.unwrap_or(now_ms),
            end_time: now_ms,
            distance,
            path: std::mem::take(&mut self.path),
        };

        info!(
            "Recording finished: {} fixes, {:.0}m over {}s",
            track.path.len(),
            track.distance,
            (track.end_time - track.start_time) / 1000
        );

        Ok(track)
    }

    fn check_state(&self, action: &'static str, allowed: &[RecordingState]) -> Result<()> {
        if !allowed.contains(&self.state) {
            return Err(GeoError::InvalidState {
                action,
                state: self.state,
            });
        }
        Ok(())
    }

    fn transition(
        &mut self,
        action: &'static str,
        allowed: &[RecordingState],
        to: RecordingState,
    ) -> Result<()> {
        self.check_state(action, allowed)?;
        self.state = to;
        Ok(())
    }
}

/// Path length of each track, in input order.
///
/// Runs across threads with the `parallel` feature.
pub fn track_distances(tracks: &[RecordedTrack]) -> Result<Vec<f64>> {
    #[cfg(feature = "parallel")]
    let distances = tracks
        .par_iter()
        .map(|t| path_distance(&t.path))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let distances = tracks.iter().map(|t| path_distance(&t.path)).collect();

    distances
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(lat: f64, lng: f64, t: i64) -> TimestampedFix {
        TimestampedFix::new(lat, lng, Some(35.0), t)
    }

    #[test]
    fn test_full_session() {
        let mut recorder = TrackRecorder::new("12345", RecorderConfig::default());
        assert_eq!(recorder.state(), RecordingState::Idle);

        recorder.start(1_000).unwrap();
        assert!(recorder.record(fix(48.8566, 2.3522, 1_000)).unwrap());
        assert!(recorder.record(fix(48.8566, 2.3532, 2_000)).unwrap());

        recorder.pause().unwrap();
        assert!(!recorder.record(fix(48.9, 2.4, 3_000)).unwrap());
        assert_eq!(recorder.path().len(), 2);

        recorder.resume().unwrap();
        assert!(recorder.record(fix(48.8566, 2.3542, 4_000)).unwrap());

        let running = recorder.distance().unwrap();
        let track = recorder.finish(61_000).unwrap();

        assert_eq!(recorder.state(), RecordingState::Finished);
        assert_eq!(track.user_id, "12345");
        assert_eq!(track.start_time, 1_000);
        assert_eq!(track.end_time, 61_000);
        assert_eq!(track.path.len(), 3);
        assert_eq!(track.distance, running);
        assert!((track.distance - 146.3).abs() < 1.5, "got {}", track.distance);
    }

    #[test]
    fn test_fixes_ignored_before_start_and_after_finish() {
        let mut recorder = TrackRecorder::new("u", RecorderConfig::default());
        assert!(!recorder.record(fix(1.0, 1.0, 0)).unwrap());

        recorder.start(0).unwrap();
        recorder.finish(10).unwrap();
        assert!(!recorder.record(fix(1.0, 1.0, 20)).unwrap());
    }

    #[test]
    fn test_start_time_kept_from_first_start() {
        let mut recorder = TrackRecorder::new("u", RecorderConfig::default());
        recorder.start(500).unwrap();
        recorder.pause().unwrap();
        recorder.resume().unwrap();
        assert_eq!(recorder.start_time(), Some(500));
    }

    #[test]
    fn test_invalid_transitions() {
        let mut recorder = TrackRecorder::new("u", RecorderConfig::default());
        assert!(matches!(
            recorder.pause(),
            Err(GeoError::InvalidState { action: "pause", state: RecordingState::Idle })
        ));
        assert!(recorder.finish(0).is_err());

        recorder.start(0).unwrap();
        assert!(recorder.start(1).is_err());
        assert!(recorder.resume().is_err());

        recorder.finish(2).unwrap();
        assert!(recorder.start(3).is_err());
        assert!(recorder.finish(4).is_err());
    }

    #[test]
    fn test_error_message_names_state() {
        let mut recorder = TrackRecorder::new("u", RecorderConfig::default());
        let err = recorder.resume().unwrap_err();
        assert_eq!(err.to_string(), "cannot resume while idle");
    }

    #[test]
    fn test_invalid_fix_rejected() {
        let mut recorder = TrackRecorder::new("u", RecorderConfig::default());
        recorder.start(0).unwrap();
        recorder.record(fix(1.0, 1.0, 0)).unwrap();

        let result = recorder.record(fix(f64::NAN, 1.0, 1));
        assert!(matches!(result, Err(GeoError::InvalidCoordinate { index: 1, .. })));
        assert_eq!(recorder.path().len(), 1);
    }

    #[test]
    fn test_unvalidated_bad_fix_does_not_strand_path() {
        let config = RecorderConfig {
            validate_fixes: false,
        };
        let mut recorder = TrackRecorder::new("u", config);
        recorder.start(0).unwrap();
        recorder.record(fix(1.0, 1.0, 0)).unwrap();
        assert!(recorder.record(fix(f64::NAN, 1.0, 1)).unwrap());

        let result = recorder.finish(10);
        assert!(matches!(result, Err(GeoError::InvalidCoordinate { index: 1, .. })));
        assert_eq!(recorder.state(), RecordingState::Recording);
        assert_eq!(recorder.path().len(), 2);

        // Retrying fails the same way without consuming the path
        recorder.pause().unwrap();
        assert!(recorder.finish(20).is_err());
        assert_eq!(recorder.state(), RecordingState::Paused);
        assert_eq!(recorder.path().len(), 2);
    }

    #[test]
    fn test_empty_session_distance_is_zero() {
        let mut recorder = TrackRecorder::new("u", RecorderConfig::default());
        recorder.start(0).unwrap();
        let track = recorder.finish(5_000).unwrap();
        assert_eq!(track.distance, 0.0);
        assert!(track.path.is_empty());
    }

    #[test]
    fn test_current_region_follows_last_fix() {
        let mut recorder = TrackRecorder::new("u", RecorderConfig::default());
        assert!(recorder.current_region().is_none());

        recorder.start(0).unwrap();
        recorder.record(fix(1.0, 1.0, 0)).unwrap();
        recorder.record(fix(2.0, 3.0, 1)).unwrap();

        let region = recorder.current_region().unwrap();
        assert_eq!(region.center_latitude, 2.0);
        assert_eq!(region.center_longitude, 3.0);
        assert_eq!(region.latitude_span, FOLLOW_SPAN_DEGREES);
    }

    #[test]
    fn test_track_distances_in_order() {
        let short = RecordedTrack {
            user_id: "u".into(),
            start_time: 0,
            end_time: 1,
            distance: 0.0,
            path: vec![fix(0.0, 0.0, 0), fix(0.0, 0.001, 1)],
        };
        let empty = RecordedTrack {
            path: vec![],
            ..short.clone()
        };
        let long = RecordedTrack {
            path: vec![fix(0.0, 0.0, 0), fix(0.0, 0.01, 1)],
            ..short.clone()
        };

        let distances = track_distances(&[short, empty, long]).unwrap();
        assert_eq!(distances.len(), 3);
        assert!(distances[0] > 100.0 && distances[0] < 120.0);
        assert_eq!(distances[1], 0.0);
        assert!(distances[2] > 1100.0 && distances[2] < 1120.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_recorded_track_json_shape() {
        let track = RecordedTrack {
            user_id: "12345".into(),
            start_time: 1,
            end_time: 2,
            distance: 3.5,
            path: vec![TimestampedFix::new(1.0, 2.0, None, 10)],
        };
        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(json["userId"], "12345");
        assert_eq!(json["startTime"], 1);
        assert_eq!(json["path"][0]["timestamp"], 10);
        assert!(json["path"][0]["altitude"].is_null());
    }
}
