//! Media timeline boundary: what the coordinator needs from the thing that
//! actually holds the video.
//!
//! The crate never touches pixels or decoders; it talks to the host through
//! this trait and receives the seek lifecycle back as [`SeekSignal`]
//! dispatches. Signals are delivered asynchronously and not necessarily
//! exactly once per request.

use crate::core::registry::EventKind;

/// Readiness ladder of a media timeline, mirroring the usual
/// HAVE_NOTHING..HAVE_ENOUGH_DATA progression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    /// No metadata yet; position reads are meaningless.
    Nothing,
    Metadata,
    CurrentData,
    FutureData,
    EnoughData,
}

/// Seek lifecycle signals fired by the media collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeekSignal {
    /// The position change was acknowledged.
    Seeking,
    /// The position change completed.
    Seeked,
}

impl EventKind for SeekSignal {
    const ALL: &'static [Self] = &[SeekSignal::Seeking, SeekSignal::Seeked];

    fn name(&self) -> &'static str {
        match self {
            SeekSignal::Seeking => "seeking",
            SeekSignal::Seeked => "seeked",
        }
    }
}

/// Payload carried by a [`SeekSignal`]: when the collaborator stamped it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SignalStamp {
    pub timestamp_ms: f64,
}

impl SignalStamp {
    pub fn at(timestamp_ms: f64) -> Self {
        Self { timestamp_ms }
    }
}

/// The media element as seen by the coordinator. Implementations are
/// expected to be cheap to query; bounds and readiness are re-read per use.
pub trait MediaTimeline: Send + Sync {
    /// Total timeline length in seconds.
    fn duration_s(&self) -> f64;

    /// Current playhead position in seconds.
    fn current_time_s(&self) -> f64;

    /// Ask the timeline to move the playhead. Completion is observed via
    /// `Seeking`/`Seeked` signals, not via this call returning.
    fn request_seek(&self, time_s: f64);

    fn ready_state(&self) -> ReadyState;
}

/// Number of discrete frames on a timeline: `round(duration × rate)`.
pub fn frame_count(duration_s: f64, frame_rate: f64) -> u64 {
    let frames = (duration_s * frame_rate).round();
    if frames.is_finite() && frames > 0.0 {
        frames as u64
    } else {
        0
    }
}

/// Frame index for a time, clamped to `[0, frames - 1]`. Total for any
/// input, including negative times and times past the duration.
pub fn frame_for_time(time_s: f64, frame_rate: f64, frames: u64) -> u64 {
    if frames == 0 {
        return 0;
    }
    let raw = (time_s.max(0.0) * frame_rate).floor();
    let last = frames - 1;
    if raw.is_finite() && raw > 0.0 {
        (raw as u64).min(last)
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_count_rounds() {
        assert_eq!(frame_count(10.0, 24.0), 240);
        assert_eq!(frame_count(10.02, 24.0), 240);
        assert_eq!(frame_count(0.0, 24.0), 0);
        assert_eq!(frame_count(-5.0, 24.0), 0);
    }

    #[test]
    fn frame_index_is_clamped_to_timeline() {
        let frames = frame_count(10.0, 24.0);
        assert_eq!(frame_for_time(-3.0, 24.0, frames), 0);
        assert_eq!(frame_for_time(0.0, 24.0, frames), 0);
        assert_eq!(frame_for_time(1.0, 24.0, frames), 24);
        assert_eq!(frame_for_time(9.999, 24.0, frames), 239);
        assert_eq!(frame_for_time(10.0, 24.0, frames), 239);
        assert_eq!(frame_for_time(500.0, 24.0, frames), 239);
    }

    #[test]
    fn degenerate_timeline_pins_to_frame_zero() {
        assert_eq!(frame_for_time(3.0, 24.0, 0), 0);
        assert_eq!(frame_for_time(f64::NAN, 24.0, 240), 0);
    }

    #[test]
    fn ready_state_orders_by_readiness() {
        assert!(ReadyState::Nothing < ReadyState::Metadata);
        assert!(ReadyState::Metadata < ReadyState::EnoughData);
    }
}
