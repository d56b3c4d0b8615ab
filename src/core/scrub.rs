//! Coalescing scrub coordinator.
//!
//! Pointer movement produces requests far faster than the media timeline
//! can seek. The coordinator merges bursts into a single pending target and
//! drives a drain loop that issues at most one low-level seek at a time;
//! the displayed frame converges on the most recent request with the
//! minimum number of seeks. Producers never block: while a drain loop is
//! running they only update the accumulator.
//!
//! Seek completion is observed through `Seeking`/`Seeked` signals the host
//! feeds back via [`ScrubCoordinator::signal`]; a missed signal aborts the
//! loop and the next gesture starts a fresh one.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, error, trace, warn};

use crate::clock::Clock;
use crate::core::lock::AsyncMutex;
use crate::core::registry::WaitRegistry;
use crate::core::stats::RunningStats;
use crate::media::{MediaTimeline, ReadyState, SeekSignal, SignalStamp, frame_count, frame_for_time};

/// How scrub requests address the timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrubMode {
    /// Requests carry a target position ratio in `[0, 1]`; merging
    /// overwrites.
    Absolute,
    /// Requests carry a signed position delta as a fraction of the
    /// duration; merging sums.
    Relative,
}

#[derive(Clone, Debug)]
pub struct ScrubConfig {
    pub mode: ScrubMode,
    /// Per-signal wait budget for one seek.
    pub seek_timeout: Duration,
    /// Sample window for seek-duration diagnostics.
    pub stats_window: usize,
    /// Horizontal drag-to-delta scale used by relative sessions.
    pub sensitivity: f64,
}

impl Default for ScrubConfig {
    fn default() -> Self {
        Self {
            mode: ScrubMode::Absolute,
            seek_timeout: Duration::from_millis(2000),
            stats_window: 25,
            sensitivity: 0.5,
        }
    }
}

/// What one completed seek observed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeekOutcome {
    /// Frame index after the seek settled.
    pub frame: u64,
    /// Signal-stamped seek duration; 0 for a skipped same-frame seek.
    pub seek_ms: f64,
}

/// A seek lifecycle signal was not observed within the budget. Aborts the
/// drain loop; the next gesture recovers.
#[derive(Debug, thiserror::Error)]
#[error("seek missed {waiting:?} within {timeout:?} at frame {frame}")]
pub struct SeekTimeout {
    /// Frame observed when the wait gave up.
    pub frame: u64,
    pub waiting: SeekSignal,
    pub timeout: Duration,
}

/// Snapshot of seek timing over the stats window.
#[derive(Clone, Copy, Debug)]
pub struct SeekDiagnostics {
    pub frame: u64,
    pub last_ms: Option<f64>,
    pub average_ms: Option<f64>,
    pub min_ms: Option<f64>,
    pub max_ms: Option<f64>,
    pub samples: usize,
    pub jitter_ms: f64,
}

impl fmt::Display for SeekDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame: {} / SeekTime: {:.2}ms (Avg: {:.2} Min: {:.2} Max: {:.2})",
            self.frame,
            self.last_ms.unwrap_or(0.0),
            self.average_ms.unwrap_or(0.0),
            self.min_ms.unwrap_or(0.0),
            self.max_ms.unwrap_or(0.0),
        )
    }
}

// Written only under cooperative turns; a std mutex keeps the merge-and-gate
// step atomic.
#[derive(Debug)]
struct LoopState {
    pending: Option<f64>,
    busy: bool,
}

/// Converts merged scrub requests into serialized seeks against one media
/// timeline.
pub struct ScrubCoordinator {
    media: Arc<dyn MediaTimeline>,
    config: ScrubConfig,
    frame_rate: f64,
    state: Mutex<LoopState>,
    seek_lock: AsyncMutex,
    registry: WaitRegistry<SeekSignal, SignalStamp>,
    stats: Mutex<RunningStats>,
}

impl ScrubCoordinator {
    pub fn new(
        media: Arc<dyn MediaTimeline>,
        clock: Arc<dyn Clock>,
        frame_rate: f64,
        config: ScrubConfig,
    ) -> Self {
        let stats = RunningStats::new(config.stats_window);
        Self {
            media,
            config,
            frame_rate,
            state: Mutex::new(LoopState { pending: None, busy: false }),
            seek_lock: AsyncMutex::new(),
            registry: WaitRegistry::new(clock),
            stats: Mutex::new(stats),
        }
    }

    pub fn config(&self) -> &ScrubConfig {
        &self.config
    }

    /// Playhead position, or 0 before the timeline has metadata.
    pub fn current_time_s(&self) -> f64 {
        if self.media.ready_state() > ReadyState::Nothing {
            self.media.current_time_s()
        } else {
            0.0
        }
    }

    /// Frame count of the timeline as currently reported.
    pub fn frames(&self) -> u64 {
        frame_count(self.media.duration_s(), self.frame_rate)
    }

    /// Frame under the playhead, clamped to the timeline.
    pub fn current_frame(&self) -> u64 {
        frame_for_time(self.current_time_s(), self.frame_rate, self.frames())
    }

    /// Deliver a seek lifecycle signal from the media collaborator.
    /// Duplicate or spurious signals are tolerated.
    pub async fn signal(&self, kind: SeekSignal, stamp: SignalStamp) {
        self.registry.dispatch(kind, stamp).await;
    }

    /// Merge a scrub request and drain the accumulator. While a drain loop
    /// is already running the call only merges and returns; the running
    /// loop picks the value up on its next iteration.
    pub async fn scrub_to(&self, value: f64) -> Result<(), SeekTimeout> {
        {
            let mut state = self.state.lock().expect("lock");
            state.pending = Some(match self.config.mode {
                ScrubMode::Absolute => value,
                ScrubMode::Relative => state.pending.unwrap_or(0.0) + value,
            });
            if state.busy {
                trace!("scrub_to({value}): merged into running loop");
                return Ok(());
            }
            state.busy = true;
        }

        let result = self.drain().await;
        self.state.lock().expect("lock").busy = false;
        result
    }

    async fn drain(&self) -> Result<(), SeekTimeout> {
        loop {
            let Some(value) = self.state.lock().expect("lock").pending.take() else {
                return Ok(());
            };
            let duration_s = self.media.duration_s();
            let frames = frame_count(duration_s, self.frame_rate);
            let before = self.current_frame();

            let raw_s = match self.config.mode {
                ScrubMode::Absolute => value * duration_s,
                ScrubMode::Relative => self.current_time_s() + value * duration_s,
            };
            let target_s = if raw_s.is_finite() {
                raw_s.clamp(0.0, duration_s.max(0.0))
            } else {
                0.0
            };
            if target_s != raw_s {
                // Hit a timeline edge; further movement in that direction
                // is discarded rather than banked.
                self.state.lock().expect("lock").pending = None;
            }

            let target = frame_for_time(target_s, self.frame_rate, frames);
            if target == before {
                trace!("drain: already at frame {before}");
                return Ok(());
            }

            if let Err(err) = self.seek(target_s, false).await {
                let pending = self.state.lock().expect("lock").pending;
                error!("drain aborted: {err} (accumulator {pending:?})");
                return Err(err);
            }

            let after = self.current_frame();
            let repopulated = self.state.lock().expect("lock").pending.is_some();
            if after == before && repopulated {
                // The target was unreachable and requests keep arriving;
                // bail out instead of spinning against the same position.
                // Relative mode banks the consumed delta back so the next
                // gesture retries from the full un-applied movement.
                warn!("frame {before} did not move; ending loop with requests pending");
                if self.config.mode == ScrubMode::Relative {
                    let mut state = self.state.lock().expect("lock");
                    state.pending = Some(state.pending.unwrap_or(0.0) + value);
                }
                return Ok(());
            }
            if !repopulated {
                return Ok(());
            }
        }
    }

    /// One serialized low-level seek. `force` issues the request even when
    /// the playhead is already on the target frame (used for the initial
    /// seek-to-start, which also primes the media element's seek pipeline).
    pub async fn seek(&self, time_s: f64, force: bool) -> Result<SeekOutcome, SeekTimeout> {
        let token = self.seek_lock.acquire().await;

        let frames = self.frames();
        let target = frame_for_time(time_s, self.frame_rate, frames);
        if !force && target == self.current_frame() {
            token.release();
            return Ok(SeekOutcome { frame: target, seek_ms: 0.0 });
        }

        // Both waits are registered before the request so a signal fired
        // synchronously by the media element cannot be missed.
        let seeking_wait = self
            .registry
            .begin_wait(SeekSignal::Seeking, self.config.seek_timeout, None, Some("seek"))
            .await;
        let seeked_wait = self
            .registry
            .begin_wait(SeekSignal::Seeked, self.config.seek_timeout, None, Some("seek"))
            .await;

        self.media.request_seek(time_s);
        trace!("seek: frame {target} ({time_s:.3}s) requested");

        let seeking = match seeking_wait.outcome().await {
            Ok(fired) => fired,
            Err(err) => {
                debug!("seek: {err}");
                seeked_wait.cancel().await;
                token.release();
                return Err(self.timeout_error(SeekSignal::Seeking));
            }
        };
        let seeked = match seeked_wait.outcome().await {
            Ok(fired) => fired,
            Err(err) => {
                debug!("seek: {err}");
                token.release();
                return Err(self.timeout_error(SeekSignal::Seeked));
            }
        };

        let seek_ms = seeked.event.timestamp_ms - seeking.event.timestamp_ms;
        if seek_ms > 0.0 {
            self.stats.lock().expect("lock").push(seek_ms);
        }
        token.release();

        let frame = self.current_frame();
        trace!("seek: settled on frame {frame} in {seek_ms:.2}ms");
        Ok(SeekOutcome { frame, seek_ms })
    }

    fn timeout_error(&self, waiting: SeekSignal) -> SeekTimeout {
        SeekTimeout {
            frame: self.current_frame(),
            waiting,
            timeout: self.config.seek_timeout,
        }
    }

    pub fn diagnostics(&self) -> SeekDiagnostics {
        let stats = self.stats.lock().expect("lock");
        SeekDiagnostics {
            frame: self.current_frame(),
            last_ms: stats.last(),
            average_ms: stats.average(),
            min_ms: stats.min(),
            max_ms: stats.max(),
            samples: stats.count(),
            jitter_ms: stats.jitter(),
        }
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> Option<f64> {
        self.state.lock().expect("lock").pending
    }

    #[cfg(test)]
    pub(crate) fn is_busy(&self) -> bool {
        self.state.lock().expect("lock").busy
    }
}

impl fmt::Debug for ScrubCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().expect("lock");
        f.debug_struct("ScrubCoordinator")
            .field("mode", &self.config.mode)
            .field("frame_rate", &self.frame_rate)
            .field("busy", &state.busy)
            .field("pending", &state.pending)
            .finish()
    }
}
