//! Test collaborators shared across module tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::gesture::SurfaceRect;
use crate::input::ScrubSurface;
use crate::media::{MediaTimeline, ReadyState};

/// Opt-in log capture: `RUST_LOG=trace cargo test -- --nocapture`.
pub(crate) fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Scripted media timeline: records every seek request and moves the
/// playhead immediately unless marked stuck. Signal delivery stays with the
/// test, which pumps `Seeking`/`Seeked` through the coordinator by hand.
pub(crate) struct FakeMedia {
    duration_s: f64,
    time_s: Mutex<f64>,
    ready: Mutex<ReadyState>,
    history: Mutex<Vec<f64>>,
    unserviced: Mutex<VecDeque<f64>>,
    stuck: AtomicBool,
}

impl FakeMedia {
    pub fn new(duration_s: f64) -> Self {
        Self {
            duration_s,
            time_s: Mutex::new(0.0),
            ready: Mutex::new(ReadyState::EnoughData),
            history: Mutex::new(Vec::new()),
            unserviced: Mutex::new(VecDeque::new()),
            stuck: AtomicBool::new(false),
        }
    }

    /// All requested seek targets, oldest first.
    pub fn requests(&self) -> Vec<f64> {
        self.history.lock().expect("lock").clone()
    }

    /// Pop the oldest request a responder has not yet signalled.
    pub fn take_request(&self) -> Option<f64> {
        self.unserviced.lock().expect("lock").pop_front()
    }

    pub fn set_time(&self, time_s: f64) {
        *self.time_s.lock().expect("lock") = time_s;
    }

    pub fn set_ready(&self, state: ReadyState) {
        *self.ready.lock().expect("lock") = state;
    }

    /// A stuck timeline acknowledges requests without moving the playhead.
    pub fn set_stuck(&self, stuck: bool) {
        self.stuck.store(stuck, Ordering::SeqCst);
    }
}

impl MediaTimeline for FakeMedia {
    fn duration_s(&self) -> f64 {
        self.duration_s
    }

    fn current_time_s(&self) -> f64 {
        *self.time_s.lock().expect("lock")
    }

    fn request_seek(&self, time_s: f64) {
        self.history.lock().expect("lock").push(time_s);
        self.unserviced.lock().expect("lock").push_back(time_s);
        if !self.stuck.load(Ordering::SeqCst) {
            *self.time_s.lock().expect("lock") = time_s;
        }
    }

    fn ready_state(&self) -> ReadyState {
        *self.ready.lock().expect("lock")
    }
}

/// Surface with constant bounds.
pub(crate) struct FixedRect(pub SurfaceRect);

impl FixedRect {
    pub fn sized(width: f64, height: f64) -> Self {
        Self(SurfaceRect { left: 0.0, top: 0.0, width, height })
    }
}

impl ScrubSurface for FixedRect {
    fn bounds(&self) -> SurfaceRect {
        self.0
    }
}
