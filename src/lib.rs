//! JOGWHEEL - Pointer-driven media scrub coordination library
//!
//! Turns high-frequency pointer input over a rendered media surface into a
//! minimal, strictly serialized sequence of seeks against a slow, unreliable
//! media timeline. The displayed frame always converges on the most recent
//! requested position.

// Core engine (lock, registry, scrub loop, stats)
pub mod core;

// Collaborator boundaries and the gesture/input layer
pub mod clock;
pub mod gesture;
pub mod input;
pub mod media;
pub mod session;

#[cfg(test)]
pub(crate) mod testkit;

// Re-export commonly used types from core
pub use core::lock::{AsyncMutex, MutexToken};
pub use core::registry::{EventKind, Fired, WaitError, WaitHandle, WaitRegistry, WaiterId};
pub use core::scrub::{
    ScrubConfig, ScrubCoordinator, ScrubMode, SeekDiagnostics, SeekOutcome, SeekTimeout,
};
pub use core::stats::RunningStats;

// Re-export the boundary types hosts wire up
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use gesture::{EaseSequence, EaseStep, GesturePoint, GestureVector, SurfaceRect, ease_out};
pub use input::{
    ClassifierConfig, GestureAction, GestureClassifier, GestureError, GestureOutcome,
    PointerEvent, PointerPhase, PointerSource, ScrubSurface,
};
pub use media::{MediaTimeline, ReadyState, SeekSignal, SignalStamp, frame_count, frame_for_time};
pub use session::{
    PointerDisposition, ScrubSession, SessionConfig, SessionRegistry,
};
