//! Core coordination engine - lock, waiter registry, scrub loop, stats
//!
//! These modules form the seek coordination engine, independent of the
//! gesture/input layer.

pub mod lock;
pub mod registry;
pub mod scrub;
pub mod stats;

// Re-exports for convenience
pub use lock::{AsyncMutex, MutexToken};
pub use registry::{EventKind, Fired, WaitError, WaitHandle, WaitRegistry, WaiterId};
pub use scrub::{
    ScrubConfig, ScrubCoordinator, ScrubMode, SeekDiagnostics, SeekOutcome, SeekTimeout,
};
pub use stats::RunningStats;
