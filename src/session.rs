//! One scrub surface wired to one media timeline.
//!
//! `ScrubSession` owns the gesture classifier, the coordinator, and the
//! pending deceleration sequence, and is constructed explicitly from its
//! collaborators. The host forwards pointer events and media lifecycle
//! signals in, drives `tick()` from its animation loop, and reads back
//! whether the platform default for an event should be suppressed.

use std::sync::{Arc, Mutex};

use log::{debug, info, warn};

use crate::clock::Clock;
use crate::core::scrub::{
    ScrubConfig, ScrubCoordinator, ScrubMode, SeekDiagnostics, SeekOutcome, SeekTimeout,
};
use crate::gesture::{EaseSequence, GesturePoint};
use crate::input::{
    ClassifierConfig, GestureAction, GestureClassifier, PointerEvent, PointerPhase, ScrubSurface,
};
use crate::media::{MediaTimeline, SeekSignal, SignalStamp};

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub scrub: ScrubConfig,
    pub classifier: ClassifierConfig,
    pub frame_rate: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scrub: ScrubConfig::default(),
            classifier: ClassifierConfig::default(),
            frame_rate: 24.0,
        }
    }
}

/// What the host should do with the platform default for a pointer event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerDisposition {
    Passthrough,
    SuppressDefault,
}

/// A scrub surface bound to a media timeline.
pub struct ScrubSession {
    coordinator: ScrubCoordinator,
    surface: Arc<dyn ScrubSurface>,
    clock: Arc<dyn Clock>,
    classifier: Mutex<GestureClassifier>,
    ease: Mutex<Option<EaseSequence>>,
}

impl ScrubSession {
    pub fn new(
        media: Arc<dyn MediaTimeline>,
        surface: Arc<dyn ScrubSurface>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        let coordinator =
            ScrubCoordinator::new(media, Arc::clone(&clock), config.frame_rate, config.scrub);
        Self {
            coordinator,
            surface,
            clock,
            classifier: Mutex::new(GestureClassifier::new(config.classifier)),
            ease: Mutex::new(None),
        }
    }

    /// Feed one pointer event through the classifier and apply the result.
    /// Classifier errors are logged and the event passes through untouched.
    pub async fn handle_pointer(&self, event: &PointerEvent) -> PointerDisposition {
        let outcome = {
            let mut classifier = self.classifier.lock().expect("lock");
            match classifier.handle(self.surface.as_ref(), event) {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!("pointer event dropped: {err}");
                    return PointerDisposition::Passthrough;
                }
            }
        };

        // A press that opens a gesture abandons any running deceleration.
        if event.phase == PointerPhase::Press
            && matches!(outcome.action, GestureAction::Click(_))
            && self.ease.lock().expect("lock").take().is_some()
        {
            debug!("new gesture cancels pending ease sequence");
        }

        match outcome.action {
            GestureAction::None => {}
            GestureAction::Click(point) => self.apply_click(point).await,
            GestureAction::Drag { point, diff } => self.apply_drag(point, diff).await,
            GestureAction::BeginEase(seq) => {
                *self.ease.lock().expect("lock") = Some(seq);
            }
        }

        if outcome.suppress_default {
            PointerDisposition::SuppressDefault
        } else {
            PointerDisposition::Passthrough
        }
    }

    /// Advance a pending deceleration sequence by one animation tick.
    /// Returns whether a sequence is still running afterwards.
    pub async fn tick(&self) -> bool {
        let step = {
            let mut ease = self.ease.lock().expect("lock");
            let Some(seq) = ease.as_mut() else {
                return false;
            };
            let step = seq.step(self.clock.now_ms());
            if seq.finished() {
                *ease = None;
            }
            step
        };
        if let Some(step) = step {
            self.apply_drag(step.point, step.diff).await;
        }
        self.ease.lock().expect("lock").is_some()
    }

    /// Forward a seek lifecycle signal from the media element.
    pub async fn signal(&self, kind: SeekSignal, stamp: SignalStamp) {
        self.coordinator.signal(kind, stamp).await;
    }

    /// Forced seek to frame zero; primes the media element's seek pipeline
    /// on session start.
    pub async fn seek_to_start(&self) -> Result<SeekOutcome, SeekTimeout> {
        info!("seeking to start");
        self.coordinator.seek(0.0, true).await
    }

    pub fn diagnostics(&self) -> SeekDiagnostics {
        self.coordinator.diagnostics()
    }

    pub fn current_frame(&self) -> u64 {
        self.coordinator.current_frame()
    }

    pub fn ease_pending(&self) -> bool {
        self.ease.lock().expect("lock").is_some()
    }

    async fn apply_click(&self, point: GesturePoint) {
        match self.coordinator.config().mode {
            // A click jumps straight to the pointed-at position.
            ScrubMode::Absolute => self.scrub(point.x).await,
            // Relative surfaces have no position to jump to.
            ScrubMode::Relative => {}
        }
    }

    async fn apply_drag(&self, point: GesturePoint, diff: GesturePoint) {
        let config = self.coordinator.config();
        match config.mode {
            ScrubMode::Absolute => self.scrub(point.x).await,
            ScrubMode::Relative => self.scrub(diff.x * config.sensitivity).await,
        }
    }

    async fn scrub(&self, value: f64) {
        // A timed-out seek is already logged by the drain loop; the session
        // just waits for the next interaction.
        let _ = self.coordinator.scrub_to(value).await;
    }
}

impl std::fmt::Debug for ScrubSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrubSession")
            .field("coordinator", &self.coordinator)
            .field("ease_pending", &self.ease_pending())
            .finish()
    }
}

/// Host-owned collection of live sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Vec<Arc<ScrubSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, session: Arc<ScrubSession>) {
        self.sessions.push(session);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ScrubSession>> {
        self.sessions.iter()
    }
}
