//! Pointer event model and the click/drag/flick classifier.
//!
//! The host feeds raw press/move/release/cancel events; the classifier
//! turns them into scrub interactions:
//! - a press opens a gesture and is a click until proven otherwise
//! - movement past the threshold chains the gesture into a drag (one-way)
//! - releasing a drag hands back a deceleration sequence
//! - a press inside the multi-press window is swallowed (double-tap guard)
//! - once touch is seen, duplicated mouse events are ignored
//!
//! Handlers return a `Result` instead of being wrapped in a blanket catch;
//! the session logs failures and keeps the gesture state consistent.

use log::trace;

use crate::gesture::{EaseSequence, GesturePoint, GestureVector, SurfaceRect};

/// Where a pointer event sits in the press/release cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerPhase {
    Press,
    Move,
    Release,
    /// Gesture aborted by the input system (e.g. touch cancelled).
    Cancel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerSource {
    Mouse,
    Touch,
}

/// One raw input event in viewport coordinates. For touch, the position is
/// the primary contact's.
#[derive(Clone, Copy, Debug)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub source: PointerSource,
    pub client_x: f64,
    pub client_y: f64,
    /// Primary button pressed (mouse) / primary contact involved (touch).
    pub primary: bool,
    pub timestamp_ms: f64,
}

/// The rendered surface a gesture is measured against. Bounds are re-read
/// for every sample so layout shifts mid-gesture are tolerated.
pub trait ScrubSurface: Send + Sync {
    fn bounds(&self) -> SurfaceRect;
}

#[derive(Debug, thiserror::Error)]
pub enum GestureError {
    #[error("surface reported degenerate bounds {width}x{height}")]
    DegenerateSurface { width: f64, height: f64 },
    #[error("pointer event carried non-finite coordinates ({x}, {y})")]
    NonFiniteCoordinates { x: f64, y: f64 },
}

/// What one classified pointer event asks the session to do.
#[derive(Clone, Debug)]
pub enum GestureAction {
    /// Nothing to act on (filtered or intermediate event).
    None,
    Click(GesturePoint),
    Drag { point: GesturePoint, diff: GesturePoint },
    /// A drag was released; run its deceleration sequence.
    BeginEase(EaseSequence),
}

#[derive(Clone, Debug)]
pub struct GestureOutcome {
    pub action: GestureAction,
    /// The host should suppress the platform's default handling of this
    /// event (native drag start, double-tap zoom).
    pub suppress_default: bool,
}

impl GestureOutcome {
    fn none() -> Self {
        Self { action: GestureAction::None, suppress_default: false }
    }

    fn suppressed() -> Self {
        Self { action: GestureAction::None, suppress_default: true }
    }
}

#[derive(Clone, Debug)]
pub struct ClassifierConfig {
    /// Pixel distance at which a click becomes a drag.
    pub move_threshold_px: f64,
    /// Presses within this window of the previous gesture's start are
    /// treated as duplicate taps and swallowed.
    pub multi_press_delay_ms: f64,
    /// Length of the post-release deceleration sequence.
    pub easing_duration_ms: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            move_threshold_px: 10.0,
            multi_press_delay_ms: 250.0,
            easing_duration_ms: 800.0,
        }
    }
}

/// Press/move/release state machine. One instance per scrub surface.
#[derive(Debug)]
pub struct GestureClassifier {
    config: ClassifierConfig,
    down: bool,
    /// Touch was seen; mouse events are duplicates from here on.
    ignore_mouse: bool,
    vector: Option<GestureVector>,
}

impl GestureClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            down: false,
            ignore_mouse: false,
            vector: None,
        }
    }

    /// Classify one pointer event against the surface's current bounds.
    pub fn handle(
        &mut self,
        surface: &dyn ScrubSurface,
        event: &PointerEvent,
    ) -> Result<GestureOutcome, GestureError> {
        match event.phase {
            PointerPhase::Press => self.on_press(surface, event),
            PointerPhase::Move => self.on_move(surface, event),
            PointerPhase::Release => self.on_release(event),
            PointerPhase::Cancel => {
                self.down = false;
                Ok(GestureOutcome::none())
            }
        }
    }

    /// The currently tracked gesture, if any.
    pub fn vector(&self) -> Option<&GestureVector> {
        self.vector.as_ref()
    }

    pub fn is_down(&self) -> bool {
        self.down
    }

    fn on_press(
        &mut self,
        surface: &dyn ScrubSurface,
        event: &PointerEvent,
    ) -> Result<GestureOutcome, GestureError> {
        if event.source == PointerSource::Mouse && (self.ignore_mouse || !event.primary) {
            return Ok(GestureOutcome::none());
        }
        if event.source == PointerSource::Touch {
            self.ignore_mouse = true;
        }

        if let Some(vector) = &self.vector
            && event.timestamp_ms < vector.started_at_ms + self.config.multi_press_delay_ms
        {
            trace!("press at {:.0}ms swallowed as duplicate tap", event.timestamp_ms);
            return Ok(GestureOutcome::suppressed());
        }

        let point = self.capture(surface, event)?;
        self.down = true;
        self.vector = Some(GestureVector::new(point, event.timestamp_ms));
        Ok(GestureOutcome {
            action: GestureAction::Click(point),
            // Keep the platform from starting a native drag.
            suppress_default: event.source == PointerSource::Mouse,
        })
    }

    fn on_move(
        &mut self,
        surface: &dyn ScrubSurface,
        event: &PointerEvent,
    ) -> Result<GestureOutcome, GestureError> {
        if event.source == PointerSource::Mouse && self.ignore_mouse {
            return Ok(GestureOutcome::none());
        }
        if !self.down {
            return Ok(GestureOutcome::none());
        }
        if event.source == PointerSource::Mouse && !event.primary {
            // Button was released outside the surface; catch up.
            trace!("primary button no longer held, closing gesture");
            self.down = false;
            return Ok(GestureOutcome::none());
        }
        let point = self.capture(surface, event)?;
        let Some(vector) = self.vector.as_mut() else {
            return Ok(GestureOutcome::none());
        };
        vector.set_target(point, event.timestamp_ms);
        if !vector.chained && vector.distance_px > self.config.move_threshold_px {
            // One-way transition for the rest of this gesture's lifetime.
            vector.chained = true;
            trace!("gesture chained after {:.1}px", vector.distance_px);
        }
        if vector.chained {
            Ok(GestureOutcome {
                action: GestureAction::Drag { point, diff: vector.diff },
                suppress_default: false,
            })
        } else {
            Ok(GestureOutcome::none())
        }
    }

    fn on_release(&mut self, event: &PointerEvent) -> Result<GestureOutcome, GestureError> {
        if event.source == PointerSource::Mouse && (self.ignore_mouse || !event.primary) {
            return Ok(GestureOutcome::none());
        }
        if !self.down {
            return Ok(GestureOutcome::none());
        }
        self.down = false;
        let Some(vector) = &self.vector else {
            return Ok(GestureOutcome::none());
        };
        if vector.chained {
            match EaseSequence::from_vector(vector, self.config.easing_duration_ms) {
                Some(seq) => Ok(GestureOutcome {
                    action: GestureAction::BeginEase(seq),
                    suppress_default: false,
                }),
                None => Ok(GestureOutcome::none()),
            }
        } else {
            Ok(GestureOutcome {
                action: GestureAction::Click(vector.start),
                suppress_default: false,
            })
        }
    }

    fn capture(
        &self,
        surface: &dyn ScrubSurface,
        event: &PointerEvent,
    ) -> Result<GesturePoint, GestureError> {
        if !event.client_x.is_finite() || !event.client_y.is_finite() {
            return Err(GestureError::NonFiniteCoordinates {
                x: event.client_x,
                y: event.client_y,
            });
        }
        let bounds = surface.bounds();
        if !(bounds.width > 0.0) || !(bounds.height > 0.0) {
            return Err(GestureError::DegenerateSurface {
                width: bounds.width,
                height: bounds.height,
            });
        }
        Ok(bounds.capture(event.client_x, event.client_y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSurface(SurfaceRect);

    impl ScrubSurface for FixedSurface {
        fn bounds(&self) -> SurfaceRect {
            self.0
        }
    }

    fn surface() -> FixedSurface {
        FixedSurface(SurfaceRect { left: 0.0, top: 0.0, width: 640.0, height: 360.0 })
    }

    fn ev(phase: PointerPhase, source: PointerSource, x: f64, ts: f64) -> PointerEvent {
        PointerEvent {
            phase,
            source,
            client_x: x,
            client_y: 180.0,
            primary: true,
            timestamp_ms: ts,
        }
    }

    fn mouse(phase: PointerPhase, x: f64, ts: f64) -> PointerEvent {
        ev(phase, PointerSource::Mouse, x, ts)
    }

    #[test]
    fn press_and_release_without_movement_is_a_click() {
        let mut c = GestureClassifier::new(ClassifierConfig::default());
        let s = surface();
        let press = c.handle(&s, &mouse(PointerPhase::Press, 320.0, 0.0)).expect("press");
        assert!(matches!(press.action, GestureAction::Click(p) if p.x == 0.5));
        assert!(press.suppress_default);

        let release = c.handle(&s, &mouse(PointerPhase::Release, 322.0, 400.0)).expect("release");
        assert!(matches!(release.action, GestureAction::Click(p) if p.x == 0.5));
        assert!(!c.is_down());
    }

    #[test]
    fn threshold_crossing_chains_exactly_once() {
        let mut c = GestureClassifier::new(ClassifierConfig::default());
        let s = surface();
        c.handle(&s, &mouse(PointerPhase::Press, 100.0, 0.0)).expect("press");

        // Under the 10px threshold: still a click, no drag reported.
        let small = c.handle(&s, &mouse(PointerPhase::Move, 105.0, 16.0)).expect("move");
        assert!(matches!(small.action, GestureAction::None));
        assert!(!c.vector().expect("vector").chained);

        let mut transitions = 0;
        let mut was_chained = false;
        for (x, ts) in [(140.0, 32.0), (180.0, 48.0), (220.0, 64.0)] {
            let out = c.handle(&s, &mouse(PointerPhase::Move, x, ts)).expect("move");
            assert!(matches!(out.action, GestureAction::Drag { .. }));
            let chained = c.vector().expect("vector").chained;
            if chained && !was_chained {
                transitions += 1;
                was_chained = true;
            }
            assert!(chained);
        }
        assert_eq!(transitions, 1);

        let release = c.handle(&s, &mouse(PointerPhase::Release, 220.0, 80.0)).expect("release");
        assert!(matches!(release.action, GestureAction::BeginEase(_)));
    }

    #[test]
    fn chained_drag_reports_per_move_deltas() {
        let mut c = GestureClassifier::new(ClassifierConfig::default());
        let s = surface();
        c.handle(&s, &mouse(PointerPhase::Press, 100.0, 0.0)).expect("press");
        c.handle(&s, &mouse(PointerPhase::Move, 150.0, 16.0)).expect("move");
        let out = c.handle(&s, &mouse(PointerPhase::Move, 170.0, 32.0)).expect("move");
        match out.action {
            GestureAction::Drag { diff, .. } => assert_eq!(diff.px, 20.0),
            other => panic!("expected drag, got {other:?}"),
        }
    }

    #[test]
    fn rapid_second_press_is_swallowed() {
        let mut c = GestureClassifier::new(ClassifierConfig::default());
        let s = surface();
        c.handle(&s, &mouse(PointerPhase::Press, 100.0, 0.0)).expect("press");
        c.handle(&s, &mouse(PointerPhase::Release, 100.0, 50.0)).expect("release");

        // 100ms after the first press: inside the 250ms window.
        let dup = c.handle(&s, &mouse(PointerPhase::Press, 200.0, 100.0)).expect("press");
        assert!(matches!(dup.action, GestureAction::None));
        assert!(dup.suppress_default);
        // The swallowed press did not replace the tracked gesture.
        assert_eq!(c.vector().expect("vector").started_at_ms, 0.0);

        // 300ms after: a fresh gesture.
        let fresh = c.handle(&s, &mouse(PointerPhase::Press, 200.0, 300.0)).expect("press");
        assert!(matches!(fresh.action, GestureAction::Click(_)));
        assert_eq!(c.vector().expect("vector").started_at_ms, 300.0);
    }

    #[test]
    fn touch_suppresses_later_mouse_events() {
        let mut c = GestureClassifier::new(ClassifierConfig::default());
        let s = surface();
        let touch = c
            .handle(&s, &ev(PointerPhase::Press, PointerSource::Touch, 100.0, 0.0))
            .expect("touch press");
        assert!(matches!(touch.action, GestureAction::Click(_)));
        // Touch presses are not default-suppressed unless duplicated.
        assert!(!touch.suppress_default);
        c.handle(&s, &ev(PointerPhase::Release, PointerSource::Touch, 100.0, 400.0))
            .expect("touch release");

        let shadow = c.handle(&s, &mouse(PointerPhase::Press, 100.0, 800.0)).expect("press");
        assert!(matches!(shadow.action, GestureAction::None));
    }

    #[test]
    fn non_primary_mouse_press_is_ignored() {
        let mut c = GestureClassifier::new(ClassifierConfig::default());
        let s = surface();
        let mut right = mouse(PointerPhase::Press, 100.0, 0.0);
        right.primary = false;
        let out = c.handle(&s, &right).expect("press");
        assert!(matches!(out.action, GestureAction::None));
        assert!(!c.is_down());
    }

    #[test]
    fn losing_the_button_mid_drag_closes_the_gesture() {
        let mut c = GestureClassifier::new(ClassifierConfig::default());
        let s = surface();
        c.handle(&s, &mouse(PointerPhase::Press, 100.0, 0.0)).expect("press");
        let mut hover = mouse(PointerPhase::Move, 300.0, 16.0);
        hover.primary = false;
        let out = c.handle(&s, &hover).expect("move");
        assert!(matches!(out.action, GestureAction::None));
        assert!(!c.is_down());
    }

    #[test]
    fn cancel_releases_the_press_state() {
        let mut c = GestureClassifier::new(ClassifierConfig::default());
        let s = surface();
        c.handle(&s, &ev(PointerPhase::Press, PointerSource::Touch, 100.0, 0.0)).expect("press");
        c.handle(&s, &ev(PointerPhase::Cancel, PointerSource::Touch, 100.0, 16.0)).expect("cancel");
        assert!(!c.is_down());
        let out = c
            .handle(&s, &ev(PointerPhase::Move, PointerSource::Touch, 300.0, 32.0))
            .expect("move");
        assert!(matches!(out.action, GestureAction::None));
    }

    #[test]
    fn degenerate_surface_is_reported_not_panicked() {
        let mut c = GestureClassifier::new(ClassifierConfig::default());
        let s = FixedSurface(SurfaceRect { left: 0.0, top: 0.0, width: 0.0, height: 360.0 });
        let err = c.handle(&s, &mouse(PointerPhase::Press, 100.0, 0.0)).expect_err("degenerate");
        assert!(matches!(err, GestureError::DegenerateSurface { .. }));
        assert!(!c.is_down());
    }

    #[test]
    fn non_finite_coordinates_are_reported() {
        let mut c = GestureClassifier::new(ClassifierConfig::default());
        let s = surface();
        let bad = mouse(PointerPhase::Press, f64::NAN, 0.0);
        let err = c.handle(&s, &bad).expect_err("nan position");
        assert!(matches!(err, GestureError::NonFiniteCoordinates { .. }));
    }
}
