//! Per-gesture pointer tracking and the post-release deceleration sequence.
//!
//! A [`GestureVector`] captures where a gesture started and where it is now,
//! in both normalized surface coordinates and raw pixels. Once a gesture is
//! chained (reclassified from click to drag), the start point re-bases to
//! the previous sample so `diff` is the per-move delta rather than the
//! total displacement.

/// A pointer sample relative to the scrub surface: normalized [0,1]² plus
/// raw pixel offsets from the surface origin.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GesturePoint {
    pub x: f64,
    pub y: f64,
    pub px: f64,
    pub py: f64,
}

impl GesturePoint {
    /// Component-wise difference in both coordinate spaces.
    pub fn diff(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            px: self.px - other.px,
            py: self.py - other.py,
        }
    }

    /// Component-wise sum in both coordinate spaces.
    pub fn sum(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            px: self.px + other.px,
            py: self.py + other.py,
        }
    }

    /// Euclidean length of the pixel-space offset.
    pub fn pixel_distance(self) -> f64 {
        self.px.hypot(self.py)
    }
}

/// Surface bounding box in viewport coordinates, measured at event time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl SurfaceRect {
    /// Project a viewport position into surface space. Caller guarantees a
    /// non-degenerate rect; see `GestureClassifier` for the checked path.
    pub fn capture(&self, client_x: f64, client_y: f64) -> GesturePoint {
        let px = client_x - self.left;
        let py = client_y - self.top;
        GesturePoint {
            x: px / self.width,
            y: py / self.height,
            px,
            py,
        }
    }
}

/// One gesture's lifetime of pointer samples: press point, latest point,
/// per-move delta, and the click/drag classification flag.
#[derive(Clone, Debug)]
pub struct GestureVector {
    pub start: GesturePoint,
    pub end: Option<GesturePoint>,
    pub diff: GesturePoint,
    pub distance_px: f64,
    /// Timestamp of the press that opened this gesture.
    pub started_at_ms: f64,
    /// Timestamp of the most recent sample.
    pub last_sample_ms: f64,
    /// Click → drag reclassification; transitions false → true exactly once.
    pub chained: bool,
}

impl GestureVector {
    pub fn new(start: GesturePoint, timestamp_ms: f64) -> Self {
        Self {
            start,
            end: None,
            diff: GesturePoint::default(),
            distance_px: 0.0,
            started_at_ms: timestamp_ms,
            last_sample_ms: timestamp_ms,
            chained: false,
        }
    }

    /// Record a new sample. While unchained, `diff` accumulates from the
    /// press point; once chained, the reference re-bases to the previous
    /// sample so `diff` is the movement since the last call.
    pub fn set_target(&mut self, point: GesturePoint, timestamp_ms: f64) {
        if self.chained && let Some(end) = self.end {
            self.start = end;
        }
        self.end = Some(point);
        self.diff = point.diff(self.start);
        self.distance_px = self.diff.pixel_distance();
        self.last_sample_ms = timestamp_ms;
    }
}

/// Quartic ease-out over `[0, duration]`: starts at `b`, changes by `c`,
/// flat at the end.
pub fn ease_out(t: f64, b: f64, c: f64, d: f64) -> f64 {
    let t = t / d - 1.0;
    -c * (t * t * t * t - 1.0) + b
}

/// One tick of a deceleration sequence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EaseStep {
    /// Extrapolated pointer position for this tick.
    pub point: GesturePoint,
    /// Decaying movement delta for this tick.
    pub diff: GesturePoint,
    /// End-of-sequence marker; set on exactly the final step.
    pub last: bool,
}

/// Post-release deceleration of a drag: the final move delta decays to zero
/// over a fixed duration. Pull-driven: the host calls [`step`](Self::step)
/// once per animation tick.
#[derive(Clone, Debug)]
pub struct EaseSequence {
    origin: GesturePoint,
    diff_start: GesturePoint,
    start_ms: f64,
    duration_ms: f64,
    finished: bool,
}

impl EaseSequence {
    /// Build from a released drag gesture. Returns `None` when the gesture
    /// never produced a move sample.
    pub fn from_vector(vector: &GestureVector, duration_ms: f64) -> Option<Self> {
        let origin = vector.end?;
        Some(Self {
            origin,
            diff_start: vector.diff,
            start_ms: vector.last_sample_ms,
            duration_ms,
            finished: false,
        })
    }

    /// Advance to `now_ms`. Returns the decayed delta and extrapolated
    /// point; the final step clamps time to the duration and carries the
    /// end marker. Returns `None` once finished.
    pub fn step(&mut self, now_ms: f64) -> Option<EaseStep> {
        if self.finished {
            return None;
        }
        let elapsed = (now_ms - self.start_ms).max(0.0);
        let last = elapsed >= self.duration_ms;
        let t = if last { self.duration_ms } else { elapsed };

        let b = self.diff_start;
        let diff = GesturePoint {
            x: ease_out(t, b.x, -b.x, self.duration_ms),
            y: ease_out(t, b.y, -b.y, self.duration_ms),
            px: ease_out(t, b.px, -b.px, self.duration_ms),
            py: ease_out(t, b.py, -b.py, self.duration_ms),
        };
        let point = self.origin.sum(diff);

        if last {
            self.finished = true;
        }
        Some(EaseStep { point, diff, last })
    }

    pub fn finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64, px: f64, py: f64) -> GesturePoint {
        GesturePoint { x, y, px, py }
    }

    #[test]
    fn capture_normalizes_against_bounds() {
        let rect = SurfaceRect { left: 100.0, top: 50.0, width: 200.0, height: 100.0 };
        let p = rect.capture(150.0, 100.0);
        assert_eq!(p.px, 50.0);
        assert_eq!(p.py, 50.0);
        assert_eq!(p.x, 0.25);
        assert_eq!(p.y, 0.5);
    }

    #[test]
    fn unchained_diff_accumulates_from_press_point() {
        let mut v = GestureVector::new(pt(0.1, 0.5, 20.0, 50.0), 0.0);
        v.set_target(pt(0.2, 0.5, 40.0, 50.0), 16.0);
        v.set_target(pt(0.3, 0.5, 60.0, 50.0), 32.0);
        assert_eq!(v.diff.px, 40.0);
        assert_eq!(v.distance_px, 40.0);
    }

    #[test]
    fn chained_diff_rebases_to_previous_sample() {
        let mut v = GestureVector::new(pt(0.1, 0.5, 20.0, 50.0), 0.0);
        v.set_target(pt(0.2, 0.5, 40.0, 50.0), 16.0);
        v.chained = true;
        v.set_target(pt(0.35, 0.5, 70.0, 50.0), 32.0);
        // Delta since the last sample, not since the press.
        assert_eq!(v.diff.px, 30.0);
        assert_eq!(v.start.px, 40.0);
    }

    #[test]
    fn ease_out_spans_full_change() {
        // At t=0 the value is b; at t=d it has moved by exactly c.
        assert_eq!(ease_out(0.0, 10.0, -10.0, 800.0), 10.0);
        assert_eq!(ease_out(800.0, 10.0, -10.0, 800.0), 0.0);
        // Decay is monotonic for this curve.
        let early = ease_out(100.0, 10.0, -10.0, 800.0);
        let late = ease_out(700.0, 10.0, -10.0, 800.0);
        assert!(early > late);
        assert!(late > 0.0);
    }

    #[test]
    fn sequence_decays_to_zero_and_marks_the_last_step() {
        let mut v = GestureVector::new(pt(0.0, 0.0, 0.0, 0.0), 0.0);
        v.chained = true;
        v.set_target(pt(0.1, 0.0, 10.0, 0.0), 100.0);
        let mut seq = EaseSequence::from_vector(&v, 800.0).expect("has end point");

        let first = seq.step(100.0).expect("first step");
        assert!(!first.last);
        assert_eq!(first.diff.px, 10.0);

        let mid = seq.step(500.0).expect("mid step");
        assert!(!mid.last);
        assert!(mid.diff.px < first.diff.px);

        // Past the duration: final step clamps to the curve end.
        let last = seq.step(950.0).expect("final step");
        assert!(last.last);
        assert_eq!(last.diff.px, 0.0);
        assert_eq!(last.point.px, v.end.expect("end").px);

        assert!(seq.finished());
        assert_eq!(seq.step(1000.0), None);
    }

    #[test]
    fn sequence_requires_a_move_sample() {
        let v = GestureVector::new(pt(0.0, 0.0, 0.0, 0.0), 0.0);
        assert!(EaseSequence::from_vector(&v, 800.0).is_none());
    }
}
