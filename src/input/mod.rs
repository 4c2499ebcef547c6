//! Touch gesture tracking.
//!
//! Turns raw touch samples into taps, pan deltas and a scroll-settle signal.
//! Image fetches are held back while a gesture is in flight and resume once
//! input has been quiet for [`SCROLL_SETTLE_DELAY_MS`].

pub mod debounce;

pub use debounce::{Debouncer, PendingCommit, COMMIT_DELAY_MS};

/// Delay (ms) after the last touch before scrolling counts as finished.
pub const SCROLL_SETTLE_DELAY_MS: f64 = 100.0;

/// Movement (px) beyond which a touch is a drag rather than a tap.
pub const TAP_SLOP: f32 = 8.0;

/// What a finished touch turned out to be.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Tap { x: f32, y: f32 },
    Drag,
}

#[derive(Debug, Default, Clone)]
pub struct GestureTracker {
    is_scrolling: bool,
    settle_at: Option<f64>,
    start: Option<(f32, f32)>,
    last: Option<(f32, f32)>,
    moved: bool,
    pinching: bool,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_scrolling(&self) -> bool {
        self.is_scrolling
    }

    pub fn touch_down(&mut self, x: f32, y: f32) {
        self.is_scrolling = true;
        self.settle_at = None;
        self.start = Some((x, y));
        self.last = Some((x, y));
        self.moved = false;
    }

    /// Screen delta since the previous sample.
    pub fn touch_move(&mut self, x: f32, y: f32) -> Option<(f32, f32)> {
        let (lx, ly) = self.last?;
        self.last = Some((x, y));
        if let Some((sx, sy)) = self.start {
            if (x - sx).hypot(y - sy) > TAP_SLOP {
                self.moved = true;
            }
        }
        Some((x - lx, y - ly))
    }

    /// End the touch and arm the settle timer.
    pub fn touch_up(&mut self, x: f32, y: f32, now_ms: f64) -> Gesture {
        let was_pinch = std::mem::take(&mut self.pinching);
        let tap = !self.moved && !was_pinch && self.start.is_some();
        self.start = None;
        self.last = None;
        self.settle_at = Some(now_ms + SCROLL_SETTLE_DELAY_MS);
        if tap {
            Gesture::Tap { x, y }
        } else {
            Gesture::Drag
        }
    }

    /// A pinch step; the touch can no longer become a tap.
    ///
    /// With no touch in progress (trackpad or wheel zoom) nothing will call
    /// `touch_up`, so the step arms the settle timer itself.
    pub fn pinch(&mut self, now_ms: f64) {
        self.is_scrolling = true;
        if self.start.is_some() {
            self.pinching = true;
            self.settle_at = None;
        } else {
            self.settle_at = Some(now_ms + SCROLL_SETTLE_DELAY_MS);
        }
    }

    /// Returns `true` exactly once when scrolling has settled.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        match self.settle_at {
            Some(due) if now_ms >= due => {
                self.settle_at = None;
                self.is_scrolling = false;
                true
            }
            _ => false,
        }
    }
}

/// Milliseconds from the host clock.
#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> f64 {
    if let Some(window) = web_sys::window() {
        if let Some(perf) = window.performance() {
            return perf.now();
        }
    }
    js_sys::Date::now()
}

/// Milliseconds since the Unix epoch.
#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64() * 1000.0)
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn short_touch_is_tap() {
        let mut g = GestureTracker::new();
        g.touch_down(10.0, 10.0);
        assert!(g.is_scrolling());
        g.touch_move(12.0, 11.0);
        assert_eq!(g.touch_up(12.0, 11.0, 0.0), Gesture::Tap { x: 12.0, y: 11.0 });
    }

    #[test]
    fn long_move_is_drag() {
        let mut g = GestureTracker::new();
        g.touch_down(0.0, 0.0);
        assert_eq!(g.touch_move(30.0, -5.0), Some((30.0, -5.0)));
        assert_eq!(g.touch_move(40.0, -5.0), Some((10.0, 0.0)));
        assert_eq!(g.touch_up(40.0, -5.0, 0.0), Gesture::Drag);
    }

    #[test]
    fn settles_after_quiet_period() {
        let mut g = GestureTracker::new();
        g.touch_down(0.0, 0.0);
        g.touch_up(0.0, 0.0, 1000.0);
        assert!(!g.tick(1050.0));
        assert!(g.is_scrolling());
        assert!(g.tick(1100.0));
        assert!(!g.is_scrolling());
        assert!(!g.tick(1200.0));
    }

    #[test]
    fn new_touch_cancels_settle() {
        let mut g = GestureTracker::new();
        g.touch_down(0.0, 0.0);
        g.touch_up(0.0, 0.0, 0.0);
        g.touch_down(0.0, 0.0);
        assert!(!g.tick(500.0));
        assert!(g.is_scrolling());
    }

    #[test]
    fn pinch_never_taps() {
        let mut g = GestureTracker::new();
        g.touch_down(0.0, 0.0);
        g.pinch(0.0);
        assert_eq!(g.touch_up(0.0, 0.0, 0.0), Gesture::Drag);
    }

    #[test]
    fn pinch_without_touch_settles() {
        let mut g = GestureTracker::new();
        g.pinch(0.0);
        assert!(g.is_scrolling());
        g.pinch(60.0);
        assert!(!g.tick(100.0));
        assert!(g.tick(160.0));
        assert!(!g.is_scrolling());
    }

    #[test]
    fn pinch_during_touch_waits_for_touch_up() {
        let mut g = GestureTracker::new();
        g.touch_down(0.0, 0.0);
        g.pinch(0.0);
        assert!(!g.tick(1_000.0));
        assert!(g.is_scrolling());
        g.touch_up(0.0, 0.0, 1_000.0);
        assert!(g.tick(1_100.0));
    }
}
