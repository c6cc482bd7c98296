//! Drives frame production at a rate tied to the host's display refresh,
//! expressed as a plain, host-pollable value rather than an owned event
//! loop: the host's own display-link calls `on_vsync` and decides what to
//! do with the answer.

use std::time::{Duration, Instant};

const NORMAL_INTERVAL: Duration = Duration::from_micros(8_333); // ~120Hz
const THROTTLED_INTERVAL: Duration = Duration::from_micros(33_333); // ~30Hz
const THROTTLE_AFTER_DIRTY_FRAMES: u32 = 60;
const INPUT_LOW_LATENCY_INTERVAL: Duration = Duration::from_millis(8);
const INPUT_SAFETY_TIMEOUT: Duration = Duration::from_millis(50);

/// Adaptive frame-rate gate: answers "is a render due right now" given a
/// `needs_render` signal raised by damage/overlay-animation ticks upstream.
pub struct Scheduler {
    consecutive_dirty_frames: u32,
    last_frame: Instant,
    input_just_sent: bool,
    input_sent_at: Option<Instant>,
}

impl Scheduler {
    pub fn new(now: Instant) -> Self {
        Self { consecutive_dirty_frames: 0, last_frame: now, input_just_sent: false, input_sent_at: None }
    }

    /// Call once per host VSync tick. `dirty` is the caller's `needs_render`
    /// flag (damage since the last frame, or an overlay animation due).
    /// Returns whether the host should actually produce a frame now; when
    /// it returns `false` the caller should not clear its dirty flag.
    pub fn on_vsync(&mut self, now: Instant, dirty: bool) -> bool {
        if !dirty {
            self.consecutive_dirty_frames = 0;
            if self.input_just_sent {
                if self.input_sent_at.is_some_and(|t| now.duration_since(t) > INPUT_SAFETY_TIMEOUT) {
                    self.input_just_sent = false;
                    self.input_sent_at = None;
                }
            }
            return false;
        }

        let min_interval = if self.consecutive_dirty_frames > THROTTLE_AFTER_DIRTY_FRAMES {
            THROTTLED_INTERVAL
        } else if self.input_just_sent {
            INPUT_LOW_LATENCY_INTERVAL
        } else {
            NORMAL_INTERVAL
        };

        if now.duration_since(self.last_frame) < min_interval {
            return false;
        }

        self.consecutive_dirty_frames += 1;
        self.last_frame = now;
        self.input_just_sent = false;
        self.input_sent_at = None;
        true
    }

    /// Call when the host has just forwarded a keypress to a terminal:
    /// opens a short low-latency polling window to catch the PTY's echo
    /// as soon as it arrives, bounded by a safety timeout.
    pub fn notify_input_sent(&mut self, now: Instant) {
        self.input_just_sent = true;
        self.input_sent_at = Some(now);
        self.consecutive_dirty_frames = 0;
    }

    pub fn consecutive_dirty_frames(&self) -> u32 {
        self.consecutive_dirty_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_dirty_tick_after_construction_renders_immediately() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        assert!(sched.on_vsync(t0, true));
    }

    #[test]
    fn non_dirty_tick_never_renders_and_resets_counter() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        assert!(sched.on_vsync(t0, true));
        assert!(!sched.on_vsync(t0 + Duration::from_micros(9_000), false));
        assert_eq!(sched.consecutive_dirty_frames(), 0);
    }

    #[test]
    fn throttles_to_30hz_after_sustained_dirty_frames() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        let mut now = t0;
        let mut rendered = 0;
        for _ in 0..70 {
            now += Duration::from_micros(8_333);
            if sched.on_vsync(now, true) {
                rendered += 1;
            }
        }
        assert!(sched.consecutive_dirty_frames() > THROTTLE_AFTER_DIRTY_FRAMES);
        // at the throttled rate a tick spaced at the normal 8.333ms cadence
        // should not yet be due again immediately after crossing the threshold
        let just_after = now + Duration::from_micros(8_333);
        assert!(!sched.on_vsync(just_after, true));
        assert!(rendered > 0);
    }

    #[test]
    fn input_opens_a_low_latency_window() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        assert!(sched.on_vsync(t0, true));
        sched.notify_input_sent(t0 + Duration::from_millis(1));
        // a dirty tick 8ms later (faster than the normal 8.333ms gate) is
        // allowed because the low-latency window collapses the interval
        let soon = t0 + Duration::from_millis(9);
        assert!(sched.on_vsync(soon, true));
    }

    #[test]
    fn input_window_expires_after_safety_timeout_with_no_damage() {
        let t0 = Instant::now();
        let mut sched = Scheduler::new(t0);
        sched.notify_input_sent(t0);
        let after_timeout = t0 + Duration::from_millis(60);
        assert!(!sched.on_vsync(after_timeout, false));
        // window closed: a further non-dirty tick still reports not-due
        assert!(!sched.on_vsync(after_timeout + Duration::from_millis(1), false));
    }
}
