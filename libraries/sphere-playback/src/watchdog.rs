//! Resume watchdog
//!
//! Some platforms come back from the background with audio running but the
//! video frozen. After visibility returns the watchdog counts presented
//! frames for a short window; an element that claims to be playing and
//! readable while presenting nothing gets a hard reload.
//!
//! This is a heuristic. Without per-frame presentation callbacks nothing can
//! be observed and the element is declared healthy.

use crate::element::MediaElement;
use crate::timers::{TimerKind, TimerQueue};
use std::time::Duration;
use tracing::{debug, info};

/// Result of an observation window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogVerdict {
    /// Frames are advancing, or nothing could be observed
    Healthy,

    /// Playing and readable, but no frame was presented
    Stalled,

    /// The watchdog was not armed
    NotArmed,
}

#[derive(Debug, Clone, Copy)]
struct Observation {
    frame_callbacks: bool,
    frames: u32,
}

/// Frame-presentation watchdog for one decode element
#[derive(Debug, Clone)]
pub struct ResumeWatchdog {
    window: Duration,
    observation: Option<Observation>,
}

impl ResumeWatchdog {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            observation: None,
        }
    }

    /// Start an observation window; re-arming restarts the count
    pub fn arm(&mut self, element: &dyn MediaElement, now: Duration, timers: &mut TimerQueue) {
        let frame_callbacks = element.supports_frame_callbacks();
        debug!(frame_callbacks, "Arming resume watchdog");
        self.observation = Some(Observation {
            frame_callbacks,
            frames: 0,
        });
        timers.schedule(TimerKind::Watchdog, now + self.window);
    }

    /// Count one presented frame
    pub fn on_frame_presented(&mut self) {
        if let Some(observation) = &mut self.observation {
            observation.frames = observation.frames.saturating_add(1);
        }
    }

    /// Close the window and judge the element
    pub fn expire(&mut self, element: &dyn MediaElement) -> WatchdogVerdict {
        let Some(observation) = self.observation.take() else {
            return WatchdogVerdict::NotArmed;
        };
        if !observation.frame_callbacks {
            return WatchdogVerdict::Healthy;
        }

        let playing = !element.is_paused();
        let readable = element.ready_state().is_readable();
        if playing && readable && observation.frames == 0 {
            info!("Video frozen after resume, no frames presented");
            WatchdogVerdict::Stalled
        } else {
            debug!(frames = observation.frames, playing, readable, "Video healthy after resume");
            WatchdogVerdict::Healthy
        }
    }

    pub fn is_armed(&self) -> bool {
        self.observation.is_some()
    }

    /// Frames counted in the current window
    pub fn frames(&self) -> Option<u32> {
        self.observation.map(|observation| observation.frames)
    }

    pub fn disarm(&mut self, timers: &mut TimerQueue) {
        self.observation = None;
        timers.cancel(TimerKind::Watchdog);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{CanPlay, ReadyState};
    use std::cell::Cell;

    struct Element {
        paused: bool,
        ready: ReadyState,
        callbacks: bool,
        time: Cell<f64>,
    }

    impl MediaElement for Element {
        fn set_src(&self, _url: Option<&str>) {}
        fn load(&self) {}
        fn play(&self) {}
        fn pause(&self) {}
        fn is_paused(&self) -> bool {
            self.paused
        }
        fn current_time(&self) -> f64 {
            self.time.get()
        }
        fn set_current_time(&self, seconds: f64) {
            self.time.set(seconds);
        }
        fn ready_state(&self) -> ReadyState {
            self.ready
        }
        fn can_play_type(&self, _mime: &str) -> CanPlay {
            CanPlay::No
        }
        fn supports_frame_callbacks(&self) -> bool {
            self.callbacks
        }
    }

    fn element(paused: bool, callbacks: bool) -> Element {
        Element {
            paused,
            ready: ReadyState::HaveEnoughData,
            callbacks,
            time: Cell::new(0.0),
        }
    }

    #[test]
    fn frozen_video_is_stalled() {
        let element = element(false, true);
        let mut watchdog = ResumeWatchdog::new(Duration::from_millis(800));
        let mut timers = TimerQueue::new();

        watchdog.arm(&element, Duration::ZERO, &mut timers);
        assert_eq!(timers.deadline(TimerKind::Watchdog), Some(Duration::from_millis(800)));
        assert_eq!(watchdog.expire(&element), WatchdogVerdict::Stalled);
        assert!(!watchdog.is_armed());
    }

    #[test]
    fn presented_frames_are_healthy() {
        let element = element(false, true);
        let mut watchdog = ResumeWatchdog::new(Duration::from_millis(800));
        let mut timers = TimerQueue::new();

        watchdog.arm(&element, Duration::ZERO, &mut timers);
        watchdog.on_frame_presented();
        watchdog.on_frame_presented();
        assert_eq!(watchdog.frames(), Some(2));
        assert_eq!(watchdog.expire(&element), WatchdogVerdict::Healthy);
    }

    #[test]
    fn paused_or_unobservable_is_healthy() {
        let mut timers = TimerQueue::new();
        let mut watchdog = ResumeWatchdog::new(Duration::from_millis(800));

        let paused = element(true, true);
        watchdog.arm(&paused, Duration::ZERO, &mut timers);
        assert_eq!(watchdog.expire(&paused), WatchdogVerdict::Healthy);

        let blind = element(false, false);
        watchdog.arm(&blind, Duration::ZERO, &mut timers);
        assert_eq!(watchdog.expire(&blind), WatchdogVerdict::Healthy);

        assert_eq!(watchdog.expire(&blind), WatchdogVerdict::NotArmed);
    }
}
