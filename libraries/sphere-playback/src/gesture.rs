//! Gesture disambiguation for the rendering surface
//!
//! One pointer drags the orbit camera, two pointers pinch the field of view,
//! never both for the same gesture. A second pointer only becomes a zoom
//! once the distance between the pointers has changed by more than the
//! activation threshold; until then input is swallowed, so an incidental
//! second touch neither zooms nor rotates.
//!
//! While a pinch is active the orbit controller is disabled. It comes back
//! after a settle delay once pinching ends, or from the periodic safety
//! check when the pinch looks stuck (a touch-end that never arrived).

use crate::config::TimingConfig;
use crate::timers::{TimerKind, TimerQueue};
use crate::types::FieldOfView;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Pointer lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// Raw pointer/touch input in surface pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerInput {
    pub id: u32,
    pub phase: PointerPhase,
    pub x: f64,
    pub y: f64,
}

impl PointerInput {
    pub fn new(id: u32, phase: PointerPhase, x: f64, y: f64) -> Self {
        Self { id, phase, x, y }
    }
}

/// What the session should do with a gesture
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureAction {
    /// Rotate the orbit camera by a drag delta
    Orbit { dx: f64, dy: f64 },

    /// Set a new field of view
    Zoom(FieldOfView),

    /// Short, still press: show the control overlay
    Tap,

    /// Enable or disable the orbit controller
    SetOrbitEnabled(bool),
}

/// Pinch bookkeeping; neutral when no pinch is in progress
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GestureState {
    pub is_pinching: bool,
    pub initial_distance: f64,
    pub initial_field_of_view: FieldOfView,
    pub has_crossed_activation_threshold: bool,
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    id: u32,
    origin: (f64, f64),
    last: (f64, f64),
    started_at: Duration,
    dragging: bool,
}

#[derive(Debug, Clone, Copy)]
struct GestureTiming {
    activation_px: f64,
    settle: Duration,
    safety_interval: Duration,
    tap_max_duration: Duration,
    tap_max_movement_px: f64,
}

/// Per-instance gesture state machine
#[derive(Debug, Clone)]
pub struct GestureController {
    timing: GestureTiming,
    pointers: Vec<(u32, (f64, f64))>,
    state: GestureState,
    drag: Option<Drag>,
    /// A multi-pointer gesture happened; ignore input until all pointers lift
    wait_for_release: bool,
    orbit_disabled: bool,
    last_input: Duration,
}

impl GestureController {
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            timing: GestureTiming {
                activation_px: timing.pinch_activation_px,
                settle: timing.gesture_settle,
                safety_interval: timing.gesture_safety_interval,
                tap_max_duration: timing.tap_max_duration,
                tap_max_movement_px: timing.tap_max_movement_px,
            },
            pointers: Vec::new(),
            state: GestureState::default(),
            drag: None,
            wait_for_release: false,
            orbit_disabled: false,
            last_input: Duration::ZERO,
        }
    }

    /// Classify one pointer event
    pub fn handle(
        &mut self,
        input: PointerInput,
        current_fov: FieldOfView,
        now: Duration,
        timers: &mut TimerQueue,
    ) -> Vec<GestureAction> {
        self.last_input = now;
        let mut actions = Vec::new();
        let position = (input.x, input.y);

        match input.phase {
            PointerPhase::Down => {
                self.set_pointer(input.id, position);
                match self.pointers.len() {
                    1 if !self.wait_for_release => {
                        self.drag = Some(Drag {
                            id: input.id,
                            origin: position,
                            last: position,
                            started_at: now,
                            dragging: false,
                        });
                    }
                    1 => {}
                    2 => self.begin_pinch(current_fov, now, timers, &mut actions),
                    _ => {
                        // Touch-count change: no longer a two-finger pinch
                        self.state = GestureState::default();
                    }
                }
            }
            PointerPhase::Move => {
                if !self.pointers.iter().any(|(id, _)| *id == input.id) {
                    return actions;
                }
                self.set_pointer(input.id, position);
                if self.state.is_pinching && self.pointers.len() == 2 {
                    if let Some(fov) = self.pinch_zoom() {
                        actions.push(GestureAction::Zoom(fov));
                    }
                } else if let Some(drag) = self.drag.as_mut().filter(|drag| drag.id == input.id) {
                    let moved = distance(drag.origin, position);
                    if !drag.dragging && moved > self.timing.tap_max_movement_px {
                        drag.dragging = true;
                        drag.last = drag.origin;
                    }
                    if drag.dragging {
                        actions.push(GestureAction::Orbit {
                            dx: position.0 - drag.last.0,
                            dy: position.1 - drag.last.1,
                        });
                        drag.last = position;
                    }
                }
            }
            PointerPhase::Up | PointerPhase::Cancel => {
                let before = self.pointers.len();
                self.pointers.retain(|(id, _)| *id != input.id);
                if self.pointers.len() == before {
                    return actions;
                }

                if let Some(drag) = self.drag.take() {
                    if drag.id == input.id {
                        let still = distance(drag.origin, position) <= self.timing.tap_max_movement_px;
                        let quick = now.saturating_sub(drag.started_at) <= self.timing.tap_max_duration;
                        if input.phase == PointerPhase::Up && !drag.dragging && still && quick {
                            actions.push(GestureAction::Tap);
                        }
                    } else {
                        self.drag = Some(drag);
                    }
                }

                if self.state.is_pinching && self.pointers.len() != 2 {
                    debug!(
                        zoomed = self.state.has_crossed_activation_threshold,
                        "Pinch ended"
                    );
                    self.state = GestureState::default();
                }
                if self.pointers.is_empty() {
                    self.wait_for_release = false;
                    if self.orbit_disabled {
                        timers.schedule(TimerKind::GestureSettle, now + self.timing.settle);
                    }
                }
            }
        }
        actions
    }

    /// React to a gesture timer
    pub fn on_timer(&mut self, kind: TimerKind, now: Duration, timers: &mut TimerQueue) -> Vec<GestureAction> {
        let mut actions = Vec::new();
        match kind {
            TimerKind::GestureSettle => {
                if self.orbit_disabled && !self.state.is_pinching && self.pointers.len() < 2 {
                    self.enable_orbit(timers, &mut actions);
                }
            }
            TimerKind::GestureSafety => {
                if !(self.state.is_pinching || self.orbit_disabled) {
                    return actions;
                }
                let stale = self.pointers.is_empty()
                    || now.saturating_sub(self.last_input) >= self.timing.safety_interval;
                if stale {
                    warn!("Pinch state stuck without active touches, restoring orbit");
                    self.reset();
                    timers.cancel(TimerKind::GestureSettle);
                    self.enable_orbit(timers, &mut actions);
                } else {
                    timers.schedule(TimerKind::GestureSafety, now + self.timing.safety_interval);
                }
            }
            _ => {}
        }
        actions
    }

    fn begin_pinch(
        &mut self,
        current_fov: FieldOfView,
        now: Duration,
        timers: &mut TimerQueue,
        actions: &mut Vec<GestureAction>,
    ) {
        let [(_, a), (_, b)] = [self.pointers[0], self.pointers[1]];
        self.state = GestureState {
            is_pinching: true,
            initial_distance: distance(a, b),
            initial_field_of_view: current_fov,
            has_crossed_activation_threshold: false,
        };
        self.drag = None;
        self.wait_for_release = true;
        timers.cancel(TimerKind::GestureSettle);
        if !self.orbit_disabled {
            self.orbit_disabled = true;
            actions.push(GestureAction::SetOrbitEnabled(false));
        }
        if !timers.is_scheduled(TimerKind::GestureSafety) {
            timers.schedule(TimerKind::GestureSafety, now + self.timing.safety_interval);
        }
        debug!(distance = self.state.initial_distance, "Pinch started");
    }

    fn pinch_zoom(&mut self) -> Option<FieldOfView> {
        let [(_, a), (_, b)] = [self.pointers[0], self.pointers[1]];
        let current = distance(a, b);
        if !self.state.has_crossed_activation_threshold {
            if (current - self.state.initial_distance).abs() <= self.timing.activation_px {
                return None;
            }
            self.state.has_crossed_activation_threshold = true;
        }
        if current <= 0.0 || self.state.initial_distance <= 0.0 {
            return None;
        }
        // Spreading the fingers narrows the view
        let scale = self.state.initial_distance / current;
        Some(FieldOfView::new(
            self.state.initial_field_of_view.degrees() * scale,
        ))
    }

    fn enable_orbit(&mut self, timers: &mut TimerQueue, actions: &mut Vec<GestureAction>) {
        self.orbit_disabled = false;
        timers.cancel(TimerKind::GestureSafety);
        actions.push(GestureAction::SetOrbitEnabled(true));
    }

    fn set_pointer(&mut self, id: u32, position: (f64, f64)) {
        if let Some(entry) = self.pointers.iter_mut().find(|(pointer, _)| *pointer == id) {
            entry.1 = position;
        } else {
            self.pointers.push((id, position));
        }
    }

    /// Forget every pointer and return to neutral
    pub fn reset(&mut self) {
        self.pointers.clear();
        self.state = GestureState::default();
        self.drag = None;
        self.wait_for_release = false;
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn active_pointers(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_orbit_disabled(&self) -> bool {
        self.orbit_disabled
    }
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (b.0 - a.0).hypot(b.1 - a.1)
}
