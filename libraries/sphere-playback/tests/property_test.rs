//! Property-based tests for the playback engine
//!
//! Uses proptest to check the quantified guarantees across many inputs.

use proptest::prelude::*;
use sphere_playback::angle::{angular_distance, continued_yaw_radians};
use sphere_playback::{
    ControlHandle, Coordinator, FieldOfView, GestureAction, GestureController, InstanceId,
    OrientOutcome, PointerInput, PointerPhase, SceneBackend, Size, SphericalRenderer,
    SwitchDirection, TimerKind, TimerQueue, TimingConfig, ViewAngles,
};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

// ===== Helpers =====

#[derive(Default)]
struct CountingHandle {
    pauses: Cell<u32>,
    hides: Cell<u32>,
    shows: Cell<u32>,
}

impl ControlHandle for CountingHandle {
    fn pause(&self) {
        self.pauses.set(self.pauses.get() + 1);
    }

    fn play(&self) {}

    fn show_controls(&self) {
        self.shows.set(self.shows.get() + 1);
    }

    fn hide_controls(&self) {
        self.hides.set(self.hides.get() + 1);
    }

    fn restore_controls(&self) {}
}

fn registered(count: usize) -> (Coordinator, Vec<(InstanceId, Rc<CountingHandle>)>) {
    let coordinator = Coordinator::new();
    let handles: Vec<_> = (0..count)
        .map(|i| {
            let id = InstanceId::new(format!("player-{i}"));
            let handle = Rc::new(CountingHandle::default());
            coordinator.register(id.clone(), handle.clone());
            (id, handle)
        })
        .collect();
    (coordinator, handles)
}

/// Scene whose camera is never built
struct NeverReady;

impl SceneBackend for NeverReady {
    fn is_camera_ready(&self) -> bool {
        false
    }
    fn camera_angles(&self) -> Option<ViewAngles> {
        None
    }
    fn set_camera_angles(&mut self, _angles: ViewAngles) {}
    fn set_field_of_view(&mut self, _degrees: f64) {}
    fn update_projection(&mut self) {}
    fn set_orbit_enabled(&mut self, _enabled: bool) {}
    fn orbit_drag(&mut self, _dx: f64, _dy: f64) {}
    fn rebuild_video_texture(&mut self) {}
    fn resize(&mut self, _viewport: Size) {}
}

/// Yaw whose bearing from the rig axis is `bearing` degrees, on either side
fn yaw_strategy() -> impl Strategy<Value = f64> {
    (1.0f64..179.0, any::<bool>()).prop_map(|(bearing, far_side)| {
        let side = if far_side { 180.0 } else { 0.0 };
        (bearing + side + 90.0).to_radians()
    })
}

#[derive(Debug, Clone, Copy)]
enum RegistryOp {
    Enter(usize),
    Exit(usize),
    Unregister(usize),
}

fn registry_op() -> impl Strategy<Value = RegistryOp> {
    prop_oneof![
        (0usize..5).prop_map(RegistryOp::Enter),
        (0usize..5).prop_map(RegistryOp::Exit),
        (0usize..5).prop_map(RegistryOp::Unregister),
    ]
}

// ===== Property Tests =====

proptest! {
    /// Property: switching wraps around at both ends and Previous undoes Next
    #[test]
    fn switch_direction_wraps(len in 1usize..32, current in 0usize..32) {
        let current = current % len;

        prop_assert_eq!(SwitchDirection::Next.wrap(len - 1, len), 0);
        prop_assert_eq!(SwitchDirection::Previous.wrap(0, len), len - 1);

        let next = SwitchDirection::Next.wrap(current, len);
        prop_assert!(next < len);
        prop_assert_eq!(SwitchDirection::Previous.wrap(next, len), current);
    }

    /// Property: switching left then right returns to the starting yaw
    #[test]
    fn yaw_left_then_right_round_trips(yaw in yaw_strategy()) {
        let left = continued_yaw_radians(yaw, SwitchDirection::Previous);
        let back = continued_yaw_radians(left, SwitchDirection::Next);

        prop_assert!(
            angular_distance(back, yaw) < 1e-7,
            "yaw {} came back as {}", yaw, back
        );
        prop_assert!((0.0..=std::f64::consts::TAU).contains(&left));
    }

    /// Property: pause_all_except pauses every other instance exactly once
    #[test]
    fn pause_all_except_skips_only_the_caller(count in 1usize..8, caller in 0usize..8) {
        let caller = caller % count;
        let (coordinator, handles) = registered(count);

        coordinator.pause_all_except(&handles[caller].0);

        for (i, (_, handle)) in handles.iter().enumerate() {
            let expected = u32::from(i != caller);
            prop_assert_eq!(handle.pauses.get(), expected);
        }
    }

    /// Property: the fullscreen record is empty or names one registered instance
    #[test]
    fn fullscreen_record_stays_consistent(ops in prop::collection::vec(registry_op(), 1..40)) {
        let (coordinator, handles) = registered(5);

        for op in ops {
            match op {
                RegistryOp::Enter(i) => coordinator.set_fullscreen(&handles[i].0, true),
                RegistryOp::Exit(i) => coordinator.set_fullscreen(&handles[i].0, false),
                RegistryOp::Unregister(i) => {
                    coordinator.unregister(&handles[i].0);
                }
            }
            if let Some(id) = coordinator.fullscreen_instance() {
                prop_assert!(coordinator.is_registered(&id));
            }
        }
    }

    /// Property: entering fullscreen twice keeps a single record
    #[test]
    fn repeated_fullscreen_entry_is_idempotent(count in 2usize..6, target in 0usize..6) {
        let target = target % count;
        let (coordinator, handles) = registered(count);
        let id = &handles[target].0;

        coordinator.set_fullscreen(id, true);
        coordinator.set_fullscreen(id, true);

        let fullscreen = coordinator.fullscreen_instance();
        prop_assert_eq!(fullscreen.as_ref(), Some(id));
        prop_assert_eq!(handles[target].1.hides.get(), 0);

        coordinator.set_fullscreen(id, false);
        prop_assert_eq!(coordinator.fullscreen_instance(), None);
    }

    /// Property: two pointers that never move past the activation threshold never zoom
    #[test]
    fn sub_threshold_pinch_never_zooms(
        start in 50.0f64..400.0,
        offsets in prop::collection::vec(-11.5f64..11.5, 1..30),
        fov in 30.0f64..120.0,
    ) {
        let timing = TimingConfig::default();
        let mut gesture = GestureController::new(&timing);
        let mut timers = TimerQueue::new();
        let fov = FieldOfView::new(fov);
        let mut now = Duration::ZERO;

        gesture.handle(PointerInput::new(1, PointerPhase::Down, 0.0, 0.0), fov, now, &mut timers);
        gesture.handle(PointerInput::new(2, PointerPhase::Down, start, 0.0), fov, now, &mut timers);

        for offset in offsets {
            now += Duration::from_millis(16);
            let actions = gesture.handle(
                PointerInput::new(2, PointerPhase::Move, start + offset, 0.0),
                fov,
                now,
                &mut timers,
            );
            prop_assert!(
                !actions.iter().any(|action| matches!(action, GestureAction::Zoom(_))),
                "offset {} zoomed", offset
            );
            prop_assert!(!gesture.state().has_crossed_activation_threshold);
        }
    }

    /// Property: field of view is always clamped into [30, 120]
    #[test]
    fn field_of_view_is_clamped(degrees in any::<f64>()) {
        let fov = FieldOfView::new(degrees).degrees();
        prop_assert!((FieldOfView::MIN..=FieldOfView::MAX).contains(&fov));
    }

    /// Property: orientation retries stop at the cap and leave no timer behind
    #[test]
    fn orientation_retry_is_bounded(max_attempts in 1u32..20, interval_ms in 1u64..500) {
        let interval = Duration::from_millis(interval_ms);
        let mut renderer = SphericalRenderer::new(Box::new(NeverReady), interval, max_attempts, 16.0 / 9.0);
        let mut timers = TimerQueue::new();

        let mut outcome = renderer.set_yaw(45.0, Duration::ZERO, &mut timers);
        let mut attempts = 1;
        while outcome == OrientOutcome::Retrying {
            let deadline = timers.deadline(TimerKind::AngleRetry);
            prop_assert!(deadline.is_some());
            let now = deadline.unwrap_or_default();
            prop_assert_eq!(timers.take_due(now), vec![TimerKind::AngleRetry]);
            outcome = renderer.retry_orientation(now, &mut timers);
            attempts += 1;
            prop_assert!(attempts <= max_attempts);
        }

        prop_assert_eq!(outcome, OrientOutcome::GaveUp);
        prop_assert_eq!(attempts, max_attempts);
        prop_assert!(!timers.is_scheduled(TimerKind::AngleRetry));
        prop_assert_eq!(renderer.pending_attempts(), None);
    }
}

#[test]
fn default_orientation_cap_is_ten_attempts() {
    let timing = TimingConfig::default();
    let mut renderer = SphericalRenderer::new(
        Box::new(NeverReady),
        timing.angle_retry_interval,
        timing.angle_retry_max_attempts,
        16.0 / 9.0,
    );
    let mut timers = TimerQueue::new();

    let mut attempts = 0;
    let mut outcome = renderer.set_yaw(10.0, Duration::ZERO, &mut timers);
    attempts += 1;
    while let Some(deadline) = timers.next_deadline() {
        timers.take_due(deadline);
        outcome = renderer.retry_orientation(deadline, &mut timers);
        attempts += 1;
    }

    assert_eq!(outcome, OrientOutcome::GaveUp);
    assert_eq!(attempts, 10);
}
