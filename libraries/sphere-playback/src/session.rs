//! Playback session - per-instance orchestration
//!
//! Composes one [`SourceController`], one [`SphericalRenderer`], the resume
//! watchdog and the gesture controller, and registers itself with the page's
//! [`Coordinator`] for as long as it is mounted.
//!
//! The parts other instances may touch (play/pause intent, overlay state,
//! the event queue and the timers) live in a shared link that doubles as the
//! session's [`ControlHandle`]. Everything else is private to the session.

use crate::angle;
use crate::config::{PlayerConfig, TimingConfig};
use crate::coordinator::{ControlHandle, Coordinator};
use crate::element::{BindingId, MediaElement, MediaEvent, StreamEvent, StreamingBackend};
use crate::error::{PlayerError, Result};
use crate::events::{AccessRequired, MessageKind, OverlayCommand, SessionEvent, UserMessage};
use crate::gesture::{GestureAction, GestureController, GestureState, PointerInput};
use crate::platform::{PlatformHints, PlatformProfile};
use crate::renderer::{OrientOutcome, SceneBackend, SphericalRenderer};
use crate::source::{LoadOptions, SourceController, SourceSignal, SourceStatus};
use crate::timers::{TimerKind, TimerQueue};
use crate::types::{
    FieldOfView, InstanceId, PlaybackState, SavedState, Size, SourceMatrix, SwitchDirection,
    ViewAngles,
};
use crate::watchdog::{ResumeWatchdog, WatchdogVerdict};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Page-global side effects a session may apply
pub trait PageEffects {
    /// Keep the page from scrolling behind a fullscreen player
    fn lock_scroll(&mut self);

    fn unlock_scroll(&mut self);
}

/// Platform collaborators of one session
pub struct SessionPlatform {
    /// Decode element shared with the scene's video texture
    pub element: Rc<dyn MediaElement>,

    /// Adaptive-streaming client factory, if the page ships one
    pub streaming: Option<Rc<dyn StreamingBackend>>,

    pub scene: Box<dyn SceneBackend>,

    pub page: Option<Box<dyn PageEffects>>,

    pub hints: PlatformHints,
}

/// Result of a camera or video switch request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// A new source is loading for this slot
    Switched { video: usize, camera: usize },

    /// The target slot is a placeholder; the signal was raised instead
    AccessRequired(AccessRequired),

    /// Nothing to switch to
    Unchanged,
}

#[derive(Debug, Clone, Copy)]
struct OverlayState {
    enabled: bool,
    visible: bool,
    hidden_by_other: bool,
}

/// State shared between a session and its registry entry
struct SessionLink {
    id: InstanceId,
    element: Rc<dyn MediaElement>,
    timing: TimingConfig,
    now: Cell<Duration>,
    /// Play intent; survives a source switch
    playing: Cell<bool>,
    loading: Cell<bool>,
    bound: Cell<bool>,
    fullscreen: Cell<bool>,
    last_state: Cell<PlaybackState>,
    overlay: Cell<OverlayState>,
    events: RefCell<Vec<SessionEvent>>,
    timers: RefCell<TimerQueue>,
}

impl SessionLink {
    fn emit(&self, event: SessionEvent) {
        self.events.borrow_mut().push(event);
    }

    fn with_timers<R>(&self, f: impl FnOnce(&mut TimerQueue) -> R) -> R {
        f(&mut self.timers.borrow_mut())
    }

    fn state(&self) -> PlaybackState {
        if self.loading.get() {
            PlaybackState::Loading
        } else if !self.bound.get() {
            PlaybackState::Idle
        } else if self.playing.get() {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        }
    }

    fn sync_state(&self) {
        let state = self.state();
        if self.last_state.replace(state) != state {
            debug!(instance = %self.id, ?state, "Playback state changed");
            self.emit(SessionEvent::StateChanged { state });
        }
    }

    fn start_playback(&self) {
        self.playing.set(true);
        self.element.play();
        self.sync_state();
        self.arm_auto_hide();
    }

    fn stop_playback(&self) {
        if !self.playing.replace(false) {
            return;
        }
        self.element.pause();
        self.sync_state();
        self.show_overlay();
    }

    /// Show the overlay: temporarily while playing, persistently while paused
    fn show_overlay(&self) {
        let mut overlay = self.overlay.get();
        if !overlay.enabled || overlay.hidden_by_other {
            return;
        }
        overlay.visible = true;
        self.overlay.set(overlay);

        if self.playing.get() {
            let hide_after = self.timing.auto_hide(self.fullscreen.get());
            let deadline = self.now.get() + hide_after;
            self.with_timers(|timers| timers.schedule(TimerKind::HideControls, deadline));
            self.emit(SessionEvent::Overlay(OverlayCommand::ShowForced { hide_after }));
        } else {
            self.with_timers(|timers| timers.cancel(TimerKind::HideControls));
            self.emit(SessionEvent::Overlay(OverlayCommand::Show));
        }
    }

    fn arm_auto_hide(&self) {
        if self.overlay.get().visible {
            self.show_overlay();
        }
    }

    fn auto_hide_expired(&self) {
        if self.playing.get() {
            let mut overlay = self.overlay.get();
            overlay.visible = false;
            self.overlay.set(overlay);
        }
    }

    fn hide_for_other(&self) {
        let mut overlay = self.overlay.get();
        overlay.hidden_by_other = true;
        overlay.visible = false;
        self.overlay.set(overlay);
        self.with_timers(|timers| timers.cancel(TimerKind::HideControls));
        self.emit(SessionEvent::Overlay(OverlayCommand::Hide));
    }

    fn restore_after_other(&self) {
        let mut overlay = self.overlay.get();
        if !overlay.hidden_by_other {
            return;
        }
        overlay.hidden_by_other = false;
        self.overlay.set(overlay);
        self.emit(SessionEvent::Overlay(OverlayCommand::Restore));
        self.show_overlay();
    }
}

impl ControlHandle for SessionLink {
    fn pause(&self) {
        debug!(instance = %self.id, "Paused by coordinator");
        self.stop_playback();
    }

    fn play(&self) {
        if !self.bound.get() || self.playing.get() {
            return;
        }
        if self.loading.get() {
            // Reconciled once the source is ready
            self.playing.set(true);
            self.sync_state();
        } else {
            self.start_playback();
        }
    }

    fn show_controls(&self) {
        self.show_overlay();
    }

    fn hide_controls(&self) {
        self.hide_for_other();
    }

    fn restore_controls(&self) {
        self.restore_after_other();
    }
}

/// Snapshot waiting to be re-applied once the new source is ready
#[derive(Debug, Clone, Copy)]
struct PendingRestore {
    saved: SavedState,
    angles: Option<ViewAngles>,
}

/// One mounted player instance
pub struct PlaybackSession {
    config: PlayerConfig,
    profile: PlatformProfile,
    coordinator: Rc<Coordinator>,
    link: Rc<SessionLink>,
    source: SourceController,
    renderer: SphericalRenderer,
    watchdog: ResumeWatchdog,
    gesture: GestureController,
    page: Option<Box<dyn PageEffects>>,

    video: usize,
    camera: usize,
    saved_state: Option<SavedState>,
    pending_restore: Option<PendingRestore>,
    /// Last media time seen while a source was ready
    last_time: f64,
    tap_to_play: bool,
    message_visible: bool,
    scroll_locked: bool,
    mounted: bool,
}

impl fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("instance", &self.link.id)
            .field("video", &self.video)
            .field("camera", &self.camera)
            .field("state", &self.link.state())
            .field("fullscreen", &self.link.fullscreen.get())
            .field("profile", &self.profile)
            .field("source", &self.source)
            .field("mounted", &self.mounted)
            .finish_non_exhaustive()
    }
}

impl PlaybackSession {
    /// Create, register and start a session
    ///
    /// The initial slot starts loading right away unless it is a
    /// placeholder. On a platform that can play adaptive streams neither
    /// natively nor through a client, the session stays idle and shows an
    /// "unsupported" message.
    pub fn mount(
        config: PlayerConfig,
        platform: SessionPlatform,
        coordinator: Rc<Coordinator>,
        now: Duration,
    ) -> Result<Self> {
        config.validate()?;

        let SessionPlatform {
            element,
            streaming,
            scene,
            page,
            hints,
        } = platform;
        let id = config.instance_id.clone().unwrap_or_else(InstanceId::generate);
        let profile = PlatformProfile::probe(element.as_ref(), streaming.as_deref(), hints);
        let timing = config.timing.clone();

        let link = Rc::new(SessionLink {
            id: id.clone(),
            element: element.clone(),
            timing: timing.clone(),
            now: Cell::new(now),
            playing: Cell::new(false),
            loading: Cell::new(false),
            bound: Cell::new(false),
            fullscreen: Cell::new(false),
            last_state: Cell::new(PlaybackState::Idle),
            overlay: Cell::new(OverlayState {
                enabled: config.show_controls,
                visible: false,
                hidden_by_other: false,
            }),
            events: RefCell::new(Vec::new()),
            timers: RefCell::new(TimerQueue::new()),
        });

        let renderer = SphericalRenderer::new(
            scene,
            timing.angle_retry_interval,
            timing.angle_retry_max_attempts,
            config.embedded_aspect_ratio,
        );

        let mut session = Self {
            video: config.initial_video,
            camera: config.initial_camera,
            source: SourceController::new(element, streaming, profile.streaming),
            renderer,
            watchdog: ResumeWatchdog::new(timing.watchdog_window),
            gesture: GestureController::new(&timing),
            page,
            profile,
            coordinator,
            link,
            config,
            saved_state: None,
            pending_restore: None,
            last_time: 0.0,
            tap_to_play: false,
            message_visible: false,
            scroll_locked: false,
            mounted: true,
        };

        session
            .coordinator
            .register(id.clone(), session.link.clone());
        info!(instance = %id, streaming = ?profile.streaming, "Mounted playback session");
        session.start(now);
        Ok(session)
    }

    fn start(&mut self, now: Duration) {
        self.link.show_overlay();
        if self.config.fullscreen {
            self.set_fullscreen(true);
        }
        if let Some(degrees) = self.config.initial_yaw {
            let renderer = &mut self.renderer;
            let outcome = self
                .link
                .with_timers(|timers| renderer.set_yaw(degrees, now, timers));
            self.handle_orientation(outcome);
        }

        let Some(url) = self.slot_url(self.video, self.camera) else {
            debug!(instance = %self.link.id, "Initial slot is a placeholder, nothing to load");
            return;
        };
        let options = LoadOptions {
            start_time: 0.0,
            autoplay: self.config.autoplay,
        };
        // Failures are already surfaced as a message
        let _ = self.bind(&url, options);
    }

    /// Switch one camera left or right within the current video
    ///
    /// Keeps media time, play state and field of view, and turns the view
    /// so the same point of the scene stays in sight.
    pub fn switch_camera(&mut self, direction: SwitchDirection, now: Duration) -> Result<SwitchOutcome> {
        self.ensure_mounted()?;
        self.link.now.set(now);

        let cameras = self.config.sources.camera_count(self.video);
        if cameras < 2 {
            return Ok(SwitchOutcome::Unchanged);
        }
        let target = direction.wrap(self.camera, cameras);
        let Some(url) = self.slot_url(self.video, target) else {
            let reason = self.raise_access_required(self.video, target);
            return Ok(SwitchOutcome::AccessRequired(reason));
        };

        let saved = self.capture_state();
        let angles = angle::continued_yaw(saved.view_angles, direction)
            .zip(saved.view_angles)
            .map(|(yaw, angles)| ViewAngles { yaw, ..angles });
        debug!(
            instance = %self.link.id,
            from = self.camera,
            to = target,
            time = saved.current_time,
            "Switching camera"
        );

        self.load_saved(&url, saved, angles)?;
        self.camera = target;
        self.link.emit(SessionEvent::CameraChanged {
            video: self.video,
            camera: target,
        });
        Ok(SwitchOutcome::Switched {
            video: self.video,
            camera: target,
        })
    }

    /// Switch to the previous or next video (multi-video mode only)
    ///
    /// Starts at the first camera of the target video. No angle continuity
    /// is applied: a different video is not a continuous viewpoint.
    pub fn switch_video(&mut self, direction: SwitchDirection, now: Duration) -> Result<SwitchOutcome> {
        self.ensure_mounted()?;
        self.link.now.set(now);

        if !self.config.sources.is_multi() {
            return Err(PlayerError::NotMultiVideo);
        }
        let videos = self.config.sources.video_count();
        if videos < 2 {
            return Ok(SwitchOutcome::Unchanged);
        }
        let target = direction.wrap(self.video, videos);
        let Some(url) = self.slot_url(target, 0) else {
            let reason = self.raise_access_required(target, 0);
            return Ok(SwitchOutcome::AccessRequired(reason));
        };

        let saved = self.capture_state();
        debug!(instance = %self.link.id, from = self.video, to = target, "Switching video");

        self.load_saved(&url, saved, None)?;
        self.video = target;
        self.camera = 0;
        self.link.emit(SessionEvent::VideoChanged { video: target });
        Ok(SwitchOutcome::Switched {
            video: target,
            camera: 0,
        })
    }

    /// Toggle between playing and paused
    ///
    /// Counts as an explicit user gesture: clears a "tap to play"
    /// affordance. Starting playback pauses every other instance first
    /// unless disabled in the config.
    pub fn toggle_play_pause(&mut self, now: Duration) -> Result<()> {
        self.ensure_mounted()?;
        self.link.now.set(now);
        self.dismiss_tap_to_play();

        if self.link.playing.get() {
            self.source.set_autoplay(false);
            self.link.stop_playback();
            return Ok(());
        }

        let Some(url) = self.slot_url(self.video, self.camera) else {
            self.raise_access_required(self.video, self.camera);
            return Ok(());
        };

        let needs_fullscreen =
            self.profile.fullscreen_gesture_required && !self.link.fullscreen.get();
        if needs_fullscreen {
            self.set_fullscreen(true);
        }
        self.play(&url)?;
        if needs_fullscreen {
            self.coordinator.show_controls(&self.link.id);
        }
        Ok(())
    }

    fn play(&mut self, url: &str) -> Result<()> {
        if self.config.pause_others_on_play {
            self.coordinator.pause_all_except(&self.link.id);
        }

        match self.source.status() {
            SourceStatus::Ready => self.link.start_playback(),
            SourceStatus::Loading => {
                self.source.set_autoplay(true);
                self.link.playing.set(true);
                self.link.sync_state();
            }
            SourceStatus::Idle | SourceStatus::NeedsReload => {
                let options = LoadOptions {
                    start_time: self.last_time,
                    autoplay: true,
                };
                self.bind(url, options)?;
            }
        }
        Ok(())
    }

    /// Enter or leave fullscreen; returns the new flag
    pub fn toggle_fullscreen(&mut self, now: Duration) -> Result<bool> {
        self.ensure_mounted()?;
        self.link.now.set(now);
        let fullscreen = !self.link.fullscreen.get();
        self.set_fullscreen(fullscreen);
        Ok(fullscreen)
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        if self.link.fullscreen.replace(fullscreen) == fullscreen {
            return;
        }
        info!(instance = %self.link.id, fullscreen, "Fullscreen changed");

        if fullscreen {
            self.coordinator.pause_all_except(&self.link.id);
            if let Some(page) = &mut self.page {
                page.lock_scroll();
                self.scroll_locked = true;
            }
        } else {
            self.unlock_scroll();
        }

        self.renderer.relayout(fullscreen);
        self.link.emit(SessionEvent::FullscreenChanged { fullscreen });
        self.coordinator.set_fullscreen(&self.link.id, fullscreen);
    }

    fn unlock_scroll(&mut self) {
        if self.scroll_locked {
            if let Some(page) = &mut self.page {
                page.unlock_scroll();
            }
            self.scroll_locked = false;
        }
    }

    /// Page or app visibility changed
    ///
    /// Hiding pauses a playing instance. Becoming visible refreshes the
    /// texture and arms the resume watchdog where the platform needs it.
    pub fn on_visibility_change(&mut self, visible: bool, now: Duration) {
        if !self.mounted {
            return;
        }
        self.link.now.set(now);

        let link = &self.link;
        if !visible {
            if link.playing.get() {
                info!(instance = %link.id, "Page hidden, pausing");
                link.stop_playback();
            }
            let watchdog = &mut self.watchdog;
            link.with_timers(|timers| watchdog.disarm(timers));
            return;
        }

        if self.profile.texture_refresh_on_resume {
            self.renderer.rebuild_texture();
        }
        if self.profile.decoder_recovery_on_resume && self.source.is_bound() {
            let watchdog = &mut self.watchdog;
            link.with_timers(|timers| watchdog.arm(link.element.as_ref(), now, timers));
        }
    }

    /// A frame was presented by the decode element
    pub fn on_frame_presented(&mut self) {
        self.watchdog.on_frame_presented();
    }

    fn on_watchdog_expired(&mut self) {
        if self.watchdog.expire(self.link.element.as_ref()) != WatchdogVerdict::Stalled {
            return;
        }

        let resume_at = self.link.element.current_time();
        match self.source.hard_reload(resume_at) {
            Ok(()) => {
                self.renderer.rebuild_texture();
                self.link.loading.set(true);
                self.link.playing.set(true);
                self.link.sync_state();
                self.link.emit(SessionEvent::DecoderRecovered);
            }
            Err(error) => {
                // Best effort; the viewer can still replay by hand
                warn!(instance = %self.link.id, %error, "Hard reload after resume failed");
            }
        }
    }

    /// Feed an event of the decode element
    pub fn handle_media_event(&mut self, event: MediaEvent, now: Duration) {
        if !self.mounted {
            return;
        }
        self.link.now.set(now);
        self.remember_time();
        self.sync_pending_autoplay();
        let signals = self.source.handle_media_event(&event);
        self.apply_signals(signals);
    }

    /// Feed an event of the streaming client created for `binding`
    pub fn handle_stream_event(&mut self, binding: BindingId, event: StreamEvent, now: Duration) {
        if !self.mounted {
            return;
        }
        self.link.now.set(now);
        self.remember_time();
        self.sync_pending_autoplay();
        let signals = self.source.handle_stream_event(binding, &event);
        self.apply_signals(signals);
    }

    /// Carry play intent changed by other instances into the pending load
    fn sync_pending_autoplay(&mut self) {
        if self.link.loading.get() {
            self.source.set_autoplay(self.link.playing.get());
        }
    }

    fn apply_signals(&mut self, signals: Vec<SourceSignal>) {
        for signal in signals {
            match signal {
                SourceSignal::Ready { autoplay } => self.on_source_ready(autoplay),
                SourceSignal::PlaybackStarted => {
                    if !self.link.playing.get() {
                        debug!(instance = %self.link.id, "Playback started after pause request");
                        self.link.element.pause();
                    }
                }
                SourceSignal::PlaybackBlocked if !self.link.playing.get() => {
                    debug!(instance = %self.link.id, "Rejected play of a paused session");
                }
                SourceSignal::PlaybackBlocked => {
                    self.link.playing.set(false);
                    self.link.sync_state();
                    if !self.tap_to_play {
                        self.tap_to_play = true;
                        self.link.emit(SessionEvent::TapToPlay { visible: true });
                    }
                    self.link.show_overlay();
                }
                SourceSignal::FatalError(error) => self.fail(&error),
            }
        }
    }

    fn on_source_ready(&mut self, autoplay: bool) {
        let link = &self.link;
        link.loading.set(false);

        // Intent may have changed while loading
        let wants_play = link.playing.get();
        if wants_play && !autoplay {
            link.element.play();
        } else if !wants_play && autoplay {
            link.element.pause();
        }

        if let Some(restore) = self.pending_restore.take() {
            self.renderer.set_field_of_view(restore.saved.field_of_view);
            if let Some(angles) = restore.angles {
                let now = link.now.get();
                let renderer = &mut self.renderer;
                let outcome = link.with_timers(|timers| renderer.set_view_angles(angles, now, timers));
                self.handle_orientation(outcome);
            }
        }

        self.link.sync_state();
        if wants_play {
            if self.config.pause_others_on_play {
                self.coordinator.pause_all_except(&self.link.id);
            }
            self.link.arm_auto_hide();
        }
    }

    /// Feed pointer or touch input of the rendering surface
    pub fn handle_pointer(&mut self, input: PointerInput, now: Duration) {
        if !self.mounted {
            return;
        }
        self.link.now.set(now);
        let fov = self.renderer.field_of_view();
        let gesture = &mut self.gesture;
        let actions = self
            .link
            .with_timers(|timers| gesture.handle(input, fov, now, timers));
        self.apply_gestures(actions, now);
    }

    fn apply_gestures(&mut self, actions: Vec<GestureAction>, now: Duration) {
        for action in actions {
            match action {
                GestureAction::Orbit { dx, dy } => self.renderer.orbit_drag(dx, dy),
                GestureAction::Zoom(fov) => self.renderer.set_field_of_view(fov),
                GestureAction::SetOrbitEnabled(enabled) => self.renderer.set_orbit_enabled(enabled),
                GestureAction::Tap if self.tap_to_play => {
                    if let Err(error) = self.toggle_play_pause(now) {
                        warn!(instance = %self.link.id, %error, "Tap to play failed");
                    }
                }
                GestureAction::Tap => {
                    self.coordinator.show_controls(&self.link.id);
                }
            }
        }
    }

    /// The graphics context was lost; rendering stops until restored
    pub fn on_context_lost(&mut self) {
        warn!(instance = %self.link.id, "Graphics context lost");
    }

    /// The graphics context came back; textures must be recreated
    pub fn on_context_restored(&mut self) {
        info!(instance = %self.link.id, "Graphics context restored");
        self.renderer.rebuild_texture();
    }

    /// The container's layout changed
    pub fn resize(&mut self, container: Size) -> Size {
        self.renderer.resize(container, self.link.fullscreen.get())
    }

    /// Fire every timer due at `now`
    pub fn tick(&mut self, now: Duration) {
        if !self.mounted {
            return;
        }
        self.link.now.set(now);
        self.remember_time();

        let due = self.link.with_timers(|timers| timers.take_due(now));
        for kind in due {
            match kind {
                TimerKind::AngleRetry => {
                    let renderer = &mut self.renderer;
                    let outcome = self
                        .link
                        .with_timers(|timers| renderer.retry_orientation(now, timers));
                    self.handle_orientation(outcome);
                }
                TimerKind::HideControls => self.link.auto_hide_expired(),
                TimerKind::Watchdog => self.on_watchdog_expired(),
                TimerKind::GestureSettle | TimerKind::GestureSafety => {
                    let gesture = &mut self.gesture;
                    let actions = self
                        .link
                        .with_timers(|timers| gesture.on_timer(kind, now, timers));
                    self.apply_gestures(actions, now);
                }
                TimerKind::MessageDismiss => {
                    self.message_visible = false;
                    self.link.emit(SessionEvent::MessageDismissed);
                }
            }
        }
    }

    /// Earliest pending deadline, for hosts that sleep between ticks
    pub fn next_deadline(&self) -> Option<Duration> {
        self.link.timers.borrow().next_deadline()
    }

    /// Orient the camera (radians), retrying while it is not built yet
    pub fn set_view_angles(&mut self, yaw: f64, pitch: f64, roll: f64, now: Duration) -> OrientOutcome {
        self.link.now.set(now);
        let renderer = &mut self.renderer;
        let outcome = self.link.with_timers(|timers| {
            renderer.set_view_angles(ViewAngles::new(yaw, pitch, roll), now, timers)
        });
        self.handle_orientation(outcome);
        outcome
    }

    /// Current camera orientation, `None` before the camera exists
    pub fn current_angles(&self) -> Option<ViewAngles> {
        self.renderer.current_angles()
    }

    /// Set the zoom; returns the clamped value
    pub fn set_field_of_view(&mut self, degrees: f64) -> FieldOfView {
        let fov = FieldOfView::new(degrees);
        self.renderer.set_field_of_view(fov);
        fov
    }

    /// Take every event queued since the last call
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut *self.link.events.borrow_mut())
    }

    pub fn has_pending_events(&self) -> bool {
        !self.link.events.borrow().is_empty()
    }

    /// Tear everything down; safe to call more than once
    ///
    /// Releases the source binding, clears every timer, leaves fullscreen
    /// (restoring the other overlays), unregisters from the coordinator
    /// and undoes page-global side effects.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        info!(instance = %self.link.id, "Unmounting playback session");

        self.source.teardown();
        let renderer = &mut self.renderer;
        let watchdog = &mut self.watchdog;
        self.link.with_timers(|timers| {
            renderer.cancel_orientation(timers);
            watchdog.disarm(timers);
            timers.clear();
        });
        self.gesture.reset();

        if self.link.fullscreen.replace(false) {
            self.coordinator.set_fullscreen(&self.link.id, false);
        }
        self.coordinator.unregister(&self.link.id);
        self.unlock_scroll();

        self.link.playing.set(false);
        self.link.loading.set(false);
        self.link.bound.set(false);
    }

    fn bind(&mut self, url: &str, options: LoadOptions) -> Result<()> {
        match self.source.load(url, options) {
            Ok(()) => {
                self.link.bound.set(true);
                self.link.loading.set(true);
                self.link.playing.set(options.autoplay);
                self.link.sync_state();
                Ok(())
            }
            Err(error) => {
                self.fail(&error);
                Err(error)
            }
        }
    }

    fn load_saved(&mut self, url: &str, saved: SavedState, angles: Option<ViewAngles>) -> Result<()> {
        self.pending_restore = Some(PendingRestore { saved, angles });
        let options = LoadOptions {
            start_time: saved.current_time,
            autoplay: saved.playing,
        };
        let bound = self.bind(url, options);
        if bound.is_err() {
            self.pending_restore = None;
        }
        bound
    }

    /// Snapshot taken before the current binding is torn down
    fn capture_state(&mut self) -> SavedState {
        // A switch during loading keeps the time of the previous snapshot
        let current_time = match (self.link.loading.get(), self.saved_state) {
            (true, Some(previous)) => previous.current_time,
            _ => self.link.element.current_time(),
        };
        let saved = SavedState {
            current_time,
            playing: self.link.playing.get(),
            field_of_view: self.renderer.field_of_view(),
            view_angles: self.renderer.current_angles(),
        };
        self.saved_state = Some(saved);
        saved
    }

    fn fail(&mut self, error: &PlayerError) {
        warn!(instance = %self.link.id, %error, "Playback failed");
        let link = &self.link;
        link.loading.set(false);
        link.playing.set(false);
        link.bound.set(self.source.is_bound());
        link.sync_state();

        let kind = match error {
            PlayerError::UnsupportedPlatform => MessageKind::Unsupported,
            _ => MessageKind::PlaybackFailed,
        };
        link.emit(SessionEvent::Message(UserMessage::new(kind)));
        self.message_visible = true;
        let deadline = link.now.get() + link.timing.message_dismiss;
        link.with_timers(|timers| timers.schedule(TimerKind::MessageDismiss, deadline));
        link.show_overlay();
    }

    fn raise_access_required(&mut self, video: usize, camera: usize) -> AccessRequired {
        let reason = if self.config.slot_needs_payment(video, camera) {
            AccessRequired::PaymentRequired
        } else {
            AccessRequired::NotYetAvailable
        };
        let awaiting = self.config.slot_awaiting_availability(video, camera);
        info!(instance = %self.link.id, video, camera, ?reason, awaiting, "Slot requires access");
        self.link.emit(SessionEvent::AccessRequired {
            reason,
            video,
            camera,
        });
        reason
    }

    fn handle_orientation(&mut self, outcome: OrientOutcome) {
        if let OrientOutcome::Applied(angles) = outcome {
            self.link.emit(SessionEvent::AnglesApplied { angles });
        }
    }

    fn dismiss_tap_to_play(&mut self) {
        if self.tap_to_play {
            self.tap_to_play = false;
            self.link.emit(SessionEvent::TapToPlay { visible: false });
        }
    }

    fn remember_time(&mut self) {
        if self.source.status() == SourceStatus::Ready {
            self.last_time = self.link.element.current_time();
        }
    }

    fn slot_url(&self, video: usize, camera: usize) -> Option<String> {
        self.config.sources.url(video, camera).map(str::to_string)
    }

    fn ensure_mounted(&self) -> Result<()> {
        if self.mounted {
            Ok(())
        } else {
            Err(PlayerError::Unmounted)
        }
    }

    // ===== Accessors =====

    pub fn instance_id(&self) -> &InstanceId {
        &self.link.id
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn sources(&self) -> &SourceMatrix {
        &self.config.sources
    }

    pub fn current_video(&self) -> usize {
        self.video
    }

    pub fn current_camera(&self) -> usize {
        self.camera
    }

    pub fn state(&self) -> PlaybackState {
        self.link.state()
    }

    /// Play intent, including a pending autoplay while loading
    pub fn is_playing(&self) -> bool {
        self.link.playing.get()
    }

    pub fn is_loading(&self) -> bool {
        self.link.loading.get()
    }

    pub fn is_fullscreen(&self) -> bool {
        self.link.fullscreen.get()
    }

    /// Whether the control overlay is currently shown
    pub fn is_ui_visible(&self) -> bool {
        let overlay = self.link.overlay.get();
        overlay.visible && !overlay.hidden_by_other
    }

    pub fn is_tap_to_play_visible(&self) -> bool {
        self.tap_to_play
    }

    pub fn is_message_visible(&self) -> bool {
        self.message_visible
    }

    pub fn field_of_view(&self) -> FieldOfView {
        self.renderer.field_of_view()
    }

    /// Snapshot of the most recent switch
    pub fn saved_state(&self) -> Option<SavedState> {
        self.saved_state
    }

    pub fn profile(&self) -> &PlatformProfile {
        &self.profile
    }

    pub fn source_status(&self) -> SourceStatus {
        self.source.status()
    }

    /// Streaming-client binding events must be tagged with
    pub fn binding_id(&self) -> Option<BindingId> {
        self.source.binding_id()
    }

    pub fn gesture_state(&self) -> GestureState {
        self.gesture.state()
    }

    pub fn is_orbit_enabled(&self) -> bool {
        self.renderer.is_orbit_enabled()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.unmount();
    }
}
