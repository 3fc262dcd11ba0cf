//! Shared mocks for driving complete sessions without a browser

#![allow(dead_code)]

use sphere_playback::{
    BindingId, CanPlay, Coordinator, Matrix, MediaElement, PageEffects, PlatformHints,
    PlaybackSession, PlayerConfig, ReadyState, SceneBackend, SessionEvent, SessionPlatform, Size,
    StreamingBackend, StreamingClient, ViewAngles,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Once;
use std::time::Duration;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

pub fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

// ===== Media element =====

#[derive(Debug, Clone, PartialEq)]
pub enum ElementCall {
    SetSrc(Option<String>),
    Load,
    Play,
    Pause,
    Seek(f64),
}

/// Decode element that records every call
pub struct MockElement {
    native: bool,
    frame_callbacks: bool,
    paused: Cell<bool>,
    time: Cell<f64>,
    ready_state: Cell<ReadyState>,
    calls: RefCell<Vec<ElementCall>>,
}

impl MockElement {
    fn new(native: bool) -> Self {
        Self {
            native,
            frame_callbacks: true,
            paused: Cell::new(true),
            time: Cell::new(0.0),
            ready_state: Cell::new(ReadyState::HaveNothing),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn native() -> Self {
        Self::new(true)
    }

    /// Element that needs a streaming client for adaptive manifests
    pub fn plain() -> Self {
        Self::new(false)
    }

    pub fn without_frame_callbacks(mut self) -> Self {
        self.frame_callbacks = false;
        self
    }

    pub fn calls(&self) -> Vec<ElementCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn count(&self, call: &ElementCall) -> usize {
        self.calls.borrow().iter().filter(|c| *c == call).count()
    }

    /// Media time advanced by the "decoder"
    pub fn advance_to(&self, seconds: f64) {
        self.time.set(seconds);
    }

    pub fn set_ready_state(&self, state: ReadyState) {
        self.ready_state.set(state);
    }

    pub fn paused(&self) -> bool {
        self.paused.get()
    }
}

impl MediaElement for MockElement {
    fn set_src(&self, url: Option<&str>) {
        self.calls
            .borrow_mut()
            .push(ElementCall::SetSrc(url.map(str::to_string)));
    }

    fn load(&self) {
        self.ready_state.set(ReadyState::HaveNothing);
        self.calls.borrow_mut().push(ElementCall::Load);
    }

    fn play(&self) {
        self.paused.set(false);
        self.calls.borrow_mut().push(ElementCall::Play);
    }

    fn pause(&self) {
        self.paused.set(true);
        self.calls.borrow_mut().push(ElementCall::Pause);
    }

    fn is_paused(&self) -> bool {
        self.paused.get()
    }

    fn current_time(&self) -> f64 {
        self.time.get()
    }

    fn set_current_time(&self, seconds: f64) {
        self.time.set(seconds);
        self.calls.borrow_mut().push(ElementCall::Seek(seconds));
    }

    fn ready_state(&self) -> ReadyState {
        self.ready_state.get()
    }

    fn can_play_type(&self, _mime: &str) -> CanPlay {
        if self.native {
            CanPlay::Maybe
        } else {
            CanPlay::No
        }
    }

    fn supports_frame_callbacks(&self) -> bool {
        self.frame_callbacks
    }
}

// ===== Streaming client =====

#[derive(Debug, Clone, PartialEq)]
pub enum ClientCall {
    Create,
    Attach,
    LoadSource(String),
    StartLoad(f64),
    Recover,
    Detach,
    Destroy,
}

pub type ClientLog = Rc<RefCell<Vec<(BindingId, ClientCall)>>>;

/// Streaming backend whose clients share one call log
pub struct MockStreaming {
    pub supported: bool,
    pub recover_fails: Rc<Cell<bool>>,
    pub log: ClientLog,
}

impl MockStreaming {
    pub fn new(supported: bool) -> Self {
        Self {
            supported,
            recover_fails: Rc::new(Cell::new(false)),
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<(BindingId, ClientCall)> {
        self.log.borrow().clone()
    }

    pub fn calls_for(&self, binding: BindingId) -> Vec<ClientCall> {
        self.log
            .borrow()
            .iter()
            .filter(|(id, _)| *id == binding)
            .map(|(_, call)| call.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }
}

impl StreamingBackend for MockStreaming {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create_client(&self, binding: BindingId) -> Box<dyn StreamingClient> {
        self.log.borrow_mut().push((binding, ClientCall::Create));
        Box::new(MockClient {
            binding,
            log: self.log.clone(),
            recover_fails: self.recover_fails.clone(),
        })
    }
}

struct MockClient {
    binding: BindingId,
    log: ClientLog,
    recover_fails: Rc<Cell<bool>>,
}

impl MockClient {
    fn record(&self, call: ClientCall) {
        self.log.borrow_mut().push((self.binding, call));
    }
}

impl StreamingClient for MockClient {
    fn load_source(&mut self, url: &str) {
        self.record(ClientCall::LoadSource(url.to_string()));
    }

    fn attach_media(&mut self) {
        self.record(ClientCall::Attach);
    }

    fn start_load(&mut self, from: f64) {
        self.record(ClientCall::StartLoad(from));
    }

    fn recover_media_error(&mut self) -> Result<(), String> {
        self.record(ClientCall::Recover);
        if self.recover_fails.get() {
            Err("decoder reset threw".to_string())
        } else {
            Ok(())
        }
    }

    fn detach_media(&mut self) {
        self.record(ClientCall::Detach);
    }

    fn destroy(&mut self) {
        self.record(ClientCall::Destroy);
    }
}

// ===== Scene =====

#[derive(Debug, Default)]
pub struct SceneLog {
    pub ready: bool,
    pub angles: ViewAngles,
    pub applied: Vec<ViewAngles>,
    pub fov: Vec<f64>,
    pub projections: usize,
    pub orbit_enabled: Vec<bool>,
    pub drags: Vec<(f64, f64)>,
    pub textures: usize,
    pub viewports: Vec<Size>,
}

pub struct MockScene {
    log: Rc<RefCell<SceneLog>>,
}

impl SceneBackend for MockScene {
    fn is_camera_ready(&self) -> bool {
        self.log.borrow().ready
    }

    fn camera_angles(&self) -> Option<ViewAngles> {
        let log = self.log.borrow();
        log.ready.then_some(log.angles)
    }

    fn set_camera_angles(&mut self, angles: ViewAngles) {
        let mut log = self.log.borrow_mut();
        log.angles = angles;
        log.applied.push(angles);
    }

    fn set_field_of_view(&mut self, degrees: f64) {
        self.log.borrow_mut().fov.push(degrees);
    }

    fn update_projection(&mut self) {
        self.log.borrow_mut().projections += 1;
    }

    fn set_orbit_enabled(&mut self, enabled: bool) {
        self.log.borrow_mut().orbit_enabled.push(enabled);
    }

    fn orbit_drag(&mut self, dx: f64, dy: f64) {
        self.log.borrow_mut().drags.push((dx, dy));
    }

    fn rebuild_video_texture(&mut self) {
        self.log.borrow_mut().textures += 1;
    }

    fn resize(&mut self, viewport: Size) {
        self.log.borrow_mut().viewports.push(viewport);
    }
}

// ===== Page =====

#[derive(Debug, Default)]
pub struct PageLog {
    pub locked: bool,
    pub locks: usize,
    pub unlocks: usize,
}

pub struct MockPage {
    log: Rc<RefCell<PageLog>>,
}

impl PageEffects for MockPage {
    fn lock_scroll(&mut self) {
        let mut log = self.log.borrow_mut();
        log.locked = true;
        log.locks += 1;
    }

    fn unlock_scroll(&mut self) {
        let mut log = self.log.borrow_mut();
        log.locked = false;
        log.unlocks += 1;
    }
}

// ===== Harness =====

/// Mock platform of one session, with handles to inspect it afterwards
pub struct Harness {
    pub element: Rc<MockElement>,
    pub streaming: Rc<MockStreaming>,
    pub scene: Rc<RefCell<SceneLog>>,
    pub page: Rc<RefCell<PageLog>>,
    pub hints: PlatformHints,
}

impl Harness {
    pub fn new(element: MockElement, streaming: MockStreaming) -> Self {
        init_tracing();
        Self {
            element: Rc::new(element),
            streaming: Rc::new(streaming),
            scene: Rc::new(RefCell::new(SceneLog {
                ready: true,
                ..SceneLog::default()
            })),
            page: Rc::new(RefCell::new(PageLog::default())),
            hints: PlatformHints::default(),
        }
    }

    /// Native adaptive playback
    pub fn native() -> Self {
        Self::new(MockElement::native(), MockStreaming::new(false))
    }

    /// Adaptive playback through a streaming client
    pub fn client() -> Self {
        Self::new(MockElement::plain(), MockStreaming::new(true))
    }

    /// Neither native nor client-side adaptive playback
    pub fn unsupported() -> Self {
        Self::new(MockElement::plain(), MockStreaming::new(false))
    }

    pub fn with_hints(mut self, hints: PlatformHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn camera_not_ready(self) -> Self {
        self.scene.borrow_mut().ready = false;
        self
    }

    pub fn platform(&self) -> SessionPlatform {
        SessionPlatform {
            element: self.element.clone(),
            streaming: Some(self.streaming.clone()),
            scene: Box::new(MockScene {
                log: self.scene.clone(),
            }),
            page: Some(Box::new(MockPage {
                log: self.page.clone(),
            })),
            hints: self.hints,
        }
    }

    pub fn mount(&self, config: PlayerConfig, coordinator: &Rc<Coordinator>) -> PlaybackSession {
        PlaybackSession::mount(config, self.platform(), coordinator.clone(), Duration::ZERO)
            .expect("mount should succeed")
    }
}

// ===== Configs and events =====

pub fn single(urls: &[&str]) -> PlayerConfig {
    PlayerConfig::new(Matrix::Single(urls.iter().map(|url| url.to_string()).collect()))
}

pub fn multi(videos: &[&[&str]]) -> PlayerConfig {
    PlayerConfig::new(Matrix::Multi(
        videos
            .iter()
            .map(|cameras| cameras.iter().map(|url| url.to_string()).collect())
            .collect(),
    ))
}

pub fn with_id(mut config: PlayerConfig, id: &str) -> PlayerConfig {
    config.instance_id = Some(id.into());
    config
}

pub fn count_events(events: &[SessionEvent], predicate: impl Fn(&SessionEvent) -> bool) -> usize {
    events.iter().filter(|event| predicate(event)).count()
}
