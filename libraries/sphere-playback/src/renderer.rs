//! Spherical renderer glue
//!
//! The graphics work itself (scene, perspective camera, orbit controls, video
//! texture) belongs to a platform [`SceneBackend`]. This module owns the
//! policies around it: bounded camera-orientation retries, field-of-view
//! clamping with projection updates, texture rebuilds and viewport layout.

use crate::timers::{TimerKind, TimerQueue};
use crate::types::{FieldOfView, Size, ViewAngles};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Platform scene: sphere mesh, perspective camera and orbit controller
pub trait SceneBackend {
    /// Camera and orbit controller exist
    fn is_camera_ready(&self) -> bool;

    /// Current orbit orientation, `None` before the camera exists
    fn camera_angles(&self) -> Option<ViewAngles>;

    fn set_camera_angles(&mut self, angles: ViewAngles);

    fn set_field_of_view(&mut self, degrees: f64);

    /// Recompute the camera projection matrix
    fn update_projection(&mut self);

    fn set_orbit_enabled(&mut self, enabled: bool);

    /// Forward a drag delta (pixels) to the orbit controller
    fn orbit_drag(&mut self, dx: f64, dy: f64);

    /// Recreate the video texture from the decode element
    fn rebuild_video_texture(&mut self);

    fn resize(&mut self, viewport: Size);
}

/// Inside-out UV sphere
///
/// Positions are mirrored on X so triangles face the centre, which keeps
/// the panorama's left/right orientation correct for a camera inside.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereMesh {
    pub positions: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl SphereMesh {
    /// Default radius used by the player
    pub const RADIUS: f32 = 500.0;

    pub fn new(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);
        let row = width_segments + 1;

        let mut positions = Vec::with_capacity((row * (height_segments + 1)) as usize);
        let mut uvs = Vec::with_capacity(positions.capacity());

        for iy in 0..=height_segments {
            let v = iy as f32 / height_segments as f32;
            let (sin_v, cos_v) = (v * std::f32::consts::PI).sin_cos();
            for ix in 0..=width_segments {
                let u = ix as f32 / width_segments as f32;
                let (sin_u, cos_u) = (u * std::f32::consts::TAU).sin_cos();
                positions.push([radius * cos_u * sin_v, radius * cos_v, radius * sin_u * sin_v]);
                uvs.push([u, 1.0 - v]);
            }
        }

        let mut indices = Vec::new();
        for iy in 0..height_segments {
            for ix in 0..width_segments {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;
                // Pole rows collapse to single triangles
                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height_segments - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Self {
            positions,
            uvs,
            indices,
        }
    }
}

impl Default for SphereMesh {
    fn default() -> Self {
        Self::new(Self::RADIUS, 60, 40)
    }
}

/// Result of one orientation request or retry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrientOutcome {
    /// Orientation applied
    Applied(ViewAngles),

    /// Camera not ready, another attempt is scheduled
    Retrying,

    /// Attempts exhausted; orientation stays as it was
    GaveUp,

    /// Nothing was pending
    Idle,
}

#[derive(Debug, Clone, Copy)]
enum Orientation {
    /// Yaw only (radians); pitch and roll are kept
    Yaw(f64),
    Full(ViewAngles),
}

#[derive(Debug, Clone, Copy)]
struct PendingOrientation {
    target: Orientation,
    attempts: u32,
}

/// Renderer policies around a [`SceneBackend`]
pub struct SphericalRenderer {
    backend: Box<dyn SceneBackend>,
    fov: FieldOfView,
    orbit_enabled: bool,
    pending: Option<PendingOrientation>,
    retry_interval: Duration,
    max_attempts: u32,
    aspect_ratio: f64,
    container: Option<Size>,
}

impl fmt::Debug for SphericalRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SphericalRenderer")
            .field("fov", &self.fov)
            .field("orbit_enabled", &self.orbit_enabled)
            .field("pending", &self.pending)
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}

impl SphericalRenderer {
    /// Wrap a backend
    ///
    /// # Arguments
    /// * `retry_interval` - Delay between orientation attempts
    /// * `max_attempts` - Orientation attempts per request, first one included
    /// * `aspect_ratio` - Width / height forced while embedded
    pub fn new(
        backend: Box<dyn SceneBackend>,
        retry_interval: Duration,
        max_attempts: u32,
        aspect_ratio: f64,
    ) -> Self {
        Self {
            backend,
            fov: FieldOfView::default(),
            orbit_enabled: true,
            pending: None,
            retry_interval,
            max_attempts: max_attempts.max(1),
            aspect_ratio,
            container: None,
        }
    }

    /// Point the camera at `degrees` of yaw, retrying while the camera is not built
    pub fn set_yaw(&mut self, degrees: f64, now: Duration, timers: &mut TimerQueue) -> OrientOutcome {
        self.request(Orientation::Yaw(degrees.to_radians()), now, timers)
    }

    /// Set the full orientation, retrying while the camera is not built
    pub fn set_view_angles(
        &mut self,
        angles: ViewAngles,
        now: Duration,
        timers: &mut TimerQueue,
    ) -> OrientOutcome {
        self.request(Orientation::Full(angles), now, timers)
    }

    fn request(&mut self, target: Orientation, now: Duration, timers: &mut TimerQueue) -> OrientOutcome {
        timers.cancel(TimerKind::AngleRetry);
        self.pending = Some(PendingOrientation {
            target,
            attempts: 0,
        });
        self.retry_orientation(now, timers)
    }

    /// Make the next attempt for a pending orientation
    ///
    /// Called for the initial request and whenever [`TimerKind::AngleRetry`] fires.
    pub fn retry_orientation(&mut self, now: Duration, timers: &mut TimerQueue) -> OrientOutcome {
        let Some(mut pending) = self.pending.take() else {
            return OrientOutcome::Idle;
        };
        pending.attempts += 1;

        if self.backend.is_camera_ready() {
            let current = self.backend.camera_angles().unwrap_or_default();
            let angles = match pending.target {
                Orientation::Yaw(yaw) => ViewAngles { yaw, ..current },
                Orientation::Full(angles) => angles,
            };
            self.backend.set_camera_angles(angles);
            debug!(attempts = pending.attempts, yaw = angles.yaw, "Camera orientation applied");
            return OrientOutcome::Applied(angles);
        }

        if pending.attempts >= self.max_attempts {
            warn!(attempts = pending.attempts, "Could not orient camera, giving up");
            return OrientOutcome::GaveUp;
        }

        timers.schedule(TimerKind::AngleRetry, now + self.retry_interval);
        self.pending = Some(pending);
        OrientOutcome::Retrying
    }

    /// Attempts made for the pending orientation, if any
    pub fn pending_attempts(&self) -> Option<u32> {
        self.pending.map(|pending| pending.attempts)
    }

    /// Drop a pending orientation and its timer
    pub fn cancel_orientation(&mut self, timers: &mut TimerQueue) {
        self.pending = None;
        timers.cancel(TimerKind::AngleRetry);
    }

    pub fn current_angles(&self) -> Option<ViewAngles> {
        if self.backend.is_camera_ready() {
            self.backend.camera_angles()
        } else {
            None
        }
    }

    pub fn field_of_view(&self) -> FieldOfView {
        self.fov
    }

    /// Set the zoom, clamped to [30, 120] degrees
    pub fn set_field_of_view(&mut self, fov: FieldOfView) {
        self.fov = fov;
        self.backend.set_field_of_view(fov.degrees());
        self.backend.update_projection();
    }

    pub fn set_orbit_enabled(&mut self, enabled: bool) {
        if self.orbit_enabled != enabled {
            self.orbit_enabled = enabled;
            self.backend.set_orbit_enabled(enabled);
        }
    }

    pub fn is_orbit_enabled(&self) -> bool {
        self.orbit_enabled
    }

    /// Forward a drag to the orbit controller unless it is disabled
    pub fn orbit_drag(&mut self, dx: f64, dy: f64) {
        if self.orbit_enabled {
            self.backend.orbit_drag(dx, dy);
        }
    }

    /// Recreate the video texture
    ///
    /// Needed after graphics-context restoration and after resuming on
    /// platforms that stop updating the texture while suspended.
    pub fn rebuild_texture(&mut self) {
        debug!("Rebuilding video texture");
        self.backend.rebuild_video_texture();
    }

    /// Viewport for a container: fullscreen fills it, embedded forces the aspect ratio
    pub fn layout(&self, container: Size, fullscreen: bool) -> Size {
        if fullscreen {
            container
        } else {
            Size::new(container.width, container.width / self.aspect_ratio)
        }
    }

    /// Record the container size and resize the backend
    pub fn resize(&mut self, container: Size, fullscreen: bool) -> Size {
        self.container = Some(container);
        let viewport = self.layout(container, fullscreen);
        self.backend.resize(viewport);
        viewport
    }

    /// Re-run layout for the last known container (fullscreen toggle)
    pub fn relayout(&mut self, fullscreen: bool) -> Option<Size> {
        self.container.map(|container| self.resize(container, fullscreen))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct SceneLog {
        ready: bool,
        angles: ViewAngles,
        fov: Vec<f64>,
        projections: usize,
        textures: usize,
        viewports: Vec<Size>,
    }

    struct Scene(Rc<RefCell<SceneLog>>);

    impl SceneBackend for Scene {
        fn is_camera_ready(&self) -> bool {
            self.0.borrow().ready
        }
        fn camera_angles(&self) -> Option<ViewAngles> {
            let log = self.0.borrow();
            log.ready.then_some(log.angles)
        }
        fn set_camera_angles(&mut self, angles: ViewAngles) {
            self.0.borrow_mut().angles = angles;
        }
        fn set_field_of_view(&mut self, degrees: f64) {
            self.0.borrow_mut().fov.push(degrees);
        }
        fn update_projection(&mut self) {
            self.0.borrow_mut().projections += 1;
        }
        fn set_orbit_enabled(&mut self, _enabled: bool) {}
        fn orbit_drag(&mut self, _dx: f64, _dy: f64) {}
        fn rebuild_video_texture(&mut self) {
            self.0.borrow_mut().textures += 1;
        }
        fn resize(&mut self, viewport: Size) {
            self.0.borrow_mut().viewports.push(viewport);
        }
    }

    fn renderer(log: &Rc<RefCell<SceneLog>>) -> SphericalRenderer {
        SphericalRenderer::new(
            Box::new(Scene(log.clone())),
            Duration::from_millis(100),
            10,
            16.0 / 9.0,
        )
    }

    #[test]
    fn yaw_applies_immediately_when_ready() {
        let log = Rc::new(RefCell::new(SceneLog {
            ready: true,
            angles: ViewAngles::new(0.0, 0.3, 0.0),
            ..Default::default()
        }));
        let mut renderer = renderer(&log);
        let mut timers = TimerQueue::new();

        let outcome = renderer.set_yaw(90.0, Duration::ZERO, &mut timers);
        let OrientOutcome::Applied(angles) = outcome else {
            panic!("expected applied, got {outcome:?}");
        };
        assert!((angles.yaw - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(angles.pitch, 0.3);
        assert!(timers.is_empty());
    }

    #[test]
    fn yaw_retries_until_camera_exists() {
        let log = Rc::new(RefCell::new(SceneLog::default()));
        let mut renderer = renderer(&log);
        let mut timers = TimerQueue::new();

        assert_eq!(
            renderer.set_yaw(45.0, Duration::ZERO, &mut timers),
            OrientOutcome::Retrying
        );
        assert_eq!(
            timers.deadline(TimerKind::AngleRetry),
            Some(Duration::from_millis(100))
        );

        log.borrow_mut().ready = true;
        let outcome = renderer.retry_orientation(Duration::from_millis(100), &mut timers);
        assert!(matches!(outcome, OrientOutcome::Applied(_)));
        assert_eq!(renderer.pending_attempts(), None);
    }

    #[test]
    fn yaw_gives_up_after_cap() {
        let log = Rc::new(RefCell::new(SceneLog::default()));
        let mut renderer = renderer(&log);
        let mut timers = TimerQueue::new();

        let mut now = Duration::ZERO;
        let mut outcome = renderer.set_yaw(45.0, now, &mut timers);
        let mut attempts = 1;
        while outcome == OrientOutcome::Retrying {
            now += Duration::from_millis(100);
            assert_eq!(timers.take_due(now), vec![TimerKind::AngleRetry]);
            outcome = renderer.retry_orientation(now, &mut timers);
            attempts += 1;
        }

        assert_eq!(outcome, OrientOutcome::GaveUp);
        assert_eq!(attempts, 10);
        assert!(!timers.is_scheduled(TimerKind::AngleRetry));
        assert_eq!(renderer.retry_orientation(now, &mut timers), OrientOutcome::Idle);
    }

    #[test]
    fn field_of_view_updates_projection() {
        let log = Rc::new(RefCell::new(SceneLog::default()));
        let mut renderer = renderer(&log);

        renderer.set_field_of_view(FieldOfView::new(150.0));
        renderer.set_field_of_view(FieldOfView::new(60.0));

        assert_eq!(log.borrow().fov, vec![120.0, 60.0]);
        assert_eq!(log.borrow().projections, 2);
        assert_eq!(renderer.field_of_view().degrees(), 60.0);
    }

    #[test]
    fn embedded_layout_forces_aspect_ratio() {
        let log = Rc::new(RefCell::new(SceneLog::default()));
        let mut renderer = renderer(&log);

        let embedded = renderer.resize(Size::new(1600.0, 1200.0), false);
        assert_eq!(embedded, Size::new(1600.0, 900.0));

        let fullscreen = renderer.relayout(true).unwrap();
        assert_eq!(fullscreen, Size::new(1600.0, 1200.0));
        assert_eq!(log.borrow().viewports.len(), 2);
    }

    #[test]
    fn sphere_faces_point_inward() {
        let mesh = SphereMesh::new(1.0, 8, 6);
        assert_eq!(mesh.positions.len(), 9 * 7);
        assert_eq!(mesh.uvs.len(), mesh.positions.len());
        assert_eq!(mesh.indices.len(), (8 * 6 * 2 - 16) * 3);

        for triangle in mesh.indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|i| mesh.positions[triangle[i] as usize]);
            let ab = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
            let ac = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
            let normal = [
                ab[1] * ac[2] - ab[2] * ac[1],
                ab[2] * ac[0] - ab[0] * ac[2],
                ab[0] * ac[1] - ab[1] * ac[0],
            ];
            let centroid = [0, 1, 2].map(|i| (a[i] + b[i] + c[i]) / 3.0);
            let facing: f32 = (0..3).map(|i| normal[i] * centroid[i]).sum();
            assert!(facing < 0.0, "triangle {triangle:?} faces outward");
        }
    }
}
