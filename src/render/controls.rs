use super::camera::PerspectiveCamera;
use crate::config::CameraConfig;
use glam::{Vec2, Vec3};
use std::f32::consts::{PI, TAU};

const EPS: f32 = 1e-6;

/// Scale applied per wheel notch.
const ZOOM_STEP: f32 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Rotate,
    Pan,
}

/// Orbit a camera around a target: drag to rotate or pan, wheel to dolly.
/// Input accumulates as deltas that `update` bleeds off with damping.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    theta_delta: f32,
    phi_delta: f32,
    scale: f32,
    pan_offset: Vec3,
    drag: Option<(DragMode, Vec2)>,
    disposed: bool,
}

impl OrbitControls {
    pub fn new(target: Vec3, damping_factor: f32) -> Self {
        Self {
            target,
            enable_damping: true,
            damping_factor: damping_factor.clamp(0.0, 1.0),
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            theta_delta: 0.0,
            phi_delta: 0.0,
            scale: 1.0,
            pan_offset: Vec3::ZERO,
            drag: None,
            disposed: false,
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        let mut controls = Self::new(Vec3::from_array(config.target), config.damping_factor);
        controls.min_distance = config.min_distance.max(0.0);
        controls.max_distance = config.max_distance.max(controls.min_distance);
        controls
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn begin_drag(&mut self, mode: DragMode, pointer: Vec2) {
        if self.disposed {
            return;
        }
        self.drag = Some((mode, pointer));
    }

    /// `viewport_height` converts pixels to angles: a full-height drag turns
    /// the camera by a full circle.
    pub fn drag_to(&mut self, pointer: Vec2, camera: &PerspectiveCamera, viewport_height: f32) {
        let Some((mode, last)) = self.drag else {
            return;
        };
        self.drag = Some((mode, pointer));
        if !(viewport_height > 0.0) {
            return;
        }
        let delta = pointer - last;
        match mode {
            DragMode::Rotate => {
                self.theta_delta -= TAU * delta.x / viewport_height * self.rotate_speed;
                self.phi_delta -= TAU * delta.y / viewport_height * self.rotate_speed;
            }
            DragMode::Pan => self.pan(delta, camera, viewport_height),
        }
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Positive `delta_y` (scrolling towards the user) dollies out.
    pub fn wheel(&mut self, delta_y: f32) {
        if self.disposed || delta_y == 0.0 || !delta_y.is_finite() {
            return;
        }
        let step = ZOOM_STEP.powf(self.zoom_speed);
        if delta_y < 0.0 {
            self.scale *= step;
        } else {
            self.scale /= step;
        }
    }

    fn pan(&mut self, delta: Vec2, camera: &PerspectiveCamera, viewport_height: f32) {
        let offset = camera.position - self.target;
        // Half the visible height at the target's depth.
        let half_height = offset.length() * (camera.fov_y_deg.to_radians() * 0.5).tan();
        let forward = (self.target - camera.position).normalize_or_zero();
        let right = forward.cross(camera.up).normalize_or_zero();
        let up = right.cross(forward);
        let scale = 2.0 * half_height / viewport_height * self.pan_speed;
        self.pan_offset += -right * (delta.x * scale) + up * (delta.y * scale);
    }

    /// Apply pending input to the camera. Returns true if the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let offset = camera.position - self.target;
        let radius = offset.length().max(EPS);
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        let factor = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        theta += self.theta_delta * factor;
        phi += self.phi_delta * factor;
        phi = phi
            .clamp(self.min_polar_angle, self.max_polar_angle)
            .clamp(EPS, PI - EPS);
        let radius = (radius * self.scale).clamp(self.min_distance.max(EPS), self.max_distance);
        self.target += self.pan_offset * factor;

        let sin_phi = phi.sin();
        let next = self.target
            + Vec3::new(
                radius * sin_phi * theta.sin(),
                radius * phi.cos(),
                radius * sin_phi * theta.cos(),
            );
        let moved = (next - camera.position).length_squared() > EPS;
        camera.position = next;
        camera.look_at(self.target);

        if self.enable_damping {
            let keep = 1.0 - self.damping_factor;
            self.theta_delta *= keep;
            self.phi_delta *= keep;
            self.pan_offset *= keep;
        } else {
            self.theta_delta = 0.0;
            self.phi_delta = 0.0;
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;
        moved
    }

    /// Stop reacting to input. Safe to call more than once.
    pub fn dispose(&mut self) {
        self.drag = None;
        self.theta_delta = 0.0;
        self.phi_delta = 0.0;
        self.pan_offset = Vec3::ZERO;
        self.scale = 1.0;
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (PerspectiveCamera, OrbitControls) {
        let config = CameraConfig::default();
        (PerspectiveCamera::from_config(&config), OrbitControls::from_config(&config))
    }

    fn azimuth(camera: &PerspectiveCamera) -> f32 {
        camera.position.x.atan2(camera.position.z)
    }

    #[test]
    fn idle_update_keeps_the_camera_still() {
        let (mut camera, mut controls) = setup();
        assert!(!controls.update(&mut camera));
        assert!((camera.position - Vec3::new(0.0, 0.0, 100.0)).length() < 1e-3);
        assert_eq!(camera.target, Vec3::ZERO);
    }

    #[test]
    fn rotation_eases_out_with_damping() {
        let (mut camera, mut controls) = setup();
        controls.begin_drag(DragMode::Rotate, Vec2::ZERO);
        controls.drag_to(Vec2::new(100.0, 0.0), &camera, 500.0);
        controls.end_drag();

        let a0 = azimuth(&camera);
        assert!(controls.update(&mut camera));
        let a1 = azimuth(&camera);
        controls.update(&mut camera);
        let a2 = azimuth(&camera);

        let first = a1 - a0;
        let second = a2 - a1;
        assert!(first < 0.0);
        assert!(second.abs() < first.abs());
        assert!((second / first - 0.95).abs() < 1e-3);
        assert!((camera.position.length() - 100.0).abs() < 1e-2);
    }

    #[test]
    fn wheel_dollies_in_and_out() {
        let (mut camera, mut controls) = setup();
        controls.wheel(1.0);
        controls.update(&mut camera);
        assert!(camera.position.length() > 100.0);

        let (mut camera, mut controls) = setup();
        controls.wheel(-1.0);
        controls.update(&mut camera);
        assert!((camera.position.length() - 95.0).abs() < 1e-2);
    }

    #[test]
    fn polar_angle_never_flips_over_the_pole() {
        let (mut camera, mut controls) = setup();
        controls.enable_damping = false;
        controls.begin_drag(DragMode::Rotate, Vec2::ZERO);
        controls.drag_to(Vec2::new(0.0, 2000.0), &camera, 500.0);
        controls.update(&mut camera);
        assert!(camera.position.is_finite());
        assert!(camera.view().is_finite());
    }

    #[test]
    fn pan_moves_the_target() {
        let (mut camera, mut controls) = setup();
        controls.enable_damping = false;
        controls.begin_drag(DragMode::Pan, Vec2::ZERO);
        controls.drag_to(Vec2::new(50.0, 0.0), &camera, 500.0);
        controls.update(&mut camera);
        // Dragging right drags the world right, so the target moves left.
        assert!(controls.target.x < 0.0);
        assert_eq!(camera.target, controls.target);
    }

    #[test]
    fn disposed_controls_ignore_input() {
        let (mut camera, mut controls) = setup();
        controls.dispose();
        controls.dispose();
        controls.begin_drag(DragMode::Rotate, Vec2::ZERO);
        assert!(!controls.is_dragging());
        controls.wheel(5.0);
        assert!(!controls.update(&mut camera));
        assert!(controls.is_disposed());
    }
}
