use super::pick::Ray;
use crate::config::CameraConfig;
use glam::{Mat4, Vec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    aspect: f32,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov_y_deg: f32, near: f32, far: f32, position: Vec3, target: Vec3) -> Self {
        let mut camera = Self {
            fov_y_deg,
            near,
            far,
            position,
            target,
            up: Vec3::Y,
            aspect: 1.0,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection();
        camera
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(
            config.fov_deg,
            config.near,
            config.far,
            Vec3::from_array(config.position),
            Vec3::from_array(config.target),
        )
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Returns false (and leaves the projection alone) for a degenerate size.
    pub fn set_aspect(&mut self, width: f32, height: f32) -> bool {
        match aspect_ratio(width, height) {
            Some(aspect) => {
                self.aspect = aspect;
                self.update_projection();
                true
            }
            None => false,
        }
    }

    pub fn update_projection(&mut self) {
        self.projection =
            Mat4::perspective_rh(self.fov_y_deg.to_radians(), self.aspect, self.near, self.far);
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view()
    }

    /// World-space ray from the eye through a point in normalized device
    /// coordinates.
    pub fn ray_through_ndc(&self, ndc: Vec2) -> Ray {
        let inverse = self.view_projection().inverse();
        let near = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
        let far = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        Ray::new(self.position, far - near)
    }
}

pub fn aspect_ratio(width: f32, height: f32) -> Option<f32> {
    let valid = width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0;
    valid.then(|| width / height)
}

/// Container-relative pixels to NDC: x right in [-1, 1], y up in [-1, 1].
pub fn pointer_to_ndc(x: f32, y: f32, width: f32, height: f32) -> Option<Vec2> {
    aspect_ratio(width, height)?;
    Some(Vec2::new(x / width * 2.0 - 1.0, -(y / height) * 2.0 + 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn center_ray_points_at_the_target() {
        let camera = PerspectiveCamera::from_config(&CameraConfig::default());
        let ray = camera.ray_through_ndc(Vec2::ZERO);
        assert_eq!(ray.origin, Vec3::new(0.0, 0.0, 100.0));
        assert!(approx(ray.direction, Vec3::NEG_Z));
    }

    #[test]
    fn edge_rays_span_the_vertical_fov() {
        let mut camera = PerspectiveCamera::new(90.0, 0.1, 100.0, Vec3::ZERO, Vec3::NEG_Z);
        camera.set_aspect(1.0, 1.0);
        let ray = camera.ray_through_ndc(Vec2::new(0.0, 1.0));
        // 45 degrees above the view axis
        assert!(approx(ray.direction, Vec3::new(0.0, 1.0, -1.0).normalize()));
    }

    #[test]
    fn degenerate_sizes_keep_the_previous_aspect() {
        let mut camera = PerspectiveCamera::from_config(&CameraConfig::default());
        assert!(camera.set_aspect(800.0, 400.0));
        assert_eq!(camera.aspect(), 2.0);
        let projection = camera.projection();

        assert!(!camera.set_aspect(0.0, 400.0));
        assert!(!camera.set_aspect(800.0, 0.0));
        assert!(!camera.set_aspect(f32::NAN, 1.0));
        assert_eq!(camera.aspect(), 2.0);
        assert_eq!(camera.projection(), projection);
    }

    #[test]
    fn pointer_maps_to_ndc_corners() {
        assert_eq!(pointer_to_ndc(0.0, 0.0, 800.0, 600.0), Some(Vec2::new(-1.0, 1.0)));
        assert_eq!(pointer_to_ndc(800.0, 600.0, 800.0, 600.0), Some(Vec2::new(1.0, -1.0)));
        assert_eq!(pointer_to_ndc(400.0, 300.0, 800.0, 600.0), Some(Vec2::ZERO));
        assert_eq!(pointer_to_ndc(10.0, 10.0, 0.0, 600.0), None);
    }
}
