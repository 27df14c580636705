use std::cell::RefCell;

use crate::math::{extract_frustum, Plane, Sphere};
use crate::transform::Transform;
use crate::vec::Mat4x4;

/// Perspective camera with a lazily derived view-projection matrix and
/// frustum.
///
/// The cached matrices are recomputed whenever a projection parameter
/// changes or the transform's version has advanced since the last
/// derivation.
pub struct Camera {
    pub transform: Transform,
    fov: f32,
    aspect: f32,
    near: f32,
    far: f32,
    params_version: u64,
    cache: RefCell<Cache>,
}

struct Cache {
    params_version: u64,
    transform_version: u64,
    projection: Mat4x4,
    view_projection: Mat4x4,
    frustum: [Plane; 6],
}

impl Camera {
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        Camera {
            transform: Transform::new(),
            fov,
            aspect,
            near,
            far,
            params_version: 1,
            cache: RefCell::new(Cache {
                params_version: 0,
                transform_version: 0,
                projection: Mat4x4::identity(),
                view_projection: Mat4x4::identity(),
                frustum: [Plane::default(); 6],
            }),
        }
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect
    }

    pub fn near_plane(&self) -> f32 {
        self.near
    }

    pub fn far_plane(&self) -> f32 {
        self.far
    }

    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov;
        self.params_version += 1;
    }

    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.params_version += 1;
    }

    pub fn set_near_plane(&mut self, near: f32) {
        self.near = near;
        self.params_version += 1;
    }

    pub fn set_far_plane(&mut self, far: f32) {
        self.far = far;
        self.params_version += 1;
    }

    pub fn projection_matrix(&self) -> Mat4x4 {
        self.update();
        self.cache.borrow().projection
    }

    /// `projection * inverse(world transform)`.
    pub fn vp_matrix(&self) -> Mat4x4 {
        self.update();
        self.cache.borrow().view_projection
    }

    /// False iff the sphere lies entirely behind one of the six frustum
    /// planes. Degenerate spheres are never visible.
    pub fn can_see(&self, bounds: &Sphere) -> bool {
        if bounds.radius < f32::EPSILON {
            return false;
        }
        self.update();
        let cache = self.cache.borrow();
        cache.frustum.iter().all(|plane| !plane.in_back(bounds))
    }

    fn update(&self) {
        let mut cache = self.cache.borrow_mut();
        let params_stale = cache.params_version != self.params_version;
        let view_stale = params_stale || cache.transform_version != self.transform.version();
        if params_stale {
            cache.projection = Mat4x4::perspective(self.fov, self.aspect, self.near, self.far);
            cache.params_version = self.params_version;
        }
        if view_stale {
            cache.view_projection = cache.projection * self.transform.inverse_matrix();
            cache.frustum = extract_frustum(&cache.view_projection);
            cache.transform_version = self.transform.version();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec::Vec3;

    fn camera_at_origin() -> Camera {
        Camera::new(90.0, 1.0, 0.1, 100.0)
    }

    #[test]
    fn sees_sphere_in_front() {
        let cam = camera_at_origin();
        assert!(cam.can_see(&Sphere::new(Vec3::from([0.0, 0.0, 10.0]), 1.0)));
    }

    #[test]
    fn culls_sphere_behind() {
        let cam = camera_at_origin();
        assert!(!cam.can_see(&Sphere::new(Vec3::from([0.0, 0.0, -10.0]), 1.0)));
    }

    #[test]
    fn sphere_straddling_a_plane_is_visible() {
        let cam = camera_at_origin();
        // far to the left but big enough to poke into the frustum
        assert!(cam.can_see(&Sphere::new(Vec3::from([-12.0, 0.0, 10.0]), 5.0)));
        assert!(!cam.can_see(&Sphere::new(Vec3::from([-120.0, 0.0, 10.0]), 5.0)));
    }

    #[test]
    fn degenerate_sphere_is_never_visible() {
        let cam = camera_at_origin();
        assert!(!cam.can_see(&Sphere::new(Vec3::from([0.0, 0.0, 10.0]), 0.0)));
    }

    #[test]
    fn moving_the_camera_invalidates_the_frustum() {
        let mut cam = camera_at_origin();
        let target = Sphere::new(Vec3::from([0.0, 0.0, 10.0]), 1.0);
        assert!(cam.can_see(&target));
        cam.transform.set_rotation(Vec3::from([0.0, 180.0, 0.0]));
        assert!(!cam.can_see(&target));
    }
}
