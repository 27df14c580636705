use crate::vec::{Mat4x4, Vec3};

/// Translation/rotation/scale with a monotonically increasing version.
///
/// Anything caching matrices derived from a transform (the camera, chiefly)
/// snapshots [`Transform::version`] and recomputes when it has advanced;
/// there is no observer registration.
#[derive(Clone, Debug)]
pub struct Transform {
    position: Vec3,
    rotation: Vec3, // Euler angles in degrees, applied x, then y, then z
    scale: Vec3,
    version: u64,
}

impl Default for Transform {
    fn default() -> Self {
        Transform {
            position: Vec3::zero(),
            rotation: Vec3::zero(),
            scale: Vec3::one(),
            version: 1,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.version += 1;
    }

    pub fn set_rotation(&mut self, euler_deg: Vec3) {
        self.rotation = euler_deg;
        self.version += 1;
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.version += 1;
    }

    fn rotation_matrix(&self) -> Mat4x4 {
        self.rotation.map(|deg| deg.to_radians()).to_rotation()
    }

    pub fn forward(&self) -> Vec3 {
        (self.rotation_matrix() * Vec3::forward().to_hom()).xyz()
    }

    pub fn right(&self) -> Vec3 {
        (self.rotation_matrix() * Vec3::right().to_hom()).xyz()
    }

    pub fn up(&self) -> Vec3 {
        (self.rotation_matrix() * Vec3::up().to_hom()).xyz()
    }

    pub fn matrix(&self) -> Mat4x4 {
        self.position.to_translation() * self.rotation_matrix() * self.scale.to_scale()
    }

    /// Inverse built from the inverted components, avoiding a general 4×4
    /// inversion.
    pub fn inverse_matrix(&self) -> Mat4x4 {
        let inv_scale = Vec3::from([1.0 / self.scale.x, 1.0 / self.scale.y, 1.0 / self.scale.z]);
        inv_scale.to_scale() * self.rotation_matrix().transpose() * (-self.position).to_translation()
    }
}
