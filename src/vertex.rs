use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Sub, SubAssign};

use crate::vec::{Vec2, Vec3, Vec4};

/// One vertex flowing through the pipeline.
///
/// Every channel blends by the same scalar, so a `Vertex` behaves as a
/// linear vector space: clipping, edge stepping and barycentric
/// extrapolation all operate on whole vertices. After the perspective
/// divide, `position.w` carries `1/w_clip`, which keeps every channel
/// (each stored pre-divided by `w_clip`) linearly interpolable in screen
/// space.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vertex {
    pub position: Vec4,
    pub normal: Vec3,
    pub texcoord: Vec2,
    pub world_pos: Vec3,
}

impl Vertex {
    pub fn new(position: Vec4, normal: Vec3, texcoord: Vec2) -> Self {
        Vertex {
            position,
            normal,
            texcoord,
            world_pos: position.xyz(),
        }
    }

    pub fn with_world_pos(mut self, world_pos: Vec3) -> Self {
        self.world_pos = world_pos;
        self
    }
}

impl Add for Vertex {
    type Output = Vertex;

    fn add(self, other: Vertex) -> Vertex {
        Vertex {
            position: self.position + other.position,
            normal: self.normal + other.normal,
            texcoord: self.texcoord + other.texcoord,
            world_pos: self.world_pos + other.world_pos,
        }
    }
}

impl Sub for Vertex {
    type Output = Vertex;

    fn sub(self, other: Vertex) -> Vertex {
        Vertex {
            position: self.position - other.position,
            normal: self.normal - other.normal,
            texcoord: self.texcoord - other.texcoord,
            world_pos: self.world_pos - other.world_pos,
        }
    }
}

impl Mul<f32> for Vertex {
    type Output = Vertex;

    fn mul(self, scale: f32) -> Vertex {
        Vertex {
            position: self.position * scale,
            normal: self.normal * scale,
            texcoord: self.texcoord * scale,
            world_pos: self.world_pos * scale,
        }
    }
}

impl Div<f32> for Vertex {
    type Output = Vertex;

    fn div(self, denom: f32) -> Vertex {
        self * (1.0 / denom)
    }
}

impl AddAssign for Vertex {
    fn add_assign(&mut self, other: Vertex) {
        *self = *self + other;
    }
}

impl SubAssign for Vertex {
    fn sub_assign(&mut self, other: Vertex) {
        *self = *self - other;
    }
}

impl MulAssign<f32> for Vertex {
    fn mul_assign(&mut self, scale: f32) {
        *self = *self * scale;
    }
}

impl DivAssign<f32> for Vertex {
    fn div_assign(&mut self, denom: f32) {
        *self = *self / denom;
    }
}
