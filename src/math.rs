use crate::vec::{Mat4x4, Num, Vec, Vec2, Vec3, Vec4};

/// Three times `f32::EPSILON`, the slack used when classifying horizontal
/// edges and degenerate spans.
pub const FLOAT_TOLERANCE: f32 = f32::EPSILON * 3.0;

/// A strip of the framebuffer handed to one worker for a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Rect { x, y, w, h }
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }
}

/// Plane in constant-normal form `a·x + b·y + c·z + d = 0`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Plane {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
}

impl Plane {
    pub fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Plane { a, b, c, d }
    }

    pub fn normalize(&mut self) {
        let len = (self.a * self.a + self.b * self.b + self.c * self.c).sqrt();
        if len > f32::EPSILON {
            let inv = 1.0 / len;
            self.a *= inv;
            self.b *= inv;
            self.c *= inv;
            self.d *= inv;
        }
    }

    pub fn distance(&self, point: Vec3) -> f32 {
        point.x * self.a + point.y * self.b + point.z * self.c + self.d
    }

    pub fn in_back(&self, sphere: &Sphere) -> bool {
        self.distance(sphere.center) < -sphere.radius
    }
}

impl From<Vec4> for Plane {
    fn from(v: Vec4) -> Self {
        Plane::new(v.x, v.y, v.z, v.w)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Sphere { center, radius }
    }
}

/// Axis-aligned box in model space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

/// Extract the six planes of the view volume of a view-projection matrix by
/// adding/subtracting its rows (the usual row-derivation for column-vector
/// matrices with depth in `[0, 1]`). Planes are normalized and face inward:
/// a point inside the volume has non-negative distance to all six.
pub fn extract_frustum(m: &Mat4x4) -> [Plane; 6] {
    let row = |i: usize| Vec4::from([m[(i, 0)], m[(i, 1)], m[(i, 2)], m[(i, 3)]]);
    let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

    let mut planes = [
        Plane::from(r3 + r0), // left
        Plane::from(r3 - r0), // right
        Plane::from(r3 + r1), // bottom
        Plane::from(r3 - r1), // top
        Plane::from(r2),      // near (depth starts at zero)
        Plane::from(r3 - r2), // far
    ];
    for plane in &mut planes {
        plane.normalize();
    }
    planes
}

/// View matrix for an eye at `position` looking along `forward`
/// (left-handed, +y up unless `forward` is nearly vertical).
pub fn look_toward(position: Vec3, forward: Vec3) -> Mat4x4 {
    let forward = forward.normalized();
    let world_up = if forward.y.abs() > 0.999 {
        Vec3::right()
    } else {
        Vec3::up()
    };
    let right = world_up.cross(forward).normalized();
    let up = forward.cross(right);

    Mat4x4::from([
        [right.x, right.y, right.z, -right.dot(position)],
        [up.x, up.y, up.z, -up.dot(position)],
        [forward.x, forward.y, forward.z, -forward.dot(position)],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

/// Oriented area of the parallelogram spanned by `to - from` and `p - from`.
/// Twice the signed area of the triangle `(from, to, p)`; the sign encodes
/// which side of the edge `p` falls on.
pub fn orient_2d<T: Num>(from: Vec<T, 2>, to: Vec<T, 2>, p: Vec<T, 2>) -> T {
    let u = to - from;
    let v = p - from;
    u.x * v.y - u.y * v.x
}

/// Check if an edge is a top or left edge, according to D3D10.
///
/// > A top edge, is an edge that is exactly horizontal and is above the
/// > other edges. A left edge, is an edge that is not exactly horizontal and
/// > is on the left side of the triangle.
///
/// Pixels exactly on a shared edge belong to the triangle whose edge is top
/// or left, so abutting triangles never double-fill nor leave holes.
///
/// `d` is the `(Dx, Dy)` of the edge function, i.e. edge start minus edge
/// end. Screen space is y-down and inside is the positive side, which makes
/// an edge descending towards its end a left edge and a leftward horizontal
/// edge a top edge.
pub fn is_top_left(d: Vec2) -> bool {
    d.y < 0.0 || (d.y.abs() < FLOAT_TOLERANCE && d.x > 0.0)
}

/// `(value - min) / (max - min)` clamped to `[0, 1]`.
pub fn normalized_clamp(value: f32, min: f32, max: f32) -> f32 {
    if max - min < f32::EPSILON {
        return if value < min { 0.0 } else { 1.0 };
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec::Vec2i;

    #[test]
    fn orientation_sign() {
        let a = Vec2i::from([0, 0]);
        let b = Vec2i::from([4, 0]);
        assert!(orient_2d(a, b, Vec2i::from([2, 2])) > 0);
        assert!(orient_2d(a, b, Vec2i::from([2, -2])) < 0);
        assert_eq!(orient_2d(a, b, Vec2i::from([2, 0])), 0);
    }

    #[test]
    fn normalized_clamp_saturates() {
        assert_eq!(normalized_clamp(1.0, 2.0, 4.0), 0.0);
        assert_eq!(normalized_clamp(3.0, 2.0, 4.0), 0.5);
        assert_eq!(normalized_clamp(9.0, 2.0, 4.0), 1.0);
    }
}
