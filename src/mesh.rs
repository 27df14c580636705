use crate::math::{Aabb, Sphere};
use crate::vec::Vec3;
use crate::vertex::Vertex;

/// An immutable triangle list: three vertices per face, in draw order.
///
/// Bounds are computed once at construction; the bounding sphere is centered
/// on the vertex centroid with the farthest vertex setting the radius.
pub struct Mesh {
    vertices: Vec<Vertex>,
    bbox: Aabb,
    bsphere: Sphere,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>) -> Self {
        assert_eq!(vertices.len() % 3, 0, "vertex count must be a multiple of 3");
        let (bbox, bsphere) = calc_bounds(&vertices);
        Mesh { vertices, bbox, bsphere }
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn bbox(&self) -> Aabb {
        self.bbox
    }

    pub fn bounding_sphere(&self) -> Sphere {
        self.bsphere
    }
}

fn calc_bounds(vertices: &[Vertex]) -> (Aabb, Sphere) {
    let Some(first) = vertices.first() else {
        return (Aabb::default(), Sphere::default());
    };

    let mut vmin = first.position.xyz();
    let mut vmax = vmin;
    let mut center = Vec3::zero();

    for v in vertices {
        let p = v.position.xyz();
        vmin = vmin.min(p);
        vmax = vmax.max(p);
        center += p;
    }
    center /= vertices.len() as f32;

    let mut radius_sq = 0.0f32;
    for v in vertices {
        radius_sq = radius_sq.max((v.position.xyz() - center).mag_sq());
    }

    (
        Aabb { min: vmin, max: vmax },
        Sphere::new(center, radius_sq.sqrt()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec::{Vec2, Vec4};

    fn vert(x: f32, y: f32, z: f32) -> Vertex {
        Vertex::new(
            Vec4::from([x, y, z, 1.0]),
            Vec3::up(),
            Vec2::zero(),
        )
    }

    #[test]
    fn bounds_from_centroid_and_farthest_vertex() {
        let mesh = Mesh::new(vec![
            vert(-1.0, 0.0, 0.0),
            vert(1.0, 0.0, 0.0),
            vert(0.0, 3.0, 0.0),
        ]);
        let s = mesh.bounding_sphere();
        assert_eq!(s.center.to_array(), [0.0, 1.0, 0.0]);
        assert!((s.radius - 2.0).abs() < 1e-6);
        assert_eq!(mesh.bbox().min.to_array(), [-1.0, 0.0, 0.0]);
        assert_eq!(mesh.bbox().max.to_array(), [1.0, 3.0, 0.0]);
    }
}
