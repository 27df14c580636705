//! Triangle clipping: near/far planes in clip space, then the four screen
//! edges after the perspective divide and viewport mapping.
//!
//! Clipping a triangle against six boundaries can produce at most nine
//! vertices; the resulting polygon is retriangulated as a fan anchored on
//! its first vertex. Attribute interpolation treats the whole [`Vertex`] as
//! a linear space, so every channel blends by the same crossing parameter.

use crate::vertex::Vertex;

/// Upper bound on polygon size while clipping one triangle.
pub const MAX_POLY_VERTS: usize = 9;

type Poly = [Vertex; MAX_POLY_VERTS];

/// Clip one triangle and append the fan triangles to `out` as screen-space
/// vertices (`position.w` holding `1/w_clip`). Produces nothing when the
/// triangle is entirely outside.
pub fn clip_triangle(tri: [Vertex; 3], width: f32, height: f32, out: &mut Vec<Vertex>) {
    let mut poly: Poly = [tri[0]; MAX_POLY_VERTS];
    poly[1] = tri[1];
    poly[2] = tri[2];

    let count = clip_depth(&mut poly, 3);
    if count < 3 {
        return;
    }

    for v in &mut poly[..count] {
        perspective_divide(v, width, height);
    }

    let count = clip_screen(&mut poly, count, width, height);
    if count < 3 {
        return;
    }

    // fan anchored on vertex 0
    for i in 1..count - 1 {
        out.push(poly[0]);
        out.push(poly[i]);
        out.push(poly[i + 1]);
    }
}

/// Clip against the near (`z ≥ -w`, homogeneous convention) and far
/// (`z ≤ w`) planes in clip space. Returns the new vertex count.
pub fn clip_depth(verts: &mut Poly, count: usize) -> usize {
    let mut tmp: Poly = [Vertex::default(); MAX_POLY_VERTS];

    let count = clip_pass(
        &verts[..count],
        &mut tmp,
        |v| v.position.z >= -v.position.w,
        |p0, p1| {
            (-p0.position.w - p0.position.z)
                / (p1.position.z - p0.position.z + p1.position.w - p0.position.w)
        },
        |_| {},
    );

    clip_pass(
        &tmp[..count],
        verts,
        |v| v.position.z <= v.position.w,
        |p0, p1| {
            (p0.position.w - p0.position.z)
                / (p1.position.z - p0.position.z - p1.position.w + p0.position.w)
        },
        |_| {},
    )
}

/// Perspective divide and viewport mapping. All attribute channels end up
/// divided by clip `w` and `position.w` becomes `1/w`, so everything stays
/// linear in screen space.
pub fn perspective_divide(v: &mut Vertex, width: f32, height: f32) {
    let zr = 1.0 / v.position.w;
    *v *= zr;
    v.position.x = (v.position.x + 1.0) * 0.5 * width;
    v.position.y = height - (v.position.y + 1.0) * 0.5 * height;
    v.position.w = zr;
}

/// Clip a screen-space polygon against `x ≥ 0`, `x ≤ width`, `y ≥ 0` and
/// `y ≤ height`. Crossing vertices are snapped exactly onto the boundary.
pub fn clip_screen(verts: &mut Poly, count: usize, width: f32, height: f32) -> usize {
    let mut tmp: Poly = [Vertex::default(); MAX_POLY_VERTS];

    let count = clip_pass(
        &verts[..count],
        &mut tmp,
        |v| v.position.x >= 0.0,
        |p0, p1| (0.0 - p0.position.x) / (p1.position.x - p0.position.x),
        |v| v.position.x = 0.0,
    );

    let count = clip_pass(
        &tmp[..count],
        verts,
        |v| v.position.x <= width,
        |p0, p1| (width - p0.position.x) / (p1.position.x - p0.position.x),
        |v| v.position.x = width,
    );

    let count = clip_pass(
        &verts[..count],
        &mut tmp,
        |v| v.position.y >= 0.0,
        |p0, p1| (0.0 - p0.position.y) / (p1.position.y - p0.position.y),
        |v| v.position.y = 0.0,
    );

    clip_pass(
        &tmp[..count],
        verts,
        |v| v.position.y <= height,
        |p0, p1| (height - p0.position.y) / (p1.position.y - p0.position.y),
        |v| v.position.y = height,
    )
}

/// One Sutherland-Hodgman pass. `crossing` yields the parameter `t` of the
/// boundary crossing on the edge `p0 → p1`; `snap` pins the new vertex onto
/// the boundary to keep later passes exact.
fn clip_pass(
    input: &[Vertex],
    out: &mut Poly,
    inside: impl Fn(&Vertex) -> bool,
    crossing: impl Fn(&Vertex, &Vertex) -> f32,
    snap: impl Fn(&mut Vertex),
) -> usize {
    let mut new_count = 0;
    for i in 0..input.len() {
        let p0 = &input[i];
        let p1 = &input[(i + 1) % input.len()];

        let in0 = inside(p0);
        let in1 = inside(p1);

        if in0 != in1 {
            let t = crossing(p0, p1);
            let mut v = *p0 + (*p1 - *p0) * t;
            snap(&mut v);
            out[new_count] = v;
            new_count += 1;
        }

        if in1 {
            out[new_count] = *p1;
            new_count += 1;
        }
    }
    new_count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec::{Vec2, Vec3, Vec4};

    fn vert(pos: [f32; 4], uv: [f32; 2]) -> Vertex {
        Vertex::new(Vec4::from(pos), Vec3::up(), Vec2::from(uv))
    }

    fn screen_vert(x: f32, y: f32) -> Vertex {
        vert([x, y, 0.0, 1.0], [0.0, 0.0])
    }

    #[test]
    fn near_plane_split_produces_a_quad() {
        // one vertex behind the near plane, two in front, symmetric in
        // z + w, so both crossings happen at t = 0.5
        let mut poly: [Vertex; MAX_POLY_VERTS] = [vert([0.0, 0.0, -1.0, 0.5], [0.0, 0.0]); 9];
        poly[1] = vert([-1.0, 0.0, 0.0, 0.5], [0.0, 1.0]);
        poly[2] = vert([1.0, 0.0, 0.0, 0.5], [1.0, 1.0]);

        let count = clip_depth(&mut poly, 3);
        assert_eq!(count, 4);

        // interpolated texcoords on the two new vertices are the halfway
        // blends of the edges that crossed
        let uvs: Vec<[f32; 2]> = poly[..count].iter().map(|v| v.texcoord.to_array()).collect();
        assert!(uvs.contains(&[0.0, 0.5]));
        assert!(uvs.contains(&[0.5, 0.5]));
    }

    #[test]
    fn fully_behind_produces_nothing() {
        let tri = [
            vert([0.0, 0.0, -2.0, 1.0], [0.0, 0.0]),
            vert([1.0, 0.0, -2.0, 1.0], [0.0, 0.0]),
            vert([0.0, 1.0, -2.0, 1.0], [0.0, 0.0]),
        ];
        let mut out = Vec::new();
        clip_triangle(tri, 10.0, 10.0, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn screen_clip_confines_to_viewport() {
        // spills over the left and top edges of a 10x10 viewport
        let mut poly: [Vertex; MAX_POLY_VERTS] = [screen_vert(-10.0, 5.0); 9];
        poly[1] = screen_vert(5.0, -10.0);
        poly[2] = screen_vert(5.0, 5.0);

        let count = clip_screen(&mut poly, 3, 10.0, 10.0);
        assert!(count >= 3);
        for v in &poly[..count] {
            assert!(v.position.x >= 0.0 && v.position.x <= 10.0);
            assert!(v.position.y >= 0.0 && v.position.y <= 10.0);
        }
        // boundary vertices snapped exactly
        assert!(poly[..count].iter().any(|v| v.position.x == 0.0));
        assert!(poly[..count].iter().any(|v| v.position.y == 0.0));
    }

    #[test]
    fn inside_triangle_is_unchanged() {
        let tri = [
            vert([0.0, 0.0, 0.5, 1.0], [0.0, 0.0]),
            vert([0.5, 0.0, 0.5, 1.0], [1.0, 0.0]),
            vert([0.0, 0.5, 0.5, 1.0], [0.0, 1.0]),
        ];
        let mut out = Vec::new();
        clip_triangle(tri, 100.0, 100.0, &mut out);
        assert_eq!(out.len(), 3);
        // perspective divide happened: w is now 1/w_clip
        assert_eq!(out[0].position.w, 1.0);
        assert_eq!(out[0].position.x, 50.0);
    }

    #[test]
    fn clipping_against_an_edge_keeps_attributes_linear() {
        // edge from x = -5 to x = 5 crossing the left screen edge at t = 0.5
        let mut poly: [Vertex; MAX_POLY_VERTS] = [vert([-5.0, 0.0, 0.0, 1.0], [0.0, 0.0]); 9];
        poly[1] = vert([5.0, 0.0, 0.0, 1.0], [1.0, 0.0]);
        poly[2] = vert([5.0, 8.0, 0.0, 1.0], [1.0, 1.0]);

        let count = clip_screen(&mut poly, 3, 10.0, 10.0);
        let crossed = poly[..count]
            .iter()
            .find(|v| v.position.x == 0.0 && v.position.y == 0.0)
            .expect("crossing vertex");
        assert!((crossed.texcoord.x - 0.5).abs() < 1e-6);
    }
}
