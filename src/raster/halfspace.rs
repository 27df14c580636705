//! Edge-function rasterizer.
//!
//! The three edge functions `E_i(x, y) = Dx_i·y − Dy_i·x + C_i` are set up
//! once per triangle; rows derive their values directly from the
//! triangle's own top-left corner and columns step incrementally by
//! `−Dy_i`. Deriving rows from the triangle (rather than accumulating
//! from the strip's first row) keeps every pixel's value a pure function
//! of the triangle and `(x, y)`, so any strip partition produces
//! bit-identical output.
//!
//! A pixel center `(x + 0.5, y + 0.5)` is covered when all three biased
//! values share a sign: positive for front faces, negative for back faces
//! (the bias tie-breaks shared edges per the top-left rule; the back-face
//! test flips the comparison and negates the bias, so boundary pixels
//! land on exactly one side).

use crate::math::{is_top_left, Rect};
use crate::scene::CullMode;
use crate::shader::Shader;
use crate::texture::Texture;
use crate::vec::Vec2;
use crate::vertex::Vertex;

use super::{extrapolate_plane, shade_fragment, RasterTarget, SampleLayout};

/// Rotated-grid sample positions relative to the pixel center.
const MSAA_OFFSETS: [[f32; 2]; 4] = [
    [0.375, -0.125],
    [-0.125, -0.375],
    [-0.375, 0.125],
    [0.125, 0.375],
];

struct Edges {
    dx: [f32; 3],
    dy: [f32; 3],
    bias: [f32; 3],
    accept_pos: bool,
    accept_neg: bool,
}

impl Edges {
    #[inline(always)]
    fn covered(&self, e: [f32; 3]) -> bool {
        let b = &self.bias;
        // back faces flip the comparison and negate the bias, so a pixel
        // exactly on a shared edge is claimed by exactly one triangle of
        // either facing
        (self.accept_pos && e[0] + b[0] > 0.0 && e[1] + b[1] > 0.0 && e[2] + b[2] > 0.0)
            || (self.accept_neg && e[0] - b[0] < 0.0 && e[1] - b[1] < 0.0 && e[2] - b[2] < 0.0)
    }
}

struct Span {
    /// Triangle bounding box; x already equals the clamped range, y is the
    /// triangle's own top row that row offsets are measured from.
    min_x: i32,
    min_y: i32,
    max_x: i32,
    /// Strip-clamped row range actually walked.
    y_begin: i32,
    y_end: i32,
    e0: [f32; 3],
    v00: Vertex,
    x_delta: Vertex,
    y_delta: Vertex,
}

pub(crate) fn rasterize(
    rect: Rect,
    v0: &Vertex,
    v1: &Vertex,
    v2: &Vertex,
    shader: &dyn Shader,
    texture: &Texture,
    cull_mode: CullMode,
    target: &RasterTarget,
) {
    if rect.is_empty() {
        return;
    }

    let p0 = v0.position.xy();
    let p1 = v1.position.xy();
    let p2 = v2.position.xy();

    // clipping already confined the triangle to the screen, so only the
    // row range needs the strip clamp
    let min_x = p0.x.min(p1.x).min(p2.x).ceil() as i32;
    let min_y = p0.y.min(p1.y).min(p2.y).ceil() as i32;
    let max_x = (p0.x.max(p1.x).max(p2.x).ceil() as i32).min(rect.right());
    let max_y = (p0.y.max(p1.y).max(p2.y).ceil() as i32).min(rect.bottom());

    let y_begin = min_y.max(rect.y);
    let y_end = max_y;

    if max_x - min_x < 1 || max_y - min_y < 1 || y_end <= y_begin {
        return;
    }

    let corner = Vec2::from([min_x as f32 + 0.5, min_y as f32 + 0.5]);
    let Some((v00, x_delta, y_delta)) = extrapolate_plane(v0, v1, v2, corner) else {
        return;
    };

    // edge i runs from vertex i to vertex i+1
    let dx = [p0.x - p1.x, p1.x - p2.x, p2.x - p0.x];
    let dy = [p0.y - p1.y, p1.y - p2.y, p2.y - p0.y];
    let c = [
        dy[0] * p0.x - dx[0] * p0.y,
        dy[1] * p1.x - dx[1] * p1.y,
        dy[2] * p2.x - dx[2] * p2.y,
    ];

    let mut bias = [0.0f32; 3];
    for i in 0..3 {
        if is_top_left(Vec2::from([dx[i], dy[i]])) {
            bias[i] = f32::EPSILON;
        }
    }

    let edges = Edges {
        dx,
        dy,
        bias,
        accept_pos: cull_mode != CullMode::Front,
        accept_neg: cull_mode != CullMode::Back,
    };

    // edge values at the triangle's first pixel center
    let e0 = [
        dx[0] * corner.y - dy[0] * corner.x + c[0],
        dx[1] * corner.y - dy[1] * corner.x + c[1],
        dx[2] * corner.y - dy[2] * corner.x + c[2],
    ];

    let span = Span {
        min_x,
        min_y,
        max_x,
        y_begin,
        y_end,
        e0,
        v00,
        x_delta,
        y_delta,
    };

    match target.layout {
        SampleLayout::Msaa4 => fill_msaa(span, &edges, shader, texture, target),
        _ => fill_single(span, &edges, shader, texture, target),
    }
}

fn fill_single(
    span: Span,
    edges: &Edges,
    shader: &dyn Shader,
    texture: &Texture,
    target: &RasterTarget,
) {
    let Span { min_x, min_y, max_x, y_begin, y_end, e0, v00, x_delta, y_delta } = span;

    for y in y_begin..y_end {
        let row = (y - min_y) as f32;
        let yv = v00 + y_delta * row;
        let mut e = [
            e0[0] + edges.dx[0] * row,
            e0[1] + edges.dx[1] * row,
            e0[2] + edges.dx[2] * row,
        ];
        let mut x = min_x;

        // scan from the left until the triangle is entered
        while x < max_x && !edges.covered(e) {
            for i in 0..3 {
                e[i] -= edges.dy[i];
            }
            x += 1;
        }

        let mut xv = yv + x_delta * (x - min_x) as f32;

        // walk the covered span; once the triangle is left, the row is done
        while x < max_x && edges.covered(e) {
            let offset = target.pixel_offset(x, y);
            let depth = xv.position.w;
            if depth > target.depth.get(offset) {
                if let Some(bits) = shade_fragment(
                    &xv,
                    xv + x_delta,
                    xv + y_delta,
                    shader,
                    texture,
                    target.mipmaps_enabled,
                ) {
                    target.color.set(offset, bits);
                    target.depth.set(offset, depth);
                }
            }

            xv += x_delta;
            for i in 0..3 {
                e[i] -= edges.dy[i];
            }
            x += 1;
        }
    }
}

/// MSAA rows never early-out on the right: partially covered pixels can
/// reappear after the center leaves the triangle, and cutting the row
/// short makes thin geometry flicker.
fn fill_msaa(
    span: Span,
    edges: &Edges,
    shader: &dyn Shader,
    texture: &Texture,
    target: &RasterTarget,
) {
    let Span { min_x, min_y, max_x, y_begin, y_end, e0, v00, x_delta, y_delta } = span;

    for y in y_begin..y_end {
        let row = (y - min_y) as f32;
        let mut xv = v00 + y_delta * row;
        let mut e = [
            e0[0] + edges.dx[0] * row,
            e0[1] + edges.dx[1] * row,
            e0[2] + edges.dx[2] * row,
        ];

        for x in min_x..max_x {
            let mut coverage = 0u32;
            for (s, &[ox, oy]) in MSAA_OFFSETS.iter().enumerate() {
                let es = [
                    e[0] + edges.dx[0] * oy - edges.dy[0] * ox,
                    e[1] + edges.dx[1] * oy - edges.dy[1] * ox,
                    e[2] + edges.dx[2] * oy - edges.dy[2] * ox,
                ];
                if edges.covered(es) {
                    coverage |= 1 << s;
                }
            }

            if coverage != 0 {
                let base = target.color.sample_offset(x as usize, y as usize, 0);

                let mut depth_pass = 0u32;
                let mut sample_depth = [0.0f32; 4];
                for (s, &[ox, oy]) in MSAA_OFFSETS.iter().enumerate() {
                    if coverage & (1 << s) == 0 {
                        continue;
                    }
                    let w = xv.position.w
                        + x_delta.position.w * ox
                        + y_delta.position.w * oy;
                    if w > target.depth.get(base + s) {
                        depth_pass |= 1 << s;
                        sample_depth[s] = w;
                    }
                }

                let write = coverage & depth_pass;
                if write != 0 {
                    // one fragment shade per pixel, at the center
                    if let Some(bits) = shade_fragment(
                        &xv,
                        xv + x_delta,
                        xv + y_delta,
                        shader,
                        texture,
                        target.mipmaps_enabled,
                    ) {
                        for s in 0..4 {
                            if write & (1 << s) != 0 {
                                target.color.set(base + s, bits);
                                target.depth.set(base + s, sample_depth[s]);
                            }
                        }
                    }
                }
            }

            xv += x_delta;
            for i in 0..3 {
                e[i] -= edges.dy[i];
            }
        }
    }
}
