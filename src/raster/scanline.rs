//! Scanline rasterizer.
//!
//! Vertices are sorted by ascending y and the triangle is split at the
//! middle vertex into a flat-bottom and a flat-top half. Each half steps a
//! left and a right edge vertex down the rows and a fragment vertex across
//! each span. Rows cover `[ceil(y_top), ceil(y_bottom))` and spans
//! `[ceil(x_left), ceil(x_right))`, so abutting triangles partition shared
//! edges exactly.

use crate::math::{orient_2d, Rect, FLOAT_TOLERANCE};
use crate::scene::CullMode;
use crate::shader::Shader;
use crate::texture::Texture;
use crate::vertex::Vertex;

use super::{shade_fragment, RasterTarget};

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

    // signed area in screen space decides the facing
    let area2 = orient_2d(v0.position.xy(), v1.position.xy(), v2.position.xy());
    match cull_mode {
        CullMode::Back if area2 > 0.0 => return,
        CullMode::Front if area2 < 0.0 => return,
        _ => {}
    }

    let mut v0 = *v0;
    let mut v1 = *v1;
    let mut v2 = *v2;

    if v2.position.y < v1.position.y {
        std::mem::swap(&mut v2, &mut v1);
    }
    if v2.position.y < v0.position.y {
        std::mem::swap(&mut v2, &mut v0);
    }
    if v1.position.y < v0.position.y {
        std::mem::swap(&mut v1, &mut v0);
    }

    let total_rise = v2.position.y - v0.position.y;
    if total_rise < FLOAT_TOLERANCE {
        return;
    }

    // split the long edge at the middle vertex's height
    let t = (v1.position.y - v0.position.y) / total_rise;
    let center = v0 + (v2 - v0) * t;

    if v1.position.y - v0.position.y >= 1e-5 {
        if center.position.x < v1.position.x {
            fill_half(rect, &v0, &center, &v1, true, shader, texture, target);
        } else {
            fill_half(rect, &v0, &v1, &center, true, shader, texture, target);
        }
    }

    if v2.position.y - v1.position.y >= 1e-5 {
        if center.position.x < v1.position.x {
            fill_half(rect, &center, &v1, &v2, false, shader, texture, target);
        } else {
            fill_half(rect, &v1, &center, &v2, false, shader, texture, target);
        }
    }
}

/// Fill one flat half-triangle. For `is_top` the shape is an apex `v0` over
/// the bottom edge `v1 → v2` (left to right); otherwise a top edge
/// `v0 → v1` over the apex `v2`.
#[allow(clippy::too_many_arguments)]
fn fill_half(
    rect: Rect,
    v0: &Vertex,
    v1: &Vertex,
    v2: &Vertex,
    is_top: bool,
    shader: &dyn Shader,
    texture: &Texture,
    target: &RasterTarget,
) {
    let (p0l, p0r, p1l, p1r) = if is_top {
        (*v0, *v0, *v1, *v2)
    } else {
        (*v0, *v1, *v2, *v2)
    };

    // horizontal attribute step from the flat edge, and a vertical step
    // orthogonalized against it for the mip estimate
    let h_edge = if is_top { *v2 - *v1 } else { *v1 - *v0 };
    let h_span = h_edge.position.x;
    let x_step = if h_span.abs() > FLOAT_TOLERANCE {
        h_edge / h_span
    } else {
        Vertex::default()
    };

    let y_delta = {
        let p = if is_top {
            v0.position - v1.position
        } else {
            v2.position - v0.position
        };
        let n = x_step.position;
        let nn = n.dot(n);
        if nn > FLOAT_TOLERANCE {
            let t = p.dot(n) / nn;
            let (base, apex) = if is_top { (*v1, *v0) } else { (*v0, *v2) };
            let foot = base + x_step * t;
            let v_edge = if is_top { foot - apex } else { apex - foot };
            let rise = v_edge.position.y;
            if rise.abs() > FLOAT_TOLERANCE {
                v_edge / rise
            } else {
                Vertex::default()
            }
        } else {
            Vertex::default()
        }
    };

    let y_top = p0l.position.y;
    let y_bot = p1l.position.y;
    if y_bot - y_top < FLOAT_TOLERANCE {
        return;
    }
    let inv_rise = 1.0 / (y_bot - y_top);
    let ldy = (p1l - p0l) * inv_rise;
    let rdy = (p1r - p0r) * inv_rise;

    let y_start = (y_top.ceil() as i32).max(rect.y);
    let y_end = (y_bot.ceil() as i32).min(rect.bottom());
    if y_end <= y_start {
        return;
    }

    for y in y_start..y_end {
        // edge vertices derived per row from the half-triangle itself, so
        // the values are identical however the strips are partitioned
        let rise = y as f32 - y_top;
        let l = p0l + ldy * rise;
        let r = p0r + rdy * rise;
        let xl = l.position.x;
        let xr = r.position.x;

        let x_start = (xl.ceil() as i32).max(rect.x);
        let x_end = (xr.ceil() as i32).min(rect.right());

        if x_end > x_start {
            let span = xr - xl;
            let x_delta = if span > FLOAT_TOLERANCE {
                (r - l) / span
            } else {
                Vertex::default()
            };

            let mut xv = l + x_delta * (x_start as f32 - xl);

            for x in x_start..x_end {
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
            }
        }
    }
}
