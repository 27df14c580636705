pub(crate) mod halfspace;
pub(crate) mod scanline;

use std::sync::Arc;

use crate::buffer::BufferView;
use crate::scene::CullMode;
use crate::shader::{Shader, ShaderSlot};
use crate::texture::Texture;
use crate::vec::Vec2;
use crate::vertex::Vertex;

/// One object's worth of clipped triangles, recorded during the geometry
/// stage and consumed by every worker. Lives for a single frame.
pub(crate) struct DrawCall {
    pub start: usize,
    pub end: usize,
    pub texture: Arc<Texture>,
    pub cull_mode: CullMode,
    pub shader: ShaderSlot,
}

/// How samples are laid out in the target buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SampleLayout {
    /// One sample per pixel, written straight to the output buffer.
    Single,
    /// Four coverage samples per pixel, one fragment shade per pixel.
    Msaa4,
    /// `n × n` real pixels per output pixel, tile-local layout.
    Super(usize),
}

/// Where a worker rasterizes: color + depth sample views plus the layout
/// they share. The views span the whole buffer; the strip rect passed to
/// the rasterizers confines the writes.
pub(crate) struct RasterTarget<'a> {
    pub color: BufferView<'a, u32>,
    pub depth: BufferView<'a, f32>,
    pub layout: SampleLayout,
    pub mipmaps_enabled: bool,
}

impl RasterTarget<'_> {
    /// Offset of the sample at render-resolution pixel `(x, y)` (the first
    /// of the four for MSAA).
    #[inline(always)]
    pub fn pixel_offset(&self, x: i32, y: i32) -> usize {
        match self.layout {
            SampleLayout::Single | SampleLayout::Msaa4 => {
                self.color.sample_offset(x as usize, y as usize, 0)
            }
            SampleLayout::Super(n) => self.color.super_sample_offset(x as usize, y as usize, n),
        }
    }
}

/// Extrapolate the vertex attribute plane of a screen-space triangle to a
/// corner point plus the per-pixel x/y steps.
///
/// The steps come from points 100 pixels away, scaled back down, which
/// keeps the subtraction well away from cancellation for small triangles.
/// Returns `None` for triangles whose barycentric denominator collapses.
pub(crate) fn extrapolate_plane(
    v0: &Vertex,
    v1: &Vertex,
    v2: &Vertex,
    corner: Vec2,
) -> Option<(Vertex, Vertex, Vertex)> {
    const STEP: f32 = 100.0;

    let a = v0.position.xy();
    let e0 = v1.position.xy() - a;
    let e1 = v2.position.xy() - a;

    let d00 = e0.dot(e0);
    let d01 = e0.dot(e1);
    let d11 = e1.dot(e1);

    let denom = d00 * d11 - d01 * d01;
    if denom.abs() <= f32::EPSILON {
        return None;
    }
    let num = 1.0 / denom;

    let at = |p: Vec2| {
        let e2 = p - a;
        let d20 = e2.dot(e0);
        let d21 = e2.dot(e1);
        let vb = (d11 * d20 - d01 * d21) * num;
        let wc = (d00 * d21 - d01 * d20) * num;
        let ua = 1.0 - vb - wc;
        *v0 * ua + *v1 * vb + *v2 * wc
    };

    let v00 = at(corner);
    let v01 = at(corner + Vec2::from([STEP, 0.0]));
    let v10 = at(corner + Vec2::from([0.0, STEP]));

    Some((v00, (v01 - v00) / STEP, (v10 - v00) / STEP))
}

/// Analytic mip level from the screen-space UV derivatives at a sample.
/// `x_next`/`y_next` are the vertex one pixel to the right and below;
/// everything is still pre-divided by clip `w`, so the true UVs are
/// recovered through `position.w` before differencing.
pub(crate) fn mip_level(
    curr: &Vertex,
    x_next: &Vertex,
    y_next: &Vertex,
    texture: &Texture,
    enabled: bool,
) -> f32 {
    if !enabled || texture.mip_count() <= 1 {
        return 0.0;
    }

    let uv00 = curr.texcoord * (1.0 / curr.position.w);
    let uv01 = x_next.texcoord.x / x_next.position.w;
    let uv10 = y_next.texcoord.y / y_next.position.w;

    let size = texture.size();
    let dx = (uv01 - uv00.x) * size.x;
    let dy = (uv10 - uv00.y) * size.y;

    let level = 0.5 * (dx * dx).max(dy * dy).log2();
    (level + texture.mipmap_bias()).clamp(0.0, (texture.mip_count() - 1) as f32)
}

/// Run the fragment stage for the sample carried by `xv`. Returns the
/// packed BGRA color, or `None` when the shader discards.
#[inline]
pub(crate) fn shade_fragment(
    xv: &Vertex,
    x_next: Vertex,
    y_next: Vertex,
    shader: &dyn Shader,
    texture: &Texture,
    mipmaps_enabled: bool,
) -> Option<u32> {
    let mip = mip_level(xv, &x_next, &y_next, texture, mipmaps_enabled);

    // undo the perspective pre-divide to get true attribute values
    let mut frag = *xv / xv.position.w;
    let mag_sq = frag.normal.mag_sq();
    if mag_sq > f32::EPSILON {
        frag.normal /= mag_sq.sqrt();
    }

    shader
        .fragment(&frag, mip)
        .map(|color| color.clamp01().to_bgra())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec::{Vec3, Vec4};

    fn vert(x: f32, y: f32, w: f32, uv: [f32; 2]) -> Vertex {
        Vertex::new(
            Vec4::from([x, y, 0.5, w]),
            Vec3::up(),
            Vec2::from(uv),
        )
    }

    #[test]
    fn extrapolation_matches_the_vertices() {
        let v0 = vert(0.0, 0.0, 1.0, [0.0, 0.0]);
        let v1 = vert(8.0, 0.0, 1.0, [1.0, 0.0]);
        let v2 = vert(0.0, 8.0, 1.0, [0.0, 1.0]);

        let (v00, dx, dy) =
            extrapolate_plane(&v0, &v1, &v2, Vec2::from([0.0, 0.0])).unwrap();
        assert!((v00.texcoord.x - 0.0).abs() < 1e-6);
        // uv changes by 1/8 per pixel along each axis
        assert!((dx.texcoord.x - 0.125).abs() < 1e-5);
        assert!((dy.texcoord.y - 0.125).abs() < 1e-5);

        // stepping to v1's corner reproduces its attributes
        let stepped = v00 + dx * 8.0;
        assert!((stepped.texcoord.x - 1.0).abs() < 1e-4);
    }

    #[test]
    fn degenerate_triangle_extrapolates_to_nothing() {
        let v0 = vert(1.0, 1.0, 1.0, [0.0, 0.0]);
        let v1 = vert(1.0, 1.0, 1.0, [1.0, 0.0]);
        let v2 = vert(1.0, 1.0, 1.0, [0.0, 1.0]);
        assert!(extrapolate_plane(&v0, &v1, &v2, Vec2::zero()).is_none());
    }
}
