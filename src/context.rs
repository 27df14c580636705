//! The rendering context: owns the sample buffers and the worker pool, and
//! runs the per-frame pipeline — cull, prepare, transform, clip, record
//! draw calls, fan the strips out to the workers, resolve, present.

use std::fmt;

use log::debug;

use crate::buffer::{BufferView, RenderBuffer};
use crate::clip;
use crate::color::Color;
use crate::error::ContextError;
use crate::math::Rect;
use crate::raster::{self, DrawCall, RasterTarget, SampleLayout};
use crate::scene::Scene;
use crate::shader::{InertShader, ShaderArena};
use crate::vertex::Vertex;
use crate::worker::RenderThread;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RasterizationMode {
    Scanline,
    #[default]
    Halfspace,
}

impl RasterizationMode {
    pub fn name(self) -> &'static str {
        match self {
            RasterizationMode::Scanline => "Scanline",
            RasterizationMode::Halfspace => "Halfspace",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AntiAliasing {
    #[default]
    Off,
    Msaa4x,
    Ssaa2x,
    Ssaa4x,
}

impl AntiAliasing {
    pub fn cycled(self) -> AntiAliasing {
        match self {
            AntiAliasing::Off => AntiAliasing::Msaa4x,
            AntiAliasing::Msaa4x => AntiAliasing::Ssaa2x,
            AntiAliasing::Ssaa2x => AntiAliasing::Ssaa4x,
            AntiAliasing::Ssaa4x => AntiAliasing::Off,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AntiAliasing::Off => "Off",
            AntiAliasing::Msaa4x => "4X MSAA",
            AntiAliasing::Ssaa2x => "2X SSAA",
            AntiAliasing::Ssaa4x => "4X SSAA",
        }
    }

    /// Render-resolution multiplier per axis.
    fn supersample_factor(self) -> usize {
        match self {
            AntiAliasing::Off | AntiAliasing::Msaa4x => 1,
            AntiAliasing::Ssaa2x => 2,
            AntiAliasing::Ssaa4x => 4,
        }
    }

    /// Samples per pixel in the AA buffer; zero when no AA buffer exists.
    fn samples(self) -> usize {
        match self {
            AntiAliasing::Off => 0,
            AntiAliasing::Msaa4x => 4,
            AntiAliasing::Ssaa2x => 4,
            AntiAliasing::Ssaa4x => 16,
        }
    }
}

/// Anything the final color buffer can be handed to. The buffer is
/// row-major, top-down, tightly packed 32-bit BGRA, sized exactly
/// `width × height`. Implemented by the host for its window surface; the
/// context itself never touches the windowing system.
pub trait PresentTarget {
    fn blit(&mut self, pixels: &[u32], width: usize, height: usize);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FrameStats {
    pub objects_drawn: usize,
    pub objects_culled: usize,
    pub triangles: usize,
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let &FrameStats { objects_drawn, objects_culled, triangles } = self;
        write!(
            f,
            "{objects_drawn} objects drawn, {objects_culled} culled, {triangles} triangles"
        )
    }
}

pub struct RenderingContext {
    width: usize,
    height: usize,
    clear_color: Color,
    rasterization_mode: RasterizationMode,
    anti_aliasing: AntiAliasing,
    mipmaps_enabled: bool,
    rendering_enabled: bool,

    // effective modes for the frame in flight (MSAA falls back to Off when
    // paired with the scanline kernel)
    frame_aa: AntiAliasing,
    frame_raster: RasterizationMode,

    /// Final color buffer, always at output resolution.
    color_buf: RenderBuffer<u32>,
    /// AA sample buffer at render resolution; empty when AA is off.
    aa_buf: RenderBuffer<u32>,
    depth_buf: RenderBuffer<f32>,

    xverts: Vec<Vertex>,
    cverts: Vec<Vertex>,
    draw_calls: Vec<DrawCall>,
    shader_states: ShaderArena,
    threads: Vec<RenderThread>,
    stats: FrameStats,
}

impl RenderingContext {
    /// Create a context rendering at `width × height` with `thread_count`
    /// workers (0 means one per hardware thread).
    pub fn new(width: usize, height: usize, thread_count: usize) -> Result<Self, ContextError> {
        let thread_count = if thread_count == 0 {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        } else {
            thread_count
        };

        let mut context = RenderingContext {
            width,
            height,
            clear_color: Color::CLEAR,
            rasterization_mode: RasterizationMode::Halfspace,
            anti_aliasing: AntiAliasing::Off,
            mipmaps_enabled: true,
            rendering_enabled: width > 0 && height > 0,
            frame_aa: AntiAliasing::Off,
            frame_raster: RasterizationMode::Halfspace,
            color_buf: RenderBuffer::new(),
            aa_buf: RenderBuffer::new(),
            depth_buf: RenderBuffer::new(),
            xverts: Vec::new(),
            cverts: Vec::new(),
            draw_calls: Vec::new(),
            shader_states: ShaderArena::new(),
            threads: (0..thread_count).map(RenderThread::spawn).collect(),
            stats: FrameStats::default(),
        };
        context.ensure_buffers()?;
        Ok(context)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    pub fn rasterization_mode(&self) -> RasterizationMode {
        self.rasterization_mode
    }

    pub fn set_rasterization_mode(&mut self, mode: RasterizationMode) {
        self.rasterization_mode = mode;
    }

    pub fn anti_aliasing(&self) -> AntiAliasing {
        self.anti_aliasing
    }

    pub fn set_anti_aliasing(&mut self, mode: AntiAliasing) {
        self.anti_aliasing = mode;
    }

    pub fn mipmaps_enabled(&self) -> bool {
        self.mipmaps_enabled
    }

    pub fn set_mipmaps_enabled(&mut self, enabled: bool) {
        self.mipmaps_enabled = enabled;
    }

    pub fn frame_stats(&self) -> FrameStats {
        self.stats
    }

    /// Final color bits: row-major, top-down, 32-bit BGRA.
    pub fn color_buffer(&self) -> &[u32] {
        self.color_buf.as_slice()
    }

    /// Depth samples (`1/w` per sample) for inspection; the shape follows
    /// the active anti-aliasing mode.
    pub fn depth_buffer(&self) -> &[f32] {
        self.depth_buf.as_slice()
    }

    /// Resize the output. Zero in either dimension disables rendering
    /// instead of failing; allocation failure leaves the context at its
    /// previous size.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), ContextError> {
        if width == 0 || height == 0 {
            self.rendering_enabled = false;
            return Ok(());
        }

        let (old_width, old_height) = (self.width, self.height);
        self.width = width;
        self.height = height;
        if let Err(err) = self.ensure_buffers() {
            self.width = old_width;
            self.height = old_height;
            return Err(err);
        }
        self.rendering_enabled = true;
        Ok(())
    }

    /// Clear the color and/or depth buffers. Color clears both the final
    /// and the AA buffer; depth clears to 0 (infinitely far under the
    /// reciprocal-w convention).
    pub fn clear(&mut self, color: bool, depth: bool) {
        if color {
            let bits = self.clear_color.to_bgra();
            self.color_buf.fill(bits);
            if !self.aa_buf.is_empty() {
                self.aa_buf.fill(bits);
            }
        }
        if depth {
            self.depth_buf.fill(0.0);
        }
    }

    /// Render a frame: geometry on this thread, rasterization fanned out
    /// across the workers, one strip each, with a barrier before
    /// returning.
    pub fn draw(&mut self, scene: &mut Scene) -> Result<(), ContextError> {
        if !self.rendering_enabled {
            return Ok(());
        }

        // MSAA coverage masks only exist in the half-space kernel; any
        // other pairing silently renders without it
        let aa = match (self.anti_aliasing, self.rasterization_mode) {
            (AntiAliasing::Msaa4x, RasterizationMode::Scanline) => AntiAliasing::Off,
            (aa, _) => aa,
        };
        if aa != self.frame_aa {
            debug!("anti-aliasing now {}", aa.name());
        }
        self.frame_aa = aa;
        self.frame_raster = self.rasterization_mode;
        self.ensure_buffers()?;

        let factor = aa.supersample_factor();
        let render_w = (self.width * factor) as f32;
        let render_h = (self.height * factor) as f32;

        self.stats = FrameStats::default();
        self.cverts.clear();
        self.draw_calls.clear();
        self.shader_states.clear();

        for light in &mut scene.lights {
            light.update();
        }

        for index in 0..scene.objects.len() {
            if scene.objects[index].mesh.vertices().is_empty() {
                continue;
            }
            let bounds = scene.objects[index].world_bounding_sphere();
            if !scene.camera.can_see(&bounds) {
                self.stats.objects_culled += 1;
                continue;
            }

            // move the shader out so the whole scene can be borrowed
            // shared while it prepares
            let mut shader =
                std::mem::replace(&mut scene.objects[index].shader, Box::new(InertShader));
            let object = &scene.objects[index];
            shader.prepare(scene, object);

            self.xverts.clear();
            self.xverts
                .extend(object.mesh.vertices().iter().map(|v| shader.vertex(v)));

            let start = self.cverts.len();
            for tri in self.xverts.chunks_exact(3) {
                clip::clip_triangle([tri[0], tri[1], tri[2]], render_w, render_h, &mut self.cverts);
            }
            let end = self.cverts.len();

            let slot = shader.clone_into(&mut self.shader_states);
            let object = &mut scene.objects[index];
            object.shader = shader;

            if end > start {
                self.draw_calls.push(DrawCall {
                    start,
                    end,
                    texture: object.texture.clone(),
                    cull_mode: object.cull_mode,
                    shader: slot,
                });
                self.stats.objects_drawn += 1;
            }
        }
        self.stats.triangles = self.cverts.len() / 3;

        // partition the output rows into one contiguous strip per worker,
        // the last absorbing the remainder, then open the frame barrier
        let this: &RenderingContext = self;
        let thread_count = this.threads.len();
        let segment = this.height / thread_count;

        let ptr = this as *const RenderingContext;
        for (i, thread) in this.threads.iter().enumerate() {
            let top = segment * i;
            let rows = if i == thread_count - 1 {
                this.height - top
            } else {
                segment
            };
            let rect = Rect::new(
                0,
                (top * factor) as i32,
                (this.width * factor) as i32,
                (rows * factor) as i32,
            );
            thread.execute(ptr, rect);
        }
        for thread in &this.threads {
            thread.wait();
        }

        Ok(())
    }

    /// Copy the final color buffer out to the host surface.
    pub fn present(&self, target: &mut dyn PresentTarget) {
        target.blit(self.color_buf.as_slice(), self.width, self.height);
    }

    /// Worker entry point: rasterize every draw call restricted to `rect`
    /// (render-resolution rows), then resolve the strip.
    pub(crate) fn rasterize_strip(&self, rect: Rect) {
        if rect.is_empty() {
            return;
        }

        let layout = match self.frame_aa {
            AntiAliasing::Off => SampleLayout::Single,
            AntiAliasing::Msaa4x => SampleLayout::Msaa4,
            AntiAliasing::Ssaa2x => SampleLayout::Super(2),
            AntiAliasing::Ssaa4x => SampleLayout::Super(4),
        };
        let target = RasterTarget {
            color: if self.frame_aa == AntiAliasing::Off {
                self.color_buf.view()
            } else {
                self.aa_buf.view()
            },
            depth: self.depth_buf.view(),
            layout,
            mipmaps_enabled: self.mipmaps_enabled,
        };

        for call in &self.draw_calls {
            let shader = self.shader_states.get(call.shader);
            let texture = &*call.texture;
            for tri in self.cverts[call.start..call.end].chunks_exact(3) {
                match self.frame_raster {
                    RasterizationMode::Halfspace => raster::halfspace::rasterize(
                        rect, &tri[0], &tri[1], &tri[2], shader, texture, call.cull_mode, &target,
                    ),
                    RasterizationMode::Scanline => raster::scanline::rasterize(
                        rect, &tri[0], &tri[1], &tri[2], shader, texture, call.cull_mode, &target,
                    ),
                }
            }
        }

        self.resolve_strip(rect);
    }

    /// Downsample this strip of the AA buffer into the final color buffer.
    fn resolve_strip(&self, rect: Rect) {
        match self.frame_aa {
            AntiAliasing::Off => {}
            AntiAliasing::Msaa4x => {
                let aa = self.aa_buf.view();
                let out = self.color_buf.view();
                for y in rect.y..rect.bottom() {
                    for x in 0..self.width {
                        let base = aa.sample_offset(x, y as usize, 0);
                        let value = average_samples(&aa, base, 4);
                        out.set(out.sample_offset(x, y as usize, 0), value);
                    }
                }
            }
            AntiAliasing::Ssaa2x | AntiAliasing::Ssaa4x => {
                let n = self.frame_aa.supersample_factor();
                let count = n * n;
                let aa = self.aa_buf.view();
                let out = self.color_buf.view();
                // the strip rect is in render resolution and strip heights
                // are multiples of n, so this maps back cleanly
                let top = rect.y as usize / n;
                let bottom = rect.bottom() as usize / n;
                for y in top..bottom {
                    for x in 0..self.width {
                        let base = aa.sample_offset(x, y, 0);
                        let value = average_samples(&aa, base, count);
                        out.set(out.sample_offset(x, y, 0), value);
                    }
                }
            }
        }
    }

    /// Bring the buffers to the shape the current mode needs. All
    /// replacement buffers are allocated before any is committed, so
    /// failure leaves every buffer untouched.
    fn ensure_buffers(&mut self) -> Result<(), ContextError> {
        let (w, h) = (self.width, self.height);
        let aa_samples = self.frame_aa.samples();
        let (aa_shape, depth_shape) = if aa_samples == 0 {
            ((0, 0, 1), (w, h, 1))
        } else {
            ((w, h, aa_samples), (w, h, aa_samples))
        };

        let new_color = stage(&self.color_buf, (w, h, 1))?;
        let new_aa = stage(&self.aa_buf, aa_shape)?;
        let new_depth = stage(&self.depth_buf, depth_shape)?;

        let reshaped = new_color.is_some() || new_aa.is_some() || new_depth.is_some();
        if let Some(buf) = new_color {
            self.color_buf = buf;
        }
        if let Some(buf) = new_aa {
            self.aa_buf = buf;
        }
        if let Some(buf) = new_depth {
            self.depth_buf = buf;
        }

        if reshaped {
            // fresh storage is zeroed, which is correct for depth; color
            // starts at the clear color
            self.clear(true, false);
        }
        Ok(())
    }
}

fn stage<T: Copy>(
    buf: &RenderBuffer<T>,
    (width, height, samples): (usize, usize, usize),
) -> Result<Option<RenderBuffer<T>>, ContextError> {
    if buf.width() == width && buf.height() == height && buf.samples() == samples {
        return Ok(None);
    }
    let mut replacement = RenderBuffer::new();
    replacement.resize(width, height, samples).map_err(ContextError::from)?;
    Ok(Some(replacement))
}

/// Average `count` consecutive BGRA samples with round-to-nearest per
/// channel.
fn average_samples(aa: &BufferView<u32>, base: usize, count: usize) -> u32 {
    let half = (count / 2) as u32;
    let mut sum = [0u32; 4];
    for i in 0..count {
        let bits = aa.get(base + i);
        sum[0] += bits & 0xff;
        sum[1] += (bits >> 8) & 0xff;
        sum[2] += (bits >> 16) & 0xff;
        sum[3] += bits >> 24;
    }
    let count = count as u32;
    let b = (sum[0] + half) / count;
    let g = (sum[1] + half) / count;
    let r = (sum[2] + half) / count;
    let a = (sum[3] + half) / count;
    b | (g << 8) | (r << 16) | (a << 24)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_averaging_rounds_to_nearest() {
        let mut buf = RenderBuffer::<u32>::new();
        buf.resize(1, 1, 4).unwrap();
        buf.as_mut_slice().copy_from_slice(&[10, 11, 11, 11]);
        let avg = average_samples(&buf.view(), 0, 4);
        // (43 + 2) / 4 = 11
        assert_eq!(avg & 0xff, 11);
    }

    #[test]
    fn msaa_with_scanline_falls_back_to_no_aa() {
        let mut ctx = RenderingContext::new(4, 4, 1).unwrap();
        ctx.set_rasterization_mode(RasterizationMode::Scanline);
        ctx.set_anti_aliasing(AntiAliasing::Msaa4x);
        let mut scene = Scene::new(crate::camera::Camera::new(60.0, 1.0, 0.1, 100.0));
        ctx.draw(&mut scene).unwrap();
        assert_eq!(ctx.frame_aa, AntiAliasing::Off);
        assert!(ctx.aa_buf.is_empty());
    }

    #[test]
    fn resize_to_zero_disables_rendering() {
        let mut ctx = RenderingContext::new(4, 4, 1).unwrap();
        ctx.resize(0, 7).unwrap();
        assert!(!ctx.rendering_enabled);
        let mut scene = Scene::new(crate::camera::Camera::new(60.0, 1.0, 0.1, 100.0));
        ctx.draw(&mut scene).unwrap(); // a no-op, not an error
        ctx.resize(8, 8).unwrap();
        assert!(ctx.rendering_enabled);
        assert_eq!(ctx.color_buffer().len(), 64);
    }

    #[test]
    fn resolve_is_idempotent() {
        let mut ctx = RenderingContext::new(2, 2, 1).unwrap();
        ctx.set_anti_aliasing(AntiAliasing::Ssaa2x);
        ctx.frame_aa = AntiAliasing::Ssaa2x;
        ctx.ensure_buffers().unwrap();
        for (i, px) in ctx.aa_buf.as_mut_slice().iter_mut().enumerate() {
            *px = (i as u32) * 7 + 3;
        }

        let rect = Rect::new(0, 0, 4, 4);
        ctx.resolve_strip(rect);
        let first: Vec<u32> = ctx.color_buffer().to_vec();
        ctx.resolve_strip(rect);
        assert_eq!(ctx.color_buffer(), &first[..]);
    }
}
