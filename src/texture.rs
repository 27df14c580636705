use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use crate::color::{Color, Color32};
use crate::error::ImageError;
use crate::vec::Vec2;
use crate::{bmp, tga};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum FilterMode {
    Point = 0,
    #[default]
    Bilinear = 1,
    Trilinear = 2,
}

impl FilterMode {
    fn from_u8(value: u8) -> FilterMode {
        match value {
            0 => FilterMode::Point,
            1 => FilterMode::Bilinear,
            _ => FilterMode::Trilinear,
        }
    }

    pub fn cycled(self) -> FilterMode {
        match self {
            FilterMode::Point => FilterMode::Bilinear,
            FilterMode::Bilinear => FilterMode::Trilinear,
            FilterMode::Trilinear => FilterMode::Point,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FilterMode::Point => "Point",
            FilterMode::Bilinear => "Bilinear",
            FilterMode::Trilinear => "Trilinear",
        }
    }
}

/// Decoded pixels handed over by the image loaders.
pub struct ImageData {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub pixels: Vec<Color32>,
}

#[derive(Clone, Copy, Debug)]
struct MipLevel {
    offset: usize,
    width: usize,
    height: usize,
}

/// An RGBA texture with a contiguous mip chain.
///
/// Level 0 is the original image; each further level halves the previous
/// one (per axis, never below 1) down to 1×1, box-filtered, all levels
/// stored back to back in one allocation. Read-only after construction
/// apart from the filter mode and the mip bias, which are atomics so hosts
/// can flip them on textures already shared with the renderer.
pub struct Texture {
    pixels: Vec<Color32>,
    mips: Vec<MipLevel>,
    width: usize,
    height: usize,
    channels: usize,
    filter_mode: AtomicU8,
    mipmap_bias: AtomicU32,
}

impl Texture {
    /// Build a texture (and its whole mip chain) from decoded pixels.
    /// `channels` is 3 for opaque images and 4 when alpha is meaningful.
    pub fn from_pixels(
        width: usize,
        height: usize,
        channels: usize,
        pixels: Vec<Color32>,
        filter_mode: FilterMode,
    ) -> Self {
        assert!(width > 0 && height > 0, "empty texture");
        assert_eq!(pixels.len(), width * height);
        assert!(channels == 3 || channels == 4);

        let mut mips = Vec::new();
        let mut total = 0;
        let (mut w, mut h) = (width, height);
        loop {
            mips.push(MipLevel { offset: total, width: w, height: h });
            total += w * h;
            if w == 1 && h == 1 {
                break;
            }
            if w > 1 {
                w >>= 1;
            }
            if h > 1 {
                h >>= 1;
            }
        }

        let mut storage = Vec::with_capacity(total);
        storage.extend_from_slice(&pixels);

        let mut scratch = pixels;
        let (mut w, mut h) = (width, height);
        for _ in 1..mips.len() {
            mip_down(&mut scratch, w, h);
            if w > 1 {
                w >>= 1;
            }
            if h > 1 {
                h >>= 1;
            }
            storage.extend_from_slice(&scratch[..w * h]);
        }

        Texture {
            pixels: storage,
            mips,
            width,
            height,
            channels,
            filter_mode: AtomicU8::new(filter_mode as u8),
            mipmap_bias: AtomicU32::new(0.0f32.to_bits()),
        }
    }

    /// Load a 24/32-bit TGA or BMP file, keyed by extension.
    pub fn load(path: impl AsRef<Path>, filter_mode: FilterMode) -> Result<Self, ImageError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let image = match ext.as_str() {
            "tga" => tga::load(path)?,
            "bmp" => bmp::load(path)?,
            other => return Err(ImageError::UnknownExtension(other.to_string())),
        };
        Ok(Texture::from_pixels(
            image.width,
            image.height,
            image.channels,
            image.pixels,
            filter_mode,
        ))
    }

    pub fn size(&self) -> Vec2 {
        Vec2::from([self.width as f32, self.height as f32])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn mip_count(&self) -> usize {
        self.mips.len()
    }

    pub fn mipmap_bias(&self) -> f32 {
        f32::from_bits(self.mipmap_bias.load(Ordering::Relaxed))
    }

    pub fn set_mipmap_bias(&self, bias: f32) {
        self.mipmap_bias.store(bias.to_bits(), Ordering::Relaxed);
    }

    pub fn filter_mode(&self) -> FilterMode {
        FilterMode::from_u8(self.filter_mode.load(Ordering::Relaxed))
    }

    pub fn set_filter_mode(&self, mode: FilterMode) {
        self.filter_mode.store(mode as u8, Ordering::Relaxed);
    }

    /// Fetch a texel with the configured filter. UVs address the texture in
    /// `[0, 1]` and clamp at the edges.
    pub fn sample(&self, uv: Vec2, mip_level: f32) -> Color {
        let mip_level = mip_level.clamp(0.0, (self.mips.len() - 1) as f32);
        match self.filter_mode() {
            FilterMode::Point => self.fetch_point(uv, mip_level as usize),
            FilterMode::Bilinear => self.fetch_bilinear(uv, mip_level as usize),
            FilterMode::Trilinear => self.fetch_trilinear(uv, mip_level),
        }
    }

    fn level(&self, level: usize) -> (&[Color32], usize, usize) {
        let mip = self.mips[level];
        (
            &self.pixels[mip.offset..mip.offset + mip.width * mip.height],
            mip.width,
            mip.height,
        )
    }

    fn fetch_point(&self, uv: Vec2, level: usize) -> Color {
        let (pixels, w, h) = self.level(level);
        let x = uv.x * w as f32;
        let y = uv.y * h as f32;
        let ix = (x as i32).clamp(0, w as i32 - 1) as usize;
        let iy = (y as i32).clamp(0, h as i32 - 1) as usize;
        Color::from(pixels[iy * w + ix])
    }

    fn fetch_bilinear(&self, uv: Vec2, level: usize) -> Color {
        let (pixels, w, h) = self.level(level);
        let x = uv.x * w as f32;
        let y = uv.y * h as f32;
        let ix = (x as i32).clamp(0, w as i32 - 1) as usize;
        let iy = (y as i32).clamp(0, h as i32 - 1) as usize;

        // edge texels clamp by reading themselves
        let xoff = usize::from(ix < w - 1);
        let yoff = usize::from(iy < h - 1);

        let p00 = Color::from(pixels[iy * w + ix]);
        let p01 = Color::from(pixels[iy * w + ix + xoff]);
        let p10 = Color::from(pixels[(iy + yoff) * w + ix]);
        let p11 = Color::from(pixels[(iy + yoff) * w + ix + xoff]);

        let u1 = x - ix as f32;
        let u0 = 1.0 - u1;
        let v1 = y - iy as f32;
        let v0 = 1.0 - v1;

        p00 * (v0 * u0) + p01 * (v0 * u1) + p10 * (v1 * u0) + p11 * (v1 * u1)
    }

    fn fetch_trilinear(&self, uv: Vec2, mip_level: f32) -> Color {
        let lower = mip_level.floor();
        let upper = mip_level.ceil();
        if lower == upper {
            return self.fetch_bilinear(uv, mip_level as usize);
        }
        let t = mip_level - lower;
        Color::lerp(
            self.fetch_bilinear(uv, lower as usize),
            self.fetch_bilinear(uv, upper as usize),
            t,
        )
    }
}

/// Box-filter `pixels` (of size `w × h`) in place down to the next mip size.
fn mip_down(pixels: &mut [Color32], w: usize, h: usize) {
    #[inline]
    fn avg4(a: Color32, b: Color32, c: Color32, d: Color32) -> Color32 {
        Color32::new(
            ((a.r as u32 + b.r as u32 + c.r as u32 + d.r as u32) >> 2) as u8,
            ((a.g as u32 + b.g as u32 + c.g as u32 + d.g as u32) >> 2) as u8,
            ((a.b as u32 + b.b as u32 + c.b as u32 + d.b as u32) >> 2) as u8,
            ((a.a as u32 + b.a as u32 + c.a as u32 + d.a as u32) >> 2) as u8,
        )
    }

    #[inline]
    fn avg2(a: Color32, b: Color32) -> Color32 {
        Color32::new(
            ((a.r as u32 + b.r as u32) >> 1) as u8,
            ((a.g as u32 + b.g as u32) >> 1) as u8,
            ((a.b as u32 + b.b as u32) >> 1) as u8,
            ((a.a as u32 + b.a as u32) >> 1) as u8,
        )
    }

    if w > 1 && h > 1 {
        let (dw, dh) = (w >> 1, h >> 1);
        for y in 0..dh {
            for x in 0..dw {
                let i = y * 2 * w + x * 2;
                let out = avg4(pixels[i], pixels[i + 1], pixels[i + w], pixels[i + w + 1]);
                pixels[y * dw + x] = out;
            }
        }
    } else if w > 1 {
        let dw = w >> 1;
        for x in 0..dw {
            pixels[x] = avg2(pixels[x * 2], pixels[x * 2 + 1]);
        }
    } else if h > 1 {
        let dh = h >> 1;
        for y in 0..dh {
            pixels[y] = avg2(pixels[y * 2], pixels[y * 2 + 1]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker2x2() -> Texture {
        let b = Color32::new(0, 0, 0, 255);
        let w = Color32::new(255, 255, 255, 255);
        Texture::from_pixels(2, 2, 3, vec![b, w, w, b], FilterMode::Point)
    }

    #[test]
    fn mip_chain_shape() {
        let tex = Texture::from_pixels(
            8,
            2,
            3,
            vec![Color32::new(10, 20, 30, 255); 16],
            FilterMode::Point,
        );
        // 8x2 -> 4x1 -> 2x1 -> 1x1
        assert_eq!(tex.mip_count(), 4);
        let (last, w, h) = tex.level(3);
        assert_eq!((w, h), (1, 1));
        assert_eq!(last[0], Color32::new(10, 20, 30, 255));
    }

    #[test]
    fn point_fetch_clamps_uv() {
        let tex = checker2x2();
        let a = tex.sample(Vec2::from([-3.0, 0.0]), 0.0);
        let b = tex.sample(Vec2::from([0.1, 0.1]), 0.0);
        assert_eq!(a, b);
        let edge = tex.sample(Vec2::from([5.0, 5.0]), 0.0);
        assert_eq!(edge, Color::from(Color32::new(0, 0, 0, 255)));
    }

    #[test]
    fn top_mip_is_average() {
        let tex = checker2x2();
        let (top, _, _) = tex.level(1);
        // (0 + 255 + 255 + 0) / 4 = 127 after truncation
        assert_eq!(top[0].r, 127);
    }

    #[test]
    fn trilinear_blends_between_levels() {
        let tex = checker2x2();
        tex.set_filter_mode(FilterMode::Trilinear);
        // at uv (0,0): level 0 is black (0), level 1 is 127
        let c = tex.sample(Vec2::from([0.0, 0.0]), 0.5);
        let mixed = (0.5_f32 * (127.0 / 255.0) * 255.0).round() as i32;
        assert!((Color32::from(c).r as i32 - mixed).abs() <= 1);
    }
}
