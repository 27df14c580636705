use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::color::Color;
use crate::context::{AntiAliasing, RasterizationMode};

/// Host-facing render configuration, loaded from a TOML file.
#[derive(Clone, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "RenderConfig::default_width")]
    pub width: usize,
    #[serde(default = "RenderConfig::default_height")]
    pub height: usize,
    /// Worker thread count; 0 means one per hardware thread.
    #[serde(default)]
    pub threads: usize,
    #[serde(default)]
    pub rasterizer: RasterizerKind,
    #[serde(default, rename = "anti-aliasing")]
    pub anti_aliasing: AntiAliasingKind,
    #[serde(default = "RenderConfig::default_mipmaps")]
    pub mipmaps: bool,
    #[serde(
        default = "RenderConfig::default_clear_color",
        rename = "clear-color",
        deserialize_with = "RenderConfig::deserialize_clear_color"
    )]
    pub clear_color: Color,
    #[serde(default, rename = "settings-path")]
    pub settings_path: Option<PathBuf>,
    #[serde(default, rename = "fps-cap")]
    pub fps_cap: Option<f32>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            width: Self::default_width(),
            height: Self::default_height(),
            threads: 0,
            rasterizer: RasterizerKind::default(),
            anti_aliasing: AntiAliasingKind::default(),
            mipmaps: Self::default_mipmaps(),
            clear_color: Self::default_clear_color(),
            settings_path: None,
            fps_cap: None,
        }
    }
}

impl RenderConfig {
    pub fn load_toml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read file {path:?}"))?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    fn default_width() -> usize {
        640
    }

    fn default_height() -> usize {
        480
    }

    fn default_mipmaps() -> bool {
        true
    }

    fn default_clear_color() -> Color {
        Color::CLEAR
    }

    fn deserialize_clear_color<'de, D: serde::Deserializer<'de>>(
        deser: D,
    ) -> std::result::Result<Color, D::Error> {
        use serde::de::Error;

        let hex_color: String = Deserialize::deserialize(deser)?;
        let rgb = u32::from_str_radix(hex_color.strip_prefix('#').unwrap_or(""), 16)
            .map_err(Error::custom)?;
        let [_, r, g, b] = rgb.to_be_bytes();
        Ok(Color::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            1.0,
        ))
    }
}

#[derive(Clone, Copy, Default, Deserialize)]
pub enum RasterizerKind {
    #[default]
    #[serde(rename = "halfspace")]
    Halfspace,
    #[serde(rename = "scanline")]
    Scanline,
}

impl From<RasterizerKind> for RasterizationMode {
    fn from(kind: RasterizerKind) -> Self {
        match kind {
            RasterizerKind::Halfspace => RasterizationMode::Halfspace,
            RasterizerKind::Scanline => RasterizationMode::Scanline,
        }
    }
}

#[derive(Clone, Copy, Default, Deserialize)]
pub enum AntiAliasingKind {
    #[default]
    #[serde(rename = "off")]
    Off,
    #[serde(rename = "msaa-4x")]
    Msaa4x,
    #[serde(rename = "ssaa-2x")]
    Ssaa2x,
    #[serde(rename = "ssaa-4x")]
    Ssaa4x,
}

impl From<AntiAliasingKind> for AntiAliasing {
    fn from(kind: AntiAliasingKind) -> Self {
        match kind {
            AntiAliasingKind::Off => AntiAliasing::Off,
            AntiAliasingKind::Msaa4x => AntiAliasing::Msaa4x,
            AntiAliasingKind::Ssaa2x => AntiAliasing::Ssaa2x,
            AntiAliasingKind::Ssaa4x => AntiAliasing::Ssaa4x,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: RenderConfig = toml::from_str("").unwrap();
        assert_eq!(config.width, 640);
        assert!(config.mipmaps);
        assert!(config.settings_path.is_none());
    }

    #[test]
    fn parses_modes_and_colors() {
        let config: RenderConfig = toml::from_str(
            r##"
            width = 1024
            height = 768
            rasterizer = "scanline"
            anti-aliasing = "ssaa-2x"
            clear-color = "#336699"
            fps-cap = 30.0
            "##,
        )
        .unwrap();
        assert_eq!(config.width, 1024);
        assert!(matches!(config.rasterizer, RasterizerKind::Scanline));
        assert!(matches!(config.anti_aliasing, AntiAliasingKind::Ssaa2x));
        assert!((config.clear_color.g - 0x66 as f32 / 255.0).abs() < 1e-6);
        assert_eq!(config.fps_cap, Some(30.0));
    }
}
