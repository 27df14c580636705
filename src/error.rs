use std::io;

use thiserror::Error;

use crate::buffer::AllocError;

/// Failures while decoding a texture file. Only 24 and 32 bit BMP and TGA
/// images are supported.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("i/o error reading image: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt image header: {0}")]
    CorruptHeader(&'static str),
    #[error("unsupported pixel depth: {0} bits")]
    UnsupportedDepth(u8),
    #[error("unsupported {format} image type {kind}")]
    UnsupportedType { format: &'static str, kind: u8 },
    #[error("image file type not recognized: {0}")]
    UnknownExtension(String),
}

/// Failures while applying a scene-settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("i/o error reading settings: {0}")]
    Io(#[from] io::Error),
    #[error("malformed settings file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures surfaced by the rendering context itself.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error(transparent)]
    OutOfMemory(#[from] AllocError),
}
