//! Truevision TGA decoding, types 2 (uncompressed) and 10 (run-length
//! encoded) truecolor at 24 or 32 bits.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::color::Color32;
use crate::error::ImageError;
use crate::texture::ImageData;

const TYPE_TRUECOLOR: u8 = 2;
const TYPE_TRUECOLOR_RLE: u8 = 10;

// image descriptor bit 5: origin at the top-left row
const DESC_TOP_ORIGIN: u8 = 0x20;

pub fn load(path: impl AsRef<Path>) -> Result<ImageData, ImageError> {
    decode(&mut BufReader::new(File::open(path)?))
}

pub fn decode(reader: &mut impl Read) -> Result<ImageData, ImageError> {
    let id_length = reader.read_u8()?;
    let color_map_type = reader.read_u8()?;
    let image_type = reader.read_u8()?;
    let _color_map_first = reader.read_u16::<LittleEndian>()?;
    let color_map_len = reader.read_u16::<LittleEndian>()?;
    let _color_map_depth = reader.read_u8()?;
    let _x_origin = reader.read_u16::<LittleEndian>()?;
    let _y_origin = reader.read_u16::<LittleEndian>()?;
    let width = reader.read_u16::<LittleEndian>()? as usize;
    let height = reader.read_u16::<LittleEndian>()? as usize;
    let depth = reader.read_u8()?;
    let descriptor = reader.read_u8()?;

    if image_type != TYPE_TRUECOLOR && image_type != TYPE_TRUECOLOR_RLE {
        return Err(ImageError::UnsupportedType { format: "TGA", kind: image_type });
    }
    if color_map_type != 0 || color_map_len != 0 {
        return Err(ImageError::CorruptHeader("truecolor image carries a color map"));
    }
    if depth != 24 && depth != 32 {
        return Err(ImageError::UnsupportedDepth(depth));
    }
    if width == 0 || height == 0 {
        return Err(ImageError::CorruptHeader("zero image dimensions"));
    }

    // skip the free-form image id
    std::io::copy(&mut reader.by_ref().take(id_length as u64), &mut std::io::sink())?;

    let bytes_per_pixel = depth as usize / 8;
    let mut pixels = Vec::with_capacity(width * height);

    if image_type == TYPE_TRUECOLOR {
        let mut row = vec![0u8; width * bytes_per_pixel];
        for _ in 0..height {
            reader.read_exact(&mut row)?;
            for px in row.chunks_exact(bytes_per_pixel) {
                pixels.push(unpack(px, bytes_per_pixel));
            }
        }
    } else {
        let mut px = [0u8; 4];
        while pixels.len() < width * height {
            let packet = reader.read_u8()?;
            let count = (packet & 0x7f) as usize + 1;
            if count > width * height - pixels.len() {
                return Err(ImageError::CorruptHeader("RLE packet overruns the image"));
            }
            if packet & 0x80 != 0 {
                reader.read_exact(&mut px[..bytes_per_pixel])?;
                let value = unpack(&px[..bytes_per_pixel], bytes_per_pixel);
                pixels.extend(std::iter::repeat(value).take(count));
            } else {
                for _ in 0..count {
                    reader.read_exact(&mut px[..bytes_per_pixel])?;
                    pixels.push(unpack(&px[..bytes_per_pixel], bytes_per_pixel));
                }
            }
        }
    }

    if descriptor & DESC_TOP_ORIGIN == 0 {
        flip_rows(&mut pixels, width, height);
    }

    Ok(ImageData {
        width,
        height,
        channels: if depth == 32 { 4 } else { 3 },
        pixels,
    })
}

#[inline]
fn unpack(px: &[u8], bytes_per_pixel: usize) -> Color32 {
    // stored blue, green, red(, alpha)
    let a = if bytes_per_pixel == 4 { px[3] } else { 255 };
    Color32::new(px[2], px[1], px[0], a)
}

pub(crate) fn flip_rows(pixels: &mut [Color32], width: usize, height: usize) {
    for y in 0..height / 2 {
        let (top, rest) = pixels.split_at_mut((height - 1 - y) * width);
        top[y * width..y * width + width].swap_with_slice(&mut rest[..width]);
    }
}
