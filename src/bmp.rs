//! Windows BMP decoding, uncompressed 24 or 32 bit device-independent
//! bitmaps with the common 40-byte info header.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::color::Color32;
use crate::error::ImageError;
use crate::texture::ImageData;
use crate::tga::flip_rows;

const MAGIC: u16 = 0x4d42; // "BM"
const BI_RGB: u32 = 0;

pub fn load(path: impl AsRef<Path>) -> Result<ImageData, ImageError> {
    decode(&mut BufReader::new(File::open(path)?))
}

pub fn decode(reader: &mut impl Read) -> Result<ImageData, ImageError> {
    if reader.read_u16::<LittleEndian>()? != MAGIC {
        return Err(ImageError::CorruptHeader("missing BM signature"));
    }
    let _file_size = reader.read_u32::<LittleEndian>()?;
    let _reserved = reader.read_u32::<LittleEndian>()?;
    let data_offset = reader.read_u32::<LittleEndian>()?;

    let header_size = reader.read_u32::<LittleEndian>()?;
    if header_size < 40 {
        return Err(ImageError::CorruptHeader("info header too small"));
    }
    let width_raw = reader.read_i32::<LittleEndian>()?;
    let height_raw = reader.read_i32::<LittleEndian>()?;
    let _planes = reader.read_u16::<LittleEndian>()?;
    let depth = reader.read_u16::<LittleEndian>()?;
    let compression = reader.read_u32::<LittleEndian>()?;

    if compression != BI_RGB {
        return Err(ImageError::UnsupportedType { format: "BMP", kind: compression as u8 });
    }
    if depth != 24 && depth != 32 {
        return Err(ImageError::UnsupportedDepth(depth as u8));
    }
    if width_raw <= 0 || height_raw == 0 {
        return Err(ImageError::CorruptHeader("zero image dimensions"));
    }

    let width = width_raw as usize;
    let bottom_up = height_raw > 0;
    let height = height_raw.unsigned_abs() as usize;

    // skip the rest of the info header and any palette up to the pixel data
    let consumed = 14 + 24;
    let skip = (data_offset as u64).saturating_sub(consumed);
    std::io::copy(&mut reader.by_ref().take(skip), &mut std::io::sink())?;

    let bytes_per_pixel = depth as usize / 8;
    // each row pads to a 4-byte boundary
    let row_bytes = (width * bytes_per_pixel + 3) & !3;
    let mut row = vec![0u8; row_bytes];
    let mut pixels = Vec::with_capacity(width * height);

    for _ in 0..height {
        reader.read_exact(&mut row)?;
        for px in row[..width * bytes_per_pixel].chunks_exact(bytes_per_pixel) {
            let a = if bytes_per_pixel == 4 { px[3] } else { 255 };
            pixels.push(Color32::new(px[2], px[1], px[0], a));
        }
    }

    if bottom_up {
        flip_rows(&mut pixels, width, height);
    }

    Ok(ImageData {
        width,
        height,
        channels: if depth == 32 { 4 } else { 3 },
        pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bmp(width: i32, height: i32, depth: u16, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // file size (unused)
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&54u32.to_le_bytes()); // data offset
        out.extend_from_slice(&40u32.to_le_bytes()); // info header size
        out.extend_from_slice(&width.to_le_bytes());
        out.extend_from_slice(&height.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&depth.to_le_bytes());
        out.extend_from_slice(&BI_RGB.to_le_bytes());
        out.resize(54, 0); // pad the remaining header fields
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn decodes_bottom_up_with_row_padding() {
        // 1x2, 24-bit: each row is 3 bytes of pixel + 1 byte of padding
        let data = make_bmp(1, 2, 24, &[1, 2, 3, 0, 4, 5, 6, 0]);
        let img = decode(&mut data.as_slice()).unwrap();
        assert_eq!(img.channels, 3);
        // the file's first row is the bottom row
        assert_eq!(img.pixels[0], Color32::new(6, 5, 4, 255));
        assert_eq!(img.pixels[1], Color32::new(3, 2, 1, 255));
    }

    #[test]
    fn decodes_top_down_32bit() {
        let data = make_bmp(1, -1, 32, &[9, 8, 7, 100]);
        let img = decode(&mut data.as_slice()).unwrap();
        assert_eq!(img.channels, 4);
        assert_eq!(img.pixels[0], Color32::new(7, 8, 9, 100));
    }

    #[test]
    fn rejects_bad_signature() {
        let data = [0u8; 54];
        assert!(matches!(
            decode(&mut data.as_slice()),
            Err(ImageError::CorruptHeader(_))
        ));
    }

    #[test]
    fn rejects_compressed_bitmaps() {
        let mut data = make_bmp(1, 1, 24, &[0, 0, 0, 0]);
        data[30] = 1; // BI_RLE8
        assert!(matches!(
            decode(&mut data.as_slice()),
            Err(ImageError::UnsupportedType { .. })
        ));
    }
}
