//! `TGA`: 24/32-bit uncompressed and run-length-encoded true-color images.
//! No mipmap chain; always a single top-level `Texture` with one mipmap.

use kotor_common::error::Error;
use kotor_common::stream::{ByteReader, ByteWriter};

use super::{Mipmap, PixelFormat, Texture};

const IMAGE_TYPE_UNCOMPRESSED: u8 = 2;
const IMAGE_TYPE_RLE: u8 = 10;

pub fn read(data: &[u8]) -> Result<Texture, Error> {
    let mut reader = ByteReader::new(data);
    let id_length = reader.u8()?;
    let _color_map_type = reader.u8()?;
    let image_type = reader.u8()?;
    reader.skip(5); // color map spec
    let _x_origin = reader.u16()?;
    let _y_origin = reader.u16()?;
    let width = reader.u16()? as u32;
    let height = reader.u16()? as u32;
    let bits_per_pixel = reader.u8()?;
    let image_descriptor = reader.u8()?;
    reader.skip(id_length as u64);

    let bpp = match bits_per_pixel {
        24 => 3,
        32 => 4,
        other => return Err(Error::StructuralError(format!("unsupported TGA bit depth {other}"))),
    };
    let format = if bpp == 3 { PixelFormat::Bgr } else { PixelFormat::Bgra };

    let pixel_count = width as usize * height as usize;
    let mut pixels = vec![0u8; pixel_count * bpp];
    match image_type {
        IMAGE_TYPE_UNCOMPRESSED => {
            pixels = reader.bytes(pixel_count * bpp)?;
        }
        IMAGE_TYPE_RLE => {
            let mut written = 0usize;
            while written < pixels.len() {
                let header = reader.u8()?;
                let count = (header & 0x7f) as usize + 1;
                if header & 0x80 != 0 {
                    let pixel = reader.bytes(bpp)?;
                    for _ in 0..count {
                        pixels[written..written + bpp].copy_from_slice(&pixel);
                        written += bpp;
                    }
                } else {
                    let raw = reader.bytes(count * bpp)?;
                    pixels[written..written + raw.len()].copy_from_slice(&raw);
                    written += raw.len();
                }
            }
        }
        other => return Err(Error::StructuralError(format!("unsupported TGA image type {other}"))),
    }

    // Bit 5 of the image descriptor: 0 means bottom-to-top row order.
    let top_to_bottom = image_descriptor & 0x20 != 0;
    if !top_to_bottom {
        flip_rows(&mut pixels, width as usize, height as usize, bpp);
    }

    Ok(Texture {
        width,
        height,
        format,
        mipmaps: vec![Mipmap { width, height, data: pixels }],
        txi: None,
    })
}

fn flip_rows(pixels: &mut [u8], width: usize, height: usize, bpp: usize) {
    let row_bytes = width * bpp;
    for row in 0..height / 2 {
        let top = row * row_bytes;
        let bottom = (height - 1 - row) * row_bytes;
        for i in 0..row_bytes {
            pixels.swap(top + i, bottom + i);
        }
    }
}

/// Always writes uncompressed, top-to-bottom, matching what every modding
/// tool in practice expects to find.
pub fn write(texture: &Texture) -> Result<Vec<u8>, Error> {
    let bpp = match texture.format {
        PixelFormat::Bgr => 3,
        PixelFormat::Bgra => 4,
        other => return Err(Error::EncodingError(format!("{other:?} has no TGA encoding"))),
    };
    let mip = texture.mipmaps.first().ok_or_else(|| Error::StructuralError(String::from("texture has no mipmap to write")))?;

    let mut writer = ByteWriter::new();
    writer.u8(0).unwrap(); // id_length
    writer.u8(0).unwrap(); // color_map_type
    writer.u8(IMAGE_TYPE_UNCOMPRESSED).unwrap();
    writer.bytes(&[0u8; 5]).unwrap();
    writer.u16(0).unwrap(); // x_origin
    writer.u16(0).unwrap(); // y_origin
    writer.u16(texture.width as u16).unwrap();
    writer.u16(texture.height as u16).unwrap();
    writer.u8(bpp as u8 * 8).unwrap();
    writer.u8(0x20).unwrap(); // top-to-bottom
    writer.bytes(&mip.data).unwrap();
    Ok(writer.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_uncompressed_32_bit() {
        let texture = Texture {
            width: 2,
            height: 1,
            format: PixelFormat::Bgra,
            mipmaps: vec![Mipmap { width: 2, height: 1, data: vec![1, 2, 3, 255, 4, 5, 6, 255] }],
            txi: None,
        };
        let bytes = write(&texture).unwrap();
        let read_back = read(&bytes).unwrap();
        assert_eq!(read_back, texture);
    }

    #[test]
    fn test_decodes_rle_stream() {
        let mut writer = ByteWriter::new();
        writer.u8(0).unwrap();
        writer.u8(0).unwrap();
        writer.u8(IMAGE_TYPE_RLE).unwrap();
        writer.bytes(&[0u8; 5]).unwrap();
        writer.u16(0).unwrap();
        writer.u16(0).unwrap();
        writer.u16(4).unwrap();
        writer.u16(1).unwrap();
        writer.u8(24).unwrap();
        writer.u8(0x20).unwrap();
        // One RLE packet: 4 identical BGR pixels.
        writer.u8(0x80 | 3).unwrap();
        writer.bytes(&[9, 8, 7]).unwrap();
        let bytes = writer.into_bytes();

        let texture = read(&bytes).unwrap();
        assert_eq!(texture.mipmaps[0].data, vec![9, 8, 7, 9, 8, 7, 9, 8, 7, 9, 8, 7]);
    }

    #[test]
    fn test_rejects_unsupported_bit_depth() {
        let mut writer = ByteWriter::new();
        writer.u8(0).unwrap();
        writer.u8(0).unwrap();
        writer.u8(IMAGE_TYPE_UNCOMPRESSED).unwrap();
        writer.bytes(&[0u8; 5]).unwrap();
        writer.u16(0).unwrap();
        writer.u16(0).unwrap();
        writer.u16(1).unwrap();
        writer.u16(1).unwrap();
        writer.u8(16).unwrap();
        writer.u8(0).unwrap();
        let bytes = writer.into_bytes();
        assert!(matches!(read(&bytes), Err(Error::StructuralError(_))));
    }
}
