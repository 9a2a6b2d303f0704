//! Texture codecs: `TPC` (BioWare's own container), `DDS` (standard and
//! BioWare-compact variants) and `TGA`. All three decode into the same
//! in-memory [`Texture`] so callers never branch on source format.

pub mod dds;
pub mod tga;
pub mod tpc;

use kotor_encoding::dxt::{self, DxtFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Greyscale,
    Rgb,
    Rgba,
    Bgr,
    Bgra,
    Dxt1,
    Dxt3,
    Dxt5,
}

impl PixelFormat {
    pub fn is_compressed(self) -> bool {
        matches!(self, PixelFormat::Dxt1 | PixelFormat::Dxt3 | PixelFormat::Dxt5)
    }

    /// `None` for compressed formats, which pack 16 texels per block instead.
    pub fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            PixelFormat::Greyscale => Some(1),
            PixelFormat::Rgb | PixelFormat::Bgr => Some(3),
            PixelFormat::Rgba | PixelFormat::Bgra => Some(4),
            PixelFormat::Dxt1 | PixelFormat::Dxt3 | PixelFormat::Dxt5 => None,
        }
    }

    fn dxt_format(self) -> Option<DxtFormat> {
        match self {
            PixelFormat::Dxt1 => Some(DxtFormat::Dxt1),
            PixelFormat::Dxt3 => Some(DxtFormat::Dxt3),
            PixelFormat::Dxt5 => Some(DxtFormat::Dxt5),
            _ => None,
        }
    }
}

/// Byte size of a single mipmap level at `width`x`height` in `format`.
pub fn mipmap_data_size(width: u32, height: u32, format: PixelFormat) -> usize {
    match format.dxt_format() {
        Some(dxt) => {
            let blocks_w = ((width + 3) / 4).max(1) as usize;
            let blocks_h = ((height + 3) / 4).max(1) as usize;
            blocks_w * blocks_h * dxt.block_bytes()
        }
        None => width as usize * height as usize * format.bytes_per_pixel().unwrap_or(4),
    }
}

/// Halves both dimensions, flooring to a minimum of 1, matching the
/// engine's mipmap chain convention.
pub fn next_mip_size(width: u32, height: u32) -> (u32, u32) {
    ((width / 2).max(1), (height / 2).max(1))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mipmap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub mipmaps: Vec<Mipmap>,
    pub txi: Option<String>,
}

impl Texture {
    /// Decodes mipmap `index` into straight RGBA8888, row-major.
    pub fn to_rgba(&self, index: usize) -> Vec<u8> {
        let mip = &self.mipmaps[index];
        match self.format.dxt_format() {
            Some(dxt_format) => decode_dxt_plane(&mip.data, mip.width, mip.height, dxt_format),
            None => convert_plane_to_rgba(&mip.data, mip.width, mip.height, self.format),
        }
    }
}

fn decode_dxt_plane(data: &[u8], width: u32, height: u32, format: DxtFormat) -> Vec<u8> {
    let blocks_w = ((width + 3) / 4).max(1) as usize;
    let blocks_h = ((height + 3) / 4).max(1) as usize;
    let block_bytes = format.block_bytes();
    let mut out = vec![0u8; width as usize * height as usize * 4];

    for by in 0..blocks_h {
        for bx in 0..blocks_w {
            let block_index = by * blocks_w + bx;
            let start = block_index * block_bytes;
            let block_bytes_slice = &data[start..start + block_bytes];
            let decoded = match format {
                DxtFormat::Dxt1 => dxt::decode_dxt1_block(block_bytes_slice.try_into().unwrap()),
                DxtFormat::Dxt3 => dxt::decode_dxt3_block(block_bytes_slice.try_into().unwrap()),
                DxtFormat::Dxt5 => dxt::decode_dxt5_block(block_bytes_slice.try_into().unwrap()),
            };
            for row in 0..4 {
                let y = by * 4 + row;
                if y >= height as usize {
                    continue;
                }
                for col in 0..4 {
                    let x = bx * 4 + col;
                    if x >= width as usize {
                        continue;
                    }
                    let pixel = decoded[row * 4 + col];
                    let out_index = (y * width as usize + x) * 4;
                    out[out_index..out_index + 4].copy_from_slice(&pixel);
                }
            }
        }
    }
    out
}

fn convert_plane_to_rgba(data: &[u8], width: u32, height: u32, format: PixelFormat) -> Vec<u8> {
    let pixel_count = width as usize * height as usize;
    let mut out = vec![0u8; pixel_count * 4];
    let bpp = format.bytes_per_pixel().unwrap_or(4);
    for i in 0..pixel_count {
        let src = &data[i * bpp..i * bpp + bpp];
        let rgba = match format {
            PixelFormat::Greyscale => [src[0], src[0], src[0], 255],
            PixelFormat::Rgb => [src[0], src[1], src[2], 255],
            PixelFormat::Rgba => [src[0], src[1], src[2], src[3]],
            PixelFormat::Bgr => [src[2], src[1], src[0], 255],
            PixelFormat::Bgra => [src[2], src[1], src[0], src[3]],
            PixelFormat::Dxt1 | PixelFormat::Dxt3 | PixelFormat::Dxt5 => unreachable!(),
        };
        out[i * 4..i * 4 + 4].copy_from_slice(&rgba);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mipmap_data_size_dxt1() {
        assert_eq!(mipmap_data_size(4, 4, PixelFormat::Dxt1), 8);
        assert_eq!(mipmap_data_size(8, 8, PixelFormat::Dxt1), 32);
    }

    #[test]
    fn test_next_mip_size_floors_at_one() {
        assert_eq!(next_mip_size(1, 1), (1, 1));
        assert_eq!(next_mip_size(4, 2), (2, 1));
    }

    #[test]
    fn test_rgb_plane_round_trip_through_rgba() {
        let texture = Texture {
            width: 1,
            height: 1,
            format: PixelFormat::Rgb,
            mipmaps: vec![Mipmap { width: 1, height: 1, data: vec![10, 20, 30] }],
            txi: None,
        };
        assert_eq!(texture.to_rgba(0), vec![10, 20, 30, 255]);
    }
}
