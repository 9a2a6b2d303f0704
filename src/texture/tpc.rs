//! `TPC`: BioWare's own texture container. 128-byte header, a mipmap chain,
//! then an optional `TXI` text trailer.

use kotor_common::error::Error;
use kotor_common::stream::{ByteReader, ByteWriter};

use super::{mipmap_data_size, next_mip_size, Mipmap, PixelFormat, Texture};

const HEADER_SIZE: usize = 128;

fn encoding_to_format(encoding: u8, compressed: bool) -> Result<PixelFormat, Error> {
    match (encoding, compressed) {
        (1, false) => Ok(PixelFormat::Greyscale),
        (2, false) => Ok(PixelFormat::Rgb),
        (2, true) => Ok(PixelFormat::Dxt1),
        (4, false) => Ok(PixelFormat::Rgba),
        (4, true) => Ok(PixelFormat::Dxt5),
        (other, _) => Err(Error::StructuralError(format!("unrecognized TPC encoding byte {other}"))),
    }
}

fn format_to_encoding(format: PixelFormat) -> Result<(u8, bool), Error> {
    match format {
        PixelFormat::Greyscale => Ok((1, false)),
        PixelFormat::Rgb => Ok((2, false)),
        PixelFormat::Dxt1 => Ok((2, true)),
        PixelFormat::Rgba => Ok((4, false)),
        PixelFormat::Dxt5 => Ok((4, true)),
        other => Err(Error::EncodingError(format!("{other:?} has no TPC encoding"))),
    }
}

/// A `data_size` of 0 is the engine's own marker for an uncompressed
/// texture; compression is otherwise inferred from whether `data_size`
/// matches the uncompressed plane size for `width`/`height`.
fn is_compressed(data_size: u32, width: u32, height: u32, encoding: u8) -> bool {
    if data_size == 0 {
        return false;
    }
    let uncompressed_guess = match encoding {
        1 => width as u64 * height as u64,
        2 => width as u64 * height as u64 * 3,
        4 => width as u64 * height as u64 * 4,
        _ => return false,
    };
    (data_size as u64) < uncompressed_guess
}

pub fn read(data: &[u8]) -> Result<Texture, Error> {
    let mut reader = ByteReader::new(data);
    let data_size = reader.u32()?;
    let _unknown = reader.single()?;
    let width = reader.u16()? as u32;
    let height = reader.u16()? as u32;
    let encoding = reader.u8()?;
    let mipmap_count = reader.u8()?;
    reader.skip(HEADER_SIZE as u64 - reader.position());

    let compressed = is_compressed(data_size, width, height, encoding);
    let format = encoding_to_format(encoding, compressed)?;

    let mut mipmaps = Vec::with_capacity(mipmap_count as usize);
    let (mut mip_width, mut mip_height) = (width, height);
    for _ in 0..mipmap_count.max(1) {
        let size = mipmap_data_size(mip_width, mip_height, format);
        let bytes = reader.bytes(size)?;
        mipmaps.push(Mipmap { width: mip_width, height: mip_height, data: bytes });
        (mip_width, mip_height) = next_mip_size(mip_width, mip_height);
    }

    let remaining = reader.bytes(reader.remaining() as usize)?;
    let txi = if remaining.is_empty() {
        None
    } else {
        Some(remaining.iter().map(|&b| b as char).collect())
    };

    Ok(Texture { width, height, format, mipmaps, txi })
}

pub fn write(texture: &Texture) -> Result<Vec<u8>, Error> {
    let (encoding, compressed) = format_to_encoding(texture.format)?;
    let data_size = if compressed {
        texture.mipmaps.first().map(|m| m.data.len()).unwrap_or(0) as u32
    } else {
        0
    };

    let mut writer = ByteWriter::new();
    writer.u32(data_size).unwrap();
    writer.single(0.0).unwrap();
    writer.u16(texture.width as u16).unwrap();
    writer.u16(texture.height as u16).unwrap();
    writer.u8(encoding).unwrap();
    writer.u8(texture.mipmaps.len() as u8).unwrap();
    writer.bytes(&vec![0u8; HEADER_SIZE - writer.position() as usize]).unwrap();

    for mip in &texture.mipmaps {
        writer.bytes(&mip.data).unwrap();
    }
    if let Some(txi) = &texture.txi {
        writer.bytes(txi.as_bytes()).unwrap();
    }
    Ok(writer.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_uncompressed_rgb() {
        let texture = Texture {
            width: 2,
            height: 2,
            format: PixelFormat::Rgb,
            mipmaps: vec![Mipmap { width: 2, height: 2, data: vec![1; 12] }],
            txi: None,
        };
        let bytes = write(&texture).unwrap();
        let read_back = read(&bytes).unwrap();
        assert_eq!(read_back, texture);
    }

    #[test]
    fn test_round_trip_preserves_txi_trailer() {
        let texture = Texture {
            width: 4,
            height: 4,
            format: PixelFormat::Dxt1,
            mipmaps: vec![Mipmap { width: 4, height: 4, data: vec![0u8; 8] }],
            txi: Some(String::from("envmaptexture lm_01")),
        };
        let bytes = write(&texture).unwrap();
        let read_back = read(&bytes).unwrap();
        assert_eq!(read_back.txi.as_deref(), Some("envmaptexture lm_01"));
    }
}
