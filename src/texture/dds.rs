//! `DDS`: accepts both the standard Microsoft container and BioWare's
//! compact variant (five `u32`s, no full `DDS_HEADER`).

use kotor_common::error::Error;
use kotor_common::stream::{ByteReader, ByteWriter};

use super::{mipmap_data_size, next_mip_size, Mipmap, PixelFormat, Texture};

const STANDARD_MAGIC: &str = "DDS ";
const STANDARD_HEADER_SIZE: u64 = 128; // "DDS " + 124-byte DDS_HEADER

fn fourcc_to_format(fourcc: &[u8; 4]) -> Result<PixelFormat, Error> {
    match fourcc {
        b"DXT1" => Ok(PixelFormat::Dxt1),
        b"DXT3" => Ok(PixelFormat::Dxt3),
        b"DXT5" => Ok(PixelFormat::Dxt5),
        other => Err(Error::StructuralError(format!(
            "unsupported DDS fourCC {:?}",
            String::from_utf8_lossy(other)
        ))),
    }
}

fn format_to_fourcc(format: PixelFormat) -> Result<[u8; 4], Error> {
    match format {
        PixelFormat::Dxt1 => Ok(*b"DXT1"),
        PixelFormat::Dxt3 => Ok(*b"DXT3"),
        PixelFormat::Dxt5 => Ok(*b"DXT5"),
        other => Err(Error::EncodingError(format!("{other:?} has no DDS fourCC"))),
    }
}

/// Reads either container; dispatch is by the first 4 bytes.
pub fn read(data: &[u8]) -> Result<Texture, Error> {
    let mut reader = ByteReader::new(data);
    let magic = reader.string(4)?;
    if magic == STANDARD_MAGIC {
        read_standard(data)
    } else {
        reader.set_position(0);
        read_bioware_compact(&mut reader)
    }
}

fn read_standard(data: &[u8]) -> Result<Texture, Error> {
    let mut reader = ByteReader::new(data);
    reader.skip(4); // "DDS "
    let _header_size = reader.u32()?;
    let _flags = reader.u32()?;
    let height = reader.u32()?;
    let width = reader.u32()?;
    let _pitch_or_linear_size = reader.u32()?;
    let _depth = reader.u32()?;
    let mipmap_count = reader.u32()?.max(1);
    reader.skip(44); // reserved1[11]

    let _pf_size = reader.u32()?;
    let _pf_flags = reader.u32()?;
    let fourcc: [u8; 4] = reader.bytes(4)?.try_into().unwrap();
    let format = fourcc_to_format(&fourcc)?;
    reader.skip(20); // rgb bit count + 4 color masks
    reader.skip(20); // caps1..4 + reserved2

    reader.set_position(STANDARD_HEADER_SIZE);

    let mut mipmaps = Vec::with_capacity(mipmap_count as usize);
    let (mut mip_width, mut mip_height) = (width, height);
    for _ in 0..mipmap_count {
        let size = mipmap_data_size(mip_width, mip_height, format);
        let bytes = reader.bytes(size)?;
        mipmaps.push(Mipmap { width: mip_width, height: mip_height, data: bytes });
        (mip_width, mip_height) = next_mip_size(mip_width, mip_height);
    }

    Ok(Texture { width, height, format, mipmaps, txi: None })
}

fn read_bioware_compact(reader: &mut ByteReader) -> Result<Texture, Error> {
    let width = reader.u32()?;
    let height = reader.u32()?;
    let dxt_version = reader.u32()?;
    let _data_size = reader.u32()?;
    let _reserved = reader.u32()?;

    let format = match dxt_version {
        1 => PixelFormat::Dxt1,
        5 => PixelFormat::Dxt5,
        other => return Err(Error::StructuralError(format!("unrecognized BioWare DDS dxt_version {other}"))),
    };

    let mut mipmaps = Vec::new();
    let (mut mip_width, mut mip_height) = (width, height);
    loop {
        let size = mipmap_data_size(mip_width, mip_height, format);
        if reader.remaining() < size as u64 {
            break;
        }
        let bytes = reader.bytes(size)?;
        mipmaps.push(Mipmap { width: mip_width, height: mip_height, data: bytes });
        if mip_width == 1 && mip_height == 1 {
            break;
        }
        (mip_width, mip_height) = next_mip_size(mip_width, mip_height);
    }

    Ok(Texture { width, height, format, mipmaps, txi: None })
}

/// Always writes the standard Microsoft container; the compact variant is
/// a read-compatibility accommodation, not something this toolkit produces.
pub fn write(texture: &Texture) -> Result<Vec<u8>, Error> {
    let fourcc = format_to_fourcc(texture.format)?;

    let mut writer = ByteWriter::new();
    writer.bytes(STANDARD_MAGIC.as_bytes()).unwrap();
    writer.u32(124).unwrap(); // header_size
    writer.u32(0x0002_100f).unwrap(); // CAPS|HEIGHT|WIDTH|PIXELFORMAT|LINEARSIZE|MIPMAPCOUNT
    writer.u32(texture.height).unwrap();
    writer.u32(texture.width).unwrap();
    writer.u32(texture.mipmaps.first().map(|m| m.data.len()).unwrap_or(0) as u32).unwrap();
    writer.u32(0).unwrap(); // depth
    writer.u32(texture.mipmaps.len() as u32).unwrap();
    writer.bytes(&[0u8; 44]).unwrap();

    writer.u32(32).unwrap(); // pixel format struct size
    writer.u32(0x4).unwrap(); // DDPF_FOURCC
    writer.bytes(&fourcc).unwrap();
    writer.bytes(&[0u8; 20]).unwrap();
    writer.bytes(&[0u8; 20]).unwrap();

    for mip in &texture.mipmaps {
        writer.bytes(&mip.data).unwrap();
    }
    Ok(writer.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_standard_container() {
        let texture = Texture {
            width: 4,
            height: 4,
            format: PixelFormat::Dxt5,
            mipmaps: vec![Mipmap { width: 4, height: 4, data: vec![7u8; 16] }],
            txi: None,
        };
        let bytes = write(&texture).unwrap();
        let read_back = read(&bytes).unwrap();
        assert_eq!(read_back, texture);
    }

    #[test]
    fn test_reads_bioware_compact_variant() {
        let mut writer = ByteWriter::new();
        writer.u32(8).unwrap(); // width
        writer.u32(8).unwrap(); // height
        writer.u32(1).unwrap(); // dxt_version = DXT1
        writer.u32(32).unwrap(); // data_size
        writer.u32(0).unwrap(); // reserved
        writer.bytes(&vec![0u8; 32]).unwrap(); // 2x2 blocks for the base mip
        writer.bytes(&vec![0u8; 8]).unwrap(); // 1x1 block for the next mip
        let bytes = writer.into_bytes();

        let texture = read(&bytes).unwrap();
        assert_eq!((texture.width, texture.height), (8, 8));
        assert_eq!(texture.format, PixelFormat::Dxt1);
        assert_eq!(texture.mipmaps.len(), 2);
    }
}
