//! `BZF`: a `BIF` variant storing each resource zlib-deflated. Used by the
//! Xbox/streaming releases to shrink the payload archives.

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use kotor_common::error::Error;
use kotor_common::stream::{ByteReader, ByteWriter};

const MAGIC: &str = "BIFF";
const VERSION: &str = "V1.1";
const HEADER_SIZE: u32 = 20;
const ENTRY_SIZE: u32 = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct BzfResource {
    pub id: u32,
    pub data: Vec<u8>,
    pub resource_type: u16,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bzf {
    pub resources: Vec<BzfResource>,
}

impl Bzf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, in_bif_index: u32) -> Option<&[u8]> {
        self.resources.get(in_bif_index as usize).map(|r| r.data.as_slice())
    }

    pub fn read(data: &[u8]) -> Result<Self, Error> {
        let mut reader = ByteReader::new(data);
        let magic = reader.string(4)?;
        if magic != MAGIC {
            return Err(Error::BadMagic { expected: MAGIC.to_string(), found: magic });
        }
        let version = reader.string(4)?;
        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        let var_resource_count = reader.u32()? as usize;
        let _fix_resource_count = reader.u32()?;
        let variable_table_offset = reader.u32()?;

        reader.set_position(variable_table_offset as u64);
        let mut raw = Vec::with_capacity(var_resource_count);
        for _ in 0..var_resource_count {
            let id = reader.u32()?;
            let offset = reader.u32()?;
            let disk_size = reader.u32()?;
            let uncompressed_size = reader.u32()?;
            let resource_type = reader.u32()? as u16;
            raw.push((id, offset, disk_size, uncompressed_size, resource_type));
        }

        let mut resources = Vec::with_capacity(var_resource_count);
        for (id, offset, disk_size, uncompressed_size, resource_type) in raw {
            let end = offset as usize + disk_size as usize;
            let on_disk = data
                .get(offset as usize..end)
                .ok_or_else(|| Error::StructuralError(String::from("BZF resource data out of range")))?;
            // disk_size == uncompressed_size marks an entry the writer
            // stored raw (compressing it wouldn't have shrunk it); only
            // entries that actually differ went through zlib.
            let bytes = if disk_size == uncompressed_size {
                on_disk.to_vec()
            } else {
                let mut decoder = ZlibDecoder::new(on_disk);
                let mut inflated = Vec::with_capacity(uncompressed_size as usize);
                decoder
                    .read_to_end(&mut inflated)
                    .map_err(|e| Error::EncodingError(format!("BZF inflate failed: {e}")))?;
                inflated
            };
            resources.push(BzfResource { id, data: bytes, resource_type });
        }
        Ok(Self { resources })
    }

    pub fn write(&self) -> Vec<u8> {
        let var_resource_count = self.resources.len() as u32;
        let variable_table_offset = HEADER_SIZE;
        let data_start = variable_table_offset + var_resource_count * ENTRY_SIZE;

        // Only keep the deflated form when it's actually smaller; an entry
        // stored raw round-trips with disk_size == uncompressed_size,
        // which read() takes as "don't inflate this one".
        let payloads: Vec<Vec<u8>> = self
            .resources
            .iter()
            .map(|resource| {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&resource.data).unwrap();
                let deflated = encoder.finish().unwrap();
                if deflated.len() < resource.data.len() {
                    deflated
                } else {
                    resource.data.clone()
                }
            })
            .collect();

        let mut writer = ByteWriter::new();
        writer.bytes(MAGIC.as_bytes()).unwrap();
        writer.bytes(VERSION.as_bytes()).unwrap();
        writer.u32(var_resource_count).unwrap();
        writer.u32(0).unwrap();
        writer.u32(variable_table_offset).unwrap();

        let mut offset = data_start;
        for (resource, payload) in self.resources.iter().zip(&payloads) {
            writer.u32(resource.id).unwrap();
            writer.u32(offset).unwrap();
            writer.u32(payload.len() as u32).unwrap();
            writer.u32(resource.data.len() as u32).unwrap();
            writer.u32(resource.resource_type as u32).unwrap();
            offset += payload.len() as u32;
        }

        for payload in &payloads {
            writer.bytes(payload).unwrap();
        }
        writer.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_compresses_and_inflates() {
        let mut bzf = Bzf::new();
        bzf.resources.push(BzfResource {
            id: 0,
            data: b"a very compressible payload, a very compressible payload".to_vec(),
            resource_type: 2027,
        });

        let bytes = bzf.write();
        let read_back = Bzf::read(&bytes).unwrap();
        assert_eq!(read_back, bzf);
    }

    #[test]
    fn test_incompressible_entry_is_stored_raw_not_deflated() {
        // Too short for zlib overhead to pay off; write() should fall back
        // to storing it raw rather than inflating the on-disk size.
        let mut bzf = Bzf::new();
        bzf.resources.push(BzfResource { id: 0, data: vec![1, 2, 3], resource_type: 1 });

        let bytes = bzf.write();
        let disk_size = u32::from_le_bytes(bytes[28..32].try_into().unwrap());
        let uncompressed_size = u32::from_le_bytes(bytes[32..36].try_into().unwrap());
        assert_eq!(disk_size, uncompressed_size);

        let read_back = Bzf::read(&bytes).unwrap();
        assert_eq!(read_back, bzf);
    }

    #[test]
    fn test_mixed_compressed_and_raw_entries_round_trip() {
        let mut bzf = Bzf::new();
        bzf.resources.push(BzfResource { id: 0, data: vec![9, 9], resource_type: 1 });
        bzf.resources.push(BzfResource {
            id: 1,
            data: b"a very compressible payload, a very compressible payload".to_vec(),
            resource_type: 2027,
        });

        let bytes = bzf.write();
        let read_back = Bzf::read(&bytes).unwrap();
        assert_eq!(read_back, bzf);
    }

    #[test]
    fn test_rejects_bad_version() {
        let mut bytes = Bzf::new().write();
        bytes[4..8].copy_from_slice(b"V1.0");
        let result = Bzf::read(&bytes);
        assert!(matches!(result, Err(Error::UnsupportedVersion(_))));
    }
}
