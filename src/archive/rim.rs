//! `RIM`: a simpler, single-table archive used for static module data (as
//! opposed to the savable `.mod`/`.sav` `ERF` variants).

use kotor_common::error::Error;
use kotor_common::resref::ResRef;
use kotor_common::stream::{ByteReader, ByteWriter};

use crate::resource_type::ResourceType;

use super::{FileResource, SourceKind};

const MAGIC: &str = "RIM ";
const VERSION: &str = "V1.0";
const HEADER_SIZE: u32 = 120;
const ENTRY_SIZE: u32 = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct RimResource {
    pub resref: ResRef,
    pub restype: ResourceType,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rim {
    pub resources: Vec<RimResource>,
}

impl Rim {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, resref: ResRef, restype: ResourceType, data: Vec<u8>) -> Result<(), Error> {
        if self.resources.iter().any(|r| r.resref == resref && r.restype == restype) {
            return Err(Error::ValidationError(format!(
                "duplicate resource {resref}.{restype} in RIM archive"
            )));
        }
        self.resources.push(RimResource { resref, restype, data });
        Ok(())
    }

    pub fn get(&self, resref: &str, restype: ResourceType) -> Option<&[u8]> {
        self.resources
            .iter()
            .find(|r| r.resref == *resref && r.restype == restype)
            .map(|r| r.data.as_slice())
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
        reader.skip(4); // reserved
        let entry_count = reader.u32()? as usize;
        let offset_to_entries = reader.u32()?;
        reader.skip(100); // reserved

        reader.set_position(offset_to_entries as u64);
        let mut resources = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            let resref = reader.string(16)?;
            let restype = reader.u32()? as u16;
            let _resource_id = reader.u32()?;
            let offset = reader.u32()?;
            let size = reader.u32()?;

            let end = offset as usize + size as usize;
            let bytes = data
                .get(offset as usize..end)
                .ok_or_else(|| Error::StructuralError(String::from("RIM resource data out of range")))?;
            resources.push(RimResource {
                resref: ResRef::from_reader_bytes(&resref),
                restype: ResourceType::from_id(restype),
                data: bytes.to_vec(),
            });
        }
        Ok(Self { resources })
    }

    pub fn write(&self) -> Vec<u8> {
        let entry_count = self.resources.len() as u32;
        let offset_to_entries = HEADER_SIZE;
        let data_start = offset_to_entries + entry_count * ENTRY_SIZE;

        let mut writer = ByteWriter::new();
        writer.bytes(MAGIC.as_bytes()).unwrap();
        writer.bytes(VERSION.as_bytes()).unwrap();
        writer.bytes(&[0u8; 4]).unwrap();
        writer.u32(entry_count).unwrap();
        writer.u32(offset_to_entries).unwrap();
        writer.bytes(&[0u8; 100]).unwrap();

        let mut offset = data_start;
        for (index, resource) in self.resources.iter().enumerate() {
            writer.string(resource.resref.as_str(), 16).unwrap();
            writer.u32(resource.restype.type_id() as u32).unwrap();
            writer.u32(index as u32).unwrap();
            writer.u32(offset).unwrap();
            writer.u32(resource.data.len() as u32).unwrap();
            offset += resource.data.len() as u32;
        }

        for resource in &self.resources {
            writer.bytes(&resource.data).unwrap();
        }
        writer.into_bytes()
    }

    pub fn entries(&self, source_path: &str) -> Vec<FileResource> {
        let entry_count = self.resources.len() as u32;
        let mut offset = HEADER_SIZE + entry_count * ENTRY_SIZE;
        let mut out = Vec::with_capacity(self.resources.len());
        for resource in &self.resources {
            out.push(FileResource {
                resref: resource.resref.clone(),
                restype: resource.restype,
                offset,
                size: resource.data.len() as u32,
                source_path: source_path.to_string(),
                source_kind: SourceKind::Rim,
            });
            offset += resource.data.len() as u32;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut rim = Rim::new();
        rim.push(ResRef::try_from("danm13").unwrap(), ResourceType::Are, vec![1, 2, 3]).unwrap();
        rim.push(ResRef::try_from("danm13").unwrap(), ResourceType::Git, vec![4, 5]).unwrap();

        let bytes = rim.write();
        let read_back = Rim::read(&bytes).unwrap();
        assert_eq!(read_back, rim);
    }

    #[test]
    fn test_get_is_case_insensitive() {
        let mut rim = Rim::new();
        rim.push(ResRef::try_from("danm13").unwrap(), ResourceType::Are, vec![7]).unwrap();
        assert_eq!(rim.get("DANM13", ResourceType::Are), Some([7].as_slice()));
    }

    #[test]
    fn test_rejects_bad_magic() {
        let result = Rim::read(b"NOPE0000");
        assert!(matches!(result, Err(Error::BadMagic { .. })));
    }
}
