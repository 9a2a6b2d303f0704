//! `ERF` family: `ERF`/`MOD`/`SAV`/`HAK`/`NWM` all share this layout, only
//! the 4-byte magic differs by convention.

use std::collections::HashSet;

use kotor_common::error::Error;
use kotor_common::resref::ResRef;
use kotor_common::stream::{ByteReader, ByteWriter};

use crate::resource_type::ResourceType;

use super::{FileResource, SourceKind};

const HEADER_SIZE: u32 = 160;
const KEY_ENTRY_SIZE: u32 = 24;
const RESOURCE_ENTRY_SIZE: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErfKind {
    Erf,
    Mod,
    Sav,
    Hak,
}

impl ErfKind {
    fn magic(&self) -> &'static str {
        match self {
            ErfKind::Erf => "ERF ",
            ErfKind::Mod => "MOD ",
            ErfKind::Sav => "SAV ",
            ErfKind::Hak => "HAK ",
        }
    }

    fn from_magic(magic: &str) -> Option<Self> {
        match magic {
            "ERF " => Some(ErfKind::Erf),
            "MOD " => Some(ErfKind::Mod),
            "SAV " => Some(ErfKind::Sav),
            "HAK " => Some(ErfKind::Hak),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErfResource {
    pub resref: ResRef,
    pub restype: ResourceType,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Erf {
    pub kind_magic: String,
    pub build_year: u32,
    pub build_day: u32,
    pub description_ref: i32,
    pub resources: Vec<ErfResource>,
}

impl Erf {
    pub fn new(kind: ErfKind) -> Self {
        Self {
            kind_magic: kind.magic().to_string(),
            build_year: 0,
            build_day: 0,
            description_ref: -1,
            resources: Vec::new(),
        }
    }

    pub fn push(&mut self, resref: ResRef, restype: ResourceType, data: Vec<u8>) -> Result<(), Error> {
        if self.resources.iter().any(|r| r.resref == resref && r.restype == restype) {
            return Err(Error::ValidationError(format!(
                "duplicate resource {resref}.{restype} in ERF archive"
            )));
        }
        self.resources.push(ErfResource { resref, restype, data });
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
        if ErfKind::from_magic(&magic).is_none() {
            return Err(Error::BadMagic {
                expected: String::from("ERF /MOD /SAV /HAK "),
                found: magic,
            });
        }
        let version = reader.string(4)?;
        if version != "V1.0" {
            return Err(Error::UnsupportedVersion(version));
        }

        let _language_count = reader.u32()?;
        let _localized_string_size = reader.u32()?;
        let entry_count = reader.u32()? as usize;
        let _offset_to_localized_strings = reader.u32()?;
        let offset_to_key_list = reader.u32()?;
        let offset_to_resource_list = reader.u32()?;
        let build_year = reader.u32()?;
        let build_day = reader.u32()?;
        let description_ref = reader.i32()?;
        reader.skip(116);

        reader.set_position(offset_to_key_list as u64);
        let mut keys = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            let resref = reader.string(16)?;
            let resource_id = reader.u32()?;
            let restype = reader.u16()?;
            let _unused = reader.u16()?;
            keys.push((ResRef::from_reader_bytes(&resref), resource_id, restype));
        }

        reader.set_position(offset_to_resource_list as u64);
        let mut ranges = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            let offset = reader.u32()?;
            let size = reader.u32()?;
            ranges.push((offset, size));
        }

        let mut resources = Vec::with_capacity(entry_count);
        for ((resref, _resource_id, restype), (offset, size)) in keys.into_iter().zip(ranges) {
            let end = offset as usize + size as usize;
            let bytes = data
                .get(offset as usize..end)
                .ok_or_else(|| Error::StructuralError(String::from("ERF resource data out of range")))?;
            resources.push(ErfResource {
                resref,
                restype: ResourceType::from_id(restype),
                data: bytes.to_vec(),
            });
        }

        Ok(Self {
            kind_magic: magic,
            build_year,
            build_day,
            description_ref,
            resources,
        })
    }

    /// Writer packs localized strings (always empty here) → key list →
    /// resource list → resource data, in that exact order.
    pub fn write(&self) -> Vec<u8> {
        let entry_count = self.resources.len() as u32;
        let offset_to_key_list = HEADER_SIZE;
        let offset_to_resource_list = offset_to_key_list + entry_count * KEY_ENTRY_SIZE;
        let data_start = offset_to_resource_list + entry_count * RESOURCE_ENTRY_SIZE;

        let mut writer = ByteWriter::new();
        writer.bytes(self.kind_magic.as_bytes()).unwrap();
        writer.bytes(b"V1.0").unwrap();
        writer.u32(0).unwrap(); // language_count
        writer.u32(0).unwrap(); // localized_string_size
        writer.u32(entry_count).unwrap();
        writer.u32(HEADER_SIZE).unwrap(); // offset_to_localized_strings (empty block sits right after header)
        writer.u32(offset_to_key_list).unwrap();
        writer.u32(offset_to_resource_list).unwrap();
        writer.u32(self.build_year).unwrap();
        writer.u32(self.build_day).unwrap();
        writer.i32(self.description_ref).unwrap();
        writer.bytes(&[0u8; 116]).unwrap();

        for (index, resource) in self.resources.iter().enumerate() {
            writer.string(resource.resref.as_str(), 16).unwrap();
            writer.u32(index as u32).unwrap();
            writer.u16(resource.restype.type_id()).unwrap();
            writer.u16(0).unwrap();
        }

        let mut offset = data_start;
        for resource in &self.resources {
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
        let data_start = HEADER_SIZE + entry_count * KEY_ENTRY_SIZE + entry_count * RESOURCE_ENTRY_SIZE;
        let mut offset = data_start;
        let mut out = Vec::with_capacity(self.resources.len());
        for resource in &self.resources {
            out.push(FileResource {
                resref: resource.resref.clone(),
                restype: resource.restype,
                offset,
                size: resource.data.len() as u32,
                source_path: source_path.to_string(),
                source_kind: SourceKind::Erf,
            });
            offset += resource.data.len() as u32;
        }
        out
    }

    pub fn seen_identifiers(&self) -> HashSet<(String, u16)> {
        self.resources
            .iter()
            .map(|r| (r.resref.as_str().to_string(), r.restype.type_id()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut erf = Erf::new(ErfKind::Mod);
        erf.push(ResRef::try_from("module").unwrap(), ResourceType::Ifo, vec![1, 2, 3, 4]).unwrap();
        erf.push(ResRef::try_from("danm13").unwrap(), ResourceType::Are, vec![9, 9]).unwrap();

        let bytes = erf.write();
        let read_back = Erf::read(&bytes).unwrap();
        assert_eq!(read_back.resources, erf.resources);
        assert_eq!(read_back.kind_magic, "MOD ");
    }

    #[test]
    fn test_get_by_resref_and_type() {
        let mut erf = Erf::new(ErfKind::Erf);
        erf.push(ResRef::try_from("icon").unwrap(), ResourceType::Tga, vec![5]).unwrap();
        assert_eq!(erf.get("ICON", ResourceType::Tga), Some([5].as_slice()));
        assert_eq!(erf.get("icon", ResourceType::Bmp), None);
    }

    #[test]
    fn test_rejects_duplicate_resource() {
        let mut erf = Erf::new(ErfKind::Erf);
        erf.push(ResRef::try_from("icon").unwrap(), ResourceType::Tga, vec![5]).unwrap();
        let result = erf.push(ResRef::try_from("ICON").unwrap(), ResourceType::Tga, vec![6]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_bad_magic() {
        let result = Erf::read(b"NOPE0000");
        assert!(matches!(result, Err(Error::BadMagic { .. })));
    }
}
