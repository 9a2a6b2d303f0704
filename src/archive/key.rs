//! `KEY`: the top-level catalog indexing every `BIF` shipped with the
//! installation. Resource identities live in the `KEY`; payload bytes live
//! in the `BIF`s it references.

use kotor_common::error::Error;
use kotor_common::resref::ResRef;
use kotor_common::stream::{ByteReader, ByteWriter};

use crate::resource_type::ResourceType;

const MAGIC: &str = "KEY ";
const VERSION: &str = "V1.0";
const HEADER_SIZE: u32 = 64;
const BIF_ENTRY_SIZE: u32 = 12;
const RESOURCE_ENTRY_SIZE: u32 = 22;

/// Resource index bit layout shared with `BIF`: the high bits select which
/// `BIF` a resource lives in, the low bits select the resource within it.
pub const IN_BIF_INDEX_BITS: u32 = 20;

pub fn decompose_locator(locator: u32) -> (u32, u32) {
    (locator >> IN_BIF_INDEX_BITS, locator & ((1 << IN_BIF_INDEX_BITS) - 1))
}

pub fn compose_locator(bif_index: u32, in_bif_index: u32) -> u32 {
    (bif_index << IN_BIF_INDEX_BITS) | (in_bif_index & ((1 << IN_BIF_INDEX_BITS) - 1))
}

#[derive(Debug, Clone, PartialEq)]
pub struct BifDescriptor {
    pub filename: String,
    pub file_size: u32,
    pub drives: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyEntry {
    pub resref: ResRef,
    pub restype: ResourceType,
    pub bif_index: u32,
    pub in_bif_index: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Key {
    pub build_year: u32,
    pub build_day: u32,
    pub bifs: Vec<BifDescriptor>,
    pub entries: Vec<KeyEntry>,
}

impl Key {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, resref: &str, restype: ResourceType) -> Option<&KeyEntry> {
        self.entries.iter().find(|e| e.resref == *resref && e.restype == restype)
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
        let bif_count = reader.u32()? as usize;
        let resource_count = reader.u32()? as usize;
        let offset_to_bif_entries = reader.u32()?;
        let offset_to_resource_entries = reader.u32()?;
        let build_year = reader.u32()?;
        let build_day = reader.u32()?;
        reader.skip(32);

        reader.set_position(offset_to_bif_entries as u64);
        let mut raw_bifs = Vec::with_capacity(bif_count);
        for _ in 0..bif_count {
            let file_size = reader.u32()?;
            let filename_offset = reader.u32()?;
            let filename_size = reader.u16()?;
            let drives = reader.u16()?;
            raw_bifs.push((file_size, filename_offset, filename_size, drives));
        }

        let mut bifs = Vec::with_capacity(bif_count);
        for (file_size, filename_offset, filename_size, drives) in raw_bifs {
            let name_bytes = data
                .get(filename_offset as usize..filename_offset as usize + filename_size as usize)
                .ok_or_else(|| Error::StructuralError(String::from("KEY bif filename out of range")))?;
            let end = name_bytes.iter().position(|&b| b == 0).unwrap_or(name_bytes.len());
            let filename: String = name_bytes[..end].iter().map(|&b| b as char).collect();
            bifs.push(BifDescriptor { filename, file_size, drives });
        }

        reader.set_position(offset_to_resource_entries as u64);
        let mut entries = Vec::with_capacity(resource_count);
        for _ in 0..resource_count {
            let resref = reader.string(16)?;
            let restype = reader.u16()?;
            let resource_id = reader.u32()?;
            let (bif_index, in_bif_index) = decompose_locator(resource_id);
            entries.push(KeyEntry {
                resref: ResRef::from_reader_bytes(&resref),
                restype: ResourceType::from_id(restype),
                bif_index,
                in_bif_index,
            });
        }

        Ok(Self { build_year, build_day, bifs, entries })
    }

    pub fn write(&self) -> Vec<u8> {
        let bif_count = self.bifs.len() as u32;
        let resource_count = self.entries.len() as u32;
        let offset_to_bif_entries = HEADER_SIZE;
        let offset_to_resource_entries = offset_to_bif_entries + bif_count * BIF_ENTRY_SIZE;
        let filename_block_start = offset_to_resource_entries + resource_count * RESOURCE_ENTRY_SIZE;

        let mut filename_block = Vec::new();
        let mut filename_offsets = Vec::with_capacity(self.bifs.len());
        for bif in &self.bifs {
            filename_offsets.push(filename_block_start + filename_block.len() as u32);
            filename_block.extend_from_slice(bif.filename.as_bytes());
            filename_block.push(0);
        }

        let mut writer = ByteWriter::new();
        writer.bytes(MAGIC.as_bytes()).unwrap();
        writer.bytes(VERSION.as_bytes()).unwrap();
        writer.u32(bif_count).unwrap();
        writer.u32(resource_count).unwrap();
        writer.u32(offset_to_bif_entries).unwrap();
        writer.u32(offset_to_resource_entries).unwrap();
        writer.u32(self.build_year).unwrap();
        writer.u32(self.build_day).unwrap();
        writer.bytes(&[0u8; 32]).unwrap();

        for (bif, filename_offset) in self.bifs.iter().zip(&filename_offsets) {
            writer.u32(bif.file_size).unwrap();
            writer.u32(*filename_offset).unwrap();
            writer.u16(bif.filename.len() as u16 + 1).unwrap();
            writer.u16(bif.drives).unwrap();
        }

        for entry in &self.entries {
            writer.string(entry.resref.as_str(), 16).unwrap();
            writer.u16(entry.restype.type_id()).unwrap();
            writer.u32(compose_locator(entry.bif_index, entry.in_bif_index)).unwrap();
        }

        writer.bytes(&filename_block).unwrap();
        writer.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_round_trips() {
        let locator = compose_locator(15, 40);
        assert_eq!(decompose_locator(locator), (15, 40));
    }

    #[test]
    fn test_round_trip() {
        let mut key = Key::new();
        key.bifs.push(BifDescriptor { filename: String::from("data/chitin.bif"), file_size: 1000, drives: 0b11 });
        key.entries.push(KeyEntry {
            resref: ResRef::try_from("p_bastila").unwrap(),
            restype: ResourceType::Utc,
            bif_index: 0,
            in_bif_index: 12,
        });

        let bytes = key.write();
        let read_back = Key::read(&bytes).unwrap();
        assert_eq!(read_back, key);
    }

    #[test]
    fn test_resolve_finds_entry_case_insensitively() {
        let mut key = Key::new();
        key.entries.push(KeyEntry {
            resref: ResRef::try_from("p_bastila").unwrap(),
            restype: ResourceType::Utc,
            bif_index: 0,
            in_bif_index: 5,
        });
        assert!(key.resolve("P_BASTILA", ResourceType::Utc).is_some());
    }

    #[test]
    fn test_rejects_bad_magic() {
        let result = Key::read(b"NOPE0000");
        assert!(matches!(result, Err(Error::BadMagic { .. })));
    }
}
