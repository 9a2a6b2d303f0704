//! `BIF`: the payload file a `KEY` resource entry's `in_bif_index` points
//! into. Holds raw resource bytes only; identity and type live in the `KEY`.

use kotor_common::error::Error;
use kotor_common::stream::{ByteReader, ByteWriter};

const MAGIC: &str = "BIFF";
const VERSION: &str = "V1.0";
const HEADER_SIZE: u32 = 20;
const ENTRY_SIZE: u32 = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct BifResource {
    pub id: u32,
    pub data: Vec<u8>,
    pub resource_type: u16,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bif {
    pub resources: Vec<BifResource>,
}

impl Bif {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks a resource up by its `in_bif_index`, as decoded from a `KEY`
    /// entry's locator.
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
            let file_size = reader.u32()?;
            let resource_type = reader.u32()? as u16;
            raw.push((id, offset, file_size, resource_type));
        }

        let mut resources = Vec::with_capacity(var_resource_count);
        for (id, offset, file_size, resource_type) in raw {
            let end = offset as usize + file_size as usize;
            let bytes = data
                .get(offset as usize..end)
                .ok_or_else(|| Error::StructuralError(String::from("BIF resource data out of range")))?;
            resources.push(BifResource { id, data: bytes.to_vec(), resource_type });
        }
        Ok(Self { resources })
    }

    pub fn write(&self) -> Vec<u8> {
        let var_resource_count = self.resources.len() as u32;
        let variable_table_offset = HEADER_SIZE;
        let data_start = variable_table_offset + var_resource_count * ENTRY_SIZE;

        let mut writer = ByteWriter::new();
        writer.bytes(MAGIC.as_bytes()).unwrap();
        writer.bytes(VERSION.as_bytes()).unwrap();
        writer.u32(var_resource_count).unwrap();
        writer.u32(0).unwrap(); // fix_resource_count, unused by this toolkit
        writer.u32(variable_table_offset).unwrap();

        let mut offset = data_start;
        for resource in &self.resources {
            writer.u32(resource.id).unwrap();
            writer.u32(offset).unwrap();
            writer.u32(resource.data.len() as u32).unwrap();
            writer.u32(resource.resource_type as u32).unwrap();
            offset += resource.data.len() as u32;
        }

        for resource in &self.resources {
            writer.bytes(&resource.data).unwrap();
        }
        writer.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut bif = Bif::new();
        bif.resources.push(BifResource { id: 0, data: vec![1, 2, 3], resource_type: 2027 });
        bif.resources.push(BifResource { id: 1, data: vec![4, 5], resource_type: 2012 });

        let bytes = bif.write();
        let read_back = Bif::read(&bytes).unwrap();
        assert_eq!(read_back, bif);
    }

    #[test]
    fn test_get_by_in_bif_index() {
        let mut bif = Bif::new();
        bif.resources.push(BifResource { id: 0, data: vec![9, 9], resource_type: 1 });
        assert_eq!(bif.get(0), Some([9, 9].as_slice()));
        assert_eq!(bif.get(5), None);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let result = Bif::read(b"NOPE0000");
        assert!(matches!(result, Err(Error::BadMagic { .. })));
    }
}
