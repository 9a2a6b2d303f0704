//! Binary reader for the GFF format.
//!
//! Parses the header-declared struct/field/label/field-data/field-indices/
//! list-indices arrays, then walks the graph from the root struct (struct
//! index 0) to materialize an owned [`GffStruct`] tree.

use kotor_common::error::Error;
use kotor_common::resref::ResRef;
use kotor_common::stream::ByteReader;

use super::field::{GffField, GffFieldValue, GffList, GffStruct, LocalizedString, LocalizedSubstring};

const HEADER_SIZE: u64 = 56;

struct StructEntry {
    struct_type: u32,
    data_or_offset: u32,
    field_count: u32,
}

struct FieldEntry {
    field_type: u32,
    label_index: u32,
    data_or_offset: u32,
}

pub struct GffReader<'a> {
    data: &'a [u8],
    structs: Vec<StructEntry>,
    fields: Vec<FieldEntry>,
    labels: Vec<String>,
    field_data_offset: u64,
    field_indices_offset: u64,
    list_indices_offset: u64,
}

impl<'a> GffReader<'a> {
    /// `expected_type` is the 4-byte file-type magic (e.g. `"UTC "`); pass
    /// `None` to accept any GFF-family file.
    pub fn read(data: &'a [u8], expected_type: Option<&str>) -> Result<(GffStruct, String), Error> {
        let mut header = ByteReader::new(data);
        let file_type = header.string(4)?;
        let file_version = header.string(4)?;

        if let Some(expected) = expected_type {
            if file_type.trim_end() != expected.trim_end() {
                return Err(Error::BadMagic {
                    expected: expected.to_string(),
                    found: file_type.clone(),
                });
            }
        }
        if file_version != "V3.2" {
            return Err(Error::UnsupportedVersion(file_version));
        }

        let struct_offset = header.u32()? as u64;
        let struct_count = header.u32()?;
        let field_offset = header.u32()? as u64;
        let field_count = header.u32()?;
        let label_offset = header.u32()? as u64;
        let label_count = header.u32()?;
        let field_data_offset = header.u32()? as u64;
        let _field_data_count = header.u32()?;
        let field_indices_offset = header.u32()? as u64;
        let _field_indices_count = header.u32()?;
        let list_indices_offset = header.u32()? as u64;
        let _list_indices_count = header.u32()?;

        if struct_offset < HEADER_SIZE && struct_count > 0 {
            return Err(Error::StructuralError(String::from(
                "struct array offset precedes header",
            )));
        }

        let mut structs = Vec::with_capacity(struct_count as usize);
        let mut struct_reader = ByteReader::new(data);
        struct_reader.set_position(struct_offset);
        for _ in 0..struct_count {
            structs.push(StructEntry {
                struct_type: struct_reader.u32()?,
                data_or_offset: struct_reader.u32()?,
                field_count: struct_reader.u32()?,
            });
        }

        let mut fields = Vec::with_capacity(field_count as usize);
        let mut field_reader = ByteReader::new(data);
        field_reader.set_position(field_offset);
        for _ in 0..field_count {
            fields.push(FieldEntry {
                field_type: field_reader.u32()?,
                label_index: field_reader.u32()?,
                data_or_offset: field_reader.u32()?,
            });
        }

        let mut labels = Vec::with_capacity(label_count as usize);
        let mut label_reader = ByteReader::new(data);
        label_reader.set_position(label_offset);
        for _ in 0..label_count {
            labels.push(label_reader.string(16)?);
        }

        let reader = GffReader {
            data,
            structs,
            fields,
            labels,
            field_data_offset,
            field_indices_offset,
            list_indices_offset,
        };

        if reader.structs.is_empty() {
            return Err(Error::StructuralError(String::from("GFF has no structs")));
        }

        let root = reader.read_struct(0)?;
        Ok((root, file_type))
    }

    fn read_struct(&self, struct_index: usize) -> Result<GffStruct, Error> {
        let entry = self
            .structs
            .get(struct_index)
            .ok_or_else(|| Error::StructuralError(format!("struct index {struct_index} out of range")))?;

        let mut gff_struct = GffStruct::new(entry.struct_type);

        let field_indices: Vec<u32> = if entry.field_count == 1 {
            vec![entry.data_or_offset]
        } else if entry.field_count == 0 {
            Vec::new()
        } else {
            self.read_field_indices(entry.data_or_offset as u64, entry.field_count)?
        };

        for field_index in field_indices {
            let field = self.read_field(field_index as usize)?;
            gff_struct.set(&field.label, field.value);
        }

        Ok(gff_struct)
    }

    fn read_field_indices(&self, offset: u64, count: u32) -> Result<Vec<u32>, Error> {
        let mut reader = ByteReader::new(self.data);
        reader.set_position(self.field_indices_offset + offset);
        (0..count).map(|_| reader.u32()).collect()
    }

    fn read_field(&self, field_index: usize) -> Result<GffField, Error> {
        let entry = self
            .fields
            .get(field_index)
            .ok_or_else(|| Error::StructuralError(format!("field index {field_index} out of range")))?;
        let label = self
            .labels
            .get(entry.label_index as usize)
            .cloned()
            .ok_or_else(|| Error::StructuralError(format!("label index {} out of range", entry.label_index)))?;

        let value = match entry.field_type {
            0 => GffFieldValue::UInt8(entry.data_or_offset as u8),
            1 => GffFieldValue::Int8(entry.data_or_offset as i8),
            2 => GffFieldValue::UInt16(entry.data_or_offset as u16),
            3 => GffFieldValue::Int16(entry.data_or_offset as i16),
            4 => GffFieldValue::UInt32(entry.data_or_offset),
            5 => GffFieldValue::Int32(entry.data_or_offset as i32),
            6 => GffFieldValue::UInt64(self.field_data_u64(entry.data_or_offset as u64)?),
            7 => GffFieldValue::Int64(self.field_data_u64(entry.data_or_offset as u64)? as i64),
            8 => GffFieldValue::Single(f32::from_bits(entry.data_or_offset)),
            9 => GffFieldValue::Double(self.field_data_f64(entry.data_or_offset as u64)?),
            10 => GffFieldValue::ExoString(self.field_data_exo_string(entry.data_or_offset as u64)?),
            11 => GffFieldValue::ResRef(self.field_data_resref(entry.data_or_offset as u64)?),
            12 => GffFieldValue::LocalizedString(self.field_data_locstring(entry.data_or_offset as u64)?),
            13 => GffFieldValue::Binary(self.field_data_void(entry.data_or_offset as u64)?),
            14 => GffFieldValue::Struct(Box::new(self.read_struct(entry.data_or_offset as usize)?)),
            15 => GffFieldValue::List(self.read_list(entry.data_or_offset as u64)?),
            16 => GffFieldValue::Orientation(self.field_data_vector4(entry.data_or_offset as u64)?),
            17 => GffFieldValue::Vector3(self.field_data_vector3(entry.data_or_offset as u64)?),
            other => {
                return Err(Error::StructuralError(format!(
                    "unrecognized GFF field type {other}"
                )))
            }
        };

        Ok(GffField { label, value })
    }

    fn read_list(&self, offset: u64) -> Result<GffList, Error> {
        let mut reader = ByteReader::new(self.data);
        reader.set_position(self.list_indices_offset + offset);
        let count = reader.u32()?;
        let mut list = GffList::new();
        for _ in 0..count {
            let struct_index = reader.u32()?;
            list.structs.push(self.read_struct(struct_index as usize)?);
        }
        Ok(list)
    }

    fn field_data_reader(&self, offset: u64) -> ByteReader<'a> {
        let mut reader = ByteReader::new(self.data);
        reader.set_position(self.field_data_offset + offset);
        reader
    }

    fn field_data_u64(&self, offset: u64) -> Result<u64, Error> {
        self.field_data_reader(offset).u64()
    }

    fn field_data_f64(&self, offset: u64) -> Result<f64, Error> {
        self.field_data_reader(offset).double()
    }

    fn field_data_vector3(&self, offset: u64) -> Result<[f32; 3], Error> {
        self.field_data_reader(offset).vector3()
    }

    fn field_data_vector4(&self, offset: u64) -> Result<[f32; 4], Error> {
        self.field_data_reader(offset).vector4()
    }

    fn field_data_exo_string(&self, offset: u64) -> Result<String, Error> {
        let mut reader = self.field_data_reader(offset);
        let length = reader.u32()? as usize;
        let bytes = reader.bytes(length)?;
        Ok(bytes.iter().map(|&b| b as char).collect())
    }

    fn field_data_resref(&self, offset: u64) -> Result<ResRef, Error> {
        let mut reader = self.field_data_reader(offset);
        let length = reader.u8()? as usize;
        let bytes = reader.bytes(length)?;
        let text: String = bytes.iter().map(|&b| b as char).collect();
        Ok(ResRef::from_reader_bytes(&text))
    }

    fn field_data_void(&self, offset: u64) -> Result<Vec<u8>, Error> {
        let mut reader = self.field_data_reader(offset);
        let length = reader.u32()? as usize;
        reader.bytes(length)
    }

    fn field_data_locstring(&self, offset: u64) -> Result<LocalizedString, Error> {
        let mut reader = self.field_data_reader(offset);
        let _total_size = reader.u32()?;
        let string_ref = reader.i32()?;
        let substring_count = reader.u32()?;
        let mut substrings = Vec::with_capacity(substring_count as usize);
        for _ in 0..substring_count {
            let language_id = reader.u32()?;
            let byte_len = reader.u32()? as usize;
            let bytes = reader.bytes(byte_len)?;
            substrings.push(LocalizedSubstring {
                language_id,
                string: bytes.iter().map(|&b| b as char).collect(),
            });
        }
        Ok(LocalizedString {
            string_ref,
            substrings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gff::writer::GffWriter;

    #[test]
    fn test_round_trip_scalar_fields() {
        let mut root = GffStruct::new(0xffff_ffff);
        root.set("HP", GffFieldValue::Int16(100));
        root.set("Tag", GffFieldValue::ExoString(String::from("P_BASTILA")));
        root.set("TemplateResRef", GffFieldValue::ResRef(ResRef::from_reader_bytes("p_bastila")));

        let bytes = GffWriter::write(&root, "UTC ").unwrap();
        let (read_back, file_type) = GffReader::read(&bytes, Some("UTC ")).unwrap();

        assert_eq!(file_type.trim_end(), "UTC");
        assert_eq!(read_back.get("HP"), Some(&GffFieldValue::Int16(100)));
        assert_eq!(
            read_back.get("Tag"),
            Some(&GffFieldValue::ExoString(String::from("P_BASTILA")))
        );
    }

    #[test]
    fn test_nested_struct_and_list_round_trip() {
        let mut child = GffStruct::new(0);
        child.set("Index", GffFieldValue::Int32(1));

        let mut list = GffList::new();
        list.structs.push(child);

        let mut root = GffStruct::new(0xffff_ffff);
        root.set("ItemList", GffFieldValue::List(list));

        let bytes = GffWriter::write(&root, "UTI ").unwrap();
        let (read_back, _) = GffReader::read(&bytes, None).unwrap();

        match read_back.get("ItemList").unwrap() {
            GffFieldValue::List(list) => {
                assert_eq!(list.structs.len(), 1);
                assert_eq!(list.structs[0].get("Index"), Some(&GffFieldValue::Int32(1)));
            }
            other => panic!("expected list field, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        let mut root = GffStruct::new(0);
        root.set("X", GffFieldValue::UInt8(1));
        let bytes = GffWriter::write(&root, "UTC ").unwrap();
        let result = GffReader::read(&bytes, Some("ARE "));
        assert!(matches!(result, Err(Error::BadMagic { .. })));
    }
}
