//! Binary writer for the GFF format.
//!
//! Deterministic: struct indices are assigned in a fixed pre-order walk,
//! labels are deduplicated into a single pool, and field data is appended
//! in field-declaration order. Two semantically equal trees always produce
//! identical bytes.

use kotor_common::error::Error;
use kotor_common::stream::ByteWriter;

use super::field::{GffField, GffFieldValue, GffList, GffStruct};
use super::validator;

const HEADER_SIZE: u32 = 56;
const STRUCT_ENTRY_SIZE: u32 = 12;
const FIELD_ENTRY_SIZE: u32 = 12;
const LABEL_SIZE: u32 = 16;

struct StructOut {
    struct_type: u32,
    field_count: u32,
    data_or_offset: u32,
}

struct FieldOut {
    field_type: u32,
    label_index: u32,
    data_or_offset: u32,
}

pub struct GffWriter {
    structs: Vec<StructOut>,
    fields: Vec<FieldOut>,
    labels: Vec<String>,
    field_data: ByteWriter,
    field_indices: ByteWriter,
    list_indices: ByteWriter,
}

impl GffWriter {
    pub fn write(root: &GffStruct, file_type: &str) -> Result<Vec<u8>, Error> {
        validator::validate(root)?;

        let mut writer = GffWriter {
            structs: Vec::new(),
            fields: Vec::new(),
            labels: Vec::new(),
            field_data: ByteWriter::new(),
            field_indices: ByteWriter::new(),
            list_indices: ByteWriter::new(),
        };
        writer.visit_struct(root);
        Ok(writer.finish(file_type))
    }

    fn label_index(&mut self, label: &str) -> u32 {
        if let Some(index) = self.labels.iter().position(|existing| existing == label) {
            return index as u32;
        }
        self.labels.push(label.to_string());
        (self.labels.len() - 1) as u32
    }

    /// Appends this struct (and everything it references) in pre-order,
    /// returning its assigned struct index.
    fn visit_struct(&mut self, gff_struct: &GffStruct) -> u32 {
        let struct_index = self.structs.len() as u32;
        self.structs.push(StructOut {
            struct_type: gff_struct.struct_id,
            field_count: gff_struct.len() as u32,
            data_or_offset: 0,
        });

        let mut field_indices = Vec::with_capacity(gff_struct.len());
        for field in gff_struct {
            field_indices.push(self.visit_field(field));
        }

        let data_or_offset = if field_indices.len() == 1 {
            field_indices[0]
        } else if field_indices.is_empty() {
            0
        } else {
            let offset = self.field_indices.position() as u32;
            for index in field_indices {
                self.field_indices.u32(index).unwrap();
            }
            offset
        };
        self.structs[struct_index as usize].data_or_offset = data_or_offset;

        struct_index
    }

    /// Builds and appends this field, returning its global field index.
    fn visit_field(&mut self, field: &GffField) -> u32 {
        let label_index = self.label_index(&field.label);
        let field_type = field.value.type_id();

        let data_or_offset = match &field.value {
            GffFieldValue::UInt8(v) => *v as u32,
            GffFieldValue::Int8(v) => *v as u8 as u32,
            GffFieldValue::UInt16(v) => *v as u32,
            GffFieldValue::Int16(v) => *v as u16 as u32,
            GffFieldValue::UInt32(v) => *v,
            GffFieldValue::Int32(v) => *v as u32,
            GffFieldValue::Single(v) => v.to_bits(),
            GffFieldValue::UInt64(v) => self.append_field_data_u64(*v),
            GffFieldValue::Int64(v) => self.append_field_data_u64(*v as u64),
            GffFieldValue::Double(v) => self.append_field_data_f64(*v),
            GffFieldValue::ExoString(s) => self.append_field_data_exo_string(s),
            GffFieldValue::ResRef(r) => self.append_field_data_resref(r.as_str()),
            GffFieldValue::LocalizedString(locstring) => self.append_field_data_locstring(locstring),
            GffFieldValue::Binary(bytes) => self.append_field_data_void(bytes),
            GffFieldValue::Struct(inner) => self.visit_struct(inner),
            GffFieldValue::List(list) => self.visit_list(list),
            GffFieldValue::Orientation(v) => self.append_field_data_vector4(*v),
            GffFieldValue::Vector3(v) => self.append_field_data_vector3(*v),
        };

        let field_index = self.fields.len() as u32;
        self.fields.push(FieldOut {
            field_type,
            label_index,
            data_or_offset,
        });
        field_index
    }

    fn visit_list(&mut self, list: &GffList) -> u32 {
        let struct_indices: Vec<u32> = list.structs.iter().map(|s| self.visit_struct(s)).collect();
        let offset = self.list_indices.position() as u32;
        self.list_indices.u32(struct_indices.len() as u32).unwrap();
        for index in struct_indices {
            self.list_indices.u32(index).unwrap();
        }
        offset
    }

    fn append_field_data_u64(&mut self, value: u64) -> u32 {
        let offset = self.field_data.position() as u32;
        self.field_data.u64(value).unwrap();
        offset
    }

    fn append_field_data_f64(&mut self, value: f64) -> u32 {
        let offset = self.field_data.position() as u32;
        self.field_data.double(value).unwrap();
        offset
    }

    fn append_field_data_vector3(&mut self, value: [f32; 3]) -> u32 {
        let offset = self.field_data.position() as u32;
        self.field_data.vector3(value).unwrap();
        offset
    }

    fn append_field_data_vector4(&mut self, value: [f32; 4]) -> u32 {
        let offset = self.field_data.position() as u32;
        for component in value {
            self.field_data.single(component).unwrap();
        }
        offset
    }

    fn append_field_data_exo_string(&mut self, value: &str) -> u32 {
        let offset = self.field_data.position() as u32;
        self.field_data.u32(value.len() as u32).unwrap();
        self.field_data.bytes(value.as_bytes()).unwrap();
        offset
    }

    fn append_field_data_resref(&mut self, value: &str) -> u32 {
        let offset = self.field_data.position() as u32;
        self.field_data.u8(value.len() as u8).unwrap();
        self.field_data.bytes(value.as_bytes()).unwrap();
        offset
    }

    fn append_field_data_void(&mut self, value: &[u8]) -> u32 {
        let offset = self.field_data.position() as u32;
        self.field_data.u32(value.len() as u32).unwrap();
        self.field_data.bytes(value).unwrap();
        offset
    }

    fn append_field_data_locstring(&mut self, value: &super::field::LocalizedString) -> u32 {
        let offset = self.field_data.position() as u32;
        let mut body = ByteWriter::new();
        body.i32(value.string_ref).unwrap();
        body.u32(value.substrings.len() as u32).unwrap();
        for substring in &value.substrings {
            body.u32(substring.language_id).unwrap();
            body.u32(substring.string.len() as u32).unwrap();
            body.bytes(substring.string.as_bytes()).unwrap();
        }
        let body = body.into_bytes();
        self.field_data.u32(body.len() as u32).unwrap();
        self.field_data.bytes(&body).unwrap();
        offset
    }

    fn finish(self, file_type: &str) -> Vec<u8> {
        let struct_count = self.structs.len() as u32;
        let field_count = self.fields.len() as u32;
        let label_count = self.labels.len() as u32;

        let struct_offset = HEADER_SIZE;
        let field_offset = struct_offset + struct_count * STRUCT_ENTRY_SIZE;
        let label_offset = field_offset + field_count * FIELD_ENTRY_SIZE;
        let field_data_offset = label_offset + label_count * LABEL_SIZE;

        let field_data_bytes = self.field_data.into_bytes();
        let field_indices_bytes = self.field_indices.into_bytes();
        let list_indices_bytes = self.list_indices.into_bytes();

        let field_indices_offset = field_data_offset + field_data_bytes.len() as u32;
        let list_indices_offset = field_indices_offset + field_indices_bytes.len() as u32;

        let mut out = ByteWriter::new();
        out.string(file_type, 4).unwrap();
        out.string("V3.2", 4).unwrap();
        out.u32(struct_offset).unwrap();
        out.u32(struct_count).unwrap();
        out.u32(field_offset).unwrap();
        out.u32(field_count).unwrap();
        out.u32(label_offset).unwrap();
        out.u32(label_count).unwrap();
        out.u32(field_data_offset).unwrap();
        out.u32(field_data_bytes.len() as u32).unwrap();
        out.u32(field_indices_offset).unwrap();
        out.u32(field_indices_bytes.len() as u32).unwrap();
        out.u32(list_indices_offset).unwrap();
        out.u32(list_indices_bytes.len() as u32).unwrap();

        for entry in &self.structs {
            out.u32(entry.struct_type).unwrap();
            out.u32(entry.data_or_offset).unwrap();
            out.u32(entry.field_count).unwrap();
        }
        for entry in &self.fields {
            out.u32(entry.field_type).unwrap();
            out.u32(entry.label_index).unwrap();
            out.u32(entry.data_or_offset).unwrap();
        }
        for label in &self.labels {
            out.string(label, LABEL_SIZE as usize).unwrap();
        }
        out.bytes(&field_data_bytes).unwrap();
        out.bytes(&field_indices_bytes).unwrap();
        out.bytes(&list_indices_bytes).unwrap();

        out.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_is_deterministic() {
        let mut root = GffStruct::new(0xffff_ffff);
        root.set("HP", GffFieldValue::Int16(50));
        root.set("Tag", GffFieldValue::ExoString(String::from("test")));

        let first = GffWriter::write(&root, "UTC ").unwrap();
        let second = GffWriter::write(&root, "UTC ").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_labels_are_deduplicated() {
        let mut child_a = GffStruct::new(0);
        child_a.set("Shared", GffFieldValue::UInt8(1));
        let mut child_b = GffStruct::new(1);
        child_b.set("Shared", GffFieldValue::UInt8(2));

        let mut list = GffList::new();
        list.structs.push(child_a);
        list.structs.push(child_b);

        let mut root = GffStruct::new(0xffff_ffff);
        root.set("Children", GffFieldValue::List(list));

        let bytes = GffWriter::write(&root, "UTC ").unwrap();
        let (_, _) = super::super::reader::GffReader::read(&bytes, None).unwrap();

        let label_count = u32::from_le_bytes(bytes[28..32].try_into().unwrap());
        assert_eq!(label_count, 2);
    }

    #[test]
    fn test_overlong_label_is_rejected_instead_of_panicking() {
        let mut root = GffStruct::new(0);
        root.set("ThisLabelIsWayTooLongForTheEngine", GffFieldValue::UInt8(1));
        let result = GffWriter::write(&root, "UTC ");
        assert!(matches!(result, Err(kotor_common::error::Error::ValidationError(_))));
    }
}
