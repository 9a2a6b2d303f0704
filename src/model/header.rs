//! The 12-byte file header plus the `GeometryHeader`/`ModelHeader` pair
//! every MDL starts with, right after it.

use kotor_common::error::Error;
use kotor_common::stream::{ByteReader, ByteWriter};

/// Offset from the start of the MDL file to the `GeometryHeader`; every
/// internal offset stored inside the file is relative to this point.
pub const MDL_OFFSET: u32 = 12;

/// Byte size of a written `GeometryHeader`, used to lay out everything
/// that follows it (name offsets, node bodies, animations).
pub const GEOMETRY_HEADER_SIZE: u32 = 4 + 4 + 32 + 4 + 4 + 24 + 24 + 12 + 12 + 4 + 4;

/// Byte size of the `ModelHeader`'s own fields, in addition to the
/// `GeometryHeader` it embeds.
pub const MODEL_HEADER_EXTRA_SIZE: u32 = 1 + 1 + 1 + 1 + 4 + 4 + 4 + 4 + 4 + 12 + 12 + 4 + 4 + 32 + 4 + 4 + 4 + 4 + 4 + 4 + 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileHeader {
    pub mdl_data_size: u32,
    pub mdx_data_size: u32,
}

impl FileHeader {
    pub fn read(reader: &mut ByteReader) -> Result<Self, Error> {
        let _reserved = reader.u32()?;
        let mdl_data_size = reader.u32()?;
        let mdx_data_size = reader.u32()?;
        Ok(Self { mdl_data_size, mdx_data_size })
    }

    pub fn write(&self, writer: &mut ByteWriter) -> Result<(), Error> {
        writer.u32(0)?;
        writer.u32(self.mdl_data_size)?;
        writer.u32(self.mdx_data_size)
    }
}

/// Shared by the model file and every animation: name, root node, node
/// count, bounding volume. `func_ptr0/1` are opaque engine vtable slots;
/// they're preserved on read and rewritten as per-game constants on write.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryHeader {
    pub func_ptr0: u32,
    pub func_ptr1: u32,
    pub name: String,
    pub root_node_offset: u32,
    pub node_count: u32,
    pub bounding_box_min: [f32; 3],
    pub bounding_box_max: [f32; 3],
    pub radius: f32,
    pub anim_scale: f32,
}

impl GeometryHeader {
    pub fn read(reader: &mut ByteReader) -> Result<Self, Error> {
        let func_ptr0 = reader.u32()?;
        let func_ptr1 = reader.u32()?;
        let name = reader.string(32)?;
        let root_node_offset = reader.u32()?;
        let node_count = reader.u32()?;
        reader.skip(24); // runtime array slot, zeroed on disk
        reader.skip(24); // runtime array slot, zeroed on disk
        let bounding_box_min = reader.vector3()?;
        let bounding_box_max = reader.vector3()?;
        let radius = reader.single()?;
        let anim_scale = reader.single()?;
        Ok(Self {
            func_ptr0,
            func_ptr1,
            name,
            root_node_offset,
            node_count,
            bounding_box_min,
            bounding_box_max,
            radius,
            anim_scale,
        })
    }

    pub fn write(&self, writer: &mut ByteWriter) -> Result<(), Error> {
        writer.u32(self.func_ptr0)?;
        writer.u32(self.func_ptr1)?;
        writer.string(&self.name, 32)?;
        writer.u32(self.root_node_offset)?;
        writer.u32(self.node_count)?;
        writer.bytes(&[0u8; 24])?;
        writer.bytes(&[0u8; 24])?;
        writer.vector3(self.bounding_box_min)?;
        writer.vector3(self.bounding_box_max)?;
        writer.single(self.radius)?;
        writer.single(self.anim_scale)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelHeader {
    pub geometry: GeometryHeader,
    pub classification: u8,
    pub model_flags: u8,
    pub fog: bool,
    pub child_model_count: u32,
    pub offset_to_animations: u32,
    pub animation_count: u32,
    pub parent_model_index: u32,
    pub bounding_box_min: [f32; 3],
    pub bounding_box_max: [f32; 3],
    pub radius: f32,
    pub anim_scale: f32,
    pub supermodel: String,
    pub offset_to_super_root: u32,
    pub model_flags2: u32,
    pub mdx_size: u32,
    pub mdx_offset: u32,
    pub offset_to_name_offsets: u32,
    pub name_offsets_count: u32,
}

impl ModelHeader {
    pub fn read(reader: &mut ByteReader) -> Result<Self, Error> {
        let geometry = GeometryHeader::read(reader)?;
        let classification = reader.u8()?;
        let model_flags = reader.u8()?;
        let _padding0 = reader.u8()?;
        let fog = reader.u8()? != 0;
        let child_model_count = reader.u32()?;
        let offset_to_animations = reader.u32()?;
        let animation_count = reader.u32()?;
        let animation_count2 = reader.u32()?;
        if animation_count2 != animation_count {
            return Err(Error::ValidationError(String::from("animation_count2 does not mirror animation_count")));
        }
        let parent_model_index = reader.u32()?;
        let bounding_box_min = reader.vector3()?;
        let bounding_box_max = reader.vector3()?;
        let radius = reader.single()?;
        let anim_scale = reader.single()?;
        let supermodel = reader.string(32)?;
        let offset_to_super_root = reader.u32()?;
        let model_flags2 = reader.u32()?;
        let mdx_size = reader.u32()?;
        let mdx_offset = reader.u32()?;
        let offset_to_name_offsets = reader.u32()?;
        let name_offsets_count = reader.u32()?;
        let name_offsets_count2 = reader.u32()?;
        if name_offsets_count2 != name_offsets_count {
            return Err(Error::ValidationError(String::from("name_offsets_count2 does not mirror name_offsets_count")));
        }

        Ok(Self {
            geometry,
            classification,
            model_flags,
            fog,
            child_model_count,
            offset_to_animations,
            animation_count,
            parent_model_index,
            bounding_box_min,
            bounding_box_max,
            radius,
            anim_scale,
            supermodel,
            offset_to_super_root,
            model_flags2,
            mdx_size,
            mdx_offset,
            offset_to_name_offsets,
            name_offsets_count,
        })
    }

    pub fn write(&self, writer: &mut ByteWriter) -> Result<(), Error> {
        self.geometry.write(writer)?;
        writer.u8(self.classification)?;
        writer.u8(self.model_flags)?;
        writer.u8(0)?;
        writer.u8(self.fog as u8)?;
        writer.u32(self.child_model_count)?;
        writer.u32(self.offset_to_animations)?;
        writer.u32(self.animation_count)?;
        writer.u32(self.animation_count)?;
        writer.u32(self.parent_model_index)?;
        writer.vector3(self.bounding_box_min)?;
        writer.vector3(self.bounding_box_max)?;
        writer.single(self.radius)?;
        writer.single(self.anim_scale)?;
        writer.string(&self.supermodel, 32)?;
        writer.u32(self.offset_to_super_root)?;
        writer.u32(self.model_flags2)?;
        writer.u32(self.mdx_size)?;
        writer.u32(self.mdx_offset)?;
        writer.u32(self.offset_to_name_offsets)?;
        writer.u32(self.name_offsets_count)?;
        writer.u32(self.name_offsets_count)
    }
}
