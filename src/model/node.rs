//! The common node header every model node starts with, and the per-type
//! payload dispatch (`NodeKind`).

use kotor_common::error::Error;
use kotor_common::stream::{ByteReader, ByteWriter};

use super::aabb::AabbTree;
use super::controller::Controller;
use super::dangly::DanglyData;
use super::emitter::EmitterData;
use super::light::LightData;
use super::mesh::MeshData;
use super::saber::SaberData;
use super::skin::SkinData;

pub const NODE_FLAG_DUMMY: u16 = 0x0001;
pub const NODE_FLAG_MESH: u16 = 0x0020;
pub const NODE_FLAG_SKIN: u16 = 0x0040;
pub const NODE_FLAG_DANGLY: u16 = 0x0100;
pub const NODE_FLAG_AABB: u16 = 0x0200;
pub const NODE_FLAG_LIGHT: u16 = 0x0400;
pub const NODE_FLAG_SABER: u16 = 0x0800;
pub const NODE_FLAG_EMITTER: u16 = 0x1000;
pub const NODE_FLAG_REFERENCE: u16 = 0x2000;

/// Index into [`super::Model::nodes`]. Never dereferenced across models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceData {
    pub model: String,
    pub reattachable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Dummy,
    Trimesh(MeshData),
    Skin(MeshData, SkinData),
    Dangly(MeshData, DanglyData),
    Aabb(MeshData, AabbTree),
    Saber(SaberData),
    Light(LightData),
    Emitter(EmitterData),
    Reference(ReferenceData),
}

impl NodeKind {
    /// The `type_flags` bitmask this payload must be tagged with on disk.
    pub fn type_flags(&self) -> u16 {
        match self {
            NodeKind::Dummy => NODE_FLAG_DUMMY,
            NodeKind::Trimesh(_) => NODE_FLAG_MESH,
            NodeKind::Skin(..) => NODE_FLAG_MESH | NODE_FLAG_SKIN,
            NodeKind::Dangly(..) => NODE_FLAG_MESH | NODE_FLAG_DANGLY,
            NodeKind::Aabb(..) => NODE_FLAG_MESH | NODE_FLAG_AABB,
            NodeKind::Saber(_) => NODE_FLAG_MESH | NODE_FLAG_SABER,
            NodeKind::Light(_) => NODE_FLAG_LIGHT,
            NodeKind::Emitter(_) => NODE_FLAG_EMITTER,
            NodeKind::Reference(_) => NODE_FLAG_REFERENCE,
        }
    }

    pub fn mesh(&self) -> Option<&MeshData> {
        match self {
            NodeKind::Trimesh(mesh) | NodeKind::Skin(mesh, _) | NodeKind::Dangly(mesh, _) | NodeKind::Aabb(mesh, _) => Some(mesh),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub node_number: u16,
    pub name: String,
    pub position: [f32; 3],
    pub orientation: [f32; 4],
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub controllers: Vec<Controller>,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(node_number: u16, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            node_number,
            name: name.into(),
            position: [0.0; 3],
            orientation: [0.0, 0.0, 0.0, 1.0],
            parent: None,
            children: Vec::new(),
            controllers: Vec::new(),
            kind,
        }
    }

    pub fn is_walkmesh_tree(&self) -> bool {
        matches!(self.kind, NodeKind::Aabb(..))
    }
}

/// Reads the 8 function-pointer bytes, the `type_flags`/`node_number`/
/// `name_index` triple, the padding, the root/parent offsets, position and
/// orientation. Returns `(type_flags, node_number, name_index, position,
/// orientation)`; the caller resolves `name_index` through the model's
/// name table.
pub fn read_common_header(reader: &mut ByteReader) -> Result<(u16, u16, u16, [f32; 3], [f32; 4]), Error> {
    reader.skip(8); // func_ptr0, func_ptr1
    let type_flags = reader.u16()?;
    let node_number = reader.u16()?;
    let name_index = reader.u16()?;
    reader.skip(2); // padding
    let _root_offset = reader.u32()?;
    let _parent_offset = reader.u32()?;
    let position = reader.vector3()?;
    let orientation = reader.vector4()?;
    Ok((type_flags, node_number, name_index, position, orientation))
}

/// A `{offset, count, count2}` array descriptor. The engine duplicates the
/// count as a validation check; both copies must agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayDef {
    pub offset: u32,
    pub count: u32,
}

pub fn read_array_def(reader: &mut ByteReader) -> Result<ArrayDef, Error> {
    let offset = reader.u32()?;
    let count = reader.u32()?;
    let count2 = reader.u32()?;
    if count != count2 {
        return Err(Error::ValidationError(format!("array count mismatch: {count} != {count2}")));
    }
    Ok(ArrayDef { offset, count })
}

pub fn write_array_def(writer: &mut ByteWriter, def: ArrayDef) -> Result<(), Error> {
    writer.u32(def.offset)?;
    writer.u32(def.count)?;
    writer.u32(def.count)
}

pub fn write_common_header(
    writer: &mut ByteWriter,
    type_flags: u16,
    node_number: u16,
    name_index: u16,
    root_offset: u32,
    parent_offset: u32,
    position: [f32; 3],
    orientation: [f32; 4],
) -> Result<(), Error> {
    writer.u32(0)?; // func_ptr0
    writer.u32(0)?; // func_ptr1
    writer.u16(type_flags)?;
    writer.u16(node_number)?;
    writer.u16(name_index)?;
    writer.u16(0)?; // padding
    writer.u32(root_offset)?;
    writer.u32(parent_offset)?;
    writer.vector3(position)?;
    for component in orientation {
        writer.single(component)?;
    }
    Ok(())
}
