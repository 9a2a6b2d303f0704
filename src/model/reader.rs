//! Top-level `MDL`+`MDX` decode: file header, name table, node tree (with
//! per-type payload dispatch), and the animation list.

use kotor_common::error::Error;
use kotor_common::stream::ByteReader;

use super::aabb::AabbTree;
use super::anim::{AnimNode, Animation};
use super::controller::Controller;
use super::dangly::DanglyData;
use super::emitter::EmitterData;
use super::header::{FileHeader, GeometryHeader, ModelHeader, MDL_OFFSET};
use super::light::LightData;
use super::mesh::{self, Face};
use super::node::{
    read_array_def, read_common_header, ArrayDef, Node, NodeId, NodeKind, ReferenceData, NODE_FLAG_AABB, NODE_FLAG_DANGLY, NODE_FLAG_EMITTER, NODE_FLAG_LIGHT,
    NODE_FLAG_MESH, NODE_FLAG_REFERENCE, NODE_FLAG_SABER, NODE_FLAG_SKIN,
};
use super::saber::SaberData;
use super::skin::{read_bone_vertices, SkinData};
use super::Model;

/// Soft sanity bound: real models never nest this many children under a
/// single node, so a higher count almost certainly means a corrupt offset.
const MAX_CHILDREN: u32 = 100;
const MAX_NAME_LEN: usize = 64;

pub fn read(mdl: &[u8], mdx: &[u8]) -> Result<Model, Error> {
    let mut reader = ByteReader::new(mdl);
    let file_header = FileHeader::read(&mut reader)?;

    reader.set_position(MDL_OFFSET as u64);
    let model_header = ModelHeader::read(&mut reader)?;

    let expected_total = MDL_OFFSET as u64 + file_header.mdl_data_size as u64;
    if expected_total > reader.size() {
        return Err(Error::StructuralError("mdl_data_size exceeds file length".into()));
    }

    let names = read_name_table(&mut reader, &model_header)?;
    let resolve_name = |index: u32| names.get(index as usize).cloned();

    let mut nodes = Vec::new();
    let root = read_node(&mut reader, mdx, model_header.geometry.root_node_offset, None, &mut nodes, &resolve_name)?;

    let animations = read_animations(&mut reader, &model_header, &resolve_name)?;

    Ok(Model {
        name: model_header.geometry.name.clone(),
        supermodel: model_header.supermodel.clone(),
        classification: model_header.classification,
        fog: model_header.fog,
        bounding_box_min: model_header.geometry.bounding_box_min,
        bounding_box_max: model_header.geometry.bounding_box_max,
        radius: model_header.geometry.radius,
        anim_scale: model_header.geometry.anim_scale,
        nodes,
        root,
        animations,
    })
}

fn read_name_table(reader: &mut ByteReader, header: &ModelHeader) -> Result<Vec<String>, Error> {
    reader.set_position(header.offset_to_name_offsets as u64);
    let mut offsets = Vec::with_capacity(header.name_offsets_count as usize);
    for _ in 0..header.name_offsets_count {
        offsets.push(reader.u32()?);
    }
    let mut names = Vec::with_capacity(offsets.len());
    for offset in offsets {
        reader.set_position(offset as u64);
        names.push(reader.terminated_string(0, MAX_NAME_LEN)?);
    }
    Ok(names)
}

fn read_node(
    reader: &mut ByteReader,
    mdx: &[u8],
    offset: u32,
    parent: Option<NodeId>,
    nodes: &mut Vec<Node>,
    resolve_name: &impl Fn(u32) -> Option<String>,
) -> Result<NodeId, Error> {
    if offset as u64 >= reader.size() {
        return Err(Error::ValidationError("node offset past end of file".into()));
    }
    reader.set_position(offset as u64);
    let (type_flags, node_number, name_index, position, orientation) = read_common_header(reader)?;
    let name = resolve_name(name_index as u32).unwrap_or_default();

    let children_arr = read_array_def(reader)?;
    let controller_key_arr = read_array_def(reader)?;
    let controller_data_arr = read_array_def(reader)?;

    if children_arr.count > MAX_CHILDREN {
        return Err(Error::ValidationError(format!("node {node_number} has implausible child count {}", children_arr.count)));
    }

    let kind = read_node_kind(reader, mdx, type_flags, resolve_name)?;
    let controllers = read_controllers(reader, controller_key_arr, controller_data_arr)?;

    let node_id = NodeId(nodes.len());
    nodes.push(Node { node_number, name, position, orientation, parent, children: Vec::new(), controllers, kind });

    reader.set_position(children_arr.offset as u64);
    let mut child_offsets = Vec::with_capacity(children_arr.count as usize);
    for _ in 0..children_arr.count {
        child_offsets.push(reader.u32()?);
    }

    let mut children = Vec::with_capacity(child_offsets.len());
    for child_offset in child_offsets {
        children.push(read_node(reader, mdx, child_offset, Some(node_id), nodes, resolve_name)?);
    }
    nodes[node_id.0].children = children;

    Ok(node_id)
}

fn read_node_kind(reader: &mut ByteReader, mdx: &[u8], type_flags: u16, resolve_name: &impl Fn(u32) -> Option<String>) -> Result<NodeKind, Error> {
    if type_flags & NODE_FLAG_REFERENCE != 0 {
        let model = reader.string(32)?;
        let reattachable = reader.u32()? != 0;
        return Ok(NodeKind::Reference(ReferenceData { model, reattachable }));
    }
    if type_flags & NODE_FLAG_LIGHT != 0 {
        return Ok(NodeKind::Light(LightData::read(reader, resolve_name)?));
    }
    if type_flags & NODE_FLAG_EMITTER != 0 {
        return Ok(NodeKind::Emitter(EmitterData::read(reader)?));
    }
    if type_flags & NODE_FLAG_MESH == 0 {
        return Ok(NodeKind::Dummy);
    }
    if type_flags & NODE_FLAG_SABER != 0 {
        return Ok(NodeKind::Saber(SaberData::read(reader)?));
    }

    let (mut mesh, faces_arr, face_materials_arr, face_normals_arr, face_distances_arr, mdx_data_offset) = mesh::read_trimesh_header(reader)?;
    read_faces(reader, &mut mesh, faces_arr, face_materials_arr, face_normals_arr, face_distances_arr)?;
    mesh::read_mdx_rows(mdx, &mut mesh, mdx_data_offset)?;

    if type_flags & NODE_FLAG_SKIN != 0 {
        let skin = read_skin(reader, mdx, mesh.vertex_count, mesh.mdx_vertex_size, mdx_data_offset)?;
        return Ok(NodeKind::Skin(mesh, skin));
    }
    if type_flags & NODE_FLAG_DANGLY != 0 {
        let dangly = read_dangly(reader)?;
        return Ok(NodeKind::Dangly(mesh, dangly));
    }
    if type_flags & NODE_FLAG_AABB != 0 {
        let offset_to_aabb_root = reader.u32()?;
        let resume = reader.position();
        reader.set_position(offset_to_aabb_root as u64);
        let tree = AabbTree::read(reader)?;
        reader.set_position(resume);
        return Ok(NodeKind::Aabb(mesh, tree));
    }
    Ok(NodeKind::Trimesh(mesh))
}

fn read_faces(reader: &mut ByteReader, mesh: &mut super::mesh::MeshData, faces_arr: ArrayDef, materials_arr: ArrayDef, normals_arr: ArrayDef, distances_arr: ArrayDef) -> Result<(), Error> {
    reader.set_position(faces_arr.offset as u64);
    let mut indices = Vec::with_capacity(faces_arr.count as usize);
    for _ in 0..faces_arr.count {
        indices.push([reader.u32()?, reader.u32()?, reader.u32()?]);
    }

    reader.set_position(materials_arr.offset as u64);
    let mut materials = Vec::with_capacity(materials_arr.count as usize);
    for _ in 0..materials_arr.count {
        materials.push(reader.u32()? as u16);
    }

    reader.set_position(normals_arr.offset as u64);
    let mut normals = Vec::with_capacity(normals_arr.count as usize);
    for _ in 0..normals_arr.count {
        normals.push(reader.vector3()?);
    }

    reader.set_position(distances_arr.offset as u64);
    let mut distances = Vec::with_capacity(distances_arr.count as usize);
    for _ in 0..distances_arr.count {
        distances.push(reader.single()?);
    }

    mesh.faces = (0..indices.len())
        .map(|i| Face {
            v1: indices[i][0],
            v2: indices[i][1],
            v3: indices[i][2],
            material: materials.get(i).copied().unwrap_or(0),
            normal: normals.get(i).copied().unwrap_or([0.0; 3]),
            plane_distance: distances.get(i).copied().unwrap_or(0.0),
        })
        .collect();
    Ok(())
}

fn read_skin(reader: &mut ByteReader, mdx: &[u8], vertex_count: u32, mdx_vertex_size: u32, mdx_data_offset: u32) -> Result<SkinData, Error> {
    reader.i32()?; // unknown2
    reader.i32()?; // unknown3
    reader.i32()?; // unknown4
    let offset_to_mdx_weights = reader.u32()?;
    let offset_to_mdx_bones = reader.u32()?;
    let offset_to_bonemap = reader.u32()?;
    let bonemap_count = reader.u32()?;
    let offset_to_qbones = reader.u32()?;
    let qbones_count = reader.u32()?;
    let qbones_count2 = reader.u32()?;
    if qbones_count2 != qbones_count {
        return Err(Error::ValidationError("qbones count mismatch".into()));
    }
    let offset_to_tbones = reader.u32()?;
    let tbones_count = reader.u32()?;
    let tbones_count2 = reader.u32()?;
    if tbones_count2 != tbones_count {
        return Err(Error::ValidationError("tbones count mismatch".into()));
    }
    reader.u32()?; // offset_to_unknown0
    reader.u32()?; // unknown0_count
    reader.u32()?; // unknown0_count2
    for _ in 0..16 {
        reader.u16()?; // bones[16]
    }
    reader.u32()?; // unknown1

    reader.set_position(offset_to_bonemap as u64);
    let mut bonemap = Vec::with_capacity(bonemap_count as usize);
    for _ in 0..bonemap_count {
        bonemap.push(reader.single()? as i32);
    }

    reader.set_position(offset_to_qbones as u64);
    let mut qbones = Vec::with_capacity(qbones_count as usize);
    for _ in 0..qbones_count {
        qbones.push(reader.vector4()?);
    }

    reader.set_position(offset_to_tbones as u64);
    let mut tbones = Vec::with_capacity(tbones_count as usize);
    for _ in 0..tbones_count {
        tbones.push(reader.vector3()?);
    }

    let vertex_bones = read_bone_vertices(mdx, vertex_count as usize, mdx_data_offset, mdx_vertex_size, offset_to_mdx_weights, offset_to_mdx_bones)?;

    Ok(SkinData { bonemap, qbones, tbones, vertex_bones })
}

fn read_dangly(reader: &mut ByteReader) -> Result<DanglyData, Error> {
    let displacement_max = reader.single()?;
    let _displacement_min = reader.single()?;
    let period = reader.single()?;
    let tightness = reader.single()?;

    let displacement_arr = read_array_def(reader)?;
    let _constraints_arr = read_array_def(reader)?;
    let _displacement_map_arr = read_array_def(reader)?;

    reader.set_position(displacement_arr.offset as u64);
    let mut displacement = Vec::with_capacity(displacement_arr.count as usize);
    for _ in 0..displacement_arr.count {
        displacement.push(reader.single()?);
    }

    Ok(DanglyData { displacement, displacement_max, tightness, period })
}

fn read_controllers(reader: &mut ByteReader, key_arr: ArrayDef, data_arr: ArrayDef) -> Result<Vec<Controller>, Error> {
    let resume = reader.position();

    reader.set_position(data_arr.offset as u64);
    let mut pool = Vec::with_capacity(data_arr.count as usize);
    for _ in 0..data_arr.count {
        pool.push(reader.single()?);
    }

    reader.set_position(key_arr.offset as u64);
    let mut controllers = Vec::with_capacity(key_arr.count as usize);
    for _ in 0..key_arr.count {
        controllers.push(Controller::read(reader, &pool)?);
    }

    reader.set_position(resume);
    Ok(controllers)
}

fn read_animations(reader: &mut ByteReader, header: &ModelHeader, resolve_name: &impl Fn(u32) -> Option<String>) -> Result<Vec<Animation>, Error> {
    reader.set_position(header.offset_to_animations as u64);
    let mut offsets = Vec::with_capacity(header.animation_count as usize);
    for _ in 0..header.animation_count {
        offsets.push(reader.u32()?);
    }

    offsets.into_iter().map(|offset| read_animation(reader, offset, resolve_name)).collect()
}

fn read_animation(reader: &mut ByteReader, offset: u32, resolve_name: &impl Fn(u32) -> Option<String>) -> Result<Animation, Error> {
    reader.set_position(offset as u64);
    let geometry = GeometryHeader::read(reader)?;
    let length = reader.single()?;
    let transition_time = reader.single()?;
    let anim_root = reader.string(32)?;
    let events_arr = read_array_def(reader)?;

    reader.set_position(events_arr.offset as u64);
    let mut events = Vec::with_capacity(events_arr.count as usize);
    for _ in 0..events_arr.count {
        events.push(Animation::read_event(reader)?);
    }

    let mut nodes = Vec::new();
    let root = read_anim_node(reader, geometry.root_node_offset, None, &mut nodes, resolve_name)?;

    Ok(Animation { name: geometry.name, length, transition_time, anim_root, events, nodes, root })
}

fn read_anim_node(
    reader: &mut ByteReader,
    offset: u32,
    parent: Option<usize>,
    nodes: &mut Vec<AnimNode>,
    resolve_name: &impl Fn(u32) -> Option<String>,
) -> Result<usize, Error> {
    reader.set_position(offset as u64);
    let (_type_flags, node_number, name_index, _position, _orientation) = read_common_header(reader)?;
    let name = resolve_name(name_index as u32).unwrap_or_default();

    let children_arr = read_array_def(reader)?;
    let controller_key_arr = read_array_def(reader)?;
    let controller_data_arr = read_array_def(reader)?;
    let controllers = read_controllers(reader, controller_key_arr, controller_data_arr)?;

    let index = nodes.len();
    nodes.push(AnimNode { node_number, name, parent, children: Vec::new(), controllers });

    reader.set_position(children_arr.offset as u64);
    let mut child_offsets = Vec::with_capacity(children_arr.count as usize);
    for _ in 0..children_arr.count {
        child_offsets.push(reader.u32()?);
    }

    let mut children = Vec::with_capacity(child_offsets.len());
    for child_offset in child_offsets {
        children.push(read_anim_node(reader, child_offset, Some(index), nodes, resolve_name)?);
    }
    nodes[index].children = children;

    Ok(index)
}
