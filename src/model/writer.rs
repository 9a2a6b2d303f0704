//! Top-level `MDL`+`MDX` encode. Nodes are emitted depth-first, each as one
//! contiguous block; offsets that must point forward (child list, MDX rows,
//! collision AABB subtrees) are reserved as zeroed placeholders and patched
//! once the referenced data has actually been written, mirroring the
//! placeholder/patch pattern used throughout the rest of this crate.
//!
//! Given two semantically equal [`Model`] values, this writer produces
//! byte-identical output: node order, name interning order, and MDX layout
//! are all deterministic functions of the model's own tree shape.

use kotor_common::error::Error;
use kotor_common::stream::ByteWriter;

use super::header::{FileHeader, GeometryHeader, ModelHeader, MDL_OFFSET};
use super::mesh;
use super::node::{write_array_def, write_common_header, ArrayDef, NodeId, NodeKind};
use super::Model;

struct NameTable {
    names: Vec<String>,
}

impl NameTable {
    fn new() -> Self {
        Self { names: Vec::new() }
    }

    fn intern(&mut self, name: &str) -> u32 {
        if let Some(pos) = self.names.iter().position(|n| n == name) {
            pos as u32
        } else {
            self.names.push(name.to_string());
            (self.names.len() - 1) as u32
        }
    }
}

pub fn write(model: &Model) -> Result<(Vec<u8>, Vec<u8>), Error> {
    let mut mdl = ByteWriter::new();
    let mut mdx = ByteWriter::new();
    let mut names = NameTable::new();

    // File header, patched once the data sizes are known.
    FileHeader { mdl_data_size: 0, mdx_data_size: 0 }.write(&mut mdl)?;

    let model_header_patch = mdl.position();
    write_placeholder_model_extra(&mut mdl)?;

    let root_offset = write_node(&mut mdl, &mut mdx, model, model.root, 0, &mut names)?;

    let offset_to_animations = mdl.position() as u32;
    let mut animation_offsets = Vec::with_capacity(model.animations.len());
    for _ in &model.animations {
        mdl.u32(0)?;
    }
    for (i, animation) in model.animations.iter().enumerate() {
        let offset = write_animation(&mut mdl, animation, &mut names)?;
        animation_offsets.push(offset);
        let _ = i;
    }
    let after_animation_offsets = mdl.position();
    mdl.set_position(offset_to_animations as u64);
    for offset in &animation_offsets {
        mdl.u32(*offset)?;
    }
    mdl.set_position(after_animation_offsets);

    let offset_to_name_offsets = mdl.position() as u32;
    let mut name_string_offsets = Vec::with_capacity(names.names.len());
    for _ in &names.names {
        mdl.u32(0)?;
    }
    for name in &names.names {
        name_string_offsets.push(mdl.position() as u32);
        mdl.string(name, name.len() + 1)?;
    }
    let after_names = mdl.position();
    mdl.set_position(offset_to_name_offsets as u64);
    for offset in &name_string_offsets {
        mdl.u32(*offset)?;
    }
    mdl.set_position(after_names);

    let total_mdl_len = mdl.position();

    mdl.set_position(model_header_patch);
    ModelHeader {
        geometry: GeometryHeader {
            func_ptr0: 0,
            func_ptr1: 0,
            name: model.name.clone(),
            root_node_offset: root_offset,
            node_count: model.nodes.len() as u32,
            bounding_box_min: model.bounding_box_min,
            bounding_box_max: model.bounding_box_max,
            radius: model.radius,
            anim_scale: model.anim_scale,
        },
        classification: model.classification,
        model_flags: 0,
        fog: model.fog,
        child_model_count: 0,
        offset_to_animations,
        animation_count: model.animations.len() as u32,
        parent_model_index: 0,
        bounding_box_min: model.bounding_box_min,
        bounding_box_max: model.bounding_box_max,
        radius: model.radius,
        anim_scale: model.anim_scale,
        supermodel: model.supermodel.clone(),
        offset_to_super_root: 0,
        model_flags2: 0,
        mdx_size: mdx.position() as u32,
        mdx_offset: 0,
        offset_to_name_offsets,
        name_offsets_count: names.names.len() as u32,
    }
    .write(&mut mdl)?;

    mdl.set_position(total_mdl_len);

    let mdl_data_size = total_mdl_len as u32 - MDL_OFFSET;
    let mdx_data_size = mdx.position() as u32;
    let mut mdl_bytes = mdl.into_bytes();
    patch_file_header(&mut mdl_bytes, mdl_data_size, mdx_data_size);

    Ok((mdl_bytes, mdx.into_bytes()))
}

fn patch_file_header(mdl_bytes: &mut [u8], mdl_data_size: u32, mdx_data_size: u32) {
    mdl_bytes[4..8].copy_from_slice(&mdl_data_size.to_le_bytes());
    mdl_bytes[8..12].copy_from_slice(&mdx_data_size.to_le_bytes());
}

fn write_placeholder_model_extra(mdl: &mut ByteWriter) -> Result<(), Error> {
    ModelHeader {
        geometry: GeometryHeader {
            func_ptr0: 0,
            func_ptr1: 0,
            name: String::new(),
            root_node_offset: 0,
            node_count: 0,
            bounding_box_min: [0.0; 3],
            bounding_box_max: [0.0; 3],
            radius: 0.0,
            anim_scale: 0.0,
        },
        classification: 0,
        model_flags: 0,
        fog: false,
        child_model_count: 0,
        offset_to_animations: 0,
        animation_count: 0,
        parent_model_index: 0,
        bounding_box_min: [0.0; 3],
        bounding_box_max: [0.0; 3],
        radius: 0.0,
        anim_scale: 0.0,
        supermodel: String::new(),
        offset_to_super_root: 0,
        model_flags2: 0,
        mdx_size: 0,
        mdx_offset: 0,
        offset_to_name_offsets: 0,
        name_offsets_count: 0,
    }
    .write(mdl)
}

fn write_node(mdl: &mut ByteWriter, mdx: &mut ByteWriter, model: &Model, node_id: NodeId, parent_offset: u32, names: &mut NameTable) -> Result<u32, Error> {
    let node = model.node(node_id);
    let self_offset = mdl.position() as u32;
    let name_index = names.intern(&node.name) as u16;

    write_common_header(mdl, node.kind.type_flags(), node.node_number, name_index, self_offset, parent_offset, node.position, node.orientation)?;

    let arrays_patch = mdl.position();
    write_array_def(mdl, ArrayDef { offset: 0, count: node.children.len() as u32 })?;
    write_array_def(mdl, ArrayDef { offset: 0, count: node.controllers.len() as u32 })?;
    write_array_def(mdl, ArrayDef { offset: 0, count: 0 })?;

    write_node_payload(mdl, mdx, &node.kind, names)?;

    let mut pool = Vec::new();
    let first_indices: Vec<u16> = node.controllers.iter().map(|c| c.append_to_pool(&mut pool)).collect();

    let controller_key_offset = mdl.position() as u32;
    for (controller, first_index) in node.controllers.iter().zip(&first_indices) {
        controller.write_key(mdl, *first_index)?;
    }

    let controller_data_offset = mdl.position() as u32;
    for v in &pool {
        mdl.single(*v)?;
    }

    let children_offset = mdl.position() as u32;
    for _ in &node.children {
        mdl.u32(0)?;
    }

    let mut child_offsets = Vec::with_capacity(node.children.len());
    for &child_id in &node.children {
        child_offsets.push(write_node(mdl, mdx, model, child_id, self_offset, names)?);
    }

    let resume = mdl.position();
    mdl.set_position(children_offset as u64);
    for offset in &child_offsets {
        mdl.u32(*offset)?;
    }
    mdl.set_position(arrays_patch);
    write_array_def(mdl, ArrayDef { offset: children_offset, count: node.children.len() as u32 })?;
    write_array_def(mdl, ArrayDef { offset: controller_key_offset, count: node.controllers.len() as u32 })?;
    write_array_def(mdl, ArrayDef { offset: controller_data_offset, count: pool.len() as u32 })?;
    mdl.set_position(resume);

    Ok(self_offset)
}

fn write_node_payload(mdl: &mut ByteWriter, mdx: &mut ByteWriter, kind: &NodeKind, names: &mut NameTable) -> Result<(), Error> {
    match kind {
        NodeKind::Dummy => Ok(()),
        NodeKind::Reference(reference) => {
            mdl.string(&reference.model, 32)?;
            mdl.u32(reference.reattachable as u32)
        }
        NodeKind::Light(light) => light.write(mdl, |name| names.intern(name)),
        NodeKind::Emitter(emitter) => emitter.write(mdl),
        NodeKind::Saber(saber) => saber.write(mdl),
        NodeKind::Trimesh(mesh_data) => write_mesh_body(mdl, mdx, mesh_data),
        NodeKind::Skin(mesh_data, skin) => {
            let mdx_data_offset = write_mesh_body(mdl, mdx, mesh_data)?;
            write_skin_body(mdl, mdx, mesh_data, skin, mdx_data_offset)
        }
        NodeKind::Dangly(mesh_data, dangly) => {
            write_mesh_body(mdl, mdx, mesh_data)?;
            write_dangly_body(mdl, dangly)
        }
        NodeKind::Aabb(mesh_data, tree) => {
            write_mesh_body(mdl, mdx, mesh_data)?;
            let patch = mdl.position();
            mdl.u32(0)?;
            let aabb_offset = tree.write(mdl)?;
            let resume = mdl.position();
            mdl.set_position(patch);
            mdl.u32(aabb_offset)?;
            mdl.set_position(resume);
            Ok(())
        }
    }
}

/// Writes the trimesh header and body, returning the MDX data offset that
/// was assigned for this mesh's vertex rows.
fn write_mesh_body(mdl: &mut ByteWriter, mdx: &mut ByteWriter, mesh_data: &mesh::MeshData) -> Result<u32, Error> {
    let header_patch = mdl.position();
    let dummy_arr = ArrayDef { offset: 0, count: mesh_data.faces.len() as u32 };
    mesh::write_trimesh_header(mdl, mesh_data, dummy_arr, dummy_arr, dummy_arr, dummy_arr, 0)?;
    let header_len = mdl.position() - header_patch;

    let faces_offset = mdl.position() as u32;
    for face in &mesh_data.faces {
        mdl.u32(face.v1)?;
        mdl.u32(face.v2)?;
        mdl.u32(face.v3)?;
    }
    let materials_offset = mdl.position() as u32;
    for face in &mesh_data.faces {
        mdl.u32(face.material as u32)?;
    }
    let normals_offset = mdl.position() as u32;
    for face in &mesh_data.faces {
        mdl.vector3(face.normal)?;
    }
    let distances_offset = mdl.position() as u32;
    for face in &mesh_data.faces {
        mdl.single(face.plane_distance)?;
    }

    let mdx_data_offset = mdx.position() as u32;
    mesh::write_mdx_rows(mdx, mesh_data)?;

    let after = mdl.position();
    mdl.set_position(header_patch);
    let faces_arr = ArrayDef { offset: faces_offset, count: mesh_data.faces.len() as u32 };
    let materials_arr = ArrayDef { offset: materials_offset, count: mesh_data.faces.len() as u32 };
    let normals_arr = ArrayDef { offset: normals_offset, count: mesh_data.faces.len() as u32 };
    let distances_arr = ArrayDef { offset: distances_offset, count: mesh_data.faces.len() as u32 };
    mesh::write_trimesh_header(mdl, mesh_data, faces_arr, materials_arr, normals_arr, distances_arr, mdx_data_offset)?;
    debug_assert_eq!(mdl.position() - header_patch, header_len);
    mdl.set_position(after);

    Ok(mdx_data_offset)
}

/// Byte span occupied by the standard mesh MDX components (vertex/normal/
/// color/uv1/uv2/tangent), so skin weight/bone rows can be appended right
/// after without colliding with them.
fn base_component_row_size(mesh_data: &mesh::MeshData) -> u32 {
    let c = &mesh_data.mdx_components;
    let mut size = 0;
    if let Some(o) = c.vertex {
        size = size.max(o + 12);
    }
    if let Some(o) = c.normal {
        size = size.max(o + 12);
    }
    if let Some(o) = c.color {
        size = size.max(o + 16);
    }
    if let Some(o) = c.uv1 {
        size = size.max(o + 8);
    }
    if let Some(o) = c.uv2 {
        size = size.max(o + 8);
    }
    if let Some(o) = c.tangent {
        size = size.max(o + 16);
    }
    size
}

fn write_skin_body(mdl: &mut ByteWriter, mdx: &mut ByteWriter, mesh_data: &mesh::MeshData, skin: &super::skin::SkinData, mdx_data_offset: u32) -> Result<(), Error> {
    mdl.i32(0)?; // unknown2
    mdl.i32(0)?; // unknown3
    mdl.i32(0)?; // unknown4

    let weights_offset = base_component_row_size(mesh_data);
    let bones_offset = weights_offset + 16;

    let patch = mdl.position();
    mdl.u32(weights_offset)?;
    mdl.u32(bones_offset)?;
    mdl.u32(0)?; // offset_to_bonemap placeholder
    mdl.u32(skin.bonemap.len() as u32)?;
    mdl.u32(0)?; // offset_to_qbones placeholder
    mdl.u32(skin.qbones.len() as u32)?;
    mdl.u32(skin.qbones.len() as u32)?;
    mdl.u32(0)?; // offset_to_tbones placeholder
    mdl.u32(skin.tbones.len() as u32)?;
    mdl.u32(skin.tbones.len() as u32)?;
    mdl.u32(0)?; // offset_to_unknown0
    mdl.u32(0)?;
    mdl.u32(0)?;
    for _ in 0..16 {
        mdl.u16(0xFFFF)?; // bones[16], unused slot sentinel
    }
    mdl.u32(0)?; // unknown1

    let bonemap_offset = mdl.position() as u32;
    for weight in &skin.bonemap {
        mdl.single(*weight as f32)?;
    }
    let qbones_offset = mdl.position() as u32;
    for q in &skin.qbones {
        for component in q {
            mdl.single(*component)?;
        }
    }
    let tbones_offset = mdl.position() as u32;
    for t in &skin.tbones {
        mdl.vector3(*t)?;
    }

    let resume = mdl.position();
    mdl.set_position(patch + 8);
    mdl.u32(bonemap_offset)?;
    mdl.u32(skin.bonemap.len() as u32)?;
    mdl.set_position(patch + 16);
    mdl.u32(qbones_offset)?;
    mdl.set_position(patch + 28);
    mdl.u32(tbones_offset)?;
    mdl.set_position(resume);

    super::skin::write_bone_vertices(mdx, &skin.vertex_bones, mdx_data_offset, mesh_data.mdx_vertex_size, weights_offset, bones_offset)
}

fn write_dangly_body(mdl: &mut ByteWriter, dangly: &super::dangly::DanglyData) -> Result<(), Error> {
    mdl.single(dangly.displacement_max)?;
    mdl.single(0.0)?; // displacement_min, unused by this reduced model
    mdl.single(dangly.period)?;
    mdl.single(dangly.tightness)?;

    let patch = mdl.position();
    write_array_def(mdl, ArrayDef { offset: 0, count: dangly.displacement.len() as u32 })?;
    write_array_def(mdl, ArrayDef { offset: 0, count: 0 })?; // constraints, not modeled
    write_array_def(mdl, ArrayDef { offset: 0, count: 0 })?; // displacement map, not modeled

    let displacement_offset = mdl.position() as u32;
    for v in &dangly.displacement {
        mdl.single(*v)?;
    }

    let resume = mdl.position();
    mdl.set_position(patch);
    write_array_def(mdl, ArrayDef { offset: displacement_offset, count: dangly.displacement.len() as u32 })?;
    mdl.set_position(resume);
    Ok(())
}

fn write_animation(mdl: &mut ByteWriter, animation: &super::anim::Animation, names: &mut NameTable) -> Result<u32, Error> {
    let self_offset = mdl.position() as u32;

    GeometryHeader {
        func_ptr0: 0,
        func_ptr1: 0,
        name: animation.name.clone(),
        root_node_offset: 0,
        node_count: animation.nodes.len() as u32,
        bounding_box_min: [0.0; 3],
        bounding_box_max: [0.0; 3],
        radius: 0.0,
        anim_scale: 1.0,
    }
    .write(mdl)?;

    mdl.single(animation.length)?;
    mdl.single(animation.transition_time)?;
    mdl.string(&animation.anim_root, 32)?;

    let events_patch = mdl.position();
    write_array_def(mdl, ArrayDef { offset: 0, count: animation.events.len() as u32 })?;

    let events_offset = mdl.position() as u32;
    for event in &animation.events {
        super::anim::Animation::write_event(mdl, event)?;
    }

    let root_node_offset = write_anim_node(mdl, animation, animation.root, 0, names)?;

    let after = mdl.position();
    mdl.set_position(events_patch);
    write_array_def(mdl, ArrayDef { offset: events_offset, count: animation.events.len() as u32 })?;
    mdl.set_position(after);

    let geometry_patch_end = self_offset as u64;
    let resume = mdl.position();
    mdl.set_position(geometry_patch_end);
    GeometryHeader {
        func_ptr0: 0,
        func_ptr1: 0,
        name: animation.name.clone(),
        root_node_offset,
        node_count: animation.nodes.len() as u32,
        bounding_box_min: [0.0; 3],
        bounding_box_max: [0.0; 3],
        radius: 0.0,
        anim_scale: 1.0,
    }
    .write(mdl)?;
    mdl.set_position(resume);

    Ok(self_offset)
}

#[cfg(test)]
mod tests {
    use super::super::mesh::{Face, MdxComponents, MeshData};
    use super::super::node::{Node, NodeId, NodeKind};
    use super::super::Model;
    use super::write;

    /// One root dummy with one trimesh child: 8 vertices, 12 faces (a
    /// cube's triangulated sides), position+uv1 interleaved, nothing else.
    fn cube_model() -> Model {
        let vertices: Vec<[f32; 3]> = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ];
        let uv1: Vec<[f32; 2]> = vertices.iter().map(|v| [v[0], v[1]]).collect();
        let face_indices: [[u32; 3]; 12] = [
            [0, 1, 2], [0, 2, 3], [4, 6, 5], [4, 7, 6],
            [0, 4, 5], [0, 5, 1], [1, 5, 6], [1, 6, 2],
            [2, 6, 7], [2, 7, 3], [3, 7, 4], [3, 4, 0],
        ];
        let faces: Vec<Face> = face_indices
            .iter()
            .map(|&[v1, v2, v3]| Face { v1, v2, v3, material: 0, normal: [0.0, 0.0, 1.0], plane_distance: 0.0 })
            .collect();

        let (mdx_components, mdx_vertex_size) = MdxComponents::layout(true, false, false, true, false, false);
        let mesh_data = MeshData {
            vertex_count: vertices.len() as u32,
            mdx_components,
            mdx_vertex_size,
            vertices,
            uv1,
            faces,
            ..MeshData::default()
        };

        let mut root = Node::new(0, "rootdummy", NodeKind::Dummy);
        let mesh_node = Node::new(1, "cubemesh", NodeKind::Trimesh(mesh_data));
        root.children.push(NodeId(1));

        Model {
            name: "cube".to_string(),
            supermodel: "NULL".to_string(),
            classification: 0,
            fog: false,
            bounding_box_min: [0.0; 3],
            bounding_box_max: [1.0; 3],
            radius: 1.0,
            anim_scale: 1.0,
            nodes: vec![root, mesh_node],
            root: NodeId(0),
            animations: Vec::new(),
        }
    }

    #[test]
    fn test_mdl_mdx_sizes_account_for_every_byte() {
        let model = cube_model();
        let (mdl, mdx) = write(&model).unwrap();
        let mdl_data_size = u32::from_le_bytes(mdl[4..8].try_into().unwrap());
        let mdx_data_size = u32::from_le_bytes(mdl[8..12].try_into().unwrap());
        assert_eq!(mdl_data_size + mdx_data_size + 12, (mdl.len() + mdx.len()) as u32);
    }

    #[test]
    fn test_round_trip_recovers_node_vertex_and_face_counts() {
        let model = cube_model();
        let (mdl, mdx) = write(&model).unwrap();
        let read_back = Model::read(&mdl, &mdx).unwrap();

        assert_eq!(read_back.nodes.len(), 2);
        let mesh_node = read_back.nodes.iter().find_map(|n| n.kind.mesh()).unwrap();
        assert_eq!(mesh_node.vertex_count, 8);
        assert_eq!(mesh_node.vertices.len(), 8);
        assert_eq!(mesh_node.faces.len(), 12);
        assert_eq!(mesh_node.uv1.len(), 8);
        for face in &mesh_node.faces {
            assert!(face.v1 < 8 && face.v2 < 8 && face.v3 < 8);
        }
    }
}

fn write_anim_node(mdl: &mut ByteWriter, animation: &super::anim::Animation, index: usize, parent_offset: u32, names: &mut NameTable) -> Result<u32, Error> {
    let node = animation.node(index);
    let self_offset = mdl.position() as u32;
    let name_index = names.intern(&node.name) as u16;

    write_common_header(mdl, 0, node.node_number, name_index, self_offset, parent_offset, [0.0; 3], [0.0, 0.0, 0.0, 1.0])?;

    let arrays_patch = mdl.position();
    write_array_def(mdl, ArrayDef { offset: 0, count: node.children.len() as u32 })?;
    write_array_def(mdl, ArrayDef { offset: 0, count: node.controllers.len() as u32 })?;
    write_array_def(mdl, ArrayDef { offset: 0, count: 0 })?;

    let mut pool = Vec::new();
    let first_indices: Vec<u16> = node.controllers.iter().map(|c| c.append_to_pool(&mut pool)).collect();

    let controller_key_offset = mdl.position() as u32;
    for (controller, first_index) in node.controllers.iter().zip(&first_indices) {
        controller.write_key(mdl, *first_index)?;
    }

    let controller_data_offset = mdl.position() as u32;
    for v in &pool {
        mdl.single(*v)?;
    }

    let children_offset = mdl.position() as u32;
    for _ in &node.children {
        mdl.u32(0)?;
    }

    let mut child_offsets = Vec::with_capacity(node.children.len());
    for &child_index in &node.children {
        child_offsets.push(write_anim_node(mdl, animation, child_index, self_offset, names)?);
    }

    let resume = mdl.position();
    mdl.set_position(children_offset as u64);
    for offset in &child_offsets {
        mdl.u32(*offset)?;
    }
    mdl.set_position(arrays_patch);
    write_array_def(mdl, ArrayDef { offset: children_offset, count: node.children.len() as u32 })?;
    write_array_def(mdl, ArrayDef { offset: controller_key_offset, count: node.controllers.len() as u32 })?;
    write_array_def(mdl, ArrayDef { offset: controller_data_offset, count: pool.len() as u32 })?;
    mdl.set_position(resume);

    Ok(self_offset)
}
