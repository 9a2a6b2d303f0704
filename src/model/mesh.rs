//! `TrimeshHeader` and the interleaved MDX vertex layout every mesh-bearing
//! node (trimesh, skin, dangly, AABB) shares.

use kotor_common::error::Error;
use kotor_common::stream::{ByteReader, ByteWriter};

pub const MDX_FLAG_VERTEX: u32 = 0x0001;
pub const MDX_FLAG_NORMAL: u32 = 0x0002;
pub const MDX_FLAG_COLOR: u32 = 0x0004;
pub const MDX_FLAG_UV1: u32 = 0x0008;
pub const MDX_FLAG_UV2: u32 = 0x0010;
pub const MDX_FLAG_TANGENT: u32 = 0x0020;

const NO_OFFSET: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    pub v1: u32,
    pub v2: u32,
    pub v3: u32,
    pub material: u16,
    pub normal: [f32; 3],
    pub plane_distance: f32,
}

/// Which per-vertex components are interleaved into each MDX row, and
/// where within the row each one starts. Absent components carry
/// `offset == -1`; present ones must be `>= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MdxComponents {
    pub vertex: Option<u32>,
    pub normal: Option<u32>,
    pub color: Option<u32>,
    pub uv1: Option<u32>,
    pub uv2: Option<u32>,
    pub tangent: Option<u32>,
}

impl MdxComponents {
    pub fn flags(&self) -> u32 {
        let mut flags = 0;
        if self.vertex.is_some() {
            flags |= MDX_FLAG_VERTEX;
        }
        if self.normal.is_some() {
            flags |= MDX_FLAG_NORMAL;
        }
        if self.color.is_some() {
            flags |= MDX_FLAG_COLOR;
        }
        if self.uv1.is_some() {
            flags |= MDX_FLAG_UV1;
        }
        if self.uv2.is_some() {
            flags |= MDX_FLAG_UV2;
        }
        if self.tangent.is_some() {
            flags |= MDX_FLAG_TANGENT;
        }
        flags
    }

    /// Lays out present components back-to-back in declaration order and
    /// returns the total per-vertex row size in bytes.
    pub fn layout(vertex: bool, normal: bool, color: bool, uv1: bool, uv2: bool, tangent: bool) -> (Self, u32) {
        let mut cursor = 0u32;
        let mut components = Self::default();
        if vertex {
            components.vertex = Some(cursor);
            cursor += 12;
        }
        if normal {
            components.normal = Some(cursor);
            cursor += 12;
        }
        if color {
            // stored as a full RGBA vector4, not a packed 4-byte color
            components.color = Some(cursor);
            cursor += 16;
        }
        if uv1 {
            components.uv1 = Some(cursor);
            cursor += 8;
        }
        if uv2 {
            components.uv2 = Some(cursor);
            cursor += 8;
        }
        if tangent {
            components.tangent = Some(cursor);
            cursor += 16;
        }
        (components, cursor)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub diffuse: [f32; 3],
    pub ambient: [f32; 3],
    pub transparency_hint: u32,
    pub texture1: String,
    pub texture2: String,
    pub render: bool,
    pub shadow: bool,
    pub beaming: bool,
    pub render_environment_map: bool,
    pub background_geometry: bool,
    pub animate_uv: bool,
    pub rotate_texture: bool,
    pub uv_direction: [f32; 2],
    pub uv_jitter: f32,
    pub uv_jitter_speed: f32,
    pub bounding_box_min: [f32; 3],
    pub bounding_box_max: [f32; 3],
    pub radius: f32,
    pub average: [f32; 3],
    pub vertex_count: u32,
    pub mdx_components: MdxComponents,
    pub mdx_vertex_size: u32,
    pub vertices: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 4]>,
    pub uv1: Vec<[f32; 2]>,
    pub uv2: Vec<[f32; 2]>,
    pub faces: Vec<Face>,
}

impl MeshData {
    pub fn render_flags(&self) -> u32 {
        (self.render as u32)
            | ((self.shadow as u32) << 1)
            | ((self.beaming as u32) << 2)
            | ((self.render_environment_map as u32) << 3)
            | ((self.background_geometry as u32) << 4)
    }

    pub fn anim_flags(&self) -> u32 {
        (self.animate_uv as u32) | ((self.rotate_texture as u32) << 1)
    }
}

/// Reads the trimesh header fields shared by every mesh-bearing node type,
/// up to and including the MDX row layout; the caller then reads MDX
/// vertex rows and face arrays using the returned array descriptors.
pub fn read_trimesh_header(reader: &mut ByteReader) -> Result<(MeshData, super::node::ArrayDef, super::node::ArrayDef, super::node::ArrayDef, super::node::ArrayDef, u32), Error> {
    use super::node::read_array_def;

    let _fn_ptr0 = reader.u32()?;
    let _fn_ptr1 = reader.u32()?;
    let _vertices_arr = read_array_def(reader)?;
    let _normals_arr = read_array_def(reader)?;
    let _uv1_arr = read_array_def(reader)?;
    let _uv2_arr = read_array_def(reader)?;
    let _colors_arr = read_array_def(reader)?;

    let faces_arr = read_array_def(reader)?;
    let face_materials_arr = read_array_def(reader)?;
    let face_normals_arr = read_array_def(reader)?;
    let face_distances_arr = read_array_def(reader)?;

    let mut mesh = MeshData::default();
    mesh.diffuse = reader.vector3()?;
    mesh.ambient = reader.vector3()?;
    mesh.bounding_box_min = reader.vector3()?;
    mesh.bounding_box_max = reader.vector3()?;
    mesh.average = reader.vector3()?;
    mesh.radius = reader.single()?;
    mesh.transparency_hint = reader.u32()?;

    mesh.texture1 = reader.string(32)?;
    mesh.texture2 = reader.string(32)?;

    let render_flags = reader.u32()?;
    mesh.render = render_flags & 0x0001 != 0;
    mesh.shadow = render_flags & 0x0002 != 0;
    mesh.beaming = render_flags & 0x0004 != 0;
    mesh.render_environment_map = render_flags & 0x0008 != 0;
    mesh.background_geometry = render_flags & 0x0010 != 0;

    let anim_flags = reader.u32()?;
    mesh.animate_uv = anim_flags & 0x0001 != 0;
    mesh.rotate_texture = anim_flags & 0x0002 != 0;

    mesh.uv_direction = reader.vector2()?;
    mesh.uv_jitter = reader.single()?;
    mesh.uv_jitter_speed = reader.single()?;

    mesh.mdx_vertex_size = reader.u32()?;
    let mdx_data_flags = reader.u32()?;
    let off_vertex = reader.i32()?;
    let off_normal = reader.i32()?;
    let off_color = reader.i32()?;
    let off_uv1 = reader.i32()?;
    let off_uv2 = reader.i32()?;
    let off_tangent = reader.i32()?;

    mesh.mdx_components = MdxComponents {
        vertex: (mdx_data_flags & MDX_FLAG_VERTEX != 0 && off_vertex >= 0).then_some(off_vertex as u32),
        normal: (mdx_data_flags & MDX_FLAG_NORMAL != 0 && off_normal >= 0).then_some(off_normal as u32),
        color: (mdx_data_flags & MDX_FLAG_COLOR != 0 && off_color >= 0).then_some(off_color as u32),
        uv1: (mdx_data_flags & MDX_FLAG_UV1 != 0 && off_uv1 >= 0).then_some(off_uv1 as u32),
        uv2: (mdx_data_flags & MDX_FLAG_UV2 != 0 && off_uv2 >= 0).then_some(off_uv2 as u32),
        tangent: (mdx_data_flags & MDX_FLAG_TANGENT != 0 && off_tangent >= 0).then_some(off_tangent as u32),
    };

    let mdx_data_offset = reader.u32()?;
    let _mdx_data_size = reader.u32()?;
    mesh.vertex_count = reader.u32()?;

    Ok((mesh, faces_arr, face_materials_arr, face_normals_arr, face_distances_arr, mdx_data_offset))
}

pub fn read_mdx_rows(mdx: &[u8], mesh: &mut MeshData, mdx_data_offset: u32) -> Result<(), Error> {
    let row_size = mesh.mdx_vertex_size as usize;
    if row_size == 0 {
        return Ok(());
    }
    let mut mdx_reader = ByteReader::new(mdx);
    for i in 0..mesh.vertex_count as usize {
        let row_start = mdx_data_offset as usize + i * row_size;
        if let Some(offset) = mesh.mdx_components.vertex {
            mdx_reader.set_position((row_start + offset as usize) as u64);
            mesh.vertices.push(mdx_reader.vector3()?);
        }
        if let Some(offset) = mesh.mdx_components.normal {
            mdx_reader.set_position((row_start + offset as usize) as u64);
            mesh.normals.push(mdx_reader.vector3()?);
        }
        if let Some(offset) = mesh.mdx_components.color {
            mdx_reader.set_position((row_start + offset as usize) as u64);
            mesh.colors.push(mdx_reader.vector4()?);
        }
        if let Some(offset) = mesh.mdx_components.uv1 {
            mdx_reader.set_position((row_start + offset as usize) as u64);
            mesh.uv1.push(mdx_reader.vector2()?);
        }
        if let Some(offset) = mesh.mdx_components.uv2 {
            mdx_reader.set_position((row_start + offset as usize) as u64);
            mesh.uv2.push(mdx_reader.vector2()?);
        }
    }
    Ok(())
}

pub fn write_mdx_rows(mdx: &mut ByteWriter, mesh: &MeshData) -> Result<(), Error> {
    for i in 0..mesh.vertex_count as usize {
        let row_start = mdx.position();
        if let Some(offset) = mesh.mdx_components.vertex {
            mdx.set_position(row_start + offset as u64);
            mdx.vector3(mesh.vertices[i])?;
        }
        if let Some(offset) = mesh.mdx_components.normal {
            mdx.set_position(row_start + offset as u64);
            mdx.vector3(mesh.normals[i])?;
        }
        if let Some(offset) = mesh.mdx_components.color {
            mdx.set_position(row_start + offset as u64);
            for component in mesh.colors[i] {
                mdx.single(component)?;
            }
        }
        if let Some(offset) = mesh.mdx_components.uv1 {
            mdx.set_position(row_start + offset as u64);
            for component in mesh.uv1[i] {
                mdx.single(component)?;
            }
        }
        if let Some(offset) = mesh.mdx_components.uv2 {
            mdx.set_position(row_start + offset as u64);
            for component in mesh.uv2[i] {
                mdx.single(component)?;
            }
        }
        mdx.set_position(row_start + mesh.mdx_vertex_size as u64);
    }
    Ok(())
}

/// Writes the trimesh header; array offsets for faces/materials/normals/
/// distances and the MDX data offset must already be known (the caller
/// lays out the node body before calling this).
#[allow(clippy::too_many_arguments)]
pub fn write_trimesh_header(
    writer: &mut ByteWriter,
    mesh: &MeshData,
    faces_arr: super::node::ArrayDef,
    face_materials_arr: super::node::ArrayDef,
    face_normals_arr: super::node::ArrayDef,
    face_distances_arr: super::node::ArrayDef,
    mdx_data_offset: u32,
) -> Result<(), Error> {
    use super::node::{write_array_def, ArrayDef};

    writer.u32(0)?; // fn_ptr0
    writer.u32(0)?; // fn_ptr1
    write_array_def(writer, ArrayDef { offset: 0, count: 0 })?; // vertices (legacy, unused by readers)
    write_array_def(writer, ArrayDef { offset: 0, count: 0 })?; // normals
    write_array_def(writer, ArrayDef { offset: 0, count: 0 })?; // uv1
    write_array_def(writer, ArrayDef { offset: 0, count: 0 })?; // uv2
    write_array_def(writer, ArrayDef { offset: 0, count: 0 })?; // colors

    write_array_def(writer, faces_arr)?;
    write_array_def(writer, face_materials_arr)?;
    write_array_def(writer, face_normals_arr)?;
    write_array_def(writer, face_distances_arr)?;

    writer.vector3(mesh.diffuse)?;
    writer.vector3(mesh.ambient)?;
    writer.vector3(mesh.bounding_box_min)?;
    writer.vector3(mesh.bounding_box_max)?;
    writer.vector3(mesh.average)?;
    writer.single(mesh.radius)?;
    writer.u32(mesh.transparency_hint)?;

    writer.string(&mesh.texture1, 32)?;
    writer.string(&mesh.texture2, 32)?;

    writer.u32(mesh.render_flags())?;
    writer.u32(mesh.anim_flags())?;
    writer.single(mesh.uv_direction[0])?;
    writer.single(mesh.uv_direction[1])?;
    writer.single(mesh.uv_jitter)?;
    writer.single(mesh.uv_jitter_speed)?;

    writer.u32(mesh.mdx_vertex_size)?;
    writer.u32(mesh.mdx_components.flags())?;
    writer.i32(mesh.mdx_components.vertex.map(|o| o as i32).unwrap_or(NO_OFFSET))?;
    writer.i32(mesh.mdx_components.normal.map(|o| o as i32).unwrap_or(NO_OFFSET))?;
    writer.i32(mesh.mdx_components.color.map(|o| o as i32).unwrap_or(NO_OFFSET))?;
    writer.i32(mesh.mdx_components.uv1.map(|o| o as i32).unwrap_or(NO_OFFSET))?;
    writer.i32(mesh.mdx_components.uv2.map(|o| o as i32).unwrap_or(NO_OFFSET))?;
    writer.i32(mesh.mdx_components.tangent.map(|o| o as i32).unwrap_or(NO_OFFSET))?;

    writer.u32(mdx_data_offset)?;
    writer.u32(mesh.vertex_count * mesh.mdx_vertex_size)?;
    writer.u32(mesh.vertex_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mdx_component_layout_packs_sequentially() {
        let (components, row_size) = MdxComponents::layout(true, true, false, true, false, false);
        assert_eq!(components.vertex, Some(0));
        assert_eq!(components.normal, Some(12));
        assert_eq!(components.uv1, Some(24));
        assert_eq!(row_size, 32);
    }

    #[test]
    fn test_flags_reflect_present_components() {
        let (components, _) = MdxComponents::layout(true, false, true, false, false, false);
        assert_eq!(components.flags(), MDX_FLAG_VERTEX | MDX_FLAG_COLOR);
    }
}
