//! `BWM`: the engine's walkmesh, carrying the triangulated floor a
//! creature can path across plus the door/placeable swim hooks.

use kotor_common::error::Error;
use kotor_common::stream::{ByteReader, ByteWriter};

const MAGIC: &str = "BWM ";
const VERSION: &str = "V1.0";
const HEADER_SIZE: u32 = 136;

/// Face materials a creature can walk on; every other material id blocks
/// pathing (water, non-walkable dirt, grass-that-isn't-a-floor, etc.).
pub const WALKABLE_MATERIALS: [u8; 16] = [1, 3, 4, 5, 6, 9, 10, 11, 12, 13, 14, 16, 18, 20, 21, 22];

pub fn is_walkable(material: u8) -> bool {
    WALKABLE_MATERIALS.contains(&material)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    pub indices: [u32; 3],
    pub material: u8,
    pub normal: [f32; 3],
    pub planar_distance: f32,
}

impl Face {
    pub fn is_walkable(&self) -> bool {
        is_walkable(self.material)
    }
}

/// An edge of one walkable face; `transition` is the adjoining area's face
/// index when this edge crosses into another room, `None` otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub face_index: u32,
    pub transition: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AabbNode {
    pub bounds_min: [f32; 3],
    pub bounds_max: [f32; 3],
    pub face_index: i32,
    pub left_child: i32,
    pub right_child: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Walkmesh {
    pub walkmesh_type: u32,
    pub relative_hook1: [f32; 3],
    pub relative_hook2: [f32; 3],
    pub absolute_hook1: [f32; 3],
    pub absolute_hook2: [f32; 3],
    pub position: [f32; 3],
    pub vertices: Vec<[f32; 3]>,
    pub faces: Vec<Face>,
    pub aabb: Vec<AabbNode>,
    pub edges: Vec<Edge>,
    pub perimeters: Vec<u32>,
}

impl Walkmesh {
    /// Faces with a walkable material, in on-disk order (walkable faces are
    /// always stored first by the writer).
    pub fn walkable_faces(&self) -> impl Iterator<Item = (usize, &Face)> {
        self.faces.iter().enumerate().filter(|(_, f)| f.is_walkable())
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

        let walkmesh_type = reader.u32()?;
        let relative_hook1 = reader.vector3()?;
        let relative_hook2 = reader.vector3()?;
        let absolute_hook1 = reader.vector3()?;
        let absolute_hook2 = reader.vector3()?;
        let position = reader.vector3()?;

        let vertex_count = reader.u32()? as usize;
        let vertex_offset = reader.u32()?;
        let face_count = reader.u32()? as usize;
        let face_offset = reader.u32()?;
        let material_offset = reader.u32()?;
        let normal_offset = reader.u32()?;
        let planar_distance_offset = reader.u32()?;
        let aabb_offset = reader.u32()?;
        let aabb_count = reader.u32()? as usize;
        let _walkable_face_count = reader.u32()?;
        let edge_count = reader.u32()? as usize;
        let edge_offset = reader.u32()?;
        let perimeter_count = reader.u32()? as usize;
        let perimeter_offset = reader.u32()?;
        reader.skip(8); // reserved

        reader.set_position(vertex_offset as u64);
        let mut vertices = Vec::with_capacity(vertex_count);
        for _ in 0..vertex_count {
            vertices.push(reader.vector3()?);
        }

        reader.set_position(face_offset as u64);
        let mut face_indices = Vec::with_capacity(face_count);
        for _ in 0..face_count {
            face_indices.push([reader.u32()?, reader.u32()?, reader.u32()?]);
        }

        reader.set_position(material_offset as u64);
        let mut materials = Vec::with_capacity(face_count);
        for _ in 0..face_count {
            materials.push(reader.u32()? as u8);
        }

        reader.set_position(normal_offset as u64);
        let mut normals = Vec::with_capacity(face_count);
        for _ in 0..face_count {
            normals.push(reader.vector3()?);
        }

        reader.set_position(planar_distance_offset as u64);
        let mut planar_distances = Vec::with_capacity(face_count);
        for _ in 0..face_count {
            planar_distances.push(reader.single()?);
        }

        let faces: Vec<Face> = (0..face_count)
            .map(|i| Face {
                indices: face_indices[i],
                material: materials[i],
                normal: normals[i],
                planar_distance: planar_distances[i],
            })
            .collect();

        reader.set_position(aabb_offset as u64);
        let mut aabb = Vec::with_capacity(aabb_count);
        for _ in 0..aabb_count {
            aabb.push(AabbNode {
                bounds_min: reader.vector3()?,
                bounds_max: reader.vector3()?,
                face_index: reader.i32()?,
                left_child: reader.i32()?,
                right_child: reader.i32()?,
            });
        }

        reader.set_position(edge_offset as u64);
        let mut edges = Vec::with_capacity(edge_count);
        for _ in 0..edge_count {
            let face_index = reader.u32()?;
            let transition_raw = reader.i32()?;
            edges.push(Edge { face_index, transition: if transition_raw >= 0 { Some(transition_raw) } else { None } });
        }

        reader.set_position(perimeter_offset as u64);
        let mut perimeters = Vec::with_capacity(perimeter_count);
        for _ in 0..perimeter_count {
            perimeters.push(reader.u32()?);
        }

        Ok(Self {
            walkmesh_type,
            relative_hook1,
            relative_hook2,
            absolute_hook1,
            absolute_hook2,
            position,
            vertices,
            faces,
            aabb,
            edges,
            perimeters,
        })
    }

    pub fn write(&self) -> Vec<u8> {
        let face_count = self.faces.len() as u32;
        let vertex_offset = HEADER_SIZE;
        let face_offset = vertex_offset + self.vertices.len() as u32 * 12;
        let material_offset = face_offset + face_count * 12;
        let normal_offset = material_offset + face_count * 4;
        let planar_distance_offset = normal_offset + face_count * 12;
        let aabb_offset = planar_distance_offset + face_count * 4;
        let edge_offset = aabb_offset + self.aabb.len() as u32 * 32;
        let perimeter_offset = edge_offset + self.edges.len() as u32 * 8;

        // Walkable faces must precede non-walkable ones on disk regardless
        // of in-memory order; the partition is stable within each side so
        // unrelated ordering (e.g. original read order) is otherwise kept.
        let mut order: Vec<usize> = (0..self.faces.len()).filter(|&i| self.faces[i].is_walkable()).collect();
        let walkable_face_count = order.len() as u32;
        order.extend((0..self.faces.len()).filter(|&i| !self.faces[i].is_walkable()));

        let mut new_index = vec![0u32; self.faces.len()];
        for (new_i, &old_i) in order.iter().enumerate() {
            new_index[old_i] = new_i as u32;
        }

        let mut writer = ByteWriter::new();
        writer.bytes(MAGIC.as_bytes()).unwrap();
        writer.bytes(VERSION.as_bytes()).unwrap();
        writer.u32(self.walkmesh_type).unwrap();
        writer.vector3(self.relative_hook1).unwrap();
        writer.vector3(self.relative_hook2).unwrap();
        writer.vector3(self.absolute_hook1).unwrap();
        writer.vector3(self.absolute_hook2).unwrap();
        writer.vector3(self.position).unwrap();
        writer.u32(self.vertices.len() as u32).unwrap();
        writer.u32(vertex_offset).unwrap();
        writer.u32(face_count).unwrap();
        writer.u32(face_offset).unwrap();
        writer.u32(material_offset).unwrap();
        writer.u32(normal_offset).unwrap();
        writer.u32(planar_distance_offset).unwrap();
        writer.u32(aabb_offset).unwrap();
        writer.u32(self.aabb.len() as u32).unwrap();
        writer.u32(walkable_face_count).unwrap();
        writer.u32(self.edges.len() as u32).unwrap();
        writer.u32(edge_offset).unwrap();
        writer.u32(self.perimeters.len() as u32).unwrap();
        writer.u32(perimeter_offset).unwrap();
        writer.bytes(&[0u8; 8]).unwrap();

        for vertex in &self.vertices {
            writer.vector3(*vertex).unwrap();
        }
        for &i in &order {
            for index in self.faces[i].indices {
                writer.u32(index).unwrap();
            }
        }
        for &i in &order {
            writer.u32(self.faces[i].material as u32).unwrap();
        }
        for &i in &order {
            writer.vector3(self.faces[i].normal).unwrap();
        }
        for &i in &order {
            writer.single(self.faces[i].planar_distance).unwrap();
        }
        for node in &self.aabb {
            writer.vector3(node.bounds_min).unwrap();
            writer.vector3(node.bounds_max).unwrap();
            let face_index = if node.face_index >= 0 { new_index[node.face_index as usize] as i32 } else { node.face_index };
            writer.i32(face_index).unwrap();
            writer.i32(node.left_child).unwrap();
            writer.i32(node.right_child).unwrap();
        }
        for edge in &self.edges {
            writer.u32(new_index[edge.face_index as usize]).unwrap();
            writer.i32(edge.transition.unwrap_or(-1)).unwrap();
        }
        for perimeter in &self.perimeters {
            writer.u32(*perimeter).unwrap();
        }

        writer.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Walkmesh {
        Walkmesh {
            walkmesh_type: 1,
            relative_hook1: [0.0; 3],
            relative_hook2: [0.0; 3],
            absolute_hook1: [0.0; 3],
            absolute_hook2: [0.0; 3],
            position: [0.0; 3],
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            faces: vec![Face { indices: [0, 1, 2], material: 1, normal: [0.0, 0.0, 1.0], planar_distance: 0.0 }],
            aabb: vec![AabbNode {
                bounds_min: [0.0, 0.0, 0.0],
                bounds_max: [1.0, 1.0, 0.0],
                face_index: 0,
                left_child: -1,
                right_child: -1,
            }],
            edges: vec![Edge { face_index: 0, transition: None }, Edge { face_index: 0, transition: Some(4) }],
            perimeters: vec![0, 1],
        }
    }

    #[test]
    fn test_round_trip() {
        let mesh = sample();
        let bytes = mesh.write();
        let read_back = Walkmesh::read(&bytes).unwrap();
        assert_eq!(read_back, mesh);
    }

    #[test]
    fn test_walkable_faces_filters_by_material() {
        let mut mesh = sample();
        mesh.faces.push(Face { indices: [0, 1, 2], material: 2, normal: [0.0, 0.0, 1.0], planar_distance: 0.0 });
        let walkable: Vec<_> = mesh.walkable_faces().collect();
        assert_eq!(walkable.len(), 1);
        assert_eq!(walkable[0].0, 0);
    }

    #[test]
    fn test_writer_sorts_walkable_faces_first_even_if_model_is_reordered() {
        let mut mesh = sample();
        // Prepend a non-walkable face so the in-memory order is
        // non-walkable, walkable instead of the canonical walkable-first
        // layout; the AABB and edge already reference the walkable face
        // at its original index 0.
        mesh.faces.insert(0, Face { indices: [0, 1, 2], material: 7, normal: [0.0, 0.0, 1.0], planar_distance: 0.0 });
        mesh.aabb[0].face_index = 1;
        for edge in &mut mesh.edges {
            edge.face_index = 1;
        }

        let bytes = mesh.write();
        let walkable_face_count = u32::from_le_bytes(bytes[108..112].try_into().unwrap());
        assert_eq!(walkable_face_count, 1);

        let read_back = Walkmesh::read(&bytes).unwrap();
        assert!(read_back.faces[0].is_walkable());
        assert!(!read_back.faces[1].is_walkable());
        assert_eq!(read_back.aabb[0].face_index, 0);
        assert_eq!(read_back.edges[0].face_index, 0);
    }

    #[test]
    fn test_edge_transition_sentinel_round_trips() {
        let mesh = sample();
        let bytes = mesh.write();
        let read_back = Walkmesh::read(&bytes).unwrap();
        assert_eq!(read_back.edges[0].transition, None);
        assert_eq!(read_back.edges[1].transition, Some(4));
    }
}
