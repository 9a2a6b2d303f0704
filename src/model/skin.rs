//! Bone weights and transforms attached to a skinned trimesh node.

use kotor_common::error::Error;
use kotor_common::stream::{ByteReader, ByteWriter};

/// Per-vertex bone weights and indices, up to 4 bones per vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneVertex {
    pub weights: [f32; 4],
    pub indices: [f32; 4],
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkinData {
    /// `bone_index -> weight_array_index`, one slot per K1/K2 engine bone.
    pub bonemap: Vec<i32>,
    pub qbones: Vec<[f32; 4]>,
    pub tbones: Vec<[f32; 3]>,
    pub vertex_bones: Vec<BoneVertex>,
}

pub fn read_bone_vertices(mdx: &[u8], count: usize, mdx_data_offset: u32, row_size: u32, weights_offset: u32, bones_offset: u32) -> Result<Vec<BoneVertex>, Error> {
    let mut reader = ByteReader::new(mdx);
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let row_start = mdx_data_offset as u64 + i as u64 * row_size as u64;
        reader.set_position(row_start + weights_offset as u64);
        let weights = reader.vector4()?;
        reader.set_position(row_start + bones_offset as u64);
        let indices = reader.vector4()?;
        out.push(BoneVertex { weights, indices });
    }
    Ok(out)
}

pub fn write_bone_vertices(mdx: &mut ByteWriter, vertex_bones: &[BoneVertex], mdx_data_offset: u32, row_size: u32, weights_offset: u32, bones_offset: u32) -> Result<(), Error> {
    for (i, bone_vertex) in vertex_bones.iter().enumerate() {
        let row_start = mdx_data_offset as u64 + i as u64 * row_size as u64;
        mdx.set_position(row_start + weights_offset as u64);
        for w in bone_vertex.weights {
            mdx.single(w)?;
        }
        mdx.set_position(row_start + bones_offset as u64);
        for b in bone_vertex.indices {
            mdx.single(b)?;
        }
    }
    Ok(())
}
