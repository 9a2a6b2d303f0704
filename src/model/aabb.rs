//! The per-mesh AABB tree used for fast ray/collision tests against a
//! trimesh's faces. Unrelated to the walkmesh AABB tree in
//! [`crate::walkmesh`], which bounds walkable floor faces instead.

use kotor_common::error::Error;
use kotor_common::stream::{ByteReader, ByteWriter};

#[derive(Debug, Clone, PartialEq)]
pub enum AabbTree {
    Leaf { bounds_min: [f32; 3], bounds_max: [f32; 3], face_index: u32 },
    Split { bounds_min: [f32; 3], bounds_max: [f32; 3], left: Box<AabbTree>, right: Box<AabbTree> },
}

impl AabbTree {
    pub fn bounds(&self) -> ([f32; 3], [f32; 3]) {
        match self {
            AabbTree::Leaf { bounds_min, bounds_max, .. } => (*bounds_min, *bounds_max),
            AabbTree::Split { bounds_min, bounds_max, .. } => (*bounds_min, *bounds_max),
        }
    }

    pub fn read(reader: &mut ByteReader) -> Result<Self, Error> {
        let bounds_min = reader.vector3()?;
        let bounds_max = reader.vector3()?;
        let left_offset = reader.u32()?;
        let right_offset = reader.u32()?;
        let is_leaf = reader.u32()? != 0;
        if is_leaf {
            let face_index = reader.u32()?;
            Ok(AabbTree::Leaf { bounds_min, bounds_max, face_index })
        } else {
            reader.set_position(left_offset as u64);
            let left = Box::new(AabbTree::read(reader)?);
            reader.set_position(right_offset as u64);
            let right = Box::new(AabbTree::read(reader)?);
            Ok(AabbTree::Split { bounds_min, bounds_max, left, right })
        }
    }

    /// Writes this subtree at the writer's current position and returns
    /// the absolute byte offsets `(self_offset, end_offset)`.
    pub fn write(&self, writer: &mut ByteWriter) -> Result<u32, Error> {
        let self_offset = writer.position() as u32;
        match self {
            AabbTree::Leaf { bounds_min, bounds_max, face_index } => {
                writer.vector3(*bounds_min)?;
                writer.vector3(*bounds_max)?;
                writer.u32(0)?; // left_offset
                writer.u32(0)?; // right_offset
                writer.u32(1)?; // is_leaf
                writer.u32(*face_index)?;
            }
            AabbTree::Split { bounds_min, bounds_max, left, right } => {
                writer.vector3(*bounds_min)?;
                writer.vector3(*bounds_max)?;
                let patch_pos = writer.position();
                writer.u32(0)?; // left_offset, patched below
                writer.u32(0)?; // right_offset, patched below
                writer.u32(0)?; // is_leaf

                let left_offset = left.write(writer)?;
                let right_offset = right.write(writer)?;

                let end_pos = writer.position();
                writer.set_position(patch_pos);
                writer.u32(left_offset)?;
                writer.u32(right_offset)?;
                writer.set_position(end_pos);
            }
        }
        Ok(self_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_split_tree() {
        let tree = AabbTree::Split {
            bounds_min: [0.0; 3],
            bounds_max: [1.0; 3],
            left: Box::new(AabbTree::Leaf { bounds_min: [0.0; 3], bounds_max: [0.5; 3], face_index: 0 }),
            right: Box::new(AabbTree::Leaf { bounds_min: [0.5; 3], bounds_max: [1.0; 3], face_index: 1 }),
        };
        let mut writer = ByteWriter::new();
        tree.write(&mut writer).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = ByteReader::new(&bytes);
        let read_back = AabbTree::read(&mut reader).unwrap();
        assert_eq!(read_back, tree);
    }
}
