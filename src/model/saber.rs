//! Lightsaber blade geometry: two 8-vertex blade meshes, the second
//! geometrically inverted from the first so the blade renders correctly
//! from both sides.

use kotor_common::error::Error;
use kotor_common::stream::{ByteReader, ByteWriter};

pub const BLADE_VERTEX_COUNT: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct SaberData {
    pub saber_type: u32,
    pub saber_flags: u32,
    pub length: f32,
    pub width: f32,
    pub color: u32,
    pub flare_radius: f32,
    pub flare_color: u32,
    pub blur_length: f32,
    pub blur_width: f32,
    pub glow_size: f32,
    pub glow_intensity: f32,
    pub blade_texture: String,
    pub hit_texture: String,
    pub flare_texture: String,
    pub vertices: Vec<[f32; 3]>,
    pub saber_vertices: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub faces: Vec<[u32; 3]>,
}

impl Default for SaberData {
    fn default() -> Self {
        Self {
            saber_type: 0,
            saber_flags: 0,
            length: 0.0,
            width: 0.0,
            color: 0,
            flare_radius: 0.0,
            flare_color: 0,
            blur_length: 0.0,
            blur_width: 0.0,
            glow_size: 0.0,
            glow_intensity: 0.0,
            blade_texture: String::new(),
            hit_texture: String::new(),
            flare_texture: String::new(),
            vertices: Vec::new(),
            saber_vertices: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            faces: Vec::new(),
        }
    }
}

impl SaberData {
    pub fn read(reader: &mut ByteReader) -> Result<Self, Error> {
        let saber_type = reader.u32()?;
        let saber_flags = reader.u32()?;
        let length = reader.single()?;
        let width = reader.single()?;
        let color = reader.u32()?;
        let flare_radius = reader.single()?;
        let flare_color = reader.u32()?;
        let blur_length = reader.single()?;
        let blur_width = reader.single()?;
        let glow_size = reader.single()?;
        let glow_intensity = reader.single()?;
        let blade_texture = reader.string(16)?;
        let hit_texture = reader.string(16)?;
        let flare_texture = reader.string(16)?;

        let vertex_count = reader.u32()? as usize;
        let vertices = (0..vertex_count).map(|_| reader.vector3()).collect::<Result<_, _>>()?;
        let saber_vertices = (0..vertex_count).map(|_| reader.vector3()).collect::<Result<_, _>>()?;
        let has_uvs = reader.u32()? != 0;
        let uvs = if has_uvs { (0..vertex_count).map(|_| reader.vector2()).collect::<Result<_, _>>()? } else { Vec::new() };
        let normals = (0..vertex_count).map(|_| reader.vector3()).collect::<Result<_, _>>()?;

        let face_count = reader.u32()? as usize;
        let mut faces = Vec::with_capacity(face_count);
        for _ in 0..face_count {
            faces.push([reader.u32()?, reader.u32()?, reader.u32()?]);
        }

        Ok(Self {
            saber_type,
            saber_flags,
            length,
            width,
            color,
            flare_radius,
            flare_color,
            blur_length,
            blur_width,
            glow_size,
            glow_intensity,
            blade_texture,
            hit_texture,
            flare_texture,
            vertices,
            saber_vertices,
            normals,
            uvs,
            faces,
        })
    }

    pub fn write(&self, writer: &mut ByteWriter) -> Result<(), Error> {
        writer.u32(self.saber_type)?;
        writer.u32(self.saber_flags)?;
        writer.single(self.length)?;
        writer.single(self.width)?;
        writer.u32(self.color)?;
        writer.single(self.flare_radius)?;
        writer.u32(self.flare_color)?;
        writer.single(self.blur_length)?;
        writer.single(self.blur_width)?;
        writer.single(self.glow_size)?;
        writer.single(self.glow_intensity)?;
        writer.string(&self.blade_texture, 16)?;
        writer.string(&self.hit_texture, 16)?;
        writer.string(&self.flare_texture, 16)?;

        writer.u32(self.vertices.len() as u32)?;
        for v in &self.vertices {
            writer.vector3(*v)?;
        }
        for v in &self.saber_vertices {
            writer.vector3(*v)?;
        }
        writer.u32(!self.uvs.is_empty() as u32)?;
        for uv in &self.uvs {
            writer.single(uv[0])?;
            writer.single(uv[1])?;
        }
        for n in &self.normals {
            writer.vector3(*n)?;
        }

        writer.u32(self.faces.len() as u32)?;
        for face in &self.faces {
            for index in face {
                writer.u32(*index)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_blade_geometry() {
        let saber = SaberData {
            vertices: vec![[0.0, 0.0, 0.0]; BLADE_VERTEX_COUNT],
            saber_vertices: vec![[0.0, 0.0, 1.0]; BLADE_VERTEX_COUNT],
            normals: vec![[0.0, 1.0, 0.0]; BLADE_VERTEX_COUNT],
            uvs: vec![[0.0, 0.0]; BLADE_VERTEX_COUNT],
            faces: vec![[0, 1, 2], [2, 3, 0]],
            ..SaberData::default()
        };
        let mut writer = ByteWriter::new();
        saber.write(&mut writer).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = ByteReader::new(&bytes);
        let read_back = SaberData::read(&mut reader).unwrap();
        assert_eq!(read_back, saber);
    }
}
