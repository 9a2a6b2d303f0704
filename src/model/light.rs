//! Point/spot light node data, including lens-flare layers.

use kotor_common::error::Error;
use kotor_common::stream::{ByteReader, ByteWriter};

use super::node::{read_array_def, write_array_def, ArrayDef};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LightData {
    pub flare_radius: f32,
    pub multiplier: f32,
    pub light_priority: u32,
    pub ambient_only: bool,
    pub dynamic_type: u32,
    pub affect_dynamic: bool,
    pub shadow: bool,
    pub has_flare: bool,
    pub fading_light: bool,
    pub inner_angle: f32,
    pub outer_angle: f32,
    pub spot_falloff: f32,
    pub color: [f32; 3],
    pub ambient_color: [f32; 3],
    pub radius: f32,
    pub fade_amount: f32,
    pub fade_radius: f32,
    pub flare_sizes: Vec<f32>,
    pub flare_positions: Vec<f32>,
    pub flare_color_shifts: Vec<[f32; 3]>,
    pub flare_textures: Vec<String>,
}

impl LightData {
    pub fn read(reader: &mut ByteReader, resolve_name: impl Fn(u32) -> Option<String>) -> Result<Self, Error> {
        let flare_radius = reader.single()?;
        let multiplier = reader.single()?;
        let light_priority = reader.u32()?;
        let ambient_only = reader.u32()? != 0;
        let dynamic_type = reader.u32()?;
        let affect_dynamic = reader.u32()? != 0;
        let shadow = reader.u32()? != 0;
        let has_flare = reader.u32()? != 0;
        let fading_light = reader.u32()? != 0;

        let inner_angle = reader.single()?;
        let outer_angle = reader.single()?;
        let spot_falloff = reader.single()?;
        let color = reader.vector3()?;
        let ambient_color = reader.vector3()?;
        let radius = reader.single()?;
        let fade_amount = reader.single()?;
        let fade_radius = reader.single()?;

        let flare_sizes_arr = read_array_def(reader)?;
        let flare_positions_arr = read_array_def(reader)?;
        let flare_colors_arr = read_array_def(reader)?;
        let textures_arr = read_array_def(reader)?;

        let flare_sizes = read_f32_array(reader, flare_sizes_arr)?;
        let flare_positions = read_f32_array(reader, flare_positions_arr)?;

        reader.set_position(flare_colors_arr.offset as u64);
        let mut flare_color_shifts = Vec::with_capacity(flare_colors_arr.count as usize);
        for _ in 0..flare_colors_arr.count {
            flare_color_shifts.push(reader.vector3()?);
        }

        reader.set_position(textures_arr.offset as u64);
        let mut flare_textures = Vec::with_capacity(textures_arr.count as usize);
        for _ in 0..textures_arr.count {
            let name_index = reader.u32()?;
            if let Some(name) = resolve_name(name_index) {
                flare_textures.push(name);
            }
        }

        Ok(Self {
            flare_radius,
            multiplier,
            light_priority,
            ambient_only,
            dynamic_type,
            affect_dynamic,
            shadow,
            has_flare,
            fading_light,
            inner_angle,
            outer_angle,
            spot_falloff,
            color,
            ambient_color,
            radius,
            fade_amount,
            fade_radius,
            flare_sizes,
            flare_positions,
            flare_color_shifts,
            flare_textures,
        })
    }

    /// Writes the fixed header fields, then the 4 flare array defs as
    /// placeholders, then the flare data itself immediately after, patching
    /// the placeholders once the real offsets are known.
    pub fn write(&self, writer: &mut ByteWriter, resolve_name_index: impl Fn(&str) -> u32) -> Result<(), Error> {
        writer.single(self.flare_radius)?;
        writer.single(self.multiplier)?;
        writer.u32(self.light_priority)?;
        writer.u32(self.ambient_only as u32)?;
        writer.u32(self.dynamic_type)?;
        writer.u32(self.affect_dynamic as u32)?;
        writer.u32(self.shadow as u32)?;
        writer.u32(self.has_flare as u32)?;
        writer.u32(self.fading_light as u32)?;

        writer.single(self.inner_angle)?;
        writer.single(self.outer_angle)?;
        writer.single(self.spot_falloff)?;
        writer.vector3(self.color)?;
        writer.vector3(self.ambient_color)?;
        writer.single(self.radius)?;
        writer.single(self.fade_amount)?;
        writer.single(self.fade_radius)?;

        let defs_patch = writer.position();
        write_array_def(writer, ArrayDef { offset: 0, count: self.flare_sizes.len() as u32 })?;
        write_array_def(writer, ArrayDef { offset: 0, count: self.flare_positions.len() as u32 })?;
        write_array_def(writer, ArrayDef { offset: 0, count: self.flare_color_shifts.len() as u32 })?;
        write_array_def(writer, ArrayDef { offset: 0, count: self.flare_textures.len() as u32 })?;

        let sizes_offset = writer.position() as u32;
        for v in &self.flare_sizes {
            writer.single(*v)?;
        }
        let positions_offset = writer.position() as u32;
        for v in &self.flare_positions {
            writer.single(*v)?;
        }
        let colors_offset = writer.position() as u32;
        for c in &self.flare_color_shifts {
            writer.vector3(*c)?;
        }
        let textures_offset = writer.position() as u32;
        for name in &self.flare_textures {
            writer.u32(resolve_name_index(name))?;
        }

        let end = writer.position();
        writer.set_position(defs_patch);
        write_array_def(writer, ArrayDef { offset: sizes_offset, count: self.flare_sizes.len() as u32 })?;
        write_array_def(writer, ArrayDef { offset: positions_offset, count: self.flare_positions.len() as u32 })?;
        write_array_def(writer, ArrayDef { offset: colors_offset, count: self.flare_color_shifts.len() as u32 })?;
        write_array_def(writer, ArrayDef { offset: textures_offset, count: self.flare_textures.len() as u32 })?;
        writer.set_position(end);
        Ok(())
    }
}

fn read_f32_array(reader: &mut ByteReader, def: ArrayDef) -> Result<Vec<f32>, Error> {
    reader.set_position(def.offset as u64);
    (0..def.count).map(|_| reader.single()).collect()
}
