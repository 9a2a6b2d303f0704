//! Particle emitter node data: spawn, motion, and rendering parameters for
//! one particle system (fire, sparks, smoke trails, and the like).

use kotor_common::error::Error;
use kotor_common::stream::{ByteReader, ByteWriter};

pub const EMITTER_FLAG_TWO_SIDED_TEXTURE: u32 = 0x0001;
pub const EMITTER_FLAG_LOOP: u32 = 0x0002;
pub const EMITTER_FLAG_FRAME_BLENDING: u32 = 0x0004;

pub const PARTICLE_FLAG_POINT_TO_POINT: u32 = 0x0001;
pub const PARTICLE_FLAG_POINT_TO_POINT_SELECT: u32 = 0x0002;
pub const PARTICLE_FLAG_AFFECTED_BY_WIND: u32 = 0x0004;
pub const PARTICLE_FLAG_TINTED: u32 = 0x0008;
pub const PARTICLE_FLAG_RANDOM_SPAWN: u32 = 0x0010;
pub const PARTICLE_FLAG_INHERIT: u32 = 0x0020;
pub const PARTICLE_FLAG_INHERIT_LOCAL: u32 = 0x0040;
pub const PARTICLE_FLAG_SPLAT: u32 = 0x0080;
pub const PARTICLE_FLAG_INHERIT_PART: u32 = 0x0100;
pub const PARTICLE_FLAG_DEPTH_TEXTURE: u32 = 0x0200;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EmitterData {
    pub dead_space: f32,
    pub blast_radius: f32,
    pub blast_length: f32,
    pub branch_count: u32,
    pub control_point_smoothing: f32,
    pub x_grid: u32,
    pub y_grid: u32,
    pub spawn_type: u32,
    pub update: String,
    pub render: String,
    pub blend: String,
    pub texture: String,
    pub chunk_name: String,
    pub two_sided_texture: bool,
    pub loop_particles: bool,
    pub render_order: u32,
    pub frame_blending: bool,
    pub depth_texture: String,

    pub emission_rate: f32,
    pub frame_start: u32,
    pub frame_end: u32,
    pub frame_change: f32,
    pub frame_random: bool,

    pub lifetime: f32,
    pub lifetime_random: f32,
    pub mass: f32,
    pub mass_random: f32,
    pub spread: f32,
    pub particle_velocity: f32,
    pub particle_random_velocity: f32,

    pub gravity: [f32; 3],
    pub drag: f32,
    pub bounce: f32,
    pub friction: f32,

    pub shape_type: u32,
    pub shape_size: [f32; 3],
    pub grid_width: f32,
    pub grid_height: f32,
    pub texture_rows: u32,
    pub texture_columns: u32,
    pub max_particles: u32,

    pub point_to_point: bool,
    pub point_to_point_select: bool,
    pub affected_by_wind: bool,
    pub tinted: bool,
    pub random_spawn: bool,
    pub inherit: bool,
    pub inherit_local: bool,
    pub splat: bool,
    pub inherit_part: bool,
    pub depth_texture_enabled: bool,

    pub size_start: Vec<f32>,
    pub size_end: Vec<f32>,
    pub alpha_start: Vec<f32>,
    pub alpha_end: Vec<f32>,
    pub color_start: Vec<[f32; 3]>,
    pub color_end: Vec<[f32; 3]>,
}

impl EmitterData {
    pub fn read(reader: &mut ByteReader) -> Result<Self, Error> {
        let dead_space = reader.single()?;
        let blast_radius = reader.single()?;
        let blast_length = reader.single()?;
        let branch_count = reader.u32()?;
        let control_point_smoothing = reader.single()?;
        let x_grid = reader.u32()?;
        let y_grid = reader.u32()?;
        let spawn_type = reader.u32()?;
        let update = reader.string(32)?;
        let render = reader.string(32)?;
        let blend = reader.string(32)?;
        let texture = reader.string(32)?;
        let chunk_name = reader.string(16)?;
        let two_sided_texture = reader.u32()? != 0;
        let loop_particles = reader.u32()? != 0;
        let render_order = reader.u32()?;
        let frame_blending = reader.u32()? != 0;
        let depth_texture = reader.string(32)?;

        reader.skip(1); // padding byte

        let emission_rate = reader.single()?;
        let lifetime = reader.single()?;
        let lifetime_random = reader.single()?;
        let mass = reader.single()?;
        let mass_random = reader.single()?;
        let spread = reader.single()?;
        let particle_velocity = reader.single()?;
        let particle_random_velocity = reader.single()?;

        let gravity = reader.vector3()?;
        let drag = reader.single()?;
        let bounce = reader.single()?;
        let friction = reader.single()?;

        let shape_type = reader.u32()?;
        let shape_size = reader.vector3()?;
        let grid_width = reader.single()?;
        let grid_height = reader.single()?;
        let texture_rows = reader.u32()?;
        let texture_columns = reader.u32()?;
        let max_particles = reader.u32()?;

        let frame_start = reader.u32()?;
        let frame_end = reader.u32()?;
        let frame_change = reader.single()?;
        let frame_random = reader.u32()? != 0;

        let particle_flags = reader.u32()?;

        let size_start = read_float_array(reader)?;
        let size_end = read_float_array(reader)?;
        let alpha_start = read_float_array(reader)?;
        let alpha_end = read_float_array(reader)?;
        let color_start = read_color_array(reader)?;
        let color_end = read_color_array(reader)?;

        Ok(Self {
            dead_space,
            blast_radius,
            blast_length,
            branch_count,
            control_point_smoothing,
            x_grid,
            y_grid,
            spawn_type,
            update,
            render,
            blend,
            texture,
            chunk_name,
            two_sided_texture,
            loop_particles,
            render_order,
            frame_blending,
            depth_texture,
            emission_rate,
            frame_start,
            frame_end,
            frame_change,
            frame_random,
            lifetime,
            lifetime_random,
            mass,
            mass_random,
            spread,
            particle_velocity,
            particle_random_velocity,
            gravity,
            drag,
            bounce,
            friction,
            shape_type,
            shape_size,
            grid_width,
            grid_height,
            texture_rows,
            texture_columns,
            max_particles,
            point_to_point: particle_flags & PARTICLE_FLAG_POINT_TO_POINT != 0,
            point_to_point_select: particle_flags & PARTICLE_FLAG_POINT_TO_POINT_SELECT != 0,
            affected_by_wind: particle_flags & PARTICLE_FLAG_AFFECTED_BY_WIND != 0,
            tinted: particle_flags & PARTICLE_FLAG_TINTED != 0,
            random_spawn: particle_flags & PARTICLE_FLAG_RANDOM_SPAWN != 0,
            inherit: particle_flags & PARTICLE_FLAG_INHERIT != 0,
            inherit_local: particle_flags & PARTICLE_FLAG_INHERIT_LOCAL != 0,
            splat: particle_flags & PARTICLE_FLAG_SPLAT != 0,
            inherit_part: particle_flags & PARTICLE_FLAG_INHERIT_PART != 0,
            depth_texture_enabled: particle_flags & PARTICLE_FLAG_DEPTH_TEXTURE != 0,
            size_start,
            size_end,
            alpha_start,
            alpha_end,
            color_start,
            color_end,
        })
    }

    pub fn particle_flags(&self) -> u32 {
        let mut flags = 0;
        if self.point_to_point {
            flags |= PARTICLE_FLAG_POINT_TO_POINT;
        }
        if self.point_to_point_select {
            flags |= PARTICLE_FLAG_POINT_TO_POINT_SELECT;
        }
        if self.affected_by_wind {
            flags |= PARTICLE_FLAG_AFFECTED_BY_WIND;
        }
        if self.tinted {
            flags |= PARTICLE_FLAG_TINTED;
        }
        if self.random_spawn {
            flags |= PARTICLE_FLAG_RANDOM_SPAWN;
        }
        if self.inherit {
            flags |= PARTICLE_FLAG_INHERIT;
        }
        if self.inherit_local {
            flags |= PARTICLE_FLAG_INHERIT_LOCAL;
        }
        if self.splat {
            flags |= PARTICLE_FLAG_SPLAT;
        }
        if self.inherit_part {
            flags |= PARTICLE_FLAG_INHERIT_PART;
        }
        if self.depth_texture_enabled {
            flags |= PARTICLE_FLAG_DEPTH_TEXTURE;
        }
        flags
    }

    pub fn emitter_flags(&self) -> u32 {
        let mut flags = 0;
        if self.two_sided_texture {
            flags |= EMITTER_FLAG_TWO_SIDED_TEXTURE;
        }
        if self.loop_particles {
            flags |= EMITTER_FLAG_LOOP;
        }
        if self.frame_blending {
            flags |= EMITTER_FLAG_FRAME_BLENDING;
        }
        flags
    }

    pub fn write(&self, writer: &mut ByteWriter) -> Result<(), Error> {
        writer.single(self.dead_space)?;
        writer.single(self.blast_radius)?;
        writer.single(self.blast_length)?;
        writer.u32(self.branch_count)?;
        writer.single(self.control_point_smoothing)?;
        writer.u32(self.x_grid)?;
        writer.u32(self.y_grid)?;
        writer.u32(self.spawn_type)?;
        writer.string(&self.update, 32)?;
        writer.string(&self.render, 32)?;
        writer.string(&self.blend, 32)?;
        writer.string(&self.texture, 32)?;
        writer.string(&self.chunk_name, 16)?;
        writer.u32(self.two_sided_texture as u32)?;
        writer.u32(self.loop_particles as u32)?;
        writer.u32(self.render_order)?;
        writer.u32(self.frame_blending as u32)?;
        writer.string(&self.depth_texture, 32)?;
        writer.u8(0)?; // padding byte

        writer.single(self.emission_rate)?;
        writer.single(self.lifetime)?;
        writer.single(self.lifetime_random)?;
        writer.single(self.mass)?;
        writer.single(self.mass_random)?;
        writer.single(self.spread)?;
        writer.single(self.particle_velocity)?;
        writer.single(self.particle_random_velocity)?;

        writer.vector3(self.gravity)?;
        writer.single(self.drag)?;
        writer.single(self.bounce)?;
        writer.single(self.friction)?;

        writer.u32(self.shape_type)?;
        writer.vector3(self.shape_size)?;
        writer.single(self.grid_width)?;
        writer.single(self.grid_height)?;
        writer.u32(self.texture_rows)?;
        writer.u32(self.texture_columns)?;
        writer.u32(self.max_particles)?;

        writer.u32(self.frame_start)?;
        writer.u32(self.frame_end)?;
        writer.single(self.frame_change)?;
        writer.u32(self.frame_random as u32)?;

        writer.u32(self.particle_flags())?;

        let defs_patch = writer.position();
        let float_arrays: [&[f32]; 4] = [&self.size_start, &self.size_end, &self.alpha_start, &self.alpha_end];
        let color_arrays: [&[[f32; 3]]; 2] = [&self.color_start, &self.color_end];
        for arr in float_arrays.iter().map(|a| a.len()).chain(color_arrays.iter().map(|a| a.len())) {
            writer.u32(0)?;
            writer.u32(arr as u32)?;
            writer.u32(arr as u32)?;
        }

        let mut float_offsets = [0u32; 4];
        for (i, arr) in float_arrays.iter().enumerate() {
            float_offsets[i] = writer.position() as u32;
            for v in arr.iter() {
                writer.single(*v)?;
            }
        }
        let mut color_offsets = [0u32; 2];
        for (i, arr) in color_arrays.iter().enumerate() {
            color_offsets[i] = writer.position() as u32;
            for c in arr.iter() {
                writer.vector3(*c)?;
            }
        }

        let end = writer.position();
        writer.set_position(defs_patch);
        for (offset, arr) in float_offsets.iter().zip(float_arrays.iter()) {
            writer.u32(*offset)?;
            writer.u32(arr.len() as u32)?;
            writer.u32(arr.len() as u32)?;
        }
        for (offset, arr) in color_offsets.iter().zip(color_arrays.iter()) {
            writer.u32(*offset)?;
            writer.u32(arr.len() as u32)?;
            writer.u32(arr.len() as u32)?;
        }
        writer.set_position(end);
        Ok(())
    }
}

fn read_float_array(reader: &mut ByteReader) -> Result<Vec<f32>, Error> {
    let offset = reader.u32()?;
    let count = reader.u32()?;
    let count2 = reader.u32()?;
    if count != count2 {
        return Err(Error::ValidationError(format!("emitter array count mismatch: {count} != {count2}")));
    }
    let resume = reader.position();
    reader.set_position(offset as u64);
    let values = (0..count).map(|_| reader.single()).collect::<Result<_, _>>()?;
    reader.set_position(resume);
    Ok(values)
}

fn read_color_array(reader: &mut ByteReader) -> Result<Vec<[f32; 3]>, Error> {
    let offset = reader.u32()?;
    let count = reader.u32()?;
    let count2 = reader.u32()?;
    if count != count2 {
        return Err(Error::ValidationError(format!("emitter array count mismatch: {count} != {count2}")));
    }
    let resume = reader.position();
    reader.set_position(offset as u64);
    let values = (0..count).map(|_| reader.vector3()).collect::<Result<_, _>>()?;
    reader.set_position(resume);
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particle_flags_round_trip_through_bitmask() {
        let emitter = EmitterData { point_to_point: true, tinted: true, splat: true, ..EmitterData::default() };
        let flags = emitter.particle_flags();
        assert_eq!(flags, PARTICLE_FLAG_POINT_TO_POINT | PARTICLE_FLAG_TINTED | PARTICLE_FLAG_SPLAT);
    }

    #[test]
    fn test_emitter_flags_round_trip_through_bitmask() {
        let emitter = EmitterData { loop_particles: true, frame_blending: true, ..EmitterData::default() };
        assert_eq!(emitter.emitter_flags(), EMITTER_FLAG_LOOP | EMITTER_FLAG_FRAME_BLENDING);
    }
}
