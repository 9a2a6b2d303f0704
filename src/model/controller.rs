//! Generic keyframe controllers: the engine drives almost every animatable
//! node property (position, orientation, scale, light color, alpha, particle
//! birthrate...) through the same `{type, rows, columns}` row format backed
//! by a flat pool of floats shared across all controllers on a node.

use kotor_common::error::Error;
use kotor_common::stream::{ByteReader, ByteWriter};

/// Controller type ids shared by every node kind.
pub const CONTROLLER_POSITION: u32 = 8;
pub const CONTROLLER_ORIENTATION: u32 = 20;
pub const CONTROLLER_SCALE: u32 = 36;

/// Light-specific controller type ids.
pub const CONTROLLER_LIGHT_COLOR: u32 = 76;
pub const CONTROLLER_LIGHT_RADIUS: u32 = 88;
pub const CONTROLLER_LIGHT_MULTIPLIER: u32 = 140;

/// Emitter-specific controller type ids.
pub const CONTROLLER_EMITTER_ALPHA: u32 = 80;
pub const CONTROLLER_EMITTER_BIRTHRATE: u32 = 88;
pub const CONTROLLER_EMITTER_COLOR: u32 = 96;

/// Saber-specific controller type ids.
pub const CONTROLLER_SABER_FLARE_RADIUS: u32 = 172;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerType {
    Position,
    Orientation,
    Scale,
    LightColor,
    LightRadius,
    LightMultiplier,
    EmitterAlpha,
    EmitterBirthrate,
    EmitterColor,
    SaberFlareRadius,
    Unknown(u32),
}

impl ControllerType {
    pub fn from_id(id: u32) -> Self {
        match id {
            CONTROLLER_POSITION => Self::Position,
            CONTROLLER_ORIENTATION => Self::Orientation,
            CONTROLLER_SCALE => Self::Scale,
            CONTROLLER_LIGHT_COLOR => Self::LightColor,
            CONTROLLER_LIGHT_RADIUS => Self::LightRadius,
            CONTROLLER_LIGHT_MULTIPLIER => Self::LightMultiplier,
            CONTROLLER_EMITTER_ALPHA => Self::EmitterAlpha,
            CONTROLLER_EMITTER_BIRTHRATE => Self::EmitterBirthrate,
            CONTROLLER_EMITTER_COLOR => Self::EmitterColor,
            CONTROLLER_SABER_FLARE_RADIUS => Self::SaberFlareRadius,
            other => Self::Unknown(other),
        }
    }

    pub fn id(&self) -> u32 {
        match self {
            Self::Position => CONTROLLER_POSITION,
            Self::Orientation => CONTROLLER_ORIENTATION,
            Self::Scale => CONTROLLER_SCALE,
            Self::LightColor => CONTROLLER_LIGHT_COLOR,
            Self::LightRadius => CONTROLLER_LIGHT_RADIUS,
            Self::LightMultiplier => CONTROLLER_LIGHT_MULTIPLIER,
            Self::EmitterAlpha => CONTROLLER_EMITTER_ALPHA,
            Self::EmitterBirthrate => CONTROLLER_EMITTER_BIRTHRATE,
            Self::EmitterColor => CONTROLLER_EMITTER_COLOR,
            Self::SaberFlareRadius => CONTROLLER_SABER_FLARE_RADIUS,
            Self::Unknown(id) => *id,
        }
    }

    /// Column count per keyframe row, where known; orientation is stored
    /// compressed and is handled separately from the generic column count.
    pub fn column_count(&self) -> Option<u8> {
        match self {
            Self::Position => Some(3),
            Self::Scale => Some(1),
            Self::LightColor | Self::EmitterColor => Some(3),
            Self::LightRadius | Self::LightMultiplier | Self::EmitterAlpha | Self::EmitterBirthrate | Self::SaberFlareRadius => Some(1),
            Self::Orientation | Self::Unknown(_) => None,
        }
    }
}

/// One sampled row: a time plus `num_columns` data values (or a compressed
/// quaternion for orientation, stored as 4 columns regardless of the
/// on-disk compression scheme).
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerRow {
    pub time: f32,
    pub values: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Controller {
    pub controller_type: ControllerType,
    pub rows: Vec<ControllerRow>,
}

impl Controller {
    pub fn num_columns(&self) -> u8 {
        self.rows.first().map(|r| r.values.len() as u8).unwrap_or(0)
    }

    /// Reads one `{type, unknown, num_rows, first_key_index, num_columns,
    /// pad}` key entry and its rows out of the shared float data pool.
    pub fn read(reader: &mut ByteReader, data_pool: &[f32]) -> Result<Self, Error> {
        let type_id = reader.u32()?;
        reader.u16()?; // unknown
        let num_rows = reader.u16()? as usize;
        let first_key_index = reader.u16()? as usize;
        let num_columns = reader.u8()?;
        reader.skip(3); // pad

        let controller_type = ControllerType::from_id(type_id);
        let bit_flag_columns = num_columns & 0x0F;
        let columns = if controller_type == ControllerType::Orientation && num_columns & 0xF0 != 0 {
            4
        } else {
            bit_flag_columns.max(1)
        } as usize;

        let row_stride = 1 + columns;
        let mut rows = Vec::with_capacity(num_rows);
        for i in 0..num_rows {
            let base = first_key_index + i * row_stride;
            let time = *data_pool.get(base).ok_or(Error::StructuralError("controller key index out of range".into()))?;
            let mut values = Vec::with_capacity(columns);
            for c in 0..columns {
                values.push(*data_pool.get(base + 1 + c).ok_or(Error::StructuralError("controller value index out of range".into()))?);
            }
            rows.push(ControllerRow { time, values });
        }
        Ok(Self { controller_type, rows })
    }

    /// Writes the key entry header; the row data itself is appended to the
    /// node's shared float pool by the caller, which assigns
    /// `first_key_index` after every controller on the node is known.
    pub fn write_key(&self, writer: &mut ByteWriter, first_key_index: u16) -> Result<(), Error> {
        writer.u32(self.controller_type.id())?;
        writer.u16(0)?; // unknown
        writer.u16(self.rows.len() as u16)?;
        writer.u16(first_key_index)?;
        writer.u8(self.num_columns())?;
        writer.bytes(&[0, 0, 0])?;
        Ok(())
    }

    pub fn append_to_pool(&self, pool: &mut Vec<f32>) -> u16 {
        let first_key_index = pool.len() as u16;
        for row in &self.rows {
            pool.push(row.time);
            pool.extend_from_slice(&row.values);
        }
        first_key_index
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Linear interpolation over a position- or scale-shaped controller
/// (1 or 3 columns). Clamps to the first/last keyframe outside its range.
pub fn sample_linear(controller: &Controller, time: f32) -> Option<Vec<f32>> {
    let rows = &controller.rows;
    if rows.is_empty() {
        return None;
    }
    if time <= rows[0].time {
        return Some(rows[0].values.clone());
    }
    if time >= rows[rows.len() - 1].time {
        return Some(rows[rows.len() - 1].values.clone());
    }
    let next_idx = rows.iter().position(|r| r.time > time).unwrap();
    let prev = &rows[next_idx - 1];
    let next = &rows[next_idx];
    let span = next.time - prev.time;
    let t = if span > 0.0 { (time - prev.time) / span } else { 0.0 };
    Some(prev.values.iter().zip(&next.values).map(|(a, b)| lerp(*a, *b, t)).collect())
}

/// Spherical linear interpolation over an orientation controller's
/// quaternion rows (`[x, y, z, w]`), flipping the second quaternion's sign
/// for the shortest arc when the two point in opposite hemispheres.
pub fn sample_orientation(controller: &Controller, time: f32) -> Option<[f32; 4]> {
    let rows = &controller.rows;
    if rows.is_empty() {
        return None;
    }
    let to_quat = |v: &[f32]| [v[0], v[1], v[2], *v.get(3).unwrap_or(&1.0)];
    if time <= rows[0].time {
        return Some(to_quat(&rows[0].values));
    }
    if time >= rows[rows.len() - 1].time {
        return Some(to_quat(&rows[rows.len() - 1].values));
    }
    let next_idx = rows.iter().position(|r| r.time > time).unwrap();
    let q1 = to_quat(&rows[next_idx - 1].values);
    let mut q2 = to_quat(&rows[next_idx].values);
    let span = rows[next_idx].time - rows[next_idx - 1].time;
    let t = if span > 0.0 { (time - rows[next_idx - 1].time) / span } else { 0.0 };

    let mut dot: f32 = q1.iter().zip(q2.iter()).map(|(a, b)| a * b).sum();
    if dot < 0.0 {
        q2 = [-q2[0], -q2[1], -q2[2], -q2[3]];
        dot = -dot;
    }

    if dot > 0.9995 {
        let mut out = [0.0; 4];
        for i in 0..4 {
            out[i] = lerp(q1[i], q2[i], t);
        }
        return Some(normalize(out));
    }

    let theta_0 = dot.acos();
    let theta = theta_0 * t;
    let sin_theta_0 = theta_0.sin();
    let sin_theta = theta.sin();
    let s0 = (theta_0 - theta).sin() / sin_theta_0;
    let s1 = sin_theta / sin_theta_0;
    let mut out = [0.0; 4];
    for i in 0..4 {
        out[i] = s0 * q1[i] + s1 * q2[i];
    }
    Some(out)
}

fn normalize(q: [f32; 4]) -> [f32; 4] {
    let len = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
    if len == 0.0 {
        return q;
    }
    [q[0] / len, q[1] / len, q[2] / len, q[3] / len]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position_controller(rows: Vec<(f32, [f32; 3])>) -> Controller {
        Controller {
            controller_type: ControllerType::Position,
            rows: rows.into_iter().map(|(t, v)| ControllerRow { time: t, values: v.to_vec() }).collect(),
        }
    }

    #[test]
    fn test_linear_sample_midpoint() {
        let c = position_controller(vec![(0.0, [0.0, 0.0, 0.0]), (2.0, [2.0, 4.0, 0.0])]);
        let sampled = sample_linear(&c, 1.0).unwrap();
        assert_eq!(sampled, vec![1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_linear_sample_clamps_outside_range() {
        let c = position_controller(vec![(1.0, [1.0, 0.0, 0.0]), (2.0, [2.0, 0.0, 0.0])]);
        assert_eq!(sample_linear(&c, 0.0).unwrap(), vec![1.0, 0.0, 0.0]);
        assert_eq!(sample_linear(&c, 5.0).unwrap(), vec![2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_orientation_slerp_halfway_between_identity_and_z90() {
        let c = Controller {
            controller_type: ControllerType::Orientation,
            rows: vec![
                ControllerRow { time: 0.0, values: vec![0.0, 0.0, 0.0, 1.0] },
                ControllerRow { time: 1.0, values: vec![0.0, 0.0, std::f32::consts::FRAC_1_SQRT_2, std::f32::consts::FRAC_1_SQRT_2] },
            ],
        };
        let mid = sample_orientation(&c, 0.5).unwrap();
        let len = (mid[0] * mid[0] + mid[1] * mid[1] + mid[2] * mid[2] + mid[3] * mid[3]).sqrt();
        assert!((len - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_key_round_trips_through_shared_pool() {
        let controller = position_controller(vec![(0.0, [1.0, 2.0, 3.0]), (1.0, [4.0, 5.0, 6.0])]);
        let mut pool = Vec::new();
        let first_key_index = controller.append_to_pool(&mut pool);
        let mut writer = ByteWriter::new();
        controller.write_key(&mut writer, first_key_index).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = ByteReader::new(&bytes);
        let read_back = Controller::read(&mut reader, &pool).unwrap();
        assert_eq!(read_back, controller);
    }
}
