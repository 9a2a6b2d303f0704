//! `LIP`: a lip-sync track, a time-ordered list of mouth shapes driving a
//! character's facial animation during dialogue.

use kotor_common::error::Error;
use kotor_common::stream::{ByteReader, ByteWriter};

const MAGIC: &str = "LIP ";
const VERSION: &str = "V1.0";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub time: f32,
    pub shape: u8,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Lip {
    pub length: f32,
    pub keyframes: Vec<Keyframe>,
}

impl Lip {
    pub fn new(length: f32) -> Self {
        Self { length, keyframes: Vec::new() }
    }

    pub fn push(&mut self, time: f32, shape: u8) {
        self.keyframes.push(Keyframe { time, shape });
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
        let length = reader.single()?;
        let keyframe_count = reader.u32()? as usize;

        let mut keyframes = Vec::with_capacity(keyframe_count);
        for _ in 0..keyframe_count {
            let time = reader.single()?;
            let shape = reader.u8()?;
            keyframes.push(Keyframe { time, shape });
        }
        Ok(Self { length, keyframes })
    }

    pub fn write(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.bytes(MAGIC.as_bytes()).unwrap();
        writer.bytes(VERSION.as_bytes()).unwrap();
        writer.single(self.length).unwrap();
        writer.u32(self.keyframes.len() as u32).unwrap();
        for keyframe in &self.keyframes {
            writer.single(keyframe.time).unwrap();
            writer.u8(keyframe.shape).unwrap();
        }
        writer.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut lip = Lip::new(3.2);
        lip.push(0.0, 0);
        lip.push(1.5, 4);
        lip.push(3.2, 0);

        let bytes = lip.write();
        let read_back = Lip::read(&bytes).unwrap();
        assert_eq!(read_back, lip);
    }

    #[test]
    fn test_keyframes_are_in_written_order() {
        let mut lip = Lip::new(1.0);
        lip.push(0.5, 2);
        let bytes = lip.write();
        let read_back = Lip::read(&bytes).unwrap();
        assert_eq!(read_back.keyframes[0].shape, 2);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let result = Lip::read(b"NOPE0000");
        assert!(matches!(result, Err(Error::BadMagic { .. })));
    }
}
