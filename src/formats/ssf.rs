//! `SSF`: a fixed table of `StringRef`s used for a creature's canned sound
//! set (battlecries, pain sounds, selection barks, ...).

use kotor_common::error::Error;
use kotor_common::stream::{ByteReader, ByteWriter};

const MAGIC: &str = "SSF ";
const VERSION: &str = "V1.1";
const SLOT_COUNT: usize = 28;

/// Slot order as laid down by the engine; index into [`Ssf::slots`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundSlot {
    BattleCry1,
    BattleCry2,
    BattleCry3,
    BattleCry4,
    BattleCry5,
    BattleCry6,
    Select1,
    Select2,
    Select3,
    AttackGrunt1,
    AttackGrunt2,
    AttackGrunt3,
    PainGrunt1,
    PainGrunt2,
    LowHealth,
    Death,
    CriticalHit,
    TargetImmune,
    LayMine,
    DisarmMine,
    BeginStealth,
    BeginSearch,
    BeginUnlock,
    UnlockFailed,
    UnlockSuccess,
    SeparatedFromParty,
    RejoinedParty,
    Poisoned,
}

const SLOT_ORDER: [SoundSlot; SLOT_COUNT] = [
    SoundSlot::BattleCry1,
    SoundSlot::BattleCry2,
    SoundSlot::BattleCry3,
    SoundSlot::BattleCry4,
    SoundSlot::BattleCry5,
    SoundSlot::BattleCry6,
    SoundSlot::Select1,
    SoundSlot::Select2,
    SoundSlot::Select3,
    SoundSlot::AttackGrunt1,
    SoundSlot::AttackGrunt2,
    SoundSlot::AttackGrunt3,
    SoundSlot::PainGrunt1,
    SoundSlot::PainGrunt2,
    SoundSlot::LowHealth,
    SoundSlot::Death,
    SoundSlot::CriticalHit,
    SoundSlot::TargetImmune,
    SoundSlot::LayMine,
    SoundSlot::DisarmMine,
    SoundSlot::BeginStealth,
    SoundSlot::BeginSearch,
    SoundSlot::BeginUnlock,
    SoundSlot::UnlockFailed,
    SoundSlot::UnlockSuccess,
    SoundSlot::SeparatedFromParty,
    SoundSlot::RejoinedParty,
    SoundSlot::Poisoned,
];

/// `0xffff_ffff` marks an unset slot, mirroring the engine's sentinel `StringRef`.
pub const NO_STRING_REF: u32 = 0xffff_ffff;

#[derive(Debug, Clone, PartialEq)]
pub struct Ssf {
    slots: [u32; SLOT_COUNT],
}

impl Default for Ssf {
    fn default() -> Self {
        Self { slots: [NO_STRING_REF; SLOT_COUNT] }
    }
}

impl Ssf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: SoundSlot) -> Option<u32> {
        let value = self.slots[slot as usize];
        if value == NO_STRING_REF { None } else { Some(value) }
    }

    pub fn set(&mut self, slot: SoundSlot, string_ref: Option<u32>) {
        self.slots[slot as usize] = string_ref.unwrap_or(NO_STRING_REF);
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

        let table_offset = reader.u32()?;
        reader.set_position(table_offset as u64);

        let mut slots = [NO_STRING_REF; SLOT_COUNT];
        for slot in slots.iter_mut() {
            *slot = reader.u32()?;
        }
        Ok(Self { slots })
    }

    pub fn write(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.bytes(MAGIC.as_bytes()).unwrap();
        writer.bytes(VERSION.as_bytes()).unwrap();
        writer.u32(12).unwrap();
        for value in &self.slots {
            writer.u32(*value).unwrap();
        }
        writer.into_bytes()
    }
}

impl std::ops::Index<SoundSlot> for Ssf {
    type Output = u32;
    fn index(&self, slot: SoundSlot) -> &u32 {
        &self.slots[slot as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut ssf = Ssf::new();
        ssf.set(SoundSlot::Death, Some(4242));
        ssf.set(SoundSlot::Poisoned, Some(10));

        let bytes = ssf.write();
        let read_back = Ssf::read(&bytes).unwrap();
        assert_eq!(read_back, ssf);
        assert_eq!(read_back.get(SoundSlot::Death), Some(4242));
        assert_eq!(read_back.get(SoundSlot::BattleCry1), None);
    }

    #[test]
    fn test_slot_order_matches_table() {
        assert_eq!(SLOT_ORDER[15], SoundSlot::Death);
        assert_eq!(SLOT_ORDER.len(), SLOT_COUNT);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let result = Ssf::read(b"NOPE0000000000");
        assert!(matches!(result, Err(Error::BadMagic { .. })));
    }
}
