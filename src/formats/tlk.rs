//! `TLK`: the talk table, a flat array of localized strings referenced by
//! `StringRef` from GFF fields and scripts.

use kotor_common::error::Error;
use kotor_common::stream::{ByteReader, ByteWriter};

const MAGIC: &str = "TLK ";
const VERSION: &str = "V3.0";
const ENTRY_SIZE: u32 = 40;

const FLAG_TEXT_PRESENT: u32 = 0x0001;
const FLAG_SND_PRESENT: u32 = 0x0002;
const FLAG_SND_LENGTH_PRESENT: u32 = 0x0004;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TalkEntry {
    pub text: Option<String>,
    pub sound_resref: Option<String>,
    pub volume_variance: u32,
    pub pitch_variance: u32,
    pub sound_length: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tlk {
    pub language_id: u32,
    pub entries: Vec<TalkEntry>,
}

impl Tlk {
    pub fn new(language_id: u32) -> Self {
        Self { language_id, entries: Vec::new() }
    }

    pub fn get(&self, string_ref: u32) -> Option<&TalkEntry> {
        self.entries.get(string_ref as usize)
    }

    pub fn push(&mut self, entry: TalkEntry) -> u32 {
        self.entries.push(entry);
        (self.entries.len() - 1) as u32
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

        let language_id = reader.u32()?;
        let string_count = reader.u32()? as usize;
        let string_entries_offset = reader.u32()?;

        let mut raw_entries = Vec::with_capacity(string_count);
        for _ in 0..string_count {
            let flags = reader.u32()?;
            let sound_resref = reader.string(16)?;
            let _volume_variance_unused = reader.u32()?;
            let _pitch_variance_unused = reader.u32()?;
            let text_offset = reader.u32()?;
            let text_length = reader.u32()?;
            let sound_length = reader.single()?;
            raw_entries.push((flags, sound_resref, _volume_variance_unused, _pitch_variance_unused, text_offset, text_length, sound_length));
        }

        let mut entries = Vec::with_capacity(string_count);
        for (flags, sound_resref, volume_variance, pitch_variance, text_offset, text_length, sound_length) in raw_entries {
            let text = if flags & FLAG_TEXT_PRESENT != 0 {
                let start = string_entries_offset as usize + text_offset as usize;
                let end = start + text_length as usize;
                let bytes = data
                    .get(start..end)
                    .ok_or_else(|| Error::StructuralError(String::from("TLK string entry out of range")))?;
                Some(bytes.iter().map(|&b| b as char).collect())
            } else {
                None
            };
            let sound_resref = if flags & FLAG_SND_PRESENT != 0 && !sound_resref.trim_end_matches('\0').is_empty() {
                Some(sound_resref.trim_end_matches('\0').to_string())
            } else {
                None
            };
            let sound_length = if flags & FLAG_SND_LENGTH_PRESENT != 0 { sound_length } else { 0.0 };
            entries.push(TalkEntry { text, sound_resref, volume_variance, pitch_variance, sound_length });
        }

        Ok(Self { language_id, entries })
    }

    pub fn write(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.bytes(MAGIC.as_bytes()).unwrap();
        writer.bytes(VERSION.as_bytes()).unwrap();
        writer.u32(self.language_id).unwrap();
        writer.u32(self.entries.len() as u32).unwrap();

        let string_entries_offset = 20 + ENTRY_SIZE * self.entries.len() as u32;
        writer.u32(string_entries_offset).unwrap();

        let mut text_pool = Vec::new();
        let mut text_offsets = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            text_offsets.push(text_pool.len() as u32);
            if let Some(text) = &entry.text {
                text_pool.extend(text.chars().map(|c| c as u8));
            }
        }

        for (entry, text_offset) in self.entries.iter().zip(&text_offsets) {
            let mut flags = 0u32;
            if entry.text.is_some() {
                flags |= FLAG_TEXT_PRESENT;
            }
            if entry.sound_resref.is_some() {
                flags |= FLAG_SND_PRESENT;
            }
            if entry.sound_length != 0.0 {
                flags |= FLAG_SND_LENGTH_PRESENT;
            }
            writer.u32(flags).unwrap();
            writer.string(entry.sound_resref.as_deref().unwrap_or(""), 16).unwrap();
            writer.u32(entry.volume_variance).unwrap();
            writer.u32(entry.pitch_variance).unwrap();
            writer.u32(*text_offset).unwrap();
            writer.u32(entry.text.as_ref().map_or(0, |t| t.len() as u32)).unwrap();
            writer.single(entry.sound_length).unwrap();
        }

        writer.bytes(&text_pool).unwrap();
        writer.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_text_and_sound() {
        let mut tlk = Tlk::new(0);
        tlk.push(TalkEntry {
            text: Some(String::from("Welcome to Taris.")),
            sound_resref: Some(String::from("n_intro")),
            volume_variance: 0,
            pitch_variance: 0,
            sound_length: 2.5,
        });
        tlk.push(TalkEntry::default());

        let bytes = tlk.write();
        let read_back = Tlk::read(&bytes).unwrap();
        assert_eq!(read_back, tlk);
    }

    #[test]
    fn test_string_ref_lookup() {
        let mut tlk = Tlk::new(0);
        let id = tlk.push(TalkEntry { text: Some(String::from("hello")), ..Default::default() });
        assert_eq!(tlk.get(id).unwrap().text.as_deref(), Some("hello"));
        assert!(tlk.get(999).is_none());
    }

    #[test]
    fn test_rejects_bad_version() {
        let mut bytes = Tlk::new(0).write();
        bytes[4..8].copy_from_slice(b"V4.0");
        let result = Tlk::read(&bytes);
        assert!(matches!(result, Err(Error::UnsupportedVersion(_))));
    }
}
