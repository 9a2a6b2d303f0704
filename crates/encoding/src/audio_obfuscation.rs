//! KotOR VO/SFX WAV obfuscation header detection, stripping and reinsertion.
//!
//! The engine prefixes ordinary RIFF/WAVE (and occasionally MP3-in-WAVE)
//! streams with a small header so that casual extraction tools see garbage
//! instead of a playable file. Two shapes exist in the wild for the voice
//! header: a 20-byte form (the common case) and a legacy 8-byte form later
//! titles still ship. Both strip down to a standard `"RIFF"` stream.

use kotor_common::error::Error;

const VO_MAGIC: u32 = 0x464f_566c;
const VO_HEADER_LEN: usize = 20;
const VO_LEGACY_HEADER_LEN: usize = 8;
const SFX_HEADER_LEN: usize = 470;
const SFX_MAGICS: [u32; 2] = [0xffff_ffff, 3294688255];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObfuscationKind {
    /// 20-byte voice-over header.
    Vo,
    /// Legacy 8-byte voice-over header (RIFF starts at offset 8).
    VoLegacy,
    /// 470-byte sound-effect header.
    Sfx,
}

impl ObfuscationKind {
    pub fn header_len(self) -> usize {
        match self {
            ObfuscationKind::Vo => VO_HEADER_LEN,
            ObfuscationKind::VoLegacy => VO_LEGACY_HEADER_LEN,
            ObfuscationKind::Sfx => SFX_HEADER_LEN,
        }
    }
}

fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset + 4)
        .map(|bytes| u32::from_le_bytes(bytes.try_into().unwrap()))
}

/// Detects which obfuscation header (if any) is present at the start of
/// `data`, without consuming it.
pub fn detect(data: &[u8]) -> Option<ObfuscationKind> {
    if data.len() >= 12 && &data[8..12] == b"RIFF" && read_u32_le(data, 0) == Some(VO_MAGIC) {
        return Some(ObfuscationKind::VoLegacy);
    }
    if data.len() >= VO_HEADER_LEN
        && read_u32_le(data, 0) == Some(VO_MAGIC)
        && read_u32_le(data, 4) == Some(50)
        && read_u32_le(data, 16) == Some(18)
    {
        return Some(ObfuscationKind::Vo);
    }
    if let Some(magic) = read_u32_le(data, 0) {
        if SFX_MAGICS.contains(&magic) && data.len() >= SFX_HEADER_LEN {
            return Some(ObfuscationKind::Sfx);
        }
    }
    None
}

/// Strips the detected obfuscation header, yielding a standard RIFF/WAVE
/// (or MP3-in-WAVE) stream. Returns the input unchanged if no header is
/// recognized.
pub fn deobfuscate(data: &[u8]) -> Result<Vec<u8>, Error> {
    match detect(data) {
        Some(kind) => {
            let len = kind.header_len();
            if data.len() < len {
                return Err(Error::StructuralError(format!(
                    "obfuscated audio header claims {len} bytes but input is only {} bytes",
                    data.len()
                )));
            }
            Ok(data[len..].to_vec())
        }
        None => Ok(data.to_vec()),
    }
}

/// Prefixes `data` (a standard RIFF/WAVE stream) with the given obfuscation
/// header, restoring the engine's expected on-disk shape.
pub fn obfuscate(data: &[u8], kind: ObfuscationKind) -> Vec<u8> {
    let mut out = Vec::with_capacity(kind.header_len() + data.len());
    match kind {
        ObfuscationKind::Vo => {
            out.extend_from_slice(&VO_MAGIC.to_le_bytes());
            out.extend_from_slice(&50u32.to_le_bytes());
            out.extend_from_slice(&[0u8; 8]);
            out.extend_from_slice(&18u32.to_le_bytes());
        }
        ObfuscationKind::VoLegacy => {
            out.extend_from_slice(&VO_MAGIC.to_le_bytes());
            out.extend_from_slice(&[0u8; 4]);
        }
        ObfuscationKind::Sfx => {
            out.extend_from_slice(&SFX_MAGICS[0].to_le_bytes());
            out.resize(SFX_HEADER_LEN, 0);
        }
    }
    out.extend_from_slice(data);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn riff_wave() -> Vec<u8> {
        let mut data = b"RIFF".to_vec();
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(b"WAVE");
        data
    }

    #[test]
    fn test_vo_header_round_trip() {
        let payload = riff_wave();
        let obfuscated = obfuscate(&payload, ObfuscationKind::Vo);
        assert_eq!(detect(&obfuscated), Some(ObfuscationKind::Vo));
        let stripped = deobfuscate(&obfuscated).unwrap();
        assert_eq!(stripped, payload);
    }

    #[test]
    fn test_legacy_vo_header_round_trip() {
        let payload = riff_wave();
        let obfuscated = obfuscate(&payload, ObfuscationKind::VoLegacy);
        assert_eq!(detect(&obfuscated), Some(ObfuscationKind::VoLegacy));
        let stripped = deobfuscate(&obfuscated).unwrap();
        assert_eq!(stripped, payload);
    }

    #[test]
    fn test_sfx_header_round_trip() {
        let payload = riff_wave();
        let obfuscated = obfuscate(&payload, ObfuscationKind::Sfx);
        assert_eq!(obfuscated.len(), SFX_HEADER_LEN + payload.len());
        assert_eq!(detect(&obfuscated), Some(ObfuscationKind::Sfx));
        let stripped = deobfuscate(&obfuscated).unwrap();
        assert_eq!(stripped, payload);
    }

    #[test]
    fn test_plain_riff_is_not_obfuscated() {
        let payload = riff_wave();
        assert_eq!(detect(&payload), None);
        assert_eq!(deobfuscate(&payload).unwrap(), payload);
    }
}
