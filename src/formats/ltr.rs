//! `LTR`: letter-combination probability tables used to generate plausible
//! random names. Three independent tables (start/middle/end-of-word), each
//! built from singles, doubles and triples of the 28-letter alphabet
//! (`a`-`z`, `'`, `-`).

use kotor_common::error::Error;
use kotor_common::stream::{ByteReader, ByteWriter};

const MAGIC: &str = "LTR ";
const VERSION: &str = "V1.0";
pub const LETTER_COUNT: usize = 28;

const ALPHABET: [char; LETTER_COUNT] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w',
    'x', 'y', 'z', '\'', '-',
];

fn letter_index(c: char) -> Option<usize> {
    ALPHABET.iter().position(|&a| a == c.to_ascii_lowercase())
}

/// One positional table: cumulative-enough raw probabilities for picking the
/// next letter given zero, one or two letters of preceding context.
#[derive(Debug, Clone, PartialEq)]
pub struct LetterTable {
    pub singles: [f32; LETTER_COUNT],
    pub doubles: Vec<[f32; LETTER_COUNT]>,
    pub triples: Vec<[f32; LETTER_COUNT]>,
}

impl LetterTable {
    fn zeroed() -> Self {
        Self {
            singles: [0.0; LETTER_COUNT],
            doubles: vec![[0.0; LETTER_COUNT]; LETTER_COUNT],
            triples: vec![[0.0; LETTER_COUNT]; LETTER_COUNT * LETTER_COUNT],
        }
    }

    fn read(reader: &mut ByteReader) -> Result<Self, Error> {
        let mut table = Self::zeroed();
        for v in table.singles.iter_mut() {
            *v = reader.single()?;
        }
        for row in table.doubles.iter_mut() {
            for v in row.iter_mut() {
                *v = reader.single()?;
            }
        }
        for row in table.triples.iter_mut() {
            for v in row.iter_mut() {
                *v = reader.single()?;
            }
        }
        Ok(table)
    }

    fn write(&self, writer: &mut ByteWriter) {
        for v in &self.singles {
            writer.single(*v).unwrap();
        }
        for row in &self.doubles {
            for v in row {
                writer.single(*v).unwrap();
            }
        }
        for row in &self.triples {
            for v in row {
                writer.single(*v).unwrap();
            }
        }
    }

    /// Samples the next letter given `sample` in `[0, 1)` and zero, one or
    /// two preceding letters of context.
    fn pick(&self, context: &[char], sample: f32) -> char {
        let weights: &[f32; LETTER_COUNT] = match context.len() {
            0 => &self.singles,
            1 => {
                let Some(i) = letter_index(context[0]) else { return ALPHABET[0] };
                &self.doubles[i]
            }
            _ => {
                let (Some(i), Some(j)) = (letter_index(context[context.len() - 2]), letter_index(context[context.len() - 1])) else {
                    return ALPHABET[0];
                };
                &self.triples[i * LETTER_COUNT + j]
            }
        };
        let total: f32 = weights.iter().sum();
        if total <= 0.0 {
            return ALPHABET[0];
        }
        let target = sample.clamp(0.0, 1.0) * total;
        let mut accum = 0.0;
        for (i, w) in weights.iter().enumerate() {
            accum += w;
            if target <= accum {
                return ALPHABET[i];
            }
        }
        ALPHABET[LETTER_COUNT - 1]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ltr {
    pub start: LetterTable,
    pub middle: LetterTable,
    pub end: LetterTable,
}

impl Ltr {
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
        let letter_count = reader.u8()? as usize;
        if letter_count != LETTER_COUNT {
            return Err(Error::StructuralError(format!(
                "LTR letter count must be {LETTER_COUNT}, found {letter_count}"
            )));
        }

        let start = LetterTable::read(&mut reader)?;
        let middle = LetterTable::read(&mut reader)?;
        let end = LetterTable::read(&mut reader)?;
        Ok(Self { start, middle, end })
    }

    pub fn write(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.bytes(MAGIC.as_bytes()).unwrap();
        writer.bytes(VERSION.as_bytes()).unwrap();
        writer.u8(LETTER_COUNT as u8).unwrap();
        self.start.write(&mut writer);
        self.middle.write(&mut writer);
        self.end.write(&mut writer);
        writer.into_bytes()
    }

    /// Generates a name of `length` letters by repeatedly sampling
    /// start/middle/end tables, pulling one `[0,1)` value from `sampler` per
    /// letter. The caller supplies randomness so this stays deterministic
    /// under test.
    pub fn generate(&self, length: usize, sampler: &mut dyn FnMut() -> f32) -> String {
        if length == 0 {
            return String::new();
        }
        let mut letters = Vec::with_capacity(length);
        letters.push(self.start.pick(&[], sampler()));
        for i in 1..length {
            let table = if i + 1 == length { &self.end } else { &self.middle };
            let sample = sampler();
            letters.push(table.pick(&letters[..i], sample));
        }
        letters.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_table() -> LetterTable {
        let mut table = LetterTable::zeroed();
        table.singles = [1.0; LETTER_COUNT];
        for row in table.doubles.iter_mut() {
            *row = [1.0; LETTER_COUNT];
        }
        for row in table.triples.iter_mut() {
            *row = [1.0; LETTER_COUNT];
        }
        table
    }

    #[test]
    fn test_round_trip() {
        let ltr = Ltr { start: uniform_table(), middle: uniform_table(), end: uniform_table() };
        let bytes = ltr.write();
        let read_back = Ltr::read(&bytes).unwrap();
        assert_eq!(read_back, ltr);
    }

    #[test]
    fn test_pick_first_letter_for_zero_sample() {
        let table = uniform_table();
        assert_eq!(table.pick(&[], 0.0), 'a');
    }

    #[test]
    fn test_generate_produces_requested_length() {
        let ltr = Ltr { start: uniform_table(), middle: uniform_table(), end: uniform_table() };
        let mut calls = 0u32;
        let mut sampler = || {
            calls += 1;
            0.5
        };
        let name = ltr.generate(5, &mut sampler);
        assert_eq!(name.chars().count(), 5);
        assert_eq!(calls, 5);
    }

    #[test]
    fn test_rejects_wrong_letter_count() {
        let mut bytes = Ltr { start: uniform_table(), middle: uniform_table(), end: uniform_table() }.write();
        bytes[8] = 26;
        let result = Ltr::read(&bytes);
        assert!(matches!(result, Err(Error::StructuralError(_))));
    }
}
