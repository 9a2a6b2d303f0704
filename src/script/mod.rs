//! `NCS`: compiled NWScript bytecode for the Aurora VM.
//!
//! Covers the container (header + flat instruction stream) and a
//! validator that checks engine-compatibility invariants; it does not
//! execute the bytecode or compile `NSS` source into it.

pub mod instr;
pub mod validator;

use kotor_common::error::Error;
use kotor_common::stream::{ByteReader, ByteWriter};

pub use instr::{Instruction, Opcode, Operand, TypeCode};

const MAGIC: &str = "NCS ";
const VERSION: &str = "V1.0";
/// Program-size marker byte preceding the big-endian total-length field.
const SIZE_MARKER: u8 = 0x42;
/// Magic + version + marker byte + size field.
const HEADER_SIZE: u64 = 13;

#[derive(Debug, Clone, PartialEq)]
pub struct Ncs {
    pub instructions: Vec<Instruction>,
}

impl Ncs {
    pub fn new() -> Self {
        Self { instructions: Vec::new() }
    }

    /// Looks up the instruction whose `address` equals `address`, the
    /// shape every jump operand must resolve to.
    pub fn instruction_at(&self, address: u32) -> Option<&Instruction> {
        self.instructions.iter().find(|i| i.address == address)
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
        let marker = reader.u8()?;
        if marker != SIZE_MARKER {
            return Err(Error::StructuralError(format!("unexpected program-size marker byte {marker:#04x}")));
        }
        let total_size = u32::from_be_bytes(reader.bytes(4)?.try_into().unwrap());
        if total_size as u64 != reader.size() {
            return Err(Error::StructuralError(format!(
                "declared total size {total_size} does not match file size {}",
                reader.size()
            )));
        }

        let mut instructions = Vec::new();
        while reader.position() < reader.size() {
            let address = (reader.position() - HEADER_SIZE) as u32;
            instructions.push(instr::read_instruction(&mut reader, address)?);
        }

        Ok(Self { instructions })
    }

    pub fn validate(&self) -> Result<(), Error> {
        validator::validate(self)
    }

    pub fn write(&self) -> Result<Vec<u8>, Error> {
        let mut body = ByteWriter::new();
        for instruction in &self.instructions {
            instr::write_instruction(&mut body, instruction)?;
        }
        let body_bytes = body.into_bytes();

        let mut writer = ByteWriter::new();
        writer.bytes(MAGIC.as_bytes())?;
        writer.bytes(VERSION.as_bytes())?;
        writer.u8(SIZE_MARKER)?;
        writer.bytes(&(HEADER_SIZE as u32 + body_bytes.len() as u32).to_be_bytes())?;
        writer.bytes(&body_bytes)?;
        Ok(writer.into_bytes())
    }
}

impl Default for Ncs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use instr::{Opcode, TypeCode};

    fn sample() -> Ncs {
        Ncs {
            instructions: vec![
                Instruction { address: 0, opcode: Opcode::Const, type_code: TypeCode::Int, operand: Operand::Int(7) },
                Instruction { address: 6, opcode: Opcode::Retn, type_code: TypeCode::Void, operand: Operand::None },
            ],
        }
    }

    #[test]
    fn test_round_trip() {
        let ncs = sample();
        let bytes = ncs.write().unwrap();
        let read_back = Ncs::read(&bytes).unwrap();
        assert_eq!(read_back, ncs);
    }

    #[test]
    fn test_addresses_are_assigned_by_running_byte_count() {
        let ncs = sample();
        let bytes = ncs.write().unwrap();
        let read_back = Ncs::read(&bytes).unwrap();
        assert_eq!(read_back.instructions[1].address, 6);
        assert!(read_back.instruction_at(6).is_some());
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = sample().write().unwrap();
        bytes[0] = b'X';
        assert!(matches!(Ncs::read(&bytes), Err(Error::BadMagic { .. })));
    }

    #[test]
    fn test_rejects_size_mismatch() {
        let mut bytes = sample().write().unwrap();
        bytes.push(0);
        assert!(matches!(Ncs::read(&bytes), Err(Error::StructuralError(_))));
    }
}
