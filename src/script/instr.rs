//! Instruction set for the Aurora script VM consumed by `NCS` files.
//!
//! Every multi-byte operand in a compiled script is big-endian, the one
//! format in this toolkit that isn't little-endian throughout; `ByteReader`/
//! `ByteWriter` assume little-endian, so operands are read and written by
//! hand here rather than through their numeric helpers.

use kotor_common::error::Error;
use kotor_common::stream::{ByteReader, ByteWriter};

/// Opcode byte. Matches the reverse-engineered `CVirtualMachine::ExecuteCode`
/// dispatch table; unrecognized bytes are preserved as [`Opcode::Unknown`]
/// rather than rejected, so a validator can still report on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    CpDownSp,
    Rsadd,
    CpTopSp,
    Const,
    Action,
    LogAnd,
    LogOr,
    IncOr,
    ExcOr,
    BoolAnd,
    Equal,
    NEqual,
    Geq,
    Gt,
    Lt,
    Leq,
    ShLeft,
    ShRight,
    Mod,
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    Comp,
    MovSp,
    StoreState,
    Jmp,
    Jsr,
    Jz,
    Retn,
    Destruct,
    Not,
    DecISp,
    IncISp,
    Jnz,
    CpDownBp,
    CpTopBp,
    DecIBp,
    IncIBp,
    SaveBp,
    RestoreBp,
    StoreStateAll,
    Nop,
    UShRight,
    Unknown(u8),
}

impl Opcode {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x01 => Opcode::CpDownSp,
            0x02 => Opcode::Rsadd,
            0x03 => Opcode::CpTopSp,
            0x04 => Opcode::Const,
            0x05 => Opcode::Action,
            0x06 => Opcode::LogAnd,
            0x07 => Opcode::LogOr,
            0x08 => Opcode::IncOr,
            0x09 => Opcode::ExcOr,
            0x0A => Opcode::BoolAnd,
            0x0B => Opcode::Equal,
            0x0C => Opcode::NEqual,
            0x0D => Opcode::Geq,
            0x0E => Opcode::Gt,
            0x0F => Opcode::Lt,
            0x10 => Opcode::Leq,
            0x11 => Opcode::ShLeft,
            0x12 => Opcode::ShRight,
            0x13 => Opcode::Mod,
            0x14 => Opcode::Add,
            0x15 => Opcode::Sub,
            0x16 => Opcode::Mul,
            0x17 => Opcode::Div,
            0x18 => Opcode::Neg,
            0x19 => Opcode::Comp,
            0x1B => Opcode::MovSp,
            0x1C => Opcode::StoreState,
            0x1D => Opcode::Jmp,
            0x1E => Opcode::Jsr,
            0x1F => Opcode::Jz,
            0x20 => Opcode::Retn,
            0x21 => Opcode::Destruct,
            0x22 => Opcode::Not,
            0x23 => Opcode::DecISp,
            0x24 => Opcode::IncISp,
            0x25 => Opcode::Jnz,
            0x26 => Opcode::CpDownBp,
            0x27 => Opcode::CpTopBp,
            0x28 => Opcode::DecIBp,
            0x29 => Opcode::IncIBp,
            0x2A => Opcode::SaveBp,
            0x2B => Opcode::RestoreBp,
            0x2C => Opcode::StoreStateAll,
            0x2D => Opcode::Nop,
            0x2E => Opcode::UShRight,
            other => Opcode::Unknown(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Opcode::CpDownSp => 0x01,
            Opcode::Rsadd => 0x02,
            Opcode::CpTopSp => 0x03,
            Opcode::Const => 0x04,
            Opcode::Action => 0x05,
            Opcode::LogAnd => 0x06,
            Opcode::LogOr => 0x07,
            Opcode::IncOr => 0x08,
            Opcode::ExcOr => 0x09,
            Opcode::BoolAnd => 0x0A,
            Opcode::Equal => 0x0B,
            Opcode::NEqual => 0x0C,
            Opcode::Geq => 0x0D,
            Opcode::Gt => 0x0E,
            Opcode::Lt => 0x0F,
            Opcode::Leq => 0x10,
            Opcode::ShLeft => 0x11,
            Opcode::ShRight => 0x12,
            Opcode::Mod => 0x13,
            Opcode::Add => 0x14,
            Opcode::Sub => 0x15,
            Opcode::Mul => 0x16,
            Opcode::Div => 0x17,
            Opcode::Neg => 0x18,
            Opcode::Comp => 0x19,
            Opcode::MovSp => 0x1B,
            Opcode::StoreState => 0x1C,
            Opcode::Jmp => 0x1D,
            Opcode::Jsr => 0x1E,
            Opcode::Jz => 0x1F,
            Opcode::Retn => 0x20,
            Opcode::Destruct => 0x21,
            Opcode::Not => 0x22,
            Opcode::DecISp => 0x23,
            Opcode::IncISp => 0x24,
            Opcode::Jnz => 0x25,
            Opcode::CpDownBp => 0x26,
            Opcode::CpTopBp => 0x27,
            Opcode::DecIBp => 0x28,
            Opcode::IncIBp => 0x29,
            Opcode::SaveBp => 0x2A,
            Opcode::RestoreBp => 0x2B,
            Opcode::StoreStateAll => 0x2C,
            Opcode::Nop => 0x2D,
            Opcode::UShRight => 0x2E,
            Opcode::Unknown(byte) => byte,
        }
    }

    /// True for the four control-transfer opcodes the validator walks
    /// separately from the stack/arithmetic ones.
    pub fn is_jump(self) -> bool {
        matches!(self, Opcode::Jmp | Opcode::Jsr | Opcode::Jz | Opcode::Jnz)
    }

    pub fn is_stack_frame_op(self) -> bool {
        matches!(
            self,
            Opcode::CpDownSp
                | Opcode::CpTopSp
                | Opcode::CpDownBp
                | Opcode::CpTopBp
                | Opcode::MovSp
                | Opcode::SaveBp
                | Opcode::RestoreBp
        )
    }
}

/// Type byte following the opcode; selects the operand layout and, for
/// the arithmetic/comparison family, which operand pairing applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCode {
    Void,
    Int,
    Float,
    String,
    Object,
    Effect,
    Event,
    Location,
    Talent,
    IntInt,
    FloatFloat,
    ObjectObject,
    StringString,
    StructStruct,
    IntFloat,
    FloatInt,
    VectorVector,
    VectorFloat,
    FloatVector,
    Unknown(u8),
}

impl TypeCode {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => TypeCode::Void,
            0x03 => TypeCode::Int,
            0x04 => TypeCode::Float,
            0x05 => TypeCode::String,
            0x06 => TypeCode::Object,
            0x10 => TypeCode::Effect,
            0x11 => TypeCode::Event,
            0x12 => TypeCode::Location,
            0x13 => TypeCode::Talent,
            0x20 => TypeCode::IntInt,
            0x21 => TypeCode::FloatFloat,
            0x22 => TypeCode::ObjectObject,
            0x23 => TypeCode::StringString,
            0x24 => TypeCode::StructStruct,
            0x25 => TypeCode::IntFloat,
            0x26 => TypeCode::FloatInt,
            0x3A => TypeCode::VectorVector,
            0x3B => TypeCode::VectorFloat,
            0x3C => TypeCode::FloatVector,
            other => TypeCode::Unknown(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            TypeCode::Void => 0x00,
            TypeCode::Int => 0x03,
            TypeCode::Float => 0x04,
            TypeCode::String => 0x05,
            TypeCode::Object => 0x06,
            TypeCode::Effect => 0x10,
            TypeCode::Event => 0x11,
            TypeCode::Location => 0x12,
            TypeCode::Talent => 0x13,
            TypeCode::IntInt => 0x20,
            TypeCode::FloatFloat => 0x21,
            TypeCode::ObjectObject => 0x22,
            TypeCode::StringString => 0x23,
            TypeCode::StructStruct => 0x24,
            TypeCode::IntFloat => 0x25,
            TypeCode::FloatInt => 0x26,
            TypeCode::VectorVector => 0x3A,
            TypeCode::VectorFloat => 0x3B,
            TypeCode::FloatVector => 0x3C,
            TypeCode::Unknown(byte) => byte,
        }
    }
}

/// Decoded operand payload; shape depends on `(opcode, type_code)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    Int(i32),
    Float(f32),
    Str(String),
    /// `RSADD`/object constants carry no literal, just the type byte.
    Object(i32),
    /// `CPDOWNSP`/`CPTOPSP`/`CPDOWNBP`/`CPTOPBP`: stack offset + element size.
    StackCopy { offset: i32, size: u16 },
    /// `MOVSP`/`DECISP`/`INCISP`/`DECIBP`/`INCIBP`: a bare stack offset.
    StackOffset(i32),
    /// `JMP`/`JSR`/`JZ`/`JNZ`: byte offset relative to the instruction's
    /// own address.
    Jump(i32),
    Action { routine: u16, arg_count: u8 },
    Destruct { size_to_destroy: u16, offset_to_preserve: i16, size_of_preserved: u16 },
    /// `EQUAL`/`NEQUAL` on `STRUCTSTRUCT`: size in bytes of the struct being compared.
    EqualStruct { size: u16 },
    StoreState { bp_size: u32, sp_size: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Byte offset of this instruction's opcode byte from the start of
    /// the instruction stream (not including the 13-byte file header).
    /// Jump operands are relative to this address.
    pub address: u32,
    pub opcode: Opcode,
    pub type_code: TypeCode,
    pub operand: Operand,
}

impl Instruction {
    /// Total size in bytes of this instruction (opcode + type + operand),
    /// used to locate the next instruction's address.
    pub fn encoded_len(&self) -> u32 {
        2 + operand_len(&self.operand)
    }
}

fn operand_len(operand: &Operand) -> u32 {
    match operand {
        Operand::None => 0,
        Operand::Int(_) => 4,
        Operand::Float(_) => 4,
        Operand::Str(s) => 2 + s.len() as u32,
        Operand::Object(_) => 4,
        Operand::StackCopy { .. } => 6,
        Operand::StackOffset(_) => 4,
        Operand::Jump(_) => 4,
        Operand::Action { .. } => 3,
        Operand::Destruct { .. } => 6,
        Operand::EqualStruct { .. } => 2,
        Operand::StoreState { .. } => 8,
    }
}

fn read_u16_be(reader: &mut ByteReader) -> Result<u16, Error> {
    let bytes = reader.bytes(2)?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn read_i16_be(reader: &mut ByteReader) -> Result<i16, Error> {
    Ok(read_u16_be(reader)? as i16)
}

fn read_u32_be(reader: &mut ByteReader) -> Result<u32, Error> {
    let bytes = reader.bytes(4)?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_i32_be(reader: &mut ByteReader) -> Result<i32, Error> {
    Ok(read_u32_be(reader)? as i32)
}

fn read_f32_be(reader: &mut ByteReader) -> Result<f32, Error> {
    Ok(f32::from_bits(read_u32_be(reader)?))
}

fn write_u16_be(writer: &mut ByteWriter, value: u16) -> Result<(), Error> {
    writer.bytes(&value.to_be_bytes())
}

fn write_i16_be(writer: &mut ByteWriter, value: i16) -> Result<(), Error> {
    write_u16_be(writer, value as u16)
}

fn write_u32_be(writer: &mut ByteWriter, value: u32) -> Result<(), Error> {
    writer.bytes(&value.to_be_bytes())
}

fn write_i32_be(writer: &mut ByteWriter, value: i32) -> Result<(), Error> {
    write_u32_be(writer, value as u32)
}

fn write_f32_be(writer: &mut ByteWriter, value: f32) -> Result<(), Error> {
    write_u32_be(writer, value.to_bits())
}

/// Reads a single instruction at the reader's current position. `address`
/// is the instruction's own offset (supplied by the caller, which already
/// knows the running byte count) rather than derived from `reader`, since
/// the reader's position also spans the 13-byte file header.
pub fn read_instruction(reader: &mut ByteReader, address: u32) -> Result<Instruction, Error> {
    let opcode = Opcode::from_byte(reader.u8()?);
    let type_code = TypeCode::from_byte(reader.u8()?);

    let operand = match opcode {
        Opcode::Const => match type_code {
            TypeCode::Int => Operand::Int(read_i32_be(reader)?),
            TypeCode::Float => Operand::Float(read_f32_be(reader)?),
            TypeCode::String => {
                let len = read_u16_be(reader)?;
                Operand::Str(reader.string(len as usize)?)
            }
            TypeCode::Object => Operand::Object(read_i32_be(reader)?),
            _ => return Err(Error::StructuralError(format!("CONST with unexpected type byte {:?}", type_code))),
        },
        Opcode::Action => {
            let routine = read_u16_be(reader)?;
            let arg_count = reader.u8()?;
            Operand::Action { routine, arg_count }
        }
        Opcode::CpDownSp | Opcode::CpTopSp | Opcode::CpDownBp | Opcode::CpTopBp => {
            let offset = read_i32_be(reader)?;
            let size = read_u16_be(reader)?;
            Operand::StackCopy { offset, size }
        }
        Opcode::MovSp | Opcode::DecISp | Opcode::IncISp | Opcode::DecIBp | Opcode::IncIBp => {
            Operand::StackOffset(read_i32_be(reader)?)
        }
        Opcode::Jmp | Opcode::Jsr | Opcode::Jz | Opcode::Jnz => Operand::Jump(read_i32_be(reader)?),
        Opcode::Destruct => {
            let size_to_destroy = read_u16_be(reader)?;
            let offset_to_preserve = read_i16_be(reader)?;
            let size_of_preserved = read_u16_be(reader)?;
            Operand::Destruct { size_to_destroy, offset_to_preserve, size_of_preserved }
        }
        Opcode::Equal | Opcode::NEqual if type_code == TypeCode::StructStruct => {
            Operand::EqualStruct { size: read_u16_be(reader)? }
        }
        Opcode::StoreState | Opcode::StoreStateAll => {
            let bp_size = read_u32_be(reader)?;
            let sp_size = read_u32_be(reader)?;
            Operand::StoreState { bp_size, sp_size }
        }
        _ => Operand::None,
    };

    Ok(Instruction { address, opcode, type_code, operand })
}

pub fn write_instruction(writer: &mut ByteWriter, instr: &Instruction) -> Result<(), Error> {
    writer.u8(instr.opcode.to_byte())?;
    writer.u8(instr.type_code.to_byte())?;
    match &instr.operand {
        Operand::None => {}
        Operand::Int(value) => write_i32_be(writer, *value)?,
        Operand::Float(value) => write_f32_be(writer, *value)?,
        Operand::Str(s) => {
            write_u16_be(writer, s.len() as u16)?;
            writer.bytes(s.as_bytes())?;
        }
        Operand::Object(value) => write_i32_be(writer, *value)?,
        Operand::StackCopy { offset, size } => {
            write_i32_be(writer, *offset)?;
            write_u16_be(writer, *size)?;
        }
        Operand::StackOffset(offset) => write_i32_be(writer, *offset)?,
        Operand::Jump(offset) => write_i32_be(writer, *offset)?,
        Operand::Action { routine, arg_count } => {
            write_u16_be(writer, *routine)?;
            writer.u8(*arg_count)?;
        }
        Operand::Destruct { size_to_destroy, offset_to_preserve, size_of_preserved } => {
            write_u16_be(writer, *size_to_destroy)?;
            write_i16_be(writer, *offset_to_preserve)?;
            write_u16_be(writer, *size_of_preserved)?;
        }
        Operand::EqualStruct { size } => write_u16_be(writer, *size)?,
        Operand::StoreState { bp_size, sp_size } => {
            write_u32_be(writer, *bp_size)?;
            write_u32_be(writer, *sp_size)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_const_int_round_trips() {
        let instr = Instruction { address: 0, opcode: Opcode::Const, type_code: TypeCode::Int, operand: Operand::Int(-42) };
        let mut writer = ByteWriter::new();
        write_instruction(&mut writer, &instr).unwrap();
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), instr.encoded_len() as usize);

        let mut reader = ByteReader::new(&bytes);
        let read_back = read_instruction(&mut reader, 0).unwrap();
        assert_eq!(read_back, instr);
    }

    #[test]
    fn test_jump_operand_round_trips() {
        let instr = Instruction { address: 16, opcode: Opcode::Jz, type_code: TypeCode::Void, operand: Operand::Jump(-16) };
        let mut writer = ByteWriter::new();
        write_instruction(&mut writer, &instr).unwrap();
        let bytes = writer.into_bytes();

        let mut reader = ByteReader::new(&bytes);
        let read_back = read_instruction(&mut reader, 16).unwrap();
        assert_eq!(read_back.operand, Operand::Jump(-16));
    }

    #[test]
    fn test_action_operand_round_trips() {
        let instr = Instruction {
            address: 0,
            opcode: Opcode::Action,
            type_code: TypeCode::Void,
            operand: Operand::Action { routine: 217, arg_count: 2 },
        };
        let mut writer = ByteWriter::new();
        write_instruction(&mut writer, &instr).unwrap();
        let mut reader = ByteReader::new(&writer.into_bytes());
        let read_back = read_instruction(&mut reader, 0).unwrap();
        assert_eq!(read_back.operand, Operand::Action { routine: 217, arg_count: 2 });
    }

    #[test]
    fn test_unknown_opcode_round_trips_as_bare_byte() {
        assert_eq!(Opcode::from_byte(0xFE).to_byte(), 0xFE);
    }
}
