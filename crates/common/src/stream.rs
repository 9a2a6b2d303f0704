//! Byte stream primitives shared by every format reader/writer.
//!
//! [`ByteReader`] and [`ByteWriter`] wrap an in-memory cursor; [`FileByteReader`]
//! wraps a buffered file handle so the same reading API works whether the
//! caller handed us a path, an open file, or an already-loaded buffer (see
//! the reader construction shapes named in the top level design notes).
//! All multi-byte values are little-endian, matching the Aurora engine's
//! on-disk layout.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::Error;

/// A cursor-backed reader over an in-memory byte buffer.
///
/// Never mutates the buffer it was constructed from; every read advances an
/// internal position that can be inspected and rewound freely.
pub struct ByteReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    pub fn set_position(&mut self, position: u64) {
        self.cursor.set_position(position);
    }

    pub fn skip(&mut self, count: u64) {
        self.cursor.set_position(self.cursor.position() + count);
    }

    pub fn size(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }

    pub fn remaining(&self) -> u64 {
        self.size().saturating_sub(self.position())
    }

    fn read_exact(&mut self, buffer: &mut [u8]) -> Result<(), Error> {
        self.cursor
            .read_exact(buffer)
            .map_err(|_| Error::EndOfStream)
    }

    pub fn bytes(&mut self, count: usize) -> Result<Vec<u8>, Error> {
        let mut buffer = vec![0u8; count];
        self.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    pub fn u8(&mut self) -> Result<u8, Error> {
        let mut buffer = [0u8; 1];
        self.read_exact(&mut buffer)?;
        Ok(buffer[0])
    }

    pub fn i8(&mut self) -> Result<i8, Error> {
        Ok(self.u8()? as i8)
    }

    pub fn u16(&mut self) -> Result<u16, Error> {
        let mut buffer = [0u8; 2];
        self.read_exact(&mut buffer)?;
        Ok(u16::from_le_bytes(buffer))
    }

    pub fn i16(&mut self) -> Result<i16, Error> {
        let mut buffer = [0u8; 2];
        self.read_exact(&mut buffer)?;
        Ok(i16::from_le_bytes(buffer))
    }

    pub fn u32(&mut self) -> Result<u32, Error> {
        let mut buffer = [0u8; 4];
        self.read_exact(&mut buffer)?;
        Ok(u32::from_le_bytes(buffer))
    }

    pub fn i32(&mut self) -> Result<i32, Error> {
        let mut buffer = [0u8; 4];
        self.read_exact(&mut buffer)?;
        Ok(i32::from_le_bytes(buffer))
    }

    pub fn u64(&mut self) -> Result<u64, Error> {
        let mut buffer = [0u8; 8];
        self.read_exact(&mut buffer)?;
        Ok(u64::from_le_bytes(buffer))
    }

    pub fn i64(&mut self) -> Result<i64, Error> {
        let mut buffer = [0u8; 8];
        self.read_exact(&mut buffer)?;
        Ok(i64::from_le_bytes(buffer))
    }

    pub fn single(&mut self) -> Result<f32, Error> {
        let mut buffer = [0u8; 4];
        self.read_exact(&mut buffer)?;
        Ok(f32::from_le_bytes(buffer))
    }

    pub fn double(&mut self) -> Result<f64, Error> {
        let mut buffer = [0u8; 8];
        self.read_exact(&mut buffer)?;
        Ok(f64::from_le_bytes(buffer))
    }

    pub fn vector2(&mut self) -> Result<[f32; 2], Error> {
        Ok([self.single()?, self.single()?])
    }

    pub fn vector3(&mut self) -> Result<[f32; 3], Error> {
        Ok([self.single()?, self.single()?, self.single()?])
    }

    pub fn vector4(&mut self) -> Result<[f32; 4], Error> {
        Ok([
            self.single()?,
            self.single()?,
            self.single()?,
            self.single()?,
        ])
    }

    /// RGBA as four unsigned bytes, matching GFF's packed `Color` field.
    pub fn color(&mut self) -> Result<[u8; 4], Error> {
        let mut buffer = [0u8; 4];
        self.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Reads `n` bytes and interprets them as Windows-1252 text, trimming
    /// trailing NUL padding (fixed-width fields such as ResRef/model names).
    pub fn string(&mut self, n: usize) -> Result<String, Error> {
        let buffer = self.bytes(n)?;
        let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
        Ok(buffer[..end].iter().map(|&b| b as char).collect())
    }

    /// Reads bytes one at a time until `sentinel` is hit or `max` bytes have
    /// been consumed, whichever comes first.
    pub fn terminated_string(&mut self, sentinel: u8, max: usize) -> Result<String, Error> {
        let mut buffer = Vec::new();
        for _ in 0..max {
            let byte = self.u8()?;
            if byte == sentinel {
                return Ok(buffer.iter().map(|&b| b as char).collect());
            }
            buffer.push(byte);
        }
        Ok(buffer.iter().map(|&b| b as char).collect())
    }
}

/// A cursor-backed writer accumulating into an owned byte buffer.
pub struct ByteWriter {
    cursor: Cursor<Vec<u8>>,
}

impl Default for ByteWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteWriter {
    pub fn new() -> Self {
        Self {
            cursor: Cursor::new(Vec::new()),
        }
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    pub fn set_position(&mut self, position: u64) {
        self.cursor.set_position(position);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.cursor.into_inner()
    }

    pub fn bytes(&mut self, b: &[u8]) -> Result<(), Error> {
        self.cursor
            .write_all(b)
            .map_err(|_| Error::CustomError(String::from("write failed")))
    }

    pub fn u8(&mut self, value: u8) -> Result<(), Error> {
        self.bytes(&[value])
    }

    pub fn i8(&mut self, value: i8) -> Result<(), Error> {
        self.u8(value as u8)
    }

    pub fn u16(&mut self, value: u16) -> Result<(), Error> {
        self.bytes(&value.to_le_bytes())
    }

    pub fn i16(&mut self, value: i16) -> Result<(), Error> {
        self.bytes(&value.to_le_bytes())
    }

    pub fn u32(&mut self, value: u32) -> Result<(), Error> {
        self.bytes(&value.to_le_bytes())
    }

    pub fn i32(&mut self, value: i32) -> Result<(), Error> {
        self.bytes(&value.to_le_bytes())
    }

    pub fn u64(&mut self, value: u64) -> Result<(), Error> {
        self.bytes(&value.to_le_bytes())
    }

    pub fn i64(&mut self, value: i64) -> Result<(), Error> {
        self.bytes(&value.to_le_bytes())
    }

    pub fn single(&mut self, value: f32) -> Result<(), Error> {
        self.bytes(&value.to_le_bytes())
    }

    pub fn double(&mut self, value: f64) -> Result<(), Error> {
        self.bytes(&value.to_le_bytes())
    }

    pub fn vector3(&mut self, value: [f32; 3]) -> Result<(), Error> {
        for component in value {
            self.single(component)?;
        }
        Ok(())
    }

    pub fn color(&mut self, value: [u8; 4]) -> Result<(), Error> {
        self.bytes(&value)
    }

    /// Writes `s` encoded as Windows-1252 bytes, padded or truncated to
    /// exactly `length` bytes with NUL, matching fixed-width field writers.
    pub fn string(&mut self, s: &str, length: usize) -> Result<(), Error> {
        if s.len() > length {
            return Err(Error::EncodingError(format!(
                "string {s:?} exceeds field width {length}"
            )));
        }
        let mut buffer = vec![0u8; length];
        buffer[..s.len()].copy_from_slice(s.as_bytes());
        self.bytes(&buffer)
    }
}

/// A buffered reader over a file on disk, exposing the same reading API as
/// [`ByteReader`] without loading the whole file up front.
pub struct FileByteReader {
    reader: BufReader<File>,
    size: u64,
}

impl FileByteReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            reader: BufReader::new(file),
            size,
        })
    }

    pub fn position(&mut self) -> Result<u64, Error> {
        Ok(self.reader.stream_position()?)
    }

    pub fn set_position(&mut self, position: u64) -> Result<(), Error> {
        self.reader.seek(SeekFrom::Start(position))?;
        Ok(())
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn remaining(&mut self) -> Result<u64, Error> {
        Ok(self.size.saturating_sub(self.position()?))
    }

    pub fn bytes(&mut self, count: usize) -> Result<Vec<u8>, Error> {
        let mut buffer = vec![0u8; count];
        self.reader
            .read_exact(&mut buffer)
            .map_err(|_| Error::EndOfStream)?;
        Ok(buffer)
    }

    /// Reads the whole remaining file into memory, handing off to
    /// [`ByteReader`]-style cursor reads for the bulk of a format's body.
    pub fn read_to_end(mut self) -> Result<Vec<u8>, Error> {
        let mut buffer = Vec::new();
        self.reader.read_to_end(&mut buffer)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_integers() {
        let mut writer = ByteWriter::new();
        writer.u8(0xab).unwrap();
        writer.u16(0x1234).unwrap();
        writer.u32(0xdead_beef).unwrap();
        writer.i32(-1).unwrap();
        let data = writer.into_bytes();

        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.u8().unwrap(), 0xab);
        assert_eq!(reader.u16().unwrap(), 0x1234);
        assert_eq!(reader.u32().unwrap(), 0xdead_beef);
        assert_eq!(reader.i32().unwrap(), -1);
    }

    #[test]
    fn test_read_past_end_is_end_of_stream() {
        let data = [0u8; 2];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.u32().unwrap_err(), Error::EndOfStream);
    }

    #[test]
    fn test_fixed_width_string_trims_padding() {
        let mut writer = ByteWriter::new();
        writer.string("abc", 8).unwrap();
        let data = writer.into_bytes();
        assert_eq!(data.len(), 8);

        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.string(8).unwrap(), "abc");
    }

    #[test]
    fn test_string_too_long_is_encoding_error() {
        let mut writer = ByteWriter::new();
        assert_eq!(
            writer.string("toolong", 4).unwrap_err(),
            Error::EncodingError(String::from("string \"toolong\" exceeds field width 4"))
        );
    }

    #[test]
    fn test_terminated_string_stops_at_sentinel() {
        let data = [b'h', b'i', 0, b'?'];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.terminated_string(0, 16).unwrap(), "hi");
        assert_eq!(reader.position(), 3);
    }

    #[test]
    fn test_remaining_and_skip() {
        let data = [0u8; 10];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.remaining(), 10);
        reader.skip(4);
        assert_eq!(reader.remaining(), 6);
        assert_eq!(reader.position(), 4);
    }
}
