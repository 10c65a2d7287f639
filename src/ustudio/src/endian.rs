//! Byte-order aware primitive reading and writing
//!
//! Multi-byte values are read in host order and swapped when the stream's
//! declared order differs from [`Endian::HOST`].

use std::io::SeekFrom;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use memchr::memchr;

use crate::{Error, Result};

/// Byte order of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

impl Endian {
    /// Byte order of the running process
    pub const HOST: Endian = if cfg!(target_endian = "big") {
        Endian::Big
    } else {
        Endian::Little
    };

    pub fn opposite(self) -> Self {
        match self {
            Endian::Big => Endian::Little,
            Endian::Little => Endian::Big,
        }
    }
}

macro_rules! read_swapped {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&mut self) -> Result<$ty> {
                let bytes = self.read_array::<{ std::mem::size_of::<$ty>() }>()?;
                let value = <$ty>::from_ne_bytes(bytes);
                Ok(if self.endian == Endian::HOST { value } else { value.swap_bytes() })
            }
        )*
    };
}

/// Positioned reader over a byte slice
///
/// Cheap to copy: every copy is an independent cursor over the same bytes.
#[derive(Debug, Clone, Copy)]
pub struct EndianReader<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> EndianReader<'a> {
    pub fn new(data: &'a [u8], endian: Endian) -> Self {
        Self {
            data,
            pos: 0,
            endian,
        }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    pub fn position(&self) -> u64 {
        self.pos as u64
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Move the cursor; `End` offsets are added to the total length
    pub fn seek(&mut self, target: SeekFrom) -> Result<u64> {
        let (base, delta) = match target {
            SeekFrom::Start(offset) => (0i128, offset as i128),
            SeekFrom::Current(delta) => (self.pos as i128, delta as i128),
            SeekFrom::End(delta) => (self.data.len() as i128, delta as i128),
        };
        let target = base + delta;
        if target < 0 || target > self.data.len() as i128 {
            return Err(Error::OutOfBounds {
                offset: target.max(0) as u64,
                needed: 0,
                len: self.data.len(),
            });
        }
        self.pos = target as usize;
        Ok(self.pos as u64)
    }

    pub fn set_position(&mut self, pos: u64) -> Result<()> {
        self.seek(SeekFrom::Start(pos)).map(|_| ())
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.seek(SeekFrom::Current(count as i64)).map(|_| ())
    }

    /// Advance to the next multiple of `n`
    pub fn align(&mut self, n: usize) -> Result<()> {
        let rem = self.pos % n;
        if rem != 0 {
            self.skip(n - rem)?;
        }
        Ok(())
    }

    /// Align like [`align`](Self::align), stopping at the end of the data
    pub fn align_clamped(&mut self, n: usize) {
        let rem = self.pos % n;
        if rem != 0 {
            self.pos = (self.pos + n - rem).min(self.data.len());
        }
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(count)
            .filter(|&end| end <= self.data.len())
            .ok_or(Error::OutOfBounds {
                offset: self.pos as u64,
                needed: count,
                len: self.data.len(),
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    read_swapped! {
        read_i16 => i16,
        read_u16 => u16,
        read_i32 => i32,
        read_u32 => u32,
        read_i64 => i64,
        read_u64 => u64,
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Read raw bytes up to (not including) the next NUL, consuming the NUL
    pub fn read_cstring_bytes(&mut self) -> Result<&'a [u8]> {
        let rest = &self.data[self.pos.min(self.data.len())..];
        let len = memchr(0, rest).ok_or(Error::OutOfBounds {
            offset: self.pos as u64,
            needed: rest.len() + 1,
            len: self.data.len(),
        })?;
        let bytes = self.read_bytes(len)?;
        self.pos += 1;
        Ok(bytes)
    }

    pub fn read_cstring(&mut self) -> Result<String> {
        Ok(String::from_utf8_lossy(self.read_cstring_bytes()?).into_owned())
    }

    /// Read `length` UTF-8 bytes and align to 4
    ///
    /// Lengths that are not positive or run past the end yield an empty
    /// string without consuming anything.
    pub fn read_aligned_string(&mut self, length: i32) -> Result<String> {
        if length <= 0 || length as usize > self.remaining() {
            return Ok(String::new());
        }
        let bytes = self.read_bytes(length as usize)?;
        let s = String::from_utf8_lossy(bytes).into_owned();
        // A trailing string may end the data short of the boundary
        self.align_clamped(4);
        Ok(s)
    }

    /// Read a 4-byte length followed by an aligned string
    pub fn read_length_prefixed_string(&mut self) -> Result<String> {
        let length = self.read_i32()?;
        self.read_aligned_string(length)
    }
}

macro_rules! write_ordered {
    ($($name:ident => $ty:ty, $write:ident, $size:expr);* $(;)?) => {
        $(
            pub fn $name(&mut self, value: $ty) -> &mut Self {
                let mut buf = [0u8; $size];
                match self.endian {
                    Endian::Big => BigEndian::$write(&mut buf, value),
                    Endian::Little => LittleEndian::$write(&mut buf, value),
                }
                self.buf.extend_from_slice(&buf);
                self
            }
        )*
    };
}

/// Byte-order aware writer into a growable buffer
#[derive(Debug, Clone)]
pub struct EndianWriter {
    buf: Vec<u8>,
    endian: Endian,
}

impl EndianWriter {
    pub fn new(endian: Endian) -> Self {
        Self {
            buf: Vec::new(),
            endian,
        }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn write_i8(&mut self, value: i8) -> &mut Self {
        self.write_u8(value as u8)
    }

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.write_u8(value as u8)
    }

    write_ordered! {
        write_i16 => i16, write_i16, 2;
        write_u16 => u16, write_u16, 2;
        write_i32 => i32, write_i32, 4;
        write_u32 => u32, write_u32, 4;
        write_i64 => i64, write_i64, 8;
        write_u64 => u64, write_u64, 8;
        write_f32 => f32, write_f32, 4;
        write_f64 => f64, write_f64, 8;
    }

    pub fn write_cstring(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
        self
    }

    /// Write an i32 length, the bytes, then pad to 4
    pub fn write_aligned_string(&mut self, s: &str) -> &mut Self {
        self.write_i32(s.len() as i32);
        self.buf.extend_from_slice(s.as_bytes());
        self.align(4)
    }

    /// Zero-pad to the next multiple of `n`
    pub fn align(&mut self, n: usize) -> &mut Self {
        let rem = self.buf.len() % n;
        if rem != 0 {
            self.buf.resize(self.buf.len() + n - rem, 0);
        }
        self
    }
}
