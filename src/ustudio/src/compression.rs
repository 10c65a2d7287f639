//! Block codecs used by containers
//!
//! - Store: raw bytes
//! - LZMA: 5 property bytes followed by the raw stream (no size field)
//! - LZ4 / LZ4HC: raw LZ4 block
//!
//! Legacy whole-body LZMA uses the 13-byte "alone" header instead, and some
//! distributions wrap an entire container in a chunked LZ4 stream.

use std::fmt;

use xz2::stream::{Action, LzmaOptions, Status, Stream};

use crate::endian::{Endian, EndianReader};
use crate::{Error, Result};

/// Size of the LZMA property header
const LZMA_PROPS_SIZE: usize = 5;

/// Size of the "alone" header: properties plus a u64 uncompressed size
const LZMA_ALONE_HEADER_SIZE: usize = LZMA_PROPS_SIZE + 8;

/// Chunk flag marking a compressed LZ4 stream chunk
const LZ4_CHUNK_COMPRESSED: u64 = 0x01;

/// Largest output an LZ4 block can produce per input byte
const LZ4_MAX_RATIO: usize = 255;

/// Cap on buffers reserved up front from a declared size
const MAX_PREALLOCATION: usize = 64 << 20;

/// Step by which the LZMA output buffer grows
const LZMA_OUTPUT_STEP: usize = 1 << 20;

/// Capacity to reserve for a declared output size
///
/// Declared sizes come straight from container headers, so buffers grow
/// past this only as real output arrives.
pub(crate) fn capacity_hint(declared: usize) -> usize {
    declared.min(MAX_PREALLOCATION)
}

/// Compression codec selected by the low bits of a flag word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    None,
    Lzma,
    Lz4,
    Lz4Hc,
}

impl Codec {
    /// Mask of the codec selector within block and header flags
    pub const MASK: u32 = 0x3f;

    /// Select a codec from a container flag word
    pub fn from_flags(flags: u32) -> Result<Self> {
        match flags & Self::MASK {
            0 => Ok(Codec::None),
            1 => Ok(Codec::Lzma),
            2 => Ok(Codec::Lz4),
            3 => Ok(Codec::Lz4Hc),
            other => Err(Error::UnknownCodec(other)),
        }
    }

    pub fn selector(self) -> u32 {
        match self {
            Codec::None => 0,
            Codec::Lzma => 1,
            Codec::Lz4 => 2,
            Codec::Lz4Hc => 3,
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Codec::None => "store",
            Codec::Lzma => "LZMA",
            Codec::Lz4 => "LZ4",
            Codec::Lz4Hc => "LZ4HC",
        })
    }
}

/// Decompress one block to exactly `expected_size` bytes
pub fn decompress(data: &[u8], codec: Codec, expected_size: usize) -> Result<Vec<u8>> {
    let output = match codec {
        Codec::None => data.to_vec(),
        Codec::Lzma => decompress_lzma(data, expected_size)?,
        Codec::Lz4 | Codec::Lz4Hc => {
            if expected_size > data.len().saturating_mul(LZ4_MAX_RATIO) {
                return Err(Error::Decompression {
                    codec,
                    message: format!("{} bytes cannot expand to {expected_size}", data.len()),
                });
            }
            lz4_flex::block::decompress(data, expected_size).map_err(|e| Error::Decompression {
                codec,
                message: e.to_string(),
            })?
        }
    };

    if output.len() != expected_size {
        return Err(Error::DecompressionSize {
            expected: expected_size,
            actual: output.len(),
        });
    }

    Ok(output)
}

/// Compress one block in the layout [`decompress`] expects
pub fn compress(data: &[u8], codec: Codec) -> Result<Vec<u8>> {
    match codec {
        Codec::None => Ok(data.to_vec()),
        Codec::Lz4 | Codec::Lz4Hc => Ok(lz4_flex::block::compress(data)),
        Codec::Lzma => {
            let mut alone = compress_lzma_alone(data)?;
            // Drop the size field: block LZMA carries properties only
            alone.drain(LZMA_PROPS_SIZE..LZMA_ALONE_HEADER_SIZE);
            Ok(alone)
        }
    }
}

fn lzma_error(e: impl fmt::Display) -> Error {
    Error::Decompression {
        codec: Codec::Lzma,
        message: e.to_string(),
    }
}

/// Decompress block LZMA (properties, no size) with a known output size
fn decompress_lzma(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    if data.len() < LZMA_PROPS_SIZE {
        return Err(Error::DataTooShort {
            needed: LZMA_PROPS_SIZE,
            actual: data.len(),
        });
    }

    let mut alone = Vec::with_capacity(data.len() + 8);
    alone.extend_from_slice(&data[..LZMA_PROPS_SIZE]);
    alone.extend_from_slice(&(expected_size as u64).to_le_bytes());
    alone.extend_from_slice(&data[LZMA_PROPS_SIZE..]);

    run_lzma_decoder(&alone, expected_size)
}

/// Decompress an LZMA "alone" stream whose header carries the output size
pub fn decompress_lzma_alone(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < LZMA_ALONE_HEADER_SIZE {
        return Err(Error::DataTooShort {
            needed: LZMA_ALONE_HEADER_SIZE,
            actual: data.len(),
        });
    }

    let mut size = [0u8; 8];
    size.copy_from_slice(&data[LZMA_PROPS_SIZE..LZMA_ALONE_HEADER_SIZE]);
    let declared = u64::from_le_bytes(size);
    if declared == u64::MAX {
        return Err(Error::InvalidData(
            "LZMA stream without a declared size".into(),
        ));
    }

    let expected = usize::try_from(declared)
        .map_err(|_| Error::InvalidData(format!("LZMA stream declares {declared} bytes")))?;
    let output = run_lzma_decoder(data, expected)?;
    if output.len() != expected {
        return Err(Error::DecompressionSize {
            expected,
            actual: output.len(),
        });
    }
    Ok(output)
}

fn run_lzma_decoder(alone: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut stream = Stream::new_lzma_decoder(u64::MAX).map_err(lzma_error)?;
    let mut output = Vec::with_capacity(capacity_hint(expected_size));

    while output.len() < expected_size {
        if output.len() == output.capacity() {
            output.reserve((expected_size - output.len()).min(LZMA_OUTPUT_STEP));
        }
        let consumed = stream.total_in() as usize;
        let produced = output.len();
        let status = stream
            .process_vec(&alone[consumed..], &mut output, Action::Run)
            .map_err(lzma_error)?;

        if matches!(status, Status::StreamEnd) {
            break;
        }
        if stream.total_in() as usize == consumed && output.len() == produced {
            return Err(lzma_error("truncated stream"));
        }
    }

    Ok(output)
}

/// Compress into an LZMA "alone" stream with the size in its header
pub(crate) fn compress_lzma_alone(data: &[u8]) -> Result<Vec<u8>> {
    let options = LzmaOptions::new_preset(6).map_err(lzma_error)?;
    let mut stream = Stream::new_lzma_encoder(&options).map_err(lzma_error)?;
    let mut output = Vec::with_capacity(data.len() / 2 + 64);

    loop {
        if output.len() == output.capacity() {
            output.reserve(4096);
        }
        let consumed = stream.total_in() as usize;
        let status = stream
            .process_vec(&data[consumed..], &mut output, Action::Finish)
            .map_err(lzma_error)?;
        if matches!(status, Status::StreamEnd) {
            break;
        }
    }

    // The encoder leaves the size unknown; record it like legacy bundles do
    if output.len() >= LZMA_ALONE_HEADER_SIZE {
        output[LZMA_PROPS_SIZE..LZMA_ALONE_HEADER_SIZE].copy_from_slice(&(data.len() as u64).to_le_bytes());
    }
    Ok(output)
}

/// Unwrap a container stored inside an LZ4 chunk stream
///
/// Layout (little-endian): `i32 version, i32 uncompressed_size,
/// i32 compressed_size, i32 tag`, then chunks of
/// `varint flags, varint original_length, [varint compressed_length], bytes`.
pub fn unwrap_lz4_stream(data: &[u8]) -> Result<Vec<u8>> {
    let mut reader = EndianReader::new(data, Endian::Little);
    let _version = reader.read_i32()?;
    let uncompressed_size = reader.read_i32()?;
    let compressed_size = reader.read_i32()?;
    let _tag = reader.read_i32()?;

    if uncompressed_size < 0 || compressed_size < 0 {
        return Err(Error::InvalidData(format!(
            "negative LZ4 stream sizes {uncompressed_size}/{compressed_size}"
        )));
    }

    let body = reader.read_bytes(compressed_size as usize)?;
    let expected = uncompressed_size as usize;
    let mut output = Vec::with_capacity(capacity_hint(expected));
    let mut pos = 0;

    while pos < body.len() && output.len() < expected {
        let flags = read_varint(body, &mut pos)?;
        let original_length = read_varint(body, &mut pos)? as usize;
        let compressed = flags & LZ4_CHUNK_COMPRESSED != 0;
        let stored_length = if compressed {
            read_varint(body, &mut pos)? as usize
        } else {
            original_length
        };

        let end = pos
            .checked_add(stored_length)
            .filter(|&end| end <= body.len())
            .ok_or(Error::DataTooShort {
                needed: pos + stored_length,
                actual: body.len(),
            })?;
        let chunk = &body[pos..end];
        pos = end;

        if compressed {
            output.extend(decompress(chunk, Codec::Lz4, original_length)?);
        } else {
            output.extend_from_slice(chunk);
        }
    }

    if output.len() != expected {
        return Err(Error::DecompressionSize {
            expected,
            actual: output.len(),
        });
    }

    Ok(output)
}

/// LEB128 unsigned varint
fn read_varint(data: &[u8], pos: &mut usize) -> Result<u64> {
    let mut value = 0u64;
    let mut shift = 0;
    loop {
        let byte = *data.get(*pos).ok_or(Error::DataTooShort {
            needed: *pos + 1,
            actual: data.len(),
        })?;
        *pos += 1;
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
        if shift >= 64 {
            return Err(Error::InvalidData("varint overflow".into()));
        }
    }
}

#[cfg(test)]
pub(crate) fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}
