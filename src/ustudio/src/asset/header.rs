//! Serialized file header parsing
//!
//! Four big-endian words (table size, data end, format version, data
//! offset) followed by fields that depend on the format version. The
//! platform id doubles as the byte-order probe for everything after it.

use std::io::SeekFrom;

use crate::endian::EndianReader;
use crate::platform::Platform;
use crate::{Error, Result};

/// Format versions this reader understands
pub const SUPPORTED_FORMATS: &[i32] = &[6, 7, 8, 9, 14, 15, 16, 17];

/// Parsed serialized file header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub table_size: i32,
    pub data_end: i32,
    pub format_version: i32,
    pub data_offset: u32,
    pub version: String,
    pub platform: Platform,
    pub base_definitions: bool,
}

/// Read the header, switching `reader` to little-endian when the platform
/// id only makes sense byte-swapped
pub fn read_header(reader: &mut EndianReader<'_>) -> Result<Header> {
    let table_size = reader.read_i32()?;
    let data_end = reader.read_i32()?;
    let format_version = reader.read_i32()?;
    let data_offset = reader.read_u32()?;

    let mut version = String::new();
    let mut platform = 0;
    let mut base_definitions = false;

    match format_version {
        6..=8 => {
            // Metadata sits at the end of the file
            let table_start = i64::from(data_end) - i64::from(table_size);
            if table_start < 0 {
                return Err(Error::InvalidData(format!(
                    "metadata table of {table_size} bytes before data end {data_end}"
                )));
            }
            reader.seek(SeekFrom::Start(table_start as u64))?;
            reader.skip(1)?;
            if format_version >= 7 {
                version = reader.read_cstring()?;
            }
            if format_version == 8 {
                platform = reader.read_i32()?;
            }
        }
        9 | 14..=17 => {
            reader.skip(4)?;
            version = reader.read_cstring()?;
            platform = reader.read_i32()?;
            if format_version >= 14 {
                base_definitions = reader.read_bool()?;
            }
        }
        other => return Err(Error::UnsupportedAssetFormat(other)),
    }

    if !Platform::is_plausible_id(platform) {
        platform = platform.swap_bytes();
        reader.set_endian(reader.endian().opposite());
    }

    Ok(Header {
        table_size,
        data_end,
        format_version,
        data_offset,
        version,
        platform: Platform::from_id(platform),
        base_definitions,
    })
}
