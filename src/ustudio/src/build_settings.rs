//! Build settings objects
//!
//! Format 6 files carry no trustworthy version string in their header. The
//! build settings object (class 141) records the real one after its scene
//! list and a few version-dependent words.

use crate::endian::{Endian, EndianReader};
use crate::version;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildSettings {
    pub levels: Vec<String>,
    pub preload_plugins: Vec<String>,
    pub version: String,
}

impl BuildSettings {
    /// Read a build settings object at `offset`
    ///
    /// `version` is the file's version so far; it decides which optional
    /// fields are present.
    pub fn read(
        data: &[u8],
        endian: Endian,
        offset: u64,
        format_version: i32,
        version: &str,
    ) -> Result<Self> {
        let components = version::components(version);
        let build_type = version::build_type(version);
        let (major, minor) = (components[0], components[1]);

        let mut reader = EndianReader::new(data, endian);
        reader.set_position(offset)?;

        let levels = read_string_list(&mut reader)?;
        let preload_plugins = if major == 5 {
            read_string_list(&mut reader)?
        } else {
            Vec::new()
        };

        reader.skip(4)?;
        if format_version >= 8 {
            reader.skip(4)?;
        }
        if format_version >= 9 {
            reader.skip(4)?;
        }
        if major == 5 || (major == 4 && (minor >= 3 || build_type != "a")) {
            reader.skip(4)?;
        }

        let version = reader.read_length_prefixed_string()?;
        Ok(Self {
            levels,
            preload_plugins,
            version,
        })
    }
}

fn read_string_list(reader: &mut EndianReader<'_>) -> Result<Vec<String>> {
    let count = reader.read_i32()?;
    let mut out = Vec::new();
    for _ in 0..count.max(0) {
        out.push(reader.read_length_prefixed_string()?);
    }
    Ok(out)
}
