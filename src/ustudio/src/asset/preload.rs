//! Object index parsing

use tracing::trace;

use super::type_tree::TypeRef;
use crate::build_settings::BuildSettings;
use crate::cancel::CancelToken;
use crate::class_id;
use crate::endian::EndianReader;
use crate::{Error, Result};

/// Location and class of one serialized object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadEntry {
    /// Identifier unique within the owning file
    pub path_id: i64,
    /// Absolute offset of the object's first byte
    pub offset: u64,
    pub size: i32,
    /// Key into the class schema table
    pub persistent_type_id: i32,
    /// Engine class id
    pub runtime_type_id: u16,
    pub type_name: String,
    /// Zero-padded ordinal within the file
    pub sequence_id: String,
}

/// Context the preload reader needs from the header and type tree
pub struct PreloadContext<'a> {
    pub format_version: i32,
    pub data_offset: u32,
    pub type_refs: &'a [TypeRef],
    pub version: &'a str,
}

/// Preload table plus the version recovered from build settings, if any
#[derive(Debug)]
pub struct PreloadTable {
    pub entries: Vec<PreloadEntry>,
    pub recovered_version: Option<String>,
}

pub fn read_preload_table(
    reader: &mut EndianReader<'_>,
    ctx: &PreloadContext<'_>,
    cancel: &CancelToken,
) -> Result<PreloadTable> {
    let format = ctx.format_version;
    let count = reader.read_i32()?;
    if count < 0 {
        return Err(Error::InvalidData(format!("negative object count {count}")));
    }

    let width = digit_count(count as usize);
    let mut entries = Vec::with_capacity((count as usize).min(reader.remaining()));
    let mut recovered_version = None;

    for i in 0..count as usize {
        cancel.check()?;
        if format >= 14 {
            reader.align(4)?;
        }

        let path_id = if format < 14 {
            i64::from(reader.read_i32()?)
        } else {
            reader.read_i64()?
        };
        let offset = u64::from(reader.read_u32()?) + u64::from(ctx.data_offset);
        let size = reader.read_i32()?;

        let (persistent_type_id, runtime_type_id) = if format > 15 {
            let index = reader.read_i32()?;
            let type_ref = usize::try_from(index)
                .ok()
                .and_then(|i| ctx.type_refs.get(i))
                .ok_or(Error::UnknownTypeIndex(index))?;
            (type_ref.type_id, type_ref.class_id as u16)
        } else {
            let type_id = reader.read_i32()?;
            let class_id = reader.read_u16()?;
            reader.skip(2)?;
            (type_id, class_id)
        };

        if format == 15 {
            let _reserved = reader.read_u8()?;
        }

        let entry = PreloadEntry {
            path_id,
            offset,
            size,
            persistent_type_id,
            runtime_type_id,
            type_name: class_id::display_name(i32::from(runtime_type_id)),
            sequence_id: format!("{i:0width$}"),
        };
        trace!(
            path_id,
            offset,
            size,
            class = %entry.type_name,
            "preload entry"
        );

        if format == 6 && i32::from(runtime_type_id) == class_id::BUILD_SETTINGS {
            // Reads through a copy so the table cursor stays put
            let settings = BuildSettings::read(reader.data(), reader.endian(), offset, format, ctx.version)?;
            recovered_version = Some(settings.version);
        }

        entries.push(entry);
    }

    Ok(PreloadTable {
        entries,
        recovered_version,
    })
}

/// Decimal digits needed to print `n` (at least one)
fn digit_count(n: usize) -> usize {
    let mut digits = 1;
    let mut n = n / 10;
    while n > 0 {
        digits += 1;
        n /= 10;
    }
    digits
}
