//! Cross-file object references

use serde::Serialize;

use crate::asset::{AssetFile, PreloadEntry};
use crate::class_id;
use crate::endian::EndianReader;
use crate::value::Value;
use crate::{Error, Result};

/// Reference to an object in this file or a sibling
///
/// `file_index` is an index into the owning container's file list once
/// resolved, or -1 when the target is not loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PPtr {
    pub file_index: i32,
    pub path_id: i64,
}

impl PPtr {
    /// Raw `m_FileID`/`m_PathID` pair of a decoded reference object
    pub fn from_value(value: &Value) -> Option<Self> {
        let file_index = value.get("m_FileID")?.as_i64()?;
        let path_id = value.get("m_PathID")?.as_i64()?;
        Some(Self {
            file_index: i32::try_from(file_index).ok()?,
            path_id,
        })
    }

    pub fn is_null(&self) -> bool {
        self.path_id == 0
    }
}

/// Fixed prefix of every script (class 114) object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptHeader {
    pub game_object: PPtr,
    pub enabled: bool,
    pub script: PPtr,
    pub name: String,
}

impl AssetFile {
    /// Map a stored file id through the shared-file table
    pub fn resolve_pptr(&self, raw: PPtr) -> PPtr {
        let file_index = usize::try_from(raw.file_index)
            .ok()
            .and_then(|i| self.shared.get(i))
            .and_then(|shared| shared.container_index)
            .and_then(|i| i32::try_from(i).ok())
            .unwrap_or(-1);
        PPtr {
            file_index,
            path_id: raw.path_id,
        }
    }

    /// Read a reference at the cursor and resolve its file id
    pub fn read_pptr(&self, reader: &mut EndianReader<'_>) -> Result<PPtr> {
        let file_index = reader.read_i32()?;
        let path_id = if self.format_version < 14 {
            i64::from(reader.read_i32()?)
        } else {
            reader.read_i64()?
        };
        Ok(self.resolve_pptr(PPtr { file_index, path_id }))
    }

    /// Read the header of a script object without its type tree
    pub fn read_script_header(&self, entry: &PreloadEntry) -> Result<ScriptHeader> {
        let actual = entry.runtime_type_id;
        if i32::from(actual) != class_id::MONO_BEHAVIOUR {
            return Err(Error::UnexpectedClass {
                expected: class_id::MONO_BEHAVIOUR as u16,
                actual,
            });
        }

        let mut reader = self.reader();
        reader.set_position(entry.offset)?;

        let game_object = self.read_pptr(&mut reader)?;
        let enabled = reader.read_u8()? != 0;
        reader.align(4)?;
        let script = self.read_pptr(&mut reader)?;
        let mut name = reader.read_length_prefixed_string()?;
        if name.is_empty() {
            name = format!("{} #{}", entry.type_name, entry.sequence_id);
        }

        Ok(ScriptHeader {
            game_object,
            enabled,
            script,
            name,
        })
    }
}
