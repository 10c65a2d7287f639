//! Serialized asset files
//!
//! One serialized file holds a header, the type tree for every class it
//! uses, an index of its objects, and a table of the other files its objects
//! point into. Object bytes stay in the shared buffer until decoded.

mod header;
mod preload;
mod type_tree;

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

pub use header::{read_header, Header, SUPPORTED_FORMATS};
pub use preload::PreloadEntry;
pub use type_tree::TypeRef;

use crate::cancel::CancelToken;
use crate::endian::{Endian, EndianReader};
use crate::options::Options;
use crate::platform::Platform;
use crate::pptr::PPtr;
use crate::reader;
use crate::schema::ClassSchemaTable;
use crate::value::Value;
use crate::version;
use crate::Result;

/// Reference to another serialized file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedFileReference {
    pub display_name: String,
    /// File name as stored, usually relative to the container
    pub file_name: String,
    /// Normalised location once resolution has run
    pub resolved_path: Option<PathBuf>,
    /// Index of the sibling file in the same container
    pub container_index: Option<usize>,
}

/// A parsed serialized file
#[derive(Debug, Clone)]
pub struct AssetFile {
    /// Logical name (container entry name or file name)
    pub name: String,
    /// Normalised location used to match shared-file references
    pub path: PathBuf,
    pub format_version: i32,
    pub version: String,
    pub version_components: Vec<i32>,
    pub build_type: String,
    pub platform: Platform,
    pub endian: Endian,
    pub base_definitions: bool,
    pub data_offset: u32,
    pub classes: ClassSchemaTable,
    pub type_refs: Vec<TypeRef>,
    pub objects: Vec<PreloadEntry>,
    /// Script objects referenced by this file (format 14+), file ids unresolved
    pub script_objects: Vec<PPtr>,
    pub shared: Vec<SharedFileReference>,
    by_path_id: HashMap<i64, usize>,
    data: Arc<[u8]>,
}

impl AssetFile {
    /// Open a standalone serialized file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let full = fs::canonicalize(path).unwrap_or_else(|_| normalize(path));
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse(name, full, data.into(), &CancelToken::new())
    }

    /// Parse a serialized file held in memory
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Result<Self> {
        let name = name.into();
        let path = normalize(Path::new(&name));
        Self::parse(name, path, data.into(), &CancelToken::new())
    }

    pub(crate) fn parse(name: String, path: PathBuf, data: Arc<[u8]>, cancel: &CancelToken) -> Result<Self> {
        let mut reader = EndianReader::new(&data, Endian::Big);
        let header = read_header(&mut reader)?;
        let format = header.format_version;

        let tree = type_tree::read_type_tree(&mut reader, format, header.base_definitions, cancel)?;

        if (7..14).contains(&format) {
            reader.skip(4)?;
        }

        let ctx = preload::PreloadContext {
            format_version: format,
            data_offset: header.data_offset,
            type_refs: &tree.type_refs,
            version: &header.version,
        };
        let table = preload::read_preload_table(&mut reader, &ctx, cancel)?;

        let script_objects = if format >= 14 {
            read_script_objects(&mut reader, cancel)?
        } else {
            Vec::new()
        };
        let shared = read_shared_files(&mut reader, cancel)?;
        let endian = reader.endian();

        let by_path_id = table
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.path_id, i))
            .collect();

        let mut file = Self {
            name,
            path,
            format_version: format,
            version: String::new(),
            version_components: Vec::new(),
            build_type: String::new(),
            platform: header.platform,
            endian,
            base_definitions: header.base_definitions,
            data_offset: header.data_offset,
            classes: tree.classes,
            type_refs: tree.type_refs,
            objects: table.entries,
            script_objects,
            shared,
            by_path_id,
            data,
        };
        file.set_version(&table.recovered_version.unwrap_or(header.version));

        debug!(
            name = %file.name,
            format,
            version = %file.version,
            platform = %file.platform,
            endian = ?file.endian,
            classes = file.classes.len(),
            objects = file.objects.len(),
            shared = file.shared.len(),
            "parsed serialized file"
        );

        Ok(file)
    }

    /// Replace the engine version and everything derived from it
    pub fn set_version(&mut self, version: &str) {
        self.version = version.to_string();
        self.version_components = version::components(version);
        self.build_type = version::build_type(version);
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Fresh cursor over the file's bytes in the file's byte order
    pub fn reader(&self) -> EndianReader<'_> {
        EndianReader::new(&self.data, self.endian)
    }

    pub fn object(&self, path_id: i64) -> Option<&PreloadEntry> {
        self.by_path_id.get(&path_id).map(|&i| &self.objects[i])
    }

    /// Objects whose engine class is `class_id`
    pub fn objects_of_class(&self, class_id: i32) -> impl Iterator<Item = &PreloadEntry> {
        self.objects
            .iter()
            .filter(move |entry| i32::from(entry.runtime_type_id) == class_id)
    }

    pub fn decode_object(&self, entry: &PreloadEntry) -> Result<Value> {
        reader::decode_object(self, entry)
    }

    pub fn decode_object_with(
        &self,
        entry: &PreloadEntry,
        options: &Options,
        cancel: &CancelToken,
    ) -> Result<Value> {
        reader::decode_object_with(self, entry, options, cancel)
    }

    /// Decode every object in parallel, in index order
    pub fn decode_all(&self, options: &Options, cancel: &CancelToken) -> Result<Vec<Value>> {
        self.objects
            .par_iter()
            .map(|entry| self.decode_object_with(entry, options, cancel))
            .collect()
    }
}

fn read_script_objects(reader: &mut EndianReader<'_>, cancel: &CancelToken) -> Result<Vec<PPtr>> {
    let count = reader.read_i32()?;
    let mut out = Vec::new();
    for _ in 0..count.max(0) {
        cancel.check()?;
        let file_index = reader.read_i32()?;
        reader.align(4)?;
        let path_id = reader.read_i64()?;
        out.push(PPtr { file_index, path_id });
    }
    Ok(out)
}

fn read_shared_files(reader: &mut EndianReader<'_>, cancel: &CancelToken) -> Result<Vec<SharedFileReference>> {
    let count = reader.read_i32()?;
    let mut out = Vec::new();
    for _ in 0..count.max(0) {
        cancel.check()?;
        let display_name = reader.read_cstring()?;
        // GUID and type
        reader.skip(20)?;
        let file_name = reader.read_cstring()?;
        out.push(SharedFileReference {
            display_name,
            file_name,
            resolved_path: None,
            container_index: None,
        });
    }
    Ok(out)
}

/// Lexically normalise a path, folding `.` and `..`
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
