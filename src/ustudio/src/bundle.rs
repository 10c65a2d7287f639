//! Asset bundle containers
//!
//! Normalises legacy `UnityWeb`/`UnityRaw` bundles and block-based `UnityFS`
//! bundles into named in-memory segments, then parses each segment as a
//! serialized file and links shared-file references between them.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::asset::{normalize, AssetFile, PreloadEntry};
use crate::cancel::CancelToken;
use crate::compression::{self, Codec};
use crate::endian::{Endian, EndianReader};
use crate::options::Options;
use crate::pptr::PPtr;
use crate::value::Value;
use crate::{Error, Result, UNITY_FS};

/// Block-info table stored at the end of the stream instead of inline
const BLOCK_INFO_AT_END: u32 = 0x80;

/// Bytes of hash before the block list
const BLOCK_INFO_HASH_SIZE: usize = 16;

/// Segment names that hold raw resource data rather than serialized files
const RESOURCE_EXTENSIONS: &[&str] = &["resS", "resource"];

/// Container signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    UnityWeb,
    UnityRaw,
    /// Eight 0xFA bytes, compressed like `UnityWeb`
    Web,
    UnityFs,
}

impl Signature {
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes {
            b"UnityWeb" => Ok(Signature::UnityWeb),
            b"UnityRaw" => Ok(Signature::UnityRaw),
            b"UnityFS" => Ok(Signature::UnityFs),
            [0xfa, 0xfa, 0xfa, 0xfa, 0xfa, 0xfa, 0xfa, 0xfa] => Ok(Signature::Web),
            other => Err(Error::UnknownSignature(String::from_utf8_lossy(other).into_owned())),
        }
    }

    /// Whether the legacy body is one LZMA-alone stream
    fn is_compressed(self) -> bool {
        matches!(self, Signature::UnityWeb | Signature::Web)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Signature::UnityWeb => "UnityWeb",
            Signature::UnityRaw => "UnityRaw",
            Signature::Web => "\\xFA\\xFA\\xFA\\xFA\\xFA\\xFA\\xFA\\xFA",
            Signature::UnityFs => UNITY_FS,
        })
    }
}

/// A named byte range extracted from a container
#[derive(Debug, Clone)]
pub struct Segment {
    pub name: String,
    data: Arc<[u8]>,
}

impl Segment {
    pub fn new(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the segment holds resource data rather than a serialized file
    pub fn is_resource(&self) -> bool {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| RESOURCE_EXTENSIONS.contains(&ext))
    }
}

/// Container header fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub signature: Signature,
    pub format: i32,
    pub player_version: String,
    pub engine_version: String,
}

/// Decompressed container with its parsed serialized files
#[derive(Debug)]
pub struct Bundle {
    pub path: PathBuf,
    pub header: ContainerHeader,
    segments: Vec<Segment>,
    files: Vec<AssetFile>,
}

impl Bundle {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &Options::default(), &CancelToken::new())
    }

    pub fn open_with(path: impl AsRef<Path>, options: &Options, cancel: &CancelToken) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let full = fs::canonicalize(path).unwrap_or_else(|_| normalize(path));
        Self::from_bytes_with(full, &data, options, cancel)
    }

    /// Read a container held in memory; `path` locates it for shared-file
    /// resolution
    pub fn from_bytes(path: impl Into<PathBuf>, data: &[u8]) -> Result<Self> {
        Self::from_bytes_with(path, data, &Options::default(), &CancelToken::new())
    }

    pub fn from_bytes_with(
        path: impl Into<PathBuf>,
        data: &[u8],
        options: &Options,
        cancel: &CancelToken,
    ) -> Result<Self> {
        let path = path.into();
        let (header, segments) = read_segments(data, cancel)?;

        let container_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let container_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut files = Vec::with_capacity(segments.len());
        for segment in &segments {
            cancel.check()?;
            if segment.is_resource() {
                debug!(name = %segment.name, size = segment.len(), "skipping resource segment");
                continue;
            }

            let file_path = normalize(&container_dir.join(&segment.name));
            let mut file = AssetFile::parse(segment.name.clone(), file_path, Arc::clone(&segment.data), cancel)?;
            if file.format_version == 6 && container_name != options.main_data_name {
                file.set_version(&header.engine_version);
            }
            files.push(file);
        }

        if options.resolve_shared_files {
            resolve_shared_files(&mut files, &container_dir);
        }

        Ok(Self {
            path,
            header,
            segments,
            files,
        })
    }

    /// Read a container wrapped in an LZ4 chunk stream
    pub fn from_lz4_wrapped(path: impl Into<PathBuf>, data: &[u8]) -> Result<Self> {
        let inner = compression::unwrap_lz4_stream(data)?;
        Self::from_bytes(path, &inner)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn files(&self) -> &[AssetFile] {
        &self.files
    }

    pub fn file_by_name(&self, name: &str) -> Option<&AssetFile> {
        self.files.iter().find(|file| file.name == name)
    }

    /// Follow a resolved reference to its file and preload entry
    pub fn resolve(&self, pptr: &PPtr) -> Option<(&AssetFile, &PreloadEntry)> {
        let file = self.files.get(usize::try_from(pptr.file_index).ok()?)?;
        let entry = file.object(pptr.path_id)?;
        Some((file, entry))
    }

    /// Decode every object of every file in parallel
    pub fn decode_all(&self, options: &Options, cancel: &CancelToken) -> Result<Vec<Vec<Value>>> {
        self.files
            .par_iter()
            .map(|file| file.decode_all(options, cancel))
            .collect()
    }
}

/// Link each shared-file reference to the sibling at the same location
fn resolve_shared_files(files: &mut [AssetFile], container_dir: &Path) {
    let paths: Vec<PathBuf> = files.iter().map(|file| file.path.clone()).collect();

    for file in files.iter_mut() {
        for shared in &mut file.shared {
            let target = normalize(&container_dir.join(&shared.file_name));
            shared.container_index = paths.iter().position(|path| *path == target);
            if shared.container_index.is_none() {
                warn!(
                    file = %file.name,
                    reference = %shared.file_name,
                    "shared file not found in container"
                );
            }
            shared.resolved_path = Some(target);
        }
    }
}

/// Split a container into its header and segments
pub fn read_segments(data: &[u8], cancel: &CancelToken) -> Result<(ContainerHeader, Vec<Segment>)> {
    let mut reader = EndianReader::new(data, Endian::Big);
    let signature = Signature::from_bytes(reader.read_cstring_bytes()?)?;
    let format = reader.read_i32()?;
    let player_version = reader.read_cstring()?;
    let engine_version = reader.read_cstring()?;

    debug!(
        %signature,
        format,
        player = %player_version,
        engine = %engine_version,
        "container header"
    );

    let segments = match (signature, format) {
        (Signature::UnityFs, 6) => read_block_container(&mut reader, false, cancel)?,
        (Signature::UnityFs, _) => {
            return Err(Error::UnsupportedBundleFormat {
                signature: signature.to_string(),
                format,
            })
        }
        (_, 6) => read_block_container(&mut reader, true, cancel)?,
        (_, f) if f < 6 => read_legacy_container(&mut reader, signature, cancel)?,
        _ => {
            return Err(Error::UnsupportedBundleFormat {
                signature: signature.to_string(),
                format,
            })
        }
    };

    let header = ContainerHeader {
        signature,
        format,
        player_version,
        engine_version,
    };
    Ok((header, segments))
}

/// Monolithic body with a flat file table, optionally one LZMA stream
fn read_legacy_container(
    reader: &mut EndianReader<'_>,
    signature: Signature,
    cancel: &CancelToken,
) -> Result<Vec<Segment>> {
    let _bundle_size = reader.read_i32()?;
    let _reserved = reader.read_i16()?;
    let offset = reader.read_i16()?;
    let _reserved = reader.read_i32()?;

    let chunk_count = reader.read_i32()?;
    let mut lzma_size = 0;
    for _ in 0..chunk_count.max(0) {
        lzma_size = reader.read_i32()?;
        let _stream_size = reader.read_i32()?;
    }

    let offset = u64::try_from(offset)
        .map_err(|_| Error::InvalidData(format!("negative bundle data offset {offset}")))?;
    reader.set_position(offset)?;

    if signature.is_compressed() {
        let size = usize::try_from(lzma_size)
            .map_err(|_| Error::InvalidData(format!("negative LZMA size {lzma_size}")))?;
        let body = compression::decompress_lzma_alone(reader.read_bytes(size)?)?;
        debug!(compressed = size, size = body.len(), "decompressed bundle body");

        let mut body_reader = EndianReader::new(&body, Endian::Big);
        read_file_table(&mut body_reader, 0, cancel)
    } else {
        read_file_table(reader, offset, cancel)
    }
}

/// Flat table of `(name, offset, size)` relative to `base`
fn read_file_table(reader: &mut EndianReader<'_>, base: u64, cancel: &CancelToken) -> Result<Vec<Segment>> {
    let data = reader.data();
    let count = reader.read_i32()?;
    let mut segments = Vec::new();

    for _ in 0..count.max(0) {
        cancel.check()?;
        let name = reader.read_cstring()?;
        let offset = base + u64::from(reader.read_u32()?);
        let size = reader.read_u32()?;
        let bytes = slice(data, offset, u64::from(size))?;
        segments.push(Segment::new(name, bytes));
    }

    Ok(segments)
}

/// Block-info table, then compressed blocks forming one logical data space
fn read_block_container(reader: &mut EndianReader<'_>, padded: bool, cancel: &CancelToken) -> Result<Vec<Segment>> {
    let _bundle_size = reader.read_i64()?;
    let compressed_size = reader.read_u32()? as usize;
    let uncompressed_size = reader.read_u32()? as usize;
    let flags = reader.read_u32()?;
    if padded {
        reader.skip(1)?;
    }

    let packed_info = if flags & BLOCK_INFO_AT_END != 0 {
        let start = reader
            .len()
            .checked_sub(compressed_size)
            .ok_or(Error::OutOfBounds {
                offset: reader.position(),
                needed: compressed_size,
                len: reader.len(),
            })?;
        &reader.data()[start..]
    } else {
        reader.read_bytes(compressed_size)?
    };

    let info_codec = Codec::from_flags(flags)?;
    let info = compression::decompress(packed_info, info_codec, uncompressed_size)?;
    let mut info = EndianReader::new(&info, Endian::Big);
    info.skip(BLOCK_INFO_HASH_SIZE)?;

    let block_count = info.read_i32()?;
    let mut blocks = Vec::new();
    for _ in 0..block_count.max(0) {
        cancel.check()?;
        let uncompressed = info.read_u32()? as usize;
        let compressed = info.read_u32()? as usize;
        let codec = Codec::from_flags(u32::from(info.read_u16()?))?;
        blocks.push((uncompressed, compressed, codec));
    }

    let entry_count = info.read_i32()?;
    let mut entries = Vec::new();
    for _ in 0..entry_count.max(0) {
        cancel.check()?;
        let offset = info.read_i64()?;
        let size = info.read_i64()?;
        let _flags = info.read_i32()?;
        let name = info.read_cstring()?;
        entries.push((offset, size, name));
    }

    let total = blocks
        .iter()
        .fold(0usize, |sum, &(uncompressed, _, _)| sum.saturating_add(uncompressed));
    let mut space = Vec::with_capacity(compression::capacity_hint(total));
    for &(uncompressed, compressed, codec) in &blocks {
        cancel.check()?;
        let bytes = reader.read_bytes(compressed)?;
        space.extend(compression::decompress(bytes, codec, uncompressed)?);
        debug!(%codec, compressed, uncompressed, "decompressed block");
    }

    let mut segments = Vec::with_capacity(entries.len());
    for (offset, size, name) in entries {
        let (offset, size) = match (u64::try_from(offset), u64::try_from(size)) {
            (Ok(offset), Ok(size)) => (offset, size),
            _ => {
                return Err(Error::InvalidData(format!(
                    "entry {name} at {offset} with size {size}"
                )))
            }
        };
        segments.push(Segment::new(name, slice(&space, offset, size)?));
    }

    Ok(segments)
}

fn slice(data: &[u8], offset: u64, size: u64) -> Result<&[u8]> {
    let out_of_bounds = || Error::OutOfBounds {
        offset,
        needed: size as usize,
        len: data.len(),
    };
    let start = usize::try_from(offset).map_err(|_| out_of_bounds())?;
    let end = offset
        .checked_add(size)
        .and_then(|end| usize::try_from(end).ok())
        .filter(|&end| end <= data.len())
        .ok_or_else(out_of_bounds)?;
    Ok(&data[start..end])
}
