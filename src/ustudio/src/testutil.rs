//! Byte-level fixtures shared by the unit tests
//!
//! Builds serialized files and containers with [`EndianWriter`] so each
//! layout can be exercised without captured game data.

use std::io;
use std::sync::{Arc, Mutex};

use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

use crate::asset::{AssetFile, SUPPORTED_FORMATS};
use crate::class_id;
use crate::compression::{self, Codec};
use crate::endian::{Endian, EndianWriter};
use crate::schema::{children, ClassSchema, SchemaNode};
use crate::strings::common_offset;
use crate::{Error, Result, ALIGN_FLAG, UNITY_FS};

/// Engine version written into fixture headers
pub(crate) const ENGINE_VERSION: &str = "5.6.3p1";

/// Log sink shared between a test and its subscriber
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub(crate) fn contents(&self) -> String {
        let bytes = self.0.lock().map(|buf| buf.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut sink) = self.0.lock() {
            sink.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` under a subscriber that records `level` and above
pub(crate) fn with_captured_logs<R>(level: Level, f: impl FnOnce() -> R) -> (R, String) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_max_level(level)
        .with_ansi(false)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, logs.contents())
}

/// Writes the four header words over the first 16 bytes
fn patch_header(bytes: &mut [u8], table_size: usize, data_end: usize, format: i32, data_offset: usize) {
    bytes[0..4].copy_from_slice(&(table_size as i32).to_be_bytes());
    bytes[4..8].copy_from_slice(&(data_end as i32).to_be_bytes());
    bytes[8..12].copy_from_slice(&format.to_be_bytes());
    bytes[12..16].copy_from_slice(&(data_offset as u32).to_be_bytes());
}

/// Version, platform and base-definitions fields; leaves `w` in `endian`
fn write_metadata_prefix(w: &mut EndianWriter, format: i32, version: &str, platform: i32, endian: Endian) {
    if format < 9 {
        w.write_u8(0);
        if format >= 7 {
            w.write_cstring(version);
        }
        w.set_endian(endian);
        if format == 8 {
            w.write_i32(platform);
        }
    } else {
        w.write_bytes(&[0; 4]);
        w.write_cstring(version);
        w.set_endian(endian);
        w.write_i32(platform);
        if format >= 14 {
            w.write_bool(true);
        }
    }
}

/// A header and nothing else
pub(crate) struct HeaderSpec {
    pub format: i32,
    pub version: String,
    pub platform: i32,
    pub little_endian_metadata: bool,
}

impl HeaderSpec {
    pub fn new(format: i32, version: &str, platform: i32) -> Self {
        Self {
            format,
            version: version.to_string(),
            platform,
            little_endian_metadata: false,
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let endian = if self.little_endian_metadata {
            Endian::Little
        } else {
            Endian::Big
        };
        let mut w = EndianWriter::new(Endian::Big);
        w.write_bytes(&[0; 16]);
        write_metadata_prefix(&mut w, self.format, &self.version, self.platform, endian);

        let mut bytes = w.into_inner();
        let len = bytes.len();
        patch_header(&mut bytes, len - 16, len, self.format, 16);
        bytes
    }
}

/// Class schema plus the script type written for format 16+
pub(crate) struct ClassSpec {
    pub class_id: i32,
    pub script_type: Option<i16>,
    pub schema: ClassSchema,
}

/// One object's preload record and bytes
pub(crate) struct ObjectSpec {
    pub path_id: i64,
    pub type_id: i32,
    pub class_id: u16,
    /// Index into the type list, used from format 16
    pub type_index: i32,
    pub bytes: Vec<u8>,
}

/// A complete serialized file
pub(crate) struct AssetSpec {
    pub format: i32,
    pub version: String,
    pub platform: i32,
    pub endian: Endian,
    pub classes: Vec<ClassSpec>,
    pub objects: Vec<ObjectSpec>,
    pub script_objects: Vec<(i32, i64)>,
    pub shared: Vec<String>,
}

impl AssetSpec {
    pub fn new(format: i32, version: &str, platform: i32, endian: Endian) -> Self {
        Self {
            format,
            version: version.to_string(),
            platform,
            endian,
            classes: Vec::new(),
            objects: Vec::new(),
            script_objects: Vec::new(),
            shared: Vec::new(),
        }
    }

    /// Lay out the file: formats below 9 put the metadata after the object
    /// data, later formats put it between the header and the data.
    pub fn build(&self) -> Result<Vec<u8>> {
        let format = self.format;
        if !SUPPORTED_FORMATS.contains(&format) {
            return Err(Error::UnsupportedAssetFormat(format));
        }
        // Without a platform id there is no way to signal little-endian
        let endian = if format < 8 { Endian::Big } else { self.endian };

        let mut blob = EndianWriter::new(endian);
        let mut offsets = Vec::with_capacity(self.objects.len());
        for object in &self.objects {
            blob.align(8);
            offsets.push(blob.position() as u32);
            blob.write_bytes(&object.bytes);
        }
        let blob = blob.into_inner();

        let mut w = EndianWriter::new(Endian::Big);
        w.write_bytes(&[0; 16]);

        let mut bytes = if format < 9 {
            w.write_bytes(&blob);
            let table_start = w.position();
            write_metadata_prefix(&mut w, format, &self.version, self.platform, endian);
            self.write_tables(&mut w, &offsets);

            let mut bytes = w.into_inner();
            let len = bytes.len();
            patch_header(&mut bytes, len - table_start, len, format, 16);
            bytes
        } else {
            write_metadata_prefix(&mut w, format, &self.version, self.platform, endian);
            self.write_tables(&mut w, &offsets);
            let table_size = w.position() - 16;
            w.align(16);
            let data_offset = w.position();
            w.write_bytes(&blob);

            let mut bytes = w.into_inner();
            let len = bytes.len();
            patch_header(&mut bytes, table_size, len, format, data_offset);
            bytes
        };
        bytes.shrink_to_fit();
        Ok(bytes)
    }

    fn write_tables(&self, w: &mut EndianWriter, offsets: &[u32]) {
        let format = self.format;

        w.write_i32(self.classes.len() as i32);
        for class in &self.classes {
            if format < 14 {
                write_legacy_class(w, class.class_id, &class.schema);
            } else {
                write_compact_class(w, format, class.class_id, class.script_type, &class.schema);
            }
        }
        if (7..14).contains(&format) {
            w.write_i32(0);
        }

        w.write_i32(self.objects.len() as i32);
        for (object, &offset) in self.objects.iter().zip(offsets) {
            if format >= 14 {
                w.align(4);
            }
            if format < 14 {
                w.write_i32(object.path_id as i32);
            } else {
                w.write_i64(object.path_id);
            }
            w.write_u32(offset).write_i32(object.bytes.len() as i32);
            if format > 15 {
                w.write_i32(object.type_index);
            } else {
                w.write_i32(object.type_id).write_u16(object.class_id).write_u16(0);
            }
            if format == 15 {
                w.write_u8(0);
            }
        }

        if format >= 14 {
            w.write_i32(self.script_objects.len() as i32);
            for &(file_index, path_id) in &self.script_objects {
                w.write_i32(file_index);
                w.align(4);
                w.write_i64(path_id);
            }
        }

        w.write_i32(self.shared.len() as i32);
        for name in &self.shared {
            w.write_cstring("").write_bytes(&[0; 20]).write_cstring(name);
        }
    }
}

/// Root plus members shifted one level down, as files store them
fn stored_nodes(schema: &ClassSchema) -> Vec<SchemaNode> {
    let mut nodes = vec![schema.root.clone()];
    nodes.extend(schema.members.iter().map(|node| SchemaNode {
        level: node.level + 1,
        ..node.clone()
    }));
    nodes
}

pub(crate) fn write_legacy_class(w: &mut EndianWriter, class_id: i32, schema: &ClassSchema) {
    w.write_i32(class_id);
    w.write_cstring(&schema.root.type_name).write_cstring(&schema.root.name);
    w.write_bytes(&[0; 20]);
    w.write_i32(1);

    let nodes = stored_nodes(schema);
    for (i, node) in nodes.iter().enumerate() {
        w.write_cstring(&node.type_name).write_cstring(&node.name);
        w.write_i32(node.byte_size).write_i32(node.index);
        w.write_i32(i32::from(node.is_array)).write_i32(1);
        w.write_u32(node.flags);
        w.write_i32(children(&nodes, i).len() as i32);
    }
}

pub(crate) fn write_compact_class(
    w: &mut EndianWriter,
    format: i32,
    class_id: i32,
    script_type: Option<i16>,
    schema: &ClassSchema,
) {
    w.write_i32(class_id);
    if format > 15 {
        w.write_u8(0).write_i16(script_type.unwrap_or(-1));
        if class_id == class_id::MONO_BEHAVIOUR {
            w.write_bytes(&[0; 16]);
        }
    } else if class_id < 0 {
        w.write_bytes(&[0; 16]);
    }
    w.write_bytes(&[0; 16]);

    let nodes = stored_nodes(schema);
    let mut strings = Vec::new();
    let mut records = EndianWriter::new(w.endian());
    let mut name_ref = |records: &mut EndianWriter, name: &str| match common_offset(name) {
        Some(offset) => {
            records.write_u16(offset as u16).write_u16(0x8000);
        }
        None => {
            records.write_u16(strings.len() as u16).write_u16(0);
            strings.extend_from_slice(name.as_bytes());
            strings.push(0);
        }
    };

    for node in &nodes {
        records.write_i16(1).write_u8(node.level as u8).write_bool(node.is_array);
        name_ref(&mut records, &node.type_name);
        name_ref(&mut records, &node.name);
        records.write_i32(node.byte_size).write_i32(node.index).write_u32(node.flags);
    }

    w.write_i32(nodes.len() as i32).write_i32(strings.len() as i32);
    w.write_bytes(records.as_bytes()).write_bytes(&strings);
}

/// Members of a string field: the string node and its three descriptors
fn string_nodes(level: i32, name: &str) -> Vec<SchemaNode> {
    vec![
        SchemaNode::new(level, "string", name).with_flags(ALIGN_FLAG),
        SchemaNode {
            is_array: true,
            ..SchemaNode::new(level + 1, "Array", "Array")
        },
        SchemaNode::new(level + 2, "int", "size").with_size(4),
        SchemaNode::new(level + 2, "char", "data").with_size(1),
    ]
}

fn pptr_nodes(type_name: &str, name: &str, format: i32) -> Vec<SchemaNode> {
    let path_id = if format < 14 {
        SchemaNode::new(1, "int", "m_PathID").with_size(4)
    } else {
        SchemaNode::new(1, "SInt64", "m_PathID").with_size(8)
    };
    vec![
        SchemaNode::new(0, type_name, name).with_size(12),
        SchemaNode::new(1, "int", "m_FileID").with_size(4),
        path_id,
    ]
}

/// MonoBehaviour schema of a small score script, for format 14+ path ids
pub(crate) fn score_schema() -> ClassSchema {
    score_schema_for(17)
}

/// MonoBehaviour schema of a small score script
///
/// Members: script header, `Tempo: double`, `tsigNumerator: int`,
/// `m_Notes: vector<Note { m_Tick: int, m_Flick: UInt8 }>`, `m_Title`.
pub(crate) fn score_schema_for(format: i32) -> ClassSchema {
    let mut members = Vec::new();
    members.extend(pptr_nodes("PPtr<GameObject>", "m_GameObject", format));
    members.push(
        SchemaNode::new(0, "UInt8", "m_Enabled")
            .with_size(1)
            .with_flags(ALIGN_FLAG),
    );
    members.extend(pptr_nodes("PPtr<MonoScript>", "m_Script", format));
    members.extend(string_nodes(0, "m_Name"));
    members.push(SchemaNode::new(0, "double", "Tempo").with_size(8));
    members.push(SchemaNode::new(0, "int", "tsigNumerator").with_size(4));
    members.extend([
        SchemaNode::new(0, "vector", "m_Notes").with_flags(ALIGN_FLAG),
        SchemaNode {
            is_array: true,
            ..SchemaNode::new(1, "Array", "Array")
        },
        SchemaNode::new(2, "int", "size").with_size(4),
        SchemaNode::new(2, "Note", "data").with_size(8),
        SchemaNode::new(3, "int", "m_Tick").with_size(4),
        SchemaNode::new(3, "UInt8", "m_Flick")
            .with_size(1)
            .with_flags(ALIGN_FLAG),
    ]);
    members.extend(string_nodes(0, "m_Title"));

    for (i, node) in members.iter_mut().enumerate() {
        node.index = i as i32 + 1;
    }

    ClassSchema {
        class_id: class_id::MONO_BEHAVIOUR,
        root: SchemaNode::new(0, "MonoBehaviour", "Base"),
        members,
    }
}

/// Field values of one score object
pub(crate) struct Score<'a> {
    pub name: &'a str,
    pub tempo: f64,
    pub numerator: i32,
    pub notes: &'a [(i32, u8)],
    pub title: &'a str,
}

fn write_pptr(w: &mut EndianWriter, format: i32, file_id: i32, path_id: i64) {
    w.write_i32(file_id);
    if format < 14 {
        w.write_i32(path_id as i32);
    } else {
        w.write_i64(path_id);
    }
}

/// Object bytes matching [`score_schema_for`]
pub(crate) fn score_bytes(format: i32, endian: Endian, score: &Score<'_>) -> Vec<u8> {
    let mut w = EndianWriter::new(endian);
    write_pptr(&mut w, format, 0, 1);
    w.write_u8(1).align(4);
    write_pptr(&mut w, format, 0, 7);
    w.write_aligned_string(score.name);
    w.write_f64(score.tempo).write_i32(score.numerator);
    w.write_i32(score.notes.len() as i32);
    for &(tick, flick) in score.notes {
        w.write_i32(tick).write_u8(flick).align(4);
    }
    w.write_aligned_string(score.title);
    w.into_inner()
}

/// Two score objects (path ids 1 and 2) and one shared-file reference
pub(crate) fn score_spec(format: i32, endian: Endian) -> AssetSpec {
    let endian = if format < 8 { Endian::Big } else { endian };
    let mut spec = AssetSpec::new(format, ENGINE_VERSION, 5, endian);
    spec.classes.push(ClassSpec {
        class_id: class_id::MONO_BEHAVIOUR,
        script_type: None,
        schema: score_schema_for(format),
    });

    let scores = [
        Score {
            name: "Score",
            tempo: 120.0,
            numerator: 4,
            notes: &[(0, 0), (480, 1), (960, 0)],
            title: "Opening",
        },
        Score {
            name: "",
            tempo: 150.0,
            numerator: 3,
            notes: &[(0, 1)],
            title: "Encore",
        },
    ];
    for (i, score) in scores.iter().enumerate() {
        spec.objects.push(ObjectSpec {
            path_id: i as i64 + 1,
            type_id: class_id::MONO_BEHAVIOUR,
            class_id: class_id::MONO_BEHAVIOUR as u16,
            type_index: 0,
            bytes: score_bytes(format, endian, score),
        });
    }
    spec.shared.push("sharedassets0.assets".to_string());
    spec
}

pub(crate) fn score_file(format: i32, endian: Endian) -> Result<AssetFile> {
    AssetFile::from_bytes("level0", score_spec(format, endian).build()?)
}

/// Build settings object as format 6 files store it, for an unknown version
pub(crate) fn build_settings_bytes(endian: Endian, version: &str) -> Vec<u8> {
    let mut w = EndianWriter::new(endian);
    w.write_i32(1).write_aligned_string("Assets/Main.unity");
    w.write_i32(0);
    w.write_aligned_string(version);
    w.into_inner()
}

/// Shape of a block-based container
pub(crate) struct BlockLayout {
    pub signature: &'static str,
    pub format: i32,
    pub block_codec: Codec,
    pub info_codec: Codec,
    pub info_at_end: bool,
    /// Uncompressed bytes per block; 0 puts everything in one block
    pub block_size: usize,
}

impl Default for BlockLayout {
    fn default() -> Self {
        Self {
            signature: UNITY_FS,
            format: 6,
            block_codec: Codec::Lz4,
            info_codec: Codec::None,
            info_at_end: false,
            block_size: 0,
        }
    }
}

pub(crate) fn block_bundle(layout: &BlockLayout, entries: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    let mut table = Vec::with_capacity(entries.len());
    for (name, bytes) in entries {
        table.push((body.len() as i64, bytes.len() as i64, *name));
        body.extend_from_slice(bytes);
    }

    let chunk = if layout.block_size == 0 {
        body.len().max(1)
    } else {
        layout.block_size
    };
    let mut blocks = Vec::new();
    let mut packed = Vec::new();
    for piece in body.chunks(chunk) {
        let compressed = compression::compress(piece, layout.block_codec)?;
        blocks.push((piece.len() as u32, compressed.len() as u32));
        packed.extend_from_slice(&compressed);
    }

    let mut info = EndianWriter::new(Endian::Big);
    info.write_bytes(&[0; 16]);
    info.write_i32(blocks.len() as i32);
    for &(uncompressed, compressed) in &blocks {
        info.write_u32(uncompressed)
            .write_u32(compressed)
            .write_u16(layout.block_codec.selector() as u16);
    }
    info.write_i32(table.len() as i32);
    for &(offset, size, name) in &table {
        info.write_i64(offset).write_i64(size).write_i32(4).write_cstring(name);
    }
    let info = info.into_inner();
    let packed_info = compression::compress(&info, layout.info_codec)?;

    let mut w = EndianWriter::new(Endian::Big);
    w.write_cstring(layout.signature).write_i32(layout.format);
    w.write_cstring("5.x.x").write_cstring(ENGINE_VERSION);
    let pad = usize::from(layout.signature != UNITY_FS);
    let total = w.position() + 20 + pad + packed_info.len() + packed.len();

    let mut flags = layout.info_codec.selector();
    if layout.info_at_end {
        flags |= 0x80;
    }
    w.write_i64(total as i64);
    w.write_i32(packed_info.len() as i32).write_i32(info.len() as i32);
    w.write_u32(flags);
    if pad == 1 {
        w.write_u8(0);
    }
    if layout.info_at_end {
        w.write_bytes(&packed).write_bytes(&packed_info);
    } else {
        w.write_bytes(&packed_info).write_bytes(&packed);
    }
    Ok(w.into_inner())
}

/// Format 3 container with a flat file table, LZMA-compressed for `UnityWeb`
pub(crate) fn legacy_bundle(signature: &str, entries: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let table_len: usize = 4 + entries.iter().map(|(name, _)| name.len() + 1 + 8).sum::<usize>();
    let mut body = EndianWriter::new(Endian::Big);
    body.write_i32(entries.len() as i32);
    let mut offset = table_len;
    for (name, bytes) in entries {
        body.write_cstring(name).write_i32(offset as i32).write_i32(bytes.len() as i32);
        offset += bytes.len();
    }
    for (_, bytes) in entries {
        body.write_bytes(bytes);
    }
    let body = body.into_inner();

    let payload = if signature == "UnityRaw" {
        body.clone()
    } else {
        compression::compress_lzma_alone(&body)?
    };

    let mut w = EndianWriter::new(Endian::Big);
    w.write_cstring(signature).write_i32(3);
    w.write_cstring("3.x.x").write_cstring("3.5.7f6");
    let header_end = w.position() + 24;
    w.write_i32((header_end + payload.len()) as i32);
    w.write_i16(0).write_i16(header_end as i16).write_i32(0);
    w.write_i32(1).write_i32(payload.len() as i32).write_i32(body.len() as i32);
    w.write_bytes(&payload);
    Ok(w.into_inner())
}

/// Wrap `data` in an LZ4 chunk stream: one stored chunk, one compressed
pub(crate) fn lz4_wrap(data: &[u8]) -> Vec<u8> {
    let split = data.len() / 2;
    let (stored, rest) = data.split_at(split);
    let compressed = lz4_flex::block::compress(rest);

    let mut chunks = Vec::new();
    compression::write_varint(&mut chunks, 0);
    compression::write_varint(&mut chunks, stored.len() as u64);
    chunks.extend_from_slice(stored);
    compression::write_varint(&mut chunks, 1);
    compression::write_varint(&mut chunks, rest.len() as u64);
    compression::write_varint(&mut chunks, compressed.len() as u64);
    chunks.extend_from_slice(&compressed);

    let mut w = EndianWriter::new(Endian::Little);
    w.write_i32(1).write_i32(data.len() as i32).write_i32(chunks.len() as i32);
    w.write_bytes(b"LZ4S");
    w.write_bytes(&chunks);
    w.into_inner()
}
