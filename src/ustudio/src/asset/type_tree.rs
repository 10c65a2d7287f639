//! Embedded type tree parsing
//!
//! Formats below 14 store each class as a recursive node tree with inline
//! strings. Later formats store fixed 24-byte records that name their type
//! and member through either the file's string block or the built-in string
//! table. Both are flattened to the same level-annotated list.

use crate::cancel::CancelToken;
use crate::class_id;
use crate::endian::{Endian, EndianReader};
use crate::schema::{ClassSchema, ClassSchemaTable, SchemaNode};
use crate::strings::common_string;
use crate::{Error, Result};

/// Size of one compact type tree record
const RECORD_SIZE: usize = 24;

/// Resolved class of an indexed preload record (format 16+)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeRef {
    /// Key into the class schema table; negative for script types
    pub type_id: i32,
    /// Engine class id as stored in the file
    pub class_id: i32,
}

/// Class schemas and the ordinal type list of one file
#[derive(Debug, Clone, Default)]
pub struct TypeTree {
    pub classes: ClassSchemaTable,
    pub type_refs: Vec<TypeRef>,
}

pub fn read_type_tree(
    reader: &mut EndianReader<'_>,
    format_version: i32,
    base_definitions: bool,
    cancel: &CancelToken,
) -> Result<TypeTree> {
    let count = reader.read_i32()?;
    let mut tree = TypeTree::default();

    for _ in 0..count.max(0) {
        cancel.check()?;
        let schema = if format_version < 14 {
            read_legacy_class(reader)?
        } else {
            read_compact_class(reader, format_version, base_definitions, &mut tree.type_refs)?
        };
        if let Some(schema) = schema {
            tree.classes.insert(schema);
        }
    }

    Ok(tree)
}

fn read_legacy_class(reader: &mut EndianReader<'_>) -> Result<Option<ClassSchema>> {
    let class_id = reader.read_i32()?;
    let _base_type = reader.read_cstring()?;
    let _base_name = reader.read_cstring()?;
    reader.skip(20)?;

    // Several roots can be listed; the last one describes the class
    let member_count = reader.read_i32()?;
    let mut schema = None;
    for _ in 0..member_count.max(0) {
        let nodes = read_legacy_nodes(reader)?;
        schema = flatten(class_id, nodes);
    }
    Ok(schema)
}

/// Read one node and its descendants in pre-order
fn read_legacy_nodes(reader: &mut EndianReader<'_>) -> Result<Vec<SchemaNode>> {
    let mut nodes = Vec::new();
    // Nodes still to read at each depth
    let mut pending: Vec<i32> = vec![1];

    while let Some(remaining) = pending.last_mut() {
        if *remaining == 0 {
            pending.pop();
            continue;
        }
        *remaining -= 1;
        let level = pending.len() as i32 - 1;

        let type_name = reader.read_cstring()?;
        let name = reader.read_cstring()?;
        let byte_size = reader.read_i32()?;
        let index = reader.read_i32()?;
        let is_array = reader.read_i32()? != 0;
        let _version = reader.read_i32()?;
        let flags = reader.read_u32()?;
        let child_count = reader.read_i32()?;

        nodes.push(SchemaNode {
            level,
            type_name,
            name,
            byte_size,
            index,
            is_array,
            flags,
        });

        if child_count < 0 {
            return Err(Error::InvalidData(format!(
                "negative child count {child_count} in type tree"
            )));
        }
        if child_count > 0 {
            pending.push(child_count);
        }
    }

    Ok(nodes)
}

/// Split a pre-order tree into its root and members one level up
fn flatten(class_id: i32, mut nodes: Vec<SchemaNode>) -> Option<ClassSchema> {
    if nodes.is_empty() {
        return None;
    }
    let root = nodes.remove(0);
    for node in &mut nodes {
        node.level -= 1;
    }
    Some(ClassSchema {
        class_id,
        root,
        members: nodes,
    })
}

fn read_compact_class(
    reader: &mut EndianReader<'_>,
    format_version: i32,
    base_definitions: bool,
    type_refs: &mut Vec<TypeRef>,
) -> Result<Option<ClassSchema>> {
    let mut class_id = reader.read_i32()?;

    if format_version > 15 {
        let _stripped = reader.read_u8()?;
        let script_type = reader.read_i16()?;
        let type_id = if script_type >= 0 {
            -(1 + i32::from(script_type))
        } else {
            class_id
        };
        type_refs.push(TypeRef { type_id, class_id });

        if class_id == class_id::MONO_BEHAVIOUR {
            // Script id hash
            reader.skip(16)?;
        }
        class_id = type_id;
    } else if class_id < 0 {
        reader.skip(16)?;
    }
    // Type hash
    reader.skip(16)?;

    if !base_definitions {
        return Ok(None);
    }

    let var_count = reader.read_i32()?;
    let string_size = reader.read_i32()?;
    if var_count < 0 || string_size < 0 {
        return Err(Error::InvalidData(format!(
            "type tree with {var_count} records and {string_size} string bytes"
        )));
    }

    let records = reader.read_bytes(var_count as usize * RECORD_SIZE)?;
    let strings = reader.read_bytes(string_size as usize)?;

    let mut records = EndianReader::new(records, reader.endian());
    let strings = EndianReader::new(strings, Endian::Big);

    let mut root = None;
    let mut members = Vec::with_capacity(var_count as usize);

    for _ in 0..var_count {
        let _version = records.read_i16()?;
        let level = records.read_u8()?;
        let is_array = records.read_bool()?;
        let type_name = resolve_name(&strings, records.read_u16()?, records.read_u16()?)?;
        let name = resolve_name(&strings, records.read_u16()?, records.read_u16()?)?;
        let byte_size = records.read_i32()?;
        let index = records.read_i32()?;
        let flags = records.read_u32()?;

        let node = SchemaNode {
            level: i32::from(level) - 1,
            type_name,
            name,
            byte_size,
            index,
            is_array,
            flags,
        };

        if index == 0 {
            root = Some(SchemaNode { level: 0, ..node });
        } else {
            members.push(node);
        }
    }

    let root = root.unwrap_or_else(|| SchemaNode::new(0, "", ""));
    Ok(Some(ClassSchema {
        class_id,
        root,
        members,
    }))
}

/// Name from the string block (`builtin == 0`) or the built-in table
fn resolve_name(strings: &EndianReader<'_>, offset: u16, builtin: u16) -> Result<String> {
    if builtin == 0 {
        let mut cursor = *strings;
        cursor.set_position(u64::from(offset))?;
        return cursor.read_cstring();
    }
    Ok(match common_string(u32::from(offset)) {
        Some(s) => s.to_string(),
        None => offset.to_string(),
    })
}
