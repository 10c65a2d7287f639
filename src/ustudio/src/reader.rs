//! Type-tree driven object decoding
//!
//! Walks a class's flat node list, reading one value per node and skipping
//! over the subtree spans of strings, arrays, and nested objects.

use tracing::{trace, warn};

use crate::asset::{AssetFile, PreloadEntry};
use crate::cancel::CancelToken;
use crate::endian::EndianReader;
use crate::options::Options;
use crate::schema::{child_span, SchemaNode};
use crate::value::{Members, Object, Value, ValueKind};
use crate::{Error, Result};

/// Decodes object bytes against one class's member nodes
pub struct ObjectReader<'a> {
    nodes: &'a [SchemaNode],
    max_array_len: usize,
    cancel: Option<&'a CancelToken>,
}

impl<'a> ObjectReader<'a> {
    pub fn new(nodes: &'a [SchemaNode], options: &Options) -> Self {
        Self {
            nodes,
            max_array_len: options.max_array_len,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: &'a CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Read every top-level member starting at the cursor
    pub fn read_members(&self, reader: &mut EndianReader<'_>) -> Result<Members> {
        self.read_range(reader, 0, self.nodes.len())
    }

    fn check_cancel(&self) -> Result<()> {
        match self.cancel {
            Some(token) => token.check(),
            None => Ok(()),
        }
    }

    fn read_range(&self, reader: &mut EndianReader<'_>, start: usize, end: usize) -> Result<Members> {
        let nodes = &self.nodes[..end];
        let mut members = Members::default();
        let mut i = start;

        while i < end {
            let node = &nodes[i];
            let span = child_span(nodes, i);

            let value = match node.type_name.as_str() {
                "string" => {
                    let s = reader
                        .read_length_prefixed_string()
                        .map_err(|e| e.at(&node.name))?;
                    if node.needs_align() {
                        reader.align_clamped(4);
                    }
                    Value::String(s)
                }
                "Array" => {
                    // Only a preceding sibling counts; a sub-list's first node has none
                    let prev_aligns = i > start && nodes[i - 1].needs_align();
                    let list = self.read_array(reader, i, span)?;
                    if node.needs_align() || prev_aligns {
                        reader.align(4).map_err(|e| e.at(&node.name))?;
                    }
                    Value::List(list)
                }
                type_name => match ValueKind::from_type_name(type_name) {
                    Some(kind) => {
                        let value = read_primitive(reader, kind).map_err(|e| e.at(&node.name))?;
                        if node.needs_align() {
                            reader.align(4).map_err(|e| e.at(&node.name))?;
                        }
                        value
                    }
                    None => {
                        // Nested objects never align, whatever their flags say
                        let inner = self
                            .read_range(reader, i + 1, i + 1 + span)
                            .map_err(|e| e.at(&node.name))?;
                        Value::Object(Object {
                            type_name: node.type_name.clone(),
                            member_name: node.name.clone(),
                            level: node.level,
                            members: inner,
                        })
                    }
                },
            };

            members.insert(node.name.clone(), value);
            i += 1 + span;
        }

        Ok(members)
    }

    /// Read the elements of the `Array` node at `index`
    ///
    /// The node after `Array` is its size field; the element schema follows.
    /// A size-less compact form uses that node as the element schema.
    fn read_array(&self, reader: &mut EndianReader<'_>, index: usize, span: usize) -> Result<Vec<Value>> {
        let node = &self.nodes[index];
        let count = reader.read_i32().map_err(|e| e.at(&node.name))?;
        if count < 0 || count as usize > self.max_array_len {
            return Err(Error::InvalidData(format!(
                "array count {count} outside 0..={}",
                self.max_array_len
            ))
            .at(&node.name));
        }

        let end = index + 1 + span;
        let elem_start = if span > 1 { index + 2 } else { index + 1 };
        let single = elem_start < end && elem_start + 1 + child_span(&self.nodes[..end], elem_start) == end;

        let mut list = Vec::with_capacity((count as usize).min(reader.remaining()));
        for j in 0..count as usize {
            self.check_cancel()?;
            let members = self
                .read_range(reader, elem_start, end)
                .map_err(|e| e.at(&format!("{}[{j}]", node.name)))?;

            let element = if single { members.into_single() } else { Err(members) };
            let element = element.unwrap_or_else(|members| {
                Value::Object(Object {
                    type_name: node.type_name.clone(),
                    member_name: "data".to_string(),
                    level: node.level + 1,
                    members,
                })
            });
            list.push(element);
        }

        Ok(list)
    }
}

fn read_primitive(reader: &mut EndianReader<'_>, kind: ValueKind) -> Result<Value> {
    Ok(match kind {
        ValueKind::SInt8 => Value::SInt8(reader.read_i8()?),
        ValueKind::UInt8 => Value::UInt8(reader.read_u8()?),
        ValueKind::SInt16 => Value::SInt16(reader.read_i16()?),
        ValueKind::UInt16 => Value::UInt16(reader.read_u16()?),
        ValueKind::SInt32 => Value::SInt32(reader.read_i32()?),
        ValueKind::UInt32 => Value::UInt32(reader.read_u32()?),
        ValueKind::SInt64 => Value::SInt64(reader.read_i64()?),
        ValueKind::UInt64 => Value::UInt64(reader.read_u64()?),
        ValueKind::Float => Value::Float(reader.read_f32()?),
        ValueKind::Double => Value::Double(reader.read_f64()?),
        ValueKind::Bool => Value::Bool(reader.read_bool()?),
        ValueKind::String => Value::String(reader.read_length_prefixed_string()?),
        ValueKind::List | ValueKind::Object => {
            return Err(Error::InvalidData(format!("{kind} is not a primitive")))
        }
    })
}

/// Decode one preload entry of `file` with default options
pub fn decode_object(file: &AssetFile, entry: &PreloadEntry) -> Result<Value> {
    decode_object_with(file, entry, &Options::default(), &CancelToken::new())
}

/// Decode one preload entry through its class's type tree
pub fn decode_object_with(
    file: &AssetFile,
    entry: &PreloadEntry,
    options: &Options,
    cancel: &CancelToken,
) -> Result<Value> {
    let schema = file
        .classes
        .get(entry.persistent_type_id)
        .ok_or(Error::MissingTypeTree(entry.persistent_type_id))?;

    let mut reader = file.reader();
    reader.set_position(entry.offset)?;

    trace!(
        path_id = entry.path_id,
        class = %entry.type_name,
        offset = entry.offset,
        "decoding object"
    );

    let members = ObjectReader::new(&schema.members, options)
        .with_cancel(cancel)
        .read_members(&mut reader)
        .map_err(|e| e.at(&schema.root.name))?;

    let consumed = reader.position() - entry.offset;
    if consumed != entry.size as u64 {
        warn!(
            file = %file.name,
            path_id = entry.path_id,
            consumed,
            declared = entry.size,
            "object size differs from preload entry"
        );
    }

    Ok(Value::Object(Object {
        type_name: schema.root.type_name.clone(),
        member_name: schema.root.name.clone(),
        level: 0,
        members,
    }))
}
