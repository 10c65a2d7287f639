//! Type tree model
//!
//! A class schema is a flat pre-order list of nodes annotated with their
//! depth. Children are never stored: a node's children are the contiguous
//! run of following nodes at a greater level.

use std::collections::HashMap;

use crate::ALIGN_FLAG;

/// One field description in a type tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaNode {
    pub level: i32,
    pub type_name: String,
    pub name: String,
    pub byte_size: i32,
    pub index: i32,
    pub is_array: bool,
    pub flags: u32,
}

impl SchemaNode {
    pub fn new(level: i32, type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            level,
            type_name: type_name.into(),
            name: name.into(),
            byte_size: -1,
            index: 0,
            is_array: false,
            flags: 0,
        }
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_size(mut self, byte_size: i32) -> Self {
        self.byte_size = byte_size;
        self
    }

    /// Whether the stream aligns to 4 bytes after this node's value
    pub fn needs_align(&self) -> bool {
        self.flags & ALIGN_FLAG != 0
    }
}

/// Number of nodes after `index` that belong to its subtree
pub fn child_span(nodes: &[SchemaNode], index: usize) -> usize {
    let Some(node) = nodes.get(index) else {
        return 0;
    };
    nodes[index + 1..]
        .iter()
        .take_while(|child| child.level > node.level)
        .count()
}

/// Indices of the direct children of the node at `index`
pub fn children(nodes: &[SchemaNode], index: usize) -> Vec<usize> {
    let span = child_span(nodes, index);
    let mut out = Vec::new();
    let mut i = index + 1;
    while i <= index + span {
        out.push(i);
        i += 1 + child_span(nodes, i);
    }
    out
}

/// Schema of one class: its root type plus the flattened member list
///
/// Top-level members sit at level 0 regardless of how the file encoded the
/// tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSchema {
    pub class_id: i32,
    pub root: SchemaNode,
    pub members: Vec<SchemaNode>,
}

impl ClassSchema {
    pub fn type_name(&self) -> &str {
        &self.root.type_name
    }

    /// Top-level member by name
    pub fn member(&self, name: &str) -> Option<&SchemaNode> {
        self.members
            .iter()
            .find(|node| node.level == 0 && node.name == name)
    }
}

/// Class schemas of one serialized file keyed by file-local class id
#[derive(Debug, Clone, Default)]
pub struct ClassSchemaTable {
    classes: HashMap<i32, ClassSchema>,
}

impl ClassSchemaTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a schema, replacing any earlier one for the same id
    pub fn insert(&mut self, schema: ClassSchema) {
        self.classes.insert(schema.class_id, schema);
    }

    pub fn get(&self, class_id: i32) -> Option<&ClassSchema> {
        self.classes.get(&class_id)
    }

    pub fn contains(&self, class_id: i32) -> bool {
        self.classes.contains_key(&class_id)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassSchema> {
        self.classes.values()
    }
}
