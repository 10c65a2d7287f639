//! Generic value graph produced by the object reader

use std::collections::HashMap;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::Result;

/// Runtime type of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    SInt8,
    UInt8,
    SInt16,
    UInt16,
    SInt32,
    UInt32,
    SInt64,
    UInt64,
    Float,
    Double,
    Bool,
    String,
    List,
    Object,
}

impl ValueKind {
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ValueKind::SInt8
                | ValueKind::UInt8
                | ValueKind::SInt16
                | ValueKind::UInt16
                | ValueKind::SInt32
                | ValueKind::UInt32
                | ValueKind::SInt64
                | ValueKind::UInt64
        )
    }

    /// Kind produced by a primitive type-tree type name
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        Some(match type_name {
            "SInt8" => ValueKind::SInt8,
            "UInt8" | "char" => ValueKind::UInt8,
            "SInt16" | "short" => ValueKind::SInt16,
            "UInt16" | "unsigned short" => ValueKind::UInt16,
            "SInt32" | "int" => ValueKind::SInt32,
            "UInt32" | "unsigned int" => ValueKind::UInt32,
            "SInt64" | "long long" => ValueKind::SInt64,
            "UInt64" | "unsigned long long" => ValueKind::UInt64,
            "float" => ValueKind::Float,
            "double" => ValueKind::Double,
            "bool" => ValueKind::Bool,
            "string" => ValueKind::String,
            _ => return None,
        })
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::SInt8 => "SInt8",
            ValueKind::UInt8 => "UInt8",
            ValueKind::SInt16 => "SInt16",
            ValueKind::UInt16 => "UInt16",
            ValueKind::SInt32 => "SInt32",
            ValueKind::UInt32 => "UInt32",
            ValueKind::SInt64 => "SInt64",
            ValueKind::UInt64 => "UInt64",
            ValueKind::Float => "float",
            ValueKind::Double => "double",
            ValueKind::Bool => "bool",
            ValueKind::String => "string",
            ValueKind::List => "list",
            ValueKind::Object => "object",
        };
        f.write_str(name)
    }
}

/// One decoded value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    SInt8(i8),
    UInt8(u8),
    SInt16(i16),
    UInt16(u16),
    SInt32(i32),
    UInt32(u32),
    SInt64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    Bool(bool),
    String(String),
    List(Vec<Value>),
    Object(Object),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::SInt8(_) => ValueKind::SInt8,
            Value::UInt8(_) => ValueKind::UInt8,
            Value::SInt16(_) => ValueKind::SInt16,
            Value::UInt16(_) => ValueKind::UInt16,
            Value::SInt32(_) => ValueKind::SInt32,
            Value::UInt32(_) => ValueKind::UInt32,
            Value::SInt64(_) => ValueKind::SInt64,
            Value::UInt64(_) => ValueKind::UInt64,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::Bool(_) => ValueKind::Bool,
            Value::String(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
            Value::Object(_) => ValueKind::Object,
        }
    }

    /// Integer value widened to i64, `None` for non-integers and u64 overflow
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::SInt8(v) => Some(v.into()),
            Value::UInt8(v) => Some(v.into()),
            Value::SInt16(v) => Some(v.into()),
            Value::UInt16(v) => Some(v.into()),
            Value::SInt32(v) => Some(v.into()),
            Value::UInt32(v) => Some(v.into()),
            Value::SInt64(v) => Some(v),
            Value::UInt64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Member of an object value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|obj| obj.members.get(key))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Named composite value
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub type_name: String,
    pub member_name: String,
    pub level: i32,
    pub members: Members,
}

impl Object {
    pub fn new(type_name: impl Into<String>, member_name: impl Into<String>, level: i32) -> Self {
        Self {
            type_name: type_name.into(),
            member_name: member_name.into(),
            level,
            members: Members::default(),
        }
    }

    /// The list held by a `{ "Array": [...] }` wrapper object
    pub fn as_array_wrapper(&self) -> Option<&[Value]> {
        if self.members.len() != 1 {
            return None;
        }
        self.members.get("Array").and_then(Value::as_list)
    }
}

/// Object members in declaration order, indexed by key
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Members {
    entries: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl Members {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    /// Insert a member; an existing key keeps its position and takes the new value
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The only member's value, or the members back when there are several
    pub fn into_single(mut self) -> std::result::Result<Value, Members> {
        if self.entries.len() == 1 {
            if let Some((_, value)) = self.entries.pop() {
                return Ok(value);
            }
        }
        Err(self)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl IntoIterator for Members {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, Value)> for Members {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut members = Members::default();
        for (k, v) in iter {
            members.insert(k, v);
        }
        members
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::SInt8(v) => serializer.serialize_i8(*v),
            Value::UInt8(v) => serializer.serialize_u8(*v),
            Value::SInt16(v) => serializer.serialize_i16(*v),
            Value::UInt16(v) => serializer.serialize_u16(*v),
            Value::SInt32(v) => serializer.serialize_i32(*v),
            Value::UInt32(v) => serializer.serialize_u32(*v),
            Value::SInt64(v) => serializer.serialize_i64(*v),
            Value::UInt64(v) => serializer.serialize_u64(*v),
            Value::Float(v) => serializer.serialize_f32(*v),
            Value::Double(v) => serializer.serialize_f64(*v),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => items.serialize(serializer),
            Value::Object(obj) => obj.members.serialize(serializer),
        }
    }
}

impl Serialize for Members {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
