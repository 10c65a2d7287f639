//! Type descriptors and the built-in bindable types

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;

use super::convert::coerce;
use super::{Bind, BindContext};
use crate::value::{Value, ValueKind};
use crate::{Error, Result};

/// Static shape of a bind target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDesc {
    Primitive(ValueKind),
    Enum(&'static str),
    Object(&'static str),
    /// Native array (`Vec<T>`)
    Array(Box<TypeDesc>),
    /// Default-constructed collection filled element by element
    Collection {
        name: &'static str,
        element: Box<TypeDesc>,
    },
}

impl TypeDesc {
    /// Element type of an array or collection
    pub fn element(&self) -> Option<&TypeDesc> {
        match self {
            TypeDesc::Array(element) | TypeDesc::Collection { element, .. } => Some(element),
            _ => None,
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Primitive(kind) => write!(f, "{kind}"),
            TypeDesc::Enum(name) | TypeDesc::Object(name) => f.write_str(name),
            TypeDesc::Array(element) => write!(f, "{element}[]"),
            TypeDesc::Collection { name, element } => write!(f, "{name}<{element}>"),
        }
    }
}

/// Short description of a value's shape for mismatch errors
pub(crate) fn shape(value: &Value) -> String {
    match value {
        Value::Object(obj) if obj.as_array_wrapper().is_some() => format!("array {}", obj.type_name),
        Value::Object(obj) => format!("object {}", obj.type_name),
        Value::List(_) => "array".to_string(),
        other => other.kind().to_string(),
    }
}

pub(crate) fn mismatch(ctx: &BindContext<'_>, expected: &TypeDesc, value: &Value) -> Error {
    Error::SchemaMismatch {
        member: ctx.member.to_string(),
        expected: expected.to_string(),
        found: shape(value),
    }
}

/// Coerce a primitive value, refusing composite shapes outright
pub fn coerce_primitive(value: &Value, target: &TypeDesc, ctx: &BindContext<'_>) -> Result<Value> {
    if matches!(value, Value::Object(_) | Value::List(_)) {
        return Err(mismatch(ctx, target, value));
    }
    coerce(value, target, ctx.converter)
}

/// Numeric value of an enum member
pub fn coerce_enum(value: &Value, target: &TypeDesc, ctx: &BindContext<'_>) -> Result<i64> {
    let coerced = coerce_primitive(value, target, ctx)?;
    coerced.as_i64().ok_or_else(|| Error::Conversion {
        from: coerced.kind(),
        to: target.to_string(),
    })
}

macro_rules! bind_primitive {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Bind for $ty {
                fn type_desc() -> TypeDesc {
                    TypeDesc::Primitive(ValueKind::$kind)
                }

                fn from_value(value: &Value, ctx: &BindContext<'_>) -> Result<Self> {
                    let desc = Self::type_desc();
                    match coerce_primitive(value, &desc, ctx)? {
                        Value::$kind(v) => Ok(v),
                        other => Err(Error::Conversion {
                            from: other.kind(),
                            to: desc.to_string(),
                        }),
                    }
                }
            }
        )*
    };
}

bind_primitive! {
    i8 => SInt8,
    u8 => UInt8,
    i16 => SInt16,
    u16 => UInt16,
    i32 => SInt32,
    u32 => UInt32,
    i64 => SInt64,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    bool => Bool,
    String => String,
}

/// Elements of a `{ "Array": [...] }` wrapper or a bare list
fn elements<'v>(value: &'v Value) -> Option<&'v [Value]> {
    match value {
        Value::List(items) => Some(items),
        Value::Object(obj) => obj.as_array_wrapper(),
        _ => None,
    }
}

/// Bind each element; objects recurse, primitives pass through the
/// converter-free coercions
fn bind_elements<T: Bind, C: FromIterator<T>>(value: &Value, desc: &TypeDesc, ctx: &BindContext<'_>) -> Result<C> {
    let items = elements(value).ok_or_else(|| mismatch(ctx, desc, value))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let name = format!("{}[{i}]", ctx.member);
            T::from_value(item, &BindContext::new(&name))
        })
        .collect()
}

fn collection(name: &'static str, element: TypeDesc) -> TypeDesc {
    TypeDesc::Collection {
        name,
        element: Box::new(element),
    }
}

impl<T: Bind> Bind for Vec<T> {
    fn type_desc() -> TypeDesc {
        TypeDesc::Array(Box::new(T::type_desc()))
    }

    fn from_value(value: &Value, ctx: &BindContext<'_>) -> Result<Self> {
        bind_elements(value, &Self::type_desc(), ctx)
    }
}

impl<T: Bind> Bind for VecDeque<T> {
    fn type_desc() -> TypeDesc {
        collection("VecDeque", T::type_desc())
    }

    fn from_value(value: &Value, ctx: &BindContext<'_>) -> Result<Self> {
        bind_elements(value, &Self::type_desc(), ctx)
    }
}

impl<T: Bind + Ord> Bind for BTreeSet<T> {
    fn type_desc() -> TypeDesc {
        collection("BTreeSet", T::type_desc())
    }

    fn from_value(value: &Value, ctx: &BindContext<'_>) -> Result<Self> {
        bind_elements(value, &Self::type_desc(), ctx)
    }
}

impl<T: Bind + Eq + Hash> Bind for HashSet<T> {
    fn type_desc() -> TypeDesc {
        collection("HashSet", T::type_desc())
    }

    fn from_value(value: &Value, ctx: &BindContext<'_>) -> Result<Self> {
        bind_elements(value, &Self::type_desc(), ctx)
    }
}
