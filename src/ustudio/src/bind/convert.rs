//! Primitive coercion
//!
//! When a decoded primitive does not have exactly the declared type, the
//! binder tries, in order: enum from any integer, bool from a byte, then the
//! member's converter.

use super::types::TypeDesc;
use crate::value::{Value, ValueKind};
use crate::{Error, Result};

/// Per-member conversion capability
pub trait Converter: Send + Sync {
    fn can_convert_from(&self, kind: ValueKind) -> bool;

    fn can_convert_to(&self, target: &TypeDesc) -> bool;

    /// Produce a value of `target`'s kind (an integer for enums)
    fn convert(&self, value: &Value, target: &TypeDesc) -> Result<Value>;
}

/// Coerce `value` to the primitive or enum `target`
pub fn coerce(value: &Value, target: &TypeDesc, converter: Option<&dyn Converter>) -> Result<Value> {
    if let TypeDesc::Primitive(kind) = target {
        if value.kind() == *kind {
            return Ok(value.clone());
        }
    }

    if let TypeDesc::Enum(_) = target {
        if let Some(number) = value.as_i64() {
            return Ok(Value::SInt64(number));
        }
    }

    if let (Value::UInt8(byte), TypeDesc::Primitive(ValueKind::Bool)) = (value, target) {
        return Ok(Value::Bool(*byte != 0));
    }

    if let Some(converter) = converter {
        if converter.can_convert_from(value.kind()) && converter.can_convert_to(target) {
            return converter.convert(value, target);
        }
    }

    Err(Error::Conversion {
        from: value.kind(),
        to: target.to_string(),
    })
}

/// Numeric value as f64, for lossy cross-kind conversion
fn as_f64(value: &Value) -> Option<f64> {
    match *value {
        Value::Float(v) => Some(f64::from(v)),
        Value::Double(v) => Some(v),
        Value::UInt64(v) => Some(v as f64),
        _ => value.as_i64().map(|v| v as f64),
    }
}

fn is_numeric(kind: ValueKind) -> bool {
    kind.is_integer() || matches!(kind, ValueKind::Float | ValueKind::Double)
}

/// Casts between numeric kinds with `as` semantics (truncating, saturating)
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericConverter;

impl Converter for NumericConverter {
    fn can_convert_from(&self, kind: ValueKind) -> bool {
        is_numeric(kind)
    }

    fn can_convert_to(&self, target: &TypeDesc) -> bool {
        matches!(target, TypeDesc::Primitive(kind) if is_numeric(*kind))
    }

    fn convert(&self, value: &Value, target: &TypeDesc) -> Result<Value> {
        let conversion = || Error::Conversion {
            from: value.kind(),
            to: target.to_string(),
        };
        let TypeDesc::Primitive(kind) = target else {
            return Err(conversion());
        };

        // Integers go through i64 so large values keep their precision
        let int = value.as_i64();
        let float = as_f64(value).ok_or_else(conversion)?;
        let whole = int.unwrap_or(float as i64);

        Ok(match kind {
            ValueKind::SInt8 => Value::SInt8(whole as i8),
            ValueKind::UInt8 => Value::UInt8(whole as u8),
            ValueKind::SInt16 => Value::SInt16(whole as i16),
            ValueKind::UInt16 => Value::UInt16(whole as u16),
            ValueKind::SInt32 => Value::SInt32(whole as i32),
            ValueKind::UInt32 => Value::UInt32(whole as u32),
            ValueKind::SInt64 => Value::SInt64(whole),
            ValueKind::UInt64 => match value {
                Value::UInt64(v) => Value::UInt64(*v),
                _ => Value::UInt64(whole as u64),
            },
            ValueKind::Float => Value::Float(float as f32),
            ValueKind::Double => Value::Double(float),
            _ => return Err(conversion()),
        })
    }
}
