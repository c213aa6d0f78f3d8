//! Value representation

use crate::parser::module::ValueType;
use fhex::ToHex;
use std::fmt;

/// Runtime representation of the four numeric kinds
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Value {
    pub fn typ(&self) -> ValueType {
        match self {
            Value::I32(_) => ValueType::I32,
            Value::I64(_) => ValueType::I64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
        }
    }

    /// Zero of the given kind, used to initialise declared locals
    pub fn default_for(typ: ValueType) -> Self {
        match typ {
            ValueType::I32 => Value::I32(0),
            ValueType::I64 => Value::I64(0),
            ValueType::F32 => Value::F32(0.0),
            ValueType::F64 => Value::F64(0.0),
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Bitwise equality, so NaN payloads and signed zeros compare exactly
    pub fn bits_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::F32(a), Value::F32(b)) => a.to_bits() == b.to_bits(),
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            (a, b) => a == b,
        }
    }

    /// Parse a literal of the given kind
    ///
    /// Integers may be written signed or as their unsigned bit pattern. Floats
    /// accept decimal notation, `nan`/`inf`/`-inf`, or raw bits with a `0x` prefix.
    pub fn parse(typ: ValueType, text: &str) -> Result<Self, String> {
        let text = text.trim();
        match typ {
            ValueType::I32 => text
                .parse::<i32>()
                .or_else(|_| text.parse::<u32>().map(|v| v as i32))
                .map(Value::I32)
                .map_err(|e| format!("Failed to parse i32 from {text:?}: {e}")),
            ValueType::I64 => text
                .parse::<i64>()
                .or_else(|_| text.parse::<u64>().map(|v| v as i64))
                .map(Value::I64)
                .map_err(|e| format!("Failed to parse i64 from {text:?}: {e}")),
            ValueType::F32 => match text.strip_prefix("0x") {
                Some(hex) => u32::from_str_radix(hex, 16)
                    .map(|bits| Value::F32(f32::from_bits(bits)))
                    .map_err(|e| format!("Failed to parse f32 bits from {text:?}: {e}")),
                None => text
                    .parse::<f32>()
                    .map(Value::F32)
                    .map_err(|e| format!("Failed to parse f32 from {text:?}: {e}")),
            },
            ValueType::F64 => match text.strip_prefix("0x") {
                Some(hex) => u64::from_str_radix(hex, 16)
                    .map(|bits| Value::F64(f64::from_bits(bits)))
                    .map_err(|e| format!("Failed to parse f64 bits from {text:?}: {e}")),
                None => text
                    .parse::<f64>()
                    .map(Value::F64)
                    .map_err(|e| format!("Failed to parse f64 from {text:?}: {e}")),
            },
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(v) => write!(f, "i32:{v}"),
            Value::I64(v) => write!(f, "i64:{v}"),
            Value::F32(v) => write!(f, "f32:{}", v.to_hex()),
            Value::F64(v) => write!(f, "f64:{}", v.to_hex()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type() {
        assert_eq!(Value::I32(42).typ(), ValueType::I32);
        assert_eq!(Value::I64(42).typ(), ValueType::I64);
        assert_eq!(Value::F32(42.0).typ(), ValueType::F32);
        assert_eq!(Value::F64(42.0).typ(), ValueType::F64);
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::I32(42).as_i32(), Some(42));
        assert_eq!(Value::I32(42).as_i64(), None);
        assert_eq!(Value::F64(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::F64(2.5).as_f32(), None);
    }

    #[test]
    fn test_default_for() {
        assert_eq!(Value::default_for(ValueType::I64), Value::I64(0));
        assert_eq!(Value::default_for(ValueType::F32), Value::F32(0.0));
    }

    #[test]
    fn test_parse() {
        assert_eq!(Value::parse(ValueType::I32, "-7").unwrap(), Value::I32(-7));
        assert_eq!(Value::parse(ValueType::I32, "4294967295").unwrap(), Value::I32(-1));
        assert_eq!(
            Value::parse(ValueType::I64, "18446744073709551615").unwrap(),
            Value::I64(-1)
        );
        assert_eq!(Value::parse(ValueType::F64, "2.5").unwrap(), Value::F64(2.5));
        assert_eq!(
            Value::parse(ValueType::F32, "0x42280000").unwrap(),
            Value::F32(42.0)
        );
        assert!(Value::parse(ValueType::F64, "inf").unwrap().as_f64().unwrap().is_infinite());
        assert!(Value::parse(ValueType::I32, "seven").is_err());
        assert!(Value::parse(ValueType::I32, "4294967296").is_err());
    }

    #[test]
    fn test_bits_eq() {
        assert!(Value::F64(f64::NAN).bits_eq(&Value::F64(f64::NAN)));
        assert!(!Value::F64(0.0).bits_eq(&Value::F64(-0.0)));
        assert!(Value::I32(3).bits_eq(&Value::I32(3)));
        assert!(!Value::I32(3).bits_eq(&Value::I64(3)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::I32(42).to_string(), "i32:42");
        assert_eq!(Value::I64(-1).to_string(), "i64:-1");
        assert!(Value::F32(42.0).to_string().starts_with("f32:"));
        assert!(Value::F64(42.0).to_string().starts_with("f64:"));
    }
}
