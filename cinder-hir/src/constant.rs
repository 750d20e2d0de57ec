use std::fmt;

use crate::Kind;

/// Handle of a heap object known at compile time.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectHandle(pub u32);

/// A compile-time constant. Floating point values are stored as raw bits,
/// so equality is bitwise: `0.0` and `-0.0` are different constants, NaNs
/// with equal payload are the same constant.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConstValue {
    Int(i32),
    Long(i64),
    Float(u32),
    Double(u64),
    Null,
    Object(ObjectHandle),
    Word(u64),
}

impl ConstValue {
    pub fn float(value: f32) -> ConstValue {
        ConstValue::Float(value.to_bits())
    }

    pub fn double(value: f64) -> ConstValue {
        ConstValue::Double(value.to_bits())
    }

    pub fn boolean(value: bool) -> ConstValue {
        ConstValue::Int(value as i32)
    }

    pub fn kind(&self) -> Kind {
        match self {
            ConstValue::Int(_) => Kind::Int,
            ConstValue::Long(_) => Kind::Long,
            ConstValue::Float(_) => Kind::Float,
            ConstValue::Double(_) => Kind::Double,
            ConstValue::Null | ConstValue::Object(_) => Kind::Object,
            ConstValue::Word(_) => Kind::Word,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match *self {
            ConstValue::Int(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match *self {
            ConstValue::Long(value) => Some(value),
            ConstValue::Int(value) => Some(value as i64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        *self == ConstValue::Null
    }

    /// Zero, `0.0`, null: the value a freshly allocated slot holds.
    pub fn is_default_value(&self) -> bool {
        match *self {
            ConstValue::Int(value) => value == 0,
            ConstValue::Long(value) => value == 0,
            ConstValue::Float(bits) => bits == 0,
            ConstValue::Double(bits) => bits == 0,
            ConstValue::Null => true,
            ConstValue::Object(_) => false,
            ConstValue::Word(value) => value == 0,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConstValue::Int(value) => write!(f, "{}", value),
            ConstValue::Long(value) => write!(f, "{}L", value),
            ConstValue::Float(bits) => write!(f, "{}f", f32::from_bits(bits)),
            ConstValue::Double(bits) => write!(f, "{}d", f64::from_bits(bits)),
            ConstValue::Null => write!(f, "null"),
            ConstValue::Object(handle) => write!(f, "obj#{}", handle.0),
            ConstValue::Word(value) => write!(f, "0x{:x}w", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitwise_equality() {
        assert_ne!(ConstValue::float(0.0), ConstValue::float(-0.0));
        assert_eq!(ConstValue::double(f64::NAN), ConstValue::double(f64::NAN));
        assert_ne!(ConstValue::Int(1), ConstValue::Long(1));
        assert_ne!(
            ConstValue::Object(ObjectHandle(1)),
            ConstValue::Object(ObjectHandle(2))
        );
    }

    #[test]
    fn test_default_value() {
        assert!(ConstValue::Int(0).is_default_value());
        assert!(ConstValue::Null.is_default_value());
        assert!(!ConstValue::double(-0.0).is_default_value());
        assert!(!ConstValue::Object(ObjectHandle(0)).is_default_value());
    }
}
