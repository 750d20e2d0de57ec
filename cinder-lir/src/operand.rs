use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use cinder_hir::{ConstValue, Kind};

use crate::cpu::Register;

/// A virtual register, later mapped to a register or stack slot by the
/// register allocator. Indices are dense per compilation.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct Variable {
    pub index: u32,
    pub kind: Kind,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct StackSlot {
    pub offset: i32,
    pub kind: Kind,
    /// Incoming argument slots live in the caller's frame.
    pub in_caller_frame: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Scale {
    Times1,
    Times2,
    Times4,
    Times8,
}

impl Scale {
    pub fn log2(self) -> u8 {
        self.into()
    }

    pub fn value(self) -> i32 {
        1 << self.log2()
    }

    pub fn from_kind(kind: Kind, word_size: u32) -> Scale {
        match kind.size_in_bytes(word_size) {
            1 => Scale::Times1,
            2 => Scale::Times2,
            4 => Scale::Times4,
            8 => Scale::Times8,
            size => panic!("no scale for element size {}", size),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct Address {
    pub base: Box<Operand>,
    /// `Operand::Illegal` without index.
    pub index: Box<Operand>,
    pub scale: Scale,
    pub disp: i32,
    pub kind: Kind,
}

impl Address {
    pub fn new(base: Operand, disp: i32, kind: Kind) -> Address {
        Address {
            base: Box::new(base),
            index: Box::new(Operand::Illegal),
            scale: Scale::Times1,
            disp,
            kind,
        }
    }

    pub fn indexed(base: Operand, index: Operand, scale: Scale, disp: i32, kind: Kind) -> Address {
        Address {
            base: Box::new(base),
            index: Box::new(index),
            scale,
            disp,
            kind,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub enum Operand {
    Constant(ConstValue),
    Variable(Variable),
    Register(Register, Kind),
    StackSlot(StackSlot),
    Address(Address),
    Illegal,
}

impl Operand {
    pub fn variable(index: u32, kind: Kind) -> Operand {
        Operand::Variable(Variable { index, kind })
    }

    pub fn register<R: Into<Register>>(reg: R, kind: Kind) -> Operand {
        Operand::Register(reg.into(), kind)
    }

    pub fn int(value: i32) -> Operand {
        Operand::Constant(ConstValue::Int(value))
    }

    pub fn long(value: i64) -> Operand {
        Operand::Constant(ConstValue::Long(value))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Operand::Constant(value) => value.kind(),
            Operand::Variable(var) => var.kind,
            Operand::Register(_, kind) => *kind,
            Operand::StackSlot(slot) => slot.kind,
            Operand::Address(address) => address.kind,
            Operand::Illegal => Kind::Illegal,
        }
    }

    pub fn is_legal(&self) -> bool {
        !self.is_illegal()
    }

    pub fn is_illegal(&self) -> bool {
        match self {
            Operand::Illegal => true,
            _ => false,
        }
    }

    pub fn is_constant(&self) -> bool {
        match self {
            Operand::Constant(_) => true,
            _ => false,
        }
    }

    pub fn is_variable(&self) -> bool {
        match self {
            Operand::Variable(_) => true,
            _ => false,
        }
    }

    pub fn is_register(&self) -> bool {
        match self {
            Operand::Register(..) => true,
            _ => false,
        }
    }

    pub fn is_stack(&self) -> bool {
        match self {
            Operand::StackSlot(_) => true,
            _ => false,
        }
    }

    pub fn is_address(&self) -> bool {
        match self {
            Operand::Address(_) => true,
            _ => false,
        }
    }

    pub fn is_variable_or_register(&self) -> bool {
        self.is_variable() || self.is_register()
    }

    pub fn as_variable(&self) -> Option<Variable> {
        match *self {
            Operand::Variable(var) => Some(var),
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<ConstValue> {
        match *self {
            Operand::Constant(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_register(&self) -> Option<Register> {
        match *self {
            Operand::Register(reg, _) => Some(reg),
            _ => None,
        }
    }

    /// Same location viewed with another kind.
    pub fn with_kind(&self, kind: Kind) -> Operand {
        match self {
            Operand::Variable(var) => Operand::variable(var.index, kind),
            Operand::Register(reg, _) => Operand::Register(*reg, kind),
            Operand::StackSlot(slot) => Operand::StackSlot(StackSlot { kind, ..*slot }),
            Operand::Address(address) => Operand::Address(Address {
                kind,
                ..address.clone()
            }),
            Operand::Constant(_) | Operand::Illegal => self.clone(),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operand::Constant(value) => write!(f, "{}", value),
            Operand::Variable(var) => write!(f, "v{}{}", var.index, var.kind),
            Operand::Register(reg, kind) => write!(f, "{}{}", reg, kind),
            Operand::StackSlot(slot) => {
                let frame = if slot.in_caller_frame { "caller" } else { "sp" };
                write!(f, "[{}{:+}]{}", frame, slot.offset, slot.kind)
            }
            Operand::Address(address) => {
                write!(f, "[{}", address.base)?;
                if address.index.is_legal() {
                    write!(f, " + {}*{}", address.index, address.scale.value())?;
                }
                if address.disp != 0 {
                    write!(f, " {:+}", address.disp)?;
                }
                write!(f, "]{}", address.kind)
            }
            Operand::Illegal => write!(f, "-"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::x64::RAX;

    #[test]
    fn test_display() {
        assert_eq!(Operand::variable(3, Kind::Int).to_string(), "v3i");
        assert_eq!(Operand::register(RAX, Kind::Long).to_string(), "r0j");
        assert_eq!(Operand::long(7).to_string(), "7L");

        let address = Address::indexed(
            Operand::variable(1, Kind::Object),
            Operand::variable(2, Kind::Int),
            Scale::Times4,
            16,
            Kind::Int,
        );
        assert_eq!(Operand::Address(address).to_string(), "[v1a + v2i*4 +16]i");
    }

    #[test]
    fn test_scale() {
        assert_eq!(Scale::try_from(3u8).ok(), Some(Scale::Times8));
        assert_eq!(Scale::from_kind(Kind::Char, 8), Scale::Times2);
        assert_eq!(Scale::Times4.value(), 4);
    }

    #[test]
    fn test_with_kind_keeps_location() {
        let var = Operand::variable(5, Kind::Long);
        assert_eq!(var.with_kind(Kind::Double), Operand::variable(5, Kind::Double));
        assert!(Operand::Illegal.with_kind(Kind::Int).is_illegal());
    }
}
