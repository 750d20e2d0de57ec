use std::fmt;

use crate::Kind;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl ArithOp {
    pub fn is_commutative(self) -> bool {
        match self {
            ArithOp::Add | ArithOp::Mul => true,
            _ => false,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::Div => "div",
            ArithOp::Rem => "rem",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShiftOp {
    Shl,
    Shr,
    Ushr,
}

impl ShiftOp {
    pub fn name(self) -> &'static str {
        match self {
            ShiftOp::Shl => "shl",
            ShiftOp::Shr => "shr",
            ShiftOp::Ushr => "ushr",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LogicOp {
    And,
    Or,
    Xor,
}

impl LogicOp {
    pub fn name(self) -> &'static str {
        match self {
            LogicOp::And => "and",
            LogicOp::Or => "or",
            LogicOp::Xor => "xor",
        }
    }
}

/// Three-way comparisons producing -1, 0 or 1.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Lcmp,
    Fcmpl,
    Fcmpg,
    Dcmpl,
    Dcmpg,
}

impl CompareOp {
    pub fn name(self) -> &'static str {
        match self {
            CompareOp::Lcmp => "lcmp",
            CompareOp::Fcmpl => "fcmpl",
            CompareOp::Fcmpg => "fcmpg",
            CompareOp::Dcmpl => "dcmpl",
            CompareOp::Dcmpg => "dcmpg",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConvertOp {
    I2L,
    L2I,
    I2B,
    I2C,
    I2S,
    I2F,
    I2D,
    L2F,
    L2D,
    F2I,
    F2L,
    F2D,
    D2I,
    D2L,
    D2F,
}

impl ConvertOp {
    pub fn from_kind(self) -> Kind {
        match self {
            ConvertOp::I2L
            | ConvertOp::I2B
            | ConvertOp::I2C
            | ConvertOp::I2S
            | ConvertOp::I2F
            | ConvertOp::I2D => Kind::Int,
            ConvertOp::L2I | ConvertOp::L2F | ConvertOp::L2D => Kind::Long,
            ConvertOp::F2I | ConvertOp::F2L | ConvertOp::F2D => Kind::Float,
            ConvertOp::D2I | ConvertOp::D2L | ConvertOp::D2F => Kind::Double,
        }
    }

    pub fn to_kind(self) -> Kind {
        match self {
            ConvertOp::I2L | ConvertOp::F2L | ConvertOp::D2L => Kind::Long,
            ConvertOp::L2I | ConvertOp::F2I | ConvertOp::D2I => Kind::Int,
            ConvertOp::I2B => Kind::Byte,
            ConvertOp::I2C => Kind::Char,
            ConvertOp::I2S => Kind::Short,
            ConvertOp::I2F | ConvertOp::L2F | ConvertOp::D2F => Kind::Float,
            ConvertOp::I2D | ConvertOp::L2D | ConvertOp::F2D => Kind::Double,
        }
    }
}

impl fmt::Display for ConvertOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = format!("{:?}", self).to_lowercase();
        write!(f, "{}", name)
    }
}

/// Branch and compare conditions. `Below`/`Above` and friends compare unsigned.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Condition {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Below,
    BelowEqual,
    Above,
    AboveEqual,
}

impl Condition {
    /// Condition that holds for `(y, x)` whenever `self` holds for `(x, y)`.
    pub fn mirror(self) -> Condition {
        match self {
            Condition::Eq => Condition::Eq,
            Condition::Ne => Condition::Ne,
            Condition::Lt => Condition::Gt,
            Condition::Le => Condition::Ge,
            Condition::Gt => Condition::Lt,
            Condition::Ge => Condition::Le,
            Condition::Below => Condition::Above,
            Condition::BelowEqual => Condition::AboveEqual,
            Condition::Above => Condition::Below,
            Condition::AboveEqual => Condition::BelowEqual,
        }
    }

    pub fn negate(self) -> Condition {
        match self {
            Condition::Eq => Condition::Ne,
            Condition::Ne => Condition::Eq,
            Condition::Lt => Condition::Ge,
            Condition::Le => Condition::Gt,
            Condition::Gt => Condition::Le,
            Condition::Ge => Condition::Lt,
            Condition::Below => Condition::AboveEqual,
            Condition::BelowEqual => Condition::Above,
            Condition::Above => Condition::BelowEqual,
            Condition::AboveEqual => Condition::Below,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Condition::Eq => "eq",
            Condition::Ne => "ne",
            Condition::Lt => "lt",
            Condition::Le => "le",
            Condition::Gt => "gt",
            Condition::Ge => "ge",
            Condition::Below => "below",
            Condition::BelowEqual => "below_equal",
            Condition::Above => "above",
            Condition::AboveEqual => "above_equal",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    Static,
    Special,
    Virtual,
    Interface,
}

impl InvokeKind {
    pub fn has_receiver(self) -> bool {
        self != InvokeKind::Static
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeoptAction {
    None,
    Recompile,
    InvalidateReprofile,
    InvalidateRecompile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_and_negate() {
        assert_eq!(Condition::Gt.mirror(), Condition::Lt);
        assert_eq!(Condition::Le.mirror(), Condition::Ge);
        assert_eq!(Condition::Eq.mirror(), Condition::Eq);
        assert_eq!(Condition::Lt.negate(), Condition::Ge);
        assert_eq!(Condition::Below.negate(), Condition::AboveEqual);

        for cond in [Condition::Lt, Condition::Above, Condition::Ne] {
            assert_eq!(cond.negate().negate(), cond);
            assert_eq!(cond.mirror().mirror(), cond);
        }
    }

    #[test]
    fn test_convert_kinds() {
        assert_eq!(ConvertOp::I2B.to_kind(), Kind::Byte);
        assert_eq!(ConvertOp::D2L.from_kind(), Kind::Double);
        assert_eq!(ConvertOp::D2L.to_string(), "d2l");
    }
}
