use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Value kind of an instruction or operand.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Kind {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Float,
    Long,
    Double,
    Object,
    Word,
    Void,
    Illegal,
}

impl Kind {
    /// Kind used on the operand stack and in variables: sub-int kinds widen to `Int`.
    pub fn stack_kind(self) -> Kind {
        match self {
            Kind::Boolean | Kind::Byte | Kind::Short | Kind::Char => Kind::Int,
            _ => self,
        }
    }

    pub fn is_double_word(self) -> bool {
        match self {
            Kind::Long | Kind::Double => true,
            _ => false,
        }
    }

    /// Number of stack slots a value of this kind occupies.
    pub fn slots(self) -> u32 {
        match self {
            Kind::Void | Kind::Illegal => 0,
            Kind::Long | Kind::Double => 2,
            _ => 1,
        }
    }

    pub fn size_in_bytes(self, word_size: u32) -> u32 {
        match self {
            Kind::Boolean | Kind::Byte => 1,
            Kind::Short | Kind::Char => 2,
            Kind::Int | Kind::Float => 4,
            Kind::Long | Kind::Double => 8,
            Kind::Object | Kind::Word => word_size,
            Kind::Void | Kind::Illegal => 0,
        }
    }

    pub fn is_float(self) -> bool {
        match self {
            Kind::Float | Kind::Double => true,
            _ => false,
        }
    }

    pub fn is_int(self) -> bool {
        self.stack_kind() == Kind::Int
    }

    pub fn is_long(self) -> bool {
        self == Kind::Long
    }

    pub fn is_object(self) -> bool {
        self == Kind::Object
    }

    pub fn is_void(self) -> bool {
        self == Kind::Void
    }

    pub fn is_byte_sized(self) -> bool {
        match self {
            Kind::Boolean | Kind::Byte => true,
            _ => false,
        }
    }

    pub fn is_legal(self) -> bool {
        match self {
            Kind::Void | Kind::Illegal => false,
            _ => true,
        }
    }

    pub fn type_char(self) -> char {
        match self {
            Kind::Boolean => 'z',
            Kind::Byte => 'b',
            Kind::Short => 's',
            Kind::Char => 'c',
            Kind::Int => 'i',
            Kind::Float => 'f',
            Kind::Long => 'j',
            Kind::Double => 'd',
            Kind::Object => 'a',
            Kind::Word => 'w',
            Kind::Void => 'v',
            Kind::Illegal => '-',
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.type_char())
    }
}
