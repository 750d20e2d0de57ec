use std::fmt;

pub mod arm64;
pub mod x64;

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct Reg(pub u8);

impl From<Reg> for u32 {
    fn from(reg: Reg) -> u32 {
        reg.0 as u32
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct FReg(pub u8);

impl From<FReg> for u32 {
    fn from(reg: FReg) -> u32 {
        reg.0 as u32
    }
}

/// A physical register of either register class.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Register {
    Cpu(Reg),
    Fpu(FReg),
}

impl Register {
    pub fn is_cpu(self) -> bool {
        match self {
            Register::Cpu(_) => true,
            Register::Fpu(_) => false,
        }
    }

    pub fn is_fpu(self) -> bool {
        !self.is_cpu()
    }

    pub fn number(self) -> u8 {
        match self {
            Register::Cpu(reg) => reg.0,
            Register::Fpu(reg) => reg.0,
        }
    }
}

impl From<Reg> for Register {
    fn from(reg: Reg) -> Register {
        Register::Cpu(reg)
    }
}

impl From<FReg> for Register {
    fn from(reg: FReg) -> Register {
        Register::Fpu(reg)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Register::Cpu(reg) => write!(f, "r{}", reg.0),
            Register::Fpu(reg) => write!(f, "f{}", reg.0),
        }
    }
}

/// Host cpu features relevant for instruction selection.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct CpuFeatures {
    pub popcnt: bool,
    pub lzcnt: bool,
    pub tzcnt: bool,
}

impl CpuFeatures {
    pub fn all() -> CpuFeatures {
        CpuFeatures {
            popcnt: true,
            lzcnt: true,
            tzcnt: true,
        }
    }

    pub fn none() -> CpuFeatures {
        CpuFeatures {
            popcnt: false,
            lzcnt: false,
            tzcnt: false,
        }
    }
}
