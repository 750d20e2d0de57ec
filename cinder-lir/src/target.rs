use std::fmt;

use cinder_hir::{ConstValue, Kind};

use crate::cpu::{arm64, x64, CpuFeatures, FReg, Reg, Register};
use crate::operand::{Operand, StackSlot};

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Arch {
    X64,
    Arm64,
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Arch::X64 => write!(f, "x64"),
            Arch::Arm64 => write!(f, "arm64"),
        }
    }
}

/// Properties of the machine that code is generated for.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Target {
    pub arch: Arch,
    pub word_size: u32,
    /// Arithmetic overwrites its left operand.
    pub two_operand_mode: bool,
    /// Byte stores and byte compare-and-swap need one of the byte addressable registers.
    pub needs_byte_registers: bool,
    /// Addresses may carry a scaled index.
    pub scaled_index: bool,
    /// Memory barriers are only required on multiprocessors.
    pub is_mp: bool,
    pub stack_alignment: u32,
    pub features: CpuFeatures,
}

impl Target {
    pub fn x64() -> Target {
        Target {
            arch: Arch::X64,
            word_size: 8,
            two_operand_mode: true,
            needs_byte_registers: true,
            scaled_index: true,
            is_mp: true,
            stack_alignment: x64::STACK_FRAME_ALIGNMENT,
            features: CpuFeatures::all(),
        }
    }

    pub fn arm64() -> Target {
        Target {
            arch: Arch::Arm64,
            word_size: 8,
            two_operand_mode: false,
            needs_byte_registers: false,
            scaled_index: false,
            is_mp: true,
            stack_alignment: arm64::STACK_FRAME_ALIGNMENT,
            features: CpuFeatures::all(),
        }
    }

    #[cfg(target_arch = "aarch64")]
    pub fn host() -> Target {
        Target::arm64()
    }

    #[cfg(not(target_arch = "aarch64"))]
    pub fn host() -> Target {
        Target {
            features: x64::host_features(),
            ..Target::x64()
        }
    }

    pub fn is_x64(&self) -> bool {
        self.arch == Arch::X64
    }

    pub fn is_arm64(&self) -> bool {
        self.arch == Arch::Arm64
    }

    fn reg_params(&self) -> &'static [Reg] {
        match self.arch {
            Arch::X64 => &x64::REG_PARAMS,
            Arch::Arm64 => &arm64::REG_PARAMS,
        }
    }

    fn freg_params(&self) -> &'static [FReg] {
        match self.arch {
            Arch::X64 => &x64::FREG_PARAMS,
            Arch::Arm64 => &arm64::FREG_PARAMS,
        }
    }

    pub fn return_register(&self, kind: Kind) -> Operand {
        let kind = kind.stack_kind();
        let reg: Register = match (self.arch, kind.is_float()) {
            (Arch::X64, false) => x64::REG_RESULT.into(),
            (Arch::X64, true) => x64::FREG_RESULT.into(),
            (Arch::Arm64, false) => arm64::REG_RESULT.into(),
            (Arch::Arm64, true) => arm64::FREG_RESULT.into(),
        };
        Operand::Register(reg, kind)
    }

    pub fn exception_oop(&self) -> Operand {
        match self.arch {
            Arch::X64 => Operand::register(x64::REG_EXCEPTION_OOP, Kind::Object),
            Arch::Arm64 => Operand::register(arm64::REG_EXCEPTION_OOP, Kind::Object),
        }
    }

    /// Register holding the interpreter frame buffer at an OSR entry.
    pub fn osr_buffer(&self) -> Operand {
        match self.arch {
            Arch::X64 => Operand::register(x64::REG_OSR_BUFFER, Kind::Word),
            Arch::Arm64 => Operand::register(arm64::REG_OSR_BUFFER, Kind::Word),
        }
    }

    pub fn exception_pc(&self) -> Operand {
        match self.arch {
            Arch::X64 => Operand::register(x64::REG_EXCEPTION_PC, Kind::Word),
            Arch::Arm64 => Operand::register(arm64::REG_EXCEPTION_PC, Kind::Word),
        }
    }

    pub fn thread_register(&self) -> Operand {
        match self.arch {
            Arch::X64 => Operand::register(x64::REG_THREAD, Kind::Object),
            Arch::Arm64 => Operand::register(arm64::REG_THREAD, Kind::Object),
        }
    }

    pub fn is_byte_register(&self, reg: Register) -> bool {
        match (self.arch, reg) {
            (Arch::X64, Register::Cpu(reg)) => reg.is_basic_reg(),
            (Arch::X64, Register::Fpu(_)) => false,
            (Arch::Arm64, _) => true,
        }
    }

    pub fn register_name(&self, reg: Register) -> String {
        match (self.arch, reg) {
            (Arch::X64, Register::Cpu(reg)) => x64::reg_name(reg).into(),
            (Arch::X64, Register::Fpu(reg)) => format!("xmm{}", reg.0),
            (Arch::Arm64, Register::Cpu(reg)) => format!("x{}", reg.0),
            (Arch::Arm64, Register::Fpu(reg)) => format!("d{}", reg.0),
        }
    }

    /// Whether `value` can be an operand of arithmetic and compares as is.
    pub fn can_inline_constant(&self, value: ConstValue) -> bool {
        match self.arch {
            Arch::X64 => match value {
                ConstValue::Long(_) => false,
                ConstValue::Object(_) => false,
                _ => true,
            },
            Arch::Arm64 => match value {
                ConstValue::Int(value) => arm64::fits_imm12(value as i64),
                ConstValue::Null => true,
                _ => false,
            },
        }
    }

    /// Whether `value` can be stored to memory of kind `kind` without a register.
    pub fn can_store_as_constant(&self, value: ConstValue, kind: Kind) -> bool {
        match self.arch {
            Arch::X64 => {
                if kind == Kind::Short || kind == Kind::Char {
                    return false;
                }
                self.can_inline_constant(value)
            }
            Arch::Arm64 => value.is_default_value(),
        }
    }

    pub fn calling_convention(&self, ty: CallingConventionType, kinds: &[Kind]) -> CallingConvention {
        let reg_params = self.reg_params();
        let freg_params = self.freg_params();

        let mut reg_idx = 0;
        let mut freg_idx = 0;
        let mut sp_offset = 0;
        let mut locations = Vec::with_capacity(kinds.len());

        for &kind in kinds {
            let kind = kind.stack_kind();

            if kind.is_float() && freg_idx < freg_params.len() {
                locations.push(Operand::register(freg_params[freg_idx], kind));
                freg_idx += 1;
            } else if !kind.is_float() && reg_idx < reg_params.len() {
                locations.push(Operand::register(reg_params[reg_idx], kind));
                reg_idx += 1;
            } else {
                locations.push(Operand::StackSlot(StackSlot {
                    offset: sp_offset,
                    kind,
                    in_caller_frame: ty == CallingConventionType::JavaCallee,
                }));
                sp_offset += self.word_size as i32;
            }
        }

        CallingConvention {
            locations,
            stack_size: sp_offset as u32,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CallingConventionType {
    /// Outgoing arguments of a compiled call.
    JavaCall,
    /// Incoming arguments of the method being compiled.
    JavaCallee,
    RuntimeCall,
    NativeCall,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CallingConvention {
    pub locations: Vec<Operand>,
    /// Bytes of stack arguments.
    pub stack_size: u32,
}

impl CallingConvention {
    pub fn register_arguments(&self) -> impl Iterator<Item = &Operand> {
        self.locations.iter().filter(|loc| loc.is_register())
    }
}
