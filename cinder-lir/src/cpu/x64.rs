#[cfg(target_arch = "x86_64")]
use lazy_static::lazy_static;

use crate::cpu::{CpuFeatures, FReg, Reg};

#[cfg(target_arch = "x86_64")]
lazy_static! {
    static ref HAS_POPCNT: bool = is_x86_feature_detected!("popcnt");
    static ref HAS_LZCNT: bool = is_x86_feature_detected!("lzcnt");
    static ref HAS_TZCNT: bool = is_x86_feature_detected!("bmi1");
}

#[cfg(target_arch = "x86_64")]
pub fn host_features() -> CpuFeatures {
    CpuFeatures {
        popcnt: *HAS_POPCNT,
        lzcnt: *HAS_LZCNT,
        tzcnt: *HAS_TZCNT,
    }
}

#[cfg(not(target_arch = "x86_64"))]
pub fn host_features() -> CpuFeatures {
    CpuFeatures::none()
}

pub const REG_PARAMS: [Reg; 6] = [RDI, RSI, RDX, RCX, R8, R9];
pub const FREG_PARAMS: [FReg; 8] = [XMM0, XMM1, XMM2, XMM3, XMM4, XMM5, XMM6, XMM7];

pub const REG_RESULT: Reg = RAX;
pub const FREG_RESULT: FReg = XMM0;
pub const REG_SP: Reg = RSP;
pub const REG_FP: Reg = RBP;
pub const REG_THREAD: Reg = R15;

pub const REG_EXCEPTION_OOP: Reg = RAX;
pub const REG_EXCEPTION_PC: Reg = RDX;
pub const REG_OSR_BUFFER: Reg = RDI;

// idiv takes the dividend in rax and leaves the remainder in rdx
pub const REG_DIVIDEND: Reg = RAX;
pub const REG_REMAINDER: Reg = RDX;
pub const REG_SHIFT_COUNT: Reg = RCX;

pub const CALLEE_SAVED_REGS: [Reg; 5] = [RBX, R12, R13, R14, R15];

pub const STACK_FRAME_ALIGNMENT: u32 = 16;

pub const RAX: Reg = Reg(0);
pub const RCX: Reg = Reg(1);
pub const RDX: Reg = Reg(2);
pub const RBX: Reg = Reg(3);
pub const RSP: Reg = Reg(4);
pub const RBP: Reg = Reg(5);
pub const RSI: Reg = Reg(6);
pub const RDI: Reg = Reg(7);

pub const R8: Reg = Reg(8);
pub const R9: Reg = Reg(9);
pub const R10: Reg = Reg(10);
pub const R11: Reg = Reg(11);
pub const R12: Reg = Reg(12);
pub const R13: Reg = Reg(13);
pub const R14: Reg = Reg(14);
pub const R15: Reg = Reg(15);

pub const XMM0: FReg = FReg(0);
pub const XMM1: FReg = FReg(1);
pub const XMM2: FReg = FReg(2);
pub const XMM3: FReg = FReg(3);
pub const XMM4: FReg = FReg(4);
pub const XMM5: FReg = FReg(5);
pub const XMM6: FReg = FReg(6);
pub const XMM7: FReg = FReg(7);
pub const XMM8: FReg = FReg(8);
pub const XMM9: FReg = FReg(9);
pub const XMM10: FReg = FReg(10);
pub const XMM11: FReg = FReg(11);
pub const XMM12: FReg = FReg(12);
pub const XMM13: FReg = FReg(13);
pub const XMM14: FReg = FReg(14);
pub const XMM15: FReg = FReg(15);

const REG_NAMES: [&str; 16] = [
    "rax", "rcx", "rdx", "rbx", "rsp", "rbp", "rsi", "rdi", "r8", "r9", "r10", "r11", "r12",
    "r13", "r14", "r15",
];

impl Reg {
    // these four registers have an addressable low byte without a rex prefix
    pub fn is_basic_reg(self) -> bool {
        self == RAX || self == RBX || self == RCX || self == RDX
    }
}

pub fn reg_name(reg: Reg) -> &'static str {
    REG_NAMES[reg.0 as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_regs() {
        assert!(RAX.is_basic_reg());
        assert!(RDX.is_basic_reg());
        assert!(!RSI.is_basic_reg());
        assert!(!R8.is_basic_reg());
    }

    #[test]
    fn test_reg_name() {
        assert_eq!(reg_name(RDI), "rdi");
        assert_eq!(reg_name(R15), "r15");
    }
}
