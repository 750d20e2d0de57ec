use crate::cpu::{FReg, Reg};

pub const REG_PARAMS: [Reg; 8] = [R0, R1, R2, R3, R4, R5, R6, R7];
pub const FREG_PARAMS: [FReg; 8] = [F0, F1, F2, F3, F4, F5, F6, F7];
pub const SCRATCH: [Reg; 2] = [R16, R17];

pub const REG_RESULT: Reg = R0;
pub const FREG_RESULT: FReg = F0;
pub const REG_THREAD: Reg = R28;
pub const REG_FP: Reg = R29;
pub const REG_LR: Reg = R30;
pub const REG_SP: Reg = Reg(32);

pub const REG_EXCEPTION_OOP: Reg = R0;
pub const REG_EXCEPTION_PC: Reg = R3;
pub const REG_OSR_BUFFER: Reg = R0;

pub const CALLEE_SAVED_REGS: [Reg; 10] = [R19, R20, R21, R22, R23, R24, R25, R26, R27, R28];

pub const STACK_FRAME_ALIGNMENT: u32 = 16;

pub const R0: Reg = Reg(0);
pub const R1: Reg = Reg(1);
pub const R2: Reg = Reg(2);
pub const R3: Reg = Reg(3);
pub const R4: Reg = Reg(4);
pub const R5: Reg = Reg(5);
pub const R6: Reg = Reg(6);
pub const R7: Reg = Reg(7);
pub const R8: Reg = Reg(8);
pub const R9: Reg = Reg(9);
pub const R10: Reg = Reg(10);
pub const R11: Reg = Reg(11);
pub const R12: Reg = Reg(12);
pub const R13: Reg = Reg(13);
pub const R14: Reg = Reg(14);
pub const R15: Reg = Reg(15);
pub const R16: Reg = Reg(16);
pub const R17: Reg = Reg(17);
pub const R18: Reg = Reg(18);
pub const R19: Reg = Reg(19);
pub const R20: Reg = Reg(20);
pub const R21: Reg = Reg(21);
pub const R22: Reg = Reg(22);
pub const R23: Reg = Reg(23);
pub const R24: Reg = Reg(24);
pub const R25: Reg = Reg(25);
pub const R26: Reg = Reg(26);
pub const R27: Reg = Reg(27);
pub const R28: Reg = Reg(28);
pub const R29: Reg = Reg(29);
pub const R30: Reg = Reg(30);

pub const F0: FReg = FReg(0);
pub const F1: FReg = FReg(1);
pub const F2: FReg = FReg(2);
pub const F3: FReg = FReg(3);
pub const F4: FReg = FReg(4);
pub const F5: FReg = FReg(5);
pub const F6: FReg = FReg(6);
pub const F7: FReg = FReg(7);

impl Reg {
    pub fn is_gpr(self) -> bool {
        self.0 <= 30
    }
}

/// Whether `value` fits the unsigned 12-bit immediate of add/sub/cmp.
pub fn fits_imm12(value: i64) -> bool {
    0 <= value && value < (1 << 12)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imm12() {
        assert!(fits_imm12(0));
        assert!(fits_imm12(4095));
        assert!(!fits_imm12(4096));
        assert!(!fits_imm12(-1));
    }

    #[test]
    fn test_gpr() {
        assert!(R30.is_gpr());
        assert!(!REG_SP.is_gpr());
    }
}
