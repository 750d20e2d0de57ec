use cinder_hir::{
    ArithOp, CompareOp, Condition, ConvertOp, InstId, InstKind, Kind, LogicOp, RuntimeCall, ShiftOp,
};
use cinder_lir::cpu::x64;
use cinder_lir::{BranchTarget, DebugInfo, LirOp, Operand};

use crate::error::LowerResult;
use crate::item::LirItem;
use crate::reduce::Reduction;
use crate::selector::InstructionSelector;
use crate::stubs::StubKey;

impl<'a> InstructionSelector<'a> {
    pub(super) fn do_arithmetic(
        &mut self,
        id: InstId,
        op: ArithOp,
        x: InstId,
        y: InstId,
        can_trap: bool,
    ) -> LowerResult<()> {
        let kind = self.graph.inst(id).kind.stack_kind();

        match op {
            ArithOp::Rem if kind.is_float() => self.do_float_rem(id, kind, x, y),
            ArithOp::Div | ArithOp::Rem if kind.is_long() => self.do_long_div(id, op, x, y, can_trap),
            ArithOp::Div | ArithOp::Rem if kind.is_int() => self.do_int_div(id, op, x, y, can_trap),

            ArithOp::Mul if kind.is_int() => {
                let reduction = match self.int_constant(y) {
                    Some(constant) => self.reduction.reduce_int_mul(constant),
                    None => None,
                };

                match reduction {
                    Some(reduction) => self.emit_reduced_mul(id, x, reduction),
                    None => self.emit_arith(id, op, x, y),
                }
            }

            _ => self.emit_arith(id, op, x, y),
        }
    }

    /// In two-operand mode the left operand is copied into `result` first
    /// and the op works in place.
    fn two_operand(&mut self, left: Operand, result: &Operand) -> Operand {
        if self.target.two_operand_mode {
            self.lir().move_(left, result.clone());
            result.clone()
        } else {
            left
        }
    }

    fn emit_arith(&mut self, id: InstId, op: ArithOp, x: InstId, y: InstId) -> LowerResult<()> {
        let (x, y) = if op.is_commutative() && self.is_constant(x) && !self.is_constant(y) {
            (y, x)
        } else {
            (x, y)
        };

        let mut left = LirItem::new(self, x)?;
        let mut right = LirItem::new(self, y)?;
        left.load_item(self)?;

        if right.kind().is_float() {
            right.load_item(self)?;
        } else {
            right.load_nonconstant(self)?;
        }

        let result = self.result_variable(id)?;
        let x = self.two_operand(left.result(), &result);

        self.append(LirOp::Arith {
            op,
            x,
            y: right.result(),
            result,
            tmp: Operand::Illegal,
            info: None,
        });
        Ok(())
    }

    fn emit_reduced_mul(&mut self, id: InstId, x: InstId, reduction: Reduction) -> LowerResult<()> {
        let mut left = LirItem::new(self, x)?;
        left.load_item(self)?;
        let value = left.result();
        let result = self.result_variable(id)?;

        let (shift, op) = match reduction {
            Reduction::Shift(shift) => {
                let x = self.two_operand(value, &result);
                self.append(LirOp::Shift {
                    op: ShiftOp::Shl,
                    x,
                    count: Operand::int(shift as i32),
                    result,
                });
                return Ok(());
            }
            Reduction::ShiftAdd(shift) => (shift, ArithOp::Add),
            Reduction::ShiftSub(shift) => (shift, ArithOp::Sub),
        };

        let tmp = self.new_variable(Kind::Int)?;
        let shifted = self.two_operand(value.clone(), &tmp);
        self.append(LirOp::Shift {
            op: ShiftOp::Shl,
            x: shifted,
            count: Operand::int(shift as i32),
            result: tmp.clone(),
        });

        let x = self.two_operand(tmp, &result);
        self.append(LirOp::Arith {
            op,
            x,
            y: value,
            result,
            tmp: Operand::Illegal,
            info: None,
        });
        Ok(())
    }

    fn do_float_rem(&mut self, id: InstId, kind: Kind, x: InstId, y: InstId) -> LowerResult<()> {
        let call = if kind == Kind::Float {
            RuntimeCall::ArithmeticFrem
        } else {
            RuntimeCall::ArithmeticDrem
        };

        let left = self.operand(x)?;
        let right = self.operand(y)?;
        let result = self.emit_runtime_call(call, vec![left, right], None)?;
        self.set_result(id, result);
        Ok(())
    }

    fn do_long_div(&mut self, id: InstId, op: ArithOp, x: InstId, y: InstId, can_trap: bool) -> LowerResult<()> {
        let info = self.info_before(id)?;
        let left = LirItem::new(self, x)?;
        let mut right = LirItem::new(self, y)?;
        right.load_item(self)?;

        if can_trap && self.flags.gen_explicit_div_zero_checks && !self.is_nonzero_constant(y) {
            self.div_zero_check(Kind::Long, right.result(), info.clone());
        }

        let call = if op == ArithOp::Div {
            RuntimeCall::ArithmeticLdiv
        } else {
            RuntimeCall::ArithmeticLrem
        };

        let result = self.emit_runtime_call(call, vec![left.result(), right.result()], info)?;
        self.set_result(id, result);
        Ok(())
    }

    fn do_int_div(&mut self, id: InstId, op: ArithOp, x: InstId, y: InstId, can_trap: bool) -> LowerResult<()> {
        let info = self.info_before(id)?;
        let mut left = LirItem::new(self, x)?;
        let mut right = LirItem::new(self, y)?;
        right.load_item(self)?;

        // division by zero does not trap on arm64
        let explicit_check = self.flags.gen_explicit_div_zero_checks || self.target.is_arm64();

        if can_trap && explicit_check && !self.is_nonzero_constant(y) {
            self.div_zero_check(Kind::Int, right.result(), info.clone());
        }

        if self.target.is_x64() {
            let dividend = Operand::register(x64::REG_DIVIDEND, Kind::Int);
            let remainder = Operand::register(x64::REG_REMAINDER, Kind::Int);
            left.load_item_force(self, dividend.clone())?;

            let produced = if op == ArithOp::Div {
                dividend.clone()
            } else {
                remainder.clone()
            };

            self.append(LirOp::Arith {
                op,
                x: dividend,
                y: right.result(),
                result: produced.clone(),
                tmp: remainder,
                info,
            });

            let result = self.result_variable(id)?;
            self.lir().move_(produced, result);
        } else {
            left.load_item(self)?;

            let tmp = if op == ArithOp::Rem {
                self.new_variable(Kind::Int)?
            } else {
                Operand::Illegal
            };

            let result = self.result_variable(id)?;
            self.append(LirOp::Arith {
                op,
                x: left.result(),
                y: right.result(),
                result,
                tmp,
                info,
            });
        }

        Ok(())
    }

    fn div_zero_check(&mut self, kind: Kind, divisor: Operand, info: Option<DebugInfo>) {
        let info = match info {
            Some(info) => info,
            None => return,
        };

        let stub = self
            .stubs
            .stub_for(StubKey::Runtime(RuntimeCall::ThrowDivisionByZero));
        self.frame_map.uses_stub(stub);

        let zero = if kind.is_long() {
            Operand::long(0)
        } else {
            Operand::int(0)
        };

        self.lir().cmp(Condition::Eq, divisor, zero);
        self.append(LirOp::Branch {
            cond: Condition::Eq,
            kind,
            target: BranchTarget::Stub(stub),
            unordered: None,
            info: Some(info),
        });
    }

    pub(super) fn do_negate(&mut self, id: InstId, x: InstId) -> LowerResult<()> {
        let mut value = LirItem::new(self, x)?;
        value.load_item(self)?;
        let result = self.result_variable(id)?;
        let x = self.two_operand(value.result(), &result);
        self.append(LirOp::Negate { x, result });
        Ok(())
    }

    pub(super) fn do_shift(&mut self, id: InstId, op: ShiftOp, x: InstId, y: InstId) -> LowerResult<()> {
        let kind = self.graph.inst(id).kind.stack_kind();
        let mut value = LirItem::new(self, x)?;
        let mut count = LirItem::new(self, y)?;
        value.load_item(self)?;

        let mask = if kind.is_long() { 63 } else { 31 };
        let constant = self.int_constant(y);

        let count = match constant {
            Some(constant) if self.target.is_arm64() || kind.is_int() => Operand::int(constant & mask),
            _ if self.target.is_x64() => {
                count.load_item_force(self, Operand::register(x64::REG_SHIFT_COUNT, Kind::Int))?;
                count.result()
            }
            _ => {
                count.load_item(self)?;
                count.result()
            }
        };

        let result = self.result_variable(id)?;
        let x = self.two_operand(value.result(), &result);
        self.append(LirOp::Shift {
            op,
            x,
            count,
            result,
        });
        Ok(())
    }

    pub(super) fn do_logic(&mut self, id: InstId, op: LogicOp, x: InstId, y: InstId) -> LowerResult<()> {
        let (x, y) = if self.is_constant(x) && !self.is_constant(y) {
            (y, x)
        } else {
            (x, y)
        };

        let mut left = LirItem::new(self, x)?;
        let mut right = LirItem::new(self, y)?;
        left.load_item(self)?;
        right.load_nonconstant(self)?;

        let result = self.result_variable(id)?;
        let x = self.two_operand(left.result(), &result);
        self.append(LirOp::Logic {
            op,
            x,
            y: right.result(),
            result,
        });
        Ok(())
    }

    pub(super) fn do_compare(&mut self, id: InstId, op: CompareOp, x: InstId, y: InstId) -> LowerResult<()> {
        let mut left = LirItem::new(self, x)?;
        let mut right = LirItem::new(self, y)?;
        left.load_item(self)?;
        right.load_item(self)?;

        let result = self.result_variable(id)?;
        self.append(LirOp::CompareToInt {
            op,
            x: left.result(),
            y: right.result(),
            result,
        });
        Ok(())
    }

    pub(super) fn do_convert(&mut self, id: InstId, op: ConvertOp, value: InstId) -> LowerResult<()> {
        let mut item = LirItem::new(self, value)?;

        if op == ConvertOp::I2B {
            item.load_byte_item(self)?;
        } else {
            item.load_item(self)?;
        }

        let result = self.new_variable(op.to_kind())?;
        self.set_result(id, result.clone());
        self.append(LirOp::Convert {
            op,
            src: item.result(),
            result,
        });
        Ok(())
    }

    pub(super) fn do_if_op(
        &mut self,
        id: InstId,
        x: InstId,
        y: InstId,
        cond: Condition,
        tval: InstId,
        fval: InstId,
    ) -> LowerResult<()> {
        let mut left = LirItem::new(self, x)?;
        let mut right = LirItem::new(self, y)?;
        let mut tval = LirItem::new(self, tval)?;
        let mut fval = LirItem::new(self, fval)?;

        left.load_item(self)?;
        right.load_nonconstant(self)?;
        tval.load_nonconstant(self)?;
        fval.load_nonconstant(self)?;

        self.lir().cmp(cond, left.result(), right.result());

        let result = self.result_variable(id)?;
        self.append(LirOp::CondMove {
            cond,
            tval: tval.result(),
            fval: fval.result(),
            result,
        });
        Ok(())
    }

    fn is_constant(&self, inst: InstId) -> bool {
        matches!(self.graph.inst(inst).op, InstKind::Constant(_))
    }

    fn is_nonzero_constant(&self, inst: InstId) -> bool {
        match self.graph.inst(inst).op {
            InstKind::Constant(value) => !value.is_default_value(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::tests::with_selector;
    use cinder_hir::BlockId;
    use cinder_lir::{CallKind, Target};

    fn ops_after_entry(sel: &mut InstructionSelector) -> Vec<LirOp> {
        sel.lower_instructions(BlockId(0)).unwrap();
        sel.lir().ops().to_vec()
    }

    #[test]
    fn test_int_div_uses_fixed_registers() {
        with_selector(
            Target::x64(),
            |b| {
                let (p0, p1) = (b.param(0), b.param(1));
                vec![b.arith(ArithOp::Div, p0, p1), b.arith(ArithOp::Rem, p0, p1)]
            },
            |sel, insts| {
                let ops = ops_after_entry(sel);
                let rax = Operand::register(x64::RAX, Kind::Int);
                let rdx = Operand::register(x64::RDX, Kind::Int);

                let divs: Vec<&LirOp> = ops
                    .iter()
                    .filter(|op| matches!(op, LirOp::Arith { .. }))
                    .collect();
                assert_eq!(divs.len(), 2);

                match divs[0] {
                    LirOp::Arith { x, result, tmp, info, .. } => {
                        assert_eq!(*x, rax);
                        assert_eq!(*result, rax);
                        assert_eq!(*tmp, rdx);
                        assert!(info.is_some());
                    }
                    _ => unreachable!(),
                }
                match divs[1] {
                    LirOp::Arith { result, .. } => assert_eq!(*result, rdx),
                    _ => unreachable!(),
                }

                assert!(sel.operand(insts[0]).unwrap().is_variable());
                assert!(sel.operand(insts[1]).unwrap().is_variable());
            },
        );
    }

    #[test]
    fn test_arm64_div_checks_zero() {
        with_selector(
            Target::arm64(),
            |b| {
                let (p0, p1) = (b.param(0), b.param(1));
                vec![b.arith(ArithOp::Div, p0, p1)]
            },
            |sel, _| {
                let ops = ops_after_entry(sel);
                let stub = sel
                    .stubs
                    .find(StubKey::Runtime(RuntimeCall::ThrowDivisionByZero))
                    .unwrap();

                assert!(ops.iter().any(|op| matches!(
                    op,
                    LirOp::Branch {
                        target: BranchTarget::Stub(target),
                        info: Some(_),
                        ..
                    } if *target == stub
                )));
                assert!(sel.frame_map.used_stubs().contains(&stub));
            },
        );
    }

    #[test]
    fn test_long_div_is_runtime_call() {
        with_selector(
            Target::x64(),
            |b| {
                let (p0, p1) = (b.param(0), b.param(1));
                let x = b.append(
                    Kind::Long,
                    InstKind::Convert {
                        op: ConvertOp::I2L,
                        value: p0,
                    },
                );
                let y = b.append(
                    Kind::Long,
                    InstKind::Convert {
                        op: ConvertOp::I2L,
                        value: p1,
                    },
                );
                vec![b.arith(ArithOp::Rem, x, y)]
            },
            |sel, insts| {
                let ops = ops_after_entry(sel);
                let call = ops
                    .iter()
                    .find_map(|op| match op {
                        LirOp::Call(call) => Some(call.clone()),
                        _ => None,
                    })
                    .unwrap();

                assert_eq!(call.kind, CallKind::Runtime(RuntimeCall::ArithmeticLrem));
                assert!(call.info.is_some());
                assert_eq!(call.result, Operand::register(x64::RAX, Kind::Long));
                assert_eq!(sel.operand(insts[0]).unwrap().kind(), Kind::Long);
            },
        );
    }

    #[test]
    fn test_mul_by_constant_is_reduced() {
        with_selector(
            Target::arm64(),
            |b| {
                let p0 = b.param(0);
                let eight = b.int(8);
                let nine = b.int(9);
                let ten = b.int(10);
                vec![
                    b.arith(ArithOp::Mul, p0, eight),
                    b.arith(ArithOp::Mul, p0, nine),
                    b.arith(ArithOp::Mul, p0, ten),
                ]
            },
            |sel, _| {
                let ops = ops_after_entry(sel);
                let shifts: Vec<&LirOp> = ops
                    .iter()
                    .filter(|op| matches!(op, LirOp::Shift { .. }))
                    .collect();
                let ariths: Vec<ArithOp> = ops
                    .iter()
                    .filter_map(|op| match op {
                        LirOp::Arith { op, .. } => Some(*op),
                        _ => None,
                    })
                    .collect();

                assert_eq!(shifts.len(), 2);
                match shifts[0] {
                    LirOp::Shift { count, .. } => assert_eq!(*count, Operand::int(3)),
                    _ => unreachable!(),
                }
                assert_eq!(ariths, vec![ArithOp::Add, ArithOp::Mul]);
            },
        );
    }

    #[test]
    fn test_two_operand_mode_copies_left() {
        with_selector(
            Target::x64(),
            |b| {
                let (p0, p1) = (b.param(0), b.param(1));
                vec![b.arith(ArithOp::Sub, p0, p1)]
            },
            |sel, insts| {
                let ops = ops_after_entry(sel);
                let result = sel.operand(insts[0]).unwrap();
                let pos = ops
                    .iter()
                    .position(|op| matches!(op, LirOp::Arith { .. }))
                    .unwrap();

                match (&ops[pos - 1], &ops[pos]) {
                    (LirOp::Move { dst, .. }, LirOp::Arith { x, result: res, .. }) => {
                        assert_eq!(*dst, result);
                        assert_eq!(*x, result);
                        assert_eq!(*res, result);
                    }
                    ops => panic!("unexpected {:?}", ops),
                }
            },
        );
    }

    #[test]
    fn test_x64_shift_count_in_rcx() {
        with_selector(
            Target::x64(),
            |b| {
                let (p0, p1) = (b.param(0), b.param(1));
                let masked = b.int(34);
                let variable = b.append(
                    Kind::Int,
                    InstKind::Shift {
                        op: ShiftOp::Shl,
                        x: p0,
                        y: p1,
                    },
                );
                let constant = b.append(
                    Kind::Int,
                    InstKind::Shift {
                        op: ShiftOp::Shr,
                        x: p0,
                        y: masked,
                    },
                );
                vec![variable, constant]
            },
            |sel, _| {
                let ops = ops_after_entry(sel);
                let counts: Vec<Operand> = ops
                    .iter()
                    .filter_map(|op| match op {
                        LirOp::Shift { count, .. } => Some(count.clone()),
                        _ => None,
                    })
                    .collect();

                assert_eq!(
                    counts,
                    vec![Operand::register(x64::RCX, Kind::Int), Operand::int(2)]
                );
            },
        );
    }
}
