use cinder_hir::{Condition, InstId, Intrinsic, Kind, RuntimeCall};
use cinder_lir::cpu::x64;
use cinder_lir::{Address, BitOp, LirOp, MathFunction, Operand, Scale};

use crate::error::{Bailout, LowerResult};
use crate::item::LirItem;
use crate::selector::InstructionSelector;
use crate::templates::XirArgument;

fn arity(intrinsic: Intrinsic) -> usize {
    match intrinsic {
        Intrinsic::CurrentThread => 0,
        Intrinsic::CompareAndSwapInt | Intrinsic::CompareAndSwapLong | Intrinsic::CompareAndSwapObject => 4,
        Intrinsic::ArrayCopy => 5,
        _ => 1,
    }
}

impl<'a> InstructionSelector<'a> {
    pub(super) fn do_intrinsic(&mut self, id: InstId, intrinsic: Intrinsic, args: &[InstId]) -> LowerResult<()> {
        if args.len() != arity(intrinsic) {
            return Err(Bailout::UnresolvedPattern(format!(
                "intrinsic {} with {} arguments",
                intrinsic.name(),
                args.len()
            )));
        }

        match intrinsic {
            Intrinsic::MathSqrt => self.math_op(id, MathFunction::Sqrt, args[0]),
            Intrinsic::MathAbs => self.math_op(id, MathFunction::Abs, args[0]),
            Intrinsic::MathSin => self.math_call(id, RuntimeCall::ArithmeticSin, args[0]),
            Intrinsic::MathCos => self.math_call(id, RuntimeCall::ArithmeticCos, args[0]),
            Intrinsic::MathTan => self.math_call(id, RuntimeCall::ArithmeticTan, args[0]),
            Intrinsic::MathLog => self.math_call(id, RuntimeCall::ArithmeticLog, args[0]),
            Intrinsic::MathLog10 => self.math_call(id, RuntimeCall::ArithmeticLog10, args[0]),
            Intrinsic::CompareAndSwapInt => self.compare_and_swap(id, Kind::Int, args),
            Intrinsic::CompareAndSwapLong => self.compare_and_swap(id, Kind::Long, args),
            Intrinsic::CompareAndSwapObject => self.compare_and_swap(id, Kind::Object, args),
            Intrinsic::CurrentThread => {
                let thread = self.target.thread_register();
                let var = self.result_variable(id)?;
                self.lir().move_(thread, var);
                Ok(())
            }
            Intrinsic::ArrayCopy => {
                let info = self.info_before(id)?;
                let mut operands = Vec::with_capacity(args.len());
                for &arg in args {
                    operands.push(self.operand(arg)?);
                }
                self.emit_runtime_call(RuntimeCall::ArrayCopy, operands, info)?;
                Ok(())
            }
            Intrinsic::IntBitCount | Intrinsic::LongBitCount => {
                self.bit_op(id, intrinsic, BitOp::PopCount, args[0])
            }
            Intrinsic::IntLeadingZeros | Intrinsic::LongLeadingZeros => {
                self.bit_op(id, intrinsic, BitOp::LeadingZeros, args[0])
            }
            Intrinsic::IntTrailingZeros | Intrinsic::LongTrailingZeros => {
                self.bit_op(id, intrinsic, BitOp::TrailingZeros, args[0])
            }
        }
    }

    fn math_op(&mut self, id: InstId, function: MathFunction, value: InstId) -> LowerResult<()> {
        let mut x = LirItem::new(self, value)?;
        x.load_item(self)?;
        let result = self.result_variable(id)?;
        self.append(LirOp::MathOp {
            function,
            x: x.result(),
            result,
        });
        Ok(())
    }

    fn math_call(&mut self, id: InstId, call: RuntimeCall, value: InstId) -> LowerResult<()> {
        let x = self.operand(value)?;
        let result = self.emit_runtime_call(call, vec![x], None)?;
        self.set_result(id, result);
        Ok(())
    }

    fn bit_op(&mut self, id: InstId, intrinsic: Intrinsic, op: BitOp, value: InstId) -> LowerResult<()> {
        let features = self.target.features;
        let supported = self.target.is_arm64()
            || match op {
                BitOp::PopCount => features.popcnt,
                BitOp::LeadingZeros => features.lzcnt,
                BitOp::TrailingZeros => features.tzcnt,
            };

        if !supported {
            return Err(Bailout::UnsupportedIntrinsic(intrinsic.name()));
        }

        let mut x = LirItem::new(self, value)?;
        x.load_item(self)?;
        let result = self.result_variable(id)?;
        self.append(LirOp::BitOp {
            op,
            x: x.result(),
            result,
        });
        Ok(())
    }

    /// `args` are object, offset, expected and new value. The result is 1
    /// when the swap happened.
    fn compare_and_swap(&mut self, id: InstId, kind: Kind, args: &[InstId]) -> LowerResult<()> {
        let mut object = LirItem::new(self, args[0])?;
        let mut offset = LirItem::new(self, args[1])?;
        let mut expected = LirItem::new(self, args[2])?;
        let mut new_value = LirItem::new(self, args[3])?;

        object.load_item(self)?;
        offset.load_item(self)?;
        new_value.load_item(self)?;

        if self.target.is_x64() {
            expected.load_item_force(self, Operand::register(x64::RAX, kind))?;
        } else {
            expected.load_item(self)?;
        }

        let tmp1 = self.new_variable(Kind::Word)?;
        let tmp2 = if self.target.is_x64() {
            Operand::Illegal
        } else {
            self.new_variable(Kind::Int)?
        };

        let address = Address::indexed(object.result(), offset.result(), Scale::Times1, 0, kind);
        self.append(LirOp::CompareAndSwap {
            address,
            expected: expected.result(),
            new_value: new_value.result(),
            tmp1,
            tmp2,
        });

        let result = self.result_variable(id)?;
        self.append(LirOp::CondMove {
            cond: Condition::Eq,
            tval: Operand::int(1),
            fval: Operand::int(0),
            result,
        });

        if kind.is_object() {
            self.write_barrier(XirArgument::Operand(object.result()))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::tests::{static_method, with_program};
    use cinder_hir::{BlockId, GraphBuilder, InstKind, Program};
    use cinder_lir::cpu::arm64;
    use cinder_lir::{CallKind, CpuFeatures, Target};

    fn lower_intrinsic<B>(
        target: Target,
        params: Vec<Kind>,
        intrinsic: Intrinsic,
        args: B,
    ) -> Result<Vec<LirOp>, Bailout>
    where
        B: FnOnce(&mut GraphBuilder) -> Vec<InstId>,
    {
        let mut program = Program::new();
        let method = static_method(&mut program, params, Kind::Void);
        let mut result = None;

        with_program(
            target,
            &program,
            method,
            |b| {
                let args = args(b);
                b.append(
                    intrinsic.result_kind().stack_kind(),
                    InstKind::Intrinsic { intrinsic, args },
                );
                Vec::new()
            },
            |sel, _| {
                result = Some(sel.lower_instructions(BlockId(0)).map(|_| sel.lir().ops().to_vec()));
            },
        );

        result.unwrap()
    }

    fn params(b: &mut GraphBuilder, count: usize) -> Vec<InstId> {
        (0..count).map(|idx| b.param(idx)).collect()
    }

    #[test]
    fn test_sqrt_is_an_op() {
        let ops = lower_intrinsic(Target::x64(), vec![Kind::Double], Intrinsic::MathSqrt, |b| params(b, 1)).unwrap();

        assert!(ops.iter().any(|op| matches!(
            op,
            LirOp::MathOp {
                function: MathFunction::Sqrt,
                ..
            }
        )));
        assert!(!ops.iter().any(|op| matches!(op, LirOp::Call(_))));
    }

    #[test]
    fn test_log_is_a_runtime_call() {
        let ops = lower_intrinsic(Target::arm64(), vec![Kind::Double], Intrinsic::MathLog, |b| params(b, 1)).unwrap();

        let call = ops
            .iter()
            .find_map(|op| match op {
                LirOp::Call(call) => Some(call.clone()),
                _ => None,
            })
            .unwrap();

        assert_eq!(call.kind, CallKind::Runtime(RuntimeCall::ArithmeticLog));
        assert_eq!(call.result, Operand::register(arm64::F0, Kind::Double));
    }

    #[test]
    fn test_compare_and_swap_on_x64() {
        let ops = lower_intrinsic(
            Target::x64(),
            vec![Kind::Object, Kind::Long, Kind::Int, Kind::Int],
            Intrinsic::CompareAndSwapInt,
            |b| params(b, 4),
        )
        .unwrap();

        let pos = ops
            .iter()
            .position(|op| matches!(op, LirOp::CompareAndSwap { .. }))
            .unwrap();

        match (&ops[pos], &ops[pos + 1]) {
            (
                LirOp::CompareAndSwap {
                    address,
                    expected,
                    tmp1,
                    tmp2,
                    ..
                },
                LirOp::CondMove {
                    cond: Condition::Eq,
                    tval,
                    fval,
                    ..
                },
            ) => {
                assert_eq!(*expected, Operand::register(x64::RAX, Kind::Int));
                assert_eq!(address.kind, Kind::Int);
                assert_eq!(tmp1.kind(), Kind::Word);
                assert!(tmp2.is_illegal());
                assert_eq!(*tval, Operand::int(1));
                assert_eq!(*fval, Operand::int(0));
            }
            ops => panic!("unexpected {:?}", ops),
        }
    }

    #[test]
    fn test_compare_and_swap_on_arm64_needs_two_temps() {
        let ops = lower_intrinsic(
            Target::arm64(),
            vec![Kind::Object, Kind::Long, Kind::Long, Kind::Long],
            Intrinsic::CompareAndSwapLong,
            |b| params(b, 4),
        )
        .unwrap();

        match ops.iter().find(|op| matches!(op, LirOp::CompareAndSwap { .. })) {
            Some(LirOp::CompareAndSwap { expected, tmp2, .. }) => {
                assert!(expected.is_variable());
                assert_eq!(tmp2.kind(), Kind::Int);
            }
            op => panic!("unexpected {:?}", op),
        }
    }

    #[test]
    fn test_current_thread_reads_thread_register() {
        let ops = lower_intrinsic(Target::x64(), Vec::new(), Intrinsic::CurrentThread, |_| Vec::new()).unwrap();

        assert!(ops.iter().any(|op| matches!(
            op,
            LirOp::Move { src, .. } if *src == Operand::register(x64::R15, Kind::Object)
        )));
    }

    #[test]
    fn test_bit_count_needs_cpu_feature() {
        let target = Target {
            features: CpuFeatures::none(),
            ..Target::x64()
        };

        match lower_intrinsic(target, vec![Kind::Long], Intrinsic::LongBitCount, |b| params(b, 1)) {
            Err(Bailout::UnsupportedIntrinsic(name)) => assert_eq!(name, "Long.bitCount"),
            other => panic!("unexpected {:?}", other.map(|ops| ops.len())),
        }

        let ops = lower_intrinsic(
            Target {
                features: CpuFeatures::none(),
                ..Target::arm64()
            },
            vec![Kind::Int],
            Intrinsic::IntLeadingZeros,
            |b| params(b, 1),
        )
        .unwrap();
        assert!(ops.iter().any(|op| matches!(
            op,
            LirOp::BitOp {
                op: BitOp::LeadingZeros,
                ..
            }
        )));
    }

    #[test]
    fn test_intrinsic_arity() {
        match lower_intrinsic(Target::x64(), vec![Kind::Double], Intrinsic::ArrayCopy, |b| params(b, 1)) {
            Err(Bailout::UnresolvedPattern(msg)) => assert!(msg.contains("System.arraycopy")),
            other => panic!("unexpected {:?}", other.map(|ops| ops.len())),
        }
    }
}
