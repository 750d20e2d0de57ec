use tracing::debug;

use cinder_hir::{BlockId, Condition, DeoptAction, ExceptionHandler, InstId, InstKind, Kind, RuntimeCall, TypeId};
use cinder_lir::{BranchTarget, DebugInfo, LirOp, Operand};

use crate::error::LowerResult;
use crate::item::LirItem;
use crate::phi::PhiResolver;
use crate::selector::InstructionSelector;
use crate::stubs::StubKey;
use crate::switch::{lookup_ranges, table_ranges, SwitchRange};

impl<'a> InstructionSelector<'a> {
    /// Moves the values leaving the current block into the phis of its
    /// successor. Only blocks with a single successor carry phi moves.
    pub(crate) fn move_to_phi(&mut self) -> LowerResult<()> {
        let graph = self.graph;
        let block = graph.block(self.current_block());

        if block.successors.len() != 1 {
            return Ok(());
        }

        let sux = graph.block(block.successors[0]);

        if sux.predecessors.len() <= 1 || sux.phis.is_empty() {
            return Ok(());
        }

        let mut resolver = PhiResolver::new();

        for &phi in &sux.phis {
            if !graph.inst(phi).is_live {
                continue;
            }

            let input = match graph.phi_input(phi, block.id) {
                Some(input) => input,
                None => panic!("phi {} has no input from B{}", phi.index(), block.id.0),
            };

            let src = self.operand(input)?;
            let dest = self.operand(phi)?;

            if src != dest {
                resolver.move_(src, dest);
            }
        }

        let moves = resolver.resolve(&mut self.pool)?;
        debug!(from = block.id.0, to = sux.id.0, moves = moves.len(), "phi moves");

        for (src, dest) in moves {
            self.lir().move_(src, dest);
        }

        Ok(())
    }

    pub(crate) fn safepoint(&mut self, info: DebugInfo) -> LowerResult<()> {
        match self.templates.safepoint_poll() {
            Some(snippet) => {
                self.emit_xir(&snippet, Some(info), None, None, None)?;
            }
            None => {
                self.append(LirOp::Safepoint { info });
            }
        }

        Ok(())
    }

    fn loop_safepoint(&mut self, id: InstId, is_safepoint: bool) -> LowerResult<()> {
        if !is_safepoint || !self.flags.gen_loop_safepoints {
            return Ok(());
        }

        if let Some(info) = self.info_before(id)? {
            self.safepoint(info)?;
        }

        Ok(())
    }

    pub(super) fn do_goto(&mut self, id: InstId, sux: BlockId, is_safepoint: bool) -> LowerResult<()> {
        self.end_osr_migration()?;
        self.move_to_phi()?;
        self.loop_safepoint(id, is_safepoint)?;
        self.lir().jump(BranchTarget::Block(sux));
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn do_if(
        &mut self,
        id: InstId,
        x: InstId,
        y: InstId,
        cond: Condition,
        true_sux: BlockId,
        false_sux: BlockId,
        unordered_is_true: bool,
        is_safepoint: bool,
    ) -> LowerResult<()> {
        let kind = self.graph.inst(x).kind.stack_kind();

        // long compares only use eq, ne, lt and ge
        let (x, y, cond) = match cond {
            Condition::Gt | Condition::Le if kind.is_long() => (y, x, cond.mirror()),
            _ => (x, y, cond),
        };

        let mut left = LirItem::new(self, x)?;
        let mut right = LirItem::new(self, y)?;
        left.load_item(self)?;

        if kind.is_float() {
            right.load_item(self)?;
        } else {
            right.load_nonconstant(self)?;
        }

        self.loop_safepoint(id, is_safepoint)?;
        self.lir().cmp(cond, left.result(), right.result());
        self.move_to_phi()?;

        if kind.is_float() {
            let unordered = if unordered_is_true { true_sux } else { false_sux };
            self.lir().branch_float(cond, kind, true_sux, unordered);
        } else {
            self.lir().branch(cond, kind, BranchTarget::Block(true_sux));
        }

        self.lir().jump(BranchTarget::Block(false_sux));
        Ok(())
    }

    pub(super) fn do_table_switch(
        &mut self,
        value: InstId,
        low_key: i32,
        suxs: &[BlockId],
        default: BlockId,
    ) -> LowerResult<()> {
        let mut tag = LirItem::new(self, value)?;
        tag.load_item(self)?;
        self.move_to_phi()?;

        if suxs.len() < self.flags.sequential_switch_limit {
            let cases: Vec<(i32, BlockId)> = suxs
                .iter()
                .enumerate()
                .map(|(idx, &sux)| (low_key.wrapping_add(idx as i32), sux))
                .collect();
            self.emit_sequential_switch(tag.result(), &cases, default);
            return Ok(());
        }

        let ranges = table_ranges(low_key, suxs, default);
        let dense = ranges.is_empty() || suxs.len() / ranges.len() >= self.flags.range_tests_switch_density;

        if self.flags.use_table_ranges && dense {
            self.emit_switch_ranges(tag.result(), &ranges, default);
        } else {
            let tmp = self.new_variable(Kind::Word)?;
            self.append(LirOp::TableSwitch {
                index: tag.result(),
                low_key,
                targets: suxs.to_vec(),
                default,
                tmp,
            });
        }

        Ok(())
    }

    pub(super) fn do_lookup_switch(
        &mut self,
        value: InstId,
        keys: &[i32],
        suxs: &[BlockId],
        default: BlockId,
    ) -> LowerResult<()> {
        let mut tag = LirItem::new(self, value)?;
        tag.load_item(self)?;
        self.move_to_phi()?;

        if suxs.len() < self.flags.sequential_switch_limit || !self.flags.use_table_ranges {
            let cases: Vec<(i32, BlockId)> = keys.iter().copied().zip(suxs.iter().copied()).collect();
            self.emit_sequential_switch(tag.result(), &cases, default);
        } else {
            let ranges = lookup_ranges(keys, suxs, default);
            self.emit_switch_ranges(tag.result(), &ranges, default);
        }

        Ok(())
    }

    fn emit_sequential_switch(&mut self, tag: Operand, cases: &[(i32, BlockId)], default: BlockId) {
        for &(key, sux) in cases {
            self.lir().cmp(Condition::Eq, tag.clone(), Operand::int(key));
            self.lir().branch(Condition::Eq, Kind::Int, BranchTarget::Block(sux));
        }

        self.lir().jump(BranchTarget::Block(default));
    }

    fn emit_switch_ranges(&mut self, tag: Operand, ranges: &[SwitchRange], default: BlockId) {
        for range in ranges {
            let sux = BranchTarget::Block(range.sux);

            if range.is_singleton() {
                self.lir().cmp(Condition::Eq, tag.clone(), Operand::int(range.low_key));
                self.lir().branch(Condition::Eq, Kind::Int, sux);
            } else if range.is_pair() {
                self.lir().cmp(Condition::Eq, tag.clone(), Operand::int(range.low_key));
                self.lir().branch(Condition::Eq, Kind::Int, sux);
                self.lir().cmp(Condition::Eq, tag.clone(), Operand::int(range.high_key));
                self.lir().branch(Condition::Eq, Kind::Int, sux);
            } else {
                let below = self.labels.create_label();
                self.lir().cmp(Condition::Lt, tag.clone(), Operand::int(range.low_key));
                self.lir().branch(Condition::Lt, Kind::Int, BranchTarget::Label(below));
                self.lir().cmp(Condition::Le, tag.clone(), Operand::int(range.high_key));
                self.lir().branch(Condition::Le, Kind::Int, sux);
                self.bind_label(below);
            }
        }

        self.lir().jump(BranchTarget::Block(default));
    }

    pub(super) fn do_return(&mut self, value: Option<InstId>) -> LowerResult<()> {
        let mut result = Operand::Illegal;

        if let Some(value) = value {
            let reg = self.target.return_register(self.graph.inst(value).kind);
            let mut item = LirItem::new(self, value)?;
            item.load_item_force(self, reg.clone())?;
            result = reg;
        }

        if let Some(snippet) = self.templates.epilogue() {
            self.emit_xir(&snippet, None, None, None, None)?;
        }

        self.append(LirOp::Return(result));
        Ok(())
    }

    pub(super) fn do_throw(&mut self, id: InstId, exception: InstId) -> LowerResult<()> {
        let info = self.required_info(id)?;
        let graph = self.graph;

        let mut item = LirItem::new(self, exception)?;
        item.load_item(self)?;

        let never_null = matches!(
            graph.inst(exception).op,
            InstKind::NewInstance { .. } | InstKind::ExceptionObject
        );

        if self.flags.gen_explicit_null_checks && !never_null {
            self.append(LirOp::NullCheck {
                object: item.result(),
                info: info.clone(),
            });
        }

        let oop = self.target.exception_oop();
        item.load_item_force(self, oop.clone())?;

        if self.throw_unwinds(exception, &info) {
            let stub = self.stubs.stub_for(StubKey::Runtime(RuntimeCall::UnwindException));
            self.frame_map.uses_stub(stub);
            self.append(LirOp::UnwindException {
                exception: oop,
                info,
            });
        } else {
            let stub = self.stubs.stub_for(StubKey::Runtime(RuntimeCall::ThrowException));
            self.frame_map.uses_stub(stub);
            let exception_pc = self.target.exception_pc();
            self.append(LirOp::ThrowException {
                exception_pc,
                exception: oop,
                info,
            });
        }

        Ok(())
    }

    /// Whether no handler of `info` can catch `exception`. Without an
    /// instance class type for the exception every handler may catch it.
    fn throw_unwinds(&self, exception: InstId, info: &DebugInfo) -> bool {
        if info.handlers.is_empty() {
            return true;
        }

        let data = self.graph.inst(exception);
        let (ty, is_exact) = match (data.exact_type, data.declared_type) {
            (Some(ty), _) => (ty, true),
            (None, Some(ty)) => (ty, false),
            (None, None) => return false,
        };

        if !self.program.ty(ty).is_instance_class() {
            return false;
        }

        !info
            .handlers
            .iter()
            .any(|handler| self.could_catch(handler, ty, is_exact))
    }

    fn could_catch(&self, handler: &ExceptionHandler, ty: TypeId, is_exact: bool) -> bool {
        let catch_type = match handler.catch_type {
            Some(catch_type) => catch_type,
            None => return true,
        };

        if !self.program.ty(catch_type).is_loaded {
            return true;
        }

        if self.program.is_subtype_of(ty, catch_type) {
            return true;
        }

        // a subclass of the declared type may be caught
        !is_exact && self.program.is_subtype_of(catch_type, ty)
    }

    pub(super) fn do_exception_object(&mut self, id: InstId) -> LowerResult<()> {
        let oop = self.target.exception_oop();
        let var = self.result_variable(id)?;
        self.lir().move_(oop, var);
        Ok(())
    }

    /// Binds the OSR buffer pointer after the frame has been built.
    pub(super) fn do_osr_entry(&mut self, id: InstId) -> LowerResult<()> {
        let buffer = self.target.osr_buffer();
        self.append(LirOp::OsrEntry(buffer.clone()));
        let var = self.result_variable(id)?;
        self.lir().move_(buffer, var);
        Ok(())
    }

    /// Leaving the OSR entry block hands the buffer back to the runtime.
    fn end_osr_migration(&mut self) -> LowerResult<()> {
        let graph = self.graph;
        let block = graph.block(self.current_block());

        let osr = match block.instructions.first() {
            Some(&first) if matches!(graph.inst(first).op, InstKind::OsrEntry) => first,
            _ => return Ok(()),
        };

        if !graph.inst(osr).is_live {
            return Ok(());
        }

        let buffer = self.operand(osr)?;
        self.emit_runtime_call(RuntimeCall::OsrMigrationEnd, vec![buffer], None)?;
        Ok(())
    }

    pub(super) fn do_deoptimize(&mut self, id: InstId, action: DeoptAction) -> LowerResult<()> {
        let info = self.required_info(id)?;
        let label = self.deopt_stub(action, info);
        self.lir().jump(BranchTarget::Label(label));
        Ok(())
    }

    pub(super) fn do_guard(
        &mut self,
        id: InstId,
        x: InstId,
        y: InstId,
        cond: Condition,
        action: DeoptAction,
    ) -> LowerResult<()> {
        let info = self.required_info(id)?;
        let kind = self.graph.inst(x).kind.stack_kind();

        let mut left = LirItem::new(self, x)?;
        let mut right = LirItem::new(self, y)?;
        left.load_item(self)?;
        right.load_nonconstant(self)?;

        let failed = cond.negate();
        let label = self.deopt_stub(action, info);
        self.lir().cmp(failed, left.result(), right.result());
        self.lir().branch(failed, kind, BranchTarget::Label(label));
        Ok(())
    }

    pub(super) fn do_null_check(&mut self, id: InstId, object: InstId) -> LowerResult<()> {
        let info = self.required_info(id)?;
        let mut item = LirItem::new(self, object)?;
        item.load_item(self)?;

        self.append(LirOp::NullCheck {
            object: item.result(),
            info,
        });

        if self.graph.inst(id).has_value() {
            let var = self.result_variable(id)?;
            self.lir().move_(item.result(), var);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::tests::{static_method, with_program, with_selector};
    use cinder_hir::{ArithOp, ConstValue, GraphBuilder, Program};
    use cinder_lir::cpu::{arm64, x64};
    use cinder_lir::{CallKind, Target};

    fn lower_entry(sel: &mut InstructionSelector) -> Vec<LirOp> {
        sel.lower_instructions(BlockId(0)).unwrap();
        sel.lir().ops().to_vec()
    }

    fn lower_next(sel: &mut InstructionSelector, block: BlockId) -> Vec<LirOp> {
        sel.leave();
        sel.enter(block).unwrap();
        sel.lower_instructions(block).unwrap();
        sel.lir().ops().to_vec()
    }

    fn finish_elsewhere(b: &mut GraphBuilder) {
        let rest = b.create_block();
        b.switch_to(rest);
    }

    #[test]
    fn test_long_gt_is_mirrored() {
        with_selector(
            Target::x64(),
            |b| {
                let (p0, p1) = (b.param(0), b.param(1));
                let x = b.append(
                    Kind::Long,
                    InstKind::Convert {
                        op: cinder_hir::ConvertOp::I2L,
                        value: p0,
                    },
                );
                let y = b.append(
                    Kind::Long,
                    InstKind::Convert {
                        op: cinder_hir::ConvertOp::I2L,
                        value: p1,
                    },
                );
                let then = b.create_block();
                let other = b.create_block();
                b.if_(x, Condition::Gt, y, then, other);
                b.switch_to(then);
                vec![x, y]
            },
            |sel, insts| {
                let ops = lower_entry(sel);
                let x = sel.operand(insts[0]).unwrap();
                let y = sel.operand(insts[1]).unwrap();
                let n = ops.len();

                match (&ops[n - 3], &ops[n - 2], &ops[n - 1]) {
                    (
                        LirOp::Cmp { cond, x: left, y: right },
                        LirOp::Branch {
                            cond: branch,
                            target: BranchTarget::Block(BlockId(1)),
                            ..
                        },
                        LirOp::Jump {
                            target: BranchTarget::Block(BlockId(2)),
                            ..
                        },
                    ) => {
                        assert_eq!(*cond, Condition::Lt);
                        assert_eq!(*branch, Condition::Lt);
                        assert_eq!(*left, y);
                        assert_eq!(*right, x);
                    }
                    ops => panic!("unexpected {:?}", ops),
                }
            },
        );
    }

    #[test]
    fn test_float_branch_names_unordered_successor() {
        let mut program = Program::new();
        let method = static_method(&mut program, vec![Kind::Double, Kind::Double], Kind::Void);

        with_program(
            Target::arm64(),
            &program,
            method,
            |b| {
                let (p0, p1) = (b.param(0), b.param(1));
                let then = b.create_block();
                let other = b.create_block();
                b.append(
                    Kind::Void,
                    InstKind::If {
                        x: p0,
                        y: p1,
                        cond: Condition::Lt,
                        true_sux: then,
                        false_sux: other,
                        unordered_is_true: true,
                        is_safepoint: false,
                    },
                );
                b.switch_to(then);
                Vec::new()
            },
            |sel, _| {
                let ops = lower_entry(sel);
                assert!(ops.iter().any(|op| matches!(
                    op,
                    LirOp::Branch {
                        kind: Kind::Double,
                        target: BranchTarget::Block(BlockId(1)),
                        unordered: Some(BlockId(1)),
                        ..
                    }
                )));
            },
        );
    }

    #[test]
    fn test_loop_back_edge() {
        with_selector(
            Target::arm64(),
            |b| {
                let (p0, p1) = (b.param(0), b.param(1));
                let head = b.create_block();
                b.goto(head);

                b.switch_to(head);
                let phi = b.phi(head, Kind::Int);
                let sum = b.arith(ArithOp::Add, phi, p1);
                b.add_phi_input(phi, BlockId(0), p0);
                b.add_phi_input(phi, head, sum);
                b.goto(head);
                finish_elsewhere(b);
                vec![phi, sum]
            },
            |sel, insts| {
                let entry = lower_entry(sel);
                let p0 = sel.operand(sel.graph.locals[0]).unwrap();
                let phi = sel.operand(insts[0]).unwrap();

                match &entry[entry.len() - 2..] {
                    [LirOp::Move { src, dst, .. }, LirOp::Jump { .. }] => {
                        assert_eq!(*src, p0);
                        assert_eq!(*dst, phi);
                    }
                    ops => panic!("unexpected {:?}", ops),
                }

                let ops = lower_next(sel, BlockId(1));
                let sum = sel.operand(insts[1]).unwrap();

                match &ops[ops.len() - 3..] {
                    [LirOp::Move { src, dst, .. }, LirOp::Xir(poll), LirOp::Jump {
                        target: BranchTarget::Block(BlockId(1)),
                        ..
                    }] => {
                        assert_eq!(*src, sum);
                        assert_eq!(*dst, phi);
                        assert_eq!(poll.template.name, "safepoint_poll");
                        assert!(poll.info.is_some());
                    }
                    ops => panic!("unexpected {:?}", ops),
                }
            },
        );
    }

    fn switch_ops(suxs: Vec<u32>, keys: Option<Vec<i32>>) -> Vec<LirOp> {
        let mut result = Vec::new();

        with_selector(
            Target::x64(),
            |b| {
                let value = b.param(0);
                let blocks: Vec<BlockId> = (0..5).map(|_| b.create_block()).collect();
                let suxs: Vec<BlockId> = suxs.iter().map(|&idx| blocks[idx as usize]).collect();
                let default = blocks[0];

                match keys {
                    Some(keys) => b.append(
                        Kind::Void,
                        InstKind::LookupSwitch {
                            value,
                            keys,
                            suxs,
                            default,
                        },
                    ),
                    None => b.append(
                        Kind::Void,
                        InstKind::TableSwitch {
                            value,
                            low_key: 10,
                            suxs,
                            default,
                        },
                    ),
                };

                b.switch_to(default);
                Vec::new()
            },
            |sel, _| result = lower_entry(sel),
        );

        result
    }

    fn count(ops: &[LirOp], pred: impl Fn(&LirOp) -> bool) -> usize {
        ops.iter().filter(|op| pred(op)).count()
    }

    #[test]
    fn test_small_switch_is_sequential() {
        let ops = switch_ops(vec![1, 2, 1], None);
        assert_eq!(count(&ops, |op| matches!(op, LirOp::Cmp { cond: Condition::Eq, .. })), 3);
        assert!(matches!(
            ops.last(),
            Some(LirOp::Jump {
                target: BranchTarget::Block(BlockId(1)),
                ..
            })
        ));
    }

    #[test]
    fn test_dense_switch_uses_ranges() {
        // keys 10..=19 to B2, 20..=21 to B3
        let mut suxs = vec![1; 10];
        suxs.extend([2, 2]);
        let ops = switch_ops(suxs, None);

        assert_eq!(count(&ops, |op| matches!(op, LirOp::TableSwitch { .. })), 0);
        assert_eq!(count(&ops, |op| matches!(op, LirOp::Label(_))), 1);
        assert_eq!(
            count(&ops, |op| matches!(
                op,
                LirOp::Branch {
                    target: BranchTarget::Block(BlockId(3)),
                    ..
                }
            )),
            2
        );
    }

    #[test]
    fn test_sparse_switch_uses_table() {
        let ops = switch_ops(vec![1, 2, 3, 4, 1, 2, 3, 4], None);

        match ops.iter().find(|op| matches!(op, LirOp::TableSwitch { .. })) {
            Some(LirOp::TableSwitch {
                low_key,
                targets,
                default,
                tmp,
                ..
            }) => {
                assert_eq!(*low_key, 10);
                assert_eq!(targets.len(), 8);
                assert_eq!(*default, BlockId(1));
                assert_eq!(tmp.kind(), Kind::Word);
            }
            op => panic!("unexpected {:?}", op),
        }
    }

    #[test]
    fn test_lookup_switch_drops_default_ranges() {
        let ops = switch_ops(vec![2, 2, 0, 3, 3, 3], Some(vec![1, 2, 3, 7, 8, 9]));

        // B1 is the default: key 3 needs no test
        assert_eq!(
            count(&ops, |op| matches!(
                op,
                LirOp::Branch {
                    target: BranchTarget::Block(BlockId(1)),
                    ..
                }
            )),
            0
        );
        assert_eq!(count(&ops, |op| matches!(op, LirOp::Label(_))), 1);
    }

    fn throw_ops(
        target: Target,
        exact: bool,
        catch: Option<bool>,
        allocate: bool,
    ) -> Vec<LirOp> {
        let mut program = Program::new();
        let base = program.add_class("Exception", None);
        let error = program.add_class("Error", Some(base));
        let unrelated = program.add_class("Unrelated", Some(base));
        let method = static_method(&mut program, vec![Kind::Object], Kind::Void);
        let mut result = Vec::new();

        with_program(
            target,
            &program,
            method,
            |b| {
                let handler = b.create_block();
                b.set_exception_entry(handler);

                match catch {
                    Some(true) => {
                        b.add_handler(None, handler);
                    }
                    Some(false) => {
                        b.add_handler(Some(unrelated), handler);
                    }
                    None => {}
                }

                let exception = if allocate {
                    b.append(Kind::Object, InstKind::NewInstance { ty: error })
                } else {
                    b.param(0)
                };

                if exact {
                    b.set_types(exception, Some(error), None);
                }

                b.append(Kind::Void, InstKind::Throw { exception });
                finish_elsewhere(b);
                Vec::new()
            },
            |sel, _| result = lower_entry(sel),
        );

        result
    }

    #[test]
    fn test_throw_without_handlers_unwinds() {
        let ops = throw_ops(Target::x64(), false, None, false);
        let rax = Operand::register(x64::RAX, Kind::Object);

        assert_eq!(count(&ops, |op| matches!(op, LirOp::NullCheck { .. })), 1);
        match ops.last() {
            Some(LirOp::UnwindException { exception, .. }) => assert_eq!(*exception, rax),
            op => panic!("unexpected {:?}", op),
        }
    }

    #[test]
    fn test_throw_to_catch_all() {
        let ops = throw_ops(Target::arm64(), true, Some(true), false);

        match ops.last() {
            Some(LirOp::ThrowException {
                exception,
                exception_pc,
                info,
            }) => {
                assert_eq!(*exception, Operand::register(arm64::R0, Kind::Object));
                assert_eq!(*exception_pc, Operand::register(arm64::R3, Kind::Word));
                assert!(info.has_handlers());
            }
            op => panic!("unexpected {:?}", op),
        }
    }

    #[test]
    fn test_throw_uncatchable_exact_type() {
        let ops = throw_ops(Target::x64(), true, Some(false), false);
        assert!(matches!(ops.last(), Some(LirOp::UnwindException { .. })));
    }

    #[test]
    fn test_throw_unknown_type_dispatches() {
        let ops = throw_ops(Target::x64(), false, Some(false), false);
        assert!(matches!(ops.last(), Some(LirOp::ThrowException { .. })));
    }

    #[test]
    fn test_thrown_allocation_needs_no_null_check() {
        let ops = throw_ops(Target::x64(), true, None, true);
        assert_eq!(count(&ops, |op| matches!(op, LirOp::NullCheck { .. })), 0);
    }

    #[test]
    fn test_osr_entry_frees_buffer_on_exit() {
        with_selector(
            Target::x64(),
            |b| {
                let osr = b.create_block();
                let body = b.create_block();
                b.goto(osr);

                b.switch_to(osr);
                let buffer = b.append(Kind::Word, InstKind::OsrEntry);
                b.goto(body);
                b.switch_to(body);
                vec![buffer]
            },
            |sel, insts| {
                let entry = lower_entry(sel);
                assert!(!entry.iter().any(|op| matches!(op, LirOp::Call(_))));

                let ops = lower_next(sel, BlockId(1));
                let register = Operand::register(x64::REG_OSR_BUFFER, Kind::Word);
                let buffer = sel.operand(insts[0]).unwrap();

                match &ops[1..3] {
                    [LirOp::OsrEntry(reg), LirOp::Move { src, dst, .. }] => {
                        assert_eq!(*reg, register);
                        assert_eq!(*src, register);
                        assert_eq!(*dst, buffer);
                    }
                    ops => panic!("unexpected {:?}", ops),
                }

                let call = ops
                    .iter()
                    .position(|op| {
                        matches!(op, LirOp::Call(call) if call.kind == CallKind::Runtime(RuntimeCall::OsrMigrationEnd))
                    })
                    .unwrap();
                assert!(matches!(
                    ops[call - 1],
                    LirOp::Move { ref src, .. } if *src == buffer
                ));
                assert!(matches!(
                    ops.last(),
                    Some(LirOp::Jump {
                        target: BranchTarget::Block(BlockId(2)),
                        ..
                    })
                ));
                assert!(sel
                    .stubs
                    .find(StubKey::Runtime(RuntimeCall::OsrMigrationEnd))
                    .is_some());
            },
        );
    }

    #[test]
    fn test_guard_branches_to_deopt_stub() {
        with_selector(
            Target::x64(),
            |b| {
                let (p0, p1) = (b.param(0), b.param(1));
                vec![b.append(
                    Kind::Void,
                    InstKind::Guard {
                        x: p0,
                        y: p1,
                        cond: Condition::Lt,
                        action: DeoptAction::Recompile,
                    },
                )]
            },
            |sel, _| {
                let ops = lower_entry(sel);
                let stub = &sel.deopt_stubs[0];

                assert_eq!(sel.deopt_stubs.len(), 1);
                assert_eq!(stub.action, DeoptAction::Recompile);
                assert!(ops.iter().any(|op| matches!(
                    op,
                    LirOp::Branch {
                        cond: Condition::Ge,
                        target: BranchTarget::Label(label),
                        ..
                    } if *label == stub.label
                )));
                assert_eq!(
                    sel.stubs.find(StubKey::Deoptimize(DeoptAction::Recompile)),
                    Some(stub.stub)
                );
            },
        );
    }

    #[test]
    fn test_return_value_in_return_register() {
        with_selector(
            Target::x64(),
            |b| {
                let seven = b.constant(ConstValue::Long(7));
                b.ret(Some(seven));
                finish_elsewhere(b);
                Vec::new()
            },
            |sel, _| {
                let ops = lower_entry(sel);
                let rax = Operand::register(x64::RAX, Kind::Long);

                match &ops[ops.len() - 2..] {
                    [LirOp::Move { src, dst, .. }, LirOp::Return(result)] => {
                        assert_eq!(*src, Operand::long(7));
                        assert_eq!(*dst, rax);
                        assert_eq!(*result, rax);
                    }
                    ops => panic!("unexpected {:?}", ops),
                }
            },
        );
    }
}
