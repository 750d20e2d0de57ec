use fixedbitset::FixedBitSet;
use tracing::trace;

use cinder_hir::{BlockId, ConstValue, DeoptAction, Graph, InstId, InstKind, Kind, Program, StateId};
use cinder_lir::{
    collect_tables, CallingConventionType, CodePosition, DebugInfo, FrameMap, LabelId, LabelTable,
    LirList, LirOp, Operand, StubId, Target,
};

use crate::constants::ConstantCache;
use crate::error::{Bailout, LowerResult};
use crate::flags::LowerFlags;
use crate::operands::{OperandMap, OperandPool, VariableFlag};
use crate::reduce::StrengthReduction;
use crate::stubs::{StubKey, StubRegistry};
use crate::templates::TemplateProvider;
use crate::LoweredMethod;

mod arith;
mod calls;
mod control;
mod intrinsics;
mod memory;
mod objects;

/// Out-of-line deoptimization entry. The label is bound by the code
/// emitter when it places the stub code.
#[derive(Clone, Debug)]
pub struct DeoptStub {
    pub label: LabelId,
    pub action: DeoptAction,
    pub info: DebugInfo,
    pub stub: StubId,
}

struct BlockState {
    id: BlockId,
    lir: LirList,
    constants: ConstantCache,
}

/// Selects LIR for the blocks of one graph. Each block is lowered exactly
/// once; instructions are selected in block order, producers without side
/// effects on their first use.
pub struct InstructionSelector<'a> {
    pub(crate) program: &'a Program,
    pub(crate) graph: &'a Graph,
    pub(crate) target: &'a Target,
    pub(crate) flags: &'a LowerFlags,
    pub(crate) templates: &'a dyn TemplateProvider,
    pub(crate) stubs: &'a StubRegistry,
    pub(crate) reduction: &'a dyn StrengthReduction,

    pub(crate) pool: OperandPool,
    pub(crate) operands: OperandMap,
    pub(crate) frame_map: FrameMap,
    pub(crate) labels: LabelTable,
    pub(crate) deopt_stubs: Vec<DeoptStub>,

    blocks: Vec<Option<LirList>>,
    current: Option<BlockState>,
    selecting: FixedBitSet,
    selected: FixedBitSet,
}

impl<'a> InstructionSelector<'a> {
    pub fn new(
        program: &'a Program,
        graph: &'a Graph,
        target: &'a Target,
        flags: &'a LowerFlags,
        templates: &'a dyn TemplateProvider,
        stubs: &'a StubRegistry,
        reduction: &'a dyn StrengthReduction,
    ) -> InstructionSelector<'a> {
        let inst_count = graph.inst_count();

        InstructionSelector {
            program,
            graph,
            target,
            flags,
            templates,
            stubs,
            reduction,
            pool: OperandPool::new(flags.max_variables),
            operands: OperandMap::new(inst_count),
            frame_map: FrameMap::new(target),
            labels: LabelTable::new(),
            deopt_stubs: Vec::new(),
            blocks: (0..graph.block_count()).map(|_| None).collect(),
            current: None,
            selecting: FixedBitSet::with_capacity(inst_count),
            selected: FixedBitSet::with_capacity(inst_count),
        }
    }

    pub fn lower_block(&mut self, block: BlockId) -> LowerResult<()> {
        self.enter(block)?;
        self.lower_instructions(block)?;
        self.leave();
        Ok(())
    }

    pub(crate) fn enter(&mut self, id: BlockId) -> LowerResult<()> {
        assert!(
            self.blocks[id.to_usize()].is_none(),
            "block B{} lowered twice",
            id.0
        );
        if let Some(ref current) = self.current {
            panic!("block B{} entered while lowering B{}", id.0, current.id.0);
        }

        trace!(block = id.0, "enter block");

        let mut lir = LirList::new(id);
        lir.append(LirOp::BlockLabel(id));

        self.current = Some(BlockState {
            id,
            lir,
            constants: ConstantCache::new(),
        });

        if id == self.graph.entry {
            self.append(LirOp::StdEntry);
            self.incoming_arguments()?;
        }

        if self.flags.trace_block_entry {
            self.emit_runtime_call(
                cinder_hir::RuntimeCall::TraceBlockEntry,
                vec![Operand::int(id.0 as i32)],
                None,
            )?;
        }

        Ok(())
    }

    fn incoming_arguments(&mut self) -> LowerResult<()> {
        let graph = self.graph;
        let kinds = self.program.signature_kinds(graph.method);
        let cc = self
            .target
            .calling_convention(CallingConventionType::JavaCallee, &kinds);
        assert_eq!(cc.locations.len(), graph.locals.len());

        for (&local, location) in graph.locals.iter().zip(&cc.locations) {
            let var = self.new_variable(graph.inst(local).kind)?;
            self.lir().move_(location.clone(), var.clone());
            self.set_result(local, var);
            self.selected.insert(local.index());
        }

        self.frame_map.set_incoming(cc);
        Ok(())
    }

    fn lower_instructions(&mut self, id: BlockId) -> LowerResult<()> {
        let graph = self.graph;
        let block = graph.block(id);

        if block.is_exception_entry {
            for &inst in &block.instructions {
                let data = graph.inst(inst);
                if data.is_live && matches!(data.op, InstKind::ExceptionObject) {
                    self.walk(inst, true)?;
                }
            }
        }

        for &inst in &block.instructions {
            let data = graph.inst(inst);

            if !data.is_live || self.selected.contains(inst.index()) {
                continue;
            }

            if let Some(state) = data.state_before {
                self.walk_state(state)?;
            }

            self.walk(inst, true)?;
        }

        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        let state = match self.current.take() {
            Some(state) => state,
            None => panic!("no block to leave"),
        };

        trace!(
            block = state.id.0,
            ops = state.lir.len(),
            constants = state.constants.len(),
            "leave block"
        );
        self.blocks[state.id.to_usize()] = Some(state.lir);
    }

    pub(crate) fn walk_state(&mut self, state: StateId) -> LowerResult<()> {
        let graph = self.graph;

        for value in graph.state_values(state) {
            if graph.inst(value).is_live {
                self.walk(value, false)?;
            }
        }

        Ok(())
    }

    /// Selects `root` after all of its not yet selected producers. Only
    /// `root` may be pinned when `root_pinned` is set; a pinned producer
    /// must have been selected in block order before.
    pub(crate) fn walk(&mut self, root: InstId, root_pinned: bool) -> LowerResult<()> {
        if self.selected.contains(root.index()) {
            return Ok(());
        }

        let graph = self.graph;
        let mut stack = vec![(root, false)];

        while let Some((id, expanded)) = stack.pop() {
            if self.selected.contains(id.index()) {
                continue;
            }

            if expanded {
                self.select(id)?;
                continue;
            }

            let inst = graph.inst(id);
            assert!(
                !self.selecting.contains(id.index()),
                "instruction {} ({}) selected while selecting itself",
                id.index(),
                inst.op.name()
            );
            assert!(
                !inst.is_pinned || (id == root && root_pinned),
                "instruction {} ({}) used before it was selected",
                id.index(),
                inst.op.name()
            );

            self.selecting.insert(id.index());
            stack.push((id, true));

            let selected = &self.selected;
            inst.op.for_each_input(|input| {
                if !selected.contains(input.index()) {
                    stack.push((input, false));
                }
            });
        }

        Ok(())
    }

    fn select(&mut self, id: InstId) -> LowerResult<()> {
        let graph = self.graph;
        let inst = graph.inst(id);

        match inst.op {
            InstKind::Local { index } => panic!("local {} used before method entry", index),
            InstKind::Constant(value) => self.set_result(id, Operand::Constant(value)),
            InstKind::Phi { .. } => {
                let var = self.new_variable(inst.kind)?;
                self.set_result(id, var);
            }

            InstKind::Arithmetic { op, x, y, can_trap } => self.do_arithmetic(id, op, x, y, can_trap)?,
            InstKind::Negate { x } => self.do_negate(id, x)?,
            InstKind::Shift { op, x, y } => self.do_shift(id, op, x, y)?,
            InstKind::Logic { op, x, y } => self.do_logic(id, op, x, y)?,
            InstKind::Compare { op, x, y } => self.do_compare(id, op, x, y)?,
            InstKind::Convert { op, value } => self.do_convert(id, op, value)?,
            InstKind::IfOp {
                x,
                y,
                cond,
                tval,
                fval,
            } => self.do_if_op(id, x, y, cond, tval, fval)?,

            InstKind::LoadField { object, field } => self.do_load_field(id, object, field)?,
            InstKind::StoreField {
                object,
                field,
                value,
            } => self.do_store_field(id, object, field, value)?,
            InstKind::ArrayLength { array } => self.do_array_length(id, array)?,
            InstKind::LoadIndexed {
                array,
                index,
                elem_kind,
            } => self.do_load_indexed(id, array, index, elem_kind)?,
            InstKind::StoreIndexed {
                array,
                index,
                value,
                elem_kind,
            } => self.do_store_indexed(id, array, index, value, elem_kind)?,
            InstKind::LoadRaw {
                base,
                index,
                log2_scale,
                disp,
            } => self.do_load_raw(id, base, index, log2_scale, disp)?,
            InstKind::StoreRaw {
                base,
                index,
                log2_scale,
                disp,
                value,
                kind,
            } => self.do_store_raw(base, index, log2_scale, disp, value, kind)?,
            InstKind::UnsafeGet {
                object,
                offset,
                is_volatile,
            } => self.do_unsafe_get(id, object, offset, is_volatile)?,
            InstKind::UnsafePut {
                object,
                offset,
                value,
                kind,
                is_volatile,
            } => self.do_unsafe_put(object, offset, value, kind, is_volatile)?,
            InstKind::Prefetch {
                object,
                offset,
                is_store,
            } => self.do_prefetch(object, offset, is_store)?,
            InstKind::ProfileCounter {
                mdo,
                offset,
                increment,
            } => self.do_profile_counter(mdo, offset, increment)?,

            InstKind::Invoke {
                opcode,
                target,
                ref args,
            } => self.do_invoke(id, opcode, target, args)?,
            InstKind::RuntimeCall { call, ref args } => self.do_runtime_call(id, call, args)?,
            InstKind::Intrinsic {
                intrinsic,
                ref args,
            } => self.do_intrinsic(id, intrinsic, args)?,

            InstKind::NewInstance { ty } => self.do_new_instance(id, ty)?,
            InstKind::NewTypeArray { length, elem_kind } => {
                self.do_new_type_array(id, length, elem_kind)?
            }
            InstKind::NewObjectArray { length, elem_ty } => {
                self.do_new_object_array(id, length, elem_ty)?
            }
            InstKind::NewMultiArray { ty, ref dims } => self.do_new_multi_array(id, ty, dims)?,
            InstKind::CheckCast { object, ty } => self.do_check_cast(id, object, ty)?,
            InstKind::InstanceOf { object, ty } => self.do_instance_of(id, object, ty)?,
            InstKind::MonitorEnter { object, lock_index } => {
                self.do_monitor(id, object, lock_index, true)?
            }
            InstKind::MonitorExit { object, lock_index } => {
                self.do_monitor(id, object, lock_index, false)?
            }

            InstKind::NullCheck { object } => self.do_null_check(id, object)?,
            InstKind::ExceptionObject => self.do_exception_object(id)?,
            InstKind::OsrEntry => self.do_osr_entry(id)?,
            InstKind::Guard { x, y, cond, action } => self.do_guard(id, x, y, cond, action)?,
            InstKind::Deoptimize { action } => self.do_deoptimize(id, action)?,

            InstKind::Goto { sux, is_safepoint } => self.do_goto(id, sux, is_safepoint)?,
            InstKind::If {
                x,
                y,
                cond,
                true_sux,
                false_sux,
                unordered_is_true,
                is_safepoint,
            } => self.do_if(
                id,
                x,
                y,
                cond,
                true_sux,
                false_sux,
                unordered_is_true,
                is_safepoint,
            )?,
            InstKind::TableSwitch {
                value,
                low_key,
                ref suxs,
                default,
            } => self.do_table_switch(value, low_key, suxs, default)?,
            InstKind::LookupSwitch {
                value,
                ref keys,
                ref suxs,
                default,
            } => self.do_lookup_switch(value, keys, suxs, default)?,
            InstKind::Return { value } => self.do_return(value)?,
            InstKind::Throw { exception } => self.do_throw(id, exception)?,
        }

        self.selecting.set(id.index(), false);
        self.selected.insert(id.index());
        Ok(())
    }

    /// Operand of `inst`, selecting it first if necessary.
    pub(crate) fn operand(&mut self, inst: InstId) -> LowerResult<Operand> {
        self.walk(inst, false)?;
        let operand = self.operands.get(inst);
        assert!(
            operand.is_legal(),
            "instruction {} ({}) has no operand",
            inst.index(),
            self.graph.inst(inst).op.name()
        );
        Ok(operand)
    }

    pub(crate) fn new_variable(&mut self, kind: Kind) -> LowerResult<Operand> {
        self.pool.new_variable(kind)
    }

    pub(crate) fn set_result(&mut self, inst: InstId, operand: Operand) {
        self.operands.set(inst, operand);
    }

    /// Fresh variable holding the result of `inst`.
    pub(crate) fn result_variable(&mut self, inst: InstId) -> LowerResult<Operand> {
        let var = self.new_variable(self.graph.inst(inst).kind)?;
        self.set_result(inst, var.clone());
        Ok(var)
    }

    /// Variable holding `value` in the current block.
    pub(crate) fn load_constant(&mut self, value: ConstValue) -> LowerResult<Operand> {
        if let Some(var) = self.block_state().constants.lookup(value) {
            return Ok(var);
        }

        let var = self.new_variable(value.kind())?;
        self.lir().move_(Operand::Constant(value), var.clone());
        self.block_state().constants.insert(value, var.clone());
        Ok(var)
    }

    /// Copies `value` into a variable that starts (or stays) in memory,
    /// e.g. to move it between register classes.
    pub(crate) fn force_to_spill(&mut self, value: Operand, kind: Kind, must_stay: bool) -> LowerResult<Operand> {
        assert!(value.is_legal());
        assert_eq!(value.kind().slots(), kind.slots(), "spill of {} as {:?}", value, kind);

        let spill = self.new_variable(kind)?;
        if let Some(var) = spill.as_variable() {
            let flag = if must_stay {
                VariableFlag::MustStayInMemory
            } else {
                VariableFlag::MustStartInMemory
            };
            self.pool.set_flag(var, flag);
        }

        self.lir().move_(value, spill.clone());
        Ok(spill)
    }

    /// Debug info for `state`, with the exception edge of `inst`.
    pub(crate) fn debug_info(&mut self, inst: InstId, state: Option<StateId>) -> LowerResult<Option<DebugInfo>> {
        let state = match state {
            Some(state) => state,
            None => return Ok(None),
        };

        let graph = self.graph;

        // the state after an instruction may hold its own result
        for value in graph.state_values(state) {
            if value != inst && graph.inst(value).is_live {
                self.walk(value, false)?;
            }
        }

        let data = graph.inst(inst);
        let info = DebugInfo::new(data.bci, state, graph.handlers(state))
            .with_exception_edge(data.exception_edge);
        Ok(Some(info))
    }

    pub(crate) fn info_before(&mut self, inst: InstId) -> LowerResult<Option<DebugInfo>> {
        let state = self.graph.inst(inst).state_before;
        self.debug_info(inst, state)
    }

    /// Debug info of an instruction that cannot be lowered without one.
    pub(crate) fn required_info(&mut self, inst: InstId) -> LowerResult<DebugInfo> {
        match self.info_before(inst)? {
            Some(info) => Ok(info),
            None => Err(Bailout::UnresolvedPattern(format!(
                "{} without frame state",
                self.graph.inst(inst).op.name()
            ))),
        }
    }

    pub(crate) fn deopt_stub(&mut self, action: DeoptAction, info: DebugInfo) -> LabelId {
        let label = self.labels.create_label();
        let stub = self.stubs.stub_for(StubKey::Deoptimize(action));
        self.frame_map.uses_stub(stub);
        self.deopt_stubs.push(DeoptStub {
            label,
            action,
            info,
            stub,
        });
        label
    }

    pub(crate) fn int_constant(&self, inst: InstId) -> Option<i32> {
        match self.graph.inst(inst).op {
            InstKind::Constant(ConstValue::Int(value)) => Some(value),
            _ => None,
        }
    }

    fn block_state(&mut self) -> &mut BlockState {
        match self.current {
            Some(ref mut state) => state,
            None => panic!("no block is being lowered"),
        }
    }

    pub(crate) fn current_block(&self) -> BlockId {
        match self.current {
            Some(ref state) => state.id,
            None => panic!("no block is being lowered"),
        }
    }

    pub(crate) fn lir(&mut self) -> &mut LirList {
        &mut self.block_state().lir
    }

    pub(crate) fn append(&mut self, op: LirOp) -> CodePosition {
        self.lir().append(op)
    }

    pub(crate) fn bind_label(&mut self, label: LabelId) {
        let pos = self.append(LirOp::Label(label));
        self.labels.bind(label, pos);
    }

    pub fn finish(self, order: Vec<BlockId>) -> LoweredMethod {
        assert!(self.current.is_none(), "finished while lowering a block");

        let blocks: Vec<LirList> = self.blocks.into_iter().flatten().collect();
        let (debug_infos, call_sites) = collect_tables(&blocks);

        LoweredMethod {
            method: self.graph.method,
            order,
            blocks,
            variable_count: self.pool.variable_count(),
            operands: self.operands,
            labels: self.labels,
            frame_map: self.frame_map,
            debug_infos,
            call_sites,
            deopt_stubs: self.deopt_stubs,
        }
    }
}

/// Lowering order: reverse post order from the entry block, followed by the
/// blocks only reachable through exception edges.
pub fn block_order(graph: &Graph) -> Vec<BlockId> {
    let mut visited = FixedBitSet::with_capacity(graph.block_count());
    let mut order = Vec::with_capacity(graph.block_count());

    let handlers = graph
        .blocks
        .iter()
        .filter(|block| block.is_exception_entry)
        .map(|block| block.id);

    for root in std::iter::once(graph.entry).chain(handlers) {
        if visited.contains(root.to_usize()) {
            continue;
        }

        let mut postorder = Vec::new();
        let mut stack = vec![(root, 0)];
        visited.insert(root.to_usize());

        while let Some((block, next)) = stack.pop() {
            let successors = &graph.block(block).successors;

            if next < successors.len() {
                stack.push((block, next + 1));
                let sux = successors[next];

                if !visited.contains(sux.to_usize()) {
                    visited.insert(sux.to_usize());
                    stack.push((sux, 0));
                }
            } else {
                postorder.push(block);
            }
        }

        order.extend(postorder.into_iter().rev());
    }

    order
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::reduce::ShiftAddReduction;
    use crate::templates::DefaultTemplates;
    use cinder_hir::{ArithOp, Condition, GraphBuilder, MethodData, MethodId};

    pub(crate) fn static_method(program: &mut Program, params: Vec<Kind>, return_kind: Kind) -> MethodId {
        let holder = program.add_class("Test", None);
        program.add_method(MethodData {
            name: "run".into(),
            holder,
            params,
            return_kind,
            is_static: true,
            vtable_index: None,
            is_resolved: true,
        })
    }

    /// Runs `check` with a selector that has entered the entry block of a
    /// static `(int, int) -> int` method holding the values from `build`.
    pub(crate) fn with_selector<B, C>(target: Target, build: B, check: C)
    where
        B: FnOnce(&mut GraphBuilder) -> Vec<InstId>,
        C: FnOnce(&mut InstructionSelector, &[InstId]),
    {
        let mut program = Program::new();
        let method = static_method(&mut program, vec![Kind::Int, Kind::Int], Kind::Int);
        with_program(target, &program, method, build, check);
    }

    pub(crate) fn with_program<B, C>(target: Target, program: &Program, method: MethodId, build: B, check: C)
    where
        B: FnOnce(&mut GraphBuilder) -> Vec<InstId>,
        C: FnOnce(&mut InstructionSelector, &[InstId]),
    {
        let templates = DefaultTemplates::new(&target);
        with_templates(target, &templates, program, method, build, check);
    }

    pub(crate) fn with_templates<B, C>(
        target: Target,
        templates: &dyn TemplateProvider,
        program: &Program,
        method: MethodId,
        build: B,
        check: C,
    ) where
        B: FnOnce(&mut GraphBuilder) -> Vec<InstId>,
        C: FnOnce(&mut InstructionSelector, &[InstId]),
    {
        let mut b = GraphBuilder::new(program, method);
        let insts = build(&mut b);
        b.ret(None);
        let graph = b.finish();

        let flags = LowerFlags::default();
        let stubs = StubRegistry::new();
        let mut sel = InstructionSelector::new(
            program,
            &graph,
            &target,
            &flags,
            templates,
            &stubs,
            &ShiftAddReduction,
        );

        sel.enter(graph.entry).unwrap();
        check(&mut sel, &insts);
    }

    #[test]
    fn test_block_order_puts_handlers_last() {
        let mut program = Program::new();
        let method = static_method(&mut program, vec![Kind::Int], Kind::Void);
        let mut b = GraphBuilder::new(&program, method);
        let join = b.create_block();
        let then = b.create_block();
        let handler = b.create_block();
        b.set_exception_entry(handler);

        let zero = b.int(0);
        let p0 = b.param(0);
        b.if_(p0, Condition::Eq, zero, then, join);
        b.switch_to(then);
        b.goto(join);
        b.switch_to(join);
        b.ret(None);
        b.switch_to(handler);
        b.ret(None);
        let graph = b.finish();

        let order = block_order(&graph);
        assert_eq!(order, vec![BlockId(0), BlockId(2), BlockId(1), BlockId(3)]);
    }

    #[test]
    fn test_shared_producer_selected_once() {
        with_selector(
            Target::arm64(),
            |b| {
                let p0 = b.param(0);
                let p1 = b.param(1);
                let sum = b.arith(ArithOp::Add, p0, p1);
                let twice = b.arith(ArithOp::Add, sum, sum);
                vec![sum, twice]
            },
            |sel, insts| {
                sel.lower_instructions(BlockId(0)).unwrap();
                let arith = sel
                    .lir()
                    .ops()
                    .iter()
                    .filter(|op| matches!(op, LirOp::Arith { .. }))
                    .count();

                assert_eq!(arith, 2);
                assert!(sel.operand(insts[1]).unwrap().is_variable());
            },
        );
    }

    #[test]
    fn test_constant_cache_is_block_scoped() {
        let mut program = Program::new();
        let method = static_method(&mut program, Vec::new(), Kind::Void);
        let mut b = GraphBuilder::new(&program, method);
        let next = b.create_block();
        let big = b.long(1 << 40);
        b.goto(next);
        b.switch_to(next);
        b.ret(None);
        let graph = b.finish();

        let target = Target::x64();
        let flags = LowerFlags::default();
        let templates = DefaultTemplates::new(&target);
        let stubs = StubRegistry::new();
        let mut sel = InstructionSelector::new(
            &program,
            &graph,
            &target,
            &flags,
            &templates,
            &stubs,
            &ShiftAddReduction,
        );

        sel.enter(BlockId(0)).unwrap();
        let first = sel.load_constant(ConstValue::Long(1 << 40)).unwrap();
        assert_eq!(sel.load_constant(ConstValue::Long(1 << 40)).unwrap(), first);
        sel.leave();

        sel.enter(BlockId(1)).unwrap();
        let second = sel.load_constant(ConstValue::Long(1 << 40)).unwrap();
        assert_ne!(first, second);
        assert_eq!(sel.operand(big).unwrap(), Operand::long(1 << 40));
    }

    #[test]
    #[should_panic(expected = "lowered twice")]
    fn test_block_lowered_twice() {
        with_selector(
            Target::x64(),
            |_| Vec::new(),
            |sel, _| {
                sel.lower_instructions(BlockId(0)).unwrap();
                sel.leave();
                sel.enter(BlockId(0)).unwrap();
            },
        );
    }

    #[test]
    #[should_panic(expected = "used before it was selected")]
    fn test_pinned_use_before_selection() {
        let mut program = Program::new();
        let method = static_method(&mut program, vec![Kind::Int, Kind::Int], Kind::Int);
        let mut b = GraphBuilder::new(&program, method);
        let p0 = b.param(0);
        let p1 = b.param(1);
        let div = b.arith(ArithOp::Div, p0, p1);
        b.ret(Some(div));
        let graph = b.finish();

        let target = Target::arm64();
        let flags = LowerFlags::default();
        let templates = DefaultTemplates::new(&target);
        let stubs = StubRegistry::new();
        let mut sel = InstructionSelector::new(
            &program,
            &graph,
            &target,
            &flags,
            &templates,
            &stubs,
            &ShiftAddReduction,
        );

        sel.enter(BlockId(0)).unwrap();
        let _ = sel.operand(div);
    }

    #[test]
    #[should_panic(expected = "selected while selecting itself")]
    fn test_cyclic_producers() {
        let mut program = Program::new();
        let method = static_method(&mut program, vec![Kind::Int], Kind::Int);
        let mut b = GraphBuilder::new(&program, method);
        let p0 = b.param(0);
        let first = b.arith(ArithOp::Add, p0, p0);
        let second = b.arith(ArithOp::Add, first, p0);
        b.ret(Some(second));
        let mut graph = b.finish();

        if let InstKind::Arithmetic { ref mut x, .. } = graph.inst_mut(first).op {
            *x = second;
        }

        let target = Target::arm64();
        let flags = LowerFlags::default();
        let templates = DefaultTemplates::new(&target);
        let stubs = StubRegistry::new();
        let mut sel = InstructionSelector::new(
            &program,
            &graph,
            &target,
            &flags,
            &templates,
            &stubs,
            &ShiftAddReduction,
        );

        sel.enter(BlockId(0)).unwrap();
        let _ = sel.operand(second);
    }

    #[test]
    fn test_force_to_spill_flags() {
        with_selector(
            Target::x64(),
            |b| vec![b.param(0)],
            |sel, insts| {
                let value = sel.operand(insts[0]).unwrap();
                let start = sel.force_to_spill(value.clone(), Kind::Float, false).unwrap();
                let stay = sel.force_to_spill(value, Kind::Int, true).unwrap();

                let start = start.as_variable().unwrap();
                let stay = stay.as_variable().unwrap();
                assert_eq!(start.kind, Kind::Float);
                assert!(sel.pool.has_flag(start, VariableFlag::MustStartInMemory));
                assert!(sel.pool.has_flag(stay, VariableFlag::MustStayInMemory));
                assert!(!sel.pool.has_flag(stay, VariableFlag::MustStartInMemory));
            },
        );
    }
}
