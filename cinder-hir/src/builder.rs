use id_arena::Arena;

use crate::{
    ArithOp, Block, BlockId, Condition, ConstValue, ExceptionHandler, FrameState, Graph, InstId,
    InstKind, Instruction, InvokeKind, Kind, MethodId, Program, StateId, TypeId,
};

/// Builds a `Graph` block by block. Pinned instructions get the current
/// frame state attached as their state before; constants and locals float
/// and are never added to a block.
pub struct GraphBuilder<'a> {
    program: &'a Program,
    graph: Graph,
    current: BlockId,
    state: Option<StateId>,
    bci: u32,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(program: &'a Program, method: MethodId) -> GraphBuilder<'a> {
        let entry = BlockId(0);
        let mut graph = Graph {
            method,
            insts: Arena::new(),
            states: Arena::new(),
            blocks: vec![Block::new(entry)],
            entry,
            locals: Vec::new(),
        };

        let kinds = program.signature_kinds(method);
        let mut state = FrameState::new(method, 0, kinds.len());

        for (index, kind) in kinds.iter().enumerate() {
            let local = graph.insts.alloc(Instruction {
                kind: *kind,
                op: InstKind::Local {
                    index: index as u32,
                },
                bci: 0,
                is_live: true,
                is_pinned: false,
                state_before: None,
                state_after: None,
                exact_type: None,
                declared_type: None,
                exception_edge: None,
            });
            graph.locals.push(local);
            state.locals[index] = Some(local);
        }

        let state = graph.states.alloc(state);

        GraphBuilder {
            program,
            graph,
            current: entry,
            state: Some(state),
            bci: 0,
        }
    }

    pub fn program(&self) -> &Program {
        self.program
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn param(&self, index: usize) -> InstId {
        self.graph.locals[index]
    }

    pub fn entry(&self) -> BlockId {
        self.graph.entry
    }

    pub fn create_block(&mut self) -> BlockId {
        let id = BlockId(self.graph.blocks.len() as u32);
        self.graph.blocks.push(Block::new(id));
        id
    }

    pub fn switch_to(&mut self, block: BlockId) {
        self.current = block;
    }

    pub fn current_block(&self) -> BlockId {
        self.current
    }

    pub fn set_bci(&mut self, bci: u32) {
        self.bci = bci;
    }

    pub fn set_exception_entry(&mut self, block: BlockId) {
        self.graph.blocks[block.to_usize()].is_exception_entry = true;
    }

    pub fn current_state(&self) -> Option<StateId> {
        self.state
    }

    pub fn set_state(&mut self, state: Option<StateId>) {
        self.state = state;
    }

    pub fn add_state(&mut self, state: FrameState) -> StateId {
        self.graph.states.alloc(state)
    }

    /// Copies the current state with `stack` as operand stack and makes the
    /// copy current.
    pub fn push_stack(&mut self, stack: Vec<InstId>) -> StateId {
        let mut state = self.copy_state();
        state.stack = stack;
        self.install_state(state)
    }

    pub fn set_local(&mut self, index: usize, value: InstId) -> StateId {
        let mut state = self.copy_state();
        if state.locals.len() <= index {
            state.locals.resize(index + 1, None);
        }
        state.locals[index] = Some(value);
        self.install_state(state)
    }

    /// Makes `handler` cover all instructions appended from now on.
    pub fn add_handler(&mut self, catch_type: Option<TypeId>, handler: BlockId) -> StateId {
        let mut state = self.copy_state();
        state.handlers.push(ExceptionHandler {
            catch_type,
            handler,
            handler_bci: self.bci,
        });
        self.install_state(state)
    }

    fn copy_state(&self) -> FrameState {
        match self.state {
            Some(state) => {
                let mut state = self.graph.state(state).clone();
                state.bci = self.bci;
                state
            }
            None => FrameState::new(self.graph.method, self.bci, 0),
        }
    }

    fn install_state(&mut self, state: FrameState) -> StateId {
        let id = self.graph.states.alloc(state);
        self.state = Some(id);
        id
    }

    pub fn constant(&mut self, value: ConstValue) -> InstId {
        self.alloc(value.kind(), InstKind::Constant(value), false)
    }

    pub fn int(&mut self, value: i32) -> InstId {
        self.constant(ConstValue::Int(value))
    }

    pub fn long(&mut self, value: i64) -> InstId {
        self.constant(ConstValue::Long(value))
    }

    pub fn null(&mut self) -> InstId {
        self.constant(ConstValue::Null)
    }

    pub fn phi(&mut self, block: BlockId, kind: Kind) -> InstId {
        let phi = self.alloc(
            kind.stack_kind(),
            InstKind::Phi {
                block,
                inputs: Vec::new(),
            },
            false,
        );
        self.graph.blocks[block.to_usize()].phis.push(phi);
        phi
    }

    pub fn add_phi_input(&mut self, phi: InstId, pred: BlockId, value: InstId) {
        match self.graph.inst_mut(phi).op {
            InstKind::Phi { ref mut inputs, .. } => inputs.push((pred, value)),
            _ => panic!("instruction {} is not a phi", phi.index()),
        }
    }

    /// Appends `op` to the current block. Instructions with side effects
    /// or that may trap are pinned.
    pub fn append(&mut self, kind: Kind, op: InstKind) -> InstId {
        let pinned = is_pinned(&op);
        let id = self.alloc(kind, op, pinned);
        self.graph.blocks[self.current.to_usize()]
            .instructions
            .push(id);
        id
    }

    fn alloc(&mut self, kind: Kind, op: InstKind, pinned: bool) -> InstId {
        let state_before = if pinned { self.state } else { None };

        self.graph.insts.alloc(Instruction {
            kind,
            op,
            bci: self.bci,
            is_live: true,
            is_pinned: pinned,
            state_before,
            state_after: None,
            exact_type: None,
            declared_type: None,
            exception_edge: None,
        })
    }

    pub fn set_types(&mut self, inst: InstId, exact: Option<TypeId>, declared: Option<TypeId>) {
        let inst = self.graph.inst_mut(inst);
        inst.exact_type = exact;
        inst.declared_type = declared;
    }

    pub fn set_exception_edge(&mut self, inst: InstId, handler: BlockId) {
        self.graph.inst_mut(inst).exception_edge = Some(handler);
    }

    pub fn set_state_after(&mut self, inst: InstId, state: StateId) {
        self.graph.inst_mut(inst).state_after = Some(state);
    }

    pub fn kill(&mut self, inst: InstId) {
        self.graph.inst_mut(inst).is_live = false;
    }

    pub fn arith(&mut self, op: ArithOp, x: InstId, y: InstId) -> InstId {
        let kind = self.graph.inst(x).kind.stack_kind();
        let can_trap = kind.is_int() || kind.is_long();
        let can_trap = can_trap && (op == ArithOp::Div || op == ArithOp::Rem);
        self.append(
            kind,
            InstKind::Arithmetic {
                op,
                x,
                y,
                can_trap,
            },
        )
    }

    pub fn invoke(&mut self, opcode: InvokeKind, target: MethodId, args: Vec<InstId>) -> InstId {
        let kind = self.program.method(target).return_kind.stack_kind();
        self.append(
            kind,
            InstKind::Invoke {
                opcode,
                target,
                args,
            },
        )
    }

    /// Jumps to `sux`; jumps to a block created no later than the current
    /// one count as backward branches.
    pub fn goto(&mut self, sux: BlockId) -> InstId {
        let is_safepoint = sux <= self.current;
        self.append(Kind::Void, InstKind::Goto { sux, is_safepoint })
    }

    pub fn if_(
        &mut self,
        x: InstId,
        cond: Condition,
        y: InstId,
        true_sux: BlockId,
        false_sux: BlockId,
    ) -> InstId {
        let is_safepoint = true_sux <= self.current || false_sux <= self.current;
        self.append(
            Kind::Void,
            InstKind::If {
                x,
                y,
                cond,
                true_sux,
                false_sux,
                unordered_is_true: false,
                is_safepoint,
            },
        )
    }

    pub fn ret(&mut self, value: Option<InstId>) -> InstId {
        self.append(Kind::Void, InstKind::Return { value })
    }

    pub fn finish(mut self) -> Graph {
        let count = self.graph.blocks.len();

        for index in 0..count {
            let block = BlockId(index as u32);
            let successors = match self.graph.block_end(block) {
                Some(end) => self.graph.inst(end).op.successors(),
                None => Vec::new(),
            };

            for &sux in &successors {
                let preds = &mut self.graph.blocks[sux.to_usize()].predecessors;
                if !preds.contains(&block) {
                    preds.push(block);
                }
            }

            self.graph.blocks[index].successors = successors;
        }

        self.graph
    }
}

fn is_pinned(op: &InstKind) -> bool {
    match op {
        InstKind::Local { .. }
        | InstKind::Constant(_)
        | InstKind::Phi { .. }
        | InstKind::Negate { .. }
        | InstKind::Shift { .. }
        | InstKind::Logic { .. }
        | InstKind::Compare { .. }
        | InstKind::Convert { .. }
        | InstKind::IfOp { .. } => false,
        InstKind::Arithmetic { can_trap, .. } => *can_trap,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MethodData;

    fn program() -> (Program, MethodId) {
        let mut prog = Program::new();
        let holder = prog.add_class("Foo", None);
        let method = prog.add_method(MethodData {
            name: "bar".into(),
            holder,
            params: vec![Kind::Int, Kind::Int],
            return_kind: Kind::Int,
            is_static: true,
            vtable_index: None,
            is_resolved: true,
        });
        (prog, method)
    }

    #[test]
    fn test_locals_from_signature() {
        let (prog, method) = program();
        let builder = GraphBuilder::new(&prog, method);
        let graph = builder.finish();

        assert_eq!(graph.locals.len(), 2);
        assert_eq!(graph.inst(graph.locals[1]).kind, Kind::Int);
        assert!(graph.block(graph.entry).instructions.is_empty());
    }

    #[test]
    fn test_predecessors_and_pinning() {
        let (prog, method) = program();
        let mut b = GraphBuilder::new(&prog, method);
        let then_block = b.create_block();
        let else_block = b.create_block();
        let join = b.create_block();

        let x = b.param(0);
        let y = b.param(1);
        b.if_(x, Condition::Lt, y, then_block, else_block);

        b.switch_to(then_block);
        let sum = b.arith(ArithOp::Add, x, y);
        b.goto(join);

        b.switch_to(else_block);
        let quot = b.arith(ArithOp::Div, x, y);
        b.goto(join);

        b.switch_to(join);
        let phi = b.phi(join, Kind::Int);
        b.add_phi_input(phi, then_block, sum);
        b.add_phi_input(phi, else_block, quot);
        b.ret(Some(phi));

        let graph = b.finish();
        assert_eq!(graph.block(join).predecessors, vec![then_block, else_block]);
        assert_eq!(graph.block(graph.entry).successors, vec![then_block, else_block]);
        assert!(!graph.inst(sum).is_pinned);
        assert!(graph.inst(quot).is_pinned);
        assert!(graph.inst(quot).state_before.is_some());
        assert_eq!(graph.phi_input(phi, else_block), Some(quot));
    }

    #[test]
    fn test_backward_goto_is_safepoint() {
        let (prog, method) = program();
        let mut b = GraphBuilder::new(&prog, method);
        let header = b.create_block();
        b.goto(header);
        b.switch_to(header);
        let back = b.goto(header);

        let graph = b.finish();
        match graph.inst(back).op {
            InstKind::Goto { is_safepoint, .. } => assert!(is_safepoint),
            _ => unreachable!(),
        }
        assert_eq!(graph.block(header).predecessors, vec![BlockId(0), header]);
    }

    #[test]
    fn test_handlers_include_outer_states() {
        let (prog, method) = program();
        let mut b = GraphBuilder::new(&prog, method);
        let handler = b.create_block();
        let inner = b.add_handler(None, handler);

        let mut callee = FrameState::new(method, 3, 0);
        callee.outer = Some(inner);
        let callee = b.add_state(callee);

        let graph = b.finish();
        let handlers = graph.handlers(callee);
        assert_eq!(handlers.len(), 1);
        assert!(handlers[0].is_catch_all());
        assert_eq!(graph.state_values(callee).len(), 2);
    }
}
