use id_arena::Arena;

use crate::{ExceptionHandler, FrameState, InstId, InstKind, Instruction, MethodId, StateId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    pub fn to_usize(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
pub struct Block {
    pub id: BlockId,
    /// Pinned and floating instructions in program order, block end last.
    pub instructions: Vec<InstId>,
    pub phis: Vec<InstId>,
    pub predecessors: Vec<BlockId>,
    pub successors: Vec<BlockId>,
    pub is_exception_entry: bool,
}

impl Block {
    pub fn new(id: BlockId) -> Block {
        Block {
            id,
            instructions: Vec::new(),
            phis: Vec::new(),
            predecessors: Vec::new(),
            successors: Vec::new(),
            is_exception_entry: false,
        }
    }
}

/// Control-flow graph of one method.
#[derive(Debug)]
pub struct Graph {
    pub method: MethodId,
    pub insts: Arena<Instruction>,
    pub states: Arena<FrameState>,
    pub blocks: Vec<Block>,
    pub entry: BlockId,
    /// Parameter locals, receiver first.
    pub locals: Vec<InstId>,
}

impl Graph {
    pub fn inst(&self, id: InstId) -> &Instruction {
        &self.insts[id]
    }

    pub fn inst_mut(&mut self, id: InstId) -> &mut Instruction {
        &mut self.insts[id]
    }

    pub fn inst_count(&self) -> usize {
        self.insts.len()
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.to_usize()]
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn state(&self, id: StateId) -> &FrameState {
        &self.states[id]
    }

    pub fn block_end(&self, id: BlockId) -> Option<InstId> {
        let last = *self.block(id).instructions.last()?;

        if self.inst(last).op.is_block_end() {
            Some(last)
        } else {
            None
        }
    }

    /// Value flowing into `phi` over the edge from `pred`.
    pub fn phi_input(&self, phi: InstId, pred: BlockId) -> Option<InstId> {
        match self.inst(phi).op {
            InstKind::Phi { ref inputs, .. } => inputs
                .iter()
                .find(|(block, _)| *block == pred)
                .map(|(_, value)| *value),
            _ => panic!("instruction {} is not a phi", phi.index()),
        }
    }

    /// Live values of `state` and all of its outer states.
    pub fn state_values(&self, state: StateId) -> Vec<InstId> {
        let mut values = Vec::new();
        let mut current = Some(state);

        while let Some(id) = current {
            let state = self.state(id);
            values.extend(state.values());
            current = state.outer;
        }

        values
    }

    /// Handlers covering `state`, innermost scope first.
    pub fn handlers(&self, state: StateId) -> Vec<ExceptionHandler> {
        let mut handlers = Vec::new();
        let mut current = Some(state);

        while let Some(id) = current {
            let state = self.state(id);
            handlers.extend(state.handlers.iter().cloned());
            current = state.outer;
        }

        handlers
    }
}
