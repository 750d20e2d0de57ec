use fixedbitset::FixedBitSet;
use id_arena::Id;

use crate::{BlockId, InstId, MethodId, TypeId};

pub type StateId = Id<FrameState>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// `None` catches everything.
    pub catch_type: Option<TypeId>,
    pub handler: BlockId,
    pub handler_bci: u32,
}

impl ExceptionHandler {
    pub fn is_catch_all(&self) -> bool {
        self.catch_type.is_none()
    }
}

/// Values of locals, operand stack and locks at one program point. States of
/// inlined callees link to the caller's state through `outer`.
#[derive(Clone, Debug)]
pub struct FrameState {
    pub method: MethodId,
    pub bci: u32,
    pub locals: Vec<Option<InstId>>,
    pub stack: Vec<InstId>,
    pub locks: Vec<InstId>,
    /// Locals known to be live; all locals count as live without it.
    pub live_locals: Option<FixedBitSet>,
    pub outer: Option<StateId>,
    pub handlers: Vec<ExceptionHandler>,
}

impl FrameState {
    pub fn new(method: MethodId, bci: u32, max_locals: usize) -> FrameState {
        FrameState {
            method,
            bci,
            locals: vec![None; max_locals],
            stack: Vec::new(),
            locks: Vec::new(),
            live_locals: None,
            outer: None,
            handlers: Vec::new(),
        }
    }

    pub fn is_local_live(&self, index: usize) -> bool {
        match self.live_locals {
            Some(ref live) => live.contains(index),
            None => true,
        }
    }

    /// Values this state keeps alive, without the outer states.
    pub fn values(&self) -> Vec<InstId> {
        let mut values = Vec::new();

        for (index, local) in self.locals.iter().enumerate() {
            if let Some(local) = local {
                if self.is_local_live(index) {
                    values.push(*local);
                }
            }
        }

        values.extend(self.stack.iter().copied());
        values.extend(self.locks.iter().copied());
        values
    }
}
