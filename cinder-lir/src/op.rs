use std::fmt;
use std::sync::Arc;

use cinder_hir::{
    ArithOp, BlockId, CompareOp, Condition, ConvertOp, Kind, LogicOp, MethodId, RuntimeCall,
    ShiftOp,
};

use crate::debug::DebugInfo;
use crate::list::LabelId;
use crate::operand::{Address, Operand};
use crate::xir::CodeTemplate;

/// Compiler stub shared by all compiled methods.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
pub struct StubId(pub u32);

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum MoveKind {
    Normal,
    /// Two-word value into a two-word stack slot.
    Wide,
    /// Single-copy atomic move of a double-word value.
    Volatile,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BranchTarget {
    Block(BlockId),
    Label(LabelId),
    Stub(StubId),
}

impl fmt::Display for BranchTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BranchTarget::Block(block) => write!(f, "B{}", block.0),
            BranchTarget::Label(label) => write!(f, "L{}", label.0),
            BranchTarget::Stub(stub) => write!(f, "stub{}", stub.0),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Barriers(pub u8);

impl Barriers {
    pub const LOAD_LOAD: Barriers = Barriers(1);
    pub const LOAD_STORE: Barriers = Barriers(2);
    pub const STORE_LOAD: Barriers = Barriers(4);
    pub const STORE_STORE: Barriers = Barriers(8);

    pub const ACQUIRE: Barriers = Barriers(1 | 2);
    pub const RELEASE: Barriers = Barriers(2 | 8);
    pub const FULL: Barriers = Barriers(1 | 2 | 4 | 8);

    pub fn contains(self, other: Barriers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn name(self) -> &'static str {
        match self {
            Barriers::ACQUIRE => "acquire",
            Barriers::RELEASE => "release",
            Barriers::FULL => "full",
            Barriers::LOAD_LOAD => "load_load",
            Barriers::LOAD_STORE => "load_store",
            Barriers::STORE_LOAD => "store_load",
            Barriers::STORE_STORE => "store_store",
            _ => "mixed",
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CallKind {
    Direct(MethodId),
    Indirect(MethodId),
    Runtime(RuntimeCall),
}

#[derive(Clone, Debug)]
pub struct CallOp {
    pub kind: CallKind,
    pub result: Operand,
    pub arguments: Vec<Operand>,
    pub info: Option<DebugInfo>,
    /// Outgoing stack arguments holding references.
    pub pointer_slots: Vec<Operand>,
}

/// One instantiation of a code template. `slots` holds the operand of every
/// template slot; `operand_indices` lists the slots the register allocator
/// sees, inputs first, then destroyed inputs, then temporaries.
#[derive(Clone, Debug)]
pub struct XirOp {
    pub template: Arc<CodeTemplate>,
    pub slots: Vec<Operand>,
    pub result: Operand,
    pub operand_indices: Vec<usize>,
    pub input_count: usize,
    pub input_temp_count: usize,
    pub temp_count: usize,
    pub result_index: Option<usize>,
    pub info: Option<DebugInfo>,
    pub info_after: Option<DebugInfo>,
    pub method: Option<MethodId>,
}

impl XirOp {
    pub fn inputs(&self) -> &[usize] {
        &self.operand_indices[..self.input_count]
    }

    pub fn input_temps(&self) -> &[usize] {
        let start = self.input_count;
        &self.operand_indices[start..start + self.input_temp_count]
    }

    pub fn temps(&self) -> &[usize] {
        let start = self.input_count + self.input_temp_count;
        &self.operand_indices[start..start + self.temp_count]
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum MathFunction {
    Sqrt,
    Abs,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BitOp {
    PopCount,
    LeadingZeros,
    TrailingZeros,
}

#[derive(Clone, Debug)]
pub enum LirOp {
    Label(LabelId),
    BlockLabel(BlockId),
    StdEntry,
    /// Builds the frame for an on-stack replacement entry. The operand is
    /// the register holding the buffer with the interpreter frame.
    OsrEntry(Operand),

    Move {
        src: Operand,
        dst: Operand,
        kind: MoveKind,
        info: Option<DebugInfo>,
    },
    Lea {
        address: Address,
        result: Operand,
    },

    Arith {
        op: ArithOp,
        x: Operand,
        y: Operand,
        result: Operand,
        tmp: Operand,
        info: Option<DebugInfo>,
    },
    Negate {
        x: Operand,
        result: Operand,
    },
    Shift {
        op: ShiftOp,
        x: Operand,
        count: Operand,
        result: Operand,
    },
    Logic {
        op: LogicOp,
        x: Operand,
        y: Operand,
        result: Operand,
    },
    Cmp {
        cond: Condition,
        x: Operand,
        y: Operand,
    },
    CompareToInt {
        op: CompareOp,
        x: Operand,
        y: Operand,
        result: Operand,
    },
    Convert {
        op: ConvertOp,
        src: Operand,
        result: Operand,
    },
    CondMove {
        cond: Condition,
        tval: Operand,
        fval: Operand,
        result: Operand,
    },
    MathOp {
        function: MathFunction,
        x: Operand,
        result: Operand,
    },
    BitOp {
        op: BitOp,
        x: Operand,
        result: Operand,
    },

    Branch {
        cond: Condition,
        kind: Kind,
        target: BranchTarget,
        unordered: Option<BlockId>,
        info: Option<DebugInfo>,
    },
    Jump {
        target: BranchTarget,
        info: Option<DebugInfo>,
    },
    TableSwitch {
        index: Operand,
        low_key: i32,
        targets: Vec<BlockId>,
        default: BlockId,
        tmp: Operand,
    },

    NullCheck {
        object: Operand,
        info: DebugInfo,
    },
    MemoryBarrier(Barriers),

    Call(CallOp),
    Xir(Box<XirOp>),

    Safepoint {
        info: DebugInfo,
    },
    ThrowException {
        exception_pc: Operand,
        exception: Operand,
        info: DebugInfo,
    },
    UnwindException {
        exception: Operand,
        info: DebugInfo,
    },
    Return(Operand),

    Prefetch {
        address: Address,
        is_store: bool,
    },
    CompareAndSwap {
        address: Address,
        expected: Operand,
        new_value: Operand,
        tmp1: Operand,
        tmp2: Operand,
    },
}

impl LirOp {
    /// Debug infos attached to this op, in order of their code position.
    pub fn infos(&self) -> Vec<&DebugInfo> {
        match self {
            LirOp::Move { info, .. }
            | LirOp::Arith { info, .. }
            | LirOp::Branch { info, .. }
            | LirOp::Jump { info, .. } => info.iter().collect(),
            LirOp::Call(call) => call.info.iter().collect(),
            LirOp::Xir(xir) => xir.info.iter().chain(xir.info_after.iter()).collect(),
            LirOp::NullCheck { info, .. }
            | LirOp::Safepoint { info }
            | LirOp::ThrowException { info, .. }
            | LirOp::UnwindException { info, .. } => vec![info],
            _ => Vec::new(),
        }
    }

    pub fn is_block_end(&self) -> bool {
        match self {
            LirOp::Jump { .. }
            | LirOp::TableSwitch { .. }
            | LirOp::Return(_)
            | LirOp::ThrowException { .. }
            | LirOp::UnwindException { .. } => true,
            _ => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LirOp::Label(_) => "label",
            LirOp::BlockLabel(_) => "block",
            LirOp::StdEntry => "std_entry",
            LirOp::OsrEntry(_) => "osr_entry",
            LirOp::Move { .. } => "move",
            LirOp::Lea { .. } => "lea",
            LirOp::Arith { op, .. } => op.name(),
            LirOp::Negate { .. } => "neg",
            LirOp::Shift { op, .. } => op.name(),
            LirOp::Logic { op, .. } => op.name(),
            LirOp::Cmp { .. } => "cmp",
            LirOp::CompareToInt { op, .. } => op.name(),
            LirOp::Convert { .. } => "convert",
            LirOp::CondMove { .. } => "cmove",
            LirOp::MathOp { function, .. } => match function {
                MathFunction::Sqrt => "sqrt",
                MathFunction::Abs => "abs",
            },
            LirOp::BitOp { op, .. } => match op {
                BitOp::PopCount => "popcnt",
                BitOp::LeadingZeros => "lzcnt",
                BitOp::TrailingZeros => "tzcnt",
            },
            LirOp::Branch { .. } => "branch",
            LirOp::Jump { .. } => "jump",
            LirOp::TableSwitch { .. } => "tableswitch",
            LirOp::NullCheck { .. } => "null_check",
            LirOp::MemoryBarrier(_) => "membar",
            LirOp::Call(call) => match call.kind {
                CallKind::Direct(_) => "call_direct",
                CallKind::Indirect(_) => "call_indirect",
                CallKind::Runtime(_) => "call_runtime",
            },
            LirOp::Xir(_) => "xir",
            LirOp::Safepoint { .. } => "safepoint",
            LirOp::ThrowException { .. } => "throw",
            LirOp::UnwindException { .. } => "unwind",
            LirOp::Return(_) => "return",
            LirOp::Prefetch { is_store, .. } => {
                if *is_store {
                    "prefetchw"
                } else {
                    "prefetchr"
                }
            }
            LirOp::CompareAndSwap { .. } => "cas",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barrier_sets() {
        assert!(Barriers::FULL.contains(Barriers::STORE_LOAD));
        assert!(Barriers::ACQUIRE.contains(Barriers::LOAD_LOAD));
        assert!(!Barriers::RELEASE.contains(Barriers::STORE_LOAD));
        assert_eq!(Barriers::RELEASE.name(), "release");
        assert_eq!(Barriers(4 | 8).name(), "mixed");
    }

    #[test]
    fn test_block_end() {
        let jump = LirOp::Jump {
            target: BranchTarget::Block(BlockId(2)),
            info: None,
        };
        assert!(jump.is_block_end());
        assert!(!LirOp::StdEntry.is_block_end());
        assert_eq!(LirOp::Return(Operand::Illegal).name(), "return");
    }
}
