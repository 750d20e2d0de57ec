use id_arena::Id;

use crate::{
    ArithOp, BlockId, CompareOp, Condition, ConstValue, ConvertOp, DeoptAction, FieldId,
    Intrinsic, InvokeKind, Kind, LogicOp, MethodId, RuntimeCall, ShiftOp, StateId, TypeId,
};

pub type InstId = Id<Instruction>;

#[derive(Debug)]
pub struct Instruction {
    /// Kind of the produced value, `Void` for instructions without a value.
    pub kind: Kind,
    pub op: InstKind,
    pub bci: u32,
    pub is_live: bool,
    /// Pinned instructions are selected in block order; unpinned ones may
    /// be selected on first use.
    pub is_pinned: bool,
    pub state_before: Option<StateId>,
    pub state_after: Option<StateId>,
    pub exact_type: Option<TypeId>,
    pub declared_type: Option<TypeId>,
    pub exception_edge: Option<BlockId>,
}

impl Instruction {
    pub fn has_value(&self) -> bool {
        self.kind.is_legal()
    }
}

#[derive(Debug)]
pub enum InstKind {
    Local {
        index: u32,
    },
    Constant(ConstValue),
    Phi {
        block: BlockId,
        inputs: Vec<(BlockId, InstId)>,
    },
    Arithmetic {
        op: ArithOp,
        x: InstId,
        y: InstId,
        can_trap: bool,
    },
    Negate {
        x: InstId,
    },
    Shift {
        op: ShiftOp,
        x: InstId,
        y: InstId,
    },
    Logic {
        op: LogicOp,
        x: InstId,
        y: InstId,
    },
    Compare {
        op: CompareOp,
        x: InstId,
        y: InstId,
    },
    Convert {
        op: ConvertOp,
        value: InstId,
    },
    IfOp {
        x: InstId,
        y: InstId,
        cond: Condition,
        tval: InstId,
        fval: InstId,
    },
    LoadField {
        object: InstId,
        field: FieldId,
    },
    StoreField {
        object: InstId,
        field: FieldId,
        value: InstId,
    },
    ArrayLength {
        array: InstId,
    },
    LoadIndexed {
        array: InstId,
        index: InstId,
        elem_kind: Kind,
    },
    StoreIndexed {
        array: InstId,
        index: InstId,
        value: InstId,
        elem_kind: Kind,
    },
    LoadRaw {
        base: InstId,
        index: Option<InstId>,
        log2_scale: u8,
        disp: i32,
    },
    StoreRaw {
        base: InstId,
        index: Option<InstId>,
        log2_scale: u8,
        disp: i32,
        value: InstId,
        kind: Kind,
    },
    UnsafeGet {
        object: InstId,
        offset: InstId,
        is_volatile: bool,
    },
    UnsafePut {
        object: InstId,
        offset: InstId,
        value: InstId,
        kind: Kind,
        is_volatile: bool,
    },
    Prefetch {
        object: InstId,
        offset: InstId,
        is_store: bool,
    },
    /// Adds `increment` to the int counter at `offset` in the profile
    /// data object `mdo`.
    ProfileCounter {
        mdo: InstId,
        offset: i32,
        increment: i32,
    },
    Invoke {
        opcode: InvokeKind,
        target: MethodId,
        args: Vec<InstId>,
    },
    RuntimeCall {
        call: RuntimeCall,
        args: Vec<InstId>,
    },
    Intrinsic {
        intrinsic: Intrinsic,
        args: Vec<InstId>,
    },
    NewInstance {
        ty: TypeId,
    },
    NewTypeArray {
        length: InstId,
        elem_kind: Kind,
    },
    NewObjectArray {
        length: InstId,
        elem_ty: TypeId,
    },
    NewMultiArray {
        ty: TypeId,
        dims: Vec<InstId>,
    },
    CheckCast {
        object: InstId,
        ty: TypeId,
    },
    InstanceOf {
        object: InstId,
        ty: TypeId,
    },
    MonitorEnter {
        object: InstId,
        lock_index: u32,
    },
    MonitorExit {
        object: InstId,
        lock_index: u32,
    },
    NullCheck {
        object: InstId,
    },
    ExceptionObject,
    /// Pointer to the buffer holding the interpreter frame when entering
    /// through on-stack replacement. First instruction of its block.
    OsrEntry,
    Guard {
        x: InstId,
        y: InstId,
        cond: Condition,
        action: DeoptAction,
    },
    Deoptimize {
        action: DeoptAction,
    },
    Goto {
        sux: BlockId,
        is_safepoint: bool,
    },
    If {
        x: InstId,
        y: InstId,
        cond: Condition,
        true_sux: BlockId,
        false_sux: BlockId,
        unordered_is_true: bool,
        is_safepoint: bool,
    },
    TableSwitch {
        value: InstId,
        low_key: i32,
        suxs: Vec<BlockId>,
        default: BlockId,
    },
    LookupSwitch {
        value: InstId,
        keys: Vec<i32>,
        suxs: Vec<BlockId>,
        default: BlockId,
    },
    Return {
        value: Option<InstId>,
    },
    Throw {
        exception: InstId,
    },
}

impl InstKind {
    /// Calls `f` for every producer this instruction consumes. Phi inputs
    /// are not visited: they flow in over control-flow edges.
    pub fn for_each_input<F>(&self, mut f: F)
    where
        F: FnMut(InstId),
    {
        match self {
            InstKind::Local { .. }
            | InstKind::Constant(_)
            | InstKind::Phi { .. }
            | InstKind::NewInstance { .. }
            | InstKind::ExceptionObject
            | InstKind::OsrEntry
            | InstKind::Deoptimize { .. }
            | InstKind::Goto { .. } => {}

            InstKind::Arithmetic { x, y, .. }
            | InstKind::Shift { x, y, .. }
            | InstKind::Logic { x, y, .. }
            | InstKind::Compare { x, y, .. }
            | InstKind::Guard { x, y, .. }
            | InstKind::If { x, y, .. } => {
                f(*x);
                f(*y);
            }

            InstKind::Negate { x } => f(*x),
            InstKind::ProfileCounter { mdo, .. } => f(*mdo),
            InstKind::Convert { value, .. } => f(*value),

            InstKind::IfOp {
                x, y, tval, fval, ..
            } => {
                f(*x);
                f(*y);
                f(*tval);
                f(*fval);
            }

            InstKind::LoadField { object, .. } => f(*object),
            InstKind::StoreField { object, value, .. } => {
                f(*object);
                f(*value);
            }

            InstKind::ArrayLength { array } => f(*array),
            InstKind::LoadIndexed { array, index, .. } => {
                f(*array);
                f(*index);
            }
            InstKind::StoreIndexed {
                array,
                index,
                value,
                ..
            } => {
                f(*array);
                f(*index);
                f(*value);
            }

            InstKind::LoadRaw { base, index, .. } => {
                f(*base);
                if let Some(index) = index {
                    f(*index);
                }
            }
            InstKind::StoreRaw {
                base, index, value, ..
            } => {
                f(*base);
                if let Some(index) = index {
                    f(*index);
                }
                f(*value);
            }

            InstKind::UnsafeGet { object, offset, .. }
            | InstKind::Prefetch { object, offset, .. } => {
                f(*object);
                f(*offset);
            }
            InstKind::UnsafePut {
                object,
                offset,
                value,
                ..
            } => {
                f(*object);
                f(*offset);
                f(*value);
            }

            InstKind::Invoke { args, .. }
            | InstKind::RuntimeCall { args, .. }
            | InstKind::Intrinsic { args, .. } => {
                for &arg in args {
                    f(arg);
                }
            }

            InstKind::NewTypeArray { length, .. } | InstKind::NewObjectArray { length, .. } => {
                f(*length)
            }
            InstKind::NewMultiArray { dims, .. } => {
                for &dim in dims {
                    f(dim);
                }
            }

            InstKind::CheckCast { object, .. }
            | InstKind::InstanceOf { object, .. }
            | InstKind::MonitorEnter { object, .. }
            | InstKind::MonitorExit { object, .. }
            | InstKind::NullCheck { object } => f(*object),

            InstKind::TableSwitch { value, .. } | InstKind::LookupSwitch { value, .. } => {
                f(*value)
            }
            InstKind::Return { value } => {
                if let Some(value) = value {
                    f(*value);
                }
            }
            InstKind::Throw { exception } => f(*exception),
        }
    }

    pub fn inputs(&self) -> Vec<InstId> {
        let mut inputs = Vec::new();
        self.for_each_input(|input| inputs.push(input));
        inputs
    }

    pub fn is_block_end(&self) -> bool {
        match self {
            InstKind::Goto { .. }
            | InstKind::If { .. }
            | InstKind::TableSwitch { .. }
            | InstKind::LookupSwitch { .. }
            | InstKind::Return { .. }
            | InstKind::Throw { .. }
            | InstKind::Deoptimize { .. } => true,
            _ => false,
        }
    }

    /// Successors of a block-ending instruction, without duplicates.
    pub fn successors(&self) -> Vec<BlockId> {
        let mut result = Vec::new();
        let mut add = |block: BlockId| {
            if !result.contains(&block) {
                result.push(block);
            }
        };

        match self {
            InstKind::Goto { sux, .. } => add(*sux),
            InstKind::If {
                true_sux,
                false_sux,
                ..
            } => {
                add(*true_sux);
                add(*false_sux);
            }
            InstKind::TableSwitch { suxs, default, .. }
            | InstKind::LookupSwitch { suxs, default, .. } => {
                for &sux in suxs {
                    add(sux);
                }
                add(*default);
            }
            _ => {}
        }

        result
    }

    pub fn name(&self) -> &'static str {
        match self {
            InstKind::Local { .. } => "Local",
            InstKind::Constant(_) => "Constant",
            InstKind::Phi { .. } => "Phi",
            InstKind::Arithmetic { .. } => "Arithmetic",
            InstKind::Negate { .. } => "Negate",
            InstKind::Shift { .. } => "Shift",
            InstKind::Logic { .. } => "Logic",
            InstKind::Compare { .. } => "Compare",
            InstKind::Convert { .. } => "Convert",
            InstKind::IfOp { .. } => "IfOp",
            InstKind::LoadField { .. } => "LoadField",
            InstKind::StoreField { .. } => "StoreField",
            InstKind::ArrayLength { .. } => "ArrayLength",
            InstKind::LoadIndexed { .. } => "LoadIndexed",
            InstKind::StoreIndexed { .. } => "StoreIndexed",
            InstKind::LoadRaw { .. } => "LoadRaw",
            InstKind::StoreRaw { .. } => "StoreRaw",
            InstKind::UnsafeGet { .. } => "UnsafeGet",
            InstKind::UnsafePut { .. } => "UnsafePut",
            InstKind::Prefetch { .. } => "Prefetch",
            InstKind::ProfileCounter { .. } => "ProfileCounter",
            InstKind::Invoke { .. } => "Invoke",
            InstKind::RuntimeCall { .. } => "RuntimeCall",
            InstKind::Intrinsic { .. } => "Intrinsic",
            InstKind::NewInstance { .. } => "NewInstance",
            InstKind::NewTypeArray { .. } => "NewTypeArray",
            InstKind::NewObjectArray { .. } => "NewObjectArray",
            InstKind::NewMultiArray { .. } => "NewMultiArray",
            InstKind::CheckCast { .. } => "CheckCast",
            InstKind::InstanceOf { .. } => "InstanceOf",
            InstKind::MonitorEnter { .. } => "MonitorEnter",
            InstKind::MonitorExit { .. } => "MonitorExit",
            InstKind::NullCheck { .. } => "NullCheck",
            InstKind::ExceptionObject => "ExceptionObject",
            InstKind::OsrEntry => "OsrEntry",
            InstKind::Guard { .. } => "Guard",
            InstKind::Deoptimize { .. } => "Deoptimize",
            InstKind::Goto { .. } => "Goto",
            InstKind::If { .. } => "If",
            InstKind::TableSwitch { .. } => "TableSwitch",
            InstKind::LookupSwitch { .. } => "LookupSwitch",
            InstKind::Return { .. } => "Return",
            InstKind::Throw { .. } => "Throw",
        }
    }
}
