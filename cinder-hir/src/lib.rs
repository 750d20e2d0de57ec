pub use self::builder::GraphBuilder;
pub use self::constant::{ConstValue, ObjectHandle};
pub use self::display::dump_graph;
pub use self::graph::{Block, BlockId, Graph};
pub use self::inst::{InstId, InstKind, Instruction};
pub use self::kind::Kind;
pub use self::ops::{
    ArithOp, CompareOp, Condition, ConvertOp, DeoptAction, InvokeKind, LogicOp, ShiftOp,
};
pub use self::program::{
    FieldData, FieldId, MethodData, MethodId, Program, TypeData, TypeId, TypeKind,
};
pub use self::runtime::{Intrinsic, RuntimeCall};
pub use self::state::{ExceptionHandler, FrameState, StateId};

mod builder;
mod constant;
mod display;
mod graph;
mod inst;
mod kind;
mod ops;
mod program;
mod runtime;
mod state;
