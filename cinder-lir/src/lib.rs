pub use self::cpu::{CpuFeatures, FReg, Reg, Register};
pub use self::debug::{collect_tables, CallSite, CallSiteTable, CodePosition, DebugInfo, DebugInfoTable};
pub use self::frame_map::{align, FrameMap, StackBlock};
pub use self::list::{LabelId, LabelTable, LirList};
pub use self::op::{
    Barriers, BitOp, BranchTarget, CallKind, CallOp, LirOp, MathFunction, MoveKind, StubId, XirOp,
};
pub use self::operand::{Address, Operand, Scale, StackSlot, Variable};
pub use self::printer::{format_op, print_lir};
pub use self::target::{Arch, CallingConvention, CallingConventionType, Target};
pub use self::xir::{
    CodeTemplate, TemplateBuilder, TemplateConstant, TemplateParam, TemplateResult, TemplateTemp,
    XirInstruction, XirLabel, XirOpcode, XirSlot,
};

pub mod cpu;
mod debug;
mod frame_map;
mod list;
mod op;
mod operand;
mod printer;
mod target;
mod xir;
