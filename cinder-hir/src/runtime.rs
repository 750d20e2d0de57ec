use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::Kind;

/// Entry points into the runtime that compiled code may call. The numeric
/// value identifies the call in relocation records.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum RuntimeCall {
    UnwindException,
    ThrowException,
    ThrowDivisionByZero,
    ThrowNullPointer,
    ThrowArrayIndexOutOfBounds,
    ThrowClassCast,
    RegisterFinalizer,
    ArithmeticLdiv,
    ArithmeticLrem,
    ArithmeticFrem,
    ArithmeticDrem,
    ArithmeticSin,
    ArithmeticCos,
    ArithmeticTan,
    ArithmeticLog,
    ArithmeticLog10,
    ArrayCopy,
    NewInstance,
    NewArray,
    NewMultiArray,
    MonitorEnter,
    MonitorExit,
    ResolveField,
    ResolveMethod,
    Deoptimize,
    TraceBlockEntry,
    OsrMigrationEnd,
}

impl RuntimeCall {
    pub fn arguments(self) -> &'static [Kind] {
        match self {
            RuntimeCall::UnwindException | RuntimeCall::ThrowException => &[Kind::Object],
            RuntimeCall::ThrowDivisionByZero | RuntimeCall::ThrowNullPointer => &[],
            RuntimeCall::ThrowArrayIndexOutOfBounds => &[Kind::Int],
            RuntimeCall::ThrowClassCast => &[Kind::Object],
            RuntimeCall::RegisterFinalizer => &[Kind::Object],
            RuntimeCall::ArithmeticLdiv | RuntimeCall::ArithmeticLrem => &[Kind::Long, Kind::Long],
            RuntimeCall::ArithmeticFrem => &[Kind::Float, Kind::Float],
            RuntimeCall::ArithmeticDrem => &[Kind::Double, Kind::Double],
            RuntimeCall::ArithmeticSin
            | RuntimeCall::ArithmeticCos
            | RuntimeCall::ArithmeticTan
            | RuntimeCall::ArithmeticLog
            | RuntimeCall::ArithmeticLog10 => &[Kind::Double],
            RuntimeCall::ArrayCopy => &[Kind::Object, Kind::Int, Kind::Object, Kind::Int, Kind::Int],
            RuntimeCall::NewInstance => &[Kind::Object],
            RuntimeCall::NewArray => &[Kind::Object, Kind::Int],
            RuntimeCall::NewMultiArray => &[Kind::Object, Kind::Int, Kind::Word],
            RuntimeCall::MonitorEnter | RuntimeCall::MonitorExit => &[Kind::Object, Kind::Word],
            RuntimeCall::ResolveField | RuntimeCall::ResolveMethod => &[Kind::Int],
            RuntimeCall::Deoptimize => &[],
            RuntimeCall::TraceBlockEntry => &[Kind::Int],
            RuntimeCall::OsrMigrationEnd => &[Kind::Word],
        }
    }

    pub fn result_kind(self) -> Kind {
        match self {
            RuntimeCall::ArithmeticLdiv | RuntimeCall::ArithmeticLrem => Kind::Long,
            RuntimeCall::ArithmeticFrem => Kind::Float,
            RuntimeCall::ArithmeticDrem
            | RuntimeCall::ArithmeticSin
            | RuntimeCall::ArithmeticCos
            | RuntimeCall::ArithmeticTan
            | RuntimeCall::ArithmeticLog
            | RuntimeCall::ArithmeticLog10 => Kind::Double,
            RuntimeCall::NewInstance | RuntimeCall::NewArray | RuntimeCall::NewMultiArray => {
                Kind::Object
            }
            RuntimeCall::ResolveField | RuntimeCall::ResolveMethod => Kind::Word,
            _ => Kind::Void,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RuntimeCall::UnwindException => "unwind_exception",
            RuntimeCall::ThrowException => "throw_exception",
            RuntimeCall::ThrowDivisionByZero => "throw_division_by_zero",
            RuntimeCall::ThrowNullPointer => "throw_null_pointer",
            RuntimeCall::ThrowArrayIndexOutOfBounds => "throw_array_index_out_of_bounds",
            RuntimeCall::ThrowClassCast => "throw_class_cast",
            RuntimeCall::RegisterFinalizer => "register_finalizer",
            RuntimeCall::ArithmeticLdiv => "ldiv",
            RuntimeCall::ArithmeticLrem => "lrem",
            RuntimeCall::ArithmeticFrem => "frem",
            RuntimeCall::ArithmeticDrem => "drem",
            RuntimeCall::ArithmeticSin => "sin",
            RuntimeCall::ArithmeticCos => "cos",
            RuntimeCall::ArithmeticTan => "tan",
            RuntimeCall::ArithmeticLog => "log",
            RuntimeCall::ArithmeticLog10 => "log10",
            RuntimeCall::ArrayCopy => "array_copy",
            RuntimeCall::NewInstance => "new_instance",
            RuntimeCall::NewArray => "new_array",
            RuntimeCall::NewMultiArray => "new_multi_array",
            RuntimeCall::MonitorEnter => "monitor_enter",
            RuntimeCall::MonitorExit => "monitor_exit",
            RuntimeCall::ResolveField => "resolve_field",
            RuntimeCall::ResolveMethod => "resolve_method",
            RuntimeCall::Deoptimize => "deoptimize",
            RuntimeCall::TraceBlockEntry => "trace_block_entry",
            RuntimeCall::OsrMigrationEnd => "osr_migration_end",
        }
    }
}

/// Methods the backend lowers inline instead of calling.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    MathSqrt,
    MathAbs,
    MathSin,
    MathCos,
    MathTan,
    MathLog,
    MathLog10,
    CompareAndSwapInt,
    CompareAndSwapLong,
    CompareAndSwapObject,
    CurrentThread,
    ArrayCopy,
    IntBitCount,
    LongBitCount,
    IntLeadingZeros,
    LongLeadingZeros,
    IntTrailingZeros,
    LongTrailingZeros,
}

impl Intrinsic {
    pub fn result_kind(self) -> Kind {
        match self {
            Intrinsic::MathSqrt
            | Intrinsic::MathAbs
            | Intrinsic::MathSin
            | Intrinsic::MathCos
            | Intrinsic::MathTan
            | Intrinsic::MathLog
            | Intrinsic::MathLog10 => Kind::Double,
            Intrinsic::CompareAndSwapInt
            | Intrinsic::CompareAndSwapLong
            | Intrinsic::CompareAndSwapObject => Kind::Boolean,
            Intrinsic::CurrentThread => Kind::Object,
            Intrinsic::ArrayCopy => Kind::Void,
            Intrinsic::IntBitCount
            | Intrinsic::LongBitCount
            | Intrinsic::IntLeadingZeros
            | Intrinsic::LongLeadingZeros
            | Intrinsic::IntTrailingZeros
            | Intrinsic::LongTrailingZeros => Kind::Int,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Intrinsic::MathSqrt => "Math.sqrt",
            Intrinsic::MathAbs => "Math.abs",
            Intrinsic::MathSin => "Math.sin",
            Intrinsic::MathCos => "Math.cos",
            Intrinsic::MathTan => "Math.tan",
            Intrinsic::MathLog => "Math.log",
            Intrinsic::MathLog10 => "Math.log10",
            Intrinsic::CompareAndSwapInt => "Unsafe.compareAndSwapInt",
            Intrinsic::CompareAndSwapLong => "Unsafe.compareAndSwapLong",
            Intrinsic::CompareAndSwapObject => "Unsafe.compareAndSwapObject",
            Intrinsic::CurrentThread => "Thread.currentThread",
            Intrinsic::ArrayCopy => "System.arraycopy",
            Intrinsic::IntBitCount => "Integer.bitCount",
            Intrinsic::LongBitCount => "Long.bitCount",
            Intrinsic::IntLeadingZeros => "Integer.numberOfLeadingZeros",
            Intrinsic::LongLeadingZeros => "Long.numberOfLeadingZeros",
            Intrinsic::IntTrailingZeros => "Integer.numberOfTrailingZeros",
            Intrinsic::LongTrailingZeros => "Long.numberOfTrailingZeros",
        }
    }
}
