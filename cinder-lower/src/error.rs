use thiserror::Error;

/// Reasons for giving up on a method. A bailout is an expected outcome: the
/// caller may fall back to another compiler or the interpreter.
///
/// Inconsistencies of the lowering itself are not bailouts; they panic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Bailout {
    #[error("intrinsic {0} is not supported on this target")]
    UnsupportedIntrinsic(&'static str),

    #[error("no lowering for {0}")]
    UnresolvedPattern(String),

    #[error("no code template for {0}")]
    MissingTemplate(&'static str),

    #[error("variable limit of {0} exceeded")]
    TooManyVariables(u32),
}

pub type LowerResult<T> = Result<T, Bailout>;
