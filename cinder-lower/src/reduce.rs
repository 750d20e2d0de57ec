/// Replacement of `x * constant` by cheaper operations.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Reduction {
    /// `x << shift`
    Shift(u8),
    /// `(x << shift) + x`
    ShiftAdd(u8),
    /// `(x << shift) - x`
    ShiftSub(u8),
}

/// Decides which multiplications by a constant are strength reduced.
pub trait StrengthReduction: Send + Sync {
    fn reduce_int_mul(&self, constant: i32) -> Option<Reduction>;
}

/// Powers of two and their neighbours.
pub struct ShiftAddReduction;

impl StrengthReduction for ShiftAddReduction {
    fn reduce_int_mul(&self, constant: i32) -> Option<Reduction> {
        if constant <= 1 {
            return None;
        }

        let constant = constant as u32;

        if constant.is_power_of_two() {
            Some(Reduction::Shift(constant.trailing_zeros() as u8))
        } else if (constant - 1).is_power_of_two() {
            Some(Reduction::ShiftAdd((constant - 1).trailing_zeros() as u8))
        } else if constant < u32::MAX && (constant + 1).is_power_of_two() {
            Some(Reduction::ShiftSub((constant + 1).trailing_zeros() as u8))
        } else {
            None
        }
    }
}

pub struct NoStrengthReduction;

impl StrengthReduction for NoStrengthReduction {
    fn reduce_int_mul(&self, _constant: i32) -> Option<Reduction> {
        None
    }
}
