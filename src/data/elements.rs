//! # Building blocks
//!
//! Small vocabulary types shared between the LP layer and the constraint layer.
use std::fmt;
use std::ops::{BitXor, Neg, Not};

use enum_map::Enum;

/// Direction of a bound.
///
/// Also indexes the two activity bounds of a row or constraint: `Lower` is the side built from
/// the bounds that minimize the activity, `Upper` the side that maximizes it.
#[derive(Copy, Clone, Debug, Enum, Eq, PartialEq, Hash)]
pub enum BoundDirection {
    /// Bounded from below, `x >= b`.
    Lower,
    /// Bounded from above, `x <= b`.
    Upper,
}

impl Not for BoundDirection {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::Lower => Self::Upper,
            Self::Upper => Self::Lower,
        }
    }
}

/// Analogue to multiplying signs of values.
impl BitXor for BoundDirection {
    type Output = Self;

    fn bitxor(self, other: Self) -> Self::Output {
        match (self, other) {
            (Self::Lower, Self::Upper) | (Self::Upper, Self::Lower) => Self::Upper,
            (Self::Lower, Self::Lower) | (Self::Upper, Self::Upper) => Self::Lower,
        }
    }
}

/// A negative coefficient mirrors which bound of a variable feeds which side of an activity.
impl BitXor<NonZeroSign> for BoundDirection {
    type Output = Self;

    fn bitxor(self, sign: NonZeroSign) -> Self::Output {
        match sign {
            NonZeroSign::Positive => self,
            NonZeroSign::Negative => !self,
        }
    }
}

/// Sign of a value known to be nonzero.
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NonZeroSign {
    Positive,
    Negative,
}

impl NonZeroSign {
    /// Sign of a nonzero floating point value.
    ///
    /// The value should not be (numerically) zero; zero coefficients are removed from all sparse
    /// collections in this crate before a sign is ever taken.
    #[must_use]
    pub fn of(value: f64) -> Self {
        debug_assert!(value != 0_f64 && !value.is_nan());

        if value > 0_f64 { Self::Positive } else { Self::Negative }
    }
}

impl Not for NonZeroSign {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::Positive => Self::Negative,
            Self::Negative => Self::Positive,
        }
    }
}

impl Neg for NonZeroSign {
    type Output = Self;

    fn neg(self) -> Self::Output {
        !self
    }
}

impl BitXor for NonZeroSign {
    type Output = Self;

    fn bitxor(self, other: Self) -> Self::Output {
        match (self, other) {
            (Self::Positive, Self::Positive) | (Self::Negative, Self::Negative) => Self::Positive,
            (Self::Positive, Self::Negative) | (Self::Negative, Self::Positive) => Self::Negative,
        }
    }
}

/// A variable is continuous, integer, or integer by implication.
///
/// Implied integrality arises during presolve: a variable that always takes integral values in
/// any solution where the others do can be aggregated like a continuous one.
#[allow(missing_docs)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Ord)]
pub enum VariableType {
    Continuous,
    ImpliedInteger,
    Integer,
}

impl VariableType {
    /// Whether values of this variable must be integral in a feasible solution.
    #[must_use]
    pub fn is_integer(self) -> bool {
        matches!(self, Self::Integer | Self::ImpliedInteger)
    }
}

/// The subproblem was detected to be infeasible.
///
/// This is a first class result, not a programming error: the search driver prunes the node.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Cutoff;

impl fmt::Display for Cutoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("subproblem is infeasible")
    }
}

#[cfg(test)]
mod test {
    use crate::data::elements::{BoundDirection, NonZeroSign};

    #[test]
    fn sign_algebra() {
        assert_eq!(NonZeroSign::of(0.5), NonZeroSign::Positive);
        assert_eq!(NonZeroSign::of(-3_f64), NonZeroSign::Negative);
        assert_eq!(NonZeroSign::Positive ^ NonZeroSign::Negative, NonZeroSign::Negative);

        assert_eq!(BoundDirection::Lower ^ NonZeroSign::Positive, BoundDirection::Lower);
        assert_eq!(BoundDirection::Lower ^ NonZeroSign::Negative, BoundDirection::Upper);
        assert_eq!(!BoundDirection::Upper, BoundDirection::Lower);
    }
}
