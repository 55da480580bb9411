//! # The extended number line
//!
//! Bounds and constraint sides live on the extended reals: a value is either finite or one of
//! the two infinities. Representing that as a sum type keeps infinity out of floating point
//! arithmetic everywhere except at the external solver boundary, where the solver's own sentinel
//! value is substituted.
//!
//! All comparisons between finite values go through a [`Tolerance`], never through exact
//! floating point equality.
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use num_traits::Zero;

use crate::data::elements::NonZeroSign;

/// A finite value or one of the two infinities.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Extended {
    /// A regular floating point value. Never `NaN` or an IEEE infinity.
    Finite(f64),
    /// Unbounded in the given direction: `Negative` is `-inf`, `Positive` is `+inf`.
    Infinite(NonZeroSign),
}

impl Extended {
    /// Negative infinity, the neutral left hand side.
    pub const MINUS_INFINITY: Self = Self::Infinite(NonZeroSign::Negative);
    /// Positive infinity, the neutral right hand side.
    pub const PLUS_INFINITY: Self = Self::Infinite(NonZeroSign::Positive);

    /// The finite value, if there is one.
    #[must_use]
    pub fn finite(self) -> Option<f64> {
        match self {
            Self::Finite(value) => Some(value),
            Self::Infinite(_) => None,
        }
    }

    /// Whether this is a finite value.
    #[must_use]
    pub fn is_finite(self) -> bool {
        matches!(self, Self::Finite(_))
    }

    /// Whether this is `-inf`.
    #[must_use]
    pub fn is_minus_infinity(self) -> bool {
        self == Self::MINUS_INFINITY
    }

    /// Whether this is `+inf`.
    #[must_use]
    pub fn is_plus_infinity(self) -> bool {
        self == Self::PLUS_INFINITY
    }

    /// Map onto the external solver's number line.
    ///
    /// # Arguments
    ///
    /// * `infinity`: The solver's sentinel value for unbounded, see
    ///   [`crate::lp::interface::SolverInterface::infinity`].
    #[must_use]
    pub fn to_solver(self, infinity: f64) -> f64 {
        debug_assert!(infinity > 0_f64);

        match self {
            Self::Finite(value) => value.clamp(-infinity, infinity),
            Self::Infinite(NonZeroSign::Negative) => -infinity,
            Self::Infinite(NonZeroSign::Positive) => infinity,
        }
    }
}

impl From<f64> for Extended {
    fn from(value: f64) -> Self {
        debug_assert!(!value.is_nan() && !value.is_infinite());

        Self::Finite(value)
    }
}

impl fmt::Display for Extended {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(value) => write!(f, "{}", value),
            Self::Infinite(NonZeroSign::Negative) => f.write_str("-inf"),
            Self::Infinite(NonZeroSign::Positive) => f.write_str("+inf"),
        }
    }
}

impl PartialOrd for Extended {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Finite(left), Self::Finite(right)) => left.partial_cmp(right),
            (Self::Infinite(left), Self::Infinite(right)) if left == right => Some(Ordering::Equal),
            (Self::Infinite(NonZeroSign::Negative), _) | (_, Self::Infinite(NonZeroSign::Positive)) => {
                Some(Ordering::Less)
            }
            (Self::Infinite(NonZeroSign::Positive), _) | (_, Self::Infinite(NonZeroSign::Negative)) => {
                Some(Ordering::Greater)
            }
        }
    }
}

impl Neg for Extended {
    type Output = Self;

    fn neg(self) -> Self::Output {
        match self {
            Self::Finite(value) => Self::Finite(-value),
            Self::Infinite(sign) => Self::Infinite(!sign),
        }
    }
}

/// Sums of same-side contributions.
///
/// Opposite infinities never meet in a single activity side; the infinite contributors of each
/// side are counted separately before any summing happens.
impl Add for Extended {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        match (self, other) {
            (Self::Finite(left), Self::Finite(right)) => Self::Finite(left + right),
            (infinite @ Self::Infinite(sign), other) | (other, infinite @ Self::Infinite(sign)) => {
                debug_assert_ne!(other, Self::Infinite(!sign));
                infinite
            }
        }
    }
}

impl Add<f64> for Extended {
    type Output = Self;

    fn add(self, term: f64) -> Self::Output {
        match self {
            Self::Finite(value) => Self::Finite(value + term),
            infinite => infinite,
        }
    }
}

impl Sub<f64> for Extended {
    type Output = Self;

    fn sub(self, term: f64) -> Self::Output {
        self + -term
    }
}

/// Scaling by a nonzero finite factor.
impl Mul<f64> for Extended {
    type Output = Self;

    fn mul(self, factor: f64) -> Self::Output {
        debug_assert!(factor != 0_f64);

        match self {
            Self::Finite(value) => Self::Finite(value * factor),
            Self::Infinite(sign) => Self::Infinite(sign ^ NonZeroSign::of(factor)),
        }
    }
}

impl Zero for Extended {
    fn zero() -> Self {
        Self::Finite(0_f64)
    }

    fn is_zero(&self) -> bool {
        matches!(self, Self::Finite(value) if *value == 0_f64)
    }
}

/// Numerical tolerances.
///
/// Two scales, after the usual convention: `epsilon` decides whether two computed values are the
/// same number, `feasibility` decides whether a value violates a constraint or an integrality
/// requirement. Bound tightening compares against the feasibility scale so it only acts on
/// improvements a solution could actually notice.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Tolerance {
    /// Scale at which two values are considered equal.
    pub epsilon: f64,
    /// Scale at which a constraint or integrality violation matters.
    pub feasibility: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            epsilon: 1e-9,
            feasibility: 1e-6,
        }
    }
}

impl Tolerance {
    /// Whether a value is (numerically) zero.
    #[must_use]
    pub fn is_zero(&self, value: f64) -> bool {
        value.abs() <= self.epsilon
    }

    /// Whether two values are (numerically) equal.
    #[must_use]
    pub fn eq(&self, left: f64, right: f64) -> bool {
        self.is_zero(left - right)
    }

    /// Whether `left < right` beyond the equality tolerance.
    #[must_use]
    pub fn lt(&self, left: f64, right: f64) -> bool {
        right - left > self.epsilon
    }

    /// Whether `left > right` beyond the equality tolerance.
    #[must_use]
    pub fn gt(&self, left: f64, right: f64) -> bool {
        self.lt(right, left)
    }

    /// Whether `left <= right` up to the equality tolerance.
    #[must_use]
    pub fn le(&self, left: f64, right: f64) -> bool {
        !self.gt(left, right)
    }

    /// Whether `left >= right` up to the equality tolerance.
    #[must_use]
    pub fn ge(&self, left: f64, right: f64) -> bool {
        !self.lt(left, right)
    }

    /// Whether `left < right` by more than the feasibility tolerance.
    ///
    /// Used where `left` is the result of summing many terms, such as a candidate bound derived
    /// from a residual activity.
    #[must_use]
    pub fn sum_lt(&self, left: f64, right: f64) -> bool {
        right - left > self.feasibility
    }

    /// Whether `left > right` by more than the feasibility tolerance.
    #[must_use]
    pub fn sum_gt(&self, left: f64, right: f64) -> bool {
        self.sum_lt(right, left)
    }

    /// Whether a value is positive beyond the equality tolerance.
    #[must_use]
    pub fn is_positive(&self, value: f64) -> bool {
        value > self.epsilon
    }

    /// Whether a value is negative beyond the equality tolerance.
    #[must_use]
    pub fn is_negative(&self, value: f64) -> bool {
        value < -self.epsilon
    }

    /// Whether a value is integral within the feasibility tolerance.
    #[must_use]
    pub fn is_integral(&self, value: f64) -> bool {
        (value - value.round()).abs() <= self.feasibility
    }

    /// Round a near-integral value onto the integer it represents, leave others untouched.
    #[must_use]
    pub fn snap(&self, value: f64) -> f64 {
        if self.is_integral(value) { value.round() } else { value }
    }

    /// Largest integral value not meaningfully above `value`.
    #[must_use]
    pub fn floor(&self, value: f64) -> f64 {
        (value + self.feasibility).floor()
    }

    /// Smallest integral value not meaningfully below `value`.
    #[must_use]
    pub fn ceil(&self, value: f64) -> f64 {
        (value - self.feasibility).ceil()
    }

    /// `left < right` on the extended number line.
    ///
    /// Infinities compare strictly; finite values compare through the equality tolerance.
    #[must_use]
    pub fn ext_lt(&self, left: Extended, right: Extended) -> bool {
        match (left, right) {
            (Extended::Finite(left), Extended::Finite(right)) => self.lt(left, right),
            _ => left < right,
        }
    }

    /// `left > right` on the extended number line.
    #[must_use]
    pub fn ext_gt(&self, left: Extended, right: Extended) -> bool {
        self.ext_lt(right, left)
    }

    /// `left <= right` on the extended number line.
    #[must_use]
    pub fn ext_le(&self, left: Extended, right: Extended) -> bool {
        !self.ext_gt(left, right)
    }

    /// `left >= right` on the extended number line.
    #[must_use]
    pub fn ext_ge(&self, left: Extended, right: Extended) -> bool {
        !self.ext_lt(left, right)
    }

    /// Equality on the extended number line.
    #[must_use]
    pub fn ext_eq(&self, left: Extended, right: Extended) -> bool {
        match (left, right) {
            (Extended::Finite(left), Extended::Finite(right)) => self.eq(left, right),
            _ => left == right,
        }
    }
}

#[cfg(test)]
mod test {
    use crate::data::elements::NonZeroSign;
    use crate::data::number::{Extended, Tolerance};

    #[test]
    fn ordering() {
        assert!(Extended::MINUS_INFINITY < Extended::Finite(-1e300));
        assert!(Extended::Finite(1e300) < Extended::PLUS_INFINITY);
        assert!(Extended::Finite(1_f64) < Extended::Finite(2_f64));
        assert!(Extended::MINUS_INFINITY < Extended::PLUS_INFINITY);
    }

    #[test]
    fn arithmetic() {
        assert_eq!(Extended::Finite(3_f64) * -2_f64, Extended::Finite(-6_f64));
        assert_eq!(Extended::PLUS_INFINITY * -2_f64, Extended::MINUS_INFINITY);
        assert_eq!(Extended::MINUS_INFINITY + 5_f64, Extended::MINUS_INFINITY);
        assert_eq!(-Extended::Infinite(NonZeroSign::Positive), Extended::MINUS_INFINITY);
        assert_eq!(Extended::Finite(1_f64) - 4_f64, Extended::Finite(-3_f64));
    }

    #[test]
    fn solver_boundary() {
        let infinity = 1e20;
        assert_eq!(Extended::MINUS_INFINITY.to_solver(infinity), -infinity);
        assert_eq!(Extended::Finite(2_f64).to_solver(infinity), 2_f64);
        assert_eq!(Extended::Finite(1e30).to_solver(infinity), infinity);
    }

    #[test]
    fn tolerances() {
        let tolerance = Tolerance::default();

        assert!(tolerance.is_zero(1e-12));
        assert!(tolerance.lt(1_f64, 1.1));
        assert!(!tolerance.lt(1_f64, 1_f64 + 1e-12));
        assert!(tolerance.is_integral(2_f64 + 1e-9));
        assert_eq!(tolerance.snap(2_f64 - 1e-9), 2_f64);
        assert_eq!(tolerance.floor(1.999_999_999), 2_f64);
        assert_eq!(tolerance.ceil(3.000_000_001), 3_f64);

        assert!(tolerance.ext_lt(Extended::MINUS_INFINITY, Extended::Finite(0_f64)));
        assert!(tolerance.ext_ge(Extended::PLUS_INFINITY, Extended::PLUS_INFINITY));
    }
}
