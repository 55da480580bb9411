//! # Normalization
//!
//! Bringing a constraint into a canonical form: duplicates merged, a canonical overall sign,
//! fractional coefficients scaled to integers where a moderate scaling factor suffices, and the
//! integral coefficients reduced by their greatest common divisor. Canonical forms make the
//! pairwise comparisons of the other presolve rules meaningful and keep coefficients in a
//! numerically comfortable range.
use crate::constraint::ConstraintSet;
use crate::data::elements::{BoundDirection, Cutoff};
use crate::data::number::{Extended, Tolerance};
use crate::data::variable::VariableSet;

/// Cap on the combined scaling factor; a constraint that only becomes integral beyond this is
/// left fractional.
const MAX_SCALE: u64 = 1_000_000;

/// Normalize a constraint in place.
///
/// The canonical sign makes the majority of coefficients positive, preferring on a tie the
/// orientation with a finite right hand side, then the one with the larger `|rhs|`, then
/// leaving the constraint as it is.
///
/// # Return value
///
/// Whether the coefficients were changed.
pub fn normalize(
    constraints: &mut ConstraintSet,
    variables: &mut VariableSet,
    index: usize,
) -> bool {
    if constraints.constraint(index).is_modifiable() {
        return false;
    }
    constraints.merge_multiples(index, variables);
    if constraints.constraint(index).nr_entries() == 0 {
        return false;
    }

    let mut changed = false;
    if should_negate(constraints, index) {
        constraints.scale(index, variables, -1_f64);
        changed = true;
    }
    if let Some(scalar) = integral_scalar(constraints, index) {
        if scalar > 1 {
            constraints.scale(index, variables, scalar as f64);
            changed = true;
        }
    }
    if let Some(divisor) = common_divisor(constraints, index) {
        if divisor > 1 {
            constraints.scale(index, variables, (divisor as f64).recip());
            changed = true;
        }
    }

    changed
}

fn should_negate(constraints: &ConstraintSet, index: usize) -> bool {
    let constraint = constraints.constraint(index);
    let nr_negative = constraint
        .entries()
        .filter(|&(_, coefficient)| coefficient < 0_f64)
        .count();
    let nr_positive = constraint.nr_entries() - nr_negative;
    match nr_negative.cmp(&nr_positive) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => {
            match (
                constraint.side(BoundDirection::Lower),
                constraint.side(BoundDirection::Upper),
            ) {
                (Extended::Finite(lhs), Extended::Finite(rhs)) => lhs.abs() > rhs.abs(),
                // Negating turns a finite left side into a finite right side.
                (Extended::Finite(_), _) => true,
                _ => false,
            }
        }
    }
}

/// The smallest moderate scalar making every coefficient integral, if one exists.
///
/// Each fractional coefficient is approximated by a rational through its continued fraction;
/// the least common multiple of the denominators scales them all at once.
fn integral_scalar(constraints: &ConstraintSet, index: usize) -> Option<u64> {
    let tolerance = constraints.tolerance;
    let max_denominator = (tolerance.feasibility / tolerance.epsilon) as u64;

    let mut scalar = 1_u64;
    for (_, coefficient) in constraints.constraint(index).entries() {
        if tolerance.is_integral(coefficient * scalar as f64) {
            continue;
        }
        let (_, denominator) = to_fraction(coefficient, tolerance, max_denominator)?;
        scalar = lcm(scalar, denominator);
        if scalar > MAX_SCALE {
            return None;
        }
    }

    Some(scalar)
}

/// The greatest common divisor of the coefficients, if they are all integral.
fn common_divisor(constraints: &ConstraintSet, index: usize) -> Option<u64> {
    let tolerance = constraints.tolerance;
    let mut divisor = 0_u64;
    for (_, coefficient) in constraints.constraint(index).entries() {
        if !tolerance.is_integral(coefficient) {
            return None;
        }
        divisor = gcd(divisor, coefficient.abs().round() as u64);
        if divisor == 1 {
            return Some(1);
        }
    }

    Some(divisor)
}

/// Approximate a value by a fraction `numerator / denominator` within the equality tolerance.
///
/// Walks the value's continued fraction expansion, accepting the first convergent within
/// tolerance and giving up when the denominator would exceed `max_denominator`.
fn to_fraction(value: f64, tolerance: Tolerance, max_denominator: u64) -> Option<(i64, u64)> {
    if !value.is_finite() || value.abs() >= 1e15 {
        return None;
    }

    let mut x = value;
    let mut previous = (1_i64, 0_u64);
    let mut current = (x.floor() as i64, 1_u64);
    loop {
        if (value - current.0 as f64 / current.1 as f64).abs() <= tolerance.epsilon {
            return Some(current);
        }
        let fraction = x - x.floor();
        if fraction <= tolerance.epsilon {
            return None;
        }
        x = fraction.recip();
        let term = x.floor() as i64;
        let next = (
            term * current.0 + previous.0,
            term as u64 * current.1 + previous.1,
        );
        if next.1 > max_denominator {
            return None;
        }
        previous = current;
        current = next;
    }
}

pub(crate) fn gcd(mut left: u64, mut right: u64) -> u64 {
    while right != 0 {
        (left, right) = (right, left % right);
    }
    left
}

fn lcm(left: u64, right: u64) -> u64 {
    left / gcd(left, right) * right
}

/// Round the sides of an all-integer constraint onto integral values.
///
/// When every member variable is integral and every coefficient is integral, the activity is
/// integral at any feasible point, so a fractional left side rounds up and a fractional right
/// side rounds down. Sides that cross while rounding leave no integral activity at all, which
/// is a [`Cutoff`].
///
/// # Return value
///
/// The number of sides tightened.
pub fn tighten_sides(
    constraints: &mut ConstraintSet,
    variables: &mut VariableSet,
    index: usize,
) -> Result<usize, Cutoff> {
    let tolerance = constraints.tolerance;
    {
        let constraint = constraints.constraint(index);
        let all_integral = constraint.nr_entries() > 0
            && constraint.entries().all(|(variable, coefficient)| {
                variables.variable(variable).variable_type.is_integer()
                    && tolerance.is_integral(coefficient)
            });
        if !all_integral {
            return Ok(0);
        }
    }

    let lhs = constraints.constraint(index).side(BoundDirection::Lower);
    let rhs = constraints.constraint(index).side(BoundDirection::Upper);
    let rounded_lhs = match lhs {
        Extended::Finite(value) => Extended::Finite(tolerance.ceil(value)),
        infinite => infinite,
    };
    let rounded_rhs = match rhs {
        Extended::Finite(value) => Extended::Finite(tolerance.floor(value)),
        infinite => infinite,
    };
    if !(rounded_lhs <= rounded_rhs) {
        return Err(Cutoff);
    }

    let mut tightened = 0;
    if tolerance.ext_gt(rounded_lhs, lhs) {
        constraints.change_side(index, variables, BoundDirection::Lower, rounded_lhs);
        tightened += 1;
    }
    if tolerance.ext_lt(rounded_rhs, rhs) {
        constraints.change_side(index, variables, BoundDirection::Upper, rounded_rhs);
        tightened += 1;
    }

    Ok(tightened)
}

#[cfg(test)]
mod test {
    use crate::constraint::presolve::normalize::{normalize, tighten_sides, to_fraction};
    use crate::constraint::{ConstraintFlags, ConstraintSet};
    use crate::data::elements::{BoundDirection, Cutoff, VariableType};
    use crate::data::number::{Extended, Tolerance};
    use crate::data::variable::VariableSet;

    fn variables(nr: usize, variable_type: VariableType) -> VariableSet {
        let mut set = VariableSet::new(Tolerance::default());
        for index in 0..nr {
            set.add(
                format!("x{index}"),
                variable_type,
                1_f64,
                Extended::Finite(0_f64),
                Extended::Finite(10_f64),
            );
        }
        set
    }

    #[test]
    fn gcd_reduction() {
        let mut variables = variables(2, VariableType::Continuous);
        let mut constraints = ConstraintSet::new(Tolerance::default());
        let index = constraints.add(
            "c",
            vec![(0, 2_f64), (1, 4_f64)],
            Extended::MINUS_INFINITY,
            Extended::Finite(10_f64),
            ConstraintFlags::default(),
        );
        constraints.transform(index, &mut variables);

        assert!(normalize(&mut constraints, &mut variables, index));
        let constraint = constraints.constraint(index);
        assert_eq!(constraint.entries().collect::<Vec<_>>(), vec![(0, 1_f64), (1, 2_f64)]);
        assert_eq!(constraint.side(BoundDirection::Upper), Extended::Finite(5_f64));
    }

    #[test]
    fn negation_prefers_positive_majority_and_finite_rhs() {
        let mut variables = variables(2, VariableType::Continuous);
        let mut constraints = ConstraintSet::new(Tolerance::default());
        // -x0 - x1 >= -5 flips into x0 + x1 <= 5.
        let index = constraints.add(
            "c",
            vec![(0, -1_f64), (1, -1_f64)],
            Extended::Finite(-5_f64),
            Extended::PLUS_INFINITY,
            ConstraintFlags::default(),
        );
        constraints.transform(index, &mut variables);

        assert!(normalize(&mut constraints, &mut variables, index));
        let constraint = constraints.constraint(index);
        assert_eq!(constraint.entries().collect::<Vec<_>>(), vec![(0, 1_f64), (1, 1_f64)]);
        assert_eq!(constraint.side(BoundDirection::Lower), Extended::MINUS_INFINITY);
        assert_eq!(constraint.side(BoundDirection::Upper), Extended::Finite(5_f64));
        // Locks moved with the signs consistently: still one up-lock per variable.
        assert_eq!(variables.variable(0).nr_locks(BoundDirection::Upper), 1);
        assert_eq!(variables.variable(0).nr_locks(BoundDirection::Lower), 0);
    }

    #[test]
    fn fractional_coefficients_are_scaled_integral() {
        let mut variables = variables(2, VariableType::Continuous);
        let mut constraints = ConstraintSet::new(Tolerance::default());
        let index = constraints.add(
            "c",
            vec![(0, 0.5_f64), (1, 0.25_f64)],
            Extended::MINUS_INFINITY,
            Extended::Finite(1_f64),
            ConstraintFlags::default(),
        );
        constraints.transform(index, &mut variables);

        assert!(normalize(&mut constraints, &mut variables, index));
        let constraint = constraints.constraint(index);
        assert_eq!(constraint.entries().collect::<Vec<_>>(), vec![(0, 2_f64), (1, 1_f64)]);
        assert_eq!(constraint.side(BoundDirection::Upper), Extended::Finite(4_f64));
    }

    #[test]
    fn continued_fractions_recover_simple_ratios() {
        let tolerance = Tolerance::default();
        assert_eq!(to_fraction(0.25, tolerance, 1000), Some((1, 4)));
        assert_eq!(to_fraction(2_f64 / 3_f64, tolerance, 1000), Some((2, 3)));
        assert_eq!(to_fraction(-1.5, tolerance, 1000), Some((-3, 2)));
        // An irrational value finds no moderate denominator.
        assert_eq!(to_fraction(std::f64::consts::PI, tolerance, 1000), None);
    }

    #[test]
    fn integral_sides_are_rounded_inward() {
        let mut variables = variables(2, VariableType::Integer);
        let mut constraints = ConstraintSet::new(Tolerance::default());
        let index = constraints.add(
            "c",
            vec![(0, 1_f64), (1, 1_f64)],
            Extended::Finite(0.5_f64),
            Extended::Finite(3.5_f64),
            ConstraintFlags::default(),
        );
        constraints.transform(index, &mut variables);

        assert_eq!(tighten_sides(&mut constraints, &mut variables, index), Ok(2));
        let constraint = constraints.constraint(index);
        assert_eq!(constraint.side(BoundDirection::Lower), Extended::Finite(1_f64));
        assert_eq!(constraint.side(BoundDirection::Upper), Extended::Finite(3_f64));
    }

    #[test]
    fn crossing_rounded_sides_are_infeasible() {
        let mut variables = variables(2, VariableType::Integer);
        let mut constraints = ConstraintSet::new(Tolerance::default());
        // No integral activity fits in [0.2, 0.8].
        let index = constraints.add(
            "c",
            vec![(0, 1_f64), (1, 1_f64)],
            Extended::Finite(0.2_f64),
            Extended::Finite(0.8_f64),
            ConstraintFlags::default(),
        );
        constraints.transform(index, &mut variables);

        assert_eq!(tighten_sides(&mut constraints, &mut variables, index), Err(Cutoff));
    }
}
