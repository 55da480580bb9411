//! # Pairwise domination
//!
//! One constraint dominates another constraint's side when any point satisfying the first
//! satisfies that side of the second, making it removable. The check walks both sorted entry
//! lists in merge order once: candidate dominations start from a comparison of the sides and
//! are falsified by any variable whose coefficients differ while its domain extends into the
//! sign that would break the implication.
use itertools::{EitherOrBoth, Itertools};

use crate::constraint::ConstraintSet;
use crate::constraint::presolve::Reductions;
use crate::data::elements::{BoundDirection, Cutoff};
use crate::data::number::Extended;
use crate::data::variable::VariableSet;

/// Check one pair of constraints for domination, relaxing dominated sides.
///
/// Both constraints must be sorted and duplicate-free. A dominating side that itself
/// contradicts the other constraint's opposite side proves infeasibility before anything is
/// relaxed. A constraint left without finite sides is deleted.
///
/// # Errors
///
/// [`Cutoff`] when the pair is jointly infeasible.
pub(crate) fn check_pair(
    constraints: &mut ConstraintSet,
    variables: &mut VariableSet,
    first: usize,
    second: usize,
) -> Result<Reductions, Cutoff> {
    let tolerance = constraints.tolerance;
    let (mut first_lhs, mut second_lhs, mut first_rhs, mut second_rhs) = {
        let (lhs0, rhs0) = sides(constraints, first);
        let (lhs1, rhs1) = sides(constraints, second);
        (
            tolerance.ext_ge(lhs0, lhs1),
            tolerance.ext_ge(lhs1, lhs0),
            tolerance.ext_le(rhs0, rhs1),
            tolerance.ext_le(rhs1, rhs0),
        )
    };

    {
        let first_constraint = constraints.constraint(first);
        let second_constraint = constraints.constraint(second);
        debug_assert!(first_constraint.sorted && second_constraint.sorted);
        let merged = first_constraint
            .entries()
            .merge_join_by(second_constraint.entries(), |(left, _), (right, _)| {
                left.cmp(right)
            });
        for item in merged {
            if !(first_lhs || second_lhs || first_rhs || second_rhs) {
                return Ok(Reductions::default());
            }
            let (variable, value0, value1) = match item {
                EitherOrBoth::Left((variable, value)) => (variable, value, 0_f64),
                EitherOrBoth::Right((variable, value)) => (variable, 0_f64, value),
                EitherOrBoth::Both((variable, value0), (_, value1)) => (variable, value0, value1),
            };
            if tolerance.eq(value0, value1) {
                continue;
            }
            let holder = variables.variable(variable);
            let reaches_negative =
                tolerance.ext_lt(holder.bound(BoundDirection::Lower), Extended::Finite(0_f64));
            let reaches_positive =
                tolerance.ext_gt(holder.bound(BoundDirection::Upper), Extended::Finite(0_f64));
            // Domination of the other's right side needs the own activity to lie above it
            // everywhere; the coefficient difference times the domain sign decides.
            if value0 > value1 {
                if reaches_negative {
                    first_rhs = false;
                    second_lhs = false;
                }
                if reaches_positive {
                    second_rhs = false;
                    first_lhs = false;
                }
            } else {
                if reaches_negative {
                    second_rhs = false;
                    first_lhs = false;
                }
                if reaches_positive {
                    first_rhs = false;
                    second_lhs = false;
                }
            }
        }
    }

    let mut result = Reductions::default();
    // Left hand sides. A dominating left side sitting above the other's right side leaves no
    // feasible activity at all, so that is checked even when there is nothing to relax.
    if first_lhs {
        if tolerance.ext_gt(sides(constraints, first).0, sides(constraints, second).1) {
            return Err(Cutoff);
        }
        if sides(constraints, second).0.is_finite() {
            constraints.change_side(second, variables, BoundDirection::Lower, Extended::MINUS_INFINITY);
            result.sides_changed += 1;
        }
    } else if second_lhs {
        if tolerance.ext_gt(sides(constraints, second).0, sides(constraints, first).1) {
            return Err(Cutoff);
        }
        if sides(constraints, first).0.is_finite() {
            constraints.change_side(first, variables, BoundDirection::Lower, Extended::MINUS_INFINITY);
            result.sides_changed += 1;
        }
    }
    // Right hand sides.
    if first_rhs {
        if tolerance.ext_lt(sides(constraints, first).1, sides(constraints, second).0) {
            return Err(Cutoff);
        }
        if sides(constraints, second).1.is_finite() {
            constraints.change_side(second, variables, BoundDirection::Upper, Extended::PLUS_INFINITY);
            result.sides_changed += 1;
        }
    } else if second_rhs {
        if tolerance.ext_lt(sides(constraints, second).1, sides(constraints, first).0) {
            return Err(Cutoff);
        }
        if sides(constraints, first).1.is_finite() {
            constraints.change_side(first, variables, BoundDirection::Upper, Extended::PLUS_INFINITY);
            result.sides_changed += 1;
        }
    }

    for index in [first, second] {
        let constraint = constraints.constraint(index);
        if !constraint.side(BoundDirection::Lower).is_finite()
            && !constraint.side(BoundDirection::Upper).is_finite()
            && constraint.row().is_none()
        {
            constraints.delete(index, variables);
            result.deletions += 1;
        }
    }

    Ok(result)
}

fn sides(constraints: &ConstraintSet, index: usize) -> (Extended, Extended) {
    let constraint = constraints.constraint(index);
    (
        constraint.side(BoundDirection::Lower),
        constraint.side(BoundDirection::Upper),
    )
}

#[cfg(test)]
mod test {
    use crate::constraint::presolve::redundancy::check_pair;
    use crate::constraint::{ConstraintFlags, ConstraintSet};
    use crate::data::elements::{BoundDirection, Cutoff, VariableType};
    use crate::data::number::{Extended, Tolerance};
    use crate::data::variable::VariableSet;

    fn variables(nr: usize) -> VariableSet {
        let mut set = VariableSet::new(Tolerance::default());
        for index in 0..nr {
            set.add(
                format!("x{index}"),
                VariableType::Continuous,
                1_f64,
                Extended::Finite(0_f64),
                Extended::Finite(10_f64),
            );
        }
        set
    }

    fn upper_bounded(
        constraints: &mut ConstraintSet,
        variables: &mut VariableSet,
        entries: Vec<(usize, f64)>,
        rhs: f64,
    ) -> usize {
        let index = constraints.add(
            format!("c{}", constraints.len()),
            entries,
            Extended::MINUS_INFINITY,
            Extended::Finite(rhs),
            ConstraintFlags { removable: true, ..ConstraintFlags::default() },
        );
        constraints.transform(index, variables);
        constraints.sort(index, variables);
        index
    }

    #[test]
    fn identical_rows_keep_the_tighter_side() {
        let mut variables = variables(2);
        let mut constraints = ConstraintSet::new(Tolerance::default());
        let loose = upper_bounded(&mut constraints, &mut variables, vec![(0, 1_f64), (1, 1_f64)], 10_f64);
        let tight = upper_bounded(&mut constraints, &mut variables, vec![(0, 1_f64), (1, 1_f64)], 8_f64);

        let result = check_pair(&mut constraints, &mut variables, loose, tight).unwrap();
        // The looser constraint loses its right hand side and, having none left, is deleted.
        assert_eq!(result.sides_changed, 1);
        assert_eq!(result.deletions, 1);
        assert!(!constraints.is_alive(loose));
        assert_eq!(
            constraints.constraint(tight).side(BoundDirection::Upper),
            Extended::Finite(8_f64),
        );
    }

    #[test]
    fn differing_coefficient_on_a_two_sided_domain_blocks_domination() {
        let mut variables = variables(2);
        // x1 in [-10, 10] reaches both signs.
        variables.change_bound(1, BoundDirection::Lower, Extended::Finite(-10_f64));
        let mut constraints = ConstraintSet::new(Tolerance::default());
        let first = upper_bounded(&mut constraints, &mut variables, vec![(0, 1_f64), (1, 1_f64)], 8_f64);
        let second = upper_bounded(&mut constraints, &mut variables, vec![(0, 1_f64), (1, 2_f64)], 8_f64);

        let result = check_pair(&mut constraints, &mut variables, first, second).unwrap();
        assert_eq!(result, crate::constraint::presolve::Reductions::default());
        assert!(constraints.is_alive(first));
        assert!(constraints.is_alive(second));
    }

    #[test]
    fn nonnegative_domain_lets_the_smaller_coefficients_dominate() {
        let mut variables = variables(2);
        let mut constraints = ConstraintSet::new(Tolerance::default());
        // On x >= 0, x0 + x1 <= 8 implies x0 <= 8.
        let tight = upper_bounded(&mut constraints, &mut variables, vec![(0, 1_f64), (1, 1_f64)], 8_f64);
        let loose = upper_bounded(&mut constraints, &mut variables, vec![(0, 1_f64)], 8_f64);

        let result = check_pair(&mut constraints, &mut variables, tight, loose).unwrap();
        assert_eq!(result.sides_changed, 1);
        assert!(!constraints.is_alive(loose));
        assert!(constraints.is_alive(tight));
    }

    #[test]
    fn contradicting_dominated_sides_are_infeasible() {
        let mut variables = variables(2);
        let mut constraints = ConstraintSet::new(Tolerance::default());
        // x0 + x1 >= 9 and x0 + x1 <= 4 cannot hold together.
        let lower = constraints.add(
            "c0",
            vec![(0, 1_f64), (1, 1_f64)],
            Extended::Finite(9_f64),
            Extended::PLUS_INFINITY,
            ConstraintFlags::default(),
        );
        constraints.transform(lower, &mut variables);
        let upper = upper_bounded(&mut constraints, &mut variables, vec![(0, 1_f64), (1, 1_f64)], 4_f64);

        assert_eq!(check_pair(&mut constraints, &mut variables, lower, upper), Err(Cutoff));
    }
}
