//! # Equality-driven fixings and aggregations
//!
//! An equality pins its activity to a single value, which removes a degree of freedom: with one
//! variable the value is forced, with two variables one becomes an affine function of the
//! other, and with more a slack variable used nowhere else can absorb the equality, leaving an
//! inequality pair over the remaining variables. Pairs of equalities sharing many variables can
//! additionally be combined to cancel one shared variable.
use crate::constraint::ConstraintSet;
use crate::constraint::presolve::Reductions;
use crate::constraint::presolve::normalize::gcd;
use crate::data::elements::{BoundDirection, Cutoff, VariableType};
use crate::data::number::Extended;
use crate::data::variable::VariableSet;
use itertools::{EitherOrBoth, Itertools};

/// Convert an equality constraint into fixings or aggregations, deleting it when fully
/// absorbed.
///
/// Global, non-modifiable equalities only; a materialized row keeps the constraint untouched.
///
/// # Errors
///
/// [`Cutoff`] when the forced value violates a domain or the equality has no integer solution.
pub fn convert_equality(
    constraints: &mut ConstraintSet,
    variables: &mut VariableSet,
    index: usize,
) -> Result<Reductions, Cutoff> {
    let tolerance = constraints.tolerance;
    {
        let constraint = constraints.constraint(index);
        if constraint.is_modifiable()
            || constraint.is_local()
            || constraint.row().is_some()
            || !constraint.is_equality(tolerance)
        {
            return Ok(Reductions::default());
        }
    }
    let Extended::Finite(value) = constraints.constraint(index).side(BoundDirection::Upper)
    else {
        unreachable!();
    };

    match constraints.constraint(index).nr_entries() {
        // The driver handles empty constraints.
        0 => Ok(Reductions::default()),
        1 => fix_single(constraints, variables, index, value),
        2 => aggregate_pair(constraints, variables, index, value),
        _ => absorb_into_slack(constraints, variables, index, value),
    }
}

/// `a x == value` forces `x = value / a`.
fn fix_single(
    constraints: &mut ConstraintSet,
    variables: &mut VariableSet,
    index: usize,
    value: f64,
) -> Result<Reductions, Cutoff> {
    let tolerance = constraints.tolerance;
    let (variable, coefficient) = {
        let constraint = constraints.constraint(index);
        (constraint.variable(0), constraint.coefficient(0))
    };
    let before = bounds_of(variables, variable);
    let fixed = variables.fix(variable, tolerance.snap(value / coefficient))?;
    // Other constraints holding this variable cache activity sums over its old bounds.
    fan_out_bound_changes(constraints, variables, variable, before);
    constraints.delete(index, variables);

    let mut result = Reductions::default();
    result.fixings += usize::from(fixed);
    result.deletions += 1;
    Ok(result)
}

/// `a x + b y == value` expresses one variable in the other.
///
/// A non-integer variable can always be the one substituted away. With two integer variables,
/// an integral coefficient ratio (and constant) still permits a direct aggregation; otherwise
/// the integer solutions form a one-parameter family, parameterized by a fresh unbounded
/// integer variable both originals are aggregated to.
fn aggregate_pair(
    constraints: &mut ConstraintSet,
    variables: &mut VariableSet,
    index: usize,
    value: f64,
) -> Result<Reductions, Cutoff> {
    let tolerance = constraints.tolerance;
    let ((x, a), (y, b)) = {
        let constraint = constraints.constraint(index);
        (
            (constraint.variable(0), constraint.coefficient(0)),
            (constraint.variable(1), constraint.coefficient(1)),
        )
    };
    let x_integer = variables.variable(x).variable_type == VariableType::Integer;
    let y_integer = variables.variable(y).variable_type == VariableType::Integer;

    let mut result = Reductions::default();
    let direct = if !x_integer {
        Some((x, y, -b / a, value / a))
    } else if !y_integer {
        Some((y, x, -a / b, value / b))
    } else if tolerance.is_integral(b / a) && tolerance.is_integral(value / a) {
        Some((x, y, -b / a, value / a))
    } else if tolerance.is_integral(a / b) && tolerance.is_integral(value / b) {
        Some((y, x, -a / b, value / b))
    } else {
        None
    };

    match direct {
        Some((variable, target, scalar, constant)) => {
            let before = bounds_of(variables, target);
            variables.aggregate(variable, target, scalar, constant)?;
            fan_out_bound_changes(constraints, variables, target, before);
            result.aggregations += 1;
        }
        None => {
            // Both integer with a genuinely fractional ratio: solve the Diophantine equation.
            if !(tolerance.is_integral(a) && tolerance.is_integral(b) && tolerance.is_integral(value)) {
                return Ok(result);
            }
            let a = a.round() as i64;
            let b = b.round() as i64;
            let value = value.round() as i64;
            let (divisor, x0, y0) = extended_euclid(a, b);
            if value % divisor != 0 {
                return Err(Cutoff);
            }
            let factor = value / divisor;
            let name = format!("{}_k", constraints.constraint(index).name());
            let parameter = variables.add(
                name,
                VariableType::Integer,
                0_f64,
                Extended::MINUS_INFINITY,
                Extended::PLUS_INFINITY,
            );
            // x = x0 * value/g + (b/g) t, y = y0 * value/g - (a/g) t.
            variables.aggregate(x, parameter, (b / divisor) as f64, (x0 * factor) as f64)?;
            variables.aggregate(y, parameter, -((a / divisor) as f64), (y0 * factor) as f64)?;
            result.aggregations += 2;
        }
    }

    constraints.delete(index, variables);
    result.deletions += 1;
    Ok(result)
}

/// `gcd(a, b)` with Bézout coefficients: `a x + b y == gcd`, the divisor positive.
fn extended_euclid(a: i64, b: i64) -> (i64, i64, i64) {
    if b == 0 {
        return if a < 0 { (-a, -1, 0) } else { (a, 1, 0) };
    }
    let (divisor, x, y) = extended_euclid(b, a.rem_euclid(b));
    (divisor, y, x - a.div_euclid(b) * y)
}

/// Express a slack variable in all others, turning the equality into an inequality pair.
///
/// A slack candidate is locked by this constraint alone and must tolerate the implied values:
/// continuous and implied-integer variables always do, an integer variable only with a unit
/// coefficient in an otherwise integral constraint. Of several candidates the loosest one wins,
/// continuous before implied-integer before integer, then by domain width.
fn absorb_into_slack(
    constraints: &mut ConstraintSet,
    variables: &mut VariableSet,
    index: usize,
    value: f64,
) -> Result<Reductions, Cutoff> {
    let tolerance = constraints.tolerance;
    let rest_integral = {
        let constraint = constraints.constraint(index);
        tolerance.is_integral(value)
            && constraint.entries().all(|(_, coefficient)| tolerance.is_integral(coefficient))
    };

    let mut best: Option<(usize, VariableType, f64)> = None;
    for (position, (variable, coefficient)) in constraints.constraint(index).entries().enumerate()
    {
        let holder = variables.variable(variable);
        if !holder.is_active()
            || holder.nr_locks(BoundDirection::Lower) != 1
            || holder.nr_locks(BoundDirection::Upper) != 1
        {
            continue;
        }
        let suitable = match holder.variable_type {
            VariableType::Continuous | VariableType::ImpliedInteger => true,
            VariableType::Integer => rest_integral && tolerance.eq(coefficient.abs(), 1_f64),
        };
        if !suitable {
            continue;
        }
        let width = holder.bound(BoundDirection::Upper).to_solver(f64::INFINITY)
            - holder.bound(BoundDirection::Lower).to_solver(f64::INFINITY);
        let better = best.is_none_or(|(_, best_type, best_width)| {
            (holder.variable_type, -width) < (best_type, -best_width)
        });
        if better {
            best = Some((position, holder.variable_type, width));
        }
    }
    let Some((slack_position, _, _)) = best else {
        return Ok(Reductions::default());
    };

    let (slack, coefficient) = {
        let constraint = constraints.constraint(index);
        (constraint.variable(slack_position), constraint.coefficient(slack_position))
    };
    let terms = constraints
        .constraint(index)
        .entries()
        .filter(|&(variable, _)| variable != slack)
        .map(|(variable, other)| (variable, -other / coefficient))
        .collect::<Vec<_>>();
    variables.multi_aggregate(slack, terms, value / coefficient);

    // The slack's domain translates into sides for the remaining activity.
    let slack_lower = variables.variable(slack).bound(BoundDirection::Lower);
    let slack_upper = variables.variable(slack).bound(BoundDirection::Upper);
    constraints.delete_coefficient_at(index, variables, slack_position);
    let to_side = |bound: Extended| bound * -coefficient + value;
    let (new_lhs, new_rhs) = if coefficient > 0_f64 {
        (to_side(slack_upper), to_side(slack_lower))
    } else {
        (to_side(slack_lower), to_side(slack_upper))
    };
    debug_assert!(new_lhs <= new_rhs);
    if new_lhs <= constraints.constraint(index).side(BoundDirection::Upper) {
        constraints.change_side(index, variables, BoundDirection::Lower, new_lhs);
        constraints.change_side(index, variables, BoundDirection::Upper, new_rhs);
    } else {
        constraints.change_side(index, variables, BoundDirection::Upper, new_rhs);
        constraints.change_side(index, variables, BoundDirection::Lower, new_lhs);
    }

    let mut result = Reductions::default();
    result.aggregations += 1;
    result.coefficients_changed += 1;
    result.sides_changed += 2;
    Ok(result)
}

/// Combine two equalities to cancel a shared variable.
///
/// When the equalities share more variables than one of them has of its own, replacing the
/// other with `a * target + b * source` (integral `a`, `b` chosen to cancel one shared
/// variable) can shrink it. The shared variable is picked greedily: fewest resulting nonzeros,
/// ties broken by the smallest `|a| + |b|`. Applied only when the count strictly drops.
pub(crate) fn combine_equalities(
    constraints: &mut ConstraintSet,
    variables: &mut VariableSet,
    first: usize,
    second: usize,
) -> Reductions {
    let tolerance = constraints.tolerance;
    let suitable = |index: usize| {
        let constraint = constraints.constraint(index);
        !constraint.is_modifiable()
            && !constraint.is_local()
            && constraint.row().is_none()
            && constraint.is_equality(tolerance)
            && constraint.entries().all(|(_, coefficient)| tolerance.is_integral(coefficient))
    };
    if !suitable(first) || !suitable(second) {
        return Reductions::default();
    }

    let (common, only_first, only_second) = {
        let first_constraint = constraints.constraint(first);
        let second_constraint = constraints.constraint(second);
        debug_assert!(first_constraint.sorted && second_constraint.sorted);
        let mut common = Vec::new();
        let mut only_first = 0_usize;
        let mut only_second = 0_usize;
        let merged = first_constraint
            .entries()
            .merge_join_by(second_constraint.entries(), |(left, _), (right, _)| {
                left.cmp(right)
            });
        for item in merged {
            match item {
                EitherOrBoth::Both((variable, value0), (_, value1)) => {
                    common.push((variable, value0, value1));
                }
                EitherOrBoth::Left(_) => only_first += 1,
                EitherOrBoth::Right(_) => only_second += 1,
            }
        }
        (common, only_first, only_second)
    };

    for (target, source, only_source) in [
        (second, first, only_first),
        (first, second, only_second),
    ] {
        if common.len() <= only_source {
            continue;
        }
        if let Some(result) = combine_into(constraints, variables, target, source, &common) {
            return result;
        }
    }

    Reductions::default()
}

/// Replace `target` with `a * target + b * source` for the best shared variable, if that
/// shrinks it.
fn combine_into(
    constraints: &mut ConstraintSet,
    variables: &mut VariableSet,
    target: usize,
    source: usize,
    common: &[(usize, f64, f64)],
) -> Option<Reductions> {
    let tolerance = constraints.tolerance;
    let swapped = |target_value: f64, source_value: f64| {
        // `common` stores (first, second) coefficients; orient them onto (target, source).
        if target < source { (target_value, source_value) } else { (source_value, target_value) }
    };

    let mut best: Option<(f64, f64, usize)> = None;
    for &(_, value0, value1) in common {
        let (target_value, source_value) = swapped(value0, value1);
        let divisor = gcd(
            target_value.abs().round() as u64,
            source_value.abs().round() as u64,
        ) as f64;
        let multiplier = source_value / divisor;
        let source_multiplier = -target_value / divisor;
        let nonzeros = {
            let target_constraint = constraints.constraint(target);
            let source_constraint = constraints.constraint(source);
            target_constraint
                .entries()
                .merge_join_by(source_constraint.entries(), |(left, _), (right, _)| {
                    left.cmp(right)
                })
                .filter(|item| {
                    let combined = match item {
                        EitherOrBoth::Left((_, value)) => multiplier * value,
                        EitherOrBoth::Right((_, value)) => source_multiplier * value,
                        EitherOrBoth::Both((_, value0), (_, value1)) => {
                            multiplier * value0 + source_multiplier * value1
                        }
                    };
                    !tolerance.is_zero(combined)
                })
                .count()
        };
        let better = best.is_none_or(|(best_multiplier, best_source_multiplier, best_count)| {
            let weight = multiplier.abs() + source_multiplier.abs();
            let best_weight = best_multiplier.abs() + best_source_multiplier.abs();
            (nonzeros, weight) < (best_count, best_weight)
        });
        if better {
            best = Some((multiplier, source_multiplier, nonzeros));
        }
    }

    let (multiplier, source_multiplier, nonzeros) = best?;
    if nonzeros >= constraints.constraint(target).nr_entries() {
        return None;
    }

    let Extended::Finite(source_value) = constraints.constraint(source).side(BoundDirection::Upper)
    else {
        unreachable!();
    };
    constraints.scale(target, variables, multiplier);
    let additions = constraints.constraint(source).entries().collect::<Vec<_>>();
    for (variable, value) in additions {
        constraints.add_coefficient(target, variables, variable, source_multiplier * value);
    }
    constraints.shift_sides(target, -(source_multiplier * source_value));
    constraints.merge_multiples(target, variables);
    debug_assert_eq!(constraints.constraint(target).nr_entries(), nonzeros);

    let mut result = Reductions::default();
    result.coefficients_changed += 1;
    result.sides_changed += 1;
    Some(result)
}

/// Fan cached-activity updates out after a fixing or aggregation changed a variable's bounds.
pub(crate) fn fan_out_bound_changes(
    constraints: &mut ConstraintSet,
    variables: &VariableSet,
    variable: usize,
    before: (Extended, Extended),
) {
    let (old_lower, old_upper) = before;
    let (new_lower, new_upper) = bounds_of(variables, variable);
    if new_lower != old_lower {
        constraints.apply_bound_change(variables, variable, BoundDirection::Lower, old_lower, new_lower);
    }
    if new_upper != old_upper {
        constraints.apply_bound_change(variables, variable, BoundDirection::Upper, old_upper, new_upper);
    }
}

pub(crate) fn bounds_of(variables: &VariableSet, variable: usize) -> (Extended, Extended) {
    let holder = variables.variable(variable);
    (
        holder.bound(BoundDirection::Lower),
        holder.bound(BoundDirection::Upper),
    )
}
