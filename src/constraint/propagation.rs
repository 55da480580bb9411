//! # Activity-based domain propagation
//!
//! Bound tightening over linear constraints. For each entry the residual activity (the activity
//! bound with that entry's own contribution removed) turns a finite side into a candidate bound
//! for the entry's variable. Candidates crossing the opposite bound prove the subproblem
//! infeasible, which is the [`Cutoff`] result, not an error.
//!
//! Propagation across constraints is driven by the deduplicating FIFO in [`ConstraintSet`]:
//! every applied bound change re-enqueues the constraints subscribed to the changed variable,
//! and [`propagate`] drains the queue to a fixed point.
use crate::constraint::ConstraintSet;
use crate::data::elements::{BoundDirection, Cutoff, NonZeroSign};
use crate::data::number::Extended;
use crate::data::variable::VariableSet;

/// What a propagation run changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Propagation {
    /// Number of variable bounds tightened.
    pub tightened: usize,
    /// Number of redundant constraint sides relaxed to infinity.
    pub sides_relaxed: usize,
    /// Number of fully redundant constraints deleted.
    pub deleted: usize,
}

impl Propagation {
    pub(crate) fn absorb(&mut self, other: Self) {
        self.tightened += other.tightened;
        self.sides_relaxed += other.sides_relaxed;
        self.deleted += other.deleted;
    }
}

/// Drain the work queue, propagating every pending constraint.
///
/// Bound changes made while draining re-enqueue their subscribers, so this runs until no
/// constraint can tighten anything further.
///
/// # Errors
///
/// [`Cutoff`] as soon as any constraint proves the current domains infeasible.
pub fn propagate(
    constraints: &mut ConstraintSet,
    variables: &mut VariableSet,
) -> Result<Propagation, Cutoff> {
    let mut total = Propagation::default();
    while let Some(index) = constraints.queue.pop() {
        if !constraints.is_alive(index) {
            continue;
        }
        total.absorb(propagate_constraint(constraints, variables, index)?);
    }
    Ok(total)
}

/// Propagate a single constraint: tighten member bounds to a fixed point, then check the
/// constraint itself for infeasibility and redundancy.
///
/// Modifiable constraints and constraints already at a propagation fixed point are skipped.
/// Member variables must have been merged to one entry each, see
/// [`ConstraintSet::merge_multiples`].
///
/// # Errors
///
/// [`Cutoff`] when a tightened bound crosses its opposite bound or the activity bounds prove a
/// side unreachable.
pub fn propagate_constraint(
    constraints: &mut ConstraintSet,
    variables: &mut VariableSet,
    index: usize,
) -> Result<Propagation, Cutoff> {
    {
        let constraint = constraints.constraint(index);
        if constraint.is_modifiable() || constraint.propagated {
            return Ok(Propagation::default());
        }
    }

    let mut result = Propagation::default();
    result.tightened = tighten_bounds(constraints, variables, index)?;
    let outcome = process_redundancy(constraints, variables, index)?;
    result.absorb(outcome);
    if constraints.is_alive(index) {
        constraints.constraint_mut(index).propagated = true;
    }

    Ok(result)
}

/// Tighten the bounds of all member variables to a fixed point.
///
/// Entries are visited round-robin starting just past the position where the previous run
/// found its last improvement; one improvement can shrink the residuals seen by every other
/// entry, so the loop only stops after a full cycle without changes.
///
/// # Return value
///
/// The number of bounds tightened, or [`Cutoff`].
pub fn tighten_bounds(
    constraints: &mut ConstraintSet,
    variables: &mut VariableSet,
    index: usize,
) -> Result<usize, Cutoff> {
    let nr_entries = constraints.constraint(index).nr_entries();
    if nr_entries == 0 {
        return Ok(0);
    }

    let mut position = constraints.constraint(index).last_tightened % nr_entries;
    let mut last_improved = position;
    let mut unimproved_streak = 0;
    let mut total = 0;
    while unimproved_streak < nr_entries {
        let tightened = tighten_entry(constraints, variables, index, position)?;
        if tightened > 0 {
            total += tightened;
            last_improved = position;
            unimproved_streak = 0;
        } else {
            unimproved_streak += 1;
        }
        position = (position + 1) % nr_entries;
    }
    constraints.constraint_mut(index).last_tightened = last_improved;

    Ok(total)
}

/// Derive candidate bounds for one entry's variable from both finite sides.
///
/// For a positive coefficient, the right hand side minus the minimum residual caps the
/// variable from above and the left hand side minus the maximum residual from below; a
/// negative coefficient flips the direction. Residuals that are themselves infinite yield
/// nothing.
fn tighten_entry(
    constraints: &mut ConstraintSet,
    variables: &mut VariableSet,
    index: usize,
    position: usize,
) -> Result<usize, Cutoff> {
    let tolerance = constraints.tolerance;
    let mut tightened = 0;
    for side_direction in [BoundDirection::Upper, BoundDirection::Lower] {
        let (variable, coefficient) = {
            let constraint = constraints.constraint(index);
            (constraint.variable(position), constraint.coefficient(position))
        };
        let Extended::Finite(side) = constraints.constraint(index).side(side_direction) else {
            continue;
        };
        let (lower, upper, is_integer) = {
            let holder = variables.variable(variable);
            (
                holder.bound(BoundDirection::Lower),
                holder.bound(BoundDirection::Upper),
                holder.variable_type.is_integer(),
            )
        };
        // The right hand side pairs with the minimum residual, the left with the maximum.
        let residual = constraints
            .activity(index, variables)
            .residual(!side_direction, coefficient, lower, upper);
        let Extended::Finite(residual) = residual else {
            continue;
        };

        let target = side_direction ^ NonZeroSign::of(coefficient);
        let mut candidate = (side - residual) / coefficient;
        if is_integer {
            candidate = match target {
                BoundDirection::Lower => tolerance.ceil(candidate),
                BoundDirection::Upper => tolerance.floor(candidate),
            };
        }

        let current = variables.variable(variable).bound(target);
        let improves = match (target, current) {
            (BoundDirection::Lower, Extended::Finite(current)) => {
                tolerance.sum_gt(candidate, current)
            }
            (BoundDirection::Upper, Extended::Finite(current)) => {
                tolerance.sum_lt(candidate, current)
            }
            // Any finite candidate beats an infinite bound.
            _ => true,
        };
        if !improves {
            continue;
        }

        // A candidate past the opposite bound empties the domain.
        if let Extended::Finite(opposite) = variables.variable(variable).bound(!target) {
            let crossed = match target {
                BoundDirection::Lower => tolerance.sum_gt(candidate, opposite),
                BoundDirection::Upper => tolerance.sum_lt(candidate, opposite),
            };
            if crossed {
                return Err(Cutoff);
            }
        }

        let new = Extended::Finite(candidate);
        let old = variables.change_bound(variable, target, new);
        constraints.apply_bound_change(variables, variable, target, old, new);
        tightened += 1;
    }

    Ok(tightened)
}

/// Check a constraint's activity bounds against its sides.
///
/// A minimum activity above the right hand side (or maximum below the left) is a [`Cutoff`].
/// A side the activity can never violate is relaxed to infinity; when both sides are gone and
/// the constraint is removable and not materialized, it is deleted.
pub fn process_redundancy(
    constraints: &mut ConstraintSet,
    variables: &mut VariableSet,
    index: usize,
) -> Result<Propagation, Cutoff> {
    let tolerance = constraints.tolerance;
    let minimum = constraints.activity_bound(index, variables, BoundDirection::Lower);
    let maximum = constraints.activity_bound(index, variables, BoundDirection::Upper);
    let lhs = constraints.constraint(index).side(BoundDirection::Lower);
    let rhs = constraints.constraint(index).side(BoundDirection::Upper);

    let infeasible = match (minimum, rhs) {
        (Extended::Finite(minimum), Extended::Finite(rhs)) => tolerance.sum_gt(minimum, rhs),
        (Extended::Infinite(NonZeroSign::Positive), Extended::Finite(_)) => true,
        _ => false,
    } || match (maximum, lhs) {
        (Extended::Finite(maximum), Extended::Finite(lhs)) => tolerance.sum_lt(maximum, lhs),
        (Extended::Infinite(NonZeroSign::Negative), Extended::Finite(_)) => true,
        _ => false,
    };
    if infeasible {
        return Err(Cutoff);
    }

    let mut result = Propagation::default();
    if let (Extended::Finite(lhs), Extended::Finite(minimum)) = (lhs, minimum) {
        if !tolerance.sum_lt(minimum, lhs) {
            constraints.change_side(index, variables, BoundDirection::Lower, Extended::MINUS_INFINITY);
            result.sides_relaxed += 1;
        }
    }
    if let (Extended::Finite(rhs), Extended::Finite(maximum)) = (rhs, maximum) {
        if !tolerance.sum_gt(maximum, rhs) {
            constraints.change_side(index, variables, BoundDirection::Upper, Extended::PLUS_INFINITY);
            result.sides_relaxed += 1;
        }
    }

    let constraint = constraints.constraint(index);
    if !constraint.side(BoundDirection::Lower).is_finite()
        && !constraint.side(BoundDirection::Upper).is_finite()
        && constraint.is_removable()
        && constraint.row().is_none()
    {
        constraints.delete(index, variables);
        result.deleted += 1;
    }

    Ok(result)
}
