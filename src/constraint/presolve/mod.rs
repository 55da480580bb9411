//! # Presolve
//!
//! Root-node reductions applied before the first relaxation is solved. Each round runs the
//! single-constraint reductions (substitute resolved variables, normalize, round integral
//! sides, convert equalities, tighten bounds, detect redundancy), fixes variables whose domain
//! collapsed, and finishes with a pairwise sweep for dominated and combinable constraints.
//! Rounds repeat until one passes without any reduction.
use crate::constraint::ConstraintSet;
use crate::constraint::presolve::aggregation::{combine_equalities, convert_equality};
use crate::constraint::presolve::normalize::{normalize, tighten_sides};
use crate::constraint::presolve::redundancy::check_pair;
use crate::constraint::propagation::{process_redundancy, tighten_bounds};
use crate::data::elements::{BoundDirection, Cutoff};
use crate::data::number::Extended;
use crate::data::variable::VariableSet;

pub mod aggregation;
pub mod normalize;
pub mod redundancy;

/// Rounds stop after this many iterations even when still making progress.
pub const MAX_ROUNDS: usize = 10;

/// Tally of the reductions a presolve pass achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reductions {
    /// Variable bounds tightened.
    pub bounds_tightened: usize,
    /// Constraint sides tightened, shifted or relaxed.
    pub sides_changed: usize,
    /// Constraints whose coefficient vector changed.
    pub coefficients_changed: usize,
    /// Variables fixed to a value.
    pub fixings: usize,
    /// Variables aggregated away.
    pub aggregations: usize,
    /// Constraints deleted.
    pub deletions: usize,
}

impl Reductions {
    pub(crate) fn absorb(&mut self, other: Self) {
        self.bounds_tightened += other.bounds_tightened;
        self.sides_changed += other.sides_changed;
        self.coefficients_changed += other.coefficients_changed;
        self.fixings += other.fixings;
        self.aggregations += other.aggregations;
        self.deletions += other.deletions;
    }
}

/// Run presolve rounds until a round achieves nothing or [`MAX_ROUNDS`] is reached.
///
/// Only global, transformed, non-modifiable constraints are reduced; others are left alone.
///
/// # Errors
///
/// [`Cutoff`] as soon as any reduction proves the problem infeasible.
pub fn presolve(
    constraints: &mut ConstraintSet,
    variables: &mut VariableSet,
) -> Result<Reductions, Cutoff> {
    let mut total = Reductions::default();
    for _ in 0..MAX_ROUNDS {
        let mut round = Reductions::default();
        let indices = constraints.indices().collect::<Vec<_>>();
        for index in indices {
            if !constraints.is_alive(index) {
                continue;
            }
            {
                let constraint = constraints.constraint(index);
                if constraint.is_modifiable() || constraint.is_local() || !constraint.transformed
                {
                    continue;
                }
            }

            constraints.apply_fixings(index, variables);
            if constraints.constraint(index).nr_entries() == 0 {
                round.absorb(resolve_empty(constraints, variables, index)?);
                continue;
            }
            round.coefficients_changed += usize::from(normalize(constraints, variables, index));
            round.sides_changed += tighten_sides(constraints, variables, index)?;
            round.absorb(convert_equality(constraints, variables, index)?);
            if !constraints.is_alive(index) {
                continue;
            }
            round.bounds_tightened += tighten_bounds(constraints, variables, index)?;
            let outcome = process_redundancy(constraints, variables, index)?;
            round.bounds_tightened += outcome.tightened;
            round.sides_changed += outcome.sides_relaxed;
            round.deletions += outcome.deleted;
        }

        round.fixings += fix_settled_variables(constraints, variables)?;
        round.absorb(pair_sweep(constraints, variables)?);

        let progress = round != Reductions::default();
        total.absorb(round);
        if !progress {
            break;
        }
    }
    Ok(total)
}

/// A constraint without entries is infeasible when a side excludes zero, redundant otherwise.
fn resolve_empty(
    constraints: &mut ConstraintSet,
    variables: &mut VariableSet,
    index: usize,
) -> Result<Reductions, Cutoff> {
    let tolerance = constraints.tolerance;
    let constraint = constraints.constraint(index);
    let infeasible = match constraint.side(BoundDirection::Lower) {
        Extended::Finite(lhs) => tolerance.sum_gt(lhs, 0_f64),
        _ => false,
    } || match constraint.side(BoundDirection::Upper) {
        Extended::Finite(rhs) => tolerance.sum_lt(rhs, 0_f64),
        _ => false,
    };
    if infeasible {
        return Err(Cutoff);
    }

    let mut result = Reductions::default();
    if constraints.constraint(index).row().is_none() {
        constraints.delete(index, variables);
        result.deletions += 1;
    }
    Ok(result)
}

/// Fix every active variable whose lower and upper bound coincide.
///
/// # Errors
///
/// [`Cutoff`] when such a value violates integrality.
pub fn fix_settled_variables(
    constraints: &mut ConstraintSet,
    variables: &mut VariableSet,
) -> Result<usize, Cutoff> {
    let mut fixed = 0;
    for variable in 0..variables.len() {
        if !variables.variable(variable).is_active() || !variables.has_fixed_domain(variable) {
            continue;
        }
        let Extended::Finite(value) = variables.variable(variable).bound(BoundDirection::Lower)
        else {
            continue;
        };
        let before = aggregation::bounds_of(variables, variable);
        fixed += usize::from(variables.fix(variable, value)?);
        // Snapping can nudge both bounds; subscribed caches follow the old values.
        aggregation::fan_out_bound_changes(constraints, variables, variable, before);
    }
    Ok(fixed)
}

/// Compare all pairs of candidate constraints for domination and combination.
///
/// A pair is only revisited when at least one member changed since it was last checked; the
/// flag is set up front so any mutation during the sweep clears it again for the next round.
fn pair_sweep(
    constraints: &mut ConstraintSet,
    variables: &mut VariableSet,
) -> Result<Reductions, Cutoff> {
    let candidates = constraints
        .indices()
        .filter(|&index| {
            let constraint = constraints.constraint(index);
            !constraint.is_modifiable()
                && !constraint.is_local()
                && constraint.transformed
                && constraint.nr_entries() > 0
        })
        .collect::<Vec<_>>();
    let mut unchecked = Vec::with_capacity(candidates.len());
    for &index in &candidates {
        constraints.sort(index, variables);
        let constraint = constraints.constraint_mut(index);
        unchecked.push(!constraint.redundancy_checked);
        constraint.redundancy_checked = true;
    }

    let mut result = Reductions::default();
    for (position, &first) in candidates.iter().enumerate() {
        for (offset, &second) in candidates[position + 1..].iter().enumerate() {
            if !unchecked[position] && !unchecked[position + 1 + offset] {
                continue;
            }
            if !constraints.is_alive(first) {
                break;
            }
            if !constraints.is_alive(second) {
                continue;
            }
            result.absorb(check_pair(constraints, variables, first, second)?);
            if constraints.is_alive(first) && constraints.is_alive(second) {
                result.absorb(combine_equalities(constraints, variables, first, second));
            }
        }
    }
    Ok(result)
}
