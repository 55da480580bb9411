//! # Linear constraints
//!
//! A [`LinearConstraint`] is the handler-facing form of `lhs <= a^T x <= rhs`: parallel
//! variable/coefficient arrays over the problem variables, independent of whether an LP row was
//! materialized for it yet. The [`ConstraintSet`] owns all constraints, the deduplicating FIFO
//! of constraints pending propagation, and the operations that keep variable subscriptions,
//! rounding locks and cached activities consistent through every mutation.
//!
//! The propagation and presolve algorithms working on these objects live in
//! [`propagation`] and [`presolve`].
use std::fmt;

use enum_map::EnumMap;
use fifo_set::FIFOSet;

use crate::data::elements::{BoundDirection, NonZeroSign};
use crate::data::number::{Extended, Tolerance};
use crate::data::variable::{Subscription, VariableSet, VariableStatus};
use crate::lp::row::Activity;
use crate::lp::{ContractError, LpRelaxation};
use crate::lp::interface::SolverInterface;

pub mod presolve;
pub mod propagation;

/// One linear constraint `lhs <= sum of coefficient * variable <= rhs`.
///
/// Fields are managed through [`ConstraintSet`]; reading happens through the getters.
#[derive(Debug)]
pub struct LinearConstraint {
    pub(crate) name: String,
    /// Variable index per entry, parallel to `coefficients`.
    pub(crate) variables: Vec<usize>,
    pub(crate) coefficients: Vec<f64>,
    /// Sides, `Lower` is the left hand side.
    pub(crate) sides: EnumMap<BoundDirection, Extended>,
    /// Only valid in the current subtree; local constraints take no rounding locks.
    pub(crate) local: bool,
    /// May gain variables later; excluded from propagation and presolve.
    pub(crate) modifiable: bool,
    /// May be deleted when found redundant.
    pub(crate) removable: bool,
    /// Whether the constraint participates in solving: subscribed and locked.
    pub(crate) transformed: bool,
    /// Whether `variables` is sorted ascending.
    pub(crate) sorted: bool,
    /// Whether propagation reached a fixed point since the last relevant change.
    pub(crate) propagated: bool,
    /// Whether the pairwise redundancy sweep already compared this constraint in its current
    /// form against the ones before it.
    pub(crate) redundancy_checked: bool,
    /// Entry index at which the last bound tightening round found its last improvement.
    pub(crate) last_tightened: usize,
    /// Cached activity aggregates, `None` when invalidated.
    pub(crate) activity: Option<Activity>,
    /// The materialized LP row, once [`ConstraintSet::materialize`] ran.
    pub(crate) row: Option<usize>,
}

impl LinearConstraint {
    /// Constraint name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of entries.
    #[must_use]
    pub fn nr_entries(&self) -> usize {
        self.variables.len()
    }

    /// The entries as `(variable, coefficient)` pairs.
    pub fn entries(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.variables.iter().copied().zip(self.coefficients.iter().copied())
    }

    /// Variable index of the entry at `position`.
    #[must_use]
    pub fn variable(&self, position: usize) -> usize {
        self.variables[position]
    }

    /// Coefficient of the entry at `position`.
    #[must_use]
    pub fn coefficient(&self, position: usize) -> f64 {
        self.coefficients[position]
    }

    /// The side in the given direction, `Lower` being the left hand side.
    #[must_use]
    pub fn side(&self, direction: BoundDirection) -> Extended {
        self.sides[direction]
    }

    /// Whether the constraint is only valid in the current subtree.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.local
    }

    /// Whether the constraint may still gain variables.
    #[must_use]
    pub fn is_modifiable(&self) -> bool {
        self.modifiable
    }

    /// Whether the constraint may be deleted when found redundant.
    #[must_use]
    pub fn is_removable(&self) -> bool {
        self.removable
    }

    /// The materialized LP row, if any.
    #[must_use]
    pub fn row(&self) -> Option<usize> {
        self.row
    }

    /// Whether an equality, `lhs == rhs` with both finite.
    #[must_use]
    pub fn is_equality(&self, tolerance: Tolerance) -> bool {
        match (self.sides[BoundDirection::Lower], self.sides[BoundDirection::Upper]) {
            (Extended::Finite(lhs), Extended::Finite(rhs)) => tolerance.eq(lhs, rhs),
            _ => false,
        }
    }

    /// Whether a side in this direction takes rounding locks.
    fn side_locks(&self, direction: BoundDirection) -> bool {
        self.sides[direction].is_finite()
    }

    fn recompute_activity(&self, variables: &VariableSet) -> Activity {
        let mut activity = Activity::new();
        for (variable, coefficient) in self.entries() {
            let holder = variables.variable(variable);
            activity.add_term(
                coefficient,
                holder.bound(BoundDirection::Lower),
                holder.bound(BoundDirection::Upper),
                holder.best_bound_direction(),
            );
        }
        activity
    }

    fn mark_changed(&mut self) {
        self.propagated = false;
        self.redundancy_checked = false;
    }
}

/// Construction-time flags of a constraint.
#[derive(Debug, Copy, Clone, Default)]
pub struct ConstraintFlags {
    /// Only valid in the current subtree.
    pub local: bool,
    /// May gain variables later.
    pub modifiable: bool,
    /// May be deleted when found redundant.
    pub removable: bool,
}

/// All linear constraints of a problem, with the propagation work queue.
pub struct ConstraintSet {
    /// Arena; deleted constraints leave a `None` slot so indices stay stable.
    constraints: Vec<Option<LinearConstraint>>,
    /// Deduplicating FIFO of constraints pending propagation.
    pub(crate) queue: FIFOSet<usize>,
    pub(crate) tolerance: Tolerance,
}

impl fmt::Debug for ConstraintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintSet")
            .field("constraints", &self.constraints)
            .field("tolerance", &self.tolerance)
            .finish_non_exhaustive()
    }
}

impl ConstraintSet {
    /// An empty constraint set.
    #[must_use]
    pub fn new(tolerance: Tolerance) -> Self {
        Self {
            constraints: Vec::new(),
            queue: std::iter::empty().collect(),
            tolerance,
        }
    }

    /// Add a constraint in original (problem stage) form.
    ///
    /// Entries must have nonzero coefficients; the same variable may appear more than once
    /// until [`Self::merge_multiples`] runs.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        entries: Vec<(usize, f64)>,
        lhs: Extended,
        rhs: Extended,
        flags: ConstraintFlags,
    ) -> usize {
        debug_assert!(lhs <= rhs);
        debug_assert!(entries.iter().all(|&(_, coefficient)| coefficient != 0_f64));

        let (variables, coefficients) = entries.into_iter().unzip::<_, _, Vec<_>, Vec<_>>();
        let sorted = variables.is_sorted();
        self.constraints.push(Some(LinearConstraint {
            name: name.into(),
            variables,
            coefficients,
            sides: EnumMap::from_fn(|direction| match direction {
                BoundDirection::Lower => lhs,
                BoundDirection::Upper => rhs,
            }),
            local: flags.local,
            modifiable: flags.modifiable,
            removable: flags.removable,
            transformed: false,
            sorted,
            propagated: false,
            redundancy_checked: false,
            last_tightened: 0,
            activity: None,
            row: None,
        }));
        self.constraints.len() - 1
    }

    /// Bring a constraint into transformed form: subscribe to bound changes of every member
    /// variable, take rounding locks, and queue it for propagation.
    pub fn transform(&mut self, index: usize, variables: &mut VariableSet) {
        let constraint = match &mut self.constraints[index] {
            Some(constraint) => constraint,
            None => panic!("constraint {index} was deleted"),
        };
        debug_assert!(!constraint.transformed);
        constraint.transformed = true;
        for (position, (variable, coefficient)) in constraint.entries().enumerate() {
            variables.variable_mut(variable).subscribe(index, position);
            lock_entry(variables, constraint, variable, coefficient, true);
        }
        self.queue.push(index);
    }

    /// Number of arena slots, deleted ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Whether no constraints were added yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Whether the slot at `index` still holds a constraint.
    #[must_use]
    pub fn is_alive(&self, index: usize) -> bool {
        self.constraints[index].is_some()
    }

    /// Indices of all live constraints, ascending.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.constraints
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|_| index))
    }

    /// The constraint at `index`; panics if it was deleted.
    #[must_use]
    pub fn constraint(&self, index: usize) -> &LinearConstraint {
        match &self.constraints[index] {
            Some(constraint) => constraint,
            None => panic!("constraint {index} was deleted"),
        }
    }

    pub(crate) fn constraint_mut(&mut self, index: usize) -> &mut LinearConstraint {
        match &mut self.constraints[index] {
            Some(constraint) => constraint,
            None => panic!("constraint {index} was deleted"),
        }
    }

    /// Delete a constraint, unsubscribing and releasing its rounding locks.
    ///
    /// A materialized row must be released by the caller beforehand.
    pub fn delete(&mut self, index: usize, variables: &mut VariableSet) {
        let constraint = match self.constraints[index].take() {
            Some(constraint) => constraint,
            None => panic!("constraint {index} was deleted"),
        };
        debug_assert!(constraint.row.is_none());
        if constraint.transformed {
            for (position, (variable, coefficient)) in constraint.entries().enumerate() {
                variables.variable_mut(variable).unsubscribe(index, position);
                lock_entry(variables, &constraint, variable, coefficient, false);
            }
        }
    }

    // Entry mutation

    /// Append an entry; duplicates of a variable are allowed until the next merge.
    pub fn add_coefficient(
        &mut self,
        index: usize,
        variables: &mut VariableSet,
        variable: usize,
        value: f64,
    ) {
        debug_assert_ne!(value, 0_f64);
        let constraint = self.constraint_mut(index);
        let position = constraint.variables.len();
        constraint.sorted = position == 0
            || (constraint.sorted && constraint.variables[position - 1] <= variable);
        constraint.variables.push(variable);
        constraint.coefficients.push(value);
        constraint.mark_changed();
        if constraint.transformed {
            variables.variable_mut(variable).subscribe(index, position);
        }
        let holder = variables.variable(variable);
        if let Some(activity) = &mut self.constraint_mut(index).activity {
            activity.add_term(
                value,
                holder.bound(BoundDirection::Lower),
                holder.bound(BoundDirection::Upper),
                holder.best_bound_direction(),
            );
        }
        let constraint = self.constraint(index);
        if constraint.transformed {
            let coefficient = constraint.coefficients[position];
            let lower_locks = constraint.side_locks(BoundDirection::Lower);
            let upper_locks = constraint.side_locks(BoundDirection::Upper);
            apply_locks(variables, variable, coefficient, lower_locks, upper_locks,
                constraint.local, true);
        }
    }

    /// Remove the entry at `position` by swap-delete, repairing the displaced subscription.
    pub(crate) fn delete_coefficient_at(
        &mut self,
        index: usize,
        variables: &mut VariableSet,
        position: usize,
    ) {
        let (variable, coefficient, transformed, last) = {
            let constraint = self.constraint(index);
            (
                constraint.variables[position],
                constraint.coefficients[position],
                constraint.transformed,
                constraint.nr_entries() - 1,
            )
        };
        if transformed {
            variables.variable_mut(variable).unsubscribe(index, position);
            if position != last {
                let moved = self.constraint(index).variables[last];
                variables.variable_mut(moved).resubscribe(index, last, position);
            }
        }
        {
            let holder = variables.variable(variable);
            let lower = holder.bound(BoundDirection::Lower);
            let upper = holder.bound(BoundDirection::Upper);
            let best = holder.best_bound_direction();
            let constraint = self.constraint_mut(index);
            if let Some(activity) = &mut constraint.activity {
                activity.remove_term(coefficient, lower, upper, best);
            }
            constraint.variables.swap_remove(position);
            constraint.coefficients.swap_remove(position);
            constraint.sorted = false;
            constraint.mark_changed();
        }
        let constraint = self.constraint(index);
        if transformed {
            let lower_locks = constraint.side_locks(BoundDirection::Lower);
            let upper_locks = constraint.side_locks(BoundDirection::Upper);
            let local = constraint.local;
            apply_locks(variables, variable, coefficient, lower_locks, upper_locks, local, false);
        }
    }

    /// Change the coefficient at `position`; a numerically zero value deletes the entry.
    pub(crate) fn change_coefficient_at(
        &mut self,
        index: usize,
        variables: &mut VariableSet,
        position: usize,
        value: f64,
    ) {
        if self.tolerance.is_zero(value) {
            return self.delete_coefficient_at(index, variables, position);
        }
        let (variable, old) = {
            let constraint = self.constraint(index);
            (constraint.variables[position], constraint.coefficients[position])
        };
        // Locks depend on the coefficient's sign, so release and re-take them.
        let (transformed, lower_locks, upper_locks, local) = {
            let constraint = self.constraint(index);
            (
                constraint.transformed,
                constraint.side_locks(BoundDirection::Lower),
                constraint.side_locks(BoundDirection::Upper),
                constraint.local,
            )
        };
        if transformed {
            apply_locks(variables, variable, old, lower_locks, upper_locks, local, false);
        }
        {
            let holder = variables.variable(variable);
            let lower = holder.bound(BoundDirection::Lower);
            let upper = holder.bound(BoundDirection::Upper);
            let best = holder.best_bound_direction();
            let constraint = self.constraint_mut(index);
            if let Some(activity) = &mut constraint.activity {
                activity.remove_term(old, lower, upper, best);
                activity.add_term(value, lower, upper, best);
            }
            constraint.coefficients[position] = value;
            constraint.mark_changed();
        }
        if transformed {
            apply_locks(variables, variable, value, lower_locks, upper_locks, local, true);
        }
    }

    /// Change one side, with rounding lock transitions when the side crosses infinity.
    pub fn change_side(
        &mut self,
        index: usize,
        variables: &mut VariableSet,
        direction: BoundDirection,
        new: Extended,
    ) {
        let (old, transformed, local) = {
            let constraint = self.constraint_mut(index);
            let old = std::mem::replace(&mut constraint.sides[direction], new);
            debug_assert!(
                constraint.sides[BoundDirection::Lower] <= constraint.sides[BoundDirection::Upper],
            );
            constraint.mark_changed();
            (old, constraint.transformed, constraint.local)
        };
        if transformed && !local && old.is_finite() != new.is_finite() {
            let take = new.is_finite();
            let entries = self.constraint(index).entries().collect::<Vec<_>>();
            for (variable, coefficient) in entries {
                let lock_direction = direction ^ NonZeroSign::of(coefficient);
                if take {
                    variables.variable_mut(variable).add_lock(lock_direction);
                } else {
                    variables.variable_mut(variable).remove_lock(lock_direction);
                }
            }
        }
    }

    /// Sort entries by variable index, repositioning subscriptions.
    pub fn sort(&mut self, index: usize, variables: &mut VariableSet) {
        if self.constraint(index).sorted {
            return;
        }
        let (order, transformed) = {
            let constraint = self.constraint(index);
            let mut order = (0..constraint.nr_entries()).collect::<Vec<_>>();
            order.sort_by_key(|&position| constraint.variables[position]);
            (order, constraint.transformed)
        };
        if transformed {
            // Two phases so an old position is never confused with a new one.
            for (old_position, &variable) in self.constraint(index).variables.iter().enumerate() {
                variables.variable_mut(variable).unsubscribe(index, old_position);
            }
        }
        {
            let constraint = self.constraint_mut(index);
            constraint.variables = order.iter().map(|&p| constraint.variables[p]).collect();
            constraint.coefficients = order.iter().map(|&p| constraint.coefficients[p]).collect();
            constraint.sorted = true;
        }
        if transformed {
            for (new_position, &variable) in self.constraint(index).variables.iter().enumerate() {
                variables.variable_mut(variable).subscribe(index, new_position);
            }
        }
    }

    /// Merge duplicate occurrences of a variable into one entry, deleting near-zero sums.
    pub fn merge_multiples(&mut self, index: usize, variables: &mut VariableSet) {
        self.sort(index, variables);
        let mut position = self.constraint(index).nr_entries();
        while position >= 2 {
            position -= 1;
            let (same, merged) = {
                let constraint = self.constraint(index);
                let same = constraint.variables[position] == constraint.variables[position - 1];
                let merged = constraint.coefficients[position - 1]
                    + if same { constraint.coefficients[position] } else { 0_f64 };
                (same, merged)
            };
            if same {
                self.delete_coefficient_at(index, variables, position);
                self.change_coefficient_at(index, variables, position - 1, merged);
                // A near-zero merged value deletes the second entry as well.
                position = position.min(self.constraint(index).nr_entries());
            }
        }
    }

    /// Replace fixed and aggregated member variables, adjusting the sides, then merge.
    ///
    /// Multi-aggregated variables are left in place; substituting them would couple this
    /// constraint to arbitrarily many others.
    pub fn apply_fixings(&mut self, index: usize, variables: &mut VariableSet) {
        let mut position = 0;
        while position < self.constraint(index).nr_entries() {
            let (variable, coefficient) = {
                let constraint = self.constraint(index);
                (constraint.variables[position], constraint.coefficients[position])
            };
            match variables.variable(variable).status().clone() {
                VariableStatus::Active | VariableStatus::MultiAggregated { .. } => {
                    position += 1;
                }
                VariableStatus::Fixed(value) => {
                    self.delete_coefficient_at(index, variables, position);
                    self.shift_sides(index, coefficient * value);
                }
                VariableStatus::Aggregated { variable: target, scalar, constant } => {
                    self.delete_coefficient_at(index, variables, position);
                    self.add_coefficient(index, variables, target, coefficient * scalar);
                    self.shift_sides(index, coefficient * constant);
                }
            }
        }
        self.merge_multiples(index, variables);
    }

    /// Multiply the whole constraint by a nonzero scalar, snapping near-integral results.
    ///
    /// A negative scalar swaps the sides. Rounding locks are unaffected: positive scaling keeps
    /// every sign, and full negation flips every coefficient sign together with the sides'
    /// finiteness pattern.
    pub(crate) fn scale(&mut self, index: usize, variables: &mut VariableSet, scalar: f64) {
        debug_assert_ne!(scalar, 0_f64);
        let tolerance = self.tolerance;
        // An entry whose scaled value snaps to zero is deleted, never stored as a zero.
        let mut position = self.constraint(index).nr_entries();
        while position > 0 {
            position -= 1;
            if tolerance.snap(self.constraint(index).coefficients[position] * scalar) == 0_f64 {
                self.delete_coefficient_at(index, variables, position);
            }
        }
        let snap = |side: Extended| match side * scalar {
            Extended::Finite(value) => Extended::Finite(tolerance.snap(value)),
            infinite => infinite,
        };

        let constraint = self.constraint_mut(index);
        for coefficient in &mut constraint.coefficients {
            *coefficient = tolerance.snap(*coefficient * scalar);
        }
        let lhs = constraint.sides[BoundDirection::Lower];
        let rhs = constraint.sides[BoundDirection::Upper];
        let (lhs, rhs) = if scalar > 0_f64 {
            (snap(lhs), snap(rhs))
        } else {
            (snap(rhs), snap(lhs))
        };
        constraint.sides[BoundDirection::Lower] = lhs;
        constraint.sides[BoundDirection::Upper] = rhs;
        constraint.activity = None;
        constraint.mark_changed();
    }

    /// Subtract `delta` from both finite sides; finiteness never changes, so no lock work.
    fn shift_sides(&mut self, index: usize, delta: f64) {
        let constraint = self.constraint_mut(index);
        for direction in [BoundDirection::Lower, BoundDirection::Upper] {
            if let Extended::Finite(value) = constraint.sides[direction] {
                constraint.sides[direction] = Extended::Finite(value - delta);
            }
        }
        constraint.mark_changed();
    }

    // Activities

    fn ensure_activity(&mut self, index: usize, variables: &VariableSet) {
        let constraint = self.constraint_mut(index);
        if constraint.activity.is_none() {
            constraint.activity = Some(constraint.recompute_activity(variables));
        }
    }

    pub(crate) fn activity(&mut self, index: usize, variables: &VariableSet) -> &Activity {
        self.ensure_activity(index, variables);
        match &self.constraint(index).activity {
            Some(activity) => activity,
            None => unreachable!(),
        }
    }

    /// The constraint's activity bound: minimum for `Lower`, maximum for `Upper`.
    pub fn activity_bound(
        &mut self,
        index: usize,
        variables: &VariableSet,
        direction: BoundDirection,
    ) -> Extended {
        self.activity(index, variables).bound(direction)
    }

    /// The constraint's activity at the member variables' objective-best bounds.
    pub fn pseudo_activity(&mut self, index: usize, variables: &VariableSet) -> Extended {
        self.activity(index, variables).pseudo()
    }

    /// Distance of an activity value to the nearer side, negative when the constraint is
    /// violated.
    #[must_use]
    pub fn feasibility(&self, index: usize, activity: f64) -> f64 {
        let constraint = self.constraint(index);
        let lhs_slack = match constraint.sides[BoundDirection::Lower] {
            Extended::Finite(lhs) => activity - lhs,
            _ => f64::INFINITY,
        };
        let rhs_slack = match constraint.sides[BoundDirection::Upper] {
            Extended::Finite(rhs) => rhs - activity,
            _ => f64::INFINITY,
        };
        lhs_slack.min(rhs_slack)
    }

    /// Feasibility at the pseudo activity.
    ///
    /// An infinite pseudo activity is infinitely infeasible when the side it runs off towards
    /// is finite, and trivially feasible otherwise.
    pub fn pseudo_feasibility(&mut self, index: usize, variables: &VariableSet) -> f64 {
        match self.pseudo_activity(index, variables) {
            Extended::Finite(activity) => self.feasibility(index, activity),
            Extended::Infinite(sign) => {
                let side = match sign {
                    NonZeroSign::Positive => BoundDirection::Upper,
                    NonZeroSign::Negative => BoundDirection::Lower,
                };
                if self.constraint(index).sides[side].is_finite() {
                    f64::NEG_INFINITY
                } else {
                    f64::INFINITY
                }
            }
        }
    }

    /// Drop the cached activity; it is recomputed on next use.
    pub fn invalidate_activity(&mut self, index: usize) {
        self.constraint_mut(index).activity = None;
    }

    /// Fan a bound change out to every subscribed constraint.
    ///
    /// Call right after [`VariableSet::change_bound`], with the old value it returned. Cached
    /// activities are updated incrementally and affected constraints are re-queued.
    pub fn apply_bound_change(
        &mut self,
        variables: &VariableSet,
        variable: usize,
        direction: BoundDirection,
        old: Extended,
        new: Extended,
    ) {
        let holder = variables.variable(variable);
        let best = holder.best_bound_direction();
        for &Subscription { constraint: index, position } in holder.subscribers() {
            let Some(Some(constraint)) = self.constraints.get_mut(index).map(Option::as_mut)
            else {
                continue;
            };
            debug_assert_eq!(constraint.variables[position], variable);
            if let Some(activity) = &mut constraint.activity {
                activity.update_bound(constraint.coefficients[position], direction, old, new, best);
            }
            constraint.propagated = false;
            self.queue.push(index);
        }
    }

    // LP materialization

    /// Materialize the constraint as an LP row, creating columns for new variables.
    ///
    /// Idempotent: a second call returns the row created by the first.
    pub fn materialize<S: SolverInterface>(
        &mut self,
        index: usize,
        lp: &mut LpRelaxation<S>,
        variables: &VariableSet,
    ) -> Result<usize, ContractError> {
        if let Some(row) = self.constraint(index).row {
            return Ok(row);
        }
        let (name, entries, lhs, rhs, local, modifiable) = {
            let constraint = self.constraint(index);
            (
                constraint.name.clone(),
                constraint.entries().collect::<Vec<_>>(),
                constraint.sides[BoundDirection::Lower],
                constraint.sides[BoundDirection::Upper],
                constraint.local,
                constraint.modifiable,
            )
        };
        let row = lp.create_row(name, lhs, rhs, 0_f64, local, modifiable);
        for (variable, coefficient) in entries {
            let column = match lp.column_of_variable(variable) {
                Some(column) => column,
                None => {
                    let holder = variables.variable(variable);
                    lp.add_column(
                        variable,
                        holder.name.clone(),
                        holder.objective,
                        holder.bound(BoundDirection::Lower),
                        holder.bound(BoundDirection::Upper),
                    )
                }
            };
            lp.add_row_coefficient(row, column, coefficient)?;
        }
        self.constraint_mut(index).row = Some(row);
        Ok(row)
    }

    /// Detach the materialized row so the caller can release it.
    pub fn take_row(&mut self, index: usize) -> Option<usize> {
        self.constraint_mut(index).row.take()
    }
}

/// Take or release the rounding locks of one entry against the constraint's current sides.
fn lock_entry(
    variables: &mut VariableSet,
    constraint: &LinearConstraint,
    variable: usize,
    coefficient: f64,
    take: bool,
) {
    apply_locks(
        variables,
        variable,
        coefficient,
        constraint.side_locks(BoundDirection::Lower),
        constraint.side_locks(BoundDirection::Upper),
        constraint.local,
        take,
    );
}

/// A finite left hand side forbids rounding the activity down, a finite right hand side
/// forbids rounding it up; the entry's sign maps that onto a variable direction.
fn apply_locks(
    variables: &mut VariableSet,
    variable: usize,
    coefficient: f64,
    lower_locks: bool,
    upper_locks: bool,
    local: bool,
    take: bool,
) {
    if local {
        return;
    }
    let sign = NonZeroSign::of(coefficient);
    for (direction, locks) in [
        (BoundDirection::Lower, lower_locks),
        (BoundDirection::Upper, upper_locks),
    ] {
        if locks {
            let lock_direction = direction ^ sign;
            if take {
                variables.variable_mut(variable).add_lock(lock_direction);
            } else {
                variables.variable_mut(variable).remove_lock(lock_direction);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::constraint::{ConstraintFlags, ConstraintSet};
    use crate::data::elements::{BoundDirection, VariableType};
    use crate::data::number::{Extended, Tolerance};
    use crate::data::variable::VariableSet;
    use crate::lp::LpRelaxation;
    use crate::lp::interface::recording::RecordingSolver;

    fn variables(bounds: &[(f64, f64)]) -> VariableSet {
        let mut set = VariableSet::new(Tolerance::default());
        for (index, &(lower, upper)) in bounds.iter().enumerate() {
            set.add(
                format!("x{index}"),
                VariableType::Continuous,
                1_f64,
                Extended::Finite(lower),
                Extended::Finite(upper),
            );
        }
        set
    }

    #[test]
    fn transform_takes_locks_by_sign_and_sides() {
        let mut variables = variables(&[(0_f64, 1_f64), (0_f64, 1_f64)]);
        let mut constraints = ConstraintSet::new(Tolerance::default());
        // 2 x0 - 3 x1 <= 5: only the right side locks; x0 up, x1 down.
        let index = constraints.add(
            "c",
            vec![(0, 2_f64), (1, -3_f64)],
            Extended::MINUS_INFINITY,
            Extended::Finite(5_f64),
            ConstraintFlags::default(),
        );
        constraints.transform(index, &mut variables);

        assert_eq!(variables.variable(0).nr_locks(BoundDirection::Upper), 1);
        assert_eq!(variables.variable(0).nr_locks(BoundDirection::Lower), 0);
        assert_eq!(variables.variable(1).nr_locks(BoundDirection::Lower), 1);
        assert_eq!(variables.variable(1).nr_locks(BoundDirection::Upper), 0);
        assert_eq!(variables.variable(0).subscribers().len(), 1);

        // Making the left side finite takes the opposite locks too.
        constraints.change_side(index, &mut variables, BoundDirection::Lower, Extended::Finite(0_f64));
        assert_eq!(variables.variable(0).nr_locks(BoundDirection::Lower), 1);
        assert_eq!(variables.variable(1).nr_locks(BoundDirection::Upper), 1);

        // And relaxing the right side to infinity releases its locks again.
        constraints.change_side(index, &mut variables, BoundDirection::Upper, Extended::PLUS_INFINITY);
        assert_eq!(variables.variable(0).nr_locks(BoundDirection::Upper), 0);
        assert_eq!(variables.variable(1).nr_locks(BoundDirection::Lower), 0);

        constraints.delete(index, &mut variables);
        assert_eq!(variables.variable(0).nr_locks(BoundDirection::Lower), 0);
        assert!(variables.variable(0).subscribers().is_empty());
    }

    #[test]
    fn merge_multiples_sums_duplicates_and_drops_cancellations() {
        let mut variables = variables(&[(0_f64, 1_f64), (0_f64, 1_f64), (0_f64, 1_f64)]);
        let mut constraints = ConstraintSet::new(Tolerance::default());
        let index = constraints.add(
            "c",
            vec![(1, 2_f64), (0, 1_f64), (1, 3_f64), (2, 4_f64), (2, -4_f64)],
            Extended::Finite(0_f64),
            Extended::Finite(10_f64),
            ConstraintFlags::default(),
        );
        constraints.transform(index, &mut variables);
        constraints.merge_multiples(index, &mut variables);

        let constraint = constraints.constraint(index);
        let entries = constraint.entries().collect::<Vec<_>>();
        assert!(entries.contains(&(0, 1_f64)));
        assert!(entries.contains(&(1, 5_f64)));
        assert_eq!(entries.len(), 2);
        // Subscriptions are one-per-entry again.
        assert_eq!(variables.variable(1).subscribers().len(), 1);
        assert!(variables.variable(2).subscribers().is_empty());
        assert_eq!(variables.variable(2).nr_locks(BoundDirection::Lower), 0);
        assert_eq!(variables.variable(2).nr_locks(BoundDirection::Upper), 0);
    }

    #[test]
    fn constraint_set_renders_debug_without_the_queue() {
        let constraints = ConstraintSet::new(Tolerance::default());
        let rendered = format!("{constraints:?}");
        assert!(rendered.contains("ConstraintSet"));
        assert!(rendered.contains("tolerance"));
    }

    #[test]
    fn scaling_deletes_coefficients_that_snap_to_zero() {
        let mut variables = variables(&[(0_f64, 1_f64), (0_f64, 1_f64)]);
        let mut constraints = ConstraintSet::new(Tolerance::default());
        let index = constraints.add(
            "c",
            vec![(0, 2_f64), (1, 1e-8)],
            Extended::Finite(0_f64),
            Extended::Finite(10_f64),
            ConstraintFlags::default(),
        );
        constraints.transform(index, &mut variables);

        constraints.scale(index, &mut variables, 0.01);

        let constraint = constraints.constraint(index);
        assert_eq!(constraint.entries().collect::<Vec<_>>(), vec![(0, 0.02)]);
        assert_eq!(constraint.side(BoundDirection::Upper), Extended::Finite(0.1));
        // The vanished entry released its subscription and locks.
        assert!(variables.variable(1).subscribers().is_empty());
        assert_eq!(variables.variable(1).nr_locks(BoundDirection::Lower), 0);
        assert_eq!(variables.variable(1).nr_locks(BoundDirection::Upper), 0);
    }

    #[test]
    fn apply_fixings_substitutes_fixed_and_aggregated() {
        let mut variables = variables(&[(0_f64, 4_f64), (0_f64, 4_f64), (0_f64, 4_f64)]);
        let mut constraints = ConstraintSet::new(Tolerance::default());
        // x0 + 2 x1 + x2 in [1, 9].
        let index = constraints.add(
            "c",
            vec![(0, 1_f64), (1, 2_f64), (2, 1_f64)],
            Extended::Finite(1_f64),
            Extended::Finite(9_f64),
            ConstraintFlags::default(),
        );
        constraints.transform(index, &mut variables);

        variables.fix(0, 3_f64).unwrap();
        // x1 == -1 * x2 + 4.
        variables.aggregate(1, 2, -1_f64, 4_f64).unwrap();
        constraints.apply_fixings(index, &mut variables);

        // x0 + 2 x1 + x2 = 3 + 2(-x2 + 4) + x2 = 11 - x2, so -x2 in [1 - 11, 9 - 11].
        let constraint = constraints.constraint(index);
        assert_eq!(constraint.entries().collect::<Vec<_>>(), vec![(2, -1_f64)]);
        assert_eq!(constraint.side(BoundDirection::Lower), Extended::Finite(-10_f64));
        assert_eq!(constraint.side(BoundDirection::Upper), Extended::Finite(-2_f64));
    }

    #[test]
    fn bound_change_updates_cached_activity_incrementally() {
        let mut variables = variables(&[(0_f64, 2_f64), (0_f64, 3_f64)]);
        let mut constraints = ConstraintSet::new(Tolerance::default());
        let index = constraints.add(
            "c",
            vec![(0, 1_f64), (1, 2_f64)],
            Extended::MINUS_INFINITY,
            Extended::Finite(10_f64),
            ConstraintFlags::default(),
        );
        constraints.transform(index, &mut variables);
        assert_eq!(
            constraints.activity_bound(index, &variables, BoundDirection::Upper),
            Extended::Finite(8_f64),
        );

        let old = variables.change_bound(1, BoundDirection::Upper, Extended::Finite(1_f64));
        constraints.apply_bound_change(&variables, 1, BoundDirection::Upper, old, Extended::Finite(1_f64));
        assert_eq!(
            constraints.activity_bound(index, &variables, BoundDirection::Upper),
            Extended::Finite(4_f64),
        );
        // Incremental result equals a recomputation from scratch, and survives invalidation.
        let fresh = constraints.constraint(index).recompute_activity(&variables);
        assert_eq!(constraints.constraint(index).activity, Some(fresh));
        constraints.invalidate_activity(index);
        assert_eq!(
            constraints.activity_bound(index, &variables, BoundDirection::Upper),
            Extended::Finite(4_f64),
        );
    }

    #[test]
    fn feasibility_is_the_smaller_slack() {
        let mut variables = variables(&[(0_f64, 2_f64), (0_f64, 3_f64)]);
        let mut constraints = ConstraintSet::new(Tolerance::default());
        let index = constraints.add(
            "c",
            vec![(0, 1_f64), (1, 2_f64)],
            Extended::Finite(1_f64),
            Extended::Finite(10_f64),
            ConstraintFlags::default(),
        );
        constraints.transform(index, &mut variables);

        assert_eq!(constraints.feasibility(index, 7_f64), 3_f64);
        assert_eq!(constraints.feasibility(index, 0_f64), -1_f64);
        // Objective coefficients are positive, so the pseudo activity sits at the lower bounds.
        assert_eq!(constraints.pseudo_feasibility(index, &variables), -1_f64);

        let unbounded = variables.change_bound(0, BoundDirection::Lower, Extended::MINUS_INFINITY);
        constraints.apply_bound_change(
            &variables,
            0,
            BoundDirection::Lower,
            unbounded,
            Extended::MINUS_INFINITY,
        );
        // The pseudo activity runs off to -infinity, against the finite left hand side.
        assert_eq!(constraints.pseudo_feasibility(index, &variables), f64::NEG_INFINITY);
    }

    #[test]
    fn materialize_creates_columns_and_row_once() {
        let mut variables = variables(&[(0_f64, 2_f64), (0_f64, 3_f64)]);
        let mut constraints = ConstraintSet::new(Tolerance::default());
        let index = constraints.add(
            "c",
            vec![(0, 1_f64), (1, 2_f64)],
            Extended::Finite(1_f64),
            Extended::Finite(10_f64),
            ConstraintFlags::default(),
        );
        constraints.transform(index, &mut variables);

        let mut lp = LpRelaxation::new(RecordingSolver::new(), Tolerance::default());
        let row = constraints.materialize(index, &mut lp, &variables).unwrap();
        assert_eq!(lp.nr_columns(), 2);
        assert_eq!(lp.row(row).nr_entries(), 2);
        assert_eq!(constraints.materialize(index, &mut lp, &variables).unwrap(), row);
        assert_eq!(lp.nr_columns(), 2);

        // Detaching the row hands its reference to the caller and permits deletion.
        assert_eq!(constraints.take_row(index), Some(row));
        assert_eq!(constraints.take_row(index), None);
        lp.release_row(row);
        constraints.delete(index, &mut variables);
        assert!(!constraints.is_alive(index));
    }
}
