//! # Problem variables
//!
//! A flat arena of variables shared by the LP layer and the constraint layer. Variables carry
//! their bounds, objective coefficient, rounding locks, and the subscriptions through which
//! constraints hear about bound changes. They do not know about the LP; a variable's column is
//! managed by [`crate::lp::LpRelaxation`].
use enum_map::{enum_map, EnumMap};

use crate::data::elements::{BoundDirection, Cutoff, NonZeroSign, VariableType};
use crate::data::number::{Extended, Tolerance};

/// A bound change subscription of a constraint on a variable.
///
/// When the variable's bound changes, the constraint at `constraint` updates the cached
/// activity contribution of its entry at `position`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Subscription {
    /// Index of the subscribed constraint in its [`crate::constraint::ConstraintSet`].
    pub constraint: usize,
    /// Position of the variable's entry within that constraint.
    pub position: usize,
}

/// What happened to a variable during presolve.
#[derive(Clone, Debug, PartialEq)]
pub enum VariableStatus {
    /// A regular problem variable.
    Active,
    /// Fixed to a single value.
    Fixed(f64),
    /// Substituted by `scalar * other + constant`.
    Aggregated {
        /// The variable this one was expressed in.
        variable: usize,
        /// Multiplier of the aggregation variable.
        scalar: f64,
        /// Constant offset of the aggregation.
        constant: f64,
    },
    /// Substituted by an affine combination of several variables.
    MultiAggregated {
        /// Terms `(variable, coefficient)` of the combination.
        terms: Vec<(usize, f64)>,
        /// Constant offset of the combination.
        constant: f64,
    },
}

/// A single problem variable.
#[derive(Debug)]
pub struct Variable {
    /// Name used in diagnostics and passed to the external solver.
    pub name: String,
    /// Continuous, integer or implied integer.
    pub variable_type: VariableType,
    /// Objective coefficient. Fixed for the lifetime of the variable, see the crate's design
    /// notes: the solver interface has no objective mutation call.
    pub objective: f64,
    bounds: EnumMap<BoundDirection, Extended>,
    status: VariableStatus,
    locks: EnumMap<BoundDirection, u32>,
    subscriptions: Vec<Subscription>,
}

impl Variable {
    /// Current bound in the given direction.
    #[must_use]
    pub fn bound(&self, direction: BoundDirection) -> Extended {
        self.bounds[direction]
    }

    /// The bound that is tightest with respect to improving the objective.
    ///
    /// Minimization pushes a variable with nonnegative cost to its lower bound and one with
    /// negative cost to its upper bound.
    #[must_use]
    pub fn best_bound_direction(&self) -> BoundDirection {
        if self.objective >= 0_f64 {
            BoundDirection::Lower
        } else {
            BoundDirection::Upper
        }
    }

    /// Value of the objective-best bound, see [`Self::best_bound_direction`].
    #[must_use]
    pub fn best_bound(&self) -> Extended {
        self.bounds[self.best_bound_direction()]
    }

    /// Presolve status of this variable.
    #[must_use]
    pub fn status(&self) -> &VariableStatus {
        &self.status
    }

    /// Whether this variable is still an active problem variable.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == VariableStatus::Active
    }

    /// Number of constraints that forbid rounding in the given direction.
    ///
    /// `Lower` counts down-locks, `Upper` counts up-locks.
    #[must_use]
    pub fn nr_locks(&self, direction: BoundDirection) -> u32 {
        self.locks[direction]
    }

    /// Forbid rounding in the given direction (one more lock).
    pub fn add_lock(&mut self, direction: BoundDirection) {
        self.locks[direction] += 1;
    }

    /// Allow rounding in the given direction again (one lock less).
    pub fn remove_lock(&mut self, direction: BoundDirection) {
        debug_assert!(self.locks[direction] > 0);

        self.locks[direction] -= 1;
    }

    /// Constraints subscribed to bound changes of this variable.
    #[must_use]
    pub fn subscribers(&self) -> &[Subscription] {
        &self.subscriptions
    }

    /// Register a constraint entry for bound change updates.
    pub fn subscribe(&mut self, constraint: usize, position: usize) {
        debug_assert!(!self.subscriptions.contains(&Subscription { constraint, position }));

        self.subscriptions.push(Subscription { constraint, position });
    }

    /// Remove a constraint entry's registration.
    pub fn unsubscribe(&mut self, constraint: usize, position: usize) {
        let target = Subscription { constraint, position };
        let index = self.subscriptions.iter().position(|&s| s == target)
            .expect("unsubscribing a subscription that was never made");
        self.subscriptions.swap_remove(index);
    }

    /// A constraint entry moved; keep the subscription pointing at it.
    pub fn resubscribe(&mut self, constraint: usize, old_position: usize, new_position: usize) {
        let target = Subscription { constraint, position: old_position };
        let index = self.subscriptions.iter().position(|&s| s == target)
            .expect("repositioning a subscription that was never made");
        self.subscriptions[index].position = new_position;
    }
}

/// Arena of all problem variables.
#[derive(Debug)]
pub struct VariableSet {
    variables: Vec<Variable>,
    /// Objective value contributed by fixed and aggregated-away variables.
    objective_offset: f64,
    tolerance: Tolerance,
}

impl VariableSet {
    /// Create an empty variable set.
    #[must_use]
    pub fn new(tolerance: Tolerance) -> Self {
        Self {
            variables: Vec::new(),
            objective_offset: 0_f64,
            tolerance,
        }
    }

    /// Add a variable, returning its index.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        variable_type: VariableType,
        objective: f64,
        lower: Extended,
        upper: Extended,
    ) -> usize {
        debug_assert!(lower <= upper);

        self.variables.push(Variable {
            name: name.into(),
            variable_type,
            objective,
            bounds: enum_map! {
                BoundDirection::Lower => lower,
                BoundDirection::Upper => upper,
            },
            status: VariableStatus::Active,
            locks: enum_map! { _ => 0 },
            subscriptions: Vec::new(),
        });

        self.variables.len() - 1
    }

    /// Number of variables ever added, including inactive ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether no variables were added yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// The variable at an index.
    #[must_use]
    pub fn variable(&self, index: usize) -> &Variable {
        &self.variables[index]
    }

    /// Mutable access to the variable at an index.
    pub fn variable_mut(&mut self, index: usize) -> &mut Variable {
        &mut self.variables[index]
    }

    /// Objective value already decided by fixings and aggregations.
    #[must_use]
    pub fn objective_offset(&self) -> f64 {
        self.objective_offset
    }

    /// Change a bound, returning the old value.
    ///
    /// The caller distributes the change: constraints hear about it through
    /// [`crate::constraint::ConstraintSet::apply_bound_change`] and linked LP rows through
    /// [`crate::lp::LpRelaxation::change_column_bound`].
    pub fn change_bound(&mut self, variable: usize, direction: BoundDirection, new: Extended) -> Extended {
        let bounds = &mut self.variables[variable].bounds;
        debug_assert!(match direction {
            BoundDirection::Lower => new <= bounds[BoundDirection::Upper],
            BoundDirection::Upper => new >= bounds[BoundDirection::Lower],
        });

        std::mem::replace(&mut bounds[direction], new)
    }

    /// Whether the variable's domain has shrunk to a single value.
    #[must_use]
    pub fn has_fixed_domain(&self, variable: usize) -> bool {
        let variable = &self.variables[variable];
        self.tolerance.ext_eq(variable.bound(BoundDirection::Lower), variable.bound(BoundDirection::Upper))
    }

    /// Fix a variable to a value.
    ///
    /// # Return value
    ///
    /// `Err` if the value is outside the variable's domain or fractional for an integer
    /// variable. `Ok(true)` if the variable was active and is now fixed, `Ok(false)` if it
    /// already was fixed to (numerically) the same value.
    pub fn fix(&mut self, variable: usize, value: f64) -> Result<bool, Cutoff> {
        let tolerance = self.tolerance;
        let entry = &mut self.variables[variable];

        if entry.variable_type.is_integer() && !tolerance.is_integral(value) {
            return Err(Cutoff);
        }
        match entry.status {
            VariableStatus::Fixed(existing) => {
                return if tolerance.eq(existing, value) { Ok(false) } else { Err(Cutoff) };
            }
            VariableStatus::Active => {}
            _ => panic!("fixing an aggregated variable"),
        }
        let value = tolerance.snap(value);
        if tolerance.ext_gt(Extended::Finite(value), entry.bounds[BoundDirection::Upper])
            || tolerance.ext_lt(Extended::Finite(value), entry.bounds[BoundDirection::Lower])
        {
            return Err(Cutoff);
        }

        entry.bounds[BoundDirection::Lower] = Extended::Finite(value);
        entry.bounds[BoundDirection::Upper] = Extended::Finite(value);
        entry.status = VariableStatus::Fixed(value);
        self.objective_offset += entry.objective * value;

        Ok(true)
    }

    /// Express a variable as `scalar * target + constant` and deactivate it.
    ///
    /// The variable's bounds are transferred onto `target`, which can reveal infeasibility.
    pub fn aggregate(&mut self, variable: usize, target: usize, scalar: f64, constant: f64) -> Result<(), Cutoff> {
        debug_assert_ne!(variable, target);
        debug_assert!(scalar != 0_f64);
        debug_assert!(self.variables[variable].is_active());
        debug_assert!(self.variables[target].is_active());

        // variable in [l, u] and variable == scalar * target + constant bound the target to
        // [(l - constant) / scalar, (u - constant) / scalar], flipped for negative scalars.
        let lower = self.variables[variable].bound(BoundDirection::Lower);
        let upper = self.variables[variable].bound(BoundDirection::Upper);
        let (mut implied_lower, mut implied_upper) = match NonZeroSign::of(scalar) {
            NonZeroSign::Positive => ((lower - constant) * (1_f64 / scalar), (upper - constant) * (1_f64 / scalar)),
            NonZeroSign::Negative => ((upper - constant) * (1_f64 / scalar), (lower - constant) * (1_f64 / scalar)),
        };
        if self.variables[target].variable_type.is_integer() {
            if let Extended::Finite(value) = implied_lower {
                implied_lower = Extended::Finite(self.tolerance.ceil(value));
            }
            if let Extended::Finite(value) = implied_upper {
                implied_upper = Extended::Finite(self.tolerance.floor(value));
            }
        }

        let tolerance = self.tolerance;
        let target_entry = &mut self.variables[target];
        if tolerance.ext_gt(implied_lower, target_entry.bounds[BoundDirection::Lower]) {
            if tolerance.ext_gt(implied_lower, target_entry.bounds[BoundDirection::Upper]) {
                return Err(Cutoff);
            }
            target_entry.bounds[BoundDirection::Lower] = implied_lower;
        }
        if tolerance.ext_lt(implied_upper, target_entry.bounds[BoundDirection::Upper]) {
            if tolerance.ext_lt(implied_upper, target_entry.bounds[BoundDirection::Lower]) {
                return Err(Cutoff);
            }
            target_entry.bounds[BoundDirection::Upper] = implied_upper;
        }

        let objective = self.variables[variable].objective;
        self.variables[target].objective += scalar * objective;
        self.objective_offset += constant * objective;
        self.variables[variable].status = VariableStatus::Aggregated {
            variable: target,
            scalar,
            constant,
        };

        Ok(())
    }

    /// Express a variable as an affine combination of several others and deactivate it.
    ///
    /// Unlike [`Self::aggregate`], no bounds are transferred; the combination's range is not
    /// representable as bounds on a single variable.
    pub fn multi_aggregate(&mut self, variable: usize, terms: Vec<(usize, f64)>, constant: f64) {
        debug_assert!(self.variables[variable].is_active());
        debug_assert!(terms.iter().all(|&(v, _)| v != variable && self.variables[v].is_active()));

        let objective = self.variables[variable].objective;
        for &(term_variable, coefficient) in &terms {
            self.variables[term_variable].objective += coefficient * objective;
        }
        self.objective_offset += constant * objective;
        self.variables[variable].status = VariableStatus::MultiAggregated { terms, constant };
    }
}
