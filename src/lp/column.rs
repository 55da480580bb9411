//! # Columns
//!
//! One [`Column`] per problem variable that entered the relaxation. A column stores the
//! LP-facing view of the variable (objective coefficient, current bounds) together with its side
//! of the sparse dual representation: mirrored entries pointing at the rows that reference it.
//!
//! Columns do not originate coefficients; those are owned by rows and mirrored here when the row
//! is linked, see [`crate::lp::LpRelaxation`].
use enum_map::EnumMap;

use crate::data::elements::BoundDirection;
use crate::data::number::Extended;
use crate::lp::Entry;

/// A variable in column representation.
///
/// Fields are managed by the container; reading happens through the getters below.
#[derive(Debug)]
pub struct Column {
    /// Index of the variable this column materializes.
    pub(crate) variable: usize,
    /// Column name, forwarded to the solver.
    pub(crate) name: String,
    /// Objective coefficient, fixed at creation.
    pub(crate) objective: f64,
    /// Current bounds.
    pub(crate) bounds: EnumMap<BoundDirection, Extended>,
    /// Mirrored entries, `other` is a row arena index.
    pub(crate) entries: Vec<Entry>,
    /// Whether `entries` is sorted by row index.
    pub(crate) sorted: bool,
    /// Position in the container's active column list, if active.
    pub(crate) lp_position: Option<usize>,
    /// Position in the external solver's column array, if flushed.
    pub(crate) solver_position: Option<usize>,
    /// Whether a bound changed since the last flush.
    pub(crate) bounds_changed: bool,
    /// Whether a coefficient changed since the last flush.
    pub(crate) coefficients_changed: bool,
    /// Primal value of the latest solve, tagged with its generation.
    pub(crate) primal: Option<(u64, f64)>,
    /// Reduced cost of the latest solve, tagged with its generation.
    pub(crate) reduced_cost: Option<(u64, f64)>,
}

impl Column {
    pub(crate) fn new(
        variable: usize,
        name: String,
        objective: f64,
        lower: Extended,
        upper: Extended,
    ) -> Self {
        debug_assert!(lower <= upper);

        Self {
            variable,
            name,
            objective,
            bounds: EnumMap::from_fn(|direction| match direction {
                BoundDirection::Lower => lower,
                BoundDirection::Upper => upper,
            }),
            entries: Vec::new(),
            sorted: true,
            lp_position: None,
            solver_position: None,
            bounds_changed: false,
            coefficients_changed: false,
            primal: None,
            reduced_cost: None,
        }
    }

    /// Index of the variable this column materializes.
    #[must_use]
    pub fn variable(&self) -> usize {
        self.variable
    }

    /// Column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Objective coefficient.
    #[must_use]
    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// Current bound in the given direction.
    #[must_use]
    pub fn bound(&self, direction: BoundDirection) -> Extended {
        self.bounds[direction]
    }

    /// The direction of the bound at which this variable prefers to rest.
    ///
    /// A nonnegative objective pushes the variable down to its lower bound, a negative one up.
    #[must_use]
    pub fn best_bound_direction(&self) -> BoundDirection {
        if self.objective >= 0_f64 {
            BoundDirection::Lower
        } else {
            BoundDirection::Upper
        }
    }

    /// The bound value at [`Self::best_bound_direction`].
    #[must_use]
    pub fn best_bound(&self) -> Extended {
        self.bounds[self.best_bound_direction()]
    }

    /// Number of mirrored row entries.
    #[must_use]
    pub fn nr_entries(&self) -> usize {
        self.entries.len()
    }

    /// Position in the active LP, if any.
    #[must_use]
    pub fn lp_position(&self) -> Option<usize> {
        self.lp_position
    }

    /// Sort the mirrored entries by row index.
    ///
    /// Link repair on the row side is the container's job; this is only called through it.
    pub(crate) fn sort_entries(&mut self) {
        if !self.sorted {
            self.entries.sort_by_key(|entry| entry.other);
            self.sorted = true;
        }
    }

    /// Position of the entry for `row`, requiring sortedness.
    pub(crate) fn entry_position(&self, row: usize) -> Option<usize> {
        debug_assert!(self.sorted);
        self.entries.binary_search_by_key(&row, |entry| entry.other).ok()
    }

    pub(crate) fn invalidate_solution(&mut self) {
        self.primal = None;
        self.reduced_cost = None;
    }
}
