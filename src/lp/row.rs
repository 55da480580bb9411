//! # Rows
//!
//! A [`Row`] is one linear inequality in LP form: sparse entries over columns, two sides, an
//! additive constant. Rows are reference counted because a cut and its originating constraint
//! may both hold on to the same row.
//!
//! Rows carry their derived statistics incrementally: Euclidean norms, the maximum absolute
//! coefficient, and activity bounds over the member columns' current variable bounds. The
//! bookkeeping lives in [`Activity`] and [`Norms`] so the constraint layer can reuse the exact
//! same delta formulas over variable bounds.
use enum_map::EnumMap;

use crate::data::elements::{BoundDirection, NonZeroSign};
use crate::data::number::Extended;
use crate::lp::column::Column;
use crate::lp::Entry;

/// The sign of an infinite contribution accumulated for `direction`.
///
/// The minimum activity can only be poisoned towards minus infinity, the maximum only towards
/// plus infinity.
fn infinity_of(direction: BoundDirection) -> NonZeroSign {
    match direction {
        BoundDirection::Lower => NonZeroSign::Negative,
        BoundDirection::Upper => NonZeroSign::Positive,
    }
}

/// Incrementally maintained activity bounds and pseudo activity of a linear form.
///
/// For each direction the finite part of the sum is kept separately from a count of infinite
/// contributors. That way, fixing the one variable with an infinite bound restores a finite
/// aggregate by decrementing the count; no rescan needed.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Activity {
    /// Finite part of the minimum (`Lower`) and maximum (`Upper`) activity.
    bounds: EnumMap<BoundDirection, f64>,
    /// Number of entries contributing an infinity to each direction.
    infinite: EnumMap<BoundDirection, usize>,
    /// Finite part of the activity at the variables' best bounds.
    pseudo: f64,
    /// Number of entries contributing an infinity of each sign to the pseudo activity.
    pseudo_infinite: EnumMap<BoundDirection, usize>,
}

impl Activity {
    pub(crate) fn new() -> Self {
        Self {
            bounds: EnumMap::default(),
            infinite: EnumMap::default(),
            pseudo: 0_f64,
            pseudo_infinite: EnumMap::default(),
        }
    }

    /// Fold `bound`'s contribution `coefficient * bound` into the aggregate for `direction`.
    fn apply(&mut self, direction: BoundDirection, coefficient: f64, bound: Extended, add: bool) {
        match bound {
            Extended::Finite(value) => {
                if add {
                    self.bounds[direction] += coefficient * value;
                } else {
                    self.bounds[direction] -= coefficient * value;
                }
            }
            Extended::Infinite(sign) => {
                debug_assert_eq!(sign ^ NonZeroSign::of(coefficient), infinity_of(direction));
                if add {
                    self.infinite[direction] += 1;
                } else {
                    debug_assert!(self.infinite[direction] > 0);
                    self.infinite[direction] -= 1;
                }
            }
        }
    }

    fn apply_pseudo(&mut self, coefficient: f64, bound: Extended, add: bool) {
        match bound {
            Extended::Finite(value) => {
                if add {
                    self.pseudo += coefficient * value;
                } else {
                    self.pseudo -= coefficient * value;
                }
            }
            Extended::Infinite(sign) => {
                let direction = match sign ^ NonZeroSign::of(coefficient) {
                    NonZeroSign::Negative => BoundDirection::Lower,
                    NonZeroSign::Positive => BoundDirection::Upper,
                };
                if add {
                    self.pseudo_infinite[direction] += 1;
                } else {
                    debug_assert!(self.pseudo_infinite[direction] > 0);
                    self.pseudo_infinite[direction] -= 1;
                }
            }
        }
    }

    /// Account for a new term `coefficient * x` with the given variable bounds.
    ///
    /// `best` is the direction of the variable's best bound w.r.t. the objective.
    pub(crate) fn add_term(
        &mut self,
        coefficient: f64,
        lower: Extended,
        upper: Extended,
        best: BoundDirection,
    ) {
        debug_assert_ne!(coefficient, 0_f64);
        let sign = NonZeroSign::of(coefficient);

        for direction in [BoundDirection::Lower, BoundDirection::Upper] {
            let used = match direction ^ sign {
                BoundDirection::Lower => lower,
                BoundDirection::Upper => upper,
            };
            self.apply(direction, coefficient, used, true);
        }
        let best_bound = match best {
            BoundDirection::Lower => lower,
            BoundDirection::Upper => upper,
        };
        self.apply_pseudo(coefficient, best_bound, true);
    }

    /// Remove a term previously accounted for with the same arguments.
    pub(crate) fn remove_term(
        &mut self,
        coefficient: f64,
        lower: Extended,
        upper: Extended,
        best: BoundDirection,
    ) {
        debug_assert_ne!(coefficient, 0_f64);
        let sign = NonZeroSign::of(coefficient);

        for direction in [BoundDirection::Lower, BoundDirection::Upper] {
            let used = match direction ^ sign {
                BoundDirection::Lower => lower,
                BoundDirection::Upper => upper,
            };
            self.apply(direction, coefficient, used, false);
        }
        let best_bound = match best {
            BoundDirection::Lower => lower,
            BoundDirection::Upper => upper,
        };
        self.apply_pseudo(coefficient, best_bound, false);
    }

    /// Account for a bound change of one member variable.
    ///
    /// Only the aggregate that actually reads the changed bound is touched: the one at
    /// `changed ^ sign(coefficient)`, and the pseudo activity when the changed bound is the
    /// variable's best bound.
    pub(crate) fn update_bound(
        &mut self,
        coefficient: f64,
        changed: BoundDirection,
        old: Extended,
        new: Extended,
        best: BoundDirection,
    ) {
        debug_assert_ne!(coefficient, 0_f64);
        let direction = changed ^ NonZeroSign::of(coefficient);
        self.apply(direction, coefficient, old, false);
        self.apply(direction, coefficient, new, true);
        if changed == best {
            self.apply_pseudo(coefficient, old, false);
            self.apply_pseudo(coefficient, new, true);
        }
    }

    /// The activity bound in `direction`: minimum for `Lower`, maximum for `Upper`.
    pub(crate) fn bound(&self, direction: BoundDirection) -> Extended {
        if self.infinite[direction] > 0 {
            Extended::Infinite(infinity_of(direction))
        } else {
            Extended::Finite(self.bounds[direction])
        }
    }

    /// The pseudo activity; minus infinity takes precedence when both signs are present.
    pub(crate) fn pseudo(&self) -> Extended {
        if self.pseudo_infinite[BoundDirection::Lower] > 0 {
            Extended::MINUS_INFINITY
        } else if self.pseudo_infinite[BoundDirection::Upper] > 0 {
            Extended::PLUS_INFINITY
        } else {
            Extended::Finite(self.pseudo)
        }
    }

    /// The activity bound in `direction` with one term's contribution removed.
    ///
    /// `lower`/`upper` are the excluded variable's current bounds. If that variable is the sole
    /// infinite contributor, the residual is the stored finite sum; if others remain infinite,
    /// the residual stays infinite.
    pub(crate) fn residual(
        &self,
        direction: BoundDirection,
        coefficient: f64,
        lower: Extended,
        upper: Extended,
    ) -> Extended {
        debug_assert_ne!(coefficient, 0_f64);
        let used = match direction ^ NonZeroSign::of(coefficient) {
            BoundDirection::Lower => lower,
            BoundDirection::Upper => upper,
        };

        match self.infinite[direction] {
            0 => match used {
                Extended::Finite(value) => {
                    Extended::Finite(self.bounds[direction] - coefficient * value)
                }
                Extended::Infinite(_) => unreachable!("infinite contributor not counted"),
            },
            1 => match used {
                Extended::Finite(_) => Extended::Infinite(infinity_of(direction)),
                Extended::Infinite(_) => Extended::Finite(self.bounds[direction]),
            },
            _ => Extended::Infinite(infinity_of(direction)),
        }
    }
}

/// Incrementally maintained norm statistics of a row's coefficient vector.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Norms {
    /// Squared Euclidean norm.
    squared: f64,
    /// Largest absolute coefficient and how many entries attain it; multiplicity zero means the
    /// value is stale and must be recomputed before use.
    max_absolute: (f64, usize),
    /// Smallest and largest column index present, `None` when unknown.
    index_range: Option<(usize, usize)>,
}

impl Norms {
    pub(crate) fn new() -> Self {
        Self {
            squared: 0_f64,
            max_absolute: (0_f64, 1),
            index_range: Some((usize::MAX, 0)),
        }
    }

    pub(crate) fn add(&mut self, value: f64, index: usize) {
        let absolute = value.abs();
        self.squared += absolute * absolute;
        let (maximum, multiplicity) = self.max_absolute;
        if multiplicity > 0 {
            if absolute > maximum {
                self.max_absolute = (absolute, 1);
            } else if absolute >= maximum {
                self.max_absolute = (maximum, multiplicity + 1);
            }
        }
        if let Some((low, high)) = &mut self.index_range {
            *low = (*low).min(index);
            *high = (*high).max(index);
        }
    }

    pub(crate) fn remove(&mut self, value: f64, index: usize) {
        let absolute = value.abs();
        // Clamped against accumulated floating error.
        self.squared = (self.squared - absolute * absolute).max(0_f64);
        let (maximum, multiplicity) = self.max_absolute;
        if multiplicity > 0 && absolute >= maximum {
            self.max_absolute = (maximum, multiplicity - 1);
        }
        if let Some((low, high)) = self.index_range {
            if index == low || index == high {
                self.index_range = None;
            }
        }
    }

    pub(crate) fn change(&mut self, old: f64, new: f64, index: usize) {
        self.remove(old, index);
        self.add(new, index);
    }

    pub(crate) fn squared(&self) -> f64 {
        self.squared
    }

    fn recompute(&mut self, entries: &[Entry]) {
        self.squared = entries.iter().map(|entry| entry.value * entry.value).sum();
        let maximum = entries
            .iter()
            .map(|entry| entry.value.abs())
            .fold(0_f64, f64::max);
        let multiplicity = entries
            .iter()
            .filter(|entry| entry.value.abs() >= maximum)
            .count();
        self.max_absolute = (maximum, multiplicity);
        self.index_range = Some(
            entries.iter().fold((usize::MAX, 0), |(low, high), entry| {
                (low.min(entry.other), high.max(entry.other))
            }),
        );
    }
}

/// One linear inequality in LP form, `lhs <= a^T x + constant <= rhs`.
#[derive(Debug)]
pub struct Row {
    /// Row name, forwarded to the solver.
    pub(crate) name: String,
    /// Sides, `Lower` is the left hand side.
    pub(crate) sides: EnumMap<BoundDirection, Extended>,
    /// Additive constant; the solver sees `lhs + constant .. rhs + constant` around the raw sum.
    pub(crate) constant: f64,
    /// Sparse entries, `other` is a column arena index.
    pub(crate) entries: Vec<Entry>,
    /// Whether `entries` is sorted by column index.
    pub(crate) sorted: bool,
    /// Whether the column side mirrors this row's entries.
    pub(crate) linked: bool,
    /// Reference count.
    pub(crate) uses: u32,
    /// Nonzero forbids structural modification.
    pub(crate) nr_locks: u32,
    /// Whether the row is only valid in the current subtree.
    pub(crate) local: bool,
    /// Whether the row may gain columns later (column generation).
    pub(crate) modifiable: bool,
    /// Position in the container's active row list, if active.
    pub(crate) lp_position: Option<usize>,
    /// Position in the external solver's row array, if flushed.
    pub(crate) solver_position: Option<usize>,
    /// Whether a side or the constant changed since the last flush.
    pub(crate) sides_changed: bool,
    /// Whether a coefficient changed since the last flush.
    pub(crate) coefficients_changed: bool,
    pub(crate) norms: Norms,
    /// Activity bounds over member columns, `None` when invalidated.
    pub(crate) activity: Option<Activity>,
    /// Activity of the latest solve (constant included), tagged with its generation.
    pub(crate) solution_activity: Option<(u64, f64)>,
    /// Dual value of the latest solve, tagged with its generation.
    pub(crate) dual: Option<(u64, f64)>,
}

impl Row {
    pub(crate) fn new(
        name: String,
        lhs: Extended,
        rhs: Extended,
        constant: f64,
        local: bool,
        modifiable: bool,
    ) -> Self {
        debug_assert!(lhs <= rhs);

        Self {
            name,
            sides: EnumMap::from_fn(|direction| match direction {
                BoundDirection::Lower => lhs,
                BoundDirection::Upper => rhs,
            }),
            constant,
            entries: Vec::new(),
            sorted: true,
            linked: false,
            uses: 1,
            nr_locks: 0,
            local,
            modifiable,
            lp_position: None,
            solver_position: None,
            sides_changed: false,
            coefficients_changed: false,
            norms: Norms::new(),
            activity: None,
            solution_activity: None,
            dual: None,
        }
    }

    /// Row name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The side in the given direction, `Lower` being the left hand side.
    #[must_use]
    pub fn side(&self, direction: BoundDirection) -> Extended {
        self.sides[direction]
    }

    /// The additive constant.
    #[must_use]
    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Number of entries.
    #[must_use]
    pub fn nr_entries(&self) -> usize {
        self.entries.len()
    }

    /// The entries as `(column arena index, coefficient)` pairs.
    pub fn entries(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.entries.iter().map(|entry| (entry.other, entry.value))
    }

    /// Position in the active LP, if any.
    #[must_use]
    pub fn lp_position(&self) -> Option<usize> {
        self.lp_position
    }

    /// Whether structural modification is currently forbidden.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.nr_locks > 0
    }

    /// Whether the row is only valid in the current subtree.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.local
    }

    /// Squared Euclidean norm of the coefficient vector.
    #[must_use]
    pub fn squared_norm(&self) -> f64 {
        self.norms.squared()
    }

    /// Largest absolute coefficient, recomputed if deletions made the tracked value stale.
    pub fn max_absolute(&mut self) -> f64 {
        if self.entries.is_empty() {
            return 0_f64;
        }
        if self.norms.max_absolute.1 == 0 {
            self.norms.recompute(&self.entries);
        }
        self.norms.max_absolute.0
    }

    /// Smallest and largest column index present, recomputed when unknown.
    pub fn index_range(&mut self) -> Option<(usize, usize)> {
        if self.entries.is_empty() {
            return None;
        }
        if self.norms.index_range.is_none() {
            self.norms.recompute(&self.entries);
        }
        self.norms.index_range
    }

    /// Recompute the activity aggregates from scratch over the given column arena.
    pub(crate) fn recompute_activity(&self, columns: &[Column]) -> Activity {
        let mut activity = Activity::new();
        for entry in &self.entries {
            let column = &columns[entry.other];
            activity.add_term(
                entry.value,
                column.bounds[BoundDirection::Lower],
                column.bounds[BoundDirection::Upper],
                column.best_bound_direction(),
            );
        }
        activity
    }

    /// Sort entries by column index without link repair; only the container calls this.
    pub(crate) fn sort_entries(&mut self) {
        if !self.sorted {
            self.entries.sort_by_key(|entry| entry.other);
            self.sorted = true;
        }
    }

    /// Position of the entry for `column`, requiring sortedness.
    pub(crate) fn entry_position(&self, column: usize) -> Option<usize> {
        debug_assert!(self.sorted);
        self.entries.binary_search_by_key(&column, |entry| entry.other).ok()
    }

    pub(crate) fn invalidate_solution(&mut self) {
        self.solution_activity = None;
        self.dual = None;
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use crate::data::elements::BoundDirection;
    use crate::data::number::Extended;
    use crate::lp::row::{Activity, Norms};
    use crate::lp::Entry;

    #[test]
    fn activity_with_finite_bounds() {
        let mut activity = Activity::new();
        // 2 x + (-3) y with x in [0, 1], y in [1, 4], both minimized (best bound lower).
        activity.add_term(2_f64, Extended::Finite(0_f64), Extended::Finite(1_f64), BoundDirection::Lower);
        activity.add_term(-3_f64, Extended::Finite(1_f64), Extended::Finite(4_f64), BoundDirection::Lower);

        assert_eq!(activity.bound(BoundDirection::Lower), Extended::Finite(-12_f64));
        assert_eq!(activity.bound(BoundDirection::Upper), Extended::Finite(-1_f64));
        assert_eq!(activity.pseudo(), Extended::Finite(-3_f64));
    }

    #[test]
    fn infinite_contributor_is_counted_not_summed() {
        let mut activity = Activity::new();
        activity.add_term(1_f64, Extended::MINUS_INFINITY, Extended::Finite(5_f64), BoundDirection::Lower);
        activity.add_term(1_f64, Extended::Finite(0_f64), Extended::Finite(2_f64), BoundDirection::Lower);

        assert_eq!(activity.bound(BoundDirection::Lower), Extended::MINUS_INFINITY);
        assert_eq!(activity.bound(BoundDirection::Upper), Extended::Finite(7_f64));
        assert_eq!(activity.pseudo(), Extended::MINUS_INFINITY);

        // Fixing the unbounded variable restores a finite minimum without a rescan.
        activity.update_bound(
            1_f64,
            BoundDirection::Lower,
            Extended::MINUS_INFINITY,
            Extended::Finite(1_f64),
            BoundDirection::Lower,
        );
        assert_eq!(activity.bound(BoundDirection::Lower), Extended::Finite(1_f64));
        assert_eq!(activity.pseudo(), Extended::Finite(1_f64));
    }

    #[test]
    fn residual_excludes_one_term() {
        let mut activity = Activity::new();
        activity.add_term(2_f64, Extended::Finite(1_f64), Extended::Finite(3_f64), BoundDirection::Lower);
        activity.add_term(-1_f64, Extended::Finite(0_f64), Extended::Finite(4_f64), BoundDirection::Lower);

        // Minimum is 2*1 - 1*4 = -2; excluding the second term leaves 2.
        assert_eq!(
            activity.residual(BoundDirection::Lower, -1_f64, Extended::Finite(0_f64), Extended::Finite(4_f64)),
            Extended::Finite(2_f64),
        );
        // Maximum is 2*3 - 1*0 = 6; excluding the first term leaves 0.
        assert_eq!(
            activity.residual(BoundDirection::Upper, 2_f64, Extended::Finite(1_f64), Extended::Finite(3_f64)),
            Extended::Finite(0_f64),
        );
    }

    #[test]
    fn residual_with_single_infinite_contributor() {
        let mut activity = Activity::new();
        activity.add_term(1_f64, Extended::MINUS_INFINITY, Extended::Finite(5_f64), BoundDirection::Lower);
        activity.add_term(1_f64, Extended::Finite(2_f64), Extended::Finite(3_f64), BoundDirection::Lower);

        // Excluding the unbounded variable leaves the finite part.
        assert_eq!(
            activity.residual(BoundDirection::Lower, 1_f64, Extended::MINUS_INFINITY, Extended::Finite(5_f64)),
            Extended::Finite(2_f64),
        );
        // Excluding the bounded variable keeps the minimum infinite.
        assert_eq!(
            activity.residual(BoundDirection::Lower, 1_f64, Extended::Finite(2_f64), Extended::Finite(3_f64)),
            Extended::MINUS_INFINITY,
        );
    }

    #[test]
    fn norms_track_max_multiplicity() {
        let mut norms = Norms::new();
        norms.add(3_f64, 0);
        norms.add(-3_f64, 1);
        norms.add(1_f64, 2);
        assert_relative_eq!(norms.squared(), 19_f64);
        assert_eq!(norms.max_absolute, (3_f64, 2));

        // Deleting one of two entries tied for the max keeps the value reliable.
        norms.remove(3_f64, 0);
        assert_eq!(norms.max_absolute, (3_f64, 1));

        // Deleting the last one makes it stale.
        norms.remove(-3_f64, 1);
        assert_eq!(norms.max_absolute.1, 0);

        let entries = vec![Entry { other: 2, value: 1_f64, link: None }];
        norms.recompute(&entries);
        assert_eq!(norms.max_absolute, (1_f64, 1));
        assert_relative_eq!(norms.squared(), 1_f64);
    }
}
