//! # LP relaxation container
//!
//! The [`LpRelaxation`] owns the columns and rows of the current relaxation and mirrors them
//! lazily into an external solver through [`interface::SolverInterface`]. Mutations are cheap
//! bookkeeping; only [`LpRelaxation::flush`] talks to the solver, replaying all accumulated
//! changes in a fixed order of bulk calls.
//!
//! Columns and rows cross-link their sparse entries: a row owns its coefficients, and once the
//! row is linked each member column carries a mirrored entry, so a bound change on the column
//! reaches the activity aggregates of every linked row in time proportional to the column's
//! nonzero count.
use std::error::Error;
use std::fmt;

use crate::data::elements::{BoundDirection, NonZeroSign};
use crate::data::number::{Extended, Tolerance};
use crate::lp::column::Column;
use crate::lp::interface::{ColumnBatch, RawStatus, RowBatch, SolveStatus, SolverError, SolverInterface};
use crate::lp::interface::BasisState;
use crate::lp::row::{Activity, Row};

pub mod column;
pub mod interface;
pub mod row;

/// One sparse entry of a row or column.
///
/// `other` is the arena index of the counterpart structure; `link` is the position of the
/// mirrored entry in the counterpart's list, `None` while the link is deferred.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Entry {
    pub other: usize,
    pub value: f64,
    pub link: Option<usize>,
}

/// A protocol violation by the caller, as opposed to a numerical or solver condition.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ContractError {
    /// Structural modification of a row whose lock count is nonzero.
    LockedRow {
        /// Arena index of the locked row.
        row: usize,
    },
    /// Adding a coefficient to a position that already holds one.
    DuplicateCoefficient {
        /// Arena index of the row.
        row: usize,
        /// Arena index of the column.
        column: usize,
    },
}

impl fmt::Display for ContractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LockedRow { row } => {
                write!(f, "row {row} is locked against structural modification")
            }
            Self::DuplicateCoefficient { row, column } => {
                write!(f, "row {row} already holds a coefficient for column {column}")
            }
        }
    }
}

impl Error for ContractError {}

/// A snapshot of the active LP sizes, for shrinking back when the search backtracks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Mark {
    nr_columns: usize,
    nr_rows: usize,
}

/// The LP relaxation of the current subproblem.
///
/// Generic over the external solver so tests can substitute
/// [`interface::recording::RecordingSolver`].
#[derive(Debug)]
pub struct LpRelaxation<S> {
    solver: S,
    tolerance: Tolerance,

    /// Column arena; indices are stable until a rollback truncates the suffix.
    columns: Vec<Column>,
    /// Row arena with a free list; `None` slots await reuse.
    rows: Vec<Option<Row>>,
    free_rows: Vec<usize>,
    /// Column arena index per variable index, for materialization lookups.
    variable_columns: Vec<Option<usize>>,

    /// Active columns and rows in LP order.
    lp_columns: Vec<usize>,
    lp_rows: Vec<usize>,
    /// What the external solver currently holds, in solver order.
    solver_columns: Vec<usize>,
    solver_rows: Vec<usize>,
    /// Positions before these are known identical and clean on both sides.
    first_changed_column: usize,
    first_changed_row: usize,
    /// Arena indices with pending bound/side changes on flushed entities.
    changed_bound_columns: Vec<usize>,
    changed_side_rows: Vec<usize>,

    flushed: bool,
    status: SolveStatus,
    /// Incremented per solve; solution caches are tagged with it.
    generation: u64,
    objective_value: Option<f64>,
    primal_ray: Option<Vec<f64>>,
    farkas: Option<Vec<f64>>,
}

impl<S: SolverInterface> LpRelaxation<S> {
    /// An empty relaxation; trivially flushed and unsolved.
    #[must_use]
    pub fn new(solver: S, tolerance: Tolerance) -> Self {
        Self {
            solver,
            tolerance,
            columns: Vec::new(),
            rows: Vec::new(),
            free_rows: Vec::new(),
            variable_columns: Vec::new(),
            lp_columns: Vec::new(),
            lp_rows: Vec::new(),
            solver_columns: Vec::new(),
            solver_rows: Vec::new(),
            first_changed_column: 0,
            first_changed_row: 0,
            changed_bound_columns: Vec::new(),
            changed_side_rows: Vec::new(),
            flushed: true,
            status: SolveStatus::NotSolved,
            generation: 0,
            objective_value: None,
            primal_ray: None,
            farkas: None,
        }
    }

    /// The external solver, for inspection.
    #[must_use]
    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// The numerical tolerances in use.
    #[must_use]
    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    /// Number of active columns.
    #[must_use]
    pub fn nr_columns(&self) -> usize {
        self.lp_columns.len()
    }

    /// Number of active rows.
    #[must_use]
    pub fn nr_rows(&self) -> usize {
        self.lp_rows.len()
    }

    /// Active columns in LP order, as column arena indices.
    #[must_use]
    pub fn lp_columns(&self) -> &[usize] {
        &self.lp_columns
    }

    /// Active rows in LP order, as row arena indices.
    #[must_use]
    pub fn lp_rows(&self) -> &[usize] {
        &self.lp_rows
    }

    /// The column at the given arena index.
    #[must_use]
    pub fn column(&self, column: usize) -> &Column {
        &self.columns[column]
    }

    /// The row at the given arena index; panics if it was freed.
    #[must_use]
    pub fn row(&self, row: usize) -> &Row {
        match &self.rows[row] {
            Some(row) => row,
            None => panic!("row {row} was freed"),
        }
    }

    fn row_mut(&mut self, row: usize) -> &mut Row {
        match &mut self.rows[row] {
            Some(row) => row,
            None => panic!("row {row} was freed"),
        }
    }

    /// The column materializing `variable`, if any.
    #[must_use]
    pub fn column_of_variable(&self, variable: usize) -> Option<usize> {
        self.variable_columns.get(variable).copied().flatten()
    }

    /// Whether the external solver is exactly in sync with the container.
    #[must_use]
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// Classification of the latest solve.
    #[must_use]
    pub fn status(&self) -> SolveStatus {
        self.status
    }

    fn invalidate_solve(&mut self) {
        self.flushed = false;
        self.status = SolveStatus::NotSolved;
    }

    // Columns

    /// Bring `variable` into column representation and append it to the active LP.
    ///
    /// The objective coefficient is fixed for the column's lifetime.
    pub fn add_column(
        &mut self,
        variable: usize,
        name: String,
        objective: f64,
        lower: Extended,
        upper: Extended,
    ) -> usize {
        let index = self.columns.len();
        let mut column = Column::new(variable, name, objective, lower, upper);
        column.lp_position = Some(self.lp_columns.len());
        self.columns.push(column);
        self.lp_columns.push(index);
        if self.variable_columns.len() <= variable {
            self.variable_columns.resize(variable + 1, None);
        }
        debug_assert!(self.variable_columns[variable].is_none());
        self.variable_columns[variable] = Some(index);
        self.invalidate_solve();
        index
    }

    /// Change one bound of a column, returning the previous value.
    ///
    /// Incrementally updates the activity aggregates of every linked row holding the column.
    pub fn change_column_bound(
        &mut self,
        column: usize,
        direction: BoundDirection,
        new: Extended,
    ) -> Extended {
        let holder = &mut self.columns[column];
        let old = std::mem::replace(&mut holder.bounds[direction], new);
        debug_assert!(holder.bounds[BoundDirection::Lower] <= holder.bounds[BoundDirection::Upper]);
        let best = holder.best_bound_direction();
        if holder.solver_position.is_some() && !holder.bounds_changed {
            holder.bounds_changed = true;
            self.changed_bound_columns.push(column);
        }

        let (columns, rows) = (&self.columns, &mut self.rows);
        let holder = &columns[column];
        for entry in &holder.entries {
            if let Some(Some(row)) = rows.get_mut(entry.other).map(Option::as_mut) {
                if let Some(activity) = &mut row.activity {
                    activity.update_bound(entry.value, direction, old, new, best);
                }
            }
        }
        self.invalidate_solve();
        old
    }

    // Rows

    /// Create a standalone row with no entries and a single reference.
    ///
    /// The row is not part of the active LP until [`Self::add_row_to_lp`].
    pub fn create_row(
        &mut self,
        name: String,
        lhs: Extended,
        rhs: Extended,
        constant: f64,
        local: bool,
        modifiable: bool,
    ) -> usize {
        let row = Row::new(name, lhs, rhs, constant, local, modifiable);
        match self.free_rows.pop() {
            Some(index) => {
                debug_assert!(self.rows[index].is_none());
                self.rows[index] = Some(row);
                index
            }
            None => {
                self.rows.push(Some(row));
                self.rows.len() - 1
            }
        }
    }

    /// Take an additional reference on a row.
    pub fn capture_row(&mut self, row: usize) {
        self.row_mut(row).uses += 1;
    }

    /// Drop a reference on a row; the row is freed when the last reference goes.
    ///
    /// Freeing a row that is still in the active LP is a caller error.
    pub fn release_row(&mut self, row: usize) {
        let uses = {
            let holder = self.row_mut(row);
            debug_assert!(holder.uses > 0);
            holder.uses -= 1;
            holder.uses
        };
        if uses == 0 {
            debug_assert!(self.row(row).lp_position.is_none());
            self.unlink_row(row);
            self.rows[row] = None;
            self.free_rows.push(row);
        }
    }

    /// Forbid structural modification of a row.
    pub fn lock_row(&mut self, row: usize) {
        self.row_mut(row).nr_locks += 1;
    }

    /// Re-allow structural modification of a row.
    pub fn unlock_row(&mut self, row: usize) {
        let holder = self.row_mut(row);
        debug_assert!(holder.nr_locks > 0);
        holder.nr_locks -= 1;
    }

    /// Append a row to the active LP, linking its entries into the member columns.
    ///
    /// The LP takes its own reference on the row.
    pub fn add_row_to_lp(&mut self, row: usize) {
        debug_assert!(self.row(row).lp_position.is_none());
        self.capture_row(row);
        let position = self.lp_rows.len();
        self.row_mut(row).lp_position = Some(position);
        self.lp_rows.push(row);
        self.link_row(row);
        self.invalidate_solve();
    }

    /// Change one side of a row.
    pub fn change_row_side(&mut self, row: usize, direction: BoundDirection, new: Extended) {
        let holder = self.row_mut(row);
        holder.sides[direction] = new;
        debug_assert!(holder.sides[BoundDirection::Lower] <= holder.sides[BoundDirection::Upper]);
        self.note_side_change(row);
    }

    /// Change the additive constant of a row.
    ///
    /// The solver sees the constant folded into the sides, so this queues a side change.
    pub fn change_row_constant(&mut self, row: usize, constant: f64) {
        self.row_mut(row).constant = constant;
        self.note_side_change(row);
    }

    fn note_side_change(&mut self, row: usize) {
        let holder = match &mut self.rows[row] {
            Some(holder) => holder,
            None => panic!("row {row} was freed"),
        };
        holder.invalidate_solution();
        if holder.solver_position.is_some() && !holder.sides_changed {
            holder.sides_changed = true;
            self.changed_side_rows.push(row);
        }
        self.invalidate_solve();
    }

    // Coefficients

    /// Add a coefficient to a row, `value` nonzero and the position not yet occupied.
    pub fn add_row_coefficient(
        &mut self,
        row: usize,
        column: usize,
        value: f64,
    ) -> Result<(), ContractError> {
        debug_assert_ne!(value, 0_f64);
        if self.row(row).is_locked() {
            return Err(ContractError::LockedRow { row });
        }
        self.sort_row(row);
        if self.row(row).entry_position(column).is_some() {
            return Err(ContractError::DuplicateCoefficient { row, column });
        }

        let linked = self.row(row).linked;
        {
            let (columns, rows) = (&mut self.columns, &mut self.rows);
            let holder = match &mut rows[row] {
                Some(holder) => holder,
                None => panic!("row {row} was freed"),
            };
            let position = holder.entries.len();
            let link = if linked {
                let member = &mut columns[column];
                member.entries.push(Entry { other: row, value, link: Some(position) });
                member.sorted = member.entries.len() <= 1;
                Some(member.entries.len() - 1)
            } else {
                None
            };
            holder.entries.push(Entry { other: column, value, link });
            holder.sorted = holder.entries.len() <= 1
                || holder.entries[position - 1].other < column;
            holder.norms.add(value, column);

            let member = &columns[column];
            if let Some(activity) = &mut holder.activity {
                activity.add_term(
                    value,
                    member.bounds[BoundDirection::Lower],
                    member.bounds[BoundDirection::Upper],
                    member.best_bound_direction(),
                );
            }
        }
        self.note_coefficient_change(row, column);
        Ok(())
    }

    /// Delete the coefficient of `column` from a row.
    ///
    /// Swap-deletes in O(1) and repairs the displaced entry's reverse link.
    pub fn delete_row_coefficient(&mut self, row: usize, column: usize) -> Result<(), ContractError> {
        if self.row(row).is_locked() {
            return Err(ContractError::LockedRow { row });
        }
        self.sort_row(row);
        let position = match self.row(row).entry_position(column) {
            Some(position) => position,
            None => return Ok(()),
        };
        self.delete_row_entry(row, position);
        self.note_coefficient_change(row, column);
        Ok(())
    }

    /// Change the coefficient of `column` in a row; a numerically zero value deletes it.
    pub fn change_row_coefficient(
        &mut self,
        row: usize,
        column: usize,
        value: f64,
    ) -> Result<(), ContractError> {
        if self.tolerance.is_zero(value) {
            return self.delete_row_coefficient(row, column);
        }
        if self.row(row).is_locked() {
            return Err(ContractError::LockedRow { row });
        }
        self.sort_row(row);
        let position = match self.row(row).entry_position(column) {
            Some(position) => position,
            None => return self.add_row_coefficient(row, column, value),
        };

        let (columns, rows) = (&mut self.columns, &mut self.rows);
        let holder = match &mut rows[row] {
            Some(holder) => holder,
            None => panic!("row {row} was freed"),
        };
        let old = holder.entries[position].value;
        holder.entries[position].value = value;
        if let Some(link) = holder.entries[position].link {
            columns[column].entries[link].value = value;
        }
        holder.norms.change(old, value, column);
        let member = &columns[column];
        if let Some(activity) = &mut holder.activity {
            activity.remove_term(
                old,
                member.bounds[BoundDirection::Lower],
                member.bounds[BoundDirection::Upper],
                member.best_bound_direction(),
            );
            activity.add_term(
                value,
                member.bounds[BoundDirection::Lower],
                member.bounds[BoundDirection::Upper],
                member.best_bound_direction(),
            );
        }
        self.note_coefficient_change(row, column);
        Ok(())
    }

    /// Add `delta` onto the coefficient of `column`, creating or deleting the entry as needed.
    pub fn increase_row_coefficient(
        &mut self,
        row: usize,
        column: usize,
        delta: f64,
    ) -> Result<(), ContractError> {
        self.sort_row(row);
        match self.row(row).entry_position(column) {
            Some(position) => {
                let value = self.row(row).entries[position].value + delta;
                self.change_row_coefficient(row, column, value)
            }
            None if self.tolerance.is_zero(delta) => Ok(()),
            None => self.add_row_coefficient(row, column, delta),
        }
    }

    /// Remove entry `position` of `row`, repairing links; internal contract checks only.
    fn delete_row_entry(&mut self, row: usize, position: usize) {
        let (columns, rows) = (&mut self.columns, &mut self.rows);
        let holder = match &mut rows[row] {
            Some(holder) => holder,
            None => panic!("row {row} was freed"),
        };
        let removed = holder.entries.swap_remove(position);
        holder.sorted = false;
        holder.norms.remove(removed.value, removed.other);
        let member = &columns[removed.other];
        if let Some(activity) = &mut holder.activity {
            activity.remove_term(
                removed.value,
                member.bounds[BoundDirection::Lower],
                member.bounds[BoundDirection::Upper],
                member.best_bound_direction(),
            );
        }
        // The entry swapped into `position` now lives at a new index; its mirror must follow.
        if position < holder.entries.len() {
            if let Some(link) = holder.entries[position].link {
                columns[holder.entries[position].other].entries[link].link = Some(position);
            }
        }
        // Remove the mirror of the removed entry, itself by swap-delete with link repair.
        if let Some(link) = removed.link {
            let member = &mut columns[removed.other];
            member.entries.swap_remove(link);
            if link < member.entries.len() {
                member.sorted = false;
                let displaced = member.entries[link].clone();
                match displaced.link {
                    Some(row_position) => match &mut rows[displaced.other] {
                        Some(other_row) => other_row.entries[row_position].link = Some(link),
                        None => panic!("row {} was freed", displaced.other),
                    },
                    None => panic!("mirror entry without reverse link"),
                }
            }
        }
    }

    fn note_coefficient_change(&mut self, row: usize, column: usize) {
        {
            let holder = match &mut self.rows[row] {
                Some(holder) => holder,
                None => panic!("row {row} was freed"),
            };
            holder.coefficients_changed = true;
            holder.invalidate_solution();
            let flushed_position = holder.lp_position.filter(|_| holder.solver_position.is_some());
            if let Some(position) = flushed_position {
                self.first_changed_row = self.first_changed_row.min(position);
            }
        }
        {
            let member = &mut self.columns[column];
            member.coefficients_changed = true;
            member.invalidate_solution();
            let flushed_position = member.lp_position.filter(|_| member.solver_position.is_some());
            if let Some(position) = flushed_position {
                self.first_changed_column = self.first_changed_column.min(position);
            }
        }
        self.invalidate_solve();
    }

    // Linking

    /// Mirror every deferred entry of `row` into its member columns.
    fn link_row(&mut self, row: usize) {
        let (columns, rows) = (&mut self.columns, &mut self.rows);
        let holder = match &mut rows[row] {
            Some(holder) => holder,
            None => panic!("row {row} was freed"),
        };
        if holder.linked {
            return;
        }
        for (position, entry) in holder.entries.iter_mut().enumerate() {
            debug_assert!(entry.link.is_none());
            let member = &mut columns[entry.other];
            member.entries.push(Entry { other: row, value: entry.value, link: Some(position) });
            member.sorted = member.entries.len() <= 1;
            entry.link = Some(member.entries.len() - 1);
        }
        holder.linked = true;
    }

    /// Remove every mirrored entry of `row` from its member columns, keeping the row's own list.
    fn unlink_row(&mut self, row: usize) {
        if !self.row(row).linked {
            return;
        }
        for position in 0..self.row(row).entries.len() {
            let (column, link) = {
                let entry = &mut self.row_mut(row).entries[position];
                let link = match entry.link.take() {
                    Some(link) => link,
                    None => panic!("linked row with deferred entry"),
                };
                (entry.other, link)
            };
            let displaced = {
                let member = &mut self.columns[column];
                member.entries.swap_remove(link);
                if link < member.entries.len() {
                    member.sorted = false;
                    Some(member.entries[link].clone())
                } else {
                    None
                }
            };
            // The column entry swapped into the freed slot belongs to some other linked row
            // (possibly this one); point its owning entry at the new slot.
            if let Some(displaced) = displaced {
                match displaced.link {
                    Some(row_position) => {
                        self.row_mut(displaced.other).entries[row_position].link = Some(link);
                    }
                    None => panic!("mirror entry without reverse link"),
                }
            }
        }
        self.row_mut(row).linked = false;
    }

    /// Sort a row's entries by column index, repairing mirrored link positions.
    fn sort_row(&mut self, row: usize) {
        let (columns, rows) = (&mut self.columns, &mut self.rows);
        let holder = match &mut rows[row] {
            Some(holder) => holder,
            None => panic!("row {row} was freed"),
        };
        if holder.sorted {
            return;
        }
        holder.sort_entries();
        for (position, entry) in holder.entries.iter().enumerate() {
            if let Some(link) = entry.link {
                columns[entry.other].entries[link].link = Some(position);
            }
        }
    }

    // Activities

    fn with_row_activity<T>(&mut self, row: usize, read: impl FnOnce(&Activity) -> T) -> T {
        let (columns, rows) = (&self.columns, &mut self.rows);
        let holder = match &mut rows[row] {
            Some(holder) => holder,
            None => panic!("row {row} was freed"),
        };
        if holder.linked {
            if holder.activity.is_none() {
                holder.activity = Some(holder.recompute_activity(columns));
            }
            match &holder.activity {
                Some(activity) => read(activity),
                None => unreachable!(),
            }
        } else {
            // Unlinked rows see no bound change notifications; compute fresh every time.
            read(&holder.recompute_activity(columns))
        }
    }

    /// The row's minimum (`Lower`) or maximum (`Upper`) activity over current column bounds.
    ///
    /// The additive constant is included.
    pub fn row_activity_bound(&mut self, row: usize, direction: BoundDirection) -> Extended {
        let constant = self.row(row).constant;
        self.with_row_activity(row, |activity| activity.bound(direction)) + constant
    }

    /// The row's activity at the member variables' best bounds, constant included.
    pub fn row_pseudo_activity(&mut self, row: usize) -> Extended {
        let constant = self.row(row).constant;
        self.with_row_activity(row, |activity| activity.pseudo()) + constant
    }

    /// Distance of an activity value to the nearer side, negative when the row is violated.
    ///
    /// `activity` must include the additive constant, as the activity getters report it.
    #[must_use]
    pub fn row_feasibility(&self, row: usize, activity: f64) -> f64 {
        let holder = self.row(row);
        let lhs_slack = match holder.side(BoundDirection::Lower) + holder.constant() {
            Extended::Finite(lhs) => activity - lhs,
            _ => f64::INFINITY,
        };
        let rhs_slack = match holder.side(BoundDirection::Upper) + holder.constant() {
            Extended::Finite(rhs) => rhs - activity,
            _ => f64::INFINITY,
        };
        lhs_slack.min(rhs_slack)
    }

    /// Feasibility at the pseudo activity.
    ///
    /// An infinite pseudo activity is infinitely infeasible when the side it runs off towards
    /// is finite, and trivially feasible otherwise.
    pub fn row_pseudo_feasibility(&mut self, row: usize) -> f64 {
        match self.row_pseudo_activity(row) {
            Extended::Finite(activity) => self.row_feasibility(row, activity),
            Extended::Infinite(sign) => {
                let side = match sign {
                    NonZeroSign::Positive => BoundDirection::Upper,
                    NonZeroSign::Negative => BoundDirection::Lower,
                };
                if self.row(row).side(side).is_finite() {
                    f64::NEG_INFINITY
                } else {
                    f64::INFINITY
                }
            }
        }
    }

    /// Drop the row's incrementally maintained activity; it is recomputed on next use.
    pub fn invalidate_row_activity(&mut self, row: usize) {
        self.row_mut(row).activity = None;
    }

    // Flush

    /// Bring the external solver exactly in sync with the container.
    ///
    /// The six steps run in a fixed order: delete surplus columns, delete surplus rows, change
    /// bounds, change sides, add new columns, add new rows. Each step is a no-op when nothing
    /// changed, so flushing twice in a row performs no solver calls the second time.
    pub fn flush(&mut self) -> Result<(), SolverError> {
        if self.flushed {
            return Ok(());
        }
        self.flush_delete_columns()?;
        self.flush_delete_rows()?;
        self.flush_bound_changes()?;
        self.flush_side_changes()?;
        self.flush_add_columns()?;
        self.flush_add_rows()?;
        debug_assert_eq!(self.solver_columns, self.lp_columns);
        debug_assert_eq!(self.solver_rows, self.lp_rows);
        self.flushed = true;
        Ok(())
    }

    fn flush_delete_columns(&mut self) -> Result<(), SolverError> {
        while self.first_changed_column < self.solver_columns.len()
            && self.first_changed_column < self.lp_columns.len()
        {
            let index = self.lp_columns[self.first_changed_column];
            // Arena slots can be reused after a rollback; the solver position check tells a
            // freshly created column apart from the flushed one that had the same index.
            if self.solver_columns[self.first_changed_column] == index
                && self.columns[index].solver_position == Some(self.first_changed_column)
                && !self.columns[index].coefficients_changed
            {
                self.first_changed_column += 1;
            } else {
                break;
            }
        }
        if self.solver_columns.len() > self.first_changed_column {
            self.solver
                .delete_columns_range(self.first_changed_column, self.solver_columns.len() - 1)?;
            for &index in &self.solver_columns[self.first_changed_column..] {
                // Rolled back arena suffixes may have been truncated or reused already.
                if let Some(member) = self.columns.get_mut(index) {
                    member.solver_position = None;
                }
            }
            self.solver_columns.truncate(self.first_changed_column);
        }
        Ok(())
    }

    fn flush_delete_rows(&mut self) -> Result<(), SolverError> {
        while self.first_changed_row < self.solver_rows.len()
            && self.first_changed_row < self.lp_rows.len()
        {
            let index = self.lp_rows[self.first_changed_row];
            let clean = self.solver_rows[self.first_changed_row] == index
                && self.row(index).solver_position == Some(self.first_changed_row)
                && !self.row(index).coefficients_changed;
            if clean {
                self.first_changed_row += 1;
            } else {
                break;
            }
        }
        if self.solver_rows.len() > self.first_changed_row {
            self.solver
                .delete_rows_range(self.first_changed_row, self.solver_rows.len() - 1)?;
            for &index in &self.solver_rows[self.first_changed_row..] {
                if let Some(Some(holder)) = self.rows.get_mut(index).map(Option::as_mut) {
                    holder.solver_position = None;
                }
            }
            self.solver_rows.truncate(self.first_changed_row);
        }
        Ok(())
    }

    fn flush_bound_changes(&mut self) -> Result<(), SolverError> {
        let mut indices = Vec::new();
        let mut lower = Vec::new();
        let mut upper = Vec::new();
        let infinity = self.solver.infinity();
        for index in std::mem::take(&mut self.changed_bound_columns) {
            let Some(member) = self.columns.get_mut(index) else { continue };
            if !member.bounds_changed {
                continue;
            }
            member.bounds_changed = false;
            if let Some(position) = member.solver_position {
                indices.push(position);
                lower.push(member.bounds[BoundDirection::Lower].to_solver(infinity));
                upper.push(member.bounds[BoundDirection::Upper].to_solver(infinity));
            }
        }
        if !indices.is_empty() {
            self.solver.change_bounds(&indices, &lower, &upper)?;
        }
        Ok(())
    }

    fn flush_side_changes(&mut self) -> Result<(), SolverError> {
        let mut indices = Vec::new();
        let mut lhs = Vec::new();
        let mut rhs = Vec::new();
        let infinity = self.solver.infinity();
        for index in std::mem::take(&mut self.changed_side_rows) {
            let Some(Some(holder)) = self.rows.get_mut(index).map(Option::as_mut) else { continue };
            if !holder.sides_changed {
                continue;
            }
            holder.sides_changed = false;
            if let Some(position) = holder.solver_position {
                indices.push(position);
                lhs.push((holder.sides[BoundDirection::Lower] + holder.constant).to_solver(infinity));
                rhs.push((holder.sides[BoundDirection::Upper] + holder.constant).to_solver(infinity));
            }
        }
        if !indices.is_empty() {
            self.solver.change_sides(&indices, &lhs, &rhs)?;
        }
        Ok(())
    }

    fn flush_add_columns(&mut self) -> Result<(), SolverError> {
        let first_new = self.solver_columns.len();
        if first_new == self.lp_columns.len() {
            return Ok(());
        }
        let infinity = self.solver.infinity();
        let mut batch = ColumnBatch::default();
        batch.begin.push(0);
        for position in first_new..self.lp_columns.len() {
            let index = self.lp_columns[position];
            let member = &self.columns[index];
            batch.objective.push(member.objective);
            batch.lower.push(member.bounds[BoundDirection::Lower].to_solver(infinity));
            batch.upper.push(member.bounds[BoundDirection::Upper].to_solver(infinity));
            batch.names.push(member.name.clone());
            for entry in &member.entries {
                // Entries on not-yet-flushed rows are picked up when those rows are added.
                if let Some(Some(holder)) = self.rows.get(entry.other).map(Option::as_ref) {
                    if let Some(row_position) = holder.solver_position {
                        batch.row_indices.push(row_position);
                        batch.values.push(entry.value);
                    }
                }
            }
            batch.begin.push(batch.row_indices.len());
        }
        self.solver.add_columns(batch)?;
        for position in first_new..self.lp_columns.len() {
            let index = self.lp_columns[position];
            let member = &mut self.columns[index];
            member.solver_position = Some(position);
            member.bounds_changed = false;
            member.coefficients_changed = false;
        }
        let new = self.lp_columns[first_new..].to_vec();
        self.solver_columns.extend(new);
        self.first_changed_column = self.solver_columns.len();
        Ok(())
    }

    fn flush_add_rows(&mut self) -> Result<(), SolverError> {
        let first_new = self.solver_rows.len();
        if first_new == self.lp_rows.len() {
            return Ok(());
        }
        let infinity = self.solver.infinity();
        let mut batch = RowBatch::default();
        batch.begin.push(0);
        for position in first_new..self.lp_rows.len() {
            let index = self.lp_rows[position];
            let holder = self.row(index);
            batch.lhs.push((holder.sides[BoundDirection::Lower] + holder.constant).to_solver(infinity));
            batch.rhs.push((holder.sides[BoundDirection::Upper] + holder.constant).to_solver(infinity));
            batch.names.push(holder.name.clone());
            for entry in &holder.entries {
                if let Some(column_position) = self.columns[entry.other].solver_position {
                    batch.column_indices.push(column_position);
                    batch.values.push(entry.value);
                }
            }
            batch.begin.push(batch.column_indices.len());
        }
        self.solver.add_rows(batch)?;
        for position in first_new..self.lp_rows.len() {
            let index = self.lp_rows[position];
            let holder = self.row_mut(index);
            holder.solver_position = Some(position);
            holder.sides_changed = false;
            holder.coefficients_changed = false;
        }
        let new = self.lp_rows[first_new..].to_vec();
        self.solver_rows.extend(new);
        self.first_changed_row = self.solver_rows.len();
        Ok(())
    }

    // Solving

    /// Flush and solve with the primal simplex, classifying the result.
    pub fn solve_primal(&mut self) -> Result<SolveStatus, SolverError> {
        self.solve(true)
    }

    /// Flush and solve with the dual simplex, classifying the result.
    pub fn solve_dual(&mut self) -> Result<SolveStatus, SolverError> {
        self.solve(false)
    }

    fn solve(&mut self, primal: bool) -> Result<SolveStatus, SolverError> {
        self.flush()?;
        let raw = if primal {
            self.solver.solve_primal()?
        } else {
            self.solver.solve_dual()?
        };
        self.generation += 1;
        self.objective_value = None;
        self.primal_ray = None;
        self.farkas = None;
        self.status = match raw {
            RawStatus::Optimal => {
                self.store_solution()?;
                SolveStatus::Optimal
            }
            RawStatus::PrimalInfeasible => {
                self.farkas = Some(self.solver.farkas_multipliers()?);
                SolveStatus::Infeasible
            }
            RawStatus::PrimalUnbounded => {
                self.store_ray()?;
                SolveStatus::Unbounded
            }
            RawStatus::IterationLimit => SolveStatus::IterationLimit,
            RawStatus::TimeLimit => SolveStatus::TimeLimit,
            // The primal simplex cannot conclude anything from hitting the objective limit.
            RawStatus::ObjectiveLimit if primal => SolveStatus::Error,
            RawStatus::ObjectiveLimit => SolveStatus::ObjectiveLimit,
        };
        Ok(self.status)
    }

    fn store_solution(&mut self) -> Result<(), SolverError> {
        let solution = self.solver.solution()?;
        debug_assert_eq!(solution.primal.len(), self.solver_columns.len());
        debug_assert_eq!(solution.dual.len(), self.solver_rows.len());
        self.objective_value = Some(solution.objective_value);
        let generation = self.generation;
        for (position, &index) in self.solver_columns.iter().enumerate() {
            let member = &mut self.columns[index];
            member.primal = Some((generation, solution.primal[position]));
            member.reduced_cost = Some((generation, solution.reduced_cost[position]));
        }
        for (position, &index) in self.solver_rows.iter().enumerate() {
            let holder = match &mut self.rows[index] {
                Some(holder) => holder,
                None => panic!("row {index} was freed"),
            };
            holder.solution_activity = Some((generation, solution.activity[position] + holder.constant));
            holder.dual = Some((generation, solution.dual[position]));
        }
        Ok(())
    }

    fn store_ray(&mut self) -> Result<(), SolverError> {
        let mut ray = self.solver.primal_ray()?;
        debug_assert_eq!(ray.len(), self.solver_columns.len());
        let along_objective = self
            .solver_columns
            .iter()
            .zip(&ray)
            .map(|(&index, &direction)| self.columns[index].objective * direction)
            .sum::<f64>();
        // Scale such that walking the ray once overshoots any finite objective limit.
        if !self.tolerance.is_zero(along_objective) {
            let scale = -2_f64 * self.solver.infinity() / along_objective;
            for direction in &mut ray {
                *direction *= scale;
            }
        }
        self.primal_ray = Some(ray);
        Ok(())
    }

    /// Objective value of the latest solve, if it ended [`SolveStatus::Optimal`].
    #[must_use]
    pub fn objective_value(&self) -> Option<f64> {
        match self.status {
            SolveStatus::Optimal => self.objective_value,
            _ => None,
        }
    }

    fn cached(&self, cache: Option<(u64, f64)>) -> Option<f64> {
        match (self.status, cache) {
            (SolveStatus::Optimal, Some((generation, value))) if generation == self.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    /// Primal value of a column in the latest optimal solve.
    #[must_use]
    pub fn column_primal(&self, column: usize) -> Option<f64> {
        self.cached(self.columns[column].primal)
    }

    /// Reduced cost of a column in the latest optimal solve.
    #[must_use]
    pub fn column_reduced_cost(&self, column: usize) -> Option<f64> {
        self.cached(self.columns[column].reduced_cost)
    }

    /// Dual value of a row in the latest optimal solve.
    #[must_use]
    pub fn row_dual(&self, row: usize) -> Option<f64> {
        self.cached(self.row(row).dual)
    }

    /// Activity of a row in the latest optimal solve, constant included.
    #[must_use]
    pub fn row_solution_activity(&self, row: usize) -> Option<f64> {
        self.cached(self.row(row).solution_activity)
    }

    /// The unbounded direction of the latest solve, if it ended [`SolveStatus::Unbounded`].
    #[must_use]
    pub fn primal_ray(&self) -> Option<&[f64]> {
        match self.status {
            SolveStatus::Unbounded => self.primal_ray.as_deref(),
            _ => None,
        }
    }

    /// Farkas multipliers of the latest solve, if it ended [`SolveStatus::Infeasible`].
    #[must_use]
    pub fn farkas_multipliers(&self) -> Option<&[f64]> {
        match self.status {
            SolveStatus::Infeasible => self.farkas.as_deref(),
            _ => None,
        }
    }

    /// Snapshot the solver's basis for a later warm start.
    #[must_use]
    pub fn basis_state(&self) -> BasisState {
        self.solver.basis_state()
    }

    /// Restore a basis snapshot taken earlier.
    pub fn set_basis_state(&mut self, state: BasisState) -> Result<(), SolverError> {
        self.solver.set_basis_state(state)
    }

    // Backtracking

    /// Snapshot the active LP sizes before descending.
    #[must_use]
    pub fn mark(&self) -> Mark {
        Mark {
            nr_columns: self.lp_columns.len(),
            nr_rows: self.lp_rows.len(),
        }
    }

    /// Shrink back to a snapshot, stripping columns and rows added since.
    ///
    /// Rows added since the mark are unlinked and released; columns added since must not be
    /// referenced by any surviving row.
    pub fn rollback(&mut self, mark: Mark) {
        debug_assert!(mark.nr_columns <= self.lp_columns.len());
        debug_assert!(mark.nr_rows <= self.lp_rows.len());

        for position in (mark.nr_rows..self.lp_rows.len()).rev() {
            let index = self.lp_rows[position];
            self.unlink_row(index);
            self.row_mut(index).lp_position = None;
            self.release_row(index);
        }
        self.lp_rows.truncate(mark.nr_rows);

        for position in mark.nr_columns..self.lp_columns.len() {
            let index = self.lp_columns[position];
            debug_assert!(
                self.columns[index].entries.is_empty(),
                "column stripped while still referenced by a surviving row",
            );
            self.variable_columns[self.columns[index].variable] = None;
        }
        self.lp_columns.truncate(mark.nr_columns);
        self.columns.truncate(mark.nr_columns);

        self.first_changed_column = self.first_changed_column.min(mark.nr_columns);
        self.first_changed_row = self.first_changed_row.min(mark.nr_rows);
        self.invalidate_solve();
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use crate::data::elements::BoundDirection;
    use crate::data::number::{Extended, Tolerance};
    use crate::lp::LpRelaxation;
    use crate::lp::interface::recording::{Call, RecordingSolver};
    use crate::lp::interface::{RawStatus, SolveStatus, SolverInterface, SolverSolution};

    fn empty() -> LpRelaxation<RecordingSolver> {
        LpRelaxation::new(RecordingSolver::new(), Tolerance::default())
    }

    /// Every linked entry must agree with its mirror on value and position, both ways.
    fn links_consistent(lp: &LpRelaxation<RecordingSolver>) -> bool {
        let rows_ok = lp.rows.iter().enumerate().all(|(row_index, slot)| {
            slot.as_ref().is_none_or(|row| {
                row.entries.iter().enumerate().all(|(position, entry)| {
                    entry.link.is_none_or(|link| {
                        let mirror = &lp.columns[entry.other].entries[link];
                        mirror.other == row_index
                            && mirror.value == entry.value
                            && mirror.link == Some(position)
                    })
                })
            })
        });
        let columns_ok = lp.columns.iter().enumerate().all(|(column_index, column)| {
            column.entries.iter().enumerate().all(|(position, entry)| {
                entry.link.is_some_and(|link| {
                    lp.rows[entry.other].as_ref().is_some_and(|row| {
                        let owner = &row.entries[link];
                        owner.other == column_index
                            && owner.value == entry.value
                            && owner.link == Some(position)
                    })
                })
            })
        });
        rows_ok && columns_ok
    }

    fn small_lp() -> (LpRelaxation<RecordingSolver>, usize, usize, usize) {
        let mut lp = empty();
        let x = lp.add_column(0, "x".to_string(), 1_f64, Extended::Finite(0_f64), Extended::Finite(3_f64));
        let y = lp.add_column(1, "y".to_string(), -1_f64, Extended::Finite(0_f64), Extended::PLUS_INFINITY);
        let row = lp.create_row(
            "c".to_string(),
            Extended::MINUS_INFINITY,
            Extended::Finite(10_f64),
            0_f64,
            false,
            false,
        );
        lp.add_row_coefficient(row, x, 2_f64).unwrap();
        lp.add_row_coefficient(row, y, 1_f64).unwrap();
        lp.add_row_to_lp(row);
        (lp, x, y, row)
    }

    #[test]
    fn flush_mirrors_state_and_is_idempotent() {
        let (mut lp, _, _, _) = small_lp();
        lp.flush().unwrap();

        let solver = lp.solver();
        assert_eq!(solver.columns().len(), 2);
        assert_eq!(solver.rows().len(), 1);
        assert_eq!(solver.columns()[0].upper, 3_f64);
        assert_eq!(solver.columns()[1].upper, solver.infinity());
        assert_eq!(solver.rows()[0].lhs, -solver.infinity());
        assert_eq!(solver.rows()[0].rhs, 10_f64);
        assert_eq!(solver.coefficient(0, 0), 2_f64);
        assert_eq!(solver.coefficient(0, 1), 1_f64);

        let nr_calls = lp.solver().calls().len();
        lp.flush().unwrap();
        assert_eq!(lp.solver().calls().len(), nr_calls);
    }

    #[test]
    fn flush_applies_changes_before_additions() {
        let (mut lp, x, _, row) = small_lp();
        lp.flush().unwrap();

        lp.change_column_bound(x, BoundDirection::Upper, Extended::Finite(2_f64));
        lp.change_row_side(row, BoundDirection::Upper, Extended::Finite(8_f64));
        let z = lp.add_column(2, "z".to_string(), 0_f64, Extended::Finite(0_f64), Extended::Finite(1_f64));
        let cut = lp.create_row(
            "cut".to_string(),
            Extended::Finite(1_f64),
            Extended::PLUS_INFINITY,
            0_f64,
            true,
            false,
        );
        lp.add_row_coefficient(cut, z, 1_f64).unwrap();
        lp.add_row_to_lp(cut);

        let already = lp.solver().calls().len();
        lp.flush().unwrap();
        let calls = &lp.solver().calls()[already..];
        assert_eq!(
            calls,
            &[
                Call::ChangeBounds(1),
                Call::ChangeSides(1),
                Call::AddColumns { nr_columns: 1, nr_nonzeros: 0 },
                Call::AddRows { nr_rows: 1, nr_nonzeros: 1 },
            ],
        );
        assert_eq!(lp.solver().columns()[0].upper, 2_f64);
        assert_eq!(lp.solver().rows()[0].rhs, 8_f64);
    }

    #[test]
    fn constant_is_folded_into_solver_sides() {
        let mut lp = empty();
        let x = lp.add_column(0, "x".to_string(), 0_f64, Extended::Finite(0_f64), Extended::Finite(1_f64));
        let row = lp.create_row(
            "c".to_string(),
            Extended::Finite(2_f64),
            Extended::Finite(5_f64),
            1.5,
            false,
            false,
        );
        lp.add_row_coefficient(row, x, 1_f64).unwrap();
        lp.add_row_to_lp(row);
        lp.flush().unwrap();
        assert_relative_eq!(lp.solver().rows()[0].lhs, 3.5);
        assert_relative_eq!(lp.solver().rows()[0].rhs, 6.5);

        lp.change_row_constant(row, 0.5);
        lp.flush().unwrap();
        assert_relative_eq!(lp.solver().rows()[0].lhs, 2.5);
        assert_relative_eq!(lp.solver().rows()[0].rhs, 5.5);
    }

    #[test]
    fn links_are_symmetric_after_linking_and_deletion() {
        let (mut lp, x, y, row) = small_lp();
        assert!(links_consistent(&lp));

        let z = lp.add_column(2, "z".to_string(), 0_f64, Extended::Finite(0_f64), Extended::Finite(1_f64));
        lp.add_row_coefficient(row, z, -1_f64).unwrap();
        assert!(links_consistent(&lp));

        lp.delete_row_coefficient(row, y).unwrap();
        assert!(links_consistent(&lp));
        assert_eq!(lp.row(row).nr_entries(), 2);
        assert_eq!(lp.column(x).nr_entries(), 1);
        assert_eq!(lp.column(y).nr_entries(), 0);
    }

    #[test]
    fn locked_row_rejects_structural_changes() {
        let (mut lp, x, _, row) = small_lp();
        lp.lock_row(row);
        assert!(lp.add_row_coefficient(row, x, 1_f64).is_err());
        assert!(lp.delete_row_coefficient(row, x).is_err());
        lp.unlock_row(row);
        assert!(lp.delete_row_coefficient(row, x).is_ok());
    }

    #[test]
    fn duplicate_coefficient_is_rejected() {
        let (mut lp, x, _, row) = small_lp();
        assert!(lp.add_row_coefficient(row, x, 1_f64).is_err());
    }

    #[test]
    fn bound_change_updates_linked_activity() {
        let (mut lp, x, y, row) = small_lp();
        // 2x + y with x in [0, 3], y in [0, inf).
        assert_eq!(lp.row_activity_bound(row, BoundDirection::Lower), Extended::Finite(0_f64));
        assert_eq!(lp.row_activity_bound(row, BoundDirection::Upper), Extended::PLUS_INFINITY);

        lp.change_column_bound(y, BoundDirection::Upper, Extended::Finite(4_f64));
        assert_eq!(lp.row_activity_bound(row, BoundDirection::Upper), Extended::Finite(10_f64));

        lp.change_column_bound(x, BoundDirection::Lower, Extended::Finite(1_f64));
        assert_eq!(lp.row_activity_bound(row, BoundDirection::Lower), Extended::Finite(2_f64));
        // x minimizes (objective 1), y maximizes (objective -1).
        assert_eq!(lp.row_pseudo_activity(row), Extended::Finite(6_f64));

        // The incremental aggregates must match a recomputation from scratch.
        let incremental = lp.row(row).activity.clone();
        let fresh = lp.row(row).recompute_activity(&lp.columns);
        assert_eq!(incremental, Some(fresh));
    }

    #[test]
    fn feasibility_measures_the_smaller_slack_with_constant() {
        let (mut lp, _, y, row) = small_lp();
        // 2x + y <= 10; y is unbounded above with objective -1, so the pseudo activity
        // runs off to +infinity against the finite right hand side.
        assert_eq!(lp.row_feasibility(row, 4_f64), 6_f64);
        assert_eq!(lp.row_feasibility(row, 12_f64), -2_f64);
        assert_eq!(lp.row_pseudo_feasibility(row), f64::NEG_INFINITY);

        lp.change_column_bound(y, BoundDirection::Upper, Extended::Finite(4_f64));
        // Pseudo activity 2 * 0 + 1 * 4 against the side; the constant shifts both.
        assert_eq!(lp.row_pseudo_feasibility(row), 6_f64);
        lp.change_row_constant(row, 2_f64);
        assert_eq!(lp.row_pseudo_feasibility(row), 6_f64);
        assert_eq!(lp.row_feasibility(row, 4_f64), 8_f64);
    }

    #[test]
    fn rollback_strips_suffix_and_flush_deletes() {
        let (mut lp, _, _, _) = small_lp();
        lp.flush().unwrap();
        let mark = lp.mark();

        let z = lp.add_column(2, "z".to_string(), 0_f64, Extended::Finite(0_f64), Extended::Finite(1_f64));
        let cut = lp.create_row(
            "cut".to_string(),
            Extended::MINUS_INFINITY,
            Extended::Finite(1_f64),
            0_f64,
            true,
            false,
        );
        lp.add_row_coefficient(cut, z, 1_f64).unwrap();
        lp.add_row_to_lp(cut);
        lp.release_row(cut);
        lp.flush().unwrap();
        assert_eq!(lp.solver().columns().len(), 3);
        assert_eq!(lp.solver().rows().len(), 2);

        lp.rollback(mark);
        assert_eq!(lp.nr_columns(), 2);
        assert_eq!(lp.nr_rows(), 1);
        assert!(links_consistent(&lp));

        let already = lp.solver().calls().len();
        lp.flush().unwrap();
        let calls = &lp.solver().calls()[already..];
        assert_eq!(calls, &[Call::DeleteColumnsRange(2, 2), Call::DeleteRowsRange(1, 1)]);
        assert_eq!(lp.solver().columns().len(), 2);
        assert_eq!(lp.solver().rows().len(), 1);
    }

    #[test]
    fn solve_classifies_and_caches() {
        let (mut lp, x, y, row) = small_lp();
        let mut solution = SolverSolution {
            objective_value: -4_f64,
            primal: vec![0_f64, 4_f64],
            dual: vec![0.5],
            activity: vec![4_f64],
            reduced_cost: vec![1_f64, 0_f64],
        };
        lp.change_column_bound(y, BoundDirection::Upper, Extended::Finite(4_f64));
        {
            let solver = &mut lp.solver;
            solver.set_solution(solution.clone());
        }
        assert_eq!(lp.solve_primal().unwrap(), SolveStatus::Optimal);
        assert_eq!(lp.status(), SolveStatus::Optimal);
        assert_eq!(lp.objective_value(), Some(-4_f64));
        assert_eq!(lp.column_primal(x), Some(0_f64));
        assert_eq!(lp.column_primal(y), Some(4_f64));
        assert_eq!(lp.row_dual(row), Some(0.5));
        assert_eq!(lp.row_solution_activity(row), Some(4_f64));

        // Any mutation invalidates the cached solution.
        lp.change_column_bound(x, BoundDirection::Upper, Extended::Finite(2_f64));
        assert_eq!(lp.status(), SolveStatus::NotSolved);
        assert_eq!(lp.column_primal(x), None);
        assert_eq!(lp.objective_value(), None);

        solution.primal = vec![0_f64, 4_f64];
        lp.solver.set_solution(solution);
        assert_eq!(lp.solve_dual().unwrap(), SolveStatus::Optimal);
        assert_eq!(lp.column_primal(y), Some(4_f64));
    }

    #[test]
    fn infeasible_solve_exposes_farkas_multipliers() {
        let (mut lp, _, _, _) = small_lp();
        lp.solver.report(RawStatus::PrimalInfeasible);
        lp.solver.set_farkas_multipliers(vec![1.5]);
        assert_eq!(lp.solve_dual().unwrap(), SolveStatus::Infeasible);
        assert_eq!(lp.farkas_multipliers(), Some(&[1.5][..]));
        assert_eq!(lp.objective_value(), None);
    }

    #[test]
    fn unbounded_solve_scales_the_ray_past_any_limit() {
        let (mut lp, _, _, _) = small_lp();
        lp.solver.report(RawStatus::PrimalUnbounded);
        // Objective coefficients are (1, -1); the ray improves the objective at rate -1.
        lp.solver.set_primal_ray(vec![0_f64, 1_f64]);
        assert_eq!(lp.solve_primal().unwrap(), SolveStatus::Unbounded);
        let ray = lp.primal_ray().unwrap();
        let infinity = lp.solver().infinity();
        assert_relative_eq!(ray[1], 2_f64 * infinity);
        assert_eq!(ray[0], 0_f64);
    }

    #[test]
    fn objective_limit_status_depends_on_the_algorithm() {
        let (mut lp, _, _, _) = small_lp();
        lp.solver.report(RawStatus::ObjectiveLimit);
        assert_eq!(lp.solve_primal().unwrap(), SolveStatus::Error);
        assert_eq!(lp.solve_dual().unwrap(), SolveStatus::ObjectiveLimit);
    }
}
