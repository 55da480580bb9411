//! # Recording solver
//!
//! An in-memory [`SolverInterface`] implementation that mirrors every mutation it receives and
//! keeps a log of the calls made against it. It never optimizes; solve calls return a
//! configurable canned status, and solution queries return canned data.
//!
//! Its purpose is to observe the container from the solver's side: after a flush, the mirrored
//! columns and rows should equal the container's bookkept state, and the call log shows in which
//! order and with which batches the container replayed its mutations.
use crate::lp::interface::{
    BasisState, ColumnBatch, RawStatus, RowBatch, SolverError, SolverInterface, SolverSolution,
};

/// One interface call, reduced to the shape a test wants to assert on.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    /// `add_columns` with this many columns and nonzeros.
    AddColumns {
        /// Number of columns in the batch.
        nr_columns: usize,
        /// Number of nonzero entries in the batch.
        nr_nonzeros: usize,
    },
    /// `add_rows` with this many rows and nonzeros.
    AddRows {
        /// Number of rows in the batch.
        nr_rows: usize,
        /// Number of nonzero entries in the batch.
        nr_nonzeros: usize,
    },
    /// `delete_columns_range(first, last)`.
    DeleteColumnsRange(usize, usize),
    /// `delete_rows_range(first, last)`.
    DeleteRowsRange(usize, usize),
    /// `change_bounds` touching this many columns.
    ChangeBounds(usize),
    /// `change_sides` touching this many rows.
    ChangeSides(usize),
    /// `solve_primal`.
    SolvePrimal,
    /// `solve_dual`.
    SolveDual,
}

/// A column as the recording solver holds it.
#[derive(Debug, Clone, PartialEq)]
pub struct MirroredColumn {
    /// Objective coefficient.
    pub objective: f64,
    /// Lower bound, in solver representation.
    pub lower: f64,
    /// Upper bound, in solver representation.
    pub upper: f64,
    /// Column name.
    pub name: String,
    /// Entries delivered with the column, as `(row index, value)`.
    pub entries: Vec<(usize, f64)>,
}

/// A row as the recording solver holds it.
#[derive(Debug, Clone, PartialEq)]
pub struct MirroredRow {
    /// Left hand side, in solver representation.
    pub lhs: f64,
    /// Right hand side, in solver representation.
    pub rhs: f64,
    /// Row name.
    pub name: String,
    /// Entries delivered with the row, as `(column index, value)`.
    pub entries: Vec<(usize, f64)>,
}

/// The recording solver itself, see the module documentation.
#[derive(Debug)]
pub struct RecordingSolver {
    columns: Vec<MirroredColumn>,
    rows: Vec<MirroredRow>,
    calls: Vec<Call>,
    next_status: RawStatus,
    solution: SolverSolution,
    ray: Vec<f64>,
    farkas: Vec<f64>,
    basis: BasisState,
}

impl Default for RecordingSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSolver {
    /// An empty recorder that reports every solve as optimal with an all-zero solution.
    #[must_use]
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            calls: Vec::new(),
            next_status: RawStatus::Optimal,
            solution: SolverSolution::default(),
            ray: Vec::new(),
            farkas: Vec::new(),
            basis: BasisState::default(),
        }
    }

    /// Make the next solve calls report `status`.
    pub fn report(&mut self, status: RawStatus) {
        self.next_status = status;
    }

    /// Canned solution to hand out after an optimal solve.
    pub fn set_solution(&mut self, solution: SolverSolution) {
        self.solution = solution;
    }

    /// Canned ray to hand out after an unbounded solve.
    pub fn set_primal_ray(&mut self, ray: Vec<f64>) {
        self.ray = ray;
    }

    /// Canned Farkas multipliers to hand out after an infeasible solve.
    pub fn set_farkas_multipliers(&mut self, farkas: Vec<f64>) {
        self.farkas = farkas;
    }

    /// The mirrored columns, in solver order.
    #[must_use]
    pub fn columns(&self) -> &[MirroredColumn] {
        &self.columns
    }

    /// The mirrored rows, in solver order.
    #[must_use]
    pub fn rows(&self) -> &[MirroredRow] {
        &self.rows
    }

    /// The log of calls made since construction or the last [`Self::clear_calls`].
    #[must_use]
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Forget the call log, keeping the mirrored state.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// The coefficient of `column` in `row`, regardless of which batch delivered it.
    ///
    /// Entries can arrive attached to the column (for rows that already existed) or attached to
    /// the row (for columns that already existed); this sums both stores.
    #[must_use]
    pub fn coefficient(&self, row: usize, column: usize) -> f64 {
        let from_column = self.columns[column]
            .entries
            .iter()
            .filter(|&&(i, _)| i == row)
            .map(|&(_, v)| v)
            .sum::<f64>();
        let from_row = self.rows[row]
            .entries
            .iter()
            .filter(|&&(j, _)| j == column)
            .map(|&(_, v)| v)
            .sum::<f64>();
        from_column + from_row
    }
}

impl SolverInterface for RecordingSolver {
    fn infinity(&self) -> f64 {
        1e20
    }

    fn add_columns(&mut self, batch: ColumnBatch) -> Result<(), SolverError> {
        debug_assert_eq!(batch.begin.len(), batch.len() + 1);
        self.calls.push(Call::AddColumns {
            nr_columns: batch.len(),
            nr_nonzeros: batch.values.len(),
        });
        for j in 0..batch.len() {
            let entries = (batch.begin[j]..batch.begin[j + 1])
                .map(|k| (batch.row_indices[k], batch.values[k]))
                .collect::<Vec<_>>();
            debug_assert!(entries.iter().all(|&(i, _)| i < self.rows.len()));
            self.columns.push(MirroredColumn {
                objective: batch.objective[j],
                lower: batch.lower[j],
                upper: batch.upper[j],
                name: batch.names[j].clone(),
                entries,
            });
        }
        Ok(())
    }

    fn add_rows(&mut self, batch: RowBatch) -> Result<(), SolverError> {
        debug_assert_eq!(batch.begin.len(), batch.len() + 1);
        self.calls.push(Call::AddRows {
            nr_rows: batch.len(),
            nr_nonzeros: batch.values.len(),
        });
        for i in 0..batch.len() {
            let entries = (batch.begin[i]..batch.begin[i + 1])
                .map(|k| (batch.column_indices[k], batch.values[k]))
                .collect::<Vec<_>>();
            debug_assert!(entries.iter().all(|&(j, _)| j < self.columns.len()));
            self.rows.push(MirroredRow {
                lhs: batch.lhs[i],
                rhs: batch.rhs[i],
                name: batch.names[i].clone(),
                entries,
            });
        }
        Ok(())
    }

    fn delete_columns_range(&mut self, first: usize, last: usize) -> Result<(), SolverError> {
        debug_assert!(first <= last && last < self.columns.len());
        self.calls.push(Call::DeleteColumnsRange(first, last));
        self.columns.drain(first..=last);
        for row in &mut self.rows {
            row.entries.retain(|&(j, _)| !(first..=last).contains(&j));
            for entry in &mut row.entries {
                if entry.0 > last {
                    entry.0 -= last - first + 1;
                }
            }
        }
        Ok(())
    }

    fn delete_rows_range(&mut self, first: usize, last: usize) -> Result<(), SolverError> {
        debug_assert!(first <= last && last < self.rows.len());
        self.calls.push(Call::DeleteRowsRange(first, last));
        self.rows.drain(first..=last);
        for column in &mut self.columns {
            column.entries.retain(|&(i, _)| !(first..=last).contains(&i));
            for entry in &mut column.entries {
                if entry.0 > last {
                    entry.0 -= last - first + 1;
                }
            }
        }
        Ok(())
    }

    fn change_bounds(&mut self, indices: &[usize], lower: &[f64], upper: &[f64]) -> Result<(), SolverError> {
        debug_assert_eq!(indices.len(), lower.len());
        debug_assert_eq!(indices.len(), upper.len());
        self.calls.push(Call::ChangeBounds(indices.len()));
        for (k, &j) in indices.iter().enumerate() {
            self.columns[j].lower = lower[k];
            self.columns[j].upper = upper[k];
        }
        Ok(())
    }

    fn change_sides(&mut self, indices: &[usize], lhs: &[f64], rhs: &[f64]) -> Result<(), SolverError> {
        debug_assert_eq!(indices.len(), lhs.len());
        debug_assert_eq!(indices.len(), rhs.len());
        self.calls.push(Call::ChangeSides(indices.len()));
        for (k, &i) in indices.iter().enumerate() {
            self.rows[i].lhs = lhs[k];
            self.rows[i].rhs = rhs[k];
        }
        Ok(())
    }

    fn solve_primal(&mut self) -> Result<RawStatus, SolverError> {
        self.calls.push(Call::SolvePrimal);
        Ok(self.next_status)
    }

    fn solve_dual(&mut self) -> Result<RawStatus, SolverError> {
        self.calls.push(Call::SolveDual);
        Ok(self.next_status)
    }

    fn solution(&self) -> Result<SolverSolution, SolverError> {
        Ok(self.solution.clone())
    }

    fn primal_ray(&self) -> Result<Vec<f64>, SolverError> {
        Ok(self.ray.clone())
    }

    fn farkas_multipliers(&self) -> Result<Vec<f64>, SolverError> {
        Ok(self.farkas.clone())
    }

    fn basis_feasibility(&self) -> (bool, bool) {
        (self.next_status == RawStatus::Optimal, self.next_status == RawStatus::Optimal)
    }

    fn basis_state(&self) -> BasisState {
        self.basis.clone()
    }

    fn set_basis_state(&mut self, state: BasisState) -> Result<(), SolverError> {
        self.basis = state;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::lp::interface::{ColumnBatch, RowBatch, SolverInterface};
    use crate::lp::interface::recording::{Call, RecordingSolver};

    #[test]
    fn mirrors_and_logs() {
        let mut solver = RecordingSolver::new();
        solver.add_columns(ColumnBatch {
            objective: vec![1_f64, -2_f64],
            lower: vec![0_f64, 0_f64],
            upper: vec![1e20, 3_f64],
            names: vec!["x".to_string(), "y".to_string()],
            begin: vec![0, 0, 0],
            row_indices: vec![],
            values: vec![],
        }).unwrap();
        solver.add_rows(RowBatch {
            lhs: vec![-1e20],
            rhs: vec![10_f64],
            names: vec!["c".to_string()],
            begin: vec![0, 2],
            column_indices: vec![0, 1],
            values: vec![1_f64, 2_f64],
        }).unwrap();

        assert_eq!(solver.columns().len(), 2);
        assert_eq!(solver.rows().len(), 1);
        assert_eq!(solver.coefficient(0, 1), 2_f64);
        assert_eq!(solver.calls().len(), 2);
        assert_eq!(solver.calls()[1], Call::AddRows { nr_rows: 1, nr_nonzeros: 2 });
    }

    #[test]
    fn range_deletion_shifts_indices() {
        let mut solver = RecordingSolver::new();
        solver.add_columns(ColumnBatch {
            objective: vec![0_f64; 3],
            lower: vec![0_f64; 3],
            upper: vec![1e20; 3],
            names: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            begin: vec![0, 0, 0, 0],
            row_indices: vec![],
            values: vec![],
        }).unwrap();
        solver.add_rows(RowBatch {
            lhs: vec![0_f64],
            rhs: vec![1_f64],
            names: vec!["r".to_string()],
            begin: vec![0, 2],
            column_indices: vec![0, 2],
            values: vec![1_f64, 5_f64],
        }).unwrap();

        solver.delete_columns_range(0, 0).unwrap();
        assert_eq!(solver.columns().len(), 2);
        assert_eq!(solver.rows()[0].entries, vec![(1, 5_f64)]);
    }
}
