//! # External solver interface
//!
//! The LP container never solves anything itself; it talks to an external solver through the
//! [`SolverInterface`] trait. Implementations wrap a simplex or interior point code. The
//! container batches its mutations and replays them through the bulk calls of this trait, see
//! [`crate::lp::LpRelaxation::flush`].
//!
//! Everything at this boundary is plain `f64`: infinities are mapped onto the solver's own
//! sentinel value ([`SolverInterface::infinity`]) on the way in.
use std::error::Error;
use std::fmt;

pub mod recording;

/// An error reported by the external solver.
///
/// The container does not retry; it records the failed solve and leaves itself in a state from
/// which a caller-driven retry is safe.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SolverError {
    /// The interface call that failed.
    pub operation: &'static str,
    /// Solver specific diagnostic.
    pub message: String,
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LP solver error during `{}`: {}", self.operation, self.message)
    }
}

impl Error for SolverError {}

/// Statuses an external solver can report after a solve call.
///
/// This is the raw, solve-direction-agnostic form; the container maps it onto [`SolveStatus`]
/// depending on whether the primal or the dual simplex produced it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RawStatus {
    /// An optimal basis was found.
    Optimal,
    /// The problem is primal infeasible.
    PrimalInfeasible,
    /// The problem is primal unbounded.
    PrimalUnbounded,
    /// The iteration limit was hit before convergence.
    IterationLimit,
    /// The time limit was hit before convergence.
    TimeLimit,
    /// The objective limit was reached.
    ObjectiveLimit,
}

/// Classification of the latest solve, the closed vocabulary the search driver consumes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SolveStatus {
    /// No solve has happened since the last mutation.
    NotSolved,
    /// An optimal solution is available.
    Optimal,
    /// The relaxation is infeasible; Farkas multipliers are available.
    Infeasible,
    /// The relaxation is unbounded; a primal ray is available.
    Unbounded,
    /// Stopped at the iteration limit.
    IterationLimit,
    /// Stopped at the time limit.
    TimeLimit,
    /// Stopped at the objective limit (only meaningful for the dual simplex).
    ObjectiveLimit,
    /// The solver failed or reported a status the calling context cannot use.
    Error,
}

/// Columns to be appended to the solver, in struct-of-arrays form.
///
/// Nonzero entries are concatenated; `begin[j]` is the offset of column `j`'s first entry in
/// `row_indices`/`values`, with `begin.len() == nr_columns + 1` so that the entry range of
/// column `j` is `begin[j]..begin[j + 1]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnBatch {
    /// Objective coefficient per new column.
    pub objective: Vec<f64>,
    /// Lower bound per new column, infinity already mapped.
    pub lower: Vec<f64>,
    /// Upper bound per new column, infinity already mapped.
    pub upper: Vec<f64>,
    /// Name per new column.
    pub names: Vec<String>,
    /// Entry range offsets, one more than there are columns.
    pub begin: Vec<usize>,
    /// Row index per nonzero entry.
    pub row_indices: Vec<usize>,
    /// Coefficient per nonzero entry.
    pub values: Vec<f64>,
}

impl ColumnBatch {
    /// Number of columns in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objective.len()
    }

    /// Whether the batch holds no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objective.is_empty()
    }
}

/// Rows to be appended to the solver, mirroring [`ColumnBatch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowBatch {
    /// Left hand side per new row, infinity already mapped.
    pub lhs: Vec<f64>,
    /// Right hand side per new row, infinity already mapped.
    pub rhs: Vec<f64>,
    /// Name per new row.
    pub names: Vec<String>,
    /// Entry range offsets, one more than there are rows.
    pub begin: Vec<usize>,
    /// Column index per nonzero entry.
    pub column_indices: Vec<usize>,
    /// Coefficient per nonzero entry.
    pub values: Vec<f64>,
}

impl RowBatch {
    /// Number of rows in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lhs.len()
    }

    /// Whether the batch holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lhs.is_empty()
    }
}

/// The solution values of an optimal solve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverSolution {
    /// Objective value of the solution.
    pub objective_value: f64,
    /// Primal value per column.
    pub primal: Vec<f64>,
    /// Dual value per row.
    pub dual: Vec<f64>,
    /// Activity per row.
    pub activity: Vec<f64>,
    /// Reduced cost per column.
    pub reduced_cost: Vec<f64>,
}

/// Opaque basis snapshot.
///
/// The byte layout is the solver's business; this core only stores and passes it back, so warm
/// starts survive the container's mark/rollback cycles.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct BasisState(Vec<u8>);

impl BasisState {
    /// Wrap solver specific basis bytes.
    #[must_use]
    pub fn opaque(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// The wrapped bytes, for the solver to interpret.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Operations an external LP solver must provide.
///
/// All calls are synchronous and atomic from the container's perspective: they either return a
/// definite result or a [`SolverError`], never a partial mutation.
pub trait SolverInterface {
    /// The solver's sentinel value for "unbounded".
    ///
    /// Values at or beyond this magnitude are treated as infinite by the solver.
    fn infinity(&self) -> f64;

    /// Append columns, entries restricted to rows the solver already holds.
    fn add_columns(&mut self, batch: ColumnBatch) -> Result<(), SolverError>;

    /// Append rows, entries restricted to columns the solver already holds.
    fn add_rows(&mut self, batch: RowBatch) -> Result<(), SolverError>;

    /// Delete the columns `first..=last` and shift later columns down.
    fn delete_columns_range(&mut self, first: usize, last: usize) -> Result<(), SolverError>;

    /// Delete the rows `first..=last` and shift later rows down.
    fn delete_rows_range(&mut self, first: usize, last: usize) -> Result<(), SolverError>;

    /// Change bounds of existing columns, one `(index, lower, upper)` triple per position.
    fn change_bounds(&mut self, indices: &[usize], lower: &[f64], upper: &[f64]) -> Result<(), SolverError>;

    /// Change sides of existing rows, one `(index, lhs, rhs)` triple per position.
    fn change_sides(&mut self, indices: &[usize], lhs: &[f64], rhs: &[f64]) -> Result<(), SolverError>;

    /// Run the primal simplex (or equivalent).
    fn solve_primal(&mut self) -> Result<RawStatus, SolverError>;

    /// Run the dual simplex (or equivalent).
    fn solve_dual(&mut self) -> Result<RawStatus, SolverError>;

    /// Retrieve the solution after an [`RawStatus::Optimal`] solve.
    fn solution(&self) -> Result<SolverSolution, SolverError>;

    /// Retrieve a primal ray after an [`RawStatus::PrimalUnbounded`] solve.
    fn primal_ray(&self) -> Result<Vec<f64>, SolverError>;

    /// Retrieve Farkas multipliers after an [`RawStatus::PrimalInfeasible`] solve.
    fn farkas_multipliers(&self) -> Result<Vec<f64>, SolverError>;

    /// Whether the current basis is primal and dual feasible.
    fn basis_feasibility(&self) -> (bool, bool);

    /// Snapshot the current basis.
    fn basis_state(&self) -> BasisState;

    /// Restore a previously snapshotted basis.
    fn set_basis_state(&mut self, state: BasisState) -> Result<(), SolverError>;
}
