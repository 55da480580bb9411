//! # Relax
//!
//! Management of the linear programming relaxation inside a branch-and-bound search for
//! constraint integer programs.
//!
//! The crate has two halves. The [`lp`] module keeps a dual-representation sparse coefficient
//! matrix (rows and columns each hold their own ordered nonzero list, cross-linked) synchronized
//! with an external solver through a lazy, batched flush protocol. The [`constraint`] module
//! holds linear constraint objects above the LP and the propagation and presolve algorithms that
//! operate on them: activity-based bound tightening, redundancy and domination detection, and
//! equality-based variable fixing and aggregation.
//!
//! The external solver is abstracted behind [`lp::interface::SolverInterface`]; the algorithms in
//! this crate never call a simplex implementation directly.
#![warn(missing_docs)]

pub mod constraint;
pub mod data;
pub mod lp;
