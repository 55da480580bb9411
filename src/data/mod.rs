//! # Data structures
//!
//! Shared vocabulary types, the extended number line with its tolerances, and the variable
//! arena that both the LP layer and the constraint layer operate on.
pub mod elements;
pub mod number;
pub mod variable;
