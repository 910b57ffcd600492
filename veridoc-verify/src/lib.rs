#![forbid(unsafe_code)]

//! Consistency verification: every documented constraint is checked for
//! realizability against the function's enumerated execution paths, with
//! satisfiability decided by a pluggable backend.
//!
//! The default [`DenseOrderBackend`] decides the comparison fragment the
//! notation can express without an external solver; the `z3` feature swaps
//! in a real SMT solver behind the same [`SatBackend`] trait.

mod engine;
mod solver;
pub mod vocab;

pub use engine::{Engine, Finding, UnitInputs, UnitReport, VerifyConfig};
pub use solver::{DenseOrderBackend, SatBackend, SolveError};

#[cfg(feature = "z3")]
pub use solver::z3_backend::Z3Backend;
