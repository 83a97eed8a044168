//! ironsat is an incremental CDCL SAT solver with inprocessing.
//!
//! Clauses are added to a [`Solver`], optionally together with per-solve assumptions. Solving
//! returns a satisfying assignment, an unsatisfiability verdict with a failed-assumption subset,
//! or nothing when interrupted. Between solver invocations and interleaved with the search, the
//! clause database is simplified by a set of inprocessing passes.
pub mod config;
pub mod proof;
pub mod solver;

mod analyze_conflict;
mod assumptions;
mod binary;
mod cdcl;
mod clause;
mod context;
mod decision;
mod ema;
mod extend;
mod inprocess;
mod load;
mod model;
mod prop;
mod restart;
mod schedule;
mod shrink;
mod simplify;
mod state;
mod tmp;
mod variables;

pub use ironsat_formula::{cnf, cnf_formula, lit, lits, CnfFormula, ExtendFormula, Lit, Var};

pub use config::{SolverConfig, SolverConfigUpdate};
pub use solver::Solver;
