//! Formula data types for the ironsat SAT solver.
#[macro_use]
pub mod lit;
pub mod cnf;

#[cfg(any(test, feature = "proptest-strategies"))]
#[doc(hidden)]
pub mod test;

pub use cnf::{CnfFormula, ExtendFormula};
pub use lit::{Lit, LitIdx, Var};
