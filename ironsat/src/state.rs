//! Miscellaneous solver state.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Satisfiability state.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SatState {
    Unknown,
    Sat,
    Unsat,
    UnsatUnderAssumptions,
}

impl Default for SatState {
    fn default() -> SatState {
        SatState::Unknown
    }
}

/// Miscellaneous solver state.
///
/// Anything larger or any larger group of related state variables should be moved into a separate
/// part of [`Context`](crate::context::Context).
pub struct SolverState {
    pub sat_state: SatState,
    /// Whether the formula itself (without assumptions) was found unsatisfiable.
    ///
    /// This is sticky, unsatisfiability of the formula survives any further solver use.
    pub formula_unsat: bool,
    /// Asynchronous stop request, shared with [`stop_handle`](SolverState::stop_handle) clones.
    stop: Arc<AtomicBool>,
    /// Synchronous stop callback, polled at coarse intervals.
    terminator: Option<Box<dyn FnMut() -> bool + Send>>,
}

impl Default for SolverState {
    fn default() -> SolverState {
        SolverState {
            sat_state: SatState::Unknown,
            formula_unsat: false,
            stop: Arc::new(AtomicBool::new(false)),
            terminator: None,
        }
    }
}

impl SolverState {
    /// A handle that can asynchronously request the solver to stop.
    ///
    /// Storing `true` in the handle makes `solve` return as soon as the current atomic step of
    /// the search finishes.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Replace the synchronous stop callback.
    pub fn set_terminator(&mut self, terminator: Option<Box<dyn FnMut() -> bool + Send>>) {
        self.terminator = terminator;
    }

    /// Whether a stop was requested by either mechanism.
    pub fn should_stop(&mut self) -> bool {
        if self.stop.load(Ordering::Relaxed) {
            return true;
        }
        match &mut self.terminator {
            Some(terminator) => terminator(),
            None => false,
        }
    }

    /// Reset the asynchronous stop request when a new solve begins.
    pub fn clear_stop(&mut self) {
        self.stop.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_handle_roundtrip() {
        let mut state = SolverState::default();
        assert!(!state.should_stop());

        let handle = state.stop_handle();
        handle.store(true, Ordering::Relaxed);
        assert!(state.should_stop());

        state.clear_stop();
        assert!(!state.should_stop());

        state.set_terminator(Some(Box::new(|| true)));
        assert!(state.should_stop());
    }
}
