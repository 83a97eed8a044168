//! Boolean satisfiability solver.
use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use partial_ref::{IntoPartialRef, IntoPartialRefMut, PartialRef};

use ironsat_formula::{CnfFormula, Lit, Var};

use crate::assumptions::set_assumptions;
use crate::config::{ConfigError, SolverConfigUpdate};
use crate::context::{
    config_changed, AssumptionsP, Context, ModelP, ProofP, SolverConfigP, SolverStateP,
    VariablesP,
};
use crate::load::load_user_clause;
use crate::model::reconstruct_model;
use crate::proof::{ProofFormat, Tracer};
use crate::schedule::schedule_step;
use crate::state::SatState;

/// A boolean satisfiability solver.
///
/// Supports incremental solving: clauses can be added and assumptions asserted between calls to
/// [`solve`](Solver::solve). Assumptions stay active until they are replaced by the next
/// [`assume`](Solver::assume) call.
#[derive(Default)]
pub struct Solver {
    ctx: Box<Context>,
}

impl Solver {
    /// Create a new solver.
    pub fn new() -> Solver {
        Solver::default()
    }

    /// Add a clause to the formula.
    pub fn add_clause(&mut self, clause: &[Lit]) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        load_user_clause(ctx.borrow(), clause);
    }

    /// Add a formula to the solver.
    pub fn add_formula(&mut self, formula: &CnfFormula) {
        for clause in formula.iter() {
            self.add_clause(clause);
        }
    }

    /// Assert temporary assumptions for the next solves.
    ///
    /// Replaces the previous assumptions. Passing an empty slice removes all assumptions.
    pub fn assume(&mut self, assumptions: &[Lit]) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        set_assumptions(ctx.borrow(), assumptions);
    }

    /// Check the satisfiability of the current formula under the current assumptions.
    ///
    /// Returns `None` when solving was interrupted by the stop handle or the terminator
    /// callback. Solving can be resumed by calling `solve` again.
    pub fn solve(&mut self) -> Option<bool> {
        let mut ctx = self.ctx.into_partial_ref_mut();

        ctx.part_mut(SolverStateP).clear_stop();

        while ctx.part(SolverStateP).sat_state == SatState::Unknown {
            if ctx.part_mut(SolverStateP).should_stop() {
                break;
            }
            if !schedule_step(ctx.borrow()) {
                break;
            }
        }

        match ctx.part(SolverStateP).sat_state {
            SatState::Unknown => None,
            SatState::Sat => {
                reconstruct_model(ctx.borrow());
                Some(true)
            }
            SatState::Unsat | SatState::UnsatUnderAssumptions => Some(false),
        }
    }

    /// Set of literals that satisfy the formula.
    ///
    /// Only valid directly after a [`solve`](Solver::solve) call returned `Some(true)`.
    pub fn model(&self) -> Option<Vec<Lit>> {
        let ctx = self.ctx.into_partial_ref();
        if ctx.part(SolverStateP).sat_state != SatState::Sat {
            return None;
        }
        let mut model = vec![];
        let variables = ctx.part(VariablesP);
        for var in variables.solver_var_iter() {
            let user_var = variables.user_from_solver(var);
            if let Some(value) = ctx.part(ModelP).lit_value(user_var.positive()) {
                model.push(user_var.lit(value));
            }
        }
        Some(model)
    }

    /// Value of a literal in the satisfying assignment.
    ///
    /// Only valid directly after a [`solve`](Solver::solve) call returned `Some(true)`.
    /// Variables the formula never mentioned take their default phase.
    pub fn lit_value(&self, lit: Lit) -> Option<bool> {
        let ctx = self.ctx.into_partial_ref();
        if ctx.part(SolverStateP).sat_state != SatState::Sat {
            return None;
        }
        ctx.part(ModelP)
            .lit_value(lit)
            .or_else(|| Some(ctx.part(SolverConfigP).initial_phase ^ lit.is_negative()))
    }

    /// Subset of the assumptions that made the formula unsatisfiable.
    ///
    /// Only valid directly after a [`solve`](Solver::solve) call returned `Some(false)` with
    /// assumptions. Returns `None` when the formula is unsatisfiable without assumptions.
    pub fn failed_core(&self) -> Option<&[Lit]> {
        let ctx = self.ctx.into_partial_ref();
        if ctx.part(SolverStateP).sat_state != SatState::UnsatUnderAssumptions {
            return None;
        }
        Some(ctx.part(AssumptionsP).user_failed_core())
    }

    /// Whether the given assumption literal is part of the failed core.
    ///
    /// Only valid directly after a [`solve`](Solver::solve) call returned `Some(false)` with
    /// assumptions. When the formula is unsatisfiable on its own, an assumption counts as
    /// failed when its negation is implied by the formula alone.
    pub fn failed(&self, lit: Lit) -> bool {
        let ctx = self.ctx.into_partial_ref();

        let solver_lit = match ctx.part(VariablesP).existing_solver_from_user(lit.var()) {
            Some(solver_var) => solver_var.lit(lit.is_positive()),
            None => return false,
        };

        match ctx.part(SolverStateP).sat_state {
            SatState::UnsatUnderAssumptions => ctx
                .part(VariablesP)
                .var_data(solver_lit.var())
                .is_failed(solver_lit),
            SatState::Unsat => {
                ctx.part(VariablesP)
                    .var_data(solver_lit.var())
                    .is_assumed(solver_lit)
                    && ctx.part(crate::context::AssignmentP).lit_is_false(solver_lit)
            }
            _ => false,
        }
    }

    /// Protect a variable from being eliminated during inprocessing.
    ///
    /// Freezing is reference counted: a variable stays protected until it is melted as often as
    /// it was frozen.
    pub fn freeze(&mut self, var: Var) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        let solver_var = ctx.part_mut(VariablesP).solver_from_user(var);
        crate::context::ensure_var_count(ctx.borrow());
        ctx.part_mut(VariablesP).freeze(solver_var);
    }

    /// Undo one freeze of a variable.
    pub fn melt(&mut self, var: Var) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        if let Some(solver_var) = ctx.part(VariablesP).existing_solver_from_user(var) {
            ctx.part_mut(VariablesP).melt(solver_var);
        }
    }

    /// Apply a configuration update.
    pub fn config(&mut self, update: &SolverConfigUpdate) -> Result<(), ConfigError> {
        update.check()?;
        let mut ctx = self.ctx.into_partial_ref_mut();
        update.apply(ctx.part_mut(SolverConfigP));
        config_changed(ctx.borrow(), update);
        Ok(())
    }

    /// Set a single configuration value by name.
    ///
    /// Boolean knobs interpret the value as `false` for zero and `true` otherwise.
    pub fn set_option(&mut self, name: &str, value: f64) -> Result<(), ConfigError> {
        let mut update = SolverConfigUpdate::new();

        let enabled = value != 0.0;

        match name {
            "vsids_decay" => update.vsids_decay = Some(value as f32),
            "clause_activity_decay" => update.clause_activity_decay = Some(value as f32),
            "tier1_glue" => update.tier1_glue = Some(value as u32),
            "tier2_glue" => update.tier2_glue = Some(value as u32),
            "recompute_tiers" => update.recompute_tiers = Some(enabled),
            "fast_glue_alpha" => update.fast_glue_alpha = Some(value),
            "slow_glue_alpha" => update.slow_glue_alpha = Some(value),
            "restart_margin" => update.restart_margin = Some(value),
            "restart_interval" => update.restart_interval = Some(value as u64),
            "stable_restart_scale" => update.stable_restart_scale = Some(value as u64),
            "reuse_trail" => update.reuse_trail = Some(enabled),
            "stabilize" => update.stabilize = Some(enabled),
            "stabilize_interval" => update.stabilize_interval = Some(value as u64),
            "reduce_interval" => update.reduce_interval = Some(value as u64),
            "rephase_interval" => update.rephase_interval = Some(value as u64),
            "initial_phase" => update.initial_phase = Some(enabled),
            "chrono" => update.chrono = Some(enabled),
            "chrono_distance" => update.chrono_distance = Some(value as usize),
            "shrink" => update.shrink = Some(enabled),
            "inprocess_interval" => update.inprocess_interval = Some(value as u64),
            "dedup" => update.dedup = Some(enabled),
            "transred" => update.transred = Some(enabled),
            "decompose" => update.decompose = Some(enabled),
            "subsume" => update.subsume = Some(enabled),
            "vivify" => update.vivify = Some(enabled),
            "cover" => update.cover = Some(enabled),
            "elim" => update.elim = Some(enabled),
            "elim_growth" => update.elim_growth = Some(value as usize),
            "elim_occurrence_limit" => update.elim_occurrence_limit = Some(value as usize),
            "block" => update.block = Some(enabled),
            "probe" => update.probe = Some(enabled),
            "autarky" => update.autarky = Some(enabled),
            "seed" => update.seed = Some(value as u64),
            _ => {
                return Err(ConfigError {
                    errors: vec![format!("unknown option {:?}", name)],
                })
            }
        }

        self.config(&update)
    }

    /// Write a proof of unsatisfiability in the given format.
    ///
    /// Tracers have to be connected before any clause is added, otherwise the proof misses the
    /// already performed derivations.
    pub fn write_proof(&mut self, target: impl Write + 'static, format: ProofFormat) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        ctx.part_mut(ProofP)
            .add_tracer(Tracer::new(Box::new(target), format));
    }

    /// Finalize and disconnect all proof tracers.
    pub fn close_proof(&mut self) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        crate::proof::close_proof(ctx.borrow());
    }

    /// A handle that can asynchronously interrupt this solver.
    ///
    /// Storing `true` makes the running [`solve`](Solver::solve) return `None` after finishing
    /// its current step. The handle can be moved to other threads.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        let ctx = self.ctx.into_partial_ref();
        ctx.part(SolverStateP).stop_handle()
    }

    /// Set a callback that is polled during solving to request termination.
    pub fn set_terminator(&mut self, terminator: impl FnMut() -> bool + Send + 'static) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        ctx.part_mut(SolverStateP)
            .set_terminator(Some(Box::new(terminator)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use ironsat_formula::{cnf_formula, lits, test::*};

    proptest! {
        #[test]
        fn sgen_unsat(formula in sgen_unsat_formula(1..7usize)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(), Some(false));
        }

        #[test]
        fn sat(formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(), Some(true));

            let model = solver.model().unwrap();

            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|lit| model.contains(lit)));
            }
        }

        #[test]
        fn sgen_unsat_incremental_clauses(formula in sgen_unsat_formula(1..7usize)) {
            let mut solver = Solver::new();

            let mut last_state = Some(true);

            for clause in formula.iter() {
                solver.add_clause(clause);

                let state = solver.solve();
                if state != last_state {
                    prop_assert_eq!(state, Some(false));
                    prop_assert_eq!(last_state, Some(true));
                    last_state = state;
                }
            }

            prop_assert_eq!(last_state, Some(false));
        }

        #[test]
        fn sat_under_assumptions(formula in sat_formula(4..12usize, 10..60usize, 0.05..0.2, 0.9..1.0)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(), Some(true));

            let model = solver.model().unwrap();
            let assumptions: Vec<Lit> = model.iter().cloned().take(4).collect();

            solver.assume(&assumptions);

            prop_assert_eq!(solver.solve(), Some(true));

            let model = solver.model().unwrap();
            for &lit in assumptions.iter() {
                prop_assert!(model.contains(&lit));
            }
        }
    }

    #[test]
    fn empty_formula_is_sat() {
        let mut solver = Solver::new();
        assert_eq!(solver.solve(), Some(true));
        assert_eq!(solver.lit_value(lits![1][0]), Some(false));
        assert_eq!(solver.lit_value(lits![-1][0]), Some(true));
    }

    #[test]
    fn empty_clause_is_unsat() {
        let mut solver = Solver::new();
        solver.add_clause(&[]);
        assert_eq!(solver.solve(), Some(false));
    }

    #[test]
    fn unit_clause_model() {
        let mut solver = Solver::new();
        solver.add_clause(&lits![-7]);
        assert_eq!(solver.solve(), Some(true));
        assert_eq!(solver.lit_value(lits![7][0]), Some(false));
        assert_eq!(solver.lit_value(lits![-7][0]), Some(true));
    }

    #[test]
    fn unsat_is_terminal() {
        let mut solver = Solver::new();
        solver.add_formula(&cnf_formula![
            1, 2;
            -1, 2;
            -2;
        ]);
        assert_eq!(solver.solve(), Some(false));

        solver.add_clause(&lits![3]);
        assert_eq!(solver.solve(), Some(false));
    }

    #[test]
    fn terminator_interrupts() {
        let mut solver = Solver::new();
        solver.add_formula(&cnf_formula![
            1, 2, 3;
            -1, -2;
        ]);
        solver.set_terminator(|| true);
        assert_eq!(solver.solve(), None);

        solver.set_terminator(|| false);
        assert_eq!(solver.solve(), Some(true));
    }
}
