//! Incremental solving with assumptions.
//!
//! Assumptions are temporary unit constraints for a single solve. They are enqueued as pseudo
//! decisions below all real decisions, so conflict analysis never resolves them away. When the
//! formula is unsatisfiable under the assumptions, a subset of assumptions responsible for the
//! conflict is extracted by a breadth first search over the implication graph and exposed both
//! as a literal list and as per literal failed flags.
use partial_ref::{partial, split_borrow, PartialRef};

use ironsat_formula::{Lit, LitIdx};

use crate::context::{
    AnalyzeConflictP, AssignmentP, AssumptionsP, BinaryClausesP, ClauseAllocP, Context,
    ExtensionP, ImplGraphP, OccurrencesP, PhasesP, ProofP, SolverStateP, TmpDataP, TmpFlagsP,
    TrailP, VariablesP, VmtfP, VsidsP, WatchlistsP,
};
use crate::extend::restore_vars;
use crate::proof::{self, ClauseId};
use crate::prop::{enqueue_assignment, full_restart, Reason};
use crate::state::SatState;
use crate::variables::solver_from_user_lits;

/// Incremental solving with assumptions.
#[derive(Default)]
pub struct Assumptions {
    assumptions: Vec<Lit>,
    failed_core: Vec<Lit>,
    user_failed_core: Vec<Lit>,
    assumption_levels: usize,
}

impl Assumptions {
    /// Current number of decision levels used for assumptions.
    pub fn assumption_levels(&self) -> usize {
        self.assumption_levels
    }

    /// Resets assumption_levels to zero on a full restart.
    pub fn full_restart(&mut self) {
        self.assumption_levels = 0;
    }

    /// Subset of assumptions that made the formula unsatisfiable, in solver literals.
    pub fn failed_core(&self) -> &[Lit] {
        &self.failed_core
    }

    /// Subset of assumptions that made the formula unsatisfiable, in user literals.
    pub fn user_failed_core(&self) -> &[Lit] {
        &self.user_failed_core
    }

    /// Current assumptions.
    pub fn assumptions(&self) -> &[Lit] {
        &self.assumptions
    }
}

/// Return type of [`enqueue_assumption`].
pub enum EnqueueAssumption {
    Done,
    Enqueued,
    Conflict,
}

/// Change the currently active assumptions.
///
/// The input uses user literals. Assumed variables are frozen until the assumptions are replaced
/// so no inprocessing pass eliminates them.
pub fn set_assumptions(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut AssumptionsP,
        mut BinaryClausesP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ExtensionP,
        mut ImplGraphP,
        mut OccurrencesP,
        mut PhasesP,
        mut ProofP,
        mut SolverStateP,
        mut TmpDataP,
        mut TmpFlagsP,
        mut TrailP,
        mut VariablesP,
        mut VmtfP,
        mut VsidsP,
        mut WatchlistsP,
    ),
    user_assumptions: &[Lit],
) {
    full_restart(ctx.borrow());

    let state = ctx.part_mut(SolverStateP);

    state.sat_state = if state.formula_unsat {
        SatState::Unsat
    } else {
        SatState::Unknown
    };

    {
        let bctx = ctx.borrow();
        let (assumptions, mut bctx) = bctx.split_part_mut(AssumptionsP);
        let variables = bctx.part_mut(VariablesP);

        for &lit in assumptions.assumptions.iter() {
            let data = variables.var_data_mut(lit.var());
            data.set_assumed(lit, false);
            data.set_failed(lit, false);
            variables.melt(lit.var());
        }

        assumptions.failed_core.clear();
        assumptions.user_failed_core.clear();
    }

    let mut solver_lits = vec![];
    solver_from_user_lits(ctx.borrow(), &mut solver_lits, user_assumptions);

    restore_vars(ctx.borrow(), &solver_lits);

    // Duplicated assumptions are dropped via the assumed flag.
    let (assumptions, mut ctx) = ctx.split_part_mut(AssumptionsP);
    let variables = ctx.part_mut(VariablesP);

    assumptions.assumptions.clear();
    for &lit in solver_lits.iter() {
        let data = variables.var_data_mut(lit.var());
        if data.is_assumed(lit) {
            continue;
        }
        data.set_assumed(lit, true);
        variables.freeze(lit.var());
        assumptions.assumptions.push(lit);
    }
}

/// Enqueue another assumption if possible.
///
/// Returns whether an assumption was enqueued, whether no assumptions are left or whether the
/// assumptions result in a conflict.
pub fn enqueue_assumption(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut AssumptionsP,
        mut ImplGraphP,
        mut ProofP,
        mut TmpFlagsP,
        mut TrailP,
        mut VariablesP,
        ClauseAllocP,
    ),
) -> EnqueueAssumption {
    while let Some(&assumption) = ctx
        .part(AssumptionsP)
        .assumptions
        .get(ctx.part(TrailP).current_level())
    {
        match ctx.part(AssignmentP).lit_value(assumption) {
            Some(false) => {
                analyze_assumption_conflict(ctx.borrow(), assumption);
                return EnqueueAssumption::Conflict;
            }
            Some(true) => {
                // The next assumption is already implied by other assumptions so we can remove
                // it.
                let level = ctx.part(TrailP).current_level();
                let assumptions = ctx.part_mut(AssumptionsP);
                assumptions.assumptions.swap_remove(level);
            }
            None => {
                ctx.part_mut(TrailP).new_decision_level();
                enqueue_assignment(ctx.borrow(), assumption, Reason::Unit);
                let (assumptions, ctx) = ctx.split_part_mut(AssumptionsP);
                assumptions.assumption_levels = ctx.part(TrailP).current_level();
                return EnqueueAssumption::Enqueued;
            }
        }
    }
    EnqueueAssumption::Done
}

/// Analyze a conflicting set of assumptions.
///
/// Computes a set of incompatible assumptions given an assumption that is incompatible with the
/// assumptions enqueued so far. Each assumption of that set gets its failed flag set and the
/// clause consisting of their negations is emitted to the proof and deleted again, witnessing
/// that the set is a valid unsatisfiable core.
fn analyze_assumption_conflict(
    mut ctx: partial!(
        Context,
        mut AssumptionsP,
        mut ProofP,
        mut TmpFlagsP,
        mut VariablesP,
        ClauseAllocP,
        ImplGraphP,
        TrailP,
    ),
    assumption: Lit,
) {
    let antecedents_required = ctx.part(ProofP).antecedents_required();

    let mut chain: Vec<(LitIdx, ClauseId)> = vec![];
    let mut units: Vec<ClauseId> = vec![];

    {
        let bctx = ctx.borrow();
        let (assumptions, bctx) = bctx.split_part_mut(AssumptionsP);
        let (tmp, bctx) = bctx.split_part_mut(TmpFlagsP);
        let (trail, bctx) = bctx.split_part(TrailP);
        let (impl_graph, mut ctx) = bctx.split_part(ImplGraphP);
        split_borrow!(lit_ctx = &(ClauseAllocP) ctx);

        let flags = &mut tmp.flags;

        assumptions.failed_core.clear();
        assumptions.failed_core.push(assumption);

        flags[assumption.index()] = true;
        let mut flag_count = 1;

        for &lit in trail.trail().iter().rev() {
            if flags[lit.index()] {
                flags[lit.index()] = false;
                flag_count -= 1;

                match impl_graph.reason(lit.var()) {
                    Reason::Unit => {
                        if impl_graph.level(lit.var()) > 0 {
                            assumptions.failed_core.push(lit);
                        } else if antecedents_required {
                            if let Some(id) = ctx.part(ProofP).unit_id(lit.var()) {
                                units.push(id);
                            }
                        }
                    }
                    reason => {
                        if antecedents_required {
                            if let Some(id) = reason.id(&lit_ctx) {
                                chain.push((impl_graph.depth(lit.var()) as LitIdx, id));
                            }
                        }

                        for &reason_lit in reason.lits(&lit_ctx) {
                            if impl_graph.level(reason_lit.var()) == 0 {
                                if antecedents_required {
                                    if let Some(id) = ctx.part(ProofP).unit_id(reason_lit.var()) {
                                        units.push(id);
                                    }
                                }
                            } else if !flags[reason_lit.index()] {
                                flags[reason_lit.index()] = true;
                                flag_count += 1;
                            }
                        }
                    }
                }

                if flag_count == 0 {
                    break;
                }
            }
        }
    }

    // Mark the failed assumptions and map them for the user.
    {
        let bctx = ctx.borrow();
        let (assumptions, mut bctx) = bctx.split_part_mut(AssumptionsP);
        let variables = bctx.part_mut(VariablesP);

        assumptions.user_failed_core.clear();
        for &lit in assumptions.failed_core.iter() {
            variables.var_data_mut(lit.var()).set_failed(lit, true);
            assumptions
                .user_failed_core
                .push(variables.user_from_solver_lit(lit));
        }
    }

    // The negations of the failed assumptions form a clause implied by the formula. It is not
    // needed for further solving, so it is derived and deleted right away.
    chain.sort_unstable_by_key(|&(depth, _)| depth);
    chain.dedup_by_key(|&mut (depth, _)| depth);
    units.sort_unstable();
    units.dedup();

    let mut final_chain = units;
    final_chain.extend(chain.iter().map(|&(_, id)| id));

    let core_clause: Vec<Lit> = ctx
        .part(AssumptionsP)
        .failed_core()
        .iter()
        .map(|&lit| !lit)
        .collect();

    let id = proof::add_derived_clause(ctx.borrow(), &core_clause, &final_chain);
    proof::delete_clause(ctx.borrow(), id, &core_clause);
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::{bool, prelude::*};

    use partial_ref::IntoPartialRefMut;

    use ironsat_formula::test::conditional_pigeon_hole;

    use crate::cdcl::conflict_step;
    use crate::load::load_user_clause;

    proptest! {
        #[test]
        fn pigeon_hole_unsat_assumption_core(
            (enable_row, columns, formula) in conditional_pigeon_hole(1..5usize, 1..5usize),
            chain in bool::ANY,
        ) {
            let mut ctx = Context::default();
            let mut ctx = ctx.into_partial_ref_mut();

            for clause in formula.iter() {
                load_user_clause(ctx.borrow(), clause);
            }

            if chain {
                for (&a, &b) in enable_row.iter().zip(enable_row.iter().skip(1)) {
                    load_user_clause(ctx.borrow(), &[!a, b]);
                }
            }

            while ctx.part(SolverStateP).sat_state == SatState::Unknown {
                conflict_step(ctx.borrow());
            }

            prop_assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Sat);

            set_assumptions(ctx.borrow(), &enable_row);

            prop_assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unknown);

            while ctx.part(SolverStateP).sat_state == SatState::Unknown {
                conflict_step(ctx.borrow());
            }

            prop_assert_eq!(
                ctx.part(SolverStateP).sat_state,
                SatState::UnsatUnderAssumptions
            );

            let mut candidates = ctx.part(AssumptionsP).user_failed_core().to_owned();
            let mut core: Vec<Lit> = vec![];

            loop {
                set_assumptions(ctx.borrow(), &candidates[0..candidates.len() - 1]);

                while ctx.part(SolverStateP).sat_state == SatState::Unknown {
                    conflict_step(ctx.borrow());
                }

                match ctx.part(SolverStateP).sat_state {
                    SatState::Unknown => unreachable!(),
                    SatState::Unsat => break,
                    SatState::Sat => {
                        let skipped = *candidates.last().unwrap();
                        core.push(skipped);
                        load_user_clause(ctx.borrow(), &[skipped]);
                    },
                    SatState::UnsatUnderAssumptions => {
                        candidates = ctx.part(AssumptionsP).user_failed_core().to_owned();
                    }
                }
            }
            if chain {
                prop_assert_eq!(core.len(), 1);
            } else {
                prop_assert_eq!(core.len(), columns + 1);
            }
        }
    }
}
