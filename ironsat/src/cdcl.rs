//! Conflict driven clause learning.
use partial_ref::{partial, split_borrow, PartialRef};

use crate::analyze_conflict::analyze_conflict;
use crate::assumptions::{enqueue_assumption, EnqueueAssumption};
use crate::clause::{assess_learned_clause, bump_clause, db, decay_clause_activities};
use crate::context::{
    AnalyzeConflictP, AssignmentP, AssumptionsP, BinaryClausesP, ClauseActivityP, ClauseAllocP,
    ClauseDbP, Context, EmasP, ImplGraphP, OccurrencesP, PhasesP, ProofP, ScheduleP,
    SolverConfigP, SolverStateP, TmpDataP, TmpFlagsP, TrailP, VariablesP, VmtfP, VsidsP,
    WatchlistsP,
};
use crate::decision::make_decision;
use crate::proof;
use crate::prop::{backtrack, enqueue_assignment, propagate, Conflict, Reason};
use crate::shrink::shrink_clause;
use crate::simplify::{prove_units, simplify};
use crate::state::SatState;

/// Find a conflict, learn a clause and backtrack.
pub fn conflict_step(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut AssumptionsP,
        mut BinaryClausesP,
        mut ClauseActivityP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut EmasP,
        mut ImplGraphP,
        mut OccurrencesP,
        mut PhasesP,
        mut ProofP,
        mut SolverStateP,
        mut TmpDataP,
        mut TmpFlagsP,
        mut TrailP,
        mut VmtfP,
        mut VsidsP,
        mut VariablesP,
        mut WatchlistsP,
        ScheduleP,
        SolverConfigP,
    ),
) {
    let conflict = find_conflict(ctx.borrow());

    let conflict = match conflict {
        Ok(()) => {
            ctx.part_mut(SolverStateP).sat_state = SatState::Sat;
            return;
        }
        Err(FoundConflict::Assumption) => {
            ctx.part_mut(SolverStateP).sat_state = SatState::UnsatUnderAssumptions;
            return;
        }
        Err(FoundConflict::Conflict(conflict)) => conflict,
    };

    // Under chronological backtracking a conflict can involve only levels below the current
    // decision level. Analysis expects the conflict on the current level, so we unwind the
    // levels that do not take part first.
    {
        let conflict_level = {
            split_borrow!(lit_ctx = &(ClauseAllocP) ctx);
            let graph = ctx.part(ImplGraphP);
            conflict
                .lits(&lit_ctx)
                .iter()
                .map(|&lit| graph.level(lit.var()))
                .max()
                .unwrap_or(0)
        };

        if conflict_level < ctx.part(TrailP).current_level() {
            backtrack(ctx.borrow(), conflict_level);
        }
    }

    let mut backtrack_to = analyze_conflict(ctx.borrow(), conflict);

    if ctx.part(SolverConfigP).shrink && ctx.part(AnalyzeConflictP).clause().len() > 2 {
        backtrack_to = shrink_clause(ctx.borrow());
    }

    if ctx.part(TrailP).current_level() == 0 {
        // Conflict without decisions, the formula is unsatisfiable.
        let (analyze, mut ctx) = ctx.split_part(AnalyzeConflictP);
        let id = proof::add_derived_clause(ctx.borrow(), &[], analyze.chain());
        proof::conclude_unsat(ctx.borrow(), id);
        ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
        ctx.part_mut(SolverStateP).formula_unsat = true;
        return;
    }

    let (analyze, mut ctx) = ctx.split_part(AnalyzeConflictP);
    let clause = analyze.clause();

    // Assess the learned clause while the conflicting assignment is still present.
    let header = if clause.len() >= 3 {
        Some(assess_learned_clause(ctx.borrow(), clause))
    } else {
        None
    };

    let glue = match &header {
        Some(header) => header.glue(),
        None => clause.len().saturating_sub(1),
    };

    {
        let current_level = ctx.part(TrailP).current_level();
        let trail_len = ctx.part(TrailP).trail().len();
        let emas = ctx.part_mut(EmasP);
        emas.fast_glue.update(glue as f64);
        emas.slow_glue.update(glue as f64);
        emas.size.update(clause.len() as f64);
        emas.trail.update(trail_len as f64);
        emas.level.update(current_level as f64);
        emas.jump.update((current_level - backtrack_to) as f64);
    }

    for &cref in analyze.involved() {
        bump_clause(ctx.borrow(), cref);
    }

    decay_clause_activities(ctx.borrow());

    // Learned units have no clause representation, they have to be unwound to level 0. Longer
    // clauses can stay at the previous level when the backjump would be long and chronological
    // backtracking is enabled, propagation rediscovers the assignment from the stored clause.
    let current_level = ctx.part(TrailP).current_level();
    let config = ctx.part(SolverConfigP);
    let target_level = if clause.len() >= 2
        && config.chrono
        && current_level - backtrack_to > config.chrono_distance
    {
        current_level - 1
    } else {
        backtrack_to
    };

    backtrack(ctx.borrow(), target_level);

    let id = proof::add_derived_clause(ctx.borrow(), clause, analyze.chain());

    let reason = match clause.len() {
        0 => unreachable!("empty clause is handled at conflict level 0"),
        1 => {
            ctx.part_mut(ProofP).set_unit_id(clause[0].var(), id);
            Reason::Unit
        }
        2 => {
            ctx.part_mut(BinaryClausesP)
                .add_binary_clause([clause[0], clause[1]], id, true, false);
            Reason::Binary {
                falsified: [clause[1]],
                id,
            }
        }
        _ => {
            let mut header = header.unwrap();
            header.set_id(id);
            let cref = db::add_clause(ctx.borrow(), header, clause);
            Reason::Long(cref)
        }
    };

    enqueue_assignment(ctx.borrow(), clause[0], reason);
}

/// Return type of [`find_conflict`].
///
/// Specifies whether a conflict was found during propagation or while enqueuing assumptions.
enum FoundConflict {
    Conflict(Conflict),
    Assumption,
}

impl From<Conflict> for FoundConflict {
    fn from(conflict: Conflict) -> FoundConflict {
        FoundConflict::Conflict(conflict)
    }
}

/// Find a conflict.
///
/// Returns `Err` if a conflict was found and `Ok` if a satisfying assignment was found instead.
fn find_conflict(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut AssumptionsP,
        mut BinaryClausesP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut OccurrencesP,
        mut PhasesP,
        mut ProofP,
        mut SolverStateP,
        mut TmpDataP,
        mut TmpFlagsP,
        mut TrailP,
        mut VmtfP,
        mut VsidsP,
        mut VariablesP,
        mut WatchlistsP,
        ScheduleP,
        SolverConfigP,
    ),
) -> Result<(), FoundConflict> {
    loop {
        let propagation_result = propagate(ctx.borrow());

        let new_unit = prove_units(ctx.borrow());

        if let Err(conflict) = propagation_result {
            return Err(conflict.into());
        }

        if new_unit {
            simplify(ctx.borrow());
        }

        match enqueue_assumption(ctx.borrow()) {
            EnqueueAssumption::Enqueued => continue,
            EnqueueAssumption::Conflict => return Err(FoundConflict::Assumption),
            EnqueueAssumption::Done => (),
        }

        if !make_decision(ctx.borrow()) {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use partial_ref::IntoPartialRefMut;

    use ironsat_formula::{cnf_formula, test::*};

    use crate::load::load_user_clause;

    #[test]
    fn level_0_unsat() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let formula = cnf_formula![
            1, 2, 3;
            -1;
            1, -2;
            2, -3;
        ];

        for clause in formula.iter() {
            load_user_clause(ctx.borrow(), clause);
        }

        while ctx.part(SolverStateP).sat_state == SatState::Unknown {
            conflict_step(ctx.borrow());
        }

        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unsat);
    }

    proptest! {
        #[test]
        fn sgen_unsat(formula in sgen_unsat_formula(1..7usize)) {
            let mut ctx = Context::default();
            let mut ctx = ctx.into_partial_ref_mut();

            for clause in formula.iter() {
                load_user_clause(ctx.borrow(), clause);
            }

            while ctx.part(SolverStateP).sat_state == SatState::Unknown {
                conflict_step(ctx.borrow());
            }

            prop_assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unsat);
        }

        #[test]
        fn sat(formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0)) {
            let mut ctx = Context::default();
            let mut ctx = ctx.into_partial_ref_mut();

            for clause in formula.iter() {
                load_user_clause(ctx.borrow(), clause);
            }

            while ctx.part(SolverStateP).sat_state == SatState::Unknown {
                conflict_step(ctx.borrow());
            }

            prop_assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Sat);

            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|&lit| {
                    let solver_lit = ctx
                        .part(VariablesP)
                        .existing_solver_from_user(lit.var())
                        .map(|var| var.lit(lit.is_positive()));
                    match solver_lit {
                        Some(solver_lit) => ctx.part(AssignmentP).lit_is_true(solver_lit),
                        None => false,
                    }
                }));
            }
        }
    }
}
