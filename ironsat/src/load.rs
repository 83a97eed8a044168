//! Loading clauses into the solver.
use partial_ref::{partial, PartialRef};

use ironsat_formula::Lit;

use crate::clause::{db, ClauseHeader, Tier};
use crate::context::{
    AnalyzeConflictP, AssignmentP, AssumptionsP, BinaryClausesP, ClauseAllocP, ClauseDbP, Context,
    ExtensionP, ImplGraphP, OccurrencesP, PhasesP, ProofP, SolverStateP, TmpDataP, TmpFlagsP,
    TrailP, VariablesP, VmtfP, VsidsP, WatchlistsP,
};
use crate::extend::restore_vars;
use crate::proof;
use crate::prop::{enqueue_assignment, full_restart, Reason};
use crate::state::SatState;
use crate::variables::{solver_from_user_lits, VarFlags};

/// Adds a clause in user literals to the current formula.
///
/// Reactivates eliminated variables referenced by the clause, allocating solver variables for
/// variables used for the first time.
pub fn load_user_clause(
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
    user_lits: &[Lit],
) {
    let mut solver_lits = vec![];
    solver_from_user_lits(ctx.borrow(), &mut solver_lits, user_lits);

    restore_vars(ctx.borrow(), &solver_lits);

    load_clause(ctx.borrow(), &solver_lits);
}

/// Adds a clause to the current formula.
///
/// Removes duplicated literals, ignores tautological clauses (eg. x v -x v y), handles empty
/// clauses and dispatches among unit, binary and long clauses.
///
/// Does not adjust the solver's variable count. If necessary that has to be done before calling
/// this.
pub fn load_clause(
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
        mut VariablesP,
        mut VmtfP,
        mut VsidsP,
        mut WatchlistsP,
    ),
    lits: &[Lit],
) {
    match ctx.part(SolverStateP).sat_state {
        SatState::Unsat => return,
        SatState::Sat => {
            ctx.part_mut(SolverStateP).sat_state = SatState::Unknown;
        }
        _ => {}
    }

    // Restart the search when the user adds new clauses.
    full_restart(ctx.borrow());

    let id = proof::add_original_clause(ctx.borrow(), lits);

    let (tmp_data, mut ctx) = ctx.split_part_mut(TmpDataP);

    tmp_data.lits.clear();
    tmp_data.lits.extend_from_slice(lits);
    let lits = &mut tmp_data.lits;
    let simplified_lits = &mut tmp_data.lits_2;

    lits.sort_unstable();
    lits.dedup();

    // Detect tautological clauses
    let mut last = None;

    for &lit in lits.iter() {
        if last == Some(!lit) {
            proof::delete_clause(ctx.borrow(), id, lits);
            return;
        }
        last = Some(lit);
    }

    // Remove false literals and satisfied clauses. The removed literals are all falsified by
    // unit clauses, which justify the simplified clause in the proof.
    simplified_lits.clear();

    let antecedents_required = ctx.part(ProofP).antecedents_required();
    let mut chain = vec![];

    for &lit in lits.iter() {
        match ctx.part(AssignmentP).lit_value(lit) {
            Some(true) => {
                proof::delete_clause(ctx.borrow(), id, lits);
                return;
            }
            Some(false) => {
                if antecedents_required {
                    if let Some(unit_id) = ctx.part(ProofP).unit_id(lit.var()) {
                        chain.push(unit_id);
                    }
                }
            }
            None => {
                simplified_lits.push(lit);
            }
        }
    }

    let mut clause_id = id;

    if ctx.part(ProofP).is_active() && simplified_lits.len() < lits.len() {
        chain.push(id);
        clause_id = proof::add_derived_clause(ctx.borrow(), simplified_lits, &chain);
        proof::delete_clause(ctx.borrow(), id, lits);
    }

    for &lit in simplified_lits.iter() {
        ctx.part_mut(VariablesP)
            .var_data_mut(lit.var())
            .flags
            .insert(VarFlags::ADDED);
    }

    match simplified_lits[..] {
        [] => {
            proof::conclude_unsat(ctx.borrow(), clause_id);
            ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
            ctx.part_mut(SolverStateP).formula_unsat = true;
        }
        [lit] => {
            ctx.part_mut(ProofP).set_unit_id(lit.var(), clause_id);
            enqueue_assignment(ctx.borrow(), lit, Reason::Unit);
        }
        [lit_0, lit_1] => {
            ctx.part_mut(BinaryClausesP)
                .add_binary_clause([lit_0, lit_1], clause_id, false, false);
        }
        _ => {
            let mut header = ClauseHeader::new();
            header.set_tier(Tier::Irred);
            header.set_id(clause_id);

            db::add_clause(ctx.borrow(), header, simplified_lits);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use ironsat_formula::lits;

    #[test]
    fn unsat_on_empty_clause() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_user_clause(ctx.borrow(), &[]);

        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unsat);
    }

    #[test]
    fn unit_clauses() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_user_clause(ctx.borrow(), &lits![1]);

        assert_eq!(ctx.part(TrailP).trail().len(), 1);

        load_user_clause(ctx.borrow(), &lits![3, -3]);

        assert_eq!(ctx.part(TrailP).trail().len(), 1);

        load_user_clause(ctx.borrow(), &lits![-2]);

        assert_eq!(ctx.part(TrailP).trail().len(), 2);

        load_user_clause(ctx.borrow(), &lits![1, 1]);

        assert_eq!(ctx.part(TrailP).trail().len(), 2);

        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unknown);

        load_user_clause(ctx.borrow(), &lits![2]);

        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unsat);
    }

    #[test]
    fn binary_clauses() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_user_clause(ctx.borrow(), &lits![1, 2]);

        assert_eq!(ctx.part(BinaryClausesP).count(), 1);

        load_user_clause(ctx.borrow(), &lits![-1, 3, 3]);

        assert_eq!(ctx.part(BinaryClausesP).count(), 2);

        load_user_clause(ctx.borrow(), &lits![4, -4]);

        assert_eq!(ctx.part(BinaryClausesP).count(), 2);

        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unknown);
    }

    #[test]
    fn long_clauses() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_user_clause(ctx.borrow(), &lits![1, 2, 3]);

        assert_eq!(ctx.part(ClauseDbP).count_by_tier(Tier::Irred), 1);

        load_user_clause(ctx.borrow(), &lits![-2, 3, 3, 4]);

        assert_eq!(ctx.part(ClauseDbP).count_by_tier(Tier::Irred), 2);

        load_user_clause(ctx.borrow(), &lits![4, -5, 5, 2]);

        assert_eq!(ctx.part(ClauseDbP).count_by_tier(Tier::Irred), 2);

        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unknown);
    }
}
