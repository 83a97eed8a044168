//! Simplification using unit clauses.
use partial_ref::{partial, split_borrow, PartialRef};

use ironsat_formula::Lit;

use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, ClauseDbP, Context, ImplGraphP, OccurrencesP,
    ProofP, TrailP, VariablesP, WatchlistsP,
};
use crate::proof;
use crate::variables::{VarFlags, VarStatus};

/// Turn the level 0 trail into unit clauses.
///
/// The level 0 assignments are removed from the trail, their reasons become pseudo unit clauses
/// and, with a proof attached, each propagated assignment is derived as an explicit unit clause.
/// Those unit clause ids justify later removals of falsified literals.
///
/// Returns whether any new unit was found.
pub fn prove_units(
    mut ctx: partial!(
        Context,
        mut ImplGraphP,
        mut ProofP,
        mut TrailP,
        mut VariablesP,
        ClauseAllocP,
    ),
) -> bool {
    if ctx.part(TrailP).current_level() != 0 {
        return false;
    }

    if ctx.part(TrailP).trail().is_empty() {
        return false;
    }

    let mut new_unit = false;

    let trail_copy: Vec<Lit> = ctx.part(TrailP).trail().to_vec();

    for &lit in trail_copy.iter() {
        new_unit = true;

        let reason = *ctx.part(ImplGraphP).reason(lit.var());

        if !reason.is_unit() && ctx.part(ProofP).is_active() {
            let mut chain = vec![];
            {
                split_borrow!(lit_ctx = &(ClauseAllocP) ctx);
                for &reason_lit in reason.lits(&lit_ctx) {
                    if let Some(unit_id) = ctx.part(ProofP).unit_id(reason_lit.var()) {
                        chain.push(unit_id);
                    }
                }
                if let Some(id) = reason.id(&lit_ctx) {
                    chain.push(id);
                }
            }
            let id = proof::add_derived_clause(ctx.borrow(), &[lit], &chain);
            ctx.part_mut(ProofP).set_unit_id(lit.var(), id);
        }

        ctx.part_mut(ImplGraphP).update_removed_unit(lit.var());
        let var_data = ctx.part_mut(VariablesP).var_data_mut(lit.var());
        if var_data.status == VarStatus::Active {
            var_data.status = VarStatus::Fixed;
        }
    }

    ctx.part_mut(TrailP).clear();

    new_unit
}

/// Remove satisfied clauses and falsified literals from the long clauses.
///
/// Can only run with fully propagated level 0 assignments and without connected occurrence
/// lists. The watched literals of an unsatisfied clause are never falsified, so shrinking a
/// clause in place keeps its watches intact.
pub fn simplify(
    mut ctx: partial!(
        Context,
        mut BinaryClausesP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut OccurrencesP,
        mut ProofP,
        mut VariablesP,
        mut WatchlistsP,
        AssignmentP,
    ),
) {
    assert!(!ctx.part(OccurrencesP).enabled());

    simplify_binary(ctx.borrow());

    let crefs: Vec<_> = ctx.part(ClauseDbP).clauses.clone();

    let antecedents_required = ctx.part(ProofP).antecedents_required();

    let mut old_lits = vec![];
    let mut new_lits = vec![];
    let mut chain = vec![];

    for cref in crefs {
        {
            let clause = ctx.part(ClauseAllocP).clause(cref);
            if clause.header().deleted() {
                continue;
            }
            old_lits.clear();
            old_lits.extend_from_slice(clause.lits());
        }

        let mut satisfied = false;
        new_lits.clear();
        chain.clear();

        for &lit in old_lits.iter() {
            match ctx.part(AssignmentP).lit_value(lit) {
                Some(true) => {
                    satisfied = true;
                    break;
                }
                Some(false) => {
                    if antecedents_required {
                        if let Some(unit_id) = ctx.part(ProofP).unit_id(lit.var()) {
                            chain.push(unit_id);
                        }
                    }
                }
                None => new_lits.push(lit),
            }
        }

        if satisfied {
            proof::delete_long_clause(ctx.borrow(), cref);
            crate::clause::db::delete_clause(ctx.borrow(), cref);
            mark_removed_vars(ctx.borrow(), &old_lits);
            continue;
        }

        if new_lits.len() == old_lits.len() {
            continue;
        }

        let old_id = ctx.part(ClauseAllocP).header(cref).id();
        chain.push(old_id);
        let new_id = proof::add_derived_clause(ctx.borrow(), &new_lits, &chain);
        proof::delete_clause(ctx.borrow(), old_id, &old_lits);

        match new_lits[..] {
            // Cannot have empty or unit clauses after full propagation. An empty clause would
            // have been a conflict and a unit clause must be satisfied and thus would have been
            // dropped above.
            [] | [_] => unreachable!(),
            [lit_0, lit_1] => {
                let redundant = ctx.part(ClauseAllocP).header(cref).redundant();
                ctx.part_mut(BinaryClausesP)
                    .add_binary_clause([lit_0, lit_1], new_id, redundant, false);
                crate::clause::db::delete_clause(ctx.borrow(), cref);
            }
            ref lits => {
                let removed = old_lits.len() - lits.len();
                {
                    let clause = ctx.part_mut(ClauseAllocP).clause_mut(cref);
                    clause.lits_mut()[..lits.len()].copy_from_slice(lits);
                    let header = clause.header_mut();
                    header.set_len(lits.len());
                    header.set_id(new_id);
                    header.set_search_pos(2);
                }
                ctx.part_mut(ClauseDbP).garbage_size += removed;
            }
        }

        mark_removed_vars(ctx.borrow(), &old_lits);
    }
}

/// Remove satisfied binary clauses and derive units from binary clauses with a falsified
/// literal.
///
/// Binary clauses with a falsified literal cannot occur here: their other literal is implied, so
/// after full propagation such a clause is always satisfied and removed.
fn simplify_binary(
    mut ctx: partial!(
        Context,
        mut BinaryClausesP,
        mut ProofP,
        mut VariablesP,
        AssignmentP,
    ),
) {
    let count = ctx.part(AssignmentP).assignment().len() * 2;

    let mut deleted = vec![];

    for code in 0..count {
        // The list at `code` holds the implications of its literal, i.e. the clauses containing
        // the negation of that literal.
        let clause_lit = !Lit::from_code(code);

        {
            let bctx = ctx.borrow();
            let (binary, bctx) = bctx.split_part_mut(BinaryClausesP);
            let assignment = bctx.part(AssignmentP);

            binary.implied_mut(!clause_lit).retain(|entry| {
                let satisfied = assignment.lit_is_true(clause_lit)
                    || assignment.lit_is_true(entry.implied);
                // Each binary clause is stored in two lists, report it once.
                if satisfied && clause_lit < entry.implied {
                    deleted.push((entry.id, [clause_lit, entry.implied]));
                }
                !satisfied
            });
        }

        for (id, lits) in deleted.drain(..) {
            proof::delete_clause(ctx.borrow(), id, &lits);
            ctx.part_mut(VariablesP)
                .var_data_mut(lits[0].var())
                .flags
                .insert(VarFlags::REMOVED);
            ctx.part_mut(VariablesP)
                .var_data_mut(lits[1].var())
                .flags
                .insert(VarFlags::REMOVED);
        }
    }

    ctx.part_mut(BinaryClausesP).recount();
}

/// Mark the variables of a removed clause as elimination candidates.
fn mark_removed_vars(mut ctx: partial!(Context, mut VariablesP), lits: &[Lit]) {
    for &lit in lits {
        ctx.part_mut(VariablesP)
            .var_data_mut(lit.var())
            .flags
            .insert(VarFlags::REMOVED);
    }
}
