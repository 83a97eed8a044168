//! Blocked clause elimination.
//!
//! A clause is blocked on one of its literals when every resolvent on that literal with the
//! irredundant clauses containing its negation is tautological. Blocked clauses can be removed:
//! whenever the removal breaks a model, flipping the blocking literal repairs it, which is
//! exactly the witness block semantics of the extension stack.
use partial_ref::{partial, PartialRef};

use log::debug;

use ironsat_formula::Lit;

use crate::clause::{db, ClauseRef};
use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, ExtensionP, OccurrencesP, SolverStateP, TmpFlagsP,
    VariablesP,
};
use crate::proof;
use crate::variables::VarFlags;

use super::pass_context;

/// Occurrence count of the negated literal above which blocking checks are skipped.
const OCCURRENCE_LIMIT: usize = 100;

/// Remove blocked clauses.
pub fn eliminate_blocked_clauses(mut ctx: pass_context!()) {
    let var_count = ctx.part(AssignmentP).assignment().len();

    let mut removed = 0usize;

    for code in 0..var_count * 2 {
        let lit = Lit::from_code(code);
        let var = lit.var();

        if ctx.part_mut(SolverStateP).should_stop() {
            break;
        }

        if !ctx.part(VariablesP).is_active(var)
            || ctx.part(VariablesP).is_frozen(var)
            || ctx.part(AssignmentP).var_value(var).is_some()
        {
            continue;
        }

        let negative_occurrences = ctx.part(OccurrencesP).count(!lit)
            + ctx.part(BinaryClausesP).implied(lit).len();
        if negative_occurrences > OCCURRENCE_LIMIT {
            continue;
        }

        // Long clauses containing lit.
        let crefs: Vec<ClauseRef> = ctx.part(OccurrencesP).occurrences(lit).to_vec();

        for cref in crefs {
            {
                let header = ctx.part(ClauseAllocP).header(cref);
                if header.deleted() || header.redundant() {
                    continue;
                }
            }

            let lits: Vec<Lit> = ctx.part(ClauseAllocP).clause(cref).lits().to_vec();

            if is_blocked(ctx.borrow(), lit, &lits) {
                ctx.part_mut(ExtensionP).push_block(lit, &lits);
                proof::delete_long_clause(ctx.borrow(), cref);
                db::delete_clause(ctx.borrow(), cref);
                for &other in lits.iter() {
                    ctx.part_mut(VariablesP)
                        .var_data_mut(other.var())
                        .flags
                        .insert(VarFlags::REMOVED);
                }
                removed += 1;
            }
        }

        // Binary clauses (lit, other) are blocked when every clause with !lit contains !other.
        let entries: Vec<_> = ctx.part(BinaryClausesP).implied(!lit).to_vec();

        for entry in entries {
            if entry.redundant {
                continue;
            }
            let lits = [lit, entry.implied];
            if is_blocked(ctx.borrow(), lit, &lits) {
                ctx.part_mut(ExtensionP).push_block(lit, &lits);
                proof::delete_clause(ctx.borrow(), entry.id, &lits);
                ctx.part_mut(BinaryClausesP)
                    .remove_binary_clause(lits, entry.id);
                ctx.part_mut(VariablesP)
                    .var_data_mut(entry.implied.var())
                    .flags
                    .insert(VarFlags::REMOVED);
                removed += 1;
            }
        }
    }

    if removed > 0 {
        debug!("blocked clause elimination removed {} clauses", removed);
    }
}

/// Whether the clause is blocked on the given literal.
///
/// Checks that every resolvent with an irredundant clause containing the negation is
/// tautological.
fn is_blocked(mut ctx: pass_context!(), lit: Lit, lits: &[Lit]) -> bool {
    for &clause_lit in lits {
        ctx.part_mut(TmpFlagsP).flags[clause_lit.code()] = true;
    }

    let mut blocked = true;

    // Binary partners of !lit: resolvent is tautological iff the partner's negation is in the
    // clause.
    for entry in ctx.part(BinaryClausesP).implied(lit) {
        if entry.redundant {
            continue;
        }
        if !ctx.part(TmpFlagsP).flags[(!entry.implied).code()] {
            blocked = false;
            break;
        }
    }

    if blocked {
        for &cref in ctx.part(OccurrencesP).occurrences(!lit) {
            let clause = ctx.part(ClauseAllocP).clause(cref);
            if clause.header().deleted() || clause.header().redundant() {
                continue;
            }
            let tautological = clause.lits().iter().any(|&other| {
                other.var() != lit.var() && ctx.part(TmpFlagsP).flags[(!other).code()]
            });
            if !tautological {
                blocked = false;
                break;
            }
        }
    }

    for &clause_lit in lits {
        ctx.part_mut(TmpFlagsP).flags[clause_lit.code()] = false;
    }

    blocked
}
