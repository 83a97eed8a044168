//! Binary clause deduplication.
//!
//! Removes duplicated binary clauses and resolves clashing pairs: the clauses `(a, b)` and
//! `(a, !b)` resolve to the unit `a`.
use partial_ref::{partial, PartialRef};

use log::debug;

use rustc_hash::{FxHashMap, FxHashSet};

use ironsat_formula::Lit;

use crate::context::{AssignmentP, BinaryClausesP};
use crate::proof::{self, ClauseId};

use super::{assign_derived_unit, pass_context};

/// Remove duplicated binary clauses and derive units from clashing pairs.
pub fn dedup_binary_clauses(mut ctx: pass_context!()) {
    let var_count = ctx.part(AssignmentP).assignment().len();

    let mut duplicates: Vec<(Lit, Lit, ClauseId)> = vec![];
    let mut units: Vec<(Lit, ClauseId, ClauseId)> = vec![];

    let mut seen: FxHashMap<Lit, ClauseId> = FxHashMap::default();
    let mut clashing: FxHashSet<Lit> = FxHashSet::default();

    for code in 0..var_count * 2 {
        let lit = Lit::from_code(code);
        // The implications of `lit` correspond to the clauses containing `!lit`.
        let clause_lit = !lit;

        seen.clear();
        clashing.clear();

        for entry in ctx.part(BinaryClausesP).implied(lit) {
            if let Some(&first_id) = seen.get(&entry.implied) {
                if first_id != entry.id {
                    duplicates.push((clause_lit, entry.implied, entry.id));
                }
                continue;
            }
            seen.insert(entry.implied, entry.id);

            if let Some(&clash_id) = seen.get(&!entry.implied) {
                // (clause_lit, other) and (clause_lit, !other) resolve to clause_lit.
                if clashing.insert(clause_lit) {
                    units.push((clause_lit, clash_id, entry.id));
                }
            }
        }
    }

    let mut removed = 0;
    for (a, b, id) in duplicates {
        proof::delete_clause(ctx.borrow(), id, &[a, b]);
        ctx.part_mut(BinaryClausesP).remove_binary_clause([a, b], id);
        removed += 1;
    }

    let mut derived = 0;
    for (unit, id_a, id_b) in units {
        if !ctx.part(AssignmentP).lit_is_unk(unit) {
            continue;
        }
        let id = proof::add_derived_clause(ctx.borrow(), &[unit], &[id_a, id_b]);
        assign_derived_unit(ctx.borrow(), unit, id);
        derived += 1;
    }

    if removed > 0 || derived > 0 {
        debug!(
            "deduplication removed {} binary clauses and derived {} units",
            removed, derived
        );
    }
}
