//! Subsumption and self-subsuming resolution.
//!
//! A clause subsumes every clause containing all its literals; the larger clause is removed. If
//! a clause would subsume another except for exactly one literal occurring negated, resolving on
//! that literal *strengthens* the larger clause by removing the negated literal.
//!
//! Only clauses containing a variable that was added since the last round are considered as
//! subsuming candidates.
use partial_ref::{partial, PartialRef};

use log::debug;

use ironsat_formula::Lit;

use crate::clause::{db, ClauseRef, Tier};
use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, ClauseDbP, OccurrencesP, TmpFlagsP, VariablesP,
};
use crate::proof::{self, ClauseId};
use crate::variables::VarFlags;

use super::{level0_conflict, pass_context, propagate_dense};

/// The subsuming candidate currently checked against the occurrence lists.
enum Candidate {
    Long(ClauseRef),
    Binary([Lit; 2], ClauseId, bool),
}

/// Perform backward subsumption and self-subsuming resolution.
pub fn subsume(mut ctx: pass_context!()) {
    let mut subsumed = 0usize;
    let mut strengthened = 0usize;

    // Binary candidates first, they are the strongest subsumers.
    let var_count = ctx.part(AssignmentP).assignment().len();
    for code in 0..var_count * 2 {
        let lit = Lit::from_code(code);
        let clause_lit = !lit;

        let entries: Vec<_> = ctx.part(BinaryClausesP).implied(lit).to_vec();
        for entry in entries {
            if clause_lit > entry.implied {
                continue;
            }
            let added = |l: Lit| {
                ctx.part(VariablesP)
                    .var_data(l.var())
                    .flags
                    .contains(VarFlags::ADDED)
            };
            if !added(clause_lit) && !added(entry.implied) {
                continue;
            }
            let candidate =
                Candidate::Binary([clause_lit, entry.implied], entry.id, entry.redundant);
            check_candidate(ctx.borrow(), candidate, &mut subsumed, &mut strengthened);
        }
    }

    // Long candidates.
    let crefs: Vec<_> = ctx.part(ClauseDbP).clauses.clone();
    for cref in crefs {
        if ctx.part(ClauseAllocP).header(cref).deleted() {
            continue;
        }
        let has_added = ctx
            .part(ClauseAllocP)
            .clause(cref)
            .lits()
            .iter()
            .any(|&lit| {
                ctx.part(VariablesP)
                    .var_data(lit.var())
                    .flags
                    .contains(VarFlags::ADDED)
            });
        if !has_added {
            continue;
        }
        check_candidate(
            ctx.borrow(),
            Candidate::Long(cref),
            &mut subsumed,
            &mut strengthened,
        );
    }

    // Units derived by strengthening are propagated densely. Their reasons are turned into
    // unit clauses right away, so clauses deleted by later passes are never cited afterwards.
    if let Err(conflict) = propagate_dense(ctx.borrow()) {
        level0_conflict(ctx.borrow(), conflict);
        return;
    }
    crate::simplify::prove_units(ctx.borrow());

    for index in 0..var_count {
        ctx.part_mut(VariablesP)
            .var_data_mut(ironsat_formula::Var::from_index(index))
            .flags
            .remove(VarFlags::ADDED);
    }

    if subsumed > 0 || strengthened > 0 {
        debug!(
            "subsumption removed {} and strengthened {} clauses",
            subsumed, strengthened
        );
    }
}

/// Check one subsuming candidate against the occurrence lists of its rarest literal.
fn check_candidate(
    mut ctx: pass_context!(),
    candidate: Candidate,
    subsumed: &mut usize,
    strengthened: &mut usize,
) {
    let (lits, candidate_id, candidate_redundant, candidate_cref) = match candidate {
        Candidate::Long(cref) => {
            let header = ctx.part(ClauseAllocP).header(cref);
            let id = header.id();
            let redundant = header.redundant();
            let lits: Vec<Lit> = ctx.part(ClauseAllocP).clause(cref).lits().to_vec();
            (lits, id, redundant, Some(cref))
        }
        Candidate::Binary(lits, id, redundant) => (lits.to_vec(), id, redundant, None),
    };

    let min_lit = *lits
        .iter()
        .min_by_key(|&&lit| ctx.part(OccurrencesP).count(lit))
        .unwrap();

    for &lit in lits.iter() {
        ctx.part_mut(TmpFlagsP).flags[lit.code()] = true;
    }

    let targets: Vec<_> = ctx.part(OccurrencesP).occurrences(min_lit).to_vec();

    for target in targets {
        if Some(target) == candidate_cref {
            continue;
        }
        if ctx.part(ClauseAllocP).header(target).deleted() {
            continue;
        }
        if ctx.part(ClauseAllocP).header(target).len() < lits.len() {
            continue;
        }

        let mut matched = 0;
        let mut negated = None;
        let mut negated_count = 0;

        {
            let flags = &ctx.part(TmpFlagsP).flags;
            for &target_lit in ctx.part(ClauseAllocP).clause(target).lits() {
                if flags[target_lit.code()] {
                    matched += 1;
                } else if flags[(!target_lit).code()] {
                    negated = Some(target_lit);
                    negated_count += 1;
                }
            }
        }

        if matched == lits.len() {
            // Deleting an irredundant clause subsumed by a redundant one would lose it to the
            // next reduction, so the subsuming clause takes its place.
            if candidate_redundant && !ctx.part(ClauseAllocP).header(target).redundant() {
                match candidate_cref {
                    Some(cref) => db::set_clause_tier(ctx.borrow(), cref, Tier::Irred),
                    None => {
                        ctx.part_mut(BinaryClausesP)
                            .set_redundant([lits[0], lits[1]], candidate_id, false);
                    }
                }
            }
            proof::delete_long_clause(ctx.borrow(), target);
            db::delete_clause(ctx.borrow(), target);
            *subsumed += 1;
        } else if matched == lits.len() - 1 && negated_count == 1 {
            let remove = negated.unwrap();
            strengthen_long(ctx.borrow(), target, remove, candidate_id);
            *strengthened += 1;
        }
    }

    for &lit in lits.iter() {
        ctx.part_mut(TmpFlagsP).flags[lit.code()] = false;
    }
}

/// Remove one literal from a long clause by self-subsuming resolution.
fn strengthen_long(
    mut ctx: pass_context!(),
    cref: ClauseRef,
    remove: Lit,
    subsuming_id: ClauseId,
) {
    let old_lits: Vec<Lit> = ctx.part(ClauseAllocP).clause(cref).lits().to_vec();
    let old_id = ctx.part(ClauseAllocP).header(cref).id();

    let new_lits: Vec<Lit> = old_lits
        .iter()
        .cloned()
        .filter(|&lit| lit != remove)
        .collect();

    let new_id = proof::add_derived_clause(ctx.borrow(), &new_lits, &[subsuming_id, old_id]);
    proof::delete_clause(ctx.borrow(), old_id, &old_lits);

    ctx.part_mut(VariablesP)
        .var_data_mut(remove.var())
        .flags
        .insert(VarFlags::REMOVED);

    match new_lits.len() {
        0 => unreachable!("strengthening only applies to long clauses"),
        1 => {
            db::delete_clause(ctx.borrow(), cref);
            if ctx.part(AssignmentP).lit_is_unk(new_lits[0]) {
                super::assign_derived_unit(ctx.borrow(), new_lits[0], new_id);
            }
        }
        2 => {
            let redundant = ctx.part(ClauseAllocP).header(cref).redundant();
            db::delete_clause(ctx.borrow(), cref);
            ctx.part_mut(BinaryClausesP).add_binary_clause(
                [new_lits[0], new_lits[1]],
                new_id,
                redundant,
                false,
            );
        }
        _ => {
            ctx.part_mut(OccurrencesP).remove_occurrence(remove, cref);
            let clause = ctx.part_mut(ClauseAllocP).clause_mut(cref);
            clause.lits_mut()[..new_lits.len()].copy_from_slice(&new_lits);
            let header = clause.header_mut();
            header.set_len(new_lits.len());
            header.set_id(new_id);
            header.set_search_pos(2);
            ctx.part_mut(ClauseDbP).garbage_size += 1;
        }
    }
}
