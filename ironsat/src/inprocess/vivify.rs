//! Clause vivification.
//!
//! Vivification re-propagates the negated literals of a clause one at a time at throwaway
//! decision levels. When propagation hits a conflict or satisfies or falsifies one of the
//! remaining literals, the clause can be replaced by a shorter one. Irredundant clauses and the
//! two better redundant tiers are vivified.
use partial_ref::{partial, split_borrow, PartialRef};

use log::debug;

use ironsat_formula::Lit;

use crate::clause::{db, ClauseRef, Tier};
use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, ClauseDbP, SolverStateP, TrailP, WatchlistsP,
};
use crate::proof::{self, ClauseId};
use crate::prop::{backtrack, enqueue_assignment, propagate, Reason};

use super::{pass_context, rup_cone};

/// Number of clauses vivified per round.
const CANDIDATE_LIMIT: usize = 1000;

/// Vivify the irredundant, core and mid tier clauses.
pub fn vivify(mut ctx: pass_context!()) {
    debug_assert_eq!(ctx.part(TrailP).current_level(), 0);

    let candidates: Vec<ClauseRef> = ctx
        .part(ClauseDbP)
        .clauses
        .iter()
        .cloned()
        .filter(|&cref| {
            let header = ctx.part(ClauseAllocP).header(cref);
            !header.deleted() && header.tier() != Tier::Local
        })
        .take(CANDIDATE_LIMIT)
        .collect();

    let mut shortened = 0usize;

    for cref in candidates {
        if ctx.part_mut(SolverStateP).should_stop() {
            break;
        }
        if ctx.part(ClauseAllocP).header(cref).deleted() {
            continue;
        }
        if vivify_clause(ctx.borrow(), cref) {
            shortened += 1;
        }
    }

    backtrack(ctx.borrow(), 0);

    if shortened > 0 {
        debug!("vivification shortened {} clauses", shortened);
    }
}

/// Vivify a single clause.
///
/// Returns whether the clause was replaced by a shorter one.
fn vivify_clause(mut ctx: pass_context!(), cref: ClauseRef) -> bool {
    let lits: Vec<Lit> = ctx.part(ClauseAllocP).clause(cref).lits().to_vec();

    // Clauses satisfied at level 0 are removed by simplification instead.
    if lits
        .iter()
        .any(|&lit| ctx.part(AssignmentP).lit_is_true(lit))
    {
        return false;
    }

    // Detach the clause so it cannot propagate against itself.
    ctx.part_mut(WatchlistsP)
        .unwatch_clause(cref, [lits[0], lits[1]]);

    let mut kept: Vec<Lit> = vec![];
    let mut cone_roots: Vec<Lit> = vec![];
    let mut dropped = 0usize;
    // Set when the derivation ends in a conflicting clause instead of a propagated literal.
    let mut final_id: Option<ClauseId> = None;
    let mut new_lits: Option<Vec<Lit>> = None;

    for (pos, &lit) in lits.iter().enumerate() {
        match ctx.part(AssignmentP).lit_value(lit) {
            Some(true) => {
                // The implied literal concludes the derivation on its own: its reason cone
                // already ends in a clause conflicting with the negated shortened clause.
                let mut shorter = kept.clone();
                shorter.push(lit);
                cone_roots.clear();
                cone_roots.push(lit);
                new_lits = Some(shorter);
                break;
            }
            Some(false) => {
                // The literal is falsified by the other literals, drop it.
                cone_roots.push(!lit);
                dropped += 1;
            }
            None => {
                // Deciding the final literal cannot shorten anything when nothing was dropped.
                if pos + 1 == lits.len() && dropped == 0 {
                    break;
                }

                ctx.part_mut(TrailP).new_decision_level();
                enqueue_assignment(ctx.borrow(), !lit, Reason::Unit);

                if let Err(conflict) = propagate(ctx.borrow()) {
                    {
                        split_borrow!(lit_ctx = &(ClauseAllocP) ctx);
                        final_id = Some(conflict.id(&lit_ctx));
                        cone_roots.clear();
                        cone_roots.extend_from_slice(conflict.lits(&lit_ctx));
                    }
                    let mut shorter = kept.clone();
                    shorter.push(lit);
                    new_lits = Some(shorter);
                    break;
                }

                kept.push(lit);
            }
        }
    }

    // With only falsified literals removed, the clause itself concludes the derivation of its
    // shortened form.
    if new_lits.is_none() && dropped > 0 && !kept.is_empty() {
        final_id = Some(ctx.part(ClauseAllocP).header(cref).id());
        new_lits = Some(kept.clone());
    }

    let result = match new_lits {
        Some(new_lits) if new_lits.len() < lits.len() && !new_lits.is_empty() => {
            // The chain has to be collected while the throwaway assignment is still present.
            let mut chain = vec![];
            rup_cone(ctx.borrow(), &cone_roots, &mut chain);
            if let Some(final_id) = final_id {
                chain.push(final_id);
            }

            backtrack(ctx.borrow(), 0);

            install_shortened(ctx.borrow(), cref, &lits, &new_lits, &chain);
            true
        }
        _ => {
            backtrack(ctx.borrow(), 0);
            ctx.part_mut(WatchlistsP)
                .watch_clause(cref, [lits[0], lits[1]]);
            false
        }
    };

    result
}

/// Replace a detached clause by its shortened form.
fn install_shortened(
    mut ctx: pass_context!(),
    cref: ClauseRef,
    old_lits: &[Lit],
    new_lits: &[Lit],
    chain: &[ClauseId],
) {
    let old_id = ctx.part(ClauseAllocP).header(cref).id();
    let redundant = ctx.part(ClauseAllocP).header(cref).redundant();

    let new_id = proof::add_derived_clause(ctx.borrow(), new_lits, chain);
    proof::delete_clause(ctx.borrow(), old_id, old_lits);

    match new_lits.len() {
        0 => unreachable!("a conflict on the first decision yields a unit clause"),
        1 => {
            db::delete_clause(ctx.borrow(), cref);
            if ctx.part(AssignmentP).lit_is_unk(new_lits[0]) {
                super::assign_derived_unit(ctx.borrow(), new_lits[0], new_id);
            }
        }
        2 => {
            db::delete_clause(ctx.borrow(), cref);
            ctx.part_mut(BinaryClausesP).add_binary_clause(
                [new_lits[0], new_lits[1]],
                new_id,
                redundant,
                false,
            );
        }
        _ => {
            let removed = old_lits.len() - new_lits.len();
            {
                let clause = ctx.part_mut(ClauseAllocP).clause_mut(cref);
                clause.lits_mut()[..new_lits.len()].copy_from_slice(new_lits);
                let header = clause.header_mut();
                header.set_len(new_lits.len());
                header.set_id(new_id);
                header.set_search_pos(2);
            }
            ctx.part_mut(ClauseDbP).garbage_size += removed;
            ctx.part_mut(WatchlistsP)
                .watch_clause(cref, [new_lits[0], new_lits[1]]);
        }
    }
}
