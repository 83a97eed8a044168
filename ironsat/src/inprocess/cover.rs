//! Covered clause elimination.
//!
//! A literal is *covered* by a clause when it occurs in every non-tautological resolvent on one
//! of the clause's literals. Adding covered literals does not change satisfiability, and when
//! some literal of the extended clause has only tautological resolvents left (the extension is
//! blocked), the original clause can be removed.
//!
//! Every successful covering step contributes a witness block: the extension stack receives the
//! clause as extended so far with the covering literal as witness, and finally the blocked
//! extension with the blocking literal. Replaying these blocks in reverse repairs any model of
//! the remaining formula.
use partial_ref::{partial, PartialRef};

use log::debug;

use ironsat_formula::Lit;

use crate::clause::{db, ClauseRef};
use crate::context::{
    BinaryClausesP, ClauseAllocP, ClauseDbP, ExtensionP, OccurrencesP, SolverStateP, VariablesP,
};
use crate::proof;
use crate::variables::VarFlags;

use super::pass_context;

/// Number of candidate clauses checked per round.
const CANDIDATE_LIMIT: usize = 500;

/// Bound on the size of the extended clause.
const CLOSURE_LIMIT: usize = 32;

/// Occurrence count above which a literal is not used for coverage.
const OCCURRENCE_LIMIT: usize = 50;

/// Remove covered clauses.
pub fn eliminate_covered_clauses(mut ctx: pass_context!()) {
    let candidates: Vec<ClauseRef> = ctx
        .part(ClauseDbP)
        .clauses
        .iter()
        .cloned()
        .filter(|&cref| {
            let header = ctx.part(ClauseAllocP).header(cref);
            !header.deleted() && !header.redundant()
        })
        .take(CANDIDATE_LIMIT)
        .collect();

    let mut removed = 0usize;

    for cref in candidates {
        if ctx.part_mut(SolverStateP).should_stop() {
            break;
        }
        if ctx.part(ClauseAllocP).header(cref).deleted() {
            continue;
        }

        if let Some(blocks) = covered_closure(ctx.borrow(), cref) {
            let closure = blocks.last().unwrap().1.clone();

            for (witness, clause) in blocks {
                ctx.part_mut(ExtensionP).push_block(witness, &clause);
            }

            proof::delete_long_clause(ctx.borrow(), cref);
            db::delete_clause(ctx.borrow(), cref);

            for &lit in closure.iter() {
                ctx.part_mut(VariablesP)
                    .var_data_mut(lit.var())
                    .flags
                    .insert(VarFlags::REMOVED);
            }
            removed += 1;
        }
    }

    if removed > 0 {
        debug!("covered clause elimination removed {} clauses", removed);
    }
}

/// Try to extend a clause by covered literals until it becomes blocked.
///
/// Returns the witness blocks to push on success: one per covering step and a final one for the
/// blocking literal. Nothing is returned (and nothing may be pushed) when the clause cannot be
/// eliminated.
fn covered_closure(
    mut ctx: pass_context!(),
    cref: ClauseRef,
) -> Option<Vec<(Lit, Vec<Lit>)>> {
    let mut closure: Vec<Lit> = ctx.part(ClauseAllocP).clause(cref).lits().to_vec();

    let mut blocks: Vec<(Lit, Vec<Lit>)> = vec![];

    loop {
        if closure.len() > CLOSURE_LIMIT {
            return None;
        }

        let mut extended = false;

        for index in 0..closure.len() {
            let lit = closure[index];

            if ctx.part(VariablesP).is_frozen(lit.var()) {
                continue;
            }

            match coverage(ctx.borrow(), lit, &closure) {
                Coverage::Blocked => {
                    blocks.push((lit, closure.clone()));
                    return Some(blocks);
                }
                Coverage::Covered(covered) => {
                    blocks.push((lit, closure.clone()));
                    closure.extend(covered);
                    extended = true;
                    break;
                }
                Coverage::Nothing => {}
            }
        }

        if !extended {
            return None;
        }
    }
}

/// Result of examining the resolution environment of one literal.
enum Coverage {
    /// Every resolvent is tautological.
    Blocked,
    /// New literals occurring in every non-tautological resolvent.
    Covered(Vec<Lit>),
    /// Nothing to gain from this literal.
    Nothing,
}

/// Compute the literals covered by resolving on the given literal of the closure.
fn coverage(mut ctx: pass_context!(), lit: Lit, closure: &[Lit]) -> Coverage {
    let binary_partners: Vec<Lit> = ctx
        .part(BinaryClausesP)
        .implied(lit)
        .iter()
        .filter(|entry| !entry.redundant)
        .map(|entry| entry.implied)
        .collect();

    let long_partners: Vec<ClauseRef> = ctx.part(OccurrencesP).occurrences(!lit).to_vec();

    if binary_partners.len() + long_partners.len() > OCCURRENCE_LIMIT {
        return Coverage::Nothing;
    }

    let in_closure = |l: Lit| closure.contains(&l);

    let mut intersection: Option<Vec<Lit>> = None;

    let mut intersect = |intersection: &mut Option<Vec<Lit>>, candidates: Vec<Lit>| -> bool {
        let next = match intersection.take() {
            None => candidates,
            Some(previous) => previous
                .into_iter()
                .filter(|l| candidates.contains(l))
                .collect(),
        };
        let empty = next.is_empty();
        *intersection = Some(next);
        !empty
    };

    // Binary partners: the resolvent of the closure with (!lit, x) adds only x.
    for x in binary_partners {
        if in_closure(!x) {
            // Tautological resolvent.
            continue;
        }
        let candidates = if in_closure(x) { vec![] } else { vec![x] };
        if !intersect(&mut intersection, candidates) {
            return Coverage::Nothing;
        }
    }

    for cref in long_partners {
        let lits: Vec<Lit> = {
            let clause = ctx.part(ClauseAllocP).clause(cref);
            if clause.header().deleted() || clause.header().redundant() {
                continue;
            }
            clause.lits().to_vec()
        };

        let tautological = lits
            .iter()
            .any(|&other| other.var() != lit.var() && in_closure(!other));
        if tautological {
            continue;
        }

        let candidates: Vec<Lit> = lits
            .into_iter()
            .filter(|&other| other.var() != lit.var() && !in_closure(other))
            .collect();

        if !intersect(&mut intersection, candidates) {
            return Coverage::Nothing;
        }
    }

    match intersection {
        // No non-tautological resolvent exists, the closure is blocked on lit.
        None => Coverage::Blocked,
        Some(covered) => {
            debug_assert!(!covered.is_empty());
            Coverage::Covered(covered)
        }
    }
}
