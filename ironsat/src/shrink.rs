//! Shrinking of learned clauses.
//!
//! Minimization removes literals of the learned clause one at a time. Shrinking is more
//! aggressive: all literals of one decision level are replaced by a single literal when the
//! block admits a level-local UIP. This is the technique described by Feng and Bacchus in
//! ["Clause Size Reduction with all-UIP Learning"](https://doi.org/10.1007/978-3-030-51825-7_3).
//!
//! The search for a local UIP resolves the block literals in reverse trail order, scheduled by a
//! priority queue over trail positions. A resolution step may only introduce literals of the
//! same block, literals already present in the learned clause or level 0 literals; anything else
//! aborts the block. Blocks are processed in ascending level order: reason literals always live
//! on lower levels, so a block only ever refers to clause literals of blocks that were already
//! processed and whose membership marks are up to date.
use std::collections::BinaryHeap;

use partial_ref::{partial, split_borrow, PartialRef};

use ironsat_formula::Lit;

use crate::analyze_conflict::AnalyzeConflict;
use crate::context::{
    AnalyzeConflictP, ClauseAllocP, Context, ImplGraphP, ProofP, TmpFlagsP, TrailP,
};
use crate::proof::Proof;
use crate::prop::ImplGraph;

/// Shrink the learned clause by replacing level blocks with their local UIPs.
///
/// Has to run directly after conflict analysis. Returns the new backtrack level and
/// re-establishes the invariant that position 1 holds a literal of the highest level besides the
/// asserting literal.
pub fn shrink_clause(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut TmpFlagsP,
        ClauseAllocP,
        ImplGraphP,
        ProofP,
        TrailP,
    ),
) -> usize {
    let (analyze, mut ctx) = ctx.split_part_mut(AnalyzeConflictP);
    let (tmp, mut ctx) = ctx.split_part_mut(TmpFlagsP);
    let (impl_graph, mut ctx) = ctx.split_part(ImplGraphP);
    split_borrow!(lit_ctx = &(ClauseAllocP) ctx);
    let proof = ctx.part(ProofP);

    let mut clause = std::mem::take(analyze.clause_mut());

    if clause.len() > 2 {
        let flags = &mut tmp.flags;

        // Mark the clause literals, resolutions may freely reuse them.
        for &lit in clause.iter() {
            flags[lit.code()] = true;
        }

        // Group the non-asserting literals by decision level, lowest level first.
        let mut by_level: Vec<(usize, Lit)> = clause[1..]
            .iter()
            .map(|&lit| (impl_graph.level(lit.var()), lit))
            .collect();
        by_level.sort_unstable();

        let mut shrunken = false;
        let mut new_clause = vec![clause[0]];

        let mut block_start = 0;
        while block_start < by_level.len() {
            let level = by_level[block_start].0;
            let mut block_end = block_start;
            while block_end < by_level.len() && by_level[block_end].0 == level {
                block_end += 1;
            }
            let block = &by_level[block_start..block_end];

            let mut replacement = None;

            if block.len() > 1 {
                replacement = shrink_block(analyze, flags, &lit_ctx, impl_graph, proof, level, block);
            }

            match replacement {
                Some(uip) => {
                    shrunken = true;
                    // Later blocks must not treat the replaced literals as clause members.
                    for &(_, lit) in block {
                        flags[lit.code()] = false;
                    }
                    flags[(!uip).code()] = true;
                    new_clause.push(!uip);
                }
                None => new_clause.extend(block.iter().map(|&(_, lit)| lit)),
            }

            block_start = block_end;
        }

        for &lit in clause.iter().chain(new_clause.iter()) {
            flags[lit.code()] = false;
        }

        if shrunken {
            clause = new_clause;
            analyze.assemble_chain();
        }
    }

    // Re-establish the position of the highest level literal besides the asserting one.
    let mut backtrack_to = 0;
    if clause.len() > 1 {
        let (prefix, rest) = clause.split_at_mut(2);
        let lit_1 = &mut prefix[1];
        backtrack_to = impl_graph.level(lit_1.var());
        for lit in rest.iter_mut() {
            let lit_level = impl_graph.level(lit.var());
            if lit_level > backtrack_to {
                backtrack_to = lit_level;
                std::mem::swap(lit_1, lit);
            }
        }
    }

    *analyze.clause_mut() = clause;

    backtrack_to
}

/// Search a single level block for a local UIP.
///
/// Returns the assigned literal dominating the block in the implication graph, or `None` when
/// the block cannot be shrunken. On success the used antecedents are recorded, on failure all
/// recordings of this block are undone.
fn shrink_block(
    analyze: &mut AnalyzeConflict,
    flags: &mut [bool],
    lit_ctx: &partial!(Context, ClauseAllocP),
    impl_graph: &ImplGraph,
    proof: &Proof,
    level: usize,
    block: &[(usize, Lit)],
) -> Option<Lit> {
    let antecedents_required = proof.antecedents_required();

    // Queue of assigned literals of this level, deepest first.
    let mut queue: BinaryHeap<(usize, Lit)> = BinaryHeap::new();
    let mut marked: Vec<Lit> = vec![];

    for &(_, lit) in block {
        let assigned = !lit;
        queue.push((impl_graph.depth(assigned.var()), assigned));
        marked.push(assigned);
        flags[assigned.code()] = true;
    }

    let chain_top = analyze.chain_len();

    let mut failed = false;

    'search: while queue.len() > 1 {
        let (depth, lit) = queue.pop().unwrap();

        let reason = impl_graph.reason(lit.var());
        if reason.is_unit() {
            // Hit the decision of this level while other literals are still open.
            failed = true;
            break;
        }

        if antecedents_required {
            if let Some(id) = reason.id(lit_ctx) {
                analyze.record_antecedent(depth, id);
            }
        }

        for &reason_lit in reason.lits(lit_ctx) {
            let reason_level = impl_graph.level(reason_lit.var());

            if reason_level == 0 {
                if antecedents_required {
                    match proof.unit_id(reason_lit.var()) {
                        Some(id) => analyze.record_unit(id),
                        None => {
                            failed = true;
                            break 'search;
                        }
                    }
                }
            } else if flags[reason_lit.code()] {
                // Already part of the learned clause.
            } else if reason_level == level {
                let assigned = !reason_lit;
                if !flags[assigned.code()] {
                    flags[assigned.code()] = true;
                    marked.push(assigned);
                    queue.push((impl_graph.depth(assigned.var()), assigned));
                }
            } else {
                // A literal of another level that is not part of the clause.
                failed = true;
                break 'search;
            }
        }
    }

    for lit in marked {
        flags[lit.code()] = false;
    }

    if failed {
        analyze.truncate_chain(chain_top);
        return None;
    }

    let (_, uip) = queue.pop().unwrap();
    Some(uip)
}
