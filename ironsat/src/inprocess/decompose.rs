//! Equivalent literal substitution.
//!
//! Strongly connected components of the binary implication graph are sets of equivalent
//! literals. All members of a component are replaced by a single representative: every clause
//! mentioning a member is rewritten, the member variables become substituted and witness blocks
//! on the extension stack recover their values from the representative after solving.
//!
//! A component containing a literal and its negation makes the formula unsatisfiable.
use partial_ref::{partial, PartialRef};

use log::debug;

use rustc_hash::FxHashMap;

use ironsat_formula::{Lit, Var};

use crate::clause::{db, ClauseHeader, ClauseRef, Tier};
use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, ExtensionP, OccurrencesP, ProofP, SolverStateP,
    VariablesP,
};
use crate::proof::{self, ClauseId};
use crate::state::SatState;
use crate::variables::{VarFlags, VarStatus};

use super::pass_context;

const UNSEEN: u32 = u32::max_value();

/// Substitute equivalent literals by their class representatives.
pub fn decompose(mut ctx: pass_context!()) {
    let var_count = ctx.part(AssignmentP).assignment().len();

    let repr = match find_representatives(ctx.borrow(), var_count) {
        Some(repr) => repr,
        None => return,
    };

    let substituted: Vec<Var> = (0..var_count)
        .map(Var::from_index)
        .filter(|&var| {
            let lit = var.positive();
            repr[lit.code()] != lit
                && ctx.part(VariablesP).is_active(var)
                && !ctx.part(VariablesP).is_frozen(var)
        })
        .collect();

    if substituted.is_empty() {
        return;
    }

    debug!("substituting {} equivalent variables", substituted.len());

    // The antecedent chains need implication paths from each member to its representative.
    // They are collected up front: the substitution itself removes binary clauses, which would
    // break path searches done on the fly.
    let mut paths: FxHashMap<Lit, Vec<ClauseId>> = FxHashMap::default();
    if ctx.part(ProofP).antecedents_required() {
        // Clause rewriting maps every literal with a differing representative, including
        // frozen component members, so paths are collected for all of them.
        for code in 0..var_count * 2 {
            let lit = Lit::from_code(code);
            if repr[code] != lit {
                if let Some(path) = find_path(ctx.borrow(), lit, repr[code]) {
                    // The consumers replay the path from the representative's end backwards.
                    paths.insert(lit, path.into_iter().rev().collect());
                }
            }
        }
    }

    for &var in substituted.iter() {
        substitute_var(ctx.borrow(), var, &repr, &paths);
    }
}

/// Compute the representative of every literal via Tarjan's algorithm on the implication graph.
///
/// Returns `None` when a component contains clashing literals, in which case the solver is moved
/// into the unsatisfiable state.
fn find_representatives(mut ctx: pass_context!(), var_count: usize) -> Option<Vec<Lit>> {
    let lit_count = var_count * 2;

    let mut repr: Vec<Lit> = (0..lit_count).map(Lit::from_code).collect();
    let mut index: Vec<u32> = vec![UNSEEN; lit_count];
    let mut lowlink: Vec<u32> = vec![0; lit_count];
    let mut on_stack: Vec<bool> = vec![false; lit_count];
    let mut scc_stack: Vec<Lit> = vec![];
    let mut next_index = 0u32;

    // Iterative Tarjan: (lit, next edge position) pairs.
    let mut call_stack: Vec<(Lit, usize)> = vec![];

    for root_code in 0..lit_count {
        let root = Lit::from_code(root_code);
        if index[root_code] != UNSEEN {
            continue;
        }
        if !literal_in_graph(ctx.borrow(), root) {
            continue;
        }

        call_stack.push((root, 0));

        while let Some(&mut (lit, ref mut edge)) = call_stack.last_mut() {
            if *edge == 0 {
                index[lit.code()] = next_index;
                lowlink[lit.code()] = next_index;
                next_index += 1;
                scc_stack.push(lit);
                on_stack[lit.code()] = true;
            }

            let next_child = {
                let binary = ctx.part(BinaryClausesP);
                let edges = binary.implied(lit);
                let mut found = None;
                while *edge < edges.len() {
                    let child = edges[*edge].implied;
                    *edge += 1;
                    if ctx.part(AssignmentP).lit_value(child).is_some() {
                        continue;
                    }
                    if index[child.code()] == UNSEEN {
                        found = Some(child);
                        break;
                    } else if on_stack[child.code()] {
                        lowlink[lit.code()] = lowlink[lit.code()].min(index[child.code()]);
                    }
                }
                found
            };

            match next_child {
                Some(child) => call_stack.push((child, 0)),
                None => {
                    call_stack.pop();
                    if let Some(&(parent, _)) = call_stack.last() {
                        lowlink[parent.code()] =
                            lowlink[parent.code()].min(lowlink[lit.code()]);
                    }

                    if lowlink[lit.code()] == index[lit.code()] {
                        // Pop the component and pick the smallest code as representative.
                        let mut members = vec![];
                        loop {
                            let member = scc_stack.pop().unwrap();
                            on_stack[member.code()] = false;
                            members.push(member);
                            if member == lit {
                                break;
                            }
                        }

                        let leader = *members.iter().min().unwrap();

                        for &member in members.iter() {
                            if members.contains(&!member) {
                                report_clashing_equivalence(ctx.borrow(), member);
                                return None;
                            }
                            repr[member.code()] = leader;
                            repr[(!member).code()] = !leader;
                        }
                    }
                }
            }
        }
    }

    Some(repr)
}

/// Whether a literal has any binary implication graph edges worth exploring.
fn literal_in_graph(mut ctx: pass_context!(), lit: Lit) -> bool {
    ctx.part(AssignmentP).lit_value(lit).is_none()
        && ctx.part(VariablesP).is_active(lit.var())
        && !ctx.part(BinaryClausesP).implied(lit).is_empty()
}

/// Derive the contradiction of a literal equivalent to its own negation.
fn report_clashing_equivalence(mut ctx: pass_context!(), lit: Lit) {
    let to_neg = find_path(ctx.borrow(), lit, !lit).unwrap_or_default();
    let unit_neg = proof::add_derived_clause(ctx.borrow(), &[!lit], &to_neg);

    let to_pos = find_path(ctx.borrow(), !lit, lit).unwrap_or_default();
    let unit_pos = proof::add_derived_clause(ctx.borrow(), &[lit], &to_pos);

    let empty = proof::add_derived_clause(ctx.borrow(), &[], &[unit_neg, unit_pos]);
    proof::conclude_unsat(ctx.borrow(), empty);

    ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
    ctx.part_mut(SolverStateP).formula_unsat = true;
}

/// Find the clause ids along an implication path between two literals.
fn find_path(mut ctx: pass_context!(), from: Lit, to: Lit) -> Option<Vec<ClauseId>> {
    let binary = ctx.part(BinaryClausesP);

    let mut parent: FxHashMap<Lit, (Lit, ClauseId)> = FxHashMap::default();
    let mut queue = vec![from];
    let mut next = 0;

    while next < queue.len() {
        let lit = queue[next];
        next += 1;

        for entry in binary.implied(lit) {
            if entry.implied == to {
                let mut ids = vec![entry.id];
                let mut back = lit;
                while back != from {
                    let &(prev, id) = parent.get(&back).unwrap();
                    ids.push(id);
                    back = prev;
                }
                ids.reverse();
                return Some(ids);
            }
            if entry.implied != from && !parent.contains_key(&entry.implied) {
                parent.insert(entry.implied, (lit, entry.id));
                queue.push(entry.implied);
            }
        }
    }

    None
}

/// Replace all occurrences of a variable by its representative.
fn substitute_var(
    mut ctx: pass_context!(),
    var: Var,
    repr: &[Lit],
    paths: &FxHashMap<Lit, Vec<ClauseId>>,
) {
    let lit = var.positive();
    let leader = repr[lit.code()];

    // Witness blocks recover the substituted value from the representative.
    ctx.part_mut(ExtensionP)
        .push_block(lit, &[lit, !leader]);
    ctx.part_mut(ExtensionP)
        .push_block(!lit, &[!lit, leader]);

    for &polarity in [lit, !lit].iter() {
        // Long clauses.
        let crefs: Vec<_> = ctx.part(OccurrencesP).occurrences(polarity).to_vec();
        for cref in crefs {
            if ctx.part(ClauseAllocP).header(cref).deleted() {
                continue;
            }
            rewrite_clause(ctx.borrow(), cref, repr, paths);
        }

        // Binary clauses: the implications of `!polarity` are the clauses containing
        // `polarity`.
        let entries: Vec<_> = ctx.part(BinaryClausesP).implied(!polarity).to_vec();
        for entry in entries {
            rewrite_binary(ctx.borrow(), [polarity, entry.implied], entry.id, repr, paths);
        }
    }

    let data = ctx.part_mut(VariablesP).var_data_mut(var);
    data.status = VarStatus::Substituted;
    data.flags.insert(VarFlags::REMOVED);
}

/// Build the antecedent chain justifying a rewritten clause.
fn substitution_chain(
    mut ctx: pass_context!(),
    old_lits: &[Lit],
    repr: &[Lit],
    paths: &FxHashMap<Lit, Vec<ClauseId>>,
    old_id: ClauseId,
) -> Vec<ClauseId> {
    let mut chain = vec![];
    if ctx.part(ProofP).antecedents_required() {
        for &old in old_lits {
            if repr[old.code()] != old {
                if let Some(path) = paths.get(&old) {
                    chain.extend_from_slice(path);
                }
            }
        }
    }
    chain.push(old_id);
    chain
}

/// Rewrite one long clause through the representative map.
fn rewrite_clause(
    mut ctx: pass_context!(),
    cref: ClauseRef,
    repr: &[Lit],
    paths: &FxHashMap<Lit, Vec<ClauseId>>,
) {
    let old_lits: Vec<Lit> = ctx.part(ClauseAllocP).clause(cref).lits().to_vec();
    let old_id = ctx.part(ClauseAllocP).header(cref).id();
    let tier = ctx.part(ClauseAllocP).header(cref).tier();
    let glue = ctx.part(ClauseAllocP).header(cref).glue();

    let mut new_lits: Vec<Lit> = old_lits.iter().map(|&l| repr[l.code()]).collect();
    new_lits.sort_unstable();
    new_lits.dedup();

    let tautology = new_lits
        .windows(2)
        .any(|pair| pair[0] == !pair[1]);

    proof::delete_long_clause(ctx.borrow(), cref);
    db::delete_clause(ctx.borrow(), cref);

    if tautology {
        return;
    }

    let chain = substitution_chain(ctx.borrow(), &old_lits, repr, paths, old_id);
    let new_id = proof::add_derived_clause(ctx.borrow(), &new_lits, &chain);

    install_rewritten(ctx.borrow(), &new_lits, new_id, tier, glue);
}

/// Rewrite one binary clause through the representative map.
fn rewrite_binary(
    mut ctx: pass_context!(),
    old_lits: [Lit; 2],
    old_id: ClauseId,
    repr: &[Lit],
    paths: &FxHashMap<Lit, Vec<ClauseId>>,
) {
    let mut new_lits: Vec<Lit> = old_lits.iter().map(|&l| repr[l.code()]).collect();
    new_lits.sort_unstable();
    new_lits.dedup();

    let tautology = new_lits.len() == 2 && new_lits[0] == !new_lits[1];

    proof::delete_clause(ctx.borrow(), old_id, &old_lits);
    ctx.part_mut(BinaryClausesP)
        .remove_binary_clause(old_lits, old_id);

    if tautology {
        return;
    }

    let chain = substitution_chain(ctx.borrow(), &old_lits, repr, paths, old_id);
    let new_id = proof::add_derived_clause(ctx.borrow(), &new_lits, &chain);

    install_rewritten(ctx.borrow(), &new_lits, new_id, Tier::Irred, 0);
}

/// Install a rewritten clause of any resulting length.
fn install_rewritten(
    mut ctx: pass_context!(),
    lits: &[Lit],
    id: ClauseId,
    tier: Tier,
    glue: usize,
) {
    match *lits {
        [] => {
            proof::conclude_unsat(ctx.borrow(), id);
            ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
            ctx.part_mut(SolverStateP).formula_unsat = true;
        }
        [unit] => {
            if ctx.part(AssignmentP).lit_is_unk(unit) {
                super::assign_derived_unit(ctx.borrow(), unit, id);
            } else if ctx.part(AssignmentP).lit_is_false(unit) {
                let mut chain = vec![];
                if let Some(falsifying) = ctx.part(ProofP).unit_id(unit.var()) {
                    chain.push(falsifying);
                }
                chain.push(id);
                let empty = proof::add_derived_clause(ctx.borrow(), &[], &chain);
                proof::conclude_unsat(ctx.borrow(), empty);
                ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
                ctx.part_mut(SolverStateP).formula_unsat = true;
            }
        }
        [a, b] => {
            ctx.part_mut(BinaryClausesP)
                .add_binary_clause([a, b], id, tier != Tier::Irred, false);
        }
        _ => {
            let mut header = ClauseHeader::new();
            header.set_tier(tier);
            header.set_glue(glue);
            header.set_id(id);
            db::add_clause(ctx.borrow(), header, lits);
        }
    }
}
