//! Bounded variable elimination.
//!
//! A variable is eliminated by replacing all clauses containing it with the non-tautological
//! resolvents of its positive and negative occurrences. This is bounded: a variable is only
//! eliminated when the number of resolvents does not exceed the number of removed clauses by
//! more than the configured growth.
//!
//! When the variable is functionally defined by an AND gate, only resolvents between gate and
//! non-gate clauses are needed, which often makes elimination of definitions possible where the
//! full resolvent count would be quadratic.
//!
//! The removed clauses are pushed onto the extension stack with the eliminated literal as
//! witness, so model reconstruction can assign the variable afterwards.
use partial_ref::{partial, PartialRef};

use log::debug;

use ironsat_formula::{Lit, Var};

use crate::clause::{db, ClauseHeader, ClauseRef, Tier};
use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, ExtensionP, OccurrencesP, SolverConfigP,
    SolverStateP, TmpFlagsP, VariablesP,
};
use crate::proof::{self, ClauseId};
use crate::state::SatState;
use crate::variables::{VarFlags, VarStatus};

use super::{level0_conflict, pass_context, propagate_dense};

/// One clause containing the candidate variable.
#[derive(Clone)]
struct OccClause {
    /// All literals, including the candidate literal.
    lits: Vec<Lit>,
    id: ClauseId,
    /// Reference for long clauses, `None` for binary clauses.
    cref: Option<ClauseRef>,
    /// Whether the clause belongs to a gate definition of the candidate.
    gate: bool,
}

/// Eliminate variables by bounded clause distribution.
pub fn eliminate_variables(mut ctx: pass_context!()) {
    let var_count = ctx.part(AssignmentP).assignment().len();
    let occurrence_limit = ctx.part(SolverConfigP).elim_occurrence_limit;

    let candidates: Vec<Var> = (0..var_count)
        .map(Var::from_index)
        .filter(|&var| {
            let variables = ctx.part(VariablesP);
            variables.is_active(var)
                && !variables.is_frozen(var)
                && variables.var_data(var).flags.contains(VarFlags::REMOVED)
                && ctx.part(AssignmentP).var_value(var).is_none()
        })
        .collect();

    let mut eliminated = 0usize;

    for var in candidates {
        if ctx.part_mut(SolverStateP).should_stop() {
            break;
        }
        if ctx.part(SolverStateP).sat_state != SatState::Unknown {
            return;
        }
        if !ctx.part(VariablesP).is_active(var)
            || ctx.part(AssignmentP).var_value(var).is_some()
        {
            continue;
        }

        if try_eliminate(ctx.borrow(), var, occurrence_limit) {
            eliminated += 1;
        }

        ctx.part_mut(VariablesP)
            .var_data_mut(var)
            .flags
            .remove(VarFlags::REMOVED);
    }

    // Turn the reasons of densely propagated units into unit clauses right away, so clauses
    // deleted by later passes are never cited afterwards.
    if let Err(conflict) = propagate_dense(ctx.borrow()) {
        level0_conflict(ctx.borrow(), conflict);
        return;
    }
    crate::simplify::prove_units(ctx.borrow());

    if eliminated > 0 {
        debug!("eliminated {} variables", eliminated);
    }
}

/// Attempt to eliminate a single variable.
fn try_eliminate(mut ctx: pass_context!(), var: Var, occurrence_limit: usize) -> bool {
    let pos = var.positive();
    let neg = var.negative();

    let mut pos_clauses = match gather_occurrences(ctx.borrow(), pos, occurrence_limit) {
        Some(clauses) => clauses,
        None => return false,
    };
    let mut neg_clauses = match gather_occurrences(ctx.borrow(), neg, occurrence_limit) {
        Some(clauses) => clauses,
        None => return false,
    };

    find_and_gate(ctx.borrow(), pos, &mut pos_clauses, &mut neg_clauses);
    let have_gate = pos_clauses.iter().chain(neg_clauses.iter()).any(|c| c.gate);

    let original_count = pos_clauses.len() + neg_clauses.len();
    let growth = ctx.part(SolverConfigP).elim_growth;

    // Count and collect the necessary resolvents.
    let mut resolvents: Vec<(Vec<Lit>, ClauseId, ClauseId)> = vec![];

    for p in pos_clauses.iter() {
        for n in neg_clauses.iter() {
            // With a gate definition, resolvents among gate clauses and among non-gate clauses
            // are tautological or redundant.
            if have_gate && p.gate == n.gate {
                continue;
            }
            if let Some(resolvent) = resolve(ctx.borrow(), &p.lits, &n.lits, var) {
                resolvents.push((resolvent, p.id, n.id));
                if resolvents.len() > original_count + growth {
                    return false;
                }
            }
        }
    }

    debug!(
        "eliminating {:?}: {} occurrences, {} resolvents",
        var,
        original_count,
        resolvents.len()
    );

    // Add the resolvents.
    for (lits, pos_id, neg_id) in resolvents {
        let id = proof::add_derived_clause(ctx.borrow(), &lits, &[pos_id, neg_id]);
        match lits.len() {
            0 => {
                proof::conclude_unsat(ctx.borrow(), id);
                ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
                ctx.part_mut(SolverStateP).formula_unsat = true;
                return false;
            }
            1 => {
                if ctx.part(AssignmentP).lit_is_unk(lits[0]) {
                    super::assign_derived_unit(ctx.borrow(), lits[0], id);
                }
            }
            2 => {
                ctx.part_mut(BinaryClausesP)
                    .add_binary_clause([lits[0], lits[1]], id, false, false);
            }
            _ => {
                let mut header = ClauseHeader::new();
                header.set_tier(Tier::Irred);
                header.set_id(id);
                db::add_clause(ctx.borrow(), header, &lits);
            }
        }
        for &lit in lits.iter() {
            ctx.part_mut(VariablesP)
                .var_data_mut(lit.var())
                .flags
                .insert(VarFlags::ADDED);
        }
    }

    // Push the original clauses onto the extension stack and remove them. The witness is the
    // literal of the eliminated variable.
    for clauses in [pos_clauses, neg_clauses].iter() {
        for clause in clauses.iter() {
            let witness = if clause.lits.contains(&pos) { pos } else { neg };
            ctx.part_mut(ExtensionP).push_block(witness, &clause.lits);

            proof::delete_clause(ctx.borrow(), clause.id, &clause.lits);
            match clause.cref {
                Some(cref) => db::delete_clause(ctx.borrow(), cref),
                None => {
                    ctx.part_mut(BinaryClausesP)
                        .remove_binary_clause([clause.lits[0], clause.lits[1]], clause.id);
                }
            }
            for &lit in clause.lits.iter() {
                ctx.part_mut(VariablesP)
                    .var_data_mut(lit.var())
                    .flags
                    .insert(VarFlags::REMOVED);
            }
        }
    }

    // Redundant binary clauses with the eliminated variable were not part of the distribution,
    // drop them so nothing references the variable anymore.
    for &polarity in [pos, neg].iter() {
        let redundant: Vec<_> = ctx
            .part(BinaryClausesP)
            .implied(!polarity)
            .iter()
            .filter(|entry| entry.redundant)
            .cloned()
            .collect();
        for entry in redundant {
            proof::delete_clause(ctx.borrow(), entry.id, &[polarity, entry.implied]);
            ctx.part_mut(BinaryClausesP)
                .remove_binary_clause([polarity, entry.implied], entry.id);
        }
    }

    ctx.part_mut(VariablesP).var_data_mut(var).status = VarStatus::Eliminated;

    true
}

/// Collect the clauses containing the given literal.
///
/// Returns `None` when the occurrence limit is exceeded or a redundant long clause contains the
/// literal, which would be lost by elimination.
fn gather_occurrences(
    mut ctx: pass_context!(),
    lit: Lit,
    occurrence_limit: usize,
) -> Option<Vec<OccClause>> {
    let mut clauses = vec![];

    // Binary occurrences: the implications of `!lit` are the clauses containing `lit`.
    for entry in ctx.part(BinaryClausesP).implied(!lit) {
        if entry.redundant {
            continue;
        }
        clauses.push(OccClause {
            lits: vec![lit, entry.implied],
            id: entry.id,
            cref: None,
            gate: false,
        });
    }

    for &cref in ctx.part(OccurrencesP).occurrences(lit) {
        let clause = ctx.part(ClauseAllocP).clause(cref);
        let header = clause.header();
        if header.deleted() {
            continue;
        }
        if header.redundant() {
            // Redundant clauses with the candidate are simply dropped on elimination. That is
            // sound, but here they would be dropped without a proof event ordering guarantee,
            // so such candidates are skipped instead.
            return None;
        }
        clauses.push(OccClause {
            lits: clause.lits().to_vec(),
            id: header.id(),
            cref: Some(cref),
            gate: false,
        });
    }

    if clauses.len() > occurrence_limit {
        return None;
    }

    Some(clauses)
}

/// Detect an AND gate definition of the candidate literal.
///
/// Searches for a clause `(lit, !a, !b, ...)` where every `(!lit, x)` exists as a binary
/// clause: then `lit <-> a & b & ...` and the gate clauses are marked.
fn find_and_gate(
    mut ctx: pass_context!(),
    lit: Lit,
    pos_clauses: &mut [OccClause],
    neg_clauses: &mut [OccClause],
) {
    // Mark the binary implications of lit: `lit -> x` for gate inputs x.
    let implied: Vec<Lit> = ctx
        .part(BinaryClausesP)
        .implied(lit)
        .iter()
        .filter(|entry| !entry.redundant)
        .map(|entry| entry.implied)
        .collect();

    if implied.is_empty() {
        return;
    }

    for &implied_lit in implied.iter() {
        ctx.part_mut(TmpFlagsP).flags[implied_lit.code()] = true;
    }

    let mut gate_clause = None;

    for (index, clause) in pos_clauses.iter().enumerate() {
        if clause.cref.is_none() {
            continue;
        }
        let all_inputs = clause
            .lits
            .iter()
            .all(|&l| l == lit || ctx.part(TmpFlagsP).flags[(!l).code()]);
        if all_inputs {
            gate_clause = Some(index);
            break;
        }
    }

    if let Some(index) = gate_clause {
        let inputs: Vec<Lit> = pos_clauses[index]
            .lits
            .iter()
            .cloned()
            .filter(|&l| l != lit)
            .collect();
        pos_clauses[index].gate = true;

        // The binary clauses (!lit, x) for the gate inputs are the other half of the gate.
        for clause in neg_clauses.iter_mut() {
            if clause.cref.is_none() && inputs.contains(&!clause.lits[1]) {
                clause.gate = true;
            }
        }
    }

    for &implied_lit in implied.iter() {
        ctx.part_mut(TmpFlagsP).flags[implied_lit.code()] = false;
    }
}

/// Resolve two clauses on the given variable.
///
/// Returns `None` for tautological resolvents.
fn resolve(
    mut ctx: pass_context!(),
    pos_lits: &[Lit],
    neg_lits: &[Lit],
    var: Var,
) -> Option<Vec<Lit>> {
    let mut resolvent = vec![];

    {
        let flags = &mut ctx.part_mut(TmpFlagsP).flags;

        for &lit in pos_lits.iter() {
            if lit.var() != var && !flags[lit.code()] {
                flags[lit.code()] = true;
                resolvent.push(lit);
            }
        }
    }

    let mut tautology = false;

    for &lit in neg_lits.iter() {
        if lit.var() == var {
            continue;
        }
        let flags = &ctx.part(TmpFlagsP).flags;
        if flags[(!lit).code()] {
            tautology = true;
            break;
        }
        if !flags[lit.code()] {
            resolvent.push(lit);
        }
    }

    // Only the positive side's literals were marked; the negative side's unmarked literals were
    // pushed unmarked, duplicates among them are impossible within one clause.
    let flags = &mut ctx.part_mut(TmpFlagsP).flags;
    for &lit in pos_lits.iter() {
        if lit.var() != var {
            flags[lit.code()] = false;
        }
    }

    if tautology {
        None
    } else {
        Some(resolvent)
    }
}
