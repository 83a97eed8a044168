//! Failed literal probing with hyper-binary resolution.
//!
//! A probe decides a single literal at a throwaway decision level and propagates. If that leads
//! to a conflict, the negation of the probe is a unit clause. Otherwise every literal that was
//! propagated through a long clause gives rise to a *hyper-binary resolvent*: the binary clause
//! connecting the probe to the propagated literal, obtained by resolving the long reason with
//! the binary reasons of its falsified literals.
//!
//! Roots of the binary implication graph are probed: literals with incoming but no outgoing
//! binary implications, as all other literals are propagated by some root probe anyway.
use partial_ref::{partial, split_borrow, PartialRef};

use log::debug;

use rustc_hash::FxHashSet;

use ironsat_formula::Lit;

use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, ImplGraphP, SolverStateP, TrailP, VariablesP,
};
use crate::proof;
use crate::prop::{backtrack, enqueue_assignment, propagate, Reason};

use super::{level0_conflict, pass_context, rup_cone};

/// Number of probes tried per round.
const PROBE_LIMIT: usize = 1000;

/// Probe failed literals and derive hyper-binary resolvents.
pub fn probe(mut ctx: pass_context!()) {
    debug_assert_eq!(ctx.part(TrailP).current_level(), 0);

    let probes = collect_probes(ctx.borrow());

    let mut failed = 0usize;
    let mut hyper = 0usize;

    for probe_lit in probes {
        if ctx.part_mut(SolverStateP).should_stop() {
            break;
        }
        if ctx.part(SolverStateP).sat_state != crate::state::SatState::Unknown {
            return;
        }
        if !ctx.part(AssignmentP).lit_is_unk(probe_lit) {
            continue;
        }

        ctx.part_mut(TrailP).new_decision_level();
        enqueue_assignment(ctx.borrow(), probe_lit, Reason::Unit);

        match propagate(ctx.borrow()) {
            Err(conflict) => {
                // Failed literal: the negation of the probe is a unit clause.
                let mut chain = vec![];
                {
                    split_borrow!(lit_ctx = &(ClauseAllocP) ctx);
                    let conflict_lits = conflict.lits(&lit_ctx).to_vec();
                    let conflict_id = conflict.id(&lit_ctx);
                    rup_cone(ctx.borrow(), &conflict_lits, &mut chain);
                    chain.push(conflict_id);
                }

                backtrack(ctx.borrow(), 0);

                let unit = !probe_lit;
                let id = proof::add_derived_clause(ctx.borrow(), &[unit], &chain);
                super::assign_derived_unit(ctx.borrow(), unit, id);
                failed += 1;

                if let Err(conflict) = propagate(ctx.borrow()) {
                    level0_conflict(ctx.borrow(), conflict);
                    return;
                }
            }
            Ok(()) => {
                hyper += add_hyper_binaries(ctx.borrow(), probe_lit);
                backtrack(ctx.borrow(), 0);
            }
        }
    }

    if failed > 0 || hyper > 0 {
        debug!(
            "probing failed {} literals and added {} hyper-binary resolvents",
            failed, hyper
        );
    }
}

/// Literals worth probing: roots of the binary implication graph.
fn collect_probes(mut ctx: pass_context!()) -> Vec<Lit> {
    let var_count = ctx.part(AssignmentP).assignment().len();
    let mut probes = vec![];

    for code in 0..var_count * 2 {
        let lit = Lit::from_code(code);
        if !ctx.part(VariablesP).is_active(lit.var()) {
            continue;
        }
        if !ctx.part(AssignmentP).lit_is_unk(lit) {
            continue;
        }
        // A root implies something but nothing implies it.
        if ctx.part(BinaryClausesP).implied(lit).is_empty() {
            continue;
        }
        if !ctx.part(BinaryClausesP).implied(!lit).is_empty() {
            continue;
        }
        probes.push(lit);
        if probes.len() >= PROBE_LIMIT {
            break;
        }
    }

    probes
}

/// Derive hyper-binary resolvents for the literals the probe propagated through long clauses.
fn add_hyper_binaries(mut ctx: pass_context!(), probe_lit: Lit) -> usize {
    let trail: Vec<Lit> = {
        let trail = ctx.part(TrailP);
        let begin = trail.level_start(1);
        trail.trail()[begin..].to_vec()
    };

    let mut existing: FxHashSet<(usize, usize)> = FxHashSet::default();
    let mut added = 0usize;

    for &lit in trail.iter().skip(1) {
        let reason = *ctx.part(ImplGraphP).reason(lit.var());

        if let Reason::Long(_) = reason {
            // The probe dominates every level 1 assignment, so (!probe, lit) is a valid
            // hyper-binary resolvent. Skip it when an equivalent binary already exists.
            let key = ((!probe_lit).code(), lit.code());
            if !existing.insert(key) {
                continue;
            }
            let duplicate = ctx
                .part(BinaryClausesP)
                .implied(probe_lit)
                .iter()
                .any(|entry| entry.implied == lit);
            if duplicate {
                continue;
            }

            let mut chain = vec![];
            rup_cone(ctx.borrow(), &[lit], &mut chain);

            let lits = [!probe_lit, lit];
            let id = proof::add_derived_clause(ctx.borrow(), &lits, &chain);
            ctx.part_mut(BinaryClausesP)
                .add_binary_clause(lits, id, true, true);
            added += 1;
        }
    }

    added
}
