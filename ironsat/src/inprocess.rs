//! Inprocessing orchestration.
//!
//! Simplification runs interleave with the search on a growing conflict interval. A run executes
//! the enabled passes in a fixed order: binary clause deduplication, transitive reduction,
//! equivalent literal substitution, subsumption, vivification, covered clause elimination,
//! bounded variable elimination, blocked clause elimination, probing and autarky detection.
//!
//! The occurrence based passes need full occurrence lists and permute clauses freely, which is
//! incompatible with connected watchlists. The orchestrator owns these transitions: it
//! disconnects the watchlists and builds occurrence lists before such a pass, and afterwards
//! drops the occurrence lists, compacts the arena and reconnects the watchlists. At every pass
//! boundary the solver is fully propagated at level 0 with no falsified literals inside any
//! clause.
pub mod occur;

mod autarky;
mod block;
mod cover;
mod dedup;
mod decompose;
mod elim;
mod probe;
mod subsume;
mod transred;
mod vivify;

use partial_ref::{partial, split_borrow, PartialRef};

use log::debug;

use ironsat_formula::{Lit, LitIdx};

use crate::analyze_conflict::analyze_conflict;
use crate::clause::gc::collect_garbage_now;
use crate::context::{
    AnalyzeConflictP, AssignmentP, BinaryClausesP, ClauseAllocP, Context, ImplGraphP,
    OccurrencesP, ProofP, SolverConfigP, SolverStateP, TmpFlagsP, TrailP, WatchlistsP,
};
use crate::proof::{self, ClauseId};
use crate::prop::{connect_watches, enqueue_assignment, full_restart, propagate, Conflict, Reason};
use crate::simplify::{prove_units, simplify};
use crate::state::SatState;

/// Parts needed by the inprocessing passes.
///
/// Each pass needs almost the full context, so they share this part list. The paths are spelled
/// out so the macro expands in every pass module without further imports.
macro_rules! pass_context {
    () => {
        partial!(
            crate::context::Context,
            mut crate::context::AnalyzeConflictP,
            mut crate::context::AssignmentP,
            mut crate::context::AssumptionsP,
            mut crate::context::BinaryClausesP,
            mut crate::context::ClauseActivityP,
            mut crate::context::ClauseAllocP,
            mut crate::context::ClauseDbP,
            mut crate::context::EmasP,
            mut crate::context::ExtensionP,
            mut crate::context::ImplGraphP,
            mut crate::context::OccurrencesP,
            mut crate::context::PhasesP,
            mut crate::context::ProofP,
            mut crate::context::SolverStateP,
            mut crate::context::TmpDataP,
            mut crate::context::TmpFlagsP,
            mut crate::context::TrailP,
            mut crate::context::VariablesP,
            mut crate::context::VmtfP,
            mut crate::context::VsidsP,
            mut crate::context::WatchlistsP,
            crate::context::ScheduleP,
            crate::context::SolverConfigP,
        )
    };
}

pub(crate) use pass_context;

/// Run one inprocessing round.
pub fn inprocess(mut ctx: pass_context!()) {
    if ctx.part(SolverStateP).sat_state != SatState::Unknown {
        return;
    }

    debug!("inprocessing round starts");

    full_restart(ctx.borrow());

    if !cleanup(ctx.borrow()) {
        return;
    }

    // Binary implication graph passes, the watchlists stay connected.
    if ctx.part(SolverConfigP).dedup {
        dedup::dedup_binary_clauses(ctx.borrow());
        if !cleanup(ctx.borrow()) {
            return;
        }
    }

    if ctx.part(SolverConfigP).transred {
        transred::transitive_reduction(ctx.borrow());
        if !cleanup(ctx.borrow()) {
            return;
        }
    }

    // First occurrence phase.
    start_occurrence_phase(ctx.borrow());

    if ctx.part(SolverConfigP).decompose && ctx.part(SolverStateP).sat_state == SatState::Unknown
    {
        decompose::decompose(ctx.borrow());
    }

    if ctx.part(SolverConfigP).subsume && ctx.part(SolverStateP).sat_state == SatState::Unknown {
        subsume::subsume(ctx.borrow());
    }

    if !end_occurrence_phase(ctx.borrow()) {
        return;
    }

    if ctx.part(SolverConfigP).vivify {
        vivify::vivify(ctx.borrow());
        if !cleanup(ctx.borrow()) {
            return;
        }
    }

    // Second occurrence phase.
    start_occurrence_phase(ctx.borrow());

    if ctx.part(SolverConfigP).cover && ctx.part(SolverStateP).sat_state == SatState::Unknown {
        cover::eliminate_covered_clauses(ctx.borrow());
    }

    if ctx.part(SolverConfigP).elim && ctx.part(SolverStateP).sat_state == SatState::Unknown {
        elim::eliminate_variables(ctx.borrow());
    }

    if ctx.part(SolverConfigP).block && ctx.part(SolverStateP).sat_state == SatState::Unknown {
        block::eliminate_blocked_clauses(ctx.borrow());
    }

    if !end_occurrence_phase(ctx.borrow()) {
        return;
    }

    if ctx.part(SolverConfigP).probe {
        probe::probe(ctx.borrow());
        if !cleanup(ctx.borrow()) {
            return;
        }
    }

    if ctx.part(SolverConfigP).autarky {
        autarky::apply_autarky(ctx.borrow());
        if !cleanup(ctx.borrow()) {
            return;
        }
    }

    debug!("inprocessing round done");
}

/// Propagate, prove units and clean falsified literals out of the clauses.
///
/// Returns `false` when the solver reached a final state.
fn cleanup(mut ctx: pass_context!()) -> bool {
    debug_assert_eq!(ctx.part(TrailP).current_level(), 0);

    if let Err(conflict) = propagate(ctx.borrow()) {
        level0_conflict(ctx.borrow(), conflict);
        return false;
    }

    let new_units = prove_units(ctx.borrow());
    if new_units {
        simplify(ctx.borrow());
    }

    ctx.part(SolverStateP).sat_state == SatState::Unknown
}

/// Disconnect the watchlists and build full occurrence lists.
fn start_occurrence_phase(mut ctx: pass_context!()) {
    ctx.part_mut(WatchlistsP).disconnect();
    occur::build_occurrences(ctx.borrow());
}

/// Drop the occurrence lists, compact the arena and reconnect the watchlists.
///
/// Returns `false` when the solver reached a final state.
fn end_occurrence_phase(mut ctx: pass_context!()) -> bool {
    ctx.part_mut(OccurrencesP).disconnect();

    if ctx.part(SolverStateP).sat_state == SatState::Unknown {
        let new_units = prove_units(ctx.borrow());
        if new_units {
            simplify(ctx.borrow());
        }
    }

    collect_garbage_now(ctx.borrow());
    connect_watches(ctx.borrow());

    if ctx.part(SolverStateP).sat_state != SatState::Unknown {
        return false;
    }

    cleanup(ctx.borrow())
}

/// Handle a conflict found during propagation at level 0.
///
/// Derives the empty clause and moves the solver into the unsatisfiable state.
pub(crate) fn level0_conflict(mut ctx: pass_context!(), conflict: Conflict) {
    debug_assert_eq!(ctx.part(TrailP).current_level(), 0);

    analyze_conflict(ctx.borrow(), conflict);

    let (analyze, mut ctx) = ctx.split_part(AnalyzeConflictP);
    let id = proof::add_derived_clause(ctx.borrow(), &[], analyze.chain());
    proof::conclude_unsat(ctx.borrow(), id);
    ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
    ctx.part_mut(SolverStateP).formula_unsat = true;
}

/// Enqueue a derived unit clause at level 0.
///
/// The unit has to have been added to the proof already, with `id` being its clause id.
pub(crate) fn assign_derived_unit(mut ctx: pass_context!(), lit: Lit, id: ClauseId) {
    debug_assert_eq!(ctx.part(TrailP).current_level(), 0);
    debug_assert!(ctx.part(AssignmentP).lit_is_unk(lit));

    ctx.part_mut(ProofP).set_unit_id(lit.var(), id);
    enqueue_assignment(ctx.borrow(), lit, Reason::Unit);
}

/// Propagate using occurrence lists instead of watchlists.
///
/// Used while the watchlists are disconnected. Scans every clause of a falsified literal in
/// full, which is affordable inside the occurrence based passes.
pub(crate) fn propagate_dense(mut ctx: pass_context!()) -> Result<(), Conflict> {
    debug_assert!(ctx.part(OccurrencesP).enabled());

    while let Some(lit) = ctx.part_mut(TrailP).pop_queue() {
        // Binary implications first.
        {
            let mut propagated = vec![];
            let mut conflict = None;

            {
                let (binary, ctx) = ctx.borrow().split_part(BinaryClausesP);
                let assignment = ctx.part(AssignmentP);

                for entry in binary.implied(lit) {
                    if assignment.lit_is_false(entry.implied) {
                        conflict = Some(Conflict::Binary {
                            lits: [entry.implied, !lit],
                            id: entry.id,
                        });
                        break;
                    } else if assignment.lit_is_unk(entry.implied) {
                        propagated.push((entry.implied, entry.id));
                    }
                }
            }

            if let Some(conflict) = conflict {
                return Err(conflict);
            }

            for (implied, id) in propagated {
                if ctx.part(AssignmentP).lit_is_unk(implied) {
                    enqueue_assignment(
                        ctx.borrow(),
                        implied,
                        Reason::Binary {
                            falsified: [!lit],
                            id,
                        },
                    );
                }
            }
        }

        // Long clauses via the occurrence lists of the falsified literal.
        let crefs: Vec<_> = ctx.part(OccurrencesP).occurrences(!lit).to_vec();

        for cref in crefs {
            let mut unassigned = None;
            let mut satisfied = false;
            let mut unassigned_count = 0;

            {
                let clause = ctx.part(ClauseAllocP).clause(cref);
                if clause.header().deleted() {
                    continue;
                }
                let assignment = ctx.part(AssignmentP);
                for (pos, &clause_lit) in clause.lits().iter().enumerate() {
                    if assignment.lit_is_true(clause_lit) {
                        satisfied = true;
                        break;
                    }
                    if assignment.lit_is_unk(clause_lit) {
                        unassigned_count += 1;
                        unassigned = Some((pos, clause_lit));
                    }
                }
            }

            if satisfied {
                continue;
            }

            match (unassigned_count, unassigned) {
                (0, _) => return Err(Conflict::Long(cref)),
                (1, Some((pos, unit_lit))) => {
                    // The propagated literal has to be in position 0 for `Reason::lits`.
                    ctx.part_mut(ClauseAllocP)
                        .clause_mut(cref)
                        .lits_mut()
                        .swap(0, pos);
                    enqueue_assignment(ctx.borrow(), unit_lit, Reason::Long(cref));
                }
                _ => {}
            }
        }
    }

    Ok(())
}

/// Collect the reason cone of a set of assigned literals as a proof chain.
///
/// Starting from the reasons of the given literals, all reason clauses are gathered
/// transitively down to decisions and level 0 units. The chain is emitted in trail order with
/// level 0 unit ids first, so replaying it propagates step by step. The cone literals' variable
/// flags in `TmpFlags` are used and reset before returning.
pub(crate) fn rup_cone(
    mut ctx: partial!(
        Context,
        mut TmpFlagsP,
        ClauseAllocP,
        ImplGraphP,
        ProofP,
    ),
    roots: &[Lit],
    chain_out: &mut Vec<ClauseId>,
) {
    let (tmp, mut ctx) = ctx.split_part_mut(TmpFlagsP);
    split_borrow!(lit_ctx = &(ClauseAllocP) ctx);
    let impl_graph = ctx.part(ImplGraphP);
    let proof = ctx.part(ProofP);

    let flags = &mut tmp.flags;

    let mut chain: Vec<(LitIdx, ClauseId)> = vec![];
    let mut units: Vec<ClauseId> = vec![];
    let mut stack: Vec<Lit> = vec![];
    let mut to_clean: Vec<Lit> = vec![];

    for &root in roots {
        if !flags[root.index()] {
            flags[root.index()] = true;
            to_clean.push(root);
            stack.push(root);
        }
    }

    while let Some(lit) = stack.pop() {
        if impl_graph.level(lit.var()) == 0 {
            if let Some(id) = proof.unit_id(lit.var()) {
                units.push(id);
            }
            continue;
        }

        let reason = impl_graph.reason(lit.var());
        if reason.is_unit() {
            // A decision, assumed by the consumer of the chain.
            continue;
        }

        if let Some(id) = reason.id(&lit_ctx) {
            chain.push((impl_graph.depth(lit.var()) as LitIdx, id));
        }

        for &reason_lit in reason.lits(&lit_ctx) {
            if !flags[reason_lit.index()] {
                flags[reason_lit.index()] = true;
                to_clean.push(reason_lit);
                stack.push(reason_lit);
            }
        }
    }

    for lit in to_clean {
        flags[lit.index()] = false;
    }

    chain.sort_unstable_by_key(|&(depth, _)| depth);
    chain.dedup_by_key(|&mut (depth, _)| depth);
    units.sort_unstable();
    units.dedup();

    chain_out.clear();
    chain_out.extend(units);
    chain_out.extend(chain.iter().map(|&(_, id)| id));
}
