//! Learns a new clause by analyzing a conflict.
use std::mem::swap;

use partial_ref::{partial, split_borrow, PartialRef};

use rustc_hash::FxHashSet;

use ironsat_formula::{Lit, LitIdx, Var};

use crate::clause::ClauseRef;
use crate::context::{
    AnalyzeConflictP, ClauseAllocP, Context, ImplGraphP, ProofP, TrailP, VmtfP, VsidsP,
};
use crate::proof::ClauseId;
use crate::prop::{Conflict, Reason};

use vec_mut_scan::VecMutScan;

/// Temporaries for conflict analysis.
#[derive(Default)]
pub struct AnalyzeConflict {
    /// This is the learned clause after analysis finishes.
    clause: Vec<Lit>,
    /// Number of literals of the current clause at the current level.
    current_level_count: usize,
    /// Variables of the current clause.
    var_flags: Vec<bool>,
    /// Entries to clean in `var_flags`.
    to_clean: Vec<Var>,
    /// Long clauses to bump.
    involved: Vec<ClauseRef>,
    /// Variables to bump.
    bumped: Vec<Var>,
    /// Antecedent ids paired with the trail depth of the propagated literal, in no particular
    /// order.
    chain: Vec<(LitIdx, ClauseId)>,
    /// Unit clause ids of level 0 literals in antecedents.
    units: Vec<ClauseId>,
    /// Deduplicates `units`.
    unit_set: FxHashSet<ClauseId>,
    /// Id of the conflicting clause.
    conflict_id: ClauseId,
    /// The assembled antecedent chain in propagation order.
    final_chain: Vec<ClauseId>,
    /// Stack for recursive minimization.
    stack: Vec<Lit>,
}

impl AnalyzeConflict {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.var_flags.resize(count, false);
    }

    /// The learned clause.
    pub fn clause(&self) -> &[Lit] {
        &self.clause
    }

    /// Mutable learned clause, used by shrinking.
    pub(crate) fn clause_mut(&mut self) -> &mut Vec<Lit> {
        &mut self.clause
    }

    /// Long clauses involved in the conflict.
    pub fn involved(&self) -> &[ClauseRef] {
        &self.involved
    }

    /// Antecedent ids justifying the learned clause, in propagation order.
    ///
    /// Empty when no attached tracer requires antecedents.
    pub fn chain(&self) -> &[ClauseId] {
        &self.final_chain
    }

    /// Record the antecedent of a propagated literal at the given trail depth.
    pub(crate) fn record_antecedent(&mut self, depth: usize, id: ClauseId) {
        self.chain.push((depth as LitIdx, id));
    }

    /// Number of recorded antecedents.
    pub(crate) fn chain_len(&self) -> usize {
        self.chain.len()
    }

    /// Undo antecedent recordings past the given length.
    pub(crate) fn truncate_chain(&mut self, len: usize) {
        self.chain.truncate(len);
    }

    /// Record the unit clause assigning a level 0 variable used in an antecedent.
    pub(crate) fn record_unit(&mut self, id: ClauseId) {
        if self.unit_set.insert(id) {
            self.units.push(id);
        }
    }

    /// Sort the collected antecedents into propagation order.
    ///
    /// Unit clauses propagate first, then the recorded reasons by trail position, the conflict
    /// clause last. Each antecedent of a chain clause is a level 0 unit, a negated literal of
    /// the learned clause or propagated by an earlier chain clause, so replaying the chain in
    /// this order derives the learned clause by unit propagation.
    pub(crate) fn assemble_chain(&mut self) {
        self.final_chain.clear();
        self.final_chain.extend_from_slice(&self.units);

        self.chain.sort_unstable_by_key(|&(depth, _)| depth);
        self.chain.dedup_by_key(|&mut (depth, _)| depth);

        self.final_chain.extend(self.chain.iter().map(|&(_, id)| id));
        self.final_chain.push(self.conflict_id);
    }
}

/// Learns a new clause by analyzing a conflict.
///
/// Returns the lowest decision level that makes the learned clause asserting. The conflict has
/// to be on the current decision level.
pub fn analyze_conflict(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut VmtfP,
        mut VsidsP,
        ClauseAllocP,
        ImplGraphP,
        ProofP,
        TrailP,
    ),
    conflict: Conflict,
) -> usize {
    split_borrow!(lit_ctx = &(ClauseAllocP) ctx);

    let antecedents_required = ctx.part(ProofP).antecedents_required();
    let conflict_id = conflict.id(&lit_ctx);

    {
        let analyze = ctx.part_mut(AnalyzeConflictP);

        analyze.clause.clear();
        analyze.involved.clear();
        analyze.bumped.clear();
        analyze.chain.clear();
        analyze.units.clear();
        analyze.unit_set.clear();
        analyze.final_chain.clear();
        analyze.conflict_id = conflict_id;
        analyze.current_level_count = 0;
    }

    // We start with all the literals of the conflicted clause.
    let conflict_lits = conflict.lits(&lit_ctx);

    for &lit in conflict_lits {
        add_literal(ctx.borrow(), lit, antecedents_required);
    }

    if ctx.part(TrailP).current_level() == 0 {
        // Conflict with no decisions, generate the empty clause.
        ctx.part_mut(AnalyzeConflictP).assemble_chain();
        return 0;
    }

    if let Conflict::Long(cref) = conflict {
        ctx.part_mut(AnalyzeConflictP).involved.push(cref);
    }

    // To get rid of all but one literal of the current level, we resolve the clause with the
    // reason for those literals. The correct order for this is reverse chronological.

    split_borrow!(ctx_trail = &(TrailP) ctx);

    for &lit in ctx_trail.part(TrailP).trail().iter().rev() {
        let analyze = ctx.part_mut(AnalyzeConflictP);
        let lit_present = &mut analyze.var_flags[lit.index()];
        // Is the lit present in the current clause?
        if *lit_present {
            *lit_present = false;
            analyze.current_level_count -= 1;
            if analyze.current_level_count == 0 {
                // lit is the last literal of the current level present in the current clause,
                // therefore the resulting clause will assert !lit so we put it in position 0.
                analyze.clause.push(!lit);
                let end = analyze.clause.len() - 1;
                analyze.clause.swap(0, end);

                break;
            } else {
                // We removed the literal and now add its reason.
                let (graph, mut ctx) = ctx.split_part(ImplGraphP);

                let reason = graph.reason(lit.var());

                let lits = reason.lits(&lit_ctx);

                if antecedents_required {
                    if let Some(id) = reason.id(&lit_ctx) {
                        let depth = graph.depth(lit.var());
                        ctx.part_mut(AnalyzeConflictP).record_antecedent(depth, id);
                    }
                }

                for &lit in lits {
                    add_literal(ctx.borrow(), lit, antecedents_required);
                }

                if let &Reason::Long(cref) = reason {
                    ctx.part_mut(AnalyzeConflictP).involved.push(cref);
                }
            }
        }
    }

    // This needs var_flags set and keeps some var_flags set.
    minimize_clause(ctx.borrow(), antecedents_required);

    let (analyze, mut ctx) = ctx.split_part_mut(AnalyzeConflictP);

    for var in analyze.to_clean.drain(..) {
        analyze.var_flags[var.index()] = false;
    }

    analyze.assemble_chain();

    // We find the highest level literal besides the asserted literal and move it into position
    // 1. This is important to ensure the watchlist constraints are not violated on backtracking.
    let mut backtrack_to = 0;

    if analyze.clause.len() > 1 {
        let (prefix, rest) = analyze.clause.split_at_mut(2);
        let lit_1 = &mut prefix[1];
        backtrack_to = ctx.part(ImplGraphP).level(lit_1.var());
        for lit in rest.iter_mut() {
            let lit_level = ctx.part(ImplGraphP).level(lit.var());
            if lit_level > backtrack_to {
                backtrack_to = lit_level;
                swap(lit_1, lit);
            }
        }
    }

    // Bump involved variables: additively for the scored heap, by requeuing in stable bump
    // order for the VMTF queue.
    ctx.part_mut(VmtfP).bump_analyzed(&mut analyze.bumped);
    ctx.part_mut(VsidsP).decay();

    backtrack_to
}

/// Add a literal to the current clause.
fn add_literal(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut VsidsP,
        ImplGraphP,
        ProofP,
        TrailP,
    ),
    lit: Lit,
    antecedents_required: bool,
) {
    let (analyze, mut ctx) = ctx.split_part_mut(AnalyzeConflictP);
    let lit_level = ctx.part(ImplGraphP).level(lit.var());
    if lit_level == 0 {
        // Literals set by unit clauses are not added, but their unit clauses take part in the
        // derivation of the learned clause.
        if antecedents_required {
            if let Some(id) = ctx.part(ProofP).unit_id(lit.var()) {
                analyze.record_unit(id);
            }
        }
    } else if !analyze.var_flags[lit.index()] {
        ctx.part_mut(VsidsP).bump(lit.var());
        analyze.bumped.push(lit.var());

        analyze.var_flags[lit.index()] = true;
        if lit_level == ctx.part(TrailP).current_level() {
            analyze.current_level_count += 1;
        } else {
            analyze.clause.push(lit);
            analyze.to_clean.push(lit.var());
        }
    }
}

/// A Bloom filter of levels.
#[derive(Default)]
struct LevelAbstraction {
    bits: u64,
}

impl LevelAbstraction {
    /// Add a level to the Bloom filter.
    pub fn add(&mut self, level: usize) {
        self.bits |= 1 << (level % 64)
    }

    /// Test whether a level could be in the Bloom filter.
    pub fn test(&self, level: usize) -> bool {
        self.bits & (1 << (level % 64)) != 0
    }
}

/// Performs recursive clause minimization.
///
/// **Note:** Requires AnalyzeConflict's var_flags to be set for exactly the variables of the
/// unminimized clause. This also sets some more var_flags, but lists them in to_clean.
///
/// This routine tries to remove some redundant literals of the learned clause. The idea is to
/// detect literals of the learned clause that are already implied by other literals of the
/// clause.
///
/// This is done by performing a DFS in the implication graph (following edges in reverse) for
/// each literal (apart from the asserting one). The search doesn't expand literals already known
/// to be implied by literals of the clause. When a decision literal that is not in the clause is
/// found, it means that the literal is not redundant.
///
/// There are two optimizations used here: The first one is to stop the search as soon as a
/// literal of a decision level not present in the clause is found. If the DFS would be continued
/// it would at some point reach the decision of that level. That decision belongs to a level not
/// in the clause and thus itself can't be in the clause. Checking whether the decision level is
/// among the clause's decision levels is done approximately using a Bloom filter.
///
/// The other optimization is to avoid duplicating work during the DFS searches. When one literal
/// is found to be redundant that means the whole search stayed within the implied literals. We
/// remember this and will not expand any of these literals for the following DFS searches.
///
/// In this implementation the var_flags array here has two purposes. At the beginning it is set
/// for all the literals of the clause. It is also used to mark the literals visited during the
/// DFS. This allows us to combine the already-visited-check with the literal-present-in-clause
/// check. It also allows for a neat implementation of the second optimization. When the search
/// finds the literal to be non-redundant, we clear var_flags for the literals we visited,
/// resetting it to the state at the beginning of the DFS. When the literal was redundant we keep
/// it as is. This means the following DFS will not expand these literals.
fn minimize_clause(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        ClauseAllocP,
        ImplGraphP,
        ProofP,
        TrailP,
    ),
    antecedents_required: bool,
) {
    let (analyze, mut ctx) = ctx.split_part_mut(AnalyzeConflictP);
    split_borrow!(lit_ctx = &(ClauseAllocP) ctx);
    let impl_graph = ctx.part(ImplGraphP);

    let mut involved_levels = LevelAbstraction::default();

    for &lit in analyze.clause.iter() {
        involved_levels.add(impl_graph.level(lit.var()));
    }

    let mut scan = VecMutScan::new(&mut analyze.clause);

    // we always keep the first literal
    scan.next();

    'next_lit: while let Some(lit) = scan.next() {
        if impl_graph.reason(lit.var()) == &Reason::Unit {
            continue;
        }

        // Start the DFS
        analyze.stack.clear();
        analyze.stack.push(!*lit);

        // Used to remember which var_flags are set during this DFS
        let top = analyze.to_clean.len();

        // Used to remember which antecedents were recorded during the DFS, so we can remove
        // them in case the literal is not redundant.
        let chain_top = analyze.chain.len();

        while let Some(lit) = analyze.stack.pop() {
            let reason = impl_graph.reason(lit.var());
            let lits = reason.lits(&lit_ctx);

            if antecedents_required {
                if let Some(id) = reason.id(&lit_ctx) {
                    let depth = impl_graph.depth(lit.var());
                    analyze.chain.push((depth as LitIdx, id));
                }
            }

            for &reason_lit in lits {
                let reason_level = impl_graph.level(reason_lit.var());

                if reason_level == 0 {
                    if antecedents_required {
                        if let Some(id) = ctx.part(ProofP).unit_id(reason_lit.var()) {
                            if analyze.unit_set.insert(id) {
                                analyze.units.push(id);
                            }
                        }
                    }
                } else if !analyze.var_flags[reason_lit.index()] {
                    // We haven't established reason_lit to be redundant and haven't visited it
                    // yet.

                    if impl_graph.reason(reason_lit.var()) == &Reason::Unit
                        || !involved_levels.test(reason_level)
                    {
                        // reason_lit is a decision not in the clause or in a decision level
                        // known not to be in the clause. Abort the search.

                        // Reset the var_flags set during _this_ DFS.
                        for lit in analyze.to_clean.drain(top..) {
                            analyze.var_flags[lit.index()] = false;
                        }
                        // Remove antecedents not needed to justify the minimized clause.
                        analyze.chain.truncate(chain_top);
                        continue 'next_lit;
                    } else {
                        analyze.var_flags[reason_lit.index()] = true;
                        analyze.to_clean.push(reason_lit.var());
                        analyze.stack.push(!reason_lit);
                    }
                }
            }
        }

        lit.remove();
    }
}
