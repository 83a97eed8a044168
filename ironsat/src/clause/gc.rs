//! Garbage collection of long clauses.
use partial_ref::{partial, PartialRef};

use crate::context::{
    ClauseAllocP, ClauseDbP, Context, ImplGraphP, OccurrencesP, TrailP, WatchlistsP,
};
use crate::prop::Reason;

use super::{ClauseAlloc, Tier};

/// Perform a garbage collection of long clauses if necessary.
pub fn collect_garbage(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut WatchlistsP,
        OccurrencesP,
        TrailP,
    ),
) {
    let alloc = ctx.part(ClauseAllocP);
    let db = ctx.part(ClauseDbP);

    // Collecting when a fixed fraction of the allocation is garbage amortizes collection costs.
    if db.garbage_size * 2 > alloc.buffer_size() {
        collect_garbage_now(ctx.borrow());
    }
}

/// Unconditionally perform a garbage collection of long clauses.
///
/// This moves all surviving clauses into a fresh arena, grouped by their first watched literal to
/// colocate clauses that are scanned together during propagation. All clause references in
/// reasons are rewritten and the watchlists are rebuilt when they are connected.
///
/// Occurrence lists must not be connected, they are rebuilt from scratch by the inprocessing
/// orchestrator instead.
pub fn collect_garbage_now(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut WatchlistsP,
        OccurrencesP,
        TrailP,
    ),
) {
    assert!(
        !ctx.part(OccurrencesP).enabled(),
        "garbage collection with connected occurrence lists"
    );

    mark_reason_clauses(ctx.borrow());

    let (db, mut ctx) = ctx.split_part_mut(ClauseDbP);
    let (impl_graph, mut ctx) = ctx.split_part_mut(ImplGraphP);
    let alloc = ctx.part_mut(ClauseAllocP);

    assert!(
        db.garbage_size <= alloc.buffer_size(),
        "inconsistent garbage tracking in ClauseDb"
    );
    let current_size = alloc.buffer_size() - db.garbage_size;

    // Allocating just the current size would lead to an immediate growing when new clauses are
    // learned, overallocating here avoids that.
    let mut new_alloc = ClauseAlloc::with_capacity(current_size * 2);

    let mut new_clauses = vec![];
    let mut new_by_tier: [Vec<_>; Tier::count()] = Default::default();

    // Clauses sharing their first watched literal are copied adjacently: the surviving clauses
    // are traversed in order sorted by that literal.
    db.clauses.retain(|&cref| {
        let header = alloc.header(cref);
        !header.deleted()
    });
    db.clauses
        .sort_unstable_by_key(|&cref| alloc.clause(cref).lits()[0]);

    for &cref in db.clauses.iter() {
        let clause = alloc.clause(cref);
        let mut header = *clause.header();

        let clause_is_reason = header.protected();
        header.set_protected(false);
        header.set_search_pos(2);

        let new_cref = new_alloc.add_clause(header, clause.lits());

        new_clauses.push(new_cref);
        new_by_tier[header.tier() as usize].push(new_cref);

        if clause_is_reason {
            let asserted_lit = clause.lits()[0];

            debug_assert_eq!(impl_graph.reason(asserted_lit.var()), &Reason::Long(cref));
            impl_graph.update_reason(asserted_lit.var(), Reason::Long(new_cref));
        }
    }

    *ctx.part_mut(ClauseAllocP) = new_alloc;
    db.clauses = new_clauses;
    db.by_tier = new_by_tier;
    db.garbage_size = 0;

    let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);
    let watchlists = ctx.part_mut(WatchlistsP);
    if watchlists.enabled() {
        watchlists.clear();
        for &cref in db.clauses.iter() {
            let lits = alloc.clause(cref).lits();
            watchlists.watch_clause(cref, [lits[0], lits[1]]);
        }
    }
}

/// Mark clauses that are reasons of trail literals to track them through the collection.
fn mark_reason_clauses(mut ctx: partial!(Context, mut ClauseAllocP, ImplGraphP, TrailP)) {
    let (trail, mut ctx) = ctx.split_part(TrailP);
    let (alloc, ctx) = ctx.split_part_mut(ClauseAllocP);
    let impl_graph = ctx.part(ImplGraphP);

    for &lit in trail.trail().iter() {
        if let &Reason::Long(cref) = impl_graph.reason(lit.var()) {
            alloc.header_mut(cref).set_protected(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cmp::max;

    use partial_ref::IntoPartialRefMut;
    use proptest::prelude::*;

    use ironsat_formula::{cnf::strategy::*, Lit};

    use crate::clause::{db, ClauseHeader};
    use crate::context::{set_var_count, AssignmentP};
    use crate::prop::enqueue_assignment;

    proptest! {
        #[test]
        fn garbage_collection(
            input_a in cnf_formula(2..100usize, 500..1000, 3..30),
            input_b in cnf_formula(2..100usize, 10..500, 4..20),
        ) {
            let mut ctx = Context::default();
            let mut ctx = ctx.into_partial_ref_mut();

            set_var_count(ctx.borrow(), max(input_a.var_count(), input_b.var_count()));

            let mut crefs_a = vec![];
            let mut crefs_b = vec![];

            for lits in input_a.iter() {
                let header = ClauseHeader::new();
                let cref = db::add_clause(ctx.borrow(), header, lits);
                crefs_a.push(cref);
            }

            for lits in input_b.iter() {
                let header = ClauseHeader::new();
                let cref = db::add_clause(ctx.borrow(), header, lits);
                crefs_b.push(cref);

                if ctx.part(AssignmentP).lit_value(lits[0]) == None {
                    // This isn't consistent, as the clause isn't actually propagating, but that
                    // isn't checked during garbage collection
                    enqueue_assignment(ctx.borrow(), lits[0], Reason::Long(cref));
                }
            }

            for cref in crefs_a {
                db::delete_clause(ctx.borrow(), cref);
                prop_assert!(ctx.part(ClauseDbP).garbage_size > 0);
            }

            let old_buffer_size = ctx.part(ClauseAllocP).buffer_size();

            collect_garbage(ctx.borrow());

            prop_assert!(
                ctx.part(ClauseDbP).garbage_size * 2 < ctx.part(ClauseAllocP).buffer_size()
            );

            prop_assert!(old_buffer_size > ctx.part(ClauseAllocP).buffer_size());

            let mut output_clauses: Vec<Vec<Lit>> = vec![];

            for &cref in ctx.part(ClauseDbP).clauses.iter() {
                let clause = ctx.part(ClauseAllocP).clause(cref);
                prop_assert!(!clause.header().deleted());
                prop_assert!(!clause.header().protected());
                output_clauses.push(clause.lits().to_vec());
            }

            let mut input_clauses: Vec<Vec<Lit>> = input_b
                .iter()
                .map(<[Lit]>::to_vec)
                .collect();

            output_clauses.sort();
            input_clauses.sort();

            prop_assert_eq!(input_clauses, output_clauses);

            for &lit in ctx.part(TrailP).trail() {
                if let &Reason::Long(cref) = ctx.part(ImplGraphP).reason(lit.var()) {
                    prop_assert_eq!(ctx.part(ClauseAllocP).clause(cref).lits()[0], lit)
                }
            }
        }
    }
}
