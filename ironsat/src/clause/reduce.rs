//! Clause database reduction.
use std::mem::replace;

use partial_ref::{partial, PartialRef};

use log::debug;

use ordered_float::OrderedFloat;
use vec_mut_scan::VecMutScan;

use crate::context::{
    ClauseAllocP, ClauseDbP, Context, ImplGraphP, OccurrencesP, ProofP, TrailP, VariablesP,
    WatchlistsP,
};
use crate::proof;
use crate::prop::Reason;

use super::db::{set_clause_tier, try_delete_clause, Tier};
use super::gc::collect_garbage;

/// Reduce the clause database.
///
/// Clauses that are currently reasons on the trail are protected. Half of the local tier is
/// deleted, ordered by glue and activity, and mid tier clauses that were not used since the last
/// reduction are demoted into the local tier. Afterwards the arena is compacted when enough
/// garbage accumulated.
pub fn reduce(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut OccurrencesP,
        mut ProofP,
        mut WatchlistsP,
        TrailP,
        VariablesP,
    ),
) {
    protect_reason_clauses(ctx.borrow(), true);

    reduce_locals(ctx.borrow());
    reduce_mids(ctx.borrow());

    protect_reason_clauses(ctx.borrow(), false);

    collect_garbage(ctx.borrow());

    let db = ctx.part(ClauseDbP);
    debug!(
        "reduced: irred: {} core: {} mid: {} local: {}",
        db.count_by_tier(Tier::Irred),
        db.count_by_tier(Tier::Core),
        db.count_by_tier(Tier::Mid),
        db.count_by_tier(Tier::Local),
    );
}

/// Set or clear the protected bit of all current reason clauses.
fn protect_reason_clauses(
    mut ctx: partial!(Context, mut ClauseAllocP, ImplGraphP, TrailP),
    protected: bool,
) {
    let (trail, mut ctx) = ctx.split_part(TrailP);
    let (alloc, ctx) = ctx.split_part_mut(ClauseAllocP);
    let impl_graph = ctx.part(ImplGraphP);

    for &lit in trail.trail().iter() {
        if let &Reason::Long(cref) = impl_graph.reason(lit.var()) {
            alloc.header_mut(cref).set_protected(protected);
        }
    }
}

/// Remove deleted and duplicate entries from a by_tier clause list.
///
/// This has the side effect of setting the mark bit on all clauses of the tier.
fn dedup_and_mark_by_tier(mut ctx: partial!(Context, mut ClauseAllocP, mut ClauseDbP), tier: Tier) {
    let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);
    let by_tier = &mut ctx.part_mut(ClauseDbP).by_tier[tier as usize];

    by_tier.retain(|&cref| {
        let header = alloc.header_mut(cref);
        let retain = !header.deleted() && !header.mark() && header.tier() == tier;
        if retain {
            header.set_mark(true);
        }
        retain
    })
}

/// Reduce the number of local tier clauses by deleting half of them.
fn reduce_locals(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut OccurrencesP,
        mut ProofP,
        mut WatchlistsP,
        VariablesP,
    ),
) {
    dedup_and_mark_by_tier(ctx.borrow(), Tier::Local);

    let mut locals = replace(
        &mut ctx.part_mut(ClauseDbP).by_tier[Tier::Local as usize],
        vec![],
    );

    // Delete worst first: highest glue, then lowest activity.
    locals.sort_unstable_by_key(|&cref| {
        let header = ctx.part(ClauseAllocP).header(cref);
        (
            std::cmp::Reverse(header.glue()),
            OrderedFloat(header.activity()),
        )
    });

    let mut to_delete = locals.len() / 2;

    let mut scan = VecMutScan::new(&mut locals);

    while let Some(cref) = scan.next() {
        ctx.part_mut(ClauseAllocP).header_mut(*cref).set_mark(false);

        if to_delete > 0 && !ctx.part(ClauseAllocP).header(*cref).protected() {
            proof::delete_long_clause(ctx.borrow(), *cref);
            let deleted = try_delete_clause(ctx.borrow(), *cref);
            debug_assert!(deleted);
            cref.remove();
            to_delete -= 1;
        }
    }

    drop(scan);

    ctx.part_mut(ClauseDbP).count_by_tier[Tier::Local as usize] = locals.len();
    ctx.part_mut(ClauseDbP).by_tier[Tier::Local as usize] = locals;
}

/// Reduce the number of mid tier clauses by moving inactive ones to the local tier.
fn reduce_mids(mut ctx: partial!(Context, mut ClauseAllocP, mut ClauseDbP)) {
    dedup_and_mark_by_tier(ctx.borrow(), Tier::Mid);

    let mut mids = replace(
        &mut ctx.part_mut(ClauseDbP).by_tier[Tier::Mid as usize],
        vec![],
    );

    mids.retain(|&cref| {
        let active = {
            let header = ctx.part_mut(ClauseAllocP).header_mut(cref);
            header.set_mark(false);
            let active = header.active();
            header.set_active(false);
            active
        };

        if active {
            true
        } else {
            set_clause_tier(ctx.borrow(), cref, Tier::Local);
            false
        }
    });

    ctx.part_mut(ClauseDbP).count_by_tier[Tier::Mid as usize] = mids.len();
    ctx.part_mut(ClauseDbP).by_tier[Tier::Mid as usize] = mids;
}
