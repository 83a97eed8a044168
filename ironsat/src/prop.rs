//! Unit propagation.
pub mod assignment;
pub mod binary;
pub mod graph;
pub mod long;
pub mod watch;

pub use assignment::{
    backtrack, enqueue_assignment, full_restart, restart, Assignment, Trail,
};
pub use graph::{Conflict, ImplGraph, ImplNode, Reason};
pub use watch::{connect_watches, Watch, Watchlists};

use partial_ref::{partial, PartialRef};

use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, Context, ImplGraphP, TrailP, WatchlistsP,
};

/// Propagate all enqueued assignments.
///
/// Propagates binary clauses of each assignment before inspecting the long clauses watched by
/// it, as binary propagation is much cheaper.
///
/// On conflict the clause that became falsified is returned and the remaining queue is left in
/// place. On success the queue is fully drained and the watchlist invariants hold for all
/// assigned literals.
pub fn propagate(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClauseAllocP,
        mut ImplGraphP,
        mut TrailP,
        mut WatchlistsP,
        BinaryClausesP,
    ),
) -> Result<(), Conflict> {
    while let Some(lit) = ctx.part_mut(TrailP).pop_queue() {
        binary::propagate_binary(ctx.borrow(), lit)?;
        long::propagate_long(ctx.borrow(), lit)?;
    }
    Ok(())
}
