//! Watchlists to detect clauses that became unit.
//!
//! Each long clause has two watches pointing to it, kept in the watchlists of two different
//! literals of the clause. Whenever the watches are moved to different literals the literals of
//! the clause are permuted so the watched literals are in positions 0 and 1.
//!
//! When a clause is not unit under the current assignment, the watched literals are two non-false
//! literals. When a clause is unit and thus propagating, the true literal is watched and in
//! position 0, the other watched literal is the one with the largest decision level and kept in
//! position 1. When a clause becomes satisfied before becoming unit the watches can be kept as
//! they were. There is no need to update watchlists on backtracking, as unassigning variables
//! cannot invalidate the invariant.
//!
//! Each watch also stores a blocking literal of the clause different from the watched literal.
//! When the blocking literal is true the clause is satisfied and does not have to be accessed at
//! all. See [Section 4.5.1 of the "Handbook of Satisfiability"][handbook-ch4] for details and
//! references.
//!
//! During inprocessing the watchlists are disconnected, as occurrence based simplifiers permute
//! and shrink clauses freely. They are reconnected from the clause database afterwards.
//!
//! [handbook-ch4]: https://www.satassociation.org/articles/FAIA185-0131.pdf
use partial_ref::{partial, PartialRef};

use ironsat_formula::Lit;

use crate::clause::ClauseRef;
use crate::context::{ClauseAllocP, ClauseDbP, Context, WatchlistsP};

/// A watch on a long clause.
#[derive(Copy, Clone)]
pub struct Watch {
    /// Clause which has the referring lit in position 0 or 1.
    pub cref: ClauseRef,
    /// A lit of the clause, different from the referring lit.
    pub blocking: Lit,
}

/// Watchlists to detect clauses that became unit.
pub struct Watchlists {
    /// Contains only valid data for indices of assigned variables.
    watches: Vec<Vec<Watch>>,
    /// Whether watchlists are kept up to date.
    enabled: bool,
}

impl Default for Watchlists {
    fn default() -> Watchlists {
        Watchlists {
            watches: vec![],
            enabled: true,
        }
    }
}

impl Watchlists {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.watches.resize(count * 2, vec![]);
    }

    /// Whether the watchlists are up to date.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Drop all watches and stop keeping the watchlists up to date.
    pub fn disconnect(&mut self) {
        self.enabled = false;
        self.clear();
    }

    /// Remove all watches.
    pub fn clear(&mut self) {
        for watchlist in self.watches.iter_mut() {
            watchlist.clear();
        }
    }

    /// Start watching a clause.
    ///
    /// `lits` have to be the first two literals of the given clause.
    pub fn watch_clause(&mut self, cref: ClauseRef, lits: [Lit; 2]) {
        debug_assert!(self.enabled);
        for i in 0..2 {
            let watch = Watch {
                cref,
                blocking: lits[i ^ 1],
            };
            self.watches[(!lits[i]).code()].push(watch);
        }
    }

    /// Stop watching a clause.
    ///
    /// `lits` have to be the two watched literals of the given clause.
    pub fn unwatch_clause(&mut self, cref: ClauseRef, lits: [Lit; 2]) {
        debug_assert!(self.enabled);
        for &lit in lits.iter() {
            self.watches[(!lit).code()].retain(|watch| watch.cref != cref);
        }
    }

    /// Return watches for a given literal.
    pub fn watched_by_mut(&mut self, lit: Lit) -> &mut Vec<Watch> {
        &mut self.watches[lit.code()]
    }

    /// Make a literal watch a clause.
    pub fn add_watch(&mut self, lit: Lit, watch: Watch) {
        self.watches[lit.code()].push(watch)
    }
}

/// Reconnect the watchlists by rebuilding them from the clause database.
pub fn connect_watches(
    mut ctx: partial!(Context, mut WatchlistsP, ClauseAllocP, ClauseDbP),
) {
    let (watchlists, mut ctx) = ctx.split_part_mut(WatchlistsP);
    let (alloc, ctx) = ctx.split_part(ClauseAllocP);

    watchlists.enabled = true;
    watchlists.clear();

    for &cref in ctx.part(ClauseDbP).clauses.iter() {
        let clause = alloc.clause(cref);
        if clause.header().deleted() {
            continue;
        }
        let lits = clause.lits();
        watchlists.watch_clause(cref, [lits[0], lits[1]]);
    }
}
