//! Database for long clauses.
use std::mem::transmute;

use partial_ref::{partial, PartialRef};

use ironsat_formula::Lit;

use crate::context::{ClauseAllocP, ClauseDbP, Context, OccurrencesP, WatchlistsP};

use super::header::HEADER_LEN;
use super::{ClauseHeader, ClauseRef};

/// Partitions of the clause database.
///
/// The long clauses are partitioned into 4 [`Tier`]s: the irredundant clauses and three tiers of
/// redundant clauses by glue. This follows the approach described by Chanseok Oh in ["Between SAT
/// and UNSAT: The Fundamental Difference in CDCL SAT"](https://doi.org/10.1007/978-3-319-24318-4_23),
/// section 4.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Tier {
    Irred = 0,
    Core = 1,
    Mid = 2,
    Local = 3,
}

impl Tier {
    /// Total number of tiers.
    pub const fn count() -> usize {
        4
    }

    /// Cast an index into the corresponding tier.
    pub unsafe fn from_index(index: usize) -> Tier {
        debug_assert!(index < Tier::count());
        transmute(index as u8)
    }
}

/// Largest glue level tracked by the usage histogram.
pub const GLUE_HISTOGRAM_SIZE: usize = 64;

/// Database for long clauses.
///
/// Removal of clauses from the `clauses` and the `by_tier` fields can be delayed. The clause
/// header's deleted and tier fields need to be checked when iterating over these. `by_tier` may
/// also contain duplicate entries.
pub struct ClauseDb {
    /// May contain deleted clauses, see above.
    pub(crate) clauses: Vec<ClauseRef>,
    /// May contain deleted and moved clauses, see above.
    pub(crate) by_tier: [Vec<ClauseRef>; Tier::count()],
    /// These counts are always up to date.
    pub(crate) count_by_tier: [usize; Tier::count()],
    /// Size of deleted but not collected clauses.
    pub(crate) garbage_size: usize,
    /// Current glue bound of the core tier.
    pub(crate) tier1_glue: u32,
    /// Current glue bound of the mid tier.
    pub(crate) tier2_glue: u32,
    /// How often clauses of each glue level were used in conflicts since the last tier
    /// recomputation.
    pub(crate) glue_used: [u64; GLUE_HISTOGRAM_SIZE],
}

impl Default for ClauseDb {
    fn default() -> ClauseDb {
        let config = crate::config::SolverConfig::default();
        ClauseDb {
            clauses: vec![],
            by_tier: Default::default(),
            count_by_tier: Default::default(),
            garbage_size: 0,
            tier1_glue: config.tier1_glue,
            tier2_glue: config.tier2_glue,
            glue_used: [0; GLUE_HISTOGRAM_SIZE],
        }
    }
}

impl ClauseDb {
    /// The number of long clauses of a given tier.
    pub fn count_by_tier(&self, tier: Tier) -> usize {
        self.count_by_tier[tier as usize]
    }

    /// Record the use of a clause with the given glue level.
    pub fn record_glue_use(&mut self, glue: usize) {
        self.glue_used[glue.min(GLUE_HISTOGRAM_SIZE - 1)] += 1;
    }
}

/// Add a long clause to the database.
///
/// When watchlists or occurrence lists are active the new clause is registered with them.
pub fn add_clause(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut OccurrencesP,
        mut WatchlistsP,
    ),
    header: ClauseHeader,
    lits: &[Lit],
) -> ClauseRef {
    let tier = header.tier();

    let cref = ctx.part_mut(ClauseAllocP).add_clause(header, lits);

    let db = ctx.part_mut(ClauseDbP);
    db.clauses.push(cref);
    db.by_tier[tier as usize].push(cref);
    db.count_by_tier[tier as usize] += 1;

    let watchlists = ctx.part_mut(WatchlistsP);
    if watchlists.enabled() {
        watchlists.watch_clause(cref, [lits[0], lits[1]]);
    }

    let occurrences = ctx.part_mut(OccurrencesP);
    if occurrences.enabled() {
        for &lit in lits {
            occurrences.add_occurrence(lit, cref);
        }
    }

    cref
}

/// Change the tier of a long clause.
///
/// This is a noop for a clause already of the specified tier.
pub fn set_clause_tier(
    mut ctx: partial!(Context, mut ClauseDbP, mut ClauseAllocP),
    cref: ClauseRef,
    tier: Tier,
) {
    let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);
    let db = ctx.part_mut(ClauseDbP);

    let old_tier = alloc.header(cref).tier();
    if old_tier != tier {
        db.count_by_tier[old_tier as usize] -= 1;
        db.count_by_tier[tier as usize] += 1;

        alloc.header_mut(cref).set_tier(tier);
        db.by_tier[tier as usize].push(cref);
    }
}

/// Delete a long clause from the database.
///
/// This only detaches and marks the clause. The clause storage is reclaimed during the next
/// garbage collection. Proof events for the deletion have to be emitted by the caller *before*
/// calling this.
pub fn delete_clause(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut OccurrencesP,
        mut WatchlistsP,
    ),
    cref: ClauseRef,
) {
    let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);

    let header = alloc.header_mut(cref);

    debug_assert!(!header.deleted(), "delete_clause for already deleted clause");

    header.set_deleted(true);
    let len = header.len();
    let tier = header.tier();

    let db = ctx.part_mut(ClauseDbP);
    db.count_by_tier[tier as usize] -= 1;
    db.garbage_size += len + HEADER_LEN;

    let lits = unsafe {
        // The clause is still intact, only its deleted flag is set already.
        std::slice::from_raw_parts(alloc.lits_ptr_mut_unchecked(cref), len)
    };

    let watchlists = ctx.part_mut(WatchlistsP);
    if watchlists.enabled() {
        watchlists.unwatch_clause(cref, [lits[0], lits[1]]);
    }

    let occurrences = ctx.part_mut(OccurrencesP);
    if occurrences.enabled() {
        for &lit in lits.iter() {
            occurrences.remove_occurrence(lit, cref);
        }
    }
}

/// Delete a long clause unless it is protected as a reason.
pub fn try_delete_clause(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut OccurrencesP,
        mut WatchlistsP,
    ),
    cref: ClauseRef,
) -> bool {
    if ctx.part(ClauseAllocP).header(cref).protected() {
        false
    } else {
        delete_clause(ctx.borrow(), cref);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use ironsat_formula::cnf_formula;

    #[test]
    fn set_tiers_and_deletes() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let clauses = cnf_formula![
            1, 2, 3;
            4, -5, 6;
            -2, 3, -4;
            -3, 5, 2, 7, 5;
        ];

        let tiers = vec![Tier::Irred, Tier::Core, Tier::Mid, Tier::Local];
        let new_tiers = vec![Tier::Irred, Tier::Local, Tier::Local, Tier::Core];

        let mut crefs = vec![];

        for (clause, &tier) in clauses.iter().zip(tiers.iter()) {
            let mut header = ClauseHeader::new();
            header.set_tier(tier);
            let cref = add_clause(ctx.borrow(), header, clause);
            crefs.push(cref);
        }

        for (&cref, &tier) in crefs.iter().rev().zip(new_tiers.iter().rev()) {
            set_clause_tier(ctx.borrow(), cref, tier);
        }

        // We only check presence, as deletion from these lists is delayed
        assert!(ctx.part(ClauseDbP).by_tier[Tier::Irred as usize].contains(&crefs[0]));
        assert!(ctx.part(ClauseDbP).by_tier[Tier::Core as usize].contains(&crefs[3]));
        assert!(ctx.part(ClauseDbP).by_tier[Tier::Local as usize].contains(&crefs[1]));
        assert!(ctx.part(ClauseDbP).by_tier[Tier::Local as usize].contains(&crefs[2]));

        assert_eq!(ctx.part(ClauseDbP).count_by_tier(Tier::Irred), 1);
        assert_eq!(ctx.part(ClauseDbP).count_by_tier(Tier::Core), 1);
        assert_eq!(ctx.part(ClauseDbP).count_by_tier(Tier::Mid), 0);
        assert_eq!(ctx.part(ClauseDbP).count_by_tier(Tier::Local), 2);

        delete_clause(ctx.borrow(), crefs[0]);
        delete_clause(ctx.borrow(), crefs[2]);

        assert_eq!(ctx.part(ClauseDbP).count_by_tier(Tier::Irred), 0);
        assert_eq!(ctx.part(ClauseDbP).count_by_tier(Tier::Core), 1);
        assert_eq!(ctx.part(ClauseDbP).count_by_tier(Tier::Mid), 0);
        assert_eq!(ctx.part(ClauseDbP).count_by_tier(Tier::Local), 1);

        assert!(ctx.part(ClauseDbP).garbage_size > 0);
    }
}
