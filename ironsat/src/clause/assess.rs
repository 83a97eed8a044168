//! Clause assessment.
use partial_ref::{partial, PartialRef};

use log::debug;

use ironsat_formula::Lit;

use crate::context::{ClauseDbP, Context, ImplGraphP, TmpFlagsP};

use super::db::GLUE_HISTOGRAM_SIZE;
use super::{ClauseHeader, Tier};

/// Compute the glue level of a clause.
///
/// The glue level of a propagating clause is the number of distinct decision levels of the
/// clause's variables, also called the literal block distance (LBD). For each clause the smallest
/// glue level observed is used as an indicator of how useful that clause is.
pub fn compute_glue(
    mut ctx: partial!(Context, mut TmpFlagsP, ImplGraphP),
    lits: &[Lit],
) -> usize {
    let (tmp, ctx) = ctx.split_part_mut(TmpFlagsP);
    let impl_graph = ctx.part(ImplGraphP);
    let flags = &mut tmp.flags;

    let mut glue = 0;

    for &lit in lits {
        let level = impl_graph.level(lit.var());
        let flag = &mut flags[level];
        if !*flag {
            *flag = true;
            glue += 1
        }
    }

    for &lit in lits {
        let level = impl_graph.level(lit.var());
        flags[level] = false;
    }

    glue
}

/// Assess a newly learned clause and generate a clause header.
pub fn assess_learned_clause(
    mut ctx: partial!(Context, mut TmpFlagsP, ClauseDbP, ImplGraphP),
    lits: &[Lit],
) -> ClauseHeader {
    // This is called while the clause is still in conflict, thus the computed glue level is one
    // higher than it'll be after backtracking when the clause becomes asserting.
    let glue = compute_glue(ctx.borrow(), lits) - 1;

    let db = ctx.part(ClauseDbP);

    let mut header = ClauseHeader::new();

    header.set_glue(glue);
    header.set_tier(select_tier(glue, db.tier1_glue, db.tier2_glue));

    header
}

/// Compute the tier for a redundant clause with a given glue level.
pub fn select_tier(glue: usize, tier1_glue: u32, tier2_glue: u32) -> Tier {
    if glue <= tier1_glue as usize {
        Tier::Core
    } else if glue <= tier2_glue as usize {
        Tier::Mid
    } else {
        Tier::Local
    }
}

/// Recompute the tier glue bounds from the recent glue usage distribution.
///
/// The core tier bound is set to the glue level below which half of all recent clause uses fall,
/// the mid tier bound to the level covering ninety percent of them. With an empty histogram the
/// configured defaults are restored.
pub fn recompute_tiers(mut ctx: partial!(Context, mut ClauseDbP), tier1_glue: u32, tier2_glue: u32) {
    let db = ctx.part_mut(ClauseDbP);

    let total_used: u64 = db.glue_used.iter().sum();

    if total_used == 0 {
        db.tier1_glue = tier1_glue;
        db.tier2_glue = tier2_glue;
        return;
    }

    let tier1_limit = total_used * 50 / 100;
    let tier2_limit = total_used * 90 / 100;

    let mut accumulated = 0;
    for glue in 0..GLUE_HISTOGRAM_SIZE {
        accumulated += db.glue_used[glue];
        if accumulated <= tier1_limit {
            db.tier1_glue = glue as u32;
        }
        if accumulated >= tier2_limit {
            db.tier2_glue = glue as u32;
            break;
        }
    }

    db.glue_used = [0; GLUE_HISTOGRAM_SIZE];

    debug!(
        "recomputed tier bounds: tier1 glue {} tier2 glue {}",
        db.tier1_glue, db.tier2_glue
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    #[test]
    fn tier_selection() {
        assert_eq!(select_tier(1, 2, 6), Tier::Core);
        assert_eq!(select_tier(2, 2, 6), Tier::Core);
        assert_eq!(select_tier(3, 2, 6), Tier::Mid);
        assert_eq!(select_tier(6, 2, 6), Tier::Mid);
        assert_eq!(select_tier(7, 2, 6), Tier::Local);
    }

    #[test]
    fn tier_bounds_follow_usage() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        // Everything is used at glue 3, both bounds collapse onto it.
        for _ in 0..100 {
            ctx.part_mut(ClauseDbP).record_glue_use(3);
        }

        recompute_tiers(ctx.borrow(), 2, 6);

        assert_eq!(ctx.part(ClauseDbP).tier1_glue, 2);
        assert_eq!(ctx.part(ClauseDbP).tier2_glue, 3);

        // An empty histogram restores the defaults.
        recompute_tiers(ctx.borrow(), 2, 6);
        assert_eq!(ctx.part(ClauseDbP).tier1_glue, 2);
        assert_eq!(ctx.part(ClauseDbP).tier2_glue, 6);
    }
}
