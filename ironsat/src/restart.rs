//! Restarts.
//!
//! In focused mode restarts are driven by the glue moving averages: when the short horizon
//! average of learned clause glues exceeds the long horizon average by a configured margin the
//! search is likely stuck in a bad region and restarts. In stable mode restarts follow the
//! reluctant doubling sequence instead, giving much longer and geometrically growing intervals.
//!
//! A restart does not necessarily unwind the whole trail: the prefix of decisions that the
//! decision heuristic would make again is kept (*trail reuse*).
use partial_ref::{partial, PartialRef};

use crate::context::{
    AssignmentP, AssumptionsP, Context, EmasP, PhasesP, ScheduleP, SolverConfigP, TrailP,
    VariablesP, VmtfP, VsidsP,
};
use crate::prop::backtrack;

/// Whether the restart policy of the active mode asks for a restart.
pub fn should_restart(
    mut ctx: partial!(Context, EmasP, ScheduleP, SolverConfigP),
) -> bool {
    let schedule = ctx.part(ScheduleP);
    let config = ctx.part(SolverConfigP);

    if schedule.conflicts < schedule.next_restart {
        return false;
    }

    if schedule.stable {
        // The reluctant doubling schedule alone decides.
        true
    } else {
        let emas = ctx.part(EmasP);
        emas.fast_glue.get() > config.restart_margin * emas.slow_glue.get()
    }
}

/// Perform a restart, keeping the reusable prefix of the trail.
pub fn restart(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut PhasesP,
        mut ScheduleP,
        mut TrailP,
        mut VmtfP,
        mut VsidsP,
        AssumptionsP,
        SolverConfigP,
        VariablesP,
    ),
) {
    {
        let bctx = ctx.borrow();
        let (phases, bctx) = bctx.split_part_mut(PhasesP);
        phases.update_target_and_best(bctx.part(TrailP).trail());
    }

    let assumption_levels = ctx
        .part(AssumptionsP)
        .assumption_levels()
        .min(ctx.part(TrailP).current_level());

    let target_level = if ctx.part(SolverConfigP).reuse_trail {
        reuse_trail_level(ctx.borrow(), assumption_levels)
    } else {
        assumption_levels
    };

    backtrack(ctx.borrow(), target_level);

    let (schedule, ctx) = ctx.split_part_mut(ScheduleP);
    let config = ctx.part(SolverConfigP);

    schedule.restarts += 1;
    schedule.next_restart = if schedule.stable {
        schedule.conflicts + schedule.luby.advance() * config.stable_restart_scale
    } else {
        schedule.conflicts + config.restart_interval
    };
}

/// The highest decision level whose decisions the active heuristic would select again.
///
/// Decisions that still outrank the best unassigned candidate are kept, everything above the
/// first decision that does not is unwound.
fn reuse_trail_level(
    mut ctx: partial!(
        Context,
        mut VmtfP,
        mut VsidsP,
        AssignmentP,
        ScheduleP,
        TrailP,
        VariablesP
    ),
    assumption_levels: usize,
) -> usize {
    let stable = ctx.part(ScheduleP).stable;
    let (assignment, mut ctx) = ctx.split_part(AssignmentP);
    let (variables, mut ctx) = ctx.split_part(VariablesP);
    let (trail, mut ctx) = ctx.split_part(TrailP);

    let mut level = assumption_levels;

    if stable {
        let vsids = ctx.part_mut(VsidsP);
        let candidate = match vsids.next_decision(assignment, variables) {
            Some(var) => {
                vsids.make_available(var);
                vsids.activity(var)
            }
            None => return assumption_levels,
        };

        while level < trail.current_level() {
            let decision = trail.decision(level + 1);
            if vsids.activity(decision.var()) > candidate {
                level += 1;
            } else {
                break;
            }
        }
    } else {
        let vmtf = ctx.part_mut(VmtfP);
        let candidate = match vmtf.next_decision(assignment, variables) {
            Some(var) => vmtf.stamp_of(var),
            None => return assumption_levels,
        };

        while level < trail.current_level() {
            let decision = trail.decision(level + 1);
            if vmtf.stamp_of(decision.var()) > candidate {
                level += 1;
            } else {
                break;
            }
        }
    }

    level
}
