//! Scheduling of solving and simplification steps.
//!
//! Between two conflict steps the schedule checks its conflict count based limits: switching
//! between the focused and stable search modes, recomputing the clause tier bounds, reducing the
//! clause database, rephasing and running the inprocessing passes. All limits grow geometrically
//! so the relative effort spent outside of search stays bounded.
use log::info;

use partial_ref::{partial, PartialRef};

use crate::cdcl::conflict_step;
use crate::clause::assess::recompute_tiers;
use crate::clause::reduce::reduce;
use crate::clause::Tier;
use crate::context::{
    AnalyzeConflictP, AssignmentP, AssumptionsP, BinaryClausesP, ClauseActivityP, ClauseAllocP,
    ClauseDbP, Context, EmasP, ExtensionP, ImplGraphP, OccurrencesP, PhasesP, ProofP, ScheduleP,
    SolverConfigP, SolverStateP, TmpDataP, TmpFlagsP, TrailP, VariablesP, VmtfP, VsidsP,
    WatchlistsP,
};
use crate::inprocess::inprocess;
use crate::prop::restart as backtrack_to_assumptions;
use crate::restart::{restart, should_restart};
use crate::state::SatState;

mod luby;

pub use luby::LubySequence;

/// Scheduling of solving and simplification steps.
pub struct Schedule {
    pub conflicts: u64,
    pub restarts: u64,
    pub next_restart: u64,
    pub luby: LubySequence,
    /// Whether the search is in stable mode.
    pub stable: bool,
    pub stabilizations: u64,
    stabilize_limit: u64,
    stabilize_interval: u64,
    pub reductions: u64,
    reduce_limit: u64,
    pub rephasings: u64,
    rephase_limit: u64,
    rephase_inc: u64,
    pub inprocessings: u64,
    inprocess_limit: u64,
    tier_recomputes: u64,
    tier_recompute_limit: u64,
    initialized: bool,
}

impl Default for Schedule {
    fn default() -> Schedule {
        Schedule {
            conflicts: 0,
            restarts: 0,
            next_restart: 0,
            luby: LubySequence::default(),
            stable: false,
            stabilizations: 0,
            stabilize_limit: 0,
            stabilize_interval: 0,
            reductions: 0,
            reduce_limit: 0,
            rephasings: 0,
            rephase_limit: 0,
            rephase_inc: 0,
            inprocessings: 0,
            inprocess_limit: 0,
            tier_recomputes: 0,
            tier_recompute_limit: 0,
            initialized: false,
        }
    }
}

impl Schedule {
    fn initialize(&mut self, config: &crate::config::SolverConfig) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        self.next_restart = config.restart_interval;
        self.stabilize_interval = config.stabilize_interval;
        self.stabilize_limit = config.stabilize_interval;
        self.reduce_limit = config.reduce_interval;
        self.rephase_inc = config.rephase_interval;
        self.rephase_limit = config.rephase_interval;
        self.inprocess_limit = config.inprocess_interval;
        self.tier_recompute_limit = 2;
    }
}

/// Perform one step of the schedule.
///
/// Returns `false` when the solver reached a final state.
pub fn schedule_step(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut AssumptionsP,
        mut BinaryClausesP,
        mut ClauseActivityP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut EmasP,
        mut ExtensionP,
        mut ImplGraphP,
        mut OccurrencesP,
        mut PhasesP,
        mut ProofP,
        mut ScheduleP,
        mut SolverStateP,
        mut TmpDataP,
        mut TmpFlagsP,
        mut TrailP,
        mut VariablesP,
        mut VmtfP,
        mut VsidsP,
        mut WatchlistsP,
        SolverConfigP,
    ),
) -> bool {
    if ctx.part(SolverStateP).sat_state != SatState::Unknown {
        return false;
    }

    {
        let bctx = ctx.borrow();
        let (schedule, bctx) = bctx.split_part_mut(ScheduleP);
        schedule.initialize(bctx.part(SolverConfigP));
    }

    let conflicts = ctx.part(ScheduleP).conflicts;

    if conflicts > 0 && conflicts % 5000 == 0 {
        let db = ctx.part(ClauseDbP);
        let units = ctx.part(TrailP).top_level_assignment_count();
        let emas = ctx.part(EmasP);
        let schedule = ctx.part(ScheduleP);
        info!(
            "confl: {}k rest: {} mode: {} vars: {} bin: {} irred: {} core: {} mid: {} local: {} \
             glue: {:.1}/{:.1} trail: {:.0} jump: {:.0} size: {:.0} level: {:.0}",
            schedule.conflicts / 1000,
            schedule.restarts,
            if schedule.stable { "stable" } else { "focused" },
            ctx.part(AssignmentP).assignment().len() - units,
            ctx.part(BinaryClausesP).count(),
            db.count_by_tier(Tier::Irred),
            db.count_by_tier(Tier::Core),
            db.count_by_tier(Tier::Mid),
            db.count_by_tier(Tier::Local),
            emas.fast_glue.get(),
            emas.slow_glue.get(),
            emas.trail.get(),
            emas.jump.get(),
            emas.size.get(),
            emas.level.get(),
        );
    }

    if ctx.part(SolverConfigP).stabilize && conflicts >= ctx.part(ScheduleP).stabilize_limit {
        switch_mode(ctx.borrow());
    }

    if ctx.part(SolverConfigP).recompute_tiers
        && conflicts >= ctx.part(ScheduleP).tier_recompute_limit
    {
        let config = ctx.part(SolverConfigP);
        let (tier1, tier2) = (config.tier1_glue, config.tier2_glue);
        recompute_tiers(ctx.borrow(), tier1, tier2);

        let schedule = ctx.part_mut(ScheduleP);
        schedule.tier_recomputes += 1;
        let delta = 1u64 << schedule.tier_recomputes.min(16);
        schedule.tier_recompute_limit = schedule.conflicts + delta;
    }

    if conflicts >= ctx.part(ScheduleP).reduce_limit {
        reduce(ctx.borrow());

        let interval = ctx.part(SolverConfigP).reduce_interval;
        let schedule = ctx.part_mut(ScheduleP);
        schedule.reductions += 1;
        schedule.reduce_limit = schedule.conflicts + interval * (schedule.reductions + 1);
    }

    if conflicts >= ctx.part(ScheduleP).rephase_limit {
        rephase(ctx.borrow());
    }

    if conflicts >= ctx.part(ScheduleP).inprocess_limit {
        inprocess(ctx.borrow());

        let interval = ctx.part(SolverConfigP).inprocess_interval;
        let schedule = ctx.part_mut(ScheduleP);
        schedule.inprocessings += 1;
        schedule.inprocess_limit = schedule.conflicts + interval * (schedule.inprocessings + 1);

        if ctx.part(SolverStateP).sat_state != SatState::Unknown {
            return false;
        }
    }

    if should_restart(ctx.borrow()) {
        restart(ctx.borrow());
    }

    conflict_step(ctx.borrow());
    ctx.part_mut(ScheduleP).conflicts += 1;

    ctx.part(SolverStateP).sat_state == SatState::Unknown
}

/// Toggle between the focused and stable search modes.
fn switch_mode(
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
    ),
) {
    backtrack_to_assumptions(ctx.borrow());

    {
        let bctx = ctx.borrow();
        let (phases, bctx) = bctx.split_part_mut(PhasesP);
        phases.update_target_and_best(bctx.part(TrailP).trail());
        phases.reset_target();
    }

    let config = ctx.part(SolverConfigP);
    let stable_scale = config.stable_restart_scale;
    let restart_interval = config.restart_interval;

    let schedule = ctx.part_mut(ScheduleP);
    schedule.stable = !schedule.stable;
    schedule.stabilizations += 1;
    schedule.stabilize_interval *= 2;
    schedule.stabilize_limit = schedule.conflicts + schedule.stabilize_interval;

    schedule.next_restart = if schedule.stable {
        schedule.conflicts + schedule.luby.advance() * stable_scale
    } else {
        schedule.conflicts + restart_interval
    };

    info!(
        "stabilization {}: switched to {} mode after {} conflicts",
        schedule.stabilizations,
        if schedule.stable { "stable" } else { "focused" },
        schedule.conflicts
    );
}

/// Reset the saved phases on the rotating rephase schedule.
fn rephase(
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
    ),
) {
    backtrack_to_assumptions(ctx.borrow());

    let kind = ctx.part_mut(PhasesP).rephase();

    let interval = ctx.part(SolverConfigP).rephase_interval;
    let schedule = ctx.part_mut(ScheduleP);
    schedule.rephasings += 1;
    schedule.rephase_inc += interval;
    let inc = schedule.rephase_inc;
    schedule.rephase_limit = schedule.conflicts + inc;

    info!(
        "rephasing {}: {:?} after {} conflicts, next in {}",
        schedule.rephasings, kind, schedule.conflicts, inc
    );
}
