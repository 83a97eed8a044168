//! Decision heuristics.
//!
//! Two interchangeable variable selection schemes are maintained: a VMTF queue used in focused
//! mode and a VSIDS score heap used in stable mode (see [`schedule`](crate::schedule) for the
//! mode switching). Both are kept up to date at all times so switching modes is cheap.
pub mod phase;
pub mod vmtf;
pub mod vsids;

use partial_ref::{partial, PartialRef};

use ironsat_formula::Lit;

use crate::context::{
    AssignmentP, Context, ImplGraphP, PhasesP, ScheduleP, SolverConfigP, TrailP, VariablesP,
    VmtfP, VsidsP,
};
use crate::prop::{enqueue_assignment, Reason};

/// Make a decision and enqueue it.
///
/// Returns `false` if no decision was made because all active variables are assigned.
pub fn make_decision(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ImplGraphP,
        mut TrailP,
        mut VmtfP,
        mut VsidsP,
        PhasesP,
        ScheduleP,
        SolverConfigP,
        VariablesP,
    ),
) -> bool {
    let stable = ctx.part(ScheduleP).stable;

    let decision_var = {
        let bctx = ctx.borrow();
        let (assignment, bctx) = bctx.split_part(AssignmentP);
        let (variables, mut bctx) = bctx.split_part(VariablesP);

        if stable {
            bctx.part_mut(VsidsP).next_decision(assignment, variables)
        } else {
            bctx.part_mut(VmtfP).next_decision(assignment, variables)
        }
    };

    let decision_var = match decision_var {
        Some(var) => var,
        None => return false,
    };

    let phase = decide_phase(ctx.borrow(), stable, decision_var);
    let decision = Lit::from_var(decision_var, phase);

    ctx.part_mut(TrailP).new_decision_level();
    enqueue_assignment(ctx.borrow(), decision, Reason::Unit);

    true
}

/// Select the phase of a decision variable.
///
/// In stable mode the target phase takes precedence, so search keeps extending the largest
/// conflict free trail found so far. Otherwise the saved phase is used, which defaults to the
/// configured initial phase for never assigned variables.
fn decide_phase(
    mut ctx: partial!(Context, PhasesP),
    stable: bool,
    var: ironsat_formula::Var,
) -> bool {
    let phases = ctx.part(PhasesP);

    if stable {
        if let Some(target) = phases.target(var) {
            return target;
        }
    }

    phases.saved(var)
}
