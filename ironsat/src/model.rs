//! Model reconstruction.
use partial_ref::{partial, PartialRef};

use ironsat_formula::{Lit, Var};

use crate::context::{
    AssignmentP, Context, ExtensionP, ModelP, PhasesP, VariablesP,
};

/// The satisfying assignment of the last successful solve.
#[derive(Default)]
pub struct Model {
    /// Values indexed by user variables.
    ///
    /// Only valid while the solver state is SAT.
    assignment: Vec<Option<bool>>,
}

impl Model {
    /// Value of a user literal in the model.
    ///
    /// Only valid while the solver state is SAT.
    pub fn lit_value(&self, lit: Lit) -> Option<bool> {
        self.assignment
            .get(lit.index())
            .cloned()
            .flatten()
            .map(|value| value ^ lit.is_negative())
    }
}

/// Compute the model after the search found a satisfying assignment.
///
/// Eliminated and substituted variables are not assigned by the search, their values are
/// recovered by replaying the extension stack. Unassigned inactive variables default to their
/// saved phase before the replay.
pub fn reconstruct_model(
    mut ctx: partial!(
        Context,
        mut ModelP,
        AssignmentP,
        ExtensionP,
        PhasesP,
        VariablesP,
    ),
) {
    let (model, mut ctx) = ctx.split_part_mut(ModelP);
    let variables = ctx.part(VariablesP);
    let assignment = ctx.part(AssignmentP);
    let phases = ctx.part(PhasesP);

    let solver_count = variables.count();

    let mut values: Vec<bool> = (0..solver_count)
        .map(|index| {
            let var = Var::from_index(index);
            assignment
                .var_value(var)
                .unwrap_or_else(|| phases.saved(var))
        })
        .collect();

    ctx.part(ExtensionP).extend_assignment(&mut values);

    model.assignment.clear();
    for (index, &value) in values.iter().enumerate() {
        let user_var = variables.user_from_solver(Var::from_index(index));
        if model.assignment.len() <= user_var.index() {
            model.assignment.resize(user_var.index() + 1, None);
        }
        model.assignment[user_var.index()] = Some(value);
    }
}
