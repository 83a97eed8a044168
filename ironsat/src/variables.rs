//! Variable storage, status tracking and user variable mapping.
use partial_ref::{partial, PartialRef};

use ironsat_formula::{Lit, Var};

use crate::context::{
    ensure_var_count, AnalyzeConflictP, AssignmentP, BinaryClausesP, Context, ImplGraphP,
    OccurrencesP, PhasesP, ProofP, TmpFlagsP, VariablesP, VmtfP, VsidsP, WatchlistsP,
};

pub mod data;
pub mod var_map;

pub use data::{VarData, VarFlags, VarStatus};
use var_map::VarMap;

/// Variable storage.
///
/// Maps between user variables and solver variables and keeps per-variable metadata. The mapping
/// is stable for the lifetime of the solver: a user variable is assigned a solver variable the
/// first time it is referenced and keeps it, even across elimination and reactivation.
#[derive(Default)]
pub struct Variables {
    /// Metadata indexed by solver variables.
    var_data: Vec<VarData>,
    /// User variable of each solver variable.
    user_from_solver: Vec<Var>,
    /// Solver variable of each user variable.
    solver_from_user: VarMap,
}

impl Variables {
    /// Number of solver variables in use.
    pub fn count(&self) -> usize {
        self.user_from_solver.len()
    }

    /// Metadata of a solver variable.
    pub fn var_data(&self, var: Var) -> &VarData {
        &self.var_data[var.index()]
    }

    /// Mutable metadata of a solver variable.
    pub fn var_data_mut(&mut self, var: Var) -> &mut VarData {
        &mut self.var_data[var.index()]
    }

    /// Whether a solver variable may appear in new clauses and decisions.
    pub fn is_active(&self, var: Var) -> bool {
        self.var_data[var.index()].status == VarStatus::Active
    }

    /// The user variable of a solver variable.
    pub fn user_from_solver(&self, var: Var) -> Var {
        self.user_from_solver[var.index()]
    }

    /// The user literal of a solver literal.
    pub fn user_from_solver_lit(&self, lit: Lit) -> Lit {
        self.user_from_solver(lit.var()).lit(lit.is_positive())
    }

    /// The existing solver variable of a user variable.
    pub fn existing_solver_from_user(&self, var: Var) -> Option<Var> {
        self.solver_from_user.get(var)
    }

    /// The solver variable of a user variable, allocating it if necessary.
    pub fn solver_from_user(&mut self, var: Var) -> Var {
        match self.solver_from_user.get(var) {
            Some(solver_var) => solver_var,
            None => {
                let solver_var = Var::from_index(self.user_from_solver.len());
                self.user_from_solver.push(var);
                self.var_data.push(VarData::default());
                self.solver_from_user.insert(var, solver_var);
                solver_var
            }
        }
    }

    /// Increment the freeze count of a variable, protecting it from elimination.
    pub fn freeze(&mut self, var: Var) {
        self.var_data[var.index()].frozen += 1;
    }

    /// Decrement the freeze count of a variable.
    pub fn melt(&mut self, var: Var) {
        let data = &mut self.var_data[var.index()];
        debug_assert!(data.frozen > 0);
        data.frozen = data.frozen.saturating_sub(1);
    }

    /// Whether a variable is protected from elimination.
    pub fn is_frozen(&self, var: Var) -> bool {
        self.var_data[var.index()].frozen > 0
    }

    /// Iterator over all solver variables.
    pub fn solver_var_iter(&self) -> impl Iterator<Item = Var> {
        (0..self.count()).map(Var::from_index)
    }
}

/// Map user literals to solver literals, allocating solver variables as needed.
///
/// The result is appended to `out` which is cleared first. Newly referenced variables grow all
/// variable indexed solver structures.
pub fn solver_from_user_lits(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut BinaryClausesP,
        mut ImplGraphP,
        mut OccurrencesP,
        mut PhasesP,
        mut ProofP,
        mut TmpFlagsP,
        mut VariablesP,
        mut VmtfP,
        mut VsidsP,
        mut WatchlistsP,
    ),
    out: &mut Vec<Lit>,
    user_lits: &[Lit],
) {
    out.clear();
    let variables = ctx.part_mut(VariablesP);
    out.extend(user_lits.iter().map(|&lit| {
        variables
            .solver_from_user(lit.var())
            .lit(lit.is_positive())
    }));
    ensure_var_count(ctx.borrow());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_is_stable() {
        let mut variables = Variables::default();

        let a = variables.solver_from_user(Var::from_dimacs(7));
        let b = variables.solver_from_user(Var::from_dimacs(3));
        assert_ne!(a, b);

        assert_eq!(variables.solver_from_user(Var::from_dimacs(7)), a);
        assert_eq!(variables.user_from_solver(a), Var::from_dimacs(7));
        assert_eq!(variables.count(), 2);

        variables.var_data_mut(a).status = VarStatus::Eliminated;
        assert_eq!(variables.solver_from_user(Var::from_dimacs(7)), a);
    }

    #[test]
    fn freeze_melt_pairing() {
        let mut variables = Variables::default();
        let var = variables.solver_from_user(Var::from_dimacs(1));

        for _ in 0..3 {
            variables.freeze(var);
        }
        assert!(variables.is_frozen(var));
        for _ in 0..3 {
            variables.melt(var);
        }
        assert!(!variables.is_frozen(var));
    }
}
