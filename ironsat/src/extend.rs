//! The extension stack.
//!
//! Simplifications that remove satisfiability preserving but not equivalence preserving clauses
//! (variable elimination, blocked and covered clauses, substitution, autarkies) push *witness
//! blocks* onto the extension stack. A block pairs a removed clause with one of its literals,
//! the witness. Replaying the blocks in reverse order after a model is found repairs the
//! assignment: whenever a block's clause is falsified, flipping its witness satisfies it without
//! falsifying any earlier processed clause.
//!
//! When a later solve references an eliminated variable again, all blocks mentioning the
//! variable are removed from the stack and their clauses are restored into the solver.
use std::ops::Range;

use partial_ref::{partial, PartialRef};

use log::debug;

use ironsat_formula::{Lit, Var};

use crate::context::{
    AnalyzeConflictP, AssignmentP, AssumptionsP, BinaryClausesP, ClauseAllocP, ClauseDbP, Context,
    ExtensionP, ImplGraphP, OccurrencesP, PhasesP, ProofP, SolverStateP, TmpDataP, TmpFlagsP,
    TrailP, VariablesP, VmtfP, VsidsP, WatchlistsP,
};
use crate::variables::VarStatus;

/// A single witness block.
struct Block {
    witness: Lit,
    clause: Range<usize>,
}

/// The extension stack.
#[derive(Default)]
pub struct Extension {
    blocks: Vec<Block>,
    lits: Vec<Lit>,
}

impl Extension {
    /// Push a witness block for a removed clause.
    ///
    /// The witness has to be a literal of the clause.
    pub fn push_block(&mut self, witness: Lit, clause: &[Lit]) {
        debug_assert!(clause.contains(&witness));
        let begin = self.lits.len();
        self.lits.extend_from_slice(clause);
        self.blocks.push(Block {
            witness,
            clause: begin..self.lits.len(),
        });
    }

    /// Repair an assignment so all removed clauses are satisfied.
    ///
    /// `values` holds one value per solver variable. Blocks are visited in reverse push order
    /// and the witness is flipped whenever the block's clause is falsified.
    pub fn extend_assignment(&self, values: &mut [bool]) {
        let mut flipped = 0usize;
        for block in self.blocks.iter().rev() {
            let clause = &self.lits[block.clause.clone()];
            let satisfied = clause
                .iter()
                .any(|&lit| values[lit.index()] == lit.is_positive());
            if !satisfied {
                values[block.witness.index()] = block.witness.is_positive();
                flipped += 1;
            }
        }
        if flipped > 0 {
            debug!("flipped {} witness literals during extension", flipped);
        }
    }

    /// Remove all blocks mentioning one of the given variables and return their clauses.
    fn take_blocks_of_vars(&mut self, vars: &[Var]) -> Vec<Vec<Lit>> {
        let mut taken = vec![];
        let lits = &self.lits;
        self.blocks.retain(|block| {
            let clause = &lits[block.clause.clone()];
            if clause.iter().any(|lit| vars.contains(&lit.var())) {
                taken.push(clause.to_vec());
                false
            } else {
                true
            }
        });
        taken
    }
}

/// Reactivate eliminated or substituted variables referenced by new clauses or assumptions.
///
/// All extension blocks mentioning such a variable are removed and their clauses restored into
/// the solver as irredundant clauses. Restored clauses can reference further inactive variables,
/// so this iterates until a fixpoint is reached.
pub fn restore_vars(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut AssumptionsP,
        mut BinaryClausesP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ExtensionP,
        mut ImplGraphP,
        mut OccurrencesP,
        mut PhasesP,
        mut ProofP,
        mut SolverStateP,
        mut TmpDataP,
        mut TmpFlagsP,
        mut TrailP,
        mut VariablesP,
        mut VmtfP,
        mut VsidsP,
        mut WatchlistsP,
    ),
    lits: &[Lit],
) {
    let mut pending: Vec<Var> = lits
        .iter()
        .map(Lit::var)
        .filter(|&var| {
            let status = ctx.part(VariablesP).var_data(var).status;
            status == VarStatus::Eliminated || status == VarStatus::Substituted
        })
        .collect();

    while !pending.is_empty() {
        for &var in pending.iter() {
            ctx.part_mut(VariablesP).var_data_mut(var).status = VarStatus::Active;
            ctx.part_mut(VsidsP).make_available(var);
        }

        let restored = ctx.part_mut(ExtensionP).take_blocks_of_vars(&pending);

        debug!(
            "reactivating {} variables restores {} clauses",
            pending.len(),
            restored.len()
        );

        pending.clear();

        for clause in restored {
            for &lit in clause.iter() {
                let status = ctx.part(VariablesP).var_data(lit.var()).status;
                if (status == VarStatus::Eliminated || status == VarStatus::Substituted)
                    && !pending.contains(&lit.var())
                {
                    pending.push(lit.var());
                }
            }
            crate::load::load_clause(ctx.borrow(), &clause);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ironsat_formula::lits;

    #[test]
    fn witness_flipping() {
        let mut extension = Extension::default();

        // Eliminating variable 1 from (1 | 2) and (-1 | 3).
        extension.push_block(lits![1][0], &lits![1, 2]);
        extension.push_block(lits![-1][0], &lits![-1, 3]);

        // 2 false, 3 true: (1 | 2) forces 1 true, (-1 | 3) is fine with it.
        let mut values = vec![false, false, true];
        extension.extend_assignment(&mut values);
        assert!(values[0]);

        // 2 true, 3 false: (-1 | 3) forces 1 false.
        let mut values = vec![true, true, false];
        extension.extend_assignment(&mut values);
        assert!(!values[0]);

        // Both true: nothing to repair.
        let mut values = vec![false, true, true];
        extension.extend_assignment(&mut values);
        assert!(!values[0]);
    }
}
