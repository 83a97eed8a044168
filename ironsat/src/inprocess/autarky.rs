//! Autarky detection.
//!
//! An autarky is a partial assignment that satisfies every clause it touches. Clauses touched by
//! an autarky can be removed: any model of the remaining formula extends to a model of the full
//! formula by assigning the autarky literals. The candidate assignment is taken from the saved
//! phases and shrunk until it becomes an autarky or empty.
use partial_ref::{partial, PartialRef};

use log::debug;

use ironsat_formula::{Lit, Var};

use crate::clause::{db, ClauseRef};
use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, ClauseDbP, ExtensionP, PhasesP, SolverStateP,
    VariablesP,
};
use crate::proof;
use crate::variables::{VarFlags, VarStatus};

use super::pass_context;

/// Detect and apply an autarky derived from the saved phases.
pub fn apply_autarky(mut ctx: pass_context!()) {
    let var_count = ctx.part(AssignmentP).assignment().len();

    // Candidate assignment: saved phase of every unassigned active variable.
    let mut in_candidate: Vec<bool> = vec![false; var_count];
    let mut candidate_size = 0usize;

    for index in 0..var_count {
        let var = Var::from_index(index);
        if ctx.part(VariablesP).is_active(var)
            && !ctx.part(VariablesP).is_frozen(var)
            && ctx.part(AssignmentP).var_value(var).is_none()
        {
            in_candidate[index] = true;
            candidate_size += 1;
        }
    }

    if candidate_size == 0 {
        return;
    }

    let candidate_lit =
        |ctx: &mut pass_context!(), var: Var| var.lit(ctx.part(PhasesP).saved(var));

    // Shrink until every touched irredundant clause is satisfied by the candidate.
    loop {
        let mut dropped = vec![];

        for_each_irredundant(ctx.borrow(), |ctx, lits| {
            let touched = lits.iter().any(|&lit| in_candidate[lit.index()]);
            if !touched {
                return;
            }
            let satisfied = lits.iter().any(|&lit| {
                in_candidate[lit.index()] && candidate_lit(ctx, lit.var()) == lit
            });
            if !satisfied {
                for &lit in lits.iter() {
                    if in_candidate[lit.index()] {
                        dropped.push(lit.var());
                    }
                }
            }
        });

        if dropped.is_empty() {
            break;
        }
        for var in dropped {
            if in_candidate[var.index()] {
                in_candidate[var.index()] = false;
                candidate_size -= 1;
            }
        }
        if candidate_size == 0 {
            return;
        }
    }

    debug!("found autarky of size {}", candidate_size);

    // The autarky literals become witness blocks so reconstruction assigns them.
    for index in 0..var_count {
        if !in_candidate[index] {
            continue;
        }
        let var = Var::from_index(index);
        let lit = candidate_lit(&mut ctx, var);
        ctx.part_mut(ExtensionP).push_block(lit, &[lit]);
        ctx.part_mut(VariablesP).var_data_mut(var).status = VarStatus::Eliminated;
    }

    // All touched clauses are satisfied by the autarky, remove them.
    let crefs: Vec<ClauseRef> = ctx.part(ClauseDbP).clauses.clone();
    for cref in crefs {
        let touched = {
            let clause = ctx.part(ClauseAllocP).clause(cref);
            !clause.header().deleted()
                && clause.lits().iter().any(|&lit| in_candidate[lit.index()])
        };
        if touched {
            proof::delete_long_clause(ctx.borrow(), cref);
            db::delete_clause(ctx.borrow(), cref);
        }
    }

    for code in 0..var_count * 2 {
        let lit = Lit::from_code(code);
        let clause_lit = !lit;
        let entries: Vec<_> = ctx.part(BinaryClausesP).implied(lit).to_vec();
        for entry in entries {
            if clause_lit > entry.implied {
                continue;
            }
            if in_candidate[clause_lit.index()] || in_candidate[entry.implied.index()] {
                proof::delete_clause(ctx.borrow(), entry.id, &[clause_lit, entry.implied]);
                ctx.part_mut(BinaryClausesP)
                    .remove_binary_clause([clause_lit, entry.implied], entry.id);
            }
        }
    }

    for index in 0..var_count {
        if in_candidate[index] {
            ctx.part_mut(VariablesP)
                .var_data_mut(Var::from_index(index))
                .flags
                .insert(VarFlags::REMOVED);
        }
    }
}

/// Visit the literals of every irredundant clause, long and binary.
fn for_each_irredundant(
    mut ctx: pass_context!(),
    mut visit: impl FnMut(&mut pass_context!(), &[Lit]),
) {
    let crefs: Vec<ClauseRef> = ctx.part(ClauseDbP).clauses.clone();
    for cref in crefs {
        let lits: Vec<Lit> = {
            let clause = ctx.part(ClauseAllocP).clause(cref);
            if clause.header().deleted() || clause.header().redundant() {
                continue;
            }
            clause.lits().to_vec()
        };
        visit(&mut ctx, &lits);
    }

    let var_count = ctx.part(AssignmentP).assignment().len();
    for code in 0..var_count * 2 {
        let lit = Lit::from_code(code);
        let clause_lit = !lit;
        let entries: Vec<_> = ctx.part(BinaryClausesP).implied(lit).to_vec();
        for entry in entries {
            if entry.redundant || clause_lit > entry.implied {
                continue;
            }
            visit(&mut ctx, &[clause_lit, entry.implied]);
        }
    }
}
