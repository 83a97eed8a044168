//! Propagation of binary clauses.
use partial_ref::{partial, PartialRef};

use ironsat_formula::Lit;

use crate::context::{AssignmentP, BinaryClausesP, Context, ImplGraphP, TrailP};

use super::enqueue_assignment;
use super::{Conflict, Reason};

/// Propagate all literals implied by the given literal via binary clauses.
///
/// On conflict return the binary clause propagating the conflicting assignment.
pub fn propagate_binary(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ImplGraphP,
        mut TrailP,
        BinaryClausesP,
    ),
    lit: Lit,
) -> Result<(), Conflict> {
    let (binary_clauses, mut ctx) = ctx.split_part(BinaryClausesP);

    for entry in binary_clauses.implied(lit) {
        let implied = entry.implied;
        let assignment = ctx.part(AssignmentP);

        if assignment.lit_is_false(implied) {
            return Err(Conflict::Binary {
                lits: [implied, !lit],
                id: entry.id,
            });
        } else if !assignment.lit_is_true(implied) {
            enqueue_assignment(
                ctx.borrow(),
                implied,
                Reason::Binary {
                    falsified: [!lit],
                    id: entry.id,
                },
            );
        }
    }

    Ok(())
}
