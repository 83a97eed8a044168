//! The implication graph.
use partial_ref::{partial, PartialRef};

use ironsat_formula::{Lit, LitIdx, Var};

use crate::clause::ClauseRef;
use crate::context::{ClauseAllocP, Context};
use crate::proof::ClauseId;

/// Assignments that caused a propagation.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Reason {
    /// Decision, assumption or unit clause.
    Unit,
    /// Binary clause, represented by the falsified literal and the clause id.
    Binary { falsified: [Lit; 1], id: ClauseId },
    /// Long clause with the propagated literal in position 0.
    Long(ClauseRef),
}

impl Reason {
    /// The falsified literals that caused the propagation.
    pub fn lits<'out, 'a, 'b>(&'a self, ctx: &'b partial!('b Context, ClauseAllocP)) -> &'out [Lit]
    where
        'a: 'out,
        'b: 'out,
    {
        match self {
            Reason::Unit => &[],
            Reason::Binary { falsified, .. } => falsified,
            // The propagated literal is always kept at position 0
            Reason::Long(cref) => &ctx.part(ClauseAllocP).clause(*cref).lits()[1..],
        }
    }

    /// The id of the propagating clause.
    pub fn id(&self, ctx: &partial!(Context, ClauseAllocP)) -> Option<ClauseId> {
        match self {
            Reason::Unit => None,
            Reason::Binary { id, .. } => Some(*id),
            Reason::Long(cref) => Some(ctx.part(ClauseAllocP).header(*cref).id()),
        }
    }

    /// Whether the reason is a unit clause, decision or assumption.
    pub fn is_unit(&self) -> bool {
        matches!(self, Reason::Unit)
    }
}

/// Propagation that resulted in a conflict.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Conflict {
    Binary { lits: [Lit; 2], id: ClauseId },
    Long(ClauseRef),
}

impl Conflict {
    /// The literals of the conflicting clause.
    pub fn lits<'out, 'a, 'b>(&'a self, ctx: &'b partial!('b Context, ClauseAllocP)) -> &'out [Lit]
    where
        'a: 'out,
        'b: 'out,
    {
        match self {
            Conflict::Binary { lits, .. } => lits,
            Conflict::Long(cref) => ctx.part(ClauseAllocP).clause(*cref).lits(),
        }
    }

    /// The id of the conflicting clause.
    pub fn id(&self, ctx: &partial!(Context, ClauseAllocP)) -> ClauseId {
        match self {
            Conflict::Binary { id, .. } => *id,
            Conflict::Long(cref) => ctx.part(ClauseAllocP).header(*cref).id(),
        }
    }
}

/// Node and incoming edges of the implication graph.
#[derive(Copy, Clone)]
pub struct ImplNode {
    pub reason: Reason,
    pub level: LitIdx,
    /// Position of the assignment in the trail.
    pub depth: LitIdx,
}

/// The implication graph.
///
/// This is a DAG having all assigned variables as nodes. It has unit clauses, assumptions and
/// decisions as sources. For each propagated assignment it has incoming edges from the literals
/// whose assignment caused the propagation to happen.
#[derive(Default)]
pub struct ImplGraph {
    /// Contains only valid data for indices of assigned variables.
    pub nodes: Vec<ImplNode>,
}

impl ImplGraph {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.nodes.resize(
            count,
            ImplNode {
                reason: Reason::Unit,
                level: 0,
                depth: 0,
            },
        );
    }

    /// Get the reason for an assigned variable.
    ///
    /// Returns stale data if the variable isn't assigned.
    pub fn reason(&self, var: Var) -> &Reason {
        &self.nodes[var.index()].reason
    }

    /// Get the decision level of an assigned variable.
    ///
    /// Returns stale data if the variable isn't assigned.
    pub fn level(&self, var: Var) -> usize {
        self.nodes[var.index()].level as usize
    }

    /// Get the trail position of an assigned variable.
    ///
    /// Returns stale data if the variable isn't assigned.
    pub fn depth(&self, var: Var) -> usize {
        self.nodes[var.index()].depth as usize
    }

    /// Updates the reason for an assigned variable.
    ///
    /// Make sure the reason vars are in front of the assigned variable in the trail.
    pub fn update_reason(&mut self, var: Var, reason: Reason) {
        self.nodes[var.index()].reason = reason
    }

    /// Turns the variable's assignment into a pseudo unit clause assignment.
    ///
    /// Used when level 0 assignments are removed from the trail.
    pub fn update_removed_unit(&mut self, var: Var) {
        let node = &mut self.nodes[var.index()];
        node.reason = Reason::Unit;
        node.level = 0;
    }
}
