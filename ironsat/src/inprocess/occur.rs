//! Occurrence lists.
//!
//! Full occurrence lists over the long clauses, used by the occurrence based inprocessing
//! passes. Binary clauses are not tracked here, their implication lists double as occurrence
//! lists. The lists are only connected inside an inprocessing round, never during search.
use partial_ref::{partial, PartialRef};

use ironsat_formula::Lit;

use crate::clause::ClauseRef;
use crate::context::{ClauseAllocP, ClauseDbP, Context, OccurrencesP};

/// Occurrence lists over the long clauses.
#[derive(Default)]
pub struct Occurrences {
    by_lit: Vec<Vec<ClauseRef>>,
    enabled: bool,
}

impl Occurrences {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.by_lit.resize(count * 2, vec![]);
    }

    /// Whether occurrence lists are connected.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Drop all lists and stop keeping them up to date.
    pub fn disconnect(&mut self) {
        self.enabled = false;
        for list in self.by_lit.iter_mut() {
            list.clear();
        }
    }

    /// The long clauses containing the given literal.
    ///
    /// May contain clauses that were marked deleted since the last rebuild.
    pub fn occurrences(&self, lit: Lit) -> &[ClauseRef] {
        &self.by_lit[lit.code()]
    }

    /// Number of long clauses containing the given literal.
    pub fn count(&self, lit: Lit) -> usize {
        self.by_lit[lit.code()].len()
    }

    /// Register a clause containing the given literal.
    pub fn add_occurrence(&mut self, lit: Lit, cref: ClauseRef) {
        debug_assert!(self.enabled);
        self.by_lit[lit.code()].push(cref);
    }

    /// Remove a clause from the given literal's list.
    pub fn remove_occurrence(&mut self, lit: Lit, cref: ClauseRef) {
        debug_assert!(self.enabled);
        let list = &mut self.by_lit[lit.code()];
        if let Some(pos) = list.iter().position(|&entry| entry == cref) {
            list.swap_remove(pos);
        }
    }
}

/// Build the occurrence lists from the clause database.
pub fn build_occurrences(
    mut ctx: partial!(Context, mut OccurrencesP, ClauseAllocP, ClauseDbP),
) {
    let (occurrences, mut ctx) = ctx.split_part_mut(OccurrencesP);
    let (alloc, ctx) = ctx.split_part(ClauseAllocP);

    occurrences.enabled = true;
    for list in occurrences.by_lit.iter_mut() {
        list.clear();
    }

    for &cref in ctx.part(ClauseDbP).clauses.iter() {
        let clause = alloc.clause(cref);
        if clause.header().deleted() {
            continue;
        }
        for &lit in clause.lits() {
            occurrences.by_lit[lit.code()].push(cref);
        }
    }
}
