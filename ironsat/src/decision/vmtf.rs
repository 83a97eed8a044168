//! The VMTF decision queue.
//!
//! Variables are kept in a doubly linked queue ordered by the time they were last bumped. A
//! decision picks the most recently bumped unassigned variable. A cursor caches the position
//! from which the search for an unassigned variable starts; backtracking moves it up whenever a
//! variable above it becomes unassigned, so the amortized cost of a decision stays low.
//!
//! Bumping dequeues the involved variables and re-enqueues them at the front in their previous
//! relative order, which keeps the queue stable under repeated bumps.
use ironsat_formula::{LitIdx, Var};

use crate::prop::Assignment;
use crate::variables::Variables;

const NIL: LitIdx = LitIdx::max_value();

#[derive(Copy, Clone)]
struct Link {
    prev: LitIdx,
    next: LitIdx,
}

/// The VMTF decision queue.
pub struct Vmtf {
    links: Vec<Link>,
    /// Bump timestamp of each variable.
    btab: Vec<u64>,
    /// Oldest entry of the queue.
    first: LitIdx,
    /// Newest entry of the queue.
    last: LitIdx,
    /// Cursor with a timestamp at least as large as every unassigned variable's.
    unassigned: LitIdx,
    stamp: u64,
}

impl Default for Vmtf {
    fn default() -> Vmtf {
        Vmtf {
            links: vec![],
            btab: vec![],
            first: NIL,
            last: NIL,
            unassigned: NIL,
            stamp: 0,
        }
    }
}

impl Vmtf {
    /// Update structures for a new variable count.
    ///
    /// New variables enter at the front of the queue and become the next decision candidates.
    pub fn set_var_count(&mut self, count: usize) {
        let old_count = self.links.len();
        self.links.resize(
            count,
            Link {
                prev: NIL,
                next: NIL,
            },
        );
        self.btab.resize(count, 0);

        for index in old_count..count {
            self.enqueue(Var::from_index(index));
        }
    }

    fn enqueue(&mut self, var: Var) {
        let index = var.index() as LitIdx;
        self.stamp += 1;
        self.btab[var.index()] = self.stamp;

        self.links[var.index()] = Link {
            prev: self.last,
            next: NIL,
        };
        if self.last != NIL {
            self.links[self.last as usize].next = index;
        } else {
            self.first = index;
        }
        self.last = index;

        self.unassigned = index;
    }

    fn dequeue(&mut self, var: Var) {
        let Link { prev, next } = self.links[var.index()];

        if prev != NIL {
            self.links[prev as usize].next = next;
        } else {
            self.first = next;
        }
        if next != NIL {
            self.links[next as usize].prev = prev;
        } else {
            self.last = prev;
        }

        if self.unassigned == var.index() as LitIdx {
            self.unassigned = if prev != NIL { prev } else { next };
        }
    }

    /// The bump timestamp of a variable.
    pub fn stamp_of(&self, var: Var) -> u64 {
        self.btab[var.index()]
    }

    /// Bump the analyzed variables by moving them to the front of the queue.
    ///
    /// The variables are re-enqueued in the order of their previous timestamps, keeping their
    /// relative queue order.
    pub fn bump_analyzed(&mut self, vars: &mut Vec<Var>) {
        vars.sort_unstable_by_key(|var| self.btab[var.index()]);
        for &var in vars.iter() {
            self.dequeue(var);
            self.enqueue(var);
        }
    }

    /// Move the cursor up to a variable that became unassigned.
    pub fn update_unassigned(&mut self, var: Var) {
        if self.unassigned == NIL || self.btab[var.index()] > self.btab[self.unassigned as usize] {
            self.unassigned = var.index() as LitIdx;
        }
    }

    /// The most recently bumped variable that is unassigned and active.
    ///
    /// Walks from the cursor towards older entries and leaves the cursor on the result.
    pub fn next_decision(
        &mut self,
        assignment: &Assignment,
        variables: &Variables,
    ) -> Option<Var> {
        let mut index = self.unassigned;
        while index != NIL {
            let var = Var::from_index(index as usize);
            if assignment.var_value(var).is_none() && variables.is_active(var) {
                break;
            }
            index = self.links[index as usize].prev;
        }
        self.unassigned = index;
        if index == NIL {
            None
        } else {
            Some(Var::from_index(index as usize))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::variables::Variables;

    fn setup(count: usize) -> (Vmtf, Assignment, Variables) {
        let mut vmtf = Vmtf::default();
        let mut assignment = Assignment::default();
        let mut variables = Variables::default();
        for i in 0..count {
            variables.solver_from_user(Var::from_index(i));
        }
        vmtf.set_var_count(count);
        assignment.set_var_count(count);
        (vmtf, assignment, variables)
    }

    #[test]
    fn new_vars_first() {
        let (mut vmtf, assignment, variables) = setup(4);
        assert_eq!(
            vmtf.next_decision(&assignment, &variables),
            Some(Var::from_index(3))
        );
    }

    #[test]
    fn bump_moves_to_front() {
        let (mut vmtf, assignment, variables) = setup(4);

        vmtf.bump_analyzed(&mut vec![Var::from_index(1), Var::from_index(0)]);
        assert_eq!(
            vmtf.next_decision(&assignment, &variables),
            Some(Var::from_index(1))
        );
    }

    #[test]
    fn skips_assigned_and_restores_cursor() {
        let (mut vmtf, mut assignment, variables) = setup(3);

        assignment.assign_lit(Var::from_index(2).positive());
        assert_eq!(
            vmtf.next_decision(&assignment, &variables),
            Some(Var::from_index(1))
        );

        assignment.assign_lit(Var::from_index(1).negative());
        assert_eq!(
            vmtf.next_decision(&assignment, &variables),
            Some(Var::from_index(0))
        );

        // Unassigning a more recently bumped variable moves the cursor back up.
        assignment.unassign_var(Var::from_index(2));
        vmtf.update_unassigned(Var::from_index(2));
        assert_eq!(
            vmtf.next_decision(&assignment, &variables),
            Some(Var::from_index(2))
        );
    }

    #[test]
    fn bump_keeps_relative_order() {
        let (mut vmtf, assignment, variables) = setup(4);

        let mut vars = vec![Var::from_index(3), Var::from_index(1)];
        vmtf.bump_analyzed(&mut vars);

        // 1 was older than 3, so 3 stays the most recent.
        assert_eq!(
            vmtf.next_decision(&assignment, &variables),
            Some(Var::from_index(3))
        );
        assert!(vmtf.stamp_of(Var::from_index(3)) > vmtf.stamp_of(Var::from_index(1)));
        assert!(vmtf.stamp_of(Var::from_index(1)) > vmtf.stamp_of(Var::from_index(2)));
    }
}
