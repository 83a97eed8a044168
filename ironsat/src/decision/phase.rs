//! Phase saving, target phases and rephasing.
//!
//! Every backtracked assignment saves its value as the variable's phase, which the next decision
//! on that variable reuses. In stable mode decisions follow the *target* phase, the assignment
//! of the largest conflict free trail seen in the current stabilization phase. The *best* phase
//! is the same over the whole search and is one of the assignments the periodic rephasing can
//! reset the saved phases to.
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use ironsat_formula::{Lit, Var};

/// How a rephasing resets the saved phases.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Rephase {
    /// Reset to the configured initial phase.
    Original,
    /// Invert every saved phase.
    Flipping,
    /// Reset to the negation of the configured initial phase.
    Inverted,
    /// Reset to uniformly random phases.
    Random,
    /// Reset to the best phase.
    Best,
}

/// Rotation of rephasing kinds, interleaving the best phase with the resetting variants.
const REPHASE_SCHEDULE: [Rephase; 8] = [
    Rephase::Original,
    Rephase::Best,
    Rephase::Flipping,
    Rephase::Best,
    Rephase::Inverted,
    Rephase::Best,
    Rephase::Random,
    Rephase::Best,
];

/// Saved, target and best phases.
pub struct Phases {
    /// Default phase of never assigned variables.
    initial: bool,
    saved: Vec<bool>,
    target: Vec<bool>,
    best: Vec<bool>,
    /// Trail size that produced the current target phases, zero if none.
    target_len: usize,
    /// Trail size that produced the current best phases, zero if none.
    best_len: usize,
    /// Number of rephasings performed.
    rephased: u64,
    rng: SmallRng,
}

impl Default for Phases {
    fn default() -> Phases {
        Phases {
            initial: false,
            saved: vec![],
            target: vec![],
            best: vec![],
            target_len: 0,
            best_len: 0,
            rephased: 0,
            rng: SmallRng::seed_from_u64(0),
        }
    }
}

impl Phases {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.saved.resize(count, self.initial);
        self.target.resize(count, self.initial);
        self.best.resize(count, self.initial);
    }

    /// Change the default phase for new variables.
    pub fn set_initial(&mut self, initial: bool) {
        self.initial = initial;
    }

    /// Reseed the phase randomization.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
    }

    /// Save the phase of a variable that is being unassigned.
    pub fn save(&mut self, var: Var, value: bool) {
        self.saved[var.index()] = value;
    }

    /// The saved phase of a variable.
    pub fn saved(&self, var: Var) -> bool {
        self.saved[var.index()]
    }

    /// The target phase of a variable, if targets were recorded.
    pub fn target(&self, var: Var) -> Option<bool> {
        if self.target_len > 0 {
            Some(self.target[var.index()])
        } else {
            None
        }
    }

    /// Record the current trail as target and best phases when it improves on them.
    ///
    /// Called before a restart unwinds the trail.
    pub fn update_target_and_best(&mut self, trail: &[Lit]) {
        if trail.len() > self.target_len {
            self.target_len = trail.len();
            for &lit in trail {
                self.target[lit.index()] = lit.is_positive();
            }
        }
        if trail.len() > self.best_len {
            self.best_len = trail.len();
            for &lit in trail {
                self.best[lit.index()] = lit.is_positive();
            }
        }
    }

    /// Forget the target phases.
    ///
    /// Called when a new stabilization phase begins.
    pub fn reset_target(&mut self) {
        self.target_len = 0;
    }

    /// Reset the saved phases according to the rotating rephase schedule.
    ///
    /// Returns the applied kind.
    pub fn rephase(&mut self) -> Rephase {
        let kind = REPHASE_SCHEDULE[(self.rephased % REPHASE_SCHEDULE.len() as u64) as usize];
        self.rephased += 1;

        match kind {
            Rephase::Original => {
                for phase in self.saved.iter_mut() {
                    *phase = self.initial;
                }
            }
            Rephase::Flipping => {
                for phase in self.saved.iter_mut() {
                    *phase = !*phase;
                }
            }
            Rephase::Inverted => {
                for phase in self.saved.iter_mut() {
                    *phase = !self.initial;
                }
            }
            Rephase::Random => {
                for phase in self.saved.iter_mut() {
                    *phase = self.rng.gen();
                }
            }
            Rephase::Best => {
                self.saved.copy_from_slice(&self.best);
            }
        }

        self.reset_target();

        kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_rotates() {
        let mut phases = Phases::default();
        phases.set_var_count(4);

        assert_eq!(phases.rephase(), Rephase::Original);
        assert_eq!(phases.rephase(), Rephase::Best);
        assert_eq!(phases.rephase(), Rephase::Flipping);
        assert!(phases.saved.iter().all(|&phase| phase));
        assert_eq!(phases.rephase(), Rephase::Best);
        assert!(phases.saved.iter().all(|&phase| !phase));
    }

    #[test]
    fn target_tracks_largest_trail() {
        let mut phases = Phases::default();
        phases.set_var_count(4);

        let var = Var::from_index(2);
        assert_eq!(phases.target(var), None);

        phases.update_target_and_best(&[Lit::positive(var)]);
        assert_eq!(phases.target(var), Some(true));

        // A smaller trail does not override the target.
        phases.update_target_and_best(&[Lit::negative(var)]);
        assert_eq!(phases.target(var), Some(true));

        phases.reset_target();
        assert_eq!(phases.target(var), None);
    }
}
