//! Per-variable metadata.
use bitflags::bitflags;

use ironsat_formula::Lit;

bitflags! {
    /// Per-variable scheduling flags of the inprocessing passes.
    ///
    /// The transient marks of conflict analysis (seen, poison, removable and friends) live in
    /// the analyzer's own scratch space instead, as they are reset after every conflict anyway.
    #[derive(Default)]
    pub struct VarFlags: u8 {
        /// Variable appeared in a clause added since the last subsumption round.
        const ADDED = 1 << 0;
        /// Variable appeared in a clause removed since the last elimination round.
        const REMOVED = 1 << 1;
    }
}

/// Lifecycle status of a variable.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum VarStatus {
    /// Participates in search and may appear in new clauses.
    Active,
    /// Assigned at level 0.
    Fixed,
    /// Removed by variable elimination, value recovered during reconstruction.
    Eliminated,
    /// Replaced by an equivalent literal, value recovered during reconstruction.
    Substituted,
}

impl Default for VarStatus {
    fn default() -> VarStatus {
        VarStatus::Active
    }
}

/// Metadata of a solver variable.
pub struct VarData {
    pub flags: VarFlags,
    pub status: VarStatus,
    /// Number of active freeze requests.
    pub frozen: u32,
    /// Polarity bits marking the variable as assumed.
    assumed: u8,
    /// Polarity bits marking the assumption as part of the failed core.
    failed: u8,
}

impl Default for VarData {
    fn default() -> VarData {
        VarData {
            // New variables are due for the next subsumption and elimination rounds.
            flags: VarFlags::ADDED | VarFlags::REMOVED,
            status: VarStatus::Active,
            frozen: 0,
            assumed: 0,
            failed: 0,
        }
    }
}

fn polarity_bit(lit: Lit) -> u8 {
    1 << (lit.is_negative() as u8)
}

impl VarData {
    /// Whether the given literal of this variable is assumed.
    pub fn is_assumed(&self, lit: Lit) -> bool {
        self.assumed & polarity_bit(lit) != 0
    }

    /// Mark or unmark the given literal as assumed.
    pub fn set_assumed(&mut self, lit: Lit, assumed: bool) {
        if assumed {
            self.assumed |= polarity_bit(lit);
        } else {
            self.assumed &= !polarity_bit(lit);
        }
    }

    /// Whether the given literal is part of the failed assumption core.
    pub fn is_failed(&self, lit: Lit) -> bool {
        self.failed & polarity_bit(lit) != 0
    }

    /// Mark or unmark the given literal as failed.
    pub fn set_failed(&mut self, lit: Lit, failed: bool) {
        if failed {
            self.failed |= polarity_bit(lit);
        } else {
            self.failed &= !polarity_bit(lit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assumed_and_failed_are_per_polarity() {
        let mut data = VarData::default();
        let lit = Lit::from_dimacs(1);

        data.set_assumed(lit, true);
        assert!(data.is_assumed(lit));
        assert!(!data.is_assumed(!lit));

        data.set_failed(!lit, true);
        assert!(data.is_failed(!lit));
        assert!(!data.is_failed(lit));

        data.set_assumed(lit, false);
        assert!(!data.is_assumed(lit));
    }
}
