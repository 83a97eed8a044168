//! Temporary data.
use ironsat_formula::Lit;

/// Temporary literal buffers used by various parts of the solver.
///
/// Users need to make sure they do not call into other code that also uses these buffers while
/// holding data in them.
#[derive(Default)]
pub struct TmpData {
    pub lits: Vec<Lit>,
    pub lits_2: Vec<Lit>,
}

/// A boolean flag for each literal.
///
/// Also used for variable indexed or decision level indexed flags, both of which need at most
/// half the entries. Users need to reset all flags they set before returning.
#[derive(Default)]
pub struct TmpFlags {
    pub flags: Vec<bool>,
}

impl TmpFlags {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.flags.resize(count * 2, false);
    }
}
