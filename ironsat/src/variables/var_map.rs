//! Mapping between variable namespaces.
use ironsat_formula::{LitIdx, Var};

const NO_VAR: LitIdx = LitIdx::max_value();

/// A partial map from variables to variables.
///
/// Backed by a dense vector indexed by the source variable.
#[derive(Default)]
pub struct VarMap {
    mapping: Vec<LitIdx>,
}

impl VarMap {
    /// The image of a variable.
    pub fn get(&self, from: Var) -> Option<Var> {
        match self.mapping.get(from.index()).cloned() {
            Some(index) if index != NO_VAR => Some(Var::from_index(index as usize)),
            _ => None,
        }
    }

    /// Add a variable to the map's domain.
    ///
    /// The variable must not be present yet.
    pub fn insert(&mut self, from: Var, to: Var) {
        if self.mapping.len() <= from.index() {
            self.mapping.resize(from.index() + 1, NO_VAR);
        }
        let entry = &mut self.mapping[from.index()];
        debug_assert_eq!(*entry, NO_VAR);
        *entry = to.index() as LitIdx;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_domain() {
        let mut map = VarMap::default();
        map.insert(Var::from_index(5), Var::from_index(0));
        map.insert(Var::from_index(2), Var::from_index(1));

        assert_eq!(map.get(Var::from_index(5)), Some(Var::from_index(0)));
        assert_eq!(map.get(Var::from_index(2)), Some(Var::from_index(1)));
        assert_eq!(map.get(Var::from_index(0)), None);
        assert_eq!(map.get(Var::from_index(100)), None);
    }
}
