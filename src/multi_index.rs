//! Multi-indices: how many times each variable has been differentiated against

use crate::cache::MAX_ORDER;
use crate::variables::{VARIABLE_COUNT, Variable, VariableList};
use crate::{Result, XcError};
use std::fmt;

/// Per-variable differentiation counts, indexed by canonical position
///
/// Two multi-indices are equal whenever they count the same multiset, no
/// matter in which order the differentiations happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct MultiIndex {
    counts: [u8; VARIABLE_COUNT],
}

impl MultiIndex {
    /// The empty index (the base expression)
    pub fn zero() -> Self {
        Self::default()
    }

    /// Index reached by differentiating along `path`
    ///
    /// # Errors
    /// `XcError::InvalidOrder` for paths longer than `MAX_ORDER`.
    pub fn from_path(path: &[Variable]) -> Result<Self> {
        path.iter().try_fold(Self::zero(), |idx, v| idx.incremented(*v))
    }

    /// Copy with one more differentiation against `var`
    ///
    /// # Errors
    /// `XcError::InvalidOrder` when the index is already at `MAX_ORDER`.
    pub fn incremented(mut self, var: Variable) -> Result<Self> {
        let order = self.order();
        if order >= usize::from(MAX_ORDER) {
            return Err(XcError::InvalidOrder(u8::try_from(order + 1).unwrap_or(u8::MAX)));
        }
        self.counts[var.position()] += 1;
        Ok(self)
    }

    pub fn count(&self, var: Variable) -> u8 {
        self.counts[var.position()]
    }

    /// Total derivative order
    pub fn order(&self) -> usize {
        self.counts.iter().map(|&c| c as usize).sum()
    }

    /// Position in `vars` of the last variable differentiated against
    ///
    /// Enumeration only extends an index with variables at this position or
    /// later, which visits every multiset exactly once. `None` for the empty
    /// index or when the index uses a variable outside `vars`.
    pub fn last_position(&self, vars: &VariableList) -> Option<usize> {
        let mut last = None;
        for v in Variable::ALL {
            if self.count(v) > 0 {
                let pos = vars.index_of(v)?;
                last = Some(last.map_or(pos, |l: usize| l.max(pos)));
            }
        }
        last
    }

    /// Accumulator field name: `df` + ra, rb, ga, gb counts (+ gab count if nonzero)
    pub fn slot_name(&self) -> String {
        let mut name = String::with_capacity(7);
        name.push_str("df");
        for c in &self.counts[..4] {
            name.push(char::from(b'0' + c));
        }
        if self.counts[4] > 0 {
            name.push(char::from(b'0' + self.counts[4]));
        }
        name
    }
}

impl fmt::Display for MultiIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.slot_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Variable::*;

    fn path(vars: &[Variable]) -> MultiIndex {
        MultiIndex::from_path(vars).unwrap()
    }

    #[test]
    fn test_slot_names() {
        assert_eq!(path(&[Ra, Ga, Ga]).slot_name(), "df1020");
        assert_eq!(path(&[Rb, Gab]).slot_name(), "df01001");
        assert_eq!(path(&[Ra]).slot_name(), "df1000");
        assert_eq!(path(&[Gb, Gb, Gb, Gb]).slot_name(), "df0004");
    }

    #[test]
    fn test_path_independence() {
        let a = path(&[Ra, Ga, Ra]);
        let b = path(&[Ga, Ra, Ra]);
        assert_eq!(a, b);
        assert_eq!(a.order(), 3);
    }

    #[test]
    fn test_last_position_uses_list_order() {
        let vars = VariableList::new([Ga, Ra]).unwrap();
        let idx = path(&[Ra]);
        assert_eq!(idx.last_position(&vars), Some(1));
        let idx = path(&[Ga]);
        assert_eq!(idx.last_position(&vars), Some(0));
        assert_eq!(MultiIndex::zero().last_position(&vars), None);
        assert_eq!(path(&[Rb]).last_position(&vars), None);
    }

    #[test]
    fn test_paths_beyond_fourth_order_are_rejected() {
        assert_eq!(path(&[Gab; 4]).slot_name(), "df00004");
        assert_eq!(MultiIndex::from_path(&[Ra; 5]), Err(XcError::InvalidOrder(5)));
        assert_eq!(MultiIndex::from_path(&[Rb; 300]), Err(XcError::InvalidOrder(5)));
        assert_eq!(path(&[Ra, Rb, Ga, Gb]).incremented(Ra), Err(XcError::InvalidOrder(5)));
    }
}
