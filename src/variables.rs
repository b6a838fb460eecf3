//! Density variables a functional may depend on

use crate::{Result, XcError};
use std::fmt;
use std::str::FromStr;

/// Number of canonical variable positions
pub const VARIABLE_COUNT: usize = 5;

/// One of the five density variables, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Variable {
    /// Alpha density
    Ra,
    /// Beta density
    Rb,
    /// Norm of the alpha density gradient
    Ga,
    /// Norm of the beta density gradient
    Gb,
    /// Scalar product of the alpha and beta gradients
    Gab,
}

impl Variable {
    pub const ALL: [Variable; VARIABLE_COUNT] = [
        Variable::Ra,
        Variable::Rb,
        Variable::Ga,
        Variable::Gb,
        Variable::Gab,
    ];

    /// Symbol name used in expressions
    pub fn name(self) -> &'static str {
        match self {
            Variable::Ra => "ra",
            Variable::Rb => "rb",
            Variable::Ga => "ga",
            Variable::Gb => "gb",
            Variable::Gab => "gab",
        }
    }

    /// Canonical position, also the digit position in slot names
    pub fn position(self) -> usize {
        self as usize
    }

    /// Field of `FunDensProp` holding this variable
    pub fn c_accessor(self) -> &'static str {
        match self {
            Variable::Ra => "dp->rhoa",
            Variable::Rb => "dp->rhob",
            Variable::Ga => "dp->grada",
            Variable::Gb => "dp->gradb",
            Variable::Gab => "dp->gradab",
        }
    }

    pub fn is_gradient(self) -> bool {
        matches!(self, Variable::Ga | Variable::Gb | Variable::Gab)
    }

    /// Densities and gradient norms; `gab` is a dot product and may be negative
    pub fn is_non_negative(self) -> bool {
        !matches!(self, Variable::Gab)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variable {
    type Err = XcError;

    fn from_str(s: &str) -> Result<Self> {
        Variable::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| XcError::invalid_config(format!("unknown variable '{s}'")))
    }
}

/// Ordered, duplicate-free, non-empty list of variables
///
/// The order drives derivative enumeration; it does not have to be canonical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableList {
    vars: Vec<Variable>,
}

impl VariableList {
    pub fn new(vars: impl IntoIterator<Item = Variable>) -> Result<Self> {
        let vars: Vec<Variable> = vars.into_iter().collect();
        if vars.is_empty() {
            return Err(XcError::invalid_config("variable list is empty"));
        }
        for (i, v) in vars.iter().enumerate() {
            if vars[..i].contains(v) {
                return Err(XcError::invalid_config(format!(
                    "variable '{v}' listed twice"
                )));
            }
        }
        Ok(Self { vars })
    }

    /// `[ra, rb, ga, gb]`, plus `gab` when `cross` is set; `[ra, rb]` for LDA
    pub fn coupled(gga: bool, cross: bool) -> Result<Self> {
        match (gga, cross) {
            (false, true) => Err(XcError::invalid_config(
                "cross-gradient term requires gradient variables",
            )),
            (false, false) => Self::new([Variable::Ra, Variable::Rb]),
            (true, false) => Self::new([Variable::Ra, Variable::Rb, Variable::Ga, Variable::Gb]),
            (true, true) => Self::new(Variable::ALL),
        }
    }

    /// Channel a: `[ra]` or `[ra, ga]`
    pub fn alpha(gga: bool) -> Self {
        if gga {
            Self { vars: vec![Variable::Ra, Variable::Ga] }
        } else {
            Self { vars: vec![Variable::Ra] }
        }
    }

    /// Channel b: `[rb]` or `[rb, gb]`
    pub fn beta(gga: bool) -> Self {
        if gga {
            Self { vars: vec![Variable::Rb, Variable::Gb] }
        } else {
            Self { vars: vec![Variable::Rb] }
        }
    }

    pub fn as_slice(&self) -> &[Variable] {
        &self.vars
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn contains(&self, var: Variable) -> bool {
        self.vars.contains(&var)
    }

    /// Index of `var` in this list
    pub fn index_of(&self, var: Variable) -> Option<usize> {
        self.vars.iter().position(|v| *v == var)
    }

    pub fn iter(&self) -> impl Iterator<Item = Variable> + '_ {
        self.vars.iter().copied()
    }
}

impl fmt::Display for VariableList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.vars.iter().map(|v| v.name()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_and_accessors() {
        assert_eq!(Variable::Ra.position(), 0);
        assert_eq!(Variable::Gab.position(), 4);
        assert_eq!(Variable::Gb.c_accessor(), "dp->gradb");
        assert_eq!("gab".parse::<Variable>().unwrap(), Variable::Gab);
        assert!("rc".parse::<Variable>().is_err());
        assert!(Variable::Gb.is_non_negative());
        assert!(!Variable::Gab.is_non_negative());
    }

    #[test]
    fn test_list_validation() {
        assert!(VariableList::new([]).is_err());
        assert!(VariableList::new([Variable::Ra, Variable::Ra]).is_err());
        let list = VariableList::new([Variable::Ga, Variable::Ra]).unwrap();
        assert_eq!(list.index_of(Variable::Ra), Some(1));
        assert_eq!(list.to_string(), "[ga, ra]");
    }

    #[test]
    fn test_variants() {
        assert_eq!(VariableList::coupled(true, true).unwrap().len(), 5);
        assert_eq!(VariableList::coupled(false, false).unwrap().len(), 2);
        assert!(VariableList::coupled(false, true).is_err());
        assert_eq!(
            VariableList::beta(true).as_slice(),
            &[Variable::Rb, Variable::Gb]
        );
    }
}
