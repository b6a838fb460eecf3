use crate::{Expr, Result, XcError};
use rustc_hash::FxHashMap;
use std::ops::RangeInclusive;
use std::sync::OnceLock;

/// Definition of a mathematical function including its evaluation, differentiation and C spelling
#[derive(Clone)]
pub(crate) struct FunctionDefinition {
    /// Canonical name of the function (e.g., "exp", "log")
    pub name: &'static str,

    /// Name of the C99 `<math.h>` routine implementing it
    pub c_name: &'static str,

    /// Acceptable argument count (arity)
    pub arity: RangeInclusive<usize>,

    /// Numerical evaluation function
    pub eval: fn(&[f64]) -> Option<f64>,

    /// Symbolic differentiation function
    /// Arguments: (args of the function call, derivatives of the arguments)
    /// Returns the total derivative dA/dx = sum( (dA/d_arg_i) * (d_arg_i/dx) )
    pub derivative: fn(&[Expr], &[Expr]) -> Expr,
}

impl FunctionDefinition {
    /// Helper to check if argument count is valid
    pub(crate) fn validate_arity(&self, args: usize) -> bool {
        self.arity.contains(&args)
    }
}

/// Static registry storing all function definitions
static REGISTRY: OnceLock<FxHashMap<&'static str, FunctionDefinition>> = OnceLock::new();

/// Initialize the registry with all function definitions
fn init_registry() -> FxHashMap<&'static str, FunctionDefinition> {
    let defs = crate::functions::definitions::all_definitions();
    let mut map = FxHashMap::with_capacity_and_hasher(defs.len(), Default::default());
    for def in defs {
        map.insert(def.name, def);
    }
    map
}

/// Central registry for getting function definitions
pub(crate) struct Registry;

impl Registry {
    /// Get a function definition by name
    pub(crate) fn get(name: &str) -> Option<&'static FunctionDefinition> {
        REGISTRY.get_or_init(init_registry).get(name)
    }

    /// Get a function definition that accepts `arity` arguments
    pub(crate) fn lookup(name: &str, arity: usize) -> Result<&'static FunctionDefinition> {
        Registry::get(name)
            .filter(|def| def.validate_arity(arity))
            .ok_or_else(|| XcError::UnknownFunction {
                name: name.to_string(),
                arity,
            })
    }

    /// Check whether a name refers to a known function
    #[cfg(test)]
    pub(crate) fn contains(name: &str) -> bool {
        Registry::get(name).is_some()
    }
}
