//! YAML functional definitions
//!
//! ```yaml
//! name: Slater
//! decoupled: true
//! threshold: 1.0e-20
//! parameters:
//!   PREF: "-3/4*(6/pi)^(1/3)"
//! alpha: "PREF*ra^(4/3)"
//! beta: "PREF*rb^(4/3)"
//! ```
//!
//! Parameters are named sub-expressions substituted into the channel
//! expressions before anything is differentiated; they may refer to each other.

use crate::functional::{Channels, Functional};
use crate::variables::Variable;
use crate::{Expr, Result, XcError, parse};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A functional as written in a configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionalConfig {
    /// Display name; its lowercase form names the C routines
    pub name: String,

    /// Independent alpha and beta channels instead of one expression
    #[serde(default)]
    pub decoupled: bool,

    /// Whether gradients participate; inferred from the expressions when absent
    #[serde(default)]
    pub gga: Option<bool>,

    /// Include the `gab` cross-gradient variable
    #[serde(default)]
    pub cross: bool,

    /// Density below which a decoupled channel is skipped
    #[serde(default)]
    pub threshold: Option<f64>,

    /// Named sub-expressions
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,

    /// Coupled expression
    #[serde(default)]
    pub expression: Option<String>,

    /// Alpha channel of a decoupled functional
    #[serde(default)]
    pub alpha: Option<String>,

    /// Beta channel of a decoupled functional
    #[serde(default)]
    pub beta: Option<String>,

    /// C declarations emitted before the energy routine
    #[serde(default)]
    pub preamble: Option<String>,

    /// Factor in front of every emitted value, e.g. `EPREF*`
    #[serde(default)]
    pub prefix: Option<String>,

    /// Text for the file banner
    #[serde(default)]
    pub info: Option<String>,
}

impl FunctionalConfig {
    /// # Errors
    /// `XcError::Config` when the text is not a valid definition.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Parse the expressions, substitute parameters and build the functional
    ///
    /// # Errors
    /// Parse errors of any expression, and `XcError::InvalidConfig` for
    /// missing or conflicting channel expressions or cyclic parameters.
    pub fn into_functional(self) -> Result<Functional> {
        let parameters = self.resolve_parameters()?;
        let load = |text: &str| -> Result<Expr> { Ok(substitute_all(&parse(text)?, &parameters)) };

        let channels = match (self.decoupled, &self.expression, &self.alpha, &self.beta) {
            (false, Some(expr), None, None) => Channels::Coupled(load(expr.as_str())?),
            (true, None, Some(alpha), Some(beta)) => Channels::Decoupled {
                alpha: load(alpha.as_str())?,
                beta: load(beta.as_str())?,
            },
            (false, _, _, _) => {
                return Err(XcError::invalid_config(
                    "a coupled functional needs 'expression' and no 'alpha'/'beta'",
                ));
            }
            (true, _, _, _) => {
                return Err(XcError::invalid_config(
                    "a decoupled functional needs 'alpha' and 'beta' and no 'expression'",
                ));
            }
        };

        let gga = self.gga.unwrap_or_else(|| uses_gradients(&channels));
        let mut functional = Functional::with_channels(self.name, channels)
            .gga(gga)
            .cross(self.cross);
        if let Some(t) = self.threshold {
            functional = functional.threshold(t);
        }
        if let Some(preamble) = self.preamble {
            functional = functional.preamble(preamble);
        }
        if let Some(prefix) = self.prefix {
            functional = functional.prefix(prefix);
        }
        if let Some(info) = self.info {
            functional = functional.info(info);
        }
        functional.validate()?;
        Ok(functional)
    }

    /// Parameter expressions with every parameter reference expanded
    fn resolve_parameters(&self) -> Result<Vec<(String, Expr)>> {
        let mut resolved = Vec::with_capacity(self.parameters.len());
        for (name, text) in &self.parameters {
            if name.parse::<Variable>().is_ok() {
                return Err(XcError::invalid_config(format!(
                    "parameter '{name}' shadows a density variable"
                )));
            }
            resolved.push((name.clone(), parse(text)?));
        }
        // each pass expands one level of nesting
        for _ in 0..=resolved.len() {
            let pending = resolved
                .iter()
                .any(|(_, expr)| resolved.iter().any(|(n, _)| expr.contains_var(n)));
            if !pending {
                return Ok(resolved);
            }
            let snapshot = resolved.clone();
            for (_, expr) in &mut resolved {
                *expr = substitute_all(expr, &snapshot);
            }
        }
        Err(XcError::invalid_config("parameters refer to each other in a cycle"))
    }
}

fn substitute_all(expr: &Expr, parameters: &[(String, Expr)]) -> Expr {
    parameters
        .iter()
        .fold(expr.clone(), |e, (name, value)| e.substitute(name, value))
}

fn uses_gradients(channels: &Channels) -> bool {
    let exprs: Vec<&Expr> = match channels {
        Channels::Coupled(expr) => vec![expr],
        Channels::Decoupled { alpha, beta } => vec![alpha, beta],
    };
    exprs.iter().any(|e| {
        Variable::ALL
            .iter()
            .any(|v| v.is_gradient() && e.contains_var(v.name()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functional::DensityPoint;

    const SLATER: &str = r#"
name: Slater
decoupled: true
threshold: 1.0e-20
parameters:
  PREF: "-3/4*(6/pi)^(1/3)"
alpha: "PREF*ra^(4/3)"
beta: "PREF*rb^(4/3)"
"#;

    #[test]
    fn test_slater_from_yaml() {
        let f = FunctionalConfig::from_yaml_str(SLATER)
            .unwrap()
            .into_functional()
            .unwrap();
        assert_eq!(f.name(), "slater");
        assert!(f.is_decoupled());
        assert!(!f.is_gga());
        let pref = -0.75 * (6.0 / std::f64::consts::PI).cbrt();
        let e = f.energy_at(&DensityPoint::lda(1.0, 1.0)).unwrap();
        assert!((e - 2.0 * pref).abs() < 1e-12);
    }

    #[test]
    fn test_gga_is_inferred() {
        let yaml = "name: Example\nexpression: \"ra*ga^2 + rb*gb^2\"\n";
        let f = FunctionalConfig::from_yaml_str(yaml).unwrap().into_functional().unwrap();
        assert!(f.is_gga());
        assert!(matches!(f.channels(), Channels::Coupled(_)));
    }

    #[test]
    fn test_nested_parameters() {
        let yaml = r#"
name: Nested
parameters:
  A: "2*B"
  B: "3"
expression: "A*ra"
"#;
        let f = FunctionalConfig::from_yaml_str(yaml).unwrap().into_functional().unwrap();
        let e = f.energy_at(&DensityPoint::lda(1.5, 0.0)).unwrap();
        assert!((e - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_cyclic_parameters() {
        let yaml = "name: Cycle\nparameters:\n  A: \"B\"\n  B: \"A\"\nexpression: \"A*ra\"\n";
        let err = FunctionalConfig::from_yaml_str(yaml).unwrap().into_functional();
        assert!(matches!(err, Err(XcError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_channel() {
        let yaml = "name: Half\ndecoupled: true\nalpha: \"ra\"\n";
        let err = FunctionalConfig::from_yaml_str(yaml).unwrap().into_functional();
        assert!(matches!(err, Err(XcError::InvalidConfig(_))));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = FunctionalConfig::from_yaml_str("name: X\nexpresion: \"ra\"\n");
        assert!(matches!(err, Err(XcError::Config(_))));
        assert!(err.unwrap_err().is_config_error());
    }
}
