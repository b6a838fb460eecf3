//! Functionals: one or two channel expressions turned into a C translation unit
//!
//! # Example
//! ```
//! use xcgen::{Functional, parse};
//!
//! let slater = Functional::decoupled(
//!     "Slater",
//!     parse("-0.9305257363491*ra^(4/3)").unwrap(),
//!     parse("-0.9305257363491*rb^(4/3)").unwrap(),
//! )
//! .threshold(1e-20);
//! let source = slater.to_c_source().unwrap();
//! assert!(source.contains("Functional SlaterFunctional = {"));
//! assert!(source.contains("if (dp->rhoa>SLATER_THRESHOLD)"));
//! ```

use crate::cache::{DerivativeCache, DerivativeOrder};
use crate::codegen::{Emitter, SymbolMap, render_c, render_number, template};
use crate::simplification::simplify_expr;
use crate::variables::{Variable, VariableList};
use crate::{Diff, Expr, Result, XcError};
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

/// Indentation of statements inside a threshold guard
const GUARDED_INDENT: &str = "     ";

/// How the energy is split over spin channels
#[derive(Debug, Clone, PartialEq)]
pub enum Channels {
    /// One expression in all variables
    Coupled(Expr),
    /// Independent alpha and beta expressions, no cross derivatives
    Decoupled { alpha: Expr, beta: Expr },
}

/// Density variables at one grid point
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DensityPoint {
    pub rhoa: f64,
    pub rhob: f64,
    pub grada: f64,
    pub gradb: f64,
    pub gradab: f64,
}

impl DensityPoint {
    /// Local density point without gradients
    pub fn lda(rhoa: f64, rhob: f64) -> Self {
        Self {
            rhoa,
            rhob,
            ..Self::default()
        }
    }

    pub fn value(&self, var: Variable) -> f64 {
        match var {
            Variable::Ra => self.rhoa,
            Variable::Rb => self.rhob,
            Variable::Ga => self.grada,
            Variable::Gb => self.gradb,
            Variable::Gab => self.gradab,
        }
    }

    fn bindings(&self) -> HashMap<&'static str, f64> {
        Variable::ALL
            .into_iter()
            .map(|v| (v.name(), self.value(v)))
            .collect()
    }
}

/// One expression with the variables it is differentiated against
struct Channel<'a> {
    expr: &'a Expr,
    vars: VariableList,
    /// Density checked against the threshold, for decoupled channels
    density: Option<Variable>,
}

/// An exchange-correlation functional and everything needed to generate its C source
#[derive(Debug, Clone)]
pub struct Functional {
    title: String,
    channels: Channels,
    gga: bool,
    cross: bool,
    threshold: Option<f64>,
    preamble: String,
    prefix: String,
    info: String,
    diff: Diff,
}

impl Functional {
    /// Functional with a single expression in `ra`, `rb` (and gradients when GGA)
    pub fn coupled(title: impl Into<String>, expr: Expr) -> Self {
        Self::with_channels(title, Channels::Coupled(expr))
    }

    /// Functional made of independent alpha (`ra`, `ga`) and beta (`rb`, `gb`) parts
    pub fn decoupled(title: impl Into<String>, alpha: Expr, beta: Expr) -> Self {
        Self::with_channels(title, Channels::Decoupled { alpha, beta })
    }

    pub fn with_channels(title: impl Into<String>, channels: Channels) -> Self {
        Self {
            title: title.into(),
            channels,
            gga: false,
            cross: false,
            threshold: None,
            preamble: String::new(),
            prefix: String::new(),
            info: String::new(),
            diff: Diff::new(),
        }
    }

    /// Whether gradient variables participate
    pub fn gga(mut self, gga: bool) -> Self {
        self.gga = gga;
        self
    }

    /// Add the `gab` cross-gradient variable (coupled GGA only)
    pub fn cross(mut self, cross: bool) -> Self {
        self.cross = cross;
        self
    }

    /// Skip a decoupled channel whose density is not above `threshold`
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// C declarations placed before the energy, e.g. `static const real PREF = 2;`
    pub fn preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = preamble.into();
        self
    }

    /// Factor written in front of every value, e.g. `EPREF*`
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Free text placed in the file banner
    pub fn info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }

    /// Differentiation settings used for every derivative
    pub fn diff(mut self, diff: Diff) -> Self {
        self.diff = diff;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Lowercase name used for C identifiers and the file name
    pub fn name(&self) -> String {
        self.title.to_lowercase()
    }

    pub fn channels(&self) -> &Channels {
        &self.channels
    }

    pub fn is_gga(&self) -> bool {
        self.gga
    }

    pub fn is_decoupled(&self) -> bool {
        matches!(self.channels, Channels::Decoupled { .. })
    }

    /// Reject flag combinations and expressions the C interface cannot express
    ///
    /// # Errors
    /// `XcError::InvalidConfig` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let mut chars = self.title.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(XcError::invalid_config(format!(
                "'{}' is not a valid C identifier",
                self.title
            )));
        }
        if self.is_decoupled() && self.cross {
            return Err(XcError::invalid_config(
                "decoupled functionals have no cross-gradient term",
            ));
        }
        if let Some(t) = self.threshold {
            if !self.is_decoupled() {
                return Err(XcError::invalid_config(
                    "a density threshold needs decoupled channels",
                ));
            }
            if !(t.is_finite() && t >= 0.0) {
                return Err(XcError::invalid_config(format!("invalid threshold {t}")));
            }
        }
        for channel in self.channel_list()? {
            for symbol in channel.expr.symbols() {
                if let Ok(var) = symbol.parse::<Variable>()
                    && !channel.vars.contains(var)
                {
                    return Err(XcError::invalid_config(format!(
                        "expression uses '{var}' outside its variables {}",
                        channel.vars
                    )));
                }
            }
        }
        Ok(())
    }

    fn channel_list(&self) -> Result<Vec<Channel<'_>>> {
        Ok(match &self.channels {
            Channels::Coupled(expr) => vec![Channel {
                expr,
                vars: VariableList::coupled(self.gga, self.cross)?,
                density: None,
            }],
            Channels::Decoupled { alpha, beta } => vec![
                Channel {
                    expr: alpha,
                    vars: VariableList::alpha(self.gga),
                    density: Some(Variable::Ra),
                },
                Channel {
                    expr: beta,
                    vars: VariableList::beta(self.gga),
                    density: Some(Variable::Rb),
                },
            ],
        })
    }

    fn build_caches(&self, order: DerivativeOrder) -> Result<Vec<(Channel<'_>, DerivativeCache)>> {
        self.validate()?;
        self.channel_list()?
            .into_iter()
            .map(|channel| {
                let mut cache = DerivativeCache::with_diff(
                    channel.expr.clone(),
                    channel.vars.clone(),
                    self.diff.clone(),
                );
                cache.extend_to(order)?;
                Ok((channel, cache))
            })
            .collect()
    }

    fn emitter(&self) -> Emitter {
        Emitter::new()
            .symbols(SymbolMap::density())
            .prefix(self.prefix.clone())
    }

    fn render(&self, expr: &Expr) -> Result<String> {
        render_c(expr, &SymbolMap::density())
    }

    fn threshold_text(&self) -> Result<Option<String>> {
        self.threshold.map(render_number).transpose()
    }

    /// The complete C translation unit
    pub fn to_c_source(&self) -> Result<String> {
        let start = Instant::now();
        let caches = self.build_caches(DerivativeOrder::FOURTH)?;
        let name = self.name();

        let mut out = template::header(&name, &self.title, &self.info);
        out.push_str(&template::interface(&name, &self.title, self.gga));
        out.push_str(&template::read(&name, self.threshold_text()?.as_deref()));
        out.push_str(&self.energy_from(&caches)?);
        for order in DerivativeOrder::FOURTH.up_to() {
            out.push_str(&self.derivative_from(&caches, order)?);
        }

        debug!(
            functional = %self.title,
            channels = caches.len(),
            derivatives = caches.iter().map(|(_, c)| c.len()).sum::<usize>(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "generated C source"
        );
        Ok(out)
    }

    /// The `_energy` routine
    pub fn energy(&self) -> Result<String> {
        self.validate()?;
        let channels = self.channel_list()?;
        let exprs: Vec<&Expr> = channels.iter().map(|c| c.expr).collect();
        self.energy_text(&exprs)
    }

    fn energy_from(&self, caches: &[(Channel<'_>, DerivativeCache)]) -> Result<String> {
        let exprs: Vec<&Expr> = caches.iter().map(|(c, _)| c.expr).collect();
        self.energy_text(&exprs)
    }

    fn energy_text(&self, exprs: &[&Expr]) -> Result<String> {
        let name = self.name();
        let rendered = exprs
            .iter()
            .map(|e| self.render(&simplify_expr((*e).clone())))
            .collect::<Result<Vec<_>>>()?;

        if let (Some(_), [alpha, beta]) = (self.threshold, rendered.as_slice()) {
            let preamble = if self.preamble.is_empty() {
                String::new()
            } else {
                indent_lines(&self.preamble, "  ")
            };
            return Ok(template::guarded_energy(
                &name,
                &preamble,
                &self.scaled(alpha),
                &self.scaled(beta),
            ));
        }

        let sum = rendered.join("+");
        let value = if self.prefix.is_empty() {
            sum
        } else {
            format!("{}({sum})", self.prefix)
        };
        Ok(template::energy(
            &name,
            &self.preamble,
            &format!("  return {value};\n"),
        ))
    }

    fn scaled(&self, value: &str) -> String {
        if self.prefix.is_empty() {
            value.to_string()
        } else {
            format!("{}({value})", self.prefix)
        }
    }

    /// The routine accumulating all derivatives up to `order`
    pub fn derivative_routine(&self, order: DerivativeOrder) -> Result<String> {
        let caches = self.build_caches(order)?;
        self.derivative_from(&caches, order)
    }

    pub fn gradient(&self) -> Result<String> {
        self.derivative_routine(DerivativeOrder::FIRST)
    }

    pub fn hessian(&self) -> Result<String> {
        self.derivative_routine(DerivativeOrder::SECOND)
    }

    pub fn third(&self) -> Result<String> {
        self.derivative_routine(DerivativeOrder::THIRD)
    }

    pub fn fourth(&self) -> Result<String> {
        self.derivative_routine(DerivativeOrder::FOURTH)
    }

    fn derivative_from(
        &self,
        caches: &[(Channel<'_>, DerivativeCache)],
        order: DerivativeOrder,
    ) -> Result<String> {
        let emitter = self.emitter();
        let body = match self.threshold {
            Some(_) if self.is_decoupled() => {
                let constant = template::threshold_name(&self.name());
                let guarded = emitter.indent(GUARDED_INDENT).separate_layers(false);
                let mut body = String::new();
                for (channel, cache) in caches {
                    let statements = guarded.statements(cache, order)?;
                    let single = statements.len() == 1 && !statements[0].is_zero();
                    let block = guarded.format_statements(&statements);
                    let density = channel.density.map_or("", Variable::c_accessor);
                    body.push_str(&template::guard(density, &constant, &block, single));
                }
                body
            }
            _ => caches
                .iter()
                .map(|(_, cache)| emitter.block(cache, order))
                .collect::<Result<Vec<_>>>()?
                .join("\n"),
        };
        Ok(template::derivative(&self.name(), order, &body))
    }

    /// Energy density at `point`, honoring the threshold per channel
    ///
    /// # Errors
    /// `XcError::InvalidConfig` when a prefix is set: it is C text and has no
    /// numeric value here.
    pub fn energy_at(&self, point: &DensityPoint) -> Result<f64> {
        self.validate()?;
        self.check_unprefixed()?;
        let bindings = point.bindings();
        let mut total = 0.0;
        for channel in self.channel_list()? {
            if self.is_active(&channel, point) {
                total += channel.expr.eval_f64(&bindings)?;
            }
        }
        Ok(total)
    }

    /// Slot values for orders 1 through `order` at `point`
    ///
    /// Slots of a channel below the threshold are absent, the same statements
    /// the C guard skips. Prefixed functionals are rejected as in `energy_at`.
    pub fn derivatives_at(
        &self,
        order: DerivativeOrder,
        point: &DensityPoint,
    ) -> Result<Vec<(String, f64)>> {
        self.check_unprefixed()?;
        let caches = self.build_caches(order)?;
        let bindings = point.bindings();
        let mut values = Vec::new();
        for (channel, cache) in &caches {
            if !self.is_active(channel, point) {
                continue;
            }
            for (index, expr) in cache.iter_up_to(order) {
                values.push((index.slot_name(), expr.eval_f64(&bindings)?));
            }
        }
        Ok(values)
    }

    fn check_unprefixed(&self) -> Result<()> {
        if self.prefix.is_empty() {
            Ok(())
        } else {
            Err(XcError::invalid_config(format!(
                "prefix '{}' cannot be evaluated numerically",
                self.prefix
            )))
        }
    }

    fn is_active(&self, channel: &Channel<'_>, point: &DensityPoint) -> bool {
        match (self.threshold, channel.density) {
            (Some(t), Some(density)) => point.value(density) > t,
            _ => true,
        }
    }
}

fn indent_lines(text: &str, indent: &str) -> String {
    text.lines()
        .map(|line| format!("{indent}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn slater() -> Functional {
        Functional::decoupled(
            "Slater",
            parse("-0.75*ra^(4/3)").unwrap(),
            parse("-0.75*rb^(4/3)").unwrap(),
        )
        .threshold(1e-20)
    }

    #[test]
    fn test_rejects_cross_without_gradients() {
        let f = Functional::coupled("X", parse("ra*rb").unwrap()).cross(true);
        assert!(matches!(f.validate(), Err(XcError::InvalidConfig(_))));
        let f = Functional::decoupled("X", parse("ra").unwrap(), parse("rb").unwrap())
            .gga(true)
            .cross(true);
        assert!(matches!(f.validate(), Err(XcError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_foreign_variables() {
        let f = Functional::decoupled("X", parse("ra*rb").unwrap(), parse("rb").unwrap());
        assert!(matches!(f.to_c_source(), Err(XcError::InvalidConfig(_))));
        let f = Functional::coupled("X", parse("ra*ga").unwrap());
        assert!(matches!(f.gradient(), Err(XcError::InvalidConfig(_))));
        assert!(Functional::coupled("X", parse("ra*ga").unwrap()).gga(true).validate().is_ok());
    }

    #[test]
    fn test_threshold_needs_channels() {
        let f = Functional::coupled("X", parse("ra*rb").unwrap()).threshold(1e-10);
        assert!(matches!(f.energy(), Err(XcError::InvalidConfig(_))));
        let f = slater().threshold(f64::NAN);
        assert!(matches!(f.validate(), Err(XcError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_bad_names() {
        let f = Functional::coupled("my functional", parse("ra").unwrap());
        assert!(matches!(f.validate(), Err(XcError::InvalidConfig(_))));
    }

    #[test]
    fn test_guarded_gradient() {
        let text = slater().gradient().unwrap();
        assert!(text.starts_with(
            "\nstatic void\nslater_first(FunFirstFuncDrv *ds, real factor, const FunDensProp* dp)\n{\n  if (dp->rhoa>SLATER_THRESHOLD)\n     ds->df1000 += ("
        ));
        assert!(text.contains("  if (dp->rhob>SLATER_THRESHOLD)\n     ds->df0100 += ("));
    }

    #[test]
    fn test_guarded_hessian_uses_braces() {
        let text = slater().hessian().unwrap();
        assert!(text.contains("  if (dp->rhoa>SLATER_THRESHOLD) {\n     ds->df1000"));
        assert!(text.contains("     ds->df0200 += ("));
        assert!(text.ends_with("     }\n}\n"));
    }

    #[test]
    fn test_guarded_energy() {
        let text = slater().energy().unwrap();
        assert!(text.contains(
            "  real ea = 0.0, eb = 0.0;\n\n  if (dp->rhoa >SLATER_THRESHOLD)\n      ea = "
        ));
        assert!(text.contains("return ea + eb;"));
    }

    #[test]
    fn test_threshold_skips_channel() {
        let f = slater();
        let point = DensityPoint::lda(1e-30, 8.0);
        let energy = f.energy_at(&point).unwrap();
        assert!((energy - (-0.75 * 16.0)).abs() < 1e-12);

        let values = f.derivatives_at(DerivativeOrder::SECOND, &point).unwrap();
        let slots: Vec<&str> = values.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(slots, ["df0100", "df0200"]);
        assert!((values[0].1 - (-0.75 * 4.0 / 3.0 * 2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_prefix_applies_to_energy_and_statements() {
        let f = Functional::decoupled(
            "Example",
            parse("ra*ga^2").unwrap(),
            parse("rb*gb^2").unwrap(),
        )
        .gga(true)
        .prefix("EPREF*");
        let energy = f.energy().unwrap();
        assert!(energy.contains(
            "  return EPREF*(pow(dp->grada, 2)*dp->rhoa+pow(dp->gradb, 2)*dp->rhob);\n"
        ));
        let gradient = f.gradient().unwrap();
        assert!(gradient.contains("  ds->df1000 += EPREF*(pow(dp->grada, 2))*factor;\n"));
    }
}
