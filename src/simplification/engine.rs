//! Core simplification engine with rule-based architecture
//!
//! Implements bottom-up tree traversal, rule application by node kind,
//! fixpoint iteration and cycle detection.

use super::rules::{NodeKind, Rule, RuleContext, all_rules};
use crate::{Expr, ExprKind};
use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;
use tracing::{trace, warn};

/// Upper bound on full passes over the tree
const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// Rules indexed by expression kind, built once and shared by every simplifier
struct RuleRegistry {
    rules_by_kind: FxHashMap<NodeKind, Vec<Box<dyn Rule>>>,
}

impl RuleRegistry {
    fn new() -> Self {
        let mut rules_by_kind: FxHashMap<NodeKind, Vec<Box<dyn Rule>>> = FxHashMap::default();
        // all_rules() is priority ordered; push order preserves it per kind
        for kind in [
            NodeKind::Number,
            NodeKind::Symbol,
            NodeKind::Add,
            NodeKind::Sub,
            NodeKind::Mul,
            NodeKind::Div,
            NodeKind::Pow,
            NodeKind::Function,
        ] {
            let rules = all_rules()
                .into_iter()
                .filter(|r| r.applies_to().contains(&kind))
                .collect();
            rules_by_kind.insert(kind, rules);
        }
        Self { rules_by_kind }
    }

    fn rules_for(&self, kind: NodeKind) -> &[Box<dyn Rule>] {
        self.rules_by_kind.get(&kind).map_or(&[], Vec::as_slice)
    }
}

fn global_registry() -> &'static RuleRegistry {
    static REGISTRY: OnceLock<RuleRegistry> = OnceLock::new();
    REGISTRY.get_or_init(RuleRegistry::new)
}

fn fingerprint(expr: &Expr) -> u64 {
    let mut hasher = FxHasher::default();
    expr.hash(&mut hasher);
    hasher.finish()
}

/// Main simplification engine
pub(crate) struct Simplifier {
    max_iterations: usize,
    context: RuleContext,
}

impl Default for Simplifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Simplifier {
    pub fn new() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            context: RuleContext::default(),
        }
    }

    #[cfg(test)]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_domain_safe(mut self, domain_safe: bool) -> Self {
        self.context.domain_safe = domain_safe;
        self
    }

    /// Run full bottom-up passes until the tree stops changing
    pub fn simplify(&self, expr: Expr) -> Expr {
        let mut current = expr;
        let mut seen: FxHashSet<u64> = FxHashSet::default();

        for iteration in 0..self.max_iterations {
            let next = self.apply_rules_bottom_up(&current);

            if next == current {
                return current;
            }
            trace!(iteration, from = %current, to = %next, "simplification pass");

            // A repeated structure means two rules undo each other
            if !seen.insert(fingerprint(&next)) {
                trace!("simplification cycle detected");
                return next;
            }
            current = next;
        }

        warn!(
            max_iterations = self.max_iterations,
            "simplification exceeded maximum iterations"
        );
        current
    }

    /// Simplify children first, then the node itself
    fn apply_rules_bottom_up(&self, expr: &Expr) -> Expr {
        let rebuilt = match &expr.kind {
            ExprKind::Number(_) | ExprKind::Symbol(_) => expr.clone(),
            ExprKind::FunctionCall { name, args } => Expr::func_multi(
                name.clone(),
                args.iter().map(|a| self.apply_rules_bottom_up(a)).collect(),
            ),
            ExprKind::Add(u, v) => Expr::add_expr(
                self.apply_rules_bottom_up(u),
                self.apply_rules_bottom_up(v),
            ),
            ExprKind::Sub(u, v) => Expr::sub_expr(
                self.apply_rules_bottom_up(u),
                self.apply_rules_bottom_up(v),
            ),
            ExprKind::Mul(u, v) => Expr::mul_expr(
                self.apply_rules_bottom_up(u),
                self.apply_rules_bottom_up(v),
            ),
            ExprKind::Div(u, v) => Expr::div_expr(
                self.apply_rules_bottom_up(u),
                self.apply_rules_bottom_up(v),
            ),
            ExprKind::Pow(u, v) => Expr::pow(
                self.apply_rules_bottom_up(u),
                self.apply_rules_bottom_up(v),
            ),
        };
        self.apply_rules_to_node(rebuilt)
    }

    /// Apply every rule registered for the node's kind, in priority order
    fn apply_rules_to_node(&self, mut current: Expr) -> Expr {
        let rules = global_registry().rules_for(NodeKind::of(&current));

        for rule in rules {
            if self.context.domain_safe && rule.alters_domain() {
                continue;
            }
            if !rule.applies_to().contains(&NodeKind::of(&current)) {
                // an earlier rule changed the node kind; the next pass picks it up
                break;
            }
            if let Some(new_expr) = rule.apply(&current, &self.context) {
                trace!(rule = rule.name(), from = %current, to = %new_expr, "rule applied");
                current = new_expr;
            }
        }

        current
    }
}
