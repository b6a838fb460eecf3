//! Multi-index derivative cache
//!
//! Partial derivatives of one base expression up to fourth order, each
//! computed once from a derivative one order lower. Entries are keyed by
//! [`MultiIndex`], so `d2F/dra dga` and `d2F/dga dra` are the same entry.
//!
//! Layer `j + 1` is built from layer `j` only after every entry of layer `j`
//! is in the map. Within a layer the work is independent and, with the
//! `parallel` feature, runs on the rayon pool; results are still stored in
//! task order so output never depends on scheduling.

use crate::multi_index::MultiIndex;
use crate::variables::{Variable, VariableList};
use crate::{Diff, Expr, Result, XcError};
use rustc_hash::FxHashMap;
use std::time::Instant;
use tracing::debug;

/// Highest derivative order the code generator supports
pub const MAX_ORDER: u8 = 4;

/// Derivative order in `1..=4`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DerivativeOrder(u8);

impl DerivativeOrder {
    pub const FIRST: DerivativeOrder = DerivativeOrder(1);
    pub const SECOND: DerivativeOrder = DerivativeOrder(2);
    pub const THIRD: DerivativeOrder = DerivativeOrder(3);
    pub const FOURTH: DerivativeOrder = DerivativeOrder(4);

    /// # Errors
    /// `XcError::InvalidOrder` for 0 or anything above 4.
    pub fn new(order: u8) -> Result<Self> {
        if (1..=MAX_ORDER).contains(&order) {
            Ok(DerivativeOrder(order))
        } else {
            Err(XcError::InvalidOrder(order))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// All orders from 1 up to and including `self`
    pub fn up_to(self) -> impl Iterator<Item = DerivativeOrder> {
        (1..=self.0).map(DerivativeOrder)
    }
}

impl TryFrom<u8> for DerivativeOrder {
    type Error = XcError;

    fn try_from(order: u8) -> Result<Self> {
        DerivativeOrder::new(order)
    }
}

/// One unit of layer work: differentiate `parent` by `var`
struct Task<'a> {
    child: MultiIndex,
    parent: &'a Expr,
    var: Variable,
}

/// Memoized partial derivatives of a single base expression
#[derive(Debug, Clone)]
pub struct DerivativeCache {
    base: Expr,
    vars: VariableList,
    diff: Diff,
    entries: FxHashMap<MultiIndex, Expr>,
    /// `layers[j]` holds the order `j + 1` indices in enumeration order
    layers: Vec<Vec<MultiIndex>>,
}

impl DerivativeCache {
    /// Empty cache; nothing is differentiated until [`extend_to`](Self::extend_to)
    pub fn new(base: Expr, vars: VariableList) -> Self {
        Self::with_diff(base, vars, Diff::new())
    }

    /// Empty cache using a custom differentiation builder
    pub fn with_diff(base: Expr, vars: VariableList, diff: Diff) -> Self {
        Self {
            base,
            vars,
            diff,
            entries: FxHashMap::default(),
            layers: Vec::new(),
        }
    }

    /// Build every derivative up to `order`
    ///
    /// # Errors
    /// The first differentiation error; no cache is returned in that case.
    pub fn build(base: Expr, vars: VariableList, order: DerivativeOrder) -> Result<Self> {
        let mut cache = Self::new(base, vars);
        cache.extend_to(order)?;
        Ok(cache)
    }

    /// Compute the missing layers up to `order`. Existing entries are kept.
    ///
    /// On error the layers completed before the failing one remain.
    pub fn extend_to(&mut self, order: DerivativeOrder) -> Result<()> {
        while self.layers.len() < order.get() as usize {
            let start = Instant::now();
            let next_order = self.layers.len() + 1;
            let results = self.compute_next_layer()?;

            let mut layer = Vec::with_capacity(results.len());
            for (index, expr) in results {
                self.entries.insert(index, expr);
                layer.push(index);
            }
            debug!(
                order = next_order,
                entries = layer.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "derivative layer complete"
            );
            self.layers.push(layer);
        }
        Ok(())
    }

    /// Enumerate the next layer's tasks and run them
    fn compute_next_layer(&self) -> Result<Vec<(MultiIndex, Expr)>> {
        let parents: Vec<(MultiIndex, &Expr)> = match self.layers.last() {
            None => vec![(MultiIndex::zero(), &self.base)],
            Some(layer) => layer
                .iter()
                .filter_map(|idx| self.entries.get(idx).map(|e| (*idx, e)))
                .collect(),
        };

        let vars = self.vars.as_slice();
        let mut tasks = Vec::new();
        for (index, parent) in parents {
            let first = index.last_position(&self.vars).unwrap_or(0);
            for &var in &vars[first..] {
                tasks.push(Task {
                    child: index.incremented(var)?,
                    parent,
                    var,
                });
            }
        }

        self.run_tasks(&tasks)
    }

    #[cfg(feature = "parallel")]
    fn run_tasks(&self, tasks: &[Task<'_>]) -> Result<Vec<(MultiIndex, Expr)>> {
        use rayon::prelude::*;

        tasks
            .par_iter()
            .map(|task| self.run_task(task))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn run_tasks(&self, tasks: &[Task<'_>]) -> Result<Vec<(MultiIndex, Expr)>> {
        tasks.iter().map(|task| self.run_task(task)).collect()
    }

    fn run_task(&self, task: &Task<'_>) -> Result<(MultiIndex, Expr)> {
        let expr = if task.parent.is_zero_num() {
            Expr::number(0.0)
        } else {
            self.diff.differentiate(task.parent, task.var.name())?
        };
        Ok((task.child, expr))
    }

    /// The expression stored for `index`; the empty index is the base
    pub fn get(&self, index: &MultiIndex) -> Option<&Expr> {
        if index.order() == 0 {
            Some(&self.base)
        } else {
            self.entries.get(index)
        }
    }

    /// Look up by differentiation path; any permutation gives the same entry
    ///
    /// Paths longer than `MAX_ORDER` are never cached and give `None`.
    pub fn get_by_path(&self, path: &[Variable]) -> Option<&Expr> {
        MultiIndex::from_path(path)
            .ok()
            .and_then(|index| self.get(&index))
    }

    pub fn contains(&self, index: &MultiIndex) -> bool {
        self.entries.contains_key(index)
    }

    /// Indices of one order, in enumeration order (empty if not built)
    pub fn layer(&self, order: DerivativeOrder) -> &[MultiIndex] {
        self.layers
            .get(order.get() as usize - 1)
            .map_or(&[], Vec::as_slice)
    }

    /// All entries of order 1 through `order`, lower orders first
    pub fn iter_up_to(&self, order: DerivativeOrder) -> impl Iterator<Item = (MultiIndex, &Expr)> {
        self.layers
            .iter()
            .take(order.get() as usize)
            .flatten()
            .filter_map(|idx| self.entries.get(idx).map(|e| (*idx, e)))
    }

    /// Number of stored derivatives (the base is not counted)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest order built so far, 0 for a fresh cache
    pub fn max_order(&self) -> usize {
        self.layers.len()
    }

    pub fn base(&self) -> &Expr {
        &self.base
    }

    pub fn vars(&self) -> &VariableList {
        &self.vars
    }
}
