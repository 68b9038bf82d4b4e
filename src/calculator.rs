//! Multi-level decomposition engine
//!
//! Walks the recipe graph level by level: each expansion converts one
//! demand table into the raw materials it terminates in plus the demand
//! table for the next level, until nothing further is producible.

use std::collections::BTreeMap;
use std::fmt;

use crate::catalog::Catalog;
use crate::error::CalcError;
use crate::models::{
    ActivityKind, DemandTable, EfficiencyEntry, EfficiencyTable, ItemId, MaterialRow, Recipe,
    StepRow,
};

/// Depth guard against cyclic recipe graphs. Real production chains are
/// at most a few tens of levels deep.
const MAX_DEPTH: usize = 32;

/// Runs and per-input material cost for one recipe application.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedQuantity {
    pub runs_required: u64,
    /// One entry per recipe input, paired with its total quantity for
    /// this level.
    pub materials: Vec<(ItemId, f64)>,
}

/// Convert a requested output quantity into runs and material demand.
///
/// All run counts round up: under-production is never acceptable.
/// Material costs are floored at the physical run count so extreme
/// efficiency can not report a zero-cost batch.
pub fn resolve_quantity(
    quantity: f64,
    recipe: &Recipe,
    efficiency: &EfficiencyEntry,
) -> ResolvedQuantity {
    match recipe.activity {
        ActivityKind::Manufacturing => resolve_manufacturing(quantity, recipe, efficiency),
        ActivityKind::Reaction => resolve_reaction(quantity, recipe),
    }
}

/// Manufacturing jobs are capped at `efficiency.run` runs per line, so a
/// large order splits into parallel jobs plus a trim batch for the
/// remainder.
fn resolve_manufacturing(
    quantity: f64,
    recipe: &Recipe,
    efficiency: &EfficiencyEntry,
) -> ResolvedQuantity {
    let output = recipe.output_quantity;
    let ideal_run_size = (quantity / output).ceil();
    let single_line_run_size = ideal_run_size.min(efficiency.run as f64);
    let parallel_jobs = (quantity / (single_line_run_size * output)).ceil();
    let trim_size = quantity - single_line_run_size * parallel_jobs * output;

    let mut materials = Vec::with_capacity(recipe.inputs.len());
    for input in &recipe.inputs {
        let batch_cost = (input.quantity * single_line_run_size * efficiency.me_impact)
            .ceil()
            .max(single_line_run_size);
        let trim_cost = (input.quantity * trim_size * efficiency.me_impact / output)
            .ceil()
            .max(trim_size);
        materials.push((input.item, batch_cost * parallel_jobs + trim_cost));
    }

    let runs_required = (parallel_jobs * single_line_run_size / output).ceil() as u64;
    ResolvedQuantity {
        runs_required,
        materials,
    }
}

/// Reactions have no run-size cap and no efficiency modifier.
fn resolve_reaction(quantity: f64, recipe: &Recipe) -> ResolvedQuantity {
    let runs = (quantity / recipe.output_quantity).ceil();
    let materials = recipe
        .inputs
        .iter()
        .map(|input| (input.item, input.quantity * runs))
        .collect();
    ResolvedQuantity {
        runs_required: runs as u64,
        materials,
    }
}

/// Outcome of expanding one demand table by one level.
pub struct Expansion {
    /// The incoming demand annotated with run counts for reporting.
    pub step: Vec<StepRow>,
    /// Demand that terminates at this level.
    pub atomic: Vec<MaterialRow>,
    /// Demand the next level must produce. Empty means terminal.
    pub next: DemandTable,
}

/// Strategy applied at every level of a [`Decomposition`]. Tests
/// substitute a fake to exercise the chain in isolation.
pub trait ExpansionStep {
    fn expand(&self, demand: &DemandTable) -> Result<Expansion, CalcError>;
}

/// Production strategy: expands demand through a catalog under a fixed
/// efficiency table.
pub struct Decompositor<'a, C: Catalog> {
    catalog: &'a C,
    efficiency: &'a EfficiencyTable,
}

impl<'a, C: Catalog> Decompositor<'a, C> {
    pub fn new(catalog: &'a C, efficiency: &'a EfficiencyTable) -> Self {
        Decompositor {
            catalog,
            efficiency,
        }
    }

    /// Resolve a top-level request into the initial demand table.
    pub fn initial_table(&self, name: &str, quantity: f64) -> Result<DemandTable, CalcError> {
        let item = self
            .catalog
            .lookup_item(name)?
            .ok_or_else(|| CalcError::UnknownItem(name.to_string()))?;
        let mut table = DemandTable::new();
        table.insert(item.id, quantity)?;
        Ok(table)
    }
}

impl<C: Catalog> ExpansionStep for Decompositor<'_, C> {
    fn expand(&self, demand: &DemandTable) -> Result<Expansion, CalcError> {
        let mut step = Vec::with_capacity(demand.len());
        let mut atomic = Vec::new();
        let mut produced: BTreeMap<ItemId, f64> = BTreeMap::new();

        for (item, quantity) in demand.iter() {
            let name = self.catalog.item_name(item)?;
            match self.catalog.lookup_recipe(item)? {
                None => {
                    // No recipe: the row passes through unchanged.
                    step.push(StepRow {
                        name: name.clone(),
                        quantity,
                        runs_required: 0,
                        activity: None,
                    });
                    atomic.push(MaterialRow { name, quantity });
                }
                Some(recipe) => {
                    let efficiency = self
                        .efficiency
                        .get(&item)
                        .copied()
                        .unwrap_or_default();
                    let resolved = resolve_quantity(quantity, &recipe, &efficiency);
                    step.push(StepRow {
                        name,
                        quantity,
                        runs_required: resolved.runs_required,
                        activity: Some(recipe.activity),
                    });
                    for (material, cost) in resolved.materials {
                        *produced.entry(material).or_insert(0.0) += cost;
                    }
                }
            }
        }

        let mut next = DemandTable::new();
        for (&material, &quantity) in &produced {
            if self.catalog.is_producible(material)? {
                next.insert(material, quantity)?;
            } else {
                atomic.push(MaterialRow {
                    name: self.catalog.item_name(material)?,
                    quantity,
                });
            }
        }

        Ok(Expansion { step, atomic, next })
    }
}

/// Recursive decomposition chain, one node per expansion level.
///
/// A node either is terminal or owns exactly one child for the next
/// level. Immutable once built.
pub struct Decomposition {
    step: Vec<StepRow>,
    atomic: Vec<MaterialRow>,
    child: Option<Box<Decomposition>>,
}

impl Decomposition {
    /// Expand `initial` level by level until a step yields no further
    /// producible demand.
    pub fn build(initial: DemandTable, strategy: &dyn ExpansionStep) -> Result<Self, CalcError> {
        Self::build_level(initial, strategy, 0)
    }

    fn build_level(
        demand: DemandTable,
        strategy: &dyn ExpansionStep,
        depth: usize,
    ) -> Result<Self, CalcError> {
        if depth >= MAX_DEPTH {
            return Err(CalcError::MaxDepthExceeded(MAX_DEPTH));
        }
        let Expansion { step, atomic, next } = strategy.expand(&demand)?;
        let child = if next.is_empty() {
            None
        } else {
            Some(Box::new(Self::build_level(next, strategy, depth + 1)?))
        };
        Ok(Decomposition {
            step,
            atomic,
            child,
        })
    }

    /// Production steps in root-to-leaf order.
    pub fn steps(&self) -> Vec<&[StepRow]> {
        let mut out = Vec::new();
        let mut node = self;
        loop {
            out.push(node.step.as_slice());
            match &node.child {
                Some(child) => node = child,
                None => break,
            }
        }
        out
    }

    /// Final shopping list: atomic demand merged across every level, one
    /// row per material name, quantities rounded up to whole units.
    pub fn required_materials(&self) -> Vec<(String, u64)> {
        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        self.collect_atomic(&mut totals);
        totals
            .into_iter()
            .map(|(name, quantity)| (name, quantity.ceil() as u64))
            .collect()
    }

    fn collect_atomic(&self, totals: &mut BTreeMap<String, f64>) {
        if let Some(child) = &self.child {
            child.collect_atomic(totals);
        }
        for row in &self.atomic {
            *totals.entry(row.name.clone()).or_insert(0.0) += row.quantity;
        }
    }
}

impl fmt::Display for Decomposition {
    /// Tab-delimited report. Column order `name, quantity, runs_required,
    /// activity` is the contract external tools depend on.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Required materials:")?;
        for (name, quantity) in self.required_materials() {
            writeln!(f, "{name}\t{quantity}")?;
        }
        for (i, step) in self.steps().iter().enumerate() {
            writeln!(f, "Step {}:", i + 1)?;
            for row in *step {
                let activity = match row.activity {
                    Some(kind) => kind.to_string(),
                    None => "-".to_string(),
                };
                writeln!(
                    f,
                    "{}\t{}\t{}\t{}",
                    row.name, row.quantity, row.runs_required, activity
                )?;
            }
        }
        Ok(())
    }
}
