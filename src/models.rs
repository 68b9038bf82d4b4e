//! Data models for items, recipes and demand tables

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CalcError;

/// SDE typeID.
pub type ItemId = i64;

/// Run-size cap applied when no blueprint limits the batch.
pub const DEFAULT_RUN_CAP: u64 = 1024;

#[derive(Debug, Clone)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub market_group_id: Option<i64>,
}

/// The two production activities with distinct batch-cost rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Manufacturing,
    Reaction,
}

impl ActivityKind {
    /// Decode an SDE activity id (1 = manufacturing, 11 = reaction).
    pub fn from_activity_id(item: ItemId, activity: i64) -> Result<Self, CalcError> {
        match activity {
            1 => Ok(ActivityKind::Manufacturing),
            11 => Ok(ActivityKind::Reaction),
            other => Err(CalcError::UnknownActivity {
                item,
                activity: other,
            }),
        }
    }

    pub fn activity_id(self) -> i64 {
        match self {
            ActivityKind::Manufacturing => 1,
            ActivityKind::Reaction => 11,
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityKind::Manufacturing => write!(f, "manufacturing"),
            ActivityKind::Reaction => write!(f, "reaction"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecipeInput {
    pub item: ItemId,
    /// Quantity consumed per single run, before efficiency.
    pub quantity: f64,
}

/// How one item is produced: activity, output per run and the input list.
#[derive(Debug, Clone)]
pub struct Recipe {
    pub product: ItemId,
    pub activity: ActivityKind,
    pub output_quantity: f64,
    pub inputs: Vec<RecipeInput>,
}

/// Per-item efficiency modifiers derived from blueprint ownership and
/// facility bonuses. Missing items fall back to `default()` (no bonus).
#[derive(Debug, Clone, Copy)]
pub struct EfficiencyEntry {
    /// Fraction of materials still required, in (0, 1].
    pub me_impact: f64,
    /// Fraction of time still required. Threaded through but not yet
    /// consumed by run scheduling.
    pub te_impact: f64,
    /// Maximum runs a single job may hold.
    pub run: u64,
}

impl Default for EfficiencyEntry {
    fn default() -> Self {
        EfficiencyEntry {
            me_impact: 1.0,
            te_impact: 1.0,
            run: DEFAULT_RUN_CAP,
        }
    }
}

pub type EfficiencyTable = BTreeMap<ItemId, EfficiencyEntry>;

/// What must be produced at one expansion level.
///
/// Rows are unique by item: inserting an item twice sums the quantities.
/// Non-positive and non-finite quantities are rejected here so the engine
/// never sees malformed demand.
#[derive(Debug, Clone, Default)]
pub struct DemandTable {
    rows: BTreeMap<ItemId, f64>,
}

impl DemandTable {
    pub fn new() -> Self {
        DemandTable::default()
    }

    pub fn insert(&mut self, item: ItemId, quantity: f64) -> Result<(), CalcError> {
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(CalcError::InvalidQuantity(quantity));
        }
        *self.rows.entry(item).or_insert(0.0) += quantity;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemId, f64)> + '_ {
        self.rows.iter().map(|(&item, &quantity)| (item, quantity))
    }
}

/// One row of a reporting step. `activity` is `None` for rows that have no
/// recipe and pass through as raw demand.
#[derive(Debug, Clone)]
pub struct StepRow {
    pub name: String,
    pub quantity: f64,
    pub runs_required: u64,
    pub activity: Option<ActivityKind>,
}

/// Terminal raw-material demand with a resolved display name.
#[derive(Debug, Clone)]
pub struct MaterialRow {
    pub name: String,
    pub quantity: f64,
}

/// Production classes a facility rig can affect, each backed by a set of
/// SDE market groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProductionClass {
    AdvancedComponent,
    StructureComponent,
    BasicMediumShip,
    AdvancedMediumShip,
    BasicLargeShip,
    AdvancedLargeShip,
}

impl ProductionClass {
    pub const ALL: [ProductionClass; 6] = [
        ProductionClass::AdvancedComponent,
        ProductionClass::StructureComponent,
        ProductionClass::BasicMediumShip,
        ProductionClass::AdvancedMediumShip,
        ProductionClass::BasicLargeShip,
        ProductionClass::AdvancedLargeShip,
    ];

    /// Market groups whose members belong to this class.
    pub fn market_group_ids(self) -> &'static [i64] {
        match self {
            ProductionClass::AdvancedComponent => &[802],
            ProductionClass::StructureComponent => &[2767],
            ProductionClass::BasicMediumShip => &[73, 74],
            ProductionClass::AdvancedMediumShip => &[1139, 1140],
            ProductionClass::BasicLargeShip => &[79],
            ProductionClass::AdvancedLargeShip => &[1076, 1089],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProductionClass::AdvancedComponent => "advanced-component",
            ProductionClass::StructureComponent => "structure-component",
            ProductionClass::BasicMediumShip => "basic-medium-ship",
            ProductionClass::AdvancedMediumShip => "advanced-medium-ship",
            ProductionClass::BasicLargeShip => "basic-large-ship",
            ProductionClass::AdvancedLargeShip => "advanced-large-ship",
        }
    }
}

impl fmt::Display for ProductionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductionClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProductionClass::ALL
            .into_iter()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = ProductionClass::ALL.iter().map(|c| c.as_str()).collect();
                format!(
                    "unknown production class '{}', expected one of: {}",
                    s,
                    known.join(", ")
                )
            })
    }
}
