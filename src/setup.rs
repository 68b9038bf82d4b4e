//! Industry setup: blueprint ownership, citadel and rig bonuses
//!
//! A `Setup` is built explicitly by the caller and flattened into the
//! per-item efficiency table the engine consumes. Recompute the table
//! whenever blueprints, rigs or the citadel change.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use crate::catalog::Catalog;
use crate::error::CalcError;
use crate::models::{
    DEFAULT_RUN_CAP, EfficiencyEntry, EfficiencyTable, ItemId, ProductionClass,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitadelType {
    Raitaru,
    Azbel,
    Sotiyo,
    Athanor,
    Tatara,
    NpcStation,
}

impl CitadelType {
    /// Engineering complexes grant a flat 1% material discount.
    pub fn me_impact(self) -> f64 {
        match self {
            CitadelType::Raitaru | CitadelType::Azbel | CitadelType::Sotiyo => 0.99,
            CitadelType::Athanor | CitadelType::Tatara | CitadelType::NpcStation => 1.0,
        }
    }
}

impl FromStr for CitadelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raitaru" => Ok(CitadelType::Raitaru),
            "azbel" => Ok(CitadelType::Azbel),
            "sotiyo" => Ok(CitadelType::Sotiyo),
            "athanor" => Ok(CitadelType::Athanor),
            "tatara" => Ok(CitadelType::Tatara),
            "npc-station" => Ok(CitadelType::NpcStation),
            other => Err(format!("unknown citadel type '{other}'")),
        }
    }
}

/// Security band of the system the citadel sits in. Rig bonuses scale
/// with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceType {
    HighSec,
    LowSec,
    NullWh,
}

impl SpaceType {
    fn rig_multiplier(self) -> f64 {
        match self {
            SpaceType::HighSec => 1.0,
            SpaceType::LowSec => 1.9,
            SpaceType::NullWh => 2.1,
        }
    }
}

impl FromStr for SpaceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "highsec" => Ok(SpaceType::HighSec),
            "lowsec" => Ok(SpaceType::LowSec),
            "null-wh" => Ok(SpaceType::NullWh),
            other => Err(format!("unknown space type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigTier {
    T1,
    T2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigKind {
    Material,
    Time,
}

/// Medium-set industry rig affecting one production class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediumSetIndustryRig {
    pub production_class: ProductionClass,
    pub tier: RigTier,
    pub kind: RigKind,
}

impl MediumSetIndustryRig {
    /// Material bonus granted in the given space, 0 for time rigs.
    pub fn me_bonus(&self, space: SpaceType) -> f64 {
        let base = match (self.kind, self.tier) {
            (RigKind::Material, RigTier::T1) => 0.02,
            (RigKind::Material, RigTier::T2) => 0.024,
            (RigKind::Time, _) => return 0.0,
        };
        base * space.rig_multiplier()
    }

    /// Time bonus granted in the given space, 0 for material rigs.
    pub fn te_bonus(&self, space: SpaceType) -> f64 {
        let base = match (self.kind, self.tier) {
            (RigKind::Time, RigTier::T1) => 0.2,
            (RigKind::Time, RigTier::T2) => 0.24,
            (RigKind::Material, _) => return 0.0,
        };
        base * space.rig_multiplier()
    }
}

/// Fitted rigs. Bonuses on the same production class do not stack; the
/// strongest one wins.
#[derive(Debug, Clone, Default)]
pub struct RigSet {
    rigs: Vec<MediumSetIndustryRig>,
}

impl RigSet {
    pub fn add(&mut self, rig: MediumSetIndustryRig) {
        self.rigs.push(rig);
    }

    /// Strongest material bonus per production class.
    pub fn me_bonuses(&self, space: SpaceType) -> BTreeMap<ProductionClass, f64> {
        Self::strongest(self.rigs.iter().map(|rig| (rig.production_class, rig.me_bonus(space))))
    }

    /// Strongest time bonus per production class.
    pub fn te_bonuses(&self, space: SpaceType) -> BTreeMap<ProductionClass, f64> {
        Self::strongest(self.rigs.iter().map(|rig| (rig.production_class, rig.te_bonus(space))))
    }

    fn strongest(
        bonuses: impl Iterator<Item = (ProductionClass, f64)>,
    ) -> BTreeMap<ProductionClass, f64> {
        let mut strongest = BTreeMap::new();
        for (class, bonus) in bonuses {
            let entry = strongest.entry(class).or_insert(0.0);
            if bonus > *entry {
                *entry = bonus;
            }
        }
        strongest
    }
}

/// An owned blueprint (or blueprint copy) with its researched levels.
#[derive(Debug, Clone)]
pub struct Blueprint {
    pub name: String,
    /// Researched material efficiency, e.g. 0.1 for -10% materials.
    pub material_efficiency: f64,
    pub time_efficiency: f64,
    /// Remaining licensed runs; caps the single-job run size.
    pub runs: u64,
}

impl Blueprint {
    pub fn new(name: impl Into<String>, material_efficiency: f64, time_efficiency: f64) -> Self {
        Blueprint {
            name: name.into(),
            material_efficiency,
            time_efficiency,
            runs: DEFAULT_RUN_CAP,
        }
    }

    pub fn with_runs(mut self, runs: u64) -> Self {
        self.runs = runs;
        self
    }
}

/// Blueprint ownership, unique by name. A later insert replaces the
/// earlier one.
#[derive(Debug, Clone, Default)]
pub struct BlueprintCollection {
    prints: BTreeMap<String, Blueprint>,
}

impl BlueprintCollection {
    pub fn add(&mut self, blueprint: Blueprint) {
        self.prints.insert(blueprint.name.clone(), blueprint);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Blueprint> {
        self.prints.values()
    }
}

/// Everything about the player's production facilities that affects a
/// decomposition run.
#[derive(Debug, Clone)]
pub struct Setup {
    pub citadel_type: CitadelType,
    pub space_type: SpaceType,
    pub rig_set: RigSet,
    pub collection: BlueprintCollection,
    pub non_productables: BTreeSet<String>,
    pub reaction_lines: u32,
    pub production_lines: u32,
}

impl Default for Setup {
    fn default() -> Self {
        // Fuel blocks are cheaper to buy than to produce, so they stay
        // atomic by default.
        let non_productables = [
            "Nitrogen Fuel Block",
            "Oxygen Fuel Block",
            "Helium Fuel Block",
            "Hydrogen Fuel Block",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        Setup {
            citadel_type: CitadelType::Raitaru,
            space_type: SpaceType::NullWh,
            rig_set: RigSet::default(),
            collection: BlueprintCollection::default(),
            non_productables,
            reaction_lines: 20,
            production_lines: 20,
        }
    }
}

impl Setup {
    pub fn set_lines(&mut self, reaction: u32, production: u32) {
        self.reaction_lines = reaction;
        self.production_lines = production;
    }

    /// Add an owned blueprint, rejecting names the catalog does not know.
    pub fn add_blueprint(
        &mut self,
        catalog: &impl Catalog,
        blueprint: Blueprint,
    ) -> Result<(), CalcError> {
        if catalog.lookup_item(&blueprint.name)?.is_none() {
            return Err(CalcError::UnknownItem(blueprint.name));
        }
        self.collection.add(blueprint);
        Ok(())
    }

    /// Flatten the setup into the per-item efficiency table.
    ///
    /// Rig and citadel impacts multiply with blueprint research; items
    /// covered by neither keep the engine-side default of no bonus.
    pub fn efficiency_table(&self, catalog: &impl Catalog) -> Result<EfficiencyTable, CalcError> {
        let citadel_impact = self.citadel_type.me_impact();

        let mut class_me: BTreeMap<ItemId, f64> = BTreeMap::new();
        for (class, bonus) in self.rig_set.me_bonuses(self.space_type) {
            for member in catalog.class_members(class)? {
                let entry = class_me.entry(member).or_insert(1.0);
                *entry = entry.min(1.0 - bonus);
            }
        }
        let mut class_te: BTreeMap<ItemId, f64> = BTreeMap::new();
        for (class, bonus) in self.rig_set.te_bonuses(self.space_type) {
            for member in catalog.class_members(class)? {
                let entry = class_te.entry(member).or_insert(1.0);
                *entry = entry.min(1.0 - bonus);
            }
        }

        let mut table = EfficiencyTable::new();
        for (&item, &impact) in &class_me {
            table.insert(
                item,
                EfficiencyEntry {
                    me_impact: impact * citadel_impact,
                    te_impact: class_te.get(&item).copied().unwrap_or(1.0),
                    run: DEFAULT_RUN_CAP,
                },
            );
        }
        for (&item, &impact) in &class_te {
            table.entry(item).or_insert(EfficiencyEntry {
                me_impact: citadel_impact,
                te_impact: impact,
                run: DEFAULT_RUN_CAP,
            });
        }

        for blueprint in self.collection.iter() {
            let item = catalog
                .lookup_item(&blueprint.name)?
                .ok_or_else(|| CalcError::UnknownItem(blueprint.name.clone()))?;
            let class_impact = class_me.get(&item.id).copied().unwrap_or(1.0);
            table.insert(
                item.id,
                EfficiencyEntry {
                    me_impact: (1.0 - blueprint.material_efficiency)
                        * class_impact
                        * citadel_impact,
                    te_impact: (1.0 - blueprint.time_efficiency)
                        * class_te.get(&item.id).copied().unwrap_or(1.0),
                    run: blueprint.runs,
                },
            );
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::models::Item;

    fn catalog() -> MemoryCatalog {
        let items = vec![
            Item {
                id: 29984,
                name: "Tengu".to_string(),
                market_group_id: Some(1139),
            },
            Item {
                id: 11689,
                name: "Superconducting Gravimetric Amplifier".to_string(),
                market_group_id: Some(802),
            },
        ];
        MemoryCatalog::new(items, Vec::new(), &BTreeSet::new()).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn blueprint_research_becomes_an_impact_entry() {
        let catalog = catalog();
        let mut setup = Setup {
            citadel_type: CitadelType::NpcStation,
            ..Setup::default()
        };
        setup
            .add_blueprint(&catalog, Blueprint::new("Tengu", 0.1, 0.2).with_runs(7))
            .unwrap();

        let table = setup.efficiency_table(&catalog).unwrap();
        let entry = table[&29984];
        assert_close(entry.me_impact, 0.9);
        assert_close(entry.te_impact, 0.8);
        assert_eq!(entry.run, 7);
    }

    #[test]
    fn engineering_complex_discount_applies() {
        let catalog = catalog();
        let mut setup = Setup::default();
        assert_eq!(setup.citadel_type, CitadelType::Raitaru);
        setup
            .add_blueprint(&catalog, Blueprint::new("Tengu", 0.1, 0.0))
            .unwrap();

        let table = setup.efficiency_table(&catalog).unwrap();
        assert_close(table[&29984].me_impact, 0.9 * 0.99);
    }

    #[test]
    fn rig_bonus_scales_with_space_and_covers_class_members() {
        let catalog = catalog();
        let mut setup = Setup {
            citadel_type: CitadelType::NpcStation,
            ..Setup::default()
        };
        setup.rig_set.add(MediumSetIndustryRig {
            production_class: ProductionClass::AdvancedComponent,
            tier: RigTier::T1,
            kind: RigKind::Material,
        });

        let table = setup.efficiency_table(&catalog).unwrap();
        // 0.02 base, 2.1 null-sec multiplier.
        assert_close(table[&11689].me_impact, 1.0 - 0.02 * 2.1);
        assert!(!table.contains_key(&29984));
    }

    #[test]
    fn strongest_rig_wins_per_class() {
        let t1 = MediumSetIndustryRig {
            production_class: ProductionClass::AdvancedComponent,
            tier: RigTier::T1,
            kind: RigKind::Material,
        };
        let t2 = MediumSetIndustryRig {
            tier: RigTier::T2,
            ..t1
        };
        let time = MediumSetIndustryRig {
            kind: RigKind::Time,
            ..t1
        };

        let mut rigs = RigSet::default();
        rigs.add(t1);
        rigs.add(t2);
        rigs.add(time);

        let bonuses = rigs.me_bonuses(SpaceType::HighSec);
        assert_eq!(bonuses.len(), 1);
        assert_close(bonuses[&ProductionClass::AdvancedComponent], 0.024);
        assert_close(time.te_bonus(SpaceType::HighSec), 0.2);
    }

    #[test]
    fn rig_and_blueprint_impacts_multiply() {
        let catalog = catalog();
        let mut setup = Setup::default();
        setup.rig_set.add(MediumSetIndustryRig {
            production_class: ProductionClass::AdvancedComponent,
            tier: RigTier::T1,
            kind: RigKind::Material,
        });
        setup
            .add_blueprint(
                &catalog,
                Blueprint::new("Superconducting Gravimetric Amplifier", 0.1, 0.0),
            )
            .unwrap();

        let table = setup.efficiency_table(&catalog).unwrap();
        assert_close(table[&11689].me_impact, 0.9 * (1.0 - 0.02 * 2.1) * 0.99);
    }

    #[test]
    fn unknown_blueprint_names_are_rejected() {
        let catalog = catalog();
        let mut setup = Setup::default();
        let result = setup.add_blueprint(&catalog, Blueprint::new("Raven", 0.1, 0.2));
        assert!(matches!(result, Err(CalcError::UnknownItem(name)) if name == "Raven"));
    }
}
