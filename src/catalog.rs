//! Read-only reference data consumed by the decomposition engine

use std::collections::BTreeSet;

use crate::error::CalcError;
use crate::models::{Item, ItemId, ProductionClass, Recipe};

/// Static reference dataset the engine expands against.
///
/// Implementations are immutable snapshots: the engine never mutates a
/// catalog, so one may be shared freely across decomposition runs.
pub trait Catalog {
    /// Recipe producing `item`, if any.
    fn lookup_recipe(&self, item: ItemId) -> Result<Option<Recipe>, CalcError>;

    /// True iff a recipe exists and the item is not excluded from
    /// production. Exclusion wins over an existing recipe.
    fn is_producible(&self, item: ItemId) -> Result<bool, CalcError>;

    fn lookup_item(&self, name: &str) -> Result<Option<Item>, CalcError>;

    fn item_name(&self, item: ItemId) -> Result<String, CalcError>;

    /// Members of a production class. Consumed by the efficiency
    /// derivation only, never by expansion itself.
    fn class_members(&self, class: ProductionClass) -> Result<BTreeSet<ItemId>, CalcError>;
}

/// Catalog built from explicit item and recipe lists. Test fixtures use
/// this instead of a database.
#[cfg(test)]
pub struct MemoryCatalog {
    items: std::collections::HashMap<ItemId, Item>,
    by_name: std::collections::HashMap<String, ItemId>,
    recipes: std::collections::HashMap<ItemId, Recipe>,
    excluded: std::collections::HashSet<ItemId>,
}

#[cfg(test)]
impl MemoryCatalog {
    /// Fails with `DuplicateProducer` when two recipes claim the same
    /// product, across both activity kinds combined.
    pub fn new(
        items: Vec<Item>,
        recipes: Vec<Recipe>,
        non_productables: &BTreeSet<String>,
    ) -> Result<Self, CalcError> {
        let by_name = items
            .iter()
            .map(|item| (item.name.clone(), item.id))
            .collect::<std::collections::HashMap<_, _>>();
        let excluded = non_productables
            .iter()
            .filter_map(|name| by_name.get(name).copied())
            .collect();

        let mut recipe_map = std::collections::HashMap::new();
        for recipe in recipes {
            let product = recipe.product;
            if recipe_map.insert(product, recipe).is_some() {
                return Err(CalcError::DuplicateProducer { item: product });
            }
        }

        Ok(MemoryCatalog {
            items: items.into_iter().map(|item| (item.id, item)).collect(),
            by_name,
            recipes: recipe_map,
            excluded,
        })
    }
}

#[cfg(test)]
impl Catalog for MemoryCatalog {
    fn lookup_recipe(&self, item: ItemId) -> Result<Option<Recipe>, CalcError> {
        Ok(self.recipes.get(&item).cloned())
    }

    fn is_producible(&self, item: ItemId) -> Result<bool, CalcError> {
        Ok(self.recipes.contains_key(&item) && !self.excluded.contains(&item))
    }

    fn lookup_item(&self, name: &str) -> Result<Option<Item>, CalcError> {
        Ok(self
            .by_name
            .get(name)
            .and_then(|id| self.items.get(id))
            .cloned())
    }

    fn item_name(&self, item: ItemId) -> Result<String, CalcError> {
        self.items
            .get(&item)
            .map(|i| i.name.clone())
            .ok_or_else(|| CalcError::UnknownItem(format!("typeID {item}")))
    }

    fn class_members(&self, class: ProductionClass) -> Result<BTreeSet<ItemId>, CalcError> {
        let groups = class.market_group_ids();
        Ok(self
            .items
            .values()
            .filter(|item| {
                item.market_group_id
                    .is_some_and(|group| groups.contains(&group))
            })
            .map(|item| item.id)
            .collect())
    }
}
