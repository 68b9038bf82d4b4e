//! Database schema and the sqlite-backed catalog adapter
//!
//! The schema mirrors the slice of the EVE static data export the
//! engine needs: items, one producing recipe per item and the recipe
//! input lists.

use std::collections::{BTreeSet, HashSet};

use rusqlite::{Connection, OptionalExtension, params_from_iter};

use crate::catalog::Catalog;
use crate::error::CalcError;
use crate::models::{ActivityKind, Item, ItemId, ProductionClass, Recipe, RecipeInput};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<(), CalcError> {
    conn.execute_batch(
        r#"
        -- Item reference data (invTypes slice)
        CREATE TABLE IF NOT EXISTS items (
            type_id INTEGER PRIMARY KEY,
            type_name TEXT NOT NULL UNIQUE,
            market_group_id INTEGER
        );

        -- One row per blueprint activity (industryActivityProducts slice)
        CREATE TABLE IF NOT EXISTS recipes (
            blueprint_id INTEGER NOT NULL,
            activity_id INTEGER NOT NULL,
            product_id INTEGER NOT NULL,
            output_quantity REAL NOT NULL,
            PRIMARY KEY (blueprint_id, activity_id)
        );

        -- Materials one run consumes (industryActivityMaterials slice)
        CREATE TABLE IF NOT EXISTS recipe_inputs (
            blueprint_id INTEGER NOT NULL,
            activity_id INTEGER NOT NULL,
            material_id INTEGER NOT NULL,
            quantity REAL NOT NULL,
            PRIMARY KEY (blueprint_id, activity_id, material_id)
        );

        CREATE INDEX IF NOT EXISTS idx_recipes_product ON recipes(product_id);
        CREATE INDEX IF NOT EXISTS idx_recipe_inputs_blueprint
            ON recipe_inputs(blueprint_id, activity_id);
        "#,
    )?;
    Ok(())
}

/// Insert or replace an item
pub fn upsert_item(conn: &Connection, item: &Item) -> Result<(), CalcError> {
    conn.execute(
        "INSERT OR REPLACE INTO items (type_id, type_name, market_group_id)
         VALUES (?1, ?2, ?3)",
        (item.id, &item.name, item.market_group_id),
    )?;
    Ok(())
}

/// Insert a recipe together with its input rows
pub fn insert_recipe(
    conn: &Connection,
    blueprint_id: ItemId,
    recipe: &Recipe,
) -> Result<(), CalcError> {
    conn.execute(
        "INSERT INTO recipes (blueprint_id, activity_id, product_id, output_quantity)
         VALUES (?1, ?2, ?3, ?4)",
        (
            blueprint_id,
            recipe.activity.activity_id(),
            recipe.product,
            recipe.output_quantity,
        ),
    )?;
    for input in &recipe.inputs {
        conn.execute(
            "INSERT INTO recipe_inputs (blueprint_id, activity_id, material_id, quantity)
             VALUES (?1, ?2, ?3, ?4)",
            (
                blueprint_id,
                recipe.activity.activity_id(),
                input.item,
                input.quantity,
            ),
        )?;
    }
    Ok(())
}

/// Clear all reference data (for re-import)
pub fn clear_data(conn: &Connection) -> Result<(), CalcError> {
    conn.execute_batch(
        r#"
        DELETE FROM recipe_inputs;
        DELETE FROM recipes;
        DELETE FROM items;
        "#,
    )?;
    Ok(())
}

/// List the names of all producible items
pub fn list_products(conn: &Connection) -> Result<Vec<String>, CalcError> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT i.type_name
         FROM items i JOIN recipes r ON i.type_id = r.product_id
         ORDER BY i.type_name",
    )?;
    let rows = stmt.query_map([], |row| row.get(0))?;

    let mut names = Vec::new();
    for row in rows {
        names.push(row?);
    }
    Ok(names)
}

/// Catalog adapter over the sqlite reference data.
///
/// Construction validates the unique-producer invariant; data where two
/// recipes claim the same product would make lookups silently pick one.
pub struct SqliteCatalog<'a> {
    conn: &'a Connection,
    excluded: HashSet<ItemId>,
}

impl<'a> SqliteCatalog<'a> {
    pub fn open(
        conn: &'a Connection,
        non_productables: &BTreeSet<String>,
    ) -> Result<Self, CalcError> {
        let duplicate: Option<ItemId> = conn
            .query_row(
                "SELECT product_id FROM recipes
                 GROUP BY product_id HAVING COUNT(*) > 1 LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(item) = duplicate {
            return Err(CalcError::DuplicateProducer { item });
        }

        let mut excluded = HashSet::new();
        for name in non_productables {
            let id: Option<ItemId> = conn
                .query_row(
                    "SELECT type_id FROM items WHERE type_name = ?1",
                    [name],
                    |row| row.get(0),
                )
                .optional()?;
            // Names the dataset does not know exclude nothing.
            if let Some(id) = id {
                excluded.insert(id);
            }
        }

        Ok(SqliteCatalog { conn, excluded })
    }
}

impl Catalog for SqliteCatalog<'_> {
    fn lookup_recipe(&self, item: ItemId) -> Result<Option<Recipe>, CalcError> {
        let header: Option<(ItemId, i64, f64)> = self
            .conn
            .query_row(
                "SELECT blueprint_id, activity_id, output_quantity
                 FROM recipes WHERE product_id = ?1",
                [item],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let Some((blueprint_id, activity_id, output_quantity)) = header else {
            return Ok(None);
        };
        let activity = ActivityKind::from_activity_id(item, activity_id)?;

        let mut stmt = self.conn.prepare(
            "SELECT material_id, quantity FROM recipe_inputs
             WHERE blueprint_id = ?1 AND activity_id = ?2
             ORDER BY material_id",
        )?;
        let rows = stmt.query_map((blueprint_id, activity_id), |row| {
            Ok(RecipeInput {
                item: row.get(0)?,
                quantity: row.get(1)?,
            })
        })?;

        let mut inputs = Vec::new();
        for row in rows {
            inputs.push(row?);
        }
        Ok(Some(Recipe {
            product: item,
            activity,
            output_quantity,
            inputs,
        }))
    }

    fn is_producible(&self, item: ItemId) -> Result<bool, CalcError> {
        if self.excluded.contains(&item) {
            return Ok(false);
        }
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM recipes WHERE product_id = ?1)",
            [item],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn lookup_item(&self, name: &str) -> Result<Option<Item>, CalcError> {
        let item = self
            .conn
            .query_row(
                "SELECT type_id, type_name, market_group_id
                 FROM items WHERE type_name = ?1",
                [name],
                |row| {
                    Ok(Item {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        market_group_id: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(item)
    }

    fn item_name(&self, item: ItemId) -> Result<String, CalcError> {
        let name: Option<String> = self
            .conn
            .query_row(
                "SELECT type_name FROM items WHERE type_id = ?1",
                [item],
                |row| row.get(0),
            )
            .optional()?;
        name.ok_or_else(|| CalcError::UnknownItem(format!("typeID {item}")))
    }

    fn class_members(&self, class: ProductionClass) -> Result<BTreeSet<ItemId>, CalcError> {
        let groups = class.market_group_ids();
        let placeholders = vec!["?"; groups.len()].join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT type_id FROM items WHERE market_group_id IN ({placeholders})"
        ))?;
        let rows = stmt.query_map(params_from_iter(groups.iter()), |row| row.get(0))?;

        let mut members = BTreeSet::new();
        for row in rows {
            members.insert(row?);
        }
        Ok(members)
    }
}

/// Load a small fixture chain so the calculator can be exercised without
/// a full static data export.
pub fn load_sample(conn: &Connection) -> Result<(), CalcError> {
    clear_data(conn)?;

    let items = [
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
        Item {
            id: 30303,
            name: "Fulleroferrocene".to_string(),
            market_group_id: None,
        },
        Item {
            id: 4051,
            name: "Nitrogen Fuel Block".to_string(),
            market_group_id: None,
        },
        Item {
            id: 17888,
            name: "Nitrogen Isotopes".to_string(),
            market_group_id: None,
        },
    ];
    for item in &items {
        upsert_item(conn, item)?;
    }

    // Tengu Blueprint: 12 amplifiers per hull
    insert_recipe(
        conn,
        29985,
        &Recipe {
            product: 29984,
            activity: ActivityKind::Manufacturing,
            output_quantity: 1.0,
            inputs: vec![RecipeInput {
                item: 11689,
                quantity: 12.0,
            }],
        },
    )?;

    // Amplifier reaction formula: batches of five
    insert_recipe(
        conn,
        46166,
        &Recipe {
            product: 11689,
            activity: ActivityKind::Reaction,
            output_quantity: 5.0,
            inputs: vec![
                RecipeInput {
                    item: 30303,
                    quantity: 1000.0,
                },
                RecipeInput {
                    item: 4051,
                    quantity: 5.0,
                },
            ],
        },
    )?;

    // Nitrogen Fuel Block Blueprint; excluded by the default setup
    insert_recipe(
        conn,
        4052,
        &Recipe {
            product: 4051,
            activity: ActivityKind::Manufacturing,
            output_quantity: 40.0,
            inputs: vec![RecipeInput {
                item: 17888,
                quantity: 450.0,
            }],
        },
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::{Decomposition, Decompositor};
    use crate::setup::Setup;

    fn sample_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        load_sample(&conn).unwrap();
        conn
    }

    #[test]
    fn decomposes_the_sample_chain_end_to_end() {
        let conn = sample_connection();
        let setup = Setup::default();
        let catalog = SqliteCatalog::open(&conn, &setup.non_productables).unwrap();
        let efficiency = setup.efficiency_table(&catalog).unwrap();

        let decompositor = Decompositor::new(&catalog, &efficiency);
        let initial = decompositor.initial_table("Tengu", 20.0).unwrap();
        let decomposition = Decomposition::build(initial, &decompositor).unwrap();

        // No rigs or blueprints: ceil(12 * 20 * 1.0) = 240 amplifiers,
        // ceil(240 / 5) = 48 reaction runs.
        assert_eq!(
            decomposition.required_materials(),
            vec![
                ("Fulleroferrocene".to_string(), 48_000),
                ("Nitrogen Fuel Block".to_string(), 240),
            ]
        );
        assert_eq!(decomposition.steps().len(), 2);
    }

    #[test]
    fn duplicate_producers_fail_catalog_validation() {
        let conn = sample_connection();
        // A second recipe claiming the amplifier as product.
        insert_recipe(
            &conn,
            99999,
            &Recipe {
                product: 11689,
                activity: ActivityKind::Manufacturing,
                output_quantity: 1.0,
                inputs: Vec::new(),
            },
        )
        .unwrap();

        let result = SqliteCatalog::open(&conn, &BTreeSet::new());
        assert!(matches!(
            result,
            Err(CalcError::DuplicateProducer { item: 11689 })
        ));
    }

    #[test]
    fn corrupt_activity_ids_surface_as_unknown_activity() {
        let conn = sample_connection();
        conn.execute(
            "INSERT INTO recipes (blueprint_id, activity_id, product_id, output_quantity)
             VALUES (1, 8, 30303, 1.0)",
            [],
        )
        .unwrap();

        let catalog = SqliteCatalog::open(&conn, &BTreeSet::new()).unwrap();
        let result = catalog.lookup_recipe(30303);
        assert!(matches!(
            result,
            Err(CalcError::UnknownActivity {
                item: 30303,
                activity: 8
            })
        ));
    }

    #[test]
    fn producibility_honors_recipes_and_exclusions() {
        let conn = sample_connection();
        let setup = Setup::default();
        let catalog = SqliteCatalog::open(&conn, &setup.non_productables).unwrap();

        assert!(catalog.is_producible(29984).unwrap());
        // Fuel block has a recipe but is excluded by default.
        assert!(!catalog.is_producible(4051).unwrap());
        assert!(!catalog.is_producible(30303).unwrap());
    }

    #[test]
    fn class_members_resolve_through_market_groups() {
        let conn = sample_connection();
        let catalog = SqliteCatalog::open(&conn, &BTreeSet::new()).unwrap();

        let components = catalog
            .class_members(ProductionClass::AdvancedComponent)
            .unwrap();
        assert_eq!(components, BTreeSet::from([11689]));
        let ships = catalog
            .class_members(ProductionClass::AdvancedMediumShip)
            .unwrap();
        assert_eq!(ships, BTreeSet::from([29984]));
    }

    #[test]
    fn sample_products_are_listed() {
        let conn = sample_connection();
        assert_eq!(
            list_products(&conn).unwrap(),
            vec![
                "Nitrogen Fuel Block".to_string(),
                "Superconducting Gravimetric Amplifier".to_string(),
                "Tengu".to_string(),
            ]
        );
    }
}
